use serde::Deserialize;
use std::path::Path;

#[derive(Deserialize, Debug)]
pub struct ScoriaConfig {
    #[serde(default = "defaults::listen_port")]
    pub listen_port: u16,
    #[serde(default = "defaults::data_file")]
    pub data_file: String,
    #[serde(default = "defaults::timestamp_interval_secs")]
    pub timestamp_interval_secs: u64,
    #[serde(default = "defaults::log_level")]
    pub log_level: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),
}

mod defaults {
    pub fn listen_port() -> u16 {
        9000
    }

    pub fn data_file() -> String {
        "/var/tmp/aesdsocketdata".into()
    }

    pub fn timestamp_interval_secs() -> u64 {
        10
    }

    pub fn log_level() -> String {
        "info".into()
    }
}

impl Default for ScoriaConfig {
    fn default() -> Self {
        Self {
            listen_port: defaults::listen_port(),
            data_file: defaults::data_file(),
            timestamp_interval_secs: defaults::timestamp_interval_secs(),
            log_level: defaults::log_level(),
        }
    }
}

impl ScoriaConfig {
    pub fn load(path: impl AsRef<Path> + ToString) -> Result<Self, ConfigError> {
        let toml_to_str = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        let config: ScoriaConfig = toml::from_str(&toml_to_str)?;
        Ok(config)
    }
}
