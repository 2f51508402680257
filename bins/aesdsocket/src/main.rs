mod daemon;

use anyhow::Context;
use clap::Parser;
use scoria_config::ScoriaConfig;
use scoria_core::{SharedLog, TimestampTicker};
use scoria_engine::Supervisor;
use signal_hook::consts::{SIGINT, SIGTERM};
use std::net::TcpListener;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Line-oriented TCP append-and-replay server.
#[derive(Parser, Debug)]
#[command(name = "aesdsocket")]
struct Args {
    /// Daemonize after the listening socket is bound.
    #[arg(short = 'd')]
    daemon: bool,

    /// Optional TOML config; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ScoriaConfig::load(path.display().to_string())
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ScoriaConfig::default(),
    };

    // Bind before daemonizing so a startup failure reaches the caller's tty
    // and exit status.
    let listener = TcpListener::bind(("0.0.0.0", config.listen_port))
        .with_context(|| format!("binding port {}", config.listen_port))?;

    if args.daemon {
        daemon::daemonize().context("daemonizing")?;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .init();

    let shutdown = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(SIGINT, Arc::clone(&shutdown)).context("installing SIGINT")?;
    signal_hook::flag::register(SIGTERM, Arc::clone(&shutdown)).context("installing SIGTERM")?;

    let log = Arc::new(
        SharedLog::create(&config.data_file)
            .with_context(|| format!("creating data file {}", config.data_file))?,
    );
    info!(
        "serving port {} backed by {}",
        config.listen_port, config.data_file
    );

    let ticker = TimestampTicker::spawn(
        Duration::from_secs(config.timestamp_interval_secs),
        Arc::clone(&log),
        Arc::clone(&shutdown),
    )
    .context("starting timestamp ticker")?;

    let mut supervisor = Supervisor::new(listener, Arc::clone(&log), Arc::clone(&shutdown))
        .context("setting up supervisor")?;
    let run_result = supervisor.run();

    // Whether the loop ended by signal or by error, stop the ticker before
    // deciding the exit path.
    shutdown.store(true, Ordering::Relaxed);
    if ticker.join().is_err() {
        tracing::warn!("timestamp ticker panicked");
    }

    run_result.context("accept loop failed")?;

    log.remove().context("removing data file")?;
    info!("clean shutdown");
    Ok(())
}
