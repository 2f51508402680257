use basalt_bytes::ByteVec;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Read granularity during replay.
const REPLAY_CHUNK: usize = 4096;

/// The append-and-replay data file plus the mutex serializing access to it.
///
/// Contract: every read or write of the file happens with the mutex held, and
/// a seek stays under the same continuous hold as the read or write that
/// depends on it. `append` seeks to the end and writes the whole line under
/// one hold, so a line, once started, is contiguous on disk. `replay` holds
/// the lock from the seek-to-start until end of file, so a replayed stream
/// never interleaves bytes of concurrent lines.
pub struct SharedLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl SharedLog {
    /// Opens the data file truncated to empty, mode 0644.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .mode(0o644)
            .open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    fn lock(&self) -> MutexGuard<'_, File> {
        // A poisoning panic cannot leave a torn line behind anything another
        // holder depends on; recover the file and keep serving.
        self.file.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends one complete line at the end of the log under a single hold.
    pub fn append(&self, line: &[u8]) -> io::Result<()> {
        let mut file = self.lock();
        file.seek(SeekFrom::End(0))?;
        file.write_all(line)
    }

    /// Streams the whole log from the start, invoking `emit` once per
    /// complete newline-terminated line. The lock is held across the entire
    /// replay, including the `emit` calls.
    pub fn replay<F>(&self, mut emit: F) -> io::Result<()>
    where
        F: FnMut(&[u8]) -> io::Result<()>,
    {
        let mut file = self.lock();
        file.seek(SeekFrom::Start(0))?;

        let mut line = ByteVec::new().map_err(oom)?;
        let mut chunk = [0u8; REPLAY_CHUNK];
        loop {
            let n = match file.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            line.append(&chunk[..n]).map_err(oom)?;
            while let Some(nl) = line.find(0, b'\n') {
                emit(&line[..=nl])?;
                line.carryover(nl + 1);
            }
        }
        Ok(())
    }

    /// Unlinks the data file. Called on clean shutdown only; after an unclean
    /// exit the file survives until the next startup truncates it.
    pub fn remove(&self) -> io::Result<()> {
        std::fs::remove_file(&self.path)
    }

    /// Path of the backing data file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn oom(e: basalt_bytes::AllocError) -> io::Error {
    io::Error::new(io::ErrorKind::OutOfMemory, e)
}
