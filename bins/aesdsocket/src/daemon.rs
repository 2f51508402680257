use std::fs::OpenOptions;
use std::io;
use std::os::fd::AsRawFd;

/// Forks into the background: the parent exits 0, the child becomes its own
/// session leader, moves to `/`, and points stdio at `/dev/null`.
///
/// Must run before any thread is spawned; only the calling thread survives
/// the fork in the child.
pub fn daemonize() -> io::Result<()> {
    // SAFETY: the process is still single-threaded here, so the child
    // continues with a coherent copy of the address space.
    match unsafe { libc::fork() } {
        -1 => Err(io::Error::last_os_error()),
        0 => {
            if unsafe { libc::setsid() } == -1 {
                return Err(io::Error::last_os_error());
            }
            std::env::set_current_dir("/")?;

            let devnull = OpenOptions::new().read(true).write(true).open("/dev/null")?;
            for stdio_fd in 0..=2 {
                // SAFETY: duplicating an open fd over the standard streams.
                if unsafe { libc::dup2(devnull.as_raw_fd(), stdio_fd) } == -1 {
                    return Err(io::Error::last_os_error());
                }
            }
            Ok(())
        }
        _ => {
            // Parent: the child owns the listener from here on.
            std::process::exit(0);
        }
    }
}
