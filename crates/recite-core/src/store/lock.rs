//! Cross-process exclusive file lock
//!
//! Exclusion is the OS advisory lock on an open handle to the sibling
//! marker file `<path>.lock`, acquired by bounded polling. The marker
//! file itself is opened-or-created and **never deleted**: removing it
//! after release would race a concurrent opener that is about to lock
//! the doomed handle. The marker accumulating on disk is the cost of
//! that invariant, and it is one empty file per record file.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs2::FileExt;

/// How long to sleep between acquisition attempts
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Compute the marker path for a record file.
pub fn lock_path_for(path: &Path) -> PathBuf {
    let mut lock_path = path.as_os_str().to_owned();
    lock_path.push(".lock");
    PathBuf::from(lock_path)
}

/// A held exclusive lock on a record file.
///
/// The OS lock is released when this guard drops; the marker file stays.
pub struct FileLock {
    file: File,
    path: PathBuf,
}

impl FileLock {
    /// Acquire the lock for `path`, polling up to `timeout`.
    ///
    /// Returns `None` on timeout so the caller can shape its own error;
    /// IO failures surface as `Err`.
    pub fn acquire(path: &Path, timeout: Duration) -> io::Result<Option<Self>> {
        let lock_path = lock_path_for(path);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        let deadline = Instant::now() + timeout;
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    return Ok(Some(Self {
                        file,
                        path: lock_path,
                    }));
                }
                Err(e) if is_contention(&e) => {
                    if Instant::now() >= deadline {
                        return Ok(None);
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Path of the marker file this guard holds.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

fn is_contention(e: &io::Error) -> bool {
    e.raw_os_error() == fs2::lock_contended_error().raw_os_error()
        || e.kind() == io::ErrorKind::WouldBlock
}
