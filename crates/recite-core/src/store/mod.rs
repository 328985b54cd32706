//! Store module - Locked file store
//!
//! All durable state is plain text files. Mutations go through
//! [`FileStore::with_lock`]: a cross-process exclusive lock, a fresh
//! read, a pure text-to-text closure, and an atomic temp-then-rename
//! write. Reads outside the lock ([`FileStore::read`]) are best-effort
//! snapshots, stale by at most one in-flight write.

mod lock;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

pub use lock::{lock_path_for, FileLock};

// ============================================================================
// ERRORS
// ============================================================================

/// Errors surfaced by the store and the services built on it
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Operation referenced an unknown record id
    #[error("Record not found: {0}")]
    NotFound(String),
    /// Add rejected because an existing record has a near-identical title
    #[error("Duplicate of {id}: {title}")]
    Duplicate {
        /// Id of the existing record
        id: String,
        /// Title of the existing record
        title: String,
    },
    /// The exclusive lock could not be acquired within the bound
    #[error("Timed out waiting for lock on {0}")]
    LockTimeout(PathBuf),
    /// Filesystem failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Bad environment, path configuration, or request shape
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Store result type
pub type Result<T> = std::result::Result<T, StoreError>;

// ============================================================================
// FILE STORE
// ============================================================================

/// Default bound on lock acquisition
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// Locked, atomic access to one record file at a time.
#[derive(Debug, Clone)]
pub struct FileStore {
    lock_timeout: Duration,
}

impl Default for FileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FileStore {
    /// Create a store with the default lock timeout
    pub fn new() -> Self {
        Self {
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Create a store with a custom lock timeout
    pub fn with_timeout(lock_timeout: Duration) -> Self {
        Self { lock_timeout }
    }

    /// Best-effort snapshot read. Missing file reads as empty; that is
    /// how every record file starts life.
    pub fn read(&self, path: &Path) -> Result<String> {
        match fs::read_to_string(path) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Run an exclusive read-modify-write pass over one file.
    ///
    /// The closure sees the file text as read under the lock and returns
    /// `Some(new_text)` to persist or `None` to leave the file alone.
    /// The write lands via temp file + `sync_all` + atomic rename, so a
    /// crash leaves either the old file or the new one, never a torn mix.
    pub fn with_lock<T, F>(&self, path: &Path, f: F) -> Result<T>
    where
        F: FnOnce(&str) -> Result<(T, Option<String>)>,
    {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let _guard = FileLock::acquire(path, self.lock_timeout)?
            .ok_or_else(|| StoreError::LockTimeout(path.to_path_buf()))?;

        let text = self.read(path)?;
        let (value, new_text) = f(&text)?;

        if let Some(new_text) = new_text {
            write_atomic(path, &new_text)?;
            debug!(path = %path.display(), bytes = new_text.len(), "record file rewritten");
        }

        Ok(value)
    }
}

/// Write `text` to `path` through a sibling temp file and atomic rename.
pub fn write_atomic(path: &Path, text: &str) -> Result<()> {
    let tmp_path = tmp_path_for(path);
    {
        let mut tmp = fs::File::create(&tmp_path)?;
        tmp.write_all(text.as_bytes())?;
        tmp.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}
