//! Per-transcript scan position
//!
//! Each scanned transcript gets one scalar file under the base
//! directory, named for the transcript's file stem and holding the
//! RFC 3339 timestamp of the last processed event. Missing means never
//! scanned; content that does not parse means the file was damaged, and
//! the scanner skips extraction for that pass rather than risk
//! double-processing events it cannot place.

use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

/// Orphaned checkpoint files removed per scan, at most
pub const ORPHAN_CLEANUP_LIMIT: usize = 10;

/// Days an orphaned checkpoint survives before cleanup may take it
pub const CHECKPOINT_RETENTION_DAYS: u64 = 7;

/// Decoded content of a checkpoint file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointState {
    /// No checkpoint recorded; the whole transcript is unprocessed
    Missing,
    /// A checkpoint exists but its content does not parse
    Corrupt,
    /// Timestamp of the last processed event
    At(DateTime<Utc>),
}

impl CheckpointState {
    /// Decode checkpoint file text
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return CheckpointState::Missing;
        }
        match trimmed.parse::<DateTime<Utc>>() {
            Ok(ts) => CheckpointState::At(ts),
            Err(_) => CheckpointState::Corrupt,
        }
    }

    /// Encode a checkpoint position as file text
    pub fn render(ts: DateTime<Utc>) -> String {
        format!("{}\n", ts.to_rfc3339())
    }
}

/// Remove checkpoint files whose transcript no longer exists.
///
/// Opportunistic and bounded: at most [`ORPHAN_CLEANUP_LIMIT`] removals
/// per call, only files older than [`CHECKPOINT_RETENTION_DAYS`], and
/// any filesystem error skips the entry rather than failing the scan.
/// The transcript is looked for next to the one currently being
/// scanned, reconstructed from the checkpoint name plus `ext`. Lock
/// markers and temp files are never touched.
pub fn cleanup_orphans(
    checkpoints_dir: &Path,
    transcript_dir: &Path,
    ext: Option<&std::ffi::OsStr>,
    now: SystemTime,
) -> usize {
    let Ok(entries) = fs::read_dir(checkpoints_dir) else {
        return 0;
    };
    let retention = Duration::from_secs(CHECKPOINT_RETENTION_DAYS * 24 * 60 * 60);

    let mut names: Vec<String> = entries
        .flatten()
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|e| e.file_name().into_string().ok())
        .filter(|name| !name.ends_with(".lock") && !name.ends_with(".tmp"))
        .collect();
    names.sort();

    let mut removed = 0;
    for name in names {
        if removed == ORPHAN_CLEANUP_LIMIT {
            break;
        }
        let transcript_name = match ext {
            Some(ext) => format!("{}.{}", name, ext.to_string_lossy()),
            None => name.clone(),
        };
        if transcript_dir.join(&transcript_name).exists() {
            continue;
        }
        let path = checkpoints_dir.join(&name);
        let old_enough = fs::metadata(&path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .is_some_and(|age| age > retention);
        if !old_enough {
            continue;
        }
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(checkpoint = %name, "orphaned checkpoint removed");
                removed += 1;
            }
            Err(e) => warn!(checkpoint = %name, error = %e, "orphan cleanup failed"),
        }
    }
    removed
}
