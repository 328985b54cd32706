//! Configuration
//!
//! All settings come from the environment with fixed defaults; the core
//! consumes them but never writes them back. Paths resolve once at
//! startup so every operation in a run sees the same file layout.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;

use crate::rating::{
    ScoreConfig, DEFAULT_DECAY_FACTOR, DEFAULT_PROMOTE_THRESHOLD, DEFAULT_VELOCITY_EPSILON,
};
use crate::store::{Result, StoreError};

/// Eviction bound on project lessons
pub const DEFAULT_MAX_LESSONS: usize = 150;

/// Days without a citation before a lesson counts as stale
pub const DEFAULT_STALE_DAYS: i64 = 14;

/// Injection size above which the CLI warns about heavy context
pub const DEFAULT_TOKEN_WARN: u32 = 2000;

/// Default lock acquisition bound in milliseconds
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 10_000;

/// Name of the dot-directory holding per-project record files
const PROJECT_DATA_DIR: &str = ".recite";

/// Resolved runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base data directory (system lessons, checkpoints, decay stamp)
    pub base_dir: PathBuf,
    /// Project root whose `.recite/` holds project-scope records
    pub project_dir: PathBuf,
    /// Velocity multiplier per decay hit
    pub decay_factor: f64,
    /// Velocity floor; values below snap to zero
    pub velocity_epsilon: f64,
    /// Uses count at which project lessons promote to system scope
    pub promote_threshold: u32,
    /// Project lesson count that triggers eviction
    pub max_lessons: usize,
    /// Days without a citation before a lesson is stale
    pub stale_days: i64,
    /// Injection token estimate above which to warn
    pub token_warn: u32,
    /// Bound on exclusive lock acquisition
    pub lock_timeout: Duration,
}

impl Config {
    /// Resolve configuration from the environment.
    ///
    /// `RECITE_DIR` overrides the base directory (default: the platform
    /// data dir for `com.recite.recite`); `RECITE_PROJECT_DIR` overrides
    /// the project root (default: the working directory). The base
    /// directory is created on first use.
    pub fn from_env() -> Result<Self> {
        let base_dir = match std::env::var("RECITE_DIR") {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => {
                let proj_dirs = ProjectDirs::from("com", "recite", "recite").ok_or_else(|| {
                    StoreError::Config("Could not determine a data directory".to_string())
                })?;
                proj_dirs.data_dir().to_path_buf()
            }
        };
        std::fs::create_dir_all(&base_dir)?;
        // Restrict directory permissions to owner-only on Unix
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o700);
            let _ = std::fs::set_permissions(&base_dir, perms);
        }

        let project_dir = match std::env::var("RECITE_PROJECT_DIR") {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => std::env::current_dir()?,
        };

        Ok(Self {
            base_dir,
            project_dir,
            decay_factor: env_parsed("RECITE_DECAY_FACTOR", DEFAULT_DECAY_FACTOR),
            velocity_epsilon: env_parsed("RECITE_VELOCITY_EPSILON", DEFAULT_VELOCITY_EPSILON),
            promote_threshold: env_parsed("RECITE_PROMOTE_THRESHOLD", DEFAULT_PROMOTE_THRESHOLD),
            max_lessons: env_parsed("RECITE_MAX_LESSONS", DEFAULT_MAX_LESSONS),
            stale_days: env_parsed("RECITE_STALE_DAYS", DEFAULT_STALE_DAYS),
            token_warn: env_parsed("RECITE_TOKEN_WARN", DEFAULT_TOKEN_WARN),
            lock_timeout: Duration::from_millis(env_parsed(
                "RECITE_LOCK_TIMEOUT_MS",
                DEFAULT_LOCK_TIMEOUT_MS,
            )),
        })
    }

    /// Build a configuration rooted at explicit directories with default
    /// tunables. Used by tests and embedders that manage their own paths.
    pub fn rooted(base_dir: impl Into<PathBuf>, project_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            project_dir: project_dir.into(),
            decay_factor: DEFAULT_DECAY_FACTOR,
            velocity_epsilon: DEFAULT_VELOCITY_EPSILON,
            promote_threshold: DEFAULT_PROMOTE_THRESHOLD,
            max_lessons: DEFAULT_MAX_LESSONS,
            stale_days: DEFAULT_STALE_DAYS,
            token_warn: DEFAULT_TOKEN_WARN,
            lock_timeout: Duration::from_millis(DEFAULT_LOCK_TIMEOUT_MS),
        }
    }

    /// Scoring engine tuning derived from this configuration
    pub fn score_config(&self) -> ScoreConfig {
        ScoreConfig {
            decay_factor: self.decay_factor,
            velocity_epsilon: self.velocity_epsilon,
            promote_threshold: self.promote_threshold,
        }
    }

    // ------------------------------------------------------------------
    // File layout
    // ------------------------------------------------------------------

    /// System-scope lessons file (`S` ids)
    pub fn system_lessons_path(&self) -> PathBuf {
        self.base_dir.join("lessons.md")
    }

    /// Project-scope lessons file (`L` ids)
    pub fn project_lessons_path(&self) -> PathBuf {
        self.project_dir.join(PROJECT_DATA_DIR).join("lessons.md")
    }

    /// Active handoffs file
    pub fn handoffs_path(&self) -> PathBuf {
        self.project_dir.join(PROJECT_DATA_DIR).join("handoffs.md")
    }

    /// Archive file for retired completed handoffs
    pub fn handoffs_archive_path(&self) -> PathBuf {
        self.project_dir
            .join(PROJECT_DATA_DIR)
            .join("handoffs-archive.md")
    }

    /// Directory of per-transcript checkpoint scalars
    pub fn checkpoints_dir(&self) -> PathBuf {
        self.base_dir.join("checkpoints")
    }

    /// Checkpoint file for one transcript, keyed by its file stem
    pub fn checkpoint_path(&self, transcript: &Path) -> PathBuf {
        let stem = transcript
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "transcript".to_string());
        self.checkpoints_dir().join(stem)
    }

    /// Stamp file recording the last decay run
    pub fn last_decay_path(&self) -> PathBuf {
        self.base_dir.join("last-decay")
    }
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
