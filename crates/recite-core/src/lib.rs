//! # Recite Core
//!
//! Persistent lesson and handoff store for coding-agent sessions. Knowledge
//! worth keeping lives in human-readable Markdown record files; hooks cite,
//! inject, and hand work across session boundaries:
//!
//! - **Dual-Score Rating**: total `uses` plus a decaying `velocity`, so a
//!   lesson's lifetime value and its recent heat are read separately
//! - **Locked Text-File Store**: cross-process exclusive locks, atomic
//!   temp-then-rename writes, malformed blocks preserved verbatim
//! - **Scope Promotion**: project lessons (`L` ids) that keep earning
//!   citations graduate into the shared system file (`S` ids)
//! - **Checkpointed Transcript Scan**: JSONL session transcripts are mined
//!   for citations and directives with at-most-once processing per event
//! - **Handoff State Machine**: multi-step work survives session death with
//!   tried logs, blockers, todo mirroring, and a terminal completed state
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use recite_core::{Config, LessonStore, NewLesson, Scope};
//!
//! let config = Config::from_env()?;
//! let lessons = LessonStore::new(config);
//!
//! // Record a lesson
//! let lesson = lessons.add(
//!     NewLesson {
//!         title: "Integration tests need the fake clock".to_string(),
//!         content: "Real time makes the decay suite flaky".to_string(),
//!         ..Default::default()
//!     },
//!     Scope::Project,
//!     false,
//! )?;
//!
//! // Cite it when it proves useful again
//! let outcome = lessons.cite(&lesson.id)?;
//!
//! // Inject the top lessons into a fresh session
//! let payload = lessons.inject(10)?.to_markdown();
//! ```

#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULES
// ============================================================================

pub mod codec;
pub mod config;
pub mod handoffs;
pub mod lessons;
pub mod rating;
pub mod record;
pub mod store;
pub mod transcript;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

// Record types
pub use record::{
    Attempt, AttemptOutcome, Category, Handoff, HandoffContext, HandoffStatus, Lesson, NewLesson,
    Phase, Scope, Source, TodoItem, TodoState, MAX_CONTENT_LEN, MAX_TITLE_LEN,
};

// Record file codec
pub use codec::{Block, Codec, Document};

// Locked store
pub use store::{lock_path_for, write_atomic, FileLock, FileStore, Result, StoreError};

// Rating engine
pub use rating::{
    estimate_tokens, find_duplicate, is_duplicate, leads_with_glyph, normalize_title, render_glyph,
    titles_match, ScoreConfig, ScoreEngine, CITE_INCREMENT, DEFAULT_DECAY_FACTOR,
    DEFAULT_PROMOTE_THRESHOLD, DEFAULT_VELOCITY_EPSILON, GLYPH_LEN, MAX_USES, USES_THRESHOLDS,
    VELOCITY_THRESHOLDS,
};

// Configuration
pub use config::{
    Config, DEFAULT_LOCK_TIMEOUT_MS, DEFAULT_MAX_LESSONS, DEFAULT_STALE_DAYS, DEFAULT_TOKEN_WARN,
};

// Lesson operations
pub use lessons::{
    CiteOutcome, DecayReport, InjectReport, LessonPatch, LessonStats, LessonStore, ListFilter,
};

// Handoff operations
pub use handoffs::{
    infer_blocked_by, HandoffInjectReport, HandoffPatch, HandoffStore, NewHandoff,
    COMPLETED_RETENTION_DAYS, KEEP_RECENT_COMPLETED,
};

// Transcript extraction
pub use transcript::{
    cleanup_orphans, find_citations, parse_directive, CheckpointState, Directive, ScanReport,
    TranscriptScanner, CHECKPOINT_RETENTION_DAYS, ORPHAN_CLEANUP_LIMIT,
};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// PRELUDE
// ============================================================================

/// Convenient imports for common usage
pub mod prelude {
    pub use crate::{
        Category, CiteOutcome, Config, Handoff, HandoffPatch, HandoffStatus, HandoffStore, Lesson,
        LessonStore, NewHandoff, NewLesson, Phase, Result, ScanReport, Scope, Source, StoreError,
        TranscriptScanner,
    };
}
