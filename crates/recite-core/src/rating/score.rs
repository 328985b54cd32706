//! Dual-score arithmetic
//!
//! Every lesson carries two numbers: `uses`, the total citation count,
//! and `velocity`, a decaying recency score. Citations bump both;
//! periodic decay runs erode both back toward their floors. The pair
//! reads as "how much has this ever mattered" and "how much does it
//! matter right now".

use chrono::NaiveDate;

use crate::record::{Lesson, Scope};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Velocity gained per citation
pub const CITE_INCREMENT: f64 = 1.0;

/// Ceiling on the total citation count
pub const MAX_USES: u32 = 999;

/// Default multiplier applied to velocity per decay hit
pub const DEFAULT_DECAY_FACTOR: f64 = 0.9;

/// Default floor below which velocity snaps to zero
pub const DEFAULT_VELOCITY_EPSILON: f64 = 0.1;

/// Default uses count at which a project lesson is promoted to system scope
pub const DEFAULT_PROMOTE_THRESHOLD: u32 = 50;

// ============================================================================
// SCORE CONFIG
// ============================================================================

/// Tunable knobs for the scoring engine
#[derive(Debug, Clone)]
pub struct ScoreConfig {
    /// Multiplier applied to velocity per decay hit
    pub decay_factor: f64,
    /// Velocity floor; values below snap to zero
    pub velocity_epsilon: f64,
    /// Uses count at which a project lesson is promoted
    pub promote_threshold: u32,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            decay_factor: DEFAULT_DECAY_FACTOR,
            velocity_epsilon: DEFAULT_VELOCITY_EPSILON,
            promote_threshold: DEFAULT_PROMOTE_THRESHOLD,
        }
    }
}

// ============================================================================
// SCORE ENGINE
// ============================================================================

/// Pure dual-score calculation engine
///
/// Performs calculations on lesson records but never touches storage;
/// the lessons service decides what to persist.
pub struct ScoreEngine {
    config: ScoreConfig,
}

impl Default for ScoreEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoreEngine {
    /// Create an engine with default tuning
    pub fn new() -> Self {
        Self {
            config: ScoreConfig::default(),
        }
    }

    /// Create with custom config
    pub fn with_config(config: ScoreConfig) -> Self {
        Self { config }
    }

    /// Get current configuration
    pub fn config(&self) -> &ScoreConfig {
        &self.config
    }

    /// Record one citation: uses +1 (capped), velocity +1.0, `last` moves
    /// to today.
    ///
    /// Returns `true` when this citation carried a promotable project
    /// lesson across the promotion threshold. The crossing test is
    /// strict (`old < threshold <= new`), so any given lesson can
    /// trigger promotion at most once.
    pub fn cite(&self, lesson: &mut Lesson, today: NaiveDate) -> bool {
        let old_uses = lesson.uses;
        lesson.uses = (lesson.uses + 1).min(MAX_USES);
        lesson.velocity += CITE_INCREMENT;
        lesson.last = today;

        lesson.scope() == Scope::Project
            && lesson.promotable
            && old_uses < self.config.promote_threshold
            && lesson.uses >= self.config.promote_threshold
    }

    /// Apply one decay hit: velocity shrinks by the decay factor and
    /// snaps to zero below epsilon; uses steps down toward its floor
    /// of 1.
    pub fn decay(&self, lesson: &mut Lesson) {
        lesson.velocity *= self.config.decay_factor;
        if lesson.velocity < self.config.velocity_epsilon {
            lesson.velocity = 0.0;
        }
        if lesson.uses > 1 {
            lesson.uses -= 1;
        }
    }

    /// Whether a decay run should touch this lesson at all
    pub fn is_decay_eligible(&self, lesson: &Lesson, today: NaiveDate, stale_days: i64) -> bool {
        lesson.is_stale(today, stale_days)
    }
}

/// Estimate the token footprint of a lesson for injection budgeting.
///
/// Rough chars/4 heuristic, rounded up. Deliberately cheap; the budget
/// it feeds is a soft warning, not a hard cap.
pub fn estimate_tokens(title: &str, content: &str) -> u32 {
    (title.len() + content.len()).div_ceil(4) as u32
}
