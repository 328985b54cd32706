//! Lesson - a scored, citable knowledge record
//!
//! Each lesson carries the dual rating (total `uses`, decaying `velocity`)
//! plus day-granularity bookkeeping dates. Scope is not stored separately:
//! it is implied by the id prefix (`L` project, `S` system).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Title length cap, enforced on add/edit.
pub const MAX_TITLE_LEN: usize = 120;

/// Content length cap, enforced on add/edit.
pub const MAX_CONTENT_LEN: usize = 1200;

// ============================================================================
// SCOPE / SOURCE / CATEGORY
// ============================================================================

/// Where a lesson lives: the per-project file or the shared system file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Per-project lessons (`L` ids), stored under the project root
    #[default]
    Project,
    /// Cross-project lessons (`S` ids), stored in the base directory
    System,
}

impl Scope {
    /// Id prefix letter for this scope
    pub fn id_prefix(&self) -> char {
        match self {
            Scope::Project => 'L',
            Scope::System => 'S',
        }
    }

    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Project => "project",
            Scope::System => "system",
        }
    }

    /// Derive the scope from an id like `L012` or `S003`
    pub fn of_id(id: &str) -> Option<Scope> {
        match id.chars().next() {
            Some('L') => Some(Scope::Project),
            Some('S') => Some(Scope::System),
            _ => None,
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "project" => Ok(Scope::Project),
            "system" => Ok(Scope::System),
            _ => Err(format!("Unknown scope: {}", s)),
        }
    }
}

/// Who recorded the lesson
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Recorded explicitly by the user
    #[default]
    User,
    /// Extracted from agent output
    Ai,
}

impl Source {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::User => "user",
            Source::Ai => "ai",
        }
    }

    /// Parse from string name, defaulting to `User` on unknown input
    pub fn parse_name(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "ai" => Source::Ai,
            _ => Source::User,
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of knowledge a lesson captures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// A reusable approach that worked
    #[default]
    Pattern,
    /// A mistake and its fix
    Correction,
    /// A choice made and why
    Decision,
    /// A surprising pitfall
    Gotcha,
    /// A user preference to honor
    Preference,
}

impl Category {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Pattern => "pattern",
            Category::Correction => "correction",
            Category::Decision => "decision",
            Category::Gotcha => "gotcha",
            Category::Preference => "preference",
        }
    }

    /// Parse from string name, defaulting to `Pattern` on unknown input
    pub fn parse_name(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "correction" => Category::Correction,
            "decision" => Category::Decision,
            "gotcha" => Category::Gotcha,
            "preference" => Category::Preference,
            _ => Category::Pattern,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pattern" => Ok(Category::Pattern),
            "correction" => Ok(Category::Correction),
            "decision" => Ok(Category::Decision),
            "gotcha" => Ok(Category::Gotcha),
            "preference" => Ok(Category::Preference),
            _ => Err(format!("Unknown category: {}", s)),
        }
    }
}

// ============================================================================
// LESSON
// ============================================================================

/// A persisted lesson with its dual rating state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    /// Stable identifier (`L###` or `S###`), assigned once per file
    pub id: String,
    /// Short headline, length-capped
    pub title: String,
    /// Body text, length-capped
    pub content: String,
    /// Kind of knowledge
    pub category: Category,
    /// Total citation count (floor 1, ceiling `MAX_USES`)
    pub uses: u32,
    /// Decaying recency score
    pub velocity: f64,
    /// Estimated token footprint for injection budgeting
    pub tokens: u32,
    /// Date the lesson was recorded
    pub learned: NaiveDate,
    /// Date of the most recent citation
    pub last: NaiveDate,
    /// Who recorded it
    pub source: Source,
    /// Opt-out flag for automatic promotion to system scope
    pub promotable: bool,
}

impl Lesson {
    /// Scope implied by the id prefix; unknown prefixes read as project.
    pub fn scope(&self) -> Scope {
        Scope::of_id(&self.id).unwrap_or(Scope::Project)
    }

    /// Whether the lesson has gone uncited for more than `stale_days`.
    pub fn is_stale(&self, today: NaiveDate, stale_days: i64) -> bool {
        (today - self.last).num_days() > stale_days
    }

    /// Composite ranking score used by `inject`: total usage plus the
    /// recency heat, so a freshly cited lesson outranks an equally used
    /// cold one.
    pub fn rating_score(&self) -> f64 {
        self.uses as f64 + self.velocity
    }
}

// ============================================================================
// INPUT TYPES
// ============================================================================

/// Input for recording a new lesson
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLesson {
    /// Short headline
    pub title: String,
    /// Body text
    pub content: String,
    /// Kind of knowledge
    #[serde(default)]
    pub category: Category,
    /// Who recorded it
    #[serde(default)]
    pub source: Source,
    /// Opt-out flag for automatic promotion
    #[serde(default = "default_promotable")]
    pub promotable: bool,
}

fn default_promotable() -> bool {
    true
}

impl Default for NewLesson {
    fn default() -> Self {
        Self {
            title: String::new(),
            content: String::new(),
            category: Category::Pattern,
            source: Source::User,
            promotable: true,
        }
    }
}
