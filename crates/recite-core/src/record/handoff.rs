//! Handoff - a tracked unit of multi-step work
//!
//! Handoffs move through a small status machine (`not_started` through
//! `completed`) and accumulate attempts, next steps, and an optional
//! structured context payload fenced in the record body.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// STATUS / PHASE
// ============================================================================

/// Lifecycle state of a handoff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HandoffStatus {
    /// Created but untouched
    #[default]
    NotStarted,
    /// Being actively worked
    InProgress,
    /// Waiting on something outside the work itself
    Blocked,
    /// Work done, awaiting review
    ReadyForReview,
    /// Terminal; set only through the completion operation
    Completed,
}

impl HandoffStatus {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            HandoffStatus::NotStarted => "not_started",
            HandoffStatus::InProgress => "in_progress",
            HandoffStatus::Blocked => "blocked",
            HandoffStatus::ReadyForReview => "ready_for_review",
            HandoffStatus::Completed => "completed",
        }
    }

    /// Parse from string name, tolerating hyphens and case
    pub fn parse_name(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "not_started" => Some(HandoffStatus::NotStarted),
            "in_progress" => Some(HandoffStatus::InProgress),
            "blocked" => Some(HandoffStatus::Blocked),
            "ready_for_review" => Some(HandoffStatus::ReadyForReview),
            "completed" | "complete" | "done" => Some(HandoffStatus::Completed),
            _ => None,
        }
    }

    /// Whether this status is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, HandoffStatus::Completed)
    }
}

impl std::fmt::Display for HandoffStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for HandoffStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_name(s).ok_or_else(|| format!("Unknown status: {}", s))
    }
}

/// Coarse stage of the work itself, orthogonal to status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Understanding the problem
    #[default]
    Research,
    /// Deciding the approach
    Planning,
    /// Writing the change
    Implementing,
    /// Verifying the change
    Review,
}

impl Phase {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Research => "research",
            Phase::Planning => "planning",
            Phase::Implementing => "implementing",
            Phase::Review => "review",
        }
    }

    /// Parse from string name
    pub fn parse_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "research" => Some(Phase::Research),
            "planning" => Some(Phase::Planning),
            "implementing" | "implementation" => Some(Phase::Implementing),
            "review" => Some(Phase::Review),
            _ => None,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_name(s).ok_or_else(|| format!("Unknown phase: {}", s))
    }
}

// ============================================================================
// ATTEMPTS
// ============================================================================

/// Outcome tag on a recorded attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptOutcome {
    Success,
    Fail,
    Partial,
}

impl AttemptOutcome {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptOutcome::Success => "success",
            AttemptOutcome::Fail => "fail",
            AttemptOutcome::Partial => "partial",
        }
    }

    /// Parse from string name
    pub fn parse_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "success" | "succeeded" | "ok" => Some(AttemptOutcome::Success),
            "fail" | "failed" | "failure" => Some(AttemptOutcome::Fail),
            "partial" => Some(AttemptOutcome::Partial),
            _ => None,
        }
    }
}

impl std::fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AttemptOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_name(s).ok_or_else(|| format!("Unknown outcome: {}", s))
    }
}

/// One recorded try at the work, in append order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    /// How the attempt ended
    pub outcome: AttemptOutcome,
    /// What was tried
    pub description: String,
}

// ============================================================================
// STRUCTURED CONTEXT
// ============================================================================

/// Structured context payload carried inside the handoff body.
///
/// Serialized as fenced JSON so the record file stays a plain text
/// document; fields the writer leaves empty are omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct HandoffContext {
    /// One-paragraph summary of where the work stands
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub summary: String,
    /// Files the next agent should look at first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub critical_files: Vec<String>,
    /// Changes made so far
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recent_changes: Vec<String>,
    /// Things learned along the way
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub learnings: Vec<String>,
    /// Current obstacles
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blockers: Vec<String>,
}

impl HandoffContext {
    /// Whether every field is empty
    pub fn is_empty(&self) -> bool {
        self.summary.is_empty()
            && self.critical_files.is_empty()
            && self.recent_changes.is_empty()
            && self.learnings.is_empty()
            && self.blockers.is_empty()
    }
}

// ============================================================================
// TODO MIRRORING
// ============================================================================

/// State of one mirrored todo entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TodoState {
    Completed,
    InProgress,
    #[default]
    Pending,
}

impl TodoState {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            TodoState::Completed => "completed",
            TodoState::InProgress => "in_progress",
            TodoState::Pending => "pending",
        }
    }

    /// Parse from string name
    pub fn parse_name(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "completed" | "done" => Some(TodoState::Completed),
            "in_progress" => Some(TodoState::InProgress),
            "pending" | "todo" => Some(TodoState::Pending),
            _ => None,
        }
    }
}

/// One entry of an agent todo list mirrored into a handoff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoItem {
    /// Todo text
    pub content: String,
    /// Current state
    #[serde(default)]
    pub status: TodoState,
}

// ============================================================================
// HANDOFF
// ============================================================================

/// A persisted handoff record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handoff {
    /// Stable identifier (`H###-xxxx`); legacy files may carry bare numbers
    pub id: String,
    /// Short headline
    pub title: String,
    /// Free-form description of the work
    pub description: String,
    /// Lifecycle state
    pub status: HandoffStatus,
    /// Stage of the work
    pub phase: Phase,
    /// Agent or person currently holding the work
    pub agent: String,
    /// Date the handoff was created
    pub created: NaiveDate,
    /// Date of the most recent mutation
    pub updated: NaiveDate,
    /// Related lesson or handoff ids
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub refs: Vec<String>,
    /// Recorded attempts, in append order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tried: Vec<Attempt>,
    /// Free-form next steps for whoever picks the work up
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub next_steps: String,
    /// Ids of handoffs this one is waiting on
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocked_by: Vec<String>,
    /// Free-form resume point within the work
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub checkpoint: String,
    /// Structured context payload, if recorded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<HandoffContext>,
}

impl Handoff {
    /// Whether the handoff has reached its terminal state
    pub fn is_completed(&self) -> bool {
        self.status.is_terminal()
    }

    /// Numeric stem of the id: `H012-a3f9` and legacy `H12`/`12` all
    /// stem to 12. Returns `None` when no leading number exists.
    pub fn id_stem(id: &str) -> Option<u32> {
        let digits: String = id
            .trim_start_matches(['H', 'h'])
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        digits.parse().ok()
    }

    /// Whether `query` identifies this handoff: exact id match, or a
    /// numeric-stem match so `H7`, `7`, and `H007` all find `H007-a3f9`.
    pub fn matches_id(&self, query: &str) -> bool {
        if self.id == query {
            return true;
        }
        match (Self::id_stem(&self.id), Self::id_stem(query)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}
