//! Transcript module - Checkpointed citation and directive extraction
//!
//! Session transcripts are JSONL event streams. The scanner decodes the
//! events a previous pass has not seen, pulls lesson citations and
//! directives out of assistant text, applies them to the stores, and
//! advances the per-transcript checkpoint. The unprocessed tail is
//! claimed under the checkpoint's file lock before any effect is
//! applied: a crash mid-pass can drop a batch, but never replays one.

mod checkpoint;
pub mod command;

use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::handoffs::{HandoffPatch, HandoffStore, NewHandoff};
use crate::lessons::LessonStore;
use crate::rating::leads_with_glyph;
use crate::record::{HandoffStatus, NewLesson, Source};
use crate::store::{FileStore, Result, StoreError};

pub use checkpoint::{
    cleanup_orphans, CheckpointState, CHECKPOINT_RETENTION_DAYS, ORPHAN_CLEANUP_LIMIT,
};
pub use command::{parse_directive, Directive};

/// Minimum digits in a citable id token; minted ids are zero-padded to
/// three, so anything shorter is prose (`S3` the storage service, not a
/// record).
const ID_MIN_DIGITS: usize = 3;

// ============================================================================
// EVENTS
// ============================================================================

/// One decoded transcript event
#[derive(Debug, Clone)]
struct Event {
    timestamp: Option<DateTime<Utc>>,
    assistant_text: Option<String>,
}

#[derive(Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    kind: Option<String>,
    timestamp: Option<DateTime<Utc>>,
    message: Option<RawMessage>,
}

#[derive(Deserialize)]
struct RawMessage {
    #[serde(default)]
    content: RawContent,
}

/// Message content is either a bare string or a list of typed parts.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawContent {
    Text(String),
    Parts(Vec<RawPart>),
}

impl Default for RawContent {
    fn default() -> Self {
        RawContent::Text(String::new())
    }
}

#[derive(Deserialize)]
struct RawPart {
    text: Option<String>,
}

impl RawEvent {
    fn into_event(self) -> Event {
        let assistant_text = if self.kind.as_deref() == Some("assistant") {
            self.message.map(|m| m.content.joined_text())
        } else {
            None
        };
        Event {
            timestamp: self.timestamp,
            assistant_text,
        }
    }
}

impl RawContent {
    fn joined_text(&self) -> String {
        match self {
            RawContent::Text(text) => text.clone(),
            RawContent::Parts(parts) => parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

// ============================================================================
// SCANNER
// ============================================================================

/// What one scan pass saw and did
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Events decoded from the transcript
    pub events: usize,
    /// Citations applied
    pub cited: usize,
    /// Citation tokens that matched no record
    pub unknown_citations: usize,
    /// Directives applied
    pub directives_applied: usize,
    /// Directives that matched the grammar but could not be applied
    pub directives_failed: usize,
    /// Promotions triggered by scan citations
    pub promotions: usize,
    /// No checkpoint existed; the whole transcript was scanned
    pub full_scan: bool,
    /// The checkpoint existed but did not parse; extraction was skipped
    pub corrupt_checkpoint: bool,
    /// Orphaned checkpoint files removed after the pass
    pub orphans_removed: usize,
}

/// Extraction work claimed under the checkpoint lock
#[derive(Debug, Default)]
struct ScanPlan {
    citations: Vec<String>,
    directives: Vec<Directive>,
}

/// Applies transcript content to the lesson and handoff stores.
pub struct TranscriptScanner {
    config: Config,
    store: FileStore,
    lessons: LessonStore,
    handoffs: HandoffStore,
}

impl TranscriptScanner {
    /// Create a scanner for the given configuration
    pub fn new(config: Config) -> Self {
        let store = FileStore::with_timeout(config.lock_timeout);
        let lessons = LessonStore::new(config.clone());
        let handoffs = HandoffStore::new(config.clone());
        Self {
            config,
            store,
            lessons,
            handoffs,
        }
    }

    /// The lesson store scan citations land in
    pub fn lessons(&self) -> &LessonStore {
        &self.lessons
    }

    /// The handoff store scan directives land in
    pub fn handoffs(&self) -> &HandoffStore {
        &self.handoffs
    }

    /// Scan one transcript.
    ///
    /// Under the checkpoint's file lock: decode the transcript, select
    /// the events after the checkpoint (all of them when none exists),
    /// extract citations and directives, and advance the checkpoint to
    /// the latest event timestamp whether or not anything was extracted.
    /// The extracted work is applied after the claim persists, so a
    /// concurrent scan of the same transcript finds nothing left to take.
    pub fn scan(&self, transcript: &Path) -> Result<ScanReport> {
        let checkpoint_path = self.config.checkpoint_path(transcript);
        let mut report = ScanReport::default();

        let plan = self.store.with_lock(&checkpoint_path, |text| {
            let state = CheckpointState::parse(text);
            let events = self.read_events(transcript)?;
            report.events = events.len();

            let plan = match state {
                CheckpointState::Corrupt => {
                    report.corrupt_checkpoint = true;
                    warn!(
                        checkpoint = %checkpoint_path.display(),
                        "unreadable checkpoint; skipping extraction for this pass"
                    );
                    ScanPlan::default()
                }
                CheckpointState::Missing => {
                    report.full_scan = true;
                    extract(&events, None, true)
                }
                CheckpointState::At(after) => extract(&events, Some(after), false),
            };

            let latest = events.iter().filter_map(|e| e.timestamp).max();
            Ok((plan, latest.map(CheckpointState::render)))
        })?;

        for id in &plan.citations {
            match self.lessons.cite(id) {
                Ok(outcome) => {
                    report.cited += 1;
                    if let Some(to) = outcome.promoted_to {
                        report.promotions += 1;
                        info!(from = %id, to = %to, "scan citation promoted lesson");
                    }
                }
                Err(StoreError::NotFound(_)) => {
                    report.unknown_citations += 1;
                    debug!(id = %id, "cited id matches no record");
                }
                Err(e) => return Err(e),
            }
        }

        for directive in plan.directives {
            match self.apply(directive) {
                Ok(()) => report.directives_applied += 1,
                Err(
                    e @ (StoreError::NotFound(_)
                    | StoreError::Duplicate { .. }
                    | StoreError::Config(_)),
                ) => {
                    report.directives_failed += 1;
                    warn!(error = %e, "transcript directive not applied");
                }
                Err(e) => return Err(e),
            }
        }

        report.orphans_removed = cleanup_orphans(
            &self.config.checkpoints_dir(),
            transcript.parent().unwrap_or_else(|| Path::new(".")),
            transcript.extension(),
            SystemTime::now(),
        );

        if report.cited + report.directives_applied > 0 {
            info!(
                cited = report.cited,
                directives = report.directives_applied,
                events = report.events,
                "transcript scan applied"
            );
        }
        Ok(report)
    }

    fn read_events(&self, transcript: &Path) -> Result<Vec<Event>> {
        let text = self.store.read(transcript)?;
        let mut events = Vec::new();
        let mut bad_lines = 0usize;
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<RawEvent>(line) {
                Ok(raw) => events.push(raw.into_event()),
                Err(e) => {
                    bad_lines += 1;
                    debug!(line = lineno + 1, error = %e, "skipping malformed transcript line");
                }
            }
        }
        if bad_lines > 0 {
            warn!(
                count = bad_lines,
                path = %transcript.display(),
                "malformed transcript lines skipped"
            );
        }
        Ok(events)
    }

    fn apply(&self, directive: Directive) -> Result<()> {
        match directive {
            Directive::AddLesson {
                scope,
                category,
                title,
                content,
            } => {
                let lesson = self.lessons.add(
                    NewLesson {
                        title,
                        content,
                        category,
                        source: Source::Ai,
                        promotable: true,
                    },
                    scope,
                    false,
                )?;
                debug!(id = %lesson.id, "lesson recorded from transcript directive");
            }
            Directive::AddHandoff { title, description } => {
                let handoff = self.handoffs.add(NewHandoff {
                    title,
                    description,
                    ..Default::default()
                })?;
                debug!(id = %handoff.id, "handoff recorded from transcript directive");
            }
            Directive::SetStatus { id, status } => {
                // The status route cannot sneak past the terminal-state
                // rule; completion goes through the completion path.
                if status == HandoffStatus::Completed {
                    self.handoffs.complete(&id)?;
                } else {
                    self.handoffs.update(
                        &id,
                        HandoffPatch {
                            status: Some(status),
                            ..Default::default()
                        },
                    )?;
                }
            }
            Directive::Complete { id } => {
                self.handoffs.complete(&id)?;
            }
            Directive::Tried {
                id,
                outcome,
                description,
            } => {
                self.handoffs.tried(&id, outcome, &description)?;
            }
            Directive::NextSteps { id, text } => {
                self.handoffs.update(
                    &id,
                    HandoffPatch {
                        next_steps: Some(text),
                        ..Default::default()
                    },
                )?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// EXTRACTION
// ============================================================================

/// Pull citations and directives out of the assistant events in scope.
/// An event is in scope when its timestamp is strictly after `after`;
/// untimestamped events count only on full scans, where "already
/// processed" cannot be told apart from "new".
fn extract(
    events: &[Event],
    after: Option<DateTime<Utc>>,
    include_untimestamped: bool,
) -> ScanPlan {
    let mut plan = ScanPlan::default();
    for event in events {
        let in_scope = match (event.timestamp, after) {
            (Some(ts), Some(after)) => ts > after,
            (Some(_), None) => true,
            (None, _) => include_untimestamped,
        };
        if !in_scope {
            continue;
        }
        let Some(text) = &event.assistant_text else {
            continue;
        };
        for line in text.lines() {
            if let Some(directive) = parse_directive(line) {
                plan.directives.push(directive);
            } else {
                plan.citations.extend(find_citations(line));
            }
        }
    }
    plan
}

/// Find lesson citations in free text: `L###`/`S###` id tokens at word
/// boundaries. A token trailed by its rating glyph (allowing a closing
/// bracket between) is a listing of the record, not a use of it, and
/// does not count. Every returned occurrence is one citation.
pub fn find_citations(text: &str) -> Vec<String> {
    let bytes = text.as_bytes();
    let mut found = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if (bytes[i] == b'L' || bytes[i] == b'S') && (i == 0 || !is_word_byte(bytes[i - 1])) {
            let mut j = i + 1;
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            let digits = j - i - 1;
            if digits >= ID_MIN_DIGITS
                && (j == bytes.len() || !is_word_byte(bytes[j]))
                && !listing_follows(&text[j..])
            {
                found.push(text[i..j].to_string());
            }
            i = j;
        } else {
            i += 1;
        }
    }
    found
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Whether the text after an id token reads as a record listing: an
/// optional closing bracket, spaces, then the rating glyph.
fn listing_follows(rest: &str) -> bool {
    let rest = rest.strip_prefix(']').unwrap_or(rest);
    let rest = rest.trim_start_matches(' ');
    leads_with_glyph(rest)
}
