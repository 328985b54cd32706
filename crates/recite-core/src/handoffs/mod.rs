//! Handoffs module - Handoff state machine over the locked store
//!
//! Handoffs live in one active file per project plus an append-only
//! archive. Completion is terminal: the only way in is `complete`, and
//! later status updates are rejected rather than silently applied.
//! Completed records linger in the active file while the retention rule
//! keeps them visible, then `archive` moves them out wholesale.

mod todos;

use chrono::NaiveDate;
use tracing::info;
use uuid::Uuid;

use crate::codec::{max_id_stem, Document};
use crate::config::Config;
use crate::lessons::today;
use crate::record::{
    Attempt, AttemptOutcome, Handoff, HandoffContext, HandoffStatus, Phase,
};
use crate::store::{FileStore, Result, StoreError};

pub use todos::infer_blocked_by;

/// Completed handoffs kept visible regardless of age
pub const KEEP_RECENT_COMPLETED: usize = 3;

/// Days a completion stays visible regardless of how many followed it
pub const COMPLETED_RETENTION_DAYS: i64 = 7;

/// Headline written to a handoffs file the first time it is created
const HANDOFFS_HEADLINE: &str = "# Handoffs\n\n";

/// Headline for the archive file
const ARCHIVE_HEADLINE: &str = "# Handoffs Archive\n\n";

/// Field-wise patch for `update`
#[derive(Debug, Clone, Default)]
pub struct HandoffPatch {
    pub status: Option<HandoffStatus>,
    pub phase: Option<Phase>,
    pub agent: Option<String>,
    pub next_steps: Option<String>,
    pub checkpoint: Option<String>,
    pub refs: Option<Vec<String>>,
    pub blocked_by: Option<Vec<String>>,
}

/// Input for recording a new handoff
#[derive(Debug, Clone, Default)]
pub struct NewHandoff {
    pub title: String,
    pub description: String,
    pub agent: Option<String>,
    pub phase: Option<Phase>,
}

/// Active handoffs selected for context injection
#[derive(Debug, Clone)]
pub struct HandoffInjectReport {
    /// The retention view, file order
    pub handoffs: Vec<Handoff>,
    /// Id of the handoff the agent should pick up, when one qualifies
    pub continue_hint: Option<String>,
}

// ============================================================================
// HANDOFF STORE
// ============================================================================

/// Record-level handoff operations bound to one configuration.
pub struct HandoffStore {
    config: Config,
    store: FileStore,
}

impl HandoffStore {
    /// Create a handoff store for the given configuration
    pub fn new(config: Config) -> Self {
        let store = FileStore::with_timeout(config.lock_timeout);
        Self { config, store }
    }

    /// The configuration this store was built with
    pub fn config(&self) -> &Config {
        &self.config
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Record a new handoff. Ids are a monotonic stem plus a short
    /// random suffix (`H012-ab3f`), so two sessions minting the same
    /// stem concurrently still produce distinguishable records.
    pub fn add(&self, new: NewHandoff) -> Result<Handoff> {
        let title = new.title.trim().to_string();
        if title.is_empty() {
            return Err(StoreError::Config("handoff title must not be empty".into()));
        }
        let today = today();
        let path = self.config.handoffs_path();

        self.store.with_lock(&path, |text| {
            let mut doc: Document<Handoff> = Document::decode(text);
            let stem = max_id_stem(text, 'H') + 1;
            let suffix = short_suffix();
            let handoff = Handoff {
                id: format!("H{stem:03}-{suffix}"),
                title,
                description: new.description.trim().to_string(),
                status: HandoffStatus::NotStarted,
                phase: new.phase.unwrap_or_default(),
                agent: new.agent.unwrap_or_else(|| "general-purpose".to_string()),
                created: today,
                updated: today,
                refs: Vec::new(),
                tried: Vec::new(),
                next_steps: String::new(),
                blocked_by: Vec::new(),
                checkpoint: String::new(),
                context: None,
            };
            if doc.headline.is_empty() && doc.blocks.is_empty() {
                doc.headline = HANDOFFS_HEADLINE.to_string();
            }
            doc.push(handoff.clone());
            info!(id = %handoff.id, "handoff recorded");
            Ok((handoff, Some(doc.encode())))
        })
    }

    /// Apply a field patch. Status changes on a completed handoff are
    /// rejected; everything else stays editable so late context still
    /// lands.
    pub fn update(&self, query: &str, patch: HandoffPatch) -> Result<Handoff> {
        self.mutate(query, |handoff| {
            if let Some(status) = patch.status {
                if handoff.is_completed() && status != HandoffStatus::Completed {
                    return Err(StoreError::Config(format!(
                        "{} is completed; completion is terminal",
                        handoff.id
                    )));
                }
                if status == HandoffStatus::Completed && !handoff.is_completed() {
                    return Err(StoreError::Config(format!(
                        "use complete to finish {}",
                        handoff.id
                    )));
                }
                handoff.status = status;
            }
            if let Some(phase) = patch.phase {
                handoff.phase = phase;
            }
            if let Some(agent) = &patch.agent {
                handoff.agent = agent.clone();
            }
            if let Some(checkpoint) = &patch.checkpoint {
                handoff.checkpoint = checkpoint.clone();
            }
            if let Some(refs) = &patch.refs {
                handoff.refs = refs.clone();
            }
            if let Some(blocked_by) = &patch.blocked_by {
                handoff.blocked_by = blocked_by.clone();
            }
            if let Some(next_steps) = &patch.next_steps {
                handoff.next_steps = next_steps.clone();
                todos::merge_inferred_blockers(handoff);
            }
            Ok(())
        })
    }

    /// Append one attempt to the tried log.
    pub fn tried(&self, query: &str, outcome: AttemptOutcome, description: &str) -> Result<Handoff> {
        let description = description.trim().to_string();
        self.mutate(query, |handoff| {
            handoff.tried.push(Attempt {
                outcome,
                description: description.clone(),
            });
            Ok(())
        })
    }

    /// Attach (or replace) the structured context payload.
    pub fn attach_context(&self, query: &str, context: HandoffContext) -> Result<Handoff> {
        self.mutate(query, |handoff| {
            handoff.context = Some(context.clone());
            Ok(())
        })
    }

    /// Mark a handoff completed. Terminal, and idempotent so a
    /// double-firing hook does not error.
    pub fn complete(&self, query: &str) -> Result<Handoff> {
        self.mutate(query, |handoff| {
            if !handoff.is_completed() {
                handoff.status = HandoffStatus::Completed;
                info!(id = %handoff.id, "handoff completed");
            }
            Ok(())
        })
    }

    /// Delete a handoff outright, returning the removed record.
    pub fn delete(&self, query: &str) -> Result<Handoff> {
        let path = self.config.handoffs_path();
        self.store.with_lock(&path, |text| {
            let mut doc: Document<Handoff> = Document::decode(text);
            let removed = doc
                .remove_record(|h| h.matches_id(query))
                .ok_or_else(|| StoreError::NotFound(query.to_string()))?;
            info!(id = %removed.id, "handoff deleted");
            Ok((removed, Some(doc.encode())))
        })
    }

    /// Move completed handoffs that fell out of the retention view into
    /// the archive file. Insert-into-archive runs before delete, the
    /// same trade promotion makes.
    pub fn archive(&self) -> Result<usize> {
        let today = today();
        let snapshot = self.load()?;
        let keep = retention_keep_set(snapshot.records(), today);
        let retire: Vec<String> = snapshot
            .records()
            .filter(|h| h.is_completed() && !keep.contains(&h.id))
            .map(|h| h.id.clone())
            .collect();
        if retire.is_empty() {
            return Ok(0);
        }

        let to_move: Vec<Handoff> = snapshot
            .records()
            .filter(|h| retire.contains(&h.id))
            .cloned()
            .collect();

        let archive_path = self.config.handoffs_archive_path();
        self.store.with_lock(&archive_path, |text| {
            let mut doc: Document<Handoff> = Document::decode(text);
            if doc.headline.is_empty() && doc.blocks.is_empty() {
                doc.headline = ARCHIVE_HEADLINE.to_string();
            }
            for handoff in &to_move {
                doc.push(handoff.clone());
            }
            Ok(((), Some(doc.encode())))
        })?;

        let path = self.config.handoffs_path();
        let moved = self.store.with_lock(&path, |text| {
            let mut doc: Document<Handoff> = Document::decode(text);
            let removed = doc.drain_records(|h| retire.contains(&h.id));
            let count = removed.len();
            if count == 0 {
                Ok((0, None))
            } else {
                Ok((count, Some(doc.encode())))
            }
        })?;

        info!(count = moved, "handoffs archived");
        Ok(moved)
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Fetch one handoff by exact id, stem, or legacy numeric form.
    pub fn get(&self, query: &str) -> Result<Handoff> {
        self.load()?
            .records()
            .find(|h| h.matches_id(query))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(query.to_string()))
    }

    /// All records in the active file, file order.
    pub fn list(&self) -> Result<Vec<Handoff>> {
        Ok(self.load()?.records().cloned().collect())
    }

    /// All records in the archive file, file order.
    pub fn list_archive(&self) -> Result<Vec<Handoff>> {
        let text = self.store.read(&self.config.handoffs_archive_path())?;
        Ok(Document::<Handoff>::decode(&text)
            .records()
            .cloned()
            .collect())
    }

    /// The working view: every non-completed handoff, plus completed
    /// ones still covered by the retention rule (the most recent
    /// completions and the recently completed, as a union).
    pub fn active_view(&self) -> Result<Vec<Handoff>> {
        let today = today();
        let doc = self.load()?;
        let keep = retention_keep_set(doc.records(), today);
        Ok(doc
            .records()
            .filter(|h| !h.is_completed() || keep.contains(&h.id))
            .cloned()
            .collect())
    }

    /// Select handoffs for context injection and pick the continue hint:
    /// the most recently updated non-completed handoff that is not
    /// waiting on an uncompleted one.
    pub fn inject(&self) -> Result<HandoffInjectReport> {
        let view = self.active_view()?;
        let all = self.list()?;

        let mut candidates: Vec<&Handoff> = view
            .iter()
            .filter(|h| !h.is_completed())
            .filter(|h| {
                h.blocked_by.iter().all(|dep| {
                    // A dependency blocks only while it exists and is
                    // not completed.
                    match all.iter().find(|other| other.matches_id(dep)) {
                        Some(other) => other.is_completed(),
                        None => true,
                    }
                })
            })
            .collect();
        candidates.sort_by(|a, b| {
            b.updated
                .cmp(&a.updated)
                .then(Handoff::id_stem(&b.id).cmp(&Handoff::id_stem(&a.id)))
        });
        let continue_hint = candidates.first().map(|h| h.id.clone());

        Ok(HandoffInjectReport {
            handoffs: view,
            continue_hint,
        })
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    pub(crate) fn load(&self) -> Result<Document<Handoff>> {
        let text = self.store.read(&self.config.handoffs_path())?;
        Ok(Document::decode(&text))
    }

    /// One locked read-modify-write pass over a single handoff. Bumps
    /// `updated` whenever the closure succeeds.
    pub(crate) fn mutate<F>(&self, query: &str, f: F) -> Result<Handoff>
    where
        F: Fn(&mut Handoff) -> Result<()>,
    {
        let path = self.config.handoffs_path();
        let today = today();
        self.store.with_lock(&path, |text| {
            let mut doc: Document<Handoff> = Document::decode(text);
            let Some(handoff) = doc.records_mut().find(|h| h.matches_id(query)) else {
                return Err(StoreError::NotFound(query.to_string()));
            };
            f(handoff)?;
            handoff.updated = today;
            let snapshot = handoff.clone();
            Ok((snapshot, Some(doc.encode())))
        })
    }
}

/// Ids of completed handoffs the retention rule keeps visible: the
/// `KEEP_RECENT_COMPLETED` most recent completions, unioned with every
/// completion fresher than `COMPLETED_RETENTION_DAYS`.
fn retention_keep_set<'a>(
    records: impl Iterator<Item = &'a Handoff>,
    today: NaiveDate,
) -> Vec<String> {
    let mut completed: Vec<&Handoff> = records.filter(|h| h.is_completed()).collect();
    completed.sort_by(|a, b| {
        b.updated
            .cmp(&a.updated)
            .then(Handoff::id_stem(&b.id).cmp(&Handoff::id_stem(&a.id)))
    });

    let mut keep: Vec<String> = Vec::new();
    for (i, handoff) in completed.iter().enumerate() {
        let recent_enough = (today - handoff.updated).num_days() <= COMPLETED_RETENTION_DAYS;
        if i < KEEP_RECENT_COMPLETED || recent_enough {
            keep.push(handoff.id.clone());
        }
    }
    keep
}

fn short_suffix() -> String {
    let id = Uuid::new_v4().simple().to_string();
    id[..4].to_string()
}

impl HandoffInjectReport {
    /// Render the payload a hook feeds into agent context.
    pub fn to_markdown(&self) -> String {
        if self.handoffs.is_empty() {
            return String::new();
        }
        let mut out = String::from("## Handoffs\n\n");
        for h in &self.handoffs {
            out.push_str(&format!(
                "- [{}] ({}/{}) {}",
                h.id, h.status, h.phase, h.title
            ));
            if !h.next_steps.is_empty() {
                out.push_str(&format!(" — next: {}", h.next_steps));
            }
            out.push('\n');
        }
        if let Some(hint) = &self.continue_hint {
            out.push_str(&format!("\nContinue: [{hint}]\n"));
        }
        out
    }
}
