//! Todo-list mirroring and blocked-by inference
//!
//! Agent tools keep their own todo lists; handoffs mirror them so the
//! work survives the session. Sync is one-way per call and idempotent:
//! completed items land in the tried log at most once, the in-progress
//! item becomes the checkpoint, pending items become next steps. The
//! inverse derivation rebuilds a todo list from those same fields for
//! injection into a fresh session.

use tracing::debug;

use super::HandoffStore;
use crate::record::{Attempt, AttemptOutcome, Handoff, TodoItem, TodoState};
use crate::store::Result;

/// Separator used when joining pending todos into `next_steps`
const PENDING_JOIN: &str = "; ";

impl HandoffStore {
    /// Mirror an external todo list into one handoff.
    ///
    /// - every `completed` item appends a `tried: success` entry unless
    ///   one with the same description and outcome already exists;
    /// - the first `in_progress` item, if any, overwrites `checkpoint`;
    /// - all `pending` items, joined with `; `, overwrite `next_steps`.
    ///
    /// Running the same sync twice changes nothing the second time.
    pub fn sync_todos(&self, query: &str, items: &[TodoItem]) -> Result<Handoff> {
        self.mutate(query, |handoff| {
            for item in items.iter().filter(|i| i.status == TodoState::Completed) {
                let exists = handoff.tried.iter().any(|a| {
                    a.outcome == AttemptOutcome::Success && a.description == item.content
                });
                if !exists {
                    handoff.tried.push(Attempt {
                        outcome: AttemptOutcome::Success,
                        description: item.content.clone(),
                    });
                }
            }

            if let Some(current) = items.iter().find(|i| i.status == TodoState::InProgress) {
                handoff.checkpoint = current.content.clone();
            }

            let pending: Vec<&str> = items
                .iter()
                .filter(|i| i.status == TodoState::Pending)
                .map(|i| i.content.as_str())
                .collect();
            handoff.next_steps = pending.join(PENDING_JOIN);

            merge_inferred_blockers(handoff);
            Ok(())
        })
    }

    /// Rebuild a todo list from a handoff, the inverse of [`sync_todos`]:
    /// successful attempts read as completed, the checkpoint as the one
    /// in-progress item, and each `; `-separated next step as pending.
    ///
    /// [`sync_todos`]: HandoffStore::sync_todos
    pub fn inject_todos(&self, query: &str) -> Result<Vec<TodoItem>> {
        let handoff = self.get(query)?;
        let mut items = Vec::new();

        for attempt in handoff
            .tried
            .iter()
            .filter(|a| a.outcome == AttemptOutcome::Success)
        {
            items.push(TodoItem {
                content: attempt.description.clone(),
                status: TodoState::Completed,
            });
        }
        if !handoff.checkpoint.is_empty() {
            items.push(TodoItem {
                content: handoff.checkpoint.clone(),
                status: TodoState::InProgress,
            });
        }
        for step in handoff
            .next_steps
            .split(PENDING_JOIN)
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            items.push(TodoItem {
                content: step.to_string(),
                status: TodoState::Pending,
            });
        }

        Ok(items)
    }
}

/// Scan free text for phrases that reference other handoffs:
/// "waiting for X", "blocked by X", "depends on X", "after X completes",
/// where X is a handoff id token (`H7`, `H007-a3f9`).
pub fn infer_blocked_by(text: &str) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut found = Vec::new();

    for (i, word) in words.iter().enumerate() {
        let keyword = word
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        let captured = match keyword.as_str() {
            "waiting" if keyword_at(&words, i + 1, "for") => id_at(&words, i + 2),
            "blocked" if keyword_at(&words, i + 1, "by") => id_at(&words, i + 2),
            "depends" if keyword_at(&words, i + 1, "on") => id_at(&words, i + 2),
            "after" if keyword_at(&words, i + 2, "completes") => id_at(&words, i + 1),
            _ => None,
        };
        if let Some(id) = captured {
            if !found.contains(&id) {
                found.push(id);
            }
        }
    }

    found
}

/// Merge ids inferred from `next_steps` into `blocked_by`, additively.
/// Self-references and entries already present (by stem) are skipped.
pub(super) fn merge_inferred_blockers(handoff: &mut Handoff) {
    let own_stem = Handoff::id_stem(&handoff.id);
    for id in infer_blocked_by(&handoff.next_steps) {
        let stem = Handoff::id_stem(&id);
        if stem.is_some() && stem == own_stem {
            continue;
        }
        let already = handoff
            .blocked_by
            .iter()
            .any(|b| b == &id || Handoff::id_stem(b) == stem);
        if !already {
            debug!(id = %handoff.id, blocker = %id, "inferred blocked-by from next steps");
            handoff.blocked_by.push(id);
        }
    }
}

fn keyword_at(words: &[&str], i: usize, expected: &str) -> bool {
    words.get(i).is_some_and(|w| {
        w.trim_matches(|c: char| !c.is_alphanumeric())
            .eq_ignore_ascii_case(expected)
    })
}

fn id_at(words: &[&str], i: usize) -> Option<String> {
    let token = words.get(i)?.trim_matches(|c: char| !(c.is_alphanumeric() || c == '-'));
    parse_handoff_id(token)
}

/// Accept `H7` and `H007-a3f9` shapes; anything else is prose.
fn parse_handoff_id(token: &str) -> Option<String> {
    let rest = token.strip_prefix(['H', 'h'])?;
    let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    let tail = &rest[digits..];
    let tail_ok = tail.is_empty()
        || (tail.starts_with('-')
            && tail.len() > 1
            && tail[1..].chars().all(|c| c.is_ascii_alphanumeric()));
    tail_ok.then(|| token.to_string())
}
