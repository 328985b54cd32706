//! Handoff block codec
//!
//! Canonical form:
//!
//! ```text
//! ### [H012-ab3f] Port the importer
//! - **Status**: in_progress | **Phase**: implementing | **Agent**: general-purpose | **Created**: 2026-01-10 | **Updated**: 2026-02-11
//! - **Refs**: src/a.rs, src/b.rs
//! - **Blocked-By**: H007-99c2
//! > Description of the work
//! **Tried**:
//! - [success] ran the repro
//! - [fail] patching upstream
//! **Next**: wire the retry path
//! **Checkpoint**: mid-way through extractor
//! ```
//!
//! plus an optional ```` ```context ```` fenced JSON attachment. The
//! refs, blocked-by, tried, next, checkpoint, and context pieces are all
//! optional. A block whose context fence is unclosed or whose JSON does
//! not parse is kept raw rather than losing the attachment on rewrite.

use chrono::NaiveDate;

use super::{meta_segments, parse_pair, single_line, Codec, BLOCK_HEADER_PREFIX};
use crate::record::{Attempt, AttemptOutcome, Handoff, HandoffContext, HandoffStatus, Phase};

const DATE_FMT: &str = "%Y-%m-%d";
const CONTEXT_FENCE_OPEN: &str = "```context";
const CONTEXT_FENCE_CLOSE: &str = "```";

fn is_handoff_id(id: &str) -> bool {
    match id.chars().next() {
        Some('H') | Some('h') => id.len() > 1,
        Some(c) => c.is_ascii_digit() && id.chars().all(|c| c.is_ascii_digit()),
        None => false,
    }
}

fn parse_date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, DATE_FMT).unwrap_or_default()
}

fn parse_id_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_attempt(line: &str) -> Option<Attempt> {
    let rest = line.trim_start().strip_prefix("- [")?;
    let close = rest.find(']')?;
    let outcome = AttemptOutcome::parse_name(&rest[..close])?;
    let description = rest[close + 1..].trim().to_string();
    Some(Attempt {
        outcome,
        description,
    })
}

impl Codec for Handoff {
    fn decode_block(block: &str) -> Option<Self> {
        let mut lines = block.lines();
        let header = lines.next()?;
        let rest = header.strip_prefix(BLOCK_HEADER_PREFIX)?;
        let close = rest.find(']')?;
        let id = &rest[..close];
        if !is_handoff_id(id) {
            return None;
        }
        let title = rest[close + 1..].trim().to_string();

        let mut handoff = Handoff {
            id: id.to_string(),
            title,
            description: String::new(),
            status: HandoffStatus::default(),
            phase: Phase::default(),
            agent: String::new(),
            created: NaiveDate::default(),
            updated: NaiveDate::default(),
            refs: Vec::new(),
            tried: Vec::new(),
            next_steps: String::new(),
            blocked_by: Vec::new(),
            checkpoint: String::new(),
            context: None,
        };

        let mut description_lines: Vec<&str> = Vec::new();
        let mut in_tried = false;
        let mut in_context = false;
        let mut context_closed = false;
        let mut context_lines: Vec<&str> = Vec::new();

        for line in lines {
            if in_context {
                if line.trim_end() == CONTEXT_FENCE_CLOSE {
                    in_context = false;
                    context_closed = true;
                } else {
                    context_lines.push(line);
                }
                continue;
            }

            if line.trim_end() == CONTEXT_FENCE_OPEN {
                in_context = true;
                in_tried = false;
            } else if let Some(text) = line.strip_prefix("> ") {
                description_lines.push(text);
            } else if line.trim_end() == ">" {
                description_lines.push("");
            } else if line.trim_start().starts_with("- **") {
                in_tried = false;
                for segment in meta_segments(line) {
                    if let Some((key, value)) = parse_pair(segment) {
                        match key {
                            "Status" => {
                                handoff.status =
                                    HandoffStatus::parse_name(value).unwrap_or_default();
                            }
                            "Phase" => {
                                handoff.phase = Phase::parse_name(value).unwrap_or_default();
                            }
                            "Agent" => handoff.agent = value.to_string(),
                            "Created" => handoff.created = parse_date(value),
                            "Updated" => handoff.updated = parse_date(value),
                            "Refs" => handoff.refs = parse_id_list(value),
                            "Blocked-By" => handoff.blocked_by = parse_id_list(value),
                            _ => {}
                        }
                    }
                }
            } else if line.trim_end() == "**Tried**:" {
                in_tried = true;
            } else if let Some(value) = line.strip_prefix("**Next**:") {
                in_tried = false;
                handoff.next_steps = value.trim().to_string();
            } else if let Some(value) = line.strip_prefix("**Checkpoint**:") {
                in_tried = false;
                handoff.checkpoint = value.trim().to_string();
            } else if in_tried {
                if let Some(attempt) = parse_attempt(line) {
                    handoff.tried.push(attempt);
                }
            }
        }

        // An opened fence must close inside the block, and its payload
        // must be real JSON; anything else stays raw so the attachment
        // survives the next rewrite.
        if in_context {
            return None;
        }
        if context_closed {
            let payload = context_lines.join("\n");
            match serde_json::from_str::<HandoffContext>(&payload) {
                Ok(context) => handoff.context = Some(context),
                Err(_) => return None,
            }
        }

        handoff.description = description_lines.join("\n");
        Some(handoff)
    }

    fn encode_block(&self) -> String {
        let mut out = String::with_capacity(256 + self.description.len());

        out.push_str(BLOCK_HEADER_PREFIX);
        out.push_str(&self.id);
        out.push_str("] ");
        out.push_str(&single_line(&self.title));
        out.push('\n');

        out.push_str(&format!(
            "- **Status**: {} | **Phase**: {} | **Agent**: {} | **Created**: {} | **Updated**: {}\n",
            self.status,
            self.phase,
            single_line(&self.agent),
            self.created.format(DATE_FMT),
            self.updated.format(DATE_FMT),
        ));
        if !self.refs.is_empty() {
            out.push_str(&format!("- **Refs**: {}\n", self.refs.join(", ")));
        }
        if !self.blocked_by.is_empty() {
            out.push_str(&format!("- **Blocked-By**: {}\n", self.blocked_by.join(", ")));
        }

        for line in self.description.lines() {
            if line.is_empty() {
                out.push_str(">\n");
            } else {
                out.push_str("> ");
                out.push_str(line);
                out.push('\n');
            }
        }

        if !self.tried.is_empty() {
            out.push_str("**Tried**:\n");
            for attempt in &self.tried {
                out.push_str(&format!(
                    "- [{}] {}\n",
                    attempt.outcome,
                    single_line(&attempt.description)
                ));
            }
        }
        if !self.next_steps.is_empty() {
            out.push_str(&format!("**Next**: {}\n", single_line(&self.next_steps)));
        }
        if !self.checkpoint.is_empty() {
            out.push_str(&format!(
                "**Checkpoint**: {}\n",
                single_line(&self.checkpoint)
            ));
        }

        if let Some(context) = &self.context {
            let payload = serde_json::to_string_pretty(context)
                .unwrap_or_else(|_| String::from("{}"));
            out.push_str(CONTEXT_FENCE_OPEN);
            out.push('\n');
            out.push_str(&payload);
            out.push('\n');
            out.push_str(CONTEXT_FENCE_CLOSE);
            out.push('\n');
        }

        out
    }
}
