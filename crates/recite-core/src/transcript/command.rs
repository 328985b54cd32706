//! Directive grammar for assistant output
//!
//! Directives are matched per line against a small fixed prefix table;
//! there is no pattern language. A line either starts with one of these
//! prefixes (case-insensitive, leading whitespace ignored) and parses
//! into a command, or it is ordinary prose:
//!
//! ```text
//! lesson: <title> -- <content>           optional leading (category)
//! lesson(system): <title> -- <content>
//! handoff: <title> -- <description>
//! handoff status: <id> <status>
//! handoff complete: <id>
//! handoff tried: <id> <outcome> <text>
//! handoff next: <id> <text>
//! ```

use std::str::FromStr;

use crate::record::{AttemptOutcome, Category, HandoffStatus, Scope};

/// A parsed transcript directive
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// Record a lesson from agent output
    AddLesson {
        scope: Scope,
        category: Category,
        title: String,
        content: String,
    },
    /// Record a handoff
    AddHandoff { title: String, description: String },
    /// Move a handoff to a non-terminal status
    SetStatus { id: String, status: HandoffStatus },
    /// Complete a handoff
    Complete { id: String },
    /// Append an attempt to a handoff's tried log
    Tried {
        id: String,
        outcome: AttemptOutcome,
        description: String,
    },
    /// Overwrite a handoff's next steps
    NextSteps { id: String, text: String },
}

type Builder = fn(&str) -> Option<Directive>;

/// The whole grammar. No prefix is a prefix of another, so first match
/// wins without ordering tricks.
const GRAMMAR: &[(&str, Builder)] = &[
    ("lesson(system):", build_system_lesson),
    ("lesson:", build_project_lesson),
    ("handoff status:", build_status),
    ("handoff complete:", build_complete),
    ("handoff tried:", build_tried),
    ("handoff next:", build_next),
    ("handoff:", build_handoff),
];

/// Parse one line against the grammar table. A matched prefix with a
/// payload that fails its builder yields `None`, same as prose.
pub fn parse_directive(line: &str) -> Option<Directive> {
    let line = line.trim_start();
    for (prefix, build) in GRAMMAR {
        if let Some(rest) = strip_prefix_ci(line, prefix) {
            return build(rest.trim());
        }
    }
    None
}

fn strip_prefix_ci<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let head = line.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &line[prefix.len()..])
}

// ----------------------------------------------------------------------
// Builders
// ----------------------------------------------------------------------

fn build_project_lesson(rest: &str) -> Option<Directive> {
    build_lesson(rest, Scope::Project)
}

fn build_system_lesson(rest: &str) -> Option<Directive> {
    build_lesson(rest, Scope::System)
}

fn build_lesson(rest: &str, scope: Scope) -> Option<Directive> {
    let (category, rest) = split_category(rest);
    let (title, content) = split_payload(rest);
    if title.is_empty() {
        return None;
    }
    Some(Directive::AddLesson {
        scope,
        category,
        title: title.to_string(),
        content: content.to_string(),
    })
}

fn build_handoff(rest: &str) -> Option<Directive> {
    let (title, description) = split_payload(rest);
    if title.is_empty() {
        return None;
    }
    Some(Directive::AddHandoff {
        title: title.to_string(),
        description: description.to_string(),
    })
}

fn build_status(rest: &str) -> Option<Directive> {
    let (id, rest) = split_word(rest)?;
    let status = HandoffStatus::parse_name(&rest.trim().replace(' ', "_"))?;
    Some(Directive::SetStatus {
        id: id.to_string(),
        status,
    })
}

fn build_complete(rest: &str) -> Option<Directive> {
    let id = rest.split_whitespace().next()?;
    Some(Directive::Complete { id: id.to_string() })
}

fn build_tried(rest: &str) -> Option<Directive> {
    let (id, rest) = split_word(rest)?;
    let (outcome, description) = split_word(rest)?;
    let outcome = AttemptOutcome::parse_name(outcome)?;
    Some(Directive::Tried {
        id: id.to_string(),
        outcome,
        description: description.to_string(),
    })
}

fn build_next(rest: &str) -> Option<Directive> {
    let (id, text) = split_word(rest)?;
    if text.is_empty() {
        return None;
    }
    Some(Directive::NextSteps {
        id: id.to_string(),
        text: text.to_string(),
    })
}

// ----------------------------------------------------------------------
// Payload splitting
// ----------------------------------------------------------------------

/// Strip a leading `(category)` marker when the name inside the parens
/// is a known category; unknown names leave the parens in the title.
fn split_category(rest: &str) -> (Category, &str) {
    if let Some(stripped) = rest.strip_prefix('(') {
        if let Some(end) = stripped.find(')') {
            if let Ok(category) = Category::from_str(stripped[..end].trim()) {
                return (category, stripped[end + 1..].trim_start());
            }
        }
    }
    (Category::default(), rest)
}

/// Split `<left> -- <right>`; without the separator everything is left.
/// A payload that opens with the separator has an empty left side.
fn split_payload(rest: &str) -> (&str, &str) {
    if let Some(right) = rest.strip_prefix("--") {
        return ("", right.trim());
    }
    match rest.split_once(" -- ") {
        Some((left, right)) => (left.trim(), right.trim()),
        None => (rest.trim(), ""),
    }
}

/// First whitespace-delimited word and the trimmed remainder.
fn split_word(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    if s.is_empty() {
        return None;
    }
    match s.split_once(char::is_whitespace) {
        Some((word, rest)) => Some((word, rest.trim_start())),
        None => Some((s, "")),
    }
}
