//! Lesson block codec
//!
//! Canonical form:
//!
//! ```text
//! ### [L007] [***--|****+] Fix the cache key ordering
//! - **Uses**: 6 | **Velocity**: 5.00 | **Tokens**: 42 | **Learned**: 2026-01-03 | **Last**: 2026-02-11 | **Source**: user | **Category**: gotcha | (no-promote)
//! > Content line one
//! > Content line two
//! ```
//!
//! Decode is tolerant: metadata pairs may appear in any order, unknown
//! keys are ignored, missing keys take their zero value and get
//! backfilled on the next encode. `**Score**` is accepted as a legacy
//! alias for `**Uses**`. The header glyph is display-only and is
//! recomputed from the scores on encode.

use chrono::NaiveDate;

use super::{meta_segments, parse_pair, single_line, Codec, BLOCK_HEADER_PREFIX};
use crate::rating::{leads_with_glyph, render_glyph, GLYPH_LEN};
use crate::record::{Category, Lesson, Source};

const NO_PROMOTE_FLAG: &str = "(no-promote)";
const DATE_FMT: &str = "%Y-%m-%d";

fn is_lesson_id(id: &str) -> bool {
    let mut chars = id.chars();
    matches!(chars.next(), Some('L') | Some('S'))
        && id.len() > 1
        && chars.all(|c| c.is_ascii_digit())
}

fn parse_date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, DATE_FMT).unwrap_or_default()
}

impl Codec for Lesson {
    fn decode_block(block: &str) -> Option<Self> {
        let mut lines = block.lines();
        let header = lines.next()?;
        let rest = header.strip_prefix(BLOCK_HEADER_PREFIX)?;
        let close = rest.find(']')?;
        let id = &rest[..close];
        if !is_lesson_id(id) {
            return None;
        }

        let mut tail = rest[close + 1..].trim_start();
        if leads_with_glyph(tail) {
            tail = tail[GLYPH_LEN..].trim_start();
        }
        let title = tail.trim_end().to_string();

        let mut lesson = Lesson {
            id: id.to_string(),
            title,
            content: String::new(),
            category: Category::default(),
            uses: 0,
            velocity: 0.0,
            tokens: 0,
            learned: NaiveDate::default(),
            last: NaiveDate::default(),
            source: Source::default(),
            promotable: true,
        };

        let mut content_lines: Vec<&str> = Vec::new();
        for line in lines {
            if let Some(text) = line.strip_prefix("> ") {
                content_lines.push(text);
            } else if line.trim_end() == ">" {
                content_lines.push("");
            } else if line.trim_start().starts_with('-') {
                for segment in meta_segments(line) {
                    match parse_pair(segment) {
                        Some(("Uses", v)) | Some(("Score", v)) => {
                            lesson.uses = v.parse().unwrap_or(0);
                        }
                        Some(("Velocity", v)) => lesson.velocity = v.parse().unwrap_or(0.0),
                        Some(("Tokens", v)) => lesson.tokens = v.parse().unwrap_or(0),
                        Some(("Learned", v)) => lesson.learned = parse_date(v),
                        Some(("Last", v)) => lesson.last = parse_date(v),
                        Some(("Source", v)) => lesson.source = Source::parse_name(v),
                        Some(("Category", v)) => lesson.category = Category::parse_name(v),
                        Some(_) => {}
                        None => {
                            if segment == NO_PROMOTE_FLAG {
                                lesson.promotable = false;
                            }
                        }
                    }
                }
            }
        }
        lesson.content = content_lines.join("\n");

        Some(lesson)
    }

    fn encode_block(&self) -> String {
        let mut out = String::with_capacity(128 + self.content.len());

        out.push_str(BLOCK_HEADER_PREFIX);
        out.push_str(&self.id);
        out.push_str("] ");
        out.push_str(&render_glyph(self.uses, self.velocity));
        out.push(' ');
        out.push_str(&single_line(&self.title));
        out.push('\n');

        // Two decimals: with coarser precision, repeated decay runs
        // round back to their input and never reach the epsilon snap.
        out.push_str(&format!(
            "- **Uses**: {} | **Velocity**: {:.2} | **Tokens**: {} | **Learned**: {} | **Last**: {} | **Source**: {} | **Category**: {}",
            self.uses,
            self.velocity,
            self.tokens,
            self.learned.format(DATE_FMT),
            self.last.format(DATE_FMT),
            self.source,
            self.category,
        ));
        if !self.promotable {
            out.push_str(" | ");
            out.push_str(NO_PROMOTE_FLAG);
        }
        out.push('\n');

        for line in self.content.lines() {
            if line.is_empty() {
                out.push_str(">\n");
            } else {
                out.push_str("> ");
                out.push_str(line);
                out.push('\n');
            }
        }

        out
    }
}
