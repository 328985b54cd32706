//! Read-side lesson views: list, inject, stats
//!
//! Everything here works from unlocked snapshot reads and never writes.

use serde::Serialize;

use super::{today, LessonStore};
use crate::rating::render_glyph;
use crate::record::{Category, Lesson, Scope};
use crate::store::Result;

/// Filters for `list`
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    /// Restrict to one scope
    pub scope: Option<Scope>,
    /// Restrict to one category
    pub category: Option<Category>,
    /// Case-insensitive substring over title and content
    pub search: Option<String>,
    /// Keep only lessons past the stale-age threshold
    pub stale_only: bool,
}

/// Lessons selected for context injection
#[derive(Debug, Clone)]
pub struct InjectReport {
    /// Selected lessons, highest rating first
    pub lessons: Vec<Lesson>,
    /// Estimated token footprint of the selection
    pub total_tokens: u32,
    /// Whether the selection crosses the heavy-context threshold
    pub heavy: bool,
}

impl InjectReport {
    /// Render the payload a hook feeds into agent context.
    ///
    /// Each line carries the id, the rating glyph, the title, and the
    /// content flattened to one line. The glyph directly after the id
    /// is what lets the transcript extractor tell this listing apart
    /// from a genuine citation later in the session.
    pub fn to_markdown(&self) -> String {
        if self.lessons.is_empty() {
            return String::new();
        }
        let mut out = String::from("## Lessons\n\n");
        for lesson in &self.lessons {
            out.push_str(&format!(
                "- [{}] {} {} — {}\n",
                lesson.id,
                render_glyph(lesson.uses, lesson.velocity),
                lesson.title,
                lesson.content.replace('\n', " "),
            ));
        }
        if self.heavy {
            out.push_str(&format!(
                "\n_Heavy lesson context (~{} tokens); prune stale records or let decay evict._\n",
                self.total_tokens
            ));
        }
        out
    }
}

/// Aggregate counts for the stats display
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonStats {
    pub project_count: usize,
    pub system_count: usize,
    pub raw_blocks: usize,
    pub total_uses: u64,
    pub total_tokens: u64,
    pub stale_count: usize,
}

impl LessonStore {
    /// List lessons across both scopes, project file first, in file
    /// order, narrowed by the filter.
    pub fn list(&self, filter: &ListFilter) -> Result<Vec<Lesson>> {
        let today = today();
        let stale_days = self.config().stale_days;
        let needle = filter.search.as_ref().map(|s| s.to_lowercase());

        let mut out = Vec::new();
        for scope in [Scope::Project, Scope::System] {
            if filter.scope.is_some_and(|s| s != scope) {
                continue;
            }
            let doc = self.load(scope)?;
            for lesson in doc.records() {
                if filter.category.is_some_and(|c| c != lesson.category) {
                    continue;
                }
                if filter.stale_only && !lesson.is_stale(today, stale_days) {
                    continue;
                }
                if let Some(needle) = &needle {
                    let haystack =
                        format!("{} {}", lesson.title, lesson.content).to_lowercase();
                    if !haystack.contains(needle) {
                        continue;
                    }
                }
                out.push(lesson.clone());
            }
        }
        Ok(out)
    }

    /// Select the top `limit` lessons by rating for context injection.
    pub fn inject(&self, limit: usize) -> Result<InjectReport> {
        let mut lessons = self.list(&ListFilter::default())?;
        lessons.sort_by(|a, b| {
            b.rating_score()
                .partial_cmp(&a.rating_score())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.last.cmp(&a.last))
                .then(a.id.cmp(&b.id))
        });
        lessons.truncate(limit);

        let total_tokens = lessons.iter().map(|l| l.tokens).sum();
        Ok(InjectReport {
            heavy: total_tokens > self.config().token_warn,
            total_tokens,
            lessons,
        })
    }

    /// Aggregate counts across both scopes.
    pub fn stats(&self) -> Result<LessonStats> {
        let today = today();
        let stale_days = self.config().stale_days;

        let project = self.load(Scope::Project)?;
        let system = self.load(Scope::System)?;
        let all = || project.records().chain(system.records());

        Ok(LessonStats {
            project_count: project.record_count(),
            system_count: system.record_count(),
            raw_blocks: project.raw_count() + system.raw_count(),
            total_uses: all().map(|l| l.uses as u64).sum(),
            total_tokens: all().map(|l| l.tokens as u64).sum(),
            stale_count: all().filter(|l| l.is_stale(today, stale_days)).count(),
        })
    }
}
