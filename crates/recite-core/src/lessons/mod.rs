//! Lessons module - Lesson operations over the locked store
//!
//! The mutating operations (add, cite, edit, delete, promote) each run
//! as one exclusive pass over the owning scope file. Promotion spans two
//! files and deliberately inserts into the destination before deleting
//! from the source: a crash between the passes duplicates a record
//! instead of losing one.

mod maintain;
mod view;

use chrono::{Local, NaiveDate};
use tracing::info;

use crate::codec::{max_id_stem, Document};
use crate::config::Config;
use crate::rating::{estimate_tokens, find_duplicate, ScoreEngine};
use crate::record::{Lesson, NewLesson, Scope, MAX_CONTENT_LEN, MAX_TITLE_LEN};
use crate::store::{FileStore, Result, StoreError};

pub use maintain::DecayReport;
pub use view::{InjectReport, LessonStats, ListFilter};

/// Headline written to a lessons file the first time it is created
const LESSONS_HEADLINE: &str = "# Lessons\n\n";

/// Outcome of a citation
#[derive(Debug, Clone)]
pub struct CiteOutcome {
    /// The record after the citation was applied
    pub lesson: Lesson,
    /// New system id when the citation triggered promotion
    pub promoted_to: Option<String>,
}

/// Field-wise patch for `edit`
#[derive(Debug, Clone, Default)]
pub struct LessonPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<crate::record::Category>,
    pub promotable: Option<bool>,
}

impl LessonPatch {
    fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.category.is_none()
            && self.promotable.is_none()
    }
}

// ============================================================================
// LESSON STORE
// ============================================================================

/// Record-level lesson operations bound to one configuration.
pub struct LessonStore {
    config: Config,
    store: FileStore,
    engine: ScoreEngine,
}

impl LessonStore {
    /// Create a lesson store for the given configuration
    pub fn new(config: Config) -> Self {
        let store = FileStore::with_timeout(config.lock_timeout);
        let engine = ScoreEngine::with_config(config.score_config());
        Self {
            config,
            store,
            engine,
        }
    }

    /// The configuration this store was built with
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn scope_path(&self, scope: Scope) -> std::path::PathBuf {
        match scope {
            Scope::Project => self.config.project_lessons_path(),
            Scope::System => self.config.system_lessons_path(),
        }
    }

    fn scope_of(&self, id: &str) -> Result<Scope> {
        Scope::of_id(id).ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Record a new lesson in the given scope.
    ///
    /// Titles and contents are trimmed and length-capped. Unless `force`
    /// is set, a title that near-duplicates an existing one in the same
    /// scope is rejected with [`StoreError::Duplicate`].
    pub fn add(&self, new: NewLesson, scope: Scope, force: bool) -> Result<Lesson> {
        let title = clamp(new.title.trim(), MAX_TITLE_LEN);
        let content = clamp(new.content.trim(), MAX_CONTENT_LEN);
        if title.is_empty() {
            return Err(StoreError::Config("lesson title must not be empty".into()));
        }

        let path = self.scope_path(scope);
        let today = today();
        self.store.with_lock(&path, |text| {
            let mut doc: Document<Lesson> = Document::decode(text);

            if !force {
                let titles: Vec<(&str, &str)> = doc
                    .records()
                    .map(|l| (l.id.as_str(), l.title.as_str()))
                    .collect();
                if let Some(hit) = find_duplicate(&title, titles.iter().map(|(_, t)| *t)) {
                    let id = titles
                        .iter()
                        .find(|(_, t)| *t == hit)
                        .map(|(id, _)| (*id).to_string())
                        .unwrap_or_default();
                    return Err(StoreError::Duplicate {
                        id,
                        title: hit.to_string(),
                    });
                }
            }

            let stem = max_id_stem(text, scope.id_prefix()) + 1;
            let lesson = Lesson {
                id: format!("{}{:03}", scope.id_prefix(), stem),
                tokens: estimate_tokens(&title, &content),
                title,
                content,
                category: new.category,
                uses: 1,
                velocity: 0.0,
                learned: today,
                last: today,
                source: new.source,
                promotable: new.promotable,
            };

            if doc.headline.is_empty() && doc.blocks.is_empty() {
                doc.headline = LESSONS_HEADLINE.to_string();
            }
            doc.push(lesson.clone());
            info!(id = %lesson.id, scope = %scope, "lesson recorded");
            Ok((lesson, Some(doc.encode())))
        })
    }

    /// Apply one citation to a lesson, promoting it when the citation
    /// carries it across the promotion threshold.
    pub fn cite(&self, id: &str) -> Result<CiteOutcome> {
        let scope = self.scope_of(id)?;
        let path = self.scope_path(scope);
        let today = today();

        let (lesson, crossed) = self.store.with_lock(&path, |text| {
            let mut doc: Document<Lesson> = Document::decode(text);
            let Some(lesson) = doc.records_mut().find(|l| l.id == id) else {
                return Err(StoreError::NotFound(id.to_string()));
            };
            let crossed = self.engine.cite(lesson, today);
            let snapshot = lesson.clone();
            Ok(((snapshot, crossed), Some(doc.encode())))
        })?;

        let promoted_to = if crossed {
            Some(self.promote(&lesson.id)?.id)
        } else {
            None
        };

        Ok(CiteOutcome {
            lesson,
            promoted_to,
        })
    }

    /// Edit a lesson in place. Tokens are re-estimated when the text
    /// changes; scores and dates are untouched.
    pub fn edit(&self, id: &str, patch: LessonPatch) -> Result<Lesson> {
        if patch.is_empty() {
            return self.get(id);
        }
        let scope = self.scope_of(id)?;
        let path = self.scope_path(scope);

        self.store.with_lock(&path, |text| {
            let mut doc: Document<Lesson> = Document::decode(text);
            let Some(lesson) = doc.records_mut().find(|l| l.id == id) else {
                return Err(StoreError::NotFound(id.to_string()));
            };

            if let Some(title) = &patch.title {
                let title = clamp(title.trim(), MAX_TITLE_LEN);
                if title.is_empty() {
                    return Err(StoreError::Config("lesson title must not be empty".into()));
                }
                lesson.title = title;
            }
            if let Some(content) = &patch.content {
                lesson.content = clamp(content.trim(), MAX_CONTENT_LEN);
            }
            if let Some(category) = patch.category {
                lesson.category = category;
            }
            if let Some(promotable) = patch.promotable {
                lesson.promotable = promotable;
            }
            lesson.tokens = estimate_tokens(&lesson.title, &lesson.content);

            let snapshot = lesson.clone();
            Ok((snapshot, Some(doc.encode())))
        })
    }

    /// Delete a lesson, returning the removed record.
    pub fn delete(&self, id: &str) -> Result<Lesson> {
        let scope = self.scope_of(id)?;
        let path = self.scope_path(scope);

        self.store.with_lock(&path, |text| {
            let mut doc: Document<Lesson> = Document::decode(text);
            let removed = doc
                .remove_record(|l| l.id == id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            info!(id = %removed.id, "lesson deleted");
            Ok((removed, Some(doc.encode())))
        })
    }

    /// Move a project lesson into system scope under a fresh `S` id,
    /// preserving its scores and history.
    ///
    /// Insert-into-destination runs before delete-from-source; there is
    /// no cross-file transaction to make the pair atomic.
    pub fn promote(&self, id: &str) -> Result<Lesson> {
        if self.scope_of(id)? != Scope::Project {
            return Err(StoreError::Config(format!(
                "{id} is already system scope"
            )));
        }
        let source = self.get(id)?;

        let system_path = self.config.system_lessons_path();
        let promoted = self.store.with_lock(&system_path, |text| {
            let mut doc: Document<Lesson> = Document::decode(text);
            let stem = max_id_stem(text, Scope::System.id_prefix()) + 1;
            let mut promoted = source.clone();
            promoted.id = format!("{}{:03}", Scope::System.id_prefix(), stem);
            if doc.headline.is_empty() && doc.blocks.is_empty() {
                doc.headline = LESSONS_HEADLINE.to_string();
            }
            doc.push(promoted.clone());
            Ok((promoted, Some(doc.encode())))
        })?;

        self.delete(id)?;
        info!(from = %id, to = %promoted.id, "lesson promoted to system scope");
        Ok(promoted)
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Fetch one lesson by id from an unlocked snapshot.
    pub fn get(&self, id: &str) -> Result<Lesson> {
        let scope = self.scope_of(id)?;
        let doc = self.load(scope)?;
        doc.records()
            .find(|l| l.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Snapshot-decode one scope file.
    pub(crate) fn load(&self, scope: Scope) -> Result<Document<Lesson>> {
        let text = self.store.read(&self.scope_path(scope))?;
        Ok(Document::decode(&text))
    }

    pub(crate) fn store(&self) -> &FileStore {
        &self.store
    }

    pub(crate) fn engine(&self) -> &ScoreEngine {
        &self.engine
    }
}

/// Truncate to a maximum byte length on a char boundary.
fn clamp(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

pub(crate) fn today() -> NaiveDate {
    Local::now().date_naive()
}
