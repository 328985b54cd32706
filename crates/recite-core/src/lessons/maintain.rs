//! Periodic maintenance: decay runs and eviction
//!
//! Hooks trigger `decay` on their own schedule (typically session
//! start). A run erodes every stale record in both scopes, trims the
//! project file back under its record bound, and rewrites the last-run
//! stamp. Vacation mode turns the whole run into a stamp rewrite when no
//! checkpoint was touched since the previous run, so a week away from
//! the keyboard does not read as a week of irrelevance.

use std::time::SystemTime;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, warn};

use super::{today, LessonStore};
use crate::codec::Document;
use crate::record::{Lesson, Scope};
use crate::store::{write_atomic, Result};

/// Outcome of one decay run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecayReport {
    /// Whether the run was skipped as a vacation no-op
    pub vacation: bool,
    /// Records whose scores were eroded
    pub decayed: usize,
    /// Records evicted from the project file
    pub evicted: usize,
}

impl LessonStore {
    /// Run one decay pass over both scope files.
    pub fn decay(&self) -> Result<DecayReport> {
        let now = Utc::now();

        if self.is_vacation()? {
            debug!("no session activity since last run, skipping decay");
            self.stamp_decay_run(now)?;
            return Ok(DecayReport {
                vacation: true,
                decayed: 0,
                evicted: 0,
            });
        }

        let today = today();
        let mut decayed = 0;
        for scope in [Scope::Project, Scope::System] {
            decayed += self.decay_scope(scope, today)?;
        }
        let evicted = self.evict_overflow()?;

        self.stamp_decay_run(now)?;
        Ok(DecayReport {
            vacation: false,
            decayed,
            evicted,
        })
    }

    /// Whether the period since the last run shows no session activity.
    ///
    /// Activity evidence is any checkpoint file modified at or after the
    /// last-run stamp. A missing or unreadable stamp means the store has
    /// never decayed, and the run proceeds.
    fn is_vacation(&self) -> Result<bool> {
        let stamp_path = self.config().last_decay_path();
        let stamp = match std::fs::read_to_string(&stamp_path) {
            Ok(text) => match text.trim().parse::<DateTime<Utc>>() {
                Ok(stamp) => stamp,
                Err(_) => {
                    warn!(path = %stamp_path.display(), "unreadable decay stamp, proceeding");
                    return Ok(false);
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        let since: SystemTime = stamp.into();

        let dir = self.config().checkpoints_dir();
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(true),
            Err(e) => return Err(e.into()),
        };
        for entry in entries {
            let entry = entry?;
            if let Ok(modified) = entry.metadata().and_then(|m| m.modified()) {
                if modified >= since {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    /// Two-phase decay over one scope file: survey stale ids from a
    /// snapshot, then erode those ids under the lock. Records that turn
    /// stale between the phases wait for the next run; records cited in
    /// between are left alone.
    fn decay_scope(&self, scope: Scope, today: NaiveDate) -> Result<usize> {
        let stale_days = self.config().stale_days;
        let survey: Vec<String> = self
            .load(scope)?
            .records()
            .filter(|l| l.is_stale(today, stale_days))
            .map(|l| l.id.clone())
            .collect();
        if survey.is_empty() {
            return Ok(0);
        }

        let path = match scope {
            Scope::Project => self.config().project_lessons_path(),
            Scope::System => self.config().system_lessons_path(),
        };
        self.store().with_lock(&path, |text| {
            let mut doc: Document<Lesson> = Document::decode(text);
            let mut touched = 0;
            for id in &survey {
                if let Some(lesson) = doc.records_mut().find(|l| &l.id == id) {
                    if lesson.is_stale(today, stale_days) {
                        self.engine().decay(lesson);
                        touched += 1;
                    }
                }
            }
            if touched == 0 {
                Ok((0, None))
            } else {
                Ok((touched, Some(doc.encode())))
            }
        })
    }

    /// Trim the project file back under the record bound by dropping the
    /// lowest-rated, longest-uncited records first.
    fn evict_overflow(&self) -> Result<usize> {
        let max = self.config().max_lessons;
        let snapshot = self.load(Scope::Project)?;
        let count = snapshot.record_count();
        if count <= max {
            return Ok(0);
        }

        let mut ranked: Vec<&Lesson> = snapshot.records().collect();
        ranked.sort_by(|a, b| {
            a.rating_score()
                .partial_cmp(&b.rating_score())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.last.cmp(&b.last))
                .then(a.id.cmp(&b.id))
        });
        let victims: Vec<String> = ranked
            .iter()
            .take(count - max)
            .map(|l| l.id.clone())
            .collect();

        let path = self.config().project_lessons_path();
        self.store().with_lock(&path, |text| {
            let mut doc: Document<Lesson> = Document::decode(text);
            let mut over = doc.record_count().saturating_sub(max);
            let mut evicted = 0;
            for id in &victims {
                if over == 0 {
                    break;
                }
                if let Some(removed) = doc.remove_record(|l| &l.id == id) {
                    warn!(id = %removed.id, title = %removed.title, "lesson evicted");
                    over -= 1;
                    evicted += 1;
                }
            }
            if evicted == 0 {
                Ok((0, None))
            } else {
                Ok((evicted, Some(doc.encode())))
            }
        })
    }

    fn stamp_decay_run(&self, now: DateTime<Utc>) -> Result<()> {
        let path = self.config().last_decay_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        write_atomic(&path, &format!("{}\n", now.to_rfc3339()))
    }
}
