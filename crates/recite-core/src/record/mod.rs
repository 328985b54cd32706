//! Record module - Core types and data structures
//!
//! The two record kinds the store persists:
//! - Lessons: scored, citable knowledge records
//! - Handoffs: tracked units of multi-step work

mod handoff;
mod lesson;

pub use handoff::{
    Attempt, AttemptOutcome, Handoff, HandoffContext, HandoffStatus, Phase, TodoItem, TodoState,
};
pub use lesson::{Category, Lesson, NewLesson, Scope, Source, MAX_CONTENT_LEN, MAX_TITLE_LEN};
