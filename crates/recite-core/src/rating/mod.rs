//! Rating module - Dual-score rating engine
//!
//! Pure calculation layer for the lesson rating model:
//! - `score`: citation and decay arithmetic over the uses/velocity pair
//! - `glyph`: the fixed-width display glyph and its detection
//! - `dedup`: the containment heuristic for near-duplicate titles
//!
//! Nothing in this module touches storage.

mod dedup;
mod glyph;
mod score;

pub use dedup::{find_duplicate, is_duplicate, normalize_title, titles_match};
pub use glyph::{leads_with_glyph, render_glyph, GLYPH_LEN, USES_THRESHOLDS, VELOCITY_THRESHOLDS};
pub use score::{
    estimate_tokens, ScoreConfig, ScoreEngine, CITE_INCREMENT, DEFAULT_DECAY_FACTOR,
    DEFAULT_PROMOTE_THRESHOLD, DEFAULT_VELOCITY_EPSILON, MAX_USES,
};
