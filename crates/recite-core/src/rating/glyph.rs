//! Rating glyph rendering
//!
//! The dual score displays as a fixed 13-character glyph such as
//! `[***--|****+]`: five uses cells, a separator, five velocity cells.
//! A cell fills once its value crosses the matching threshold; the
//! fifth velocity cell renders as `+` to flag a hot record.

/// Uses-side fill thresholds, roughly log-spaced
pub const USES_THRESHOLDS: [u32; 5] = [1, 3, 5, 10, 25];

/// Velocity-side fill thresholds
pub const VELOCITY_THRESHOLDS: [f64; 5] = [1.0, 2.0, 3.0, 4.0, 5.0];

/// Total glyph width including brackets and separator
pub const GLYPH_LEN: usize = 13;

/// Render the dual rating glyph for a score pair.
pub fn render_glyph(uses: u32, velocity: f64) -> String {
    let mut out = String::with_capacity(GLYPH_LEN);
    out.push('[');
    for &t in &USES_THRESHOLDS {
        out.push(if uses >= t { '*' } else { '-' });
    }
    out.push('|');
    for (i, &t) in VELOCITY_THRESHOLDS.iter().enumerate() {
        if velocity >= t {
            out.push(if i == VELOCITY_THRESHOLDS.len() - 1 {
                '+'
            } else {
                '*'
            });
        } else {
            out.push('-');
        }
    }
    out.push(']');
    out
}

/// Whether `s` begins with a well-formed rating glyph.
///
/// The extractor uses this to tell a record listing (id followed by its
/// glyph) apart from a genuine citation in prose.
pub fn leads_with_glyph(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() >= GLYPH_LEN && is_glyph_bytes(&b[..GLYPH_LEN])
}

fn is_glyph_bytes(b: &[u8]) -> bool {
    b.len() == GLYPH_LEN
        && b[0] == b'['
        && b[6] == b'|'
        && b[12] == b']'
        && b[1..6].iter().all(|&c| c == b'*' || c == b'-')
        && b[7..12].iter().all(|&c| c == b'*' || c == b'-' || c == b'+')
}
