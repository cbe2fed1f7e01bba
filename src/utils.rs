//! Shared angle helpers
//!
//! All headings in this crate live in the degree domain: absolute headings
//! in [0, 360) increasing counter-clockwise, errors as shortest signed arcs
//! in [-180, 180).

/// Normalize an absolute heading to [0, 360).
#[inline]
pub fn normalize_deg_360(deg: f32) -> f32 {
    let a = deg % 360.0;
    if a < 0.0 { a + 360.0 } else { a }
}

/// Normalize a heading difference to the shortest signed arc in [-180, 180).
#[inline]
pub fn normalize_deg_180(deg: f32) -> f32 {
    normalize_deg_360(deg + 180.0) - 180.0
}
