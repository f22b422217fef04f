use crate::types::{Color, Point, Value, Vector};

// Return the interpolation factor t corresponding to iso_val, clamped to [0, 1].
// Equal endpoint values have no crossing to solve for, so the edge midpoint is used.
pub fn find_t(v0: Value, v1: Value, iso_val: Value) -> Value {
    let denom = v1 - v0;
    if denom == 0.0 {
        return 0.5;
    }
    ((iso_val - v0) / denom).clamp(0.0, 1.0)
}

// Linear interpolation
pub fn lerp(a: Value, b: Value, t: Value) -> Value {
    a + (b - a) * t
}

// Linearly interpolate between two points by factor t
pub fn interpolate_points(p0: &Point, p1: &Point, t: Value) -> Point {
    p0 + (p1 - p0) * t
}

pub fn interpolate_vectors(v0: &Vector, v1: &Vector, t: Value) -> Vector {
    v0.lerp(v1, t)
}

pub fn interpolate_colors(c0: &Color, c1: &Color, t: Value) -> Color {
    c0.lerp(c1, t)
}

/// Confidence of an edge crossing: `1.0` at mid-edge, `0.0` on a corner.
pub fn edge_weight(t: Value) -> Value {
    1.0 - 2.0 * (t - 0.5).abs()
}
