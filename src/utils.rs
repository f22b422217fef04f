use crate::{
    tables::CORNER_OFFSETS,
    types::{Point, Value, Vector},
};

/// Returns the 8 world-space corner positions of the cell whose lowest corner is `origin`.
///
/// Corners are ordered to match the case tables:
/// ```text
///   4----5     7----6
///   |    |     |    |     upper face (z + size)
///   0----1     3----2     lower face (z)
/// ```
#[inline]
pub fn get_corner_positions(origin: &Point, size: Value) -> [Point; 8] {
    CORNER_OFFSETS.map(|[dx, dy, dz]| {
        origin + Vector::new(dx as Value, dy as Value, dz as Value) * size
    })
}

/// Returns the `[min, extent]` of the smallest axis-aligned cube centered on the
/// bounding box of `points` that contains all of them.
///
/// Returns `None` for an empty slice.
pub fn bounding_cube(points: impl IntoIterator<Item = Point>) -> Option<(Point, Value)> {
    let mut iter = points.into_iter();
    let first = iter.next()?;
    let (min, max) = iter.fold((first, first), |(min, max), p| {
        (min.inf(&p), max.sup(&p))
    });
    let extent = (max - min).max();
    let center = nalgebra::center(&min, &max);
    Some((center - Vector::repeat(extent / 2.0), extent))
}

/// Computes the marching cubes state bitmask for a cell.
///
/// Each of the 8 corners maps to one bit. A bit is set when the corner's value
/// is **at or above** the iso value (i.e. "inside" the surface):
///
/// ```text
/// corner index:  7  6  5  4  3  2  1  0
/// state bits:   [_][_][_][_][_][_][_][_]
///                                      ^-- corner 0 inside?
/// ```
#[inline]
pub fn get_state(eval_corners: &[Value; 8], iso_value: Value) -> u8 {
    let mut state = 0u8;
    for (i, &v) in eval_corners.iter().enumerate() {
        if v >= iso_value {
            state |= 1 << i;
        }
    }

    state
}

/// Decodes a flat cell index into `(x, y, z)` for a cubic grid of `span` cells per axis.
///
/// `x` varies fastest.
#[inline]
pub fn decode_cell_index(index: usize, span: usize) -> (usize, usize, usize) {
    (index % span, (index / span) % span, index / (span * span))
}
