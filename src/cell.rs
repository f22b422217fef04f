//! Per-cell triangulation.
//!
//! ```text
//! Per cell:
//! 1. corner positions       →  8 world-space points
//! 2. sampler.sample (×8)    →  8 densities
//! 3. get_state              →  corner mask
//! 4. tables::lookup         →  0..=5 edge triples
//! 5. CellEdges::vertex      →  interpolated vertex per edge, cached
//! ```

use smallvec::SmallVec;

use crate::{
    config::{MarchingCubesConfig, NormalMode},
    interp::{edge_weight, find_t, interpolate_points, interpolate_vectors},
    sampler::ScalarField,
    tables::{self, CORNER_POINT_INDICES},
    types::{MarchingCubeControl, Point, TableVertex, Triangle, Value, Vector},
    utils::{get_corner_positions, get_state},
};

/// Gradients shorter than this fall back to the configured normal.
pub const MIN_GRADIENT_NORM: Value = 1e-6;

/// Triangles produced by one cell; never more than five.
pub type CellTriangles = SmallVec<[Triangle; 5]>;

/// Result of triangulating one cell.
#[derive(Clone, Debug, PartialEq)]
pub enum CellOutput {
    /// The cell has no surface crossing (mask `0x00` or `0xFF`).
    Empty,
    /// The cell crosses the surface.
    Surface { mask: u8, triangles: CellTriangles },
    /// A corner sample or a generated vertex was not finite; the cell emits nothing.
    Rejected,
}

impl CellOutput {
    /// Triangles to emit, empty for [`Empty`](CellOutput::Empty) and
    /// [`Rejected`](CellOutput::Rejected) cells.
    pub fn triangles(&self) -> &[Triangle] {
        match self {
            CellOutput::Surface { triangles, .. } => triangles,
            _ => &[],
        }
    }
}

/// Triangulates the cell whose lowest corner is `cell_origin`.
///
/// Pure function of its inputs: the same cell, field and settings always give the same
/// triangles in the same order.
pub fn triangulate<S>(
    cell_origin: Point,
    cell_size: Value,
    control: &MarchingCubeControl,
    sampler: &S,
    config: &MarchingCubesConfig,
) -> CellOutput
where
    S: ScalarField + ?Sized,
{
    let corners = get_corner_positions(&cell_origin, cell_size);
    triangulate_corners(&corners, cell_size, control, sampler, config)
}

/// Triangulates a cell given its 8 corner positions in table order.
///
/// Cells of one grid must pass bit-identical positions for shared corners, otherwise
/// neighbours may classify the same corner differently.
pub fn triangulate_corners<S>(
    corner_positions: &[Point; 8],
    cell_size: Value,
    control: &MarchingCubeControl,
    sampler: &S,
    config: &MarchingCubesConfig,
) -> CellOutput
where
    S: ScalarField + ?Sized,
{
    let corner_values = corner_positions.map(|p| sampler.sample(p));

    if !corner_values.iter().all(|v| v.is_finite()) {
        return CellOutput::Rejected;
    }

    let mask = get_state(&corner_values, control.iso_value);
    let pattern = tables::lookup(mask);
    if pattern.is_empty() {
        return CellOutput::Empty;
    }

    let mut edges = CellEdges {
        corner_positions,
        corner_values: &corner_values,
        corner_gradients: [None; 8],
        cache: [None; 12],
        iso_value: control.iso_value,
        step: config.gradient_step * cell_size,
        sampler,
        config,
    };

    let mut triangles = CellTriangles::new();
    for [a, b, c] in pattern.iter() {
        let (Some(va), Some(vb), Some(vc)) = (edges.vertex(a), edges.vertex(b), edges.vertex(c))
        else {
            return CellOutput::Rejected;
        };
        triangles.push([va, vb, vc]);
    }

    CellOutput::Surface { mask, triangles }
}

/// Per-cell edge state: every edge is interpolated at most once.
struct CellEdges<'a, S: ?Sized> {
    corner_positions: &'a [Point; 8],
    corner_values: &'a [Value; 8],
    corner_gradients: [Option<Vector>; 8],
    cache: [Option<TableVertex>; 12],
    iso_value: Value,
    step: Value,
    sampler: &'a S,
    config: &'a MarchingCubesConfig,
}

impl<S: ScalarField + ?Sized> CellEdges<'_, S> {
    /// Vertex on `edge`, or `None` if the field produced a non-finite component.
    fn vertex(&mut self, edge: usize) -> Option<TableVertex> {
        if let Some(v) = self.cache[edge] {
            return Some(v);
        }

        let [c0, c1] = CORNER_POINT_INDICES[edge].map(|c| c as usize);
        let t = find_t(self.corner_values[c0], self.corner_values[c1], self.iso_value);
        let pos = interpolate_points(&self.corner_positions[c0], &self.corner_positions[c1], t);

        let gradient = match self.config.normal_mode {
            NormalMode::CentralDifference => self.sampler.gradient(pos, self.step),
            NormalMode::CornerGradient => {
                let g0 = self.corner_gradient(c0);
                let g1 = self.corner_gradient(c1);
                interpolate_vectors(&g0, &g1, t)
            }
        };

        let vertex = TableVertex {
            pos,
            normal: outward_normal(gradient, &self.config.fallback_normal)?,
            color: self.sampler.color(pos).unwrap_or(self.config.surface_color),
            weight: edge_weight(t),
        };
        if !vertex.is_finite() {
            return None;
        }
        self.cache[edge] = Some(vertex);
        Some(vertex)
    }

    fn corner_gradient(&mut self, corner: usize) -> Vector {
        if let Some(g) = self.corner_gradients[corner] {
            return g;
        }
        let g = self.sampler.gradient(self.corner_positions[corner], self.step);
        self.corner_gradients[corner] = Some(g);
        g
    }
}

/// Unit vector against `gradient`, or the normalized fallback when the gradient vanishes.
///
/// Returns `None` for a non-finite gradient.
pub fn outward_normal(gradient: Vector, fallback: &Vector) -> Option<Vector> {
    let norm = gradient.norm();
    if !norm.is_finite() {
        return None;
    }
    if norm > MIN_GRADIENT_NORM {
        Some(-gradient / norm)
    } else {
        Some(fallback.normalize())
    }
}
