use nalgebra::{Point3, Vector3, Vector4};

/// Scalar field value at a point in space.
pub type Value = f32;

/// A 3D point with [`Value`] components.
pub type Point = Point3<Value>;

/// A 3D vector with [`Value`] components.
pub type Vector = Vector3<Value>;

/// An RGBA color with components in `[0, 1]`.
pub type Color = Vector4<Value>;

/// A scalar field function: maps a [`Point`] to a [`Value`].
///
/// Return values **at or above** the run's iso value are considered "inside" the surface.
pub type CompiledFunction = dyn Fn(Point) -> Value + Sync;

/// Per-run parameters of one extraction pass.
///
/// Created once per extraction request and read-only afterwards. The grid is cubic:
/// `gspan` cells along every axis, so a run visits `gspan³` cells and samples a
/// lattice of `(gspan + 1)³` points.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MarchingCubeControl {
    /// Iso-surface threshold. A corner is inside iff `sample >= iso_value`.
    pub iso_value: Value,
    /// Number of cells per axis.
    pub gspan: u32,
}

impl MarchingCubeControl {
    pub fn new(iso_value: Value, gspan: u32) -> Self {
        Self { iso_value, gspan }
    }

    /// Total number of cells, or `None` if `gspan³` does not fit in a `usize`.
    pub fn cell_count(&self) -> Option<usize> {
        (self.gspan as usize).checked_pow(3)
    }
}

/// One vertex of a generated triangle.
///
/// Vertices are always emitted in groups of three; each group is one triangle wound
/// counter-clockwise when seen from the side its normals point to.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TableVertex {
    /// Interpolated iso-crossing on a cell edge.
    pub pos: Point,
    /// Unit vector pointing out of the surface (toward decreasing density).
    pub normal: Vector,
    pub color: Color,
    /// `1.0` when the crossing sits mid-edge, `0.0` when it sits on a corner.
    pub weight: Value,
}

impl TableVertex {
    /// Whether every component of the vertex is finite.
    pub fn is_finite(&self) -> bool {
        self.pos.iter().all(|c| c.is_finite())
            && self.normal.iter().all(|c| c.is_finite())
            && self.color.iter().all(|c| c.is_finite())
            && self.weight.is_finite()
    }
}

/// Three vertices sharing one face.
pub type Triangle = [TableVertex; 3];
