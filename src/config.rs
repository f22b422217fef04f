use crate::{
    error::{MarchingCubesError, Result},
    tables::CORNER_OFFSETS,
    types::{Color, MarchingCubeControl, Point, Value, Vector},
};

/// How vertex normals are derived from the field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NormalMode {
    /// Central differences sampled around each interpolated vertex.
    #[default]
    CentralDifference,
    /// Central-difference gradients at the two edge corners, interpolated along the edge.
    CornerGradient,
}

/// How the dispatcher claims space in the shared vertex buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Reservation {
    /// One claim of 3 slots per triangle.
    #[default]
    PerTriangle,
    /// One claim of `3 × triangles` slots per cell, keeping a cell's output contiguous.
    ///
    /// If the block does not fit, the cell retries triangle by triangle so the buffer
    /// still fills up to its last whole triangle.
    PerCell,
}

/// Runtime configuration for an extraction pass.
///
/// ```rust,ignore
/// let config = MarchingCubesConfig::default()
///     .with_origin(Point::new(-1.0, -1.0, -1.0))
///     .with_cell_size(2.0 / 32.0)
///     .with_reservation(Reservation::PerCell);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct MarchingCubesConfig {
    /// World-space position of lattice point `(0, 0, 0)`.
    pub origin: Point,
    /// World-space size of each cell edge.
    pub cell_size: Value,
    pub normal_mode: NormalMode,
    /// Finite-difference step, as a fraction of [`cell_size`](Self::cell_size).
    pub gradient_step: Value,
    /// Normal used when the field gradient vanishes. Default: `+Y`.
    pub fallback_normal: Vector,
    /// Color used when the field has none.
    pub surface_color: Color,
    pub reservation: Reservation,
    /// Run cells on the rayon pool. When `false` cells run in flat-index order.
    pub parallel: bool,
}

impl Default for MarchingCubesConfig {
    fn default() -> Self {
        Self {
            origin: Point::origin(),
            cell_size: 1.0,
            normal_mode: NormalMode::default(),
            gradient_step: 0.5,
            fallback_normal: Vector::y(),
            surface_color: Color::new(0.0, 0.0, 1.0, 1.0),
            reservation: Reservation::default(),
            parallel: true,
        }
    }
}

impl MarchingCubesConfig {
    pub fn with_origin(mut self, origin: Point) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_cell_size(mut self, cell_size: Value) -> Self {
        self.cell_size = cell_size;
        self
    }

    pub fn with_normal_mode(mut self, normal_mode: NormalMode) -> Self {
        self.normal_mode = normal_mode;
        self
    }

    pub fn with_gradient_step(mut self, gradient_step: Value) -> Self {
        self.gradient_step = gradient_step;
        self
    }

    /// Sets the normal used for vanishing gradients. It is normalized on use.
    pub fn with_fallback_normal(mut self, normal: Vector) -> Self {
        self.fallback_normal = normal;
        self
    }

    pub fn with_surface_color(mut self, color: Color) -> Self {
        self.surface_color = color;
        self
    }

    pub fn with_reservation(mut self, reservation: Reservation) -> Self {
        self.reservation = reservation;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Fits the lattice of `control` to the axis-aligned cube starting at `min`
    /// with edge length `extent`.
    pub fn fit_cube(mut self, min: Point, extent: Value, control: &MarchingCubeControl) -> Self {
        self.origin = min;
        self.cell_size = extent / control.gspan.max(1) as Value;
        self
    }

    /// World-space position of lattice point `(x, y, z)`.
    #[inline]
    pub fn lattice_point(&self, x: usize, y: usize, z: usize) -> Point {
        self.origin + Vector::new(x as Value, y as Value, z as Value) * self.cell_size
    }

    /// Corner positions of cell `(x, y, z)` in table order.
    ///
    /// Every corner comes from [`lattice_point`](Self::lattice_point), so cells sharing a
    /// corner see the exact same position.
    pub fn cell_corners(&self, x: usize, y: usize, z: usize) -> [Point; 8] {
        CORNER_OFFSETS.map(|[dx, dy, dz]| self.lattice_point(x + dx, y + dy, z + dz))
    }

    /// Rejects settings that would make every cell produce garbage.
    pub fn validate(&self) -> Result<()> {
        if !self.origin.iter().all(|c| c.is_finite()) {
            return Err(invalid("origin must be finite"));
        }
        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            return Err(invalid("cell_size must be positive and finite"));
        }
        if !(self.gradient_step.is_finite() && self.gradient_step > 0.0) {
            return Err(invalid("gradient_step must be positive and finite"));
        }
        let n = self.fallback_normal.norm();
        if !(n.is_finite() && n > 0.0) {
            return Err(invalid("fallback_normal must be a non-zero finite vector"));
        }
        if !self.surface_color.iter().all(|c| c.is_finite()) {
            return Err(invalid("surface_color must be finite"));
        }
        Ok(())
    }
}

impl MarchingCubeControl {
    /// Rejects a control block before any cell work starts.
    pub fn validate(&self) -> Result<()> {
        if self.gspan == 0 {
            return Err(invalid("gspan must be positive"));
        }
        if !self.iso_value.is_finite() {
            return Err(invalid("iso_value must be finite"));
        }
        if self.cell_count().is_none() {
            return Err(invalid("gspan³ overflows the cell index range"));
        }
        Ok(())
    }
}

fn invalid(reason: &'static str) -> MarchingCubesError {
    MarchingCubesError::InvalidConfiguration { reason }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(MarchingCubesConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_bad_cell_size() {
        for size in [0.0, -1.0, Value::NAN, Value::INFINITY] {
            let config = MarchingCubesConfig::default().with_cell_size(size);
            assert!(matches!(
                config.validate(),
                Err(MarchingCubesError::InvalidConfiguration { .. })
            ));
        }
    }

    #[test]
    fn rejects_zero_fallback_normal() {
        let config = MarchingCubesConfig::default().with_fallback_normal(Vector::zeros());
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_gspan_and_non_finite_iso() {
        assert!(MarchingCubeControl::new(0.5, 0).validate().is_err());
        assert!(MarchingCubeControl::new(Value::NAN, 4).validate().is_err());
        assert!(MarchingCubeControl::new(Value::NEG_INFINITY, 4).validate().is_err());
        assert!(MarchingCubeControl::new(0.5, 4).validate().is_ok());
    }

    #[test]
    fn fit_cube_divides_extent_by_span() {
        let control = MarchingCubeControl::new(0.0, 8);
        let config = MarchingCubesConfig::default().fit_cube(Point::new(-1.0, -1.0, -1.0), 2.0, &control);
        assert_eq!(config.cell_size, 0.25);
        assert_eq!(config.lattice_point(8, 0, 4), Point::new(1.0, -1.0, 0.0));
    }

    #[test]
    fn neighbouring_cells_share_corner_positions() {
        let control = MarchingCubeControl::new(0.0, 24);
        let config = MarchingCubesConfig::default().fit_cube(Point::new(-1.0, -1.0, -1.0), 2.0, &control);
        let cell = config.cell_corners(6, 9, 13);
        let right = config.cell_corners(7, 9, 13);
        let above = config.cell_corners(6, 9, 14);
        assert_eq!(cell[1], right[0]);
        assert_eq!(cell[2], right[3]);
        assert_eq!(cell[5], right[4]);
        assert_eq!(cell[6], right[7]);
        assert_eq!(cell[4], above[0]);
        assert_eq!(cell[6], above[2]);
        assert_eq!(cell[0], config.lattice_point(6, 9, 13));
    }
}
