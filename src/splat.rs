//! Scalar fields splatted from oriented point samples.
//!
//! Each point raises the density of the 27 lattice points around it to
//! `1 - d / sqrt(3)`, where `d` is the grid-space distance from the point. A lattice
//! point keeps the highest density it receives, together with the color and normal of
//! the point that produced it. Extracting at an iso value below 1 then wraps the point
//! cloud in a surface.

use ndarray::Array3;
use tracing::debug;

use crate::{
    config::MarchingCubesConfig,
    error::{MarchingCubesError, Result},
    grid::SampledGrid,
    interp::interpolate_vectors,
    sampler::ScalarField,
    types::{Color, MarchingCubeControl, Point, Value, Vector},
    utils::bounding_cube,
};

/// Iso value that wraps splatted points in a closed surface.
pub const DEFAULT_SPLAT_ISO: Value = 0.4;

/// An oriented, colored surface sample.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfacePoint {
    pub pos: Point,
    pub normal: Vector,
    /// RGBA, 0–255 per channel.
    pub color: [u8; 4],
}

impl SurfacePoint {
    pub fn new(pos: Point, normal: Vector, color: [u8; 4]) -> Self {
        Self { pos, normal, color }
    }

    fn unit_color(&self) -> Color {
        Color::from(self.color.map(|c| c as Value / 255.0))
    }
}

/// Density lattice built from a point cloud.
#[derive(Clone, Debug)]
pub struct SplatGrid {
    grid: SampledGrid,
    normals: Array3<Vector>,
}

impl SplatGrid {
    /// Splats `points` onto a lattice of `gspan` cells per axis spanning their bounding cube.
    ///
    /// Fails with [`MarchingCubesError::InvalidConfiguration`] for an empty point set, a
    /// zero span or non-finite positions.
    pub fn from_points(points: &[SurfacePoint], gspan: usize) -> Result<Self> {
        if gspan == 0 {
            return Err(MarchingCubesError::InvalidConfiguration {
                reason: "gspan must be positive",
            });
        }
        if !points.iter().all(|p| p.pos.iter().all(|c| c.is_finite())) {
            return Err(MarchingCubesError::InvalidConfiguration {
                reason: "point positions must be finite",
            });
        }
        let (min, extent) = bounding_cube(points.iter().map(|p| p.pos)).ok_or(
            MarchingCubesError::InvalidConfiguration {
                reason: "no points to splat",
            },
        )?;
        let extent = if extent > 0.0 { extent } else { 1.0 };

        let mut grid = SampledGrid::new(gspan, min, extent / gspan as Value, 0.0);
        let dim = grid.values.dim();
        let mut colors = Array3::from_elem(dim, Color::zeros());
        let mut normals = Array3::from_elem(dim, Vector::zeros());

        let max = gspan as isize;
        let sqrt3 = (3.0 as Value).sqrt();
        for point in points {
            let local = (point.pos - grid.origin) / grid.cell_size;
            let base = local.map(|c| c.floor() as isize);
            for dz in -1..=1 {
                for dy in -1..=1 {
                    for dx in -1..=1 {
                        let (x, y, z) = (base.x + dx, base.y + dy, base.z + dz);
                        if !(0..=max).contains(&x) || !(0..=max).contains(&y) || !(0..=max).contains(&z) {
                            continue;
                        }
                        let lattice = Vector::new(x as Value, y as Value, z as Value);
                        let weight = 1.0 - (local - lattice).norm() / sqrt3;
                        let idx = [z as usize, y as usize, x as usize];
                        if grid.values[idx] < weight {
                            grid.values[idx] = weight;
                            colors[idx] = point.unit_color();
                            normals[idx] = point.normal;
                        }
                    }
                }
            }
        }

        debug!(points = points.len(), gspan, cell_size = grid.cell_size, "splatted point cloud");
        Ok(Self {
            grid: grid.with_colors(colors),
            normals,
        })
    }

    /// The underlying density lattice.
    pub fn grid(&self) -> &SampledGrid {
        &self.grid
    }

    /// Control block at [`DEFAULT_SPLAT_ISO`].
    pub fn control(&self) -> MarchingCubeControl {
        self.grid.control(DEFAULT_SPLAT_ISO)
    }

    /// Dispatcher settings whose cells coincide with the lattice.
    pub fn config(&self) -> MarchingCubesConfig {
        self.grid.config()
    }

    /// Interpolated point normal at `p`; zero far from every point.
    pub fn normal(&self, p: Point) -> Vector {
        self.grid
            .trilinear(p, |x, y, z| self.normals[[z, y, x]], interpolate_vectors)
    }
}

impl ScalarField for SplatGrid {
    fn sample(&self, p: Point) -> Value {
        self.grid.sample(p)
    }

    fn color(&self, p: Point) -> Option<Color> {
        self.grid.color(p)
    }

    /// Points against the splatted normals where there are any, so outward normals
    /// follow the input orientation. Falls back to the density gradient elsewhere.
    fn gradient(&self, p: Point, h: Value) -> Vector {
        let n = self.normal(p);
        if n.norm() > 0.0 {
            -n
        } else {
            self.grid.gradient(p, h)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(x: Value, y: Value, z: Value) -> SurfacePoint {
        SurfacePoint::new(Point::new(x, y, z), Vector::z(), [0, 0, 255, 255])
    }

    #[test]
    fn empty_cloud_is_rejected() {
        assert!(matches!(
            SplatGrid::from_points(&[], 8),
            Err(MarchingCubesError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn zero_span_is_rejected() {
        assert!(SplatGrid::from_points(&[point(0.0, 0.0, 0.0)], 0).is_err());
    }

    #[test]
    fn lattice_covers_bounding_cube() {
        let splat = SplatGrid::from_points(&[point(0.0, 0.0, 0.0), point(4.0, 2.0, 0.0)], 4).unwrap();
        let grid = splat.grid();
        assert_eq!(grid.cell_size, 1.0);
        assert_eq!(grid.origin, Point::new(0.0, -1.0, -2.0));
    }

    #[test]
    fn point_on_lattice_gets_full_weight() {
        let splat = SplatGrid::from_points(&[point(0.0, 0.0, 0.0), point(4.0, 4.0, 4.0)], 4).unwrap();
        let grid = splat.grid();
        assert_eq!(grid.get(0, 0, 0), 1.0);
        assert_eq!(grid.get(4, 4, 4), 1.0);
        assert!(grid.get(1, 1, 1).abs() < 1e-6);
        assert!((grid.get(1, 0, 0) - (1.0 - 1.0 / (3.0 as Value).sqrt())).abs() < 1e-6);
        assert_eq!(grid.get(2, 2, 2), 0.0);
    }

    #[test]
    fn nearest_point_wins() {
        let a = SurfacePoint::new(Point::new(0.0, 0.0, 0.0), Vector::x(), [255, 0, 0, 255]);
        let b = SurfacePoint::new(Point::new(0.9, 0.0, 0.0), Vector::y(), [0, 255, 0, 255]);
        let far = point(4.0, 4.0, 4.0);
        let splat = SplatGrid::from_points(&[a, b, far], 4).unwrap();
        let lattice = splat.grid().lattice_point(1, 0, 0);
        assert_eq!(splat.color(lattice), Some(Color::new(0.0, 1.0, 0.0, 1.0)));
        assert_eq!(splat.normal(lattice), Vector::y());
        assert_eq!(splat.gradient(lattice, 0.1), -Vector::y());
    }

    #[test]
    fn control_uses_default_iso() {
        let splat = SplatGrid::from_points(&[point(0.0, 0.0, 0.0), point(1.0, 1.0, 1.0)], 6).unwrap();
        let control = splat.control();
        assert_eq!(control.iso_value, DEFAULT_SPLAT_ISO);
        assert_eq!(control.gspan, 6);
    }
}
