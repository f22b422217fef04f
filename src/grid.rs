use ndarray::{Array3, Zip};

use crate::{
    config::MarchingCubesConfig,
    interp::{interpolate_colors, lerp},
    sampler::ScalarField,
    types::{Color, CompiledFunction, MarchingCubeControl, Point, Value, Vector},
};

/// Distance, in cells, under which a sample position counts as lying on a lattice plane.
pub const LATTICE_SNAP: Value = 1e-3;

/// A precomputed lattice of field values over a cubic grid.
///
/// The lattice has `gspan + 1` points per axis so that every cell has a full set of 8
/// corners. Values are stored as `values[[z, y, x]]`.
///
/// As a [`ScalarField`] the grid is trilinear between lattice points and returns the
/// stored value on them, so running the dispatcher with [`config`](SampledGrid::config)
/// classifies cells from the sampled corner values.
#[derive(Clone, Debug)]
pub struct SampledGrid {
    /// Number of cells along each axis.
    pub gspan: usize,
    /// World-space position of lattice point `(0, 0, 0)`.
    pub origin: Point,
    /// World-space size of each cell edge.
    pub cell_size: Value,
    /// Scalar field values, indexed `[z, y, x]`.
    pub values: Array3<Value>,
    /// Optional per-lattice-point colors, indexed like `values`.
    pub colors: Option<Array3<Color>>,
}

impl SampledGrid {
    /// Creates a lattice for `gspan` cells per axis with every value set to `fill`.
    pub fn new(gspan: usize, origin: Point, cell_size: Value, fill: Value) -> Self {
        let n = gspan + 1;
        Self {
            gspan,
            origin,
            cell_size,
            values: Array3::from_elem((n, n, n), fill),
            colors: None,
        }
    }

    /// A lattice matching the dispatcher settings of `control` and `config`.
    pub fn for_run(control: &MarchingCubeControl, config: &MarchingCubesConfig) -> Self {
        Self::new(control.gspan as usize, config.origin, config.cell_size, 0.0)
    }

    /// Attaches per-lattice-point colors.
    ///
    /// # Panics
    /// Panics if the shapes of `colors` and `values` differ.
    pub fn with_colors(mut self, colors: Array3<Color>) -> Self {
        assert_eq!(colors.dim(), self.values.dim(), "color lattice shape mismatch");
        self.colors = Some(colors);
        self
    }

    /// World-space position of lattice point `(x, y, z)`.
    #[inline]
    pub fn lattice_point(&self, x: usize, y: usize, z: usize) -> Point {
        self.origin + Vector::new(x as Value, y as Value, z as Value) * self.cell_size
    }

    /// Returns the scalar field value at lattice point `(x, y, z)`.
    pub fn get(&self, x: usize, y: usize, z: usize) -> Value {
        self.values[[z, y, x]]
    }

    /// Sets the scalar field value at lattice point `(x, y, z)`.
    pub fn set(&mut self, x: usize, y: usize, z: usize, v: Value) {
        self.values[[z, y, x]] = v
    }

    /// Fills the lattice by evaluating `function` at every lattice point's world position.
    pub fn fill(&mut self, function: &CompiledFunction) {
        let (origin, size) = (self.origin, self.cell_size);
        Zip::indexed(&mut self.values).for_each(|(z, y, x), v| {
            *v = function(origin + Vector::new(x as Value, y as Value, z as Value) * size);
        });
    }

    /// Like [`fill`](SampledGrid::fill), spread over the rayon pool.
    pub fn par_fill(&mut self, function: &CompiledFunction) {
        let (origin, size) = (self.origin, self.cell_size);
        Zip::indexed(&mut self.values).par_for_each(|(z, y, x), v| {
            *v = function(origin + Vector::new(x as Value, y as Value, z as Value) * size);
        });
    }

    /// Dispatcher settings whose cells coincide with this lattice.
    pub fn config(&self) -> MarchingCubesConfig {
        MarchingCubesConfig::default()
            .with_origin(self.origin)
            .with_cell_size(self.cell_size)
    }

    /// Control block for this lattice at `iso_value`.
    pub fn control(&self, iso_value: Value) -> MarchingCubeControl {
        MarchingCubeControl::new(iso_value, self.gspan as u32)
    }

    /// Splits `p` into the lower lattice index and the fractional offset along each
    /// axis, clamped to the lattice bounds.
    ///
    /// Coordinates within [`LATTICE_SNAP`] of a lattice plane land exactly on it, so the
    /// rounding in `origin + i * cell_size` never blends in a neighbouring value.
    fn locate(&self, p: Point) -> ([usize; 3], [Value; 3]) {
        let local = (p - self.origin) / self.cell_size;
        let max = self.gspan as Value;
        let mut base = [0usize; 3];
        let mut frac = [0.0; 3];
        for axis in 0..3 {
            let c = local[axis].clamp(0.0, max);
            let nearest = c.round();
            let c = if (c - nearest).abs() <= LATTICE_SNAP { nearest } else { c };
            let i = (c.floor() as usize).min(self.gspan.saturating_sub(1));
            base[axis] = i;
            frac[axis] = c - i as Value;
        }
        (base, frac)
    }

    pub(crate) fn trilinear<T, F, L>(&self, p: Point, at: F, mix: L) -> T
    where
        F: Fn(usize, usize, usize) -> T,
        L: Fn(&T, &T, Value) -> T,
    {
        let ([x, y, z], [fx, fy, fz]) = self.locate(p);
        let (x1, y1, z1) = (
            (x + 1).min(self.gspan),
            (y + 1).min(self.gspan),
            (z + 1).min(self.gspan),
        );
        let c00 = mix(&at(x, y, z), &at(x1, y, z), fx);
        let c10 = mix(&at(x, y1, z), &at(x1, y1, z), fx);
        let c01 = mix(&at(x, y, z1), &at(x1, y, z1), fx);
        let c11 = mix(&at(x, y1, z1), &at(x1, y1, z1), fx);
        let c0 = mix(&c00, &c10, fy);
        let c1 = mix(&c01, &c11, fy);
        mix(&c0, &c1, fz)
    }
}

impl ScalarField for SampledGrid {
    fn sample(&self, p: Point) -> Value {
        self.trilinear(p, |x, y, z| self.get(x, y, z), |a, b, t| {
            if t == 0.0 {
                *a
            } else if t == 1.0 {
                *b
            } else {
                lerp(*a, *b, t)
            }
        })
    }

    fn color(&self, p: Point) -> Option<Color> {
        let colors = self.colors.as_ref()?;
        Some(self.trilinear(p, |x, y, z| colors[[z, y, x]], interpolate_colors))
    }
}
