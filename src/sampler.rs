use crate::types::{Color, Point, Value, Vector};

/// A scalar field that can be sampled anywhere in space.
///
/// Implementations are shared read-only between all workers of a run, hence `Sync`.
/// Any `Fn(Point) -> Value + Sync` closure is a field with no color.
pub trait ScalarField: Sync {
    /// Density at `p`. Values at or above the iso value are inside.
    fn sample(&self, p: Point) -> Value;

    /// Per-position color, if the field carries one.
    fn color(&self, _p: Point) -> Option<Color> {
        None
    }

    /// Field gradient at `p`, by central differences with step `h`.
    fn gradient(&self, p: Point, h: Value) -> Vector {
        let dx = Vector::new(h, 0.0, 0.0);
        let dy = Vector::new(0.0, h, 0.0);
        let dz = Vector::new(0.0, 0.0, h);
        let inv = 1.0 / (2.0 * h);
        Vector::new(
            (self.sample(p + dx) - self.sample(p - dx)) * inv,
            (self.sample(p + dy) - self.sample(p - dy)) * inv,
            (self.sample(p + dz) - self.sample(p - dz)) * inv,
        )
    }
}

impl<F> ScalarField for F
where
    F: Fn(Point) -> Value + Sync,
{
    fn sample(&self, p: Point) -> Value {
        self(p)
    }
}

/// Pairs a density function with a color function.
pub struct ColoredField<D, C> {
    density: D,
    color: C,
}

impl<D, C> ColoredField<D, C>
where
    D: Fn(Point) -> Value + Sync,
    C: Fn(Point) -> Color + Sync,
{
    pub fn new(density: D, color: C) -> Self {
        Self { density, color }
    }
}

impl<D, C> ScalarField for ColoredField<D, C>
where
    D: Fn(Point) -> Value + Sync,
    C: Fn(Point) -> Color + Sync,
{
    fn sample(&self, p: Point) -> Value {
        (self.density)(p)
    }

    fn color(&self, p: Point) -> Option<Color> {
        Some((self.color)(p))
    }
}
