use std::{collections::HashMap, io::Write};

use crate::{
    error::{MarchingCubesError, Result},
    types::{Color, Point, TableVertex, Value, Vector},
};

/// Indexed triangle mesh built from an extraction's vertex buffer.
///
/// Attribute vectors run in parallel: vertex `i` is `positions[i]`, `normals[i]`,
/// `colors[i]`, `weights[i]`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TriangleMesh {
    pub positions: Vec<Point>,
    pub normals: Vec<Vector>,
    pub colors: Vec<Color>,
    pub weights: Vec<Value>,

    /// Triangle index triples into the attribute vectors.
    pub indices: Vec<[u32; 3]>,
}

impl TriangleMesh {
    /// Creates an empty mesh with no vertices or triangles.
    pub fn new_empty() -> Self {
        Self::default()
    }

    /// Builds a mesh with one vertex per buffer entry and sequential indices, so every
    /// three consecutive vertices form one triangle.
    ///
    /// Trailing vertices that do not complete a triangle are ignored.
    pub fn from_vertices(vertices: &[TableVertex]) -> Result<Self> {
        let mut mesh = Self::new_empty();
        for v in vertices {
            mesh.push_vertex(v);
        }
        for tri in 0..vertices.len() / 3 {
            let v = tri * 3;
            mesh.triangle_from_verts(v, v + 1, v + 2)?;
        }
        Ok(mesh)
    }

    fn push_vertex(&mut self, v: &TableVertex) {
        self.positions.push(v.pos);
        self.normals.push(v.normal);
        self.colors.push(v.color);
        self.weights.push(v.weight);
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len()
    }

    /// Flat `u32` index list, three entries per triangle.
    pub fn flat_indices(&self) -> &[u32] {
        self.indices.as_flattened()
    }

    /// Adds a triangle defined by three vertex indices.
    ///
    /// Returns [`MarchingCubesError::InvalidIndex`] if any index is out of bounds or
    /// does not fit in a `u32`.
    pub fn triangle_from_verts(&mut self, x: usize, y: usize, z: usize) -> Result<()> {
        if self.positions.len() <= x.max(y.max(z)) {
            return Err(MarchingCubesError::InvalidIndex);
        }
        let index = |i: usize| u32::try_from(i).map_err(|_| MarchingCubesError::InvalidIndex);
        self.indices.push([index(x)?, index(y)?, index(z)?]);
        Ok(())
    }

    /// Returns the three vertex positions of triangle `tri`.
    pub fn tri_coords(&self, tri: usize) -> [Point; 3] {
        self.indices[tri].map(|i| self.positions[i as usize])
    }

    /// Computes the unit face normal of triangle `tri` from its winding.
    ///
    /// Returns the zero vector if the triangle is degenerate.
    pub fn tri_normal(&self, tri: usize) -> Vector {
        let [a, b, c] = self.tri_coords(tri);
        let cross = (b - a).cross(&(c - b));

        let nrm = cross.norm();
        if nrm == 0.0 {
            Vector::zeros()
        } else {
            cross / nrm
        }
    }

    /// Merges vertices whose positions agree to within `tolerance`, averaging their
    /// normals, colors and weights. Triangles that collapse to fewer than three distinct
    /// vertices are removed.
    pub fn weld(&self, tolerance: Value) -> Self {
        let scale = if tolerance > 0.0 { 1.0 / tolerance } else { 1.0 };
        let key = |p: &Point| p.coords.map(|c| (c * scale).round() as i64);

        let mut remap = Vec::with_capacity(self.positions.len());
        let mut lookup = HashMap::new();
        let mut sums: Vec<(Point, Vector, Color, Value, usize)> = Vec::new();
        for (i, p) in self.positions.iter().enumerate() {
            let slot = *lookup.entry(key(p)).or_insert_with(|| {
                sums.push((*p, Vector::zeros(), Color::zeros(), 0.0, 0));
                sums.len() - 1
            });
            let entry = &mut sums[slot];
            entry.1 += self.normals[i];
            entry.2 += self.colors[i];
            entry.3 += self.weights[i];
            entry.4 += 1;
            remap.push(slot as u32);
        }

        let mut welded = Self::new_empty();
        for (pos, normal, color, weight, n) in sums {
            let n = n as Value;
            welded.positions.push(pos);
            welded.normals.push(normal.try_normalize(0.0).unwrap_or(normal));
            welded.colors.push(color / n);
            welded.weights.push(weight / n);
        }
        welded.indices = self
            .indices
            .iter()
            .map(|tri| tri.map(|i| remap[i as usize]))
            .filter(|[a, b, c]| a != b && b != c && a != c)
            .collect();
        welded
    }

    /// Writes the mesh as Wavefront OBJ (`v`, `vn` and `f` records).
    pub fn write_obj<W: Write>(&self, mut out: W) -> Result<()> {
        writeln!(out, "o model")?;
        for p in &self.positions {
            writeln!(out, "v {} {} {}", p.x, p.y, p.z)?;
        }
        for n in &self.normals {
            writeln!(out, "vn {} {} {}", n.x, n.y, n.z)?;
        }
        for [a, b, c] in &self.indices {
            let (a, b, c) = (a + 1, b + 1, c + 1);
            writeln!(out, "f {a}//{a} {b}//{b} {c}//{c}")?;
        }
        out.flush()?;
        Ok(())
    }
}
