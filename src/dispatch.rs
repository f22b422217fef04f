use std::{ops::Add, slice::ChunksExact};

use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info_span, warn};

use crate::{
    allocator::OutputAllocator,
    cell::{CellOutput, triangulate_corners},
    config::MarchingCubesConfig,
    error::{MarchingCubesError, Result},
    mesh::TriangleMesh,
    sampler::ScalarField,
    types::{MarchingCubeControl, TableVertex},
    utils::decode_cell_index,
};

/// Upper bound of vertices a single cell can emit (five triangles).
pub const MAX_VERTICES_PER_CELL: usize = 15;

/// Whether every generated triangle made it into the buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtractionStatus {
    Complete,
    /// The buffer filled up; `dropped_triangles` were generated but not written.
    Truncated { dropped_triangles: usize },
}

/// Per-run cell tallies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExtractionStats {
    pub cells: usize,
    pub empty_cells: usize,
    pub surface_cells: usize,
    /// Cells skipped because the field returned non-finite values.
    pub rejected_cells: usize,
    /// Triangles generated, whether or not they fit.
    pub triangles_generated: usize,
    pub triangles_written: usize,
}

impl Add for ExtractionStats {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            cells: self.cells + rhs.cells,
            empty_cells: self.empty_cells + rhs.empty_cells,
            surface_cells: self.surface_cells + rhs.surface_cells,
            rejected_cells: self.rejected_cells + rhs.rejected_cells,
            triangles_generated: self.triangles_generated + rhs.triangles_generated,
            triangles_written: self.triangles_written + rhs.triangles_written,
        }
    }
}

/// Output of one extraction pass.
///
/// `vertices` is a triangle list: every three consecutive vertices form one triangle.
#[derive(Clone, Debug)]
pub struct Extraction {
    pub vertices: Vec<TableVertex>,
    /// Final value of the output counter; always `vertices.len()`.
    pub count: usize,
    pub capacity: usize,
    pub status: ExtractionStatus,
    pub stats: ExtractionStats,
}

impl Extraction {
    pub fn triangle_count(&self) -> usize {
        self.count / 3
    }

    pub fn is_truncated(&self) -> bool {
        matches!(self.status, ExtractionStatus::Truncated { .. })
    }

    /// Iterates the triangle list three vertices at a time.
    pub fn triangles(&self) -> ChunksExact<'_, TableVertex> {
        self.vertices.chunks_exact(3)
    }

    /// Turns a truncated extraction into [`MarchingCubesError::CapacityExceeded`].
    pub fn require_complete(self) -> Result<Self> {
        match self.status {
            ExtractionStatus::Complete => Ok(self),
            ExtractionStatus::Truncated { dropped_triangles } => {
                Err(MarchingCubesError::CapacityExceeded {
                    requested: self.count + dropped_triangles * 3,
                    available: self.capacity - self.count,
                    capacity: self.capacity,
                })
            }
        }
    }

    /// Builds an indexed mesh from the vertex buffer.
    pub fn to_mesh(&self) -> Result<TriangleMesh> {
        TriangleMesh::from_vertices(&self.vertices)
    }
}

/// Runs the cell triangulator over every cell of a cubic grid.
///
/// ```text
/// validate control + config
///   → OutputAllocator::new(capacity)        counter = 0
///   → parallel-for over [0, gspan³)         decode (x, y, z), triangulate, emit
///   → join                                  every worker done
///   → OutputAllocator::finish               vertex buffer, final count
/// ```
#[derive(Clone, Debug, Default)]
pub struct GridDispatcher {
    pub config: MarchingCubesConfig,
}

impl GridDispatcher {
    pub fn new(config: MarchingCubesConfig) -> Self {
        Self { config }
    }

    /// Capacity that can never truncate a run of `control`, if it fits in a `usize`.
    ///
    /// This is `15 × gspan³` slots, all allocated by [`run`](Self::run). Large grids
    /// should pass a smaller capacity and check [`Extraction::status`].
    pub fn worst_case_capacity(control: &MarchingCubeControl) -> Option<usize> {
        control.cell_count()?.checked_mul(MAX_VERTICES_PER_CELL)
    }

    /// Extracts the iso-surface of `sampler` into a buffer of `output_capacity` vertices.
    ///
    /// Fails only on an invalid control block or configuration. Running out of space is
    /// reported through [`Extraction::status`].
    pub fn run<S>(
        &self,
        control: &MarchingCubeControl,
        sampler: &S,
        output_capacity: usize,
    ) -> Result<Extraction>
    where
        S: ScalarField + ?Sized,
    {
        control.validate()?;
        self.config.validate()?;

        let span = info_span!(
            "marching_cubes::run",
            gspan = control.gspan,
            iso_value = control.iso_value,
            capacity = output_capacity,
        );
        let _enter = span.enter();

        let allocator = OutputAllocator::new(output_capacity);
        let stats = self.dispatch(control, sampler, &allocator)?;

        let dropped_triangles = allocator.dropped_triangles();
        let vertices = allocator.finish()?;
        let count = vertices.len();
        debug_assert_eq!(count, stats.triangles_written * 3);

        let status = if dropped_triangles > 0 {
            warn!(
                dropped_triangles,
                written = count,
                capacity = output_capacity,
                "vertex buffer full, output truncated"
            );
            ExtractionStatus::Truncated { dropped_triangles }
        } else {
            ExtractionStatus::Complete
        };

        if stats.rejected_cells > 0 {
            warn!(
                rejected_cells = stats.rejected_cells,
                "non-finite field values, cells skipped"
            );
        }

        debug!(
            cells = stats.cells,
            surface_cells = stats.surface_cells,
            rejected_cells = stats.rejected_cells,
            triangles = stats.triangles_written,
            "extraction finished"
        );

        Ok(Extraction {
            vertices,
            count,
            capacity: output_capacity,
            status,
            stats,
        })
    }

    fn dispatch<S>(
        &self,
        control: &MarchingCubeControl,
        sampler: &S,
        allocator: &OutputAllocator,
    ) -> Result<ExtractionStats>
    where
        S: ScalarField + ?Sized,
    {
        let cells = control
            .cell_count()
            .ok_or(MarchingCubesError::InvalidConfiguration {
                reason: "gspan³ overflows the cell index range",
            })?;
        let span = control.gspan as usize;
        let process = |index: usize| self.process_cell(index, span, control, sampler, allocator);

        let stats = if self.config.parallel {
            (0..cells)
                .into_par_iter()
                .map(process)
                .reduce(ExtractionStats::default, |a, b| a + b)
        } else {
            (0..cells)
                .map(process)
                .fold(ExtractionStats::default(), |a, b| a + b)
        };
        Ok(stats)
    }

    fn process_cell<S>(
        &self,
        index: usize,
        span: usize,
        control: &MarchingCubeControl,
        sampler: &S,
        allocator: &OutputAllocator,
    ) -> ExtractionStats
    where
        S: ScalarField + ?Sized,
    {
        let (x, y, z) = decode_cell_index(index, span);
        let corners = self.config.cell_corners(x, y, z);
        let mut stats = ExtractionStats {
            cells: 1,
            ..Default::default()
        };

        match triangulate_corners(&corners, self.config.cell_size, control, sampler, &self.config) {
            CellOutput::Empty => stats.empty_cells = 1,
            CellOutput::Rejected => stats.rejected_cells = 1,
            CellOutput::Surface { triangles, .. } => {
                let emitted = allocator.emit(&triangles, self.config.reservation);
                stats.surface_cells = 1;
                stats.triangles_generated = triangles.len();
                stats.triangles_written = emitted.written;
            }
        }
        stats
    }
}

/// Extracts with the default configuration: unit cells, lattice origin at `(0, 0, 0)`.
pub fn run<S>(control: &MarchingCubeControl, sampler: &S, output_capacity: usize) -> Result<Extraction>
where
    S: ScalarField + ?Sized,
{
    GridDispatcher::default().run(control, sampler, output_capacity)
}
