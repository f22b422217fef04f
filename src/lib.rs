//! Data-parallel marching cubes.
//!
//! A [`GridDispatcher`] walks every cell of a cubic grid, triangulates each one against
//! an iso value and appends the triangles to a fixed-capacity vertex buffer through a
//! single atomic write cursor.
//!
//! ```rust,ignore
//! use marching_cubes_compute::{GridDispatcher, MarchingCubeControl, MarchingCubesConfig, types::Point};
//!
//! let control = MarchingCubeControl::new(0.0, 32);
//! let config = MarchingCubesConfig::default().fit_cube(Point::new(-1.0, -1.0, -1.0), 2.0, &control);
//! let sphere = |p: Point| 0.8 - p.coords.norm();
//!
//! let extraction = GridDispatcher::new(config).run(&control, &sphere, 200_000)?;
//! let mesh = extraction.to_mesh()?.weld(1e-5);
//! ```

pub mod allocator;
pub mod cell;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod grid;
pub mod interp;
pub mod mesh;
pub mod sampler;
pub mod splat;
pub mod tables;
pub mod types;
pub mod utils;

pub use allocator::{Counter, OutputAllocator};
pub use cell::{CellOutput, triangulate, triangulate_corners};
pub use config::{MarchingCubesConfig, NormalMode, Reservation};
pub use dispatch::{Extraction, ExtractionStatus, GridDispatcher, run};
pub use error::{MarchingCubesError, Result};
pub use sampler::ScalarField;
pub use types::{MarchingCubeControl, TableVertex};
