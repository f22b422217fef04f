//! Extracts a sphere and writes it as a Wavefront OBJ file.
//!
//! ```text
//! cargo run --release --example sphere_obj -- [gspan] [out.obj]
//! ```

use std::{fs::File, io::BufWriter};

use marching_cubes_compute::{
    GridDispatcher, MarchingCubeControl, MarchingCubesConfig, MarchingCubesError, Result,
    types::{Point, Value},
};

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let gspan: u32 = args.next().and_then(|s| s.parse().ok()).unwrap_or(32);
    let path = args.next().unwrap_or_else(|| "sphere.obj".to_owned());

    let control = MarchingCubeControl::new(0.0, gspan);
    let config = MarchingCubesConfig::default().fit_cube(Point::new(-1.0, -1.0, -1.0), 2.0, &control);
    let sphere = |p: Point| -> Value { 0.75 - p.coords.norm() };

    let capacity = GridDispatcher::worst_case_capacity(&control).ok_or(
        MarchingCubesError::InvalidConfiguration {
            reason: "worst-case vertex count overflows usize",
        },
    )?;
    let extraction = GridDispatcher::new(config)
        .run(&control, &sphere, capacity)?
        .require_complete()?;

    let mesh = extraction.to_mesh()?.weld(1e-5);
    mesh.write_obj(BufWriter::new(File::create(&path)?))?;

    println!(
        "{} triangles from {} cells, {} unique vertices -> {path}",
        mesh.triangle_count(),
        extraction.stats.cells,
        mesh.vertex_count(),
    );
    Ok(())
}
