//! Wraps a synthetic point cloud in a surface by splatting it onto a grid.

use marching_cubes_compute::{
    ExtractionStatus, GridDispatcher, MarchingCubesError, Result,
    splat::{SplatGrid, SurfacePoint},
    types::{Point, Value, Vector},
};

/// Points on a torus with outward normals, colored by angle around the ring.
fn torus_points(rings: usize, segments: usize) -> Vec<SurfacePoint> {
    let (major, minor) = (1.0, 0.35);
    let mut points = Vec::with_capacity(rings * segments);
    for i in 0..rings {
        let u = i as Value / rings as Value * std::f32::consts::TAU;
        for j in 0..segments {
            let v = j as Value / segments as Value * std::f32::consts::TAU;
            let normal = Vector::new(u.cos() * v.cos(), v.sin(), u.sin() * v.cos());
            let center = Vector::new(u.cos(), 0.0, u.sin()) * major;
            let shade = (255.0 * i as Value / rings as Value) as u8;
            points.push(SurfacePoint::new(
                Point::from(center + normal * minor),
                normal,
                [shade, 64, 255 - shade, 255],
            ));
        }
    }
    points
}

fn main() -> Result<()> {
    let points = torus_points(96, 32);
    let splat = SplatGrid::from_points(&points, 48)?;
    let control = splat.control();

    let capacity = GridDispatcher::worst_case_capacity(&control).ok_or(
        MarchingCubesError::InvalidConfiguration {
            reason: "worst-case vertex count overflows usize",
        },
    )?;
    let extraction = GridDispatcher::new(splat.config()).run(&control, &splat, capacity)?;
    if let ExtractionStatus::Truncated { dropped_triangles } = extraction.status {
        println!("{dropped_triangles} triangles did not fit");
    }

    let mesh = extraction.to_mesh()?.weld(1e-5);
    println!(
        "{} points -> {} triangles ({} surface cells), {} vertices after welding",
        points.len(),
        extraction.triangle_count(),
        extraction.stats.surface_cells,
        mesh.vertex_count(),
    );
    Ok(())
}
