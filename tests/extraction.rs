//! End-to-end extraction tests.

use marching_cubes_compute::{
    ExtractionStatus, GridDispatcher, MarchingCubeControl, MarchingCubesConfig, NormalMode,
    Reservation, ScalarField, TableVertex,
    grid::SampledGrid,
    tables::CORNER_OFFSETS,
    utils::get_state,
    splat::{SplatGrid, SurfacePoint},
    types::{Color, Point, Value, Vector},
};

// =============================================================================
// Test Fields
// =============================================================================

/// Density falls off from the center: inside (>= 0) within `radius`.
fn sphere(center: Point, radius: Value) -> impl Fn(Point) -> Value + Sync {
    move |p: Point| radius - (p - center).norm()
}

fn unit_cube_config(control: &MarchingCubeControl) -> MarchingCubesConfig {
    MarchingCubesConfig::default().fit_cube(Point::new(-1.0, -1.0, -1.0), 2.0, control)
}

fn face_normal(tri: &[TableVertex]) -> Vector {
    (tri[1].pos - tri[0].pos).cross(&(tri[2].pos - tri[0].pos))
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn upper_half_density_gives_flat_quad() {
    let values = [0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
    let mut grid = SampledGrid::new(1, Point::origin(), 1.0, 0.0);
    for (corner, offset) in CORNER_OFFSETS.iter().enumerate() {
        grid.set(offset[0], offset[1], offset[2], values[corner]);
    }

    let out = GridDispatcher::new(grid.config())
        .run(&grid.control(0.5), &grid, 15)
        .unwrap();

    assert_eq!(out.status, ExtractionStatus::Complete);
    assert_eq!(out.triangle_count(), 2);
    assert_eq!(out.count, 6);
    for v in &out.vertices {
        assert!((v.pos.z - 0.5).abs() < 1e-6);
        assert!((v.normal - Vector::new(0.0, 0.0, -1.0)).norm() < 1e-4);
    }
    for tri in out.triangles() {
        assert!(face_normal(tri).z < 0.0);
    }

    let mesh = out.to_mesh().unwrap().weld(1e-5);
    assert_eq!(mesh.vertex_count(), 4, "the two triangles share a diagonal");
}

#[test]
fn sphere_triangles_face_outward() {
    let control = MarchingCubeControl::new(0.0, 24);
    let config = unit_cube_config(&control);
    let center = Point::origin();
    let field = sphere(center, 0.7);
    let capacity = GridDispatcher::worst_case_capacity(&control).unwrap();

    for mode in [NormalMode::CentralDifference, NormalMode::CornerGradient] {
        let out = GridDispatcher::new(config.clone().with_normal_mode(mode))
            .run(&control, &field, capacity)
            .unwrap();
        assert!(out.triangle_count() > 100);

        for tri in out.triangles() {
            let face = face_normal(tri);
            if face.norm() < 1e-8 {
                continue;
            }
            let centroid = tri.iter().map(|v| v.pos.coords).sum::<Vector>() / 3.0;
            assert!(face.dot(&centroid) > 0.0, "face points inward at {centroid:?}");
            for v in tri {
                assert!(v.normal.dot(&v.pos.coords) > 0.0);
                assert!((v.normal.norm() - 1.0).abs() < 1e-4);
            }
        }
    }
}

#[test]
fn vertices_lie_on_the_iso_surface() {
    let control = MarchingCubeControl::new(0.0, 16);
    let field = sphere(Point::origin(), 0.6);
    let out = GridDispatcher::new(unit_cube_config(&control))
        .run(&control, &field, 100_000)
        .unwrap();
    // Linear interpolation of a curved field; error shrinks with the cell size.
    for v in &out.vertices {
        assert!(field.sample(v.pos).abs() < 0.02);
        assert!((0.0..=1.0).contains(&v.weight));
        assert_eq!(v.color, MarchingCubesConfig::default().surface_color);
    }
}

#[test]
fn final_count_matches_generated_triangles() {
    let control = MarchingCubeControl::new(0.0, 20);
    let config = unit_cube_config(&control);
    let field = sphere(Point::new(0.1, -0.2, 0.05), 0.55);

    for reservation in [Reservation::PerTriangle, Reservation::PerCell] {
        let out = GridDispatcher::new(config.clone().with_reservation(reservation))
            .run(&control, &field, 1_000_000)
            .unwrap();
        assert_eq!(out.status, ExtractionStatus::Complete);
        assert_eq!(out.count, 3 * out.stats.triangles_generated);
        assert_eq!(out.stats.triangles_generated, out.stats.triangles_written);
        assert_eq!(
            out.stats.cells,
            out.stats.empty_cells + out.stats.surface_cells + out.stats.rejected_cells
        );
    }
}

// =============================================================================
// Capacity
// =============================================================================

#[test]
fn truncated_run_keeps_a_valid_prefix() {
    let control = MarchingCubeControl::new(0.0, 16);
    let config = unit_cube_config(&control).with_parallel(false);
    let field = sphere(Point::origin(), 0.8);

    let full = GridDispatcher::new(config.clone())
        .run(&control, &field, 1_000_000)
        .unwrap();

    for capacity in [0, 1, 2, 3, 100, 301] {
        assert!(full.count > capacity);
        let out = GridDispatcher::new(config.clone())
            .run(&control, &field, capacity)
            .unwrap();
        assert!(out.is_truncated());
        assert_eq!(out.count, capacity / 3 * 3);
        assert_eq!(out.vertices.len(), out.count);
        // Sequential dispatch writes in cell order, so the prefix is the full output's prefix.
        assert_eq!(out.vertices[..], full.vertices[..out.count]);
        let ExtractionStatus::Truncated { dropped_triangles } = out.status else {
            unreachable!();
        };
        assert_eq!(dropped_triangles, full.triangle_count() - out.triangle_count());
    }
}

#[test]
fn parallel_truncation_never_overruns() {
    let control = MarchingCubeControl::new(0.0, 24);
    let config = unit_cube_config(&control).with_reservation(Reservation::PerCell);
    let field = sphere(Point::origin(), 0.8);
    for capacity in [10, 500, 4_000] {
        let out = GridDispatcher::new(config.clone())
            .run(&control, &field, capacity)
            .unwrap();
        assert!(out.count <= capacity);
        assert_eq!(out.count, capacity / 3 * 3);
        assert!(out.vertices.iter().all(TableVertex::is_finite));
    }
}

// =============================================================================
// Field Sources
// =============================================================================

#[test]
fn sampled_grid_matches_analytic_field() {
    let control = MarchingCubeControl::new(0.0, 16);
    let config = unit_cube_config(&control).with_parallel(false);
    let field = sphere(Point::origin(), 0.6);

    let mut grid = SampledGrid::for_run(&control, &config);
    grid.par_fill(&field);

    let analytic = GridDispatcher::new(config.clone())
        .run(&control, &field, 100_000)
        .unwrap();
    let sampled = GridDispatcher::new(config).run(&control, &grid, 100_000).unwrap();

    assert_eq!(analytic.triangle_count(), sampled.triangle_count());
    for (a, b) in analytic.vertices.iter().zip(&sampled.vertices) {
        assert!((a.pos - b.pos).norm() < 1e-4);
    }
}

#[test]
fn neighbouring_cells_classify_shared_corners_alike() {
    let control = MarchingCubeControl::new(0.0, 24);
    let config = unit_cube_config(&control);
    let mut grid = SampledGrid::for_run(&control, &config);
    // Plane with exact zeros on lattice points.
    for ((z, y, x), v) in grid.values.indexed_iter_mut() {
        *v = (x + 2 * y + 3 * z) as Value * 0.1 - 6.0;
    }

    let mask = |x: usize, y: usize, z: usize| {
        get_state(&config.cell_corners(x, y, z).map(|p| grid.sample(p)), 0.0)
    };
    for z in 0..24 {
        for y in 0..24 {
            for x in 0..23 {
                let (a, b) = (mask(x, y, z), mask(x + 1, y, z));
                // Corners 1, 2, 5, 6 of a cell are corners 0, 3, 4, 7 of its +x neighbour.
                for (ca, cb) in [(1, 0), (2, 3), (5, 4), (6, 7)] {
                    assert_eq!(a >> ca & 1, b >> cb & 1, "cells {x} and {} at y={y} z={z}", x + 1);
                }
            }
        }
    }

    let out = GridDispatcher::new(config)
        .run(&control, &grid, 200_000)
        .unwrap();
    assert_eq!(out.status, ExtractionStatus::Complete);
    for v in &out.vertices {
        let local = (v.pos - Point::new(-1.0, -1.0, -1.0)) * 12.0;
        assert!((local.x + 2.0 * local.y + 3.0 * local.z - 60.0).abs() < 1e-2);
    }
}

#[test]
fn colored_grid_colors_vertices() {
    let control = MarchingCubeControl::new(0.0, 8);
    let config = unit_cube_config(&control);
    let mut grid = SampledGrid::for_run(&control, &config);
    grid.fill(&sphere(Point::origin(), 0.6));
    let dim = grid.values.dim();
    let grid = grid.with_colors(ndarray::Array3::from_elem(dim, Color::new(1.0, 0.5, 0.0, 1.0)));

    let out = GridDispatcher::new(grid.config())
        .run(&grid.control(0.0), &grid, 50_000)
        .unwrap();
    assert!(out.count > 0);
    for v in &out.vertices {
        assert!((v.color - Color::new(1.0, 0.5, 0.0, 1.0)).norm() < 1e-6);
    }
}

#[test]
fn splatted_point_cloud_is_wrapped() {
    // Points on a sphere of radius 1 with outward normals.
    let mut points = Vec::new();
    for i in 0..40 {
        for j in 0..20 {
            let theta = i as Value / 40.0 * std::f32::consts::TAU;
            let phi = (j as Value + 0.5) / 20.0 * std::f32::consts::PI;
            let n = Vector::new(phi.sin() * theta.cos(), phi.sin() * theta.sin(), phi.cos());
            points.push(SurfacePoint::new(Point::from(n), n, [0, 0, 255, 255]));
        }
    }
    let splat = SplatGrid::from_points(&points, 16).unwrap();
    let out = GridDispatcher::new(splat.config())
        .run(&splat.control(), &splat, 500_000)
        .unwrap();

    assert_eq!(out.status, ExtractionStatus::Complete);
    assert!(out.triangle_count() > 0);
    for v in &out.vertices {
        assert!(v.is_finite());
        // Blends toward unsplatted lattice points, which carry no color.
        assert_eq!((v.color.x, v.color.y), (0.0, 0.0));
        assert!(v.color.z > 0.0);
    }
}

#[test]
fn exports_obj() {
    let control = MarchingCubeControl::new(0.0, 8);
    let out = GridDispatcher::new(unit_cube_config(&control))
        .run(&control, &sphere(Point::origin(), 0.5), 50_000)
        .unwrap();
    let mesh = out.to_mesh().unwrap().weld(1e-5);

    let mut obj = Vec::new();
    mesh.write_obj(&mut obj).unwrap();
    let text = String::from_utf8(obj).unwrap();
    assert_eq!(
        text.lines().filter(|l| l.starts_with("f ")).count(),
        mesh.triangle_count()
    );
    assert_eq!(
        text.lines().filter(|l| l.starts_with("v ")).count(),
        mesh.vertex_count()
    );
}
