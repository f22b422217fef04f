use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use marching_cubes_compute::{
    GridDispatcher, MarchingCubeControl, MarchingCubesConfig, Reservation,
    grid::SampledGrid,
    types::{Point, Value},
};

/// Enough for the largest torus below; a worst-case buffer at span 128 would be gigabytes.
const CAPACITY: usize = 1 << 20;

fn torus(p: Point) -> Value {
    let q = (p.x.hypot(p.z) - 0.5).hypot(p.y);
    0.2 - q
}

fn config_for(control: &MarchingCubeControl) -> MarchingCubesConfig {
    MarchingCubesConfig::default().fit_cube(Point::new(-1.0, -1.0, -1.0), 2.0, control)
}

fn extraction_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract torus");
    for gspan in [32u32, 64, 128] {
        let control = MarchingCubeControl::new(0.0, gspan);
        let config = config_for(&control);

        for (name, dispatcher) in [
            ("parallel", GridDispatcher::new(config.clone())),
            ("parallel per-cell", GridDispatcher::new(config.clone().with_reservation(Reservation::PerCell))),
            ("sequential", GridDispatcher::new(config.clone().with_parallel(false))),
        ] {
            group.bench_with_input(BenchmarkId::new(name, gspan), &control, |b, control| {
                b.iter(|| dispatcher.run(control, &torus, black_box(CAPACITY)))
            });
        }
    }
    group.finish();
}

fn sampled_grid_benchmark(c: &mut Criterion) {
    let control = MarchingCubeControl::new(0.0, 64);
    let config = config_for(&control);
    let mut grid = SampledGrid::for_run(&control, &config);
    grid.par_fill(&torus);
    let dispatcher = GridDispatcher::new(grid.config());

    c.bench_function("fill grid 64", |b| b.iter(|| grid.clone().par_fill(&torus)));
    c.bench_function("extract sampled torus 64", |b| {
        b.iter(|| dispatcher.run(&control, &grid, black_box(CAPACITY)))
    });
}

criterion_group!(benches, extraction_benchmark, sampled_grid_benchmark);
criterion_main!(benches);
