//! Concurrent reservation properties of the output allocator.

use std::{sync::Barrier, thread};

use marching_cubes_compute::{
    MarchingCubesError, OutputAllocator, Reservation,
    allocator::SlotRange,
    types::{Color, Point, TableVertex, Vector},
};
use proptest::prelude::*;

fn vertex(i: usize) -> TableVertex {
    TableVertex {
        pos: Point::new(i as f32, 0.0, 0.0),
        normal: Vector::z(),
        color: Color::new(0.0, 0.0, 1.0, 1.0),
        weight: 1.0,
    }
}

/// Every worker reserves its requests in order, all workers start together.
fn reserve_concurrently(
    allocator: &OutputAllocator,
    requests: &[Vec<usize>],
) -> Vec<(usize, SlotRange)> {
    let barrier = Barrier::new(requests.len());
    thread::scope(|s| {
        let handles: Vec<_> = requests
            .iter()
            .map(|sizes| {
                let barrier = &barrier;
                s.spawn(move || {
                    barrier.wait();
                    sizes
                        .iter()
                        .filter_map(|&n| allocator.reserve(n).ok().map(|r| (n, r)))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn reservations_partition_the_claimed_prefix(
        requests in prop::collection::vec(prop::collection::vec(1usize..16, 0..32), 1..8),
    ) {
        let total: usize = requests.iter().flatten().sum();
        let allocator = OutputAllocator::new(total);
        let mut ranges = reserve_concurrently(&allocator, &requests);

        prop_assert_eq!(ranges.len(), requests.iter().map(Vec::len).sum::<usize>());
        prop_assert_eq!(allocator.count(), total);

        ranges.sort_by_key(|(_, r)| r.start);
        let mut next = 0;
        for (n, r) in &ranges {
            prop_assert_eq!(r.start, next);
            prop_assert_eq!(r.len, *n);
            next += n;
        }
        prop_assert_eq!(next, total);
    }

    #[test]
    fn bounded_reservations_never_overlap_or_overrun(
        requests in prop::collection::vec(prop::collection::vec(1usize..16, 0..32), 1..8),
        capacity in 0usize..200,
    ) {
        let allocator = OutputAllocator::new(capacity);
        let mut ranges = reserve_concurrently(&allocator, &requests);

        let claimed: usize = ranges.iter().map(|(n, _)| n).sum();
        prop_assert_eq!(allocator.count(), claimed);
        prop_assert!(claimed <= capacity);

        ranges.sort_by_key(|(_, r)| r.start);
        let mut next = 0;
        for (_, r) in &ranges {
            prop_assert_eq!(r.start, next);
            next = r.range().end;
        }
    }

    #[test]
    fn concurrent_triangle_emission_fills_whole_triangles(
        cells in prop::collection::vec(1usize..=5, 1..200),
        capacity in 0usize..600,
        per_cell in any::<bool>(),
    ) {
        let mode = if per_cell { Reservation::PerCell } else { Reservation::PerTriangle };
        let allocator = OutputAllocator::new(capacity);
        let generated: usize = cells.iter().sum();

        let written: usize = thread::scope(|s| {
            let handles: Vec<_> = cells
                .chunks(16)
                .map(|chunk| {
                    let allocator = &allocator;
                    s.spawn(move || {
                        chunk
                            .iter()
                            .map(|&k| {
                                let triangles: Vec<_> =
                                    (0..k).map(|i| [vertex(i), vertex(i + 1), vertex(i + 2)]).collect();
                                allocator.emit(&triangles, mode).written
                            })
                            .sum::<usize>()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });

        prop_assert_eq!(written + allocator.dropped_triangles(), generated);
        prop_assert_eq!(allocator.count(), written * 3);
        prop_assert_eq!(written, generated.min(capacity / 3));

        let vertices = allocator.finish().unwrap();
        prop_assert_eq!(vertices.len(), written * 3);
    }
}

#[test]
fn full_buffer_reports_what_was_asked() {
    let allocator = OutputAllocator::new(7);
    allocator.reserve(6).unwrap();
    match allocator.reserve(3) {
        Err(MarchingCubesError::CapacityExceeded {
            requested,
            available,
            capacity,
        }) => {
            assert_eq!((requested, available, capacity), (3, 1, 7));
        }
        other => panic!("expected CapacityExceeded, got {other:?}"),
    }
    assert_eq!(allocator.count(), 6);
}
