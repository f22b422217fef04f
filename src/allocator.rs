//! Shared output buffer with an atomic write cursor.
//!
//! The counter is the only synchronization point between workers: a claim is a single
//! compare-and-swap that either moves the cursor by `n` and hands back the old value, or
//! fails without moving it. Slots are write-once, so a claimed range is owned by exactly
//! one writer.

use std::{
    ops::Range,
    sync::{
        OnceLock,
        atomic::{AtomicUsize, Ordering},
    },
};

use crate::{
    config::Reservation,
    error::{MarchingCubesError, Result},
    types::{TableVertex, Triangle},
};

/// Number of vertex slots claimed in the output buffer.
#[derive(Debug, Default)]
pub struct Counter {
    count: AtomicUsize,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    pub fn reset(&mut self) {
        *self.count.get_mut() = 0;
    }

    /// Claims `n` slots if `count + n <= capacity`.
    ///
    /// Returns the old count on success and the unchanged count on failure.
    pub fn try_claim(&self, n: usize, capacity: usize) -> core::result::Result<usize, usize> {
        self.count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |old| {
                old.checked_add(n).filter(|&new| new <= capacity)
            })
    }
}

/// An exclusive range of slots `[start, start + len)` granted by [`OutputAllocator::reserve`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotRange {
    pub start: usize,
    pub len: usize,
}

impl SlotRange {
    pub fn range(&self) -> Range<usize> {
        self.start..self.start + self.len
    }
}

/// What happened to one batch of triangles handed to [`OutputAllocator::emit`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Emitted {
    pub written: usize,
    pub dropped: usize,
}

/// Fixed-capacity vertex buffer guarded by a [`Counter`].
pub struct OutputAllocator {
    counter: Counter,
    slots: Box<[OnceLock<TableVertex>]>,
    dropped_triangles: AtomicUsize,
}

impl OutputAllocator {
    /// Creates an empty buffer with room for `capacity` vertices.
    ///
    /// Every slot is allocated up front: [`bytes_for`](Self::bytes_for) gives the size.
    /// [`finish`](Self::finish) copies the claimed prefix out before the slots are freed,
    /// so a full buffer briefly needs that much again.
    pub fn new(capacity: usize) -> Self {
        Self {
            counter: Counter::new(),
            slots: (0..capacity).map(|_| OnceLock::new()).collect(),
            dropped_triangles: AtomicUsize::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Bytes of slot storage a buffer of `capacity` vertices allocates.
    pub const fn bytes_for(capacity: usize) -> Option<usize> {
        capacity.checked_mul(size_of::<OnceLock<TableVertex>>())
    }

    /// Vertex slots claimed so far.
    pub fn count(&self) -> usize {
        self.counter.count()
    }

    /// Triangles rejected for lack of space so far.
    pub fn dropped_triangles(&self) -> usize {
        self.dropped_triangles.load(Ordering::Relaxed)
    }

    /// Clears the buffer and resets the counter for a new run.
    pub fn reset(&mut self) {
        self.counter.reset();
        *self.dropped_triangles.get_mut() = 0;
        for slot in self.slots.iter_mut() {
            slot.take();
        }
    }

    /// Claims `n` contiguous slots.
    ///
    /// Fails with [`MarchingCubesError::CapacityExceeded`] without claiming anything if
    /// the slots do not fit.
    pub fn reserve(&self, n: usize) -> Result<SlotRange> {
        let capacity = self.capacity();
        match self.counter.try_claim(n, capacity) {
            Ok(start) => Ok(SlotRange { start, len: n }),
            Err(current) => Err(MarchingCubesError::CapacityExceeded {
                requested: n,
                available: capacity.saturating_sub(current),
                capacity,
            }),
        }
    }

    /// Writes `vertices` into a previously reserved range.
    ///
    /// Fails with [`MarchingCubesError::InvalidIndex`] if the lengths differ, the range
    /// lies outside the buffer, or a slot was already written.
    pub fn write(&self, slots: SlotRange, vertices: &[TableVertex]) -> Result<()> {
        if slots.len != vertices.len() {
            return Err(MarchingCubesError::InvalidIndex);
        }
        let targets = self
            .slots
            .get(slots.range())
            .ok_or(MarchingCubesError::InvalidIndex)?;
        for (slot, vertex) in targets.iter().zip(vertices) {
            slot.set(*vertex).map_err(|_| MarchingCubesError::InvalidIndex)?;
        }
        Ok(())
    }

    /// Reserves space for `triangles` and writes them.
    ///
    /// Triangles that do not fit are counted as dropped. No triangle is ever split.
    pub fn emit(&self, triangles: &[Triangle], mode: Reservation) -> Emitted {
        if triangles.is_empty() {
            return Emitted::default();
        }

        let written = match mode {
            Reservation::PerCell => match self.reserve(triangles.len() * 3) {
                Ok(slots) => match self.write(slots, triangles.as_flattened()) {
                    Ok(()) => triangles.len(),
                    Err(_) => 0,
                },
                Err(_) => self.emit_each(triangles),
            },
            Reservation::PerTriangle => self.emit_each(triangles),
        };

        let dropped = triangles.len() - written;
        if dropped > 0 {
            self.dropped_triangles.fetch_add(dropped, Ordering::Relaxed);
        }
        Emitted { written, dropped }
    }

    fn emit_each(&self, triangles: &[Triangle]) -> usize {
        let mut written = 0;
        for tri in triangles {
            let Ok(slots) = self.reserve(3) else {
                break;
            };
            if self.write(slots, tri).is_err() {
                break;
            }
            written += 1;
        }
        written
    }

    /// Consumes the allocator and returns the written prefix of the buffer.
    ///
    /// Must only be called once every writer has finished. Fails with
    /// [`MarchingCubesError::InvalidIndex`] if a claimed slot was never written.
    pub fn finish(self) -> Result<Vec<TableVertex>> {
        let count = self.counter.count();
        self.slots
            .into_vec()
            .into_iter()
            .take(count)
            .map(OnceLock::into_inner)
            .collect::<Option<Vec<_>>>()
            .ok_or(MarchingCubesError::InvalidIndex)
    }
}
