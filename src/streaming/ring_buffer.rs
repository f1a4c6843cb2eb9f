//! Sample ring buffer between a clip worker and the audio callback
//!
//! The clip worker pushes converted samples, the output stream pulls them.
//! Storage is allocated once, so memory stays at `capacity * 4` bytes for
//! the life of the sink.

use crate::{ClipError, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Largest accepted allocation (64 MB of f32 samples)
const MAX_CAPACITY: usize = 64 * 1024 * 1024 / std::mem::size_of::<f32>();

/// Single-producer, single-consumer f32 ring buffer
///
/// Positions only grow; the slot index is `pos & mask`. One slot is kept
/// free so a full buffer is distinguishable from an empty one.
#[derive(Debug)]
pub struct RingBuffer {
    slots: Mutex<Box<[f32]>>,
    head: AtomicUsize,
    tail: AtomicUsize,
    mask: usize,
}

impl RingBuffer {
    /// Create a buffer holding at least `requested` samples.
    /// Capacity is rounded up to the next power of two.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a zero or oversized capacity.
    pub fn new(requested: usize) -> Result<Self> {
        if requested == 0 {
            return Err(ClipError::InvalidArgument(
                "Ring buffer capacity must be greater than 0".into(),
            ));
        }

        let capacity = requested.next_power_of_two();
        if capacity > MAX_CAPACITY {
            return Err(ClipError::InvalidArgument(format!(
                "Ring buffer capacity {capacity} exceeds maximum {MAX_CAPACITY}"
            )));
        }

        Ok(RingBuffer {
            slots: Mutex::new(vec![0.0; capacity].into_boxed_slice()),
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            mask: capacity - 1,
        })
    }

    /// Total number of slots
    pub fn capacity(&self) -> usize {
        self.mask + 1
    }

    /// Samples waiting to be read
    pub fn available_read(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        head.wrapping_sub(tail)
    }

    /// Samples that can be written without overwriting unread data
    pub fn available_write(&self) -> usize {
        self.capacity() - 1 - self.available_read()
    }

    /// Copy as many samples as fit; returns how many were written
    pub fn write(&self, samples: &[f32]) -> usize {
        let mut slots = self.slots.lock();
        let head = self.head.load(Ordering::Acquire);
        let count = samples.len().min(self.available_write());
        if count == 0 {
            return 0;
        }

        let start = head & self.mask;
        let first = count.min(self.capacity() - start);
        slots[start..start + first].copy_from_slice(&samples[..first]);
        slots[..count - first].copy_from_slice(&samples[first..count]);
        drop(slots);

        self.head.store(head.wrapping_add(count), Ordering::Release);
        count
    }

    /// Copy up to `dest.len()` samples out; returns how many were read
    pub fn read(&self, dest: &mut [f32]) -> usize {
        let slots = self.slots.lock();
        let tail = self.tail.load(Ordering::Acquire);
        let count = dest.len().min(self.available_read());
        if count == 0 {
            return 0;
        }

        let start = tail & self.mask;
        let first = count.min(self.capacity() - start);
        dest[..first].copy_from_slice(&slots[start..start + first]);
        dest[first..count].copy_from_slice(&slots[..count - first]);
        drop(slots);

        self.tail.store(tail.wrapping_add(count), Ordering::Release);
        count
    }

    /// Discard everything not yet read
    pub fn flush(&self) {
        let head = self.head.load(Ordering::Acquire);
        self.tail.store(head, Ordering::Release);
    }

    /// Whether nothing is waiting to be read
    pub fn is_empty(&self) -> bool {
        self.available_read() == 0
    }
}
