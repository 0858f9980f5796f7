//! Lock-free single-producer/single-consumer byte ring.
//!
//! The capture-completion context owns the [`Producer`] and the foreground
//! owns the [`Consumer`]. Each index is only ever stored by the handle that
//! owns it, so neither side needs a lock and neither side ever blocks.
//!
//! One slot always stays empty: the ring is full when advancing the write
//! index would make it equal the read index, which keeps "full" and "empty"
//! distinguishable from the indices alone. A ring of capacity `N` therefore
//! holds at most `N - 1` bytes.

use core::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};

pub struct RxBuffer<const N: usize> {
    slots: [AtomicU8; N],
    head: AtomicUsize, // Consumer reads from head
    tail: AtomicUsize, // Producer writes to tail
    split: AtomicBool,
}

/// Write half of an [`RxBuffer`].
pub struct Producer<'a, const N: usize> {
    ring: &'a RxBuffer<N>,
}

/// Read half of an [`RxBuffer`].
pub struct Consumer<'a, const N: usize> {
    ring: &'a RxBuffer<N>,
}

impl<const N: usize> Default for RxBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RxBuffer<N> {
    const CAPACITY_OK: () = assert!(N >= 2, "RxBuffer needs at least two slots");

    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::CAPACITY_OK;
        Self {
            slots: [const { AtomicU8::new(0) }; N],
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            split: AtomicBool::new(false),
        }
    }

    /// Hands out the two halves of the ring.
    ///
    /// Returns `None` on every call after the first, so there is never more
    /// than one producer or one consumer.
    pub fn split(&self) -> Option<(Producer<'_, N>, Consumer<'_, N>)> {
        if self.split.swap(true, Ordering::AcqRel) {
            return None;
        }
        Some((Producer { ring: self }, Consumer { ring: self }))
    }

    /// Number of bytes the ring can hold at once.
    pub const fn capacity(&self) -> usize {
        N - 1
    }

    fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        (tail + N - head) % N
    }
}

impl<const N: usize> Producer<'_, N> {
    /// Appends `byte`, handing it back if the ring is full.
    ///
    /// Bounded and allocation free; safe to call from interrupt context.
    pub fn push(&mut self, byte: u8) -> Result<(), u8> {
        let ring = self.ring;
        let tail = ring.tail.load(Ordering::Relaxed);
        let next = (tail + 1) % N;

        if next == ring.head.load(Ordering::Acquire) {
            return Err(byte);
        }

        ring.slots[tail].store(byte, Ordering::Relaxed);
        ring.tail.store(next, Ordering::Release);
        Ok(())
    }

    pub fn is_full(&self) -> bool {
        self.ring.len() == N - 1
    }
}

impl<const N: usize> Consumer<'_, N> {
    /// Takes the oldest byte, or `None` if the ring is empty.
    pub fn pop(&mut self) -> Option<u8> {
        let ring = self.ring;
        let head = ring.head.load(Ordering::Relaxed);

        if head == ring.tail.load(Ordering::Acquire) {
            return None;
        }

        let byte = ring.slots[head].load(Ordering::Relaxed);
        ring.head.store((head + 1) % N, Ordering::Release);
        Some(byte)
    }

    /// Number of bytes ready to be read.
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Discards everything currently queued.
    ///
    /// Only moves the read index, so it stays sound while the producer runs;
    /// bytes pushed after the flush are kept.
    pub fn flush(&mut self) {
        let tail = self.ring.tail.load(Ordering::Acquire);
        self.ring.head.store(tail, Ordering::Release);
    }

    pub const fn capacity(&self) -> usize {
        N - 1
    }
}
