use std::sync::atomic::{AtomicUsize, Ordering};

use crate::pvec::ParVec;
use crate::SharedMut;

/// The double-buffered frontier queue used by level-synchronous traversals.
///
/// A single bounded buffer holds both the current read window
/// `[out_start, out_end)` and everything pushed since the last
/// [`SlidingQueue::slide_window`] at `[out_end, in)`. Concurrent pushes
/// reserve slots with a fetch-and-add on `in` and stay invisible to readers
/// until the window slides. Pushes from parallel regions should go through a
/// thread-local [`QueueBuffer`] which amortizes the reservation.
pub struct SlidingQueue<T> {
    storage: ParVec<T>,
    base: SharedMut<T>,
    in_index: AtomicUsize,
    out_start: usize,
    out_end: usize,
}

unsafe impl<T: Send> Send for SlidingQueue<T> {}
unsafe impl<T: Send + Sync> Sync for SlidingQueue<T> {}

impl<T> SlidingQueue<T>
where
    T: Copy + Send + Sync,
{
    /// Creates a queue that can hold up to `capacity` elements across all
    /// windows between two resets.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut storage = ParVec::uninit(capacity).expect("queue allocation failed");
        let base = storage.shared_ptr();
        Self {
            storage,
            base,
            in_index: AtomicUsize::new(0),
            out_start: 0,
            out_end: 0,
        }
    }

    /// Appends a single element behind the current read window.
    pub fn push(&self, value: T) {
        let slot = self.in_index.fetch_add(1, Ordering::AcqRel);
        debug_assert!(slot < self.storage.len());
        // SAFETY: the fetch_add hands out each slot exactly once and the
        //         queue never wraps within a traversal.
        unsafe {
            self.base.add(slot).write(value);
        }
    }

    /// Reserves `len` consecutive slots and returns the first index.
    fn reserve(&self, len: usize) -> usize {
        let start = self.in_index.fetch_add(len, Ordering::AcqRel);
        debug_assert!(start + len <= self.storage.len());
        start
    }

    /// Advances the read window over everything pushed since the last slide.
    pub fn slide_window(&mut self) {
        self.out_start = self.out_end;
        self.out_end = self.in_index.load(Ordering::Acquire);
    }

    /// The current read window.
    pub fn window(&self) -> &[T] {
        // SAFETY: all slots below `in` were written before the window slid.
        unsafe { &self.storage.assume_init_slice(self.out_end)[self.out_start..] }
    }

    /// Position of the first element of the current read window within the
    /// backing storage. Stable across slides, which lets traversals remember
    /// per-level segments.
    pub fn window_start(&self) -> usize {
        self.out_start
    }

    /// The elements pushed between two storage positions.
    pub fn segment(&self, start: usize, end: usize) -> &[T] {
        // SAFETY: callers obtain positions from `window_start`, which only
        //         covers published slots.
        unsafe { &self.storage.assume_init_slice(end)[start..] }
    }

    pub fn len(&self) -> usize {
        self.out_end - self.out_start
    }

    pub fn is_empty(&self) -> bool {
        self.out_start == self.out_end
    }

    /// Forgets all contents and rewinds the queue to its initial state.
    pub fn reset(&mut self) {
        self.in_index.store(0, Ordering::Release);
        self.out_start = 0;
        self.out_end = 0;
    }
}

/// A thread-local staging buffer for [`SlidingQueue`] pushes.
///
/// Pushes accumulate locally and are copied into the shared queue with a
/// single slot reservation once the buffer runs full or is flushed.
pub struct QueueBuffer<'q, T> {
    queue: &'q SlidingQueue<T>,
    local: Vec<T>,
}

pub const LOCAL_QUEUE_CAPACITY: usize = 16384;

impl<'q, T> QueueBuffer<'q, T>
where
    T: Copy + Send + Sync,
{
    pub fn new(queue: &'q SlidingQueue<T>) -> Self {
        Self::with_capacity(queue, LOCAL_QUEUE_CAPACITY)
    }

    pub fn with_capacity(queue: &'q SlidingQueue<T>, capacity: usize) -> Self {
        Self {
            queue,
            local: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, value: T) {
        if self.local.len() == self.local.capacity() {
            self.flush();
        }
        self.local.push(value);
    }

    pub fn flush(&mut self) {
        if self.local.is_empty() {
            return;
        }
        let copy_start = self.queue.reserve(self.local.len());
        for (offset, &value) in self.local.iter().enumerate() {
            // SAFETY: the reserved range belongs exclusively to this buffer.
            unsafe {
                self.queue.base.add(copy_start + offset).write(value);
            }
        }
        self.local.clear();
    }
}

impl<T> Drop for QueueBuffer<'_, T> {
    fn drop(&mut self) {
        debug_assert!(self.local.is_empty(), "queue buffer dropped unflushed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pushes_become_visible_after_slide() {
        let mut queue = SlidingQueue::with_capacity(8);
        queue.push(1);
        queue.push(2);
        assert!(queue.is_empty());

        queue.slide_window();
        assert_eq!(queue.window(), &[1, 2]);

        queue.push(3);
        assert_eq!(queue.window(), &[1, 2]);

        queue.slide_window();
        assert_eq!(queue.window(), &[3]);

        queue.slide_window();
        assert!(queue.is_empty());
    }

    #[test]
    fn buffered_pushes_flush_in_bulk() {
        let mut queue = SlidingQueue::with_capacity(64);
        {
            let mut buffer = QueueBuffer::with_capacity(&queue, 4);
            for value in 0..10 {
                buffer.push(value);
            }
            buffer.flush();
        }
        queue.slide_window();

        let mut window = queue.window().to_vec();
        window.sort_unstable();
        assert_eq!(window, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn segments_track_levels() {
        let mut queue = SlidingQueue::with_capacity(8);
        queue.push(7);
        queue.slide_window();
        let level_0 = queue.window_start();
        queue.push(8);
        queue.push(9);
        queue.slide_window();
        let level_1 = queue.window_start();
        queue.slide_window();
        let end = queue.window_start();

        assert_eq!(queue.segment(level_0, level_1), &[7]);
        assert_eq!(queue.segment(level_1, end), &[8, 9]);
    }
}
