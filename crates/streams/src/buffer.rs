use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;

/// Fixed-capacity queue that evicts the oldest element on overflow.
///
/// Iteration order is oldest → newest. A requested capacity of zero is
/// raised to one.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    buf: VecDeque<T>,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buf: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push a value, evicting the oldest entry first when at capacity.
    pub fn push(&mut self, value: T) {
        while self.buf.len() >= self.capacity {
            self.buf.pop_front();
        }
        self.buf.push_back(value);
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.buf.iter()
    }

    /// The most recently pushed value, if any.
    pub fn last(&self) -> Option<&T> {
        self.buf.back()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

/// Shared frame buffer for one inbound stream.
///
/// Written by the receive loop, read by the tick. Readers get a cheap
/// `Bytes` clone taken under the lock, never a reference into the buffer.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    inner: Arc<Mutex<RingBuffer<Bytes>>>,
}

impl FrameBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RingBuffer::new(capacity))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RingBuffer<Bytes>> {
        // A panicked writer leaves the ring structurally valid.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, frame: Bytes) {
        self.lock().push(frame);
    }

    /// Newest frame, or `None` when nothing has arrived yet.
    pub fn latest(&self) -> Option<Bytes> {
        self.lock().last().cloned()
    }

    /// All buffered frames, oldest first.
    pub fn snapshot(&self) -> Vec<Bytes> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}
