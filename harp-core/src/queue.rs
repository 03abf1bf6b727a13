//! Bounded frame queues
//!
//! A ring of frames behind a blocking mutex. With a
//! `CriticalSectionRawMutex` every push and pop runs with interrupts
//! masked, so an interrupt-tier producer can append while a task is
//! popping. Pushing into a full queue evicts the oldest frame.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use harp_protocol::Frame;
use heapless::Deque;

/// Default queue capacity
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

/// Bounded FIFO of frames with drop-oldest overflow
pub struct FrameQueue<M: RawMutex, const N: usize> {
    inner: Mutex<M, RefCell<Deque<Frame, N>>>,
}

impl<M: RawMutex, const N: usize> FrameQueue<M, N> {
    /// Create an empty queue
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Deque::new())),
        }
    }

    /// Append a frame
    ///
    /// Returns the evicted frame if the queue was full.
    pub fn push(&self, frame: Frame) -> Option<Frame> {
        self.inner.lock(|cell| {
            let mut queue = cell.borrow_mut();
            let evicted = if queue.is_full() {
                queue.pop_front()
            } else {
                None
            };
            // Cannot fail: a slot was freed above if the queue was full
            let _ = queue.push_back(frame);
            evicted
        })
    }

    /// Remove the oldest frame
    pub fn pop(&self) -> Option<Frame> {
        self.inner.lock(|cell| cell.borrow_mut().pop_front())
    }

    /// Number of queued frames
    pub fn len(&self) -> usize {
        self.inner.lock(|cell| cell.borrow().len())
    }

    /// Check if no frame is queued
    pub fn is_empty(&self) -> bool {
        self.inner.lock(|cell| cell.borrow().is_empty())
    }

    /// Maximum number of frames held
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Drop every queued frame
    pub fn clear(&self) {
        self.inner.lock(|cell| cell.borrow_mut().clear())
    }
}

impl<M: RawMutex, const N: usize> Default for FrameQueue<M, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use harp_protocol::{MessageType, PayloadType};

    fn frame(address: u8) -> Frame {
        let mut f = Frame::new(MessageType::Event.code(), 4, address, PayloadType::U8, None).unwrap();
        f.finalize_checksum();
        f
    }

    #[test]
    fn test_fifo_order() {
        let queue: FrameQueue<NoopRawMutex, 4> = FrameQueue::new();
        for address in 0..3 {
            assert!(queue.push(frame(address)).is_none());
        }
        assert_eq!(queue.len(), 3);
        for address in 0..3 {
            assert_eq!(queue.pop().map(|f| f.address()), Some(address));
        }
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_overflow_evicts_oldest() {
        let queue: FrameQueue<NoopRawMutex, 2> = FrameQueue::new();
        queue.push(frame(1));
        queue.push(frame(2));
        let evicted = queue.push(frame(3));
        assert_eq!(evicted.map(|f| f.address()), Some(1));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop().map(|f| f.address()), Some(2));
        assert_eq!(queue.pop().map(|f| f.address()), Some(3));
    }

    #[test]
    fn test_clear() {
        let queue: FrameQueue<NoopRawMutex, 2> = FrameQueue::new();
        queue.push(frame(1));
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.capacity(), 2);
    }
}
