// src/ring/queue.rs
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::core::lock::lock_mutex;
use crate::frame::FramePtr;

/// Hand-off between the capture thread and the recording loop.
///
/// Unbounded: `enqueue` never rejects. The lock is held only for the
/// append or the detach, never while frames are processed.
#[derive(Default)]
pub struct FrameQueue {
    pending: Mutex<Vec<FramePtr>>,
    enqueued: AtomicU64,
    drained: AtomicU64,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, frame: FramePtr) {
        lock_mutex(&self.pending, "FrameQueue::enqueue").push(frame);
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    /// Detach everything pending, in arrival order, leaving the queue empty.
    pub fn drain_all(&self) -> Vec<FramePtr> {
        let batch = std::mem::take(&mut *lock_mutex(&self.pending, "FrameQueue::drain_all"));
        self.drained.fetch_add(batch.len() as u64, Ordering::Relaxed);
        batch
    }

    pub fn len(&self) -> usize {
        lock_mutex(&self.pending, "FrameQueue::len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Frames accepted since creation.
    pub fn enqueued(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    /// Frames handed to the recording loop since creation.
    pub fn drained(&self) -> u64 {
        self.drained.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Frame, Notification, EventPhase};

    fn frame(ts: u64) -> FramePtr {
        Frame::notification("q", ts, Notification::event(0, 0, EventPhase::Begin)).into_ptr()
    }

    #[test]
    fn test_drain_preserves_order_and_empties() {
        let queue = FrameQueue::new();
        for ts in 0..5 {
            queue.enqueue(frame(ts));
        }
        assert_eq!(queue.len(), 5);

        let batch = queue.drain_all();
        let stamps: Vec<u64> = batch.iter().map(|f| f.timestamp_us).collect();
        assert_eq!(stamps, vec![0, 1, 2, 3, 4]);
        assert!(queue.is_empty());
        assert!(queue.drain_all().is_empty());
        assert_eq!(queue.enqueued(), 5);
        assert_eq!(queue.drained(), 5);
    }
}
