// src/ring/frame_store.rs
use std::collections::VecDeque;
use std::time::Duration;

use crate::frame::FramePtr;

/// Pre-roll store: the most recent frames, bounded by age rather than count.
///
/// Eviction is lazy and happens on `insert`, measured against the `now`
/// supplied by the caller. Only the recording loop thread touches it.
pub struct FrameStore {
    frames: VecDeque<FramePtr>,
    max_head_age_us: i64,
    evicted: u64,
}

impl FrameStore {
    pub fn new(max_head_age: Duration) -> Self {
        Self {
            frames: VecDeque::new(),
            max_head_age_us: max_head_age.as_micros() as i64,
            evicted: 0,
        }
    }

    /// Append `frame`, then drop stale frames from the head.
    pub fn insert(&mut self, frame: FramePtr, now_us: u64) {
        if let Some(tail) = self.frames.back() {
            if frame.timestamp_us < tail.timestamp_us {
                log::debug!(
                    "frame {} (ts={}) older than store tail {} (ts={}), keeping arrival order",
                    frame.id,
                    frame.timestamp_us,
                    tail.id,
                    tail.timestamp_us
                );
            }
        }

        self.frames.push_back(frame);
        self.evict(now_us);
    }

    /// Remove head frames older than the configured age. Returns how many went.
    pub fn evict(&mut self, now_us: u64) -> usize {
        let mut removed = 0;
        while let Some(head) = self.frames.front() {
            log::trace!("frame {} age {}us", head.id, head.age(now_us));
            if head.age(now_us) <= self.max_head_age_us {
                break;
            }
            self.frames.pop_front();
            removed += 1;
        }
        self.evicted += removed as u64;
        removed
    }

    /// Oldest to newest.
    pub fn snapshot(&self) -> impl Iterator<Item = &FramePtr> + '_ {
        self.frames.iter()
    }

    pub fn head(&self) -> Option<&FramePtr> {
        self.frames.front()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn evicted(&self) -> u64 {
        self.evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{EventPhase, Frame, Notification};

    const SEC: u64 = 1_000_000;

    fn frame(ts: u64) -> FramePtr {
        Frame::notification("s", ts, Notification::event(0, 0, EventPhase::Begin)).into_ptr()
    }

    #[test]
    fn test_keeps_frames_within_age() {
        let mut store = FrameStore::new(Duration::from_secs(2));
        for t in 0..=2 {
            store.insert(frame(t * SEC), t * SEC);
        }
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_head_evicted_when_older_than_max_age() {
        let mut store = FrameStore::new(Duration::from_secs(2));
        for t in 0..=5 {
            store.insert(frame(t * SEC), t * SEC);
        }
        // at now=5s frame 2 (age 3s) is gone, frame 3 (age exactly 2s) stays
        let stamps: Vec<u64> = store.snapshot().map(|f| f.timestamp_us / SEC).collect();
        assert_eq!(stamps, vec![3, 4, 5]);
        assert_eq!(store.evicted(), 3);
    }

    #[test]
    fn test_eviction_is_lazy() {
        let mut store = FrameStore::new(Duration::from_secs(1));
        store.insert(frame(0), 0);
        // nothing happens until the next insert
        assert_eq!(store.len(), 1);
        store.insert(frame(10 * SEC), 10 * SEC);
        assert_eq!(store.len(), 1);
        assert_eq!(store.head().map(|f| f.timestamp_us), Some(10 * SEC));
    }

    #[test]
    fn test_stale_frame_into_empty_store_is_dropped() {
        let mut store = FrameStore::new(Duration::from_secs(2));
        store.insert(frame(0), 10 * SEC);
        assert!(store.is_empty());
        assert_eq!(store.evicted(), 1);

        store.insert(frame(9 * SEC), 10 * SEC);
        assert_eq!(store.len(), 1);
    }
}
