use std::time::Instant;

use bytes::Bytes;

use event_recorder::frame::{Frame, PixelFormat, VideoPayload};
use event_recorder::ring::{FrameQueue, FrameStore};

fn main() {
    let payload = VideoPayload {
        width: 320,
        height: 240,
        pixel_format: PixelFormat::Gray8,
        data: Bytes::from(vec![0u8; 320 * 240]),
    };

    // 15 fps with a 2s head age keeps ~30 frames resident
    let interval_us = 66_667;
    let iterations: u64 = 100_000;
    let mut store = FrameStore::new(std::time::Duration::from_secs(2));

    let start = Instant::now();
    for i in 0..iterations {
        let ts = i * interval_us;
        let frame = Frame::video("bench", ts, Some(false), payload.clone()).into_ptr();
        store.insert(frame, ts);
    }
    let elapsed = start.elapsed();

    println!(
        "FrameStore benchmark: {} inserts in {:.2?} ({:.0} ops/s), {} resident, {} evicted",
        iterations,
        elapsed,
        iterations as f64 / elapsed.as_secs_f64(),
        store.len(),
        store.evicted()
    );

    let queue = FrameQueue::new();
    let start = Instant::now();
    let mut drained = 0usize;
    for i in 0..iterations {
        queue.enqueue(Frame::video("bench", i, Some(false), payload.clone()).into_ptr());
        if i % 8 == 7 {
            drained += queue.drain_all().len();
        }
    }
    drained += queue.drain_all().len();
    let elapsed = start.elapsed();

    println!(
        "FrameQueue benchmark: {} enqueues, {} drained in {:.2?} ({:.0} ops/s)",
        iterations,
        drained,
        elapsed,
        iterations as f64 / elapsed.as_secs_f64()
    );
}
