// src/producers/synthetic.rs
//
// Test-pattern camera: gray frames at a fixed rate, an alarm flag driven by
// a repeating schedule, delivered in random bursts like a jittery capture.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use bytes::Bytes;
use rand::Rng;

use crate::codecs::FrameRate;
use crate::core::timestamp::utc_us_now;
use crate::core::wait::StopWait;
use crate::frame::{Frame, PixelFormat, VideoPayload};
use crate::recorder::FrameProvider;
use crate::ring::FrameQueue;

use super::{Producer, ProducerStatus};

/// Alarm windows repeating every `period`, as offsets from the start.
#[derive(Debug, Clone, PartialEq)]
pub struct AlarmSchedule {
    pub period: Duration,
    pub windows: Vec<(Duration, Duration)>,
}

impl AlarmSchedule {
    pub fn is_alarmed(&self, elapsed: Duration) -> bool {
        if self.period.is_zero() {
            return false;
        }
        let offset = Duration::from_micros(
            (elapsed.as_micros() % self.period.as_micros()) as u64,
        );
        self.windows
            .iter()
            .any(|(start, end)| offset >= *start && offset < *end)
    }
}

pub struct SyntheticProvider {
    name: String,
    width: u32,
    height: u32,
    frame_rate: FrameRate,
    alive: AtomicBool,
}

impl SyntheticProvider {
    pub fn new(name: &str, width: u32, height: u32, frame_rate: FrameRate) -> Self {
        Self {
            name: name.to_string(),
            width,
            height,
            frame_rate,
            alive: AtomicBool::new(false),
        }
    }

    fn set_alive(&self, alive: bool) {
        self.alive.store(alive, Ordering::SeqCst);
    }

    fn pattern(&self, index: u64, alarmed: bool) -> Bytes {
        let (w, h) = (self.width as usize, self.height as usize);
        let bar = (index as usize * 4) % w.max(1);
        let mut data = Vec::with_capacity(w * h);
        for y in 0..h {
            for x in 0..w {
                let base = ((x + y) * 255 / (w + h).max(1)) as u8;
                let v = if x.abs_diff(bar) < 2 { 255 } else if alarmed { base / 2 } else { base };
                data.push(v);
            }
        }
        Bytes::from(data)
    }
}

impl FrameProvider for SyntheticProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn frame_rate(&self) -> FrameRate {
        self.frame_rate
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn pixel_format(&self) -> PixelFormat {
        PixelFormat::Gray8
    }

    fn has_video(&self) -> bool {
        true
    }

    fn has_audio(&self) -> bool {
        false
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}

pub struct SyntheticProducer {
    provider: Arc<SyntheticProvider>,
    queue: Arc<FrameQueue>,
    schedule: AlarmSchedule,
    max_burst: u32,
    running: Arc<AtomicBool>,
    stop_wait: Arc<StopWait>,
    frames_produced: Arc<AtomicU64>,
    alarmed_frames: Arc<AtomicU64>,
    thread_handle: Option<JoinHandle<()>>,
}

impl SyntheticProducer {
    pub fn new(
        provider: Arc<SyntheticProvider>,
        queue: Arc<FrameQueue>,
        schedule: AlarmSchedule,
        max_burst: u32,
    ) -> Self {
        Self {
            provider,
            queue,
            schedule,
            max_burst: max_burst.max(1),
            running: Arc::new(AtomicBool::new(false)),
            stop_wait: Arc::new(StopWait::new()),
            frames_produced: Arc::new(AtomicU64::new(0)),
            alarmed_frames: Arc::new(AtomicU64::new(0)),
            thread_handle: None,
        }
    }
}

impl Producer for SyntheticProducer {
    fn name(&self) -> &str {
        &self.provider.name
    }

    fn start(&mut self) -> anyhow::Result<()> {
        if self.running.load(Ordering::Relaxed) {
            return Ok(());
        }
        self.running.store(true, Ordering::SeqCst);
        self.provider.set_alive(true);

        let provider = self.provider.clone();
        let queue = self.queue.clone();
        let schedule = self.schedule.clone();
        let max_burst = self.max_burst;
        let running = self.running.clone();
        let stop_wait = self.stop_wait.clone();
        let frames_produced = self.frames_produced.clone();
        let alarmed_frames = self.alarmed_frames.clone();

        let handle = std::thread::Builder::new()
            .name(format!("producer-{}", provider.name))
            .spawn(move || {
                let interval_us = provider.frame_rate.frame_interval_us().max(1);
                let start_us = utc_us_now();
                let mut rng = rand::thread_rng();
                let mut index: u64 = 0;

                while running.load(Ordering::Relaxed) {
                    let burst = rng.gen_range(1..=max_burst);
                    for _ in 0..burst {
                        let ts = start_us + index * interval_us;
                        let alarmed = schedule.is_alarmed(Duration::from_micros(ts - start_us));
                        let frame = Frame::video(
                            &provider.name,
                            ts,
                            Some(alarmed),
                            VideoPayload {
                                width: provider.width,
                                height: provider.height,
                                pixel_format: PixelFormat::Gray8,
                                data: provider.pattern(index, alarmed),
                            },
                        );
                        queue.enqueue(frame.into_ptr());
                        frames_produced.fetch_add(1, Ordering::Relaxed);
                        if alarmed {
                            alarmed_frames.fetch_add(1, Ordering::Relaxed);
                        }
                        index += 1;
                    }

                    // hold the burst back until real time catches up with it
                    let due = start_us + index * interval_us;
                    let now = utc_us_now();
                    if due > now {
                        stop_wait.wait_timeout(Duration::from_micros(due - now));
                    }
                }
                provider.set_alive(false);
                log::info!("[producer] '{}' stopped after {} frames", provider.name, index);
            })?;

        self.thread_handle = Some(handle);
        Ok(())
    }

    fn stop(&mut self) -> anyhow::Result<()> {
        self.running.store(false, Ordering::SeqCst);
        self.stop_wait.notify_all();
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                anyhow::bail!("producer '{}' panicked", self.provider.name);
            }
        }
        self.provider.set_alive(false);
        Ok(())
    }

    fn status(&self) -> ProducerStatus {
        ProducerStatus {
            running: self.running.load(Ordering::Relaxed),
            frames_produced: self.frames_produced.load(Ordering::Relaxed),
            alarmed_frames: self.alarmed_frames.load(Ordering::Relaxed),
        }
    }
}
