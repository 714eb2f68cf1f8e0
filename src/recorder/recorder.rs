// src/recorder/recorder.rs
//
// Recording loop: drains the ingestion queue on a fixed tick, feeds the
// event controller and watches provider liveness.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::codecs::{Encoder, EncoderConfig};
use crate::core::bus::DistributionBus;
use crate::core::consumer::{Consumer, ConsumerStatus};
use crate::core::error::RecorderResult;
use crate::core::logging::{ComponentLogger, LogContext};
use crate::core::timestamp::Clock;
use crate::core::wait::StopWait;
use crate::frame::FramePtr;
use crate::ring::FrameQueue;

use super::controller::{AlarmState, EventController, EventTiming};
use super::notify::NotificationEmitter;
use super::{DEFAULT_TICK, FrameProvider};

#[derive(Debug, Clone)]
pub struct RecorderSettings {
    pub name: String,
    pub location: PathBuf,
    pub tick: Duration,
    pub timing: EventTiming,
    pub encoder: EncoderConfig,
}

impl RecorderSettings {
    pub fn new(name: &str, location: impl Into<PathBuf>, encoder: EncoderConfig) -> Self {
        Self {
            name: name.to_string(),
            location: location.into(),
            tick: DEFAULT_TICK,
            timing: EventTiming::default(),
            encoder,
        }
    }
}

#[derive(Default)]
struct RecorderStats {
    frames_processed: AtomicU64,
    frames_encoded: AtomicU64,
    events: AtomicU64,
    errors: AtomicU64,
    state: AtomicU8,
    recording: AtomicBool,
}

struct LoopContext {
    name: String,
    tick: Duration,
    queue: Arc<FrameQueue>,
    provider: Arc<dyn FrameProvider>,
    clock: Arc<dyn Clock>,
    running: Arc<AtomicBool>,
    stop_wait: Arc<StopWait>,
    stats: Arc<RecorderStats>,
}

impl ComponentLogger for LoopContext {
    fn log_context(&self) -> LogContext {
        LogContext::new("VideoRecorder", &self.name)
    }
}

pub struct VideoRecorder {
    settings: RecorderSettings,
    queue: Arc<FrameQueue>,
    provider: Arc<dyn FrameProvider>,
    bus: Arc<dyn DistributionBus>,
    clock: Arc<dyn Clock>,
    encoder: Option<Box<dyn Encoder>>,
    running: Arc<AtomicBool>,
    stop_wait: Arc<StopWait>,
    stats: Arc<RecorderStats>,
    thread_handle: Option<JoinHandle<RecorderResult<()>>>,
}

impl VideoRecorder {
    pub fn new(
        settings: RecorderSettings,
        provider: Arc<dyn FrameProvider>,
        encoder: Box<dyn Encoder>,
        bus: Arc<dyn DistributionBus>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            settings,
            queue: Arc::new(FrameQueue::new()),
            provider,
            bus,
            clock,
            encoder: Some(encoder),
            running: Arc::new(AtomicBool::new(false)),
            stop_wait: Arc::new(StopWait::new()),
            stats: Arc::new(RecorderStats::default()),
            thread_handle: None,
        }
    }

    /// Producer side hand-off. Never blocks beyond the queue append.
    pub fn enqueue(&self, frame: FramePtr) {
        self.queue.enqueue(frame);
    }

    pub fn queue(&self) -> Arc<FrameQueue> {
        self.queue.clone()
    }

    pub fn state(&self) -> AlarmState {
        AlarmState::from_u8(self.stats.state.load(Ordering::Relaxed))
    }

    pub fn settings(&self) -> &RecorderSettings {
        &self.settings
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    fn run_loop(ctx: LoopContext, mut controller: EventController) -> RecorderResult<()> {
        let result = Self::drive(&ctx, &mut controller);
        ctx.running.store(false, Ordering::SeqCst);

        match result {
            Ok(()) => {
                let finished = controller.finish(ctx.clock.now_us());
                Self::publish_stats(&ctx, &controller);
                if let Err(e) = &finished {
                    ctx.stats.errors.fetch_add(1, Ordering::Relaxed);
                    ctx.error(&format!("failed to finalize event: {}", e));
                }
                ctx.info("recording loop stopped");
                finished
            }
            Err(e) => {
                ctx.stats.errors.fetch_add(1, Ordering::Relaxed);
                ctx.error(&format!("fatal: {}", e));
                controller.abandon();
                Self::publish_stats(&ctx, &controller);
                Err(e)
            }
        }
    }

    fn drive(ctx: &LoopContext, controller: &mut EventController) -> RecorderResult<()> {
        while ctx.running.load(Ordering::Relaxed) {
            Self::process_batch(ctx, controller)?;

            if !ctx.provider.is_alive() {
                ctx.warn(&format!("provider '{}' is gone, stopping", ctx.provider.name()));
                break;
            }

            ctx.stop_wait.wait_timeout(ctx.tick);
        }

        // whatever the producer queued before the stop still belongs to the recording
        Self::process_batch(ctx, controller)
    }

    fn process_batch(ctx: &LoopContext, controller: &mut EventController) -> RecorderResult<()> {
        let batch = ctx.queue.drain_all();
        if batch.is_empty() {
            return Ok(());
        }

        for frame in &batch {
            controller.process(frame, ctx.clock.now_us())?;
            ctx.stats.frames_processed.fetch_add(1, Ordering::Relaxed);
        }
        Self::publish_stats(ctx, controller);
        Ok(())
    }

    fn publish_stats(ctx: &LoopContext, controller: &EventController) {
        ctx.stats
            .events
            .store(controller.event_count(), Ordering::Relaxed);
        ctx.stats
            .frames_encoded
            .store(controller.frames_encoded(), Ordering::Relaxed);
        ctx.stats
            .state
            .store(controller.state().as_u8(), Ordering::Relaxed);
        ctx.stats
            .recording
            .store(controller.is_recording(), Ordering::Relaxed);
    }

    fn wait_for_provider(ctx: &LoopContext) -> bool {
        while !ctx.provider.is_alive() {
            if !ctx.running.load(Ordering::Relaxed) {
                return false;
            }
            ctx.stop_wait.wait_timeout(ctx.tick);
        }
        true
    }
}

impl Consumer for VideoRecorder {
    fn name(&self) -> &str {
        &self.settings.name
    }

    fn start(&mut self) -> Result<()> {
        if self.running.load(Ordering::Relaxed) {
            return Ok(());
        }
        let encoder = self
            .encoder
            .take()
            .ok_or_else(|| anyhow::anyhow!("VideoRecorder '{}' cannot be restarted", self.settings.name))?;

        std::fs::create_dir_all(&self.settings.location).with_context(|| {
            format!("creating recording location {}", self.settings.location.display())
        })?;

        self.info(&format!(
            "starting, writing {}/{}-<event>.{}",
            self.settings.location.display(),
            self.settings.name,
            self.settings.encoder.format
        ));
        self.running.store(true, Ordering::SeqCst);

        let ctx = LoopContext {
            name: self.settings.name.clone(),
            tick: self.settings.tick,
            queue: self.queue.clone(),
            provider: self.provider.clone(),
            clock: self.clock.clone(),
            running: self.running.clone(),
            stop_wait: self.stop_wait.clone(),
            stats: self.stats.clone(),
        };
        let settings = self.settings.clone();
        let emitter = NotificationEmitter::new(&settings.name, self.bus.clone());

        let handle = std::thread::Builder::new()
            .name(format!("recorder-{}", settings.name))
            .spawn(move || {
                if !Self::wait_for_provider(&ctx) {
                    ctx.info("stopped before provider became ready");
                    return Ok(());
                }

                let source = ctx.provider.source_params();
                ctx.info(&format!(
                    "provider '{}' ready: {}/{} fps, {}x{} {} (video={}, audio={})",
                    ctx.provider.name(),
                    source.frame_rate.num,
                    source.frame_rate.den,
                    source.width,
                    source.height,
                    source.pixel_format,
                    source.has_video,
                    source.has_audio
                ));

                let controller = EventController::new(
                    &settings.name,
                    settings.location,
                    settings.timing,
                    encoder,
                    settings.encoder,
                    source,
                    emitter,
                );
                Self::run_loop(ctx, controller)
            })?;

        self.thread_handle = Some(handle);
        Ok(())
    }

    /// Signal the loop, wait for it to finalize, and surface a fatal error
    /// if the loop ended on one.
    fn stop(&mut self) -> Result<()> {
        self.info("stopping...");
        self.running.store(false, Ordering::SeqCst);
        self.stop_wait.notify_all();

        if let Some(handle) = self.thread_handle.take() {
            match handle.join() {
                Ok(result) => result.context("recording loop failed")?,
                Err(_) => anyhow::bail!("recording loop for '{}' panicked", self.settings.name),
            }
        }
        Ok(())
    }

    fn status(&self) -> ConsumerStatus {
        ConsumerStatus {
            running: self.running.load(Ordering::Relaxed),
            connected: self.provider.is_alive(),
            recording: self.stats.recording.load(Ordering::Relaxed),
            frames_processed: self.stats.frames_processed.load(Ordering::Relaxed),
            frames_encoded: self.stats.frames_encoded.load(Ordering::Relaxed),
            events_recorded: self.stats.events.load(Ordering::Relaxed),
            errors: self.stats.errors.load(Ordering::Relaxed),
        }
    }
}

impl ComponentLogger for VideoRecorder {
    fn log_context(&self) -> LogContext {
        LogContext::new("VideoRecorder", &self.settings.name)
    }
}

impl Drop for VideoRecorder {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            if let Err(e) = self.stop() {
                log::error!("[VideoRecorder:{}] {}", self.settings.name, e);
            }
        }
    }
}
