// src/main.rs

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use log::{debug, info};

use event_recorder::codecs::ContainerEncoder;
use event_recorder::config::Config;
use event_recorder::core::{Consumer, FrameBus, NotificationLog, SystemClock};
use event_recorder::producers::{Producer, SyntheticProducer, SyntheticProvider};
use event_recorder::recorder::VideoRecorder;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    // ------------------------------------------------------------
    // Config
    // ------------------------------------------------------------
    let cfg_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "recorder.toml".into());

    let cfg = Config::load(&cfg_path)?;
    info!("[recorder] loaded {}", cfg_path);

    // ------------------------------------------------------------
    // Graceful shutdown
    // ------------------------------------------------------------
    let running = Arc::new(AtomicBool::new(true));
    {
        let r = running.clone();
        ctrlc::set_handler(move || {
            info!("[recorder] shutdown requested");
            r.store(false, Ordering::SeqCst);
        })?;
    }

    // ------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------
    let bus = Arc::new(FrameBus::new("notifications"));
    let notification_log = NotificationLog::spawn(
        bus.subscribe(),
        cfg.notifications.jsonl_path.as_ref().map(PathBuf::from),
    )?;

    // ------------------------------------------------------------
    // Provider / Recorder
    // ------------------------------------------------------------
    let provider = Arc::new(SyntheticProvider::new(
        &cfg.provider.name,
        cfg.provider.width,
        cfg.provider.height,
        cfg.provider.frame_rate,
    ));

    let mut recorder = VideoRecorder::new(
        cfg.recorder_settings(),
        provider.clone(),
        Box::new(ContainerEncoder::new()),
        bus.clone(),
        Arc::new(SystemClock),
    );
    recorder.start()?;

    let mut producer = SyntheticProducer::new(
        provider,
        recorder.queue(),
        cfg.alarm_schedule(),
        cfg.provider.max_burst,
    );
    producer.start()?;

    // ------------------------------------------------------------
    // Main loop
    // ------------------------------------------------------------
    let mut last_stats = Instant::now();
    while running.load(Ordering::SeqCst) && recorder.is_running() {
        std::thread::sleep(Duration::from_millis(100));

        if last_stats.elapsed() >= Duration::from_secs(5) {
            let status = recorder.status();
            let produced = producer.status();
            debug!(
                "[recorder] state={:?} frames={} encoded={} events={} recording={} produced={} alarmed={}",
                recorder.state(),
                status.frames_processed,
                status.frames_encoded,
                status.events_recorded,
                status.recording,
                produced.frames_produced,
                produced.alarmed_frames
            );
            last_stats = Instant::now();
        }
    }

    // ------------------------------------------------------------
    // Shutdown
    // ------------------------------------------------------------
    producer.stop()?;
    let result = recorder.stop();
    let status = recorder.status();
    info!(
        "[recorder] done: {} frames processed, {} events, {} errors",
        status.frames_processed, status.events_recorded, status.errors
    );

    drop(recorder);
    drop(bus);
    notification_log.join();

    result
}
