// src/recorder/controller.rs
//
// Alarm state machine. Decides when an event opens and closes, feeds the
// pre-roll store and drives the encoder. Runs only on the recording loop
// thread.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::codecs::{Encoder, EncoderConfig, OutputTarget, SourceParams};
use crate::core::error::RecorderResult;
use crate::core::logging::{ComponentLogger, LogContext};
use crate::core::timestamp::{format_utc_us, span_secs};
use crate::frame::{FramePtr, Payload};
use crate::ring::FrameStore;

use super::notify::NotificationEmitter;
use super::{DEFAULT_MAX_EVENT_HEAD_AGE, DEFAULT_MAX_EVENT_TAIL_AGE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AlarmState {
    Idle,
    Alarm,
    Alert,
}

impl AlarmState {
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => AlarmState::Alarm,
            2 => AlarmState::Alert,
            _ => AlarmState::Idle,
        }
    }
}

/// Look-back, look-ahead and minimum length of an event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventTiming {
    /// Pre-roll depth kept in the frame store.
    pub max_head_age: Duration,
    /// Quiet period after the last alarm frame before the event may close.
    pub max_tail_age: Duration,
    /// Events shorter than this (last alarm - onset) are held open.
    pub min_event_duration: Duration,
}

impl Default for EventTiming {
    fn default() -> Self {
        Self {
            max_head_age: DEFAULT_MAX_EVENT_HEAD_AGE,
            max_tail_age: DEFAULT_MAX_EVENT_TAIL_AGE,
            min_event_duration: Duration::ZERO,
        }
    }
}

struct OpenEvent {
    seq: u64,
    onset_us: u64,
    alarm_source_id: u64,
    target: Box<dyn OutputTarget>,
}

pub struct EventController {
    name: String,
    location: PathBuf,
    format: String,
    timing: EventTiming,
    state: AlarmState,
    last_alarm_us: u64,
    event_count: u64,
    current: Option<OpenEvent>,
    store: FrameStore,
    encoder: Box<dyn Encoder>,
    encoder_config: EncoderConfig,
    source: SourceParams,
    emitter: NotificationEmitter,
    frames_encoded: u64,
    anomalies: u64,
}

impl EventController {
    pub fn new(
        name: &str,
        location: impl Into<PathBuf>,
        timing: EventTiming,
        encoder: Box<dyn Encoder>,
        encoder_config: EncoderConfig,
        source: SourceParams,
        emitter: NotificationEmitter,
    ) -> Self {
        Self {
            name: name.to_string(),
            location: location.into(),
            format: encoder_config.format.clone(),
            timing,
            state: AlarmState::Idle,
            last_alarm_us: 0,
            event_count: 0,
            current: None,
            store: FrameStore::new(timing.max_head_age),
            encoder,
            encoder_config,
            source,
            emitter,
            frames_encoded: 0,
            anomalies: 0,
        }
    }

    /// `<location>/<name>-<seq>.<format>`
    pub fn event_path(&self, event_seq: u64) -> PathBuf {
        self.location
            .join(format!("{}-{}.{}", self.name, event_seq, self.format))
    }

    /// Classify one frame and apply at most one state transition.
    ///
    /// Returns `Ok(false)` for frames that carry no alarm flag; those are
    /// neither recorded nor retained. Any error is fatal for the recorder.
    pub fn process(&mut self, frame: &FramePtr, now_us: u64) -> RecorderResult<bool> {
        let Some(alarmed) = frame.alarmed else {
            return Ok(false);
        };

        let last_state = self.state;
        match (last_state, alarmed) {
            (AlarmState::Idle, true) => {
                self.last_alarm_us = now_us;
                self.begin_event(frame, now_us)?;
                self.state = AlarmState::Alarm;
            }
            (AlarmState::Alarm, true) | (AlarmState::Alert, true) => {
                self.last_alarm_us = now_us;
                self.state = AlarmState::Alarm;
            }
            (AlarmState::Alarm, false) => {
                self.state = AlarmState::Alert;
            }
            (AlarmState::Alert, false) => {
                if self.tail_elapsed(frame) && self.min_duration_met() {
                    self.end_event(now_us)?;
                }
            }
            (AlarmState::Idle, false) => {}
        }

        if last_state != self.state {
            self.debug(&format!(
                "{:?} -> {:?} on frame {} ({})",
                last_state,
                self.state,
                frame.id,
                format_utc_us(frame.timestamp_us)
            ));
        }

        if self.state > AlarmState::Idle {
            self.encode(frame)?;
        }

        self.store.insert(frame.clone(), now_us);
        Ok(true)
    }

    fn tail_elapsed(&self, frame: &FramePtr) -> bool {
        frame.age(self.last_alarm_us) < -(self.timing.max_tail_age.as_micros() as i64)
    }

    fn alarm_span_secs(&self) -> f64 {
        match &self.current {
            Some(ev) => span_secs(ev.onset_us, self.last_alarm_us),
            None => 0.0,
        }
    }

    fn min_duration_met(&self) -> bool {
        self.alarm_span_secs() >= self.timing.min_event_duration.as_secs_f64()
    }

    fn begin_event(&mut self, frame: &FramePtr, now_us: u64) -> RecorderResult<()> {
        self.event_count += 1;
        let seq = self.event_count;

        self.emitter.event_begin(seq, frame.id, now_us);

        let path = self.event_path(seq);
        self.info(&format!("Opening video file '{}'", path.display()));
        let mut target = self
            .encoder
            .open(&path, &self.encoder_config.for_event(seq), &self.source)?;
        self.emitter.write_begin(&path, now_us);

        let mut flushed = 0u64;
        for stored in self.store.snapshot() {
            match &stored.payload {
                Payload::Video(_) | Payload::Audio(_) => {
                    target.encode(stored)?;
                    flushed += 1;
                }
                Payload::Notification(_) => {
                    self.anomalies += 1;
                    log::error!(
                        "[EventController:{}] unexpected frame type in frame store (frame {})",
                        self.name,
                        stored.id
                    );
                }
            }
        }
        self.frames_encoded += flushed;
        self.debug(&format!("pre-roll flushed {} frame(s) into event {}", flushed, seq));

        self.current = Some(OpenEvent {
            seq,
            onset_us: now_us,
            alarm_source_id: frame.id,
            target,
        });
        Ok(())
    }

    fn encode(&mut self, frame: &FramePtr) -> RecorderResult<()> {
        if matches!(frame.payload, Payload::Notification(_)) {
            return Ok(());
        }
        if let Some(ev) = self.current.as_mut() {
            ev.target.encode(frame)?;
            self.frames_encoded += 1;
        }
        Ok(())
    }

    fn end_event(&mut self, now_us: u64) -> RecorderResult<()> {
        let duration = self.alarm_span_secs();
        let Some(ev) = self.current.take() else {
            self.state = AlarmState::Idle;
            return Ok(());
        };

        let path = ev.target.path().to_path_buf();
        self.info(&format!("Closing video file '{}'", path.display()));
        let size = ev.target.close()?;
        self.emitter.write_end(&path, size, now_us);

        self.state = AlarmState::Idle;
        self.emitter
            .event_end(ev.seq, ev.alarm_source_id, duration, now_us);
        self.info(&format!(
            "event {} closed after {:.2}s ({} bytes)",
            ev.seq, duration, size
        ));
        Ok(())
    }

    /// Close any open event regardless of the tail and minimum-duration
    /// gates. Used when the recording loop stops.
    pub fn finish(&mut self, now_us: u64) -> RecorderResult<()> {
        if self.current.is_some() {
            self.info("finalizing open event on shutdown");
        }
        self.end_event(now_us)
    }

    /// Drop the open target without trailer or notifications. After a fatal
    /// error the event is left without an END.
    pub fn abandon(&mut self) {
        if let Some(ev) = self.current.take() {
            self.error(&format!(
                "abandoning event {} ('{}')",
                ev.seq,
                ev.target.path().display()
            ));
        }
    }

    pub fn state(&self) -> AlarmState {
        self.state
    }

    pub fn event_count(&self) -> u64 {
        self.event_count
    }

    pub fn last_alarm_us(&self) -> u64 {
        self.last_alarm_us
    }

    pub fn is_recording(&self) -> bool {
        self.current.is_some()
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.current.as_ref().map(|ev| ev.target.path())
    }

    pub fn store(&self) -> &FrameStore {
        &self.store
    }

    pub fn frames_encoded(&self) -> u64 {
        self.frames_encoded
    }

    pub fn anomalies(&self) -> u64 {
        self.anomalies
    }
}

impl ComponentLogger for EventController {
    fn log_context(&self) -> LogContext {
        let ctx = LogContext::new("EventController", &self.name);
        match &self.current {
            Some(ev) => ctx.with_event(ev.seq),
            None => ctx,
        }
    }
}
