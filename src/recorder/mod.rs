// src/recorder/mod.rs

use std::time::Duration;

use crate::codecs::{FrameRate, SourceParams};
use crate::frame::PixelFormat;

pub mod controller;
pub mod notify;
pub mod recorder;

pub use controller::{AlarmState, EventController, EventTiming};
pub use notify::NotificationEmitter;
pub use recorder::{RecorderSettings, VideoRecorder};

/// Upstream frame source as seen by the recorder: queried once for stream
/// parameters at startup and after every tick for liveness.
pub trait FrameProvider: Send + Sync {
    fn name(&self) -> &str;
    fn frame_rate(&self) -> FrameRate;
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn pixel_format(&self) -> PixelFormat;
    fn has_video(&self) -> bool;
    fn has_audio(&self) -> bool;
    fn is_alive(&self) -> bool;

    fn source_params(&self) -> SourceParams {
        SourceParams {
            width: self.width(),
            height: self.height(),
            pixel_format: self.pixel_format(),
            frame_rate: self.frame_rate(),
            has_video: self.has_video(),
            has_audio: self.has_audio(),
        }
    }
}

pub const DEFAULT_TICK: Duration = Duration::from_millis(20);
pub const DEFAULT_MAX_EVENT_HEAD_AGE: Duration = Duration::from_secs(2);
pub const DEFAULT_MAX_EVENT_TAIL_AGE: Duration = Duration::from_secs(3);
