// src/frame/mod.rs
//
// Frames flowing from the capture side through the recorder. A frame is
// immutable once built and shared by `Arc` between the producer, the
// pre-roll store, the encoder and bus subscribers.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

pub mod notification;

pub use notification::{DiskIoPhase, EventPhase, Notification};

pub type FramePtr = Arc<Frame>;

static FRAME_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide frame id allocator.
pub fn next_frame_id() -> u64 {
    FRAME_ID.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    Gray8,
    Rgb24,
    Bgr24,
    Rgba,
    Yuv420p,
}

impl PixelFormat {
    /// Bytes per pixel for packed layouts, `None` for planar ones.
    pub fn packed_bytes_per_pixel(&self) -> Option<usize> {
        match self {
            PixelFormat::Gray8 => Some(1),
            PixelFormat::Rgb24 | PixelFormat::Bgr24 => Some(3),
            PixelFormat::Rgba => Some(4),
            PixelFormat::Yuv420p => None,
        }
    }

    pub fn frame_size(&self, width: u32, height: u32) -> usize {
        let pixels = width as usize * height as usize;
        match self.packed_bytes_per_pixel() {
            Some(bpp) => pixels * bpp,
            None => pixels + 2 * (width.div_ceil(2) as usize * height.div_ceil(2) as usize),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PixelFormat::Gray8 => "gray8",
            PixelFormat::Rgb24 => "rgb24",
            PixelFormat::Bgr24 => "bgr24",
            PixelFormat::Rgba => "rgba",
            PixelFormat::Yuv420p => "yuv420p",
        }
    }

    pub(crate) fn code(&self) -> u8 {
        match self {
            PixelFormat::Gray8 => 0,
            PixelFormat::Rgb24 => 1,
            PixelFormat::Bgr24 => 2,
            PixelFormat::Rgba => 3,
            PixelFormat::Yuv420p => 4,
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Audio,
    Control,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoPayload {
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioPayload {
    pub sample_rate: u32,
    pub channels: u8,
    pub samples: Arc<Vec<i16>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Video(VideoPayload),
    Audio(AudioPayload),
    Notification(Notification),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub id: u64,
    /// Capture time, UTC microseconds.
    pub timestamp_us: u64,
    /// Id of the provider (or recorder, for notifications) that built the frame.
    pub source_id: String,
    /// Alarm classification. Only classifiable frames carry one.
    pub alarmed: Option<bool>,
    pub payload: Payload,
}

impl Frame {
    pub fn video(
        source_id: &str,
        timestamp_us: u64,
        alarmed: Option<bool>,
        payload: VideoPayload,
    ) -> Self {
        Self {
            id: next_frame_id(),
            timestamp_us,
            source_id: source_id.to_string(),
            alarmed,
            payload: Payload::Video(payload),
        }
    }

    pub fn audio(
        source_id: &str,
        timestamp_us: u64,
        alarmed: Option<bool>,
        payload: AudioPayload,
    ) -> Self {
        Self {
            id: next_frame_id(),
            timestamp_us,
            source_id: source_id.to_string(),
            alarmed,
            payload: Payload::Audio(payload),
        }
    }

    pub fn notification(source_id: &str, timestamp_us: u64, notification: Notification) -> Self {
        Self {
            id: next_frame_id(),
            timestamp_us,
            source_id: source_id.to_string(),
            alarmed: None,
            payload: Payload::Notification(notification),
        }
    }

    pub fn into_ptr(self) -> FramePtr {
        Arc::new(self)
    }

    pub fn media_kind(&self) -> MediaKind {
        match self.payload {
            Payload::Video(_) => MediaKind::Video,
            Payload::Audio(_) => MediaKind::Audio,
            Payload::Notification(_) => MediaKind::Control,
        }
    }

    pub fn is_classifiable(&self) -> bool {
        self.alarmed.is_some()
    }

    /// `reference - timestamp` in microseconds. Negative when the frame is
    /// newer than the reference.
    pub fn age(&self, reference_us: u64) -> i64 {
        reference_us as i64 - self.timestamp_us as i64
    }

    pub fn as_notification(&self) -> Option<&Notification> {
        match &self.payload {
            Payload::Notification(n) => Some(n),
            _ => None,
        }
    }
}
