use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::codecs::{Encoder, EncoderConfig, FrameRate, OutputTarget, SourceParams};
use crate::core::bus::DistributionBus;
use crate::core::error::{RecorderError, RecorderResult};
use crate::core::lock::lock_mutex;
use crate::frame::{Frame, FramePtr, Notification, PixelFormat};
use crate::recorder::FrameProvider;

/// Bytes a mock target reports per encoded frame.
pub const MOCK_FRAME_BYTES: u64 = 100;

#[derive(Debug, Clone, PartialEq)]
pub enum EncoderCall {
    Open { path: PathBuf, title: Option<String> },
    Encode { path: PathBuf, frame_id: u64, timestamp_us: u64 },
    Close { path: PathBuf, size: u64 },
}

/// Encoder that records every call. Clones share the same log.
#[derive(Clone, Default)]
pub struct MockEncoder {
    calls: Arc<Mutex<Vec<EncoderCall>>>,
    fail_open: Arc<AtomicBool>,
    /// Fail the n-th encode call (1-based) across all targets; 0 disables.
    fail_encode_at: Arc<AtomicUsize>,
    encodes: Arc<AtomicUsize>,
}

impl MockEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_open(&self) {
        self.fail_open.store(true, Ordering::SeqCst);
    }

    pub fn fail_encode_at(&self, n: usize) {
        self.fail_encode_at.store(n, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<EncoderCall> {
        lock_mutex(&self.calls, "MockEncoder::calls").clone()
    }

    pub fn opened(&self) -> Vec<PathBuf> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                EncoderCall::Open { path, .. } => Some(path),
                _ => None,
            })
            .collect()
    }

    pub fn titles(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                EncoderCall::Open { title, .. } => title,
                _ => None,
            })
            .collect()
    }

    pub fn encoded_ids(&self) -> Vec<u64> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                EncoderCall::Encode { frame_id, .. } => Some(frame_id),
                _ => None,
            })
            .collect()
    }

    pub fn encoded_timestamps(&self, path: &Path) -> Vec<u64> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                EncoderCall::Encode {
                    path: p,
                    timestamp_us,
                    ..
                } if p == path => Some(timestamp_us),
                _ => None,
            })
            .collect()
    }

    pub fn closed(&self) -> Vec<PathBuf> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                EncoderCall::Close { path, .. } => Some(path),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: EncoderCall) {
        lock_mutex(&self.calls, "MockEncoder::record").push(call);
    }
}

impl Encoder for MockEncoder {
    fn open(
        &mut self,
        path: &Path,
        config: &EncoderConfig,
        _source: &SourceParams,
    ) -> RecorderResult<Box<dyn OutputTarget>> {
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(RecorderError::OpenTarget {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "mock open failure"),
            });
        }
        self.record(EncoderCall::Open {
            path: path.to_path_buf(),
            title: config.metadata.title.clone(),
        });
        Ok(Box::new(MockTarget {
            path: path.to_path_buf(),
            encoder: self.clone(),
            frames: 0,
        }))
    }
}

struct MockTarget {
    path: PathBuf,
    encoder: MockEncoder,
    frames: u64,
}

impl OutputTarget for MockTarget {
    fn path(&self) -> &Path {
        &self.path
    }

    fn encode(&mut self, frame: &Frame) -> RecorderResult<()> {
        let n = self.encoder.encodes.fetch_add(1, Ordering::SeqCst) + 1;
        if n == self.encoder.fail_encode_at.load(Ordering::SeqCst) {
            return Err(RecorderError::write(
                "video",
                &self.path,
                std::io::Error::new(std::io::ErrorKind::Other, "mock write failure"),
            ));
        }
        self.encoder.record(EncoderCall::Encode {
            path: self.path.clone(),
            frame_id: frame.id,
            timestamp_us: frame.timestamp_us,
        });
        self.frames += 1;
        Ok(())
    }

    fn close(self: Box<Self>) -> RecorderResult<u64> {
        let size = self.frames * MOCK_FRAME_BYTES;
        self.encoder.record(EncoderCall::Close {
            path: self.path.clone(),
            size,
        });
        Ok(size)
    }
}

/// Bus that keeps everything published, in order.
#[derive(Default)]
pub struct MockBus {
    frames: Mutex<Vec<FramePtr>>,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Vec<FramePtr> {
        lock_mutex(&self.frames, "MockBus::frames").clone()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.frames()
            .iter()
            .filter_map(|f| f.as_notification().cloned())
            .collect()
    }

    pub fn event_notifications(&self) -> Vec<Notification> {
        self.notifications()
            .into_iter()
            .filter(|n| matches!(n, Notification::Event { .. }))
            .collect()
    }
}

impl DistributionBus for MockBus {
    fn publish(&self, frame: FramePtr) {
        lock_mutex(&self.frames, "MockBus::publish").push(frame);
    }
}

/// Provider with fixed stream parameters and a switchable liveness flag.
pub struct MockProvider {
    name: String,
    alive: AtomicBool,
    has_audio: bool,
}

impl MockProvider {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            alive: AtomicBool::new(true),
            has_audio: false,
        }
    }

    pub fn with_audio(mut self) -> Self {
        self.has_audio = true;
        self
    }

    pub fn set_alive(&self, alive: bool) {
        self.alive.store(alive, Ordering::SeqCst);
    }
}

impl FrameProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn frame_rate(&self) -> FrameRate {
        FrameRate::new(10, 1)
    }

    fn width(&self) -> u32 {
        4
    }

    fn height(&self) -> u32 {
        4
    }

    fn pixel_format(&self) -> PixelFormat {
        PixelFormat::Gray8
    }

    fn has_video(&self) -> bool {
        true
    }

    fn has_audio(&self) -> bool {
        self.has_audio
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}
