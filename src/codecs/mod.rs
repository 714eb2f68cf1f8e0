// src/codecs/mod.rs
//
// Encoder collaborator used by the event controller. The controller only
// sees `Encoder`/`OutputTarget`; container selection, stream layout and
// pixel conversion stay behind this boundary.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{RecorderError, RecorderResult};
use crate::frame::{Frame, PixelFormat};

pub mod native;
pub mod scale;
pub mod wav;

pub use native::NativeTarget;
pub use wav::WavTarget;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRate {
    pub num: u32,
    pub den: u32,
}

impl FrameRate {
    pub fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }

    /// Seconds per frame as (num, den).
    pub fn time_base(&self) -> (u32, u32) {
        (self.den, self.num)
    }

    pub fn frame_interval_us(&self) -> u64 {
        if self.num == 0 {
            return 0;
        }
        1_000_000 * self.den as u64 / self.num as u64
    }
}

impl Default for FrameRate {
    fn default() -> Self {
        Self { num: 15, den: 1 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoParams {
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    pub frame_rate: FrameRate,
    pub bit_rate: u32,
    pub bit_rate_tolerance: u32,
    pub preset: String,
}

impl Default for VideoParams {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
            pixel_format: PixelFormat::Gray8,
            frame_rate: FrameRate::default(),
            bit_rate: 200_000,
            bit_rate_tolerance: 240_000,
            preset: "medium".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioParams {
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_rate: u32,
}

impl Default for AudioParams {
    fn default() -> Self {
        Self {
            sample_rate: 8_000,
            channels: 1,
            bit_rate: 64_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    pub author: String,
    pub comment: String,
    pub title: Option<String>,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            author: "event-recorder".to_string(),
            comment: "Generated by the event recorder".to_string(),
            title: None,
        }
    }
}

impl Metadata {
    pub fn entries(&self) -> Vec<(&str, &str)> {
        let mut out = vec![("author", self.author.as_str()), ("comment", self.comment.as_str())];
        if let Some(title) = &self.title {
            out.push(("title", title.as_str()));
        }
        out
    }
}

/// Everything the encoder needs at open time. Built once, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderConfig {
    pub format: String,
    pub video: VideoParams,
    pub audio: AudioParams,
    pub metadata: Metadata,
}

impl EncoderConfig {
    pub fn for_event(&self, event_seq: u64) -> Self {
        let mut cfg = self.clone();
        cfg.metadata.title = Some(format!("Event Video {}", event_seq));
        cfg
    }
}

/// Provider side of the conversion: what frames look like on arrival.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceParams {
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    pub frame_rate: FrameRate,
    pub has_video: bool,
    pub has_audio: bool,
}

pub trait Encoder: Send {
    fn open(
        &mut self,
        path: &Path,
        config: &EncoderConfig,
        source: &SourceParams,
    ) -> RecorderResult<Box<dyn OutputTarget>>;
}

/// An open output file. Dropping it without `close` releases the file
/// without writing a trailer.
pub trait OutputTarget: Send {
    fn path(&self) -> &Path;
    fn encode(&mut self, frame: &Frame) -> RecorderResult<()>;
    /// Finish the container and return its final size in bytes.
    fn close(self: Box<Self>) -> RecorderResult<u64>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Native,
    Wav,
}

impl ContainerKind {
    pub fn resolve(format: &str) -> RecorderResult<Self> {
        match format.to_ascii_lowercase().as_str() {
            "evr" | "raw" => Ok(ContainerKind::Native),
            "wav" => Ok(ContainerKind::Wav),
            _ => Err(RecorderError::UnknownFormat {
                format: format.to_string(),
            }),
        }
    }

    pub fn carries_video(&self) -> bool {
        matches!(self, ContainerKind::Native)
    }

    pub fn carries_audio(&self) -> bool {
        true
    }
}

/// Which elementary streams a file gets, given container and provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamLayout {
    pub video: bool,
    pub audio: bool,
}

impl StreamLayout {
    pub fn select(kind: ContainerKind, source: &SourceParams) -> Self {
        Self {
            video: source.has_video && kind.carries_video(),
            audio: source.has_audio && kind.carries_audio(),
        }
    }
}

/// Default file-backed encoder: resolves the container from the configured
/// format and opens the matching writer.
#[derive(Debug, Default)]
pub struct ContainerEncoder;

impl ContainerEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl Encoder for ContainerEncoder {
    fn open(
        &mut self,
        path: &Path,
        config: &EncoderConfig,
        source: &SourceParams,
    ) -> RecorderResult<Box<dyn OutputTarget>> {
        let kind = ContainerKind::resolve(&config.format)?;
        let layout = StreamLayout::select(kind, source);
        if !layout.video && !layout.audio {
            return Err(RecorderError::OutputContext {
                reason: format!(
                    "'{}' container has no stream for this provider (video={}, audio={})",
                    config.format, source.has_video, source.has_audio
                ),
            });
        }

        if layout.video {
            check_video_codec(&config.video, source)?;
        }
        if layout.audio {
            check_audio_codec(&config.audio)?;
        }

        log::debug!(
            "opening {:?} container at {} (video={}, audio={}, preset={}, b={}, bt={})",
            kind,
            path.display(),
            layout.video,
            layout.audio,
            config.video.preset,
            config.video.bit_rate,
            config.video.bit_rate_tolerance
        );

        match kind {
            ContainerKind::Native => Ok(Box::new(NativeTarget::create(path, config, source, layout)?)),
            ContainerKind::Wav => Ok(Box::new(WavTarget::create(path, &config.audio)?)),
        }
    }
}

fn check_video_codec(params: &VideoParams, source: &SourceParams) -> RecorderResult<()> {
    if params.width == 0 || params.height == 0 {
        return Err(RecorderError::CodecOpen {
            stream: "video",
            reason: format!("invalid resolution {}x{}", params.width, params.height),
        });
    }
    if params.frame_rate.num == 0 || params.frame_rate.den == 0 {
        return Err(RecorderError::CodecOpen {
            stream: "video",
            reason: format!(
                "invalid frame rate {}/{}",
                params.frame_rate.num, params.frame_rate.den
            ),
        });
    }
    // conversion must be possible before the first frame arrives
    scale::check_conversion(
        (source.width, source.height, source.pixel_format),
        (params.width, params.height, params.pixel_format),
    )
}

fn check_audio_codec(params: &AudioParams) -> RecorderResult<()> {
    if params.sample_rate == 0 || params.channels == 0 {
        return Err(RecorderError::CodecOpen {
            stream: "audio",
            reason: format!(
                "invalid sample layout {} Hz x {} ch",
                params.sample_rate, params.channels
            ),
        });
    }
    Ok(())
}

pub(crate) fn create_file(path: &Path) -> RecorderResult<BufWriter<File>> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|source| RecorderError::OpenTarget {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(has_video: bool, has_audio: bool) -> SourceParams {
        SourceParams {
            width: 320,
            height: 240,
            pixel_format: PixelFormat::Gray8,
            frame_rate: FrameRate::new(15, 1),
            has_video,
            has_audio,
        }
    }

    fn config(format: &str) -> EncoderConfig {
        EncoderConfig {
            format: format.to_string(),
            video: VideoParams::default(),
            audio: AudioParams::default(),
            metadata: Metadata::default(),
        }
    }

    #[test]
    fn test_resolve_container() {
        assert_eq!(ContainerKind::resolve("evr").unwrap(), ContainerKind::Native);
        assert_eq!(ContainerKind::resolve("WAV").unwrap(), ContainerKind::Wav);
        assert!(matches!(
            ContainerKind::resolve("avi"),
            Err(RecorderError::UnknownFormat { .. })
        ));
    }

    #[test]
    fn test_stream_selection() {
        let layout = StreamLayout::select(ContainerKind::Wav, &source(true, true));
        assert!(!layout.video);
        assert!(layout.audio);

        let layout = StreamLayout::select(ContainerKind::Native, &source(true, false));
        assert!(layout.video);
        assert!(!layout.audio);
    }

    #[test]
    fn test_open_rejects_empty_layout() {
        let path = std::env::temp_dir().join("event-recorder-empty-layout.wav");
        let result = ContainerEncoder::new().open(&path, &config("wav"), &source(true, false));
        assert!(matches!(result, Err(RecorderError::OutputContext { .. })));
    }

    #[test]
    fn test_open_rejects_bad_video_codec() {
        let mut cfg = config("evr");
        cfg.video.width = 0;
        let path = std::env::temp_dir().join("event-recorder-bad-codec.evr");
        let result = ContainerEncoder::new().open(&path, &cfg, &source(true, false));
        assert!(matches!(result, Err(RecorderError::CodecOpen { stream: "video", .. })));
    }

    #[test]
    fn test_for_event_sets_title() {
        let cfg = config("evr").for_event(4);
        assert_eq!(cfg.metadata.title.as_deref(), Some("Event Video 4"));
        assert!(cfg.metadata.entries().contains(&("title", "Event Video 4")));
    }

    #[test]
    fn test_frame_interval() {
        assert_eq!(FrameRate::new(10, 1).frame_interval_us(), 100_000);
        assert_eq!(FrameRate::new(10, 1).time_base(), (1, 10));
    }
}
