// src/codecs/native.rs
//
// Native event container (.evr):
//
//   header  : "EVR1" | version u8 | stream flags u8
//             [video: width u32 | height u32 | pix_fmt u8 | tb_num u32 | tb_den u32 | bit_rate u32]
//             [audio: sample_rate u32 | channels u16 | bit_rate u32]
//             metadata count u16 | (key len u16, key, value len u16, value)*
//   record  : stream u8 | pts u64 | timestamp_us u64 | len u32 | bytes
//   trailer : "EVRE" | video frames u64 | audio frames u64
//
// All integers little endian.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, WriteBytesExt};

use super::scale;
use super::{EncoderConfig, FrameRate, OutputTarget, SourceParams, StreamLayout};
use crate::core::error::{RecorderError, RecorderResult};
use crate::frame::{Frame, Payload, PixelFormat};

pub const MAGIC: &[u8; 4] = b"EVR1";
pub const TRAILER_MAGIC: &[u8; 4] = b"EVRE";
pub const VERSION: u8 = 1;

pub const STREAM_VIDEO: u8 = 0;
pub const STREAM_AUDIO: u8 = 1;

const FLAG_VIDEO: u8 = 0b01;
const FLAG_AUDIO: u8 = 0b10;

pub struct NativeTarget {
    path: PathBuf,
    writer: BufWriter<File>,
    layout: StreamLayout,
    target: (u32, u32, PixelFormat),
    input_rate: FrameRate,
    output_rate: FrameRate,
    video_frames: u64,
    audio_frames: u64,
    audio_samples: u64,
    buffered: u64,
}

impl NativeTarget {
    pub fn create(
        path: &Path,
        config: &EncoderConfig,
        source: &SourceParams,
        layout: StreamLayout,
    ) -> RecorderResult<Self> {
        let writer = super::create_file(path)?;
        let mut target = Self {
            path: path.to_path_buf(),
            writer,
            layout,
            target: (config.video.width, config.video.height, config.video.pixel_format),
            input_rate: source.frame_rate,
            output_rate: config.video.frame_rate,
            video_frames: 0,
            audio_frames: 0,
            audio_samples: 0,
            buffered: 0,
        };
        target
            .write_header(config)
            .map_err(|e| RecorderError::write("header", path, e))?;
        Ok(target)
    }

    fn write_header(&mut self, config: &EncoderConfig) -> std::io::Result<()> {
        let w = &mut self.writer;
        w.write_all(MAGIC)?;
        w.write_u8(VERSION)?;

        let mut flags = 0;
        if self.layout.video {
            flags |= FLAG_VIDEO;
        }
        if self.layout.audio {
            flags |= FLAG_AUDIO;
        }
        w.write_u8(flags)?;

        if self.layout.video {
            let (tb_num, tb_den) = config.video.frame_rate.time_base();
            w.write_u32::<LittleEndian>(config.video.width)?;
            w.write_u32::<LittleEndian>(config.video.height)?;
            w.write_u8(config.video.pixel_format.code())?;
            w.write_u32::<LittleEndian>(tb_num)?;
            w.write_u32::<LittleEndian>(tb_den)?;
            w.write_u32::<LittleEndian>(config.video.bit_rate)?;
        }
        if self.layout.audio {
            w.write_u32::<LittleEndian>(config.audio.sample_rate)?;
            w.write_u16::<LittleEndian>(config.audio.channels)?;
            w.write_u32::<LittleEndian>(config.audio.bit_rate)?;
        }

        let entries = config.metadata.entries();
        w.write_u16::<LittleEndian>(entries.len() as u16)?;
        for (key, value) in entries {
            write_str(w, key)?;
            write_str(w, value)?;
        }
        Ok(())
    }

    /// Output pts for the current video frame, in target time base units.
    fn video_pts(&self) -> u64 {
        let num = self.video_frames * self.input_rate.den as u64 * self.output_rate.num as u64;
        let den = self.input_rate.num as u64 * self.output_rate.den as u64;
        if den == 0 { self.video_frames } else { num / den }
    }

    fn write_record(&mut self, stream: u8, pts: u64, ts: u64, data: &[u8]) -> std::io::Result<()> {
        let w = &mut self.writer;
        w.write_u8(stream)?;
        w.write_u64::<LittleEndian>(pts)?;
        w.write_u64::<LittleEndian>(ts)?;
        w.write_u32::<LittleEndian>(data.len() as u32)?;
        w.write_all(data)
    }

    pub fn buffered_frames(&self) -> u64 {
        self.buffered
    }
}

impl OutputTarget for NativeTarget {
    fn path(&self) -> &Path {
        &self.path
    }

    fn encode(&mut self, frame: &Frame) -> RecorderResult<()> {
        match &frame.payload {
            Payload::Video(video) if self.layout.video => {
                let pts = self.video_pts();
                if video.data.is_empty() {
                    // nothing produced yet, the frame only advances the clock
                    self.buffered += 1;
                } else {
                    let data = scale::convert(video, self.target, self.video_frames)?;
                    self.write_record(STREAM_VIDEO, pts, frame.timestamp_us, &data)
                        .map_err(|e| RecorderError::write("video", &self.path, e))?;
                }
                self.video_frames += 1;
                Ok(())
            }
            Payload::Audio(audio) if self.layout.audio => {
                let pts = self.audio_samples;
                if !audio.samples.is_empty() {
                    let mut data = Vec::with_capacity(audio.samples.len() * 2);
                    for s in audio.samples.iter() {
                        data.extend_from_slice(&s.to_le_bytes());
                    }
                    self.write_record(STREAM_AUDIO, pts, frame.timestamp_us, &data)
                        .map_err(|e| RecorderError::write("audio", &self.path, e))?;
                }
                let channels = audio.channels.max(1) as u64;
                self.audio_samples += audio.samples.len() as u64 / channels;
                self.audio_frames += 1;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn close(mut self: Box<Self>) -> RecorderResult<u64> {
        let path = self.path.clone();
        let (video, audio) = (self.video_frames, self.audio_frames);
        let w = &mut self.writer;
        w.write_all(TRAILER_MAGIC)
            .and_then(|_| w.write_u64::<LittleEndian>(video))
            .and_then(|_| w.write_u64::<LittleEndian>(audio))
            .and_then(|_| w.flush())
            .map_err(|e| RecorderError::write("trailer", &path, e))?;

        let file = self
            .writer
            .into_inner()
            .map_err(|e| RecorderError::write("trailer", &path, e.into_error()))?;
        file.sync_all()
            .map_err(|e| RecorderError::write("trailer", &path, e))?;
        let size = file
            .metadata()
            .map_err(|e| RecorderError::write("trailer", &path, e))?
            .len();
        Ok(size)
    }
}

fn write_str<W: Write>(w: &mut W, value: &str) -> std::io::Result<()> {
    let bytes = value.as_bytes();
    let len = bytes.len().min(u16::MAX as usize);
    w.write_u16::<LittleEndian>(len as u16)?;
    w.write_all(&bytes[..len])
}
