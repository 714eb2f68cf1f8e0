// src/codecs/wav.rs
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavSpec, WavWriter};

use super::{AudioParams, OutputTarget};
use crate::core::error::{RecorderError, RecorderResult};
use crate::frame::{Frame, Payload};

const BITS: u16 = 16;

/// Audio-only event container. Video frames have no stream here and are skipped.
pub struct WavTarget {
    path: PathBuf,
    params: AudioParams,
    writer: WavWriter<BufWriter<File>>,
    frames: u64,
}

impl WavTarget {
    pub fn create(path: &Path, params: &AudioParams) -> RecorderResult<Self> {
        let spec = WavSpec {
            channels: params.channels,
            sample_rate: params.sample_rate,
            bits_per_sample: BITS,
            sample_format: SampleFormat::Int,
        };

        let file = super::create_file(path)?;
        let writer = WavWriter::new(file, spec)
            .map_err(|e| RecorderError::write("header", path, e))?;

        Ok(Self {
            path: path.to_path_buf(),
            params: params.clone(),
            writer,
            frames: 0,
        })
    }
}

impl OutputTarget for WavTarget {
    fn path(&self) -> &Path {
        &self.path
    }

    fn encode(&mut self, frame: &Frame) -> RecorderResult<()> {
        let Payload::Audio(audio) = &frame.payload else {
            return Ok(());
        };

        if audio.sample_rate != self.params.sample_rate
            || audio.channels as u16 != self.params.channels
        {
            return Err(RecorderError::Conversion {
                from: format!("{} Hz x {} ch", audio.sample_rate, audio.channels),
                to: format!("{} Hz x {} ch", self.params.sample_rate, self.params.channels),
                frame: self.frames,
            });
        }

        for s in audio.samples.iter() {
            self.writer
                .write_sample(*s)
                .map_err(|e| RecorderError::write("audio", &self.path, e))?;
        }
        self.frames += 1;
        Ok(())
    }

    fn close(self: Box<Self>) -> RecorderResult<u64> {
        let WavTarget { path, writer, .. } = *self;
        writer
            .finalize()
            .map_err(|e| RecorderError::write("trailer", &path, e))?;
        let size = std::fs::metadata(&path)
            .map_err(|e| RecorderError::write("trailer", &path, e))?
            .len();
        Ok(size)
    }
}
