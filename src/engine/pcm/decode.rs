//! WAV decoding
//!
//! Reads interleaved WAV data through `hound` into stereo `f32` frames.
//! Mono sources are duplicated to both sides; channels past the second are
//! dropped.

use super::Frame;
use crate::engine::{EngineError, EngineResult};
use hound::{SampleFormat, WavReader};
use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::path::Path;

/// Open WAV file positioned at the next unread frame.
pub(crate) struct WavSource {
    reader: WavReader<BufReader<File>>,
    channels: usize,
    format: SampleFormat,
    scale: f32,
    sample_rate: u32,
    exhausted: bool,
}

impl WavSource {
    pub(crate) fn open(path: &Path) -> EngineResult<Self> {
        let reader = WavReader::open(path).map_err(map_hound_error)?;
        let spec = reader.spec();
        if spec.channels == 0 || spec.sample_rate == 0 || spec.bits_per_sample == 0 {
            return Err(EngineError::BAD_SAMPLE);
        }
        let scale = match spec.sample_format {
            SampleFormat::Float => 1.0,
            SampleFormat::Int => 1.0 / (1u64 << (spec.bits_per_sample - 1)) as f32,
        };
        Ok(WavSource {
            reader,
            channels: spec.channels as usize,
            format: spec.sample_format,
            scale,
            sample_rate: spec.sample_rate,
            exhausted: false,
        })
    }

    pub(crate) fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Frames in the whole file according to its header.
    pub(crate) fn total_frames(&self) -> u64 {
        self.reader.duration() as u64
    }

    pub(crate) fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Append up to `max_frames` frames to `out`. Returns how many were appended.
    pub(crate) fn read_frames(&mut self, max_frames: usize, out: &mut Vec<Frame>) -> EngineResult<usize> {
        let mut frame = [0.0f32; 2];
        let mut channel = 0;
        let mut produced = 0;

        while produced < max_frames {
            let Some(sample) = self.next_sample()? else {
                self.exhausted = true;
                break;
            };
            if channel < 2 {
                frame[channel] = sample;
            }
            channel += 1;
            if channel == self.channels {
                if self.channels == 1 {
                    frame[1] = frame[0];
                }
                out.push(frame);
                produced += 1;
                channel = 0;
            }
        }

        Ok(produced)
    }

    /// Decode the remainder of the file.
    pub(crate) fn read_all(mut self) -> EngineResult<Vec<Frame>> {
        // Header lengths are untrusted; cap the up-front reservation.
        let mut frames = Vec::with_capacity((self.total_frames() as usize).min(1 << 20));
        while !self.exhausted {
            self.read_frames(usize::MAX, &mut frames)?;
        }
        Ok(frames)
    }

    fn next_sample(&mut self) -> EngineResult<Option<f32>> {
        match self.format {
            SampleFormat::Float => self
                .reader
                .samples::<f32>()
                .next()
                .transpose()
                .map_err(map_hound_error),
            SampleFormat::Int => {
                let scale = self.scale;
                self.reader
                    .samples::<i32>()
                    .next()
                    .transpose()
                    .map(|sample| sample.map(|v| v as f32 * scale))
                    .map_err(map_hound_error)
            }
        }
    }
}

pub(super) fn map_hound_error(err: hound::Error) -> EngineError {
    match err {
        hound::Error::IoError(ref e) if e.kind() == ErrorKind::NotFound => EngineError::FILE_NOT_FOUND,
        hound::Error::IoError(_) => EngineError::FILE_IO_ERROR,
        hound::Error::FormatError(_) => EngineError::BAD_FILE,
        hound::Error::Unsupported => EngineError::UNSUPPORTED_FORMAT,
        hound::Error::TooWide | hound::Error::UnfinishedSample | hound::Error::InvalidSampleFormat => {
            EngineError::BAD_SAMPLE
        }
    }
}
