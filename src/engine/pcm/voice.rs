//! Voice rendering
//!
//! One voice per session. The render context mixes it; the session handle
//! starts, stops and inspects it. Both go through the voice's recursive lock.

use super::decode::WavSource;
use super::Frame;
use crate::engine::{
    ChannelMask, EngineResult, EngineVolume, Interpolation, SessionKind, SharedSessionState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VoicePhase {
    Idle,
    Playing,
    /// Ramping to silence; `remaining` output frames left out of `total`.
    Fading {
        remaining: u32,
        total: u32,
    },
    Done,
}

pub(crate) struct Voice {
    pub(crate) kind: SessionKind,
    pub(crate) shared: SharedSessionState,
    pub(crate) phase: VoicePhase,
    pub(crate) volume: EngineVolume,
    pub(crate) loops_remaining: u32,
    pub(crate) muted: ChannelMask,
    pcm: Vec<Frame>,
    /// Fractional read position into `pcm`, in source frames.
    cursor: f64,
    /// Source frames discarded from the front of `pcm` (streams only).
    base_frame: u64,
    source_rate: Option<u32>,
    stream: Option<WavSource>,
}

impl Voice {
    pub(crate) fn new(kind: SessionKind) -> Self {
        Voice {
            kind,
            shared: SharedSessionState::new(),
            phase: VoicePhase::Idle,
            volume: EngineVolume::UNITY,
            loops_remaining: 0,
            muted: ChannelMask::empty(),
            pcm: Vec::new(),
            cursor: 0.0,
            base_frame: 0,
            source_rate: None,
            stream: None,
        }
    }

    pub(crate) fn load_sample(&mut self, pcm: Vec<Frame>, sample_rate: u32) {
        self.pcm = pcm;
        self.source_rate = Some(sample_rate);
        self.stream = None;
        self.cursor = 0.0;
        self.base_frame = 0;
    }

    pub(crate) fn load_stream(&mut self, source: WavSource, preroll: Vec<Frame>) {
        self.source_rate = Some(source.sample_rate());
        self.pcm = preroll;
        self.stream = Some(source);
        self.cursor = 0.0;
        self.base_frame = 0;
    }

    pub(crate) fn is_loaded(&self) -> bool {
        self.source_rate.is_some()
    }

    pub(crate) fn source_rate(&self) -> Option<u32> {
        self.source_rate
    }

    pub(crate) fn frame_count(&self) -> usize {
        self.pcm.len()
    }

    pub(crate) fn is_active(&self) -> bool {
        matches!(self.phase, VoicePhase::Playing | VoicePhase::Fading { .. })
    }

    pub(crate) fn begin(&mut self) {
        if self.kind == SessionKind::Sample {
            self.cursor = 0.0;
        }
        self.shared.rearm();
        self.phase = VoicePhase::Playing;
    }

    pub(crate) fn request_stop(&mut self, fade: bool, fade_frames: u32) {
        match self.phase {
            VoicePhase::Playing if fade && fade_frames > 0 => {
                self.phase = VoicePhase::Fading {
                    remaining: fade_frames,
                    total: fade_frames,
                };
            }
            VoicePhase::Fading { .. } if fade => {}
            VoicePhase::Done => {}
            _ => self.finish(true),
        }
    }

    fn finish(&mut self, stopped: bool) {
        self.phase = VoicePhase::Done;
        self.shared.finish(stopped);
    }

    fn buffered_frames(&self) -> usize {
        self.pcm.len().saturating_sub(self.cursor as usize)
    }

    fn source_exhausted(&self) -> bool {
        self.stream.as_ref().map_or(true, WavSource::is_exhausted)
    }

    /// Top up a streamed voice when fewer than `low_water` frames remain buffered.
    pub(crate) fn refill(&mut self, low_water: usize, chunk: usize) -> EngineResult<usize> {
        if self.source_exhausted() || self.buffered_frames() >= low_water {
            return Ok(0);
        }
        let consumed = (self.cursor as usize).min(self.pcm.len());
        self.pcm.drain(..consumed);
        self.cursor -= consumed as f64;
        self.base_frame += consumed as u64;

        match self.stream.as_mut() {
            Some(source) => source.read_frames(chunk, &mut self.pcm),
            None => Ok(0),
        }
    }

    /// Mix this voice into `mix` at `mixer_rate`, then publish the position.
    pub(crate) fn mix_into(&mut self, mix: &mut [Frame], mixer_rate: u32, interpolation: Interpolation) {
        let Some(source_rate) = self.source_rate else {
            return;
        };
        if !self.is_active() || mixer_rate == 0 {
            return;
        }
        let step = source_rate as f64 / mixer_rate as f64;
        let gain = self.volume.gain();

        for out in mix.iter_mut() {
            if self.cursor as usize >= self.pcm.len() && !self.wrap_or_finish() {
                break;
            }
            let Some(fade) = self.next_fade_factor() else {
                break;
            };
            let sample = self.sample_at_cursor(interpolation);
            let level = gain * fade;
            out[0] += sample[0] * level;
            out[1] += sample[1] * level;
            self.cursor += step;
        }

        if !self.shared.is_done() {
            self.shared
                .set_position(self.base_frame + self.cursor as u64);
        }
    }

    /// At the end of buffered data: loop, wait for a refill, or finish.
    /// Returns true when rendering can continue.
    fn wrap_or_finish(&mut self) -> bool {
        if !self.source_exhausted() {
            // stream underrun, silence until the next refill
            return false;
        }
        if self.kind == SessionKind::Sample && !self.pcm.is_empty() {
            // a resample step may overshoot several whole passes
            let len = self.pcm.len() as f64;
            while self.cursor >= len && self.loops_remaining > 0 {
                self.loops_remaining -= 1;
                self.cursor -= len;
            }
            if self.cursor < len {
                return true;
            }
        }
        self.shared
            .set_position(self.base_frame + self.pcm.len() as u64);
        self.finish(false);
        false
    }

    fn next_fade_factor(&mut self) -> Option<f32> {
        match self.phase {
            VoicePhase::Playing => Some(1.0),
            VoicePhase::Fading { remaining: 0, .. } => {
                self.finish(true);
                None
            }
            VoicePhase::Fading { remaining, total } => {
                let remaining = remaining - 1;
                self.phase = VoicePhase::Fading { remaining, total };
                Some(remaining as f32 / total as f32)
            }
            VoicePhase::Idle | VoicePhase::Done => None,
        }
    }

    fn sample_at_cursor(&self, interpolation: Interpolation) -> Frame {
        let index = self.cursor as usize;
        let current = self.pcm[index];
        match interpolation {
            Interpolation::DropSample => current,
            Interpolation::TwoPoint | Interpolation::Linear => {
                let next = self.pcm.get(index + 1).copied().unwrap_or(current);
                let frac = (self.cursor - index as f64) as f32;
                [
                    current[0] + (next[0] - current[0]) * frac,
                    current[1] + (next[1] - current[1]) * frac,
                ]
            }
        }
    }
}
