//! Session handles over PCM voices

use super::decode::WavSource;
use super::voice::Voice;
use super::{VoiceHandle, VoiceRegistry};
use crate::engine::{
    ChannelMask, CompletionNotice, EngineError, EngineResult, EngineVolume, FileType, Session,
    SessionKind,
};
use crate::platform::RecursiveMutex;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Per-session limits handed out by the mixer.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SessionLimits {
    pub(crate) pcm_voices: usize,
    pub(crate) fade_frames: u32,
    pub(crate) stream_chunk: usize,
}

pub(crate) struct PcmSession {
    kind: SessionKind,
    voice: VoiceHandle,
    registry: VoiceRegistry,
    limits: SessionLimits,
}

impl PcmSession {
    pub(crate) fn new(kind: SessionKind, registry: VoiceRegistry, limits: SessionLimits) -> Self {
        let voice = Arc::new(RecursiveMutex::new(Voice::new(kind)));
        registry.register(Arc::clone(&voice));
        PcmSession {
            kind,
            voice,
            registry,
            limits,
        }
    }

    fn check_file_type(&self, file_type: FileType) -> EngineResult<()> {
        match (self.kind.is_sequence(), file_type) {
            // no sequencer in this engine
            (true, FileType::Midi | FileType::Rmf) => Err(EngineError::UNSUPPORTED_FORMAT),
            (true, _) | (false, FileType::Midi | FileType::Rmf) => Err(EngineError::BAD_FILE_TYPE),
            (false, FileType::Aiff) => Err(EngineError::UNSUPPORTED_FORMAT),
            (false, FileType::Wave) => Ok(()),
        }
    }
}

impl Session for PcmSession {
    fn kind(&self) -> SessionKind {
        self.kind
    }

    fn load(&mut self, path: &Path, file_type: FileType) -> EngineResult<()> {
        self.check_file_type(file_type)?;
        if self.voice.with(|v| v.is_active()) {
            return Err(EngineError::PARAM_ERR);
        }

        let mut source = WavSource::open(path)?;
        let rate = source.sample_rate();
        match self.kind {
            SessionKind::Stream => {
                let mut preroll = Vec::with_capacity(self.limits.stream_chunk);
                source.read_frames(self.limits.stream_chunk, &mut preroll)?;
                debug!("stream {} at {rate} Hz, {} frames preloaded", path.display(), preroll.len());
                self.voice.with(|v| v.load_stream(source, preroll));
            }
            _ => {
                let pcm = source.read_all()?;
                debug!("sample {} at {rate} Hz, {} frames", path.display(), pcm.len());
                self.voice.with(|v| v.load_sample(pcm, rate));
            }
        }
        Ok(())
    }

    fn start(&mut self) -> EngineResult<()> {
        let (loaded, active) = self.voice.with(|v| (v.is_loaded(), v.is_active()));
        if !loaded {
            return Err(EngineError::NOT_SETUP);
        }
        if !active && self.registry.active_count() >= self.limits.pcm_voices {
            return Err(EngineError::NO_FREE_VOICES);
        }
        self.voice.with(Voice::begin);
        Ok(())
    }

    fn stop(&mut self, fade: bool) {
        let fade_frames = self.limits.fade_frames;
        self.voice.with(|v| v.request_stop(fade, fade_frames));
    }

    fn is_done(&self) -> bool {
        self.voice.with(|v| v.shared.is_done())
    }

    fn position(&self) -> u64 {
        self.voice.with(|v| v.shared.position())
    }

    fn set_volume(&mut self, volume: EngineVolume) {
        self.voice.with(|v| v.volume = volume);
    }

    fn volume(&self) -> EngineVolume {
        self.voice.with(|v| v.volume)
    }

    fn set_loops(&mut self, loops: u32) -> EngineResult<()> {
        self.voice.with(|v| v.loops_remaining = loops);
        Ok(())
    }

    fn mute_channel(&mut self, channel: u8) -> EngineResult<()> {
        let mask = ChannelMask::channel(channel).ok_or(EngineError::PARAM_ERR)?;
        self.voice.with(|v| v.muted.insert(mask));
        Ok(())
    }

    fn sample_rate(&self) -> Option<u32> {
        self.voice.with(|v| v.source_rate())
    }

    fn take_completion(&mut self) -> Option<CompletionNotice> {
        self.voice.with(|v| v.shared.take_completion())
    }

    fn describe(&self) -> Option<String> {
        self.voice.with(|v| {
            v.source_rate().map(|rate| {
                format!(
                    "{:?} session, {rate} Hz source, {} frames buffered",
                    v.kind,
                    v.frame_count()
                )
            })
        })
    }
}

impl Drop for PcmSession {
    fn drop(&mut self) {
        self.registry.unregister(&self.voice);
    }
}
