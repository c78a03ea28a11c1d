//! Built-in PCM engine
//!
//! Mixes WAV-backed sample and stream sessions into 16-bit output. Output goes
//! either to a paced null device (a render thread with no audio hardware
//! behind it) or, after [`Mixer::start_output_to_file`], to a WAV file that is
//! advanced one slice per [`Mixer::service_output_to_file`] call.
//!
//! Lock order is registry first, then a single voice.

mod decode;
mod device;
mod session;
mod voice;

use crate::engine::{
    BankToken, EngineError, EngineResult, Mixer, MixerSettings, OutputFormat, ReverbType, Session,
    SessionKind,
};
use crate::platform::{self, FileError, MemoryBlock, PlatformFile, RecursiveMutex};
use device::NullDevice;
use hound::{SampleFormat, WavSpec, WavWriter};
use parking_lot::{Mutex, MutexGuard};
use session::{PcmSession, SessionLimits};
use std::fs::File;
use std::io::{BufWriter, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};
use voice::Voice;

/// Stereo frame, left then right.
pub(crate) type Frame = [f32; 2];

pub(crate) type VoiceHandle = Arc<RecursiveMutex<Voice>>;

/// Mixer rates the engine accepts.
pub const SUPPORTED_RATES: [u32; 8] = [8_000, 11_025, 16_000, 22_050, 24_000, 32_000, 44_100, 48_000];

/// Stop fades last this long.
const FADE_MILLIS: u32 = 500;

// Stream buffering, in output slices.
const STREAM_LOW_WATER_SLICES: usize = 4;
const STREAM_CHUNK_SLICES: usize = 8;

/// Every voice the mixer renders, shared with the device thread and sessions.
#[derive(Clone, Default)]
pub(crate) struct VoiceRegistry {
    voices: Arc<Mutex<Vec<VoiceHandle>>>,
}

impl VoiceRegistry {
    pub(crate) fn register(&self, voice: VoiceHandle) {
        self.voices.lock().push(voice);
    }

    pub(crate) fn unregister(&self, voice: &VoiceHandle) {
        self.voices.lock().retain(|v| !Arc::ptr_eq(v, voice));
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Vec<VoiceHandle>> {
        self.voices.lock()
    }

    /// Voices currently playing or fading.
    pub(crate) fn active_count(&self) -> usize {
        self.voices
            .lock()
            .iter()
            .filter(|voice| voice.with(|v| v.is_active()))
            .count()
    }

    fn refill_streams(&self, low_water: usize, chunk: usize) {
        for handle in self.voices.lock().iter() {
            handle.with(|voice| {
                if voice.kind != SessionKind::Stream || !voice.is_active() {
                    return;
                }
                if let Err(err) = voice.refill(low_water, chunk) {
                    warn!("stream refill failed: {err}; stopping voice");
                    voice.request_stop(false, 0);
                }
            });
        }
    }
}

/// Mix every voice into `out` as interleaved little-endian 16-bit samples.
///
/// `mix` is scratch space reused between calls.
pub(crate) fn render_slice(
    voices: &[VoiceHandle],
    settings: &MixerSettings,
    mix: &mut Vec<Frame>,
    out: &mut [u8],
) {
    let channels = settings.format.channels() as usize;
    let bytes_per_frame = 2 * channels;
    let frames = out.len() / bytes_per_frame;

    mix.clear();
    mix.resize(frames, [0.0; 2]);
    for handle in voices {
        handle.with(|voice| voice.mix_into(mix, settings.sample_rate, settings.interpolation));
    }

    for (frame, bytes) in mix.iter().zip(out.chunks_exact_mut(bytes_per_frame)) {
        if channels == 2 {
            bytes[0..2].copy_from_slice(&to_i16(frame[0]).to_le_bytes());
            bytes[2..4].copy_from_slice(&to_i16(frame[1]).to_le_bytes());
        } else {
            bytes[0..2].copy_from_slice(&to_i16((frame[0] + frame[1]) * 0.5).to_le_bytes());
        }
    }
}

fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

struct FileSink {
    writer: WavWriter<BufWriter<File>>,
    block: MemoryBlock,
    path: PathBuf,
}

/// The built-in mixer.
pub struct PcmMixer {
    settings: MixerSettings,
    registry: VoiceRegistry,
    device: Option<NullDevice>,
    file_sink: Option<FileSink>,
    writing_to_file: Arc<AtomicBool>,
    banks: Vec<PathBuf>,
    slice_bytes: usize,
    slice_frames: usize,
    mix: Vec<Frame>,
}

impl PcmMixer {
    /// Open the mixer and start the null output device.
    pub fn open(settings: MixerSettings) -> EngineResult<Self> {
        let mut mixer = Self::open_offline(settings)?;
        mixer.device = Some(NullDevice::start(
            mixer.registry.clone(),
            settings,
            Arc::clone(&mixer.writing_to_file),
        )?);
        Ok(mixer)
    }

    /// Open the mixer without an output device; only file output renders.
    pub fn open_offline(settings: MixerSettings) -> EngineResult<Self> {
        if !SUPPORTED_RATES.contains(&settings.sample_rate) {
            return Err(EngineError::BAD_SAMPLE_RATE);
        }
        if !settings.format.contains(OutputFormat::BITS_16) || settings.voices.pcm_voices == 0 {
            return Err(EngineError::PARAM_ERR);
        }

        let channels = settings.format.channels();
        let bits = settings.format.bit_depth();
        let slice_bytes = platform::audio_byte_buffer_size(settings.sample_rate, channels, bits);
        let slice_frames = platform::frames_per_buffer(slice_bytes, channels, bits);
        debug!(
            "mixer open: {} Hz, {} ch, {} voices for PCM, slice {} frames",
            settings.sample_rate, channels, settings.voices.pcm_voices, slice_frames
        );

        Ok(PcmMixer {
            settings,
            registry: VoiceRegistry::default(),
            device: None,
            file_sink: None,
            writing_to_file: Arc::new(AtomicBool::new(false)),
            banks: Vec::new(),
            slice_bytes,
            slice_frames,
            mix: Vec::with_capacity(slice_frames),
        })
    }

    /// Frames rendered per slice.
    pub fn slice_frames(&self) -> usize {
        self.slice_frames
    }

    /// Number of banks added so far.
    pub fn bank_count(&self) -> usize {
        self.banks.len()
    }

    /// Voices currently playing or fading.
    pub fn active_voices(&self) -> usize {
        self.registry.active_count()
    }

    fn limits(&self) -> SessionLimits {
        SessionLimits {
            pcm_voices: self.settings.voices.pcm_voices as usize,
            fade_frames: self.settings.sample_rate * FADE_MILLIS / 1000,
            stream_chunk: self.slice_frames * STREAM_CHUNK_SLICES,
        }
    }

    fn finish_file_sink(&mut self) -> EngineResult<()> {
        let Some(sink) = self.file_sink.take() else {
            return Ok(());
        };
        {
            let _voices = self.registry.lock();
            self.writing_to_file.store(false, Ordering::Release);
        }
        debug!("finalizing output file {}", sink.path.display());
        sink.writer.finalize().map_err(decode::map_hound_error)
    }
}

impl Mixer for PcmMixer {
    fn new_session(&mut self, kind: SessionKind) -> EngineResult<Box<dyn Session>> {
        Ok(Box::new(PcmSession::new(kind, self.registry.clone(), self.limits())))
    }

    fn service_streams(&mut self) {
        self.registry.refill_streams(
            self.slice_frames * STREAM_LOW_WATER_SLICES,
            self.slice_frames * STREAM_CHUNK_SLICES,
        );
    }

    fn service_output_to_file(&mut self) -> EngineResult<()> {
        if self.file_sink.is_none() {
            return Err(EngineError::NOT_SETUP);
        }
        self.service_streams();

        let Some(sink) = self.file_sink.as_mut() else {
            return Err(EngineError::NOT_SETUP);
        };
        {
            let voices = self.registry.lock();
            render_slice(&voices, &self.settings, &mut self.mix, &mut sink.block);
        }
        for bytes in sink.block.chunks_exact(2) {
            sink.writer
                .write_sample(i16::from_le_bytes([bytes[0], bytes[1]]))
                .map_err(decode::map_hound_error)?;
        }
        Ok(())
    }

    fn set_default_reverb(&mut self, reverb: ReverbType) {
        // no reverb stage in this engine; sequences never reach it
        debug!("default reverb: {} ({})", reverb.id(), reverb.name());
    }

    fn add_bank_from_file(&mut self, path: &Path) -> EngineResult<BankToken> {
        let file = PlatformFile::open_for_read(path).map_err(|err| match err {
            FileError::Io { ref source, .. } if source.kind() == ErrorKind::NotFound => {
                EngineError::FILE_NOT_FOUND
            }
            _ => EngineError::FILE_IO_ERROR,
        })?;
        let length = file.length().map_err(|_| EngineError::FILE_IO_ERROR)?;
        if length == 0 {
            return Err(EngineError::BAD_BANK);
        }
        file.close().map_err(|_| EngineError::FILE_IO_ERROR)?;

        self.banks.push(path.to_path_buf());
        debug!("bank {} added ({} bytes)", path.display(), length);
        Ok(BankToken(self.banks.len() as u32))
    }

    fn start_output_to_file(&mut self, path: &Path) -> EngineResult<()> {
        self.finish_file_sink()?;

        let spec = WavSpec {
            channels: self.settings.format.channels(),
            sample_rate: self.settings.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let writer = WavWriter::create(path, spec).map_err(decode::map_hound_error)?;
        let block = platform::allocate(self.slice_bytes).ok_or(EngineError::MEMORY_ERR)?;

        {
            let _voices = self.registry.lock();
            self.writing_to_file.store(true, Ordering::Release);
        }
        self.file_sink = Some(FileSink {
            writer,
            block,
            path: path.to_path_buf(),
        });
        debug!("writing output to {}", path.display());
        Ok(())
    }

    fn stop_output_to_file(&mut self) -> EngineResult<()> {
        self.finish_file_sink()
    }

    fn is_writing_to_file(&self) -> bool {
        self.file_sink.is_some()
    }
}

impl Drop for PcmMixer {
    fn drop(&mut self) {
        if let Err(err) = self.finish_file_sink() {
            warn!("output file not finalized: {err}");
        }
        if let Some(mut device) = self.device.take() {
            device.shutdown();
        }
    }
}
