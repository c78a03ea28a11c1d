//! Rendering engine boundary
//!
//! The scheduler talks to the sound-rendering engine only through the
//! [`Mixer`] and [`Session`] traits defined here. Result codes are opaque
//! numbers owned by the engine; the core surfaces them verbatim.
//!
//! [`pcm`] is the built-in engine shipped with the binary. It renders PCM
//! sample and stream sessions from WAV files; sequence sessions are reported
//! as an unsupported format.

pub mod pcm;
pub mod shared;

use bitflags::bitflags;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

pub use pcm::PcmMixer;
pub use shared::{CompletionNotice, SharedSessionState};

/// Fixed-point unity gain (16.16) the engine expects for volume calls.
pub const ENGINE_VOLUME_UNITY: u32 = 1 << 16;

/// Opaque engine result code.
///
/// Zero is success and never appears inside an `EngineError`.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[error("BAE Error #{0}")]
pub struct EngineError(pub i32);

impl EngineError {
    /// Bad parameter
    pub const PARAM_ERR: EngineError = EngineError(1);
    /// Allocation failed
    pub const MEMORY_ERR: EngineError = EngineError(2);
    /// Operation attempted before the object was set up
    pub const NOT_SETUP: EngineError = EngineError(13);
    /// Every voice is busy
    pub const NO_FREE_VOICES: EngineError = EngineError(14);
    /// File exists but is not of the requested type
    pub const BAD_FILE_TYPE: EngineError = EngineError(16);
    /// File is malformed
    pub const BAD_FILE: EngineError = EngineError(18);
    /// Sample data is unusable
    pub const BAD_SAMPLE: EngineError = EngineError(20);
    /// Patch bank could not be used
    pub const BAD_BANK: EngineError = EngineError(22);
    /// Mixer rate not supported
    pub const BAD_SAMPLE_RATE: EngineError = EngineError(23);
    /// Format recognised but not renderable by this engine
    pub const UNSUPPORTED_FORMAT: EngineError = EngineError(25);
    /// Read or write failed
    pub const FILE_IO_ERROR: EngineError = EngineError(26);
    /// File does not exist
    pub const FILE_NOT_FOUND: EngineError = EngineError(30);

    /// The numeric result code.
    pub fn code(&self) -> i32 {
        self.0
    }
}

/// Result type for engine calls
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// The four kinds of rendering session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionKind {
    /// One-shot PCM sample, fully loaded before playback
    Sample,
    /// PCM streamed from disk while playing
    Stream,
    /// Standard MIDI note sequence
    Song,
    /// Structured note sequence with embedded resources
    Rmf,
}

impl SessionKind {
    /// Note-sequence kinds (position in microseconds, mutable channels).
    pub fn is_sequence(&self) -> bool {
        matches!(self, SessionKind::Song | SessionKind::Rmf)
    }

    /// Noun used in user-facing volume messages.
    pub fn noun(&self) -> &'static str {
        match self {
            SessionKind::Sample => "sound",
            SessionKind::Stream => "stream",
            SessionKind::Song | SessionKind::Rmf => "song",
        }
    }
}

/// Container format of a file handed to a session loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileType {
    /// Standard MIDI file
    Midi,
    /// Rich Music Format
    Rmf,
    /// Audio Interchange File Format
    Aiff,
    /// RIFF WAVE
    Wave,
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FileType::Midi => "MIDI",
            FileType::Rmf => "RMF",
            FileType::Aiff => "AIFF",
            FileType::Wave => "WAVE",
        })
    }
}

/// Fixed-point (16.16) volume as passed to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct EngineVolume(pub u32);

impl EngineVolume {
    /// Unity gain
    pub const UNITY: EngineVolume = EngineVolume(ENGINE_VOLUME_UNITY);

    /// Linear gain factor.
    pub fn gain(&self) -> f32 {
        self.0 as f32 / ENGINE_VOLUME_UNITY as f32
    }
}

/// Sample interpolation used by the mixer when resampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Interpolation {
    /// Nearest sample
    DropSample,
    /// Two-point interpolation
    TwoPoint,
    /// Linear interpolation
    #[default]
    Linear,
}

/// Default reverb applied to sequence sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, FromPrimitive, Serialize, Deserialize)]
pub enum ReverbType {
    /// Engine default
    Default = 0,
    /// No reverb
    None = 1,
    /// Igor's Closet
    Closet = 2,
    /// Igor's Garage
    Garage = 3,
    /// Igor's Acoustic Lab
    AcousticLab = 4,
    /// Igor's Cavern
    Cavern = 5,
    /// Igor's Dungeon
    Dungeon = 6,
    /// Small reflections (WebTV)
    SmallReflections = 7,
    /// Early reflections (variable verb)
    #[default]
    EarlyReflections = 8,
    /// Basement (variable verb)
    Basement = 9,
    /// Banquet hall (variable verb)
    BanquetHall = 10,
    /// Catacombs (variable verb)
    Catacombs = 11,
}

impl ReverbType {
    /// Every reverb type, in id order.
    pub const ALL: [ReverbType; 12] = [
        ReverbType::Default,
        ReverbType::None,
        ReverbType::Closet,
        ReverbType::Garage,
        ReverbType::AcousticLab,
        ReverbType::Cavern,
        ReverbType::Dungeon,
        ReverbType::SmallReflections,
        ReverbType::EarlyReflections,
        ReverbType::Basement,
        ReverbType::BanquetHall,
        ReverbType::Catacombs,
    ];

    /// Look up a reverb by its numeric id (0..=11).
    pub fn from_id(id: i64) -> Option<Self> {
        ReverbType::from_i64(id)
    }

    /// Numeric id.
    pub fn id(&self) -> u8 {
        *self as u8
    }

    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            ReverbType::Default => "Default",
            ReverbType::None => "None",
            ReverbType::Closet => "Igor's Closet",
            ReverbType::Garage => "Igor's Garage",
            ReverbType::AcousticLab => "Igor's Acoustic Lab",
            ReverbType::Cavern => "Igor's Cavern",
            ReverbType::Dungeon => "Igor's Dungeon",
            ReverbType::SmallReflections => "Small reflections (Reverb used for WebTV)",
            ReverbType::EarlyReflections => "Early reflections (variable verb)",
            ReverbType::Basement => "Basement (variable verb)",
            ReverbType::BanquetHall => "Banquet hall (variable verb)",
            ReverbType::Catacombs => "Catacombs (variable verb)",
        }
    }
}

bitflags! {
    /// Mixer output format
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct OutputFormat: u8 {
        /// Two output channels
        const STEREO = 0x01;
        /// 16-bit samples (8-bit otherwise)
        const BITS_16 = 0x02;
    }
}

impl OutputFormat {
    /// Channel count implied by the flags.
    pub fn channels(&self) -> u16 {
        if self.contains(OutputFormat::STEREO) {
            2
        } else {
            1
        }
    }

    /// Bits per sample implied by the flags.
    pub fn bit_depth(&self) -> u16 {
        if self.contains(OutputFormat::BITS_16) {
            16
        } else {
            8
        }
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::STEREO | OutputFormat::BITS_16
    }
}

bitflags! {
    /// Set of muted sequence channels; bit `n` is the 0-based channel `n`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ChannelMask: u16 {
        /// Every one of the 16 channels
        const ALL = 0xFFFF;
    }
}

impl ChannelMask {
    /// Mask containing only the 0-based `channel`, or `None` when out of range.
    pub fn channel(channel: u8) -> Option<Self> {
        1u16.checked_shl(channel as u32).and_then(ChannelMask::from_bits)
    }

    /// 0-based channels in the set, ascending.
    pub fn channels(&self) -> Vec<u8> {
        (0..16u8)
            .filter(|&c| self.bits() & (1 << c) != 0)
            .collect()
    }
}

/// How the mixer's voices are divided between sequence and PCM playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceSplit {
    /// Voices reserved for note sequences
    pub sequence_voices: u16,
    /// Voices reserved for PCM samples and streams
    pub pcm_voices: u16,
    /// Mix level (headroom divisor) for sequence voices
    pub mix_level: u16,
}

impl VoiceSplit {
    /// One PCM voice, the rest for sequences, mix level a third of those.
    pub fn from_max_voices(max_voices: u16) -> Self {
        let pcm_voices = 1;
        let sequence_voices = max_voices.saturating_sub(pcm_voices);
        VoiceSplit {
            sequence_voices,
            pcm_voices,
            mix_level: sequence_voices / 3,
        }
    }
}

impl Default for VoiceSplit {
    fn default() -> Self {
        Self::from_max_voices(64)
    }
}

/// Parameters the mixer is opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerSettings {
    /// Output sample rate in Hz
    pub sample_rate: u32,
    /// Resampling interpolation
    pub interpolation: Interpolation,
    /// Output format flags
    pub format: OutputFormat,
    /// Voice allocation
    pub voices: VoiceSplit,
}

impl Default for MixerSettings {
    fn default() -> Self {
        MixerSettings {
            sample_rate: 44_100,
            interpolation: Interpolation::Linear,
            format: OutputFormat::default(),
            voices: VoiceSplit::default(),
        }
    }
}

/// Handle to a loaded patch bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BankToken(pub u32);

/// One engine-managed unit of rendering.
///
/// Created by [`Mixer::new_session`], destroyed by dropping it.
pub trait Session: Send {
    /// Kind fixed at creation.
    fn kind(&self) -> SessionKind;

    /// Load content from a file.
    fn load(&mut self, path: &Path, file_type: FileType) -> EngineResult<()>;

    /// Begin playback.
    fn start(&mut self) -> EngineResult<()>;

    /// Stop playback, ramping volume down first when `fade` is set.
    fn stop(&mut self, fade: bool);

    /// Whether the session has finished (end of data or stop completed).
    fn is_done(&self) -> bool;

    /// Raw position: sample frames for PCM kinds, microseconds for sequences.
    fn position(&self) -> u64;

    /// Set the playback volume.
    fn set_volume(&mut self, volume: EngineVolume);

    /// Current playback volume.
    fn volume(&self) -> EngineVolume;

    /// Number of additional repeats after the first pass.
    fn set_loops(&mut self, loops: u32) -> EngineResult<()>;

    /// Mute a 0-based sequence channel.
    fn mute_channel(&mut self, channel: u8) -> EngineResult<()>;

    /// Source sample rate in Hz for PCM kinds once loaded.
    fn sample_rate(&self) -> Option<u32>;

    /// Completion notification posted by the engine, taken at most once.
    fn take_completion(&mut self) -> Option<CompletionNotice> {
        None
    }

    /// Free-form description for verbose output.
    fn describe(&self) -> Option<String> {
        None
    }
}

/// The engine's mixer: owns voices and output, creates sessions.
pub trait Mixer {
    /// Allocate a session of the given kind.
    fn new_session(&mut self, kind: SessionKind) -> EngineResult<Box<dyn Session>>;

    /// Refill streamed sessions. Called once per poll iteration on a live device.
    fn service_streams(&mut self);

    /// Render one slice to the output file. Called once per poll iteration on a file sink.
    fn service_output_to_file(&mut self) -> EngineResult<()>;

    /// Reverb applied to sequence sessions that do not choose their own.
    fn set_default_reverb(&mut self, reverb: ReverbType);

    /// Load a patch bank.
    fn add_bank_from_file(&mut self, path: &Path) -> EngineResult<BankToken>;

    /// Redirect output from the device to a WAV file.
    fn start_output_to_file(&mut self, path: &Path) -> EngineResult<()>;

    /// Finish the output file and return to the device.
    fn stop_output_to_file(&mut self) -> EngineResult<()>;

    /// Whether output currently goes to a file.
    fn is_writing_to_file(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reverb_ids_round_trip() {
        for (id, reverb) in ReverbType::ALL.iter().enumerate() {
            assert_eq!(reverb.id() as usize, id);
            assert_eq!(ReverbType::from_id(id as i64), Some(*reverb));
        }
        assert_eq!(ReverbType::from_id(12), None);
        assert_eq!(ReverbType::from_id(-1), None);
    }

    #[test]
    fn test_channel_mask() {
        let mask = ChannelMask::channel(0).unwrap()
            | ChannelMask::channel(9).unwrap()
            | ChannelMask::channel(15).unwrap();
        assert_eq!(mask.channels(), vec![0, 9, 15]);
        assert!(ChannelMask::channel(16).is_none());
        assert_eq!(ChannelMask::ALL.channels().len(), 16);
        assert!(ChannelMask::ALL.contains(mask));
    }

    #[test]
    fn test_voice_split() {
        let split = VoiceSplit::from_max_voices(64);
        assert_eq!(split.pcm_voices, 1);
        assert_eq!(split.sequence_voices, 63);
        assert_eq!(split.mix_level, 21);
    }

    #[test]
    fn test_output_format() {
        let format = OutputFormat::default();
        assert_eq!(format.channels(), 2);
        assert_eq!(format.bit_depth(), 16);
        assert_eq!(OutputFormat::empty().channels(), 1);
        assert_eq!(OutputFormat::empty().bit_depth(), 8);
        assert_eq!(OutputFormat::BITS_16.bits(), 0x02);
    }

    #[test]
    fn test_engine_error_display() {
        assert_eq!(EngineError::BAD_FILE.to_string(), "BAE Error #18");
        assert_eq!(EngineError(10069).code(), 10069);
    }
}
