//! Player configuration
//!
//! [`PlayerConfig`] gathers everything one run of the player needs. It can be
//! seeded from a JSON defaults file and is then overlaid by command-line
//! flags. The setters clamp out-of-range values and hand back the notice the
//! user should see.

use crate::console::Verbosity;
use crate::engine::pcm::SUPPORTED_RATES;
use crate::engine::{FileType, Interpolation, MixerSettings, ReverbType, SessionKind, VoiceSplit};
use crate::playback::volume::{clamp_percent, MAX_OVERDRIVE_PCT};
use crate::playback::{PlaybackParameters, SchedulerPolicy, SinkMode};
use crate::{PlaybaeError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Fewest voices the mixer may be opened with.
pub const MIN_VOICES: u16 = 4;
/// Most voices the mixer may be opened with.
pub const MAX_VOICES: u16 = 64;

/// The single play command a run performs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Sniff the file and play it with the matching session kind
    PlayFile(PathBuf),
    /// Play with an explicit session kind and container type
    Play {
        /// Session kind
        kind: SessionKind,
        /// Container handed to the loader
        file_type: FileType,
        /// File to play
        path: PathBuf,
    },
}

impl Command {
    /// Announcement printed before an explicit command runs.
    pub fn announcement(&self) -> Option<String> {
        match self {
            Command::PlayFile(_) => None,
            Command::Play {
                kind,
                file_type,
                path,
            } => {
                let verb = if *kind == SessionKind::Stream {
                    "Streaming"
                } else {
                    "Playing"
                };
                Some(format!("{verb} {file_type} {}", path.display()))
            }
        }
    }
}

/// Everything one run of the player needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Per-session parameters, including the mixer settings
    pub playback: PlaybackParameters,
    /// Total voices; split between sequences and PCM on open
    pub max_voices: u16,
    /// Default reverb for sequences
    pub reverb: ReverbType,
    /// Patch bank to load
    pub bank: Option<PathBuf>,
    /// Render to this WAV file instead of the device
    pub output_file: Option<PathBuf>,
    /// Comma-separated 1-based channels to mute
    pub mute_channels: Option<String>,
    /// Console verbosity
    pub verbosity: Verbosity,
    /// Poll loop timing
    pub policy: SchedulerPolicy,
    /// What to play
    pub command: Option<Command>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        PlayerConfig {
            playback: PlaybackParameters::default(),
            max_voices: MAX_VOICES,
            reverb: ReverbType::default(),
            bank: None,
            output_file: None,
            mute_channels: None,
            verbosity: Verbosity::Normal,
            policy: SchedulerPolicy::default(),
            command: None,
        }
    }
}

impl PlayerConfig {
    /// Parse a JSON document; missing fields keep their defaults.
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| PlaybaeError::ConfigError(e.to_string()))
    }

    /// Read and parse a JSON defaults file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text)
            .map_err(|e| PlaybaeError::ConfigError(format!("{}: {e}", path.display())))
    }

    /// Set the total voice count, clamped to `MIN_VOICES..=MAX_VOICES`.
    pub fn set_max_voices(&mut self, requested: i64) -> Option<String> {
        let clamped = requested.clamp(MIN_VOICES as i64, MAX_VOICES as i64) as u16;
        self.max_voices = clamped;
        self.playback.mixer.voices = VoiceSplit::from_max_voices(clamped);
        (clamped as i64 != requested).then(|| {
            format!(
                "Invalid value for max voices: {requested}, expected {MIN_VOICES}-{MAX_VOICES}. Set to {clamped}."
            )
        })
    }

    /// Set the volume percentage, capped at the overdrive limit.
    pub fn set_volume(&mut self, percent: u32) -> Option<String> {
        let (volume, clamped) = clamp_percent(percent);
        self.playback.volume_percent = volume;
        clamped.then(|| format!("Volume Overdrive limit reached: Setting volume to {MAX_OVERDRIVE_PCT}%"))
    }

    /// Set the reverb by id; unknown ids fall back to the default.
    pub fn set_reverb(&mut self, id: i64) -> Option<String> {
        match ReverbType::from_id(id) {
            Some(reverb) => {
                self.reverb = reverb;
                None
            }
            None => {
                self.reverb = ReverbType::default();
                Some(format!("Invalid reverbType {id}, expected 1-11. Ignored."))
            }
        }
    }

    /// Set the mixer rate; unsupported rates fall back to 44100 Hz.
    pub fn set_sample_rate(&mut self, rate: u32) -> Option<String> {
        if SUPPORTED_RATES.contains(&rate) {
            self.playback.mixer.sample_rate = rate;
            None
        } else {
            let fallback = MixerSettings::default().sample_rate;
            self.playback.mixer.sample_rate = fallback;
            Some(format!("Unsupported mixer rate {rate}, using {fallback}"))
        }
    }

    /// Use 2-point instead of linear interpolation.
    pub fn set_two_point(&mut self) {
        self.playback.mixer.interpolation = Interpolation::TwoPoint;
    }

    /// Route output to `path` (or back to the device).
    pub fn set_output_file(&mut self, path: Option<PathBuf>) {
        self.playback.sink = if path.is_some() {
            SinkMode::File
        } else {
            SinkMode::Device
        };
        self.output_file = path;
    }

    /// Re-apply every clamp, e.g. after loading a defaults file.
    pub fn validate(&mut self) -> Vec<String> {
        let mut notices = Vec::new();
        notices.extend(self.set_max_voices(self.max_voices as i64));
        notices.extend(self.set_volume(self.playback.volume_percent));
        notices.extend(self.set_sample_rate(self.playback.mixer.sample_rate));
        let output = self.output_file.take();
        self.set_output_file(output);
        notices
    }

    /// Mixer settings with the voice split derived from `max_voices`.
    pub fn mixer_settings(&self) -> MixerSettings {
        MixerSettings {
            voices: VoiceSplit::from_max_voices(self.max_voices),
            ..self.playback.mixer
        }
    }
}
