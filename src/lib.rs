//! playbae: command-line audio/MIDI player core
//!
//! The playback-control layer of a player built on a sound-rendering engine:
//! a cooperative poll loop that drives one rendering session to completion,
//! plus the platform primitives it and the engine rely on.
//!
//! # Layers
//! - [`platform`]: monotonic clock, blocking waits, re-entrant lock,
//!   synchronous file I/O, memory accounting, audio buffer sizing
//! - [`engine`]: the `Mixer`/`Session` boundary and the built-in PCM engine
//! - [`playback`]: the session scheduler, volume scaling, mute lists,
//!   position display
//! - [`console`], [`config`], [`cli`], [`filetype`]: the player around it
//!
//! # Quick start
//! ```no_run
//! use playbae::console::{Console, Verbosity};
//! use playbae::engine::{MixerSettings, PcmMixer, ReverbType};
//! use playbae::playback::{InterruptSignal, PlaybackParameters, Player, SchedulerPolicy};
//! use std::path::Path;
//!
//! let console = Console::stdout(Verbosity::Normal);
//! let interrupt = InterruptSignal::new();
//! let mut mixer = PcmMixer::open(MixerSettings::default()).unwrap();
//! let mut player = Player::new(SchedulerPolicy::default(), &console, &interrupt);
//! player
//!     .play_file(
//!         &mut mixer,
//!         Path::new("tone.wav"),
//!         ReverbType::default(),
//!         None,
//!         &PlaybackParameters::default(),
//!     )
//!     .unwrap();
//! ```

#![warn(missing_docs)]

pub mod cli; // Command-line flags
pub mod config; // Player configuration
pub mod console; // User-facing output
pub mod engine; // Rendering engine boundary
pub mod filetype; // Magic-byte sniffing
pub mod platform; // Platform primitives
pub mod playback; // Session scheduler

use std::path::PathBuf;

/// Error types for player operations
#[derive(thiserror::Error, Debug)]
pub enum PlaybaeError {
    /// The rendering engine rejected a call
    #[error(transparent)]
    Engine(#[from] engine::EngineError),

    /// A platform file operation failed
    #[error("File error: {0}")]
    File(#[from] platform::FileError),

    /// The file header matched no known container
    #[error("{0}: unrecognized file type")]
    UnrecognizedFile(PathBuf),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// IO error from the filesystem
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PlaybaeError {
    /// Numeric code reported as `BAE Error #<code>`.
    pub fn result_code(&self) -> i32 {
        match self {
            PlaybaeError::Engine(err) => err.code(),
            PlaybaeError::File(err) => err.code(),
            PlaybaeError::UnrecognizedFile(_) => filetype::UNRECOGNIZED_FILE_CODE,
            PlaybaeError::ConfigError(_) => engine::EngineError::PARAM_ERR.code(),
            PlaybaeError::Io(_) => platform::FileError::SENTINEL,
        }
    }
}

/// Result type for player operations
pub type Result<T> = std::result::Result<T, PlaybaeError>;

// Public API exports
pub use config::{Command, PlayerConfig};
pub use console::{Console, Verbosity};
pub use engine::{EngineError, Mixer, PcmMixer, Session, SessionKind};
pub use playback::{InterruptSignal, PlaybackParameters, PlaybackReport, Player, Scheduler};
