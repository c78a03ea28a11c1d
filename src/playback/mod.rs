//! Playback Session Scheduler
//!
//! Drives one started session to completion: services output, polls
//! completion then position, throttles the position display, turns an
//! operator interrupt or an exceeded time limit into a single stop request,
//! and drains trailing audio at the end.
//!
//! Per session the scheduler moves through
//! `Starting -> Running -> StopRequested -> Draining -> Finished`;
//! a session that ends on its own goes straight from `Running` to `Finished`.

pub mod channels;
pub mod interrupt;
pub mod player;
pub mod policy;
pub mod position;
pub mod session_loop;
pub mod volume;

use crate::engine::MixerSettings;
use serde::{Deserialize, Serialize};

pub use channels::{apply_mute_list, parse_mute_list, MuteReport};
pub use interrupt::InterruptSignal;
pub use player::{PlayRequest, Player};
pub use policy::{SchedulerPolicy, SessionProfile, SinkMode, TimeLimitPolicy};
pub use position::{PositionDisplay, PositionDisplayThrottle, PositionUnit};
pub use session_loop::Scheduler;

/// Per-session playback parameters, fixed before the session starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackParameters {
    /// Target volume in percent (above 100 is overdrive)
    pub volume_percent: u32,
    /// Stop after this many seconds; 0 plays to the end
    pub time_limit_secs: u32,
    /// Extra repeats for sequences; 0 plays once
    pub loop_count: u32,
    /// Ramp the volume down when stopping early
    pub fade_on_stop: bool,
    /// Output destination
    pub sink: SinkMode,
    /// Mixer rate, interpolation and voice split
    pub mixer: MixerSettings,
}

impl Default for PlaybackParameters {
    fn default() -> Self {
        PlaybackParameters {
            volume_percent: volume::DEFAULT_VOLUME_PCT,
            time_limit_secs: 0,
            loop_count: 0,
            fade_on_stop: true,
            sink: SinkMode::Device,
            mixer: MixerSettings::default(),
        }
    }
}

/// Scheduler state for the session being driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// Start requested, loop not entered yet
    #[default]
    Starting,
    /// Polling, no stop requested
    Running,
    /// Stop decided, call being issued
    StopRequested,
    /// Stop issued, waiting for the engine to finish
    Draining,
    /// Engine reported the session done
    Finished,
}

/// Why the scheduler asked the engine to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Operator interrupt
    Interrupted,
    /// Time limit reached
    TimeLimit,
}

/// What happened while a session was driven.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackReport {
    /// Poll iterations, including the one that saw completion
    pub iterations: u64,
    /// Stop calls issued (never more than one)
    pub stop_requests: u32,
    /// Cause of the stop, if any
    pub stop_reason: Option<StopReason>,
    /// Iteration (1-based) on which the stop was issued
    pub stop_iteration: Option<u64>,
    /// Position lines printed
    pub display_lines: u64,
    /// Last observed position in milliseconds
    pub last_position_ms: u64,
    /// Output servicing calls that failed
    pub service_errors: u64,
    /// Phase when the scheduler returned
    pub final_phase: SessionPhase,
}
