//! Scheduler timing policy and per-kind session profiles

use super::position::{PositionDisplay, PositionUnit};
use crate::engine::SessionKind;
use serde::{Deserialize, Serialize};

/// Where rendered audio goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SinkMode {
    /// Real-time output device
    #[default]
    Device,
    /// WAV file, rendered as fast as the scheduler services it
    File,
}

/// Timing constants for the poll loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerPolicy {
    /// Length of one sleep increment
    pub sleep_increment_micros: u64,
    /// Idle time between polls on a device sink
    pub poll_interval_micros: u64,
    /// Idle time after the session finishes
    pub drain_micros: u64,
    /// Early-stop margin for sequence time limits
    pub early_stop_margin_ms: u64,
    /// Polls per position line for PCM samples
    pub pcm_display_divisor: u32,
    /// Polls per position line for sequences on a device sink
    pub sequence_display_divisor: u32,
    /// Polls per position line for sequences on a file sink
    pub file_sequence_display_divisor: u32,
}

impl Default for SchedulerPolicy {
    fn default() -> Self {
        SchedulerPolicy {
            sleep_increment_micros: 12_000,
            poll_interval_micros: 15_000,
            drain_micros: 900_000,
            early_stop_margin_ms: 750,
            pcm_display_divisor: 1,
            sequence_display_divisor: 10,
            file_sequence_display_divisor: 100,
        }
    }
}

/// When a time limit triggers a stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeLimitPolicy {
    /// Once the position reaches the limit in whole seconds
    AtLimit,
    /// Once the position passes the limit minus a margin
    EarlyMargin {
        /// Margin in milliseconds
        margin_ms: u64,
    },
    /// Never
    Ignored,
}

impl TimeLimitPolicy {
    /// Whether `position_ms` has run past `limit_secs` (0 means unbounded).
    pub fn exceeded(&self, position_ms: u64, limit_secs: u32) -> bool {
        if limit_secs == 0 {
            return false;
        }
        let limit_ms = limit_secs as u64 * 1000;
        match self {
            TimeLimitPolicy::AtLimit => position_ms / 1000 >= limit_secs as u64,
            TimeLimitPolicy::EarlyMargin { margin_ms } => {
                position_ms > limit_ms.saturating_sub(*margin_ms)
            }
            TimeLimitPolicy::Ignored => false,
        }
    }
}

/// Everything kind-specific the poll loop needs, fixed for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionProfile {
    /// Unit of the raw position
    pub unit: PositionUnit,
    /// Time-limit rule
    pub time_limit: TimeLimitPolicy,
    /// Position line style
    pub display: PositionDisplay,
    /// Polls per position line
    pub display_divisor: u32,
}

impl SessionProfile {
    /// Profile for a session kind writing to `sink`.
    pub fn select(kind: SessionKind, sink: SinkMode, policy: &SchedulerPolicy) -> Self {
        match kind {
            SessionKind::Sample => SessionProfile {
                unit: PositionUnit::SampleFrames,
                time_limit: TimeLimitPolicy::AtLimit,
                display: PositionDisplay::Seconds,
                display_divisor: policy.pcm_display_divisor,
            },
            // streams report no position and run to the end of their data
            SessionKind::Stream => SessionProfile {
                unit: PositionUnit::SampleFrames,
                time_limit: TimeLimitPolicy::Ignored,
                display: PositionDisplay::Hidden,
                display_divisor: policy.pcm_display_divisor,
            },
            SessionKind::Song | SessionKind::Rmf => SessionProfile {
                unit: PositionUnit::Microseconds,
                time_limit: TimeLimitPolicy::EarlyMargin {
                    margin_ms: policy.early_stop_margin_ms,
                },
                display: PositionDisplay::Millis,
                display_divisor: match sink {
                    SinkMode::Device => policy.sequence_display_divisor,
                    SinkMode::File => policy.file_sequence_display_divisor,
                },
            },
        }
    }
}
