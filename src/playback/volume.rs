//! Percentage / engine volume conversion
//!
//! The caller speaks whole percentages (overdrive above 100 allowed up to
//! [`MAX_OVERDRIVE_PCT`]); the engine takes 16.16 fixed point. The forward
//! direction multiplies before dividing and truncates. The inverse rounds to
//! nearest, which recovers every percentage in range exactly.

use crate::engine::{EngineVolume, ENGINE_VOLUME_UNITY};

/// Highest accepted volume percentage.
pub const MAX_OVERDRIVE_PCT: u32 = 500;

/// Default volume percentage.
pub const DEFAULT_VOLUME_PCT: u32 = 100;

/// Percentage to engine fixed point: `p * UNITY / 100`, truncated.
pub fn to_engine(percent: u32) -> EngineVolume {
    let scaled = percent as u64 * ENGINE_VOLUME_UNITY as u64 / 100;
    EngineVolume(scaled.min(u32::MAX as u64) as u32)
}

/// Engine fixed point to percentage: `v * 100 / UNITY`, rounded to nearest.
pub fn to_display(volume: EngineVolume) -> u32 {
    let unity = ENGINE_VOLUME_UNITY as u64;
    ((volume.0 as u64 * 100 + unity / 2) / unity) as u32
}

/// Clamp a requested percentage to the overdrive cap.
///
/// Returns the effective percentage and whether clamping happened.
pub fn clamp_percent(percent: u32) -> (u32, bool) {
    if percent > MAX_OVERDRIVE_PCT {
        (MAX_OVERDRIVE_PCT, true)
    } else {
        (percent, false)
    }
}
