//! Monotonic clock and blocking waits
//!
//! `now()` counts microseconds from an epoch fixed at the first call in the
//! process. `sleep_for()` is the only blocking primitive the scheduler uses.

use std::sync::OnceLock;
use std::time::{Duration, Instant};

static EPOCH: OnceLock<Instant> = OnceLock::new();

/// Microseconds elapsed since the first call to `now()` in this process.
///
/// Backed by [`Instant`], so it never goes backward.
pub fn now() -> u64 {
    let epoch = EPOCH.get_or_init(Instant::now);
    epoch.elapsed().as_micros() as u64
}

/// Block the calling thread for at least `micros` microseconds.
///
/// May oversleep by the platform's scheduling quantum, never undersleeps.
pub fn sleep_for(micros: u64) {
    if micros == 0 {
        return;
    }
    std::thread::sleep(Duration::from_micros(micros));
}

/// Blocking wait used by the playback scheduler.
///
/// Abstracted so the poll loop can be driven without real time passing.
pub trait Sleeper {
    /// Block for at least `micros` microseconds.
    fn sleep_micros(&mut self, micros: u64);
}

/// [`Sleeper`] that blocks the current thread via [`sleep_for`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep_micros(&mut self, micros: u64) {
        sleep_for(micros);
    }
}
