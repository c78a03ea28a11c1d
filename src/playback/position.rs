//! Position conversion and display throttling

/// Emits once every `divisor` ticks.
#[derive(Debug, Clone)]
pub struct PositionDisplayThrottle {
    divisor: u32,
    counter: u32,
}

impl PositionDisplayThrottle {
    /// Throttle that fires on every `divisor`-th tick (a divisor of 0 acts as 1).
    pub fn new(divisor: u32) -> Self {
        PositionDisplayThrottle {
            divisor: divisor.max(1),
            counter: 0,
        }
    }

    /// Count one poll iteration; true when a redraw is due.
    pub fn tick(&mut self) -> bool {
        self.counter += 1;
        if self.counter >= self.divisor {
            self.counter = 0;
            true
        } else {
            false
        }
    }

    /// Configured divisor.
    pub fn divisor(&self) -> u32 {
        self.divisor
    }
}

/// Unit of the raw position a session reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionUnit {
    /// Sample frames at the session's source rate
    SampleFrames,
    /// Microseconds
    Microseconds,
}

impl PositionUnit {
    /// Raw position to milliseconds. Frames need the source rate; without it
    /// the position reads as zero.
    pub fn to_millis(&self, raw: u64, sample_rate: Option<u32>) -> u64 {
        match self {
            PositionUnit::Microseconds => raw / 1000,
            PositionUnit::SampleFrames => match sample_rate {
                Some(rate) if rate > 0 => raw * 1000 / rate as u64,
                _ => 0,
            },
        }
    }
}

/// How a position line looks, if shown at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionDisplay {
    /// No position line
    Hidden,
    /// `MM:SS`, shown once past the first second
    Seconds,
    /// `MM:SS.mmm`, shown once past the first two milliseconds
    Millis,
}

impl PositionDisplay {
    /// Position line for `millis`, or `None` when nothing should be shown.
    pub fn format(&self, millis: u64) -> Option<String> {
        let minutes = millis / 60_000;
        let seconds = (millis % 60_000) / 1000;
        let ms = millis % 1000;
        match self {
            PositionDisplay::Hidden => None,
            PositionDisplay::Seconds if seconds > 0 || minutes > 0 => {
                Some(format!("Playback position: {minutes:02}:{seconds:02}"))
            }
            PositionDisplay::Millis if ms > 1 || seconds > 0 || minutes > 0 => {
                Some(format!("Playback position: {minutes:02}:{seconds:02}.{ms:03}"))
            }
            _ => None,
        }
    }
}
