//! Paced null output device
//!
//! Stands in for audio hardware: a render thread consumes one slice per
//! slice period, timed against the platform clock, and discards it.

use super::{render_slice, VoiceRegistry};
use crate::engine::{EngineError, EngineResult, MixerSettings};
use crate::platform::{self, MemoryBlock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, warn};

pub(crate) struct NullDevice {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl NullDevice {
    /// Allocate the device buffer and start the render thread.
    pub(crate) fn start(
        registry: VoiceRegistry,
        settings: MixerSettings,
        writing_to_file: Arc<AtomicBool>,
    ) -> EngineResult<Self> {
        let channels = settings.format.channels();
        let bits = settings.format.bit_depth();
        let bytes = platform::audio_byte_buffer_size(settings.sample_rate, channels, bits);
        let block = platform::allocate(bytes).ok_or(EngineError::MEMORY_ERR)?;
        let frames = platform::frames_per_buffer(bytes, channels, bits) as u64;
        let period_micros = frames * 1_000_000 / settings.sample_rate as u64;

        let running = Arc::new(AtomicBool::new(true));
        let running_clone = Arc::clone(&running);
        let thread = std::thread::Builder::new()
            .name("playbae-device".into())
            .spawn(move || {
                run_device_loop(
                    registry,
                    settings,
                    writing_to_file,
                    running_clone,
                    block,
                    period_micros,
                )
            })
            .map_err(|err| {
                warn!("device thread failed to start: {err}");
                EngineError::MEMORY_ERR
            })?;

        debug!("null device started, {period_micros} us per slice");
        Ok(NullDevice {
            running,
            thread: Some(thread),
        })
    }

    /// Signal shutdown and wait for the render thread to finish.
    pub(crate) fn shutdown(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("device thread panicked during shutdown");
            }
        }
    }
}

impl Drop for NullDevice {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_device_loop(
    registry: VoiceRegistry,
    settings: MixerSettings,
    writing_to_file: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    mut block: MemoryBlock,
    period_micros: u64,
) {
    let mut mix = Vec::new();
    let mut deadline = platform::now();

    while running.load(Ordering::Relaxed) {
        {
            let voices = registry.lock();
            // the file sink owns rendering while it is attached
            if !writing_to_file.load(Ordering::Acquire) {
                render_slice(&voices, &settings, &mut mix, &mut block);
            }
        }

        deadline += period_micros;
        let now = platform::now();
        if deadline > now {
            platform::sleep_for(deadline - now);
        } else {
            deadline = now;
        }
    }
}
