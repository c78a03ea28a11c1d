//! Audio buffer sizing
//!
//! Byte size of one device buffer for a given output format. The divisor is
//! calibrated so that 44.1 kHz stereo 16-bit yields 2048 bytes (512 frames,
//! about 11.6 ms).

/// Device buffers are rounded up to a multiple of this many bytes.
pub const BUFFER_ALIGNMENT: usize = 64;

/// Bits per second divided by this gives the per-buffer byte count.
const FRAME_PERIOD_DIVISOR: f64 = 689.0625;

/// Byte size of one audio buffer for device output.
///
/// Advisory: the engine uses it to size its render slices, nothing enforces it.
pub fn audio_byte_buffer_size(sample_rate: u32, channels: u16, bits: u16) -> usize {
    let bits_per_second = sample_rate as u64 * channels as u64 * bits as u64;
    let raw = (bits_per_second as f64 / FRAME_PERIOD_DIVISOR) as usize;
    round_up(raw, BUFFER_ALIGNMENT)
}

/// Number of whole frames that fit in a buffer of `buffer_bytes`.
pub fn frames_per_buffer(buffer_bytes: usize, channels: u16, bits: u16) -> usize {
    let frame_bytes = channels as usize * (bits as usize / 8);
    if frame_bytes == 0 {
        return 0;
    }
    buffer_bytes / frame_bytes
}

fn round_up(value: usize, multiple: usize) -> usize {
    if multiple == 0 {
        return value;
    }
    match value % multiple {
        0 => value,
        remainder => value + multiple - remainder,
    }
}
