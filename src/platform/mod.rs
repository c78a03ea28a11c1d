//! Platform Primitives
//!
//! The handful of OS services the scheduler and the engine cannot do without:
//! monotonic timing, blocking waits, a re-entrant lock, synchronous file I/O,
//! memory accounting and audio buffer sizing.
//!
//! Every primitive reports failure as a value. Nothing here terminates the
//! process or raises an interrupt of its own.

pub mod audio;
pub mod clock;
pub mod file;
pub mod memory;
pub mod mutex;

pub use audio::{audio_byte_buffer_size, frames_per_buffer, BUFFER_ALIGNMENT};
pub use clock::{now, sleep_for, Sleeper, ThreadSleeper};
pub use file::{FileError, FileResult, PlatformFile};
pub use memory::{
    allocate, deallocate, peak_size_used, size_used, telemetry, AccountingAllocator,
    MemoryBlock, MemoryTelemetry,
};
pub use mutex::RecursiveMutex;
