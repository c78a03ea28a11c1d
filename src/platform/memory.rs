//! Memory accounting
//!
//! Process-wide "current" and "peak" byte counters, fed by two paths:
//! - [`AccountingAllocator`], a `GlobalAlloc` wrapper around [`System`] that the
//!   binary installs as `#[global_allocator]`
//! - [`allocate`] / [`deallocate`], explicit zero-filled blocks used by the
//!   engine for audio buffers
//!
//! Both feed the same [`MemoryTelemetry`]. Counters start at zero, are never
//! reset, and peak never decreases.

use std::alloc::{GlobalAlloc, Layout, System};
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Alignment used for explicit blocks.
const BLOCK_ALIGN: usize = 16;

/// Current/peak allocation counters.
#[derive(Debug, Default)]
pub struct MemoryTelemetry {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl MemoryTelemetry {
    /// Create zeroed counters.
    pub const fn new() -> Self {
        MemoryTelemetry {
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Account for `size` freshly allocated bytes.
    pub fn record_allocation(&self, size: usize) {
        let current = self.current.fetch_add(size, Ordering::Relaxed) + size;
        self.peak.fetch_max(current, Ordering::Relaxed);
    }

    /// Account for `size` released bytes. Peak is left untouched.
    pub fn record_deallocation(&self, size: usize) {
        // Saturate: frees of blocks allocated before accounting began must not wrap.
        let _ = self
            .current
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                Some(current.saturating_sub(size))
            });
    }

    /// Bytes currently allocated.
    pub fn size_used(&self) -> usize {
        self.current.load(Ordering::Relaxed)
    }

    /// Highest value `size_used()` has reached.
    pub fn peak_size_used(&self) -> usize {
        self.peak.load(Ordering::Relaxed)
    }
}

static TELEMETRY: MemoryTelemetry = MemoryTelemetry::new();

/// Process-wide bytes currently allocated through the accounting paths.
pub fn size_used() -> usize {
    TELEMETRY.size_used()
}

/// Process-wide peak of [`size_used`].
pub fn peak_size_used() -> usize {
    TELEMETRY.peak_size_used()
}

/// Process telemetry handle, for diagnostics that want both counters at once.
pub fn telemetry() -> &'static MemoryTelemetry {
    &TELEMETRY
}

/// `GlobalAlloc` wrapper that feeds the process telemetry.
///
/// ```ignore
/// #[global_allocator]
/// static ALLOCATOR: playbae::platform::AccountingAllocator = playbae::platform::AccountingAllocator;
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct AccountingAllocator;

unsafe impl GlobalAlloc for AccountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            TELEMETRY.record_allocation(layout.size());
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc_zeroed(layout) };
        if !ptr.is_null() {
            TELEMETRY.record_allocation(layout.size());
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) };
        TELEMETRY.record_deallocation(layout.size());
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = unsafe { System.realloc(ptr, layout, new_size) };
        if !new_ptr.is_null() {
            TELEMETRY.record_deallocation(layout.size());
            TELEMETRY.record_allocation(new_size);
        }
        new_ptr
    }
}

/// Zero-filled heap block obtained from [`allocate`].
///
/// Released (and un-accounted) on drop or through [`deallocate`].
#[derive(Debug)]
pub struct MemoryBlock {
    ptr: NonNull<u8>,
    len: usize,
}

// The block exclusively owns its allocation.
unsafe impl Send for MemoryBlock {}
unsafe impl Sync for MemoryBlock {}

impl MemoryBlock {
    /// Size of the block in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false: zero-sized requests never produce a block.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn layout(len: usize) -> Option<Layout> {
        Layout::from_size_align(len, BLOCK_ALIGN).ok()
    }
}

impl Deref for MemoryBlock {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        // ptr is valid for len initialised bytes for the lifetime of self
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl DerefMut for MemoryBlock {
    fn deref_mut(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for MemoryBlock {
    fn drop(&mut self) {
        if let Some(layout) = Self::layout(self.len) {
            unsafe { System.dealloc(self.ptr.as_ptr(), layout) };
            TELEMETRY.record_deallocation(self.len);
        }
    }
}

/// Allocate a zero-filled block of `size` bytes and account for it.
///
/// Returns `None` for `size == 0` (no accounting happens) or when the system
/// allocator refuses the request.
pub fn allocate(size: usize) -> Option<MemoryBlock> {
    if size == 0 {
        return None;
    }
    let layout = MemoryBlock::layout(size)?;
    // Goes straight to System so a global AccountingAllocator does not count it twice.
    let ptr = NonNull::new(unsafe { System.alloc_zeroed(layout) })?;
    TELEMETRY.record_allocation(size);
    Some(MemoryBlock { ptr, len: size })
}

/// Release a block obtained from [`allocate`].
pub fn deallocate(block: MemoryBlock) {
    drop(block);
}
