//! General-purpose heap allocator
//!
//! Delegates to the platform allocator ([`std::alloc::System`]) and prepends a
//! small header to every block so that `release` and `allocated_size` work from
//! the pointer alone. Aggregate counters are kept in atomics; when configured
//! as thread safe, every allocate/release additionally runs under one
//! [`parking_lot::Mutex`] so that calls on a shared instance are totally
//! ordered.

use core::alloc::{GlobalAlloc, Layout};
use core::ptr::NonNull;
use core::sync::atomic::{AtomicUsize, Ordering};
use std::alloc::System;

use parking_lot::Mutex;

use super::Allocator;
use crate::error::{AllocResult, MemoryError, MemoryResult};
use crate::utils::{self, CheckedArithmetic};

/// Configuration for [`HeapAllocator`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapConfig {
    /// Serialize allocate/release through a mutex
    pub thread_safe: bool,

    /// Fill pattern byte for newly allocated memory (for debugging)
    pub alloc_pattern: Option<u8>,
    /// Fill pattern byte for released memory (for debugging)
    pub dealloc_pattern: Option<u8>,
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self {
            thread_safe: true,
            alloc_pattern: if cfg!(debug_assertions) {
                Some(0xCC)
            } else {
                None
            },
            dealloc_pattern: if cfg!(debug_assertions) {
                Some(0xDD)
            } else {
                None
            },
        }
    }
}

impl HeapConfig {
    /// Production configuration - thread safe, no fill patterns
    #[must_use]
    pub fn production() -> Self {
        Self {
            thread_safe: true,
            alloc_pattern: None,
            dealloc_pattern: None,
        }
    }

    /// Debug configuration - thread safe, fill patterns always on
    #[must_use]
    pub fn debug() -> Self {
        Self {
            thread_safe: true,
            alloc_pattern: Some(0xCC),
            dealloc_pattern: Some(0xDD),
        }
    }

    /// Single-threaded configuration - no mutex
    #[must_use]
    pub fn single_threaded() -> Self {
        Self {
            thread_safe: false,
            ..Self::production()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> MemoryResult<()> {
        validate_patterns(self.alloc_pattern, self.dealloc_pattern)
    }
}

pub(crate) fn validate_patterns(alloc: Option<u8>, release: Option<u8>) -> MemoryResult<()> {
    match (alloc, release) {
        (Some(a), Some(r)) if a == r => Err(MemoryError::invalid_config(
            "alloc and release fill patterns must differ",
        )),
        _ => Ok(()),
    }
}

/// Snapshot of heap allocator counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapStats {
    /// Bytes currently handed out (word-rounded user sizes)
    pub allocated_bytes: usize,
    /// Highest value `allocated_bytes` has reached
    pub peak_allocated_bytes: usize,
    /// Successful allocations since construction
    pub allocation_count: usize,
    /// Releases since construction
    pub release_count: usize,
    /// Allocations the platform refused
    pub failed_allocations: usize,
}

// Sits immediately before every user pointer.
#[repr(C)]
#[derive(Clone, Copy)]
struct Header {
    /// User size rounded up to a machine word
    size: usize,
    /// Distance from the platform block start to the user pointer
    offset: usize,
    /// Alignment the platform block was requested with
    align: usize,
}

const HEADER_SIZE: usize = size_of::<Header>();
const WORD: usize = size_of::<usize>();

/// General-purpose allocator over the platform heap
///
/// # Examples
///
/// ```
/// use core::alloc::Layout;
/// use basalt_memory::allocator::{Allocator, HeapAllocator};
///
/// let heap = HeapAllocator::new();
/// let layout = Layout::from_size_align(24, 8).unwrap();
/// unsafe {
///     let block = heap.allocate(layout).unwrap();
///     assert_eq!(heap.allocated_size(block.cast()), Some(24));
///     assert_eq!(heap.total_allocated(), Some(24));
///     heap.release(block.cast());
/// }
/// assert_eq!(heap.total_allocated(), Some(0));
/// ```
pub struct HeapAllocator {
    lock: Option<Mutex<()>>,
    config: HeapConfig,
    allocated_bytes: AtomicUsize,
    peak_allocated_bytes: AtomicUsize,
    allocation_count: AtomicUsize,
    release_count: AtomicUsize,
    failed_allocations: AtomicUsize,
}

impl HeapAllocator {
    /// Creates a thread-safe heap allocator with the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::build(HeapConfig::default())
    }

    /// Creates a heap allocator with a custom configuration
    pub fn with_config(config: HeapConfig) -> MemoryResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: HeapConfig) -> Self {
        Self {
            lock: config.thread_safe.then(|| Mutex::new(())),
            config,
            allocated_bytes: AtomicUsize::new(0),
            peak_allocated_bytes: AtomicUsize::new(0),
            allocation_count: AtomicUsize::new(0),
            release_count: AtomicUsize::new(0),
            failed_allocations: AtomicUsize::new(0),
        }
    }

    /// Returns the active configuration
    pub fn config(&self) -> &HeapConfig {
        &self.config
    }

    /// True when allocate/release are serialized by a mutex
    pub fn is_thread_safe(&self) -> bool {
        self.lock.is_some()
    }

    /// Allocations made and not yet released
    ///
    /// Under concurrent use this is a snapshot and may lag by in-flight calls.
    pub fn live_allocations(&self) -> usize {
        // the two loads are not atomic together; saturate rather than underflow
        let released = self.release_count.load(Ordering::Relaxed);
        let allocated = self.allocation_count.load(Ordering::Relaxed);
        allocated.saturating_sub(released)
    }

    /// Snapshot of the counters
    pub fn stats(&self) -> HeapStats {
        HeapStats {
            allocated_bytes: self.allocated_bytes.load(Ordering::Relaxed),
            peak_allocated_bytes: self.peak_allocated_bytes.load(Ordering::Relaxed),
            allocation_count: self.allocation_count.load(Ordering::Relaxed),
            release_count: self.release_count.load(Ordering::Relaxed),
            failed_allocations: self.failed_allocations.load(Ordering::Relaxed),
        }
    }

    /// Platform layout and header for a user request.
    fn block_layout(layout: Layout) -> AllocResult<(Layout, Header)> {
        let size = layout.size().try_add(WORD - 1)? & !(WORD - 1);
        let align = layout.align().max(align_of::<Header>());
        let offset = utils::align_up(HEADER_SIZE, align);
        let total = offset.try_add(size)?;

        let platform = Layout::from_size_align(total, align)
            .map_err(|_| MemoryError::invalid_layout("heap block exceeds isize::MAX"))?;
        Ok((
            platform,
            Header {
                size,
                offset,
                align,
            },
        ))
    }

    /// # Safety
    /// `ptr` must be a live user pointer produced by this allocator.
    unsafe fn header(ptr: NonNull<u8>) -> Header {
        // SAFETY: every user pointer is preceded by a written, aligned header.
        unsafe { ptr.as_ptr().sub(HEADER_SIZE).cast::<Header>().read() }
    }
}

impl Default for HeapAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for HeapAllocator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HeapAllocator")
            .field("thread_safe", &self.is_thread_safe())
            .field("stats", &self.stats())
            .finish()
    }
}

unsafe impl Allocator for HeapAllocator {
    unsafe fn allocate(&self, layout: Layout) -> AllocResult<NonNull<[u8]>> {
        let (platform, header) = Self::block_layout(layout)?;
        let _guard = self.lock.as_ref().map(|lock| lock.lock());

        // SAFETY: `platform` has a non-zero size (it always includes the header).
        let raw = unsafe { System.alloc(platform) };
        let Some(raw) = NonNull::new(raw) else {
            self.failed_allocations.fetch_add(1, Ordering::Relaxed);
            return Err(MemoryError::allocation_failed_with_layout(layout));
        };

        // SAFETY: `offset + size` bytes are owned by us. The user pointer is
        // aligned to at least `align_of::<Header>()` and `HEADER_SIZE` is a
        // multiple of that alignment, so the header slot is aligned too.
        let user = unsafe {
            let user = raw.add(header.offset);
            user.as_ptr().sub(HEADER_SIZE).cast::<Header>().write(header);
            if let Some(pattern) = self.config.alloc_pattern {
                utils::fill_bytes(user.as_ptr(), pattern, header.size);
            }
            user
        };

        let total = self.allocated_bytes.fetch_add(header.size, Ordering::Relaxed) + header.size;
        utils::atomic_max(&self.peak_allocated_bytes, total);
        self.allocation_count.fetch_add(1, Ordering::Relaxed);

        Ok(NonNull::slice_from_raw_parts(user, header.size))
    }

    unsafe fn release(&self, ptr: NonNull<u8>) {
        // SAFETY: caller guarantees `ptr` is a live allocation from `self`.
        let header = unsafe { Self::header(ptr) };
        let _guard = self.lock.as_ref().map(|lock| lock.lock());

        self.allocated_bytes.fetch_sub(header.size, Ordering::Relaxed);
        self.release_count.fetch_add(1, Ordering::Relaxed);

        // SAFETY: the header describes the exact platform block and layout.
        unsafe {
            if let Some(pattern) = self.config.dealloc_pattern {
                utils::fill_bytes(ptr.as_ptr(), pattern, header.size);
            }
            let base = ptr.as_ptr().sub(header.offset);
            let platform =
                Layout::from_size_align_unchecked(header.offset + header.size, header.align);
            System.dealloc(base, platform);
        }
    }

    unsafe fn allocated_size(&self, ptr: NonNull<u8>) -> Option<usize> {
        // SAFETY: forwarded caller contract.
        Some(unsafe { Self::header(ptr) }.size)
    }

    fn total_allocated(&self) -> Option<usize> {
        Some(self.allocated_bytes.load(Ordering::Relaxed))
    }
}
