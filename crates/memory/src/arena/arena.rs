//! Linear (bump) allocator over one fixed buffer
//!
//! # Safety
//!
//! - The buffer is either a caller-lent `&'a mut [u8]` or a block obtained
//!   from a backing allocator and released on drop
//! - `total_allocated` is the offset of the next free byte and never exceeds
//!   `total_size`
//! - Every region handed out lies in `[start, start + total_allocated)` and
//!   regions never overlap until the offset is rolled back
//! - Rollback ([`TempArena`]) and [`Arena::clear`] need `&mut`, so no safe
//!   reference into a rolled-back suffix can still be alive

use core::alloc::Layout;
use core::cell::Cell;
use core::fmt;
use core::marker::PhantomData;
use core::ptr::{self, NonNull};

#[cfg(feature = "logging")]
use tracing::{debug, warn};

use super::{ArenaConfig, TempArena};
use crate::allocator::Allocator;
use crate::error::{AllocResult, MemoryError, MemoryResult};
use crate::utils::{self, CheckedArithmetic};

/// Linear allocator that frees only in bulk or by scope rollback
///
/// Each allocation reserves `size + align` bytes, the worst-case slack for
/// aligning the current offset, so the bump offset advances by the same
/// amount regardless of where the buffer happens to sit.
///
/// # Examples
///
/// ```
/// use basalt_memory::arena::Arena;
///
/// let mut buffer = [0u8; 256];
/// let mut arena = Arena::from_buffer(&mut buffer);
///
/// let value = arena.alloc(42u64).unwrap();
/// assert_eq!(*value, 42);
/// assert_eq!(arena.total_allocated(), 16);
///
/// {
///     let scope = arena.begin_temp();
///     scope.alloc_str("scratch").unwrap();
///     assert_eq!(scope.total_allocated(), 16 + 8);
/// }
/// assert_eq!(arena.total_allocated(), 16);
/// ```
pub struct Arena<'a> {
    /// Set when the arena obtained its buffer itself
    backing: Option<&'a dyn Allocator>,
    start: NonNull<u8>,
    total_size: usize,
    pub(super) total_allocated: Cell<usize>,
    pub(super) temp_count: Cell<usize>,
    config: ArenaConfig,
    _buffer: PhantomData<&'a mut [u8]>,
}

impl<'a> Arena<'a> {
    /// Creates an arena over a caller-provided buffer
    pub fn from_buffer(buffer: &'a mut [u8]) -> Self {
        let total_size = buffer.len();
        Self::build(None, NonNull::from(buffer).cast(), total_size, ArenaConfig::default())
    }

    /// Creates an arena over a caller-provided buffer with custom configuration
    ///
    /// # Errors
    /// `InvalidConfig` if the configuration does not validate.
    pub fn with_buffer_config(buffer: &'a mut [u8], config: ArenaConfig) -> MemoryResult<Self> {
        config.validate()?;
        let total_size = buffer.len();
        Ok(Self::build(None, NonNull::from(buffer).cast(), total_size, config))
    }

    /// Creates an arena whose buffer of `capacity` bytes comes from `backing`
    pub fn with_capacity_in(backing: &'a dyn Allocator, capacity: usize) -> MemoryResult<Self> {
        Self::with_config_in(backing, capacity, ArenaConfig::default())
    }

    /// Creates an arena from a backing allocator with custom configuration
    pub fn with_config_in(
        backing: &'a dyn Allocator,
        capacity: usize,
        config: ArenaConfig,
    ) -> MemoryResult<Self> {
        config.validate()?;
        let layout = Layout::from_size_align(capacity, align_of::<usize>())
            .map_err(|_| MemoryError::invalid_layout("arena capacity exceeds isize::MAX"))?;
        // SAFETY: released through the same allocator in Drop.
        let buffer = unsafe { backing.allocate(layout)? };
        Ok(Self::build(Some(backing), buffer.cast(), capacity, config))
    }

    fn build(
        backing: Option<&'a dyn Allocator>,
        start: NonNull<u8>,
        total_size: usize,
        config: ArenaConfig,
    ) -> Self {
        #[cfg(feature = "logging")]
        debug!(
            capacity = total_size,
            owned = backing.is_some(),
            "arena created"
        );

        Self {
            backing,
            start,
            total_size,
            total_allocated: Cell::new(0),
            temp_count: Cell::new(0),
            config,
            _buffer: PhantomData,
        }
    }

    /// Size of the underlying buffer
    pub fn capacity(&self) -> usize {
        self.total_size
    }

    /// Offset of the next free byte
    pub fn total_allocated(&self) -> usize {
        self.total_allocated.get()
    }

    /// Bytes left before the arena is exhausted
    pub fn remaining(&self) -> usize {
        self.total_size - self.total_allocated.get()
    }

    /// Number of temporary scopes currently open
    pub fn temp_count(&self) -> usize {
        self.temp_count.get()
    }

    /// Returns the active configuration
    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// Checks if a pointer lies inside the arena buffer
    pub fn contains(&self, ptr: *const u8) -> bool {
        let start = self.start.as_ptr() as usize;
        (start..start + self.total_size).contains(&(ptr as usize))
    }

    /// Opens a temporary scope
    ///
    /// Everything allocated through the returned guard is rolled back when
    /// it is closed with [`TempArena::end`] or dropped.
    pub fn begin_temp(&mut self) -> TempArena<'_, 'a> {
        TempArena::new(self)
    }

    /// Frees everything at once
    ///
    /// # Errors
    /// `InvalidState` if a temporary scope is still open (only possible when
    /// a guard was leaked).
    pub fn clear(&mut self) -> MemoryResult<()> {
        if self.temp_count.get() != 0 {
            return Err(MemoryError::invalid_arena_operation(
                "clear while temporary scopes are open",
            ));
        }

        #[cfg(feature = "logging")]
        debug!(released = self.total_allocated.get(), "arena cleared");

        self.rewind(0);
        Ok(())
    }

    /// Moves the bump offset back to `offset`, filling the given-back bytes.
    pub(super) fn rewind(&self, offset: usize) {
        let current = self.total_allocated.get();
        debug_assert!(offset <= current);
        if let Some(pattern) = self.config.reset_pattern {
            // SAFETY: `[offset, current)` lies inside the buffer and no safe
            // reference into it survives a rewind.
            unsafe {
                utils::fill_bytes(self.start.as_ptr().add(offset), pattern, current - offset);
            }
        }
        self.total_allocated.set(offset);
    }

    /// Allocates and initializes a value
    #[must_use = "allocated memory must be used"]
    #[allow(clippy::mut_from_ref)]
    pub fn alloc<T: Copy>(&self, value: T) -> MemoryResult<&mut T> {
        // SAFETY: the region is fresh, aligned for `T` and sized for it.
        unsafe {
            let ptr = self.allocate(Layout::new::<T>())?.cast::<T>();
            ptr.as_ptr().write(value);
            Ok(&mut *ptr.as_ptr())
        }
    }

    /// Allocates and copies a slice
    #[must_use = "allocated memory must be used"]
    #[allow(clippy::mut_from_ref)]
    pub fn alloc_slice_copy<T: Copy>(&self, slice: &[T]) -> MemoryResult<&mut [T]> {
        let layout = Layout::for_value(slice);
        // SAFETY: the region is fresh and holds `slice.len()` values of `T`.
        unsafe {
            let ptr = self.allocate(layout)?.cast::<T>();
            ptr::copy_nonoverlapping(slice.as_ptr(), ptr.as_ptr(), slice.len());
            Ok(&mut *ptr::slice_from_raw_parts_mut(ptr.as_ptr(), slice.len()))
        }
    }

    /// Allocates a string
    #[must_use = "allocated memory must be used"]
    pub fn alloc_str(&self, s: &str) -> MemoryResult<&str> {
        let bytes = self.alloc_slice_copy(s.as_bytes())?;
        // SAFETY: bytes were copied verbatim from a `&str`.
        unsafe { Ok(core::str::from_utf8_unchecked(bytes)) }
    }
}

unsafe impl Allocator for Arena<'_> {
    unsafe fn allocate(&self, layout: Layout) -> AllocResult<NonNull<[u8]>> {
        let offset = self.total_allocated.get();
        let actual = layout.size().try_add(layout.align())?;

        if actual > self.total_size - offset {
            return Err(MemoryError::arena_exhausted(actual, self.total_size - offset));
        }

        // SAFETY: `offset + actual <= total_size`, and aligning forward moves
        // by less than `align`, so `[ptr, ptr + size)` stays in the buffer.
        let ptr = unsafe {
            let ptr = utils::align_forward(self.start.as_ptr().add(offset), layout.align());
            NonNull::new_unchecked(ptr)
        };
        self.total_allocated.set(offset + actual);

        if let Some(pattern) = self.config.alloc_pattern {
            // SAFETY: the region was just carved out.
            unsafe { utils::fill_bytes(ptr.as_ptr(), pattern, layout.size()) };
        }

        Ok(NonNull::slice_from_raw_parts(ptr, layout.size()))
    }

    /// Arenas free only in bulk; releasing a single block does nothing.
    unsafe fn release(&self, _ptr: NonNull<u8>) {}

    fn total_allocated(&self) -> Option<usize> {
        Some(self.total_allocated.get())
    }
}

impl Drop for Arena<'_> {
    fn drop(&mut self) {
        if self.temp_count.get() != 0 {
            #[cfg(feature = "logging")]
            warn!(
                open_scopes = self.temp_count.get(),
                "arena dropped with temporary scopes still open"
            );
        }

        if let Some(backing) = self.backing {
            // SAFETY: the buffer was obtained from `backing` in `with_config_in`.
            unsafe { backing.release(self.start) };
        }
    }
}

impl fmt::Debug for Arena<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("capacity", &self.total_size)
            .field("total_allocated", &self.total_allocated.get())
            .field("temp_count", &self.temp_count.get())
            .field("owned", &self.backing.is_some())
            .finish()
    }
}
