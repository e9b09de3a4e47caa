//! Growable array over a pluggable allocator
//!
//! [`DynArray`] is the storage primitive the hash tables are built from. It
//! holds `Copy` values only, so it never runs element destructors, and grows
//! by `2 * capacity + 8` whenever it runs out of room.

use core::alloc::Layout;
use core::fmt;
use core::ops::{Deref, DerefMut};
use core::ptr::{self, NonNull};

use basalt_memory::allocator::Allocator;
use basalt_memory::error::{MemoryError, MemoryResult};

/// Capacity after one growth step from `capacity`.
#[inline]
pub(crate) const fn grow_capacity(capacity: usize) -> usize {
    capacity.saturating_mul(2).saturating_add(8)
}

/// A contiguous growable array of `Copy` values
///
/// # Examples
///
/// ```
/// use basalt_collections::DynArray;
/// use basalt_memory::allocator::HeapAllocator;
///
/// let heap = HeapAllocator::new();
/// let mut array = DynArray::new_in(&heap);
/// for i in 0..10u32 {
///     array.push(i)?;
/// }
/// assert_eq!(array.len(), 10);
/// assert_eq!(array.capacity(), 24);
/// assert_eq!(array.iter().sum::<u32>(), 45);
/// # Ok::<(), basalt_memory::MemoryError>(())
/// ```
pub struct DynArray<T: Copy, A: Allocator> {
    ptr: NonNull<T>,
    len: usize,
    capacity: usize,
    alloc: A,
}

impl<T: Copy, A: Allocator> DynArray<T, A> {
    const IS_ZST: bool = size_of::<T>() == 0;

    /// Creates an empty array; nothing is allocated until the first push
    pub fn new_in(alloc: A) -> Self {
        Self {
            ptr: NonNull::dangling(),
            len: 0,
            capacity: if Self::IS_ZST { usize::MAX } else { 0 },
            alloc,
        }
    }

    /// Creates an empty array with room for `capacity` values
    pub fn with_capacity_in(alloc: A, capacity: usize) -> MemoryResult<Self> {
        let mut array = Self::new_in(alloc);
        array.reserve(capacity)?;
        Ok(array)
    }

    /// Number of stored values
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when no values are stored
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of values that fit without reallocating
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The allocator backing this array
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Appends a value, growing the buffer if it is full
    ///
    /// On error the array is unchanged.
    pub fn push(&mut self, value: T) -> MemoryResult<()> {
        if self.len == self.capacity {
            self.set_capacity(grow_capacity(self.capacity))?;
        }
        // SAFETY: `len < capacity` and the slot is inside the buffer.
        unsafe { self.ptr.as_ptr().add(self.len).write(value) };
        self.len += 1;
        Ok(())
    }

    /// Removes and returns the last value
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        // SAFETY: the slot at the old `len - 1` was initialized.
        Some(unsafe { self.ptr.as_ptr().add(self.len).read() })
    }

    /// Removes the value at `index`, moving the last value into its slot
    pub fn swap_remove(&mut self, index: usize) -> Option<T> {
        if index >= self.len {
            return None;
        }
        let last = self.len - 1;
        self.as_mut_slice().swap(index, last);
        self.pop()
    }

    /// Makes sure `additional` more values fit without reallocating
    pub fn reserve(&mut self, additional: usize) -> MemoryResult<()> {
        let needed = self
            .len
            .checked_add(additional)
            .ok_or_else(|| MemoryError::size_overflow("array reserve"))?;
        if needed > self.capacity {
            self.set_capacity(needed.max(grow_capacity(self.capacity)))?;
        }
        Ok(())
    }

    /// Resizes to `new_len`, filling new slots with `value`
    pub fn resize(&mut self, new_len: usize, value: T) -> MemoryResult<()> {
        if new_len > self.len {
            self.reserve(new_len - self.len)?;
            for i in self.len..new_len {
                // SAFETY: `i < new_len <= capacity`.
                unsafe { self.ptr.as_ptr().add(i).write(value) };
            }
        }
        self.len = new_len;
        Ok(())
    }

    /// Reallocates the buffer to hold exactly `capacity` values
    ///
    /// # Errors
    /// `InvalidState` if `capacity` is below the current length, otherwise
    /// any error of the allocator. On error the array is unchanged.
    pub fn set_capacity(&mut self, capacity: usize) -> MemoryResult<()> {
        if Self::IS_ZST || capacity == self.capacity {
            return Ok(());
        }
        if capacity < self.len {
            return Err(MemoryError::invalid_state(
                "array capacity below its length",
            ));
        }

        if capacity == 0 {
            self.release_buffer();
            self.ptr = NonNull::dangling();
            self.capacity = 0;
            return Ok(());
        }

        let layout = Layout::array::<T>(capacity)
            .map_err(|_| MemoryError::size_overflow("array capacity"))?;
        let block = if self.capacity == 0 {
            // SAFETY: a fresh block; ownership moves into `self.ptr` below.
            unsafe { self.alloc.allocate(layout)? }
        } else {
            let used = self.len * size_of::<T>();
            // SAFETY: `self.ptr` is our live block and `used` bytes of it are initialized.
            unsafe { self.alloc.resize(self.ptr.cast(), used, layout)? }
        };

        self.ptr = block.cast();
        self.capacity = capacity;
        Ok(())
    }

    /// Drops every value, keeping the buffer
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Views the values as a slice
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: the first `len` slots are initialized; `ptr` is non-null and aligned.
        unsafe { &*ptr::slice_from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// Views the values as a mutable slice
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: as in `as_slice`, and `&mut self` makes the view unique.
        unsafe { &mut *ptr::slice_from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    fn release_buffer(&mut self) {
        if !Self::IS_ZST && self.capacity > 0 {
            // SAFETY: the buffer was allocated from `self.alloc`.
            unsafe { self.alloc.release(self.ptr.cast()) };
        }
    }
}

impl<T: Copy, A: Allocator> Deref for DynArray<T, A> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: Copy, A: Allocator> DerefMut for DynArray<T, A> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: Copy, A: Allocator> Drop for DynArray<T, A> {
    fn drop(&mut self) {
        self.release_buffer();
    }
}

impl<T: Copy + fmt::Debug, A: Allocator> fmt::Debug for DynArray<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

// SAFETY: the array exclusively owns its buffer.
unsafe impl<T: Copy + Send, A: Allocator + Send> Send for DynArray<T, A> {}
// SAFETY: shared access only hands out `&T` and `&A`.
unsafe impl<T: Copy + Sync, A: Allocator + Sync> Sync for DynArray<T, A> {}
