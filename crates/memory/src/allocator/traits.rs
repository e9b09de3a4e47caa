//! The allocator capability contract
//!
//! Every strategy in this crate (heap, arena, pool) implements [`Allocator`].
//! Containers take an allocator handle explicitly; there is no process-wide
//! default instance.
//!
//! # Safety
//!
//! [`Allocator`] is an `unsafe trait`. Implementors promise that:
//! - a successful `allocate` returns memory that is valid for reads and writes
//!   of at least `layout.size()` bytes and whose address is a multiple of
//!   `layout.align()`;
//! - the returned region is not handed out again until it has been released
//!   (or, for bulk strategies, until the owner resets the strategy);
//! - a failed `allocate` never returns partially valid memory.
//!
//! Callers promise that every pointer passed to `release` / `resize` came from
//! the *same* allocator instance and is released at most once. Neither
//! condition is checked at runtime.

use core::alloc::Layout;
use core::ptr::NonNull;

use crate::error::AllocResult;
use crate::utils;

/// A pluggable allocation strategy.
///
/// The trait is object safe: `&dyn Allocator` is the polymorphic handle used
/// by allocator-aware containers.
///
/// The two query methods return `None` when a strategy does not track the
/// requested figure (arena and pool keep no per-pointer bookkeeping).
pub unsafe trait Allocator {
    /// Allocates memory with the given layout
    ///
    /// # Safety
    /// Memory content is uninitialized and must be initialized before use.
    /// The returned slice may be longer than requested.
    ///
    /// # Errors
    /// Returns an out-of-memory error (see
    /// [`MemoryError::is_out_of_memory`](crate::MemoryError::is_out_of_memory))
    /// when the request cannot be satisfied, or a layout error when the
    /// strategy cannot serve this shape of request at all.
    unsafe fn allocate(&self, layout: Layout) -> AllocResult<NonNull<[u8]>>;

    /// Returns `ptr` to the allocator
    ///
    /// # Safety
    /// - `ptr` must have been returned by `allocate` on this same instance
    /// - `ptr` must not be released twice, and must not be used afterwards
    unsafe fn release(&self, ptr: NonNull<u8>);

    /// Usable size of a live allocation, when the strategy records it
    ///
    /// # Safety
    /// `ptr` must be a live allocation from this instance.
    unsafe fn allocated_size(&self, ptr: NonNull<u8>) -> Option<usize> {
        let _ = ptr;
        None
    }

    /// Aggregate bytes currently handed out, when the strategy records it
    fn total_allocated(&self) -> Option<usize> {
        None
    }

    /// Allocates memory and zeroes it
    ///
    /// # Safety
    /// Same contract as [`allocate`](Self::allocate).
    unsafe fn allocate_zeroed(&self, layout: Layout) -> AllocResult<NonNull<[u8]>> {
        // SAFETY: forwarded caller contract.
        let block = unsafe { self.allocate(layout)? };
        // SAFETY: `block` is valid for writes of `layout.size()` bytes.
        unsafe { utils::zero_bytes(block.cast::<u8>().as_ptr(), layout.size()) };
        Ok(block)
    }

    /// Moves an allocation into a block described by `new_layout`
    ///
    /// The default copies `min(old_size, new_layout.size())` bytes into a fresh
    /// block and then releases the old one. On error the old block is left
    /// untouched and still owned by the caller.
    ///
    /// # Safety
    /// - `ptr` must be a live allocation from this instance
    /// - `old_size` must not exceed the size originally requested for `ptr`
    unsafe fn resize(
        &self,
        ptr: NonNull<u8>,
        old_size: usize,
        new_layout: Layout,
    ) -> AllocResult<NonNull<[u8]>> {
        // SAFETY: forwarded caller contract.
        let new_block = unsafe { self.allocate(new_layout)? };

        let copy_size = old_size.min(new_layout.size());
        if copy_size > 0 {
            // SAFETY: both regions are live and distinct; `copy_size` fits both.
            unsafe {
                utils::copy_bytes(new_block.cast::<u8>().as_ptr(), ptr.as_ptr(), copy_size);
            }
        }

        // SAFETY: `ptr` came from this allocator and is no longer referenced.
        unsafe { self.release(ptr) };
        Ok(new_block)
    }
}

// Blanket implementation for references

unsafe impl<A: Allocator + ?Sized> Allocator for &A {
    #[inline]
    unsafe fn allocate(&self, layout: Layout) -> AllocResult<NonNull<[u8]>> {
        unsafe { (**self).allocate(layout) }
    }

    #[inline]
    unsafe fn release(&self, ptr: NonNull<u8>) {
        unsafe { (**self).release(ptr) }
    }

    #[inline]
    unsafe fn allocated_size(&self, ptr: NonNull<u8>) -> Option<usize> {
        unsafe { (**self).allocated_size(ptr) }
    }

    #[inline]
    fn total_allocated(&self) -> Option<usize> {
        (**self).total_allocated()
    }

    #[inline]
    unsafe fn allocate_zeroed(&self, layout: Layout) -> AllocResult<NonNull<[u8]>> {
        unsafe { (**self).allocate_zeroed(layout) }
    }

    #[inline]
    unsafe fn resize(
        &self,
        ptr: NonNull<u8>,
        old_size: usize,
        new_layout: Layout,
    ) -> AllocResult<NonNull<[u8]>> {
        unsafe { (**self).resize(ptr, old_size, new_layout) }
    }
}
