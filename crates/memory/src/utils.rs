//! Memory primitives shared by the allocators
//!
//! - Alignment helpers on addresses and raw pointers
//! - Raw byte zero / fill / copy wrappers
//! - Checked size arithmetic that reports [`MemoryError::SizeOverflow`]

use core::ptr;
use core::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{MemoryError, MemoryResult};

/// Aligns a value up to the nearest multiple of alignment
///
/// # Examples
/// ```
/// use basalt_memory::utils::align_up;
///
/// assert_eq!(align_up(7, 8), 8);
/// assert_eq!(align_up(8, 8), 8);
/// assert_eq!(align_up(9, 8), 16);
/// ```
#[inline(always)]
pub const fn align_up(value: usize, alignment: usize) -> usize {
    debug_assert!(alignment.is_power_of_two());
    (value + alignment - 1) & !(alignment - 1)
}

/// Aligns a value down to the nearest multiple of alignment
///
/// # Examples
/// ```
/// use basalt_memory::utils::align_down;
///
/// assert_eq!(align_down(7, 8), 0);
/// assert_eq!(align_down(9, 8), 8);
/// ```
#[inline(always)]
pub const fn align_down(value: usize, alignment: usize) -> usize {
    debug_assert!(alignment.is_power_of_two());
    value & !(alignment - 1)
}

/// Checks if a value is aligned to the given alignment
#[inline(always)]
pub const fn is_aligned(value: usize, alignment: usize) -> bool {
    debug_assert!(alignment.is_power_of_two());
    value & (alignment - 1) == 0
}

/// Calculates padding needed to align a value
///
/// # Examples
/// ```
/// use basalt_memory::utils::padding_needed;
///
/// assert_eq!(padding_needed(7, 8), 1);
/// assert_eq!(padding_needed(8, 8), 0);
/// ```
#[inline(always)]
pub const fn padding_needed(value: usize, alignment: usize) -> usize {
    align_up(value, alignment) - value
}

/// Check if a pointer is properly aligned
#[inline(always)]
pub fn is_aligned_ptr<T>(ptr: *const T, alignment: usize) -> bool {
    is_aligned(ptr as usize, alignment)
}

/// Moves `ptr` forward to the next address that is a multiple of `alignment`.
///
/// The result keeps the provenance of `ptr`; it is only dereferenceable if the
/// caller knows the padded address still lies inside the same allocation.
#[inline(always)]
pub fn align_forward(ptr: *mut u8, alignment: usize) -> *mut u8 {
    ptr.wrapping_add(padding_needed(ptr as usize, alignment))
}

/// Zeroes `len` bytes starting at `dst`.
///
/// # Safety
/// `dst` must be valid for writes of `len` bytes.
#[inline]
pub unsafe fn zero_bytes(dst: *mut u8, len: usize) {
    // SAFETY: forwarded caller contract.
    unsafe { ptr::write_bytes(dst, 0, len) }
}

/// Fills `len` bytes starting at `dst` with `byte`.
///
/// # Safety
/// `dst` must be valid for writes of `len` bytes.
#[inline]
pub unsafe fn fill_bytes(dst: *mut u8, byte: u8, len: usize) {
    // SAFETY: forwarded caller contract.
    unsafe { ptr::write_bytes(dst, byte, len) }
}

/// Copies `len` bytes from `src` to `dst`. The ranges must not overlap.
///
/// # Safety
/// `src` must be valid for reads and `dst` for writes of `len` bytes, and the
/// two ranges must be disjoint.
#[inline]
pub unsafe fn copy_bytes(dst: *mut u8, src: *const u8, len: usize) {
    // SAFETY: forwarded caller contract.
    unsafe { ptr::copy_nonoverlapping(src, dst, len) }
}

/// Copies `len` bytes from `src` to `dst`. The ranges may overlap.
///
/// # Safety
/// `src` must be valid for reads and `dst` for writes of `len` bytes.
#[inline]
pub unsafe fn move_bytes(dst: *mut u8, src: *const u8, len: usize) {
    // SAFETY: forwarded caller contract.
    unsafe { ptr::copy(src, dst, len) }
}

/// Checked arithmetic for size calculations
///
/// # Examples
///
/// ```
/// use basalt_memory::utils::CheckedArithmetic;
///
/// assert_eq!(10usize.try_add(20).unwrap(), 30);
/// assert!(usize::MAX.try_add(1).is_err());
/// ```
pub trait CheckedArithmetic: Sized {
    /// Checked addition. Returns `SizeOverflow` on overflow.
    fn try_add(self, rhs: Self) -> MemoryResult<Self>;

    /// Checked multiplication. Returns `SizeOverflow` on overflow.
    fn try_mul(self, rhs: Self) -> MemoryResult<Self>;
}

impl CheckedArithmetic for usize {
    #[inline]
    fn try_add(self, rhs: Self) -> MemoryResult<Self> {
        self.checked_add(rhs)
            .ok_or_else(|| MemoryError::size_overflow("add"))
    }

    #[inline]
    fn try_mul(self, rhs: Self) -> MemoryResult<Self> {
        self.checked_mul(rhs)
            .ok_or_else(|| MemoryError::size_overflow("mul"))
    }
}

/// Atomically update maximum value
#[inline]
pub fn atomic_max(current: &AtomicUsize, value: usize) {
    let mut max = current.load(Ordering::Relaxed);
    loop {
        if value <= max {
            break;
        }
        match current.compare_exchange_weak(max, value, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => break,
            Err(x) => max = x,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alignment_functions() {
        assert_eq!(align_up(0, 8), 0);
        assert_eq!(align_up(1, 8), 8);
        assert_eq!(align_up(7, 8), 8);
        assert_eq!(align_up(8, 8), 8);
        assert_eq!(align_up(9, 8), 16);

        assert_eq!(align_down(0, 8), 0);
        assert_eq!(align_down(7, 8), 0);
        assert_eq!(align_down(15, 8), 8);

        assert!(is_aligned(0, 8));
        assert!(is_aligned(16, 8));
        assert!(!is_aligned(9, 8));

        assert_eq!(padding_needed(0, 8), 0);
        assert_eq!(padding_needed(1, 8), 7);
        assert_eq!(padding_needed(8, 8), 0);
    }

    #[test]
    fn test_align_forward() {
        let mut buffer = [0u8; 64];
        let base = buffer.as_mut_ptr();
        for offset in 0..16 {
            let ptr = base.wrapping_add(offset);
            let aligned = align_forward(ptr, 16);
            assert!(is_aligned_ptr(aligned, 16));
            assert!(aligned as usize >= ptr as usize);
            assert!((aligned as usize) - (ptr as usize) < 16);
        }
        let aligned = align_forward(base, 1);
        assert_eq!(aligned, base);
    }

    #[test]
    fn test_byte_helpers() {
        let mut src = [1u8, 2, 3, 4, 5, 6, 7, 8];
        let mut dst = [0u8; 8];

        unsafe {
            copy_bytes(dst.as_mut_ptr(), src.as_ptr(), 8);
        }
        assert_eq!(dst, src);

        unsafe {
            fill_bytes(dst.as_mut_ptr(), 0xAB, 4);
        }
        assert_eq!(dst, [0xAB, 0xAB, 0xAB, 0xAB, 5, 6, 7, 8]);

        unsafe {
            zero_bytes(dst.as_mut_ptr().add(4), 4);
        }
        assert_eq!(dst, [0xAB, 0xAB, 0xAB, 0xAB, 0, 0, 0, 0]);

        // overlapping shift right by two
        let base = src.as_mut_ptr();
        unsafe {
            move_bytes(base.add(2), base, 6);
        }
        assert_eq!(src, [1, 2, 1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_checked_arithmetic() {
        assert_eq!(3usize.try_mul(4).unwrap(), 12);
        assert!(matches!(
            usize::MAX.try_mul(2),
            Err(MemoryError::SizeOverflow { .. })
        ));
    }

    #[test]
    fn test_atomic_max() {
        let value = AtomicUsize::new(5);
        atomic_max(&value, 3);
        assert_eq!(value.load(Ordering::Relaxed), 5);
        atomic_max(&value, 9);
        assert_eq!(value.load(Ordering::Relaxed), 9);
    }
}
