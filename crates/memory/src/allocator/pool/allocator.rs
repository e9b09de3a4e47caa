//! Main pool allocator implementation
//!
//! # Safety
//!
//! - Fixed-size blocks organized in a singly linked free list
//! - Free blocks store the next pointer in their first bytes (intrusive list)
//! - Links are written and read unaligned, so blocks may use any alignment
//! - The head pointer lives in a `Cell`; the pool is `!Sync`
//!
//! ## Invariants
//!
//! - Every block lies inside the backing buffer at `first + i * stride`
//! - Every block start is a multiple of `block_align`
//! - The free list contains only blocks that are not handed out, each once
//! - `used` equals `block_count` minus the free list length

use core::alloc::Layout;
use core::cell::Cell;
use core::fmt;
use core::ptr::{self, NonNull};

#[cfg(feature = "logging")]
use tracing::debug;

use super::PoolConfig;
use crate::allocator::Allocator;
use crate::error::{AllocResult, MemoryError, MemoryResult};
use crate::utils::{self, CheckedArithmetic};

/// Link stored in the first word of every free block.
type Link = Option<NonNull<u8>>;

/// Pool allocator for fixed-size blocks
///
/// The backing buffer is obtained from `A` at construction and returned to it
/// on drop. All allocations must use exactly the block size and alignment the
/// pool was created with.
///
/// # Memory Layout
/// ```text
/// [Block0][Block1][Block2][Block3]...[BlockN]
///    ↓       ↓       ↓       ↓           ↓
/// [free] → [free] → [used] → [free] → [used] → null
/// ```
///
/// # Examples
///
/// ```
/// use core::alloc::Layout;
/// use basalt_memory::allocator::{Allocator, HeapAllocator, Pool};
///
/// let heap = HeapAllocator::new();
/// let pool = Pool::new_in(&heap, 4, 16, 8).unwrap();
/// let layout = Layout::from_size_align(16, 8).unwrap();
///
/// unsafe {
///     let block = pool.allocate(layout).unwrap();
///     assert_eq!(pool.total_allocated(), Some(16));
///     pool.release(block.cast());
/// }
/// assert_eq!(pool.free_blocks(), 4);
/// ```
pub struct Pool<A: Allocator> {
    backing: A,
    /// Buffer as returned by the backing allocator
    buffer: NonNull<u8>,
    buffer_size: usize,
    /// First block, `buffer` aligned forward to `block_align`
    first: NonNull<u8>,
    block_size: usize,
    block_align: usize,
    /// Distance between consecutive block starts
    stride: usize,
    block_count: usize,
    free_list: Cell<Link>,
    used: Cell<usize>,
    peak_used: Cell<usize>,
    config: PoolConfig,
}

impl<A: Allocator> Pool<A> {
    /// Creates a pool of `num_blocks` blocks with the default configuration
    ///
    /// # Errors
    /// - `InvalidLayout` if `num_blocks` is zero or `block_size` cannot hold
    ///   a free list link
    /// - `InvalidAlignment` if `block_align` is not a power of two
    /// - any error of the backing allocator
    pub fn new_in(
        backing: A,
        num_blocks: usize,
        block_size: usize,
        block_align: usize,
    ) -> MemoryResult<Self> {
        Self::with_config_in(backing, num_blocks, block_size, block_align, PoolConfig::default())
    }

    /// Creates a pool sized for values of type `T`
    pub fn for_type_in<T>(backing: A, num_blocks: usize) -> MemoryResult<Self> {
        let layout = Layout::new::<T>();
        let size = layout.size().max(size_of::<Link>());
        Self::new_in(backing, num_blocks, size, layout.align())
    }

    /// Creates a new pool allocator with custom configuration
    pub fn with_config_in(
        backing: A,
        num_blocks: usize,
        block_size: usize,
        block_align: usize,
        config: PoolConfig,
    ) -> MemoryResult<Self> {
        config.validate()?;

        // Validate parameters
        if block_size < size_of::<Link>() {
            return Err(MemoryError::invalid_layout(
                "block size too small to hold a free list link",
            ));
        }
        if !block_align.is_power_of_two() {
            return Err(MemoryError::invalid_alignment(block_align));
        }
        if num_blocks == 0 {
            return Err(MemoryError::invalid_pool_config("pool needs at least one block"));
        }

        let stride = utils::align_up(block_size, block_align);
        let buffer_size = num_blocks.try_mul(block_size.try_add(block_align)?)?;
        let layout = Layout::from_size_align(buffer_size, block_align)
            .map_err(|_| MemoryError::invalid_layout("pool buffer exceeds isize::MAX"))?;

        // SAFETY: released in Drop through the same allocator.
        let buffer = unsafe { backing.allocate(layout)? }.cast::<u8>();

        let first = utils::align_forward(buffer.as_ptr(), block_align);
        let padding = first as usize - buffer.as_ptr() as usize;
        let span = stride
            .try_mul(num_blocks)
            .and_then(|span| span.try_add(padding));
        if !matches!(span, Ok(span) if span <= buffer_size) {
            // SAFETY: `buffer` came from `backing` just above.
            unsafe { backing.release(buffer) };
            return Err(MemoryError::invalid_layout("blocks do not fit the pool buffer"));
        }

        let pool = Self {
            backing,
            buffer,
            buffer_size,
            // SAFETY: `first` is `buffer` moved forward inside the allocation.
            first: unsafe { NonNull::new_unchecked(first) },
            block_size,
            block_align,
            stride,
            block_count: num_blocks,
            free_list: Cell::new(None),
            used: Cell::new(0),
            peak_used: Cell::new(0),
            config,
        };
        pool.initialize_free_list();

        #[cfg(feature = "logging")]
        debug!(
            block_size,
            block_align,
            block_count = num_blocks,
            buffer_size,
            "pool created"
        );

        Ok(pool)
    }

    /// Returns the size of each block
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Returns the alignment of each block
    pub fn block_align(&self) -> usize {
        self.block_align
    }

    /// Returns the total number of blocks in the pool
    pub fn block_count(&self) -> usize {
        self.block_count
    }

    /// Returns the number of blocks currently handed out
    pub fn used_blocks(&self) -> usize {
        self.used.get()
    }

    /// Returns the number of free blocks
    pub fn free_blocks(&self) -> usize {
        self.block_count - self.used.get()
    }

    /// Most blocks ever handed out at once
    pub fn peak_used_blocks(&self) -> usize {
        self.peak_used.get()
    }

    /// Checks if the pool has no free blocks left
    pub fn is_exhausted(&self) -> bool {
        self.free_list.get().is_none()
    }

    /// Returns the active configuration
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Checks if a pointer lies inside this pool's block region
    pub fn contains(&self, ptr: *const u8) -> bool {
        let start = self.first.as_ptr() as usize;
        let end = start + self.stride * self.block_count;
        (start..end).contains(&(ptr as usize))
    }

    /// Returns every block to the free list
    ///
    /// Taking `&mut self` guarantees no block is still borrowed through a
    /// safe reference; raw pointers handed out earlier become dangling.
    pub fn reset(&mut self) {
        self.initialize_free_list();
        self.used.set(0);
    }

    fn block(&self, index: usize) -> NonNull<u8> {
        debug_assert!(index < self.block_count);
        // SAFETY: `index < block_count` and the constructor checked that all
        // blocks fit inside the buffer.
        unsafe { self.first.add(index * self.stride) }
    }

    fn is_block_start(&self, ptr: *const u8) -> bool {
        self.contains(ptr)
            && (ptr as usize - self.first.as_ptr() as usize) % self.stride == 0
    }

    /// Links block `i` to block `i + 1`; the last block ends the list.
    fn initialize_free_list(&self) {
        let mut next: Link = None;
        for i in (0..self.block_count).rev() {
            let block = self.block(i);
            debug_assert!(utils::is_aligned_ptr(block.as_ptr(), self.block_align));
            // SAFETY: the block is at least one link wide and owned by the pool.
            unsafe { write_link(block, next) };
            next = Some(block);
        }
        self.free_list.set(next);
    }
}

/// # Safety
/// `block` must be valid for writes of `size_of::<Link>()` bytes.
#[inline]
unsafe fn write_link(block: NonNull<u8>, next: Link) {
    // SAFETY: forwarded caller contract; unaligned write tolerates any block alignment.
    unsafe { ptr::write_unaligned(block.as_ptr().cast::<Link>(), next) }
}

/// # Safety
/// `block` must be a free block whose link was written by `write_link`.
#[inline]
unsafe fn read_link(block: NonNull<u8>) -> Link {
    // SAFETY: forwarded caller contract.
    unsafe { ptr::read_unaligned(block.as_ptr().cast::<Link>()) }
}

unsafe impl<A: Allocator> Allocator for Pool<A> {
    unsafe fn allocate(&self, layout: Layout) -> AllocResult<NonNull<[u8]>> {
        if layout.size() != self.block_size || layout.align() != self.block_align {
            return Err(MemoryError::invalid_layout(&format!(
                "pool serves {}-byte blocks aligned to {}, requested {} bytes aligned to {}",
                self.block_size,
                self.block_align,
                layout.size(),
                layout.align()
            )));
        }

        let Some(block) = self.free_list.get() else {
            return Err(MemoryError::pool_exhausted(self.block_count));
        };

        // SAFETY: `block` is the free list head, so its first word holds a link.
        let next = unsafe { read_link(block) };
        self.free_list.set(next);

        let used = self.used.get() + 1;
        self.used.set(used);
        self.peak_used.set(self.peak_used.get().max(used));

        if let Some(pattern) = self.config.alloc_pattern {
            // SAFETY: the block is `block_size` bytes and now exclusively ours.
            unsafe { utils::fill_bytes(block.as_ptr(), pattern, self.block_size) };
        }

        Ok(NonNull::slice_from_raw_parts(block, self.block_size))
    }

    unsafe fn release(&self, ptr: NonNull<u8>) {
        debug_assert!(
            self.is_block_start(ptr.as_ptr()),
            "pointer {ptr:p} is not a block of this pool"
        );
        debug_assert!(self.used.get() > 0, "release on a pool with no blocks in use");

        // SAFETY: caller guarantees `ptr` is a live block of this pool.
        unsafe {
            if let Some(pattern) = self.config.dealloc_pattern {
                utils::fill_bytes(ptr.as_ptr(), pattern, self.block_size);
            }
            write_link(ptr, self.free_list.get());
        }
        self.free_list.set(Some(ptr));
        self.used.set(self.used.get() - 1);
    }

    fn total_allocated(&self) -> Option<usize> {
        Some(self.used.get() * self.block_size)
    }
}

impl<A: Allocator> Drop for Pool<A> {
    fn drop(&mut self) {
        // SAFETY: `buffer` was allocated from `backing` in the constructor.
        unsafe { self.backing.release(self.buffer) };
    }
}

impl<A: Allocator> fmt::Debug for Pool<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("block_size", &self.block_size)
            .field("block_align", &self.block_align)
            .field("block_count", &self.block_count)
            .field("used", &self.used.get())
            .field("buffer_size", &self.buffer_size)
            .finish()
    }
}

// SAFETY: the pool exclusively owns its buffer; moving it to another thread
// moves that ownership along. It stays `!Sync` through its `Cell`s.
unsafe impl<A: Allocator + Send> Send for Pool<A> {}
