//! # basalt-memory
//!
//! Pluggable memory allocation strategies behind one uniform interface.
//!
//! This crate provides:
//! - The [`Allocator`](allocator::Allocator) capability contract
//! - A general-purpose [`HeapAllocator`](allocator::HeapAllocator) over the
//!   platform heap, optionally serialized by a mutex
//! - A linear [`Arena`](arena::Arena) with nested temporary scopes
//! - A fixed-block [`Pool`](allocator::Pool) threaded on an intrusive free list
//!
//! ## Quick Start
//!
//! ```rust
//! use core::alloc::Layout;
//! use basalt_memory::prelude::*;
//!
//! let heap = HeapAllocator::new();
//!
//! // An arena carved out of the heap
//! let mut arena = Arena::with_capacity_in(&heap, 4096)?;
//! {
//!     let scope = arena.begin_temp();
//!     let scratch = scope.alloc_slice_copy(&[1u32, 2, 3])?;
//!     assert_eq!(scratch.len(), 3);
//!     // rolled back here
//! }
//! assert_eq!(arena.total_allocated(), 0);
//!
//! // A pool of 16-byte blocks, also from the heap
//! let pool = Pool::new_in(&heap, 8, 16, 8)?;
//! let block = unsafe { pool.allocate(Layout::from_size_align(16, 8).unwrap())? };
//! unsafe { pool.release(block.cast()) };
//! # Ok::<(), basalt_memory::MemoryError>(())
//! ```
//!
//! ## Features
//!
//! - `logging` (default): structured diagnostics through `tracing`
//!
//! ## Error model
//!
//! Out-of-memory conditions and cheaply detectable misuse are reported as
//! [`MemoryError`]. Pointer-level caller contracts (release through the
//! allocator that produced the pointer, release at most once) are `unsafe`
//! preconditions backed by `debug_assert!`.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::perf)]
#![warn(clippy::pedantic)]
#![warn(rust_2018_idioms)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
// Explicit lifetimes are clearer in unsafe/arena code even when elidable
#![allow(clippy::elidable_lifetime_names)]
// inline(always) on small alignment helpers is intentional for hot paths
#![allow(clippy::inline_always)]
// #[must_use] on fns returning Self/Result documents intent even if type is already must_use
#![allow(clippy::double_must_use)]
#![allow(clippy::return_self_not_must_use)]
// Pointer alignment cast in the heap header and pool links is checked per site
#![allow(clippy::cast_ptr_alignment)]

// Error types
pub mod error;

// Core modules
pub mod allocator;
pub mod arena;
pub mod utils;

pub use crate::error::{AllocError, AllocResult, MemoryError, MemoryResult, Result};

// Public API exports
pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use crate::error::{MemoryError, MemoryResult, Result};

    pub use crate::allocator::{
        AllocError, AllocResult, Allocator, HeapAllocator, HeapConfig, HeapStats, Pool, PoolConfig,
    };

    pub use crate::arena::{Arena, ArenaConfig, TempArena};

    pub use crate::utils::CheckedArithmetic;
}
