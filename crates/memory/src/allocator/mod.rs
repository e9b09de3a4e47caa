//! Allocator interface and the general-purpose and fixed-block strategies
//!
//! - [`Allocator`]: the capability contract every strategy implements
//! - [`HeapAllocator`]: platform heap with per-block headers and counters
//! - [`Pool`]: fixed-size blocks threaded on an intrusive free list
//!
//! The linear strategy lives in [`crate::arena`].

mod heap;
pub mod pool;
mod traits;

pub use heap::{HeapAllocator, HeapConfig, HeapStats};
pub(crate) use heap::validate_patterns;
pub use pool::{Pool, PoolConfig};
pub use traits::Allocator;

pub use crate::error::{AllocError, AllocResult};
