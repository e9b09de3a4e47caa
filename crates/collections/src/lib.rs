//! # basalt-collections
//!
//! Containers that take their memory from a [`basalt_memory`] allocator.
//!
//! - [`DynArray`]: growable array of `Copy` values
//! - [`HashTable`]: `u64`-keyed map, one value per key
//! - [`MultiHashTable`]: `u64`-keyed multimap
//!
//! Every container is generic over the allocator, so the same table can live
//! on the heap, inside an arena scope, or in a caller-provided buffer.
//!
//! ## Quick Start
//!
//! ```rust
//! use basalt_collections::prelude::*;
//! use basalt_memory::allocator::HeapAllocator;
//! use basalt_memory::arena::Arena;
//!
//! let heap = HeapAllocator::new();
//! let mut arena = Arena::with_capacity_in(&heap, 64 * 1024)?;
//! {
//!     let scope = arena.begin_temp();
//!     let mut ages = HashTable::new_in(&*scope);
//!     ages.set(1, 31u8)?;
//!     ages.set(2, 47)?;
//!     assert_eq!(ages.get(2), Some(&47));
//! }
//! assert_eq!(arena.total_allocated(), 0);
//! # Ok::<(), basalt_memory::MemoryError>(())
//! ```
//!
//! ## Features
//!
//! - `logging` (default): rehash events through `tracing`

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
// Bucket indices fit in isize and keys are reduced modulo the bucket count
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]

pub mod array;
pub mod hash;

pub use crate::array::DynArray;
pub use crate::hash::{Entry, HashTable, MultiHashTable, ValuesFor};

pub mod prelude {
    //! Convenient re-exports of commonly used types.

    pub use crate::array::DynArray;
    pub use crate::hash::{Entry, HashTable, MultiHashTable};
}
