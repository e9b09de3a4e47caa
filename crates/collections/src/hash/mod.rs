//! Chained hash tables keyed by `u64`
//!
//! Keys are used as their own hash: the bucket of `key` is
//! `key % bucket_count`. Callers that need a real hash function hash before
//! inserting.
//!
//! Both tables start with no storage, grow to 8 buckets on first insert and
//! rehash to `2 * len + 8` buckets once the load factor passes 0.75.

mod multi;
mod raw;
mod table;

pub use multi::{MultiHashTable, ValuesFor};
pub use raw::Entry;
pub use table::HashTable;
