//! Fixed-block pool allocator
//!
//! A pool carves one backing buffer into equally sized, equally aligned
//! blocks and threads the unused ones into an intrusive singly linked free
//! list. Allocate and release are O(1) but only serve the pool's exact block
//! layout.

mod allocator;
mod config;

pub use allocator::Pool;
pub use config::PoolConfig;
