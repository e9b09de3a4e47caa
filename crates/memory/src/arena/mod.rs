//! Linear arena allocator with nested temporary scopes
//!
//! An [`Arena`] bumps an offset through one fixed buffer, either lent by the
//! caller or obtained from a backing [`Allocator`](crate::allocator::Allocator).
//! Memory comes back in bulk through [`Arena::clear`] or by closing a
//! [`TempArena`] scope, never one block at a time.

#[allow(clippy::module_inception)]
mod arena;
mod config;
mod scope;

pub use arena::Arena;
pub use config::ArenaConfig;
pub use scope::TempArena;
