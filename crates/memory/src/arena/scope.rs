//! RAII temporary scopes over an arena
//!
//! A [`TempArena`] records the arena's bump offset on entry and rolls the
//! offset back to it when closed. Scopes nest like a stack; because each one
//! holds the only mutable borrow of its parent, they also have to be closed
//! in LIFO order.

use core::ops::Deref;

use super::Arena;
use crate::error::{MemoryError, MemoryResult};

/// RAII guard for a temporary scope within an arena
///
/// # Examples
///
/// ```
/// use basalt_memory::arena::Arena;
///
/// let mut buffer = [0u8; 128];
/// let mut arena = Arena::from_buffer(&mut buffer);
///
/// let mut outer = arena.begin_temp();
/// outer.alloc(1u32).unwrap();
/// {
///     let inner = outer.begin_temp();
///     inner.alloc(2u32).unwrap();
///     assert_eq!(inner.temp_count(), 2);
/// }
/// assert_eq!(outer.temp_count(), 1);
/// outer.end().unwrap();
///
/// assert_eq!(arena.total_allocated(), 0);
/// assert_eq!(arena.temp_count(), 0);
/// ```
#[must_use = "TempArena rolls back as soon as it is dropped"]
pub struct TempArena<'s, 'a> {
    arena: &'s mut Arena<'a>,
    original_count: usize,
    active: bool,
}

impl<'s, 'a> TempArena<'s, 'a> {
    pub(super) fn new(arena: &'s mut Arena<'a>) -> Self {
        let original_count = arena.total_allocated.get();
        arena.temp_count.set(arena.temp_count.get() + 1);
        Self {
            arena,
            original_count,
            active: true,
        }
    }

    /// Offset the arena is rolled back to on close
    pub fn original_count(&self) -> usize {
        self.original_count
    }

    /// Opens a nested scope
    pub fn begin_temp(&mut self) -> TempArena<'_, 'a> {
        TempArena::new(self.arena)
    }

    /// Closes the scope, rolling the arena back to its entry offset
    ///
    /// # Errors
    /// `InvalidState` if the arena no longer agrees with this scope: its
    /// offset sits below the entry offset or no scope is recorded as open.
    pub fn end(mut self) -> MemoryResult<()> {
        self.close()
    }

    fn close(&mut self) -> MemoryResult<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;

        let arena = &*self.arena;
        if arena.temp_count.get() == 0 || arena.total_allocated.get() < self.original_count {
            return Err(MemoryError::invalid_arena_operation(
                "temporary scope closed out of order",
            ));
        }

        arena.rewind(self.original_count);
        arena.temp_count.set(arena.temp_count.get() - 1);
        Ok(())
    }
}

impl<'a> Deref for TempArena<'_, 'a> {
    type Target = Arena<'a>;

    fn deref(&self) -> &Self::Target {
        self.arena
    }
}

impl Drop for TempArena<'_, '_> {
    fn drop(&mut self) {
        let result = self.close();
        debug_assert!(result.is_ok(), "{result:?}");
    }
}

#[cfg(test)]
mod tests {
    use core::alloc::Layout;

    use super::*;
    use crate::allocator::Allocator;

    #[test]
    fn test_rollback_restores_offset() {
        let mut buffer = [0u8; 128];
        let mut arena = Arena::from_buffer(&mut buffer);
        arena.alloc(0u64).unwrap();
        let before = arena.total_allocated();

        let scope = arena.begin_temp();
        assert_eq!(scope.original_count(), before);
        scope.alloc([0u8; 40]).unwrap();
        assert!(scope.total_allocated() > before);
        scope.end().unwrap();

        assert_eq!(arena.total_allocated(), before);
        assert_eq!(arena.temp_count(), 0);
    }

    #[test]
    fn test_rollback_on_early_return() {
        fn fill(arena: &mut Arena<'_>) -> MemoryResult<()> {
            let scope = arena.begin_temp();
            loop {
                // exhausts the arena, the `?` leaves the scope open
                scope.alloc([0u8; 16])?;
            }
        }

        let mut buffer = [0u8; 100];
        let mut arena = Arena::from_buffer(&mut buffer);
        let err = fill(&mut arena).unwrap_err();
        assert!(err.is_out_of_memory());
        assert_eq!(arena.total_allocated(), 0);
        assert_eq!(arena.temp_count(), 0);
    }

    #[test]
    fn test_nested_scopes_unwind_in_order() {
        let mut buffer = [0u8; 256];
        let mut arena = Arena::from_buffer(&mut buffer);

        let mut s1 = arena.begin_temp();
        unsafe { s1.allocate(Layout::from_size_align(10, 2).unwrap()).unwrap() };
        let after_s1 = s1.total_allocated();
        {
            let mut s2 = s1.begin_temp();
            s2.alloc(5u8).unwrap();
            {
                let s3 = s2.begin_temp();
                s3.alloc(5u64).unwrap();
                assert_eq!(s3.temp_count(), 3);
            }
            assert_eq!(s2.temp_count(), 2);
            s2.end().unwrap();
        }
        assert_eq!(s1.total_allocated(), after_s1);
        drop(s1);

        assert_eq!(arena.total_allocated(), 0);
        assert_eq!(arena.temp_count(), 0);
    }

    #[test]
    fn test_clear_refused_with_leaked_scope() {
        let mut buffer = [0u8; 64];
        let mut arena = Arena::from_buffer(&mut buffer);

        #[allow(clippy::mem_forget)]
        core::mem::forget(arena.begin_temp());

        assert_eq!(arena.temp_count(), 1);
        assert!(matches!(arena.clear(), Err(MemoryError::InvalidState { .. })));
    }
}
