//! Arena configuration

use crate::allocator::validate_patterns;
use crate::error::MemoryResult;

/// Configuration for [`Arena`](super::Arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Fill pattern byte for freshly bumped memory (for debugging)
    pub alloc_pattern: Option<u8>,
    /// Fill pattern byte for memory given back by a scope rollback or a clear
    pub reset_pattern: Option<u8>,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            alloc_pattern: if cfg!(debug_assertions) {
                Some(0xAA)
            } else {
                None
            },
            reset_pattern: if cfg!(debug_assertions) {
                Some(0xEE)
            } else {
                None
            },
        }
    }
}

impl ArenaConfig {
    /// Production configuration - no fill patterns
    #[must_use]
    pub fn production() -> Self {
        Self {
            alloc_pattern: None,
            reset_pattern: None,
        }
    }

    /// Debug configuration - both fill patterns on
    #[must_use]
    pub fn debug() -> Self {
        Self {
            alloc_pattern: Some(0xAA),
            reset_pattern: Some(0xEE),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> MemoryResult<()> {
        validate_patterns(self.alloc_pattern, self.reset_pattern)
    }
}
