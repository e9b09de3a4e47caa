//! Pool allocator configuration

use crate::allocator::validate_patterns;
use crate::error::MemoryResult;

/// Configuration for pool allocator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Fill pattern byte for newly allocated memory (for debugging)
    pub alloc_pattern: Option<u8>,
    /// Fill pattern byte for released memory (for debugging)
    ///
    /// The first machine word of a released block is overwritten by the free
    /// list link, so only the remainder keeps the pattern.
    pub dealloc_pattern: Option<u8>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            alloc_pattern: if cfg!(debug_assertions) {
                Some(0xBB)
            } else {
                None
            },
            dealloc_pattern: if cfg!(debug_assertions) {
                Some(0xDD)
            } else {
                None
            },
        }
    }
}

impl PoolConfig {
    /// Production configuration - optimized for performance
    #[must_use]
    pub fn production() -> Self {
        Self {
            alloc_pattern: None,
            dealloc_pattern: None,
        }
    }

    /// Debug configuration - optimized for debugging
    #[must_use]
    pub fn debug() -> Self {
        Self {
            alloc_pattern: Some(0xBB),
            dealloc_pattern: Some(0xDD),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> MemoryResult<()> {
        validate_patterns(self.alloc_pattern, self.dealloc_pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_validate() {
        assert!(PoolConfig::default().validate().is_ok());
        assert!(PoolConfig::production().validate().is_ok());
        assert!(PoolConfig::debug().validate().is_ok());
        assert_eq!(PoolConfig::production().alloc_pattern, None);
    }

    #[test]
    fn test_identical_patterns_rejected() {
        let config = PoolConfig {
            alloc_pattern: Some(0x11),
            dealloc_pattern: Some(0x11),
        };
        assert!(config.validate().is_err());
    }
}
