//! Error types for basalt-memory
//!
//! Uses thiserror for clean, idiomatic Rust error definitions.
//!
//! Only out-of-memory conditions and cheaply detectable misuse are reported
//! here. Misuse that would require trusting caller pointers (releasing into
//! the wrong allocator, double release) is an `unsafe` contract instead and is
//! checked with `debug_assert!` where a check is possible at all.

use core::alloc::Layout;
use thiserror::Error;

#[cfg(feature = "logging")]
use tracing::{error, warn};

// ============================================================================
// Main Error Types
// ============================================================================

/// Memory management errors
#[must_use = "errors should be handled"]
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    // --- Allocation Errors ---
    #[error("Memory allocation failed: {size} bytes with {align} byte alignment")]
    AllocationFailed { size: usize, align: usize },

    #[error("Invalid memory layout: {reason}")]
    InvalidLayout { reason: String },

    #[error("Size overflow during operation: {operation}")]
    SizeOverflow { operation: String },

    #[error("Invalid alignment: {alignment}")]
    InvalidAlignment { alignment: usize },

    // --- Pool Errors ---
    #[error("Memory pool exhausted (capacity: {capacity} blocks)")]
    PoolExhausted { capacity: usize },

    // --- Arena Errors ---
    #[error("Arena exhausted: requested {requested} bytes, available {available}")]
    ArenaExhausted { requested: usize, available: usize },

    // --- Configuration / State Errors ---
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Invalid state: {reason}")]
    InvalidState { reason: String },
}

impl MemoryError {
    /// True for the out-of-memory family: platform failure, arena or pool
    /// exhaustion.
    #[must_use]
    pub fn is_out_of_memory(&self) -> bool {
        matches!(
            self,
            Self::AllocationFailed { .. } | Self::PoolExhausted { .. } | Self::ArenaExhausted { .. }
        )
    }

    /// Check if error is retryable
    ///
    /// Exhaustion of a bounded strategy clears once the caller releases
    /// memory back to it; nothing here is retried automatically.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::PoolExhausted { .. } | Self::ArenaExhausted { .. }
        )
    }

    /// Get error code for categorization
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::AllocationFailed { .. } => "MEM:ALLOC:FAILED",
            Self::InvalidLayout { .. } => "MEM:ALLOC:LAYOUT",
            Self::SizeOverflow { .. } => "MEM:ALLOC:OVERFLOW",
            Self::InvalidAlignment { .. } => "MEM:ALLOC:ALIGN",
            Self::PoolExhausted { .. } => "MEM:POOL:EXHAUSTED",
            Self::ArenaExhausted { .. } => "MEM:ARENA:EXHAUSTED",
            Self::InvalidConfig { .. } => "MEM:CONFIG:INVALID",
            Self::InvalidState { .. } => "MEM:SYSTEM:STATE",
        }
    }

    // ============================================================================
    // Convenience Constructors - Allocation Errors
    // ============================================================================

    /// Create allocation failed error
    pub fn allocation_failed(size: usize, align: usize) -> Self {
        #[cfg(feature = "logging")]
        error!(size, align, "memory allocation failed");

        Self::AllocationFailed { size, align }
    }

    /// Create allocation failed error from layout
    pub fn allocation_failed_with_layout(layout: Layout) -> Self {
        Self::allocation_failed(layout.size(), layout.align())
    }

    /// Create invalid layout error
    pub fn invalid_layout(reason: &str) -> Self {
        Self::InvalidLayout {
            reason: reason.to_string(),
        }
    }

    /// Create size overflow error
    pub fn size_overflow(operation: &str) -> Self {
        Self::SizeOverflow {
            operation: operation.to_string(),
        }
    }

    /// Create invalid alignment error
    pub fn invalid_alignment(alignment: usize) -> Self {
        Self::InvalidAlignment { alignment }
    }

    // --- Pool Errors ---

    /// Create pool exhausted error
    pub fn pool_exhausted(capacity: usize) -> Self {
        #[cfg(feature = "logging")]
        warn!(capacity, "memory pool exhausted");

        Self::PoolExhausted { capacity }
    }

    /// Create invalid pool config error
    pub fn invalid_pool_config(reason: &str) -> Self {
        Self::InvalidConfig {
            reason: format!("invalid pool config: {reason}"),
        }
    }

    /// Create invalid config error
    pub fn invalid_config(reason: &str) -> Self {
        Self::InvalidConfig {
            reason: reason.to_string(),
        }
    }

    // --- Arena Errors ---

    /// Create arena exhausted error
    pub fn arena_exhausted(requested: usize, available: usize) -> Self {
        #[cfg(feature = "logging")]
        warn!(requested, available, "arena exhausted");

        Self::ArenaExhausted {
            requested,
            available,
        }
    }

    /// Create invalid arena operation error
    pub fn invalid_arena_operation(operation: &str) -> Self {
        Self::InvalidState {
            reason: format!("invalid arena operation: {operation}"),
        }
    }

    /// Create invalid state error
    pub fn invalid_state(reason: &str) -> Self {
        Self::InvalidState {
            reason: reason.to_string(),
        }
    }
}

// ============================================================================
// Result Types
// ============================================================================

/// Result type for memory operations
pub type MemoryResult<T> = core::result::Result<T, MemoryError>;

/// Generic result type alias
pub type Result<T> = MemoryResult<T>;

/// Allocator-facing aliases
pub type AllocError = MemoryError;
pub type AllocResult<T> = MemoryResult<T>;

// ============================================================================
// Tests
// ============================================================================
