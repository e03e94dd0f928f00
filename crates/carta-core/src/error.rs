//! # Error Types
//!
//! Domain-specific error types for carta-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      carta error layering                               │
//! │                                                                         │
//! │  carta-core errors (this file)                                         │
//! │  ├── CoreError        - Cart rule violations (limits)                  │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  carta-session errors (separate crate)                                 │
//! │  ├── EngineError      - What callers see (InvalidTenant, ...)          │
//! │  └── EvaluationError  - Catalog trouble, never surfaced                │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError::InvalidMutation      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Messages name the offending field and the limit it broke.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Cart rule violations.
///
/// Raised by cart mutations when the change itself is well-formed but the
/// resulting cart would break a limit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Adding a new line would exceed the maximum number of lines.
    #[error("Cart cannot have more than {max} lines")]
    CartTooLarge { max: usize },

    /// A line's quantity would exceed the maximum allowed.
    ///
    /// ## When This Occurs
    /// ```text
    /// Line qty: 998, add_item(qty: 5)
    ///      │
    ///      ▼
    /// 1003 > 999
    ///      │
    ///      ▼
    /// QuantityTooLarge { requested: 1003, max: 999 }
    /// ```
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// The input itself was malformed.
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Malformed caller input, rejected before any stored session is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    /// Measured in characters, not bytes.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    #[error("{field} accepts at most {max} entries")]
    TooMany { field: String, max: usize },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Result of a cart mutation.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
