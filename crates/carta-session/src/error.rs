//! # Engine Error Types
//!
//! Error types for the session engine and its collaborators.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Engine Error Categories                            │
//! │                                                                         │
//! │  Caller-visible                      Recovered internally              │
//! │  ┌─────────────────────────┐         ┌─────────────────────────────┐   │
//! │  │  EngineError            │         │  EvaluationError            │   │
//! │  │                         │         │                             │   │
//! │  │  InvalidTenant          │         │  Catalog(CatalogError)      │   │
//! │  │  InvalidMutation        │         │  Timeout { ms }             │   │
//! │  │  Cancelled              │         │                             │   │
//! │  └─────────────────────────┘         │  → warn! + degraded view    │   │
//! │                                      └─────────────────────────────┘   │
//! │  Startup                                                               │
//! │  ┌─────────────────────────┐                                           │
//! │  │  ConfigError            │  file I/O, TOML, invalid values          │
//! │  └─────────────────────────┘                                           │
//! │                                                                         │
//! │  A missing session is not an error: lookups return `None`, and an     │
//! │  unknown id looks exactly like another tenant's session.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use carta_core::{CoreError, ValidationError};
use thiserror::Error;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Result type alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Engine Error
// =============================================================================

/// Errors returned to engine callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The call carried no tenant.
    #[error("No tenant in call context")]
    InvalidTenant,

    /// The mutation was rejected; the stored session is unchanged.
    #[error("Invalid mutation: {0}")]
    InvalidMutation(#[from] CoreError),

    /// The caller cancelled the operation; nothing was committed.
    #[error("Operation cancelled")]
    Cancelled,
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::InvalidMutation(CoreError::Validation(err))
    }
}

// =============================================================================
// Evaluation Errors
// =============================================================================

/// Reasons a promotion evaluation could not complete.
///
/// Never surfaced to callers. The engine logs it and returns undiscounted
/// totals.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    /// The catalog returned an error.
    #[error("Promotion catalog unavailable: {0}")]
    Catalog(#[from] CatalogError),

    /// The catalog did not answer in time.
    #[error("Promotion catalog timed out after {ms} ms")]
    Timeout { ms: u64 },
}

/// Errors raised by a promotion catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// Backend not reachable or failing.
    #[error("Catalog backend unavailable: {0}")]
    Unavailable(String),

    /// Catalog document could not be parsed.
    #[error("Invalid catalog document: {0}")]
    InvalidDocument(String),

    /// A promotion referenced by id does not exist for the tenant.
    #[error("Promotion {promotion_id} not found for tenant {tenant_id}")]
    UnknownPromotion {
        tenant_id: String,
        promotion_id: String,
    },
}

impl From<toml::de::Error> for CatalogError {
    fn from(err: toml::de::Error) -> Self {
        CatalogError::InvalidDocument(err.to_string())
    }
}

// =============================================================================
// Configuration Error
// =============================================================================

/// Errors raised while loading or validating [`EngineConfig`](crate::config::EngineConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file.
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid TOML for this schema.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of its allowed range.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// =============================================================================
// Unit Tests
// =============================================================================
