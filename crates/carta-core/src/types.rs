//! # Domain Types
//!
//! Identifiers and small value types shared by the cart and promotion models.
//!
//! ## Identity Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Identifier Types                                │
//! │                                                                         │
//! │  Generated here (UUID v4)       Supplied by collaborators              │
//! │  ────────────────────────       ─────────────────────────              │
//! │  SessionId                      TenantId      (tenant context)         │
//! │  LineId                         ProductId     (product catalog)        │
//! │                                 CategoryId    (product catalog)        │
//! │                                 PromotionId   (promotion catalog)      │
//! │                                 CustomerId    (identity provider)      │
//! │                                 SalesChannel  (caller)                 │
//! │                                                                         │
//! │  All are opaque strings on the wire. Distinct Rust types stop a        │
//! │  LineId from ever being passed where a ProductId is expected.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;
use uuid::Uuid;

/// Declares an opaque string identifier newtype.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[serde(transparent)]
        #[ts(export)]
        pub struct $name(String);

        impl $name {
            /// Wraps an existing identifier.
            pub fn new(value: impl Into<String>) -> Self {
                $name(value.into())
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                $name(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                $name(value)
            }
        }
    };
}

string_id!(
    /// Tenant that owns a session. Supplied by the tenant context.
    TenantId
);

string_id!(
    /// Opaque cart session identifier.
    SessionId
);

string_id!(
    /// Identifier of one line inside a cart session.
    LineId
);

string_id!(
    /// Product identifier from the product catalog.
    ProductId
);

string_id!(
    /// Product category identifier.
    CategoryId
);

string_id!(
    /// Promotion identifier from the promotion catalog.
    PromotionId
);

string_id!(
    /// Customer the cart belongs to, when known.
    CustomerId
);

string_id!(
    /// Sales channel the cart was opened on ("web", "pos", "marketplace").
    SalesChannel
);

impl SessionId {
    /// Generates a fresh random session identifier.
    pub fn generate() -> Self {
        SessionId(Uuid::new_v4().to_string())
    }
}

impl LineId {
    /// Generates a fresh random line identifier.
    pub fn generate() -> Self {
        LineId(Uuid::new_v4().to_string())
    }
}

// =============================================================================
// Currency
// =============================================================================

/// Currency used when a session is created without one.
pub const DEFAULT_CURRENCY: &str = "EUR";

/// ISO 4217-like currency code, stored upper-case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Creates a currency code, trimming and upper-casing the input.
    ///
    /// Format checks live in [`crate::validation::validate_currency`].
    pub fn new(code: &str) -> Self {
        CurrencyCode(code.trim().to_ascii_uppercase())
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        CurrencyCode(DEFAULT_CURRENCY.to_string())
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Coupon Codes
// =============================================================================

/// A coupon code in canonical form: trimmed and upper-cased.
///
/// ## Matching Rule
/// ```text
/// "  save10 " ──normalize──► "SAVE10" ◄──normalize── "SAVE10"
///                                 │
///                                 └── equal → promotion is unlocked
/// ```
/// Both the session's codes and a promotion's `coupon_code` go through
/// [`CouponCode::normalize`], so comparison is case- and
/// whitespace-insensitive on both sides.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export)]
pub struct CouponCode(String);

impl CouponCode {
    /// Canonicalizes a raw code. Returns `None` for blank input.
    pub fn normalize(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(CouponCode(trimmed.to_uppercase()))
        }
    }

    /// Returns the canonical code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CouponCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
