//! # Validation Module
//!
//! Boundary checks for cart mutations.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Transport (out of this workspace)                            │
//! │  └── Deserialization, request shape                                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Engine boundary                                              │
//! │  └── THIS MODULE: reject malformed input before the store is touched   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Cart mutations (cart.rs)                                     │
//! │  └── Limits that depend on current cart state (aggregated qty, lines)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use carta_core::cart::CartLimits;
//! use carta_core::validation::{validate_coupon_codes, validate_quantity};
//!
//! let limits = CartLimits::default();
//! assert!(validate_quantity(5, &limits).is_ok());
//! assert!(validate_quantity(0, &limits).is_err());
//! assert!(validate_coupon_codes(&["SAVE10", "  "], &limits).is_ok());
//! ```

use crate::cart::{CartLimits, NewCartLine};
use crate::error::ValidationError;
use crate::money::Money;
use crate::MAX_UNIT_PRICE;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Maximum length of a product name.
const MAX_PRODUCT_NAME_LENGTH: usize = 200;

/// Maximum length of a product code (SKU).
const MAX_PRODUCT_CODE_LENGTH: usize = 50;

// =============================================================================
// Line Validators
// =============================================================================

/// Validates everything about a line that can be checked without the cart.
pub fn validate_new_line(line: &NewCartLine, limits: &CartLimits) -> ValidationResult<()> {
    if line.product_id.as_str().trim().is_empty() {
        return Err(ValidationError::Required {
            field: "product_id".to_string(),
        });
    }
    validate_product_name(&line.product_name)?;
    if let Some(code) = &line.product_code {
        validate_product_code(code)?;
    }
    validate_unit_price(line.unit_price)?;
    validate_quantity(line.quantity, limits)
}

/// Validates a product name.
///
/// ## Rules
/// - Must not be blank
/// - At most 200 characters
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "product_name".to_string(),
        });
    }

    if name.chars().count() > MAX_PRODUCT_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: "product_name".to_string(),
            max: MAX_PRODUCT_NAME_LENGTH,
        });
    }

    Ok(())
}

/// Validates an optional product code. Blank codes are rejected; omit the
/// field instead.
pub fn validate_product_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "product_code".to_string(),
        });
    }

    if code.chars().count() > MAX_PRODUCT_CODE_LENGTH {
        return Err(ValidationError::TooLong {
            field: "product_code".to_string(),
            max: MAX_PRODUCT_CODE_LENGTH,
        });
    }

    Ok(())
}

/// Validates a unit price.
///
/// ## Rules
/// - Zero is allowed (free items), negatives are not
/// - At most [`MAX_UNIT_PRICE`] cents
pub fn validate_unit_price(price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: "unit_price".to_string(),
        });
    }

    if price.cents() > MAX_UNIT_PRICE {
        return Err(ValidationError::OutOfRange {
            field: "unit_price".to_string(),
            min: 0,
            max: MAX_UNIT_PRICE,
        });
    }

    Ok(())
}

/// Validates a quantity supplied to `add_item`.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed `limits.max_line_quantity`
///
/// Quantity updates use a different rule (≤ 0 removes the line) and only
/// check the upper bound.
pub fn validate_quantity(qty: i64, limits: &CartLimits) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > limits.max_line_quantity {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: limits.max_line_quantity,
        });
    }

    Ok(())
}

// =============================================================================
// Coupon Validators
// =============================================================================

/// Validates a coupon list passed to `apply_coupons`.
///
/// Blank entries are not errors; they are dropped when the list is applied.
///
/// ## Rules
/// - At most `limits.max_coupon_codes` non-blank entries
/// - Each code at most `limits.max_coupon_length` characters after trimming
/// - Codes contain no inner whitespace or control characters
pub fn validate_coupon_codes<S: AsRef<str>>(
    codes: &[S],
    limits: &CartLimits,
) -> ValidationResult<()> {
    let mut count = 0usize;

    for code in codes {
        let code = code.as_ref().trim();
        if code.is_empty() {
            continue;
        }
        count += 1;

        if code.chars().count() > limits.max_coupon_length {
            return Err(ValidationError::TooLong {
                field: "coupon_code".to_string(),
                max: limits.max_coupon_length,
            });
        }

        if code.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(ValidationError::InvalidFormat {
                field: "coupon_code".to_string(),
                reason: "must not contain whitespace or control characters".to_string(),
            });
        }
    }

    if count > limits.max_coupon_codes {
        return Err(ValidationError::TooMany {
            field: "coupon_codes".to_string(),
            max: limits.max_coupon_codes,
        });
    }

    Ok(())
}

// =============================================================================
// Session Validators
// =============================================================================

/// Validates an ISO 4217-like currency code: three ASCII letters.
pub fn validate_currency(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ValidationError::InvalidFormat {
            field: "currency".to_string(),
            reason: "must be a three-letter currency code".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
