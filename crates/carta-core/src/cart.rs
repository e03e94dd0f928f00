//! # Cart Model
//!
//! The cart session and its lines, plus the mutations the engine applies.
//!
//! ## Cart Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Session Mutations                               │
//! │                                                                         │
//! │  Engine operation          Method here             Effect               │
//! │  ────────────────          ───────────             ──────               │
//! │                                                                         │
//! │  addItem ────────────────► add_item() ──────────► push line, or bump    │
//! │                                                   qty of same product   │
//! │                                                                         │
//! │  removeItem ─────────────► remove_line() ───────► drop line (no-op if   │
//! │                                                   already gone)         │
//! │                                                                         │
//! │  updateItemQuantity ─────► set_quantity() ──────► qty ≤ 0 drops line    │
//! │                                                                         │
//! │  applyCoupons ───────────► replace_coupons() ───► normalized set        │
//! │                                                                         │
//! │  clear ──────────────────► clear() ─────────────► lines + coupons gone, │
//! │                                                   identity kept         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every method takes `now` explicitly so this module stays free of clocks.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{
    CategoryId, CouponCode, CurrencyCode, CustomerId, LineId, ProductId, SalesChannel, SessionId,
    TenantId,
};
use crate::validation;
use crate::{MAX_CART_LINES, MAX_COUPON_CODES, MAX_COUPON_CODE_LENGTH, MAX_LINE_QUANTITY};

// =============================================================================
// Limits
// =============================================================================

/// Size limits applied to every cart mutation.
///
/// Defaults come from the crate-level constants; deployments override them
/// through the engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CartLimits {
    /// Maximum number of distinct lines in one cart.
    pub max_lines: usize,
    /// Maximum quantity of a single line.
    pub max_line_quantity: i64,
    /// Maximum number of coupon codes attached to one cart.
    pub max_coupon_codes: usize,
    /// Maximum length of a single coupon code, after trimming.
    pub max_coupon_length: usize,
}

impl Default for CartLimits {
    fn default() -> Self {
        CartLimits {
            max_lines: MAX_CART_LINES,
            max_line_quantity: MAX_LINE_QUANTITY,
            max_coupon_codes: MAX_COUPON_CODES,
            max_coupon_length: MAX_COUPON_CODE_LENGTH,
        }
    }
}

// =============================================================================
// Cart Line
// =============================================================================

/// Input for adding a product to a cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCartLine {
    pub product_id: ProductId,
    #[serde(default)]
    pub product_code: Option<String>,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: i64,
    #[serde(default)]
    pub category_ids: BTreeSet<CategoryId>,
}

/// One entry per distinct product in a session.
///
/// ## Design Notes
/// - `unit_price`, `product_name` and `product_code` are frozen when the
///   product is first added. Adding the same product again only bumps the
///   quantity.
/// - `quantity` is always > 0. A line that would reach zero is removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub id: LineId,
    pub product_id: ProductId,
    pub product_code: Option<String>,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: i64,
    pub category_ids: BTreeSet<CategoryId>,
    pub added_at: DateTime<Utc>,
}

impl CartLine {
    fn from_new(line: NewCartLine, now: DateTime<Utc>) -> Self {
        CartLine {
            id: LineId::generate(),
            product_id: line.product_id,
            product_code: line.product_code,
            product_name: line.product_name,
            unit_price: line.unit_price,
            quantity: line.quantity,
            category_ids: line.category_ids,
            added_at: now,
        }
    }

    /// Line subtotal before any discount (unit price × quantity).
    pub fn subtotal(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Cart Session
// =============================================================================

/// Attributes supplied when a session is opened.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSession {
    #[serde(default)]
    pub customer_id: Option<CustomerId>,
    #[serde(default)]
    pub sales_channel: Option<SalesChannel>,
    #[serde(default)]
    pub currency: CurrencyCode,
}

/// An in-progress shopping cart owned by exactly one tenant.
///
/// ## Invariants
/// - Lines are unique by `product_id`
/// - Every line has `quantity > 0`
/// - `coupon_codes` holds canonical codes only (see [`CouponCode`])
/// - `tenant_id` never changes after creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSession {
    pub id: SessionId,
    pub tenant_id: TenantId,
    pub customer_id: Option<CustomerId>,
    pub sales_channel: Option<SalesChannel>,
    pub currency: CurrencyCode,
    pub items: Vec<CartLine>,
    pub coupon_codes: BTreeSet<CouponCode>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CartSession {
    /// Opens an empty session with a freshly generated id.
    pub fn open(tenant_id: TenantId, new: NewSession, now: DateTime<Utc>) -> Self {
        CartSession {
            id: SessionId::generate(),
            tenant_id,
            customer_id: new.customer_id,
            sales_channel: new.sales_channel,
            currency: new.currency,
            items: Vec::new(),
            coupon_codes: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Adds a product, or increases the quantity of its existing line.
    ///
    /// ## Behavior
    /// - Product already in cart: quantity += `line.quantity`
    /// - Product not in cart: new line appended (order is preserved)
    ///
    /// ## Errors
    /// - `Validation` if the input is malformed (quantity ≤ 0, negative price)
    /// - `QuantityTooLarge` if the aggregated quantity exceeds the limit
    /// - `CartTooLarge` if a new line would exceed the line limit
    pub fn add_item(
        &mut self,
        line: NewCartLine,
        limits: &CartLimits,
        now: DateTime<Utc>,
    ) -> CoreResult<LineId> {
        validation::validate_new_line(&line, limits)?;

        if let Some(existing) = self
            .items
            .iter_mut()
            .find(|item| item.product_id == line.product_id)
        {
            let requested = existing.quantity.saturating_add(line.quantity);
            if requested > limits.max_line_quantity {
                return Err(CoreError::QuantityTooLarge {
                    requested,
                    max: limits.max_line_quantity,
                });
            }
            existing.quantity = requested;
            let id = existing.id.clone();
            self.touch(now);
            return Ok(id);
        }

        if self.items.len() >= limits.max_lines {
            return Err(CoreError::CartTooLarge {
                max: limits.max_lines,
            });
        }

        let line = CartLine::from_new(line, now);
        let id = line.id.clone();
        self.items.push(line);
        self.touch(now);
        Ok(id)
    }

    /// Removes a line. Returns `false` if the line was not in the cart.
    pub fn remove_line(&mut self, line_id: &LineId, now: DateTime<Utc>) -> bool {
        let before = self.items.len();
        self.items.retain(|item| &item.id != line_id);
        let removed = self.items.len() != before;
        if removed {
            self.touch(now);
        }
        removed
    }

    /// Sets the quantity of a line.
    ///
    /// ## Behavior
    /// - `quantity ≤ 0`: removes the line (same as [`remove_line`](Self::remove_line))
    /// - Unknown line: no change, returns `Ok(false)`
    pub fn set_quantity(
        &mut self,
        line_id: &LineId,
        quantity: i64,
        limits: &CartLimits,
        now: DateTime<Utc>,
    ) -> CoreResult<bool> {
        if quantity <= 0 {
            return Ok(self.remove_line(line_id, now));
        }

        if quantity > limits.max_line_quantity {
            return Err(CoreError::QuantityTooLarge {
                requested: quantity,
                max: limits.max_line_quantity,
            });
        }

        match self.items.iter_mut().find(|item| &item.id == line_id) {
            Some(item) => {
                item.quantity = quantity;
                self.touch(now);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Replaces the coupon set. Blank entries are dropped, duplicates
    /// (after normalization) collapse into one code.
    pub fn replace_coupons<S: AsRef<str>>(&mut self, codes: &[S], now: DateTime<Utc>) {
        self.coupon_codes = codes
            .iter()
            .filter_map(|code| CouponCode::normalize(code.as_ref()))
            .collect();
        self.touch(now);
    }

    /// Empties lines and coupons. Identity and metadata are kept.
    pub fn clear(&mut self, now: DateTime<Utc>) {
        self.items.clear();
        self.coupon_codes.clear();
        self.touch(now);
    }

    /// Looks up a line by id.
    pub fn line(&self, line_id: &LineId) -> Option<&CartLine> {
        self.items.iter().find(|item| &item.id == line_id)
    }

    /// Sum of all line subtotals, before discounts.
    pub fn subtotal(&self) -> Money {
        self.items.iter().map(CartLine::subtotal).sum()
    }

    /// Total quantity over all lines.
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Checks if the cart has no lines.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
