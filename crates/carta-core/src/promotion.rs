//! # Promotion Model
//!
//! Promotions as read from the promotion catalog. Immutable for the duration
//! of one evaluation.
//!
//! ## Anatomy of a Promotion
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Promotion "Summer Sale"                                                │
//! │  ─────────────────────────────────────────────────────────────────────  │
//! │  Gates           valid_from ≤ now ≤ valid_to                            │
//! │                  coupon_code (optional, trimmed + case-insensitive)     │
//! │                  min_order_amount (optional, vs. cart subtotal)         │
//! │                                                                         │
//! │  Ordering        priority (higher first), then name, then id            │
//! │  Exclusivity     is_combinable = false → nothing after it applies       │
//! │                                                                         │
//! │  Rules           [ condition ──► discount ]  evaluated per cart line    │
//! │                    │                │                                   │
//! │                    │                ├── Percentage { rate }             │
//! │                    │                └── FixedAmount { amount }          │
//! │                    └── all non-empty constraint sets must match         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rule Conditions
//! A condition is a conjunction of optional any-of sets. An empty set places
//! no constraint, so a rule with a default condition applies to every line.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cart::CartLine;
use crate::money::{Money, Percentage};
use crate::types::{CategoryId, CouponCode, CustomerId, ProductId, PromotionId, SalesChannel};

// =============================================================================
// Promotion
// =============================================================================

/// A time-bounded discount offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Promotion {
    pub id: PromotionId,
    pub name: String,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    #[serde(default)]
    pub min_order_amount: Option<Money>,
    /// Redemption cap. Enforced by the catalog: an exhausted promotion is
    /// simply not returned as a candidate.
    #[serde(default)]
    pub max_uses: Option<u32>,
    #[serde(default)]
    pub coupon_code: Option<String>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub is_combinable: bool,
    #[serde(default)]
    pub rules: Vec<PromotionRule>,
}

impl Promotion {
    /// True when `now` falls inside `[valid_from, valid_to]`, both inclusive.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.valid_from <= now && now <= self.valid_to
    }

    /// True when the promotion is ambient (no coupon) or its coupon is in
    /// `codes`. Both sides are compared in canonical form.
    ///
    /// A promotion whose configured coupon is blank is treated as ambient.
    pub fn is_unlocked_by(&self, codes: &BTreeSet<CouponCode>) -> bool {
        match self.coupon_code.as_deref().and_then(CouponCode::normalize) {
            None => true,
            Some(code) => codes.contains(&code),
        }
    }

    /// True when the cart subtotal reaches `min_order_amount`, or no
    /// threshold is set.
    pub fn meets_threshold(&self, subtotal: Money) -> bool {
        self.min_order_amount.map_or(true, |min| subtotal >= min)
    }
}

// =============================================================================
// Rules
// =============================================================================

/// Context a rule condition is evaluated against, besides the line itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleContext<'a> {
    pub customer_id: Option<&'a CustomerId>,
    pub sales_channel: Option<&'a SalesChannel>,
}

/// Condition + effect pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromotionRule {
    #[serde(default)]
    pub condition: RuleCondition,
    pub discount: Discount,
}

impl PromotionRule {
    /// True when this rule targets `line` in the given context.
    pub fn applies_to(&self, line: &CartLine, ctx: &RuleContext<'_>) -> bool {
        self.condition.matches(line, ctx)
    }

    /// Discount this rule grants on `line`, before clamping.
    pub fn discount_for(&self, line: &CartLine) -> Money {
        self.discount.amount_for(line.subtotal())
    }
}

/// Conjunction of optional any-of constraints.
///
/// ```text
/// product_ids    = {}            → any product
/// category_ids   = {"drinks"}    → line must carry "drinks"
/// sales_channels = {"web","app"} → cart opened on web or app
/// customer_ids   = {}            → any customer (or none)
///                                  ──────────────────────────
///                                  all four must hold
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleCondition {
    pub product_ids: BTreeSet<ProductId>,
    pub category_ids: BTreeSet<CategoryId>,
    pub sales_channels: BTreeSet<SalesChannel>,
    pub customer_ids: BTreeSet<CustomerId>,
}

impl RuleCondition {
    /// Evaluates the condition for one line.
    ///
    /// A constraint on channel or customer never matches a cart that has
    /// no channel or customer.
    pub fn matches(&self, line: &CartLine, ctx: &RuleContext<'_>) -> bool {
        if !self.product_ids.is_empty() && !self.product_ids.contains(&line.product_id) {
            return false;
        }

        if !self.category_ids.is_empty()
            && self.category_ids.is_disjoint(&line.category_ids)
        {
            return false;
        }

        if !self.sales_channels.is_empty()
            && !ctx
                .sales_channel
                .is_some_and(|channel| self.sales_channels.contains(channel))
        {
            return false;
        }

        if !self.customer_ids.is_empty()
            && !ctx
                .customer_id
                .is_some_and(|customer| self.customer_ids.contains(customer))
        {
            return false;
        }

        true
    }
}

/// How much a rule takes off a matching line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Discount {
    /// Percentage of the line subtotal, rounded half-up to the cent.
    Percentage { rate: Percentage },
    /// Fixed amount off the line (not per unit).
    FixedAmount { amount: Money },
}

impl Discount {
    /// Discount on a line with the given subtotal. Never negative; the
    /// evaluator additionally clamps to what is left of the line.
    pub fn amount_for(&self, line_subtotal: Money) -> Money {
        match self {
            Discount::Percentage { rate } => line_subtotal.percentage_of(*rate),
            Discount::FixedAmount { amount } => *amount,
        }
        .clamp_non_negative()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
