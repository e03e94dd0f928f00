//! # Promotion Rule Evaluator
//!
//! Turns a cart snapshot plus a set of candidate promotions into a price
//! breakdown. Pure: no clock, no catalog, no hidden state.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     apply_promotions()                                  │
//! │                                                                         │
//! │  candidates                                                             │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  1. FILTER     valid_from ≤ now ≤ valid_to, coupon unlocked             │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  2. THRESHOLD  cart subtotal ≥ min_order_amount                         │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  3. SORT       priority ↓, name ↑, id ↑                                 │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  4. APPLY      combinable → continue                                    │
//! │      │         non-combinable (matched a line) → stop after it          │
//! │      ▼                                                                  │
//! │  5. PER LINE   rule discount, clamped to what is left of the line       │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  6. AGGREGATE  final = original − discounts, per line and in total      │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  7. RECORD     promotions with a non-zero discount                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - `final_total = original_total − total_discount`
//! - `total_discount ≥ 0`
//! - every `final_line_total ≥ 0`

use std::cmp::Ordering;
use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::{CartLine, CartSession};
use crate::money::{Money, Percentage};
use crate::promotion::{Promotion, RuleContext};
use crate::types::{CouponCode, CustomerId, LineId, PromotionId, SalesChannel};

// =============================================================================
// Input
// =============================================================================

/// Everything the evaluator reads from a cart.
#[derive(Debug, Clone, Copy)]
pub struct PricingInput<'a> {
    pub lines: &'a [CartLine],
    pub coupon_codes: &'a BTreeSet<CouponCode>,
    pub customer_id: Option<&'a CustomerId>,
    pub sales_channel: Option<&'a SalesChannel>,
    pub now: DateTime<Utc>,
}

impl<'a> PricingInput<'a> {
    /// Borrows the pricing-relevant parts of a session.
    pub fn from_session(session: &'a CartSession, now: DateTime<Utc>) -> Self {
        PricingInput {
            lines: &session.items,
            coupon_codes: &session.coupon_codes,
            customer_id: session.customer_id.as_ref(),
            sales_channel: session.sales_channel.as_ref(),
            now,
        }
    }

    fn rule_context(&self) -> RuleContext<'a> {
        RuleContext {
            customer_id: self.customer_id,
            sales_channel: self.sales_channel,
        }
    }
}

// =============================================================================
// Output
// =============================================================================

/// A promotion that contributed a discount, with the amount attributed to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AppliedPromotion {
    pub promotion_id: PromotionId,
    pub name: String,
    pub discount_amount: Money,
}

/// Price breakdown of one cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LinePricing {
    pub line_id: LineId,
    pub original_line_total: Money,
    pub final_line_total: Money,
    pub discount_amount: Money,
    /// Discount as a share of the original line total, in basis points.
    pub effective_discount: Percentage,
    pub applied_promotions: Vec<AppliedPromotion>,
}

/// Full, auditable result of one evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PromotionApplicationResult {
    pub original_total: Money,
    pub final_total: Money,
    pub total_discount_amount: Money,
    pub applied_promotions: Vec<AppliedPromotion>,
    pub per_line: Vec<LinePricing>,
}

impl PromotionApplicationResult {
    /// Breakdown for a cart priced without any promotion.
    pub fn undiscounted(lines: &[CartLine]) -> Self {
        let ledgers = lines.iter().map(LineLedger::new).collect();
        Self::from_ledgers(ledgers, Vec::new())
    }

    /// Looks up the breakdown of one line.
    pub fn line(&self, line_id: &LineId) -> Option<&LinePricing> {
        self.per_line.iter().find(|line| &line.line_id == line_id)
    }

    fn from_ledgers(ledgers: Vec<LineLedger>, applied_promotions: Vec<AppliedPromotion>) -> Self {
        let per_line: Vec<LinePricing> = ledgers.into_iter().map(LineLedger::finish).collect();
        let original_total: Money = per_line.iter().map(|l| l.original_line_total).sum();
        let final_total: Money = per_line.iter().map(|l| l.final_line_total).sum();

        PromotionApplicationResult {
            original_total,
            final_total,
            total_discount_amount: original_total - final_total,
            applied_promotions,
            per_line,
        }
    }
}

/// Running discount state of one line while promotions are applied.
struct LineLedger {
    line_id: LineId,
    original: Money,
    discount: Money,
    applied: Vec<AppliedPromotion>,
}

impl LineLedger {
    fn new(line: &CartLine) -> Self {
        LineLedger {
            line_id: line.id.clone(),
            original: line.subtotal(),
            discount: Money::zero(),
            applied: Vec::new(),
        }
    }

    fn remaining(&self) -> Money {
        (self.original - self.discount).clamp_non_negative()
    }

    fn finish(self) -> LinePricing {
        let final_line_total = self.remaining();
        let discount_amount = self.original - final_line_total;
        LinePricing {
            line_id: self.line_id,
            original_line_total: self.original,
            final_line_total,
            discount_amount,
            effective_discount: discount_amount.share_of(self.original),
            applied_promotions: self.applied,
        }
    }
}

// =============================================================================
// Evaluation
// =============================================================================

/// Applies `candidates` to the cart described by `input`.
///
/// `candidates` may contain promotions that are expired, locked behind a
/// coupon, or below their threshold; they are filtered here. Usage caps are
/// not: the catalog leaves exhausted promotions out of the candidate set.
///
/// ## Example
/// ```rust
/// use std::collections::BTreeSet;
/// use chrono::Utc;
/// use carta_core::evaluator::{apply_promotions, PricingInput};
///
/// let input = PricingInput {
///     lines: &[],
///     coupon_codes: &BTreeSet::new(),
///     customer_id: None,
///     sales_channel: None,
///     now: Utc::now(),
/// };
/// let result = apply_promotions(&input, &[]);
/// assert!(result.original_total.is_zero());
/// assert!(result.applied_promotions.is_empty());
/// ```
pub fn apply_promotions(
    input: &PricingInput<'_>,
    candidates: &[Promotion],
) -> PromotionApplicationResult {
    if input.lines.is_empty() {
        return PromotionApplicationResult::undiscounted(input.lines);
    }

    let subtotal: Money = input.lines.iter().map(CartLine::subtotal).sum();

    let mut eligible: Vec<&Promotion> = candidates
        .iter()
        .filter(|promo| promo.is_active_at(input.now))
        .filter(|promo| promo.is_unlocked_by(input.coupon_codes))
        .filter(|promo| promo.meets_threshold(subtotal))
        .collect();
    eligible.sort_by(|a, b| application_order(a, b));

    let ctx = input.rule_context();
    let mut ledgers: Vec<LineLedger> = input.lines.iter().map(LineLedger::new).collect();
    let mut applied = Vec::new();

    for promo in eligible {
        let outcome = apply_promotion(promo, input.lines, &mut ledgers, &ctx);

        if outcome.granted.is_positive() {
            applied.push(AppliedPromotion {
                promotion_id: promo.id.clone(),
                name: promo.name.clone(),
                discount_amount: outcome.granted,
            });
        }

        // A match ends evaluation even when the lines were already used up.
        if outcome.matched && !promo.is_combinable {
            break;
        }
    }

    PromotionApplicationResult::from_ledgers(ledgers, applied)
}

/// Priority descending, then name ascending, then id ascending.
fn application_order(a: &Promotion, b: &Promotion) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.id.cmp(&b.id))
}

/// What one promotion did to the cart.
struct PromotionOutcome {
    /// Some rule targeted some line, whatever it granted.
    matched: bool,
    granted: Money,
}

/// Applies every rule of `promo` to every line.
fn apply_promotion(
    promo: &Promotion,
    lines: &[CartLine],
    ledgers: &mut [LineLedger],
    ctx: &RuleContext<'_>,
) -> PromotionOutcome {
    let mut total = Money::zero();
    let mut matched = false;

    for (line, ledger) in lines.iter().zip(ledgers.iter_mut()) {
        let mut granted = Money::zero();

        for rule in promo.rules.iter().filter(|rule| rule.applies_to(line, ctx)) {
            matched = true;
            let amount = rule.discount_for(line).min(ledger.remaining());
            if amount.is_positive() {
                ledger.discount += amount;
                granted += amount;
            }
        }

        if granted.is_positive() {
            ledger.applied.push(AppliedPromotion {
                promotion_id: promo.id.clone(),
                name: promo.name.clone(),
                discount_amount: granted,
            });
            total += granted;
        }
    }

    PromotionOutcome {
        matched,
        granted: total,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
