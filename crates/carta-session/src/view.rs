//! # Session View
//!
//! What every engine operation returns: the cart merged with a fresh price
//! breakdown.
//!
//! ## Composition
//! ```text
//! CartSession                        PromotionApplicationResult
//!   items[i] ───────────┐       ┌──── per_line[line_id]
//!                       ▼       ▼
//!                  CartLineView (product + totals + promotions)
//!
//!   coupon_codes ─────► couponCodes
//!                       originalTotal / totalDiscountAmount / finalTotal
//!                       appliedPromotions
//!                       pricing: evaluated | emptyCart | degraded
//! ```

use carta_core::cart::{CartLine, CartSession};
use carta_core::evaluator::{AppliedPromotion, LinePricing, PromotionApplicationResult};
use carta_core::types::{
    CategoryId, CouponCode, CurrencyCode, CustomerId, LineId, ProductId, SalesChannel, SessionId,
    TenantId,
};
use carta_core::{Money, Percentage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// How the totals of a view were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub enum PricingStatus {
    /// Promotions were evaluated.
    Evaluated,
    /// The cart is empty; no evaluation was needed.
    EmptyCart,
    /// The catalog was unavailable; totals are undiscounted.
    Degraded,
}

/// One cart line with its price breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartLineView {
    pub line_id: LineId,
    pub product_id: ProductId,
    pub product_code: Option<String>,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: i64,
    pub category_ids: Vec<CategoryId>,
    pub original_line_total: Money,
    pub final_line_total: Money,
    pub discount_amount: Money,
    pub effective_discount: Percentage,
    pub applied_promotions: Vec<AppliedPromotion>,
}

impl CartLineView {
    fn compose(line: &CartLine, pricing: Option<&LinePricing>) -> Self {
        let original = line.subtotal();
        let (final_line_total, discount_amount, effective_discount, applied_promotions) =
            match pricing {
                Some(p) => (
                    p.final_line_total,
                    p.discount_amount,
                    p.effective_discount,
                    p.applied_promotions.clone(),
                ),
                None => (original, Money::zero(), Percentage::zero(), Vec::new()),
            };

        CartLineView {
            line_id: line.id.clone(),
            product_id: line.product_id.clone(),
            product_code: line.product_code.clone(),
            product_name: line.product_name.clone(),
            unit_price: line.unit_price,
            quantity: line.quantity,
            category_ids: line.category_ids.iter().cloned().collect(),
            original_line_total: original,
            final_line_total,
            discount_amount,
            effective_discount,
            applied_promotions,
        }
    }
}

/// A cart session with totals reflecting its current state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartSessionView {
    pub session_id: SessionId,
    pub tenant_id: TenantId,
    pub customer_id: Option<CustomerId>,
    pub sales_channel: Option<SalesChannel>,
    pub currency: CurrencyCode,
    pub items: Vec<CartLineView>,
    pub coupon_codes: Vec<CouponCode>,
    pub original_total: Money,
    pub total_discount_amount: Money,
    pub final_total: Money,
    pub applied_promotions: Vec<AppliedPromotion>,
    pub pricing: PricingStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl CartSessionView {
    /// Merges a session with its price breakdown, matching lines by id.
    pub fn compose(
        session: &CartSession,
        result: &PromotionApplicationResult,
        pricing: PricingStatus,
    ) -> Self {
        CartSessionView {
            session_id: session.id.clone(),
            tenant_id: session.tenant_id.clone(),
            customer_id: session.customer_id.clone(),
            sales_channel: session.sales_channel.clone(),
            currency: session.currency.clone(),
            items: session
                .items
                .iter()
                .map(|line| CartLineView::compose(line, result.line(&line.id)))
                .collect(),
            coupon_codes: session.coupon_codes.iter().cloned().collect(),
            original_total: result.original_total,
            total_discount_amount: result.total_discount_amount,
            final_total: result.final_total,
            applied_promotions: result.applied_promotions.clone(),
            pricing,
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }

    /// View with undiscounted totals.
    pub fn undiscounted(session: &CartSession, pricing: PricingStatus) -> Self {
        Self::compose(
            session,
            &PromotionApplicationResult::undiscounted(&session.items),
            pricing,
        )
    }

    /// Looks up a line by id.
    pub fn line(&self, line_id: &LineId) -> Option<&CartLineView> {
        self.items.iter().find(|item| &item.line_id == line_id)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
