//! # carta-core: Pure Cart and Promotion Logic for Carta
//!
//! This crate holds the cart model and the promotion rule evaluator as pure
//! code with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Carta Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Callers (API layer, carta-sim)                  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ CallContext (tenant, cancellation)     │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               carta-session (async engine)                      │   │
//! │  │   CartSessionEngine ──► SessionStore ──► PromotionCatalog      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ carta-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   cart    │  │ evaluator │  │   │
//! │  │   │ TenantId  │  │   Money   │  │CartSession│  │  apply_   │  │   │
//! │  │   │CouponCode │  │Percentage │  │ CartLine  │  │promotions │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO CLOCK • NO NETWORK • PURE FUNCTIONS              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Identifiers, currency and coupon codes
//! - [`money`] - Integer-cent money and basis-point percentages
//! - [`cart`] - Cart sessions, lines and their mutations
//! - [`promotion`] - Promotions, rule conditions and discounts
//! - [`evaluator`] - The promotion rule evaluator
//! - [`error`] - Domain error types
//! - [`validation`] - Boundary input checks
//!
//! ## Example Usage
//!
//! ```rust
//! use carta_core::cart::{CartLimits, CartSession, NewCartLine, NewSession};
//! use carta_core::evaluator::{apply_promotions, PricingInput};
//! use carta_core::{Money, ProductId, TenantId};
//! use chrono::Utc;
//!
//! let now = Utc::now();
//! let mut cart = CartSession::open(TenantId::new("t1"), NewSession::default(), now);
//! cart.add_item(
//!     NewCartLine {
//!         product_id: ProductId::new("p1"),
//!         product_code: None,
//!         product_name: "Espresso".to_string(),
//!         unit_price: Money::from_cents(2550),
//!         quantity: 2,
//!         category_ids: Default::default(),
//!     },
//!     &CartLimits::default(),
//!     now,
//! )
//! .unwrap();
//!
//! let result = apply_promotions(&PricingInput::from_session(&cart, now), &[]);
//! assert_eq!(result.final_total.cents(), 5100);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod error;
pub mod evaluator;
pub mod money;
pub mod promotion;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{CartLimits, CartLine, CartSession, NewCartLine, NewSession};
pub use error::{CoreError, CoreResult, ValidationError};
pub use evaluator::{
    apply_promotions, AppliedPromotion, LinePricing, PricingInput, PromotionApplicationResult,
};
pub use money::{Money, Percentage};
pub use promotion::{Discount, Promotion, PromotionRule, RuleCondition};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum number of distinct lines in a single cart.
///
/// ## Business Reason
/// Prevents runaway carts. Deployments override it through the engine
/// configuration.
pub const MAX_CART_LINES: usize = 100;

/// Maximum quantity of a single line.
///
/// ## Business Reason
/// Catches fat-finger input (1000 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Maximum unit price in cents (999,999.99).
///
/// Keeps `MAX_CART_LINES × MAX_LINE_QUANTITY × MAX_UNIT_PRICE` far inside
/// `i64`, so cart totals never reach the saturation point of [`Money`].
pub const MAX_UNIT_PRICE: i64 = 99_999_999;

/// Maximum number of coupon codes attached to one cart.
pub const MAX_COUPON_CODES: usize = 10;

/// Maximum length of a coupon code after trimming.
pub const MAX_COUPON_CODE_LENGTH: usize = 64;
