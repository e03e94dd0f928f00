//! # Money Module
//!
//! Provides the `Money` and `Percentage` types used by every price in a cart.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Binary floats drift                                                    │
//! │                                                                         │
//! │  With binary floats:                                                    │
//! │    25.50 × 2 − 10% = 45.900000000000006  ❌ WRONG!                      │
//! │                                                                         │
//! │  Integer minor units don't                                              │
//! │    2550 × 2 = 5100 cents, 10% of 5100 = 510 cents → 4590 cents          │
//! │    Every rounding step is explicit and happens exactly once             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use carta_core::money::{Money, Percentage};
//!
//! let unit_price = Money::from_cents(2550); // 25.50
//! let line_total = unit_price.multiply_quantity(2);
//! assert_eq!(line_total.cents(), 5100);
//!
//! let discount = line_total.percentage_of(Percentage::from_bps(1000)); // 10%
//! assert_eq!(discount.cents(), 510);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use ts_rs::TS;

/// Basis points in 100%.
pub const BPS_SCALE: i64 = 10_000;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents for EUR/USD).
///
/// ## Design Decisions
/// - **i64 (signed)**: subtraction never wraps; discount clamping keeps
///   line totals at or above zero, so negatives only appear transiently
/// - **Currency-free**: the currency code lives on the cart session; a
///   session never mixes currencies
/// - **Serialized as a bare integer**: `{"unitPrice": 2550}`
///
/// ## Where Money Flows
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  CartLine.unit_price ──► line subtotal ──► promotion discounts          │
/// │                                │                   │                    │
/// │                                ▼                   ▼                    │
/// │                       original_total      final_line_total (≥ 0)        │
/// │                                                    │                    │
/// │                                                    ▼                    │
/// │                                              final_total                │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Wraps an amount already expressed in cents.
    ///
    /// ```rust
    /// use carta_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // 10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// ```rust
    /// use carta_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_minor(25, 50).cents(), 2550);
    /// ```
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Zero cents.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Strictly above zero.
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Strictly below zero.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies a unit price by a quantity.
    ///
    /// Saturates instead of overflowing; validation caps quantities far
    /// below the point where this matters.
    ///
    /// ```rust
    /// use carta_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299);
    /// assert_eq!(unit_price.multiply_quantity(3).cents(), 897);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    /// Returns `rate` of this amount, rounded half-up to the nearest cent.
    ///
    /// ## Rounding
    /// Integer math only: `(amount × bps + 5000) / 10000`. The +5000 is the
    /// half-cent that turns truncation into round-half-up.
    ///
    /// ```text
    /// 10.00 × 10%    = 1.00     → 100 cents
    /// 0.99  × 12.5%  = 0.12375  → 12 cents
    /// 0.05  × 50%    = 0.025    → 3 cents (half rounds up)
    /// ```
    ///
    /// ```rust
    /// use carta_core::money::{Money, Percentage};
    ///
    /// let subtotal = Money::from_cents(1000);
    /// let discount = subtotal.percentage_of(Percentage::from_bps(1000));
    /// assert_eq!(discount.cents(), 100);
    /// ```
    pub fn percentage_of(&self, rate: Percentage) -> Money {
        // i128 keeps large line totals from overflowing the product
        let scaled = (self.0 as i128 * rate.bps() as i128 + (BPS_SCALE as i128 / 2))
            / BPS_SCALE as i128;
        Money(scaled as i64)
    }

    /// Returns what share of `whole` this amount is, as a percentage.
    ///
    /// Returns zero when `whole` is zero or negative.
    ///
    /// ```rust
    /// use carta_core::money::Money;
    ///
    /// let discount = Money::from_cents(100);
    /// let whole = Money::from_cents(1000);
    /// assert_eq!(discount.share_of(whole).bps(), 1000); // 10%
    /// ```
    pub fn share_of(&self, whole: Money) -> Percentage {
        if whole.0 <= 0 || self.0 <= 0 {
            return Percentage::zero();
        }
        let bps = (self.0 as i128 * BPS_SCALE as i128 + whole.0 as i128 / 2) / whole.0 as i128;
        Percentage::from_bps(u32::try_from(bps).unwrap_or(u32::MAX))
    }

    /// Returns the smaller of two amounts.
    #[inline]
    pub fn min(self, other: Money) -> Money {
        Money(self.0.min(other.0))
    }

    /// Returns the amount, or zero if it is negative.
    #[inline]
    pub const fn clamp_non_negative(self) -> Money {
        if self.0 < 0 {
            Money(0)
        } else {
            self
        }
    }
}

/// Human-readable amount without a currency symbol ("25.50", "-5.50").
///
/// The session carries the currency code; formatting with a symbol is a
/// client concern.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor())
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Percentage
// =============================================================================

/// A percentage in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000, so 1000 bps = 10% and 1250 bps = 12.5%.
/// Promotion values and the reported effective discount both use this unit.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Percentage(u32);

impl Percentage {
    /// 100%.
    pub const FULL: Percentage = Percentage(BPS_SCALE as u32);

    /// Creates a percentage from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Percentage(bps)
    }

    /// Creates a percentage from a whole-number percent (10 → 10%).
    #[inline]
    pub const fn from_percent(percent: u32) -> Self {
        Percentage(percent.saturating_mul(100))
    }

    /// Returns the value in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Zero percent.
    #[inline]
    pub const fn zero() -> Self {
        Percentage(0)
    }

    /// Checks if the percentage is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
