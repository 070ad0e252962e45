//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every amount in the till is stored in cents (2-decimal precision).     │
//! │                                                                         │
//! │    Sale.total      = Σ quantity × unit_price      (exact, no drift)     │
//! │    Till.cash_sales = Σ Sale.total where cash      (exact, no drift)     │
//! │    net of VAT      = gross × 10000 / (10000 + bps) (rounded half up)    │
//! │                                                                         │
//! │  Only division (VAT extraction, averages) rounds, and it rounds once.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use caja_core::money::Money;
//!
//! let price = Money::from_cents(250_000); // $2500.00
//! let line = price.multiply_quantity(2);  // $5000.00
//! assert_eq!(line.cents(), 500_000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::types::VatRate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Where Money Flows
/// ```text
/// Product.sale_price_cents ──► SaleLine.unit_price ──► SaleLine.line_total
///                                                          │
///                                                          ▼
///                          Sale.total ──► Till.cash/debit/credit/transfer
///                                                          │
///                                                          ▼
///                            Till.closing_cash = opening_float + cash_sales
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ```rust
    /// use caja_core::money::Money;
    ///
    /// let float = Money::from_cents(500_000); // $5000.00 opening float
    /// assert_eq!(float.cents(), 500_000);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// ```rust
    /// use caja_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_minor(2500, 0).cents(), 250_000);
    /// assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    /// ```
    ///
    /// For negative amounts only the major unit carries the sign.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Creates a Money value from whole currency units.
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Money(units * 100)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn units(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies a unit price by a line quantity.
    ///
    /// ```rust
    /// use caja_core::money::Money;
    ///
    /// let unit = Money::from_units(2500);
    /// assert_eq!(unit.multiply_quantity(2), Money::from_units(5000));
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    /// `self × qty`, or `None` on overflow.
    #[inline]
    pub const fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// `self + other`, or `None` on overflow.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// `self + other`, clamped to the representable range.
    #[inline]
    pub const fn saturating_add(&self, other: Money) -> Self {
        Money(self.0.saturating_add(other.0))
    }

    /// Returns `self - other`, floored at zero.
    ///
    /// Used for the change handed back on a cash sale:
    /// `change = max(0, tendered - total)`.
    #[inline]
    pub fn saturating_sub_to_zero(self, other: Money) -> Money {
        Money(self.0.saturating_sub(other.0).max(0))
    }

    /// Extracts the amount net of VAT from a VAT-inclusive gross amount.
    ///
    /// `net = gross × 10000 / (10000 + bps)`, rounded half away from zero.
    ///
    /// ```rust
    /// use caja_core::money::Money;
    /// use caja_core::types::VatRate;
    ///
    /// let gross = Money::from_units(11_900);
    /// assert_eq!(gross.net_of_vat(VatRate::from_bps(1900)), Money::from_units(10_000));
    /// ```
    pub fn net_of_vat(&self, rate: VatRate) -> Money {
        let divisor = 10_000i128 + rate.bps() as i128;
        Money(div_round_half_up(self.0 as i128 * 10_000, divisor) as i64)
    }

    /// The VAT portion contained in a VAT-inclusive gross amount.
    pub fn vat_portion(&self, rate: VatRate) -> Money {
        *self - self.net_of_vat(rate)
    }

    /// Divides evenly across `count` items, rounded half up.
    ///
    /// Returns zero when `count` is zero (e.g. average ticket of an empty day).
    pub fn average_over(&self, count: i64) -> Money {
        if count == 0 {
            return Money::zero();
        }
        Money(div_round_half_up(self.0 as i128, count as i128) as i64)
    }

    /// Expresses `self` as a share of `whole` in basis points (1% = 100 bps).
    ///
    /// Returns 0 when `whole` is not positive.
    pub fn ratio_bps(&self, whole: Money) -> i64 {
        if whole.0 <= 0 {
            return 0;
        }
        div_round_half_up(self.0 as i128 * 10_000, whole.0 as i128) as i64
    }
}

/// Integer division rounding half away from zero.
pub(crate) fn div_round_half_up(numerator: i128, denominator: i128) -> i128 {
    let half = denominator.abs() / 2;
    if (numerator >= 0) == (denominator > 0) {
        (numerator.abs() + half) / denominator.abs()
    } else {
        -((numerator.abs() + half) / denominator.abs())
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// For logs and debugging. Locale formatting belongs to the frontend.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}${}.{:02}", sign, self.units().abs(), self.cents_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
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
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.units(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "$10.99");
        assert_eq!(format!("{}", Money::from_units(12_000)), "$12000.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-$5.50");
        assert_eq!(format!("{}", Money::zero()), "$0.00");
    }

    #[test]
    fn test_arithmetic_and_sum() {
        let a = Money::from_units(2500);
        let b = Money::from_units(2000);

        assert_eq!(a * 2 + b, Money::from_units(7000));
        assert_eq!(a - b, Money::from_units(500));

        let total: Money = [a, a, b].iter().sum();
        assert_eq!(total, Money::from_units(7000));
    }

    #[test]
    fn test_change_is_floored_at_zero() {
        let tendered = Money::from_units(9500);
        let total = Money::from_units(7000);
        assert_eq!(tendered.saturating_sub_to_zero(total), Money::from_units(2500));
        assert_eq!(total.saturating_sub_to_zero(tendered), Money::zero());
    }

    #[test]
    fn test_net_of_vat_rounds_half_up() {
        let vat = VatRate::from_bps(1900);
        assert_eq!(Money::from_units(1190).net_of_vat(vat), Money::from_units(1000));
        // 100.00 / 1.19 = 84.0336... → 84.03
        assert_eq!(Money::from_units(100).net_of_vat(vat).cents(), 8403);
        assert_eq!(Money::from_units(100).vat_portion(vat).cents(), 1597);
        assert_eq!(Money::zero().net_of_vat(vat), Money::zero());
    }

    #[test]
    fn test_average_over() {
        assert_eq!(Money::from_cents(1000).average_over(3).cents(), 333);
        assert_eq!(Money::from_cents(1001).average_over(2).cents(), 501);
        assert_eq!(Money::from_cents(1000).average_over(0), Money::zero());
    }

    #[test]
    fn test_ratio_bps() {
        let part = Money::from_units(25);
        assert_eq!(part.ratio_bps(Money::from_units(100)), 2500);
        assert_eq!(part.ratio_bps(Money::zero()), 0);
        assert_eq!(Money::from_units(-10).ratio_bps(Money::from_units(100)), -1000);
    }

    #[test]
    fn test_checked_arithmetic_reports_overflow() {
        let huge = Money::from_cents(i64::MAX / 2);
        assert_eq!(huge.checked_multiply_quantity(3), None);
        assert_eq!(huge.checked_add(huge).map(|m| m.cents()), Some(i64::MAX - 1));
        assert_eq!(huge.checked_add(huge + Money::from_cents(2)), None);
        assert_eq!(Money::from_cents(250).checked_multiply_quantity(4), Some(Money::from_cents(1000)));
        assert_eq!(Money::from_cents(i64::MAX).saturating_add(Money::from_cents(1)).cents(), i64::MAX);
    }
}
