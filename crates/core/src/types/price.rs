//! Type-safe price representation using decimal arithmetic.
//!
//! The store sells in a single currency (Indian rupees). Amounts are kept as
//! [`Decimal`] so cart totals and tax never pick up binary floating-point
//! error; rounding only happens when a bill is produced.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Mul};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// ISO 4217 currency codes the storefront knows how to display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    INR,
}

impl CurrencyCode {
    /// Display symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::INR => "₹",
        }
    }
}

/// An amount of money in the store currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Zero rupees.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Currency every price is expressed in.
    pub const CURRENCY: CurrencyCode = CurrencyCode::INR;

    /// Wrap a decimal amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Whole-rupee convenience constructor.
    #[must_use]
    pub fn from_rupees(rupees: i64) -> Self {
        Self(Decimal::from(rupees))
    }

    /// The underlying amount.
    #[must_use]
    pub const fn amount(self) -> Decimal {
        self.0
    }

    /// Strictly greater than zero.
    #[must_use]
    pub fn is_positive(self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Round to paise (two decimals), half away from zero.
    #[must_use]
    pub fn round_to_paise(self) -> Self {
        Self(
            self.0
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Multiply by a decimal rate (e.g. a tax rate) without rounding.
    #[must_use]
    pub fn scale(self, rate: Decimal) -> Self {
        Self(self.0 * rate)
    }
}

impl fmt::Display for Price {
    /// Formats as `₹126.00`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self.round_to_paise().0;
        write!(f, "{}{:.2}", Self::CURRENCY.symbol(), rounded)
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Mul<u32> for Price {
    type Output = Self;

    fn mul(self, quantity: u32) -> Self::Output {
        Self(self.0 * Decimal::from(quantity))
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap_or_default()
    }

    #[test]
    fn test_display_two_decimals() {
        assert_eq!(Price::from_rupees(45).to_string(), "₹45.00");
        assert_eq!(Price::new(dec("6.005")).to_string(), "₹6.01");
    }

    #[test]
    fn test_line_total_and_sum() {
        let lines = [Price::from_rupees(45) * 2, Price::from_rupees(30) * 1];
        let total: Price = lines.into_iter().sum();
        assert_eq!(total, Price::from_rupees(120));
    }

    #[test]
    fn test_round_half_away_from_zero() {
        assert_eq!(Price::new(dec("2.345")).round_to_paise(), Price::new(dec("2.35")));
        assert_eq!(Price::new(dec("2.344")).round_to_paise(), Price::new(dec("2.34")));
    }

    #[test]
    fn test_is_positive() {
        assert!(Price::new(dec("0.01")).is_positive());
        assert!(!Price::ZERO.is_positive());
        assert!(!Price::new(dec("-3")).is_positive());
    }
}
