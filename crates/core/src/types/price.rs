//! Type-safe price representation using decimal arithmetic.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price with currency information.
///
/// Amounts are kept in the currency's standard unit (pesos, not centavos)
/// and stored as `NUMERIC(12, 2)` in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit.
    pub amount: Decimal,
    /// ISO 4217 currency code.
    #[serde(default)]
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Create a price in Argentine pesos, the shop's currency.
    #[must_use]
    pub const fn ars(amount: Decimal) -> Self {
        Self::new(amount, CurrencyCode::ARS)
    }

    /// A zero amount in the given currency.
    #[must_use]
    pub const fn zero(currency_code: CurrencyCode) -> Self {
        Self::new(Decimal::ZERO, currency_code)
    }

    /// Price of `quantity` units at this unit price.
    #[must_use]
    pub fn line_total(&self, quantity: u32) -> Self {
        Self::new(self.amount * Decimal::from(quantity), self.currency_code)
    }

    /// Add another amount of the same currency.
    ///
    /// Returns `None` when currencies differ or the sum overflows.
    #[must_use]
    pub fn checked_add(&self, other: &Self) -> Option<Self> {
        if self.currency_code != other.currency_code {
            return None;
        }
        self.amount
            .checked_add(other.amount)
            .map(|amount| Self::new(amount, self.currency_code))
    }

    /// Format for display using Argentine conventions, e.g. `$ 12.500,00`.
    #[must_use]
    pub fn display(&self) -> String {
        let rounded = self.amount.round_dp(2);
        let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
            "-"
        } else {
            ""
        };
        let plain = format!("{:.2}", rounded.abs());
        let (int_part, frac_part) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));

        format!(
            "{sign}{} {},{frac_part}",
            self.currency_code.symbol(),
            group_thousands(int_part)
        )
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}

/// ISO 4217 currency codes accepted by the shop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    ARS,
    USD,
}

impl CurrencyCode {
    /// Currency symbol as printed on price tags.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::ARS => "$",
            Self::USD => "US$",
        }
    }

    /// ISO code, as sent to the payment gateway.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ARS => "ARS",
            Self::USD => "USD",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_display_groups_thousands() {
        assert_eq!(Price::ars(Decimal::new(1_250_050, 2)).display(), "$ 12.500,50");
        assert_eq!(Price::ars(Decimal::new(999, 0)).display(), "$ 999,00");
        assert_eq!(Price::ars(Decimal::new(1_000_000, 0)).display(), "$ 1.000.000,00");
        assert_eq!(
            Price::new(Decimal::new(15, 1), CurrencyCode::USD).display(),
            "US$ 1,50"
        );
    }

    #[test]
    fn test_display_rounds_to_cents() {
        assert_eq!(Price::ars(Decimal::new(10_005, 3)).display(), "$ 10,00");
        assert_eq!(Price::ars(Decimal::new(-2500, 0)).display(), "-$ 2.500,00");
    }

    #[test]
    fn test_line_total() {
        let unit = Price::ars(Decimal::new(3_450, 0));
        assert_eq!(unit.line_total(3).amount, Decimal::new(10_350, 0));
        assert_eq!(unit.line_total(0).amount, Decimal::ZERO);
    }

    #[test]
    fn test_checked_add_requires_same_currency() {
        let a = Price::ars(Decimal::new(100, 0));
        let b = Price::new(Decimal::new(1, 0), CurrencyCode::USD);
        assert!(a.checked_add(&b).is_none());
        assert_eq!(
            a.checked_add(&a).map(|p| p.amount),
            Some(Decimal::new(200, 0))
        );
    }
}
