//! Donation amounts and the fixed currency conversion used for `PayPal`.
//!
//! `PayPal` orders are always placed in USD. Amounts entered in another
//! currency are converted with a fixed, approximate rate table; the converted
//! figure can drift from the market rate.

use std::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::donation::DonationValidationError;

/// Currencies accepted on the donation form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Currency {
    #[default]
    USD,
    EUR,
    GBP,
    /// Central African CFA franc, the local currency for mobile money.
    XAF,
}

impl Currency {
    /// ISO 4217 code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::XAF => "XAF",
        }
    }

    /// Approximate number of units of this currency per one US dollar.
    #[must_use]
    pub fn units_per_usd(self) -> Decimal {
        match self {
            Self::USD => Decimal::ONE,
            Self::EUR => Decimal::new(92, 2),
            Self::GBP => Decimal::new(79, 2),
            Self::XAF => Decimal::from(600),
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            "XAF" => Ok(Self::XAF),
            other => Err(format!("unsupported currency: {other}")),
        }
    }
}

/// An amount together with its currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// Currency of `amount`.
    pub currency: Currency,
}

impl Money {
    /// Create a new amount.
    #[must_use]
    pub const fn new(amount: Decimal, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Convert to USD using the fixed rate table, rounded to cents.
    ///
    /// USD amounts are returned unchanged.
    ///
    /// ```
    /// use parish_core::{Currency, Money};
    /// use rust_decimal::Decimal;
    ///
    /// let usd = Money::new(Decimal::from(6000), Currency::XAF).to_usd().unwrap();
    /// assert_eq!(usd.amount, Decimal::from(10));
    /// assert_eq!(usd.currency, Currency::USD);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`DonationValidationError::AmountTooLarge`] when the division
    /// overflows, and [`DonationValidationError::AmountTooSmall`] when the
    /// converted amount rounds to zero cents.
    pub fn to_usd(self) -> Result<Self, DonationValidationError> {
        if self.currency == Currency::USD {
            return Ok(self);
        }
        let amount = self
            .amount
            .checked_div(self.currency.units_per_usd())
            .ok_or(DonationValidationError::AmountTooLarge)?
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
            .normalize();
        if amount <= Decimal::ZERO {
            return Err(DonationValidationError::AmountTooSmall);
        }
        Ok(Self::new(amount, Currency::USD))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}
