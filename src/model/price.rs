//! Price type for handling the monetary values typed into chat messages and read back from the
//! ledger.
//!
//! This module provides the `Price` type which wraps `Decimal` and handles parsing values that may
//! or may not include a dollar sign and commas.

use rust_decimal::Decimal;
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

/// Represents a non-negative amount of money.
///
/// Parsing is lenient about presentation: surrounding whitespace, a leading dollar sign and
/// thousands separators are accepted, because the ledger renders its cells that way. Negative
/// values are rejected.
///
/// # Examples
///
/// ```
/// # use expense_bot::model::Price;
/// # use std::str::FromStr;
/// let price = Price::from_str("$1,250.5").unwrap();
/// assert_eq!(price.to_string(), "1250.50");
/// ```
///
/// ```
/// # use expense_bot::model::Price;
/// # use std::str::FromStr;
/// assert!(Price::from_str("-3").is_err());
/// assert!(Price::from_str("abc").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Price(Decimal);

impl Price {
    pub const ZERO: Price = Price(Decimal::ZERO);

    /// Creates a new `Price`. Returns `None` if `value` is negative.
    pub fn new(value: Decimal) -> Option<Self> {
        if value.is_zero() {
            Some(Self::ZERO)
        } else if value.is_sign_negative() {
            None
        } else {
            Some(Self(value))
        }
    }

    /// Returns the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Returns true if the price is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Adds two prices. Returns `None` if the sum does not fit in a `Decimal`.
    pub fn checked_add(self, rhs: Price) -> Option<Price> {
        self.0.checked_add(rhs.0).map(Price)
    }
}

/// An error that can occur when parsing strings into `Price` values.
pub enum PriceError {
    Decimal(rust_decimal::Error),
    Negative(String),
}

impl Debug for PriceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PriceError::Decimal(e) => Debug::fmt(e, f),
            PriceError::Negative(s) => write!(f, "Negative({s:?})"),
        }
    }
}

impl Display for PriceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PriceError::Decimal(e) => Display::fmt(e, f),
            PriceError::Negative(s) => write!(f, "A price cannot be negative, got '{s}'"),
        }
    }
}

impl std::error::Error for PriceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PriceError::Decimal(e) => Some(e),
            PriceError::Negative(_) => None,
        }
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(Price::ZERO);
        }

        let without_dollar = trimmed.strip_prefix('$').unwrap_or(trimmed);
        let without_commas = without_dollar.replace(',', "");

        let value = Decimal::from_str(&without_commas).map_err(PriceError::Decimal)?;
        Price::new(value).ok_or_else(|| PriceError::Negative(trimmed.to_string()))
    }
}

impl Display for Price {
    /// Always renders two decimal places, e.g. `17.75` or `3.00`.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0.round_dp(2))
    }
}
