//! Money and currency types

use crate::error::{GatewayError, GatewayResult};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Currencies the API charges in whole units.
///
/// See <https://support.stripe.com/questions/which-zero-decimal-currencies-does-stripe-support>.
pub const ZERO_DECIMAL_CURRENCIES: [&str; 15] = [
    "BIF", "CLP", "DJF", "GNF", "JPY", "KMF", "KRW", "MGA", "PYG", "RWF", "VND", "VUV", "XAF",
    "XOF", "XPF",
];

/// ISO 4217 currency code, stored upper case
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    /// Parse a three letter code, case insensitive
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
            Some(Self(code.to_ascii_uppercase()))
        } else {
            None
        }
    }

    pub fn code(&self) -> &str {
        &self.0
    }

    /// Is a zero-decimal currency
    pub fn is_zero_decimal(&self) -> bool {
        ZERO_DECIMAL_CURRENCIES.contains(&self.0.as_str())
    }

    /// Minor-unit exponent as the API sees it
    pub fn decimals(&self) -> u32 {
        if self.is_zero_decimal() { 0 } else { 2 }
    }
}

impl FromStr for Currency {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s).ok_or_else(|| GatewayError::InvalidCurrency(s.to_string()))
    }
}

impl TryFrom<String> for Currency {
    type Error = GatewayError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Convert a donation amount to the integer the API expects.
///
/// Zero-decimal currencies pass through unchanged, everything else is
/// multiplied by 100. Sub-unit remainders are rounded half away from zero.
pub fn format_amount(amount: Decimal, currency: &Currency) -> GatewayResult<i64> {
    let scaled = if currency.is_zero_decimal() {
        amount
    } else {
        amount
            .checked_mul(Decimal::ONE_HUNDRED)
            .ok_or_else(|| GatewayError::InvalidAmount(amount.to_string()))?
    };

    scaled
        .round_dp_with_strategy(0, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| GatewayError::InvalidAmount(amount.to_string()))
}

/// Amount in the smallest unit the API charges in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub amount: i64,
    pub currency: Currency,
}

impl Money {
    pub fn new(amount: i64, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Create from a donation amount such as `25.00`
    pub fn from_decimal(amount: Decimal, currency: Currency) -> GatewayResult<Self> {
        let amount = format_amount(amount, &currency)?;
        Ok(Self { amount, currency })
    }

    pub fn to_decimal(&self) -> Decimal {
        let mut value = Decimal::from(self.amount);
        if !self.currency.is_zero_decimal() {
            value /= Decimal::ONE_HUNDRED;
        }
        value
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.prec$} {}",
            self.to_decimal(),
            self.currency,
            prec = self.currency.decimals() as usize
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn currency(code: &str) -> Currency {
        Currency::from_code(code).unwrap()
    }

    #[test]
    fn test_zero_decimal_amounts_pass_through() {
        assert_eq!(format_amount(dec!(1000), &currency("JPY")).unwrap(), 1000);
        assert_eq!(format_amount(dec!(50000), &currency("vnd")).unwrap(), 50000);
    }

    #[test]
    fn test_two_decimal_amounts_are_scaled() {
        assert_eq!(format_amount(dec!(10.00), &currency("USD")).unwrap(), 1000);
        assert_eq!(format_amount(dec!(29.99), &currency("EUR")).unwrap(), 2999);
        assert_eq!(format_amount(dec!(0.005), &currency("USD")).unwrap(), 1);
    }

    #[test]
    fn test_zero_decimal_list() {
        for code in ZERO_DECIMAL_CURRENCIES {
            assert!(currency(code).is_zero_decimal(), "{code}");
        }
        assert!(!currency("USD").is_zero_decimal());
        assert!(!currency("KHR").is_zero_decimal());
    }

    #[test]
    fn test_currency_parsing() {
        assert_eq!(currency("usd").code(), "USD");
        assert!(Currency::from_code("US").is_none());
        assert!(Currency::from_code("U$D").is_none());
        assert!("dollars".parse::<Currency>().is_err());
    }

    #[test]
    fn test_money_display() {
        let money = Money::from_decimal(dec!(25), currency("USD")).unwrap();
        assert_eq!(money.amount, 2500);
        assert_eq!(money.to_string(), "25.00 USD");

        let yen = Money::new(1000, currency("JPY"));
        assert_eq!(yen.to_string(), "1000 JPY");
    }
}
