//! Purchase amount validation.
//!
//! The caller sends `currency_amount` as arbitrary JSON. Numbers and numeric
//! strings are accepted; anything else counts as a missing amount.

use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use thiserror::Error;

/// Smallest purchase the provider accepts, in USD.
pub const MIN_AMOUNT: Decimal = Decimal::from_parts(25, 0, 0, false, 0);
/// Largest purchase the relay forwards, in USD.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);

/// A purchase amount inside `[MIN_AMOUNT, MAX_AMOUNT]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ValidAmount(Decimal);

impl ValidAmount {
    pub fn value(&self) -> Decimal {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AmountError {
    /// Missing, non-numeric, non-positive or below the minimum.
    #[error("Currency amount is required, minimum is $25")]
    BelowMinimum,
    #[error("Currency amount exceeds the maximum of $10,000")]
    AboveMaximum,
}

/// Check a raw `currency_amount` against the purchase bounds.
pub fn validate_amount(raw: Option<&Value>) -> Result<ValidAmount, AmountError> {
    let Some(amount) = raw.and_then(parse_amount) else {
        // Numbers outside the decimal range are still numbers.
        return match raw.and_then(parse_float) {
            Some(value) if value > 10_000.0 => Err(AmountError::AboveMaximum),
            _ => Err(AmountError::BelowMinimum),
        };
    };

    if amount <= Decimal::ZERO || amount < MIN_AMOUNT {
        return Err(AmountError::BelowMinimum);
    }
    if amount > MAX_AMOUNT {
        return Err(AmountError::AboveMaximum);
    }

    Ok(ValidAmount(amount.normalize()))
}

fn parse_amount(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(number) => parse_decimal(&number.to_string()),
        Value::String(text) => parse_decimal(text.trim()),
        _ => None,
    }
}

fn parse_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    if text.is_empty() {
        return None;
    }
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}
