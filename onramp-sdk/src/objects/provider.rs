//! Payload sent to the provider's create-session endpoint.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Checkout flow requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowType {
    /// Amount, commodity and wallet are fixed; the user cannot change them.
    #[serde(rename = "simple_full_restrict")]
    SimpleFullRestrict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FiatCurrency {
    Usd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Commodity {
    Btc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Bitcoin,
}

/// Outbound session-creation payload.
///
/// Built once per call and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRequest {
    pub flow_type: FlowType,
    pub currency: FiatCurrency,
    #[serde(with = "rust_decimal::serde::float")]
    pub currency_amount: Decimal,
    pub commodity: Commodity,
    pub network: Network,
    pub wallet_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}
