use crate::config::ProviderConfig;
use crate::validator::ValidAmount;
use onramp_sdk::objects::{Commodity, FiatCurrency, FlowType, Network, SessionRequest};

/// Build the provider payload for a validated purchase.
///
/// `phone` is forwarded only when it carries something other than whitespace.
pub fn build_session_request(
    amount: &ValidAmount,
    phone: Option<&str>,
    config: &ProviderConfig,
) -> SessionRequest {
    let phone = phone
        .map(str::trim)
        .filter(|phone| !phone.is_empty())
        .map(str::to_owned);

    SessionRequest {
        flow_type: FlowType::SimpleFullRestrict,
        currency: FiatCurrency::Usd,
        currency_amount: amount.value(),
        commodity: Commodity::Btc,
        network: Network::Bitcoin,
        wallet_address: config.wallet_address.clone(),
        phone,
    }
}
