use crate::domain::ports::PriceSource;
use crate::domain::quote::RateTable;
use crate::error::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;
use std::time::Duration;

/// Price-source asset id of the chain's native token.
const NATIVE_ASSET_ID: &str = "monad";
/// Stable reference asset used to read the USD/fiat rate.
const STABLE_ASSET_ID: &str = "tether";
/// Fiat currency of the fixed payment amount.
const FIAT_CURRENCY: &str = "try";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Fetches exchange rates from a CoinGecko-shaped simple-price endpoint.
///
/// One GET per call; a non-success status or unparsable body surfaces as an
/// error here and becomes the oracle's fallback branch. Missing individual
/// rates are reported as `None` legs, not errors.
pub struct HttpPriceSource {
    client: reqwest::Client,
    url: String,
}

impl HttpPriceSource {
    pub fn new(base_url: &str) -> Self {
        let url = format!(
            "{base_url}/simple/price?ids={NATIVE_ASSET_ID},{STABLE_ASSET_ID}&vs_currencies={FIAT_CURRENCY},usd"
        );
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }

    fn rate(body: &Value, asset: &str, currency: &str) -> Option<Decimal> {
        let raw = body.get(asset)?.get(currency)?.as_f64()?;
        Decimal::try_from(raw).ok()
    }
}

impl Default for HttpPriceSource {
    fn default() -> Self {
        Self::new("https://api.coingecko.com/api/v3")
    }
}

#[async_trait]
impl PriceSource for HttpPriceSource {
    async fn fetch_rates(&self) -> Result<RateTable> {
        let response = self
            .client
            .get(&self.url)
            .header("Accept", "application/json")
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?
            .error_for_status()?;

        let body: Value = response.json().await?;
        Ok(RateTable {
            native_usd: Self::rate(&body, NATIVE_ASSET_ID, "usd"),
            native_fiat: Self::rate(&body, NATIVE_ASSET_ID, FIAT_CURRENCY),
            usd_fiat: Self::rate(&body, STABLE_ASSET_ID, FIAT_CURRENCY),
        })
    }
}
