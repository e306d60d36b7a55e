use crate::domain::amount::Amount;
use crate::domain::ports::PriceSourceBox;
use crate::domain::quote::{FALLBACK_USD_FIAT, PriceQuote};
use rust_decimal::Decimal;

/// Converts a fiat amount to the chain's native unit.
///
/// The fallback path is the guaranteed terminal branch: any fetch failure,
/// non-success response, or missing native-asset rate produces the fixed
/// fallback quote instead of an error. `quote` therefore never fails.
pub struct PriceOracle {
    source: PriceSourceBox,
}

impl PriceOracle {
    pub fn new(source: PriceSourceBox) -> Self {
        Self { source }
    }

    /// Quotes `fiat_amount` in native units.
    ///
    /// `native_amount = fiat_amount / quote.native_fiat`, decimal division
    /// with no rounding; four-decimal formatting is presentation-only.
    pub async fn quote(&self, fiat_amount: Amount) -> (Decimal, PriceQuote) {
        let quote = match self.source.fetch_rates().await {
            Ok(rates) => {
                // The USD/fiat leg stays live even when the native asset is
                // missing from the response.
                let usd_fiat = rates.usd_fiat.unwrap_or(FALLBACK_USD_FIAT);
                match (rates.native_usd, rates.native_fiat) {
                    // A zero or negative rate is unusable as a divisor and
                    // counts as missing.
                    (Some(native_usd), Some(native_fiat))
                        if native_usd > Decimal::ZERO && native_fiat > Decimal::ZERO =>
                    {
                        tracing::debug!(%native_usd, %native_fiat, %usd_fiat, "live rates");
                        PriceQuote::live(native_usd, native_fiat, usd_fiat)
                    }
                    _ => {
                        tracing::warn!("price source missing native asset rate, using fallback");
                        PriceQuote::fallback(usd_fiat)
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "price fetch failed, using fallback");
                PriceQuote::fallback(FALLBACK_USD_FIAT)
            }
        };

        let native_amount = fiat_amount.value() / quote.native_fiat;
        (native_amount, quote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::PriceSource;
    use crate::domain::quote::{FALLBACK_NATIVE_USD, RateTable};
    use crate::error::{PaymentError, Result};
    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    struct FixedSource(RateTable);

    #[async_trait]
    impl PriceSource for FixedSource {
        async fn fetch_rates(&self) -> Result<RateTable> {
            Ok(self.0.clone())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl PriceSource for FailingSource {
        async fn fetch_rates(&self) -> Result<RateTable> {
            Err(PaymentError::Rpc("connection refused".to_string()))
        }
    }

    fn fiat(v: Decimal) -> Amount {
        Amount::new(v).unwrap()
    }

    #[tokio::test]
    async fn test_live_quote() {
        let oracle = PriceOracle::new(Box::new(FixedSource(RateTable {
            native_usd: Some(dec!(4)),
            native_fiat: Some(dec!(100)),
            usd_fiat: Some(dec!(25)),
        })));

        let (native, quote) = oracle.quote(fiat(dec!(50))).await;
        assert!(!quote.is_fallback);
        assert_eq!(native, dec!(0.5));
        assert_eq!(quote.native_fiat, dec!(100));
    }

    #[tokio::test]
    async fn test_fallback_on_source_failure() {
        let oracle = PriceOracle::new(Box::new(FailingSource));
        let (native, quote) = oracle.quote(fiat(dec!(50))).await;

        assert!(quote.is_fallback);
        assert_eq!(native, dec!(50) / (FALLBACK_NATIVE_USD * FALLBACK_USD_FIAT));
    }

    #[tokio::test]
    async fn test_zero_native_rate_takes_the_fallback_branch() {
        let oracle = PriceOracle::new(Box::new(FixedSource(RateTable {
            native_usd: Some(dec!(5)),
            native_fiat: Some(dec!(0)),
            usd_fiat: Some(dec!(35)),
        })));

        let (native, quote) = oracle.quote(fiat(dec!(50))).await;
        assert!(quote.is_fallback);
        assert_eq!(native, dec!(50) / (FALLBACK_NATIVE_USD * dec!(35)));
    }

    #[tokio::test]
    async fn test_negative_native_rate_takes_the_fallback_branch() {
        let oracle = PriceOracle::new(Box::new(FixedSource(RateTable {
            native_usd: Some(dec!(-1)),
            native_fiat: Some(dec!(-180)),
            usd_fiat: Some(dec!(35)),
        })));

        let (_, quote) = oracle.quote(fiat(dec!(50))).await;
        assert!(quote.is_fallback);
    }

    #[tokio::test]
    async fn test_fallback_on_missing_native_rate_keeps_live_usd_leg() {
        let oracle = PriceOracle::new(Box::new(FixedSource(RateTable {
            native_usd: None,
            native_fiat: None,
            usd_fiat: Some(dec!(40)),
        })));

        let (native, quote) = oracle.quote(fiat(dec!(50))).await;
        assert!(quote.is_fallback);
        assert_eq!(quote.usd_fiat, dec!(40));
        assert_eq!(native, dec!(50) / (FALLBACK_NATIVE_USD * dec!(40)));
    }
}
