use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Fixed fallback rate: USD price of one native unit.
pub const FALLBACK_NATIVE_USD: Decimal = dec!(5);
/// Fixed fallback rate: fiat price of one USD.
pub const FALLBACK_USD_FIAT: Decimal = dec!(35);

/// Raw exchange rates as reported by a price source.
///
/// Any leg may be missing; the oracle decides whether the table is usable or
/// the fallback quote applies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateTable {
    /// USD price of one native unit.
    pub native_usd: Option<Decimal>,
    /// Fiat price of one native unit.
    pub native_fiat: Option<Decimal>,
    /// Fiat price of one USD, read off the stable reference asset.
    pub usd_fiat: Option<Decimal>,
}

/// The quote used for a single pipeline run.
///
/// Produced fresh per run, never cached, immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// Fiat price of one native unit.
    pub native_fiat: Decimal,
    /// USD price of one native unit.
    pub native_usd: Decimal,
    /// Fiat price of one USD.
    pub usd_fiat: Decimal,
    /// True when the fixed fallback rate was substituted for a live one.
    pub is_fallback: bool,
}

impl PriceQuote {
    pub fn live(native_usd: Decimal, native_fiat: Decimal, usd_fiat: Decimal) -> Self {
        Self {
            native_fiat,
            native_usd,
            usd_fiat,
            is_fallback: false,
        }
    }

    /// Builds the fallback quote. The USD/fiat leg may still come from a
    /// live stable-asset rate when the source returned one.
    pub fn fallback(usd_fiat: Decimal) -> Self {
        Self {
            native_fiat: FALLBACK_NATIVE_USD * usd_fiat,
            native_usd: FALLBACK_NATIVE_USD,
            usd_fiat,
            is_fallback: true,
        }
    }
}
