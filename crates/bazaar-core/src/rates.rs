use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::CurrencyConfig;

/// Conversion factors relative to one base currency.
///
/// May be partially populated; [`convert_price`] fills the gaps from the
/// static fallback factors in [`CurrencyConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionRates {
    pub base: String,
    pub rates: BTreeMap<String, f64>,
}

impl ConversionRates {
    pub fn new(base: impl Into<String>, rates: BTreeMap<String, f64>) -> Self {
        Self {
            base: base.into(),
            rates,
        }
    }

    /// Factor for `code`, ignoring zero, negative and non-finite entries.
    pub fn factor(&self, code: &str) -> Option<f64> {
        self.rates
            .get(code)
            .copied()
            .filter(|f| f.is_finite() && *f > 0.0)
    }
}

/// Result of asking a [`RateProvider`](crate::traits::RateProvider) for rates.
#[derive(Debug, Clone, PartialEq)]
pub enum RateLookup {
    Live(ConversionRates),
    Unavailable { reason: String },
}

impl RateLookup {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        RateLookup::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn rates(&self) -> Option<&ConversionRates> {
        match self {
            RateLookup::Live(rates) => Some(rates),
            RateLookup::Unavailable { .. } => None,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, RateLookup::Live(_))
    }
}

/// Convert a base-currency price into every configured target currency.
///
/// Uses the live factor when present and valid, otherwise the target's
/// static fallback factor. The result always has exactly one entry per
/// configured target.
pub fn convert_price(
    price: f64,
    lookup: &RateLookup,
    currencies: &CurrencyConfig,
) -> BTreeMap<String, f64> {
    let live = lookup.rates();
    currencies
        .targets
        .iter()
        .map(|target| {
            let factor = live
                .and_then(|r| r.factor(&target.code))
                .unwrap_or(target.fallback_factor);
            (target.code.clone(), price * factor)
        })
        .collect()
}
