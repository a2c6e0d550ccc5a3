use std::collections::BTreeMap;
use std::time::Duration;

use bazaar_core::config::SearchConfig;
use bazaar_core::error::AppError;
use bazaar_core::rates::{ConversionRates, RateLookup};
use bazaar_core::traits::RateProvider;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::fetcher::send_error;

/// Exchange-rate client for `GET {endpoint}?base=XXX&symbols=A,B`.
///
/// Expects a JSON body with a `rates` object. Any failure (transport,
/// status, body shape) is reported as [`RateLookup::Unavailable`].
#[derive(Clone)]
pub struct ExchangeRateClient {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

#[derive(Deserialize)]
struct RatesResponse {
    #[serde(default)]
    rates: Option<BTreeMap<String, f64>>,
}

impl ExchangeRateClient {
    pub fn from_config(config: &SearchConfig) -> Result<Self, AppError> {
        Self::with_timeout(&config.rates_url, config.request_timeout)
    }

    pub fn with_timeout(endpoint: &str, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            timeout,
        })
    }

    fn rates_url(&self, base: &str, symbols: &[String]) -> Result<Url, AppError> {
        let mut url = Url::parse(&self.endpoint).map_err(|e| {
            AppError::ConfigError(format!("Invalid rates URL '{}': {e}", self.endpoint))
        })?;
        url.query_pairs_mut()
            .append_pair("base", base)
            .append_pair("symbols", &symbols.join(","));
        Ok(url)
    }

    async fn request(&self, base: &str, symbols: &[String]) -> Result<ConversionRates, AppError> {
        let url = self.rates_url(base, symbols)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| send_error(e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::HttpError(format!(
                "HTTP {} from rates endpoint",
                status.as_u16()
            )));
        }

        let body = response.text().await.map_err(|e| {
            AppError::HttpError(format!("Failed to read rates response: {e}"))
        })?;
        let parsed: RatesResponse = serde_json::from_str(&body)?;
        let rates = parsed
            .rates
            .ok_or_else(|| AppError::Generic("rates response has no 'rates' field".into()))?;

        Ok(ConversionRates::new(
            base,
            rates
                .into_iter()
                .filter(|(code, _)| symbols.contains(code))
                .collect(),
        ))
    }
}

impl RateProvider for ExchangeRateClient {
    async fn get_rates(&self, base: &str, symbols: &[String]) -> RateLookup {
        match self.request(base, symbols).await {
            Ok(rates) => {
                tracing::debug!(%base, count = rates.rates.len(), "Fetched exchange rates");
                RateLookup::Live(rates)
            }
            Err(e) => {
                tracing::warn!(%base, error = %e, "Exchange rates unavailable");
                RateLookup::unavailable(e.to_string())
            }
        }
    }
}
