use std::str::FromStr;
use std::time::Duration;

use crate::error::AppError;

const DEFAULT_BASE_ORIGIN: &str = "https://cnfans.shop";
const DEFAULT_SEARCH_PATH: &str = "/search";
const DEFAULT_QUERY_PARAM: &str = "q";
const DEFAULT_RATES_URL: &str = "https://api.exchangerate.host/latest";
const DEFAULT_AUX_HOST: &str = "docs.google.com/spreadsheets";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_RATES_TTL: Duration = Duration::from_secs(3600);
const DEFAULT_ENRICH_CONCURRENCY: usize = 4;

/// A target currency and the factor used when no live rate is available.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetCurrency {
    pub code: String,
    pub fallback_factor: f64,
}

impl TargetCurrency {
    pub fn new(code: impl Into<String>, fallback_factor: f64) -> Self {
        Self {
            code: code.into(),
            fallback_factor,
        }
    }
}

/// Base currency of the catalog plus the currencies prices are converted to.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrencyConfig {
    pub base: String,
    pub targets: Vec<TargetCurrency>,
}

impl CurrencyConfig {
    /// Target currency codes, in configured order.
    pub fn symbols(&self) -> Vec<String> {
        self.targets.iter().map(|t| t.code.clone()).collect()
    }
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self {
            base: "CNY".to_string(),
            targets: vec![
                TargetCurrency::new("USD", 0.14),
                TargetCurrency::new("EUR", 0.13),
            ],
        }
    }
}

/// Site and pipeline settings.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Scheme + host of the catalog, without a trailing slash.
    pub base_origin: String,
    pub search_path: String,
    pub query_param: String,
    /// Applied to every listing, detail and rate request.
    pub request_timeout: Duration,
    pub rates_url: String,
    /// Freshness window for cached conversion rates.
    pub rates_ttl: Duration,
    /// Substring identifying auxiliary document links on detail pages.
    pub aux_host_pattern: String,
    /// Maximum detail pages fetched at once during enrichment.
    pub enrich_concurrency: usize,
    pub currencies: CurrencyConfig,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_origin: DEFAULT_BASE_ORIGIN.to_string(),
            search_path: DEFAULT_SEARCH_PATH.to_string(),
            query_param: DEFAULT_QUERY_PARAM.to_string(),
            request_timeout: DEFAULT_TIMEOUT,
            rates_url: DEFAULT_RATES_URL.to_string(),
            rates_ttl: DEFAULT_RATES_TTL,
            aux_host_pattern: DEFAULT_AUX_HOST.to_string(),
            enrich_concurrency: DEFAULT_ENRICH_CONCURRENCY,
            currencies: CurrencyConfig::default(),
        }
    }
}

impl SearchConfig {
    /// Read overrides from environment variables, falling back to defaults.
    ///
    /// - `BAZAAR_BASE_ORIGIN`, `BAZAAR_SEARCH_PATH`, `BAZAAR_QUERY_PARAM`
    /// - `BAZAAR_TIMEOUT_SECS` (defaults to 10)
    /// - `BAZAAR_RATES_URL`, `BAZAAR_RATES_TTL_SECS` (defaults to 3600)
    /// - `BAZAAR_AUX_HOST`
    /// - `BAZAAR_ENRICH_CONCURRENCY` (defaults to 4, must be at least 1)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source.
    pub fn from_lookup<L>(lookup: L) -> Result<Self, AppError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(origin) = lookup("BAZAAR_BASE_ORIGIN") {
            config.base_origin = origin.trim_end_matches('/').to_string();
        }
        if let Some(path) = lookup("BAZAAR_SEARCH_PATH") {
            config.search_path = path;
        }
        if let Some(param) = lookup("BAZAAR_QUERY_PARAM") {
            config.query_param = param;
        }
        if let Some(url) = lookup("BAZAAR_RATES_URL") {
            config.rates_url = url;
        }
        if let Some(host) = lookup("BAZAAR_AUX_HOST") {
            config.aux_host_pattern = host;
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "BAZAAR_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "BAZAAR_RATES_TTL_SECS")? {
            config.rates_ttl = Duration::from_secs(secs);
        }
        if let Some(n) = parse_var::<usize, _>(&lookup, "BAZAAR_ENRICH_CONCURRENCY")? {
            if n == 0 {
                return Err(AppError::ConfigError(
                    "BAZAAR_ENRICH_CONCURRENCY must be at least 1".into(),
                ));
            }
            config.enrich_concurrency = n;
        }

        Ok(config)
    }
}

fn parse_var<T, L>(lookup: &L, name: &str) -> Result<Option<T>, AppError>
where
    T: FromStr,
    L: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|_| {
            AppError::ConfigError(format!(
                "Invalid {name} '{raw}': must be a non-negative integer"
            ))
        }),
    }
}
