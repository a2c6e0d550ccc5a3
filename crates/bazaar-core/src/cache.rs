//! TTL caches for the two remote lookups a session repeats.
//!
//! Both are decorators over the I/O traits, so a pipeline opts into caching
//! by wrapping its fetcher or rate provider; nothing is cached implicitly.

use std::time::Duration;

use moka::future::Cache;

use crate::error::AppError;
use crate::rates::{ConversionRates, RateLookup};
use crate::traits::{Fetcher, RateProvider};

const MAX_ENTRIES: u64 = 256;

/// A [`Fetcher`] wrapper that remembers successful responses per URL.
#[derive(Clone)]
pub struct CachedFetcher<F> {
    inner: F,
    cache: Cache<String, String>,
}

impl<F: Fetcher> CachedFetcher<F> {
    pub fn new(inner: F, ttl: Duration) -> Self {
        Self {
            inner,
            cache: Cache::builder()
                .max_capacity(MAX_ENTRIES)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Forget every cached response.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }
}

impl<F: Fetcher> Fetcher for CachedFetcher<F> {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        if let Some(body) = self.cache.get(url).await {
            tracing::debug!(%url, "Page cache hit");
            return Ok(body);
        }
        let body = self.inner.fetch(url).await?;
        self.cache.insert(url.to_string(), body.clone()).await;
        Ok(body)
    }
}

/// A [`RateProvider`] wrapper that keeps live rates for a freshness window.
///
/// Unavailable lookups are not cached, so the next call tries again.
#[derive(Clone)]
pub struct CachedRateProvider<R> {
    inner: R,
    cache: Cache<String, ConversionRates>,
}

impl<R: RateProvider> CachedRateProvider<R> {
    pub fn new(inner: R, ttl: Duration) -> Self {
        Self {
            inner,
            cache: Cache::builder()
                .max_capacity(MAX_ENTRIES)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    fn key(base: &str, symbols: &[String]) -> String {
        format!("{base}:{}", symbols.join(","))
    }
}

impl<R: RateProvider> RateProvider for CachedRateProvider<R> {
    async fn get_rates(&self, base: &str, symbols: &[String]) -> RateLookup {
        let key = Self::key(base, symbols);
        if let Some(rates) = self.cache.get(&key).await {
            tracing::debug!(%key, "Rate cache hit");
            return RateLookup::Live(rates);
        }
        let lookup = self.inner.get_rates(base, symbols).await;
        if let RateLookup::Live(rates) = &lookup {
            self.cache.insert(key, rates.clone()).await;
        }
        lookup
    }
}
