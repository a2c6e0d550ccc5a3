use std::future::Future;

use crate::error::AppError;
use crate::rates::RateLookup;

/// Fetches raw HTML content from a URL.
pub trait Fetcher: Send + Sync + Clone {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// Supplies conversion factors from one base currency to a set of targets.
///
/// Implementations never fail: transport or decoding problems are reported
/// as [`RateLookup::Unavailable`] so the caller can fall back to static
/// factors.
pub trait RateProvider: Send + Sync + Clone {
    fn get_rates(
        &self,
        base: &str,
        symbols: &[String],
    ) -> impl Future<Output = RateLookup> + Send;
}
