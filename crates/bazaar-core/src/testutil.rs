//! Test utilities: mock implementations of the I/O traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use crate::error::AppError;
use crate::rates::{ConversionRates, RateLookup};
use crate::traits::{Fetcher, RateProvider};

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Mock fetcher that returns queued or per-URL responses.
#[derive(Clone, Default)]
pub struct MockFetcher {
    /// Queue of responses. Each call pops the first element.
    /// If empty, returns a default HTML string.
    responses: Arc<Mutex<Vec<Result<String, AppError>>>>,
    /// When non-empty, responses are looked up by URL instead of the queue;
    /// unknown URLs fail with HTTP 404.
    routes: Arc<Mutex<HashMap<String, String>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockFetcher {
    pub fn new(html: &str) -> Self {
        Self::with_responses(vec![Ok(html.to_string())])
    }

    pub fn with_error(error: AppError) -> Self {
        Self::with_responses(vec![Err(error)])
    }

    pub fn with_responses(responses: Vec<Result<String, AppError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            ..Self::default()
        }
    }

    /// Serve `body` for exactly `url`.
    pub fn with_route(self, url: &str, body: &str) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), body.to_string());
        self
    }

    /// URLs requested so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        self.calls.lock().unwrap().push(url.to_string());

        {
            let routes = self.routes.lock().unwrap();
            if !routes.is_empty() {
                return routes
                    .get(url)
                    .cloned()
                    .ok_or_else(|| AppError::HttpError(format!("HTTP 404 for {url}")));
            }
        }

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok("<html><body>default</body></html>".to_string())
        } else {
            responses.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// MockRateProvider
// ---------------------------------------------------------------------------

/// Mock rate provider returning queued lookups, then a fixed fallback.
#[derive(Clone)]
pub struct MockRateProvider {
    lookups: Arc<Mutex<Vec<RateLookup>>>,
    fallback: RateLookup,
    calls: Arc<Mutex<usize>>,
}

impl MockRateProvider {
    /// Always returns the given live factors against CNY.
    pub fn live(pairs: &[(&str, f64)]) -> Self {
        let rates: BTreeMap<String, f64> = pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        Self {
            lookups: Arc::new(Mutex::new(Vec::new())),
            fallback: RateLookup::Live(ConversionRates::new("CNY", rates)),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    /// Always reports the rate service as unavailable.
    pub fn unavailable() -> Self {
        Self {
            lookups: Arc::new(Mutex::new(Vec::new())),
            fallback: RateLookup::unavailable("mock rate service offline"),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    /// Returns `lookups` in order, then reports unavailable.
    pub fn with_lookups(lookups: Vec<RateLookup>) -> Self {
        Self {
            lookups: Arc::new(Mutex::new(lookups)),
            ..Self::unavailable()
        }
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl RateProvider for MockRateProvider {
    async fn get_rates(&self, _base: &str, _symbols: &[String]) -> RateLookup {
        *self.calls.lock().unwrap() += 1;
        let mut lookups = self.lookups.lock().unwrap();
        if lookups.is_empty() {
            self.fallback.clone()
        } else {
            lookups.remove(0)
        }
    }
}
