use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Upper bound accepted for [`SearchQuery::max_results`].
pub const MAX_RESULTS_LIMIT: usize = 50;

/// One validated search request.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    keyword: String,
    max_price: Option<f64>,
    max_results: usize,
}

impl SearchQuery {
    /// Validate and build a query.
    ///
    /// The keyword is trimmed and must not be empty. A ceiling of zero means
    /// "no ceiling"; negative or non-finite ceilings are rejected.
    /// `max_results` must be within `1..=MAX_RESULTS_LIMIT`.
    pub fn new(keyword: &str, max_price: Option<f64>, max_results: usize) -> Result<Self, AppError> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(AppError::InvalidQuery("keyword is empty".into()));
        }

        let max_price = match max_price {
            None => None,
            Some(p) if !p.is_finite() || p < 0.0 => {
                return Err(AppError::InvalidQuery(format!(
                    "max price must be a positive number, got {p}"
                )));
            }
            Some(p) if p == 0.0 => None,
            Some(p) => Some(p),
        };

        if !(1..=MAX_RESULTS_LIMIT).contains(&max_results) {
            return Err(AppError::InvalidQuery(format!(
                "max results must be between 1 and {MAX_RESULTS_LIMIT}, got {max_results}"
            )));
        }

        Ok(Self {
            keyword: keyword.to_string(),
            max_price,
            max_results,
        })
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn max_price(&self) -> Option<f64> {
        self.max_price
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    /// True if `price` is within the ceiling. The bound is inclusive.
    pub fn within_budget(&self, price: f64) -> bool {
        self.max_price.is_none_or(|max| price <= max)
    }
}

/// A product listing as returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub title: String,
    /// Price in the catalog's base currency.
    pub price_base: f64,
    /// False when the price text could not be parsed and `price_base` holds
    /// [`UNPARSEABLE_PRICE`](crate::price::UNPARSEABLE_PRICE).
    pub price_known: bool,
    pub price_converted: BTreeMap<String, f64>,
    /// Absolute URL of the product page.
    pub link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub auxiliary_links: BTreeSet<String>,
}

/// How a search ended, for callers that render different messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    /// At least one record was returned.
    Found,
    /// The page was reached but no complete product listing was found on it.
    NoListings,
    /// Listings were found but every one exceeded the price ceiling.
    NoneWithinBudget,
}

impl SearchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchStatus::Found => "found",
            SearchStatus::NoListings => "no_listings",
            SearchStatus::NoneWithinBudget => "none_within_budget",
        }
    }
}

impl std::fmt::Display for SearchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-run counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    /// Cards matched by the winning strategy.
    pub candidates: usize,
    /// Cards rejected for a missing title, price or link.
    pub incomplete: usize,
    /// Complete cards dropped by the price ceiling.
    pub over_budget: usize,
    /// Records returned.
    pub accepted: usize,
}

/// The output of one search.
#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    pub keyword: String,
    pub status: SearchStatus,
    pub records: Vec<ProductRecord>,
    pub stats: SearchStats,
    /// Name of the selector strategy that matched, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    /// False when static fallback factors were used for every currency.
    pub rates_live: bool,
    pub searched_at: DateTime<Utc>,
}

impl SearchReport {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
