pub mod aux_links;
pub mod cache;
pub mod config;
pub mod error;
pub mod extract;
pub mod link;
pub mod locator;
pub mod models;
pub mod price;
pub mod rates;
pub mod search;
pub mod strategy;
pub mod traits;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use aux_links::AuxLinkScanner;
pub use config::{CurrencyConfig, SearchConfig};
pub use error::AppError;
pub use models::{ProductRecord, SearchQuery, SearchReport, SearchStatus};
pub use price::{UNPARSEABLE_PRICE, parse_price};
pub use rates::{ConversionRates, RateLookup};
pub use search::SearchPipeline;
pub use traits::{Fetcher, RateProvider};
