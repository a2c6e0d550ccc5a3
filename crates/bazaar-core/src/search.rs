use futures::StreamExt;
use futures::stream;
use scraper::Html;
use url::Url;

use crate::aux_links::{AuxLinkScanner, fetch_auxiliary_links};
use crate::config::SearchConfig;
use crate::error::AppError;
use crate::extract::{FieldExtractor, ListingFields};
use crate::locator::ProductCardLocator;
use crate::models::{ProductRecord, SearchQuery, SearchReport, SearchStats, SearchStatus};
use crate::rates::{RateLookup, convert_price};
use crate::strategy::SelectorStrategy;
use crate::traits::{Fetcher, RateProvider};

/// Listings accepted from one page, before conversion and enrichment.
struct Collected {
    listings: Vec<ListingFields>,
    stats: SearchStats,
    strategy: Option<String>,
}

/// Orchestrates one search: fetch → locate → extract → filter → cap →
/// convert → enrich.
///
/// Generic over the fetcher and rate provider so tests run without network
/// access. Only a failed listing fetch aborts a search; every other problem
/// shrinks the result set instead.
pub struct SearchPipeline<F, R>
where
    F: Fetcher,
    R: RateProvider,
{
    fetcher: F,
    rates: R,
    config: SearchConfig,
    locator: ProductCardLocator,
    extractor: FieldExtractor,
    enrichment: Option<AuxLinkScanner>,
}

impl<F, R> SearchPipeline<F, R>
where
    F: Fetcher,
    R: RateProvider,
{
    /// Create a pipeline using the built-in selector strategies and no
    /// auxiliary-link enrichment.
    pub fn new(fetcher: F, rates: R, config: SearchConfig) -> Result<Self, AppError> {
        let extractor = FieldExtractor::new(config.base_origin.clone());
        Ok(Self {
            fetcher,
            rates,
            locator: ProductCardLocator::with_defaults()?,
            extractor,
            config,
            enrichment: None,
        })
    }

    /// Replace the selector strategies, keeping their order as priority.
    pub fn with_strategies(mut self, strategies: Vec<SelectorStrategy>) -> Self {
        self.locator = ProductCardLocator::new(strategies);
        self
    }

    /// Fetch each accepted record's page and attach auxiliary links.
    pub fn with_enrichment(mut self, scanner: AuxLinkScanner) -> Self {
        self.enrichment = Some(scanner);
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Build the listing URL for `query`.
    pub fn search_url(&self, query: &SearchQuery) -> Result<String, AppError> {
        let raw = format!("{}{}", self.config.base_origin, self.config.search_path);
        let mut url = Url::parse(&raw)
            .map_err(|e| AppError::ConfigError(format!("Invalid search URL '{raw}': {e}")))?;
        url.query_pairs_mut()
            .append_pair(&self.config.query_param, query.keyword());
        Ok(url.into())
    }

    /// Current conversion factors for the configured currencies.
    pub async fn rates(&self) -> RateLookup {
        let currencies = &self.config.currencies;
        self.rates
            .get_rates(&currencies.base, &currencies.symbols())
            .await
    }

    /// Run the full pipeline for one query.
    ///
    /// 1. Fetch the listing page (failure aborts with `Err`)
    /// 2. Locate cards with the first matching strategy
    /// 3. Extract fields, skipping incomplete cards
    /// 4. Drop cards above the price ceiling
    /// 5. Stop once `max_results` records are accepted
    /// 6. Convert prices with live or fallback rates
    /// 7. Optionally scan each record's page for auxiliary links
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchReport, AppError> {
        // 1. Fetch
        let url = self.search_url(query)?;
        tracing::info!("Fetching {}", url);
        let html = self.fetcher.fetch(&url).await?;
        tracing::info!("Fetched {} bytes of HTML", html.len());

        // 2-5. Locate, extract, filter, cap
        let Collected {
            listings,
            mut stats,
            strategy,
        } = self.collect(&html, query);

        // 6. Convert
        let lookup = if listings.is_empty() {
            RateLookup::unavailable("no listings to convert")
        } else {
            self.rates().await
        };
        if let RateLookup::Unavailable { reason } = &lookup
            && !listings.is_empty()
        {
            tracing::warn!(%reason, "Exchange rates unavailable, using fallback factors");
        }

        let mut records: Vec<ProductRecord> = listings
            .into_iter()
            .map(|listing| ProductRecord {
                price_converted: convert_price(listing.price_base, &lookup, &self.config.currencies),
                title: listing.title,
                price_base: listing.price_base,
                price_known: listing.price_known,
                link: listing.link,
                image_url: listing.image_url,
                auxiliary_links: Default::default(),
            })
            .collect();

        // 7. Enrich
        if let Some(scanner) = &self.enrichment {
            self.enrich(&mut records, scanner).await;
        }

        stats.accepted = records.len();
        let status = if !records.is_empty() {
            SearchStatus::Found
        } else if stats.over_budget > 0 {
            SearchStatus::NoneWithinBudget
        } else {
            SearchStatus::NoListings
        };

        tracing::info!(
            %status,
            strategy = strategy.as_deref().unwrap_or("none"),
            candidates = stats.candidates,
            incomplete = stats.incomplete,
            over_budget = stats.over_budget,
            accepted = stats.accepted,
            "Search complete"
        );

        Ok(SearchReport {
            keyword: query.keyword().to_string(),
            status,
            records,
            stats,
            strategy,
            rates_live: lookup.is_live(),
            searched_at: chrono::Utc::now(),
        })
    }

    /// Parse the page and extract accepted listings in discovery order.
    ///
    /// Kept synchronous so the parsed document never lives across an await.
    fn collect(&self, html: &str, query: &SearchQuery) -> Collected {
        let document = Html::parse_document(html);
        let mut stats = SearchStats::default();

        let Some(located) = self.locator.locate(&document) else {
            tracing::info!("No strategy matched any product cards");
            return Collected {
                listings: Vec::new(),
                stats,
                strategy: None,
            };
        };

        stats.candidates = located.cards.len();
        let mut listings = Vec::new();

        for (index, card) in located.cards.into_iter().enumerate() {
            let listing = match self.extractor.extract(card, &located.strategy.fields) {
                Ok(listing) => listing,
                Err(missing) => {
                    tracing::debug!(index, %missing, "Skipping incomplete card");
                    stats.incomplete += 1;
                    continue;
                }
            };

            if !query.within_budget(listing.price_base) {
                tracing::debug!(
                    index,
                    price = listing.price_base,
                    price_text = %listing.price_text,
                    "Skipping card above price ceiling"
                );
                stats.over_budget += 1;
                continue;
            }

            listings.push(listing);
            if listings.len() >= query.max_results() {
                break;
            }
        }

        Collected {
            listings,
            stats,
            strategy: Some(located.strategy.name.clone()),
        }
    }

    async fn enrich(&self, records: &mut [ProductRecord], scanner: &AuxLinkScanner) {
        let concurrency = self.config.enrich_concurrency.max(1);
        let links: Vec<_> = stream::iter(records.iter().map(|r| r.link.clone()))
            .map(|link| async move { fetch_auxiliary_links(&self.fetcher, scanner, &link).await })
            .buffered(concurrency)
            .collect()
            .await;

        for (record, found) in records.iter_mut().zip(links) {
            record.auxiliary_links = found;
        }
    }
}
