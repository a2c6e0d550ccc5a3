use bazaar_client::{ExchangeRateClient, ReqwestFetcher};
use bazaar_core::cache::CachedRateProvider;
use bazaar_core::models::{SearchQuery, SearchStatus};
use bazaar_core::{AuxLinkScanner, SearchPipeline};
use mockito::Matcher;

use crate::common::{DETAIL, LISTING, config_for};

#[tokio::test]
async fn full_search_against_mock_site() -> anyhow::Result<()> {
    let mut server = mockito::Server::new_async().await;
    let listing = server
        .mock("GET", "/search")
        .match_query(Matcher::UrlEncoded("q".into(), "jersey".into()))
        .with_status(200)
        .with_body(LISTING)
        .expect(2)
        .create_async()
        .await;
    let detail = server
        .mock("GET", "/p/1001")
        .with_status(200)
        .with_body(DETAIL)
        .expect(2)
        .create_async()
        .await;
    let rates = server
        .mock("GET", "/latest")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"rates":{"USD":0.5,"EUR":0.25}}"#)
        .expect(1)
        .create_async()
        .await;

    let config = config_for(&server.url());
    let pipeline = SearchPipeline::new(
        ReqwestFetcher::from_config(&config)?,
        CachedRateProvider::new(ExchangeRateClient::from_config(&config)?, config.rates_ttl),
        config.clone(),
    )?
    .with_enrichment(AuxLinkScanner::new(&config.aux_host_pattern)?);

    let query = SearchQuery::new("jersey", Some(50.0), 5)?;
    let first = pipeline.search(&query).await?;
    let second = pipeline.search(&query).await?;

    assert_eq!(first.status, SearchStatus::Found);
    assert_eq!(first.records.len(), 4);
    assert!(first.rates_live);
    assert_eq!(first.records[0].link, format!("{}/p/1001", server.url()));
    assert_eq!(first.records[0].price_converted["USD"], 17.5);
    assert_eq!(first.records[0].auxiliary_links.len(), 2);
    // Unmocked detail pages fail and are absorbed.
    assert!(first.records[1].auxiliary_links.is_empty());
    assert_eq!(second.records.len(), 4);

    listing.assert_async().await;
    detail.assert_async().await;
    // The second search reuses the cached rates.
    rates.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn unreachable_site_is_fetch_failure() -> anyhow::Result<()> {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/search")
        .match_query(Matcher::Any)
        .with_status(503)
        .create_async()
        .await;

    let config = config_for(&server.url());
    let pipeline = SearchPipeline::new(
        ReqwestFetcher::from_config(&config)?,
        ExchangeRateClient::from_config(&config)?,
        config,
    )?;

    let err = pipeline
        .search(&SearchQuery::new("jersey", None, 5)?)
        .await
        .unwrap_err();
    assert!(err.is_fetch_failure());
    Ok(())
}
