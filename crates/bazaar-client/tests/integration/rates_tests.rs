use bazaar_client::ExchangeRateClient;
use bazaar_core::rates::RateLookup;
use bazaar_core::traits::RateProvider;
use mockito::Matcher;

use crate::common::config_for;

fn symbols() -> Vec<String> {
    vec!["USD".to_string(), "EUR".to_string()]
}

fn rates_query() -> Matcher {
    Matcher::AllOf(vec![
        Matcher::UrlEncoded("base".into(), "CNY".into()),
        Matcher::UrlEncoded("symbols".into(), "USD,EUR".into()),
    ])
}

#[tokio::test]
async fn live_rates_are_parsed_and_restricted_to_symbols() -> anyhow::Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/latest")
        .match_query(rates_query())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"base":"CNY","rates":{"USD":0.138,"EUR":0.127,"JPY":20.9}}"#)
        .create_async()
        .await;

    let client = ExchangeRateClient::from_config(&config_for(&server.url()))?;
    let lookup = client.get_rates("CNY", &symbols()).await;

    let RateLookup::Live(rates) = lookup else {
        panic!("expected live rates, got {lookup:?}");
    };
    assert_eq!(rates.base, "CNY");
    assert_eq!(rates.factor("USD"), Some(0.138));
    assert_eq!(rates.factor("EUR"), Some(0.127));
    assert_eq!(rates.factor("JPY"), None);
    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn missing_rates_field_is_unavailable() -> anyhow::Result<()> {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/latest")
        .match_query(rates_query())
        .with_status(200)
        .with_body(r#"{"success":false,"error":{"code":101}}"#)
        .create_async()
        .await;

    let client = ExchangeRateClient::from_config(&config_for(&server.url()))?;
    let lookup = client.get_rates("CNY", &symbols()).await;

    assert!(matches!(lookup, RateLookup::Unavailable { ref reason } if reason.contains("rates")));
    Ok(())
}

#[tokio::test]
async fn server_error_is_unavailable() -> anyhow::Result<()> {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/latest")
        .match_query(Matcher::Any)
        .with_status(500)
        .create_async()
        .await;

    let client = ExchangeRateClient::from_config(&config_for(&server.url()))?;
    assert!(!client.get_rates("CNY", &symbols()).await.is_live());
    Ok(())
}
