use bazaar_client::ReqwestFetcher;
use bazaar_core::error::AppError;
use bazaar_core::traits::Fetcher;
use mockito::Matcher;

use crate::common::config_for;

#[tokio::test]
async fn sends_browser_headers() -> anyhow::Result<()> {
    let mut server = mockito::Server::new_async().await;
    let referer = format!("{}/", server.url());
    let mock = server
        .mock("GET", "/search")
        .match_query(Matcher::UrlEncoded("q".into(), "jersey".into()))
        .match_header("user-agent", Matcher::Regex("^Mozilla/5.0".into()))
        .match_header("accept", Matcher::Regex("text/html".into()))
        .match_header("accept-language", Matcher::Regex("en-US".into()))
        .match_header("referer", referer.as_str())
        .with_status(200)
        .with_body("<html>ok</html>")
        .create_async()
        .await;

    let fetcher = ReqwestFetcher::from_config(&config_for(&server.url()))?;
    let body = fetcher
        .fetch(&format!("{}/search?q=jersey", server.url()))
        .await?;

    assert_eq!(body, "<html>ok</html>");
    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn non_success_status_is_http_error() -> anyhow::Result<()> {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/search")
        .match_query(Matcher::Any)
        .with_status(403)
        .create_async()
        .await;

    let fetcher = ReqwestFetcher::from_config(&config_for(&server.url()))?;
    let err = fetcher
        .fetch(&format!("{}/search?q=jersey", server.url()))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::HttpError(ref msg) if msg.contains("403")));
    assert!(err.is_fetch_failure());
    Ok(())
}
