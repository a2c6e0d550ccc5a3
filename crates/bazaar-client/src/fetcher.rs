use std::time::Duration;

use bazaar_core::config::SearchConfig;
use bazaar_core::error::AppError;
use bazaar_core::traits::Fetcher;
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, REFERER};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";
const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const ACCEPT_LANGUAGES: &str = "en-US,en;q=0.9,zh-CN;q=0.8";

/// HTTP fetcher using reqwest.
///
/// Sends browser-like headers (User-Agent, Accept, Accept-Language and a
/// Referer pointing at the catalog origin) because the catalog filters
/// obvious bots. Every request carries the configured timeout and is tried
/// once.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: Client,
    timeout: Duration,
}

impl ReqwestFetcher {
    pub fn from_config(config: &SearchConfig) -> Result<Self, AppError> {
        Self::with_timeout(&config.base_origin, config.request_timeout)
    }

    pub fn with_timeout(referer: &str, timeout: Duration) -> Result<Self, AppError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGES));
        let referer = format!("{}/", referer.trim_end_matches('/'));
        headers.insert(
            REFERER,
            HeaderValue::from_str(&referer)
                .map_err(|e| AppError::ConfigError(format!("Invalid referer '{referer}': {e}")))?,
        );

        let client = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            timeout,
        })
    }
}

impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| send_error(e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::HttpError(format!(
                "HTTP {} for {}",
                status.as_u16(),
                url
            )));
        }

        response
            .text()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to read response body: {e}")))
    }
}

/// Classify a reqwest send error.
pub(crate) fn send_error(e: reqwest::Error, timeout: Duration) -> AppError {
    if e.is_timeout() {
        AppError::Timeout(timeout)
    } else if e.is_connect() {
        AppError::NetworkError(format!("Connection failed: {e}"))
    } else {
        AppError::HttpError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_from_default_config() {
        let fetcher = ReqwestFetcher::from_config(&SearchConfig::default()).unwrap();
        assert_eq!(fetcher.timeout, Duration::from_secs(10));
    }

    #[test]
    fn rejects_unprintable_referer() {
        let err = ReqwestFetcher::with_timeout("https://exa\nmple.com", Duration::from_secs(1))
            .err()
            .unwrap();
        assert!(matches!(err, AppError::ConfigError(_)));
    }

    #[tokio::test]
    async fn refused_connection_is_network_error() {
        let fetcher =
            ReqwestFetcher::with_timeout("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
        let err = fetcher.fetch("http://127.0.0.1:1/search?q=x").await.unwrap_err();
        assert!(err.is_fetch_failure());
    }

    #[tokio::test]
    async fn sub_second_timeout_keeps_its_duration() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(socket);
        });

        let timeout = Duration::from_millis(200);
        let fetcher = ReqwestFetcher::with_timeout(&format!("http://{addr}"), timeout).unwrap();
        let err = fetcher
            .fetch(&format!("http://{addr}/search?q=x"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Timeout(d) if d == timeout));
        assert_eq!(err.to_string(), "Request timed out after 200ms");
    }
}
