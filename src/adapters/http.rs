use crate::config::toml_config::SourceConfig;
use crate::core::DocumentFetcher;
use crate::utils::error::{EtlError, Result};
use reqwest::Client;
use std::time::Duration;
use tokio::time::sleep;

/// Fetches pages one at a time over HTTP(S).
///
/// Network errors and 5xx responses are retried up to `retry_attempts` times
/// in total; any other non-2xx status fails immediately.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    retry_attempts: u32,
    retry_delay: Duration,
}

impl HttpFetcher {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            retry_attempts: config.retry_attempts.max(1),
            retry_delay: Duration::from_secs(config.retry_delay_seconds),
        })
    }

    /// Returns the body, or the error plus whether another attempt makes sense.
    async fn fetch_once(&self, url: &str) -> std::result::Result<String, (EtlError, bool)> {
        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| (EtlError::transport(url, e.to_string()), true))?;

        let status = response.status();
        tracing::debug!("{} -> {}", url, status);
        if !status.is_success() {
            return Err((
                EtlError::transport(url, format!("HTTP status {}", status)),
                status.is_server_error(),
            ));
        }

        response
            .text()
            .await
            .map_err(|e| (EtlError::transport(url, e.to_string()), true))
    }
}

impl DocumentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.fetch_once(url).await {
                Ok(body) => return Ok(body),
                Err((e, retryable)) if retryable && attempt < self.retry_attempts => {
                    tracing::warn!(
                        "attempt {}/{} for {} failed: {}",
                        attempt,
                        self.retry_attempts,
                        url,
                        e
                    );
                    sleep(self.retry_delay).await;
                }
                Err((e, _)) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn source(retry_attempts: u32) -> SourceConfig {
        SourceConfig {
            timeout_seconds: 5,
            retry_attempts,
            retry_delay_seconds: 0,
            user_agent: "indicator-etl-test".to_string(),
        }
    }

    #[tokio::test]
    async fn test_fetch_returns_body() {
        let server = MockServer::start();
        let page_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/salary/2015")
                .header("user-agent", "indicator-etl-test");
            then.status(200).body("<html><body>ok</body></html>");
        });

        let fetcher = HttpFetcher::new(&source(1)).unwrap();
        let body = fetcher.fetch(&server.url("/salary/2015")).await.unwrap();

        page_mock.assert();
        assert!(body.contains("ok"));
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = MockServer::start();
        let page_mock = server.mock(|when, then| {
            when.method(GET).path("/missing");
            then.status(404);
        });

        let fetcher = HttpFetcher::new(&source(3)).unwrap();
        let err = fetcher.fetch(&server.url("/missing")).await.unwrap_err();

        page_mock.assert_hits(1);
        assert!(matches!(err, EtlError::Transport { .. }));
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_server_error_is_retried() {
        let server = MockServer::start();
        let page_mock = server.mock(|when, then| {
            when.method(GET).path("/flaky");
            then.status(503);
        });

        let fetcher = HttpFetcher::new(&source(2)).unwrap();
        let err = fetcher.fetch(&server.url("/flaky")).await.unwrap_err();

        page_mock.assert_hits(2);
        assert!(matches!(err, EtlError::Transport { .. }));
    }
}
