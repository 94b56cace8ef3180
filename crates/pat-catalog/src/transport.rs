// SPDX-License-Identifier: CC-BY-NC-ND-4.0

//! HTTP transport shared by the feed reader and the support API resolvers
//!
//! Retries transport errors and the configured retryable statuses with
//! exponential backoff. Everything above this layer only sees the final
//! outcome of a request.

use crate::config::TransportConfig;
use crate::error::{CatalogError, Result};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// Upper bound for a single retry delay.
const MAX_BACKOFF: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    max_retries: u32,
    backoff_factor: f64,
    retryable_statuses: Vec<u16>,
}

impl HttpTransport {
    pub fn new(config: &TransportConfig) -> Result<Self> {
        if !config.verify_tls {
            debug!("TLS certificate verification disabled");
        }

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| CatalogError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_retries: config.max_retries,
            backoff_factor: config.backoff_factor_secs,
            retryable_statuses: config.retryable_statuses.clone(),
        })
    }

    /// GET `url` and return the body, failing on any non-success status.
    pub async fn get_text(&self, url: &str, query: &[(&str, String)]) -> Result<String> {
        let response = self
            .send_with_retry(url, || self.client.get(url).query(query))
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }

    /// GET `url` and decode a JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let body = self.get_text(url, query).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Issue a HEAD request and report the status without reading a body.
    pub async fn head_status(&self, url: &str) -> Result<StatusCode> {
        let response = self.send_with_retry(url, || self.client.head(url)).await?;
        Ok(response.status())
    }

    async fn send_with_retry<F>(&self, url: &str, build: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut retries = 0;

        loop {
            match build().send().await {
                Ok(response)
                    if retries < self.max_retries && self.is_retryable(response.status()) =>
                {
                    retries += 1;
                    let delay = self.backoff(retries);
                    warn!(
                        "{url} returned {} (retry {retries}/{}), waiting {delay:?}",
                        response.status(),
                        self.max_retries
                    );
                    tokio::time::sleep(delay).await;
                }
                Ok(response) => return Ok(response),
                Err(e) if retries < self.max_retries => {
                    retries += 1;
                    let delay = self.backoff(retries);
                    warn!(
                        "Request to {url} failed (retry {retries}/{}): {e}. Retrying in {delay:?}",
                        self.max_retries
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    debug!("Request to {url} failed after {retries} retries: {e}");
                    return Err(CatalogError::Http(e));
                }
            }
        }
    }

    fn is_retryable(&self, status: StatusCode) -> bool {
        self.retryable_statuses.contains(&status.as_u16())
    }

    fn backoff(&self, retry: u32) -> Duration {
        if self.backoff_factor <= 0.0 {
            return Duration::ZERO;
        }
        let exponent = i32::try_from(retry.saturating_sub(1)).unwrap_or(i32::MAX);
        Duration::try_from_secs_f64(self.backoff_factor * 2f64.powi(exponent))
            .map_or(MAX_BACKOFF, |delay| delay.min(MAX_BACKOFF))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::Value;

    fn test_transport(max_retries: u32) -> HttpTransport {
        HttpTransport::new(&TransportConfig {
            max_retries,
            backoff_factor_secs: 0.0,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_backoff_doubles() {
        let transport = HttpTransport::new(&TransportConfig::default()).unwrap();
        assert_eq!(transport.backoff(1), Duration::from_secs(1));
        assert_eq!(transport.backoff(2), Duration::from_secs(2));
        assert_eq!(transport.backoff(3), Duration::from_secs(4));
    }

    #[test]
    fn test_backoff_is_capped_for_late_retries() {
        let transport = HttpTransport::new(&TransportConfig::default()).unwrap();
        assert_eq!(transport.backoff(20), MAX_BACKOFF);
        assert_eq!(transport.backoff(1100), MAX_BACKOFF);
        assert_eq!(transport.backoff(u32::MAX), MAX_BACKOFF);

        let immediate = test_transport(2000);
        assert_eq!(immediate.backoff(1100), Duration::ZERO);
        assert_eq!(immediate.backoff(u32::MAX), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_get_text_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/feed")
            .with_status(200)
            .with_body("<rss/>")
            .create_async()
            .await;

        let transport = test_transport(3);
        let body = transport
            .get_text(&format!("{}/feed", server.url()), &[])
            .await
            .unwrap();

        assert_eq!(body, "<rss/>");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_retries_retryable_status() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/flaky")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let transport = test_transport(2);
        let result = transport
            .get_text(&format!("{}/flaky", server.url()), &[])
            .await;

        assert!(matches!(
            result,
            Err(CatalogError::Status { status: 503, .. })
        ));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_does_not_retry_client_errors() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/missing")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;

        let transport = test_transport(3);
        let result = transport
            .get_text(&format!("{}/missing", server.url()), &[])
            .await;

        assert!(matches!(
            result,
            Err(CatalogError::Status { status: 404, .. })
        ));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_json_with_query() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("product".into(), "DS920+".into()),
                Matcher::UrlEncoded("major".into(), "7".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success": true}"#)
            .create_async()
            .await;

        let transport = test_transport(0);
        let value: Value = transport
            .get_json(
                &format!("{}/api", server.url()),
                &[("product", "DS920+".to_string()), ("major", "7".to_string())],
            )
            .await
            .unwrap();

        assert_eq!(value["success"], true);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_json_malformed_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let transport = test_transport(0);
        let result: Result<Value> = transport
            .get_json(&format!("{}/api", server.url()), &[])
            .await;

        assert!(matches!(result, Err(CatalogError::Json(_))));
    }

    #[tokio::test]
    async fn test_head_status() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("HEAD", "/pkg.pat")
            .with_status(403)
            .create_async()
            .await;

        let transport = test_transport(3);
        let status = transport
            .head_status(&format!("{}/pkg.pat", server.url()))
            .await
            .unwrap();

        assert_eq!(status, StatusCode::FORBIDDEN);
        mock.assert_async().await;
    }
}
