//! HTTP fetch pipeline for upstream requests.
//!
//! All network access goes through the [`Fetcher`] trait so strategy
//! executors can be driven by a scripted fetcher in tests. The real
//! implementation, [`FetchClient`], wraps reqwest with a timeout,
//! redirect limit, and response size cap.
//!
//! A transport failure (DNS, connect, timeout) maps to
//! `Error::NetworkUnavailable`; a non-200 upstream status is NOT an
//! error here, because strategy executors pass those responses through
//! while declining to cache them.

pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Url;
use reqwest::{Client, header};
use std::time::Duration;

pub use url::{UrlError, canonicalize, is_interceptable};

use hearth_core::Error;

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "hearth/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "hearth/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

/// Response captured from an upstream fetch.
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    /// The URL requested
    pub url: Url,
    /// HTTP status code
    pub status: u16,
    /// Content-Type header
    pub content_type: Option<String>,
    /// Response headers as name/value pairs
    pub headers: Vec<(String, String)>,
    /// Response body bytes
    pub body: Bytes,
}

/// Read-only network access seam.
///
/// Strategy executors depend on this trait rather than on reqwest
/// directly, which is what makes the "cache hit never touches the
/// network" contracts assertable in tests.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Issue a GET request and capture the response.
    async fn get(&self, url: &Url) -> Result<FetchedResponse, Error>;
}

/// HTTP fetch client backed by reqwest.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::HttpError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait]
impl Fetcher for FetchClient {
    async fn get(&self, url: &Url) -> Result<FetchedResponse, Error> {
        let response = self
            .http
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| Error::NetworkUnavailable(e.to_string()))?;

        let status = response.status().as_u16();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.to_string(), v.to_string())))
            .collect();

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::NetworkUnavailable(format!("failed to read response: {}", e)))?;

        if body.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", body.len(), self.config.max_bytes)));
        }

        tracing::debug!(url = %url, status, bytes = body.len(), "fetched upstream");

        Ok(FetchedResponse { url: url.clone(), status, content_type, headers, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "hearth/0.1");
        assert_eq!(config.max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_client_new() {
        let client = FetchClient::new(FetchConfig::default());
        assert!(client.is_ok());
    }

    #[test]
    fn test_fetched_response_fields() {
        let response = FetchedResponse {
            url: Url::parse("https://example.com/app.js").unwrap(),
            status: 200,
            content_type: Some("application/javascript".to_string()),
            headers: vec![("cache-control".to_string(), "max-age=600".to_string())],
            body: Bytes::from_static(b"console.log(1)"),
        };

        assert_eq!(response.status, 200);
        assert_eq!(response.body.len(), 14);
    }
}
