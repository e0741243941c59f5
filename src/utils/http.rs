//! Shared HTTP client used by every engine.

use std::time::Duration;

use serde::Serialize;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Thin wrapper over [`reqwest::Client`] with the crate's user agent and
/// timeouts applied. One instance is shared across all engines so they
/// reuse the same connection pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(format!(
                "{}/{} (mailto:{})",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION"),
                "citeflow@example.org"
            ))
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { client }
    }

    /// GET a URL and parse the response body as JSON. Non-2xx statuses are
    /// errors.
    pub async fn get_json(&self, url: &str) -> Result<serde_json::Value, reqwest::Error> {
        self.client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    /// GET with query parameters, parsed as JSON.
    pub async fn get_json_with_query<Q: Serialize + ?Sized>(
        &self,
        url: &str,
        query: &Q,
    ) -> Result<serde_json::Value, reqwest::Error> {
        self.client
            .get(url)
            .query(query)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    /// GET with query parameters and extra headers, parsed as JSON.
    pub async fn get_json_with_headers<Q: Serialize + ?Sized>(
        &self,
        url: &str,
        query: &Q,
        headers: &[(&str, &str)],
    ) -> Result<serde_json::Value, reqwest::Error> {
        let mut req = self.client.get(url).query(query);
        for (name, value) in headers {
            req = req.header(*name, *value);
        }
        req.send().await?.error_for_status()?.json().await
    }

    /// POST a JSON body with extra headers, response parsed as JSON.
    pub async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        headers: &[(&str, &str)],
    ) -> Result<serde_json::Value, reqwest::Error> {
        let mut req = self.client.post(url).json(body);
        for (name, value) in headers {
            req = req.header(*name, *value);
        }
        req.send().await?.error_for_status()?.json().await
    }

    /// GET a URL and return the body as text.
    pub async fn get_text(&self, url: &str) -> Result<String, reqwest::Error> {
        self.client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }

    /// GET with query parameters, body as text. Used for XML and Atom APIs.
    pub async fn get_text_with_query<Q: Serialize + ?Sized>(
        &self,
        url: &str,
        query: &Q,
    ) -> Result<String, reqwest::Error> {
        self.client
            .get(url)
            .query(query)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}
