use reqwest::StatusCode;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

use crate::errors::{RegistryError, Result};

/// Which version of a subject to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemaVersion {
    #[default]
    Latest,
    Number(u32),
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaVersion::Latest => f.write_str("latest"),
            SchemaVersion::Number(version) => write!(f, "{}", version),
        }
    }
}

#[derive(Clone, Debug)]
pub struct FetcherConfig {
    pub timeout_ms: u64, // per-request timeout, connect and body included
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self { timeout_ms: 10_000 }
    }
}

/// Fetches raw schema text from a Confluent-compatible schema registry.
///
/// Each call is one `GET /subjects/{subject}/versions/{version}` round trip.
/// Nothing is cached and nothing is retried. Clones share the underlying
/// connection pool.
#[derive(Clone, Debug)]
pub struct SchemaFetcher {
    base_url: String,
    cfg: FetcherConfig,
    http: reqwest::Client,
}

impl SchemaFetcher {
    pub fn builder() -> SchemaFetcherBuilder {
        SchemaFetcherBuilder::default()
    }

    /// Fetcher for `base_url` with the default configuration.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::builder().base_url(base_url).build()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.cfg
    }

    /// Fetch the latest schema registered under `subject`.
    pub async fn get(&self, subject: &str) -> Result<String> {
        self.get_version(subject, SchemaVersion::Latest).await
    }

    /// Fetch one version of the schema registered under `subject`.
    ///
    /// The whole body is read before the status is checked, so the
    /// connection goes back to the pool on every path. Any status other than
    /// 200 is an `InvalidResponse`, as is a `null` body or a JSON object
    /// without a string `schema` field. Any other body that is not a JSON
    /// object is a `Decode` error.
    pub async fn get_version(&self, subject: &str, version: SchemaVersion) -> Result<String> {
        let url = self.version_url(subject, version);
        debug!(url = %url, "fetching schema from registry");

        let resp = self.http.get(&url).send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;

        if status != StatusCode::OK {
            warn!(url = %url, status = status.as_u16(), "schema registry rejected request");
            return Err(RegistryError::InvalidResponse {
                url,
                status: status.as_u16(),
                reason: format!("unexpected status {}", status),
            });
        }

        // a `null` body parses but carries no schema
        let envelope: Option<serde_json::Map<String, serde_json::Value>> =
            serde_json::from_slice(&body)?;
        match envelope.as_ref().and_then(|fields| fields.get("schema")) {
            Some(serde_json::Value::String(schema)) => Ok(schema.clone()),
            Some(_) => Err(RegistryError::InvalidResponse {
                url,
                status: status.as_u16(),
                reason: "`schema` field is not a string".into(),
            }),
            None => Err(RegistryError::InvalidResponse {
                url,
                status: status.as_u16(),
                reason: "missing `schema` field".into(),
            }),
        }
    }

    fn version_url(&self, subject: &str, version: SchemaVersion) -> String {
        format!(
            "{}/subjects/{}/versions/{}",
            self.base_url, subject, version
        )
    }
}

/// Builder for a [`SchemaFetcher`].
#[derive(Debug, Clone, Default)]
pub struct SchemaFetcherBuilder {
    base_url: Option<String>,
    cfg: FetcherConfig,
}

impl SchemaFetcherBuilder {
    /// Sets the registry base URL, e.g. `http://localhost:8081`.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.cfg.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn config(mut self, cfg: FetcherConfig) -> Self {
        self.cfg = cfg;
        self
    }

    pub fn build(self) -> Result<SchemaFetcher> {
        let base_url = self
            .base_url
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .ok_or_else(|| RegistryError::Config("base url is required".into()))?;

        if self.cfg.timeout_ms == 0 {
            return Err(RegistryError::Config("timeout must be greater than zero".into()));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(self.cfg.timeout_ms))
            .build()
            .map_err(|e| RegistryError::Config(format!("unable to build http client: {}", e)))?;

        Ok(SchemaFetcher {
            base_url,
            cfg: self.cfg,
            http,
        })
    }
}

/// Fetch the latest schema for `subject` from the registry at `base_url`.
pub async fn get(base_url: &str, subject: &str) -> Result<String> {
    SchemaFetcher::new(base_url)?.get(subject).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_url_trims_trailing_slash() {
        let fetcher = SchemaFetcher::new("http://registry:8081/").unwrap();

        assert_eq!(fetcher.base_url(), "http://registry:8081");
        assert_eq!(
            fetcher.version_url("orders-value", SchemaVersion::Latest),
            "http://registry:8081/subjects/orders-value/versions/latest"
        );
        assert_eq!(
            fetcher.version_url("orders-value", SchemaVersion::Number(3)),
            "http://registry:8081/subjects/orders-value/versions/3"
        );
    }

    #[test]
    fn test_builder_requires_base_url() {
        let err = SchemaFetcher::builder().build().unwrap_err();
        assert!(matches!(err, RegistryError::Config(_)));

        let err = SchemaFetcher::new("/").unwrap_err();
        assert!(matches!(err, RegistryError::Config(_)));
    }

    #[test]
    fn test_builder_applies_timeout() {
        let fetcher = SchemaFetcher::builder()
            .base_url("http://registry:8081")
            .timeout(Duration::from_millis(250))
            .build()
            .unwrap();

        assert_eq!(fetcher.config().timeout_ms, 250);
    }

    #[test]
    fn test_builder_rejects_zero_timeout() {
        let err = SchemaFetcher::builder()
            .base_url("http://registry:8081")
            .timeout(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistryError::Config(_)));

        let err = SchemaFetcher::builder()
            .base_url("http://registry:8081")
            .config(FetcherConfig { timeout_ms: 0 })
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistryError::Config(_)));
    }

    #[test]
    fn test_oversized_timeout_saturates() {
        let builder = SchemaFetcher::builder().timeout(Duration::MAX);
        assert_eq!(builder.cfg.timeout_ms, u64::MAX);
    }
}
