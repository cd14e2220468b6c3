//! Configuration with sensible defaults.
//!
//! [`FusionConfig`] controls fusion and the end-to-end pipeline,
//! [`HotwordConfig`] the optional trending-term refresher,
//! [`RerankConfig`] the optional cross-encoder client, and
//! [`SearchOptions`] is what each backend call receives.

use url::Url;

use crate::error::FusionError;

/// Default RRF smoothing constant.
pub const DEFAULT_RRF_K: u32 = 60;
/// Default number of fused results returned.
pub const DEFAULT_LIMIT: usize = 50;
/// Upper bound on the number of query variants produced per request.
pub const MAX_VARIANTS: usize = 5;

/// Environment variable naming the hotword source endpoint.
pub const HOTWORD_URL_ENV: &str = "HOTWORD_API_URL";

/// Configuration for the rewrite → search → fuse pipeline.
#[derive(Debug, Clone)]
pub struct FusionConfig {
    /// RRF smoothing constant `k`.
    pub rrf_k: u32,
    /// Maximum number of fused results to return.
    pub limit: usize,
    /// Maximum number of query variants to search (at most [`MAX_VARIANTS`]).
    pub max_variants: usize,
    /// Whether to add the publication-date freshness bonus after fusion.
    pub freshness: bool,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            rrf_k: DEFAULT_RRF_K,
            limit: DEFAULT_LIMIT,
            max_variants: MAX_VARIANTS,
            freshness: true,
        }
    }
}

impl FusionConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `limit` must be greater than 0
    /// - `max_variants` must be between 1 and [`MAX_VARIANTS`]
    pub fn validate(&self) -> Result<(), FusionError> {
        if self.limit == 0 {
            return Err(FusionError::Config("limit must be greater than 0".into()));
        }
        if self.max_variants == 0 || self.max_variants > MAX_VARIANTS {
            return Err(FusionError::Config(format!(
                "max_variants must be between 1 and {MAX_VARIANTS}"
            )));
        }
        Ok(())
    }

    /// The per-backend-call options derived from this configuration.
    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            limit: self.limit,
            rrf_k: self.rrf_k,
        }
    }
}

/// Options passed through to every backend search call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// Maximum number of fused results.
    pub limit: usize,
    /// RRF smoothing constant used when several variants are fused.
    pub rrf_k: u32,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            rrf_k: DEFAULT_RRF_K,
        }
    }
}

/// Configuration for the background hotword refresher.
#[derive(Debug, Clone)]
pub struct HotwordConfig {
    /// Endpoint returning trending terms as JSON. `None` disables hotwords.
    pub source_url: Option<String>,
    /// Seconds between refreshes; also the maximum staleness of the cache.
    pub ttl_seconds: u64,
    /// Timeout for one fetch of the source, in seconds.
    pub fetch_timeout_seconds: u64,
    /// Maximum number of hotwords kept from one response.
    pub max_hotwords: usize,
    /// Refresh once immediately when the worker starts instead of waiting
    /// a full TTL for the first fetch.
    pub fetch_on_start: bool,
}

impl Default for HotwordConfig {
    fn default() -> Self {
        Self {
            source_url: None,
            ttl_seconds: 600,
            fetch_timeout_seconds: 5,
            max_hotwords: 50,
            fetch_on_start: true,
        }
    }
}

impl HotwordConfig {
    /// Read the source endpoint from `HOTWORD_API_URL`; an unset or empty
    /// variable leaves hotwords disabled.
    pub fn from_env() -> Self {
        let source_url = std::env::var(HOTWORD_URL_ENV)
            .ok()
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty());
        Self {
            source_url,
            ..Default::default()
        }
    }

    /// Whether a hotword source is configured.
    pub fn enabled(&self) -> bool {
        self.source_url.is_some()
    }

    /// Validates this configuration.
    ///
    /// Checks:
    /// - `source_url`, when set, must be an absolute http(s) URL
    /// - `ttl_seconds` and `fetch_timeout_seconds` must be greater than 0
    /// - `max_hotwords` must be greater than 0
    pub fn validate(&self) -> Result<(), FusionError> {
        if let Some(ref raw) = self.source_url {
            validate_http_url("source_url", raw)?;
        }
        if self.ttl_seconds == 0 {
            return Err(FusionError::Config(
                "ttl_seconds must be greater than 0".into(),
            ));
        }
        if self.fetch_timeout_seconds == 0 {
            return Err(FusionError::Config(
                "fetch_timeout_seconds must be greater than 0".into(),
            ));
        }
        if self.max_hotwords == 0 {
            return Err(FusionError::Config(
                "max_hotwords must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// Configuration for the cross-encoder reranker client.
#[derive(Debug, Clone)]
pub struct RerankConfig {
    /// Base URL of the reranker service, e.g. `http://127.0.0.1:8765`.
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
    /// Number of documents the service should return.
    pub top_k: usize,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8765".into(),
            timeout_seconds: 10,
            top_k: 10,
        }
    }
}

impl RerankConfig {
    /// Validates this configuration.
    pub fn validate(&self) -> Result<(), FusionError> {
        validate_http_url("base_url", &self.base_url)?;
        if self.timeout_seconds == 0 {
            return Err(FusionError::Config(
                "timeout_seconds must be greater than 0".into(),
            ));
        }
        if self.top_k == 0 {
            return Err(FusionError::Config("top_k must be greater than 0".into()));
        }
        Ok(())
    }
}

fn validate_http_url(field: &str, raw: &str) -> Result<(), FusionError> {
    let parsed = Url::parse(raw)
        .map_err(|e| FusionError::Config(format!("{field} is not a valid URL: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(FusionError::Config(format!(
            "{field} must use http or https, got {other}"
        ))),
    }
}
