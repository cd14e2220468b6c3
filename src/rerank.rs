//! Client for the optional cross-encoder reranking service.
//!
//! The service is a separate process wrapping a pretrained cross-encoder:
//!
//! ```text
//! POST /rerank  {query, documents[], top_k}  →  {results: [{index, score, text}], model, latency_ms}
//! GET  /health                               →  {status, model, model_loaded}
//! ```
//!
//! Reranking runs after fusion. It only ever improves on the fused order:
//! when the service is unreachable the fused order is kept.

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::RerankConfig;
use crate::error::{FusionError, Result};
use crate::http;
use crate::types::SearchResult;

#[derive(Debug, Serialize)]
struct RerankRequest<'a> {
    query: &'a str,
    documents: &'a [String],
    top_k: usize,
}

/// One scored document returned by the service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RerankHit {
    /// Position of the document in the request.
    pub index: usize,
    /// Cross-encoder relevance score.
    pub score: f64,
    /// Leading text of the document.
    #[serde(default)]
    pub text: String,
}

/// Response body of `POST /rerank`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RerankResponse {
    /// Hits, best first.
    pub results: Vec<RerankHit>,
    /// Model that produced the scores.
    #[serde(default)]
    pub model: String,
    /// Server-side latency.
    #[serde(default)]
    pub latency_ms: u64,
}

/// Response body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RerankHealth {
    /// `"ok"` when the service is up.
    pub status: String,
    /// Configured model name.
    #[serde(default)]
    pub model: String,
    /// Whether the model has been loaded into memory.
    #[serde(default)]
    pub model_loaded: bool,
}

/// HTTP client for the reranking service.
pub struct RerankClient {
    client: reqwest::Client,
    base_url: String,
    top_k: usize,
}

impl RerankClient {
    /// Build a client for `config.base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::Config`] for an invalid configuration and
    /// [`FusionError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &RerankConfig) -> Result<Self> {
        config.validate()?;
        let client = http::build_client(Duration::from_secs(config.timeout_seconds))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            top_k: config.top_k,
        })
    }

    /// Score `documents` against `query`, returning at most `top_k` hits.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::InvalidInput`] for an empty query or document
    /// list, [`FusionError::Http`] on transport or status failures and
    /// [`FusionError::Parse`] for an unexpected body.
    pub async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_k: usize,
    ) -> Result<RerankResponse> {
        if query.trim().is_empty() {
            return Err(FusionError::InvalidInput("rerank query is empty".into()));
        }
        if documents.is_empty() {
            return Err(FusionError::InvalidInput(
                "rerank documents list is empty".into(),
            ));
        }

        let request = RerankRequest {
            query,
            documents,
            top_k,
        };
        let response = self
            .client
            .post(format!("{}/rerank", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| FusionError::Http(format!("rerank request failed: {e}")))?
            .error_for_status()
            .map_err(|e| FusionError::Http(format!("rerank HTTP error: {e}")))?;

        let body: RerankResponse = response
            .json()
            .await
            .map_err(|e| FusionError::Parse(format!("rerank response malformed: {e}")))?;

        tracing::debug!(
            hits = body.results.len(),
            latency_ms = body.latency_ms,
            "rerank complete"
        );
        Ok(body)
    }

    /// Query the service's health endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::Http`] or [`FusionError::Parse`] on failure.
    pub async fn health(&self) -> Result<RerankHealth> {
        self.client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .map_err(|e| FusionError::Http(format!("rerank health request failed: {e}")))?
            .error_for_status()
            .map_err(|e| FusionError::Http(format!("rerank health HTTP error: {e}")))?
            .json()
            .await
            .map_err(|e| FusionError::Parse(format!("rerank health malformed: {e}")))
    }

    /// Reorder fused results by cross-encoder score.
    ///
    /// Reranked results come first, in the service's order, with the
    /// cross-encoder score written to `score`; results the service did not
    /// return follow in their fused order. On any failure the input is
    /// returned unchanged.
    pub async fn rerank_results(
        &self,
        query: &str,
        results: Vec<SearchResult>,
    ) -> Vec<SearchResult> {
        if results.is_empty() || query.trim().is_empty() {
            return results;
        }

        let documents: Vec<String> = results
            .iter()
            .map(|r| format!("{}\n{}", r.title, r.content))
            .collect();

        match self.rerank(query, &documents, self.top_k).await {
            Ok(response) => apply_hits(results, &response.results),
            Err(err) => {
                tracing::warn!(error = %err, "rerank failed, keeping fused order");
                results
            }
        }
    }
}

fn apply_hits(results: Vec<SearchResult>, hits: &[RerankHit]) -> Vec<SearchResult> {
    let mut slots: Vec<Option<SearchResult>> = results.into_iter().map(Some).collect();
    let mut used = HashSet::new();
    let mut ordered = Vec::with_capacity(slots.len());

    for hit in hits {
        if !used.insert(hit.index) {
            continue;
        }
        if let Some(mut result) = slots.get_mut(hit.index).and_then(Option::take) {
            result.score = hit.score;
            ordered.push(result);
        }
    }
    ordered.extend(slots.into_iter().flatten());
    ordered
}
