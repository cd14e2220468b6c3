//! End-to-end search: rewrite → multi-query search → freshness → rerank.

use chrono::Utc;

use crate::backend::SearchBackend;
use crate::config::FusionConfig;
use crate::error::Result;
use crate::freshness::apply_freshness;
use crate::fusion::multi_query_search;
use crate::rerank::RerankClient;
use crate::rewrite::QueryRewriter;
use crate::types::SearchResult;

/// The full fusion pipeline over a caller-supplied backend.
///
/// Every stage degrades rather than fails: with no usable variants the
/// original query is searched alone, unparseable dates earn no bonus, and
/// an unreachable reranker leaves the fused order untouched.
pub struct FusionSearch {
    rewriter: QueryRewriter,
    config: FusionConfig,
    reranker: Option<RerankClient>,
}

impl FusionSearch {
    /// Build a pipeline; the rewriter is capped at `config.max_variants`.
    pub fn new(rewriter: QueryRewriter, config: FusionConfig) -> Self {
        let rewriter = rewriter.with_max_variants(config.max_variants);
        Self {
            rewriter,
            config,
            reranker: None,
        }
    }

    /// Rerank fused results with `client` as the final stage.
    pub fn with_reranker(mut self, client: RerankClient) -> Self {
        self.reranker = Some(client);
        self
    }

    /// The rewriter used for incoming queries.
    pub fn rewriter(&self) -> &QueryRewriter {
        &self.rewriter
    }

    /// Run `query` through every stage against `backend`.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::Config`](crate::FusionError::Config) for an
    /// invalid configuration. When only the original query survives
    /// rewriting, the backend's error for it is returned as is.
    pub async fn search<B: SearchBackend>(
        &self,
        backend: &B,
        query: &str,
    ) -> Result<Vec<SearchResult>> {
        self.config.validate()?;

        let variants = self.rewriter.rewrite(query);
        if variants.is_empty() {
            return Ok(Vec::new());
        }

        let options = self.config.search_options();
        let mut results = multi_query_search(backend, &variants, &options).await?;

        if self.config.freshness {
            apply_freshness(&mut results, Utc::now());
        }

        if let Some(ref reranker) = self.reranker {
            results = reranker.rerank_results(query.trim(), results).await;
        }

        tracing::debug!(
            variants = variants.len(),
            results = results.len(),
            "fusion search complete"
        );
        Ok(results)
    }
}
