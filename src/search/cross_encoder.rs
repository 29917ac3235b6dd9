//! Pairwise relevance scoring
//!
//! A cross-encoder scores a (query, candidate) pair jointly. Two providers:
//! - HttpCrossEncoder: remote `/rerank` endpoint (text-embeddings-inference API)
//! - EmbeddingPairScorer: cosine between embedder vectors, works offline

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::embedder::{cosine_similarity, embed_all, Embedder};
use crate::core::config::{CrossEncoderConfig, CrossEncoderKind};

/// Joint relevance model over (query, candidate) pairs
pub trait CrossEncoder: Send + Sync {
    /// One score per pair, in pair order
    fn predict(&self, pairs: &[(&str, &str)]) -> Result<Vec<f32>>;

    fn name(&self) -> &str;
}

// ============================================================================
// Embedding pair scorer
// ============================================================================

pub struct EmbeddingPairScorer {
    embedder: Arc<dyn Embedder>,
    name: String,
}

impl EmbeddingPairScorer {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        let name = format!("pair-cosine/{}", embedder.name());
        Self { embedder, name }
    }
}

impl CrossEncoder for EmbeddingPairScorer {
    fn predict(&self, pairs: &[(&str, &str)]) -> Result<Vec<f32>> {
        // Each distinct text is embedded once
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut unique: Vec<&str> = Vec::new();
        for &(query, candidate) in pairs {
            for text in [query, candidate] {
                index.entry(text).or_insert_with(|| {
                    unique.push(text);
                    unique.len() - 1
                });
            }
        }

        let vectors = embed_all(self.embedder.as_ref(), &unique)?;
        Ok(pairs
            .iter()
            .map(|(q, c)| cosine_similarity(&vectors[index[q]], &vectors[index[c]]))
            .collect())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// ============================================================================
// HTTP cross-encoder
// ============================================================================

#[derive(Debug, Serialize)]
struct RerankRequest<'a> {
    query: &'a str,
    texts: Vec<&'a str>,
    raw_scores: bool,
    truncate: bool,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct RerankScore {
    index: usize,
    score: f32,
}

/// Client for a served cross-encoder exposing `POST /rerank`
pub struct HttpCrossEncoder {
    client: reqwest::blocking::Client,
    endpoint: String,
    model_id: String,
}

impl HttpCrossEncoder {
    pub fn new(endpoint: &str, model_id: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model_id: model_id.to_string(),
        })
    }

    fn rerank(&self, query: &str, texts: Vec<&str>) -> Result<Vec<RerankScore>> {
        let url = format!("{}/rerank", self.endpoint);
        let request = RerankRequest {
            query,
            texts,
            raw_scores: true,
            truncate: true,
        };

        self.client
            .post(&url)
            .json(&request)
            .send()
            .with_context(|| format!("Rerank request to {} failed", url))?
            .error_for_status()
            .context("Rerank endpoint returned an error status")?
            .json()
            .context("Failed to decode rerank response")
    }
}

/// Score pairs with one `rerank` call per run of pairs sharing a query.
///
/// The server orders each response by score; scores are put back in input
/// order. Missing entries shorten the list so the caller's count check fires.
fn predict_by_query<F>(pairs: &[(&str, &str)], mut rerank: F) -> Result<Vec<f32>>
where
    F: FnMut(&str, Vec<&str>) -> Result<Vec<RerankScore>>,
{
    let mut scores = Vec::with_capacity(pairs.len());
    let mut start = 0;

    while start < pairs.len() {
        let query = pairs[start].0;
        let end = pairs[start..]
            .iter()
            .position(|(q, _)| *q != query)
            .map_or(pairs.len(), |offset| start + offset);

        let texts: Vec<&str> = pairs[start..end].iter().map(|(_, c)| *c).collect();
        let mut response = rerank(query, texts)?;
        response.sort_by_key(|s| s.index);
        scores.extend(response.into_iter().map(|s| s.score));
        start = end;
    }

    Ok(scores)
}

impl CrossEncoder for HttpCrossEncoder {
    fn predict(&self, pairs: &[(&str, &str)]) -> Result<Vec<f32>> {
        predict_by_query(pairs, |query, texts| {
            debug!(model = %self.model_id, texts = texts.len(), "rerank request");
            self.rerank(query, texts)
        })
    }

    fn name(&self) -> &str {
        &self.model_id
    }
}

// ============================================================================
// Factory function
// ============================================================================

pub fn create_cross_encoder(
    config: &CrossEncoderConfig,
    embedder: Arc<dyn Embedder>,
) -> Result<Arc<dyn CrossEncoder>> {
    match config.kind {
        CrossEncoderKind::Embedding => Ok(Arc::new(EmbeddingPairScorer::new(embedder))),
        CrossEncoderKind::Http => {
            let endpoint = config
                .endpoint
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("Endpoint required for HTTP cross-encoder"))?;
            let encoder = HttpCrossEncoder::new(
                endpoint,
                &config.model_id,
                Duration::from_secs(config.timeout_secs),
            )?;
            Ok(Arc::new(encoder))
        }
    }
}
