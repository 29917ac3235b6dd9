//! Fusion retrieval - dense and BM25 retrievers merged into one ranking
//!
//! Documents are split into overlapping word chunks. A query runs against
//! both retrievers and their ranked lists are fused under a [`FusionMode`].
//! Fused scores at or below the threshold are dropped.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::aggregate::compare_desc;
use super::bm25::Bm25Index;
use super::embedder::{cosine_similarity, embed_all, Embedder};
use crate::core::config::FusionConfig;

// ============================================================================
// Fusion Mode
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionMode {
    /// Weighted reciprocal rank: `weight / (k + rank)`
    ReciprocalRerank,
    /// Min-max normalize each retriever's scores, then weighted sum
    #[default]
    RelativeScore,
    /// Like relative score, with bounds at mean +/- 3 standard deviations
    DistBasedScore,
    /// Highest raw score any retriever gave the chunk
    Simple,
}

impl FusionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FusionMode::ReciprocalRerank => "reciprocal_rerank",
            FusionMode::RelativeScore => "relative_score",
            FusionMode::DistBasedScore => "dist_based_score",
            FusionMode::Simple => "simple",
        }
    }
}

impl fmt::Display for FusionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FusionMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "reciprocal_rerank" | "rrf" => Ok(FusionMode::ReciprocalRerank),
            "relative_score" | "relative" => Ok(FusionMode::RelativeScore),
            "dist_based_score" | "dist" => Ok(FusionMode::DistBasedScore),
            "simple" => Ok(FusionMode::Simple),
            other => anyhow::bail!("unknown fusion mode: {}", other),
        }
    }
}

// ============================================================================
// Chunking
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkParams {
    /// Words per chunk
    pub chunk_size: usize,
    /// Words shared by consecutive chunks
    pub chunk_overlap: usize,
}

impl Default for ChunkParams {
    fn default() -> Self {
        Self {
            chunk_size: 256,
            chunk_overlap: 40,
        }
    }
}

impl From<&FusionConfig> for ChunkParams {
    fn from(config: &FusionConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    /// Index of the source document
    pub document: usize,
}

/// Split documents into word windows. A document that fits in one chunk is
/// kept verbatim (trimmed); blank documents produce no chunks.
pub fn chunk_documents<S: AsRef<str>>(documents: &[S], params: &ChunkParams) -> Vec<Chunk> {
    let size = params.chunk_size.max(1);
    let step = size.saturating_sub(params.chunk_overlap).max(1);

    let mut chunks = Vec::new();
    for (document, text) in documents.iter().enumerate() {
        let text = text.as_ref().trim();
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.is_empty() {
            continue;
        }
        if words.len() <= size {
            chunks.push(Chunk {
                text: text.to_string(),
                document,
            });
            continue;
        }

        let mut start = 0;
        loop {
            let end = (start + size).min(words.len());
            chunks.push(Chunk {
                text: words[start..end].join(" "),
                document,
            });
            if end == words.len() {
                break;
            }
            start += step;
        }
    }
    chunks
}

// ============================================================================
// Retrieval contract
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FusionNode {
    pub text: String,
    pub score: f32,
    pub document: usize,
}

/// Fused nodes, best first; `scores[i]` is `nodes[i].score`
#[derive(Debug, Clone, Default, Serialize)]
pub struct FusionResponse {
    pub nodes: Vec<FusionNode>,
    pub scores: Vec<f32>,
}

pub trait FusionRetriever: Send + Sync {
    fn query(
        &self,
        query: &str,
        mode: FusionMode,
        threshold: f32,
        top_k: Option<usize>,
    ) -> Result<FusionResponse>;
}

// ============================================================================
// Fusion Index
// ============================================================================

/// Dense + BM25 retrievers over one chunk set
pub struct FusionIndex {
    chunks: Vec<Chunk>,
    embeddings: Vec<Vec<f32>>,
    embedder: Arc<dyn Embedder>,
    bm25: Bm25Index,
    dense_weight: f32,
    lexical_weight: f32,
    retriever_top_k: usize,
    rrf_k: usize,
}

impl FusionIndex {
    pub fn setup<S: AsRef<str>>(
        documents: &[S],
        params: &ChunkParams,
        embedder: Arc<dyn Embedder>,
        config: &FusionConfig,
    ) -> Result<Self> {
        let chunks = chunk_documents(documents, params);
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();

        let embeddings = embed_all(embedder.as_ref(), &texts).context("Failed to embed chunks")?;
        let bm25 = Bm25Index::build(&texts).context("Failed to build BM25 index")?;

        tracing::debug!(
            documents = documents.len(),
            chunks = chunks.len(),
            "fusion index ready"
        );

        Ok(Self {
            chunks,
            embeddings,
            embedder,
            bm25,
            dense_weight: config.dense_weight,
            lexical_weight: config.lexical_weight,
            retriever_top_k: config.retriever_top_k,
            rrf_k: config.rrf_k,
        })
    }

    fn dense(&self, query: &str) -> Result<Vec<(usize, f32)>> {
        let query_vec = self.embedder.embed(query)?;
        let mut hits: Vec<(usize, f32)> = self
            .embeddings
            .iter()
            .enumerate()
            .map(|(id, v)| (id, cosine_similarity(&query_vec, v)))
            .collect();
        hits.sort_by(|a, b| compare_desc(a.1, b.1));
        hits.truncate(self.retriever_top_k);
        Ok(hits)
    }

    fn lexical(&self, query: &str) -> Result<Vec<(usize, f32)>> {
        self.bm25.search(query, self.retriever_top_k)
    }
}

impl FusionRetriever for FusionIndex {
    fn query(
        &self,
        query: &str,
        mode: FusionMode,
        threshold: f32,
        top_k: Option<usize>,
    ) -> Result<FusionResponse> {
        if self.chunks.is_empty() {
            return Ok(FusionResponse::default());
        }

        let dense = self.dense(query).context("Dense retrieval failed")?;
        let lexical = self.lexical(query).context("BM25 retrieval failed")?;

        let mut fused = fuse(
            mode,
            &[(self.dense_weight, dense), (self.lexical_weight, lexical)],
            self.rrf_k,
        );
        fused.retain(|(_, score)| *score > threshold);
        if let Some(k) = top_k {
            fused.truncate(k);
        }

        let nodes: Vec<FusionNode> = fused
            .into_iter()
            .filter_map(|(id, score)| {
                self.chunks.get(id).map(|chunk| FusionNode {
                    text: chunk.text.clone(),
                    score,
                    document: chunk.document,
                })
            })
            .collect();
        let scores = nodes.iter().map(|n| n.score).collect();

        Ok(FusionResponse { nodes, scores })
    }
}

// ============================================================================
// Score fusion
// ============================================================================

/// Merge weighted ranked lists of `(chunk id, score)`. Output is sorted by
/// fused score descending, ties by chunk id.
pub fn fuse(mode: FusionMode, lists: &[(f32, Vec<(usize, f32)>)], rrf_k: usize) -> Vec<(usize, f32)> {
    let mut scores: BTreeMap<usize, f32> = BTreeMap::new();

    match mode {
        FusionMode::ReciprocalRerank => {
            let k = rrf_k as f32;
            for (weight, hits) in lists {
                for (rank, (id, _score)) in hits.iter().enumerate() {
                    *scores.entry(*id).or_insert(0.0) += weight / (k + (rank + 1) as f32);
                }
            }
        }
        FusionMode::RelativeScore | FusionMode::DistBasedScore => {
            for (weight, hits) in lists {
                let Some((min, max)) = score_bounds(hits, mode == FusionMode::DistBasedScore)
                else {
                    continue;
                };
                for (id, score) in hits {
                    let normalized = if max == min {
                        if max > 0.0 {
                            1.0
                        } else {
                            0.0
                        }
                    } else {
                        (score - min) / (max - min)
                    };
                    *scores.entry(*id).or_insert(0.0) += normalized * weight;
                }
            }
        }
        FusionMode::Simple => {
            for (_weight, hits) in lists {
                for (id, score) in hits {
                    let entry = scores.entry(*id).or_insert(f32::NEG_INFINITY);
                    *entry = entry.max(*score);
                }
            }
        }
    }

    let mut results: Vec<(usize, f32)> = scores.into_iter().collect();
    results.sort_by(|a, b| compare_desc(a.1, b.1));
    results
}

fn score_bounds(hits: &[(usize, f32)], dist_based: bool) -> Option<(f32, f32)> {
    if hits.is_empty() {
        return None;
    }
    if dist_based {
        let n = hits.len() as f32;
        let mean = hits.iter().map(|(_, s)| s).sum::<f32>() / n;
        let variance = hits.iter().map(|(_, s)| (s - mean).powi(2)).sum::<f32>() / n;
        let std = variance.sqrt();
        Some((mean - 3.0 * std, mean + 3.0 * std))
    } else {
        let min = hits.iter().map(|(_, s)| *s).fold(f32::INFINITY, f32::min);
        let max = hits.iter().map(|(_, s)| *s).fold(f32::NEG_INFINITY, f32::max);
        Some((min, max))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::embedder::HashingEmbedder;

    #[test]
    fn test_fusion_mode_from_str() {
        assert_eq!("relative_score".parse::<FusionMode>().unwrap(), FusionMode::RelativeScore);
        assert_eq!("rrf".parse::<FusionMode>().unwrap(), FusionMode::ReciprocalRerank);
        assert_eq!("dist-based-score".parse::<FusionMode>().unwrap(), FusionMode::DistBasedScore);
        assert!("nope".parse::<FusionMode>().is_err());
    }

    #[test]
    fn test_chunking_windows_overlap() {
        let doc = "w0 w1 w2 w3 w4 w5 w6 w7 w8 w9".to_string();
        let params = ChunkParams {
            chunk_size: 4,
            chunk_overlap: 1,
        };
        let chunks = chunk_documents(&[doc], &params);
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["w0 w1 w2 w3", "w3 w4 w5 w6", "w6 w7 w8 w9"]);
    }

    #[test]
    fn test_short_documents_kept_verbatim() {
        let docs = vec!["  config.server.port ", "", "a  b"];
        let chunks = chunk_documents(&docs, &ChunkParams::default());
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "config.server.port");
        assert_eq!(chunks[1].text, "a  b");
        assert_eq!(chunks[1].document, 2);
    }

    #[test]
    fn test_fuse_rrf_weights() {
        let dense = vec![(0, 0.9), (1, 0.8)];
        let lexical = vec![(1, 7.0), (2, 3.0)];
        let fused = fuse(
            FusionMode::ReciprocalRerank,
            &[(0.6, dense), (0.4, lexical)],
            60,
        );
        // chunk 1 appears in both lists
        assert_eq!(fused[0].0, 1);
        assert_eq!(fused.len(), 3);
    }

    #[test]
    fn test_fuse_relative_score() {
        let dense = vec![(0, 0.9), (1, 0.5)];
        let lexical = vec![(0, 4.0), (2, 2.0)];
        let fused = fuse(FusionMode::RelativeScore, &[(0.6, dense), (0.4, lexical)], 60);

        assert_eq!(fused[0].0, 0);
        assert!((fused[0].1 - 1.0).abs() < 1e-6);
        // minimum of each list normalizes to 0
        assert!(fused.iter().skip(1).all(|(_, s)| *s == 0.0));
        // ties keep chunk id order
        assert_eq!(fused[1].0, 1);
        assert_eq!(fused[2].0, 2);
    }

    #[test]
    fn test_fuse_dist_based_score() {
        let dense = vec![(0, 0.9), (1, 0.5)];
        let lexical = vec![(0, 4.0), (2, 2.0)];
        let fused = fuse(FusionMode::DistBasedScore, &[(0.6, dense), (0.4, lexical)], 60);

        // dense bounds 0.7 +/- 3 * 0.2, lexical bounds 3 +/- 3 * 1
        let expected = [(0, 0.6 * 0.8 / 1.2 + 0.4 * 4.0 / 6.0), (1, 0.6 * 0.4 / 1.2), (2, 0.4 * 2.0 / 6.0)];
        assert_eq!(fused.len(), expected.len());
        for ((id, score), (want_id, want)) in fused.iter().zip(expected) {
            assert_eq!(*id, want_id);
            assert!((score - want).abs() < 1e-5, "chunk {id}: {score} vs {want}");
        }
    }

    #[test]
    fn test_dist_bounds_span_six_sigma() {
        let (low, high) = score_bounds(&[(0, 2.0), (1, 4.0)], true).unwrap();
        assert!((low - 0.0).abs() < 1e-6);
        assert!((high - 6.0).abs() < 1e-6);
        assert!(score_bounds(&[], true).is_none());
    }

    #[test]
    fn test_fuse_simple_takes_max() {
        let fused = fuse(
            FusionMode::Simple,
            &[(0.6, vec![(0, 0.2)]), (0.4, vec![(0, 5.0)])],
            60,
        );
        assert_eq!(fused, vec![(0, 5.0)]);
    }

    #[test]
    fn test_index_query() -> Result<()> {
        let docs = vec![
            "rust ownership and borrowing rules",
            "python garbage collector internals",
            "rust async runtime scheduling",
        ];
        let index = FusionIndex::setup(
            &docs,
            &ChunkParams::default(),
            Arc::new(HashingEmbedder::default()),
            &FusionConfig::default(),
        )?;

        let response = index.query("rust", FusionMode::RelativeScore, 0.2, None)?;
        assert!(!response.nodes.is_empty());
        assert!(response.nodes[0].text.starts_with("rust"));
        assert!(response.scores.iter().all(|s| *s > 0.2));
        assert_eq!(response.nodes.len(), response.scores.len());

        let limited = index.query("rust", FusionMode::RelativeScore, 0.0, Some(1))?;
        assert_eq!(limited.nodes.len(), 1);
        Ok(())
    }

    #[test]
    fn test_empty_index_query() -> Result<()> {
        let docs: Vec<String> = Vec::new();
        let index = FusionIndex::setup(
            &docs,
            &ChunkParams::default(),
            Arc::new(HashingEmbedder::new(16)),
            &FusionConfig::default(),
        )?;
        assert!(index.query("x", FusionMode::Simple, 0.0, None)?.nodes.is_empty());
        Ok(())
    }
}
