//! Rerank strategy - nearest-neighbour retrieval, then cross-encoder reranking
//!
//! The only strategy allowed to return fewer results than candidates:
//! scores below the threshold are dropped and at most `top_k` survive.

use super::ScoringStrategy;
use crate::core::config::RerankConfig;
use crate::core::error::SearchError;
use crate::search::aggregate::sort_descending;
use crate::search::candidates::CandidateStore;
use crate::search::cross_encoder::CrossEncoder;
use crate::search::embedder::{embed_all, Embedder};
use crate::search::hnsw::HnswIndex;
use crate::search::result::{ScoredResult, SearchResultSet};

pub const NAME: &str = "rerank";

pub struct RerankStrategy<'a> {
    embedder: &'a dyn Embedder,
    index: &'a HnswIndex,
    reranker: &'a dyn CrossEncoder,
    top_k: usize,
    threshold: f32,
    pool_size: usize,
    ef_search: usize,
}

impl<'a> RerankStrategy<'a> {
    pub fn new(
        embedder: &'a dyn Embedder,
        index: &'a HnswIndex,
        reranker: &'a dyn CrossEncoder,
        config: &RerankConfig,
        ef_search: usize,
    ) -> Self {
        Self {
            embedder,
            index,
            reranker,
            top_k: config.top_k,
            threshold: config.threshold,
            pool_size: config.pool_size(),
            ef_search,
        }
    }

    fn rerank_one(
        &self,
        candidates: &CandidateStore,
        query: &str,
        query_vec: &[f32],
    ) -> Result<Vec<ScoredResult>, SearchError> {
        let pool = self.pool_size.min(candidates.len());
        let mut retrieved: Vec<usize> = self
            .index
            .search(query_vec, pool, self.ef_search.max(pool))
            .into_iter()
            .map(|(idx, _)| idx)
            .collect();
        // Candidate order decides ties after reranking
        retrieved.sort_unstable();

        let texts: Vec<&str> = retrieved
            .iter()
            .filter_map(|&idx| candidates.get(idx))
            .collect();
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let pairs: Vec<(&str, &str)> = texts.iter().map(|&text| (query, text)).collect();

        let scores = self
            .reranker
            .predict(&pairs)
            .map_err(|e| SearchError::provider(NAME, e))?;
        if scores.len() != pairs.len() {
            return Err(SearchError::ScoreCountMismatch {
                strategy: NAME,
                expected: pairs.len(),
                actual: scores.len(),
            });
        }

        let mut results: Vec<ScoredResult> = texts
            .into_iter()
            .zip(scores)
            .filter(|(_, score)| *score >= self.threshold)
            .map(|(text, score)| ScoredResult::new(text, score))
            .collect();
        sort_descending(&mut results);
        results.truncate(self.top_k);
        Ok(results)
    }
}

impl ScoringStrategy for RerankStrategy<'_> {
    fn name(&self) -> &'static str {
        NAME
    }

    fn score(
        &self,
        candidates: &CandidateStore,
        queries: &[String],
    ) -> Result<SearchResultSet, SearchError> {
        if candidates.is_empty() || queries.is_empty() {
            return Ok(SearchResultSet::new());
        }

        let query_strs: Vec<&str> = queries.iter().map(String::as_str).collect();
        let query_vecs =
            embed_all(self.embedder, &query_strs).map_err(|e| SearchError::provider(NAME, e))?;

        let mut set = SearchResultSet::new();
        for (query, query_vec) in queries.iter().zip(&query_vecs) {
            let results = self.rerank_one(candidates, query, query_vec)?;
            set.insert(query.clone(), results);
        }
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::embedder::HashingEmbedder;
    use crate::search::strategies::ann::build_index;
    use anyhow::Result;

    /// Fixed score per candidate text, looked up by its trailing digit
    struct TableScorer;

    impl CrossEncoder for TableScorer {
        fn predict(&self, pairs: &[(&str, &str)]) -> Result<Vec<f32>> {
            Ok(pairs
                .iter()
                .map(|(_, c)| match c.chars().last() {
                    Some('0') => 0.9,
                    Some('1') => 0.1,
                    Some('2') => 0.5,
                    _ => 0.3,
                })
                .collect())
        }

        fn name(&self) -> &str {
            "table"
        }
    }

    fn config(top_k: usize, threshold: f32) -> RerankConfig {
        RerankConfig {
            top_k,
            threshold,
            candidate_pool: Some(10),
        }
    }

    #[test]
    fn test_threshold_and_top_k() {
        let embedder = HashingEmbedder::new(64);
        let candidates = CandidateStore::new(["doc 0", "doc 1", "doc 2", "doc 3"]);
        let index = build_index(&embedder, &candidates, 7).unwrap();

        let set = RerankStrategy::new(&embedder, &index, &TableScorer, &config(10, 0.3), 50)
            .score(&candidates, &["doc".to_string()])
            .unwrap();
        let texts: Vec<&str> = set.get("doc").unwrap().iter().map(|r| r.text.as_str()).collect();
        // 0.1 falls under the threshold; 0.3 is kept
        assert_eq!(texts, vec!["doc 0", "doc 2", "doc 3"]);

        let set = RerankStrategy::new(&embedder, &index, &TableScorer, &config(2, 0.3), 50)
            .score(&candidates, &["doc".to_string()])
            .unwrap();
        assert_eq!(set.get("doc").unwrap().len(), 2);
    }

    #[test]
    fn test_everything_filtered_gives_empty_list() {
        let embedder = HashingEmbedder::new(64);
        let candidates = CandidateStore::new(["doc 1"]);
        let index = build_index(&embedder, &candidates, 7).unwrap();

        let set = RerankStrategy::new(&embedder, &index, &TableScorer, &config(10, 0.3), 50)
            .score(&candidates, &["doc".to_string()])
            .unwrap();
        assert!(set.contains_query("doc"));
        assert!(set.get("doc").unwrap().is_empty());
    }
}
