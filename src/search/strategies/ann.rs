//! Approximate nearest-neighbour strategy
//!
//! Searches an HNSW index with k = all candidates. Nodes the graph walk
//! does not reach are scored exactly, so every candidate appears once.

use anyhow::Result;

use super::ScoringStrategy;
use crate::core::error::SearchError;
use crate::search::aggregate::rank;
use crate::search::candidates::CandidateStore;
use crate::search::embedder::{cosine_similarity, embed_all, Embedder};
use crate::search::hnsw::HnswIndex;
use crate::search::result::SearchResultSet;

pub const NAME: &str = "ann";

/// Index candidate embeddings; node `i` is candidate `i`
pub fn build_index(embedder: &dyn Embedder, candidates: &CandidateStore, seed: u64) -> Result<HnswIndex> {
    let vectors = embed_all(embedder, &candidates.as_strs())?;
    Ok(HnswIndex::build(vectors, seed))
}

pub struct AnnStrategy<'a> {
    embedder: &'a dyn Embedder,
    index: &'a HnswIndex,
    ef_search: usize,
}

impl<'a> AnnStrategy<'a> {
    pub fn new(embedder: &'a dyn Embedder, index: &'a HnswIndex, ef_search: usize) -> Self {
        Self {
            embedder,
            index,
            ef_search,
        }
    }
}

impl ScoringStrategy for AnnStrategy<'_> {
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
        if self.index.len() != candidates.len() {
            return Err(SearchError::provider(
                NAME,
                anyhow::anyhow!(
                    "index holds {} vectors for {} candidates",
                    self.index.len(),
                    candidates.len()
                ),
            ));
        }

        let query_strs: Vec<&str> = queries.iter().map(String::as_str).collect();
        let query_vecs =
            embed_all(self.embedder, &query_strs).map_err(|e| SearchError::provider(NAME, e))?;

        let k = candidates.len();
        let mut set = SearchResultSet::new();
        for (query, query_vec) in queries.iter().zip(&query_vecs) {
            let mut scores: Vec<Option<f32>> = vec![None; k];
            for (idx, similarity) in self.index.search(query_vec, k, self.ef_search.max(k)) {
                scores[idx] = Some(similarity);
            }

            let scores: Vec<f32> = scores
                .into_iter()
                .enumerate()
                .map(|(idx, score)| {
                    score.unwrap_or_else(|| {
                        self.index
                            .vector(idx)
                            .map_or(0.0, |v| cosine_similarity(query_vec, v))
                    })
                })
                .collect();

            set.insert(query.clone(), rank(candidates, &scores));
        }

        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::embedder::HashingEmbedder;

    #[test]
    fn test_returns_every_candidate() {
        let embedder = HashingEmbedder::new(64);
        let candidates: CandidateStore = (0..40).map(|i| format!("item number {}", i)).collect();
        let index = build_index(&embedder, &candidates, 42).unwrap();

        let queries = vec!["item number 7".to_string()];
        let set = AnnStrategy::new(&embedder, &index, 10)
            .score(&candidates, &queries)
            .unwrap();

        let results = set.get("item number 7").unwrap();
        assert_eq!(results.len(), 40);
        assert_eq!(results[0].text, "item number 7");
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_duplicates_are_distinct_entries() {
        let embedder = HashingEmbedder::new(32);
        let candidates = CandidateStore::new(["same", "same", "other"]);
        let index = build_index(&embedder, &candidates, 1).unwrap();

        let set = AnnStrategy::new(&embedder, &index, 10)
            .score(&candidates, &["same".to_string()])
            .unwrap();
        let texts: Vec<&str> = set.get("same").unwrap().iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["same", "same", "other"]);
    }

    #[test]
    fn test_index_size_mismatch_is_error() {
        let embedder = HashingEmbedder::new(8);
        let index = build_index(&embedder, &CandidateStore::new(["a"]), 0).unwrap();

        let result = AnnStrategy::new(&embedder, &index, 10)
            .score(&CandidateStore::new(["a", "b"]), &["q".to_string()]);
        assert!(result.is_err());
    }
}
