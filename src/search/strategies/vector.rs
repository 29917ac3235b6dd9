//! Vector strategy - cosine similarity between query and candidate embeddings

use super::ScoringStrategy;
use crate::core::error::SearchError;
use crate::search::aggregate::group_flat_scores;
use crate::search::candidates::CandidateStore;
use crate::search::embedder::{cosine_similarity, embed_all, Embedder};
use crate::search::result::SearchResultSet;

pub const NAME: &str = "vector";

pub struct VectorStrategy<'a> {
    embedder: &'a dyn Embedder,
}

impl<'a> VectorStrategy<'a> {
    pub fn new(embedder: &'a dyn Embedder) -> Self {
        Self { embedder }
    }
}

impl ScoringStrategy for VectorStrategy<'_> {
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

        let candidate_vecs = embed_all(self.embedder, &candidates.as_strs())
            .map_err(|e| SearchError::provider(NAME, e))?;
        let query_strs: Vec<&str> = queries.iter().map(String::as_str).collect();
        let query_vecs =
            embed_all(self.embedder, &query_strs).map_err(|e| SearchError::provider(NAME, e))?;

        // Query-major flat list, regrouped by the aggregator
        let flat: Vec<f32> = query_vecs
            .iter()
            .flat_map(|q| candidate_vecs.iter().map(move |c| cosine_similarity(q, c)))
            .collect();

        group_flat_scores(NAME, queries, candidates, &flat)
    }
}
