//! Cross-encoder strategy - every (query, candidate) pair scored jointly

use super::ScoringStrategy;
use crate::core::error::SearchError;
use crate::search::aggregate::group_flat_scores;
use crate::search::candidates::CandidateStore;
use crate::search::cross_encoder::CrossEncoder;
use crate::search::result::SearchResultSet;

pub const NAME: &str = "cross_encoder";

pub struct CrossEncoderStrategy<'a> {
    encoder: &'a dyn CrossEncoder,
}

impl<'a> CrossEncoderStrategy<'a> {
    pub fn new(encoder: &'a dyn CrossEncoder) -> Self {
        Self { encoder }
    }
}

impl ScoringStrategy for CrossEncoderStrategy<'_> {
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

        // Query-major: all candidates for queries[0], then queries[1], ...
        let pairs: Vec<(&str, &str)> = queries
            .iter()
            .flat_map(|q| candidates.iter().map(move |c| (q.as_str(), c)))
            .collect();

        let scores = self
            .encoder
            .predict(&pairs)
            .map_err(|e| SearchError::provider(NAME, e))?;

        if scores.len() != pairs.len() {
            return Err(SearchError::ScoreCountMismatch {
                strategy: NAME,
                expected: pairs.len(),
                actual: scores.len(),
            });
        }

        group_flat_scores(NAME, queries, candidates, &scores)
    }
}
