//! Result aggregation: stable descending sort and per-query grouping

use std::cmp::Ordering;

use super::candidates::CandidateStore;
use super::result::{ScoredResult, SearchResultSet};
use crate::core::error::SearchError;

/// NaN sinks to the bottom and both zeros compare equal
fn sort_key(score: f32) -> f32 {
    if score.is_nan() {
        f32::NEG_INFINITY
    } else if score == 0.0 {
        0.0
    } else {
        score
    }
}

pub fn compare_desc(a: f32, b: f32) -> Ordering {
    sort_key(b).total_cmp(&sort_key(a))
}

/// Sort by descending score. Stable: equal scores keep their input order.
pub fn sort_descending(results: &mut [ScoredResult]) {
    results.sort_by(|a, b| compare_desc(a.score, b.score));
}

/// Pair each candidate with its score (by position) and sort
pub fn rank(candidates: &CandidateStore, scores: &[f32]) -> Vec<ScoredResult> {
    let mut results: Vec<ScoredResult> = candidates
        .iter()
        .zip(scores.iter())
        .map(|(text, &score)| ScoredResult::new(text, score))
        .collect();
    sort_descending(&mut results);
    results
}

/// Split a flat query-major score list into one ranked list per query.
///
/// `flat` must hold `queries.len() * candidates.len()` scores.
pub fn group_flat_scores(
    strategy: &'static str,
    queries: &[String],
    candidates: &CandidateStore,
    flat: &[f32],
) -> Result<SearchResultSet, SearchError> {
    let expected = queries.len() * candidates.len();
    if flat.len() != expected {
        return Err(SearchError::ScoreCountMismatch {
            strategy,
            expected,
            actual: flat.len(),
        });
    }

    let mut set = SearchResultSet::new();
    if candidates.is_empty() {
        return Ok(set);
    }

    for (query, chunk) in queries.iter().zip(flat.chunks(candidates.len())) {
        set.insert(query.clone(), rank(candidates, chunk));
    }
    Ok(set)
}
