//! Scoring strategies
//!
//! Each strategy ranks every candidate against every query and returns a
//! [`SearchResultSet`] sorted by descending score. Scores are not comparable
//! across strategies.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::candidates::CandidateStore;
use super::result::SearchResultSet;
use crate::core::error::SearchError;

pub mod ann;
pub mod cross;
pub mod pagerank;
pub mod rerank;
pub mod vector;

pub use ann::AnnStrategy;
pub use cross::CrossEncoderStrategy;
pub use pagerank::GraphStrategy;
pub use rerank::RerankStrategy;
pub use vector::VectorStrategy;

/// Common interface of the five strategies
pub trait ScoringStrategy {
    fn name(&self) -> &'static str;

    fn score(
        &self,
        candidates: &CandidateStore,
        queries: &[String],
    ) -> Result<SearchResultSet, SearchError>;
}

/// Strategy selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Cosine similarity between embeddings
    Vector,
    /// HNSW nearest-neighbour search over all candidates
    #[default]
    #[serde(rename = "ann", alias = "faiss")]
    ApproximateNn,
    /// Joint (query, candidate) relevance model
    #[serde(alias = "cross")]
    CrossEncoder,
    /// PageRank over a similarity graph
    #[serde(alias = "pagerank")]
    Graph,
    /// Top-k retrieval followed by cross-encoder reranking
    Rerank,
}

impl Strategy {
    pub const ALL: [Strategy; 5] = [
        Strategy::Vector,
        Strategy::ApproximateNn,
        Strategy::CrossEncoder,
        Strategy::Graph,
        Strategy::Rerank,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Vector => vector::NAME,
            Strategy::ApproximateNn => ann::NAME,
            Strategy::CrossEncoder => cross::NAME,
            Strategy::Graph => pagerank::NAME,
            Strategy::Rerank => rerank::NAME,
        }
    }

    /// Whether results may hold fewer entries than there are candidates
    pub fn may_drop_candidates(&self) -> bool {
        matches!(self, Strategy::Rerank)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "vector" | "cosine" => Ok(Strategy::Vector),
            "ann" | "faiss" | "hnsw" => Ok(Strategy::ApproximateNn),
            "cross" | "cross_encoder" | "cross-encoder" => Ok(Strategy::CrossEncoder),
            "graph" | "pagerank" => Ok(Strategy::Graph),
            "rerank" => Ok(Strategy::Rerank),
            other => Err(SearchError::UnknownStrategy(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_from_str() {
        assert_eq!("vector".parse::<Strategy>().unwrap(), Strategy::Vector);
        assert_eq!("FAISS".parse::<Strategy>().unwrap(), Strategy::ApproximateNn);
        assert_eq!("cross-encoder".parse::<Strategy>().unwrap(), Strategy::CrossEncoder);
        assert_eq!("pagerank".parse::<Strategy>().unwrap(), Strategy::Graph);
        assert_eq!("rerank".parse::<Strategy>().unwrap(), Strategy::Rerank);
        assert!(matches!(
            "bogus".parse::<Strategy>(),
            Err(SearchError::UnknownStrategy(_))
        ));
    }

    #[test]
    fn test_display_parses_back() {
        for strategy in Strategy::ALL {
            assert_eq!(strategy.to_string().parse::<Strategy>().unwrap(), strategy);
        }
    }

    #[test]
    fn test_default_is_ann() {
        assert_eq!(Strategy::default(), Strategy::ApproximateNn);
    }

    #[test]
    fn test_serde_names() {
        let parsed: Strategy = serde_json::from_str(r#""faiss""#).unwrap();
        assert_eq!(parsed, Strategy::ApproximateNn);
        assert_eq!(
            serde_json::to_string(&Strategy::CrossEncoder).unwrap(),
            r#""cross_encoder""#
        );
    }
}
