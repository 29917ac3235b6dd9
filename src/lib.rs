//! semsearch - multi-strategy semantic search over a fixed candidate set
//!
//! A [`search::SemanticSearch`] session owns an immutable list of candidate
//! texts and ranks them against one or more queries with one of five
//! independent strategies:
//!
//! - Vector: cosine similarity between embeddings
//! - Approximate NN: HNSW index over candidate embeddings
//! - Cross-encoder: joint relevance score per (query, candidate) pair
//! - Graph: PageRank over a query/candidate similarity graph
//! - Rerank: top-k retrieval followed by cross-encoder reranking
//!
//! Every strategy returns a [`search::SearchResultSet`] mapping each query to
//! its candidates sorted by descending score.

pub mod core;
pub mod search;
pub mod searxng;
pub mod tokens;

pub use crate::core::config::Config;
pub use crate::core::error::SearchError;
pub use crate::search::{
    CandidateStore, Queries, ScoredResult, SearchResultSet, SemanticSearch, Strategy,
};
