//! Multi-strategy semantic search
//!
//! Candidates are ranked against queries by one of five strategies:
//! vector cosine, approximate nearest neighbour, cross-encoder, graph
//! PageRank or retrieve-then-rerank. Fusion retrieval over dense + BM25
//! retrievers is available separately.

pub mod aggregate;
pub mod bm25;
pub mod candidates;
pub mod cross_encoder;
pub mod embedder;
pub mod fusion;
pub mod graph;
pub mod hnsw;
pub mod lazy;
pub mod result;
pub mod session;
pub mod strategies;

pub use candidates::CandidateStore;
pub use cross_encoder::{create_cross_encoder, CrossEncoder};
pub use embedder::{create_embedder, Embedder, HashingEmbedder, Model2VecEmbedder};
pub use fusion::{FusionIndex, FusionMode, FusionRetriever};
pub use graph::GraphMode;
pub use result::{Queries, ScoredResult, SearchResultSet};
pub use session::{SemanticSearch, SemanticSearchBuilder};
pub use strategies::{ScoringStrategy, Strategy};
