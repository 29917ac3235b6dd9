//! Behavioural properties shared by every strategy, checked against
//! deterministic in-process providers.

use anyhow::Result;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use semsearch::core::config::Config;
use semsearch::search::graph::GraphMode;
use semsearch::search::{CrossEncoder, Embedder, HashingEmbedder};
use semsearch::{CandidateStore, SearchError, SemanticSearch, Strategy};

// ============================================================================
// Mock providers
// ============================================================================

/// Every text maps to the same vector, so every score ties
struct ConstantEmbedder;

impl Embedder for ConstantEmbedder {
    fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![1.0, 0.0, 0.0])
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    fn dimension(&self) -> usize {
        3
    }

    fn name(&self) -> &str {
        "constant"
    }
}

/// Returns one score fewer than it was asked for and records the request size
struct DroppingEncoder {
    last_request: AtomicUsize,
}

impl CrossEncoder for DroppingEncoder {
    fn predict(&self, pairs: &[(&str, &str)]) -> Result<Vec<f32>> {
        self.last_request.store(pairs.len(), Ordering::SeqCst);
        Ok(vec![0.5; pairs.len().saturating_sub(1)])
    }

    fn name(&self) -> &str {
        "dropping"
    }
}

/// Scores a pair by how many words the two texts share
struct OverlapEncoder;

impl CrossEncoder for OverlapEncoder {
    fn predict(&self, pairs: &[(&str, &str)]) -> Result<Vec<f32>> {
        Ok(pairs
            .iter()
            .map(|(q, c)| {
                let words: Vec<&str> = c.split(|ch: char| !ch.is_alphanumeric()).collect();
                q.split_whitespace().filter(|w| words.contains(w)).count() as f32
            })
            .collect())
    }

    fn name(&self) -> &str {
        "overlap"
    }
}

// ============================================================================
// Fixtures
// ============================================================================

fn candidates() -> CandidateStore {
    CandidateStore::new([
        "config.server.port",
        "config.server.host",
        "config.database.url",
        "config.database.pool_size",
        "logging.level",
        "logging.format",
    ])
}

fn session_with(candidates: CandidateStore, config: Config) -> SemanticSearch {
    SemanticSearch::builder(candidates)
        .config(config)
        .embedder(Arc::new(HashingEmbedder::new(256)))
        .cross_encoder(Arc::new(OverlapEncoder))
        .reranker(Arc::new(OverlapEncoder))
        .build()
}

fn session() -> SemanticSearch {
    session_with(candidates(), Config::default())
}

// ============================================================================
// Properties
// ============================================================================

#[test]
fn keys_match_queries_and_lists_cover_candidates() {
    let search = session();
    let queries = vec!["server port", "database url", "log format"];

    for strategy in Strategy::ALL {
        let set = search.search_with(strategy, queries.clone()).unwrap();
        let keys: Vec<&str> = set.queries().collect();
        assert_eq!(keys, queries, "{strategy}");

        if !strategy.may_drop_candidates() {
            for (_, results) in set.iter() {
                assert_eq!(results.len(), 6, "{strategy}");
            }
        }
    }
}

#[test]
fn results_are_sorted_descending() {
    let search = session();
    for strategy in Strategy::ALL {
        let set = search
            .search_with(strategy, vec!["database pool", "server"])
            .unwrap();
        for (_, results) in set.iter() {
            for pair in results.windows(2) {
                assert!(pair[0].score >= pair[1].score, "{strategy}");
            }
        }
    }
}

#[test]
fn equal_scores_keep_candidate_order() {
    let search = SemanticSearch::builder(candidates())
        .embedder(Arc::new(ConstantEmbedder))
        .build();

    for strategy in [Strategy::Vector, Strategy::ApproximateNn, Strategy::Graph] {
        let set = search.search_with(strategy, "anything").unwrap();
        let texts: Vec<&str> = set
            .get("anything")
            .unwrap()
            .iter()
            .map(|r| r.text.as_str())
            .collect();
        assert_eq!(texts, candidates().as_strs(), "{strategy}");
    }
}

#[test]
fn candidate_used_as_query_ranks_first() {
    let search = session();
    for candidate in candidates().iter() {
        let set = search.search_with(Strategy::Vector, candidate).unwrap();
        let top = &set.get(candidate).unwrap()[0];
        assert_eq!(top.text, candidate);
        assert!((top.score - 1.0).abs() < 1e-4);
    }
}

#[test]
fn cross_encoder_count_mismatch_is_reported() {
    let encoder = Arc::new(DroppingEncoder {
        last_request: AtomicUsize::new(0),
    });
    let search = SemanticSearch::builder(CandidateStore::new(["alpha", "beta"]))
        .embedder(Arc::new(HashingEmbedder::new(16)))
        .cross_encoder(encoder.clone())
        .build();

    let err = search
        .search_with(Strategy::CrossEncoder, vec!["q1", "q2"])
        .unwrap_err();

    assert_eq!(encoder.last_request.load(Ordering::SeqCst), 4);
    match &err {
        SearchError::ScoreCountMismatch {
            expected, actual, ..
        } => {
            assert_eq!(*expected, 4);
            assert_eq!(*actual, 3);
        }
        other => panic!("unexpected error: {other}"),
    }
    let message = err.to_string();
    assert!(message.contains('4') && message.contains('3'));
}

#[test]
fn pagerank_queries_are_isolated() {
    let search = session();

    let together = search
        .search_with(Strategy::Graph, vec!["server host", "logging level"])
        .unwrap();
    let first = search.search_with(Strategy::Graph, "server host").unwrap();
    let second = search.search_with(Strategy::Graph, "logging level").unwrap();

    assert_eq!(together.get("server host"), first.get("server host"));
    assert_eq!(together.get("logging level"), second.get("logging level"));
}

#[test]
fn shared_pagerank_mode_is_opt_in() {
    let mut config = Config::default();
    config.graph.mode = GraphMode::Shared;
    let search = session_with(candidates(), config);

    let set = search
        .search_with(Strategy::Graph, vec!["server host", "logging level"])
        .unwrap();
    assert_eq!(set.get("server host"), set.get("logging level"));
}

#[test]
fn repeated_calls_are_identical() {
    let search = session();
    for strategy in Strategy::ALL {
        let first = search.search_with(strategy, vec!["database", "port"]).unwrap();
        let second = search.search_with(strategy, vec!["database", "port"]).unwrap();
        assert_eq!(first, second, "{strategy}");
    }
}

#[test]
fn empty_inputs_give_empty_results() {
    let search = session();
    assert!(search.search(Vec::<String>::new()).unwrap().is_empty());

    let empty = session_with(CandidateStore::default(), Config::default());
    for strategy in Strategy::ALL {
        assert!(empty.search_with(strategy, "q").unwrap().is_empty());
    }
}

#[test]
fn rerank_applies_threshold_and_top_k() {
    let mut config = Config::default();
    config.rerank.top_k = 2;
    config.rerank.threshold = 1.0;
    config.rerank.candidate_pool = Some(6);
    let search = session_with(candidates(), config);

    let set = search.search_with(Strategy::Rerank, "database url").unwrap();
    let results = set.get("database url").unwrap();

    assert!(results.len() <= 2);
    assert!(results.iter().all(|r| r.score >= 1.0));
    assert_eq!(results[0].text, "config.database.url");
}
