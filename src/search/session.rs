//! Search facade
//!
//! [`SemanticSearch`] owns the candidate list and every model handle a
//! strategy may need. Handles are built on first use through the factories
//! given to [`SemanticSearchBuilder`]; the candidate list never changes, so
//! derived indexes are built once per session.

use anyhow::Result;
use once_cell::sync::OnceCell;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info_span};

use super::aggregate::sort_descending;
use super::candidates::CandidateStore;
use super::cross_encoder::{create_cross_encoder, CrossEncoder};
use super::embedder::{create_embedder, Embedder};
use super::fusion::{ChunkParams, FusionIndex, FusionMode, FusionRetriever};
use super::graph::PageRankParams;
use super::hnsw::HnswIndex;
use super::lazy::LazyHandle;
use super::result::{Queries, ScoredResult, SearchResultSet};
use super::strategies::{
    ann, AnnStrategy, CrossEncoderStrategy, GraphStrategy, RerankStrategy, ScoringStrategy,
    Strategy, VectorStrategy,
};
use crate::core::config::Config;
use crate::core::error::SearchError;

const FUSION: &str = "fusion";

type EmbedderHandle = Arc<LazyHandle<Arc<dyn Embedder>>>;

// ============================================================================
// Builder
// ============================================================================

pub struct SemanticSearchBuilder {
    candidates: CandidateStore,
    config: Config,
    embedder: Option<LazyHandle<Arc<dyn Embedder>>>,
    cross_encoder: Option<LazyHandle<Arc<dyn CrossEncoder>>>,
    reranker: Option<LazyHandle<Arc<dyn CrossEncoder>>>,
    fusion: Option<LazyHandle<Arc<dyn FusionRetriever>>>,
}

impl SemanticSearchBuilder {
    pub fn new(candidates: CandidateStore) -> Self {
        Self {
            candidates,
            config: Config::default(),
            embedder: None,
            cross_encoder: None,
            reranker: None,
            fusion: None,
        }
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(LazyHandle::ready(embedder));
        self
    }

    /// Embedder built on first use
    pub fn embedder_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn Embedder>> + Send + Sync + 'static,
    {
        self.embedder = Some(LazyHandle::new(factory));
        self
    }

    pub fn cross_encoder(mut self, encoder: Arc<dyn CrossEncoder>) -> Self {
        self.cross_encoder = Some(LazyHandle::ready(encoder));
        self
    }

    pub fn cross_encoder_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn CrossEncoder>> + Send + Sync + 'static,
    {
        self.cross_encoder = Some(LazyHandle::new(factory));
        self
    }

    /// Reranking model for the rerank strategy
    pub fn reranker(mut self, reranker: Arc<dyn CrossEncoder>) -> Self {
        self.reranker = Some(LazyHandle::ready(reranker));
        self
    }

    pub fn fusion_retriever(mut self, retriever: Arc<dyn FusionRetriever>) -> Self {
        self.fusion = Some(LazyHandle::ready(retriever));
        self
    }

    pub fn build(self) -> SemanticSearch {
        let embedder: EmbedderHandle = Arc::new(self.embedder.unwrap_or_else(|| {
            let config = self.config.search.embedder.clone();
            LazyHandle::new(move || create_embedder(&config))
        }));

        let cross_encoder = self.cross_encoder.unwrap_or_else(|| {
            lazy_cross_encoder(self.config.search.cross_encoder.clone(), embedder.clone())
        });
        let reranker = self.reranker.unwrap_or_else(|| {
            lazy_cross_encoder(self.config.search.reranker.clone(), embedder.clone())
        });

        let fusion = self.fusion.unwrap_or_else(|| {
            let documents = self.candidates.candidates().to_vec();
            let fusion_config = self.config.fusion.clone();
            let embedder = embedder.clone();
            LazyHandle::new(move || {
                let model = embedder.get()?.clone();
                let index = FusionIndex::setup(
                    &documents,
                    &ChunkParams::from(&fusion_config),
                    model,
                    &fusion_config,
                )?;
                Ok(Arc::new(index) as Arc<dyn FusionRetriever>)
            })
        });

        SemanticSearch {
            candidates: self.candidates,
            config: self.config,
            embedder,
            cross_encoder,
            reranker,
            fusion,
            ann_index: OnceCell::new(),
        }
    }
}

fn lazy_cross_encoder(
    config: crate::core::config::CrossEncoderConfig,
    embedder: EmbedderHandle,
) -> LazyHandle<Arc<dyn CrossEncoder>> {
    LazyHandle::new(move || {
        let model = embedder.get()?.clone();
        create_cross_encoder(&config, model)
    })
}

// ============================================================================
// Session
// ============================================================================

pub struct SemanticSearch {
    candidates: CandidateStore,
    config: Config,
    embedder: EmbedderHandle,
    cross_encoder: LazyHandle<Arc<dyn CrossEncoder>>,
    reranker: LazyHandle<Arc<dyn CrossEncoder>>,
    fusion: LazyHandle<Arc<dyn FusionRetriever>>,
    ann_index: OnceCell<HnswIndex>,
}

impl SemanticSearch {
    /// Session with providers built from `config` on first use
    pub fn new(candidates: CandidateStore, config: Config) -> Self {
        Self::builder(candidates).config(config).build()
    }

    pub fn builder(candidates: CandidateStore) -> SemanticSearchBuilder {
        SemanticSearchBuilder::new(candidates)
    }

    pub fn candidates(&self) -> &CandidateStore {
        &self.candidates
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Rank candidates with the configured default strategy
    pub fn search(&self, queries: impl Into<Queries>) -> Result<SearchResultSet, SearchError> {
        self.search_with(self.config.search.default_strategy, queries)
    }

    pub fn search_with(
        &self,
        strategy: Strategy,
        queries: impl Into<Queries>,
    ) -> Result<SearchResultSet, SearchError> {
        let queries = queries.into();
        if queries.is_empty() || self.candidates.is_empty() {
            return Ok(SearchResultSet::new());
        }

        let span = info_span!(
            "search",
            strategy = strategy.as_str(),
            queries = queries.len(),
            candidates = self.candidates.len()
        );
        let _enter = span.enter();
        let start = Instant::now();

        let name = strategy.as_str();
        let queries = queries.as_slice();
        let result = match strategy {
            Strategy::Vector => {
                let embedder = self.embedder(name)?;
                self.run(&VectorStrategy::new(embedder), queries)
            }
            Strategy::ApproximateNn => {
                let embedder = self.embedder(name)?;
                let index = self.ann_index(name)?;
                self.run(
                    &AnnStrategy::new(embedder, index, self.config.ann.ef_search),
                    queries,
                )
            }
            Strategy::CrossEncoder => {
                let encoder = self
                    .cross_encoder
                    .get()
                    .map_err(|e| SearchError::init(name, "cross-encoder", e))?;
                self.run(&CrossEncoderStrategy::new(encoder.as_ref()), queries)
            }
            Strategy::Graph => {
                let embedder = self.embedder(name)?;
                let params = PageRankParams::from(&self.config.graph);
                self.run(
                    &GraphStrategy::new(embedder, self.config.graph.mode, params),
                    queries,
                )
            }
            Strategy::Rerank => {
                let embedder = self.embedder(name)?;
                let index = self.ann_index(name)?;
                let reranker = self
                    .reranker
                    .get()
                    .map_err(|e| SearchError::init(name, "reranker", e))?;
                self.run(
                    &RerankStrategy::new(
                        embedder,
                        index,
                        reranker.as_ref(),
                        &self.config.rerank,
                        self.config.ann.ef_search,
                    ),
                    queries,
                )
            }
        };

        debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            ok = result.is_ok(),
            "search finished"
        );
        result
    }

    /// Fusion retrieval with the configured mode
    pub fn fusion_search(&self, queries: impl Into<Queries>) -> Result<Vec<ScoredResult>, SearchError> {
        self.fusion_search_with(self.config.fusion.mode, queries)
    }

    /// One flat list across all queries, sorted by descending fused score
    pub fn fusion_search_with(
        &self,
        mode: FusionMode,
        queries: impl Into<Queries>,
    ) -> Result<Vec<ScoredResult>, SearchError> {
        let queries = queries.into();
        if queries.is_empty() || self.candidates.is_empty() {
            return Ok(Vec::new());
        }

        let span = info_span!("fusion_search", mode = mode.as_str(), queries = queries.len());
        let _enter = span.enter();
        let start = Instant::now();

        let retriever = self
            .fusion
            .get()
            .map_err(|e| SearchError::init(FUSION, "fusion index", e))?;

        let settings = &self.config.fusion;
        let mut results = Vec::new();
        for query in queries.as_slice() {
            let response = retriever
                .query(query, mode, settings.threshold, settings.top_k)
                .map_err(|e| SearchError::provider(FUSION, e))?;
            results.extend(
                response
                    .nodes
                    .into_iter()
                    .map(|node| ScoredResult::new(node.text, node.score)),
            );
        }
        sort_descending(&mut results);

        debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            results = results.len(),
            "fusion search finished"
        );
        Ok(results)
    }

    fn run(
        &self,
        strategy: &dyn ScoringStrategy,
        queries: &[String],
    ) -> Result<SearchResultSet, SearchError> {
        strategy.score(&self.candidates, queries)
    }

    fn embedder(&self, strategy: &'static str) -> Result<&dyn Embedder, SearchError> {
        self.embedder
            .get()
            .map(|e| e.as_ref())
            .map_err(|e| SearchError::init(strategy, "embedding model", e))
    }

    fn ann_index(&self, strategy: &'static str) -> Result<&HnswIndex, SearchError> {
        self.ann_index.get_or_try_init(|| {
            let embedder = self.embedder(strategy)?;
            let start = Instant::now();
            let index = ann::build_index(embedder, &self.candidates, self.config.ann.seed)
                .map_err(|e| SearchError::init(strategy, "ann index", e))?;
            debug!(
                nodes = index.len(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "ann index built"
            );
            Ok(index)
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::embedder::HashingEmbedder;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn store() -> CandidateStore {
        CandidateStore::new([
            "config.server.port",
            "config.server.host",
            "config.database.url",
            "logging.level",
        ])
    }

    fn session() -> SemanticSearch {
        SemanticSearch::builder(store())
            .embedder(Arc::new(HashingEmbedder::new(128)))
            .build()
    }

    #[test]
    fn test_session_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SemanticSearch>();
    }

    #[test]
    fn test_single_string_query() {
        let set = session().search("config.database.url").unwrap();
        assert_eq!(set.len(), 1);
        let results = set.get("config.database.url").unwrap();
        assert_eq!(results.len(), 4);
        assert_eq!(results[0].text, "config.database.url");
    }

    #[test]
    fn test_every_strategy_answers() {
        let search = session();
        for strategy in Strategy::ALL {
            let set = search
                .search_with(strategy, vec!["server port", "database"])
                .unwrap();
            assert_eq!(set.len(), 2, "{strategy}");
            if !strategy.may_drop_candidates() {
                assert!(set.iter().all(|(_, r)| r.len() == 4), "{strategy}");
            }
        }
    }

    #[test]
    fn test_empty_inputs_skip_model_loading() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let search = SemanticSearch::builder(CandidateStore::default())
            .embedder_factory(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(HashingEmbedder::new(8)) as Arc<dyn Embedder>)
            })
            .build();

        assert!(search.search("q").unwrap().is_empty());
        assert!(session().search(Vec::<String>::new()).unwrap().is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_initialization_failure_names_strategy() {
        let search = SemanticSearch::builder(store())
            .embedder_factory(|| anyhow::bail!("model file missing"))
            .build();

        let err = search.search_with(Strategy::Vector, "q").unwrap_err();
        assert!(matches!(err, SearchError::Initialization { .. }));
        assert_eq!(err.strategy(), Some("vector"));
    }

    #[test]
    fn test_embedder_built_once_across_strategies() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let search = SemanticSearch::builder(store())
            .embedder_factory(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(HashingEmbedder::new(32)) as Arc<dyn Embedder>)
            })
            .build();

        search.search_with(Strategy::Vector, "a").unwrap();
        search.search_with(Strategy::ApproximateNn, "b").unwrap();
        search.search_with(Strategy::CrossEncoder, "c").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_fusion_search_flat_sorted() {
        let results = session()
            .fusion_search(vec!["server", "database"])
            .unwrap();
        assert!(!results.is_empty());
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }
}
