//! semsearch configuration module
//!
//! Config loading priority:
//! 1. Explicit path (`--config`)
//! 2. `SEMSEARCH_CONFIG` environment variable
//! 3. `.semsearch.json` in the current directory
//! 4. Built-in defaults
//!
//! Every field has a serde default, so partial files are fine.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::search::fusion::FusionMode;
use crate::search::graph::GraphMode;
use crate::search::Strategy;

/// Environment variable pointing at a config file
pub const CONFIG_PATH_ENV: &str = "SEMSEARCH_CONFIG";
/// Config file looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = ".semsearch.json";
pub const CONFIG_VERSION: u32 = 1;

/// Default Model2Vec model ID
pub const DEFAULT_MODEL2VEC_MODEL: &str = "minishlab/potion-base-8M";
pub const DEFAULT_CROSS_ENCODER_MODEL: &str = "cross-encoder/ms-marco-TinyBERT-L-6";
pub const DEFAULT_RERANK_MODEL: &str = "cross-encoder/ms-marco-MiniLM-L-6-v2";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub search: SearchSection,

    #[serde(default)]
    pub ann: AnnConfig,

    #[serde(default)]
    pub rerank: RerankConfig,

    #[serde(default)]
    pub graph: GraphConfig,

    #[serde(default)]
    pub fusion: FusionConfig,

    #[serde(default)]
    pub tokenize: TokenizeConfig,

    #[serde(default)]
    pub searxng: SearxngConfig,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

// ============================================================================
// Search / model selection
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSection {
    /// Strategy used by `SemanticSearch::search`
    #[serde(default, rename = "defaultStrategy")]
    pub default_strategy: Strategy,

    #[serde(default)]
    pub embedder: EmbedderConfig,

    #[serde(default = "default_cross_encoder", rename = "crossEncoder")]
    pub cross_encoder: CrossEncoderConfig,

    #[serde(default = "default_reranker")]
    pub reranker: CrossEncoderConfig,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            default_strategy: Strategy::default(),
            embedder: EmbedderConfig::default(),
            cross_encoder: default_cross_encoder(),
            reranker: default_reranker(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderKind {
    /// Built-in hashed bag-of-tokens projection, no model file
    #[default]
    Hashing,
    /// Model2Vec static embeddings
    Model2vec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedderConfig {
    #[serde(default)]
    pub kind: EmbedderKind,

    #[serde(default = "default_model_id", rename = "modelId")]
    pub model_id: String,

    /// Local model directory; takes precedence over `model_id`
    #[serde(default, rename = "modelPath")]
    pub model_path: Option<String>,

    /// Output dimension of the hashing embedder
    #[serde(default = "default_hashing_dim")]
    pub dimension: usize,
}

fn default_model_id() -> String {
    DEFAULT_MODEL2VEC_MODEL.to_string()
}

fn default_hashing_dim() -> usize {
    384
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            kind: EmbedderKind::default(),
            model_id: default_model_id(),
            model_path: None,
            dimension: default_hashing_dim(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrossEncoderKind {
    /// Cosine between the embedder's vectors of both texts
    #[default]
    Embedding,
    /// Remote `/rerank` endpoint
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossEncoderConfig {
    #[serde(default)]
    pub kind: CrossEncoderKind,

    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default, rename = "modelId")]
    pub model_id: String,

    #[serde(default = "default_request_timeout", rename = "timeoutSecs")]
    pub timeout_secs: u64,
}

fn default_request_timeout() -> u64 {
    30
}

fn default_cross_encoder() -> CrossEncoderConfig {
    CrossEncoderConfig {
        kind: CrossEncoderKind::default(),
        endpoint: None,
        model_id: DEFAULT_CROSS_ENCODER_MODEL.to_string(),
        timeout_secs: default_request_timeout(),
    }
}

fn default_reranker() -> CrossEncoderConfig {
    CrossEncoderConfig {
        model_id: DEFAULT_RERANK_MODEL.to_string(),
        ..default_cross_encoder()
    }
}

impl Default for CrossEncoderConfig {
    fn default() -> Self {
        default_cross_encoder()
    }
}

// ============================================================================
// Strategy parameters
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnConfig {
    /// Search breadth; raised to the candidate count when smaller
    #[serde(default = "default_ef_search", rename = "efSearch")]
    pub ef_search: usize,

    /// Seed for the HNSW level generator
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_ef_search() -> usize {
    100
}

fn default_seed() -> u64 {
    42
}

impl Default for AnnConfig {
    fn default() -> Self {
        Self {
            ef_search: default_ef_search(),
            seed: default_seed(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankConfig {
    #[serde(default = "default_rerank_top_k", rename = "topK")]
    pub top_k: usize,

    #[serde(default = "default_rerank_threshold")]
    pub threshold: f32,

    /// Candidates retrieved before reranking; `None` means `top_k`
    #[serde(default, rename = "candidatePool")]
    pub candidate_pool: Option<usize>,
}

fn default_rerank_top_k() -> usize {
    10
}

fn default_rerank_threshold() -> f32 {
    0.3
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            top_k: default_rerank_top_k(),
            threshold: default_rerank_threshold(),
            candidate_pool: None,
        }
    }
}

impl RerankConfig {
    pub fn pool_size(&self) -> usize {
        self.candidate_pool.unwrap_or(self.top_k).max(self.top_k)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    #[serde(default)]
    pub mode: GraphMode,

    #[serde(default = "default_damping")]
    pub damping: f64,

    #[serde(default = "default_max_iter", rename = "maxIter")]
    pub max_iter: usize,

    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

fn default_damping() -> f64 {
    0.85
}

fn default_max_iter() -> usize {
    100
}

fn default_tolerance() -> f64 {
    1.0e-6
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            mode: GraphMode::default(),
            damping: default_damping(),
            max_iter: default_max_iter(),
            tolerance: default_tolerance(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionConfig {
    #[serde(default = "default_chunk_size", rename = "chunkSize")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap", rename = "chunkOverlap")]
    pub chunk_overlap: usize,

    #[serde(default = "default_fusion_threshold")]
    pub threshold: f32,

    #[serde(default, rename = "topK")]
    pub top_k: Option<usize>,

    #[serde(default)]
    pub mode: FusionMode,

    #[serde(default = "default_dense_weight", rename = "denseWeight")]
    pub dense_weight: f32,

    #[serde(default = "default_lexical_weight", rename = "lexicalWeight")]
    pub lexical_weight: f32,

    /// Per-retriever fetch size before fusion
    #[serde(default = "default_retriever_top_k", rename = "retrieverTopK")]
    pub retriever_top_k: usize,

    #[serde(default = "default_rrf_k", rename = "rrfK")]
    pub rrf_k: usize,
}

fn default_chunk_size() -> usize {
    256
}

fn default_chunk_overlap() -> usize {
    40
}

fn default_fusion_threshold() -> f32 {
    0.2
}

fn default_dense_weight() -> f32 {
    0.6
}

fn default_lexical_weight() -> f32 {
    0.4
}

fn default_retriever_top_k() -> usize {
    20
}

fn default_rrf_k() -> usize {
    60
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            threshold: default_fusion_threshold(),
            top_k: None,
            mode: FusionMode::default(),
            dense_weight: default_dense_weight(),
            lexical_weight: default_lexical_weight(),
            retriever_top_k: default_retriever_top_k(),
            rrf_k: default_rrf_k(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenizeConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Path to a HuggingFace `tokenizer.json`
    #[serde(default, rename = "tokenizerPath")]
    pub tokenizer_path: Option<String>,
}

fn default_workers() -> usize {
    4
}

impl Default for TokenizeConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            tokenizer_path: None,
        }
    }
}

// ============================================================================
// SearXNG
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearxngConfig {
    #[serde(default = "default_searxng_url", rename = "baseUrl")]
    pub base_url: String,

    /// SQLite cache file; `None` keeps the cache in memory
    #[serde(default, rename = "cachePath")]
    pub cache_path: Option<String>,

    #[serde(default = "default_cache_ttl", rename = "cacheTtlSecs")]
    pub cache_ttl_secs: i64,

    #[serde(default = "default_true", rename = "useCache")]
    pub use_cache: bool,

    #[serde(default = "default_engines")]
    pub engines: Vec<String>,

    #[serde(default = "default_categories")]
    pub categories: Vec<String>,

    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default = "default_safesearch")]
    pub safesearch: u8,

    #[serde(default = "default_min_score", rename = "minScore")]
    pub min_score: f64,

    #[serde(default = "default_request_timeout", rename = "timeoutSecs")]
    pub timeout_secs: u64,
}

fn default_searxng_url() -> String {
    "http://localhost:3000/search".to_string()
}

fn default_cache_ttl() -> i64 {
    60 * 60 * 24
}

fn default_true() -> bool {
    true
}

fn default_engines() -> Vec<String> {
    vec![
        "google".to_string(),
        "brave".to_string(),
        "duckduckgo".to_string(),
        "bing".to_string(),
    ]
}

fn default_categories() -> Vec<String> {
    vec!["general".to_string()]
}

fn default_language() -> String {
    "en".to_string()
}

fn default_safesearch() -> u8 {
    2
}

fn default_min_score() -> f64 {
    0.2
}

impl Default for SearxngConfig {
    fn default() -> Self {
        Self {
            base_url: default_searxng_url(),
            cache_path: None,
            cache_ttl_secs: default_cache_ttl(),
            use_cache: true,
            engines: default_engines(),
            categories: default_categories(),
            language: default_language(),
            safesearch: default_safesearch(),
            min_score: default_min_score(),
            timeout_secs: default_request_timeout(),
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            search: SearchSection::default(),
            ann: AnnConfig::default(),
            rerank: RerankConfig::default(),
            graph: GraphConfig::default(),
            fusion: FusionConfig::default(),
            tokenize: TokenizeConfig::default(),
            searxng: SearxngConfig::default(),
        }
    }
}

impl Config {
    /// Load config following the lookup priority; falls back to defaults
    pub fn load(explicit: Option<&Path>) -> Self {
        let Some(path) = Self::resolve_path(explicit) else {
            return Self::default();
        };

        match Self::load_from_file(&path) {
            Ok(config) => {
                if config.version > CONFIG_VERSION {
                    warn!(
                        "config version {} is newer than supported version {}",
                        config.version, CONFIG_VERSION
                    );
                }
                config
            }
            Err(e) => {
                warn!("failed to load {}: {:#}. Using defaults.", path.display(), e);
                Self::default()
            }
        }
    }

    /// First existing config path, if any
    pub fn resolve_path(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }

        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
            warn!(
                "{} is set to '{}' but the file does not exist",
                CONFIG_PATH_ENV,
                path.display()
            );
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        local.exists().then_some(local)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Generate default config file content
    pub fn default_json() -> Result<String> {
        Ok(serde_json::to_string_pretty(&Config::default())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.version, 1);
        assert_eq!(config.search.default_strategy, Strategy::ApproximateNn);
        assert_eq!(config.rerank.top_k, 10);
        assert_eq!(config.rerank.threshold, 0.3);
        assert_eq!(config.graph.mode, GraphMode::Isolated);
        assert_eq!(config.fusion.chunk_size, 256);
        assert_eq!(config.fusion.chunk_overlap, 40);
        assert_eq!(config.tokenize.workers, 4);
    }

    #[test]
    fn test_parse_partial_config() {
        let json = r#"{"search": {"defaultStrategy": "vector"}, "rerank": {"topK": 3}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.search.default_strategy, Strategy::Vector);
        assert_eq!(config.rerank.top_k, 3);
        assert_eq!(config.rerank.threshold, 0.3);
        assert_eq!(config.search.reranker.model_id, DEFAULT_RERANK_MODEL);
    }

    #[test]
    fn test_pool_size_never_below_top_k() {
        let config = RerankConfig {
            top_k: 10,
            threshold: 0.3,
            candidate_pool: Some(4),
        };
        assert_eq!(config.pool_size(), 10);
        assert_eq!(RerankConfig::default().pool_size(), 10);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/config.json");

        let mut config = Config::default();
        config.graph.mode = GraphMode::Shared;
        config.save(&path).unwrap();

        let loaded = Config::load(Some(&path));
        assert_eq!(loaded.graph.mode, GraphMode::Shared);
    }

    #[test]
    fn test_broken_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        let config = Config::load(Some(&path));
        assert_eq!(config.rerank.top_k, 10);
    }

    #[test]
    fn test_default_json_parses_back() {
        let json = Config::default_json().unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.search.default_strategy, Strategy::ApproximateNn);
        assert_eq!(parsed.searxng.cache_ttl_secs, Config::default().searxng.cache_ttl_secs);
    }
}
