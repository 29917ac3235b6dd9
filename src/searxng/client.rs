//! HTTP client with cache-aside lookups

use anyhow::{Context, Result};
use percent_encoding::percent_decode_str;
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::cache::{MemoryCache, ResultCache, SqliteCache};
use super::filters::{
    deduplicate_results, filter_relevant, filter_unique_hosts, remove_empty_attributes,
    sort_by_score,
};
use super::{QueryResponse, SearxResult};
use crate::core::config::SearxngConfig;

/// Per-call search options
#[derive(Debug, Clone)]
pub struct SearxngOptions {
    /// Keep at most this many results
    pub count: Option<usize>,
    pub min_score: f64,
    /// Prefixed to the query text, e.g. `site:docs.rs`
    pub filter_sites: Vec<String>,
    pub pageno: u32,
    pub use_cache: bool,
}

impl SearxngOptions {
    pub fn from_config(config: &SearxngConfig) -> Self {
        Self {
            count: None,
            min_score: config.min_score,
            filter_sites: Vec::new(),
            pageno: 1,
            use_cache: config.use_cache,
        }
    }
}

/// `base` without its query string, followed by the form-encoded params
pub fn build_query_url(base: &str, params: &[(&str, String)]) -> String {
    let base = base.split('?').next().unwrap_or(base);
    let encoded = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())))
        .finish();
    format!("{}?{}", base, encoded)
}

/// Decode `%XX` escapes; invalid UTF-8 is replaced
pub fn decode_encoded_characters(text: &str) -> String {
    percent_decode_str(text).decode_utf8_lossy().into_owned()
}

pub struct SearxngClient {
    http: Client,
    config: SearxngConfig,
    cache: Option<Box<dyn ResultCache>>,
}

impl SearxngClient {
    /// Client with the cache described by `config`: SQLite when a cache
    /// path is set, in-process memory otherwise
    pub fn new(config: SearxngConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        let cache: Box<dyn ResultCache> = match &config.cache_path {
            Some(path) => Box::new(SqliteCache::open(Path::new(path), config.cache_ttl_secs)?),
            None => Box::new(MemoryCache::new(config.cache_ttl_secs)),
        };

        Ok(Self {
            http,
            config,
            cache: Some(cache),
        })
    }

    pub fn with_cache(mut self, cache: Box<dyn ResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.cache = None;
        self
    }

    pub fn query_params(&self, query: &str, options: &SearxngOptions) -> Vec<(&'static str, String)> {
        let query = decode_encoded_characters(query);
        let q = if options.filter_sites.is_empty() {
            query
        } else {
            format!("{} {}", options.filter_sites.join(" "), query)
        };

        vec![
            ("q", q),
            ("format", "json".to_string()),
            ("pageno", options.pageno.to_string()),
            ("safesearch", self.config.safesearch.to_string()),
            ("language", self.config.language.clone()),
            ("categories", self.config.categories.join(",")),
            ("engines", self.config.engines.join(",")),
        ]
    }

    pub fn query_url(&self, query: &str, options: &SearxngOptions) -> String {
        build_query_url(&self.config.base_url, &self.query_params(query, options))
    }

    /// Search and post-process. Failures are logged and yield no results.
    pub fn search(&self, query: &str, options: &SearxngOptions) -> Vec<SearxResult> {
        match self.try_search(query, options) {
            Ok(results) => results,
            Err(e) => {
                error!("SearXNG search failed: {:#}", e);
                Vec::new()
            }
        }
    }

    pub fn try_search(&self, query: &str, options: &SearxngOptions) -> Result<Vec<SearxResult>> {
        self.search_with_fetch(query, options, |url| self.fetch(url))
    }

    fn search_with_fetch<F>(
        &self,
        query: &str,
        options: &SearxngOptions,
        fetch: F,
    ) -> Result<Vec<SearxResult>>
    where
        F: FnOnce(&str) -> Result<Value>,
    {
        let url = self.query_url(query, options);
        let cache = self.cache.as_deref().filter(|_| options.use_cache);

        if let Some(cache) = cache {
            match cache.get(&url) {
                Ok(Some(cached)) => {
                    info!(key = %url, "cache hit");
                    return Ok(cached.results);
                }
                Ok(None) => debug!(key = %url, "cache miss"),
                Err(e) => warn!("Cache lookup failed, fetching: {:#}", e),
            }
        }

        let raw = fetch(&url)?;
        let response = post_process(raw, options.min_score, options.count)?;

        if let Some(cache) = cache {
            if let Err(e) = cache.set(&url, &response) {
                warn!("Failed to cache search results: {:#}", e);
            }
        }
        Ok(response.results)
    }

    fn fetch(&self, url: &str) -> Result<Value> {
        debug!(url, "requesting");
        self.http
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .with_context(|| format!("Request failed: {}", url))?
            .error_for_status()
            .context("SearXNG returned an error status")?
            .json()
            .context("Invalid JSON from SearXNG")
    }
}

/// Raw JSON response to cleaned, filtered [`QueryResponse`].
///
/// `number_of_results` is the raw result count, before filtering.
pub fn post_process(mut raw: Value, min_score: f64, count: Option<usize>) -> Result<QueryResponse> {
    let raw_count = raw
        .get("results")
        .and_then(Value::as_array)
        .map_or(0, Vec::len);
    if let Some(object) = raw.as_object_mut() {
        object.insert("number_of_results".to_string(), Value::from(raw_count));
    }

    let cleaned = remove_empty_attributes(raw);
    let mut response: QueryResponse =
        serde_json::from_value(cleaned).context("Unexpected SearXNG response shape")?;

    let results = std::mem::take(&mut response.results);
    let results = filter_relevant(results, min_score);
    let results = deduplicate_results(results);
    let results = sort_by_score(results);
    let mut results = filter_unique_hosts(results);
    if let Some(count) = count {
        results.truncate(count);
    }
    response.results = results;
    Ok(response)
}
