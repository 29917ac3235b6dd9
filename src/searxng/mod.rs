//! SearXNG metasearch client
//!
//! Queries a SearXNG instance's JSON API, caches post-processed responses
//! keyed by query URL and filters results by score, URL and host.

pub mod cache;
pub mod client;
pub mod filters;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use cache::{MemoryCache, ResultCache, SqliteCache};
pub use client::{build_query_url, decode_encoded_characters, SearxngClient, SearxngOptions};

/// One search hit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearxResult {
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parsed_url: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub engines: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub positions: Vec<u32>,
    #[serde(default)]
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// A full JSON API response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub number_of_results: usize,
    #[serde(default)]
    pub results: Vec<SearxResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub answers: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub corrections: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub infoboxes: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unresponsive_engines: Vec<Value>,
}
