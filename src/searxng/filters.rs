//! Result post-processing for SearXNG responses

use serde_json::Value;
use std::collections::{HashMap, HashSet};

use super::SearxResult;

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Recursively drop null, `""`, `[]` and `{}` from objects and arrays.
///
/// Emptiness is judged before recursing, so a container that only becomes
/// empty after cleaning is kept.
pub fn remove_empty_attributes(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !is_empty_value(v))
                .map(|(k, v)| (k, remove_empty_attributes(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .filter(|v| !is_empty_value(v))
                .map(remove_empty_attributes)
                .collect(),
        ),
        other => other,
    }
}

pub fn filter_relevant(results: Vec<SearxResult>, threshold: f64) -> Vec<SearxResult> {
    results.into_iter().filter(|r| r.score >= threshold).collect()
}

/// First result per URL wins
pub fn deduplicate_results(results: Vec<SearxResult>) -> Vec<SearxResult> {
    let mut seen = HashSet::new();
    results
        .into_iter()
        .filter(|r| seen.insert(r.url.clone()))
        .collect()
}

/// NaN sinks to the bottom and both zeros compare equal
fn score_key(score: f64) -> f64 {
    if score.is_nan() {
        f64::NEG_INFINITY
    } else if score == 0.0 {
        0.0
    } else {
        score
    }
}

/// Stable sort, highest score first
pub fn sort_by_score(mut results: Vec<SearxResult>) -> Vec<SearxResult> {
    results.sort_by(|a, b| score_key(b.score).total_cmp(&score_key(a.score)));
    results
}

/// Host part of a URL; empty when the URL does not parse
pub fn host_of(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.host_str().map(|h| match u.port() {
                Some(port) => format!("{}:{}", h, port),
                None => h.to_string(),
            })
        })
        .unwrap_or_default()
}

/// Keep the highest-scoring result per host
pub fn filter_unique_hosts(results: Vec<SearxResult>) -> Vec<SearxResult> {
    let mut order: Vec<String> = Vec::new();
    let mut best: HashMap<String, SearxResult> = HashMap::new();

    for result in results {
        let host = host_of(&result.url);
        match best.get(&host) {
            Some(current) if result.score <= current.score => {}
            Some(_) => {
                best.insert(host, result);
            }
            None => {
                order.push(host.clone());
                best.insert(host, result);
            }
        }
    }

    let unique: Vec<SearxResult> = order
        .into_iter()
        .filter_map(|host| best.remove(&host))
        .collect();
    sort_by_score(unique)
}
