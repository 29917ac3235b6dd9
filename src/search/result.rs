//! Result types shared by every strategy

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::Deserialize;
use std::collections::HashMap;

/// One ranked candidate
#[derive(Debug, Clone, PartialEq, serde::Serialize, Deserialize)]
pub struct ScoredResult {
    pub text: String,
    pub score: f32,
}

impl ScoredResult {
    pub fn new(text: impl Into<String>, score: f32) -> Self {
        Self {
            text: text.into(),
            score,
        }
    }
}

/// Queries normalized to an ordered list.
///
/// Built from a single string or any sequence of strings; strategies only
/// ever see the list form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Queries(Vec<String>);

impl Queries {
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}

impl From<&str> for Queries {
    fn from(query: &str) -> Self {
        Self(vec![query.to_string()])
    }
}

impl From<String> for Queries {
    fn from(query: String) -> Self {
        Self(vec![query])
    }
}

impl From<Vec<String>> for Queries {
    fn from(queries: Vec<String>) -> Self {
        Self(queries)
    }
}

impl From<&[String]> for Queries {
    fn from(queries: &[String]) -> Self {
        Self(queries.to_vec())
    }
}

impl From<Vec<&str>> for Queries {
    fn from(queries: Vec<&str>) -> Self {
        Self(queries.into_iter().map(String::from).collect())
    }
}

impl From<&[&str]> for Queries {
    fn from(queries: &[&str]) -> Self {
        Self(queries.iter().map(|q| q.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Queries {
    fn from(queries: [&str; N]) -> Self {
        Self(queries.iter().map(|q| q.to_string()).collect())
    }
}

/// Mapping from query text to its ranked candidates.
///
/// Keys keep the order in which queries were first inserted. Inserting a
/// query that is already present replaces its results in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResultSet {
    entries: Vec<(String, Vec<ScoredResult>)>,
    positions: HashMap<String, usize>,
}

impl SearchResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, query: impl Into<String>, results: Vec<ScoredResult>) {
        let query = query.into();
        match self.positions.get(&query) {
            Some(&pos) => self.entries[pos].1 = results,
            None => {
                self.positions.insert(query.clone(), self.entries.len());
                self.entries.push((query, results));
            }
        }
    }

    pub fn get(&self, query: &str) -> Option<&[ScoredResult]> {
        self.positions
            .get(query)
            .map(|&pos| self.entries[pos].1.as_slice())
    }

    pub fn contains_query(&self, query: &str) -> bool {
        self.get(query).is_some()
    }

    pub fn queries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(q, _)| q.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ScoredResult])> {
        self.entries.iter().map(|(q, r)| (q.as_str(), r.as_slice()))
    }

    /// Keep at most `limit` results per query
    pub fn truncate(&mut self, limit: usize) {
        for (_, results) in &mut self.entries {
            results.truncate(limit);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for SearchResultSet {
    type Item = (String, Vec<ScoredResult>);
    type IntoIter = std::vec::IntoIter<(String, Vec<ScoredResult>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl FromIterator<(String, Vec<ScoredResult>)> for SearchResultSet {
    fn from_iter<T: IntoIterator<Item = (String, Vec<ScoredResult>)>>(iter: T) -> Self {
        let mut set = Self::new();
        for (query, results) in iter {
            set.insert(query, results);
        }
        set
    }
}

impl Serialize for SearchResultSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (query, results) in &self.entries {
            map.serialize_entry(query, results)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queries_normalization() {
        assert_eq!(Queries::from("one").as_slice(), &["one".to_string()]);
        assert_eq!(Queries::from(["a", "b"]).len(), 2);
        assert!(Queries::from(Vec::<String>::new()).is_empty());
    }

    #[test]
    fn test_insert_replaces_existing_query() {
        let mut set = SearchResultSet::new();
        set.insert("q1", vec![ScoredResult::new("a", 1.0)]);
        set.insert("q2", vec![]);
        set.insert("q1", vec![ScoredResult::new("b", 0.5)]);

        assert_eq!(set.len(), 2);
        assert_eq!(set.queries().collect::<Vec<_>>(), vec!["q1", "q2"]);
        assert_eq!(set.get("q1").unwrap()[0].text, "b");
        assert!(set.get("missing").is_none());
    }

    #[test]
    fn test_large_batch_keeps_order_and_lookup() {
        let set: SearchResultSet = (0..2000)
            .map(|i| (format!("q{i}"), vec![ScoredResult::new("c", i as f32)]))
            .collect();

        assert_eq!(set.len(), 2000);
        assert_eq!(set.queries().nth(1234), Some("q1234"));
        assert_eq!(set.get("q1999").unwrap()[0].score, 1999.0);
    }

    #[test]
    fn test_serializes_as_object() {
        let mut set = SearchResultSet::new();
        set.insert("q", vec![ScoredResult::new("a", 0.5)]);

        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json, serde_json::json!({"q": [{"text": "a", "score": 0.5}]}));
    }

    #[test]
    fn test_truncate_per_query() {
        let mut set = SearchResultSet::new();
        set.insert(
            "q",
            vec![ScoredResult::new("a", 0.9), ScoredResult::new("b", 0.1)],
        );
        set.truncate(1);
        assert_eq!(set.get("q").unwrap().len(), 1);
    }
}
