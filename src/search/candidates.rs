//! Candidate store - the fixed universe of searchable texts for one session

use anyhow::{Context, Result};
use std::path::Path;

/// Immutable ordered sequence of candidate texts.
///
/// Duplicates are kept as-is; a candidate's identity is its index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateStore {
    items: Vec<String>,
}

impl CandidateStore {
    pub fn new<I, S>(candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            items: candidates.into_iter().map(Into::into).collect(),
        }
    }

    /// One candidate per non-blank line
    pub fn from_lines(text: &str) -> Self {
        Self::new(text.lines().filter(|l| !l.trim().is_empty()))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read candidates from {}", path.display()))?;
        Ok(Self::from_lines(&content))
    }

    pub fn candidates(&self) -> &[String] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.items.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(String::as_str)
    }

    /// Borrowed view, handy for batch embedding
    pub fn as_strs(&self) -> Vec<&str> {
        self.iter().collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for CandidateStore {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self::new(iter)
    }
}
