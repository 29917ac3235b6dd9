//! Tokenization utilities
//!
//! - [`parallel_tokenize`]: split a list into contiguous chunks, tokenize the
//!   chunks on a fixed pool of workers, concatenate in input order
//! - [`TokenCounter`]: token counts from a HuggingFace `tokenizer.json`, or
//!   from a regex word splitter when no tokenizer is available

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use rayon::prelude::*;
use regex::Regex;
use std::path::Path;
use tokenizers::Tokenizer;
use tracing::{debug, warn};

// ============================================================================
// Parallel tokenization
// ============================================================================

/// Dotted path segments: `"config.server.port"` -> `["config", "server", "port"]`
pub fn split_path(path: &str) -> Vec<String> {
    path.split('.').map(str::to_string).collect()
}

/// Tokenize `items` on `workers` threads.
///
/// The input is cut into `workers` contiguous chunks (the last may be
/// shorter) and the output keeps input order.
pub fn parallel_tokenize<T, F>(items: &[String], workers: usize, tokenize: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(&str) -> T + Sync,
{
    if workers == 0 {
        anyhow::bail!("parallel_tokenize needs at least one worker");
    }
    if items.is_empty() {
        return Ok(Vec::new());
    }

    let chunk_size = items.len().div_ceil(workers);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .context("Failed to build tokenizer thread pool")?;

    let chunks: Vec<Vec<T>> = pool.install(|| {
        items
            .par_chunks(chunk_size)
            .map(|chunk| chunk.iter().map(|item| tokenize(item.as_str())).collect())
            .collect()
    });

    debug!(items = items.len(), workers, chunk_size, "tokenized");
    Ok(chunks.into_iter().flatten().collect())
}

// ============================================================================
// Token counting
// ============================================================================

lazy_static! {
    static ref WORD_RE: Regex = Regex::new(r"\w+|[^\w\s]").unwrap();
}

pub enum TokenCounter {
    HuggingFace(Box<Tokenizer>),
    /// Words and individual punctuation marks
    Words,
}

impl TokenCounter {
    pub fn from_file(path: &Path) -> Result<Self> {
        let tokenizer = Tokenizer::from_file(path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;
        Ok(Self::HuggingFace(Box::new(tokenizer)))
    }

    /// Tokenizer at `path` if it loads, word counting otherwise
    pub fn from_path_or_words(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::Words;
        };
        match Self::from_file(path) {
            Ok(counter) => counter,
            Err(e) => {
                warn!(
                    "Tokenizer {} unavailable, counting words instead: {:#}",
                    path.display(),
                    e
                );
                Self::Words
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::HuggingFace(_) => "huggingface",
            Self::Words => "words",
        }
    }

    pub fn count(&self, text: &str) -> Result<usize> {
        match self {
            Self::HuggingFace(tokenizer) => {
                let encoding = tokenizer
                    .encode(text, false)
                    .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;
                Ok(encoding.get_ids().len())
            }
            Self::Words => Ok(WORD_RE.find_iter(text).count()),
        }
    }

    pub fn count_batch(&self, texts: &[&str]) -> Result<Vec<usize>> {
        match self {
            Self::HuggingFace(tokenizer) => {
                let encodings = tokenizer
                    .encode_batch(texts.to_vec(), false)
                    .map_err(|e| anyhow::anyhow!("Batch tokenization failed: {}", e))?;
                Ok(encodings.iter().map(|e| e.get_ids().len()).collect())
            }
            Self::Words => Ok(texts.iter().map(|t| WORD_RE.find_iter(t).count()).collect()),
        }
    }

    pub fn total(&self, texts: &[&str]) -> Result<usize> {
        Ok(self.count_batch(texts)?.iter().sum())
    }
}
