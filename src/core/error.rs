//! Error taxonomy for search calls
//!
//! Providers report failures as `anyhow::Error`; strategies wrap them into
//! [`SearchError`] so the caller always learns which strategy failed.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    /// A lazily built model, encoder or index could not be constructed.
    #[error("{strategy} search: failed to initialize {resource}")]
    Initialization {
        strategy: &'static str,
        resource: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// A provider returned a different number of scores than requested.
    #[error("{strategy} search: expected {expected} scores, got {actual}")]
    ScoreCountMismatch {
        strategy: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Any other provider failure while scoring.
    #[error("{strategy} search failed")]
    Provider {
        strategy: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("unknown search strategy: {0}")]
    UnknownStrategy(String),
}

impl SearchError {
    pub fn provider(strategy: &'static str, source: anyhow::Error) -> Self {
        Self::Provider { strategy, source }
    }

    pub fn init(strategy: &'static str, resource: &'static str, source: anyhow::Error) -> Self {
        Self::Initialization {
            strategy,
            resource,
            source,
        }
    }

    /// Name of the strategy that failed, if any
    pub fn strategy(&self) -> Option<&'static str> {
        match self {
            Self::Initialization { strategy, .. }
            | Self::ScoreCountMismatch { strategy, .. }
            | Self::Provider { strategy, .. } => Some(strategy),
            Self::UnknownStrategy(_) => None,
        }
    }
}
