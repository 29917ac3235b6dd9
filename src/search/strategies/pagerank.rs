//! Graph strategy - PageRank over a query/candidate similarity graph
//!
//! Every query becomes a synthetic node joined to each candidate with an
//! edge weighted by cosine similarity. Candidates are ranked by their
//! PageRank mass, renormalized so the candidate scores sum to 1.
//!
//! In [`GraphMode::Isolated`] each query gets its own graph, so a query's
//! ranking never depends on which other queries share the call. In
//! [`GraphMode::Shared`] one graph holds every query of the batch and all
//! queries receive the same ranking. No graph outlives the call.

use super::ScoringStrategy;
use crate::core::error::SearchError;
use crate::search::aggregate::rank;
use crate::search::candidates::CandidateStore;
use crate::search::embedder::{cosine_similarity, embed_all, Embedder};
use crate::search::graph::{GraphMode, PageRankParams, WeightedGraph};
use crate::search::result::SearchResultSet;

pub const NAME: &str = "graph";

pub struct GraphStrategy<'a> {
    embedder: &'a dyn Embedder,
    mode: GraphMode,
    params: PageRankParams,
}

impl<'a> GraphStrategy<'a> {
    pub fn new(embedder: &'a dyn Embedder, mode: GraphMode, params: PageRankParams) -> Self {
        Self {
            embedder,
            mode,
            params,
        }
    }

    /// Candidate nodes first (`0..n`), then one node per similarity row
    fn candidate_mass(&self, rows: &[&[f32]], n: usize) -> Result<Vec<f32>, SearchError> {
        let mut graph = WeightedGraph::with_nodes(n);
        for row in rows {
            let query_node = graph.add_node();
            for (candidate, &similarity) in row.iter().enumerate() {
                graph.add_edge(query_node, candidate, f64::from(similarity));
            }
        }

        let mass = graph
            .pagerank(&self.params)
            .map_err(|e| SearchError::provider(NAME, e))?;

        let total: f64 = mass[..n].iter().sum();
        Ok(mass[..n]
            .iter()
            .map(|m| if total > 0.0 { (m / total) as f32 } else { 0.0 })
            .collect())
    }
}

impl ScoringStrategy for GraphStrategy<'_> {
    fn name(&self) -> &'static str {
        NAME
    }

    fn score(
        &self,
        candidates: &CandidateStore,
        queries: &[String],
    ) -> Result<SearchResultSet, SearchError> {
        if candidates.is_empty() || queries.is_empty() {
            return Ok(SearchResultSet::new());
        }

        let candidate_vecs = embed_all(self.embedder, &candidates.as_strs())
            .map_err(|e| SearchError::provider(NAME, e))?;
        let query_strs: Vec<&str> = queries.iter().map(String::as_str).collect();
        let query_vecs =
            embed_all(self.embedder, &query_strs).map_err(|e| SearchError::provider(NAME, e))?;

        let similarities: Vec<Vec<f32>> = query_vecs
            .iter()
            .map(|q| candidate_vecs.iter().map(|c| cosine_similarity(q, c)).collect())
            .collect();

        let n = candidates.len();
        let mut set = SearchResultSet::new();
        match self.mode {
            GraphMode::Isolated => {
                for (query, row) in queries.iter().zip(&similarities) {
                    let scores = self.candidate_mass(&[row.as_slice()], n)?;
                    set.insert(query.clone(), rank(candidates, &scores));
                }
            }
            GraphMode::Shared => {
                // Repeated query text maps to a single node
                let mut seen = std::collections::HashSet::new();
                let rows: Vec<&[f32]> = queries
                    .iter()
                    .zip(&similarities)
                    .filter(|(q, _)| seen.insert(q.as_str()))
                    .map(|(_, row)| row.as_slice())
                    .collect();

                let scores = self.candidate_mass(&rows, n)?;
                let ranked = rank(candidates, &scores);
                for query in queries {
                    set.insert(query.clone(), ranked.clone());
                }
            }
        }

        Ok(set)
    }
}
