//! Weighted undirected graph with PageRank
//!
//! Edge weights act as transition preferences: a random walker at node `u`
//! moves to neighbour `v` with probability `w(u, v) / sum(w(u, *))`. Nodes
//! without positive outgoing weight are dangling and spread their mass
//! uniformly.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::core::config::GraphConfig;

/// How the graph strategy builds its graphs within one call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphMode {
    /// Fresh graph per query; results for one query never depend on another
    #[default]
    Isolated,
    /// One graph for the whole query batch; every query gets the same ranking
    Shared,
}

#[derive(Debug, Clone, Copy)]
pub struct PageRankParams {
    pub damping: f64,
    pub max_iter: usize,
    /// Per-node L1 tolerance
    pub tolerance: f64,
}

impl Default for PageRankParams {
    fn default() -> Self {
        Self {
            damping: 0.85,
            max_iter: 100,
            tolerance: 1.0e-6,
        }
    }
}

impl From<&GraphConfig> for PageRankParams {
    fn from(config: &GraphConfig) -> Self {
        Self {
            damping: config.damping,
            max_iter: config.max_iter,
            tolerance: config.tolerance,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct WeightedGraph {
    adjacency: Vec<Vec<(usize, f64)>>,
}

impl WeightedGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_nodes(count: usize) -> Self {
        Self {
            adjacency: vec![Vec::new(); count],
        }
    }

    pub fn add_node(&mut self) -> usize {
        self.adjacency.push(Vec::new());
        self.adjacency.len() - 1
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn edge_count(&self) -> usize {
        let endpoints: usize = self.adjacency.iter().map(Vec::len).sum();
        let self_loops = self
            .adjacency
            .iter()
            .enumerate()
            .filter(|(i, edges)| edges.iter().any(|(j, _)| j == i))
            .count();
        (endpoints + self_loops) / 2
    }

    /// Add or overwrite the undirected edge `a - b`. Negative weights count as 0.
    pub fn add_edge(&mut self, a: usize, b: usize, weight: f64) {
        let weight = if weight.is_finite() { weight.max(0.0) } else { 0.0 };
        Self::upsert(&mut self.adjacency[a], b, weight);
        if a != b {
            Self::upsert(&mut self.adjacency[b], a, weight);
        }
    }

    fn upsert(edges: &mut Vec<(usize, f64)>, target: usize, weight: f64) {
        match edges.iter_mut().find(|(n, _)| *n == target) {
            Some(edge) => edge.1 = weight,
            None => edges.push((target, weight)),
        }
    }

    /// PageRank mass per node, summing to 1
    pub fn pagerank(&self, params: &PageRankParams) -> Result<Vec<f64>> {
        let n = self.adjacency.len();
        if n == 0 {
            return Ok(Vec::new());
        }

        let uniform = 1.0 / n as f64;
        let out_weight: Vec<f64> = self
            .adjacency
            .iter()
            .map(|edges| edges.iter().map(|(_, w)| w).sum())
            .collect();

        let mut rank = vec![uniform; n];
        for _ in 0..params.max_iter {
            let dangling: f64 = (0..n)
                .filter(|&u| out_weight[u] <= 0.0)
                .map(|u| rank[u])
                .sum();

            let base = params.damping * dangling * uniform + (1.0 - params.damping) * uniform;
            let mut next = vec![base; n];
            for (u, edges) in self.adjacency.iter().enumerate() {
                if out_weight[u] <= 0.0 {
                    continue;
                }
                let share = params.damping * rank[u] / out_weight[u];
                for &(v, w) in edges {
                    next[v] += share * w;
                }
            }

            let err: f64 = next.iter().zip(&rank).map(|(a, b)| (a - b).abs()).sum();
            rank = next;
            if err < n as f64 * params.tolerance {
                return Ok(rank);
            }
        }

        anyhow::bail!(
            "PageRank failed to converge in {} iterations",
            params.max_iter
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum(values: &[f64]) -> f64 {
        values.iter().sum()
    }

    #[test]
    fn test_star_graph_centre_dominates() {
        let mut graph = WeightedGraph::with_nodes(4);
        for leaf in 1..4 {
            graph.add_edge(0, leaf, 1.0);
        }

        let rank = graph.pagerank(&PageRankParams::default()).unwrap();
        assert!((sum(&rank) - 1.0).abs() < 1e-6);
        assert!(rank[0] > rank[1]);
        assert!((rank[1] - rank[2]).abs() < 1e-9);
    }

    #[test]
    fn test_heavier_edge_gets_more_mass() {
        let mut graph = WeightedGraph::with_nodes(3);
        graph.add_edge(0, 1, 0.9);
        graph.add_edge(0, 2, 0.1);

        let rank = graph.pagerank(&PageRankParams::default()).unwrap();
        assert!(rank[1] > rank[2]);
    }

    #[test]
    fn test_negative_weights_are_clamped() {
        let mut graph = WeightedGraph::with_nodes(3);
        graph.add_edge(0, 1, 0.5);
        graph.add_edge(0, 2, -0.5);

        let rank = graph.pagerank(&PageRankParams::default()).unwrap();
        assert!(rank[1] > rank[2]);
        assert!((sum(&rank) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_edges_overwrite() {
        let mut graph = WeightedGraph::with_nodes(2);
        graph.add_edge(0, 1, 0.2);
        graph.add_edge(1, 0, 0.7);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_no_edges_is_uniform() {
        let graph = WeightedGraph::with_nodes(4);
        let rank = graph.pagerank(&PageRankParams::default()).unwrap();
        assert!(rank.iter().all(|r| (r - 0.25).abs() < 1e-9));
    }

    #[test]
    fn test_non_convergence_is_error() {
        let mut graph = WeightedGraph::with_nodes(2);
        graph.add_edge(0, 1, 1.0);
        let params = PageRankParams {
            damping: 1.0,
            max_iter: 3,
            tolerance: 0.0,
        };
        assert!(graph.pagerank(&params).is_err());
    }

    #[test]
    fn test_empty_graph() {
        let graph = WeightedGraph::new();
        assert!(graph.pagerank(&PageRankParams::default()).unwrap().is_empty());
    }
}
