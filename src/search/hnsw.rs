//! HNSW approximate nearest-neighbour index over candidate embeddings
//!
//! Nodes are identified by candidate position, so duplicate texts stay
//! distinct. Level assignment uses a seeded generator: the same vectors
//! inserted in the same order always produce the same graph.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use super::embedder::cosine_similarity;

const M: usize = 16;
const M_MAX: usize = M;
const M_MAX_0: usize = M * 2;
const EF_CONSTRUCTION: usize = 200;
const MAX_LEVEL: usize = 16;

fn ml_factor() -> f64 {
    1.0 / (M as f64).ln()
}

struct Node {
    vector: Vec<f32>,
    level: usize,
    neighbors: Vec<Vec<usize>>,
}

/// Min-heap entry: closest first
#[derive(Clone, Copy)]
struct Candidate {
    idx: usize,
    distance: f32,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.distance == other.distance
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .distance
            .partial_cmp(&self.distance)
            .unwrap_or(Ordering::Equal)
    }
}

/// Max-heap entry: farthest first
#[derive(Clone, Copy)]
struct FarCandidate {
    idx: usize,
    distance: f32,
}

impl PartialEq for FarCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.distance == other.distance
    }
}

impl Eq for FarCandidate {}

impl PartialOrd for FarCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FarCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .partial_cmp(&other.distance)
            .unwrap_or(Ordering::Equal)
    }
}

pub struct HnswIndex {
    nodes: Vec<Node>,
    entry_point: Option<usize>,
    max_level: usize,
    rng: SmallRng,
}

impl HnswIndex {
    pub fn new(seed: u64) -> Self {
        Self {
            nodes: Vec::new(),
            entry_point: None,
            max_level: 0,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Build an index where node `i` is `vectors[i]`
    pub fn build(vectors: Vec<Vec<f32>>, seed: u64) -> Self {
        let mut index = Self::new(seed);
        for vector in vectors {
            index.insert(vector);
        }
        index
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn vector(&self, idx: usize) -> Option<&[f32]> {
        self.nodes.get(idx).map(|n| n.vector.as_slice())
    }

    fn random_level(&mut self) -> usize {
        // (0, 1] keeps ln finite
        let r: f64 = 1.0 - self.rng.gen::<f64>();
        ((-r.ln() * ml_factor()).floor() as usize).min(MAX_LEVEL)
    }

    fn distance(a: &[f32], b: &[f32]) -> f32 {
        1.0 - cosine_similarity(a, b)
    }

    /// Insert a vector; returns its node id
    pub fn insert(&mut self, vector: Vec<f32>) -> usize {
        let level = self.random_level();
        let node_idx = self.nodes.len();

        self.nodes.push(Node {
            vector,
            level,
            neighbors: vec![Vec::new(); level + 1],
        });

        let Some(mut ep) = self.entry_point else {
            self.entry_point = Some(node_idx);
            self.max_level = level;
            return node_idx;
        };

        let query = self.nodes[node_idx].vector.clone();

        for lc in (level + 1..=self.max_level).rev() {
            ep = self.search_layer_single(&query, ep, lc);
        }

        for lc in (0..=level.min(self.max_level)).rev() {
            let m_max = if lc == 0 { M_MAX_0 } else { M_MAX };
            let neighbors_at_level = self.search_layer(&query, ep, EF_CONSTRUCTION, lc);
            let selected = Self::select_neighbors(&neighbors_at_level, m_max);

            self.nodes[node_idx].neighbors[lc] = selected.clone();

            for &neighbor_idx in &selected {
                if lc > self.nodes[neighbor_idx].level {
                    continue;
                }
                self.nodes[neighbor_idx].neighbors[lc].push(node_idx);
                if self.nodes[neighbor_idx].neighbors[lc].len() > m_max {
                    self.prune(neighbor_idx, lc, m_max);
                }
            }

            if let Some(&closest) = selected.first() {
                ep = closest;
            }
        }

        if level > self.max_level {
            self.max_level = level;
            self.entry_point = Some(node_idx);
        }

        node_idx
    }

    fn prune(&mut self, node_idx: usize, level: usize, m_max: usize) {
        let node_vec = &self.nodes[node_idx].vector;
        let candidates: Vec<Candidate> = self.nodes[node_idx].neighbors[level]
            .iter()
            .map(|&n| Candidate {
                idx: n,
                distance: Self::distance(node_vec, &self.nodes[n].vector),
            })
            .collect();
        self.nodes[node_idx].neighbors[level] = Self::select_neighbors(&candidates, m_max);
    }

    fn search_layer_single(&self, query: &[f32], ep: usize, level: usize) -> usize {
        let mut current = ep;
        let mut current_dist = Self::distance(query, &self.nodes[current].vector);

        loop {
            let mut changed = false;
            if level < self.nodes[current].neighbors.len() {
                for &neighbor in &self.nodes[current].neighbors[level] {
                    let dist = Self::distance(query, &self.nodes[neighbor].vector);
                    if dist < current_dist {
                        current = neighbor;
                        current_dist = dist;
                        changed = true;
                    }
                }
            }
            if !changed {
                break;
            }
        }
        current
    }

    fn search_layer(&self, query: &[f32], ep: usize, ef: usize, level: usize) -> Vec<Candidate> {
        let mut visited = HashSet::new();
        let mut candidates = BinaryHeap::new();
        let mut results = BinaryHeap::new();

        let dist = Self::distance(query, &self.nodes[ep].vector);
        visited.insert(ep);
        candidates.push(Candidate {
            idx: ep,
            distance: dist,
        });
        results.push(FarCandidate {
            idx: ep,
            distance: dist,
        });

        while let Some(Candidate {
            idx: c_idx,
            distance: c_dist,
        }) = candidates.pop()
        {
            let worst_dist = results.peek().map(|r| r.distance).unwrap_or(f32::MAX);
            if c_dist > worst_dist && results.len() >= ef {
                break;
            }

            if level < self.nodes[c_idx].neighbors.len() {
                for &neighbor in &self.nodes[c_idx].neighbors[level] {
                    if !visited.insert(neighbor) {
                        continue;
                    }

                    let dist = Self::distance(query, &self.nodes[neighbor].vector);
                    let worst = results.peek().map(|r| r.distance).unwrap_or(f32::MAX);

                    if dist < worst || results.len() < ef {
                        candidates.push(Candidate {
                            idx: neighbor,
                            distance: dist,
                        });
                        results.push(FarCandidate {
                            idx: neighbor,
                            distance: dist,
                        });
                        if results.len() > ef {
                            results.pop();
                        }
                    }
                }
            }
        }

        results
            .into_sorted_vec()
            .into_iter()
            .map(|fc| Candidate {
                idx: fc.idx,
                distance: fc.distance,
            })
            .collect()
    }

    fn select_neighbors(candidates: &[Candidate], m: usize) -> Vec<usize> {
        let mut sorted = candidates.to_vec();
        sorted.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(Ordering::Equal)
                .then(a.idx.cmp(&b.idx))
        });
        sorted.into_iter().take(m).map(|c| c.idx).collect()
    }

    /// Up to `k` nearest nodes as `(node id, cosine similarity)`, closest first
    pub fn search(&self, query: &[f32], k: usize, ef: usize) -> Vec<(usize, f32)> {
        let Some(mut ep) = self.entry_point else {
            return Vec::new();
        };

        for lc in (1..=self.max_level).rev() {
            ep = self.search_layer_single(query, ep, lc);
        }

        self.search_layer(query, ep, ef.max(k), 0)
            .into_iter()
            .take(k)
            .map(|c| (c.idx, 1.0 - c.distance))
            .collect()
    }
}
