//! Maximal Marginal Relevance selection.
//!
//! Greedily picks up to `top_k` candidates. The first pick is the candidate
//! most similar to the query; each later pick maximizes
//!
//! ```text
//! lambda * sim_q[i] - (1 - lambda) * max_{j in selected} sim_doc[i][j]
//! ```
//!
//! Ties always go to the candidate that comes first in the remaining list,
//! which keeps pool order, so results are reproducible run to run.

use serde::Serialize;

use crate::embed::cosine_similarity;

pub const DEFAULT_LAMBDA: f64 = 0.72;
pub const DEFAULT_TOP_K: usize = 5;

/// One picked candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SelectedCandidate {
    /// Position in the candidate pool.
    pub index: usize,
    /// 1-based selection order.
    pub rank: usize,
    /// Cosine similarity to the query.
    pub relevance: f64,
}

/// Picked candidates in rank order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Selection {
    pub candidates: Vec<SelectedCandidate>,
}

impl Selection {
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn indices(&self) -> Vec<usize> {
        self.candidates.iter().map(|c| c.index).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SelectedCandidate> {
        self.candidates.iter()
    }
}

/// MMR configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MmrSelector {
    top_k: usize,
    lambda: f64,
}

impl Default for MmrSelector {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            lambda: DEFAULT_LAMBDA,
        }
    }
}

impl MmrSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn lambda(mut self, lambda: f64) -> Self {
        self.lambda = lambda;
        self
    }

    /// Select from `pool` against `query` embeddings.
    pub fn select(&self, query: &[f32], pool: &[Vec<f32>]) -> Selection {
        let sim_q: Vec<f64> = pool.iter().map(|c| cosine_similarity(query, c)).collect();
        let sim_doc = pairwise_similarities(pool);
        self.select_with_similarities(&sim_q, &sim_doc)
    }

    /// Select from precomputed similarities.
    ///
    /// `sim_doc` must be a square matrix with one row per entry of `sim_q`.
    pub fn select_with_similarities(&self, sim_q: &[f64], sim_doc: &[Vec<f64>]) -> Selection {
        let mut remaining: Vec<usize> = (0..sim_q.len()).collect();
        let mut selected: Vec<usize> = Vec::with_capacity(self.top_k.min(sim_q.len()));

        while selected.len() < self.top_k && !remaining.is_empty() {
            let score = |i: usize| -> f64 {
                if selected.is_empty() {
                    return sim_q[i];
                }
                let redundancy = selected
                    .iter()
                    .map(|&j| sim_doc[i][j])
                    .fold(f64::NEG_INFINITY, f64::max);
                self.lambda * sim_q[i] - (1.0 - self.lambda) * redundancy
            };

            let mut best = 0;
            let mut best_score = score(remaining[0]);
            for (pos, &candidate) in remaining.iter().enumerate().skip(1) {
                let s = score(candidate);
                if s > best_score {
                    best = pos;
                    best_score = s;
                }
            }

            selected.push(remaining.remove(best));
        }

        Selection {
            candidates: selected
                .into_iter()
                .enumerate()
                .map(|(i, index)| SelectedCandidate {
                    index,
                    rank: i + 1,
                    relevance: sim_q[index],
                })
                .collect(),
        }
    }
}

/// Symmetric cosine similarity matrix, each pair computed once.
pub fn pairwise_similarities(pool: &[Vec<f32>]) -> Vec<Vec<f64>> {
    let n = pool.len();
    let mut matrix = vec![vec![0.0; n]; n];
    for i in 0..n {
        matrix[i][i] = 1.0;
        for j in (i + 1)..n {
            let s = cosine_similarity(&pool[i], &pool[j]);
            matrix[i][j] = s;
            matrix[j][i] = s;
        }
    }
    matrix
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zeros(n: usize) -> Vec<Vec<f64>> {
        vec![vec![0.0; n]; n]
    }

    #[test]
    fn test_orthogonal_candidates_follow_relevance() {
        let selection = MmrSelector::new()
            .top_k(2)
            .select_with_similarities(&[0.9, 0.5, 0.8], &zeros(3));

        assert_eq!(selection.indices(), vec![0, 2]);
        assert_eq!(selection.candidates[0].rank, 1);
        assert_eq!(selection.candidates[1].rank, 2);
        assert_eq!(selection.candidates[1].relevance, 0.8);
    }

    #[test]
    fn test_redundant_pair_keeps_pool_order() {
        let sim_doc = vec![vec![1.0, 0.99], vec![0.99, 1.0]];
        let selection = MmrSelector::new()
            .top_k(2)
            .select_with_similarities(&[0.8, 0.8], &sim_doc);

        assert_eq!(selection.indices(), vec![0, 1]);
    }

    #[test]
    fn test_pool_smaller_than_k() {
        let selection = MmrSelector::new()
            .top_k(5)
            .select_with_similarities(&[0.2, 0.7], &zeros(2));

        assert_eq!(selection.len(), 2);
        assert_eq!(selection.indices(), vec![1, 0]);
        let ranks: Vec<_> = selection.iter().map(|c| c.rank).collect();
        assert_eq!(ranks, vec![1, 2]);
    }

    #[test]
    fn test_empty_pool() {
        let selection = MmrSelector::new().select(&[1.0, 0.0], &[]);
        assert!(selection.is_empty());
    }

    #[test]
    fn test_redundancy_penalty_changes_second_pick() {
        // Candidate 1 nearly duplicates candidate 0; candidate 2 is less
        // relevant but distinct.
        let sim_doc = vec![
            vec![1.0, 0.95, 0.1],
            vec![0.95, 1.0, 0.1],
            vec![0.1, 0.1, 1.0],
        ];
        let selection = MmrSelector::new()
            .top_k(3)
            .select_with_similarities(&[0.9, 0.85, 0.6], &sim_doc);

        assert_eq!(selection.indices(), vec![0, 2, 1]);
    }

    #[test]
    fn test_lambda_one_is_pure_relevance() {
        let sim_doc = vec![
            vec![1.0, 0.95, 0.1],
            vec![0.95, 1.0, 0.1],
            vec![0.1, 0.1, 1.0],
        ];
        let selection = MmrSelector::new()
            .top_k(3)
            .lambda(1.0)
            .select_with_similarities(&[0.9, 0.85, 0.6], &sim_doc);

        assert_eq!(selection.indices(), vec![0, 1, 2]);
    }

    #[test]
    fn test_select_from_embeddings() {
        let query = vec![1.0, 0.0, 0.0];
        let pool = vec![
            vec![0.0, 1.0, 0.0],
            vec![1.0, 0.0, 0.0],
            vec![0.7, 0.7, 0.0],
        ];

        let selection = MmrSelector::new().top_k(1).select(&query, &pool);
        assert_eq!(selection.indices(), vec![1]);
        assert!((selection.candidates[0].relevance - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_pairwise_matrix_is_symmetric() {
        let pool = vec![vec![1.0, 0.0], vec![1.0, 1.0], vec![0.0, 1.0]];
        let m = pairwise_similarities(&pool);
        for i in 0..3 {
            for j in 0..3 {
                assert_eq!(m[i][j], m[j][i]);
            }
        }
        assert!(m[0][2].abs() < 1e-12);
    }
}
