//! Random forest of CART classification trees.
//!
//! - Gini impurity, binary splits `x[f] <= threshold` at midpoints between
//!   distinct sorted values
//! - `√p` candidate features drawn per split; more are inspected only when
//!   none of the drawn ones improves the node
//! - bootstrap resampling per tree
//! - every tree has its own `StdRng` seeded from `(seed, tree index)`, so the
//!   parallel fit is reproducible regardless of thread scheduling
//!
//! Trees are stored as flat node vectors (root at index 0). Every node keeps
//! the positive-class rate of the samples that reached it; leaves use it as
//! the prediction and the path attribution uses it at interior nodes too.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AppError;

#[derive(Debug, Clone, Copy)]
pub struct ForestOptions {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for ForestOptions {
    fn default() -> Self {
        Self {
            n_trees: 200,
            max_depth: 10,
            min_samples_split: 2,
            min_samples_leaf: 1,
            bootstrap: true,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Split {
    pub feature: usize,
    pub threshold: f64,
    pub left: usize,
    pub right: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    /// Positive-class rate among the node's training samples.
    pub value: f64,
    pub n_samples: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split: Option<Split>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Index of the leaf `row` falls into.
    fn leaf(&self, row: &[f64]) -> usize {
        let mut node = 0;
        while let Some(split) = self.nodes[node].split {
            node = if row[split.feature] <= split.threshold {
                split.left
            } else {
                split.right
            };
        }
        node
    }

    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        self.nodes[self.leaf(row)].value
    }

    /// Walk the decision path, crediting each change in node value to the
    /// split feature. Returns the root value; `out` is accumulated into.
    pub fn path_contributions(&self, row: &[f64], out: &mut [f64]) -> f64 {
        let mut node = 0;
        while let Some(split) = self.nodes[node].split {
            let child = if row[split.feature] <= split.threshold {
                split.left
            } else {
                split.right
            };
            out[split.feature] += self.nodes[child].value - self.nodes[node].value;
            node = child;
        }
        self.nodes[0].value
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[TreeNode], i: usize) -> usize {
            match nodes[i].split {
                Some(s) => 1 + walk(nodes, s.left).max(walk(nodes, s.right)),
                None => 0,
            }
        }
        if self.nodes.is_empty() { 0 } else { walk(&self.nodes, 0) }
    }

    fn max_feature(&self) -> Option<usize> {
        self.nodes
            .iter()
            .filter_map(|n| n.split.map(|s| s.feature))
            .max()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub n_features: usize,
    pub trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn fit(x: &[Vec<f64>], y: &[u8], opts: &ForestOptions) -> Result<Self, AppError> {
        if x.is_empty() {
            return Err(AppError::model("Cannot fit a forest on zero rows."));
        }
        if x.len() != y.len() {
            return Err(AppError::model(format!(
                "Feature/label length mismatch: {} rows vs {} labels.",
                x.len(),
                y.len()
            )));
        }
        if opts.n_trees == 0 {
            return Err(AppError::config("n_trees must be at least 1."));
        }

        let n = x.len();
        let n_features = x[0].len();

        let trees: Vec<DecisionTree> = (0..opts.n_trees)
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(tree_seed(opts.seed, t));
                let sample: Vec<usize> = if opts.bootstrap {
                    (0..n).map(|_| rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                grow_tree(x, y, sample, opts, &mut rng)
            })
            .collect();

        debug!(
            trees = trees.len(),
            max_depth = trees.iter().map(DecisionTree::depth).max().unwrap_or(0),
            nodes = trees.iter().map(|t| t.nodes.len()).sum::<usize>(),
            "random forest fitted"
        );

        Ok(Self { n_features, trees })
    }

    /// Mean of the trees' leaf probabilities.
    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        let sum: f64 = self.trees.iter().map(|t| t.predict_proba(row)).sum();
        sum / self.trees.len() as f64
    }

    /// Per-feature path attributions averaged over trees.
    ///
    /// Returns `(bias, contributions)` with
    /// `bias + Σ contributions == predict_proba(row)`.
    pub fn path_contributions(&self, row: &[f64]) -> (f64, Vec<f64>) {
        let mut contributions = vec![0.0; self.n_features];
        let mut bias = 0.0;
        for tree in &self.trees {
            bias += tree.path_contributions(row, &mut contributions);
        }
        let m = self.trees.len() as f64;
        contributions.iter_mut().for_each(|c| *c /= m);
        (bias / m, contributions)
    }

    /// Check the node graph is well formed for `n_features` inputs.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.trees.is_empty() {
            return Err(AppError::model("Random forest has no trees."));
        }
        for (t, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(AppError::model(format!("Tree {t} has no nodes.")));
            }
            let len = tree.nodes.len();
            let bad_child = tree
                .nodes
                .iter()
                .filter_map(|n| n.split)
                .any(|s| s.left >= len || s.right >= len);
            if bad_child {
                return Err(AppError::model(format!("Tree {t} references a missing node.")));
            }
            // Children are stored after their parent; anything else is a cycle.
            let backward = tree
                .nodes
                .iter()
                .enumerate()
                .filter_map(|(i, n)| n.split.map(|s| (i, s)))
                .any(|(i, s)| s.left <= i || s.right <= i);
            if backward {
                return Err(AppError::model(format!("Tree {t} has a node that points back up the tree.")));
            }
            if tree.max_feature().is_some_and(|f| f >= self.n_features) {
                return Err(AppError::model(format!(
                    "Tree {t} splits on a feature outside the {} inputs.",
                    self.n_features
                )));
            }
        }
        Ok(())
    }
}

fn tree_seed(seed: u64, tree: usize) -> u64 {
    seed ^ (tree as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

fn grow_tree(
    x: &[Vec<f64>],
    y: &[u8],
    sample: Vec<usize>,
    opts: &ForestOptions,
    rng: &mut StdRng,
) -> DecisionTree {
    let mut nodes = Vec::new();
    grow(x, y, sample, 0, opts, rng, &mut nodes);
    DecisionTree { nodes }
}

fn grow(
    x: &[Vec<f64>],
    y: &[u8],
    idx: Vec<usize>,
    depth: usize,
    opts: &ForestOptions,
    rng: &mut StdRng,
    nodes: &mut Vec<TreeNode>,
) -> usize {
    let n = idx.len();
    let positives = idx.iter().filter(|&&i| y[i] == 1).count();
    let id = nodes.len();
    nodes.push(TreeNode {
        value: positives as f64 / n.max(1) as f64,
        n_samples: n,
        split: None,
    });

    let pure = positives == 0 || positives == n;
    if pure || depth >= opts.max_depth || n < opts.min_samples_split {
        return id;
    }

    let Some((feature, threshold)) = best_split(x, y, &idx, positives, opts, rng) else {
        return id;
    };

    let (left_idx, right_idx): (Vec<usize>, Vec<usize>) =
        idx.into_iter().partition(|&i| x[i][feature] <= threshold);

    let left = grow(x, y, left_idx, depth + 1, opts, rng, nodes);
    let right = grow(x, y, right_idx, depth + 1, opts, rng, nodes);
    nodes[id].split = Some(Split {
        feature,
        threshold,
        left,
        right,
    });
    id
}

/// Weighted Gini impurity `n · 2p(1-p)` of a node with `pos` positives out of `n`.
fn gini_mass(pos: usize, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let pos = pos as f64;
    let n = n as f64;
    2.0 * pos * (n - pos) / n
}

fn best_split(
    x: &[Vec<f64>],
    y: &[u8],
    idx: &[usize],
    positives: usize,
    opts: &ForestOptions,
    rng: &mut StdRng,
) -> Option<(usize, f64)> {
    let n = idx.len();
    let n_features = x[idx[0]].len();
    if n_features == 0 {
        return None;
    }
    let mtry = ((n_features as f64).sqrt().floor() as usize).clamp(1, n_features);
    let order = rand::seq::index::sample(rng, n_features, n_features).into_vec();

    let parent = gini_mass(positives, n);
    let mut best: Option<(usize, f64, f64)> = None;
    let mut column: Vec<(f64, u8)> = Vec::with_capacity(n);

    for (visited, f) in order.into_iter().enumerate() {
        if visited >= mtry && best.is_some() {
            break;
        }
        column.clear();
        column.extend(idx.iter().map(|&i| (x[i][f], y[i])));
        column.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut left_n = 0;
        let mut left_pos = 0;
        for k in 0..n - 1 {
            left_n += 1;
            left_pos += usize::from(column[k].1);
            if column[k].0 == column[k + 1].0 {
                continue;
            }
            let right_n = n - left_n;
            if left_n < opts.min_samples_leaf || right_n < opts.min_samples_leaf {
                continue;
            }
            let impurity = gini_mass(left_pos, left_n) + gini_mass(positives - left_pos, right_n);
            if impurity < parent - 1e-12 && best.is_none_or(|(_, _, b)| impurity < b) {
                let threshold = 0.5 * (column[k].0 + column[k + 1].0);
                best = Some((f, threshold, impurity));
            }
        }
    }

    best.map(|(f, t, _)| (f, t))
}
