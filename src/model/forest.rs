//! Random Forest Evaluation
//!
//! Compact in-memory form of the exported decision trees. Each node stores
//! its class distribution normalised to sum to 1, so forest probabilities are
//! the plain mean of per-tree leaf distributions (sklearn `predict_proba`).

use rayon::prelude::*;

/// Sentinel child index marking a leaf
pub const LEAF: usize = usize::MAX;

/// Single tree node
#[derive(Debug, Clone)]
pub struct Node {
    pub left: usize,
    pub right: usize,
    /// Column index into the model input (meaningless for leaves)
    pub feature: usize,
    pub threshold: f64,
    /// Number of training samples that reached this node
    pub cover: f64,
}

impl Node {
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.left == LEAF
    }
}

/// Decision tree with per-node class distributions
#[derive(Debug, Clone)]
pub struct DecisionTree {
    pub(crate) nodes: Vec<Node>,
    /// Row-major `nodes.len() × n_classes`
    pub(crate) values: Vec<f64>,
    pub(crate) n_classes: usize,
}

impl DecisionTree {
    pub fn new(nodes: Vec<Node>, values: Vec<f64>, n_classes: usize) -> Self {
        debug_assert_eq!(nodes.len() * n_classes, values.len());
        Self { nodes, values, n_classes }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Class distribution stored at a node
    #[inline]
    pub fn distribution(&self, node: usize) -> &[f64] {
        let start = node * self.n_classes;
        &self.values[start..start + self.n_classes]
    }

    #[inline]
    pub fn value(&self, node: usize, class: usize) -> f64 {
        self.values[node * self.n_classes + class]
    }

    /// Child taken by `x` at an internal node (`x[f] <= t` goes left)
    #[inline]
    pub fn hot_child(&self, node: usize, x: &[f64]) -> usize {
        let n = &self.nodes[node];
        if x[n.feature] <= n.threshold {
            n.left
        } else {
            n.right
        }
    }

    /// Leaf reached by `x`
    pub fn leaf_for(&self, x: &[f64]) -> usize {
        let mut node = 0;
        while !self.nodes[node].is_leaf() {
            node = self.hot_child(node, x);
        }
        node
    }

    /// Cover-weighted mean of leaf values for one class
    pub fn expected_value(&self, class: usize) -> f64 {
        let root_cover = self.nodes[0].cover;
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.is_leaf())
            .map(|(i, n)| self.value(i, class) * n.cover / root_cover)
            .sum()
    }
}

/// Ensemble of decision trees sharing one class list
#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    n_classes: usize,
    n_features: usize,
}

impl RandomForest {
    pub fn new(trees: Vec<DecisionTree>, n_classes: usize, n_features: usize) -> Self {
        Self { trees, n_classes, n_features }
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Class probabilities for one model-space input row
    ///
    /// Trees are walked in parallel; the reduction runs in tree order so the
    /// result is identical across calls.
    pub fn predict_proba(&self, x: &[f64]) -> Vec<f64> {
        let leaves: Vec<(usize, usize)> = self
            .trees
            .par_iter()
            .enumerate()
            .map(|(t, tree)| (t, tree.leaf_for(x)))
            .collect();

        let mut proba = vec![0.0; self.n_classes];
        for (t, leaf) in leaves {
            for (p, v) in proba.iter_mut().zip(self.trees[t].distribution(leaf)) {
                *p += v;
            }
        }

        let n = self.trees.len() as f64;
        proba.iter_mut().for_each(|p| *p /= n);
        proba
    }

    /// Mean expected value over trees for one class
    pub fn expected_value(&self, class: usize) -> f64 {
        let sum: f64 = self.trees.iter().map(|t| t.expected_value(class)).sum();
        sum / self.trees.len() as f64
    }
}
