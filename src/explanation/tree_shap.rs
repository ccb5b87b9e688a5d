//! Path-dependent TreeSHAP
//!
//! Exact Shapley values for a single tree in polynomial time (Lundberg et al.
//! 2018, Algorithm 2). Node covers define the background distribution, so the
//! values for one class satisfy `expected_value + Σφ = f(x)`.

use rayon::prelude::*;
use smallvec::SmallVec;

use crate::model::{DecisionTree, RandomForest};

/// One feature on the current root-to-node path
#[derive(Debug, Clone, Copy)]
struct PathElement {
    /// Split feature, `None` for the root sentinel
    feature: Option<usize>,
    /// Fraction of "feature absent" paths flowing through
    zero_fraction: f64,
    /// 1 if `x` follows this branch, else 0
    one_fraction: f64,
    /// Permutation weight
    weight: f64,
}

type Path = SmallVec<[PathElement; 32]>;

/// Shapley values for one class, one entry per model column
pub fn tree_shap(tree: &DecisionTree, x: &[f64], class: usize, n_features: usize) -> Vec<f64> {
    let mut phi = vec![0.0; n_features];
    let path = Path::new();
    recurse(tree, x, class, &mut phi, 0, &path, 1.0, 1.0, None);
    phi
}

/// Forest Shapley values: mean of per-tree values, reduced in tree order
pub fn forest_shap(forest: &RandomForest, x: &[f64], class: usize) -> Vec<f64> {
    let n_features = forest.n_features();
    let per_tree: Vec<Vec<f64>> = forest
        .trees()
        .par_iter()
        .map(|tree| tree_shap(tree, x, class, n_features))
        .collect();

    let mut phi = vec![0.0; n_features];
    for tree_phi in &per_tree {
        for (total, v) in phi.iter_mut().zip(tree_phi) {
            *total += v;
        }
    }
    let n = forest.trees().len() as f64;
    phi.iter_mut().for_each(|v| *v /= n);
    phi
}

#[allow(clippy::too_many_arguments)]
fn recurse(
    tree: &DecisionTree,
    x: &[f64],
    class: usize,
    phi: &mut [f64],
    node: usize,
    parent_path: &Path,
    zero_fraction: f64,
    one_fraction: f64,
    feature: Option<usize>,
) {
    let mut path = parent_path.clone();
    extend(&mut path, zero_fraction, one_fraction, feature);

    let n = &tree.nodes()[node];
    if n.is_leaf() {
        let leaf_value = tree.value(node, class);
        for i in 1..path.len() {
            let w = unwound_sum(&path, i);
            let el = path[i];
            if let Some(f) = el.feature {
                phi[f] += w * (el.one_fraction - el.zero_fraction) * leaf_value;
            }
        }
        return;
    }

    let hot = tree.hot_child(node, x);
    let cold = if hot == n.left { n.right } else { n.left };
    let nodes = tree.nodes();
    let hot_zero = nodes[hot].cover / n.cover;
    let cold_zero = nodes[cold].cover / n.cover;

    let mut incoming_zero = 1.0;
    let mut incoming_one = 1.0;

    // A feature split on twice along the path is merged into one element
    if let Some(k) = path.iter().position(|el| el.feature == Some(n.feature)) {
        incoming_zero = path[k].zero_fraction;
        incoming_one = path[k].one_fraction;
        unwind(&mut path, k);
    }

    recurse(tree, x, class, phi, hot, &path, hot_zero * incoming_zero, incoming_one, Some(n.feature));
    recurse(tree, x, class, phi, cold, &path, cold_zero * incoming_zero, 0.0, Some(n.feature));
}

fn extend(path: &mut Path, zero_fraction: f64, one_fraction: f64, feature: Option<usize>) {
    let depth = path.len();
    path.push(PathElement {
        feature,
        zero_fraction,
        one_fraction,
        weight: if depth == 0 { 1.0 } else { 0.0 },
    });

    let d = depth as f64;
    for i in (0..depth).rev() {
        let w = path[i].weight;
        path[i + 1].weight += one_fraction * w * (i as f64 + 1.0) / (d + 1.0);
        path[i].weight = zero_fraction * w * (d - i as f64) / (d + 1.0);
    }
}

fn unwind(path: &mut Path, index: usize) {
    let depth = path.len() - 1;
    let d = depth as f64;
    let one = path[index].one_fraction;
    let zero = path[index].zero_fraction;
    let mut next_one = path[depth].weight;

    for i in (0..depth).rev() {
        if one != 0.0 {
            let tmp = path[i].weight;
            path[i].weight = next_one * (d + 1.0) / ((i as f64 + 1.0) * one);
            next_one = tmp - path[i].weight * zero * (d - i as f64) / (d + 1.0);
        } else {
            path[i].weight = path[i].weight * (d + 1.0) / (zero * (d - i as f64));
        }
    }

    for i in index..depth {
        path[i].feature = path[i + 1].feature;
        path[i].zero_fraction = path[i + 1].zero_fraction;
        path[i].one_fraction = path[i + 1].one_fraction;
    }
    path.pop();
}

/// Total permutation weight with element `index` removed
fn unwound_sum(path: &Path, index: usize) -> f64 {
    let depth = path.len() - 1;
    let d = depth as f64;
    let one = path[index].one_fraction;
    let zero = path[index].zero_fraction;
    let mut next_one = path[depth].weight;
    let mut total = 0.0;

    for i in (0..depth).rev() {
        if one != 0.0 {
            let tmp = next_one * (d + 1.0) / ((i as f64 + 1.0) * one);
            total += tmp;
            next_one = path[i].weight - tmp * zero * (d - i as f64) / (d + 1.0);
        } else if zero != 0.0 {
            total += path[i].weight / zero / ((d - i as f64) / (d + 1.0));
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::forest::tests::two_level_tree;
    use crate::model::{Node, RandomForest};
    use approx::assert_relative_eq;

    fn local_accuracy(tree: &DecisionTree, x: &[f64], class: usize) {
        let phi = tree_shap(tree, x, class, 2);
        let fx = tree.value(tree.leaf_for(x), class);
        assert_relative_eq!(tree.expected_value(class) + phi.iter().sum::<f64>(), fx, epsilon = 1e-9);
    }

    #[test]
    fn test_values_sum_to_output_minus_expectation() {
        let tree = two_level_tree();
        for x in [[0.0, 0.0], [1.0, 1.0], [1.0, 3.0], [0.2, 9.0]] {
            for class in 0..2 {
                local_accuracy(&tree, &x, class);
            }
        }
    }

    #[test]
    fn test_single_split_matches_closed_form() {
        // Stump on feature 0: φ₀ = f(x) − E[f], feature 1 untouched
        let tree = DecisionTree::new(
            vec![
                Node { left: 1, right: 2, feature: 0, threshold: 0.5, cover: 4.0 },
                Node { left: usize::MAX, right: usize::MAX, feature: 0, threshold: 0.0, cover: 1.0 },
                Node { left: usize::MAX, right: usize::MAX, feature: 0, threshold: 0.0, cover: 3.0 },
            ],
            vec![0.25, 0.75, 1.0, 0.0, 0.0, 1.0],
            2,
        );
        let phi = tree_shap(&tree, &[0.0, 42.0], 0, 2);
        assert_relative_eq!(phi[0], 1.0 - 0.25, epsilon = 1e-12);
        assert_eq!(phi[1], 0.0);
    }

    #[test]
    fn test_interaction_tree_exact_values() {
        // x=[1, 1] lands in leaf 3, so f(x)=0 for class 0; compare with
        // Shapley values enumerated over both coalitions.
        let tree = two_level_tree();
        let x = [1.0, 1.0];
        let phi = tree_shap(&tree, &x, 0, 2);

        // Conditional expectations with covers as background
        let v_empty = 4.0 / 6.0;
        let v_0 = 1.0 / 3.0; // right subtree mean for class 0: (1·0 + 2·0.5)/3
        let v_1 = (3.0 * 1.0 + 3.0 * 0.0) / 6.0; // x1<=2 on the right branch, left branch unchanged
        let v_01 = 0.0;
        let phi_0 = 0.5 * (v_0 - v_empty) + 0.5 * (v_01 - v_1);
        let phi_1 = 0.5 * (v_1 - v_empty) + 0.5 * (v_01 - v_0);

        assert_relative_eq!(phi[0], phi_0, epsilon = 1e-12);
        assert_relative_eq!(phi[1], phi_1, epsilon = 1e-12);
    }

    #[test]
    fn test_repeated_feature_on_path() {
        // Feature 0 split twice: x0 <= 5 then x0 <= 2
        let leaf = |cover| Node { left: usize::MAX, right: usize::MAX, feature: 0, threshold: 0.0, cover };
        let tree = DecisionTree::new(
            vec![
                Node { left: 1, right: 4, feature: 0, threshold: 5.0, cover: 10.0 },
                Node { left: 2, right: 3, feature: 0, threshold: 2.0, cover: 6.0 },
                leaf(2.0),
                leaf(4.0),
                leaf(4.0),
            ],
            vec![
                0.5, 0.5,
                0.5, 0.5,
                1.0, 0.0,
                0.0, 1.0,
                0.0, 1.0,
            ],
            2,
        );
        for x in [[1.0, 0.0], [3.0, 0.0], [7.0, 0.0]] {
            local_accuracy(&tree, &x, 0);
            let phi = tree_shap(&tree, &x, 0, 2);
            assert_eq!(phi[1], 0.0);
        }
    }

    #[test]
    fn test_forest_shap_is_mean_of_trees() {
        let forest = RandomForest::new(vec![two_level_tree(), two_level_tree()], 2, 2);
        let x = [1.0, 3.0];
        let single = tree_shap(&forest.trees()[0], &x, 1, 2);
        let both = forest_shap(&forest, &x, 1);
        assert_relative_eq!(single[0], both[0], epsilon = 1e-12);
        assert_relative_eq!(single[1], both[1], epsilon = 1e-12);
    }
}
