//! Random forest regressor: bagged CART trees averaged into one premium estimate
//!
//! Each tree is grown on a bootstrap sample, splitting on the threshold that most
//! reduces the squared error until leaves hit `min_samples_leaf` or become pure.
//! Trees are fitted in parallel, each with its own ChaCha stream derived from
//! `random_state`, so a fit is reproducible regardless of thread scheduling.

use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::error::{ModelError, Result};
use super::linear::PremiumModel;
use super::model::check_training_data;

/// Hyper-parameters of the forest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    /// Unlimited when `None`
    pub max_depth: Option<usize>,
    pub min_samples_leaf: usize,
    /// Features tried at each split; all of them when `None`
    pub max_features: Option<usize>,
    pub random_state: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 500,
            max_depth: None,
            min_samples_leaf: 2,
            max_features: None,
            random_state: 42,
        }
    }
}

impl ForestParams {
    fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(ModelError::InvalidParameter {
                name: "n_estimators",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.min_samples_leaf == 0 {
            return Err(ModelError::InvalidParameter {
                name: "min_samples_leaf",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.max_features == Some(0) {
            return Err(ModelError::InvalidParameter {
                name: "max_features",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// One regression tree, nodes stored flat with the root at index 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<Node>,
}

struct Pending {
    node: usize,
    samples: Vec<usize>,
    depth: usize,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    score: f64,
    left: Vec<usize>,
    right: Vec<usize>,
}

impl RegressionTree {
    /// Grow a tree on `samples` (row indices into `x`, repeats allowed).
    ///
    /// Returns the tree and the squared-error reduction credited to each feature.
    fn grow(
        x: &[Vec<f64>],
        y: &[f64],
        samples: Vec<usize>,
        params: &ForestParams,
        rng: &mut ChaCha8Rng,
    ) -> (Self, Vec<f64>) {
        let width = x[0].len();
        let tried = params.max_features.unwrap_or(width).min(width);
        let mut importances = vec![0.0; width];
        let mut nodes = vec![Node::Leaf(mean(y, &samples))];
        let mut stack = vec![Pending { node: 0, samples, depth: 0 }];

        while let Some(Pending { node, samples, depth }) = stack.pop() {
            let at_depth_limit = params.max_depth.is_some_and(|max| depth >= max);
            if at_depth_limit || samples.len() < 2 * params.min_samples_leaf || is_pure(y, &samples) {
                continue;
            }

            let features: Vec<usize> = if tried < width {
                index::sample(rng, width, tried).into_vec()
            } else {
                (0..width).collect()
            };

            let Some(best) = best_split(x, y, &samples, &features, params.min_samples_leaf) else {
                continue;
            };

            let total: f64 = samples.iter().map(|&i| y[i]).sum();
            let parent_score = total * total / samples.len() as f64;
            importances[best.feature] += best.score - parent_score;

            let left = nodes.len();
            nodes.push(Node::Leaf(mean(y, &best.left)));
            nodes.push(Node::Leaf(mean(y, &best.right)));
            nodes[node] = Node::Split {
                feature: best.feature,
                threshold: best.threshold,
                left,
                right: left + 1,
            };

            stack.push(Pending { node: left, samples: best.left, depth: depth + 1 });
            stack.push(Pending { node: left + 1, samples: best.right, depth: depth + 1 });
        }

        (Self { nodes }, importances)
    }

    pub fn predict(&self, features: &[f64]) -> f64 {
        let mut node = 0;
        loop {
            match &self.nodes[node] {
                Node::Leaf(value) => return *value,
                Node::Split { feature, threshold, left, right } => {
                    node = if features[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| matches!(n, Node::Leaf(_))).count()
    }
}

fn mean(y: &[f64], samples: &[usize]) -> f64 {
    samples.iter().map(|&i| y[i]).sum::<f64>() / samples.len() as f64
}

fn is_pure(y: &[f64], samples: &[usize]) -> bool {
    let first = y[samples[0]];
    samples.iter().all(|&i| y[i] == first)
}

/// Split maximising `sum_l^2 / n_l + sum_r^2 / n_r`, i.e. minimising the children's SSE
fn best_split(
    x: &[Vec<f64>],
    y: &[f64],
    samples: &[usize],
    features: &[usize],
    min_leaf: usize,
) -> Option<BestSplit> {
    let n = samples.len();
    let total: f64 = samples.iter().map(|&i| y[i]).sum();
    let mut best: Option<(usize, usize, f64, f64)> = None;
    let mut order = samples.to_vec();

    for &feature in features {
        order.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));

        let mut left_sum = 0.0;
        for k in 1..n {
            left_sum += y[order[k - 1]];
            if k < min_leaf || n - k < min_leaf {
                continue;
            }
            let (lo, hi) = (x[order[k - 1]][feature], x[order[k]][feature]);
            if lo == hi {
                continue;
            }
            let right_sum = total - left_sum;
            let score = left_sum * left_sum / k as f64 + right_sum * right_sum / (n - k) as f64;
            if best.map_or(true, |(_, _, _, s)| score > s) {
                // Adjacent floats can round the midpoint up onto `hi`
                let mid = lo + (hi - lo) / 2.0;
                let threshold = if mid < hi { mid } else { lo };
                best = Some((feature, k, threshold, score));
            }
        }
    }

    let (feature, _, threshold, score) = best?;
    let (left, right): (Vec<usize>, Vec<usize>) = samples.iter().partition(|&&i| x[i][feature] <= threshold);
    Some(BestSplit { feature, threshold, score, left, right })
}

/// Bagged ensemble of regression trees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub params: ForestParams,
    pub n_features: usize,
    /// Normalised squared-error reduction per feature, summing to 1
    pub feature_importances: Vec<f64>,
    pub trees: Vec<RegressionTree>,
}

impl RandomForest {
    pub fn fit(x: &[Vec<f64>], y: &[f64], params: &ForestParams) -> Result<Self> {
        params.validate()?;
        let width = check_training_data(x, y)?;
        let n = x.len();

        let grown: Vec<(RegressionTree, Vec<f64>)> = (0..params.n_estimators)
            .into_par_iter()
            .map(|tree| {
                let mut rng = ChaCha8Rng::seed_from_u64(params.random_state.wrapping_add(tree as u64));
                let bootstrap: Vec<usize> = (0..n).map(|_| rng.random_range(0..n)).collect();
                RegressionTree::grow(x, y, bootstrap, params, &mut rng)
            })
            .collect();

        let mut feature_importances = vec![0.0; width];
        for (_, importances) in &grown {
            for (total, value) in feature_importances.iter_mut().zip(importances) {
                *total += value;
            }
        }
        let sum: f64 = feature_importances.iter().sum();
        if sum > 0.0 {
            feature_importances.iter_mut().for_each(|v| *v /= sum);
        }

        let trees: Vec<RegressionTree> = grown.into_iter().map(|(tree, _)| tree).collect();
        log::info!(
            "Fitted {} trees on {} rows ({} leaves in the first)",
            trees.len(),
            n,
            trees.first().map(RegressionTree::leaf_count).unwrap_or(0)
        );

        Ok(Self {
            params: params.clone(),
            n_features: width,
            feature_importances,
            trees,
        })
    }
}

impl PremiumModel for RandomForest {
    fn predict(&self, features: &[f64]) -> Result<f64> {
        if features.len() != self.n_features {
            return Err(ModelError::FeatureCountMismatch {
                expected: self.n_features,
                found: features.len(),
            });
        }
        let sum: f64 = self.trees.iter().map(|tree| tree.predict(features)).sum();
        Ok(sum / self.trees.len() as f64)
    }

    fn name(&self) -> &str {
        "RandomForest"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn params(n_estimators: usize, min_samples_leaf: usize) -> ForestParams {
        ForestParams {
            n_estimators,
            min_samples_leaf,
            ..Default::default()
        }
    }

    #[test]
    fn test_single_tree_fits_step() {
        let x: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..10).map(|i| if i < 5 { 1.0 } else { 3.0 }).collect();
        let samples: Vec<usize> = (0..10).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let (tree, importances) = RegressionTree::grow(&x, &y, samples, &params(1, 1), &mut rng);

        assert_eq!(tree.leaf_count(), 2);
        assert_eq!(tree.predict(&[2.0]), 1.0);
        assert_eq!(tree.predict(&[7.0]), 3.0);
        match &tree.nodes[0] {
            Node::Split { feature, threshold, .. } => {
                assert_eq!(*feature, 0);
                assert_relative_eq!(*threshold, 4.5);
            }
            other => panic!("expected a split at the root, got {:?}", other),
        }
        // SSE 10 at the root, 0 after the split
        assert_relative_eq!(importances[0], 10.0, max_relative = 1e-12);
    }

    #[test]
    fn test_min_samples_leaf_respected() {
        let x: Vec<Vec<f64>> = (0..9).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..9).map(|i| (i * i) as f64).collect();
        let samples: Vec<usize> = (0..9).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let (tree, _) = RegressionTree::grow(&x, &y, samples, &params(1, 3), &mut rng);

        // 9 rows with at least 3 per leaf: at most 3 leaves
        assert!(tree.leaf_count() <= 3);
        assert!(tree.leaf_count() >= 2);
    }

    #[test]
    fn test_forest_is_reproducible() {
        let x: Vec<Vec<f64>> = (0..40).map(|i| vec![i as f64, ((i * 7) % 11) as f64]).collect();
        let y: Vec<f64> = x.iter().map(|r| (r[0] / 10.0).exp() + r[1]).collect();

        let a = RandomForest::fit(&x, &y, &params(8, 2)).unwrap();
        let b = RandomForest::fit(&x, &y, &params(8, 2)).unwrap();

        assert_eq!(a, b);
        assert_eq!(a.trees.len(), 8);
        assert_relative_eq!(a.feature_importances.iter().sum::<f64>(), 1.0, max_relative = 1e-12);
        assert!(a.feature_importances[0] > a.feature_importances[1]);
    }

    #[test]
    fn test_forest_tracks_exponential_target() {
        // Premium-like growth that a plane cannot follow
        let x: Vec<Vec<f64>> = (0..200).map(|i| vec![20.0 + (i % 50) as f64]).collect();
        let y: Vec<f64> = x.iter().map(|r| (r[0] / 8.0).exp()).collect();
        let forest = RandomForest::fit(&x, &y, &params(20, 1)).unwrap();

        for age in [25.0, 40.0, 60.0] {
            let expected = (age / 8.0_f64).exp();
            assert_relative_eq!(forest.predict(&[age]).unwrap(), expected, max_relative = 0.05);
        }
    }

    #[test]
    fn test_invalid_params_and_inputs() {
        let x = vec![vec![1.0], vec![2.0]];
        assert!(RandomForest::fit(&x, &[1.0, 2.0], &params(0, 1)).is_err());
        assert!(RandomForest::fit(&x, &[1.0, 2.0], &params(1, 0)).is_err());
        assert!(matches!(RandomForest::fit(&[], &[], &params(1, 1)), Err(ModelError::EmptyDataset)));

        let forest = RandomForest::fit(&x, &[1.0, 2.0], &params(2, 1)).unwrap();
        assert!(matches!(
            forest.predict(&[1.0, 2.0]),
            Err(ModelError::FeatureCountMismatch { expected: 1, found: 2 })
        ));
    }
}
