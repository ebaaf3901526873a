//! Regression tree with variance-reduction splits.
//!
//! Candidate thresholds for a feature are found with one sorted sweep over
//! the node's samples using running sums of the centred labels, so each
//! node costs O(n log n) per feature.

use serde::{Deserialize, Serialize};

use super::dataset::{FeatureRow, N_FEATURES};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeConfig {
    /// `None` grows until leaves are pure or too small to split.
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn depth(&self) -> usize {
        match self {
            Node::Leaf { .. } => 1,
            Node::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    fn n_leaves(&self) -> usize {
        match self {
            Node::Leaf { .. } => 1,
            Node::Split { left, right, .. } => left.n_leaves() + right.n_leaves(),
        }
    }
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    /// Reduction in summed squared error.
    gain: f64,
    left: Vec<usize>,
    right: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegressionTree {
    root: Node,
    feature_importances: [f64; N_FEATURES],
}

impl RegressionTree {
    /// Fit on the rows listed in `sample`. Indices may repeat (bootstrap).
    pub fn fit(
        features: &[FeatureRow],
        labels: &[f64],
        sample: &[usize],
        config: &TreeConfig,
    ) -> Self {
        let mut builder = Builder {
            features,
            labels,
            config,
            importances: [0.0; N_FEATURES],
        };
        let root = builder.build(sample.to_vec(), 0);

        let mut feature_importances = builder.importances;
        let total: f64 = feature_importances.iter().sum();
        if total > 0.0 {
            for imp in &mut feature_importances {
                *imp /= total;
            }
        }
        Self {
            root,
            feature_importances,
        }
    }

    pub fn predict(&self, row: &FeatureRow) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        self.root.depth()
    }

    pub fn n_leaves(&self) -> usize {
        self.root.n_leaves()
    }

    /// Normalized to sum to 1, or all zero for a single-leaf tree.
    pub fn feature_importances(&self) -> &[f64; N_FEATURES] {
        &self.feature_importances
    }
}

struct Builder<'a> {
    features: &'a [FeatureRow],
    labels: &'a [f64],
    config: &'a TreeConfig,
    importances: [f64; N_FEATURES],
}

impl Builder<'_> {
    fn build(&mut self, sample: Vec<usize>, depth: usize) -> Node {
        let n = sample.len();
        let mean = sample.iter().map(|&i| self.labels[i]).sum::<f64>() / n as f64;
        let sse: f64 = sample
            .iter()
            .map(|&i| (self.labels[i] - mean).powi(2))
            .sum();

        let depth_reached = self.config.max_depth.is_some_and(|max| depth >= max);
        if depth_reached || n < self.config.min_samples_split || sse <= f64::EPSILON {
            return Node::Leaf { value: mean };
        }

        match self.best_split(&sample, mean, sse) {
            Some(split) => {
                self.importances[split.feature] += split.gain;
                let left = self.build(split.left, depth + 1);
                let right = self.build(split.right, depth + 1);
                Node::Split {
                    feature: split.feature,
                    threshold: split.threshold,
                    left: Box::new(left),
                    right: Box::new(right),
                }
            }
            None => Node::Leaf { value: mean },
        }
    }

    fn best_split(&self, sample: &[usize], mean: f64, parent_sse: f64) -> Option<BestSplit> {
        let n = sample.len();
        let min_leaf = self.config.min_samples_leaf.max(1);
        if n < 2 * min_leaf {
            return None;
        }

        let mut best: Option<(usize, f64, f64)> = None;
        let mut order = sample.to_vec();

        for feature in 0..N_FEATURES {
            order.sort_by(|&a, &b| self.features[a][feature].total_cmp(&self.features[b][feature]));

            let total_sum: f64 = order.iter().map(|&i| self.labels[i] - mean).sum();
            let total_sq: f64 = order.iter().map(|&i| (self.labels[i] - mean).powi(2)).sum();
            let mut left_sum = 0.0;
            let mut left_sq = 0.0;

            for k in 1..n {
                let y = self.labels[order[k - 1]] - mean;
                left_sum += y;
                left_sq += y * y;

                if k < min_leaf || n - k < min_leaf {
                    continue;
                }
                let lo = self.features[order[k - 1]][feature];
                let hi = self.features[order[k]][feature];
                if lo >= hi {
                    continue;
                }

                let (nl, nr) = (k as f64, (n - k) as f64);
                let right_sum = total_sum - left_sum;
                let right_sq = total_sq - left_sq;
                let sse = (left_sq - left_sum * left_sum / nl).max(0.0)
                    + (right_sq - right_sum * right_sum / nr).max(0.0);
                let gain = parent_sse - sse;

                if gain > 0.0 && best.map_or(true, |(_, _, g)| gain > g) {
                    let mut threshold = lo + (hi - lo) / 2.0;
                    if threshold >= hi {
                        threshold = lo;
                    }
                    best = Some((feature, threshold, gain));
                }
            }
        }

        let (feature, threshold, gain) = best?;
        let (left, right): (Vec<usize>, Vec<usize>) = sample
            .iter()
            .partition(|&&i| self.features[i][feature] <= threshold);
        Some(BestSplit {
            feature,
            threshold,
            gain,
            left,
            right,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::assert_approx;

    fn row(x: f64) -> FeatureRow {
        [x, 1.0, 2.0, 3.0, 4.0, 5.0]
    }

    #[test]
    fn learns_step_function() {
        let features: Vec<FeatureRow> = (0..10).map(|i| row(i as f64)).collect();
        let labels: Vec<f64> = (0..10).map(|i| if i < 5 { 1.0 } else { 9.0 }).collect();
        let sample: Vec<usize> = (0..10).collect();

        let tree = RegressionTree::fit(&features, &labels, &sample, &TreeConfig::default());
        assert_eq!(tree.n_leaves(), 2);
        assert_eq!(tree.predict(&row(2.0)), 1.0);
        assert_eq!(tree.predict(&row(7.0)), 9.0);
        assert_eq!(tree.predict(&row(4.5)), 1.0);
        assert_eq!(tree.feature_importances()[0], 1.0);
    }

    #[test]
    fn unlimited_depth_fits_training_data_exactly() {
        let features: Vec<FeatureRow> = (0..16).map(|i| row(i as f64)).collect();
        let labels: Vec<f64> = (0..16).map(|i| ((i * 7) % 5) as f64).collect();
        let sample: Vec<usize> = (0..16).collect();

        let tree = RegressionTree::fit(&features, &labels, &sample, &TreeConfig::default());
        for (f, &y) in features.iter().zip(&labels) {
            assert_approx(tree.predict(f), y, 1e-12);
        }
    }

    #[test]
    fn max_depth_limits_growth() {
        let features: Vec<FeatureRow> = (0..32).map(|i| row(i as f64)).collect();
        let labels: Vec<f64> = (0..32).map(|i| (i as f64).sin()).collect();
        let sample: Vec<usize> = (0..32).collect();
        let config = TreeConfig {
            max_depth: Some(2),
            ..Default::default()
        };
        let tree = RegressionTree::fit(&features, &labels, &sample, &config);
        assert!(tree.depth() <= 3);
        assert!(tree.n_leaves() <= 4);
    }

    #[test]
    fn min_samples_leaf_is_respected() {
        let features: Vec<FeatureRow> = (0..6).map(|i| row(i as f64)).collect();
        let labels = vec![0.0, 0.0, 0.0, 0.0, 0.0, 10.0];
        let sample: Vec<usize> = (0..6).collect();
        let config = TreeConfig {
            min_samples_leaf: 2,
            ..Default::default()
        };
        let tree = RegressionTree::fit(&features, &labels, &sample, &config);
        // The outlier cannot be isolated into a singleton leaf.
        assert_approx(tree.predict(&row(5.0)), 5.0, 1e-12);
    }

    #[test]
    fn pure_node_is_a_leaf() {
        let features: Vec<FeatureRow> = (0..5).map(|i| row(i as f64)).collect();
        let labels = vec![3.0; 5];
        let sample: Vec<usize> = (0..5).collect();
        let tree = RegressionTree::fit(&features, &labels, &sample, &TreeConfig::default());
        assert_eq!(tree.n_leaves(), 1);
        assert_eq!(tree.feature_importances(), &[0.0; N_FEATURES]);
    }

    #[test]
    fn repeated_bootstrap_indices_are_weighted() {
        let features: Vec<FeatureRow> = (0..2).map(|i| row(i as f64)).collect();
        let labels = vec![0.0, 4.0];
        let tree = RegressionTree::fit(&features, &labels, &[0, 0, 0, 1], &TreeConfig {
            max_depth: Some(0),
            ..Default::default()
        });
        assert_approx(tree.predict(&row(0.0)), 1.0, 1e-12);
    }
}
