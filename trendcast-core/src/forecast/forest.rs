//! Bagged ensemble of regression trees.

use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::dataset::{Dataset, FeatureRow, N_FEATURES};
use super::tree::{RegressionTree, TreeConfig};
use super::ForecastError;
use crate::cancel::CancelToken;
use crate::rng::RngHierarchy;

/// RNG stream name for per-tree bootstrap draws.
const TREE_STREAM: &str = "forest_tree";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    pub n_trees: usize,
    pub bootstrap: bool,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 200,
            bootstrap: true,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

impl ForestConfig {
    pub fn validate(&self) -> Result<(), ForecastError> {
        if self.n_trees == 0 {
            return Err(ForecastError::InvalidConfig("n_trees must be >= 1".into()));
        }
        if self.min_samples_split < 2 {
            return Err(ForecastError::InvalidConfig(
                "min_samples_split must be >= 2".into(),
            ));
        }
        if self.min_samples_leaf == 0 {
            return Err(ForecastError::InvalidConfig(
                "min_samples_leaf must be >= 1".into(),
            ));
        }
        Ok(())
    }

    pub fn tree_config(&self) -> TreeConfig {
        TreeConfig {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
    feature_importances: [f64; N_FEATURES],
}

impl RandomForest {
    /// Fit `config.n_trees` trees in parallel.
    ///
    /// Tree `i` draws its bootstrap sample from its own stream
    /// `rng.rng_for("forest_tree", i)`, so the fitted forest does not depend
    /// on the rayon thread count.
    pub fn fit(
        data: &Dataset,
        config: &ForestConfig,
        rng: &RngHierarchy,
        cancel: &CancelToken,
    ) -> Result<Self, ForecastError> {
        config.validate()?;
        if data.is_empty() {
            return Err(ForecastError::TrainingDataInsufficient(
                "no training rows".into(),
            ));
        }
        let n = data.n_samples();
        let tree_config = config.tree_config();

        let trees = (0..config.n_trees)
            .into_par_iter()
            .map(|i| {
                if cancel.is_cancelled() {
                    return Err(ForecastError::Cancelled);
                }
                let sample: Vec<usize> = if config.bootstrap {
                    let mut tree_rng = rng.rng_for(TREE_STREAM, i as u64);
                    (0..n).map(|_| tree_rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                Ok(RegressionTree::fit(
                    &data.features,
                    &data.labels,
                    &sample,
                    &tree_config,
                ))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut feature_importances = [0.0; N_FEATURES];
        for tree in &trees {
            for (acc, imp) in feature_importances.iter_mut().zip(tree.feature_importances()) {
                *acc += imp;
            }
        }
        let total: f64 = feature_importances.iter().sum();
        if total > 0.0 {
            for imp in &mut feature_importances {
                *imp /= total;
            }
        }

        debug!(
            trees = trees.len(),
            rows = n,
            mean_depth = trees.iter().map(|t| t.depth()).sum::<usize>() as f64 / trees.len() as f64,
            "random forest fitted"
        );

        Ok(Self {
            trees,
            feature_importances,
        })
    }

    /// Mean of the tree predictions, accumulated in tree order.
    pub fn predict(&self, row: &FeatureRow) -> f64 {
        let sum: f64 = self.trees.iter().map(|t| t.predict(row)).sum();
        sum / self.trees.len() as f64
    }

    pub fn predict_all(&self, rows: &[FeatureRow]) -> Vec<f64> {
        rows.iter().map(|r| self.predict(r)).collect()
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn feature_importances(&self) -> &[f64; N_FEATURES] {
        &self.feature_importances
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dataset(n: usize) -> Dataset {
        let base = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let features: Vec<FeatureRow> = (0..n)
            .map(|i| {
                let x = i as f64;
                [x, x * 0.5, (x * 0.3).sin(), 50.0 + x % 7.0, x.cos(), x % 3.0]
            })
            .collect();
        let labels = features.iter().map(|f| 2.0 * f[0] + f[2]).collect();
        Dataset {
            features,
            labels,
            dates: (0..n)
                .map(|i| base + chrono::Duration::days(i as i64))
                .collect(),
        }
    }

    fn small_config() -> ForestConfig {
        ForestConfig {
            n_trees: 16,
            ..Default::default()
        }
    }

    #[test]
    fn same_seed_same_forest() {
        let data = dataset(60);
        let rng = RngHierarchy::new(42);
        let a = RandomForest::fit(&data, &small_config(), &rng, &CancelToken::new()).unwrap();
        let b = RandomForest::fit(&data, &small_config(), &rng, &CancelToken::new()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn independent_of_thread_count() {
        let data = dataset(60);
        let rng = RngHierarchy::new(7);
        let single = rayon::ThreadPoolBuilder::new()
            .num_threads(1)
            .build()
            .unwrap()
            .install(|| RandomForest::fit(&data, &small_config(), &rng, &CancelToken::new()))
            .unwrap();
        let multi = rayon::ThreadPoolBuilder::new()
            .num_threads(4)
            .build()
            .unwrap()
            .install(|| RandomForest::fit(&data, &small_config(), &rng, &CancelToken::new()))
            .unwrap();
        assert_eq!(single, multi);
    }

    #[test]
    fn predictions_track_training_signal() {
        let data = dataset(80);
        let forest = RandomForest::fit(
            &data,
            &small_config(),
            &RngHierarchy::new(42),
            &CancelToken::new(),
        )
        .unwrap();
        let preds = forest.predict_all(&data.features);
        let mae: f64 = preds
            .iter()
            .zip(&data.labels)
            .map(|(p, y)| (p - y).abs())
            .sum::<f64>()
            / preds.len() as f64;
        assert!(mae < 5.0, "in-sample MAE too large: {mae}");
    }

    #[test]
    fn importances_are_normalized() {
        let forest = RandomForest::fit(
            &dataset(40),
            &small_config(),
            &RngHierarchy::new(1),
            &CancelToken::new(),
        )
        .unwrap();
        let sum: f64 = forest.feature_importances().iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn cancelled_token_aborts_fit() {
        let cancel = CancelToken::new();
        cancel.cancel();
        assert_eq!(
            RandomForest::fit(&dataset(20), &small_config(), &RngHierarchy::new(1), &cancel),
            Err(ForecastError::Cancelled)
        );
    }

    #[test]
    fn zero_trees_is_invalid() {
        let config = ForestConfig {
            n_trees: 0,
            ..Default::default()
        };
        assert!(matches!(
            RandomForest::fit(&dataset(10), &config, &RngHierarchy::new(1), &CancelToken::new()),
            Err(ForecastError::InvalidConfig(_))
        ));
    }
}
