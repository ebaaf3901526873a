//! Forecasting: the tree-ensemble regression forecaster and the shared
//! forecast result type. The Monte Carlo simulator lives in
//! `crate::monte_carlo` and produces the same `ForecastResult`.

pub mod dataset;
pub mod forest;
pub mod regression;
pub mod tree;

pub use dataset::{Dataset, FeatureRow, Split, FEATURE_NAMES, N_FEATURES};
pub use forest::{ForestConfig, RandomForest};
pub use regression::{
    RegressionConfig, RegressionDiagnostics, RegressionForecast, RegressionForecaster,
};
pub use tree::{RegressionTree, TreeConfig};

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::indicators::FrameError;

/// Errors from the regression forecaster.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ForecastError {
    #[error("insufficient data: {available} bars < {required} required")]
    InsufficientData { required: usize, available: usize },

    #[error("training data insufficient: {0}")]
    TrainingDataInsufficient(String),

    #[error("invalid forecaster config: {0}")]
    InvalidConfig(String),

    #[error("forecast cancelled")]
    Cancelled,
}

impl From<FrameError> for ForecastError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::InsufficientData {
                required,
                available,
            } => ForecastError::InsufficientData {
                required,
                available,
            },
            FrameError::InvalidParams(msg) => ForecastError::InvalidConfig(msg),
        }
    }
}

/// Which model produced a forecast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastMethod {
    /// Random-forest regression, falling back to Monte Carlo when the
    /// training data is degenerate.
    #[default]
    RandomForest,
    MonteCarlo,
}

impl fmt::Display for ForecastMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForecastMethod::RandomForest => f.write_str("random_forest"),
            ForecastMethod::MonteCarlo => f.write_str("monte_carlo"),
        }
    }
}

/// A forward price path over the forecast horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    method: ForecastMethod,
    predicted_price: f64,
    path: Vec<f64>,
    feature_staleness: bool,
}

impl ForecastResult {
    pub(crate) fn new(
        method: ForecastMethod,
        predicted_price: f64,
        path: Vec<f64>,
        feature_staleness: bool,
    ) -> Self {
        debug_assert!(!path.is_empty(), "forecast path must cover the horizon");
        Self {
            method,
            predicted_price,
            path,
            feature_staleness,
        }
    }

    pub fn method(&self) -> ForecastMethod {
        self.method
    }

    /// Price at the end of the horizon.
    pub fn predicted_price(&self) -> f64 {
        self.predicted_price
    }

    /// One value per forecast day; `path().len()` is the horizon.
    pub fn path(&self) -> &[f64] {
        &self.path
    }

    pub fn horizon(&self) -> usize {
        self.path.len()
    }

    /// True when the path was produced by feeding predictions back with the
    /// non-price features held at their last observed values.
    pub fn feature_staleness(&self) -> bool {
        self.feature_staleness
    }
}
