//! Regression forecaster: random forest on indicator features, iterated
//! forward one bar at a time.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::dataset::{feature_row, Dataset, CLOSE_FEATURE, FEATURE_NAMES};
use super::forest::{ForestConfig, RandomForest};
use super::{ForecastError, ForecastMethod, ForecastResult};
use crate::cancel::CancelToken;
use crate::indicators::IndicatorFrame;
use crate::rng::RngHierarchy;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegressionConfig {
    pub forest: ForestConfig,
    /// Fraction of labelled rows held out, in (0, 1).
    pub test_ratio: f64,
    pub days_ahead: usize,
}

impl Default for RegressionConfig {
    fn default() -> Self {
        Self {
            forest: ForestConfig::default(),
            test_ratio: 0.2,
            days_ahead: 30,
        }
    }
}

/// Fit quality and shape of the trained model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionDiagnostics {
    /// Mean absolute error on the held-out partition.
    pub mae: f64,
    pub train_rows: usize,
    pub test_rows: usize,
    pub n_trees: usize,
    pub feature_importances: Vec<(String, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegressionForecast {
    pub result: ForecastResult,
    pub diagnostics: RegressionDiagnostics,
}

#[derive(Debug, Clone, Default)]
pub struct RegressionForecaster {
    config: RegressionConfig,
}

impl RegressionForecaster {
    pub fn new(config: RegressionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RegressionConfig {
        &self.config
    }

    /// Train on `frame` and forecast `days_ahead` closes.
    ///
    /// Each step predicts the next close from the previous feature vector,
    /// then writes the prediction into the close slot. Moving averages, RSI
    /// and MACD stay at their last observed values, which the result flags
    /// with `feature_staleness`.
    pub fn forecast(
        &self,
        frame: &IndicatorFrame,
        rng: &RngHierarchy,
        cancel: &CancelToken,
    ) -> Result<RegressionForecast, ForecastError> {
        if self.config.days_ahead == 0 {
            return Err(ForecastError::InvalidConfig(
                "days_ahead must be >= 1".into(),
            ));
        }
        self.config.forest.validate()?;
        frame.require_history()?;

        let dataset = Dataset::from_frame(frame);
        let split = dataset.chronological_split(self.config.test_ratio)?;
        if let Some(j) = split.train.constant_feature() {
            return Err(ForecastError::TrainingDataInsufficient(format!(
                "feature {} is constant over {} training rows",
                FEATURE_NAMES[j],
                split.train.n_samples()
            )));
        }

        let forest = RandomForest::fit(&split.train, &self.config.forest, rng, cancel)?;

        let predictions = forest.predict_all(&split.test.features);
        let mae = predictions
            .iter()
            .zip(&split.test.labels)
            .map(|(p, y)| (p - y).abs())
            .sum::<f64>()
            / predictions.len() as f64;
        debug!(
            mae,
            train = split.train.n_samples(),
            test = split.test.n_samples(),
            "regression forecaster evaluated"
        );

        let last = frame.len() - 1;
        let mut row = feature_row(frame, last).ok_or(ForecastError::InsufficientData {
            required: frame.params().required_history(),
            available: frame.len(),
        })?;

        let mut path = Vec::with_capacity(self.config.days_ahead);
        for _ in 0..self.config.days_ahead {
            let next = forest.predict(&row);
            path.push(next);
            row[CLOSE_FEATURE] = next;
        }
        let predicted_price = path[path.len() - 1];

        let diagnostics = RegressionDiagnostics {
            mae,
            train_rows: split.train.n_samples(),
            test_rows: split.test.n_samples(),
            n_trees: forest.n_trees(),
            feature_importances: FEATURE_NAMES
                .iter()
                .zip(forest.feature_importances())
                .map(|(name, &imp)| (name.to_string(), imp))
                .collect(),
        };

        Ok(RegressionForecast {
            result: ForecastResult::new(ForecastMethod::RandomForest, predicted_price, path, true),
            diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PriceSeries;
    use crate::indicators::{make_bars, IndicatorParams};

    fn params() -> IndicatorParams {
        IndicatorParams {
            ma_fast: 5,
            ma_slow: 10,
            rsi: 4,
            macd_fast: 3,
            macd_slow: 6,
            macd_signal: 3,
        }
    }

    fn wavy(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + 0.2 * i as f64 + 3.0 * (i as f64 * 0.4).sin())
            .collect()
    }

    fn frame(closes: &[f64]) -> IndicatorFrame {
        let series = PriceSeries::new("TEST", make_bars(closes)).unwrap();
        IndicatorFrame::compute(&series, &params()).unwrap()
    }

    fn forecaster() -> RegressionForecaster {
        RegressionForecaster::new(RegressionConfig {
            forest: ForestConfig {
                n_trees: 20,
                ..Default::default()
            },
            days_ahead: 5,
            ..Default::default()
        })
    }

    #[test]
    fn forecast_has_horizon_length_and_staleness_flag() {
        let out = forecaster()
            .forecast(&frame(&wavy(120)), &RngHierarchy::default(), &CancelToken::new())
            .unwrap();
        assert_eq!(out.result.horizon(), 5);
        assert!(out.result.feature_staleness());
        assert_eq!(out.result.method(), ForecastMethod::RandomForest);
        assert_eq!(out.result.predicted_price(), out.result.path()[4]);
        assert!(out.diagnostics.mae.is_finite());
        assert_eq!(out.diagnostics.n_trees, 20);
        // 120 bars, MA10 defined from index 9, last row unlabelled: 110 rows.
        assert_eq!(out.diagnostics.test_rows, 22);
        assert_eq!(out.diagnostics.train_rows, 88);
    }

    #[test]
    fn forecast_is_reproducible() {
        let f = frame(&wavy(120));
        let a = forecaster()
            .forecast(&f, &RngHierarchy::new(9), &CancelToken::new())
            .unwrap();
        let b = forecaster()
            .forecast(&f, &RngHierarchy::new(9), &CancelToken::new())
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn predictions_stay_within_label_range() {
        let closes = wavy(120);
        let out = forecaster()
            .forecast(&frame(&closes), &RngHierarchy::default(), &CancelToken::new())
            .unwrap();
        let lo = closes.iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = closes.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        assert!(out.result.path().iter().all(|p| *p >= lo && *p <= hi));
    }

    #[test]
    fn monotone_series_is_degenerate() {
        let rising: Vec<f64> = (0..120).map(|i| 100.0 + 0.1 * i as f64).collect();
        let err = forecaster()
            .forecast(&frame(&rising), &RngHierarchy::default(), &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, ForecastError::TrainingDataInsufficient(_)));
    }

    #[test]
    fn short_history_is_insufficient_data() {
        let err = forecaster()
            .forecast(&frame(&wavy(8)), &RngHierarchy::default(), &CancelToken::new())
            .unwrap_err();
        assert_eq!(
            err,
            ForecastError::InsufficientData {
                required: 10,
                available: 8
            }
        );
    }

    #[test]
    fn zero_horizon_is_invalid() {
        let f = RegressionForecaster::new(RegressionConfig {
            days_ahead: 0,
            ..Default::default()
        });
        assert!(matches!(
            f.forecast(&frame(&wavy(50)), &RngHierarchy::default(), &CancelToken::new()),
            Err(ForecastError::InvalidConfig(_))
        ));
    }
}
