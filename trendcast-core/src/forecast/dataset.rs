//! Supervised dataset built from an indicator frame.
//!
//! Each sample is one bar's feature vector labelled with the next bar's
//! close. The final bar has no label and rows with an undefined feature are
//! dropped, so a default frame yields samples only from bar 199 onward.

use chrono::NaiveDate;

use super::ForecastError;
use crate::indicators::IndicatorFrame;

pub const N_FEATURES: usize = 6;

pub const FEATURE_NAMES: [&str; N_FEATURES] =
    ["Close", "MA_fast", "MA_slow", "RSI", "MACD", "MACD_signal"];

/// Index of the close price within a feature row.
pub const CLOSE_FEATURE: usize = 0;

pub type FeatureRow = [f64; N_FEATURES];

/// Feature vector for bar `index`, or `None` if any value is NaN.
pub fn feature_row(frame: &IndicatorFrame, index: usize) -> Option<FeatureRow> {
    let row = [
        frame.series().bars()[index].close,
        frame.ma_fast()[index],
        frame.ma_slow()[index],
        frame.rsi()[index],
        frame.macd()[index],
        frame.macd_signal()[index],
    ];
    row.iter().all(|v| v.is_finite()).then_some(row)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub features: Vec<FeatureRow>,
    pub labels: Vec<f64>,
    /// Date of the bar the features were taken from.
    pub dates: Vec<NaiveDate>,
}

/// Chronological train/test partition.
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    pub train: Dataset,
    pub test: Dataset,
}

impl Dataset {
    pub fn from_frame(frame: &IndicatorFrame) -> Self {
        let bars = frame.series().bars();
        let mut dataset = Dataset::default();
        for i in 0..frame.len().saturating_sub(1) {
            let label = bars[i + 1].close;
            if !label.is_finite() {
                continue;
            }
            if let Some(row) = feature_row(frame, i) {
                dataset.features.push(row);
                dataset.labels.push(label);
                dataset.dates.push(bars[i].date);
            }
        }
        dataset
    }

    pub fn n_samples(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Split without shuffling: the last `ceil(test_ratio * n)` samples form
    /// the test partition.
    pub fn chronological_split(&self, test_ratio: f64) -> Result<Split, ForecastError> {
        if !(test_ratio > 0.0 && test_ratio < 1.0) {
            return Err(ForecastError::InvalidConfig(format!(
                "test_ratio must be in (0, 1), got {test_ratio}"
            )));
        }
        let n = self.n_samples();
        let n_test = (test_ratio * n as f64).ceil() as usize;
        let n_train = n.saturating_sub(n_test);
        if n_train < 2 || n_test < 1 {
            return Err(ForecastError::TrainingDataInsufficient(format!(
                "{n} labelled rows give {n_train} train / {n_test} test, need at least 2 / 1"
            )));
        }
        Ok(Split {
            train: self.slice(0..n_train),
            test: self.slice(n_train..n),
        })
    }

    /// First feature column with a single value over all samples.
    pub fn constant_feature(&self) -> Option<usize> {
        let first = self.features.first()?;
        (0..N_FEATURES).find(|&j| self.features.iter().all(|row| row[j] == first[j]))
    }

    fn slice(&self, range: std::ops::Range<usize>) -> Dataset {
        Dataset {
            features: self.features[range.clone()].to_vec(),
            labels: self.labels[range.clone()].to_vec(),
            dates: self.dates[range].to_vec(),
        }
    }
}
