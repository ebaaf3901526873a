//! IndicatorFrame — a price series with its derived indicator columns.
//!
//! Columns are computed once from the series and exposed as read-only
//! slices aligned 1:1 with the bars. Warm-up values are NaN; consumers that
//! need defined values go through `require_history()` / `snapshot()`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::indicator::Indicator;
use super::macd::{Macd, MacdComponent};
use super::rsi::Rsi;
use super::sma::Sma;
use crate::domain::PriceSeries;

/// Errors raised when building or reading an indicator frame.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FrameError {
    #[error("insufficient data: {available} bars < {required} required")]
    InsufficientData { required: usize, available: usize },

    #[error("invalid indicator parameters: {0}")]
    InvalidParams(String),
}

/// Lookback windows and spans for the indicator set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorParams {
    pub ma_fast: usize,
    pub ma_slow: usize,
    pub rsi: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            ma_fast: 50,
            ma_slow: 200,
            rsi: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
        }
    }
}

impl IndicatorParams {
    pub fn validate(&self) -> Result<(), FrameError> {
        let windows = [
            ("ma_fast", self.ma_fast),
            ("ma_slow", self.ma_slow),
            ("rsi", self.rsi),
            ("macd_fast", self.macd_fast),
            ("macd_slow", self.macd_slow),
            ("macd_signal", self.macd_signal),
        ];
        if let Some((name, _)) = windows.iter().find(|(_, w)| *w == 0) {
            return Err(FrameError::InvalidParams(format!("{name} must be >= 1")));
        }
        if self.ma_fast >= self.ma_slow {
            return Err(FrameError::InvalidParams(format!(
                "ma_fast ({}) must be shorter than ma_slow ({})",
                self.ma_fast, self.ma_slow
            )));
        }
        if self.macd_fast >= self.macd_slow {
            return Err(FrameError::InvalidParams(format!(
                "macd_fast ({}) must be shorter than macd_slow ({})",
                self.macd_fast, self.macd_slow
            )));
        }
        Ok(())
    }

    /// Bars needed before every column has a defined last value.
    pub fn required_history(&self) -> usize {
        self.ma_slow.max(self.ma_fast).max(self.rsi + 1)
    }

    /// The indicator set in frame column order.
    pub fn indicators(&self) -> [Box<dyn Indicator>; 7] {
        let (f, s, sig) = (self.macd_fast, self.macd_slow, self.macd_signal);
        [
            Box::new(Sma::new(self.ma_fast)),
            Box::new(Sma::new(self.ma_slow)),
            Box::new(Rsi::new(self.rsi)),
            Box::new(Macd::new(f, s, sig, MacdComponent::FastEma)),
            Box::new(Macd::new(f, s, sig, MacdComponent::SlowEma)),
            Box::new(Macd::new(f, s, sig, MacdComponent::Line)),
            Box::new(Macd::new(f, s, sig, MacdComponent::Signal)),
        ]
    }
}

/// Last-bar indicator state consumed by the classifier and entry decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub date: NaiveDate,
    pub close: f64,
    pub ma_fast: f64,
    pub ma_slow: f64,
    pub rsi: f64,
    pub macd: f64,
    pub macd_signal: f64,
}

/// One bar of the frame, with undefined indicator values as `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRow {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub ma_fast: Option<f64>,
    pub ma_slow: Option<f64>,
    pub rsi: Option<f64>,
    pub ema_fast: Option<f64>,
    pub ema_slow: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct IndicatorFrame {
    series: PriceSeries,
    params: IndicatorParams,
    ma_fast: Vec<f64>,
    ma_slow: Vec<f64>,
    rsi: Vec<f64>,
    ema_fast: Vec<f64>,
    ema_slow: Vec<f64>,
    macd: Vec<f64>,
    macd_signal: Vec<f64>,
}

impl IndicatorFrame {
    /// Compute every indicator column for `series`.
    ///
    /// Short series are accepted; their warm-up columns are simply NaN.
    pub fn compute(series: &PriceSeries, params: &IndicatorParams) -> Result<Self, FrameError> {
        params.validate()?;
        let bars = series.bars();
        let [ma_fast, ma_slow, rsi, ema_fast, ema_slow, macd, macd_signal] =
            params.indicators().map(|indicator| indicator.compute(bars));

        Ok(Self {
            series: series.clone(),
            params: *params,
            ma_fast,
            ma_slow,
            rsi,
            ema_fast,
            ema_slow,
            macd,
            macd_signal,
        })
    }

    pub fn series(&self) -> &PriceSeries {
        &self.series
    }

    pub fn params(&self) -> &IndicatorParams {
        &self.params
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.series.closes()
    }

    pub fn ma_fast(&self) -> &[f64] {
        &self.ma_fast
    }

    pub fn ma_slow(&self) -> &[f64] {
        &self.ma_slow
    }

    pub fn rsi(&self) -> &[f64] {
        &self.rsi
    }

    pub fn ema_fast(&self) -> &[f64] {
        &self.ema_fast
    }

    pub fn ema_slow(&self) -> &[f64] {
        &self.ema_slow
    }

    pub fn macd(&self) -> &[f64] {
        &self.macd
    }

    pub fn macd_signal(&self) -> &[f64] {
        &self.macd_signal
    }

    /// Column headers in export order, named after the configured windows.
    pub fn column_names(&self) -> [String; 7] {
        [
            format!("MA{}", self.params.ma_fast),
            format!("MA{}", self.params.ma_slow),
            format!("RSI{}", self.params.rsi),
            "EMA_fast".to_string(),
            "EMA_slow".to_string(),
            "MACD".to_string(),
            "MACD_signal".to_string(),
        ]
    }

    /// Fail unless the series covers the longest lookback.
    pub fn require_history(&self) -> Result<(), FrameError> {
        let required = self.params.required_history();
        if self.len() < required {
            return Err(FrameError::InsufficientData {
                required,
                available: self.len(),
            });
        }
        Ok(())
    }

    /// Indicator values on the most recent bar.
    ///
    /// Fails with `InsufficientData` if any value is still undefined there.
    pub fn snapshot(&self) -> Result<IndicatorSnapshot, FrameError> {
        self.require_history()?;
        let i = self.len() - 1;
        let snapshot = IndicatorSnapshot {
            date: self.series.last_date(),
            close: self.series.last().close,
            ma_fast: self.ma_fast[i],
            ma_slow: self.ma_slow[i],
            rsi: self.rsi[i],
            macd: self.macd[i],
            macd_signal: self.macd_signal[i],
        };
        // A NaN close inside a window can leave the last value undefined
        // even with enough bars.
        let values = [
            snapshot.close,
            snapshot.ma_fast,
            snapshot.ma_slow,
            snapshot.rsi,
            snapshot.macd,
            snapshot.macd_signal,
        ];
        if values.iter().any(|v| v.is_nan()) {
            return Err(FrameError::InsufficientData {
                required: self.params.required_history(),
                available: self.defined_tail_len(),
            });
        }
        Ok(snapshot)
    }

    /// Row view of bar `index`.
    pub fn row(&self, index: usize) -> FrameRow {
        let bar = &self.series.bars()[index];
        let defined = |v: f64| if v.is_nan() { None } else { Some(v) };
        FrameRow {
            date: bar.date,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
            ma_fast: defined(self.ma_fast[index]),
            ma_slow: defined(self.ma_slow[index]),
            rsi: defined(self.rsi[index]),
            ema_fast: defined(self.ema_fast[index]),
            ema_slow: defined(self.ema_slow[index]),
            macd: defined(self.macd[index]),
            macd_signal: defined(self.macd_signal[index]),
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = FrameRow> + '_ {
        (0..self.len()).map(move |i| self.row(i))
    }

    /// The last `n` rows (or all of them if the frame is shorter).
    pub fn tail(&self, n: usize) -> Vec<FrameRow> {
        let start = self.len().saturating_sub(n);
        (start..self.len()).map(|i| self.row(i)).collect()
    }

    /// Number of trailing bars whose close is defined.
    fn defined_tail_len(&self) -> usize {
        self.series
            .bars()
            .iter()
            .rev()
            .take_while(|b| !b.close.is_nan())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    fn small_params() -> IndicatorParams {
        IndicatorParams {
            ma_fast: 3,
            ma_slow: 5,
            rsi: 2,
            macd_fast: 2,
            macd_slow: 4,
            macd_signal: 2,
        }
    }

    fn series(closes: &[f64]) -> PriceSeries {
        PriceSeries::new("TEST", make_bars(closes)).unwrap()
    }

    #[test]
    fn columns_align_with_bars() {
        let frame = IndicatorFrame::compute(
            &series(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
            &small_params(),
        )
        .unwrap();
        for col in [
            frame.ma_fast(),
            frame.ma_slow(),
            frame.rsi(),
            frame.ema_fast(),
            frame.ema_slow(),
            frame.macd(),
            frame.macd_signal(),
        ] {
            assert_eq!(col.len(), 6);
        }
        assert!(frame.ma_fast()[1].is_nan());
        assert_approx(frame.ma_fast()[2], 2.0, DEFAULT_EPSILON);
        assert!(frame.ma_slow()[3].is_nan());
        assert_approx(frame.ma_slow()[4], 3.0, DEFAULT_EPSILON);
    }

    #[test]
    fn default_params_need_200_bars() {
        assert_eq!(IndicatorParams::default().required_history(), 200);
    }

    #[test]
    fn short_series_fails_snapshot_with_insufficient_data() {
        let frame =
            IndicatorFrame::compute(&series(&[1.0, 2.0, 3.0]), &small_params()).unwrap();
        assert_eq!(
            frame.snapshot().unwrap_err(),
            FrameError::InsufficientData {
                required: 5,
                available: 3
            }
        );
    }

    #[test]
    fn snapshot_reads_last_bar() {
        let frame = IndicatorFrame::compute(
            &series(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
            &small_params(),
        )
        .unwrap();
        let snap = frame.snapshot().unwrap();
        assert_eq!(snap.close, 6.0);
        assert_approx(snap.ma_fast, 5.0, DEFAULT_EPSILON);
        assert_approx(snap.ma_slow, 4.0, DEFAULT_EPSILON);
        assert_eq!(snap.rsi, 100.0);
        assert_eq!(snap.date, frame.series().last_date());
    }

    #[test]
    fn invalid_params_rejected() {
        let mut params = small_params();
        params.ma_fast = 10;
        assert!(matches!(
            IndicatorFrame::compute(&series(&[1.0, 2.0]), &params),
            Err(FrameError::InvalidParams(_))
        ));

        let mut params = small_params();
        params.rsi = 0;
        assert!(matches!(params.validate(), Err(FrameError::InvalidParams(_))));
    }

    #[test]
    fn rows_map_nan_to_none() {
        let frame = IndicatorFrame::compute(
            &series(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
            &small_params(),
        )
        .unwrap();
        let first = frame.row(0);
        assert_eq!(first.ma_fast, None);
        assert_eq!(first.ema_fast, Some(1.0));
        let tail = frame.tail(2);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[1].close, 6.0);
        assert!(tail[1].ma_slow.is_some());
        assert_eq!(frame.rows().count(), 6);
    }

    #[test]
    fn column_names_follow_params() {
        let frame = IndicatorFrame::compute(
            &series(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
            &IndicatorParams::default(),
        )
        .unwrap();
        assert_eq!(frame.column_names()[0], "MA50");
        assert_eq!(frame.column_names()[1], "MA200");
        assert_eq!(frame.column_names()[2], "RSI14");
    }
}
