//! Relative Strength Index (RSI).
//!
//! Simple (rolling-mean) averaging of gains and losses over `window` deltas.
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//! Lookback: window (the delta at bar 0 is undefined).
//! Edge case: avg_loss == 0 → RSI = 100, including a flat window.

use super::indicator::{closes, Indicator};
use super::sma::moving_average;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Rsi {
    window: usize,
    name: String,
}

impl Rsi {
    pub fn new(window: usize) -> Self {
        assert!(window >= 1, "RSI window must be >= 1");
        Self {
            window,
            name: format!("rsi_{window}"),
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.window
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        rsi(&closes(bars), self.window)
    }
}

/// RSI over close prices with trailing-mean averaging.
pub fn rsi(values: &[f64], window: usize) -> Vec<f64> {
    assert!(window >= 1, "RSI window must be >= 1");
    let n = values.len();

    // gains/losses are NaN at index 0 so the first full window ends at `window`.
    let mut gains = vec![f64::NAN; n];
    let mut losses = vec![f64::NAN; n];
    for i in 1..n {
        let delta = values[i] - values[i - 1];
        if delta.is_nan() {
            continue;
        }
        gains[i] = delta.max(0.0);
        losses[i] = (-delta).max(0.0);
    }

    let avg_gain = moving_average(&gains, window);
    let avg_loss = moving_average(&losses, window);

    avg_gain
        .iter()
        .zip(&avg_loss)
        .map(|(&g, &l)| rsi_from_averages(g, l))
        .collect()
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_gain.is_nan() || avg_loss.is_nan() {
        f64::NAN
    } else if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}
