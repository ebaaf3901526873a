//! Simple Moving Average (SMA).
//!
//! Rolling mean of close prices over a lookback window.
//! Lookback: window - 1 (first valid value at index window-1).

use super::indicator::{closes, Indicator};
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Sma {
    window: usize,
    name: String,
}

impl Sma {
    pub fn new(window: usize) -> Self {
        assert!(window >= 1, "SMA window must be >= 1");
        Self {
            window,
            name: format!("sma_{window}"),
        }
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.window.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        moving_average(&closes(bars), self.window)
    }
}

/// Trailing arithmetic mean over `window` values.
///
/// The first `window - 1` outputs are NaN, as is any output whose window
/// contains a NaN. Each window is summed afresh (compensated), so a window
/// of zeros averages to exactly 0 and a flat window to its value.
pub fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    assert!(window >= 1, "moving average window must be >= 1");
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if n < window {
        return result;
    }

    for (i, w) in values.windows(window).enumerate() {
        if w.iter().any(|v| v.is_nan()) {
            continue;
        }
        result[i + window - 1] = compensated_sum(w) / window as f64;
    }

    result
}

/// Neumaier summation.
fn compensated_sum(values: &[f64]) -> f64 {
    let mut sum = 0.0_f64;
    let mut carry = 0.0_f64;
    for &v in values {
        let t = sum + v;
        if sum.abs() >= v.abs() {
            carry += (sum - t) + v;
        } else {
            carry += (v - t) + sum;
        }
        sum = t;
    }
    sum + carry
}
