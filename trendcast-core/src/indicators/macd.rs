//! Moving Average Convergence Divergence (MACD).
//!
//! MACD = EMA(close, fast) - EMA(close, slow)
//! Signal = EMA(MACD, signal)
//!
//! Four series (separate Indicator instances, one per component):
//! fast EMA, slow EMA, MACD line, signal line. All EMAs are seeded with the
//! first value, so every component is defined from bar 0.
//! Lookback: 0.

use super::ema::ema;
use super::indicator::{closes, Indicator};
use crate::domain::Bar;

/// Which MACD series to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacdComponent {
    FastEma,
    SlowEma,
    Line,
    Signal,
}

/// All four MACD series computed in one pass.
#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    pub ema_fast: Vec<f64>,
    pub ema_slow: Vec<f64>,
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct Macd {
    fast: usize,
    slow: usize,
    signal: usize,
    component: MacdComponent,
    name: String,
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal: usize, component: MacdComponent) -> Self {
        assert!(fast >= 1 && slow >= 1 && signal >= 1, "MACD spans must be >= 1");
        let name = match component {
            MacdComponent::FastEma => format!("ema_fast_{fast}"),
            MacdComponent::SlowEma => format!("ema_slow_{slow}"),
            MacdComponent::Line => format!("macd_{fast}_{slow}"),
            MacdComponent::Signal => format!("macd_signal_{fast}_{slow}_{signal}"),
        };
        Self {
            fast,
            slow,
            signal,
            component,
            name,
        }
    }

    pub fn line(fast: usize, slow: usize, signal: usize) -> Self {
        Self::new(fast, slow, signal, MacdComponent::Line)
    }

    pub fn signal_line(fast: usize, slow: usize, signal: usize) -> Self {
        Self::new(fast, slow, signal, MacdComponent::Signal)
    }
}

impl Indicator for Macd {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let closes = closes(bars);
        match self.component {
            MacdComponent::FastEma => ema(&closes, self.fast),
            MacdComponent::SlowEma => ema(&closes, self.slow),
            MacdComponent::Line | MacdComponent::Signal => {
                let series = macd(&closes, self.fast, self.slow, self.signal);
                if self.component == MacdComponent::Line {
                    series.macd
                } else {
                    series.signal
                }
            }
        }
    }
}

/// Compute the fast/slow EMAs, MACD line and signal line over `values`.
pub fn macd(values: &[f64], fast: usize, slow: usize, signal: usize) -> MacdSeries {
    let ema_fast = ema(values, fast);
    let ema_slow = ema(values, slow);
    let macd: Vec<f64> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| f - s)
        .collect();
    let signal = ema(&macd, signal);
    MacdSeries {
        ema_fast,
        ema_slow,
        macd,
        signal,
    }
}
