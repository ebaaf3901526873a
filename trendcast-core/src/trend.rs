//! Trend classification from the moving-average regime on the last bar.
//!
//! Two rules exist and both are kept, selected by `TrendStrategy`:
//! - `Crossover`: fast MA above/below slow MA.
//! - `PriceConfirmed`: the crossover must also be confirmed by the close
//!   sitting on the same side of the fast MA.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::indicators::{FrameError, IndicatorFrame, IndicatorSnapshot};

/// Three-way trend label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Trend {
    Uptrend,
    Downtrend,
    Sideways,
}

impl Trend {
    /// Report label with the outlook attached to each regime.
    pub fn label(&self) -> &'static str {
        match self {
            Trend::Uptrend => "UPTREND (bullish for next 1-3 months)",
            Trend::Downtrend => "DOWNTREND (bearish for next 1-3 months)",
            Trend::Sideways => "SIDEWAYS (uncertain)",
        }
    }

    pub fn is_bullish(&self) -> bool {
        matches!(self, Trend::Uptrend)
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Trend::Uptrend => "UPTREND",
            Trend::Downtrend => "DOWNTREND",
            Trend::Sideways => "SIDEWAYS",
        };
        f.write_str(name)
    }
}

/// Which classification rule to apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendStrategy {
    /// Plain fast/slow MA crossover.
    Crossover,
    /// Crossover confirmed by the close relative to the fast MA.
    #[default]
    PriceConfirmed,
}

impl TrendStrategy {
    /// Classify a last-bar snapshot. Values are assumed defined.
    ///
    /// Values within `RELATIVE_TOLERANCE` of each other count as equal, so
    /// a flat series is `Sideways` whatever its price.
    pub fn classify(&self, snap: &IndicatorSnapshot) -> Trend {
        let regime = compare(snap.ma_fast, snap.ma_slow);
        let price = match self {
            TrendStrategy::Crossover => None,
            TrendStrategy::PriceConfirmed => Some(compare(snap.close, snap.ma_fast)),
        };

        match (regime, price) {
            (Ordering::Greater, None | Some(Ordering::Greater)) => Trend::Uptrend,
            (Ordering::Less, None | Some(Ordering::Less)) => Trend::Downtrend,
            _ => Trend::Sideways,
        }
    }
}

/// Relative gap below which two indicator values are treated as equal.
pub const RELATIVE_TOLERANCE: f64 = 1e-9;

fn compare(a: f64, b: f64) -> Ordering {
    if a.is_nan() || b.is_nan() {
        return Ordering::Equal;
    }
    let scale = a.abs().max(b.abs());
    if (a - b).abs() <= RELATIVE_TOLERANCE * scale {
        Ordering::Equal
    } else if a > b {
        Ordering::Greater
    } else {
        Ordering::Less
    }
}

/// Classify the most recent bar of `frame`.
///
/// Fails with `InsufficientData` when the moving averages are not yet defined.
pub fn classify(frame: &IndicatorFrame, strategy: TrendStrategy) -> Result<Trend, FrameError> {
    let snapshot = frame.snapshot()?;
    Ok(strategy.classify(&snapshot))
}
