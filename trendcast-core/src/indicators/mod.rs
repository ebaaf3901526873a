//! Indicator Engine.
//!
//! Each indicator is available both as a pure function over `&[f64]` and as
//! a type implementing `Indicator`. `IndicatorFrame` computes the full set
//! (two moving averages, RSI, MACD) once per series.

pub mod ema;
pub mod frame;
pub mod indicator;
pub mod macd;
pub mod rsi;
pub mod sma;

pub use ema::{ema, Ema};
pub use frame::{FrameError, FrameRow, IndicatorFrame, IndicatorParams, IndicatorSnapshot};
pub use indicator::Indicator;
pub use macd::{macd, Macd, MacdComponent, MacdSeries};
pub use rsi::{rsi, Rsi};
pub use sma::{moving_average, Sma};

/// Create synthetic bars from close prices for testing.
///
/// Generates plausible OHLV: open = prev_close (or close for first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<crate::domain::Bar> {
    use crate::domain::Bar;
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            let high = open.max(close) + 1.0;
            let low = open.min(close) - 1.0;
            Bar {
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high,
                low,
                close,
                volume: 1000,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
