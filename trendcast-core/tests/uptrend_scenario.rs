//! End-to-end scenario: a 300-bar linear uptrend through every core stage.

use trendcast_core::domain::{Bar, PriceSeries};
use trendcast_core::forecast::{ForecastError, ForecastMethod, RegressionForecaster};
use trendcast_core::indicators::{IndicatorFrame, IndicatorParams};
use trendcast_core::monte_carlo::{MonteCarloConfig, MonteCarloSimulator};
use trendcast_core::rng::RngHierarchy;
use trendcast_core::{trend, CancelToken, EntryRule, Trend, TrendStrategy};

fn linear_uptrend(n: usize) -> PriceSeries {
    let base = chrono::NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    let bars = (0..n)
        .map(|t| {
            let close = 100.0 + 0.1 * t as f64;
            Bar {
                date: base + chrono::Duration::days(t as i64),
                open: close - 0.05,
                high: close + 0.2,
                low: close - 0.2,
                close,
                volume: 1_000_000,
            }
        })
        .collect();
    PriceSeries::new("UP", bars).unwrap()
}

#[test]
fn linear_uptrend_is_classified_up() {
    let frame = IndicatorFrame::compute(&linear_uptrend(300), &IndicatorParams::default()).unwrap();
    let snap = frame.snapshot().unwrap();

    assert!(snap.ma_fast < snap.close);
    assert!(snap.ma_fast > snap.ma_slow);
    assert_eq!(snap.rsi, 100.0);
    assert_eq!(trend::classify(&frame, TrendStrategy::PriceConfirmed), Ok(Trend::Uptrend));
    assert_eq!(trend::classify(&frame, TrendStrategy::Crossover), Ok(Trend::Uptrend));
}

#[test]
fn overbought_uptrend_has_no_entry() {
    let frame = IndicatorFrame::compute(&linear_uptrend(300), &IndicatorParams::default()).unwrap();
    let snap = frame.snapshot().unwrap();
    assert_eq!(EntryRule::default().evaluate(Trend::Uptrend, &snap), None);
}

#[test]
fn regression_rejects_constant_rsi() {
    let frame = IndicatorFrame::compute(&linear_uptrend(300), &IndicatorParams::default()).unwrap();
    let err = RegressionForecaster::default()
        .forecast(&frame, &RngHierarchy::default(), &CancelToken::new())
        .unwrap_err();
    assert!(matches!(err, ForecastError::TrainingDataInsufficient(_)));
}

#[test]
fn monte_carlo_path_is_non_decreasing() {
    let series = linear_uptrend(300);
    let (forecast, summary) = MonteCarloSimulator::new(MonteCarloConfig::default())
        .forecast(&series.closes(), &RngHierarchy::default(), &CancelToken::new())
        .unwrap();

    assert_eq!(forecast.method(), ForecastMethod::MonteCarlo);
    assert_eq!(forecast.horizon(), 30);
    assert!(forecast.path().windows(2).all(|w| w[1] >= w[0]));
    assert!(forecast.path()[0] >= series.last().close);
    assert!(summary.mu > 0.0);
    assert!(forecast.predicted_price() > series.last().close);
}
