//! Property tests for indicator and forecasting invariants.
//!
//! Uses proptest to verify:
//! 1. Moving average warm-up and trailing mean
//! 2. RSI bounds, and RSI = 100 on a window without losses
//! 3. MACD signal is the EMA of MACD; constant input gives zero MACD
//! 4. Chronological split keeps the test partition after training
//! 5. Monte Carlo determinism and shape
//! 6. Entry/stop ordering

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use trendcast_core::domain::{Bar, PriceSeries};
use trendcast_core::forecast::Dataset;
use trendcast_core::indicators::{ema, macd, moving_average, rsi, IndicatorFrame, IndicatorParams, IndicatorSnapshot};
use trendcast_core::monte_carlo::{MonteCarloConfig, MonteCarloSimulator};
use trendcast_core::{EntryRule, Trend};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_prices(min_len: usize, max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(1.0..500.0_f64, min_len..max_len)
}

fn arb_non_decreasing(min_len: usize, max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    (1.0..100.0_f64, prop::collection::vec(0.0..5.0_f64, min_len..max_len)).prop_map(
        |(start, steps)| {
            let mut price = start;
            steps
                .into_iter()
                .map(|s| {
                    price += s;
                    price
                })
                .collect()
        },
    )
}

fn series(closes: &[f64]) -> PriceSeries {
    let base = chrono::NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let bars = closes
        .iter()
        .enumerate()
        .map(|(i, &c)| Bar {
            date: base + chrono::Duration::days(i as i64),
            open: c,
            high: c,
            low: c,
            close: c,
            volume: 1,
        })
        .collect();
    PriceSeries::new("PROP", bars).unwrap()
}

// ── 1. Moving average ────────────────────────────────────────────────

proptest! {
    #[test]
    fn moving_average_warmup_then_trailing_mean(
        values in arb_prices(1, 80),
        window in 1usize..20,
    ) {
        let ma = moving_average(&values, window);
        prop_assert_eq!(ma.len(), values.len());
        for (i, v) in ma.iter().enumerate() {
            if i + 1 < window {
                prop_assert!(v.is_nan());
            } else {
                let expected: f64 =
                    values[i + 1 - window..=i].iter().sum::<f64>() / window as f64;
                prop_assert!((v - expected).abs() < 1e-8 * expected.abs().max(1.0));
            }
        }
    }
}

// ── 2. RSI ───────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn rsi_is_bounded(values in arb_prices(2, 120), window in 1usize..20) {
        for v in rsi(&values, window) {
            prop_assert!(v.is_nan() || (0.0..=100.0).contains(&v));
        }
    }

    #[test]
    fn rsi_is_100_without_losses(values in arb_non_decreasing(15, 100)) {
        let out = rsi(&values, 14);
        for v in &out[14..] {
            prop_assert_eq!(*v, 100.0);
        }
    }

    #[test]
    fn rsi_is_100_once_losses_leave_the_window(
        falling in arb_prices(2, 40),
        rising in arb_non_decreasing(15, 40),
    ) {
        let mut values = falling;
        values.extend(rising);
        let out = rsi(&values, 14);
        for v in &out[14..] {
            prop_assert!((0.0..=100.0).contains(v), "RSI out of bounds: {}", v);
        }
        // The final 14 deltas all come from the non-decreasing tail.
        prop_assert_eq!(out[values.len() - 1], 100.0);
    }
}

// ── 3. MACD ──────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn macd_signal_is_ema_of_macd(values in arb_prices(2, 120)) {
        let m = macd(&values, 12, 26, 9);
        prop_assert_eq!(m.signal, ema(&m.macd, 9));
    }

    #[test]
    fn constant_series_has_zero_macd(price in 1.0..500.0_f64, len in 1usize..100) {
        let m = macd(&vec![price; len], 12, 26, 9);
        prop_assert!(m.macd.iter().all(|v| *v == 0.0));
        prop_assert!(m.signal.iter().all(|v| *v == 0.0));
    }
}

// ── 4. Chronological split ───────────────────────────────────────────

proptest! {
    #[test]
    fn split_keeps_test_after_train(
        values in arb_prices(30, 120),
        ratio in 0.05..0.6_f64,
    ) {
        let params = IndicatorParams {
            ma_fast: 3,
            ma_slow: 8,
            rsi: 4,
            macd_fast: 3,
            macd_slow: 6,
            macd_signal: 3,
        };
        let frame = IndicatorFrame::compute(&series(&values), &params).unwrap();
        let dataset = Dataset::from_frame(&frame);
        // At least 30 bars minus an 8-bar warm-up and the unlabeled last row.
        prop_assert!(dataset.n_samples() >= 21);
        let split = dataset.chronological_split(ratio);
        prop_assert!(split.is_ok(), "split failed: {:?}", split.as_ref().err());
        let split = split.unwrap();
        prop_assert_eq!(split.train.n_samples() + split.test.n_samples(), dataset.n_samples());
        prop_assert!(split.test.n_samples() >= 1);
        let last_train = *split.train.dates.last().unwrap();
        prop_assert!(split.test.dates.iter().all(|d| *d > last_train));
    }
}

// ── 5. Monte Carlo ───────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn monte_carlo_shape_and_determinism(
        values in arb_prices(3, 60),
        simulations in 1usize..40,
        days in 1usize..40,
        seed in any::<u64>(),
    ) {
        let sim = MonteCarloSimulator::new(MonteCarloConfig {
            simulations,
            days,
            ..Default::default()
        });
        let a = sim.simulate(&values, &mut StdRng::seed_from_u64(seed)).unwrap();
        let b = sim.simulate(&values, &mut StdRng::seed_from_u64(seed)).unwrap();
        prop_assert_eq!(a.simulations(), simulations);
        prop_assert_eq!(a.terminal_values().len(), simulations);
        prop_assert_eq!(a.column(simulations - 1).len(), days);
        prop_assert_eq!(a.mean_path().len(), days);
        prop_assert_eq!(a, b);
    }
}

// ── 6. Entry/stop ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn stop_is_below_entry(
        close in 1.0..1000.0_f64,
        rsi_value in 0.0..69.9_f64,
        pct in 0.1..50.0_f64,
    ) {
        let rule = EntryRule { stoploss_percent: pct, ..Default::default() };
        let snap = IndicatorSnapshot {
            date: chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            close,
            ma_fast: close * 0.9,
            ma_slow: close * 0.8,
            rsi: rsi_value,
            macd: 1.0,
            macd_signal: 0.5,
        };
        let plan = rule.evaluate(Trend::Uptrend, &snap).unwrap();
        prop_assert_eq!(plan.entry_price, close);
        prop_assert!(plan.stop_loss < plan.entry_price);
        prop_assert!(plan.stop_loss > 0.0);
    }
}
