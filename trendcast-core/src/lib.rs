//! TrendCast Core: price series, indicators, trend classification and forecasting.
//!
//! This crate holds the pure analysis pipeline:
//! - Domain types (bars, validated price series)
//! - Indicator Engine (moving averages, RSI, MACD) and the indicator frame
//! - Trend Classifier over the last bar's MA regime
//! - Regression Forecaster (bagged regression trees on indicator features)
//! - Monte Carlo Simulator (geometric random walk on historical returns)
//! - Entry/Stop Decision
//!
//! Randomness comes from an explicit `RngHierarchy`; parallel work is split
//! into per-task streams so results do not depend on the thread count.
//! Market data access (`data`) sits at the edge and is never called by the
//! analysis modules.

pub mod cancel;
pub mod data;
pub mod domain;
pub mod entry;
pub mod forecast;
pub mod indicators;
pub mod monte_carlo;
pub mod rng;
pub mod trend;

pub use cancel::CancelToken;
pub use entry::{EntryPlan, EntryRule};
pub use trend::{Trend, TrendStrategy};
