//! The analysis pipeline: series in, `AnalysisReport` out.
//!
//! Stages run in a fixed order on the calling thread:
//! indicators → trend → forecast (forest, or Monte Carlo) → entry/stop.
//! Parallelism lives inside the forest fit and the simulation batches.
//! No I/O happens here; loading and export sit on either side.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use trendcast_core::data::DataSource;
use trendcast_core::domain::PriceSeries;
use trendcast_core::forecast::{
    ForecastError, ForecastMethod, ForecastResult, RegressionDiagnostics, RegressionForecaster,
};
use trendcast_core::indicators::{FrameError, FrameRow, IndicatorFrame, IndicatorSnapshot};
use trendcast_core::monte_carlo::{MonteCarloSimulator, MonteCarloSummary, SimulationError};
use trendcast_core::rng::RngHierarchy;
use trendcast_core::{CancelToken, EntryPlan, Trend, TrendStrategy};

use crate::config::{AnalysisConfig, ConfigError};

/// Bumped whenever the report layout changes incompatibly.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("indicators: {0}")]
    Frame(#[from] FrameError),

    #[error("regression forecast: {0}")]
    Forecast(ForecastError),

    #[error("monte carlo: {0}")]
    Simulation(SimulationError),

    #[error("analysis cancelled")]
    Cancelled,
}

impl From<ForecastError> for PipelineError {
    fn from(err: ForecastError) -> Self {
        match err {
            ForecastError::Cancelled => PipelineError::Cancelled,
            other => PipelineError::Forecast(other),
        }
    }
}

impl From<SimulationError> for PipelineError {
    fn from(err: SimulationError) -> Self {
        match err {
            SimulationError::Cancelled => PipelineError::Cancelled,
            other => PipelineError::Simulation(other),
        }
    }
}

/// Everything one analysis run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub schema_version: u32,
    pub symbol: String,
    pub run_id: String,
    /// Set by the caller once the data provenance is known.
    #[serde(default)]
    pub data_source: Option<DataSource>,
    /// BLAKE3 of the bars the run saw, set alongside `data_source`.
    #[serde(default)]
    pub dataset_hash: Option<String>,
    pub bars: usize,
    pub last_date: NaiveDate,
    pub current_price: f64,
    pub indicators: IndicatorSnapshot,
    pub trend: Trend,
    pub trend_label: String,
    pub trend_strategy: TrendStrategy,
    pub forecast: ForecastResult,
    /// Why the configured forecaster was replaced by Monte Carlo, if it was.
    pub fallback_reason: Option<String>,
    pub regression: Option<RegressionDiagnostics>,
    pub monte_carlo: Option<MonteCarloSummary>,
    pub entry: Option<EntryPlan>,
    pub price_difference: f64,
    pub profit_loss_pct: f64,
    pub target_date: NaiveDate,
    pub frame_tail: Vec<FrameRow>,
}

impl AnalysisReport {
    pub fn with_provenance(mut self, source: DataSource, dataset_hash: impl Into<String>) -> Self {
        self.data_source = Some(source);
        self.dataset_hash = Some(dataset_hash.into());
        self
    }

    pub fn is_synthetic(&self) -> bool {
        self.data_source == Some(DataSource::Synthetic)
    }
}

/// Run the full analysis on `series`.
pub fn run_analysis(
    series: &PriceSeries,
    config: &AnalysisConfig,
    cancel: &CancelToken,
) -> Result<AnalysisReport, PipelineError> {
    run_analysis_with_frame(series, config, cancel).map(|(report, _)| report)
}

/// Like `run_analysis`, also handing back the indicator frame it computed
/// so exporters do not rebuild it.
pub fn run_analysis_with_frame(
    series: &PriceSeries,
    config: &AnalysisConfig,
    cancel: &CancelToken,
) -> Result<(AnalysisReport, IndicatorFrame), PipelineError> {
    config.validate()?;
    let run_id = config.run_id();
    let rng = config.rng();

    let frame = IndicatorFrame::compute(series, &config.indicators)?;
    let snapshot = frame.snapshot()?;
    info!(
        symbol = series.symbol(),
        bars = frame.len(),
        last_date = %snapshot.date,
        close = snapshot.close,
        "indicators computed"
    );

    let trend = config.trend_strategy.classify(&snapshot);
    info!(trend = %trend, strategy = ?config.trend_strategy, "trend classified");

    let (forecast, regression, monte_carlo, fallback_reason) =
        run_forecast(&frame, config, &rng, cancel)?;
    info!(
        method = %forecast.method(),
        predicted_price = forecast.predicted_price(),
        horizon = forecast.horizon(),
        "forecast complete"
    );

    let entry = config.entry.evaluate(trend, &snapshot);
    match &entry {
        Some(plan) => info!(
            entry = plan.entry_price,
            stop = plan.stop_loss,
            "entry signal"
        ),
        None => info!("no entry signal"),
    }

    let current_price = snapshot.close;
    let price_difference = forecast.predicted_price() - current_price;
    let profit_loss_pct = price_difference / current_price * 100.0;
    let target_date = snapshot.date + chrono::Duration::days(config.horizon_days as i64);

    let report = AnalysisReport {
        schema_version: SCHEMA_VERSION,
        symbol: series.symbol().to_string(),
        run_id,
        data_source: None,
        dataset_hash: None,
        bars: frame.len(),
        last_date: snapshot.date,
        current_price,
        indicators: snapshot,
        trend,
        trend_label: trend.label().to_string(),
        trend_strategy: config.trend_strategy,
        forecast,
        fallback_reason,
        regression,
        monte_carlo,
        entry,
        price_difference,
        profit_loss_pct,
        target_date,
        frame_tail: frame.tail(config.tail_rows),
    };
    Ok((report, frame))
}

type ForecastOutcome = (
    ForecastResult,
    Option<RegressionDiagnostics>,
    Option<MonteCarloSummary>,
    Option<String>,
);

fn run_forecast(
    frame: &IndicatorFrame,
    config: &AnalysisConfig,
    rng: &RngHierarchy,
    cancel: &CancelToken,
) -> Result<ForecastOutcome, PipelineError> {
    let mut fallback_reason = None;

    if config.forecast_method == ForecastMethod::RandomForest {
        let forecaster = RegressionForecaster::new(config.regression_config());
        match forecaster.forecast(frame, rng, cancel) {
            Ok(out) => return Ok((out.result, Some(out.diagnostics), None, None)),
            Err(ForecastError::TrainingDataInsufficient(reason)) => {
                warn!(%reason, "regression forecaster unusable, falling back to monte carlo");
                fallback_reason = Some(reason);
            }
            Err(e) => return Err(e.into()),
        }
    }

    let simulator = MonteCarloSimulator::new(config.monte_carlo_config());
    let (result, summary) = simulator.forecast(&frame.closes(), rng, cancel)?;
    Ok((result, None, Some(summary), fallback_reason))
}
