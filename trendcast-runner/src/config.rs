//! Analysis configuration, loaded from TOML.
//!
//! Every field has a serde default, so an empty file (or no file) is a valid
//! configuration. `validate()` runs before any data is touched.

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use trendcast_core::forecast::{ForecastMethod, ForestConfig, RegressionConfig};
use trendcast_core::indicators::{FrameError, IndicatorParams};
use trendcast_core::monte_carlo::MonteCarloConfig;
use trendcast_core::rng::{RngHierarchy, DEFAULT_SEED};
use trendcast_core::{EntryRule, TrendStrategy};

/// Content hash of a configuration (BLAKE3 hex).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid lookback period '{0}' (expected e.g. \"5y\", \"6mo\", \"90d\", \"2w\")")]
    InvalidPeriod(String),

    #[error("invalid indicator settings: {0}")]
    Indicators(#[from] FrameError),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    pub symbol: String,
    /// History to load, e.g. "5y".
    pub period: String,
    pub horizon_days: usize,
    pub indicators: IndicatorParams,
    pub trend_strategy: TrendStrategy,
    pub entry: EntryRule,
    pub forecast_method: ForecastMethod,
    pub forest: ForestConfig,
    pub test_ratio: f64,
    pub simulations: usize,
    pub seed: Option<u64>,
    /// Frame rows carried into the report.
    pub tail_rows: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            symbol: "SPY".to_string(),
            period: "5y".to_string(),
            horizon_days: 30,
            indicators: IndicatorParams::default(),
            trend_strategy: TrendStrategy::default(),
            entry: EntryRule::default(),
            forecast_method: ForecastMethod::default(),
            forest: ForestConfig::default(),
            test_ratio: 0.2,
            simulations: 1000,
            seed: None,
            tail_rows: 30,
        }
    }
}

impl AnalysisConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbol.trim().is_empty() {
            return Err(ConfigError::Invalid("symbol must not be empty".into()));
        }
        self.lookback()?;
        self.indicators.validate()?;
        if self.horizon_days == 0 {
            return Err(ConfigError::Invalid("horizon_days must be >= 1".into()));
        }
        if !(self.test_ratio > 0.0 && self.test_ratio < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "test_ratio must be in (0, 1), got {}",
                self.test_ratio
            )));
        }
        if self.simulations == 0 {
            return Err(ConfigError::Invalid("simulations must be >= 1".into()));
        }
        if self.forest.n_trees == 0 {
            return Err(ConfigError::Invalid("forest.n_trees must be >= 1".into()));
        }
        if self.forest.min_samples_split < 2 || self.forest.min_samples_leaf == 0 {
            return Err(ConfigError::Invalid(
                "forest needs min_samples_split >= 2 and min_samples_leaf >= 1".into(),
            ));
        }
        if !(self.entry.stoploss_percent > 0.0 && self.entry.stoploss_percent < 100.0) {
            return Err(ConfigError::Invalid(format!(
                "entry.stoploss_percent must be in (0, 100), got {}",
                self.entry.stoploss_percent
            )));
        }
        if !(0.0..=100.0).contains(&self.entry.rsi_overbought) {
            return Err(ConfigError::Invalid(format!(
                "entry.rsi_overbought must be in [0, 100], got {}",
                self.entry.rsi_overbought
            )));
        }
        Ok(())
    }

    pub fn lookback(&self) -> Result<Lookback, ConfigError> {
        Lookback::parse(&self.period)
    }

    /// Deterministic hash of the full configuration.
    pub fn run_id(&self) -> RunId {
        let json = serde_json::to_string(self).expect("AnalysisConfig serialization failed");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    pub fn rng(&self) -> RngHierarchy {
        RngHierarchy::new(self.seed.unwrap_or(DEFAULT_SEED))
    }

    pub fn regression_config(&self) -> RegressionConfig {
        RegressionConfig {
            forest: self.forest,
            test_ratio: self.test_ratio,
            days_ahead: self.horizon_days,
        }
    }

    pub fn monte_carlo_config(&self) -> MonteCarloConfig {
        MonteCarloConfig {
            simulations: self.simulations,
            days: self.horizon_days,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodUnit {
    Days,
    Weeks,
    Months,
    Years,
}

/// A lookback window such as "5y" or "6mo".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lookback {
    pub amount: u32,
    pub unit: PeriodUnit,
}

impl Lookback {
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let s = s.trim().to_ascii_lowercase();
        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| ConfigError::InvalidPeriod(s.clone()))?;
        let (digits, suffix) = s.split_at(split);
        let amount: u32 = digits
            .parse()
            .map_err(|_| ConfigError::InvalidPeriod(s.clone()))?;
        let unit = match suffix {
            "d" => PeriodUnit::Days,
            "w" | "wk" => PeriodUnit::Weeks,
            "mo" => PeriodUnit::Months,
            "y" => PeriodUnit::Years,
            _ => return Err(ConfigError::InvalidPeriod(s.clone())),
        };
        if amount == 0 {
            return Err(ConfigError::InvalidPeriod(s));
        }
        Ok(Self { amount, unit })
    }

    /// First calendar day of the window ending at `end`.
    pub fn start_date(&self, end: NaiveDate) -> NaiveDate {
        let n = self.amount;
        let start = match self.unit {
            PeriodUnit::Days => end.checked_sub_days(chrono::Days::new(n.into())),
            PeriodUnit::Weeks => end.checked_sub_days(chrono::Days::new(u64::from(n) * 7)),
            PeriodUnit::Months => end.checked_sub_months(Months::new(n)),
            PeriodUnit::Years => end.checked_sub_months(Months::new(n.saturating_mul(12))),
        };
        start.unwrap_or(NaiveDate::MIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_is_default() {
        let config = AnalysisConfig::from_toml_str("").unwrap();
        assert_eq!(config, AnalysisConfig::default());
        config.validate().unwrap();
    }

    #[test]
    fn partial_toml_overrides_fields() {
        let config = AnalysisConfig::from_toml_str(
            r#"
            symbol = "TATAMOTORS.NS"
            period = "2y"
            forecast_method = "monte_carlo"
            trend_strategy = "crossover"
            seed = 7

            [indicators]
            ma_fast = 20

            [entry]
            stoploss_percent = 8.0

            [forest]
            n_trees = 50
            max_depth = 12
            "#,
        )
        .unwrap();
        assert_eq!(config.symbol, "TATAMOTORS.NS");
        assert_eq!(config.forecast_method, ForecastMethod::MonteCarlo);
        assert_eq!(config.trend_strategy, TrendStrategy::Crossover);
        assert_eq!(config.indicators.ma_fast, 20);
        assert_eq!(config.indicators.ma_slow, 200);
        assert_eq!(config.entry.stoploss_percent, 8.0);
        assert_eq!(config.entry.rsi_overbought, 70.0);
        assert_eq!(config.forest.max_depth, Some(12));
        assert_eq!(config.rng().master_seed(), 7);
    }

    #[test]
    fn unknown_field_is_rejected() {
        assert!(matches!(
            AnalysisConfig::from_toml_str("simulation = 5"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn run_id_is_deterministic_and_sensitive() {
        let a = AnalysisConfig::default();
        let mut b = AnalysisConfig::default();
        assert_eq!(a.run_id(), b.run_id());
        b.horizon_days = 31;
        assert_ne!(a.run_id(), b.run_id());
    }

    #[test]
    fn validation_catches_bad_values() {
        let mut c = AnalysisConfig {
            test_ratio: 1.0,
            ..Default::default()
        };
        assert!(c.validate().is_err());

        c = AnalysisConfig {
            simulations: 0,
            ..Default::default()
        };
        assert!(c.validate().is_err());

        c = AnalysisConfig::default();
        c.indicators.ma_fast = 300;
        assert!(matches!(c.validate(), Err(ConfigError::Indicators(_))));

        c = AnalysisConfig {
            period: "5x".into(),
            ..Default::default()
        };
        assert!(matches!(c.validate(), Err(ConfigError::InvalidPeriod(_))));
    }

    #[test]
    fn lookback_parsing() {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
        let end = d(2024, 3, 31);
        assert_eq!(Lookback::parse("5y").unwrap().start_date(end), d(2019, 3, 31));
        assert_eq!(Lookback::parse("1mo").unwrap().start_date(end), d(2024, 2, 29));
        assert_eq!(Lookback::parse("90d").unwrap().start_date(end), d(2024, 1, 1));
        assert_eq!(Lookback::parse("2w").unwrap().start_date(end), d(2024, 3, 17));
        assert!(Lookback::parse("y").is_err());
        assert!(Lookback::parse("0d").is_err());
        assert!(Lookback::parse("12").is_err());
    }
}
