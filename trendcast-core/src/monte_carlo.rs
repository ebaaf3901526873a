//! Monte Carlo price-path simulator.
//!
//! Paths follow a geometric random walk driven by the mean and sample
//! standard deviation of historical daily returns:
//! `price_{d+1} = price_d * (1 + N(mu, sigma))`, starting from the last close.
//!
//! Randomness is always injected. `simulate` draws every path from one
//! caller-supplied generator; `simulate_parallel` splits the simulations into
//! fixed-size batches, gives batch `b` the stream `rng_for("mc_batch", b)`,
//! and concatenates the batches in order, so the matrix for a given seed is
//! bit-identical whatever the rayon thread count.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::cancel::CancelToken;
use crate::forecast::{ForecastMethod, ForecastResult};
use crate::rng::RngHierarchy;

const BATCH_STREAM: &str = "mc_batch";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("invalid simulation config: {0}")]
    InvalidConfig(String),

    #[error("insufficient data: {available} usable returns < {required} required")]
    InsufficientData { required: usize, available: usize },

    #[error("simulation cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonteCarloConfig {
    pub simulations: usize,
    pub days: usize,
    /// Paths per parallel batch. Changing it changes the drawn paths.
    pub batch_size: usize,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            simulations: 1000,
            days: 30,
            batch_size: 250,
        }
    }
}

impl MonteCarloConfig {
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.simulations == 0 {
            return Err(SimulationError::InvalidConfig(
                "simulations must be >= 1".into(),
            ));
        }
        if self.days == 0 {
            return Err(SimulationError::InvalidConfig("days must be >= 1".into()));
        }
        if self.batch_size == 0 {
            return Err(SimulationError::InvalidConfig(
                "batch_size must be >= 1".into(),
            ));
        }
        Ok(())
    }
}

/// Mean and sample standard deviation of daily simple returns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReturnStats {
    pub mu: f64,
    pub sigma: f64,
    pub n_returns: usize,
}

impl ReturnStats {
    /// Returns are `close_t / close_{t-1} - 1`; the undefined first return
    /// and any non-finite value are dropped.
    pub fn from_closes(closes: &[f64]) -> Result<Self, SimulationError> {
        let returns: Vec<f64> = closes
            .windows(2)
            .map(|w| w[1] / w[0] - 1.0)
            .filter(|r| r.is_finite())
            .collect();
        let n = returns.len();
        if n < 2 {
            return Err(SimulationError::InsufficientData {
                required: 2,
                available: n,
            });
        }
        let mu = returns.iter().sum::<f64>() / n as f64;
        let var = returns.iter().map(|r| (r - mu).powi(2)).sum::<f64>() / (n - 1) as f64;
        Ok(Self {
            mu,
            sigma: var.sqrt(),
            n_returns: n,
        })
    }
}

/// `days x simulations` price matrix, stored column-major.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationMatrix {
    days: usize,
    simulations: usize,
    data: Vec<f64>,
}

impl SimulationMatrix {
    pub fn days(&self) -> usize {
        self.days
    }

    pub fn simulations(&self) -> usize {
        self.simulations
    }

    /// Path `j`; entry `d` is the price after `d + 1` steps.
    pub fn column(&self, j: usize) -> &[f64] {
        &self.data[j * self.days..(j + 1) * self.days]
    }

    /// All simulated prices on day `day`.
    pub fn row(&self, day: usize) -> Vec<f64> {
        (0..self.simulations)
            .map(|j| self.data[j * self.days + day])
            .collect()
    }

    pub fn terminal_values(&self) -> Vec<f64> {
        self.row(self.days - 1)
    }

    /// Per-day mean across paths.
    pub fn mean_path(&self) -> Vec<f64> {
        let mut sums = vec![0.0; self.days];
        for j in 0..self.simulations {
            for (sum, price) in sums.iter_mut().zip(self.column(j)) {
                *sum += price;
            }
        }
        sums.iter().map(|s| s / self.simulations as f64).collect()
    }

    /// Mean terminal price.
    pub fn expected_price(&self) -> f64 {
        let terminal = self.terminal_values();
        terminal.iter().sum::<f64>() / terminal.len() as f64
    }
}

/// Headline statistics of a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloSummary {
    pub mu: f64,
    pub sigma: f64,
    pub simulations: usize,
    pub days: usize,
    pub expected_price: f64,
    pub p5: f64,
    pub p50: f64,
    pub p95: f64,
}

#[derive(Debug, Clone, Default)]
pub struct MonteCarloSimulator {
    config: MonteCarloConfig,
}

impl MonteCarloSimulator {
    pub fn new(config: MonteCarloConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MonteCarloConfig {
        &self.config
    }

    /// Simulate every path from a single generator.
    pub fn simulate<R: Rng + ?Sized>(
        &self,
        closes: &[f64],
        rng: &mut R,
    ) -> Result<SimulationMatrix, SimulationError> {
        let (start, stats) = self.prepare(closes)?;
        let dist = normal(&stats)?;
        let data = fill_paths(start, &dist, self.config.days, self.config.simulations, rng);
        Ok(SimulationMatrix {
            days: self.config.days,
            simulations: self.config.simulations,
            data,
        })
    }

    /// Simulate in parallel batches, checking `cancel` before each batch.
    pub fn simulate_parallel(
        &self,
        closes: &[f64],
        hierarchy: &RngHierarchy,
        cancel: &CancelToken,
    ) -> Result<SimulationMatrix, SimulationError> {
        let (start, stats) = self.prepare(closes)?;
        let dist = normal(&stats)?;
        let MonteCarloConfig {
            simulations,
            days,
            batch_size,
        } = self.config;
        let n_batches = simulations.div_ceil(batch_size);

        let batches = (0..n_batches)
            .into_par_iter()
            .map(|b| {
                if cancel.is_cancelled() {
                    return Err(SimulationError::Cancelled);
                }
                let paths = batch_size.min(simulations - b * batch_size);
                let mut rng = hierarchy.rng_for(BATCH_STREAM, b as u64);
                Ok(fill_paths(start, &dist, days, paths, &mut rng))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SimulationMatrix {
            days,
            simulations,
            data: batches.concat(),
        })
    }

    /// Run in parallel and reduce to a forecast plus summary.
    ///
    /// The forecast path is the per-day mean path; its predicted price is the
    /// mean terminal value.
    pub fn forecast(
        &self,
        closes: &[f64],
        hierarchy: &RngHierarchy,
        cancel: &CancelToken,
    ) -> Result<(ForecastResult, MonteCarloSummary), SimulationError> {
        let stats = ReturnStats::from_closes(closes)?;
        let matrix = self.simulate_parallel(closes, hierarchy, cancel)?;

        let mut terminal = matrix.terminal_values();
        terminal.sort_by(|a, b| a.total_cmp(b));
        let expected_price = matrix.expected_price();
        let summary = MonteCarloSummary {
            mu: stats.mu,
            sigma: stats.sigma,
            simulations: matrix.simulations(),
            days: matrix.days(),
            expected_price,
            p5: percentile_sorted(&terminal, 5.0),
            p50: percentile_sorted(&terminal, 50.0),
            p95: percentile_sorted(&terminal, 95.0),
        };
        debug!(
            mu = stats.mu,
            sigma = stats.sigma,
            expected_price,
            "monte carlo simulation complete"
        );

        let result = ForecastResult::new(
            ForecastMethod::MonteCarlo,
            expected_price,
            matrix.mean_path(),
            false,
        );
        Ok((result, summary))
    }

    fn prepare(&self, closes: &[f64]) -> Result<(f64, ReturnStats), SimulationError> {
        self.config.validate()?;
        let stats = ReturnStats::from_closes(closes)?;
        let start = closes
            .iter()
            .rev()
            .copied()
            .find(|c| c.is_finite())
            .ok_or(SimulationError::InsufficientData {
                required: 2,
                available: 0,
            })?;
        Ok((start, stats))
    }
}

fn normal(stats: &ReturnStats) -> Result<Normal<f64>, SimulationError> {
    Normal::new(stats.mu, stats.sigma).map_err(|e| {
        SimulationError::InvalidConfig(format!(
            "return distribution N({}, {}): {e}",
            stats.mu, stats.sigma
        ))
    })
}

/// `paths` consecutive columns of `days` prices each.
fn fill_paths<R: Rng + ?Sized>(
    start: f64,
    dist: &Normal<f64>,
    days: usize,
    paths: usize,
    rng: &mut R,
) -> Vec<f64> {
    let mut data = Vec::with_capacity(days * paths);
    for _ in 0..paths {
        let mut price = start;
        for _ in 0..days {
            price *= 1.0 + dist.sample(rng);
            data.push(price);
        }
    }
    data
}

/// Linear-interpolated percentile of pre-sorted values.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    if n == 1 {
        return sorted[0];
    }
    let rank = (p / 100.0) * (n - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    let frac = rank - lo as f64;
    sorted[lo] * (1.0 - frac) + sorted[hi] * frac
}
