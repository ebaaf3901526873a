//! Price-series loading and data resolution for the runner.
//!
//! Implements the fallback policy:
//! 1. If the cache covers the requested window → use it
//! 2. Otherwise, if a provider is available → download, then cache
//! 3. If still no data and `synthetic` → generate synthetic bars (tagged)
//! 4. Otherwise → fail with a clear error
//!
//! Synthetic data is a developer-only debug mode. Reports produced on
//! synthetic data carry `DataSource::Synthetic`.

use chrono::{Datelike, NaiveDate};
use thiserror::Error;
use tracing::{info, warn};

use trendcast_core::data::{
    download_single, into_series, CsvBarCache, DataError, DataProvider,
    DataSource, RawBar,
};
use trendcast_core::domain::PriceSeries;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(
        "no cached data for '{symbol}' and no network access (use --synthetic for synthetic data)"
    )]
    NoCachedDataOffline { symbol: String },

    #[error("no cached data for '{symbol}' and download failed: {reason}")]
    DownloadFailed { symbol: String, reason: String },

    #[error("no bars for '{symbol}' between {start} and {end}")]
    EmptyWindow {
        symbol: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("data error: {0}")]
    Data(#[from] DataError),
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Never make network requests.
    pub offline: bool,
    /// Generate synthetic bars when real data is unavailable.
    pub synthetic: bool,
    /// Re-download even if cached.
    pub force: bool,
}

#[derive(Debug, Clone)]
pub struct LoadedSeries {
    pub series: PriceSeries,
    pub source: DataSource,
    /// BLAKE3 over the loaded bars.
    pub dataset_hash: String,
}

impl LoadedSeries {
    pub fn is_synthetic(&self) -> bool {
        self.source == DataSource::Synthetic
    }
}

/// Load one symbol's series for `[opts.start, opts.end]`.
pub fn load_series(
    symbol: &str,
    cache: &CsvBarCache,
    provider: Option<&dyn DataProvider>,
    opts: &LoadOptions,
) -> Result<LoadedSeries, LoadError> {
    let mut download_error = None;

    // Step 1: cache
    if !opts.force && (opts.offline || cache_covers(cache, symbol, opts)) {
        match cache.load(symbol) {
            Ok(bars) => {
                info!(symbol, bars = bars.len(), "loaded from cache");
                return finish(symbol, bars, DataSource::Cache, opts);
            }
            Err(DataError::NoCachedData { .. }) => {}
            Err(e) => warn!(symbol, error = %e, "cache unreadable"),
        }
    }

    // Step 2: download
    if !opts.offline {
        if let Some(prov) = provider.filter(|p| p.is_available()) {
            match download_single(prov, cache, symbol, opts.start, opts.end) {
                Ok(n) => {
                    info!(symbol, bars = n, provider = prov.name(), "downloaded and cached");
                    let bars = cache.load(symbol)?;
                    return finish(symbol, bars, DataSource::YahooFinance, opts);
                }
                Err(e) => {
                    warn!(symbol, error = %e, "download failed");
                    download_error = Some(e.to_string());
                }
            }
        }
    }

    // Step 3: synthetic
    if opts.synthetic {
        warn!(
            symbol,
            "generating synthetic data; results will be tagged as synthetic"
        );
        let bars = generate_synthetic_bars(symbol, opts.start, opts.end);
        return finish(symbol, bars, DataSource::Synthetic, opts);
    }

    // Step 4: fail
    if opts.offline {
        return Err(LoadError::NoCachedDataOffline {
            symbol: symbol.to_string(),
        });
    }
    Err(LoadError::DownloadFailed {
        symbol: symbol.to_string(),
        reason: download_error.unwrap_or_else(|| "no data provider available".into()),
    })
}

fn cache_covers(cache: &CsvBarCache, symbol: &str, opts: &LoadOptions) -> bool {
    cache.covers_trading_range(symbol, opts.start, opts.end)
}

fn finish(
    symbol: &str,
    bars: Vec<RawBar>,
    source: DataSource,
    opts: &LoadOptions,
) -> Result<LoadedSeries, LoadError> {
    let in_window: Vec<RawBar> = bars
        .into_iter()
        .filter(|b| b.date >= opts.start && b.date <= opts.end)
        .collect();
    if in_window.is_empty() {
        return Err(LoadError::EmptyWindow {
            symbol: symbol.to_string(),
            start: opts.start,
            end: opts.end,
        });
    }
    let series = into_series(symbol, in_window)?;
    let dataset_hash = series.content_hash();
    Ok(LoadedSeries {
        series,
        source,
        dataset_hash,
    })
}

/// Generate a synthetic random walk for development runs.
///
/// Weekdays only, starting at 100.0, seeded from the symbol name so the same
/// symbol always produces the same bars.
pub fn generate_synthetic_bars(symbol: &str, start: NaiveDate, end: NaiveDate) -> Vec<RawBar> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut bars = Vec::new();
    let mut price = 100.0_f64;
    let mut current = start;

    while current <= end {
        let weekday = current.weekday();
        if weekday == chrono::Weekday::Sat || weekday == chrono::Weekday::Sun {
            current += chrono::Duration::days(1);
            continue;
        }

        let daily_return: f64 = rng.gen_range(-0.03..0.03);
        let open = price;
        let close = price * (1.0 + daily_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        let volume = rng.gen_range(500_000..5_000_000u64);

        bars.push(RawBar {
            date: current,
            open,
            high,
            low,
            close,
            volume,
        });

        price = close;
        current += chrono::Duration::days(1);
    }

    bars
}
