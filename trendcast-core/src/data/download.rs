//! Multi-symbol download: fetch, clean, cache.

use chrono::NaiveDate;
use tracing::{info, warn};

use super::cache::CsvBarCache;
use super::provider::{into_series, DataError, DataProvider, RawBar};

/// Download each symbol unless the cache already covers the range, give or
/// take `COVERAGE_SLACK_DAYS` at either end.
///
/// Failures are collected per symbol; one bad ticker does not stop the batch.
pub fn download_symbols(
    provider: &dyn DataProvider,
    cache: &CsvBarCache,
    symbols: &[&str],
    start: NaiveDate,
    end: NaiveDate,
    force: bool,
) -> DownloadSummary {
    let total = symbols.len();
    let mut succeeded = 0;
    let mut errors: Vec<(String, DataError)> = Vec::new();

    for (i, symbol) in symbols.iter().enumerate() {
        if !force && cache.covers_trading_range(symbol, start, end) {
            info!(symbol, "[{}/{total}] cache fresh, skipped", i + 1);
            succeeded += 1;
            continue;
        }

        match download_single(provider, cache, symbol, start, end) {
            Ok(bars) => {
                info!(symbol, bars, "[{}/{total}] downloaded", i + 1);
                succeeded += 1;
            }
            Err(e) => {
                warn!(symbol, error = %e, "[{}/{total}] download failed", i + 1);
                errors.push((symbol.to_string(), e));
            }
        }
    }

    DownloadSummary {
        total,
        succeeded,
        failed: errors.len(),
        errors,
    }
}

/// Fetch one symbol, validate it into a series, and cache the clean bars.
pub fn download_single(
    provider: &dyn DataProvider,
    cache: &CsvBarCache,
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<usize, DataError> {
    let fetched = provider.fetch(symbol, start, end)?;
    let series = into_series(symbol, fetched.bars)?;
    let clean: Vec<RawBar> = series.bars().iter().map(RawBar::from).collect();
    cache.write(symbol, &clean, fetched.source)?;
    Ok(clean.len())
}

#[derive(Debug)]
pub struct DownloadSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<(String, DataError)>,
}

impl DownloadSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::provider::{DataSource, FetchResult};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FixtureProvider {
        fetches: AtomicUsize,
    }

    impl DataProvider for FixtureProvider {
        fn name(&self) -> &str {
            "fixture"
        }

        fn fetch(
            &self,
            symbol: &str,
            start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<FetchResult, DataError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if symbol == "BAD" {
                return Err(DataError::SymbolNotFound {
                    symbol: symbol.into(),
                });
            }
            let bars = (0..5)
                .map(|i| RawBar {
                    date: start + chrono::Duration::days(i),
                    open: 10.0,
                    high: 11.0,
                    low: 9.0,
                    close: 10.0 + i as f64,
                    volume: 100,
                })
                .collect();
            Ok(FetchResult {
                symbol: symbol.into(),
                bars,
                source: DataSource::YahooFinance,
            })
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    #[test]
    fn batch_collects_failures() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CsvBarCache::new(dir.path());
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();

        let provider = FixtureProvider::default();
        let summary = download_symbols(&provider, &cache, &["AAA", "BAD"], start, end, false);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.errors[0].0, "BAD");
        assert_eq!(cache.load("AAA").unwrap().len(), 5);
    }

    #[test]
    fn cached_symbol_is_skipped_when_range_ends_after_last_bar() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CsvBarCache::new(dir.path());
        let provider = FixtureProvider::default();
        // Fixture bars run Jan 1..=5 (Mon..Fri).
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let friday = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let sunday = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();

        download_symbols(&provider, &cache, &["AAA"], start, friday, false);
        assert_eq!(provider.fetches.load(Ordering::SeqCst), 1);

        let summary = download_symbols(&provider, &cache, &["AAA"], start, sunday, false);
        assert!(summary.all_succeeded());
        assert_eq!(provider.fetches.load(Ordering::SeqCst), 1);

        download_symbols(&provider, &cache, &["AAA"], start, sunday, true);
        assert_eq!(provider.fetches.load(Ordering::SeqCst), 2);
    }
}
