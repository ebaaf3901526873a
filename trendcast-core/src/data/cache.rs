//! CSV bar cache.
//!
//! Layout: `{cache_dir}/{SYMBOL}.csv` with a `{SYMBOL}.meta.json` sidecar
//! (date range, bar count, content hash, source).
//!
//! Writes are atomic (write to `.tmp`, rename into place). A file that fails
//! to parse on load is renamed to `{SYMBOL}.csv.quarantined` so the next run
//! re-downloads instead of failing again.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use super::provider::{DataError, DataSource, RawBar};

/// Metadata sidecar for a cached symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMeta {
    pub symbol: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub bar_count: usize,
    pub data_hash: String,
    pub source: DataSource,
    pub cached_at: chrono::NaiveDateTime,
}

/// Calendar slack when checking cache coverage, so weekends and exchange
/// holidays at either end of a window still count as covered.
pub const COVERAGE_SLACK_DAYS: i64 = 4;

/// How well the cache covers the requested date range.
#[derive(Debug, Clone, PartialEq)]
pub enum CoverageResult {
    NotCached,
    FullyCovered,
    PartiallyCovered {
        cached_start: NaiveDate,
        cached_end: NaiveDate,
    },
}

pub struct CsvBarCache {
    cache_dir: PathBuf,
}

impl CsvBarCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn data_path(&self, symbol: &str) -> PathBuf {
        self.cache_dir.join(format!("{symbol}.csv"))
    }

    fn meta_path(&self, symbol: &str) -> PathBuf {
        self.cache_dir.join(format!("{symbol}.meta.json"))
    }

    /// Replace the cached bars for `symbol`.
    pub fn write(&self, symbol: &str, bars: &[RawBar], source: DataSource) -> Result<(), DataError> {
        let (first, last) = match (bars.first(), bars.last()) {
            (Some(f), Some(l)) => (f, l),
            _ => return Err(DataError::CacheError("no bars to cache".into())),
        };
        fs::create_dir_all(&self.cache_dir)
            .map_err(|e| DataError::CacheError(format!("failed to create dir: {e}")))?;

        let mut writer = csv::Writer::from_writer(Vec::new());
        for bar in bars {
            writer
                .serialize(bar)
                .map_err(|e| DataError::CacheError(format!("csv encode: {e}")))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| DataError::CacheError(format!("csv flush: {e}")))?;

        let path = self.data_path(symbol);
        let tmp_path = path.with_extension("csv.tmp");
        fs::write(&tmp_path, &bytes)
            .map_err(|e| DataError::CacheError(format!("write {}: {e}", tmp_path.display())))?;
        if let Err(e) = fs::rename(&tmp_path, &path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(DataError::CacheError(format!(
                "rename into {}: {e}",
                path.display()
            )));
        }

        let meta = CacheMeta {
            symbol: symbol.to_string(),
            start_date: first.date,
            end_date: last.date,
            bar_count: bars.len(),
            data_hash: blake3::hash(&bytes).to_hex().to_string(),
            source,
            cached_at: chrono::Utc::now().naive_utc(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| DataError::CacheError(format!("meta serialization: {e}")))?;
        fs::write(self.meta_path(symbol), meta_json)
            .map_err(|e| DataError::CacheError(format!("meta write: {e}")))?;
        Ok(())
    }

    /// Load cached bars, quarantining the file if it cannot be parsed.
    pub fn load(&self, symbol: &str) -> Result<Vec<RawBar>, DataError> {
        let path = self.data_path(symbol);
        if !path.exists() {
            return Err(DataError::NoCachedData {
                symbol: symbol.to_string(),
            });
        }

        match read_bars(&path) {
            Ok(bars) if !bars.is_empty() => Ok(bars),
            Ok(_) => Err(DataError::NoCachedData {
                symbol: symbol.to_string(),
            }),
            Err(e) => {
                let quarantine = path.with_extension("csv.quarantined");
                warn!(
                    symbol,
                    error = %e,
                    quarantine = %quarantine.display(),
                    "corrupt cache file quarantined"
                );
                let _ = fs::rename(&path, &quarantine);
                let _ = fs::remove_file(self.meta_path(symbol));
                Err(e)
            }
        }
    }

    pub fn get_meta(&self, symbol: &str) -> Option<CacheMeta> {
        let content = fs::read_to_string(self.meta_path(symbol)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Symbols with a metadata sidecar, sorted.
    pub fn cached_symbols(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.cache_dir) else {
            return Vec::new();
        };
        let mut symbols: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                e.file_name()
                    .to_str()
                    .and_then(|name| name.strip_suffix(".meta.json"))
                    .map(str::to_string)
            })
            .collect();
        symbols.sort();
        symbols
    }

    pub fn covers_range(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> CoverageResult {
        match self.get_meta(symbol) {
            None => CoverageResult::NotCached,
            Some(meta) if meta.start_date <= start && meta.end_date >= end => {
                CoverageResult::FullyCovered
            }
            Some(meta) => CoverageResult::PartiallyCovered {
                cached_start: meta.start_date,
                cached_end: meta.end_date,
            },
        }
    }

    /// Like `covers_range`, but lets either end fall short by up to
    /// `COVERAGE_SLACK_DAYS` (never more than half the range).
    pub fn covers_trading_range(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> bool {
        let half_span = (end - start).num_days().max(0) / 2;
        let slack = chrono::Duration::days(COVERAGE_SLACK_DAYS.min(half_span));
        self.covers_range(symbol, start + slack, end - slack) == CoverageResult::FullyCovered
    }
}

fn read_bars(path: &Path) -> Result<Vec<RawBar>, DataError> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| DataError::CacheError(format!("open {}: {e}", path.display())))?;
    reader
        .deserialize()
        .collect::<Result<Vec<RawBar>, _>>()
        .map_err(|e| DataError::CacheError(format!("parse {}: {e}", path.display())))
}
