//! Market data: provider trait, Yahoo Finance client and the CSV bar cache.

pub mod cache;
pub mod download;
pub mod provider;
pub mod yahoo;

pub use cache::{CacheMeta, CoverageResult, CsvBarCache, COVERAGE_SLACK_DAYS};
pub use download::{download_single, download_symbols, DownloadSummary};
pub use provider::{into_series, DataError, DataProvider, DataSource, FetchResult, RawBar};
pub use yahoo::YahooProvider;
