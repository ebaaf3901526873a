//! Trendcast Runner — analysis orchestration on top of `trendcast-core`.
//!
//! - TOML configuration with run-id hashing
//! - Data loading with cache/download/synthetic fallback
//! - The analysis pipeline producing an `AnalysisReport`
//! - JSON, CSV, and HTML export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod pipeline;

pub use config::{AnalysisConfig, ConfigError, Lookback, PeriodUnit, RunId};
pub use data_loader::{generate_synthetic_bars, load_series, LoadError, LoadOptions, LoadedSeries};
pub use export::{
    export_frame_csv, export_json, generate_html_report, import_json, load_artifacts,
    save_artifacts,
};
pub use pipeline::{run_analysis, run_analysis_with_frame, AnalysisReport, PipelineError, SCHEMA_VERSION};
