//! Trendcast CLI — analyze, download, and cache management commands.
//!
//! Commands:
//! - `analyze` — trend, forecast, and entry/stop analysis for one symbol
//! - `download` — fetch market data from Yahoo Finance into the CSV cache
//! - `cache status` — report cached symbols and date ranges

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trendcast_core::data::{download_symbols, CsvBarCache, DataProvider, YahooProvider};
use trendcast_core::forecast::ForecastMethod;
use trendcast_core::{CancelToken, TrendStrategy};
use trendcast_runner::{
    load_series, run_analysis_with_frame, save_artifacts, AnalysisConfig, AnalysisReport,
    LoadOptions, Lookback,
};

#[derive(Parser)]
#[command(
    name = "trendcast",
    about = "Trendcast CLI — trend classification and price forecasting"
)]
struct Cli {
    /// Verbose logging (debug level). RUST_LOG overrides.
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a symbol: indicators, trend, forecast, entry/stop.
    Analyze {
        /// Ticker symbol. Overrides the config file.
        symbol: Option<String>,

        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Lookback period (e.g. 5y, 6mo, 90d).
        #[arg(long)]
        period: Option<String>,

        /// Forecast horizon in days.
        #[arg(long)]
        horizon: Option<usize>,

        /// Forecast method: random_forest or monte_carlo.
        #[arg(long)]
        method: Option<String>,

        /// Trend strategy: crossover or price_confirmed.
        #[arg(long)]
        strategy: Option<String>,

        /// Random seed for the forecasters.
        #[arg(long)]
        seed: Option<u64>,

        /// Offline mode: no network access.
        #[arg(long, default_value_t = false)]
        offline: bool,

        /// Use synthetic data as fallback.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Force re-download even if cached.
        #[arg(long, default_value_t = false)]
        force: bool,

        /// Cache directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,

        /// Output directory for report artifacts.
        #[arg(long, default_value = "results")]
        out: PathBuf,
    },
    /// Download market data from Yahoo Finance into the cache.
    Download {
        /// Symbols to download (e.g., SPY QQQ AAPL).
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Lookback period (e.g. 5y, 6mo, 90d).
        #[arg(long, default_value = "5y")]
        period: String,

        /// Force re-download even if cached.
        #[arg(long, default_value_t = false)]
        force: bool,

        /// Cache directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,
    },
    /// Cache management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Report cached symbols and date ranges.
    Status {
        /// Cache directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,
    },
}

/// Command-line overrides layered on top of the config file.
struct Overrides {
    symbol: Option<String>,
    period: Option<String>,
    horizon: Option<usize>,
    method: Option<String>,
    strategy: Option<String>,
    seed: Option<u64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Analyze {
            symbol,
            config,
            period,
            horizon,
            method,
            strategy,
            seed,
            offline,
            synthetic,
            force,
            cache_dir,
            out,
        } => {
            let overrides = Overrides {
                symbol,
                period,
                horizon,
                method,
                strategy,
                seed,
            };
            let config = build_config(config.as_deref(), overrides)?;
            let opts = (offline, synthetic, force);
            run_analyze_cmd(&config, opts, &cache_dir, &out)
        }
        Commands::Download {
            symbols,
            period,
            force,
            cache_dir,
        } => run_download(symbols, &period, force, cache_dir),
        Commands::Cache { action } => match action {
            CacheAction::Status { cache_dir } => run_cache_status(&cache_dir),
        },
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "trendcast=debug,trendcast_core=debug,trendcast_runner=debug"
    } else {
        "trendcast=info,trendcast_core=info,trendcast_runner=info"
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .init();
}

fn build_config(path: Option<&Path>, overrides: Overrides) -> Result<AnalysisConfig> {
    let mut config = match path {
        Some(p) => AnalysisConfig::load(p)?,
        None => AnalysisConfig::default(),
    };

    if let Some(symbol) = overrides.symbol {
        config.symbol = symbol.to_uppercase();
    }
    if let Some(period) = overrides.period {
        config.period = period;
    }
    if let Some(horizon) = overrides.horizon {
        config.horizon_days = horizon;
    }
    if let Some(method) = overrides.method {
        config.forecast_method = match method.as_str() {
            "random_forest" | "rf" => ForecastMethod::RandomForest,
            "monte_carlo" | "mc" => ForecastMethod::MonteCarlo,
            other => bail!("unknown forecast method '{other}' (random_forest, monte_carlo)"),
        };
    }
    if let Some(strategy) = overrides.strategy {
        config.trend_strategy = match strategy.as_str() {
            "crossover" => TrendStrategy::Crossover,
            "price_confirmed" => TrendStrategy::PriceConfirmed,
            other => bail!("unknown trend strategy '{other}' (crossover, price_confirmed)"),
        };
    }
    if overrides.seed.is_some() {
        config.seed = overrides.seed;
    }

    config.validate().context("invalid configuration")?;
    debug!(run_id = %config.run_id(), symbol = %config.symbol, "configuration resolved");
    Ok(config)
}

fn run_analyze_cmd(
    config: &AnalysisConfig,
    (offline, synthetic, force): (bool, bool, bool),
    cache_dir: &Path,
    output_dir: &Path,
) -> Result<()> {
    let end = chrono::Local::now().date_naive();
    let start = config.lookback()?.start_date(end);
    let opts = LoadOptions {
        start,
        end,
        offline,
        synthetic,
        force,
    };

    let cache = CsvBarCache::new(cache_dir);
    let provider = if offline {
        None
    } else {
        Some(YahooProvider::new()?)
    };
    let provider_ref = provider.as_ref().map(|p| p as &dyn DataProvider);

    let loaded = load_series(&config.symbol, &cache, provider_ref, &opts)
        .with_context(|| format!("failed to load data for {}", config.symbol))?;

    let cancel = CancelToken::new();
    let (report, frame) = run_analysis_with_frame(&loaded.series, config, &cancel)
        .with_context(|| format!("analysis failed for {}", config.symbol))?;
    let report = report.with_provenance(loaded.source, loaded.dataset_hash);

    print_summary(&report);

    let run_dir = save_artifacts(&report, &frame, output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());

    Ok(())
}

fn run_download(symbols: Vec<String>, period: &str, force: bool, cache_dir: PathBuf) -> Result<()> {
    let end = chrono::Local::now().date_naive();
    let start = Lookback::parse(period)?.start_date(end);

    let provider = YahooProvider::new()?;
    let cache = CsvBarCache::new(cache_dir);

    let upper: Vec<String> = symbols.iter().map(|s| s.to_uppercase()).collect();
    let sym_refs: Vec<&str> = upper.iter().map(|s| s.as_str()).collect();

    let summary = download_symbols(&provider, &cache, &sym_refs, start, end, force);
    println!(
        "Downloaded {}/{} symbol(s)",
        summary.succeeded, summary.total
    );

    if !summary.all_succeeded() {
        for (sym, err) in &summary.errors {
            eprintln!("Error for {sym}: {err}");
        }
        std::process::exit(1);
    }

    Ok(())
}

fn run_cache_status(cache_dir: &Path) -> Result<()> {
    if !cache_dir.exists() {
        println!("Cache directory does not exist: {}", cache_dir.display());
        return Ok(());
    }

    let cache = CsvBarCache::new(cache_dir);
    let symbols = cache.cached_symbols();
    if symbols.is_empty() {
        println!("Cache is empty: {}", cache_dir.display());
        return Ok(());
    }

    println!("Cache: {}", cache_dir.display());
    println!("Symbols: {}", symbols.len());
    println!();
    println!("{:<8} {:<25} {:>10} {:<14}", "Symbol", "Date Range", "Bars", "Source");
    println!("{}", "-".repeat(60));
    for symbol in &symbols {
        match cache.get_meta(symbol) {
            Some(meta) => println!(
                "{:<8} {:<25} {:>10} {:<14}",
                symbol,
                format!("{} to {}", meta.start_date, meta.end_date),
                meta.bar_count,
                serde_json::to_string(&meta.source)?.trim_matches('"'),
            ),
            None => println!("{:<8} {:<25}", symbol, "(no meta)"),
        }
    }

    Ok(())
}

fn print_summary(report: &AnalysisReport) {
    println!();
    println!("=== {} Trend Analysis ===", report.symbol);
    println!("Trend:           {}", report.trend_label);
    println!(
        "Current Price:   {:.2} ({})",
        report.current_price, report.last_date
    );
    println!(
        "Predicted Price: {:.2} ({}, {})",
        report.forecast.predicted_price(),
        report.target_date,
        report.forecast.method()
    );
    println!("Difference:      {:+.2}", report.price_difference);
    println!("Profit/Loss:     {:+.2}%", report.profit_loss_pct);
    match &report.entry {
        Some(plan) => {
            println!("Recommended Entry Price: {:.2}", plan.entry_price);
            println!("Stop-Loss Level:         {:.2}", plan.stop_loss);
        }
        None => println!("No Entry Signal"),
    }
    if let Some(reason) = &report.fallback_reason {
        println!();
        println!("NOTE: Monte Carlo fallback ({reason})");
    }
    if report.is_synthetic() {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
    println!();
}
