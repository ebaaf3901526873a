//! Reporting and export: JSON, CSV, and HTML artifact generation.
//!
//! - **JSON**: the full `AnalysisReport`, schema-versioned and round-trippable
//! - **CSV**: the indicator frame, one row per bar
//! - **HTML**: a self-contained single-page report
//!
//! Newer schema versions are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use trendcast_core::indicators::{FrameRow, IndicatorFrame};

use crate::pipeline::{AnalysisReport, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize an `AnalysisReport` to pretty JSON.
pub fn export_json(report: &AnalysisReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize AnalysisReport to JSON")
}

/// Deserialize an `AnalysisReport` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<AnalysisReport> {
    let report: AnalysisReport =
        serde_json::from_str(json).context("failed to deserialize AnalysisReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export the indicator frame as CSV.
///
/// Columns: Date, Open, High, Low, Close, Volume, then the indicator columns
/// in frame order. Undefined indicator values are left empty.
pub fn export_frame_csv(frame: &IndicatorFrame) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header: Vec<String> = ["Date", "Open", "High", "Low", "Close", "Volume"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    header.extend(frame.column_names());
    wtr.write_record(&header)?;

    for row in frame.rows() {
        wtr.write_record(row_fields(&row))?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

fn row_fields(row: &FrameRow) -> Vec<String> {
    let opt = |v: Option<f64>| v.map(|x| format!("{:.6}", x)).unwrap_or_default();
    vec![
        row.date.to_string(),
        format!("{:.6}", row.open),
        format!("{:.6}", row.high),
        format!("{:.6}", row.low),
        format!("{:.6}", row.close),
        row.volume.to_string(),
        opt(row.ma_fast),
        opt(row.ma_slow),
        opt(row.rsi),
        opt(row.ema_fast),
        opt(row.ema_slow),
        opt(row.macd),
        opt(row.macd_signal),
    ]
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a single analysis run.
///
/// Creates a directory named `{symbol}_{timestamp}/` under `output_dir`
/// containing:
/// - `report.json`: the full `AnalysisReport`
/// - `{symbol}_stock_data.csv`: the indicator frame
/// - `report.html`: the rendered report
///
/// Returns the path to the created directory.
pub fn save_artifacts(
    report: &AnalysisReport,
    frame: &IndicatorFrame,
    output_dir: &Path,
) -> Result<PathBuf> {
    let dirname = format!(
        "{}_{}",
        report.symbol,
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    );
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let json = export_json(report)?;
    std::fs::write(run_dir.join("report.json"), &json)?;

    let csv = export_frame_csv(frame)?;
    std::fs::write(
        run_dir.join(format!("{}_stock_data.csv", report.symbol)),
        &csv,
    )?;

    std::fs::write(run_dir.join("report.html"), generate_html_report(report))?;

    Ok(run_dir)
}

/// Load an `AnalysisReport` from an artifact directory's report.json.
pub fn load_artifacts(dir: &Path) -> Result<AnalysisReport> {
    let path = dir.join("report.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

// ─── HTML report ────────────────────────────────────────────────────

const STYLE: &str = "body{font-family:sans-serif;margin:2em;color:#222}\
table{border-collapse:collapse;font-size:0.9em}\
th,td{border:1px solid #ccc;padding:4px 8px;text-align:right}\
th{background:#f0f0f0}\
.up{color:#1a7f37}.down{color:#cf222e}.warn{color:#9a6700}";

/// Render a self-contained HTML page for the report.
///
/// The price table lists the tail rows newest first.
pub fn generate_html_report(report: &AnalysisReport) -> String {
    let mut html = String::with_capacity(8192);
    let symbol = escape(&report.symbol);

    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>{} trend analysis</title>\n", symbol));
    html.push_str(&format!("<style>{}</style>\n</head>\n<body>\n", STYLE));
    html.push_str(&format!("<h1>{} Trend Analysis</h1>\n", symbol));

    if report.is_synthetic() {
        html.push_str("<p class=\"warn\"><strong>SYNTHETIC DATA</strong>: not market prices.</p>\n");
    }

    let trend_class = if report.trend.is_bullish() { "up" } else { "down" };
    html.push_str(&format!(
        "<p>Trend: <span class=\"{}\">{}</span></p>\n",
        trend_class,
        escape(&report.trend_label)
    ));
    html.push_str(&format!(
        "<p>Current Price ({}): {:.2}</p>\n",
        report.last_date, report.current_price
    ));
    html.push_str(&format!(
        "<p>Predicted Price ({} days, {}): {:.2}</p>\n",
        report.forecast.horizon(),
        report.target_date,
        report.forecast.predicted_price()
    ));
    html.push_str(&format!(
        "<p>Price Difference: {:+.2}</p>\n",
        report.price_difference
    ));
    let pl_class = if report.profit_loss_pct >= 0.0 { "up" } else { "down" };
    html.push_str(&format!(
        "<p>Profit/Loss: <span class=\"{}\">{:+.2}%</span></p>\n",
        pl_class, report.profit_loss_pct
    ));

    match &report.entry {
        Some(plan) => {
            html.push_str(&format!(
                "<p>Recommended Entry Price: {:.2}</p>\n",
                plan.entry_price
            ));
            html.push_str(&format!("<p>Stop-Loss Level: {:.2}</p>\n", plan.stop_loss));
        }
        None => html.push_str("<p>No Entry Signal</p>\n"),
    }

    html.push_str("<h2>Forecast</h2>\n<ul>\n");
    html.push_str(&format!("<li>Method: {}</li>\n", report.forecast.method()));
    if let Some(reason) = &report.fallback_reason {
        html.push_str(&format!(
            "<li class=\"warn\">Fallback: {}</li>\n",
            escape(reason)
        ));
    }
    if let Some(diag) = &report.regression {
        html.push_str(&format!(
            "<li>Test MAE: {:.4} ({} train / {} test rows, {} trees)</li>\n",
            diag.mae, diag.train_rows, diag.test_rows, diag.n_trees
        ));
    }
    if let Some(mc) = &report.monte_carlo {
        html.push_str(&format!(
            "<li>{} simulations, mu {:.6}, sigma {:.6}, 5/50/95%: {:.2} / {:.2} / {:.2}</li>\n",
            mc.simulations, mc.mu, mc.sigma, mc.p5, mc.p50, mc.p95
        ));
    }
    html.push_str(&format!("<li>Run ID: {}</li>\n", report.run_id));
    if let Some(hash) = &report.dataset_hash {
        html.push_str(&format!("<li>Dataset: {}</li>\n", escape(hash)));
    }
    html.push_str("</ul>\n");

    html.push_str(&format!(
        "<h2>Last {} Days</h2>\n<table>\n",
        report.frame_tail.len()
    ));
    html.push_str(
        "<tr><th>Date</th><th>Open</th><th>High</th><th>Low</th><th>Close</th>\
         <th>Volume</th><th>MA fast</th><th>MA slow</th><th>RSI</th>\
         <th>MACD</th><th>Signal</th></tr>\n",
    );
    for row in report.frame_tail.iter().rev() {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{:.2}</td><td>{:.2}</td><td>{:.2}</td><td>{:.2}</td>\
             <td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            row.date,
            row.open,
            row.high,
            row.low,
            row.close,
            row.volume,
            cell(row.ma_fast),
            cell(row.ma_slow),
            cell(row.rsi),
            cell(row.macd),
            cell(row.macd_signal),
        ));
    }
    html.push_str("</table>\n</body>\n</html>\n");
    html
}

fn cell(v: Option<f64>) -> String {
    v.map(|x| format!("{:.2}", x)).unwrap_or_else(|| "-".into())
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
