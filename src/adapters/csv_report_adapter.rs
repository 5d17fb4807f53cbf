//! CSV report adapter.
//!
//! Writes one directory per backtest run:
//! - `indicators.csv`: date, close, trend and baseline
//! - `signals.csv`: date and signal code
//! - `equity.csv`: date and account value
//! - `summary.txt`: the performance report
//!
//! Undefined values are written as empty cells.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use tracing::info;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::BacksimError;
use crate::domain::indicator::IndicatorColumn;
use crate::domain::series::TimeSeries;
use crate::domain::strategy::Strategy;
use crate::ports::report_port::ReportPort;

pub const INDICATORS_FILE: &str = "indicators.csv";
pub const SIGNALS_FILE: &str = "signals.csv";
pub const EQUITY_FILE: &str = "equity.csv";
pub const SUMMARY_FILE: &str = "summary.txt";

#[derive(Debug, Default)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        CsvReportAdapter
    }
}

fn csv_error(path: &Path, e: impl std::fmt::Display) -> BacksimError {
    BacksimError::Data {
        reason: format!("failed to write {}: {}", path.display(), e),
    }
}

fn cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn optional(value: Option<f64>, precision: usize) -> String {
    value
        .map(|v| format!("{:.*}", precision, v))
        .unwrap_or_else(|| "n/a".to_string())
}

/// Write `series` as columns sharing the dates of the first one.
fn write_columns(path: &Path, names: &[String], series: &[&TimeSeries]) -> Result<(), BacksimError> {
    if let Some(first) = series.first() {
        for other in &series[1..] {
            first.ensure_same_dates(other)?;
        }
    }

    let mut wtr = csv::Writer::from_path(path).map_err(|e| csv_error(path, e))?;
    let mut header = vec!["date".to_string()];
    header.extend(names.iter().cloned());
    wtr.write_record(&header).map_err(|e| csv_error(path, e))?;

    if let Some(first) = series.first() {
        for (i, date) in first.dates().enumerate() {
            let mut row = vec![date.to_string()];
            row.extend(series.iter().map(|s| cell(s.get(i))));
            wtr.write_record(&row).map_err(|e| csv_error(path, e))?;
        }
    }
    wtr.flush()?;
    Ok(())
}

/// Render the performance report as plain text, one `label: value` per line.
pub fn render_summary(result: &BacktestResult, strategy: &Strategy) -> String {
    let report = &result.report;
    let rows = [
        ("symbol", result.symbol.clone()),
        ("strategy", format!("{} ({})", strategy.name, strategy.describe())),
        ("status", report.status.to_string()),
        ("bars", result.signals.len().to_string()),
        ("trades", result.simulation.trades.to_string()),
        ("initial value", optional(report.initial_value, 2)),
        ("final value", optional(report.final_value, 2)),
        ("overall return %", optional(report.overall_return, 4)),
        ("benchmark return %", optional(report.benchmark_return, 4)),
        ("sharpe ratio", optional(report.sharpe_ratio, 4)),
        ("beta", optional(report.beta, 4)),
        ("treynor ratio", optional(report.treynor_ratio, 4)),
        ("max drawdown %", optional(report.max_drawdown.map(|d| d * 100.0), 4)),
    ];
    let mut out = String::new();
    for (label, value) in rows {
        let _ = writeln!(out, "{:<20}{}", format!("{}:", label), value);
    }
    out
}

impl ReportPort for CsvReportAdapter {
    fn write(
        &self,
        result: &BacktestResult,
        strategy: &Strategy,
        output_dir: &Path,
    ) -> Result<(), BacksimError> {
        fs::create_dir_all(output_dir)?;

        write_columns(
            &output_dir.join(INDICATORS_FILE),
            &[
                "close".to_string(),
                strategy.trend.to_string(),
                strategy.baseline.to_string(),
            ],
            &[&result.prices, &result.trend, &result.baseline],
        )?;

        let signals_path = output_dir.join(SIGNALS_FILE);
        let mut wtr = csv::Writer::from_path(&signals_path).map_err(|e| csv_error(&signals_path, e))?;
        wtr.write_record(["date", "signal"])
            .map_err(|e| csv_error(&signals_path, e))?;
        for point in result.signals.points() {
            wtr.write_record([point.date.to_string(), point.signal.code().to_string()])
                .map_err(|e| csv_error(&signals_path, e))?;
        }
        wtr.flush()?;

        write_columns(
            &output_dir.join(EQUITY_FILE),
            &["equity".to_string()],
            &[&result.simulation.equity],
        )?;

        fs::write(output_dir.join(SUMMARY_FILE), render_summary(result, strategy))?;
        info!("wrote report for {} to {}", result.symbol, output_dir.display());
        Ok(())
    }

    fn write_indicators(&self, columns: &[IndicatorColumn], path: &Path) -> Result<(), BacksimError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let names: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();
        let series: Vec<&TimeSeries> = columns.iter().map(|c| &c.series).collect();
        write_columns(path, &names, &series)?;
        info!("wrote {} indicator columns to {}", columns.len(), path.display());
        Ok(())
    }
}
