//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::{CsvAdapter, read_signals};
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{self as backtest_engine, BacktestConfig, BacktestResult};
use crate::domain::config_validation::{
    DEFAULT_BASELINE, DEFAULT_TREND, read_date, read_indicator, read_number,
    read_signal_strategy, read_simulation_config, require, validate_config, validate_simulation,
};
use crate::domain::error::BacksimError;
use crate::domain::indicator::parser::parse_indicator;
use crate::domain::indicator::{IndicatorColumn, IndicatorType, compute_indicator};
use crate::domain::metrics::{DEFAULT_RISK_FREE_RATE, PerformanceReport};
use crate::domain::portfolio::{self, SimulationConfig, Valuation};
use crate::domain::series::TimeSeries;
use crate::domain::strategy::Strategy;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

/// Exit code of a backtest that ran out of cash.
pub const EXIT_INSOLVENT: u8 = 6;

#[derive(Parser, Debug)]
#[command(name = "backsim", about = "Indicator crossover backtester")]
pub struct Cli {
    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest described by an INI file
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Output directory, overrides [output] dir
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Compute indicators for one symbol and write them as CSV
    Indicators {
        #[arg(long)]
        data_dir: PathBuf,
        #[arg(long)]
        symbol: String,
        /// Indicator text such as SMA(20) or BOLLINGER(20,2)
        #[arg(short, long = "indicator", required = true)]
        indicators: Vec<String>,
        /// Symbol whose closes feed NORMALIZED
        #[arg(long)]
        benchmark: Option<String>,
        #[arg(short, long, default_value = "indicators.csv")]
        output: PathBuf,
    },
    /// Simulate a portfolio from a precomputed signal file
    Simulate {
        #[arg(long)]
        data_dir: PathBuf,
        #[arg(long)]
        symbol: String,
        /// CSV with date and signal columns
        #[arg(long)]
        signals: PathBuf,
        #[arg(long, default_value_t = 1_000_000.0)]
        initial_value: f64,
        #[arg(long, default_value_t = 0.0)]
        seed_fraction: f64,
        #[arg(long, default_value_t = 1)]
        numtrades: i64,
        #[arg(long, default_value_t = 0.0)]
        transaction_cost: f64,
        #[arg(long, default_value_t = DEFAULT_RISK_FREE_RATE)]
        risk_free_rate: f64,
        /// Value open positions at the current price
        #[arg(long)]
        mark_to_market: bool,
        /// Write the equity curve to this CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a backtest configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List symbols in a data directory with their date ranges
    ListSymbols {
        #[arg(long)]
        data_dir: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            output,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config)
            } else {
                run_backtest(&config, output.as_deref())
            }
        }
        Command::Indicators {
            data_dir,
            symbol,
            indicators,
            benchmark,
            output,
        } => run_indicators(&data_dir, &symbol, &indicators, benchmark.as_deref(), &output),
        Command::Simulate {
            data_dir,
            symbol,
            signals,
            initial_value,
            seed_fraction,
            numtrades,
            transaction_cost,
            risk_free_rate,
            mark_to_market,
            output,
        } => {
            let simulation = SimulationConfig {
                initial_value,
                seed_fraction,
                numtrades,
                transaction_cost,
                valuation: if mark_to_market {
                    Valuation::MarkToMarket
                } else {
                    Valuation::CashOnly
                },
            };
            run_simulate(
                &data_dir,
                &symbol,
                &signals,
                &simulation,
                risk_free_rate,
                output.as_deref(),
            )
        }
        Command::Validate { config } => run_validate(&config),
        Command::ListSymbols { data_dir } => run_list_symbols(&data_dir),
    }
}

fn fail(e: &BacksimError) -> ExitCode {
    eprintln!("error: {e}");
    e.into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| fail(&e))
}

pub fn build_strategy(adapter: &dyn ConfigPort) -> Result<Strategy, BacksimError> {
    let signal = read_signal_strategy(adapter)?;
    Ok(Strategy {
        name: adapter
            .get_string("strategy", "name")
            .unwrap_or_else(|| signal.name().to_string()),
        trend: read_indicator(adapter, "trend", DEFAULT_TREND)?,
        baseline: read_indicator(adapter, "baseline", DEFAULT_BASELINE)?,
        signal,
        switch: adapter.get_bool("strategy", "switch", false),
    })
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, BacksimError> {
    let mut config = BacktestConfig::new(require(adapter, "data", "symbol")?, build_strategy(adapter)?);
    config.benchmark = adapter
        .get_string("data", "benchmark")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    config.start_date = read_date(adapter, "data", "start_date")?;
    config.end_date = read_date(adapter, "data", "end_date")?;
    config.simulation = read_simulation_config(adapter)?;
    config.risk_free_rate = read_number(adapter, "backtest", "risk_free_rate", DEFAULT_RISK_FREE_RATE)?;
    Ok(config)
}

/// `-o` when given, else `[output] dir`, else the working directory.
pub fn resolve_output_dir(output: Option<&Path>, adapter: &dyn ConfigPort) -> PathBuf {
    output
        .map(Path::to_path_buf)
        .or_else(|| adapter.get_string("output", "dir").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn load_validated(config_path: &Path) -> Result<(FileConfigAdapter, BacktestConfig), ExitCode> {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = load_config(config_path)?;
    validate_config(&adapter).map_err(|e| fail(&e))?;
    let bt_config = build_backtest_config(&adapter).map_err(|e| fail(&e))?;
    Ok((adapter, bt_config))
}

fn run_backtest(config_path: &Path, output: Option<&Path>) -> ExitCode {
    let (adapter, bt_config) = match load_validated(config_path) {
        Ok(loaded) => loaded,
        Err(code) => return code,
    };
    let data_dir = match require(&adapter, "data", "dir") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => return fail(&e),
    };
    let output_dir = resolve_output_dir(output, &adapter);

    let data_port = CsvAdapter::new(data_dir);
    let result = match run_backtest_pipeline(&data_port, &bt_config) {
        Ok(r) => r,
        Err(e) => return fail(&e),
    };

    print_summary(&result, &bt_config.strategy);

    if let Err(e) = CsvReportAdapter::new().write(&result, &bt_config.strategy, &output_dir) {
        return fail(&e);
    }
    eprintln!("\nReport written to: {}", output_dir.display());

    if result.report.is_insolvent() {
        eprintln!("warning: backtest ended insolvent");
        return ExitCode::from(EXIT_INSOLVENT);
    }
    ExitCode::SUCCESS
}

/// Fetch the symbol (and benchmark) bars and run one backtest.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    bt_config: &BacktestConfig,
) -> Result<BacktestResult, BacksimError> {
    let bars = data_port.fetch_ohlcv(&bt_config.symbol, bt_config.start_date, bt_config.end_date)?;
    let benchmark = match &bt_config.benchmark {
        Some(symbol) => Some(data_port.fetch_ohlcv(symbol, bt_config.start_date, bt_config.end_date)?),
        None => None,
    };

    eprintln!(
        "Running backtest: {} ({} bars), {}",
        bt_config.symbol,
        bars.len(),
        bt_config.strategy.describe()
    );
    backtest_engine::run_backtest(&bars, benchmark.as_deref(), bt_config)
}

fn metric(value: Option<f64>, precision: usize) -> String {
    value
        .map(|v| format!("{:.*}", precision, v))
        .unwrap_or_else(|| "n/a".to_string())
}

fn print_report(report: &PerformanceReport, trades: usize) {
    eprintln!("\n=== Results ===");
    eprintln!("Status:           {}", report.status);
    eprintln!("Trades:           {}", trades);
    eprintln!("Final Value:      {}", metric(report.final_value, 2));
    eprintln!("Overall Return:   {}%", metric(report.overall_return, 2));
    eprintln!("Benchmark Return: {}%", metric(report.benchmark_return, 2));
    eprintln!("Sharpe Ratio:     {}", metric(report.sharpe_ratio, 2));
    eprintln!("Beta:             {}", metric(report.beta, 2));
    eprintln!("Treynor Ratio:    {}", metric(report.treynor_ratio, 2));
    eprintln!(
        "Max Drawdown:     -{}%",
        metric(report.max_drawdown.map(|d| d * 100.0), 1)
    );
}

fn print_summary(result: &BacktestResult, strategy: &Strategy) {
    eprintln!("\nStrategy: {} ({})", strategy.name, strategy.describe());
    eprintln!("Signals:  {} active of {}", result.signals.active_count(), result.signals.len());
    print_report(&result.report, result.simulation.trades);
}

pub fn run_dry_run(config_path: &Path) -> ExitCode {
    let (adapter, bt_config) = match load_validated(config_path) {
        Ok(loaded) => loaded,
        Err(code) => return code,
    };
    eprintln!("Config validated successfully");

    let strategy = &bt_config.strategy;
    let sim = &bt_config.simulation;
    eprintln!("\nStrategy: {}", strategy.name);
    eprintln!("  trend:    {}", strategy.trend);
    eprintln!("  baseline: {}", strategy.baseline);
    eprintln!("  signal:   {}", strategy.signal.name());
    eprintln!("  switch:   {}", strategy.switch);

    eprintln!("\nData:");
    eprintln!("  symbol:    {}", bt_config.symbol);
    eprintln!(
        "  benchmark: {}",
        bt_config.benchmark.as_deref().unwrap_or("none")
    );
    let range = |d: Option<chrono::NaiveDate>| d.map(|d| d.to_string()).unwrap_or_else(|| "open".into());
    eprintln!("  range:     {} to {}", range(bt_config.start_date), range(bt_config.end_date));

    eprintln!("\nSimulation:");
    eprintln!("  initial value: {}", sim.initial_value);
    eprintln!("  seed fraction: {}", sim.seed_fraction);
    eprintln!("  numtrades:     {}", sim.numtrades);
    eprintln!("  cost:          {}", sim.transaction_cost);
    eprintln!("  valuation:     {:?}", sim.valuation);
    eprintln!(
        "  output dir:    {}",
        resolve_output_dir(None, &adapter).display()
    );

    eprintln!("\nDry run complete: configuration is valid");
    ExitCode::SUCCESS
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_config(&adapter) {
        return fail(&e);
    }

    for (key, default) in [("trend", DEFAULT_TREND), ("baseline", DEFAULT_BASELINE)] {
        let raw = adapter
            .get_string("strategy", key)
            .unwrap_or_else(|| default.to_string());
        match read_indicator(&adapter, key, default) {
            Ok(indicator) => eprintln!("  {:<9} {} (raw: {})", format!("{key}:"), indicator, raw.trim()),
            Err(e) => return fail(&e),
        }
    }

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn parse_indicators(texts: &[String]) -> Result<Vec<IndicatorType>, ExitCode> {
    texts
        .iter()
        .map(|text| {
            parse_indicator(text).map_err(|e| {
                eprintln!("error: {}", e.display_with_context(text));
                ExitCode::from(&BacksimError::from(e))
            })
        })
        .collect()
}

fn run_indicators(
    data_dir: &Path,
    symbol: &str,
    texts: &[String],
    benchmark: Option<&str>,
    output: &Path,
) -> ExitCode {
    let indicators = match parse_indicators(texts) {
        Ok(i) => i,
        Err(code) => return code,
    };

    let data_port = CsvAdapter::new(data_dir.to_path_buf());
    let bars = match data_port.fetch_ohlcv(symbol, None, None) {
        Ok(b) => b,
        Err(e) => return fail(&e),
    };
    if bars.is_empty() {
        return fail(&BacksimError::NoData {
            symbol: symbol.to_string(),
        });
    }
    let benchmark = match benchmark.map(|b| data_port.fetch_ohlcv(b, None, None)) {
        Some(Ok(b)) => Some(TimeSeries::closes(&b)),
        Some(Err(e)) => return fail(&e),
        None => None,
    };

    let mut columns: Vec<IndicatorColumn> = Vec::new();
    for indicator in &indicators {
        match compute_indicator(&bars, benchmark.as_ref(), indicator) {
            Ok(out) => columns.extend(out.columns),
            Err(e) => return fail(&e),
        }
    }

    if let Err(e) = CsvReportAdapter::new().write_indicators(&columns, output) {
        return fail(&e);
    }
    eprintln!(
        "{} columns for {} ({} bars) written to {}",
        columns.len(),
        symbol,
        bars.len(),
        output.display()
    );
    ExitCode::SUCCESS
}

fn run_simulate(
    data_dir: &Path,
    symbol: &str,
    signals_path: &Path,
    simulation: &SimulationConfig,
    risk_free_rate: f64,
    output: Option<&Path>,
) -> ExitCode {
    if let Err(e) = validate_simulation(simulation) {
        return fail(&e);
    }

    let data_port = CsvAdapter::new(data_dir.to_path_buf());
    let bars = match data_port.fetch_ohlcv(symbol, None, None) {
        Ok(b) => b,
        Err(e) => return fail(&e),
    };
    let signals = match read_signals(signals_path) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    let prices = TimeSeries::closes(&bars);
    let result = match portfolio::simulate(&prices, &signals, simulation) {
        Ok(r) => r,
        Err(e) => return fail(&e),
    };
    let report = PerformanceReport::compute(&result.equity, None, risk_free_rate, result.insolvent_on);
    print_report(&report, result.trades);

    if let Some(path) = output {
        let column = IndicatorColumn {
            name: "equity".to_string(),
            series: result.equity.clone(),
        };
        if let Err(e) = CsvReportAdapter::new().write_indicators(&[column], path) {
            return fail(&e);
        }
        eprintln!("\nEquity curve written to: {}", path.display());
    }

    if report.is_insolvent() {
        return ExitCode::from(EXIT_INSOLVENT);
    }
    ExitCode::SUCCESS
}

fn run_list_symbols(data_dir: &Path) -> ExitCode {
    let adapter = CsvAdapter::new(data_dir.to_path_buf());
    let symbols = match adapter.list_symbols() {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    if symbols.is_empty() {
        eprintln!("No symbols found in {}", data_dir.display());
        return ExitCode::SUCCESS;
    }
    for symbol in &symbols {
        match adapter.get_data_range(symbol) {
            Ok(Some((first, last, count))) => {
                println!("{}: {} bars, {} to {}", symbol, count, first, last)
            }
            Ok(None) => println!("{}: no data", symbol),
            Err(e) => eprintln!("error reading {}: {}", symbol, e),
        }
    }
    eprintln!("{} symbols found", symbols.len());
    ExitCode::SUCCESS
}
