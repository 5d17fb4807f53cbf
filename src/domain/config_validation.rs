//! Configuration validation.
//!
//! Checks every field a backtest reads before any data is loaded, and
//! provides the typed readers the CLI uses to build a `BacktestConfig`.

use chrono::NaiveDate;
use tracing::warn;

use crate::domain::error::BacksimError;
use crate::domain::indicator::IndicatorType;
use crate::domain::indicator::parser::parse_indicator;
use crate::domain::metrics::DEFAULT_RISK_FREE_RATE;
use crate::domain::portfolio::{SimulationConfig, Valuation};
use crate::domain::signal::{SignalStrategy, ZScoreThresholds};
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_TREND: &str = "CLOSE";
pub const DEFAULT_BASELINE: &str = "SMA(90)";

/// Sections a backtest configuration may contain.
pub const KNOWN_SECTIONS: [&str; 4] = ["data", "strategy", "backtest", "output"];

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), BacksimError> {
    for section in config.sections() {
        if !KNOWN_SECTIONS.contains(&section.as_str()) {
            warn!("ignoring unknown config section [{}]", section);
        }
    }
    validate_data_config(config)?;
    validate_strategy_config(config)?;
    validate_backtest_config(config)?;
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), BacksimError> {
    require(config, "data", "dir")?;
    require(config, "data", "symbol")?;
    let start = read_date(config, "data", "start_date")?;
    let end = read_date(config, "data", "end_date")?;
    if let (Some(start), Some(end)) = (start, end) {
        if start >= end {
            return Err(invalid("data", "start_date", "start_date must be before end_date"));
        }
    }
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), BacksimError> {
    let trend = read_indicator(config, "trend", DEFAULT_TREND)?;
    let baseline = read_indicator(config, "baseline", DEFAULT_BASELINE)?;
    for (key, ty) in [("trend", &trend), ("baseline", &baseline)] {
        if !ty.is_single_valued() {
            return Err(invalid(
                "strategy",
                key,
                &format!("{} produces several series, pick one producing a single series", ty),
            ));
        }
        if ty.requires_benchmark() && config.get_string("data", "benchmark").is_none() {
            return Err(invalid("strategy", key, &format!("{} needs [data] benchmark", ty)));
        }
    }
    read_signal_strategy(config)?;
    Ok(())
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), BacksimError> {
    read_simulation_config(config)?;
    read_number(config, "backtest", "risk_free_rate", DEFAULT_RISK_FREE_RATE)?;
    Ok(())
}

/// Simulation parameters from `[backtest]`, defaulted and checked.
pub fn read_simulation_config(config: &dyn ConfigPort) -> Result<SimulationConfig, BacksimError> {
    let defaults = SimulationConfig::default();
    let numtrades = read_number(config, "backtest", "numtrades", defaults.numtrades as f64)?;
    if numtrades < 1.0 || numtrades.fract() != 0.0 {
        return Err(invalid("backtest", "numtrades", "numtrades must be a whole number of at least 1"));
    }

    let simulation = SimulationConfig {
        initial_value: read_number(config, "backtest", "initial_value", defaults.initial_value)?,
        seed_fraction: read_number(config, "backtest", "seed_fraction", defaults.seed_fraction)?,
        numtrades: numtrades as i64,
        transaction_cost: read_number(
            config,
            "backtest",
            "transaction_cost",
            defaults.transaction_cost,
        )?,
        valuation: if config.get_bool("backtest", "mark_to_market", false) {
            Valuation::MarkToMarket
        } else {
            Valuation::CashOnly
        },
    };
    validate_simulation(&simulation)?;
    Ok(simulation)
}

/// Range checks shared by INI and command-line simulation parameters.
pub fn validate_simulation(simulation: &SimulationConfig) -> Result<(), BacksimError> {
    if !(simulation.initial_value > 0.0) {
        return Err(invalid("backtest", "initial_value", "initial_value must be positive"));
    }
    if !(0.0..=1.0).contains(&simulation.seed_fraction) {
        return Err(invalid(
            "backtest",
            "seed_fraction",
            "seed_fraction must be between 0 and 1",
        ));
    }
    if simulation.numtrades < 1 {
        return Err(invalid("backtest", "numtrades", "numtrades must be at least 1"));
    }
    if !(simulation.transaction_cost >= 0.0) {
        return Err(invalid(
            "backtest",
            "transaction_cost",
            "transaction_cost must be non-negative",
        ));
    }
    Ok(())
}

/// Indicator text from `[strategy] <key>`, or `default` when unset.
pub fn read_indicator(
    config: &dyn ConfigPort,
    key: &str,
    default: &str,
) -> Result<IndicatorType, BacksimError> {
    let text = config
        .get_string("strategy", key)
        .unwrap_or_else(|| default.to_string());
    parse_indicator(&text).map_err(|e| invalid("strategy", key, &e.display_with_context(&text)))
}

/// `[strategy] signal` and, for z-score, `[strategy] thresholds`.
pub fn read_signal_strategy(config: &dyn ConfigPort) -> Result<SignalStrategy, BacksimError> {
    let kind = config
        .get_string("strategy", "signal")
        .unwrap_or_else(|| "crossover".to_string());
    match kind.trim().to_ascii_lowercase().as_str() {
        "crossover" => Ok(SignalStrategy::Crossover),
        "zscore" => Ok(SignalStrategy::ZScore(read_thresholds(config)?)),
        other => Err(invalid(
            "strategy",
            "signal",
            &format!("unknown signal '{}', expected crossover or zscore", other),
        )),
    }
}

fn read_thresholds(config: &dyn ConfigPort) -> Result<ZScoreThresholds, BacksimError> {
    let Some(text) = config.get_string("strategy", "thresholds") else {
        return Ok(ZScoreThresholds::default());
    };
    let parts: Vec<f64> = text
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|_| invalid("strategy", "thresholds", "thresholds must be numbers"))?;
    let [lower, clear, upper] = parts[..] else {
        return Err(invalid(
            "strategy",
            "thresholds",
            "thresholds must be three values: lower,clear,upper",
        ));
    };
    if lower > upper {
        return Err(invalid("strategy", "thresholds", "lower threshold exceeds upper"));
    }
    if clear < 0.0 {
        return Err(invalid("strategy", "thresholds", "clear threshold must be non-negative"));
    }
    Ok(ZScoreThresholds {
        lower,
        clear,
        upper,
    })
}

/// Optional `YYYY-MM-DD` date.
pub fn read_date(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<NaiveDate>, BacksimError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|_| invalid(section, key, &format!("invalid {} format, expected YYYY-MM-DD", key))),
    }
}

/// Numeric value, `default` when unset, an error when present but unparsable.
pub fn read_number(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, BacksimError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| invalid(section, key, &format!("'{}' is not a number", s))),
    }
}

pub fn require(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, BacksimError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(BacksimError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

fn invalid(section: &str, key: &str, reason: &str) -> BacksimError {
    BacksimError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
