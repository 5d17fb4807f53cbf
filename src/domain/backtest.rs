//! Backtest pipeline: indicators, signals, simulation, metrics.
//!
//! `BacktestConfig` holds everything one run needs; `run_backtest` chains the
//! four stages over one symbol's bars and keeps every intermediate output so
//! it can be written out.

use chrono::NaiveDate;
use tracing::info;

use crate::domain::error::BacksimError;
use crate::domain::indicator::compute_indicator;
use crate::domain::metrics::{DEFAULT_RISK_FREE_RATE, PerformanceReport};
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::portfolio::{SimulationConfig, SimulationResult, simulate};
use crate::domain::series::{TimeSeries, check_increasing};
use crate::domain::signal::SignalSeries;
use crate::domain::strategy::Strategy;

/// Fewest bars a backtest accepts.
pub const MIN_BARS: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub symbol: String,
    pub benchmark: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub strategy: Strategy,
    pub simulation: SimulationConfig,
    pub risk_free_rate: f64,
}

impl BacktestConfig {
    pub fn new(symbol: impl Into<String>, strategy: Strategy) -> Self {
        BacktestConfig {
            symbol: symbol.into(),
            benchmark: None,
            start_date: None,
            end_date: None,
            strategy,
            simulation: SimulationConfig::default(),
            risk_free_rate: DEFAULT_RISK_FREE_RATE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub symbol: String,
    pub prices: TimeSeries,
    pub trend: TimeSeries,
    pub baseline: TimeSeries,
    pub signals: SignalSeries,
    pub simulation: SimulationResult,
    pub report: PerformanceReport,
}

pub fn run_backtest(
    bars: &[OhlcvBar],
    benchmark: Option<&[OhlcvBar]>,
    config: &BacktestConfig,
) -> Result<BacktestResult, BacksimError> {
    if bars.is_empty() {
        return Err(BacksimError::NoData {
            symbol: config.symbol.clone(),
        });
    }
    if bars.len() < MIN_BARS {
        return Err(BacksimError::InsufficientData {
            symbol: config.symbol.clone(),
            bars: bars.len(),
            minimum: MIN_BARS,
        });
    }
    check_increasing(bars.iter().map(|b| b.date))?;

    let benchmark_close = match benchmark {
        Some(b) => {
            check_increasing(b.iter().map(|bar| bar.date))?;
            Some(TimeSeries::closes(b))
        }
        None => None,
    };

    let strategy = &config.strategy;
    info!(
        "backtesting {} over {} bars: {}",
        config.symbol,
        bars.len(),
        strategy.describe()
    );

    let trend = compute_indicator(bars, benchmark_close.as_ref(), &strategy.trend)?.into_single()?;
    let baseline =
        compute_indicator(bars, benchmark_close.as_ref(), &strategy.baseline)?.into_single()?;

    let signals = strategy.signal.generate(&trend, &baseline, strategy.switch)?;
    info!("generated {} active signals", signals.active_count());

    let prices = TimeSeries::closes(bars);
    let simulation = simulate(&prices, &signals, &config.simulation)?;
    let report = PerformanceReport::compute(
        &simulation.equity,
        benchmark_close.as_ref(),
        config.risk_free_rate,
        simulation.insolvent_on,
    );
    info!(
        "{}: {} trades, status {}",
        config.symbol, simulation.trades, report.status
    );

    Ok(BacktestResult {
        symbol: config.symbol.clone(),
        prices,
        trend,
        baseline,
        signals,
        simulation,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::IndicatorType;
    use crate::domain::metrics::BacktestStatus;
    use crate::domain::signal::SignalStrategy;
    use chrono::Days;

    fn bars(closes: &[f64]) -> Vec<OhlcvBar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                OhlcvBar::from_close(
                    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Days::new(i as u64),
                    c,
                )
            })
            .collect()
    }

    fn sma_cross(trend: usize, baseline: usize) -> BacktestConfig {
        let mut config = BacktestConfig::new(
            "TEST",
            Strategy {
                name: "sma cross".into(),
                trend: IndicatorType::Sma(trend),
                baseline: IndicatorType::Sma(baseline),
                signal: SignalStrategy::Crossover,
                switch: false,
            },
        );
        config.simulation.initial_value = 1000.0;
        config
    }

    #[test]
    fn golden_vector_no_signals() {
        let result = run_backtest(&bars(&[100.0, 102.0, 99.0, 105.0, 103.0]), None, &sma_cross(2, 4))
            .unwrap();
        assert_eq!(result.signals.active_count(), 0);
        assert_eq!(result.simulation.equity.values(), vec![Some(1000.0); 5]);
        assert_eq!(result.report.status, BacktestStatus::Completed);
    }

    #[test]
    fn empty_bars_is_no_data() {
        let err = run_backtest(&[], None, &sma_cross(2, 4)).unwrap_err();
        assert!(matches!(err, BacksimError::NoData { .. }));
    }

    #[test]
    fn single_bar_is_insufficient() {
        let err = run_backtest(&bars(&[100.0]), None, &sma_cross(2, 4)).unwrap_err();
        assert!(matches!(err, BacksimError::InsufficientData { bars: 1, .. }));
    }

    #[test]
    fn multi_valued_trend_rejected() {
        let mut config = sma_cross(2, 4);
        config.strategy.trend = IndicatorType::Macd;
        let err = run_backtest(&bars(&[1.0, 2.0, 3.0]), None, &config).unwrap_err();
        assert!(matches!(err, BacksimError::UnsupportedInput { .. }));
    }

    #[test]
    fn benchmark_feeds_report() {
        let result = run_backtest(
            &bars(&[100.0, 101.0, 102.0]),
            Some(&bars(&[50.0, 55.0, 60.0])),
            &sma_cross(1, 2),
        )
        .unwrap();
        assert_eq!(result.report.benchmark_return, Some(20.0));
    }
}
