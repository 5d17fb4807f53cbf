//! Return and risk metrics over equity curves.
//!
//! Returns are expressed in percent relative to the first point. All moments
//! are population moments. Every metric is `None` when it is undefined:
//! empty input, a zero starting value, or a zero deviation or beta.

use std::fmt;

use chrono::NaiveDate;

use crate::domain::indicator_helpers::{mean, population_stddev};
use crate::domain::series::{TimeSeries, align_defined, ratio};

/// Risk-free rate in percent, in the same units as rolling returns.
pub const DEFAULT_RISK_FREE_RATE: f64 = 1.94;

/// `100 * (s - s[0]) / |s[0]|` at every point. All undefined when the first
/// point is undefined or zero.
pub fn rolling_returns(series: &TimeSeries) -> TimeSeries {
    let base = series.get(0).filter(|b| *b != 0.0);
    series.map(|v| base.and_then(|b| ratio(100.0 * (v - b), b.abs())))
}

/// Percent change from the first point to the last.
pub fn overall_return(series: &TimeSeries) -> Option<f64> {
    let first = series.points().first()?.value?;
    let last = series.points().last()?.value?;
    ratio(100.0 * (last - first), first.abs())
}

/// `(mean(rolling returns) - rf) / sd(rolling returns)`.
pub fn sharpe_ratio(series: &TimeSeries, risk_free_rate: f64) -> Option<f64> {
    let returns = rolling_returns(series).defined_values();
    if returns.is_empty() {
        return None;
    }
    ratio(mean(&returns) - risk_free_rate, population_stddev(&returns))
}

/// `cov(asset, baseline) / var(baseline)` over the dates both define.
pub fn beta(asset: &TimeSeries, baseline: &TimeSeries) -> Option<f64> {
    let (a, b) = align_defined(asset, baseline);
    beta_of(&a, &b)
}

/// `(mean(rolling returns) - rf) / beta(asset, baseline)`.
pub fn treynor_ratio(asset: &TimeSeries, baseline: &TimeSeries, risk_free_rate: f64) -> Option<f64> {
    let returns = rolling_returns(asset).defined_values();
    if returns.is_empty() {
        return None;
    }
    ratio(mean(&returns) - risk_free_rate, beta(asset, baseline)?)
}

/// Largest peak-to-trough fall, as a fraction of the peak.
pub fn max_drawdown(series: &TimeSeries) -> Option<f64> {
    let values = series.defined_values();
    let mut peak = *values.first()?;
    let mut max_dd = 0.0_f64;

    for v in values {
        if v > peak {
            peak = v;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - v) / peak);
        }
    }
    Some(max_dd)
}

fn beta_of(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.is_empty() || a.len() != b.len() {
        return None;
    }
    let (ma, mb) = (mean(a), mean(b));
    let n = a.len() as f64;
    let cov = a.iter().zip(b).map(|(x, y)| (x - ma) * (y - mb)).sum::<f64>() / n;
    let var = b.iter().map(|y| (y - mb) * (y - mb)).sum::<f64>() / n;
    ratio(cov, var)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BacktestStatus {
    Completed,
    /// The run halted on this date with no cash left.
    Insolvent(NaiveDate),
}

impl fmt::Display for BacktestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BacktestStatus::Completed => write!(f, "completed"),
            BacktestStatus::Insolvent(date) => write!(f, "insolvent on {}", date),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceReport {
    pub initial_value: Option<f64>,
    pub final_value: Option<f64>,
    pub overall_return: Option<f64>,
    pub benchmark_return: Option<f64>,
    pub sharpe_ratio: Option<f64>,
    pub beta: Option<f64>,
    pub treynor_ratio: Option<f64>,
    pub max_drawdown: Option<f64>,
    pub status: BacktestStatus,
}

impl PerformanceReport {
    pub fn compute(
        equity: &TimeSeries,
        benchmark: Option<&TimeSeries>,
        risk_free_rate: f64,
        insolvent_on: Option<NaiveDate>,
    ) -> Self {
        PerformanceReport {
            initial_value: equity.first_defined().and_then(|p| p.value),
            final_value: equity.last_defined().and_then(|p| p.value),
            overall_return: overall_return(equity),
            benchmark_return: benchmark.and_then(overall_return),
            sharpe_ratio: sharpe_ratio(equity, risk_free_rate),
            beta: benchmark.and_then(|b| beta(equity, b)),
            treynor_ratio: benchmark.and_then(|b| treynor_ratio(equity, b, risk_free_rate)),
            max_drawdown: max_drawdown(equity),
            status: match insolvent_on {
                Some(date) => BacktestStatus::Insolvent(date),
                None => BacktestStatus::Completed,
            },
        }
    }

    pub fn is_insolvent(&self) -> bool {
        matches!(self.status, BacktestStatus::Insolvent(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::Days;

    fn series(values: &[f64]) -> TimeSeries {
        let dates: Vec<NaiveDate> = (0..values.len())
            .map(|i| NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Days::new(i as u64))
            .collect();
        TimeSeries::from_values(&dates, values).unwrap()
    }

    #[test]
    fn rolling_returns_relative_to_first() {
        let r = rolling_returns(&series(&[100.0, 110.0, 90.0]));
        assert_eq!(r.get(0), Some(0.0));
        assert_relative_eq!(r.get(1).unwrap(), 10.0);
        assert_relative_eq!(r.get(2).unwrap(), -10.0);
    }

    #[test]
    fn rolling_returns_negative_base_uses_magnitude() {
        let r = rolling_returns(&series(&[-100.0, -50.0]));
        assert_relative_eq!(r.get(1).unwrap(), 50.0);
    }

    #[test]
    fn zero_start_is_undefined() {
        let s = series(&[0.0, 10.0]);
        assert_eq!(overall_return(&s), None);
        assert!(rolling_returns(&s).values().iter().all(Option::is_none));
        assert_eq!(sharpe_ratio(&s, 0.0), None);
    }

    #[test]
    fn overall_return_basic() {
        assert_relative_eq!(overall_return(&series(&[200.0, 150.0, 250.0])).unwrap(), 25.0);
        assert_eq!(overall_return(&TimeSeries::default()), None);
    }

    #[test]
    fn sharpe_of_flat_curve_is_undefined() {
        assert_eq!(sharpe_ratio(&series(&[1000.0; 5]), DEFAULT_RISK_FREE_RATE), None);
    }

    #[test]
    fn sharpe_value() {
        // returns [0, 10], mean 5, sd 5
        let s = sharpe_ratio(&series(&[100.0, 110.0]), 1.0).unwrap();
        assert_relative_eq!(s, 0.8);
    }

    #[test]
    fn beta_of_scaled_series() {
        let base = series(&[1.0, 2.0, 3.0, 4.0]);
        let asset = series(&[2.0, 4.0, 6.0, 8.0]);
        assert_relative_eq!(beta(&asset, &base).unwrap(), 2.0);
    }

    #[test]
    fn beta_of_flat_baseline_is_undefined() {
        let base = series(&[5.0, 5.0, 5.0]);
        let asset = series(&[1.0, 2.0, 3.0]);
        assert_eq!(beta(&asset, &base), None);
    }

    #[test]
    fn treynor_value() {
        // cov 25 / var 6.25 on the raw prices gives beta 4; asset returns mean 10
        let asset = series(&[100.0, 120.0]);
        let base = series(&[50.0, 55.0]);
        assert_relative_eq!(beta(&asset, &base).unwrap(), 4.0);
        assert_relative_eq!(treynor_ratio(&asset, &base, 2.0).unwrap(), 2.0);
    }

    #[test]
    fn treynor_uses_raw_price_beta() {
        // same returns, different price scale: beta and treynor follow the prices
        let asset = series(&[10.0, 12.0, 11.0]);
        let base = series(&[50.0, 55.0, 60.0]);
        let b = beta(&asset, &base).unwrap();
        let returns = rolling_returns(&asset).defined_values();
        let expected = (mean(&returns) - 1.0) / b;
        assert_relative_eq!(treynor_ratio(&asset, &base, 1.0).unwrap(), expected);
    }

    #[test]
    fn treynor_of_flat_baseline_is_undefined() {
        let asset = series(&[1.0, 2.0, 3.0]);
        assert_eq!(treynor_ratio(&asset, &series(&[5.0, 5.0, 5.0]), 0.0), None);
    }

    #[test]
    fn max_drawdown_fraction() {
        let dd = max_drawdown(&series(&[100.0, 120.0, 90.0, 130.0])).unwrap();
        assert_relative_eq!(dd, 0.25);
    }

    #[test]
    fn report_flags_insolvency() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        let report = PerformanceReport::compute(&series(&[1000.0, 900.0]), None, 0.0, Some(date));
        assert!(report.is_insolvent());
        assert_eq!(report.status.to_string(), "insolvent on 2024-01-03");
        assert_eq!(report.beta, None);
        assert_relative_eq!(report.overall_return.unwrap(), -10.0);
    }

    #[test]
    fn report_with_benchmark() {
        let report = PerformanceReport::compute(
            &series(&[100.0, 120.0]),
            Some(&series(&[50.0, 55.0])),
            2.0,
            None,
        );
        assert_eq!(report.status, BacktestStatus::Completed);
        assert_relative_eq!(report.beta.unwrap(), 4.0);
        assert_eq!(report.beta, beta(&series(&[100.0, 120.0]), &series(&[50.0, 55.0])));
        assert_relative_eq!(report.treynor_ratio.unwrap(), 2.0);
        assert_relative_eq!(report.benchmark_return.unwrap(), 10.0);
    }
}
