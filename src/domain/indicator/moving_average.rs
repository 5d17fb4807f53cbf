//! Moving averages and the `MovingAverage` dispatch enum.

use std::fmt;

use crate::domain::indicator::momentum::cmo_values;
use crate::domain::indicator_helpers::{mean, rolling};
use crate::domain::series::{TimeSeries, zip_values};

/// Volume factor used by T3/T4 when none is given.
pub const DEFAULT_VOLUME_FACTOR: f64 = 0.7;

/// Averages that other indicators can be parameterised with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MovingAverage {
    Sma,
    Ema,
    Tma,
    Zlema,
    Vma,
}

impl MovingAverage {
    pub fn apply(&self, series: &TimeSeries, period: usize) -> TimeSeries {
        series.with_values(self.apply_values(&series.values(), period))
    }

    pub(crate) fn apply_values(&self, x: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
        match self {
            MovingAverage::Sma => sma_values(x, period),
            MovingAverage::Ema => ema_values(x, period),
            MovingAverage::Tma => tma_values(x, period),
            MovingAverage::Zlema => zlema_values(x, period),
            MovingAverage::Vma => vma_values(x, period),
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "SMA" => Some(MovingAverage::Sma),
            "EMA" => Some(MovingAverage::Ema),
            "TMA" => Some(MovingAverage::Tma),
            "ZLEMA" => Some(MovingAverage::Zlema),
            "VMA" => Some(MovingAverage::Vma),
            _ => None,
        }
    }
}

impl fmt::Display for MovingAverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MovingAverage::Sma => "SMA",
            MovingAverage::Ema => "EMA",
            MovingAverage::Tma => "TMA",
            MovingAverage::Zlema => "ZLEMA",
            MovingAverage::Vma => "VMA",
        };
        f.write_str(name)
    }
}

/// Simple moving average over the `period` most recent points.
pub fn sma(series: &TimeSeries, period: usize) -> TimeSeries {
    series.with_values(sma_values(&series.values(), period))
}

/// Exponential moving average, `k = 2 / (period + 1)`.
///
/// Seeds at the first defined input, so it can be chained onto indicators
/// with a warm-up.
pub fn ema(series: &TimeSeries, period: usize) -> TimeSeries {
    series.with_values(ema_values(&series.values(), period))
}

/// Double exponential moving average: `2 * ema - ema(ema)`.
pub fn dema(series: &TimeSeries, period: usize) -> TimeSeries {
    series.with_values(dema_values(&series.values(), period))
}

/// Triple exponential moving average: `3 * e1 - 3 * e2 + e3`.
pub fn tema(series: &TimeSeries, period: usize) -> TimeSeries {
    series.with_values(tema_values(&series.values(), period))
}

/// Tillson T3: the generalized DEMA applied three times.
pub fn t3(series: &TimeSeries, period: usize, volume_factor: f64) -> TimeSeries {
    series.with_values(tillson_values(&series.values(), period, volume_factor, 3))
}

/// Tillson T4: the generalized DEMA applied four times.
pub fn t4(series: &TimeSeries, period: usize, volume_factor: f64) -> TimeSeries {
    series.with_values(tillson_values(&series.values(), period, volume_factor, 4))
}

/// Triangular moving average: `SMA(SMA(x, ceil(n/2) + 1), ceil(n/2))`.
pub fn tma(series: &TimeSeries, period: usize) -> TimeSeries {
    series.with_values(tma_values(&series.values(), period))
}

/// Zero-lag EMA: EMA of `2 * x[i] - x[i - lag]` with `lag = (n - 1) / 2`.
pub fn zlema(series: &TimeSeries, period: usize) -> TimeSeries {
    series.with_values(zlema_values(&series.values(), period))
}

/// Variable moving average, with the smoothing constant scaled by |CMO(9)|.
pub fn vma(series: &TimeSeries, period: usize) -> TimeSeries {
    series.with_values(vma_values(&series.values(), period))
}

pub(crate) fn sma_values(x: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    rolling(x, period, None, |w| Some(mean(w)))
}

pub(crate) fn ema_values(x: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; x.len()];
    if period == 0 {
        return out;
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut state: Option<f64> = None;
    for (i, v) in x.iter().enumerate() {
        let Some(v) = *v else { continue };
        let next = match state {
            None => v,
            Some(prev) => prev + k * (v - prev),
        };
        state = Some(next);
        out[i] = Some(next);
    }
    out
}

pub(crate) fn dema_values(x: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let e1 = ema_values(x, period);
    let e2 = ema_values(&e1, period);
    zip_values(&e1, &e2, |a, b| Some(2.0 * a - b))
}

pub(crate) fn tema_values(x: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let e1 = ema_values(x, period);
    let e2 = ema_values(&e1, period);
    let e3 = ema_values(&e2, period);
    let partial = zip_values(&e1, &e2, |a, b| Some(3.0 * a - 3.0 * b));
    zip_values(&partial, &e3, |p, c| Some(p + c))
}

fn generalized_dema(x: &[Option<f64>], period: usize, v: f64) -> Vec<Option<f64>> {
    let e1 = ema_values(x, period);
    let e2 = ema_values(&e1, period);
    zip_values(&e1, &e2, |a, b| Some(a * (1.0 + v) - b * v))
}

fn tillson_values(
    x: &[Option<f64>],
    period: usize,
    volume_factor: f64,
    passes: usize,
) -> Vec<Option<f64>> {
    let mut out = x.to_vec();
    for _ in 0..passes {
        out = generalized_dema(&out, period, volume_factor);
    }
    out
}

pub(crate) fn tma_values(x: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; x.len()];
    }
    let half = period.div_ceil(2);
    sma_values(&sma_values(x, half + 1), half)
}

pub(crate) fn zlema_values(x: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; x.len()];
    }
    let lag = (period - 1) / 2;
    let mut de_lagged = vec![None; x.len()];
    for i in lag..x.len() {
        if let (Some(cur), Some(old)) = (x[i], x[i - lag]) {
            de_lagged[i] = Some(2.0 * cur - old);
        }
    }
    ema_values(&de_lagged, period)
}

pub(crate) fn vma_values(x: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; x.len()];
    if period == 0 {
        return out;
    }

    let cmo = cmo_values(x, 9);
    let smoothing = 2.0 / (period as f64 + 1.0);
    let mut state: Option<f64> = None;

    for i in 1..x.len() {
        let (Some(price), Some(cmo)) = (x[i], cmo[i]) else {
            continue;
        };
        let Some(prev) = state.or(x[i - 1]) else {
            continue;
        };
        let k = smoothing * cmo.abs() / 100.0;
        let next = k * price + (1.0 - k) * prev;
        state = Some(next);
        out[i] = Some(next);
    }
    out
}
