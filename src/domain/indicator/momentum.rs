//! Momentum indicators and oscillators.

use crate::domain::indicator::moving_average::{MovingAverage, ema_values, sma_values};
use crate::domain::indicator_helpers::{changes, rolling, sample_stddev};
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::series::{TimeSeries, ratio, zip_values};

/// Window used by RSI and the stochastic RSI.
pub const RSI_PERIOD: usize = 14;

/// Fast and slow %D lines of the stochastic oscillator.
#[derive(Debug, Clone, PartialEq)]
pub struct StochasticOscillator {
    pub fast_d: TimeSeries,
    pub slow_d: TimeSeries,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Aroon {
    pub up: TimeSeries,
    pub down: TimeSeries,
}

/// Slow average minus fast average, raw and as a percentage of the fast one.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceOscillator {
    pub difference: TimeSeries,
    pub percent: TimeSeries,
}

/// Chande momentum oscillator: `100 * (ups - downs) / (ups + downs)` over
/// the last `period` one-step changes.
pub fn cmo(series: &TimeSeries, period: usize) -> TimeSeries {
    series.with_values(cmo_values(&series.values(), period))
}

/// Relative momentum index over `period`-step momentum, with Wilder-style
/// averages of the up and down moves.
pub fn rmi(series: &TimeSeries, period: usize) -> TimeSeries {
    series.with_values(rmi_values(&series.values(), period))
}

/// RSI, the relative momentum index with a 14-period window.
pub fn rsi(series: &TimeSeries) -> TimeSeries {
    rmi(series, RSI_PERIOD)
}

/// Where the latest value sits in the window's range, scaled to 0..100.
pub fn general_stochastic(series: &TimeSeries, period: usize) -> TimeSeries {
    series.with_values(general_stochastic_values(&series.values(), period))
}

pub fn stochastic_oscillator(
    series: &TimeSeries,
    average: MovingAverage,
    period: usize,
) -> StochasticOscillator {
    let percent_k = general_stochastic_values(&series.values(), period);
    let fast_d = average.apply_values(&percent_k, period);
    let slow_d = average.apply_values(&fast_d, period);
    StochasticOscillator {
        fast_d: series.with_values(fast_d),
        slow_d: series.with_values(slow_d),
    }
}

/// General stochastic of RSI, both over 14 periods.
pub fn stochastic_rsi(series: &TimeSeries) -> TimeSeries {
    let rsi = rmi_values(&series.values(), RSI_PERIOD);
    series.with_values(general_stochastic_values(&rsi, RSI_PERIOD))
}

/// Aroon up/down: `100 * (n - periods_since_extremum) / n`, measured from
/// the earliest high (or low) in the window.
pub fn aroon(series: &TimeSeries, period: usize) -> Aroon {
    let n = period as f64;
    let pairs = rolling(&series.values(), period, (None, None), |w| {
        let (mut hi, mut lo) = (0, 0);
        for (j, v) in w.iter().enumerate() {
            if *v > w[hi] {
                hi = j;
            }
            if *v < w[lo] {
                lo = j;
            }
        }
        let score = |idx: usize| {
            let since = (w.len() - 1 - idx) as f64;
            Some(100.0 * (n - since) / n)
        };
        (score(hi), score(lo))
    });
    let (up, down): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();
    Aroon {
        up: series.with_values(up),
        down: series.with_values(down),
    }
}

pub fn aroon_oscillator(series: &TimeSeries, period: usize) -> TimeSeries {
    let Aroon { up, down } = aroon(series, period);
    series.with_values(zip_values(&up.values(), &down.values(), |u, d| Some(u - d)))
}

pub fn price_oscillator(
    series: &TimeSeries,
    average: MovingAverage,
    slow: usize,
    fast: usize,
) -> PriceOscillator {
    let x = series.values();
    let slow_ma = average.apply_values(&x, slow);
    let fast_ma = average.apply_values(&x, fast);
    let difference = zip_values(&slow_ma, &fast_ma, |s, f| Some(s - f));
    let percent = zip_values(&difference, &fast_ma, |d, f| ratio(100.0 * d, f));
    PriceOscillator {
        difference: series.with_values(difference),
        percent: series.with_values(percent),
    }
}

/// MACD as a price oscillator on EMA(26) and EMA(12).
pub fn macd(series: &TimeSeries) -> PriceOscillator {
    price_oscillator(series, MovingAverage::Ema, 26, 12)
}

/// `100 * (EMA_fast(volume) - EMA_slow(volume)) / EMA_fast(volume)`.
pub fn percent_volume_oscillator(bars: &[OhlcvBar], slow: usize, fast: usize) -> TimeSeries {
    let volume = TimeSeries::from_bars(bars, |b| b.volume as f64);
    let x = volume.values();
    let fast_ema = ema_values(&x, fast);
    let slow_ema = ema_values(&x, slow);
    volume.with_values(zip_values(&fast_ema, &slow_ema, |f, s| {
        ratio(100.0 * (f - s), f)
    }))
}

/// Moving average of `close - open`.
pub fn qstick(bars: &[OhlcvBar], average: MovingAverage, period: usize) -> TimeSeries {
    average.apply(&TimeSeries::from_bars(bars, |b| b.close - b.open), period)
}

/// Previous price minus the SMA of the window ending at the current point.
pub fn detrended_price_oscillator(series: &TimeSeries, period: usize) -> TimeSeries {
    let x = series.values();
    let sma = sma_values(&x, period);
    let mut out = vec![None; x.len()];
    for i in 1..x.len() {
        if let (Some(prev), Some(avg)) = (x[i - 1], sma[i]) {
            out[i] = Some(prev - avg);
        }
    }
    series.with_values(out)
}

/// `14 * SMA(sd5, 10) / sd5`, where `sd5` is the 5-period sample deviation.
pub fn dynamic_momentum_index(series: &TimeSeries) -> TimeSeries {
    let sd5 = rolling(&series.values(), 5, None, sample_stddev);
    let smoothed = sma_values(&sd5, 10);
    series.with_values(zip_values(&smoothed, &sd5, |s, d| ratio(14.0 * s, d)))
}

pub(crate) fn cmo_values(x: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    rolling(&changes(x), period, None, |w| {
        let ups: f64 = w.iter().filter(|c| **c > 0.0).sum();
        let downs: f64 = w.iter().filter(|c| **c < 0.0).map(|c| -c).sum();
        ratio(100.0 * (ups - downs), ups + downs)
    })
}

pub(crate) fn rmi_values(x: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; x.len()];
    if period == 0 {
        return out;
    }

    let n = period as f64;
    let (mut up_avg, mut down_avg) = (0.0, 0.0);
    for i in period..x.len() {
        let (Some(cur), Some(old)) = (x[i], x[i - period]) else {
            continue;
        };
        let momentum = cur - old;
        up_avg = (up_avg * (n - 1.0) + momentum.max(0.0)) / n;
        down_avg = (down_avg * (n - 1.0) + (-momentum).max(0.0)) / n;
        out[i] = ratio(100.0 * up_avg, up_avg + down_avg);
    }
    out
}

pub(crate) fn general_stochastic_values(x: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    rolling(x, period, None, |w| {
        let max = w.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = w.iter().copied().fold(f64::INFINITY, f64::min);
        let last = w[w.len() - 1];
        ratio(100.0 * (last - min), max - min)
    })
}
