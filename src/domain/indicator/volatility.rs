//! Volatility indicators: true range, ATR, Bollinger Bands, channels.

use crate::domain::indicator::moving_average::ema_values;
use crate::domain::indicator_helpers::{mean, population_stddev, rolling, wilder_average};
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::series::{TimeSeries, ratio};

#[derive(Debug, Clone, PartialEq)]
pub struct BollingerBands {
    pub lower: TimeSeries,
    pub middle: TimeSeries,
    pub upper: TimeSeries,
    /// `(upper - lower) / middle`
    pub width: TimeSeries,
    /// `(tp - lower) / (upper - lower)`
    pub percent_b: TimeSeries,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceChannel {
    pub high: TimeSeries,
    pub low: TimeSeries,
}

/// True range against the previous close; undefined on the first bar.
pub fn true_range(bars: &[OhlcvBar]) -> TimeSeries {
    let mut out = vec![None; bars.len()];
    for i in 1..bars.len() {
        out[i] = Some(bars[i].true_range(bars[i - 1].close));
    }
    TimeSeries::aligned(bars.iter().map(|b| b.date), out)
}

/// Average True Range using Wilder's smoothing.
///
/// The first bar's true range is its high-low span. The first ATR value is
/// the mean of the first `period` true ranges and lands at `period - 1`.
pub fn atr(bars: &[OhlcvBar], period: usize) -> TimeSeries {
    let tr: Vec<Option<f64>> = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            Some(if i == 0 {
                bar.high - bar.low
            } else {
                bar.true_range(bars[i - 1].close)
            })
        })
        .collect();
    TimeSeries::aligned(bars.iter().map(|b| b.date), wilder_average(&tr, period))
}

/// Bollinger Bands on typical price with a population standard deviation.
pub fn bollinger(bars: &[OhlcvBar], period: usize, multiplier: f64) -> BollingerBands {
    let tp = TimeSeries::from_bars(bars, OhlcvBar::typical_price);

    let rows = rolling(&tp.values(), period, None, |w| {
        let middle = mean(w);
        let band = multiplier * population_stddev(w);
        let last = w[w.len() - 1];
        let (lower, upper) = (middle - band, middle + band);
        Some(BandRow {
            lower,
            middle,
            upper,
            width: ratio(upper - lower, middle),
            percent_b: ratio(last - lower, upper - lower),
        })
    });

    let column = |f: fn(&BandRow) -> Option<f64>| {
        tp.with_values(rows.iter().map(|r| r.as_ref().and_then(f)).collect())
    };

    BollingerBands {
        lower: column(|r| Some(r.lower)),
        middle: column(|r| Some(r.middle)),
        upper: column(|r| Some(r.upper)),
        width: column(|r| r.width),
        percent_b: column(|r| r.percent_b),
    }
}

#[derive(Debug, Clone)]
struct BandRow {
    lower: f64,
    middle: f64,
    upper: f64,
    width: Option<f64>,
    percent_b: Option<f64>,
}

/// Rolling maximum and minimum.
pub fn price_channel(series: &TimeSeries, period: usize) -> PriceChannel {
    let pairs = rolling(&series.values(), period, (None, None), |w| {
        let max = w.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = w.iter().copied().fold(f64::INFINITY, f64::min);
        (Some(max), Some(min))
    });
    let (high, low): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();
    PriceChannel {
        high: series.with_values(high),
        low: series.with_values(low),
    }
}

/// Rolling population standard deviation.
pub fn rolling_stddev(series: &TimeSeries, period: usize) -> TimeSeries {
    series.with_values(rolling(&series.values(), period, None, |w| {
        Some(population_stddev(w))
    }))
}

/// Percent change of EMA(high - low) over `period` bars.
pub fn chaikin_volatility(bars: &[OhlcvBar], period: usize) -> TimeSeries {
    let span = TimeSeries::from_bars(bars, |b| b.high - b.low);
    let smoothed = ema_values(&span.values(), period);
    let mut out = vec![None; smoothed.len()];
    if period > 0 {
        for i in period..smoothed.len() {
            if let (Some(now), Some(then)) = (smoothed[i], smoothed[i - period]) {
                out[i] = ratio(100.0 * (now - then), then);
            }
        }
    }
    span.with_values(out)
}
