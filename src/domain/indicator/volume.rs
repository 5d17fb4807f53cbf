//! Volume-weighted indicators.

use crate::domain::indicator::moving_average::ema_values;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::series::{TimeSeries, ratio, zip_values};

/// Volume scale applied in the ease-of-movement box ratio.
pub const DEFAULT_EMV_SCALE: f64 = 1e9;

fn dates(bars: &[OhlcvBar]) -> impl Iterator<Item = chrono::NaiveDate> + '_ {
    bars.iter().map(|b| b.date)
}

fn money_flow_volume(bar: &OhlcvBar) -> Option<f64> {
    bar.close_location_value().map(|clv| clv * bar.volume as f64)
}

/// Accumulation/distribution line: running sum of CLV * volume.
/// Flat bars contribute nothing and are undefined themselves.
pub fn ad_line(bars: &[OhlcvBar]) -> TimeSeries {
    TimeSeries::aligned(dates(bars), ad_values(bars))
}

fn ad_values(bars: &[OhlcvBar]) -> Vec<Option<f64>> {
    let mut total = 0.0;
    bars.iter()
        .map(|bar| {
            let flow = money_flow_volume(bar)?;
            total += flow;
            Some(total)
        })
        .collect()
}

/// Sum of money-flow volume over sum of volume across `period` bars.
pub fn chaikin_money_flow(bars: &[OhlcvBar], period: usize) -> TimeSeries {
    let mut out = vec![None; bars.len()];
    if period > 0 && bars.len() >= period {
        for i in (period - 1)..bars.len() {
            let window = &bars[i + 1 - period..=i];
            let flow: Option<f64> = window.iter().map(money_flow_volume).sum();
            let volume: f64 = window.iter().map(|b| b.volume as f64).sum();
            out[i] = flow.and_then(|f| ratio(f, volume));
        }
    }
    TimeSeries::aligned(dates(bars), out)
}

/// EMA(3) minus EMA(10) of the A/D line.
pub fn chaikin_ad_oscillator(bars: &[OhlcvBar]) -> TimeSeries {
    let ad = ad_values(bars);
    let fast = ema_values(&ad, 3);
    let slow = ema_values(&ad, 10);
    TimeSeries::aligned(dates(bars), zip_values(&fast, &slow, |f, s| Some(f - s)))
}

/// On-balance volume, starting from zero.
pub fn on_balance_volume(bars: &[OhlcvBar]) -> TimeSeries {
    let mut out = Vec::with_capacity(bars.len());
    let mut obv = 0.0;
    for (i, bar) in bars.iter().enumerate() {
        if i > 0 {
            let prev = &bars[i - 1];
            if bar.close > prev.close {
                obv += bar.volume as f64;
            } else if bar.close < prev.close {
                obv -= bar.volume as f64;
            }
        }
        out.push(Some(obv));
    }
    TimeSeries::aligned(dates(bars), out)
}

/// Accumulates the fractional close change on bars where volume rose.
pub fn positive_volume_index(bars: &[OhlcvBar]) -> TimeSeries {
    accumulate(bars, |bar, prev| {
        if bar.volume > prev.volume {
            ratio(bar.close - prev.close, prev.close)
        } else {
            Some(0.0)
        }
    })
}

/// Accumulates volume times the fractional close change.
pub fn price_volume_trend(bars: &[OhlcvBar]) -> TimeSeries {
    accumulate(bars, |bar, prev| {
        ratio(bar.close - prev.close, prev.close).map(|pct| bar.volume as f64 * pct)
    })
}

/// Running total starting at zero. An undefined increment leaves the total
/// unchanged and marks that point undefined.
fn accumulate(
    bars: &[OhlcvBar],
    increment: impl Fn(&OhlcvBar, &OhlcvBar) -> Option<f64>,
) -> TimeSeries {
    let mut out = Vec::with_capacity(bars.len());
    let mut total = 0.0;
    for (i, bar) in bars.iter().enumerate() {
        if i == 0 {
            out.push(Some(total));
            continue;
        }
        match increment(bar, &bars[i - 1]) {
            Some(step) => {
                total += step;
                out.push(Some(total));
            }
            None => out.push(None),
        }
    }
    TimeSeries::aligned(dates(bars), out)
}

/// Ease of movement: midpoint move divided by the box ratio
/// `(volume / scale) / (high - low)`.
pub fn ease_of_movement(bars: &[OhlcvBar], scale: f64) -> TimeSeries {
    let mut out = vec![None; bars.len()];
    for i in 1..bars.len() {
        let (bar, prev) = (&bars[i], &bars[i - 1]);
        let midpoint_move = bar.median_price() - prev.median_price();
        out[i] = ratio(bar.volume as f64 / scale, bar.high - bar.low)
            .and_then(|box_ratio| ratio(midpoint_move, box_ratio));
    }
    TimeSeries::aligned(dates(bars), out)
}
