//! Per-bar price transforms and the benchmark-relative normalized price.

use crate::domain::ohlcv::OhlcvBar;
use crate::domain::series::{TimeSeries, ratio};

pub fn average_price(bars: &[OhlcvBar]) -> TimeSeries {
    TimeSeries::from_bars(bars, OhlcvBar::average_price)
}

pub fn median_price(bars: &[OhlcvBar]) -> TimeSeries {
    TimeSeries::from_bars(bars, OhlcvBar::median_price)
}

pub fn typical_price(bars: &[OhlcvBar]) -> TimeSeries {
    TimeSeries::from_bars(bars, OhlcvBar::typical_price)
}

pub fn weighted_close(bars: &[OhlcvBar]) -> TimeSeries {
    TimeSeries::from_bars(bars, OhlcvBar::weighted_close)
}

/// `100 * (price - baseline) / baseline`, on the price series' dates.
/// Dates missing from the baseline are undefined.
pub fn normalized_price(price: &TimeSeries, baseline: &TimeSeries) -> TimeSeries {
    let base = baseline.points();
    let mut j = 0;
    let values = price
        .points()
        .iter()
        .map(|p| {
            while j < base.len() && base[j].date < p.date {
                j += 1;
            }
            let b = base.get(j).filter(|b| b.date == p.date)?.value?;
            ratio(100.0 * (p.value? - b), b)
        })
        .collect();
    price.with_values(values)
}
