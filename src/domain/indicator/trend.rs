//! Trend-strength indicators: directional movement and parabolic SAR.

use crate::domain::indicator_helpers::{wilder_average, wilder_sum};
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::series::{TimeSeries, ratio, zip_values};

/// +DI and -DI lines.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionalIndex {
    pub plus: TimeSeries,
    pub minus: TimeSeries,
}

/// Acceleration settings for the parabolic SAR.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SarParams {
    pub start: f64,
    pub step: f64,
    pub threshold: f64,
}

impl Default for SarParams {
    fn default() -> Self {
        SarParams {
            start: 0.02,
            step: 0.02,
            threshold: 0.2,
        }
    }
}

pub fn directional_index(bars: &[OhlcvBar], period: usize) -> DirectionalIndex {
    let (plus, minus) = directional_values(bars, period);
    let dates = || bars.iter().map(|b| b.date);
    DirectionalIndex {
        plus: TimeSeries::aligned(dates(), plus),
        minus: TimeSeries::aligned(dates(), minus),
    }
}

/// Directional movement index: `100 * |+DI - -DI| / (+DI + -DI)`.
pub fn dx(bars: &[OhlcvBar], period: usize) -> TimeSeries {
    TimeSeries::aligned(bars.iter().map(|b| b.date), dx_values(bars, period))
}

/// DX smoothed with Wilder's average.
pub fn adx(bars: &[OhlcvBar], period: usize) -> TimeSeries {
    TimeSeries::aligned(bars.iter().map(|b| b.date), adx_values(bars, period))
}

/// Average of the current ADX and the ADX `period` bars back.
pub fn adxr(bars: &[OhlcvBar], period: usize) -> TimeSeries {
    let adx = adx_values(bars, period);
    let mut out = vec![None; adx.len()];
    for i in period..adx.len() {
        if let (Some(now), Some(then)) = (adx[i], adx[i - period]) {
            out[i] = Some(0.5 * (now + then));
        }
    }
    TimeSeries::aligned(bars.iter().map(|b| b.date), out)
}

/// Parabolic stop-and-reverse. Starts in the falling state with the first
/// bar's high as the SAR and its low as the extreme point.
pub fn parabolic_sar(bars: &[OhlcvBar], params: SarParams) -> TimeSeries {
    let dates = bars.iter().map(|b| b.date);
    let Some(first) = bars.first() else {
        return TimeSeries::default();
    };

    let mut out = Vec::with_capacity(bars.len());
    let mut rising = false;
    let mut sar = first.high;
    let mut extreme = first.low;
    let mut af = params.start;
    out.push(Some(sar));

    for i in 1..bars.len() {
        let bar = &bars[i];
        let prev = &bars[i - 1];
        let farther = &bars[i.saturating_sub(2)];
        let candidate = sar + af * (extreme - sar);

        if rising {
            let candidate = candidate.min(prev.low).min(farther.low);
            if bar.close < candidate {
                rising = false;
                sar = extreme;
                extreme = bar.low;
                af = params.start;
            } else {
                sar = candidate;
                if bar.high > extreme {
                    extreme = bar.high;
                    af = (af + params.step).min(params.threshold);
                }
            }
        } else {
            let candidate = candidate.max(prev.high).max(farther.high);
            if bar.close > candidate {
                rising = true;
                sar = extreme;
                extreme = bar.high;
                af = params.start;
            } else {
                sar = candidate;
                if bar.low < extreme {
                    extreme = bar.low;
                    af = (af + params.step).min(params.threshold);
                }
            }
        }
        out.push(Some(sar));
    }

    TimeSeries::aligned(dates, out)
}

fn directional_values(bars: &[OhlcvBar], period: usize) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
    let len = bars.len();
    let mut plus_dm = vec![None; len];
    let mut minus_dm = vec![None; len];
    let mut tr = vec![None; len];

    for i in 1..len {
        let (bar, prev) = (&bars[i], &bars[i - 1]);
        let up = bar.high - prev.high;
        let down = prev.low - bar.low;
        plus_dm[i] = Some(if up > down && up > 0.0 { up } else { 0.0 });
        minus_dm[i] = Some(if down > up && down > 0.0 { down } else { 0.0 });
        tr[i] = Some(bar.true_range(prev.close));
    }

    let plus_sum = wilder_sum(&plus_dm, period);
    let minus_sum = wilder_sum(&minus_dm, period);
    let tr_sum = wilder_sum(&tr, period);

    let plus = zip_values(&plus_sum, &tr_sum, |dm, t| ratio(100.0 * dm, t));
    let minus = zip_values(&minus_sum, &tr_sum, |dm, t| ratio(100.0 * dm, t));
    (plus, minus)
}

fn dx_values(bars: &[OhlcvBar], period: usize) -> Vec<Option<f64>> {
    let (plus, minus) = directional_values(bars, period);
    zip_values(&plus, &minus, |p, m| ratio(100.0 * (p - m).abs(), p + m))
}

fn adx_values(bars: &[OhlcvBar], period: usize) -> Vec<Option<f64>> {
    wilder_average(&dx_values(bars, period), period)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Days, NaiveDate};

    fn bars(rows: &[(f64, f64, f64)]) -> Vec<OhlcvBar> {
        rows.iter()
            .enumerate()
            .map(|(i, &(high, low, close))| OhlcvBar {
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Days::new(i as u64),
                open: close,
                high,
                low,
                close,
                volume: 1000,
            })
            .collect()
    }

    fn uptrend(n: usize) -> Vec<OhlcvBar> {
        let rows: Vec<(f64, f64, f64)> = (0..n)
            .map(|i| {
                let base = 100.0 + 2.0 * i as f64;
                (base + 1.0, base - 1.0, base + 0.5)
            })
            .collect();
        bars(&rows)
    }

    #[test]
    fn directional_index_uptrend_has_no_minus() {
        let di = directional_index(&uptrend(10), 3);
        assert_eq!(di.plus.get(2), None);
        assert!(di.plus.get(3).unwrap() > 0.0);
        assert_relative_eq!(di.minus.get(3).unwrap(), 0.0);
    }

    #[test]
    fn dx_pure_uptrend_is_100() {
        let out = dx(&uptrend(10), 3);
        assert_relative_eq!(out.get(5).unwrap(), 100.0);
    }

    #[test]
    fn adx_warmup_and_value() {
        let out = adx(&uptrend(12), 3);
        // DX defined from 3, ADX seeded after three DX values
        assert_eq!(out.get(4), None);
        assert_relative_eq!(out.get(5).unwrap(), 100.0);
    }

    #[test]
    fn adxr_averages_lagged_adx() {
        let out = adxr(&uptrend(12), 3);
        assert_eq!(out.get(7), None);
        assert_relative_eq!(out.get(8).unwrap(), 100.0);
    }

    #[test]
    fn flat_bars_give_undefined_dx() {
        let rows = vec![(10.0, 10.0, 10.0); 8];
        let out = dx(&bars(&rows), 2);
        assert!(out.values().iter().all(Option::is_none));
    }

    #[test]
    fn psar_flips_to_rising_on_breakout() {
        let data = bars(&[
            (10.0, 9.0, 9.5),
            (10.5, 9.2, 10.4),
            (11.5, 10.6, 11.4),
            (12.5, 11.6, 12.4),
        ]);
        let out = parabolic_sar(&data, SarParams::default());
        assert_eq!(out.get(0), Some(10.0));
        // bar 1: candidate = 10 + 0.02 * (9 - 10) = 9.98, raised to prior high 10.0
        // close 10.4 > 10.0 → flip, SAR = extreme point 9.0
        assert_relative_eq!(out.get(1).unwrap(), 9.0);
        // bar 2: rising, candidate = 9 + 0.02 * (10.5 - 9) = 9.03, capped by lows 9.2/9.0
        assert_relative_eq!(out.get(2).unwrap(), 9.0);
        assert!(out.get(3).unwrap() > 9.0);
    }

    #[test]
    fn psar_acceleration_grows_caps_and_resets() {
        // falling run: every bar sets a new low, 4 below the last
        let mut rows = vec![(100.0, 98.0, 99.0)];
        for i in 1..=12 {
            let base = 100.0 - 4.0 * i as f64;
            rows.push((base + 1.0, base - 1.0, base));
        }
        rows.push((120.0, 100.0, 119.0));
        rows.push((125.0, 118.0, 124.0));
        rows.push((130.0, 123.0, 129.0));
        let out = parabolic_sar(&bars(&rows), SarParams::default());

        // bars 1-2: candidate lifted to the prior highs
        assert_relative_eq!(out.get(1).unwrap(), 100.0);
        assert_relative_eq!(out.get(2).unwrap(), 100.0);
        // af 0.06, extreme 91: 100 + 0.06 * (91 - 100)
        assert_relative_eq!(out.get(3).unwrap(), 99.46, epsilon = 1e-9);
        // af 0.08, extreme 87
        assert_relative_eq!(out.get(4).unwrap(), 98.4632, epsilon = 1e-9);
        assert_relative_eq!(out.get(5).unwrap(), 96.91688, epsilon = 1e-9);
        assert_relative_eq!(out.get(9).unwrap(), 84.7444520072192, epsilon = 1e-9);

        // af reached 0.2 at bar 9 and stays there on later new lows
        for i in 10..=12 {
            let prev = out.get(i - 1).unwrap();
            let extreme = 100.0 - 4.0 * (i - 1) as f64 - 1.0;
            assert_relative_eq!(out.get(i).unwrap(), prev + 0.2 * (extreme - prev), epsilon = 1e-9);
        }
        assert_relative_eq!(out.get(12).unwrap(), 71.89315942769623, epsilon = 1e-9);

        // close 119 breaks above: SAR jumps to the extreme low 51
        assert_relative_eq!(out.get(13).unwrap(), 51.0);
        // af back to 0.02: 51 + 0.02 * (120 - 51) = 52.38, held at the low of bar 12
        assert_relative_eq!(out.get(14).unwrap(), 51.0);
        // af 0.04 after the new high 125: 51 + 0.04 * (125 - 51)
        assert_relative_eq!(out.get(15).unwrap(), 53.96, epsilon = 1e-9);
    }

    #[test]
    fn psar_empty_input() {
        assert!(parabolic_sar(&[], SarParams::default()).is_empty());
    }
}
