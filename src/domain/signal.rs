//! Trade signal generation.
//!
//! Signals are derived from a trend series and a baseline series aligned on
//! the same dates. Two strategies are available: a crossover state machine
//! and a z-score distance rule. Either can be inverted with
//! [`switch_signals`].

use std::fmt;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::domain::error::BacksimError;
use crate::domain::indicator_helpers::population_stddev;
use crate::domain::series::{TimeSeries, check_increasing, ratio};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TradeSignal {
    Long,
    Short,
    #[default]
    Hold,
    Clear,
}

impl TradeSignal {
    /// Parse a signal code: `1`/`LONG`, `-1`/`SHORT`, `0`/`HOLD`, `X`/`CLEAR`.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "1" | "LONG" => Some(TradeSignal::Long),
            "-1" | "SHORT" => Some(TradeSignal::Short),
            "0" | "HOLD" => Some(TradeSignal::Hold),
            "X" | "CLEAR" => Some(TradeSignal::Clear),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            TradeSignal::Long => "1",
            TradeSignal::Short => "-1",
            TradeSignal::Hold => "0",
            TradeSignal::Clear => "X",
        }
    }

    /// Long and Short swapped; Hold and Clear unchanged.
    pub fn switched(self) -> Self {
        match self {
            TradeSignal::Long => TradeSignal::Short,
            TradeSignal::Short => TradeSignal::Long,
            other => other,
        }
    }
}

impl fmt::Display for TradeSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TradeSignal::Long => "LONG",
            TradeSignal::Short => "SHORT",
            TradeSignal::Hold => "HOLD",
            TradeSignal::Clear => "CLEAR",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalPoint {
    pub date: NaiveDate,
    pub signal: TradeSignal,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignalSeries {
    points: Vec<SignalPoint>,
}

impl SignalSeries {
    pub fn new(points: Vec<SignalPoint>) -> Result<Self, BacksimError> {
        check_increasing(points.iter().map(|p| p.date))?;
        Ok(SignalSeries { points })
    }

    /// A Hold signal on every date of `series`.
    pub fn hold_like(series: &TimeSeries) -> Self {
        SignalSeries {
            points: series
                .dates()
                .map(|date| SignalPoint {
                    date,
                    signal: TradeSignal::Hold,
                })
                .collect(),
        }
    }

    /// Parse one code per date. Unrecognised codes become Hold and are logged.
    pub fn from_codes<S: AsRef<str>>(
        dates: &[NaiveDate],
        codes: &[S],
    ) -> Result<Self, BacksimError> {
        if dates.len() != codes.len() {
            return Err(BacksimError::unsupported(format!(
                "{} dates but {} signal codes",
                dates.len(),
                codes.len()
            )));
        }
        let points = dates
            .iter()
            .zip(codes)
            .map(|(&date, code)| {
                let code = code.as_ref();
                let signal = TradeSignal::from_code(code).unwrap_or_else(|| {
                    warn!("malformed signal '{}' on {}, treating as HOLD", code, date);
                    TradeSignal::Hold
                });
                SignalPoint { date, signal }
            })
            .collect();
        Self::new(points)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[SignalPoint] {
        &self.points
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.points.iter().map(|p| p.date)
    }

    pub fn signals(&self) -> Vec<TradeSignal> {
        self.points.iter().map(|p| p.signal).collect()
    }

    /// Number of points that are not Hold.
    pub fn active_count(&self) -> usize {
        self.points
            .iter()
            .filter(|p| p.signal != TradeSignal::Hold)
            .count()
    }

    fn with_signals(dates: impl Iterator<Item = NaiveDate>, signals: Vec<TradeSignal>) -> Self {
        SignalSeries {
            points: dates
                .zip(signals)
                .map(|(date, signal)| SignalPoint { date, signal })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CrossState {
    Above,
    Below,
}

/// Crossover state machine.
///
/// The state is set at the first point where both inputs are defined, with
/// no signal there. A fall from above to at-or-below the baseline emits
/// Long; a rise from below to at-or-above emits Short. Undefined points emit
/// Hold and keep the state.
pub fn crossover(trend: &TimeSeries, baseline: &TimeSeries) -> Result<SignalSeries, BacksimError> {
    trend.ensure_same_dates(baseline)?;
    if trend.len() < 2 {
        return Ok(SignalSeries::hold_like(trend));
    }
    let mut signals = vec![TradeSignal::Hold; trend.len()];

    let mut state: Option<CrossState> = None;
    for (i, (t, b)) in trend.values().into_iter().zip(baseline.values()).enumerate() {
        let (Some(t), Some(b)) = (t, b) else {
            continue;
        };
        match state {
            None => {
                state = Some(if t > b {
                    CrossState::Above
                } else {
                    CrossState::Below
                });
            }
            Some(CrossState::Above) if t <= b => {
                state = Some(CrossState::Below);
                signals[i] = TradeSignal::Long;
            }
            Some(CrossState::Below) if t >= b => {
                state = Some(CrossState::Above);
                signals[i] = TradeSignal::Short;
            }
            Some(_) => {}
        }
    }

    let out = SignalSeries::with_signals(trend.dates(), signals);
    debug!("crossover produced {} active signals", out.active_count());
    Ok(out)
}

/// Thresholds for the z-score distance strategy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZScoreThresholds {
    pub lower: f64,
    pub clear: f64,
    pub upper: f64,
}

impl Default for ZScoreThresholds {
    fn default() -> Self {
        ZScoreThresholds {
            lower: -1.0,
            clear: 0.5,
            upper: 1.0,
        }
    }
}

/// Z-score distance: `z = (trend - baseline) / sd(trend)`, where `sd` is the
/// population deviation of every defined trend value.
///
/// Short above `upper`, Long below `lower`, Clear when `|z| < clear`.
pub fn zscore_distance(
    trend: &TimeSeries,
    baseline: &TimeSeries,
    thresholds: ZScoreThresholds,
) -> Result<SignalSeries, BacksimError> {
    trend.ensure_same_dates(baseline)?;
    let defined = trend.defined_values();
    if trend.len() < 2 || defined.is_empty() {
        return Ok(SignalSeries::hold_like(trend));
    }
    let mut signals = vec![TradeSignal::Hold; trend.len()];

    let sd = population_stddev(&defined);
    let (t, b) = (trend.values(), baseline.values());
    for i in 1..signals.len() {
        let (Some(t), Some(b)) = (t[i], b[i]) else {
            continue;
        };
        let Some(z) = ratio(t - b, sd) else {
            continue;
        };
        signals[i] = if z > thresholds.upper {
            TradeSignal::Short
        } else if z < thresholds.lower {
            TradeSignal::Long
        } else if z.abs() < thresholds.clear {
            TradeSignal::Clear
        } else {
            TradeSignal::Hold
        };
    }

    let out = SignalSeries::with_signals(trend.dates(), signals);
    debug!("z-score distance produced {} active signals", out.active_count());
    Ok(out)
}

/// Swap Long and Short in one pass over a fresh copy.
pub fn switch_signals(signals: &SignalSeries) -> SignalSeries {
    SignalSeries {
        points: signals
            .points
            .iter()
            .map(|p| SignalPoint {
                date: p.date,
                signal: p.signal.switched(),
            })
            .collect(),
    }
}

/// How signals are derived from trend and baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SignalStrategy {
    Crossover,
    ZScore(ZScoreThresholds),
}

impl SignalStrategy {
    pub fn generate(
        &self,
        trend: &TimeSeries,
        baseline: &TimeSeries,
        switch: bool,
    ) -> Result<SignalSeries, BacksimError> {
        let signals = match self {
            SignalStrategy::Crossover => crossover(trend, baseline)?,
            SignalStrategy::ZScore(thresholds) => zscore_distance(trend, baseline, *thresholds)?,
        };
        Ok(if switch {
            switch_signals(&signals)
        } else {
            signals
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            SignalStrategy::Crossover => "crossover",
            SignalStrategy::ZScore(_) => "zscore",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Days;

    fn dates(n: usize) -> Vec<NaiveDate> {
        (0..n)
            .map(|i| NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Days::new(i as u64))
            .collect()
    }

    fn series(values: &[Option<f64>]) -> TimeSeries {
        TimeSeries::from_parts(&dates(values.len()), values.to_vec()).unwrap()
    }

    fn defined(values: &[f64]) -> TimeSeries {
        TimeSeries::from_values(&dates(values.len()), values).unwrap()
    }

    #[test]
    fn signal_codes() {
        assert_eq!(TradeSignal::from_code("1"), Some(TradeSignal::Long));
        assert_eq!(TradeSignal::from_code(" short "), Some(TradeSignal::Short));
        assert_eq!(TradeSignal::from_code("x"), Some(TradeSignal::Clear));
        assert_eq!(TradeSignal::from_code("0"), Some(TradeSignal::Hold));
        assert_eq!(TradeSignal::from_code("buy"), None);
        assert_eq!(TradeSignal::default(), TradeSignal::Hold);
    }

    #[test]
    fn malformed_codes_become_hold() {
        let s = SignalSeries::from_codes(&dates(3), &["1", "banana", "X"]).unwrap();
        assert_eq!(
            s.signals(),
            vec![TradeSignal::Long, TradeSignal::Hold, TradeSignal::Clear]
        );
    }

    #[test]
    fn crossover_single_long_on_first_dip() {
        let trend = defined(&[10.0, 11.0, 8.0, 7.0, 6.0]);
        let baseline = defined(&[9.0; 5]);
        let s = crossover(&trend, &baseline).unwrap();
        assert_eq!(
            s.signals(),
            vec![
                TradeSignal::Hold,
                TradeSignal::Hold,
                TradeSignal::Long,
                TradeSignal::Hold,
                TradeSignal::Hold
            ]
        );
    }

    #[test]
    fn crossover_rise_emits_short() {
        let trend = defined(&[5.0, 6.0, 9.0, 12.0]);
        let baseline = defined(&[9.0; 4]);
        let s = crossover(&trend, &baseline).unwrap();
        // at-or-above flips the state
        assert_eq!(s.signals()[2], TradeSignal::Short);
        assert_eq!(s.active_count(), 1);
    }

    #[test]
    fn crossover_state_starts_at_first_defined_pair() {
        let trend = series(&[None, None, Some(5.0), Some(10.0)]);
        let baseline = series(&[None, Some(8.0), Some(8.0), Some(8.0)]);
        let s = crossover(&trend, &baseline).unwrap();
        assert_eq!(s.signals()[2], TradeSignal::Hold);
        assert_eq!(s.signals()[3], TradeSignal::Short);
    }

    #[test]
    fn crossover_undefined_keeps_state() {
        let trend = series(&[Some(10.0), None, Some(8.0)]);
        let baseline = defined(&[9.0, 9.0, 9.0]);
        let s = crossover(&trend, &baseline).unwrap();
        assert_eq!(s.signals()[1], TradeSignal::Hold);
        assert_eq!(s.signals()[2], TradeSignal::Long);
    }

    #[test]
    fn crossover_rejects_misaligned_inputs() {
        let trend = defined(&[1.0, 2.0]);
        let baseline = defined(&[1.0, 2.0, 3.0]);
        assert!(matches!(
            crossover(&trend, &baseline),
            Err(BacksimError::UnsupportedInput { .. })
        ));
    }

    #[test]
    fn single_point_is_all_hold() {
        let s = crossover(&defined(&[1.0]), &defined(&[2.0])).unwrap();
        assert_eq!(s.signals(), vec![TradeSignal::Hold]);
    }

    #[test]
    fn short_or_undefined_input_is_all_hold() {
        let one = defined(&[4.0]);
        let s = zscore_distance(&one, &defined(&[1.0]), ZScoreThresholds::default()).unwrap();
        assert_eq!(s, SignalSeries::hold_like(&one));

        let undefined = series(&[None, None, None]);
        let s = zscore_distance(&undefined, &defined(&[1.0, 2.0, 3.0]), ZScoreThresholds::default())
            .unwrap();
        assert_eq!(s.signals(), vec![TradeSignal::Hold; 3]);
        assert_eq!(s.dates().collect::<Vec<_>>(), dates(3));

        let empty = crossover(&TimeSeries::default(), &TimeSeries::default()).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn zscore_thresholds() {
        // trend sd (population) of [0, 2, 0, 2] = 1
        let trend = defined(&[0.0, 2.0, 0.0, 2.0]);
        let baseline = defined(&[0.0, 0.0, 2.0, 1.8]);
        let s = zscore_distance(&trend, &baseline, ZScoreThresholds::default()).unwrap();
        assert_eq!(
            s.signals(),
            vec![
                TradeSignal::Hold,  // first point never signals
                TradeSignal::Short, // z = 2
                TradeSignal::Long,  // z = -2
                TradeSignal::Clear, // z = 0.2
            ]
        );
    }

    #[test]
    fn zscore_between_clear_and_upper_holds() {
        let trend = defined(&[0.0, 2.0, 0.0, 2.0]);
        let baseline = defined(&[0.0, 1.2, 0.0, 2.0]);
        let s = zscore_distance(&trend, &baseline, ZScoreThresholds::default()).unwrap();
        // z = 0.8
        assert_eq!(s.signals()[1], TradeSignal::Hold);
    }

    #[test]
    fn zscore_zero_deviation_all_hold() {
        let trend = defined(&[3.0, 3.0, 3.0]);
        let baseline = defined(&[1.0, 5.0, 9.0]);
        let s = zscore_distance(&trend, &baseline, ZScoreThresholds::default()).unwrap();
        assert_eq!(s.active_count(), 0);
    }

    #[test]
    fn switch_twice_is_identity() {
        let s = SignalSeries::from_codes(&dates(4), &["1", "-1", "0", "X"]).unwrap();
        let once = switch_signals(&s);
        assert_eq!(
            once.signals(),
            vec![
                TradeSignal::Short,
                TradeSignal::Long,
                TradeSignal::Hold,
                TradeSignal::Clear
            ]
        );
        assert_eq!(switch_signals(&once), s);
    }

    #[test]
    fn strategy_generate_applies_switch() {
        let trend = defined(&[10.0, 11.0, 8.0]);
        let baseline = defined(&[9.0; 3]);
        let s = SignalStrategy::Crossover
            .generate(&trend, &baseline, true)
            .unwrap();
        assert_eq!(s.signals()[2], TradeSignal::Short);
    }
}
