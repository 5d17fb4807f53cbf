//! Canonical time series type shared by every stage of the chain.
//!
//! A `TimeSeries` is an ordered run of `(date, Option<f64>)` points with
//! strictly increasing dates. `None` marks an undefined value: a warm-up
//! point or a zero-denominator ratio. Nothing in the crate uses NaN as a
//! sentinel.

use chrono::NaiveDate;

use crate::domain::error::BacksimError;
use crate::domain::ohlcv::OhlcvBar;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimeSeries {
    points: Vec<SeriesPoint>,
}

impl TimeSeries {
    /// Build a series, rejecting duplicate or out-of-order dates.
    pub fn new(points: Vec<SeriesPoint>) -> Result<Self, BacksimError> {
        check_increasing(points.iter().map(|p| p.date))?;
        Ok(TimeSeries { points })
    }

    pub fn from_parts(dates: &[NaiveDate], values: Vec<Option<f64>>) -> Result<Self, BacksimError> {
        if dates.len() != values.len() {
            return Err(BacksimError::unsupported(format!(
                "{} dates but {} values",
                dates.len(),
                values.len()
            )));
        }
        check_increasing(dates.iter().copied())?;
        Ok(Self::aligned(dates.iter().copied(), values))
    }

    /// Build a fully defined series from plain numbers.
    pub fn from_values(dates: &[NaiveDate], values: &[f64]) -> Result<Self, BacksimError> {
        Self::from_parts(dates, values.iter().map(|&v| Some(v)).collect())
    }

    /// Closing prices of already-ordered bars.
    pub fn closes(bars: &[OhlcvBar]) -> Self {
        Self::from_bars(bars, |b| b.close)
    }

    pub fn from_bars(bars: &[OhlcvBar], f: impl Fn(&OhlcvBar) -> f64) -> Self {
        TimeSeries {
            points: bars
                .iter()
                .map(|b| SeriesPoint {
                    date: b.date,
                    value: Some(f(b)),
                })
                .collect(),
        }
    }

    /// Zip dates with values without re-checking order. Callers pass dates
    /// taken from an existing series or from validated bars.
    pub(crate) fn aligned(
        dates: impl IntoIterator<Item = NaiveDate>,
        values: Vec<Option<f64>>,
    ) -> Self {
        let points: Vec<SeriesPoint> = dates
            .into_iter()
            .zip(values)
            .map(|(date, value)| SeriesPoint { date, value })
            .collect();
        TimeSeries { points }
    }

    /// Same dates as `self`, new values.
    pub(crate) fn with_values(&self, values: Vec<Option<f64>>) -> Self {
        debug_assert_eq!(values.len(), self.points.len());
        Self::aligned(self.dates(), values)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.points.iter().map(|p| p.date)
    }

    pub fn values(&self) -> Vec<Option<f64>> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.points.get(index).and_then(|p| p.value)
    }

    /// All defined values in date order.
    pub fn defined_values(&self) -> Vec<f64> {
        self.points.iter().filter_map(|p| p.value).collect()
    }

    pub fn first_defined(&self) -> Option<SeriesPoint> {
        self.points.iter().copied().find(|p| p.value.is_some())
    }

    pub fn last_defined(&self) -> Option<SeriesPoint> {
        self.points.iter().rev().copied().find(|p| p.value.is_some())
    }

    /// Apply `f` to every defined value; undefined points stay undefined.
    pub fn map(&self, f: impl Fn(f64) -> Option<f64>) -> Self {
        self.with_values(self.points.iter().map(|p| p.value.and_then(&f)).collect())
    }

    /// Combine two series point by point. Both must carry identical dates.
    pub fn zip_with(
        &self,
        other: &TimeSeries,
        f: impl Fn(f64, f64) -> Option<f64>,
    ) -> Result<Self, BacksimError> {
        self.ensure_same_dates(other)?;
        Ok(self.with_values(zip_values(&self.values(), &other.values(), f)))
    }

    pub fn ensure_same_dates(&self, other: &TimeSeries) -> Result<(), BacksimError> {
        if self.len() != other.len() || self.dates().ne(other.dates()) {
            return Err(BacksimError::unsupported(
                "series are not aligned on the same dates",
            ));
        }
        Ok(())
    }
}

/// Inner join of two series on date, keeping points where both are defined.
pub fn align_defined(a: &TimeSeries, b: &TimeSeries) -> (Vec<f64>, Vec<f64>) {
    let mut left = Vec::new();
    let mut right = Vec::new();
    let (mut i, mut j) = (0, 0);
    let (pa, pb) = (a.points(), b.points());

    while i < pa.len() && j < pb.len() {
        match pa[i].date.cmp(&pb[j].date) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                if let (Some(x), Some(y)) = (pa[i].value, pb[j].value) {
                    left.push(x);
                    right.push(y);
                }
                i += 1;
                j += 1;
            }
        }
    }

    (left, right)
}

pub(crate) fn zip_values(
    a: &[Option<f64>],
    b: &[Option<f64>],
    f: impl Fn(f64, f64) -> Option<f64>,
) -> Vec<Option<f64>> {
    a.iter()
        .zip(b)
        .map(|(x, y)| match (x, y) {
            (Some(x), Some(y)) => f(*x, *y),
            _ => None,
        })
        .collect()
}

/// `num / den`, undefined when the denominator is zero or the result is not finite.
pub fn ratio(num: f64, den: f64) -> Option<f64> {
    if den == 0.0 {
        return None;
    }
    let r = num / den;
    r.is_finite().then_some(r)
}

pub fn check_increasing(dates: impl IntoIterator<Item = NaiveDate>) -> Result<(), BacksimError> {
    let mut prev: Option<NaiveDate> = None;
    for date in dates {
        if let Some(p) = prev {
            if date <= p {
                return Err(BacksimError::unsupported(format!(
                    "dates must be strictly increasing: {} follows {}",
                    date, p
                )));
            }
        }
        prev = Some(date);
    }
    Ok(())
}
