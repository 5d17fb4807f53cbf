//! Shared helper functions for indicator calculations.
//!
//! Every helper works on `&[Option<f64>]` and returns a vector of the same
//! length, so indicators can be chained without reallocating dates.

/// Apply `f` to each complete window of `period` values ending at `i`.
///
/// Positions before `period - 1`, and windows containing an undefined value,
/// get `empty`.
pub(crate) fn rolling<T: Clone>(
    x: &[Option<f64>],
    period: usize,
    empty: T,
    f: impl Fn(&[f64]) -> T,
) -> Vec<T> {
    let mut out = vec![empty; x.len()];
    if period == 0 || x.len() < period {
        return out;
    }

    let mut window: Vec<f64> = Vec::with_capacity(period);
    for i in (period - 1)..x.len() {
        window.clear();
        for v in &x[i + 1 - period..=i] {
            match v {
                Some(v) => window.push(*v),
                None => break,
            }
        }
        if window.len() == period {
            out[i] = f(&window);
        }
    }
    out
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by N).
pub(crate) fn population_stddev(values: &[f64]) -> f64 {
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Sample standard deviation (divides by N - 1). Undefined below two values.
pub(crate) fn sample_stddev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values);
    let variance =
        values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

/// One-step differences `x[i] - x[i-1]`; the first point is undefined.
pub(crate) fn changes(x: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut out = vec![None; x.len()];
    for i in 1..x.len() {
        if let (Some(prev), Some(cur)) = (x[i - 1], x[i]) {
            out[i] = Some(cur - prev);
        }
    }
    out
}

/// Wilder's average: seeded with the mean of the first `period` defined
/// values, then `avg = (avg * (period - 1) + value) / period`.
///
/// An undefined input after the seed yields an undefined output and leaves
/// the average untouched.
pub(crate) fn wilder_average(x: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; x.len()];
    if period == 0 {
        return out;
    }

    let n = period as f64;
    let mut seed_sum = 0.0;
    let mut seen = 0usize;
    let mut avg: Option<f64> = None;

    for (i, v) in x.iter().enumerate() {
        let Some(v) = *v else { continue };
        match avg {
            None => {
                seed_sum += v;
                seen += 1;
                if seen == period {
                    let seed = seed_sum / n;
                    avg = Some(seed);
                    out[i] = Some(seed);
                }
            }
            Some(prev) => {
                let next = (prev * (n - 1.0) + v) / n;
                avg = Some(next);
                out[i] = Some(next);
            }
        }
    }
    out
}

/// Wilder's running sum used for directional movement:
/// `acc = acc - acc / period + value`, seeded with the mean of the first
/// `period` defined values.
pub(crate) fn wilder_sum(x: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; x.len()];
    if period == 0 {
        return out;
    }

    let n = period as f64;
    let mut seed_sum = 0.0;
    let mut seen = 0usize;
    let mut acc: Option<f64> = None;

    for (i, v) in x.iter().enumerate() {
        let Some(v) = *v else { continue };
        match acc {
            None => {
                seed_sum += v;
                seen += 1;
                if seen == period {
                    let seed = seed_sum / n;
                    acc = Some(seed);
                    out[i] = Some(seed);
                }
            }
            Some(prev) => {
                let next = prev - prev / n + v;
                acc = Some(next);
                out[i] = Some(next);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defined(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().map(|&v| Some(v)).collect()
    }

    #[test]
    fn rolling_warmup_and_gaps() {
        let x = vec![Some(1.0), Some(2.0), None, Some(4.0), Some(5.0), Some(6.0)];
        let sums = rolling(&x, 2, None, |w| Some(w.iter().sum::<f64>()));
        assert_eq!(
            sums,
            vec![None, Some(3.0), None, None, Some(9.0), Some(11.0)]
        );
    }

    #[test]
    fn rolling_zero_period_is_all_empty() {
        let x = defined(&[1.0, 2.0]);
        let out = rolling(&x, 0, None, |w| Some(w[0]));
        assert_eq!(out, vec![None, None]);
    }

    #[test]
    fn rolling_short_input() {
        let x = defined(&[1.0, 2.0]);
        let out = rolling(&x, 5, None, |w| Some(w[0]));
        assert_eq!(out, vec![None, None]);
    }

    #[test]
    fn stddev_variants() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((population_stddev(&v) - 2.0).abs() < 1e-12);
        let s = sample_stddev(&v).unwrap();
        assert!((s - (32.0_f64 / 7.0).sqrt()).abs() < 1e-12);
        assert_eq!(sample_stddev(&[1.0]), None);
    }

    #[test]
    fn changes_first_undefined() {
        let x = defined(&[10.0, 12.0, 11.0]);
        assert_eq!(changes(&x), vec![None, Some(2.0), Some(-1.0)]);
    }

    #[test]
    fn wilder_average_seed_is_mean() {
        let x = defined(&[10.0, 10.0, 10.0, 13.0]);
        let out = wilder_average(&x, 3);
        assert_eq!(out[0], None);
        assert_eq!(out[1], None);
        assert_eq!(out[2], Some(10.0));
        assert!((out[3].unwrap() - (10.0 * 2.0 + 13.0) / 3.0).abs() < 1e-12);
    }

    #[test]
    fn wilder_average_skips_leading_undefined() {
        let x = vec![None, Some(2.0), Some(4.0), Some(6.0)];
        let out = wilder_average(&x, 2);
        assert_eq!(out, vec![None, None, Some(3.0), Some((3.0 + 6.0) / 2.0)]);
    }

    #[test]
    fn wilder_sum_recurrence() {
        let x = defined(&[2.0, 4.0, 6.0]);
        let out = wilder_sum(&x, 2);
        assert_eq!(out[1], Some(3.0));
        // 3 - 3/2 + 6
        assert_eq!(out[2], Some(7.5));
    }
}
