//! Descriptive statistics over a flat series of values.
//!
//! Everything here is a free function over a slice. The reductions that have
//! an obvious answer for an empty series (count, sum, avg, min, max) return
//! zero rather than failing; the ones that do not (standard deviation,
//! percentiles) return an `Error`.

use error::Error;
use std::cmp::Ordering;

/// Number of values.
pub fn count(values: &[f64]) -> usize {
    values.len()
}

/// Sum of values, 0 when empty.
pub fn sum(values: &[f64]) -> f64 {
    values.iter().sum()
}

/// Sum of the squares of values, 0 when empty.
pub fn sum2(values: &[f64]) -> f64 {
    values.iter().map(|v| v * v).sum()
}

/// Arithmetic mean, 0 when empty.
pub fn avg(values: &[f64]) -> f64 {
    let total = sum(values);
    if values.is_empty() || total == 0.0 {
        0.0
    } else {
        total / values.len() as f64
    }
}

/// Smallest value, 0 when empty.
pub fn min(values: &[f64]) -> f64 {
    match values.split_first() {
        Some((first, rest)) => rest.iter().fold(*first, |acc, &v| acc.min(v)),
        None => 0.0,
    }
}

/// Largest value, 0 when empty.
pub fn max(values: &[f64]) -> f64 {
    match values.split_first() {
        Some((first, rest)) => rest.iter().fold(*first, |acc, &v| acc.max(v)),
        None => 0.0,
    }
}

/// `max - min`.
pub fn range(values: &[f64]) -> f64 {
    max(values) - min(values)
}

/// Sample standard deviation, with an `n - 1` denominator. Needs at least two
/// values.
pub fn standard_deviation(values: &[f64]) -> Result<f64, Error> {
    let n = values.len();
    if n <= 1 {
        return Err(Error::InsufficientData(n));
    }
    let mean = sum(values) / n as f64;
    let variance = (sum2(values) - n as f64 * mean * mean) / (n - 1) as f64;
    // rounding can push a constant series a hair below zero
    Ok(variance.max(0.0).sqrt())
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut copy = values.to_vec();
    copy.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    copy
}

/// The `p`th percentile, linearly interpolated between order statistics.
///
/// `p` in (0, 1] is read as a fraction and `p` in (1, 100] as a percentage;
/// anything else is an error, as is an empty series. The input is left in
/// its original order.
pub fn percentile(values: &[f64], p: f64) -> Result<f64, Error> {
    let fraction = if p > 0.0 && p <= 1.0 {
        p
    } else if p > 1.0 && p <= 100.0 {
        p / 100.0
    } else {
        return Err(Error::InvalidPercentile(p));
    };
    if values.is_empty() {
        return Err(Error::InsufficientData(0));
    }

    let sorted = sorted(values);
    let rank = (sorted.len() - 1) as f64 * fraction;
    let lower = rank.floor();
    let idx = lower as usize;
    if rank == lower {
        return Ok(sorted[idx]);
    }
    let upper = (idx + 1).min(sorted.len() - 1);
    let weight = rank - lower;
    Ok(sorted[idx] + (sorted[upper] - sorted[idx]) * weight)
}

/// The 50th percentile.
pub fn median(values: &[f64]) -> Result<f64, Error> {
    percentile(values, 50.0)
}

/// The 25th, 50th and 75th percentiles.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Quartiles {
    /// 25th percentile.
    #[serde(rename = "25")]
    pub first: f64,
    /// 50th percentile.
    #[serde(rename = "50")]
    pub second: f64,
    /// 75th percentile.
    #[serde(rename = "75")]
    pub third: f64,
}

/// Compute the quartiles of a series.
pub fn quartiles(values: &[f64]) -> Result<Quartiles, Error> {
    Ok(Quartiles {
        first: percentile(values, 25.0)?,
        second: percentile(values, 50.0)?,
        third: percentile(values, 75.0)?,
    })
}

/// The reductions a bucket of values can be collapsed with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Aggregator {
    /// Total.
    Sum,
    /// Mean.
    Avg,
    /// Smallest.
    Min,
    /// Largest.
    Max,
}

impl Aggregator {
    /// Look up an aggregator by name, ignoring case. Unknown names fall back
    /// to `Sum`.
    pub fn from_name(name: &str) -> Aggregator {
        match name.to_lowercase().as_str() {
            "sum" => Aggregator::Sum,
            "avg" => Aggregator::Avg,
            "min" => Aggregator::Min,
            "max" => Aggregator::Max,
            _ => {
                debug!("unknown aggregator {}, using sum", name);
                Aggregator::Sum
            }
        }
    }

    /// Collapse a bucket.
    pub fn apply(&self, values: &[f64]) -> f64 {
        match *self {
            Aggregator::Sum => sum(values),
            Aggregator::Avg => avg(values),
            Aggregator::Min => min(values),
            Aggregator::Max => max(values),
        }
    }

    /// The lower-case name.
    pub fn as_str(&self) -> &'static str {
        match *self {
            Aggregator::Sum => "sum",
            Aggregator::Avg => "avg",
            Aggregator::Min => "min",
            Aggregator::Max => "max",
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use quickcheck::{QuickCheck, TestResult};

    const FIVE: [f64; 5] = [1.0, 2.0, 3.0, 4.0, 5.0];

    #[test]
    fn test_empty_series() {
        assert_eq!(0, count(&[]));
        assert_eq!(0.0, sum(&[]));
        assert_eq!(0.0, sum2(&[]));
        assert_eq!(0.0, avg(&[]));
        assert_eq!(0.0, min(&[]));
        assert_eq!(0.0, max(&[]));
        assert_eq!(0.0, range(&[]));
        assert_eq!(Err(Error::InsufficientData(0)), median(&[]));
    }

    #[test]
    fn test_simple_reductions() {
        assert_eq!(15.0, sum(&FIVE));
        assert_eq!(55.0, sum2(&FIVE));
        assert_eq!(3.0, avg(&FIVE));
        assert_eq!(1.0, min(&FIVE));
        assert_eq!(5.0, max(&FIVE));
        assert_eq!(4.0, range(&FIVE));
        assert_eq!(0.0, avg(&[-1.0, 1.0]));
    }

    #[test]
    fn test_standard_deviation() {
        let sd = standard_deviation(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((sd - 2.1381).abs() < 1e-4, "{}", sd);
        assert_eq!(Err(Error::InsufficientData(1)), standard_deviation(&[3.0]));
        assert_eq!(Err(Error::InsufficientData(0)), standard_deviation(&[]));
        assert_eq!(Ok(0.0), standard_deviation(&[3.0, 3.0, 3.0]));
    }

    #[test]
    fn test_percentile() {
        assert_eq!(Ok(3.0), percentile(&FIVE, 50.0));
        assert_eq!(Ok(2.0), percentile(&FIVE, 25.0));
        assert_eq!(Ok(2.0), percentile(&FIVE, 0.25));
        assert_eq!(Ok(5.0), percentile(&FIVE, 100.0));
        assert_eq!(Ok(5.0), percentile(&FIVE, 1.0));
        assert_eq!(Ok(1.5), percentile(&[1.0, 2.0], 50.0));
        assert_eq!(Ok(7.0), percentile(&[7.0], 90.0));
    }

    #[test]
    fn test_percentile_bounds() {
        assert_eq!(Err(Error::InvalidPercentile(0.0)), percentile(&FIVE, 0.0));
        assert_eq!(Err(Error::InvalidPercentile(-5.0)), percentile(&FIVE, -5.0));
        assert_eq!(Err(Error::InvalidPercentile(101.0)), percentile(&FIVE, 101.0));
    }

    #[test]
    fn test_percentile_leaves_input_alone() {
        let values = vec![5.0, 1.0, 4.0, 2.0, 3.0];
        assert_eq!(Ok(3.0), median(&values));
        assert_eq!(vec![5.0, 1.0, 4.0, 2.0, 3.0], values);
    }

    #[test]
    fn test_quartiles() {
        let q = quartiles(&FIVE).unwrap();
        assert_eq!(
            Quartiles {
                first: 2.0,
                second: 3.0,
                third: 4.0,
            },
            q
        );
        assert_eq!(
            r#"{"25":2.0,"50":3.0,"75":4.0}"#,
            ::serde_json::to_string(&q).unwrap()
        );
    }

    #[test]
    fn test_aggregator_names() {
        assert_eq!(Aggregator::Avg, Aggregator::from_name("AVG"));
        assert_eq!(Aggregator::Max, Aggregator::from_name("max"));
        assert_eq!(Aggregator::Sum, Aggregator::from_name("median"));
        assert_eq!(3.0, Aggregator::Avg.apply(&[2.0, 4.0]));
        assert_eq!(6.0, Aggregator::Sum.apply(&[2.0, 4.0]));
        assert_eq!(2.0, Aggregator::Min.apply(&[2.0, 4.0]));
    }

    #[test]
    fn percentile_is_bounded_by_min_and_max() {
        fn inner(raw: Vec<i32>, p: u8) -> TestResult {
            if raw.is_empty() || p == 0 || p > 100 {
                return TestResult::discard();
            }
            let values: Vec<f64> = raw.into_iter().map(f64::from).collect();
            let v = percentile(&values, f64::from(p)).unwrap();
            assert!(v >= min(&values));
            assert!(v <= max(&values));
            TestResult::passed()
        }
        QuickCheck::new()
            .tests(1000)
            .max_tests(10000)
            .quickcheck(inner as fn(Vec<i32>, u8) -> TestResult);
    }

    #[test]
    fn percentile_is_monotone() {
        fn inner(raw: Vec<i32>, lo: u8, hi: u8) -> TestResult {
            // a p of exactly 1 reads as the fraction 1.0, the maximum
            if raw.is_empty() || lo <= 1 || hi > 100 || lo > hi {
                return TestResult::discard();
            }
            let values: Vec<f64> = raw.into_iter().map(f64::from).collect();
            let a = percentile(&values, f64::from(lo)).unwrap();
            let b = percentile(&values, f64::from(hi)).unwrap();
            assert!(a <= b + 1e-9);
            TestResult::passed()
        }
        QuickCheck::new()
            .tests(1000)
            .max_tests(100000)
            .quickcheck(inner as fn(Vec<i32>, u8, u8) -> TestResult);
    }
}
