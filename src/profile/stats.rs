//! Descriptive statistics over numeric samples.

use serde::{Deserialize, Serialize};

/// Minimum, arithmetic mean, median and maximum of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Describe {
    pub min: f64,
    pub mean: f64,
    pub median: f64,
    pub max: f64,
}

impl Describe {
    /// Summarise `values`; `None` for an empty sample.
    pub fn of(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        Some(Self {
            min,
            mean,
            median: median(values),
            max,
        })
    }
}

/// Median of a sample; `0.0` when empty.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_weighted_sample() {
        let d = Describe::of(&[10.0, 10.0, 20.0]).unwrap();
        assert_eq!(d.min, 10.0);
        assert_eq!(d.max, 20.0);
        assert!((d.mean - 13.333333333333334).abs() < 1e-12);
        assert_eq!(d.median, 10.0);
    }

    #[test]
    fn test_median_even() {
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
    }

    #[test]
    fn test_empty() {
        assert!(Describe::of(&[]).is_none());
        assert_eq!(median(&[]), 0.0);
    }
}
