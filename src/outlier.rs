//! Outlier detection on a group's distance matrix.

use crate::data::{format_number, DistanceMatrix};
use crate::error::{ClusterError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// A pair of samples further apart than the threshold.
///
/// `sample_a` precedes `sample_b` in matrix order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairwiseOutlier {
    pub sample_a: String,
    pub sample_b: String,
    pub distance: f64,
}

/// Outliers found in one group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Outliers {
    /// Samples whose mean distance to the other members exceeds the threshold.
    pub average: Vec<String>,
    /// Pairs exceeding the threshold, in row-major upper-triangle order.
    pub pairwise: Vec<PairwiseOutlier>,
}

/// Mean distance from each sample to every other sample.
///
/// Requires at least two samples.
pub fn average_distances(matrix: &DistanceMatrix) -> Result<Vec<f64>> {
    let n = matrix.n();
    if n < 2 {
        return Err(ClusterError::InvalidParameter(format!(
            "average distances need at least 2 samples, got {}",
            n
        )));
    }
    Ok((0..n)
        .map(|i| matrix.row(i).iter().sum::<f64>() / (n - 1) as f64)
        .collect())
}

/// Find average and pairwise outliers.
pub fn detect_outliers(matrix: &DistanceMatrix, threshold: f64) -> Result<Outliers> {
    if threshold.is_nan() || threshold < 0.0 {
        return Err(ClusterError::InvalidParameter(format!(
            "outlier threshold must be non-negative, got {}",
            threshold
        )));
    }
    let labels = matrix.labels();

    let average = average_distances(matrix)?
        .into_iter()
        .zip(labels)
        .filter(|(mean, _)| mean.abs() > threshold)
        .map(|(_, id)| id.clone())
        .collect();

    let n = matrix.n();
    let mut pairwise = Vec::new();
    for i in 0..n {
        for j in (i + 1)..n {
            let d = matrix.get(i, j);
            if d.abs() > threshold {
                pairwise.push(PairwiseOutlier {
                    sample_a: labels[i].clone(),
                    sample_b: labels[j].clone(),
                    distance: d,
                });
            }
        }
    }

    Ok(Outliers { average, pairwise })
}

/// Write pairwise outliers as `id1\tid2\tdist`.
pub fn write_outliers<P: AsRef<Path>>(outliers: &[PairwiseOutlier], path: P) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "id1\tid2\tdist")?;
    for o in outliers {
        writeln!(
            writer,
            "{}\t{}\t{}",
            o.sample_a,
            o.sample_b,
            format_number(o.distance)
        )?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abc() -> DistanceMatrix {
        DistanceMatrix::new(
            vec!["a".into(), "b".into(), "c".into()],
            vec![0.0, 1.0, 2.0, 1.0, 0.0, 5.0, 2.0, 5.0, 0.0],
        )
        .unwrap()
    }

    #[test]
    fn test_average_distances() {
        assert_eq!(average_distances(&abc()).unwrap(), vec![1.5, 3.0, 3.5]);
    }

    #[test]
    fn test_detect_outliers() {
        let out = detect_outliers(&abc(), 2.0).unwrap();
        assert_eq!(out.average, vec!["b", "c"]);
        assert_eq!(
            out.pairwise,
            vec![PairwiseOutlier {
                sample_a: "b".into(),
                sample_b: "c".into(),
                distance: 5.0
            }]
        );
    }

    #[test]
    fn test_pairwise_order_is_row_major() {
        let out = detect_outliers(&abc(), 0.5).unwrap();
        let pairs: Vec<(&str, &str)> = out
            .pairwise
            .iter()
            .map(|p| (p.sample_a.as_str(), p.sample_b.as_str()))
            .collect();
        assert_eq!(pairs, vec![("a", "b"), ("a", "c"), ("b", "c")]);
    }

    #[test]
    fn test_single_member_rejected() {
        let m = DistanceMatrix::new(vec!["a".into()], vec![0.0]).unwrap();
        assert!(detect_outliers(&m, 1.0).is_err());
    }

    #[test]
    fn test_negative_threshold_rejected() {
        assert!(detect_outliers(&abc(), -1.0).is_err());
    }

    #[test]
    fn test_write_outliers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outliers.tsv");
        let out = detect_outliers(&abc(), 2.0).unwrap();
        write_outliers(&out.pairwise, &path).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "id1\tid2\tdist\nb\tc\t5\n"
        );
    }
}
