//! Labeled square distance matrices.

use crate::error::{ClusterError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Header of the label column in matrix TSV files.
pub const MATRIX_INDEX_HEADER: &str = "dists";

/// A dense, symmetric sample × sample distance matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceMatrix {
    labels: Vec<String>,
    /// Row-major values, `labels.len()²` entries.
    values: Vec<f64>,
}

impl DistanceMatrix {
    /// Create a matrix, checking shape, symmetry and the zero diagonal.
    pub fn new(labels: Vec<String>, values: Vec<f64>) -> Result<Self> {
        let n = labels.len();
        if values.len() != n * n {
            return Err(ClusterError::InvalidParameter(format!(
                "distance matrix for {} labels needs {} values, got {}",
                n,
                n * n,
                values.len()
            )));
        }
        let matrix = Self { labels, values };
        matrix.validate()?;
        Ok(matrix)
    }

    fn validate(&self) -> Result<()> {
        let n = self.n();
        for i in 0..n {
            if self.get(i, i) != 0.0 {
                return Err(ClusterError::InvalidParameter(format!(
                    "non-zero self distance for '{}'",
                    self.labels[i]
                )));
            }
            for j in (i + 1)..n {
                if (self.get(i, j) - self.get(j, i)).abs() > 1e-9 {
                    return Err(ClusterError::InvalidParameter(format!(
                        "asymmetric distance between '{}' and '{}'",
                        self.labels[i], self.labels[j]
                    )));
                }
            }
        }
        Ok(())
    }

    /// Number of samples on each axis.
    pub fn n(&self) -> usize {
        self.labels.len()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Distance between samples at `i` and `j`.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.n() + j]
    }

    /// Row `i` of the matrix.
    pub fn row(&self, i: usize) -> &[f64] {
        let n = self.n();
        &self.values[i * n..(i + 1) * n]
    }

    /// Distances of the strict upper triangle in row-major order.
    pub fn pairwise_distances(&self) -> Vec<f64> {
        let n = self.n();
        let mut out = Vec::with_capacity(n * n.saturating_sub(1) / 2);
        for i in 0..n {
            for j in (i + 1)..n {
                out.push(self.get(i, j));
            }
        }
        out
    }

    /// Load a matrix from TSV: a label column followed by one column per sample.
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .from_path(path)?;

        let labels: Vec<String> = reader.headers()?.iter().skip(1).map(String::from).collect();
        let mut values = Vec::with_capacity(labels.len() * labels.len());
        for (row_idx, record) in reader.records().enumerate() {
            let record = record?;
            let row_label = record.get(0).unwrap_or_default();
            if labels.get(row_idx).map(String::as_str) != Some(row_label) {
                return Err(ClusterError::InvalidParameter(format!(
                    "row {} of {:?} is labeled '{}' but the header expects '{}'",
                    row_idx,
                    path,
                    row_label,
                    labels.get(row_idx).map(String::as_str).unwrap_or_default()
                )));
            }
            for cell in record.iter().skip(1) {
                let v: f64 = cell.trim().parse().map_err(|_| {
                    ClusterError::InvalidParameter(format!(
                        "non-numeric distance '{}' in {:?}",
                        cell, path
                    ))
                })?;
                values.push(v);
            }
        }
        Self::new(labels, values)
    }

    /// Write the matrix as TSV.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_path(path)?;
        let mut header = vec![MATRIX_INDEX_HEADER.to_string()];
        header.extend(self.labels.iter().cloned());
        writer.write_record(&header)?;
        for (i, label) in self.labels.iter().enumerate() {
            let mut row = vec![label.clone()];
            row.extend(self.row(i).iter().map(|v| format_number(*v)));
            writer.write_record(&row)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Write the binary artifact produced by a distance service.
    pub fn write_bin<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        bincode::serialize_into(writer, self)?;
        Ok(())
    }

    /// Read a binary artifact written by [`DistanceMatrix::write_bin`].
    pub fn read_bin<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let matrix: Self = bincode::deserialize_from(reader)?;
        matrix.validate()?;
        Ok(matrix)
    }
}

/// Integral values are written without a fractional part.
pub fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        v.to_string()
    }
}
