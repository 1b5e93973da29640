//! Whole-file tab-delimited tables with string cells.

use crate::error::{ClusterError, Result};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// A rectangular table of string cells with named columns.
///
/// Every row holds exactly one cell per column; short rows read from disk are
/// padded with empty strings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Create an empty table with the given columns.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Create a table from rows, padding or truncating each to the header width.
    pub fn with_rows(columns: Vec<String>, rows: impl IntoIterator<Item = Vec<String>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self { columns, rows }
    }

    /// Load a table from a TSV file with a header row.
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ClusterError::InputNotFound(path.to_path_buf()));
        }
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(true)
            .from_path(path)?;

        let columns: Vec<String> = reader.headers()?.iter().map(|s| s.to_string()).collect();
        if columns.is_empty() {
            return Err(ClusterError::EmptyData(format!("{:?} has no header", path)));
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }
            let mut row: Vec<String> = record.iter().map(|s| s.to_string()).collect();
            row.resize(columns.len(), String::new());
            rows.push(row);
        }

        Ok(Self { columns, rows })
    }

    /// Write the table to a TSV file with a header row.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_path(path)?;
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of data rows.
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Check if a column exists.
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Position of a column, or a `MissingColumn` error.
    pub fn column_index(&self, column: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| ClusterError::MissingColumn(column.to_string()))
    }

    /// All values of a column in row order.
    pub fn column(&self, column: &str) -> Result<Vec<&str>> {
        let idx = self.column_index(column)?;
        Ok(self.rows.iter().map(|row| row[idx].as_str()).collect())
    }

    /// Cell at (row, column name).
    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row).map(|r| r[idx].as_str())
    }

    /// Append a row; its width must match the header.
    pub fn push_row(&mut self, row: Vec<String>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(ClusterError::InvalidParameter(format!(
                "row has {} cells but table has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Rows whose `key` column value is in `keep`, in table order.
    pub fn filter_by(&self, key: &str, keep: &HashSet<&str>) -> Result<Self> {
        let idx = self.column_index(key)?;
        Ok(Self {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .filter(|row| keep.contains(row[idx].as_str()))
                .cloned()
                .collect(),
        })
    }

    /// Left join `right` onto this table by key.
    ///
    /// Columns of `right` other than its key are appended (replacing any column of
    /// the same name). Rows without a match receive empty cells.
    pub fn left_join(&self, key: &str, right: &Table, right_key: &str) -> Result<Self> {
        let left_idx = self.column_index(key)?;
        let right_idx = right.column_index(right_key)?;

        let right_cols: Vec<(usize, &String)> = right
            .columns
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != right_idx)
            .collect();
        let lookup: HashMap<&str, &Vec<String>> = right
            .rows
            .iter()
            .map(|row| (row[right_idx].as_str(), row))
            .collect();

        let kept: Vec<usize> = (0..self.columns.len())
            .filter(|&i| !right_cols.iter().any(|(_, name)| **name == self.columns[i]))
            .collect();

        let mut columns: Vec<String> = kept.iter().map(|&i| self.columns[i].clone()).collect();
        columns.extend(right_cols.iter().map(|(_, name)| (*name).clone()));

        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut out: Vec<String> = kept.iter().map(|&i| row[i].clone()).collect();
                match lookup.get(row[left_idx].as_str()) {
                    Some(matched) => out.extend(right_cols.iter().map(|(i, _)| matched[*i].clone())),
                    None => out.extend(right_cols.iter().map(|_| String::new())),
                }
                out
            })
            .collect();

        Ok(Self { columns, rows })
    }

    /// Stack tables vertically over the union of their columns.
    ///
    /// Column order follows first appearance; absent cells are empty.
    pub fn concat<'a, I>(tables: I) -> Self
    where
        I: IntoIterator<Item = &'a Table>,
    {
        let tables: Vec<&Table> = tables.into_iter().collect();
        let mut columns: Vec<String> = Vec::new();
        for table in &tables {
            for col in &table.columns {
                if !columns.contains(col) {
                    columns.push(col.clone());
                }
            }
        }

        let mut rows = Vec::new();
        for table in tables {
            let mapping: Vec<Option<usize>> = columns
                .iter()
                .map(|c| table.columns.iter().position(|t| t == c))
                .collect();
            for row in &table.rows {
                rows.push(
                    mapping
                        .iter()
                        .map(|m| m.map(|i| row[i].clone()).unwrap_or_default())
                        .collect(),
                );
            }
        }

        Self { columns, rows }
    }

    /// Project onto `(source, output_name, default)` triples.
    ///
    /// Sources missing from the table are filled with their default.
    pub fn project(&self, projection: &[(String, String, String)]) -> Self {
        let sources: Vec<Option<usize>> = projection
            .iter()
            .map(|(src, _, _)| self.columns.iter().position(|c| c == src))
            .collect();
        let columns = projection.iter().map(|(_, name, _)| name.clone()).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| {
                sources
                    .iter()
                    .zip(projection)
                    .map(|(src, (_, _, default))| match src {
                        Some(i) => row[*i].clone(),
                        None => default.clone(),
                    })
                    .collect()
            })
            .collect();
        Self { columns, rows }
    }
}
