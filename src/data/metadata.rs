//! Sample metadata keyed by an identifier column.

use crate::data::table::Table;
use crate::error::{ClusterError, Result};
use std::collections::HashSet;
use std::path::Path;

/// Cell values treated as missing.
pub const MISSING_TOKENS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "None", "<NA>"];

/// Check if a raw cell value is missing.
pub fn is_missing(value: &str) -> bool {
    MISSING_TOKENS.contains(&value.trim())
}

/// Per-sample metadata table with a designated identifier column.
#[derive(Debug, Clone)]
pub struct Metadata {
    table: Table,
    id_col: String,
}

impl Metadata {
    /// Wrap an existing table, checking that the id column exists.
    pub fn new(table: Table, id_col: &str) -> Result<Self> {
        table.column_index(id_col)?;
        Ok(Self {
            table,
            id_col: id_col.to_string(),
        })
    }

    /// Load metadata from a TSV file.
    ///
    /// Fails if the file is absent, has no usable rows, or lacks the id column.
    pub fn from_tsv<P: AsRef<Path>>(path: P, id_col: &str) -> Result<Self> {
        let path = path.as_ref();
        let table = Table::from_tsv(path)?;
        if table.is_empty() {
            return Err(ClusterError::EmptyData(format!(
                "metadata file {:?} has no rows",
                path
            )));
        }
        Self::new(table, id_col)
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn id_col(&self) -> &str {
        &self.id_col
    }

    /// Column names.
    pub fn column_names(&self) -> &[String] {
        self.table.columns()
    }

    /// Number of samples.
    pub fn n_samples(&self) -> usize {
        self.table.n_rows()
    }

    /// Sample IDs in file order.
    pub fn sample_ids(&self) -> Vec<&str> {
        // id column existence is checked on construction
        self.table.column(&self.id_col).unwrap_or_default()
    }

    /// Check if a column exists.
    pub fn has_column(&self, column: &str) -> bool {
        self.table.has_column(column)
    }

    /// `(sample_id, value)` pairs for a column, dropping missing values.
    pub fn non_missing(&self, column: &str) -> Result<Vec<(&str, &str)>> {
        let values = self.table.column(column)?;
        Ok(self
            .sample_ids()
            .into_iter()
            .zip(values)
            .filter(|(_, v)| !is_missing(v))
            .collect())
    }

    /// Subset metadata to the given samples, keeping file order.
    pub fn subset_samples<S: AsRef<str>>(&self, sample_ids: &[S]) -> Result<Self> {
        let keep: HashSet<&str> = sample_ids.iter().map(|s| s.as_ref()).collect();
        Ok(Self {
            table: self.table.filter_by(&self.id_col, &keep)?,
            id_col: self.id_col.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_tsv() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "region\tsample_id\tage").unwrap();
        writeln!(file, "east\tS1\t25").unwrap();
        writeln!(file, "NA\tS2\t30").unwrap();
        writeln!(file, "west\tS3\t").unwrap();
        writeln!(file, "east\tS4\t28").unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_metadata() {
        let file = create_test_tsv();
        let meta = Metadata::from_tsv(file.path(), "sample_id").unwrap();
        assert_eq!(meta.n_samples(), 4);
        assert_eq!(meta.sample_ids(), vec!["S1", "S2", "S3", "S4"]);
    }

    #[test]
    fn test_missing_id_column() {
        let file = create_test_tsv();
        let err = Metadata::from_tsv(file.path(), "id").unwrap_err();
        assert!(matches!(err, ClusterError::MissingColumn(c) if c == "id"));
    }

    #[test]
    fn test_header_only_is_empty() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "sample_id\tregion").unwrap();
        file.flush().unwrap();
        let err = Metadata::from_tsv(file.path(), "sample_id").unwrap_err();
        assert!(matches!(err, ClusterError::EmptyData(_)));
    }

    #[test]
    fn test_non_missing_drops_na() {
        let file = create_test_tsv();
        let meta = Metadata::from_tsv(file.path(), "sample_id").unwrap();
        let pairs = meta.non_missing("region").unwrap();
        assert_eq!(pairs, vec![("S1", "east"), ("S3", "west"), ("S4", "east")]);
    }

    #[test]
    fn test_subset_keeps_file_order() {
        let file = create_test_tsv();
        let meta = Metadata::from_tsv(file.path(), "sample_id").unwrap();
        let subset = meta.subset_samples(&["S4", "S1"]).unwrap();
        assert_eq!(subset.sample_ids(), vec!["S1", "S4"]);
    }
}
