//! Allelic profiles: one row of locus calls per sample.

use crate::data::metadata::is_missing;
use crate::data::table::Table;
use crate::error::{ClusterError, Result};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::path::Path;

/// Per-locus mapping from the allele text found in the input to its integer code.
pub type AlleleMap = IndexMap<String, IndexMap<String, u32>>;

/// Code used for a missing allele call.
pub const MISSING_ALLELE: u32 = 0;

fn is_missing_call(value: &str) -> bool {
    let v = value.trim();
    is_missing(v) || v == "-" || v == "?"
}

/// Integer-encoded allelic profiles.
#[derive(Debug, Clone, PartialEq)]
pub struct AllelicProfiles {
    id_header: String,
    sample_ids: Vec<String>,
    loci: Vec<String>,
    /// Allele codes, one row per sample.
    calls: Vec<Vec<u32>>,
}

impl AllelicProfiles {
    /// Create profiles from already-encoded calls.
    pub fn new(
        id_header: &str,
        sample_ids: Vec<String>,
        loci: Vec<String>,
        calls: Vec<Vec<u32>>,
    ) -> Result<Self> {
        if sample_ids.len() != calls.len() {
            return Err(ClusterError::InvalidParameter(format!(
                "{} sample ids but {} profile rows",
                sample_ids.len(),
                calls.len()
            )));
        }
        if let Some(row) = calls.iter().find(|r| r.len() != loci.len()) {
            return Err(ClusterError::InvalidParameter(format!(
                "profile row has {} calls but there are {} loci",
                row.len(),
                loci.len()
            )));
        }
        Ok(Self {
            id_header: id_header.to_string(),
            sample_ids,
            loci,
            calls,
        })
    }

    /// Load profiles from a TSV file whose first column holds sample ids.
    ///
    /// Non-negative integer calls keep their value (`0` is missing). Any other
    /// allele text is assigned a fresh code above the largest integer call seen
    /// at that locus; the assignments are returned as an [`AlleleMap`].
    ///
    /// A file with an id column but no loci is accepted; every distance between
    /// its samples is zero.
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<(Self, AlleleMap)> {
        let path = path.as_ref();
        let table = Table::from_tsv(path)?;
        if table.is_empty() {
            return Err(ClusterError::EmptyData(format!(
                "profile file {:?} has no samples",
                path
            )));
        }
        Self::encode(&table)
    }

    fn encode(table: &Table) -> Result<(Self, AlleleMap)> {
        let id_header = table.columns()[0].clone();
        let loci: Vec<String> = table.columns()[1..].to_vec();
        let rows = table.rows();
        let mut calls = vec![vec![MISSING_ALLELE; loci.len()]; rows.len()];
        let mut allele_map = AlleleMap::new();

        for (l, locus) in loci.iter().enumerate() {
            let col = l + 1;
            let max_numeric = rows
                .iter()
                .filter_map(|row| row[col].trim().parse::<u32>().ok())
                .max()
                .unwrap_or(0);
            let mut next_code = max_numeric.checked_add(1);
            let mut mapping: IndexMap<String, u32> = IndexMap::new();

            for (s, row) in rows.iter().enumerate() {
                let raw = row[col].trim();
                if is_missing_call(raw) {
                    continue;
                }
                calls[s][l] = match raw.parse::<u32>() {
                    Ok(code) => code,
                    Err(_) => match mapping.get(raw) {
                        Some(&code) => code,
                        None => {
                            let code = next_code.ok_or_else(|| {
                                ClusterError::InvalidParameter(format!(
                                    "locus '{}' has no allele code left for '{}'",
                                    locus, raw
                                ))
                            })?;
                            next_code = code.checked_add(1);
                            mapping.insert(raw.to_string(), code);
                            code
                        }
                    },
                };
            }
            if !mapping.is_empty() {
                allele_map.insert(locus.clone(), mapping);
            }
        }

        let sample_ids = rows.iter().map(|row| row[0].clone()).collect();
        Ok((
            Self {
                id_header,
                sample_ids,
                loci,
                calls,
            },
            allele_map,
        ))
    }

    /// Write encoded profiles to a TSV file.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.to_table().to_tsv(path)
    }

    pub fn id_header(&self) -> &str {
        &self.id_header
    }

    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    pub fn loci(&self) -> &[String] {
        &self.loci
    }

    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    pub fn n_loci(&self) -> usize {
        self.loci.len()
    }

    /// Allele codes for the sample at `idx`.
    pub fn calls(&self, idx: usize) -> &[u32] {
        &self.calls[idx]
    }

    /// Profiles restricted to the given samples, keeping file order.
    pub fn subset_samples<S: AsRef<str>>(&self, sample_ids: &[S]) -> Self {
        let keep: HashSet<&str> = sample_ids.iter().map(|s| s.as_ref()).collect();
        let (ids, calls) = self
            .sample_ids
            .iter()
            .zip(&self.calls)
            .filter(|(id, _)| keep.contains(id.as_str()))
            .map(|(id, row)| (id.clone(), row.clone()))
            .unzip();
        Self {
            id_header: self.id_header.clone(),
            sample_ids: ids,
            loci: self.loci.clone(),
            calls,
        }
    }

    /// Drop loci whose fraction of missing calls exceeds `max_missing_frac`.
    pub fn drop_sparse_loci(&self, max_missing_frac: f64) -> Self {
        let n = self.n_samples();
        if n == 0 {
            return self.clone();
        }
        let keep: Vec<usize> = (0..self.n_loci())
            .filter(|&l| {
                let missing = self.calls.iter().filter(|r| r[l] == MISSING_ALLELE).count();
                missing as f64 / n as f64 <= max_missing_frac
            })
            .collect();
        Self {
            id_header: self.id_header.clone(),
            sample_ids: self.sample_ids.clone(),
            loci: keep.iter().map(|&l| self.loci[l].clone()).collect(),
            calls: self
                .calls
                .iter()
                .map(|r| keep.iter().map(|&l| r[l]).collect())
                .collect(),
        }
    }

    /// View of the calls as a table of strings, one row per sample.
    pub fn to_table(&self) -> Table {
        let mut columns = vec![self.id_header.clone()];
        columns.extend(self.loci.iter().cloned());
        let rows = self.sample_ids.iter().zip(&self.calls).map(|(id, row)| {
            let mut cells = vec![id.clone()];
            cells.extend(row.iter().map(|c| c.to_string()));
            cells
        });
        Table::with_rows(columns, rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_profile_tsv() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "sample_id\tlocus1\tlocus2\tlocus3").unwrap();
        writeln!(file, "S1\t1\tabc\t0").unwrap();
        writeln!(file, "S2\t2\tdef\t-").unwrap();
        writeln!(file, "S3\t1\tabc\t4").unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_encode_mixed_alleles() {
        let file = create_profile_tsv();
        let (profiles, allele_map) = AllelicProfiles::from_tsv(file.path()).unwrap();

        assert_eq!(profiles.n_samples(), 3);
        assert_eq!(profiles.loci(), &["locus1", "locus2", "locus3"]);
        assert_eq!(profiles.calls(0), &[1, 1, 0]);
        assert_eq!(profiles.calls(1), &[2, 2, 0]);
        assert_eq!(profiles.calls(2), &[1, 1, 4]);

        assert_eq!(allele_map["locus2"]["abc"], 1);
        assert_eq!(allele_map["locus2"]["def"], 2);
        assert!(!allele_map.contains_key("locus1"));
    }

    #[test]
    fn test_hash_codes_do_not_collide_with_numbers() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "id\tl1").unwrap();
        writeln!(file, "S1\t7").unwrap();
        writeln!(file, "S2\tzzz").unwrap();
        file.flush().unwrap();

        let (profiles, allele_map) = AllelicProfiles::from_tsv(file.path()).unwrap();
        assert_eq!(profiles.calls(1), &[8]);
        assert_eq!(allele_map["l1"]["zzz"], 8);
    }

    #[test]
    fn test_largest_numeric_call() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "id\tl1").unwrap();
        writeln!(file, "S1\t4294967295").unwrap();
        writeln!(file, "S2\t1").unwrap();
        file.flush().unwrap();
        let (profiles, allele_map) = AllelicProfiles::from_tsv(file.path()).unwrap();
        assert_eq!(profiles.calls(0), &[u32::MAX]);
        assert!(allele_map.is_empty());

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "id\tl1").unwrap();
        writeln!(file, "S1\t4294967295").unwrap();
        writeln!(file, "S2\tabc").unwrap();
        file.flush().unwrap();
        assert!(matches!(
            AllelicProfiles::from_tsv(file.path()),
            Err(ClusterError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_all_loci_dropped() {
        let file = create_profile_tsv();
        let (profiles, _) = AllelicProfiles::from_tsv(file.path()).unwrap();
        let empty = profiles.subset_samples(&["S1", "S2"]).drop_sparse_loci(0.0);
        assert_eq!(empty.n_loci(), 2);
        let none = profiles.drop_sparse_loci(-1.0);
        assert_eq!(none.n_loci(), 0);

        let out = NamedTempFile::new().unwrap();
        none.to_tsv(out.path()).unwrap();
        let (reloaded, _) = AllelicProfiles::from_tsv(out.path()).unwrap();
        assert_eq!(reloaded.sample_ids(), &["S1", "S2", "S3"]);
        assert_eq!(reloaded.n_loci(), 0);
    }

    #[test]
    fn test_subset_and_drop_sparse() {
        let file = create_profile_tsv();
        let (profiles, _) = AllelicProfiles::from_tsv(file.path()).unwrap();

        let subset = profiles.subset_samples(&["S3", "S1"]);
        assert_eq!(subset.sample_ids(), &["S1", "S3"]);

        // locus3 is missing in 2 of 3 samples
        let dense = profiles.drop_sparse_loci(0.5);
        assert_eq!(dense.loci(), &["locus1", "locus2"]);
        assert_eq!(profiles.drop_sparse_loci(1.0).n_loci(), 3);
    }

    #[test]
    fn test_write_encoded() {
        let file = create_profile_tsv();
        let (profiles, _) = AllelicProfiles::from_tsv(file.path()).unwrap();
        let out = NamedTempFile::new().unwrap();
        profiles.to_tsv(out.path()).unwrap();

        let (reloaded, allele_map) = AllelicProfiles::from_tsv(out.path()).unwrap();
        assert!(allele_map.is_empty());
        assert_eq!(reloaded, profiles);
    }
}
