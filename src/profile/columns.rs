//! Per-column value-count profiles with normalised Shannon entropy.

use crate::data::{is_missing, AllelicProfiles, Table};
use crate::error::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Value counts and diversity of a single column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    /// Number of distinct non-missing values.
    pub num_values: usize,
    /// Number of cells holding the missing token.
    pub num_missing: usize,
    /// Distinct value → number of cells, most frequent first.
    pub value_counts: IndexMap<String, usize>,
    /// Normalised Shannon entropy; `0` for one value, `-1` when there are none.
    pub shannon_entropy: f64,
}

impl ColumnProfile {
    /// Build a profile from raw cell values.
    ///
    /// Cells equal to `missing` count towards `num_missing`; cells that are empty
    /// or NA-like are ignored altogether.
    pub fn from_values<'a, I>(values: I, missing: Option<&str>) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut counts: IndexMap<String, usize> = IndexMap::new();
        let mut num_missing = 0;
        for value in values {
            if is_missing(value) {
                continue;
            }
            if Some(value) == missing {
                num_missing += 1;
                continue;
            }
            *counts.entry(value.to_string()).or_insert(0) += 1;
        }
        // Stable sort keeps first-seen order among ties
        counts.sort_by(|_, a, _, b| b.cmp(a));

        let frequencies: Vec<usize> = counts.values().copied().collect();
        let shannon_entropy = match frequencies.len() {
            0 => -1.0,
            1 => 0.0,
            _ => normalized_entropy(&frequencies),
        };

        Self {
            num_values: counts.len(),
            num_missing,
            value_counts: counts,
            shannon_entropy,
        }
    }
}

/// Shannon entropy of the count distribution divided by its maximum, `ln(k)`.
pub fn normalized_entropy(counts: &[usize]) -> f64 {
    let total: usize = counts.iter().sum();
    if counts.len() < 2 || total == 0 {
        return 0.0;
    }
    let total = total as f64;
    let h: f64 = counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.ln()
        })
        .sum();
    h / (counts.len() as f64).ln()
}

/// Profile every column of a table except those in `skip`.
pub fn profile_columns(
    table: &Table,
    skip: &[&str],
    missing: Option<&str>,
) -> IndexMap<String, ColumnProfile> {
    let mut out = IndexMap::new();
    for (idx, column) in table.columns().iter().enumerate() {
        if skip.contains(&column.as_str()) {
            continue;
        }
        let values = table.rows().iter().map(|row| row[idx].as_str());
        out.insert(column.clone(), ColumnProfile::from_values(values, missing));
    }
    out
}

/// Profile each locus of encoded allelic profiles; code `0` is the missing token.
pub fn profile_loci(profiles: &AllelicProfiles) -> IndexMap<String, ColumnProfile> {
    let table = profiles.to_table();
    let id = profiles.id_header().to_string();
    profile_columns(&table, &[id.as_str()], Some("0"))
}

/// Write a loci summary report.
pub fn write_loci_summary<P: AsRef<Path>>(
    loci: &IndexMap<String, ColumnProfile>,
    path: P,
) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "locus\tnum_values\tnum_missing\tshannon_entropy\tvalue_counts")?;
    for (locus, profile) in loci {
        let counts = serde_json::to_string(&profile.value_counts)?;
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}",
            locus, profile.num_values, profile.num_missing, profile.shannon_entropy, counts
        )?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_counts_sorted_by_frequency() {
        let p = ColumnProfile::from_values(["x", "y", "y", "", "NA", "y", "x", "z"], None);
        assert_eq!(p.num_values, 3);
        assert_eq!(p.num_missing, 0);
        let order: Vec<&str> = p.value_counts.keys().map(String::as_str).collect();
        assert_eq!(order, vec!["y", "x", "z"]);
        assert_eq!(p.value_counts["y"], 3);
    }

    #[test]
    fn test_missing_token_counted_separately() {
        let p = ColumnProfile::from_values(["1", "0", "0", "2"], Some("0"));
        assert_eq!(p.num_missing, 2);
        assert_eq!(p.num_values, 2);
        assert!(!p.value_counts.contains_key("0"));
    }

    #[test]
    fn test_entropy_edge_cases() {
        assert_eq!(ColumnProfile::from_values(Vec::<&str>::new(), None).shannon_entropy, -1.0);
        assert_eq!(ColumnProfile::from_values(["a", "a"], None).shannon_entropy, 0.0);
        let uniform = ColumnProfile::from_values(["a", "b", "c", "d"], None);
        assert!((uniform.shannon_entropy - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_skewed_entropy_below_one() {
        let h = normalized_entropy(&[9, 1]);
        assert!(h > 0.0 && h < 1.0);
    }

    #[test]
    fn test_profile_columns_skips() {
        let mut t = Table::new(vec!["id".into(), "region".into()]);
        t.push_row(vec!["S1".into(), "east".into()]).unwrap();
        t.push_row(vec!["S2".into(), "west".into()]).unwrap();
        let profiles = profile_columns(&t, &["id"], None);
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles["region"].num_values, 2);
    }
}
