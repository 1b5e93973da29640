//! Per-sample line lists and the profile/metadata overlap report.

use crate::config::ColumnSpec;
use crate::data::{Metadata, Table};
use crate::error::Result;
use crate::pipeline::ADDRESS_COLUMN;
use indexmap::IndexMap;
use std::collections::HashSet;
use tracing::warn;

/// Samples of clustered groups and everything else.
#[derive(Debug, Clone, PartialEq)]
pub struct LineLists {
    pub included: Table,
    pub excluded: Table,
}

/// Split metadata into included and excluded line lists.
///
/// `enriched` holds the address-enriched metadata of every clustered group;
/// its rows form the included list. Every other metadata row is excluded.
/// Columns configured with `display: true` come first under their labels,
/// followed by all remaining columns unless `restrict` is set. Configured
/// columns absent from the data are dropped with a warning.
pub fn build_line_lists(
    metadata: &Metadata,
    enriched: &[&Table],
    specs: &IndexMap<String, ColumnSpec>,
    restrict: bool,
) -> Result<LineLists> {
    let id_col = metadata.id_col();
    let included = Table::concat(enriched.iter().copied());

    let mut included_ids: HashSet<&str> = HashSet::new();
    if !included.is_empty() {
        included_ids.extend(included.column(id_col)?);
    }
    let excluded_ids: HashSet<&str> = metadata
        .sample_ids()
        .into_iter()
        .filter(|id| !included_ids.contains(id))
        .collect();
    let excluded = metadata.table().filter_by(id_col, &excluded_ids)?;

    let mut available: Vec<String> = metadata.column_names().to_vec();
    for column in included.columns() {
        if !available.contains(column) {
            available.push(column.clone());
        }
    }
    if !available.iter().any(|c| c == ADDRESS_COLUMN) {
        available.push(ADDRESS_COLUMN.to_string());
    }

    let mut projection: Vec<(String, String, String)> = Vec::new();
    for (name, spec) in specs.iter().filter(|(_, s)| s.display == Some(true)) {
        if available.contains(name) {
            projection.push((name.clone(), spec.label.clone(), String::new()));
        } else {
            warn!(column = name.as_str(), "configured line list column not found in metadata");
        }
    }
    if !restrict {
        for column in &available {
            if !projection.iter().any(|(src, _, _)| src == column) {
                projection.push((column.clone(), column.clone(), String::new()));
            }
        }
    }

    Ok(LineLists {
        included: included.project(&projection),
        excluded: excluded.project(&projection),
    })
}

/// Presence of each sample id in the profiles and in the metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleOverlap {
    /// `(sample_id, in_profile, in_metadata)`, metadata order first.
    pub rows: Vec<(String, bool, bool)>,
}

impl SampleOverlap {
    pub fn in_both(&self) -> usize {
        self.rows.iter().filter(|(_, p, m)| *p && *m).count()
    }

    pub fn profile_only(&self) -> usize {
        self.rows.iter().filter(|(_, p, m)| *p && !*m).count()
    }

    pub fn metadata_only(&self) -> usize {
        self.rows.iter().filter(|(_, p, m)| !*p && *m).count()
    }

    pub fn to_table(&self) -> Table {
        Table::with_rows(
            vec![
                "sample_id".to_string(),
                "in_profile".to_string(),
                "in_metadata".to_string(),
            ],
            self.rows
                .iter()
                .map(|(id, p, m)| vec![id.clone(), p.to_string(), m.to_string()]),
        )
    }
}

/// Compare the sample ids of the profiles with those of the metadata.
pub fn sample_overlap<P: AsRef<str>, M: AsRef<str>>(profile_ids: &[P], metadata_ids: &[M]) -> SampleOverlap {
    let profile: HashSet<&str> = profile_ids.iter().map(|s| s.as_ref()).collect();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut rows = Vec::new();

    for id in metadata_ids.iter().map(|s| s.as_ref()) {
        if seen.insert(id) {
            rows.push((id.to_string(), profile.contains(id), true));
        }
    }
    for id in profile_ids.iter().map(|s| s.as_ref()) {
        if seen.insert(id) {
            rows.push((id.to_string(), true, false));
        }
    }
    SampleOverlap { rows }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[&str], rows: &[&[&str]]) -> Table {
        let mut t = Table::new(columns.iter().map(|s| s.to_string()).collect());
        for row in rows {
            t.push_row(row.iter().map(|s| s.to_string()).collect()).unwrap();
        }
        t
    }

    fn metadata() -> Metadata {
        let t = table(
            &["sample_id", "region", "host"],
            &[&["S1", "a", "cow"], &["S2", "a", "pig"], &["S3", "b", "cow"], &["S4", "", "cow"]],
        );
        Metadata::new(t, "sample_id").unwrap()
    }

    fn enriched() -> Table {
        table(
            &["sample_id", "region", "host", ADDRESS_COLUMN],
            &[&["S1", "a", "cow", "a|1.1"], &["S2", "a", "pig", "a|1.2"]],
        )
    }

    fn spec(label: &str, display: Option<bool>) -> ColumnSpec {
        ColumnSpec {
            label: label.to_string(),
            default: None,
            data_type: None,
            display,
        }
    }

    #[test]
    fn test_split_included_and_excluded() {
        let e = enriched();
        let lists = build_line_lists(&metadata(), &[&e], &IndexMap::new(), false).unwrap();

        assert_eq!(lists.included.n_rows(), 2);
        assert_eq!(lists.included.get(1, ADDRESS_COLUMN), Some("a|1.2"));
        assert_eq!(lists.excluded.column("sample_id").unwrap(), vec!["S3", "S4"]);
        assert_eq!(lists.excluded.get(0, ADDRESS_COLUMN), Some(""));
        assert_eq!(lists.included.columns(), lists.excluded.columns());
    }

    #[test]
    fn test_configured_columns_first_and_relabeled() {
        let mut specs = IndexMap::new();
        specs.insert("host".to_string(), spec("Host", Some(true)));
        specs.insert("serotype".to_string(), spec("Serotype", Some(true)));
        specs.insert("region".to_string(), spec("Region", None));
        let e = enriched();

        let lists = build_line_lists(&metadata(), &[&e], &specs, false).unwrap();
        let cols = lists.included.columns();
        assert_eq!(cols[0], "Host");
        assert!(!cols.contains(&"Serotype".to_string()));
        assert!(cols.contains(&"region".to_string()));

        let restricted = build_line_lists(&metadata(), &[&e], &specs, true).unwrap();
        assert_eq!(restricted.included.columns(), &["Host"]);
        assert_eq!(restricted.excluded.column("Host").unwrap(), vec!["cow", "cow"]);
    }

    #[test]
    fn test_no_clustered_groups() {
        let lists = build_line_lists(&metadata(), &[], &IndexMap::new(), false).unwrap();
        assert!(lists.included.is_empty());
        assert_eq!(lists.excluded.n_rows(), 4);
        assert!(lists.excluded.has_column(ADDRESS_COLUMN));
    }

    #[test]
    fn test_sample_overlap() {
        let overlap = sample_overlap(&["S1", "S2", "S9"], &["S1", "S2", "S3"]);
        assert_eq!(overlap.in_both(), 2);
        assert_eq!(overlap.metadata_only(), 1);
        assert_eq!(overlap.profile_only(), 1);

        let t = overlap.to_table();
        assert_eq!(t.get(2, "sample_id"), Some("S3"));
        assert_eq!(t.get(2, "in_profile"), Some("false"));
        assert_eq!(t.get(3, "sample_id"), Some("S9"));
        assert_eq!(t.get(3, "in_metadata"), Some("false"));
    }
}
