//! Splitting a sample population into groups by a metadata column.

use crate::data::Metadata;
use crate::error::Result;
use indexmap::IndexMap;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;
use tracing::{debug, warn};

fn unsafe_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9_\-.]").expect("static pattern"))
}

/// Replace every character outside `[A-Za-z0-9_-.]` with `_`.
///
/// Tokens made only of dots (`.`, `..`) would name the output directory or its
/// parent, so each dot becomes `_` there too.
pub fn sanitize_token(group_id: &str) -> String {
    let token = unsafe_chars().replace_all(group_id, "_").into_owned();
    if token.chars().all(|c| c == '.') {
        return "_".repeat(token.len().max(1));
    }
    token
}

/// Groups of samples and their directory tokens.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partition {
    /// Group id → member sample ids, in first-seen order.
    pub groups: IndexMap<String, Vec<String>>,
    /// Group id → unique, filesystem-safe directory name.
    pub directories: IndexMap<String, String>,
    /// Samples with a partition value but absent from the population.
    pub unassigned: Vec<String>,
}

impl Partition {
    /// Number of grouped samples.
    pub fn n_samples(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    /// Every grouped sample, in group order.
    pub fn samples(&self) -> impl Iterator<Item = &String> {
        self.groups.values().flatten()
    }
}

/// Maps samples to groups using a metadata column.
#[derive(Debug, Clone)]
pub struct Partitioner {
    /// `(sample, group)` for every row with a partition value, in file order.
    assignments: Vec<(String, String)>,
}

impl Partitioner {
    /// Read the partition column; rows with a missing value are dropped.
    ///
    /// Fails if the partition column is absent from the metadata.
    pub fn new(metadata: &Metadata, partition_col: &str) -> Result<Self> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut assignments = Vec::new();
        for (sample, group) in metadata.non_missing(partition_col)? {
            if !seen.insert(sample) {
                warn!(sample, "duplicate sample id in metadata, keeping first row");
                continue;
            }
            assignments.push((sample.to_string(), group.to_string()));
        }
        debug!(
            n = assignments.len(),
            column = partition_col,
            "read partition assignments"
        );
        Ok(Self { assignments })
    }

    /// Build from explicit `(sample, group)` pairs.
    pub fn from_assignments(assignments: Vec<(String, String)>) -> Self {
        Self { assignments }
    }

    /// Partition the samples of `population` into groups.
    pub fn partition<S: AsRef<str>>(&self, population: &[S]) -> Partition {
        let population: HashSet<&str> = population.iter().map(|s| s.as_ref()).collect();
        let mut partition = Partition::default();
        let mut used_tokens: HashSet<String> = HashSet::new();

        for (sample, group) in &self.assignments {
            if !population.contains(sample.as_str()) {
                partition.unassigned.push(sample.clone());
                continue;
            }
            if !partition.directories.contains_key(group) {
                let mut token = sanitize_token(group);
                while used_tokens.contains(&token) {
                    token.push_str("-1");
                }
                used_tokens.insert(token.clone());
                partition.directories.insert(group.clone(), token);
            }
            partition
                .groups
                .entry(group.clone())
                .or_default()
                .push(sample.clone());
        }

        if !partition.unassigned.is_empty() {
            warn!(
                n = partition.unassigned.len(),
                "samples with a partition value have no allelic profile"
            );
        }
        partition
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Table;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(s, g)| (s.to_string(), g.to_string()))
            .collect()
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize_token("A/B"), "A_B");
        assert_eq!(sanitize_token("A B"), "A_B");
        assert_eq!(sanitize_token("ok-1.2_x"), "ok-1.2_x");
        assert_eq!(sanitize_token("é"), "_");
    }

    #[test]
    fn test_dot_only_tokens_stay_inside_outdir() {
        assert_eq!(sanitize_token("."), "_");
        assert_eq!(sanitize_token(".."), "__");
        assert_eq!(sanitize_token("..."), "___");
        assert_eq!(sanitize_token(""), "_");
        assert_eq!(sanitize_token("../x"), ".._x");

        let p = Partitioner::from_assignments(pairs(&[("S1", ".."), ("S2", "__"), ("S3", ".")]))
            .partition(&["S1", "S2", "S3"]);
        assert_eq!(p.directories[".."], "__");
        assert_eq!(p.directories["__"], "__-1");
        assert_eq!(p.directories["."], "_");
    }

    #[test]
    fn test_group_values_are_not_trimmed() {
        let p = Partitioner::from_assignments(pairs(&[("S1", "east"), ("S2", "east ")]))
            .partition(&["S1", "S2"]);
        assert_eq!(p.groups.len(), 2);
        assert_eq!(p.directories["east"], "east");
        assert_eq!(p.directories["east "], "east_");
    }

    #[test]
    fn test_colliding_tokens_are_suffixed() {
        let p = Partitioner::from_assignments(pairs(&[
            ("S1", "A/B"),
            ("S2", "A B"),
            ("S3", "A_B"),
            ("S4", "A/B"),
        ]))
        .partition(&["S1", "S2", "S3", "S4"]);

        assert_eq!(p.directories["A/B"], "A_B");
        assert_eq!(p.directories["A B"], "A_B-1");
        assert_eq!(p.directories["A_B"], "A_B-1-1");
        assert_eq!(p.groups["A/B"], vec!["S1", "S4"]);
    }

    #[test]
    fn test_every_sample_in_exactly_one_group() {
        let p = Partitioner::from_assignments(pairs(&[
            ("S1", "x"),
            ("S2", "y"),
            ("S3", "x"),
            ("S4", "z"),
        ]))
        .partition(&["S1", "S2", "S3", "S4", "S5"]);

        assert_eq!(p.n_samples(), 4);
        let mut all: Vec<&String> = p.samples().collect();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 4);
        assert_eq!(p.groups.keys().collect::<Vec<_>>(), vec!["x", "y", "z"]);
    }

    #[test]
    fn test_samples_without_profile_are_unassigned() {
        let p = Partitioner::from_assignments(pairs(&[("S1", "x"), ("S2", "x")]))
            .partition(&["S1"]);
        assert_eq!(p.groups["x"], vec!["S1"]);
        assert_eq!(p.unassigned, vec!["S2"]);
    }

    #[test]
    fn test_from_metadata_drops_missing_and_checks_column() {
        let mut t = Table::new(vec!["id".into(), "region".into()]);
        t.push_row(vec!["S1".into(), "east".into()]).unwrap();
        t.push_row(vec!["S2".into(), "".into()]).unwrap();
        t.push_row(vec!["S3".into(), "west".into()]).unwrap();
        t.push_row(vec!["S4".into(), "west ".into()]).unwrap();
        let meta = Metadata::new(t, "id").unwrap();

        let p = Partitioner::new(&meta, "region").unwrap().partition(&["S1", "S2", "S3", "S4"]);
        assert_eq!(p.n_samples(), 3);
        assert_eq!(p.groups["west"], vec!["S3"]);
        assert_eq!(p.groups["west "], vec!["S4"]);
        assert!(Partitioner::new(&meta, "country").is_err());
    }
}
