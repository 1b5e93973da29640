//! Run configuration: loading, merging and one-time validation.
//!
//! Configuration arrives from two loosely typed sources, a JSON/YAML file and the
//! command line. Both are collected into a [`RawConfig`] whose scalar fields accept
//! numbers, booleans or strings; [`RawConfig::validate`] turns it into a strongly
//! typed [`RunConfig`] that the rest of the crate uses.

use crate::error::{ClusterError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Linkage rule used when merging clusters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkageMethod {
    Single,
    Complete,
    Average,
}

impl FromStr for LinkageMethod {
    type Err = ClusterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "single" => Ok(Self::Single),
            "complete" => Ok(Self::Complete),
            "average" => Ok(Self::Average),
            other => Err(ClusterError::Config(format!(
                "linkage method supplied is invalid: {}, it needs to be one of average, single, complete",
                other
            ))),
        }
    }
}

impl fmt::Display for LinkageMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Single => "single",
            Self::Complete => "complete",
            Self::Average => "average",
        };
        write!(f, "{}", name)
    }
}

/// How matrix values are interpreted when building the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeMode {
    /// Values are leaf-to-leaf path lengths; node heights are half the merge distance.
    Patristic,
    /// Values are merge heights.
    Cophenetic,
}

impl FromStr for TreeMode {
    type Err = ClusterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "patristic" => Ok(Self::Patristic),
            "cophenetic" => Ok(Self::Cophenetic),
            other => Err(ClusterError::Config(format!(
                "tree distance mode supplied is invalid: {}, it needs to be one of patristic, cophenetic",
                other
            ))),
        }
    }
}

/// Strictly decreasing, non-negative clustering thresholds.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Thresholds(Vec<f64>);

impl Thresholds {
    /// Validate a list of thresholds.
    pub fn new(values: Vec<f64>) -> Result<Self> {
        if values.is_empty() {
            return Err(ClusterError::Config("at least one threshold is required".into()));
        }
        if let Some(v) = values.iter().find(|v| !v.is_finite() || **v < 0.0) {
            return Err(ClusterError::Config(format!(
                "thresholds must be non-negative numbers, got {}",
                v
            )));
        }
        if values.windows(2).any(|w| w[1] >= w[0]) {
            return Err(ClusterError::Config(format!(
                "thresholds must be in strictly decreasing order: {:?}",
                values
            )));
        }
        Ok(Self(values))
    }

    /// Parse a comma-delimited list such as `"100,50,10"`.
    pub fn parse(text: &str) -> Result<Self> {
        let values = text
            .split(',')
            .map(|s| {
                s.trim().parse::<f64>().map_err(|_| {
                    ClusterError::Config(format!(
                        "thresholds need to be numeric and delimited by comma: {}",
                        text
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Nomenclature levels: `level_1` is the first (largest) threshold.
    pub fn threshold_map(&self) -> IndexMap<String, f64> {
        self.0
            .iter()
            .enumerate()
            .map(|(i, t)| (format!("level_{}", i + 1), *t))
            .collect()
    }
}

/// A loosely typed configuration value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    fn as_text(&self) -> String {
        match self {
            Scalar::Bool(b) => b.to_string(),
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Text(s) => s.clone(),
        }
    }

    fn as_bool(&self, key: &str) -> Result<bool> {
        match self {
            Scalar::Bool(b) => Ok(*b),
            Scalar::Text(s) => match s.trim().to_lowercase().as_str() {
                "t" | "true" => Ok(true),
                "f" | "false" => Ok(false),
                _ => Err(ClusterError::Config(format!(
                    "{} needs to be true or false: you supplied {}",
                    key, s
                ))),
            },
            other => Err(ClusterError::Config(format!(
                "{} needs to be true or false: you supplied {}",
                key,
                other.as_text()
            ))),
        }
    }

    fn as_f64(&self, key: &str) -> Result<f64> {
        match self {
            Scalar::Int(i) => Ok(*i as f64),
            Scalar::Float(f) => Ok(*f),
            Scalar::Text(s) => s.trim().parse().map_err(|_| {
                ClusterError::Config(format!("{} needs to be numeric: {}", key, s))
            }),
            Scalar::Bool(b) => Err(ClusterError::Config(format!(
                "{} needs to be numeric: {}",
                key, b
            ))),
        }
    }

    fn as_int(&self, key: &str) -> Result<i64> {
        match self {
            Scalar::Int(i) => Ok(*i),
            Scalar::Text(s) => s.trim().parse().map_err(|_| {
                ClusterError::Config(format!("{} needs to be an integer: {}", key, s))
            }),
            other => Err(ClusterError::Config(format!(
                "{} needs to be an integer: {}",
                key,
                other.as_text()
            ))),
        }
    }
}

/// Thresholds as given in a config file: a list or a comma-delimited string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawThresholds {
    List(Vec<Scalar>),
    Text(String),
}

impl RawThresholds {
    fn validate(&self) -> Result<Thresholds> {
        match self {
            RawThresholds::Text(s) => Thresholds::parse(s),
            RawThresholds::List(values) => Thresholds::new(
                values
                    .iter()
                    .map(|v| v.as_f64("thresholds"))
                    .collect::<Result<Vec<_>>>()?,
            ),
        }
    }
}

/// Display properties of a summary or line-list column, as written in a config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawColumn {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub default: Option<Scalar>,
    #[serde(default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub display: Option<Scalar>,
}

/// Validated display properties of a column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSpec {
    /// Output header; the column name when no label is configured.
    pub label: String,
    /// Value used when the column is absent.
    pub default: Option<String>,
    /// Lower-cased statistic type name, if configured.
    pub data_type: Option<String>,
    /// Explicit display flag.
    pub display: Option<bool>,
}

impl RawColumn {
    fn validate(&self, name: &str) -> Result<ColumnSpec> {
        let label = match self.label.as_deref() {
            Some(l) if !l.is_empty() => l.to_string(),
            _ => name.to_string(),
        };
        let display = match &self.display {
            Some(v) => Some(v.as_bool(&format!("display of column '{}'", name))?),
            None => None,
        };
        Ok(ColumnSpec {
            label,
            default: self.default.as_ref().map(Scalar::as_text),
            data_type: self.data_type.as_ref().map(|t| t.trim().to_lowercase()),
            display,
        })
    }
}

/// Configuration as read from a file and/or the command line, before validation.
///
/// Keys follow the configuration file format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawConfig {
    pub profile_file: Option<PathBuf>,
    pub partition_file: Option<PathBuf>,
    pub outdir: Option<PathBuf>,
    pub outlier_thresh: Option<Scalar>,
    pub thresholds: Option<RawThresholds>,
    pub method: Option<String>,
    pub tree_distances: Option<String>,
    pub force: Option<Scalar>,
    pub id_col: Option<String>,
    pub partition_col: Option<String>,
    pub min_members: Option<Scalar>,
    pub count_missing: Option<Scalar>,
    pub skip_qc: Option<Scalar>,
    pub missing_thresh: Option<Scalar>,
    pub delimeter: Option<String>,
    pub num_threads: Option<Scalar>,
    pub only_report_labeled_columns: Option<Scalar>,
    #[serde(default)]
    pub linelist_columns: IndexMap<String, RawColumn>,
    #[serde(default)]
    pub grouped_metadata_columns: IndexMap<String, RawColumn>,
}

impl RawConfig {
    /// Load from a JSON or YAML file, chosen by extension.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ClusterError::InputNotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&text),
            _ => Self::from_json(&text),
        }
    }

    /// Load from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(ClusterError::from)
    }

    /// Load from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(ClusterError::from)
    }

    /// Fill every unset field from `fallback`; values already set win.
    pub fn or(self, fallback: RawConfig) -> Self {
        Self {
            profile_file: self.profile_file.or(fallback.profile_file),
            partition_file: self.partition_file.or(fallback.partition_file),
            outdir: self.outdir.or(fallback.outdir),
            outlier_thresh: self.outlier_thresh.or(fallback.outlier_thresh),
            thresholds: self.thresholds.or(fallback.thresholds),
            method: self.method.or(fallback.method),
            tree_distances: self.tree_distances.or(fallback.tree_distances),
            force: self.force.or(fallback.force),
            id_col: self.id_col.or(fallback.id_col),
            partition_col: self.partition_col.or(fallback.partition_col),
            min_members: self.min_members.or(fallback.min_members),
            count_missing: self.count_missing.or(fallback.count_missing),
            skip_qc: self.skip_qc.or(fallback.skip_qc),
            missing_thresh: self.missing_thresh.or(fallback.missing_thresh),
            delimeter: self.delimeter.or(fallback.delimeter),
            num_threads: self.num_threads.or(fallback.num_threads),
            only_report_labeled_columns: self
                .only_report_labeled_columns
                .or(fallback.only_report_labeled_columns),
            linelist_columns: if self.linelist_columns.is_empty() {
                fallback.linelist_columns
            } else {
                self.linelist_columns
            },
            grouped_metadata_columns: if self.grouped_metadata_columns.is_empty() {
                fallback.grouped_metadata_columns
            } else {
                self.grouped_metadata_columns
            },
        }
    }

    /// Parse and check every field once, producing a typed configuration.
    pub fn validate(&self) -> Result<RunConfig> {
        let outlier_threshold = required(&self.outlier_thresh, "outlier_thresh")?
            .as_f64("outlier_thresh")?;
        if !outlier_threshold.is_finite() || outlier_threshold < 0.0 {
            return Err(ClusterError::Config(format!(
                "outlier threshold must be non-negative: {}",
                outlier_threshold
            )));
        }

        let min_members = match &self.min_members {
            Some(v) => v.as_int("min_members")?,
            None => 2,
        };
        if min_members < 2 {
            return Err(ClusterError::Config(format!(
                "min_members must be at least 2, got {}",
                min_members
            )));
        }

        let num_threads = match &self.num_threads {
            Some(v) => v.as_int("num_threads")?,
            None => 1,
        };
        if num_threads < 1 {
            return Err(ClusterError::Config(format!(
                "num_threads must be at least 1, got {}",
                num_threads
            )));
        }

        let missing_thresh = match &self.missing_thresh {
            Some(v) => v.as_f64("missing_thresh")?,
            None => 1.0,
        };
        if !(0.0..=1.0).contains(&missing_thresh) {
            return Err(ClusterError::Config(format!(
                "missing_thresh must be between 0 and 1, got {}",
                missing_thresh
            )));
        }

        let flag = |v: &Option<Scalar>, key: &str| -> Result<bool> {
            v.as_ref().map(|s| s.as_bool(key)).transpose().map(|b| b.unwrap_or(false))
        };

        let columns = |raw: &IndexMap<String, RawColumn>| -> Result<IndexMap<String, ColumnSpec>> {
            raw.iter()
                .map(|(name, col)| Ok((name.clone(), col.validate(name)?)))
                .collect()
        };

        Ok(RunConfig {
            profile_file: required(&self.profile_file, "profile_file")?.clone(),
            metadata_file: required(&self.partition_file, "partition_file")?.clone(),
            outdir: required(&self.outdir, "outdir")?.clone(),
            id_col: required(&self.id_col, "id_col")?.clone(),
            partition_col: required(&self.partition_col, "partition_col")?.clone(),
            outlier_threshold,
            thresholds: required(&self.thresholds, "thresholds")?.validate()?,
            linkage: self.method.as_deref().unwrap_or("average").parse()?,
            tree_mode: self.tree_distances.as_deref().unwrap_or("patristic").parse()?,
            min_members: min_members as usize,
            num_threads: num_threads as usize,
            count_missing: flag(&self.count_missing, "count_missing")?,
            skip_qc: flag(&self.skip_qc, "skip_qc")?,
            missing_thresh,
            delimiter: self.delimeter.clone().unwrap_or_else(|| ".".to_string()),
            force: flag(&self.force, "force")?,
            restrict_output: flag(&self.only_report_labeled_columns, "only_report_labeled_columns")?,
            linelist_columns: columns(&self.linelist_columns)?,
            summary_columns: columns(&self.grouped_metadata_columns)?,
        })
    }
}

fn required<'a, T>(value: &'a Option<T>, key: &str) -> Result<&'a T> {
    value
        .as_ref()
        .ok_or_else(|| ClusterError::Config(format!("missing required parameter '{}'", key)))
}

/// Validated run configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunConfig {
    pub profile_file: PathBuf,
    pub metadata_file: PathBuf,
    pub outdir: PathBuf,
    pub id_col: String,
    pub partition_col: String,
    pub outlier_threshold: f64,
    pub thresholds: Thresholds,
    pub linkage: LinkageMethod,
    pub tree_mode: TreeMode,
    /// Groups smaller than this are not clustered.
    pub min_members: usize,
    pub num_threads: usize,
    /// Count a missing call against a present one as a difference.
    pub count_missing: bool,
    /// Skip the locus missingness filter.
    pub skip_qc: bool,
    /// Maximum fraction of missing calls tolerated per locus.
    pub missing_thresh: f64,
    /// Separator between levels of a cluster address.
    pub delimiter: String,
    pub force: bool,
    /// Only report explicitly configured columns.
    pub restrict_output: bool,
    pub linelist_columns: IndexMap<String, ColumnSpec>,
    pub summary_columns: IndexMap<String, ColumnSpec>,
}
