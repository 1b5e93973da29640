//! Work performed for a single group.

use crate::cluster::{ClusterService, DistanceService, HammingDistance, MultiLevelClustering};
use crate::config::{LinkageMethod, RunConfig, Thresholds, TreeMode};
use crate::data::{AllelicProfiles, DistanceMatrix, Table};
use crate::error::{ClusterError, Result};
use crate::outlier::{detect_outliers, write_outliers};
use crate::profile::{profile_columns, profile_loci, write_loci_summary, ColumnProfile, Describe};
use indexmap::IndexMap;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Metadata column holding `<group_id>|<cluster address>`.
pub const ADDRESS_COLUMN: &str = "gas_denovo_cluster_address";

/// Paths of every file a group task reads or writes.
///
/// A task owns its directory exclusively; nothing else writes there while it runs.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupFiles {
    pub group_id: String,
    pub directory: PathBuf,
    pub profile: PathBuf,
    /// Binary matrix artifact, removed once every group has finished.
    pub matrix_bin: PathBuf,
    pub matrix: PathBuf,
    pub clusters: PathBuf,
    pub metadata: PathBuf,
    pub tree: PathBuf,
    pub loci_summary: PathBuf,
    pub outliers: PathBuf,
}

impl GroupFiles {
    pub fn new(group_id: &str, directory: &Path) -> Self {
        Self {
            group_id: group_id.to_string(),
            directory: directory.to_path_buf(),
            profile: directory.join("profile.tsv"),
            matrix_bin: directory.join("matrix.bin"),
            matrix: directory.join("matrix.tsv"),
            clusters: directory.join("clusters.tsv"),
            metadata: directory.join("metadata.tsv"),
            tree: directory.join("tree.nwk"),
            loci_summary: directory.join("loci.summary.tsv"),
            outliers: directory.join("outliers.tsv"),
        }
    }
}

/// Lifecycle of a group task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupStage {
    Staged,
    Distanced,
    Clustered,
    OutlierChecked,
    Merged,
    Done,
}

/// Whether a group went through clustering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupStatus {
    Clustered,
    /// Fewer members than the configured minimum.
    Skipped,
}

/// Per-group results, created once by the group task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupMetrics {
    pub group_id: String,
    pub count_members: usize,
    pub min_dist: f64,
    pub mean_dist: f64,
    pub median_dist: f64,
    pub max_dist: f64,
    /// Number of pairwise outliers.
    pub count_outliers: usize,
    /// Samples whose average distance exceeds the outlier threshold.
    pub outlier_ids: Vec<String>,
    pub status: GroupStatus,
    /// Value counts of every metadata column except the id and partition columns.
    pub metadata: IndexMap<String, ColumnProfile>,
}

impl GroupMetrics {
    pub(crate) fn skipped(group_id: &str, count_members: usize, metadata: IndexMap<String, ColumnProfile>) -> Self {
        Self {
            group_id: group_id.to_string(),
            count_members,
            min_dist: 0.0,
            mean_dist: 0.0,
            median_dist: 0.0,
            max_dist: 0.0,
            count_outliers: 0,
            outlier_ids: Vec::new(),
            status: GroupStatus::Skipped,
            metadata,
        }
    }

    pub fn is_clustered(&self) -> bool {
        self.status == GroupStatus::Clustered
    }
}

/// What a group task hands back: its metrics and its enriched metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupOutcome {
    pub metrics: GroupMetrics,
    pub metadata: Table,
}

/// Parameters shared by every group task.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSettings {
    pub id_col: String,
    pub partition_col: String,
    pub thresholds: Thresholds,
    pub linkage: LinkageMethod,
    pub tree_mode: TreeMode,
    pub outlier_threshold: f64,
    pub min_members: usize,
    pub delimiter: String,
}

impl From<&RunConfig> for GroupSettings {
    fn from(config: &RunConfig) -> Self {
        Self {
            id_col: config.id_col.clone(),
            partition_col: config.partition_col.clone(),
            thresholds: config.thresholds.clone(),
            linkage: config.linkage,
            tree_mode: config.tree_mode,
            outlier_threshold: config.outlier_threshold,
            min_members: config.min_members,
            delimiter: config.delimiter.clone(),
        }
    }
}

/// Distance and clustering implementations used by every group.
pub struct Services {
    pub distance: Box<dyn DistanceService>,
    pub cluster: Box<dyn ClusterService>,
}

impl Services {
    pub fn new(distance: Box<dyn DistanceService>, cluster: Box<dyn ClusterService>) -> Self {
        Self { distance, cluster }
    }

    /// Hamming distances and multi-level hierarchical clustering.
    pub fn from_config(config: &RunConfig) -> Self {
        Self::new(
            Box::new(HammingDistance::new(config.count_missing)),
            Box::new(MultiLevelClustering),
        )
    }
}

impl Default for Services {
    fn default() -> Self {
        Self::new(Box::new(HammingDistance::default()), Box::new(MultiLevelClustering))
    }
}

fn stage(group: &str, stage: GroupStage) {
    debug!(group, ?stage, "group stage reached");
}

/// Run one group from its staged files to its metrics.
///
/// Any collaborator failure is returned as [`ClusterError::Collaborator`].
pub fn process_group(
    files: &GroupFiles,
    services: &Services,
    settings: &GroupSettings,
) -> Result<GroupOutcome> {
    let group = files.group_id.as_str();
    run_group(files, services, settings).map_err(|e| match e {
        ClusterError::Collaborator { .. } => e,
        other => ClusterError::collaborator(group, other),
    })
}

fn run_group(files: &GroupFiles, services: &Services, settings: &GroupSettings) -> Result<GroupOutcome> {
    let group = files.group_id.as_str();
    let (profiles, _) = AllelicProfiles::from_tsv(&files.profile)?;
    let metadata = Table::from_tsv(&files.metadata)?;
    let column_counts = profile_columns(
        &metadata,
        &[settings.id_col.as_str(), settings.partition_col.as_str()],
        None,
    );
    stage(group, GroupStage::Staged);

    let n = profiles.n_samples();
    if n < settings.min_members {
        info!(group, members = n, min = settings.min_members, "skipping small group");
        stage(group, GroupStage::Done);
        return Ok(GroupOutcome {
            metrics: GroupMetrics::skipped(group, n, column_counts),
            metadata,
        });
    }

    services.distance.compute(&profiles, &files.matrix_bin)?;
    let matrix = DistanceMatrix::read_bin(&files.matrix_bin)?;
    matrix.to_tsv(&files.matrix)?;
    stage(group, GroupStage::Distanced);

    let clustering = services.cluster.cluster(
        &files.matrix,
        &settings.thresholds,
        settings.linkage,
        settings.tree_mode,
    )?;
    clustering.write_newick(&files.tree)?;
    clustering.write_clusters(&files.clusters, group, &settings.delimiter)?;
    stage(group, GroupStage::Clustered);

    let outliers = detect_outliers(&matrix, settings.outlier_threshold)?;
    write_outliers(&outliers.pairwise, &files.outliers)?;
    write_loci_summary(&profile_loci(&profiles), &files.loci_summary)?;
    stage(group, GroupStage::OutlierChecked);

    let mut addresses = Table::new(vec![settings.id_col.clone(), ADDRESS_COLUMN.to_string()]);
    for (sample, address) in clustering.group_addresses(group, &settings.delimiter) {
        addresses.push_row(vec![sample, address])?;
    }
    let enriched = metadata.left_join(&settings.id_col, &addresses, &settings.id_col)?;
    enriched.to_tsv(&files.metadata)?;
    stage(group, GroupStage::Merged);

    let stats = Describe::of(&matrix.pairwise_distances()).ok_or_else(|| {
        ClusterError::EmptyData(format!("group '{}' has no pairwise distances", group))
    })?;
    let metrics = GroupMetrics {
        group_id: group.to_string(),
        count_members: n,
        min_dist: stats.min,
        mean_dist: stats.mean,
        median_dist: stats.median,
        max_dist: stats.max,
        count_outliers: outliers.pairwise.len(),
        outlier_ids: outliers.average,
        status: GroupStatus::Clustered,
        metadata: column_counts,
    };
    stage(group, GroupStage::Done);

    Ok(GroupOutcome {
        metrics,
        metadata: enriched,
    })
}
