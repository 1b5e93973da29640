//! Grouped Clusters Library
//!
//! Aggregates per-sample allelic profiles into per-group cluster summaries for
//! outbreak surveillance. Samples are partitioned by a metadata column; each
//! group is independently distance-computed, clustered and outlier-checked, and
//! the per-group results are flattened into one wide summary table plus
//! per-sample line lists.
//!
//! # Overview
//!
//! - **data**: Core data structures (Table, Metadata, AllelicProfiles, DistanceMatrix)
//! - **config**: Configuration loading and validation
//! - **partition**: Splitting samples into groups with collision-safe directory names
//! - **cluster**: Distance and clustering services (Hamming, hierarchical)
//! - **outlier**: Average and pairwise outlier detection
//! - **profile**: Column value counts, entropy and descriptive statistics
//! - **summary**: Type-inferring per-group column summaries
//! - **pipeline**: Parallel per-group processing and the full run
//! - **report**: Summary table ordering and line lists
//!
//! # Example
//!
//! ```no_run
//! use grouped_clusters::prelude::*;
//!
//! let config = RawConfig::from_file("config.yaml")
//!     .and_then(|raw| raw.validate())
//!     .unwrap();
//! let report = run(&config).unwrap();
//! println!("{} groups clustered", report.groups.clustered);
//! ```

pub mod cluster;
pub mod config;
pub mod data;
pub mod error;
pub mod outlier;
pub mod partition;
pub mod pipeline;
pub mod profile;
pub mod report;
pub mod summary;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::cluster::{
        cluster_matrix, ClusterService, Clustering, Dendrogram, DistanceService, HammingDistance,
        MultiLevelClustering,
    };
    pub use crate::config::{
        ColumnSpec, LinkageMethod, RawConfig, RunConfig, Thresholds, TreeMode,
    };
    pub use crate::data::{AllelicProfiles, DistanceMatrix, Metadata, Table};
    pub use crate::error::{ClusterError, Result};
    pub use crate::outlier::{detect_outliers, Outliers, PairwiseOutlier};
    pub use crate::partition::{sanitize_token, Partition, Partitioner};
    pub use crate::pipeline::{
        process_group, process_groups, run, run_with, GroupFiles, GroupMetrics, GroupStatus,
        RunReport, Services,
    };
    pub use crate::profile::{ColumnProfile, Describe};
    pub use crate::report::{build_line_lists, compile_group_data, order_columns, LineLists};
    pub use crate::summary::{ColumnSummarizer, ColumnType, SummaryTable};
}
