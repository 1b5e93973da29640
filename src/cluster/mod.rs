//! Distance and clustering services used by the group pipeline.
//!
//! Both are traits so a run can swap in other implementations:
//!
//! - [`DistanceService`]: profiles to a binary distance matrix artifact
//!   (default [`HammingDistance`])
//! - [`ClusterService`]: matrix file to per-threshold memberships and a Newick tree
//!   (default [`MultiLevelClustering`])

pub mod distance;
pub mod hierarchy;

pub use distance::{DistanceService, HammingDistance};
pub use hierarchy::{cluster_matrix, ClusterService, Clustering, Dendrogram, Merge, MultiLevelClustering};
