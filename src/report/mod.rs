//! Final reports: the cluster summary table and per-sample line lists.

mod linelist;
mod summary;

pub use linelist::{build_line_lists, sample_overlap, LineLists, SampleOverlap};
pub use summary::{compile_group_data, order_columns};
