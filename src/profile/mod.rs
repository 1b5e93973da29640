//! Data profiling: per-column value counts, entropy and descriptive statistics.

mod columns;
mod stats;

pub use columns::{
    normalized_entropy, profile_columns, profile_loci, write_loci_summary, ColumnProfile,
};
pub use stats::{median, Describe};
