//! Per-group summaries of metadata columns.

mod column_type;
mod summarizer;

pub use column_type::ColumnType;
pub use summarizer::{ColumnSummarizer, GroupValueCounts, SummaryTable, ValueCounts, DATE_FORMAT};
