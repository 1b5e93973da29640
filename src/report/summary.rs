//! The cluster summary table.

use crate::config::ColumnSpec;
use crate::data::{format_number, Table};
use crate::pipeline::GroupMetrics;
use crate::summary::{ColumnSummarizer, GroupValueCounts, SummaryTable};
use indexmap::IndexMap;
use std::collections::HashSet;
use tracing::warn;

/// Flatten group metrics into one summary record per group.
///
/// Metadata value counts go through the [`ColumnSummarizer`]; the partition
/// column carries the group id and the distance metrics follow the summarised
/// fields.
pub fn compile_group_data(
    metrics: &[GroupMetrics],
    specs: &IndexMap<String, ColumnSpec>,
    partition_col: &str,
    header: &[String],
) -> SummaryTable {
    let groups: IndexMap<String, GroupValueCounts> = metrics
        .iter()
        .map(|m| {
            let columns = m
                .metadata
                .iter()
                .map(|(column, profile)| (column.clone(), profile.value_counts.clone()))
                .collect();
            (m.group_id.clone(), columns)
        })
        .collect();

    let mut table = ColumnSummarizer::new(specs).summarize(header, &groups);
    let by_id: IndexMap<&str, &GroupMetrics> =
        metrics.iter().map(|m| (m.group_id.as_str(), m)).collect();
    let by_id = &by_id;
    let metric = |f: fn(&GroupMetrics) -> String| {
        move |group: &str| by_id.get(group).map(|m| f(m)).unwrap_or_default()
    };

    table.add_field(partition_col, |group| group.to_string());
    table.add_field("count_members", metric(|m| m.count_members.to_string()));
    table.add_field("min_dist", metric(|m| format_number(m.min_dist)));
    table.add_field("mean_dist", metric(|m| format_number(m.mean_dist)));
    table.add_field("median_dist", metric(|m| format_number(m.median_dist)));
    table.add_field("max_dist", metric(|m| format_number(m.max_dist)));
    table.add_field("count_outliers", metric(|m| m.count_outliers.to_string()));
    table.add_field("outlier_ids", metric(|m| m.outlier_ids.join(",")));
    table
}

/// Apply visibility, order and labels to the summary.
///
/// Columns configured with `display: false` are removed. Remaining configured
/// columns come first in configured order under their labels, absent ones
/// filled with their default; unless `restrict` is set, every other column
/// follows in its existing order.
pub fn order_columns(
    summary: &SummaryTable,
    specs: &IndexMap<String, ColumnSpec>,
    restrict: bool,
) -> Table {
    let hidden: HashSet<&str> = specs
        .iter()
        .filter(|(_, s)| s.display == Some(false))
        .map(|(name, _)| name.as_str())
        .collect();

    let mut projection: Vec<(String, String, String)> = Vec::new();
    for (name, spec) in specs {
        if hidden.contains(name.as_str()) {
            continue;
        }
        if !summary.header.contains(name) {
            warn!(column = name.as_str(), "configured summary column not found, using its default");
        }
        projection.push((
            name.clone(),
            spec.label.clone(),
            spec.default.clone().unwrap_or_default(),
        ));
    }
    if !restrict {
        for column in &summary.header {
            if hidden.contains(column.as_str()) || specs.contains_key(column) {
                continue;
            }
            projection.push((column.clone(), column.clone(), String::new()));
        }
    }

    summary.to_table().project(&projection)
}
