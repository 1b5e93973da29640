//! Flattening per-group value counts into one record per group.

use crate::config::ColumnSpec;
use crate::data::{format_number, Table};
use crate::profile::Describe;
use crate::summary::column_type::ColumnType;
use chrono::NaiveDate;
use indexmap::IndexMap;
use std::collections::BTreeSet;

/// Value → number of samples.
pub type ValueCounts = IndexMap<String, usize>;

/// Column → value counts for one group.
pub type GroupValueCounts = IndexMap<String, ValueCounts>;

/// Date format accepted for min/max columns.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One flat record per group over a shared header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryTable {
    /// Every field present in every record, sorted.
    pub header: Vec<String>,
    /// Group id → field → value.
    pub records: IndexMap<String, IndexMap<String, String>>,
}

impl SummaryTable {
    /// Add a field to every record, keeping existing values.
    pub fn add_field(&mut self, field: &str, values: impl Fn(&str) -> String) {
        if !self.header.iter().any(|h| h == field) {
            self.header.push(field.to_string());
        }
        for (group, record) in self.records.iter_mut() {
            let value = values(group.as_str());
            record.insert(field.to_string(), value);
        }
    }

    /// One row per group in header order.
    pub fn to_table(&self) -> Table {
        let rows = self.records.values().map(|record| {
            self.header
                .iter()
                .map(|h| record.get(h).cloned().unwrap_or_default())
                .collect()
        });
        Table::with_rows(self.header.clone(), rows)
    }
}

/// Summary statistics of one min/max or descriptive column.
#[derive(Debug, Clone, PartialEq)]
enum RangeStats {
    Numeric(Describe),
    Dates { min: NaiveDate, max: NaiveDate },
}

/// Turns heterogeneous value counts into rectangular summary records.
#[derive(Debug, Clone)]
pub struct ColumnSummarizer<'a> {
    specs: &'a IndexMap<String, ColumnSpec>,
}

impl<'a> ColumnSummarizer<'a> {
    /// Use `specs` for type overrides and field defaults.
    pub fn new(specs: &'a IndexMap<String, ColumnSpec>) -> Self {
        Self { specs }
    }

    pub fn column_type(&self, column: &str) -> ColumnType {
        ColumnType::classify(column, self.specs)
    }

    /// Fields a column contributes to the header.
    pub fn fields(&self, column: &str, counts: &ValueCounts) -> Vec<String> {
        let mut fields = vec![column.to_string()];
        match self.column_type(column) {
            ColumnType::Categorical => {
                fields.extend(counts.keys().map(|v| format!("count_{}_{}", column, v)));
            }
            ColumnType::MinMax => {
                fields.push(format!("{}_min_value", column));
                fields.push(format!("{}_max_value", column));
            }
            ColumnType::DescStats => {
                fields.push(format!("{}_min_value", column));
                fields.push(format!("{}_mean_value", column));
                fields.push(format!("{}_median_value", column));
                fields.push(format!("{}_max_value", column));
            }
            ColumnType::None => {}
        }
        fields
    }

    /// Default value of a field that a group does not populate.
    ///
    /// A configured default wins; otherwise count and value fields default to `0`
    /// unless they relate to dates, and everything else to the empty string.
    pub fn default_value(&self, field: &str) -> String {
        if let Some(default) = self.specs.get(field).and_then(|s| s.default.clone()) {
            return default;
        }
        let numeric = field.starts_with("count_") || field.ends_with("_value");
        if numeric && !field.to_lowercase().contains("date") {
            "0".to_string()
        } else {
            String::new()
        }
    }

    /// Derived field values of one column.
    fn derive(&self, column: &str, counts: &ValueCounts) -> Vec<(String, String)> {
        let column_type = self.column_type(column);
        let raw = match column_type {
            ColumnType::None => join(counts.keys()),
            _ => join(counts.keys().collect::<BTreeSet<_>>()),
        };
        let mut out = vec![(column.to_string(), raw)];

        match column_type {
            ColumnType::Categorical => {
                out.extend(
                    counts
                        .iter()
                        .map(|(v, n)| (format!("count_{}_{}", column, v), n.to_string())),
                );
            }
            ColumnType::MinMax | ColumnType::DescStats => {
                let with_centre = column_type == ColumnType::DescStats;
                match range_stats(counts) {
                    Some(RangeStats::Numeric(d)) => {
                        out.push((format!("{}_min_value", column), format_number(d.min)));
                        out.push((format!("{}_max_value", column), format_number(d.max)));
                        if with_centre {
                            out.push((format!("{}_mean_value", column), format_number(d.mean)));
                            out.push((format!("{}_median_value", column), format_number(d.median)));
                        }
                    }
                    Some(RangeStats::Dates { min, max }) => {
                        out.push((
                            format!("{}_min_value", column),
                            min.format(DATE_FORMAT).to_string(),
                        ));
                        out.push((
                            format!("{}_max_value", column),
                            max.format(DATE_FORMAT).to_string(),
                        ));
                        if with_centre {
                            out.push((format!("{}_mean_value", column), String::new()));
                            out.push((format!("{}_median_value", column), String::new()));
                        }
                    }
                    None => {}
                }
            }
            ColumnType::None => {}
        }
        out
    }

    /// Summarise every group.
    ///
    /// The header is the sorted union of `header` and every field discovered in any
    /// group; each record carries every header field, absent ones at their default.
    pub fn summarize(
        &self,
        header: &[String],
        groups: &IndexMap<String, GroupValueCounts>,
    ) -> SummaryTable {
        let mut fields: BTreeSet<String> = header.iter().cloned().collect();
        for columns in groups.values() {
            for (column, counts) in columns {
                fields.extend(self.fields(column, counts));
            }
        }
        let header: Vec<String> = fields.into_iter().collect();

        let template: IndexMap<String, String> = header
            .iter()
            .map(|f| (f.clone(), self.default_value(f)))
            .collect();

        let records = groups
            .iter()
            .map(|(group, columns)| {
                let mut record = template.clone();
                for (column, counts) in columns {
                    for (field, value) in self.derive(column, counts) {
                        record.insert(field, value);
                    }
                }
                (group.clone(), record)
            })
            .collect();

        SummaryTable { header, records }
    }
}

fn join<'s, I: IntoIterator<Item = &'s String>>(values: I) -> String {
    values
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

/// Numeric statistics over the count-weighted values, or the date range when the
/// values are not all numeric.
fn range_stats(counts: &ValueCounts) -> Option<RangeStats> {
    let numeric: Option<Vec<(f64, usize)>> = counts
        .iter()
        .map(|(v, n)| v.trim().parse::<f64>().ok().map(|x| (x, *n)))
        .collect();
    if let Some(pairs) = numeric {
        let expanded: Vec<f64> = pairs
            .into_iter()
            .flat_map(|(x, n)| std::iter::repeat(x).take(n))
            .collect();
        return Describe::of(&expanded).map(RangeStats::Numeric);
    }

    let mut dates: Vec<NaiveDate> = counts
        .keys()
        .filter_map(|v| NaiveDate::parse_from_str(v.trim(), DATE_FORMAT).ok())
        .collect();
    dates.sort();
    match (dates.first(), dates.last()) {
        (Some(min), Some(max)) => Some(RangeStats::Dates {
            min: *min,
            max: *max,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(items: &[(&str, usize)]) -> ValueCounts {
        items.iter().map(|(v, n)| (v.to_string(), *n)).collect()
    }

    fn groups(items: Vec<(&str, Vec<(&str, ValueCounts)>)>) -> IndexMap<String, GroupValueCounts> {
        items
            .into_iter()
            .map(|(g, cols)| {
                (
                    g.to_string(),
                    cols.into_iter().map(|(c, v)| (c.to_string(), v)).collect(),
                )
            })
            .collect()
    }

    fn spec(data_type: Option<&str>, default: Option<&str>) -> ColumnSpec {
        ColumnSpec {
            label: String::new(),
            default: default.map(String::from),
            data_type: data_type.map(String::from),
            display: None,
        }
    }

    #[test]
    fn test_categorical_counts() {
        let specs = IndexMap::new();
        let input = groups(vec![("g1", vec![("colA", counts(&[("x", 3), ("y", 2)]))])]);
        let table = ColumnSummarizer::new(&specs).summarize(&[], &input);

        let rec = &table.records["g1"];
        assert_eq!(rec["count_colA_x"], "3");
        assert_eq!(rec["count_colA_y"], "2");
        assert_eq!(rec["colA"], "x,y");
        assert_eq!(table.header, vec!["colA", "count_colA_x", "count_colA_y"]);
    }

    #[test]
    fn test_desc_stats_weighted() {
        let specs = IndexMap::new();
        let input = groups(vec![("g1", vec![("age", counts(&[("10", 2), ("20", 1)]))])]);
        let table = ColumnSummarizer::new(&specs).summarize(&[], &input);

        let rec = &table.records["g1"];
        assert_eq!(rec["age_min_value"], "10");
        assert_eq!(rec["age_max_value"], "20");
        let mean: f64 = rec["age_mean_value"].parse().unwrap();
        let median: f64 = rec["age_median_value"].parse().unwrap();
        assert!((mean - 13.33).abs() < 0.01);
        assert_eq!(median, 10.0);
    }

    #[test]
    fn test_min_max_dates() {
        let specs = IndexMap::new();
        let input = groups(vec![(
            "g1",
            vec![(
                "collection_date",
                counts(&[("2023-05-01", 1), ("2022-12-31", 4), ("not a date", 1)]),
            )],
        )]);
        let table = ColumnSummarizer::new(&specs).summarize(&[], &input);

        let rec = &table.records["g1"];
        assert_eq!(rec["collection_date_min_value"], "2022-12-31");
        assert_eq!(rec["collection_date_max_value"], "2023-05-01");
        assert!(!rec.contains_key("collection_date_mean_value"));
    }

    #[test]
    fn test_desc_stats_dates_leave_centre_empty() {
        let mut specs = IndexMap::new();
        specs.insert("onset".to_string(), spec(Some("desc_stats"), None));
        let input = groups(vec![("g1", vec![("onset", counts(&[("2021-01-02", 1)]))])]);
        let rec = ColumnSummarizer::new(&specs).summarize(&[], &input).records["g1"].clone();
        assert_eq!(rec["onset_min_value"], "2021-01-02");
        assert_eq!(rec["onset_mean_value"], "");
        assert_eq!(rec["onset_median_value"], "");
    }

    #[test]
    fn test_none_type_keeps_value_order() {
        let mut specs = IndexMap::new();
        specs.insert("notes".to_string(), spec(Some("none"), None));
        let input = groups(vec![("g1", vec![("notes", counts(&[("zeta", 1), ("alpha", 2)]))])]);
        let table = ColumnSummarizer::new(&specs).summarize(&[], &input);
        assert_eq!(table.records["g1"]["notes"], "zeta,alpha");
        assert_eq!(table.header, vec!["notes"]);
    }

    #[test]
    fn test_rectangular_with_defaults() {
        let mut specs = IndexMap::new();
        specs.insert("count_host_cow".to_string(), spec(None, Some("n/a")));
        let input = groups(vec![
            (
                "g1",
                vec![
                    ("host", counts(&[("cow", 2)])),
                    ("collection_date", counts(&[("2020-01-01", 2)])),
                ],
            ),
            ("g2", vec![("host", counts(&[("pig", 1)])), ("age", counts(&[("3", 1)]))]),
        ]);
        let header = vec!["region".to_string()];
        let table = ColumnSummarizer::new(&specs).summarize(&header, &input);

        for record in table.records.values() {
            assert_eq!(record.len(), table.header.len());
        }
        let g2 = &table.records["g2"];
        assert_eq!(g2["count_host_cow"], "n/a");
        assert_eq!(g2["collection_date_min_value"], "");
        assert_eq!(g2["region"], "");
        let g1 = &table.records["g1"];
        assert_eq!(g1["count_host_pig"], "0");
        assert_eq!(g1["age_mean_value"], "0");

        let mut sorted = table.header.clone();
        sorted.sort();
        assert_eq!(table.header, sorted);
    }

    #[test]
    fn test_unparseable_range_keeps_defaults() {
        let input = groups(vec![("g1", vec![("age", counts(&[("adult", 1)]))])]);
        let specs = IndexMap::new();
        let rec = ColumnSummarizer::new(&specs).summarize(&[], &input).records["g1"].clone();
        assert_eq!(rec["age_min_value"], "0");
        assert_eq!(rec["age"], "adult");
    }

    #[test]
    fn test_add_field() {
        let specs = IndexMap::new();
        let input = groups(vec![("g1", vec![]), ("g2", vec![])]);
        let mut table = ColumnSummarizer::new(&specs).summarize(&[], &input);
        table.add_field("group", |g| g.to_uppercase());
        assert_eq!(table.header, vec!["group"]);
        assert_eq!(table.records["g2"]["group"], "G2");
    }
}
