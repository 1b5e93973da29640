//! Statistic type of a metadata column.

use crate::config::ColumnSpec;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// How a column's value counts are summarised per group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// One count field per distinct value.
    Categorical,
    /// Minimum and maximum of numeric or date values.
    MinMax,
    /// Minimum, mean, median and maximum.
    DescStats,
    /// Distinct values only.
    None,
}

impl ColumnType {
    /// Parse a configured type name; anything unrecognised is categorical.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "min_max" => Self::MinMax,
            "desc_stats" => Self::DescStats,
            "none" => Self::None,
            _ => Self::Categorical,
        }
    }

    /// Type implied by the column name alone.
    ///
    /// Names are split on spaces and underscores; an `age` token means
    /// [`ColumnType::DescStats`], otherwise a `date` token means [`ColumnType::MinMax`].
    /// Tokens match case-sensitively.
    pub fn infer(column: &str) -> Self {
        let tokens: Vec<&str> = column.split(|c| c == ' ' || c == '_').collect();
        if tokens.contains(&"age") {
            Self::DescStats
        } else if tokens.contains(&"date") {
            Self::MinMax
        } else {
            Self::Categorical
        }
    }

    /// Configured type if any, else the name heuristic.
    pub fn classify(column: &str, specs: &IndexMap<String, ColumnSpec>) -> Self {
        match specs.get(column).and_then(|s| s.data_type.as_deref()) {
            Some(name) => Self::from_name(name),
            None => Self::infer(column),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Categorical => "categorical",
            Self::MinMax => "min_max",
            Self::DescStats => "desc_stats",
            Self::None => "none",
        }
    }
}
