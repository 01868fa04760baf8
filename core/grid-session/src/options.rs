//! FILENAME: core/grid-session/src/options.rs
//! Grid Options - Serializable configuration of a whole session.
//!
//! Every key is optional; missing keys take their defaults. Policy hooks that
//! cannot be serialized (position policy, tree-data path, row id getter,
//! filter predicate) are set on the session after construction.

use cell_selection_engine::CellSelectionOptions;
use grid_model::ModelError;
use row_grouping_engine::RowGroupingOptions;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GridOptions {
    pub row_grouping: RowGroupingOptions,
    pub cell_selection: CellSelectionOptions,
}

impl GridOptions {
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ModelError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use row_grouping_engine::{AggregationRowsScope, GroupingColumnMode};

    #[test]
    fn test_partial_json_keeps_defaults() {
        let options = GridOptions::from_json(
            r#"{
                "rowGrouping": { "groupingColumnMode": "multiple", "aggregationRowsScope": "all" },
                "cellSelection": { "clipboardDelimiter": ";" }
            }"#,
        )
        .unwrap();

        assert_eq!(options.row_grouping.grouping_column_mode, GroupingColumnMode::Multiple);
        assert_eq!(options.row_grouping.aggregation_rows_scope, AggregationRowsScope::All);
        assert_eq!(options.row_grouping.row_id_field, "id");
        assert_eq!(options.cell_selection.clipboard_delimiter, ";");
        assert!(options.cell_selection.enabled);
    }

    #[test]
    fn test_json_round_trip_and_errors() {
        let options = GridOptions::default();
        let json = options.to_json().unwrap();
        assert_eq!(GridOptions::from_json(&json).unwrap(), options);
        assert!(matches!(GridOptions::from_json("[1, 2]"), Err(ModelError::Json(_))));
        assert_eq!(GridOptions::from_json("{}").unwrap(), options);
    }
}
