//! FILENAME: core/row-grouping-engine/src/definition.rs
//! Row Grouping Definition - The serializable configuration.
//!
//! This module contains the types needed to DESCRIBE how rows are grouped
//! and aggregated. These structures are designed to be:
//! - Serializable (options are loaded from JSON by the host)
//! - Independent of the current data (sanitizing happens in the engine)
//! - Cheap to compare (the refresh scheduler diffs them)

use std::sync::Arc;

use grid_model::{ColumnDef, FieldId, GroupingValueGetter, Record, DEFAULT_ROW_ID_FIELD};
use serde::{Deserialize, Serialize};

use crate::tree::GroupNode;

// ============================================================================
// RESERVED IDS AND FIELDS
// ============================================================================

/// Id of the root group node.
pub const ROOT_NODE_ID: &str = "auto-generated-group-node-root";

/// Prefix of every synthesized group node id.
pub const GROUP_NODE_ID_PREFIX: &str = "auto-generated-row-";

/// Prefix of every synthesized footer node id.
pub const FOOTER_NODE_ID_PREFIX: &str = "auto-generated-group-footer-";

/// Field of the grouping column in single-column mode.
pub const GROUPING_COLUMN_SINGLE_FIELD: &str = "__row_group_by_columns_group__";

/// Field of the grouping column in tree-data mode.
pub const TREE_DATA_GROUPING_FIELD: &str = "__tree_data_group__";

/// Path segment field used in node ids when a segment has no grouping field.
pub const NO_FIELD_SEGMENT: &str = "__no_field__";

/// Field of the grouping column for one criterion in multiple-column mode.
pub fn grouping_column_field(criterion: &str) -> String {
    format!("__row_group_by_columns_group_{}__", criterion)
}

/// Inverse of `grouping_column_field`.
pub fn criterion_from_grouping_field(field: &str) -> Option<&str> {
    field
        .strip_prefix("__row_group_by_columns_group_")
        .and_then(|rest| rest.strip_suffix("__"))
        .filter(|criterion| !criterion.is_empty())
}

/// Whether a field belongs to a synthesized grouping column.
pub fn is_grouping_column_field(field: &str) -> bool {
    field == GROUPING_COLUMN_SINGLE_FIELD
        || field == TREE_DATA_GROUPING_FIELD
        || criterion_from_grouping_field(field).is_some()
}

// ============================================================================
// GROUPING CRITERIA
// ============================================================================

/// One level of grouping: a field plus an optional key derivation.
#[derive(Clone)]
pub struct GroupingCriterion {
    pub field: FieldId,
    pub value_getter: Option<GroupingValueGetter>,
}

impl GroupingCriterion {
    pub fn new(field: impl Into<FieldId>) -> Self {
        GroupingCriterion {
            field: field.into(),
            value_getter: None,
        }
    }

    /// The criterion a groupable column defines.
    pub fn from_column(column: &ColumnDef) -> Self {
        GroupingCriterion {
            field: column.field.clone(),
            value_getter: column.grouping_value_getter.clone(),
        }
    }
}

impl std::fmt::Debug for GroupingCriterion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupingCriterion")
            .field("field", &self.field)
            .field("has_value_getter", &self.value_getter.is_some())
            .finish()
    }
}

/// Derives a record's tree-data path (outermost segment first, the record itself last).
pub type TreeDataPathGetter = Arc<dyn Fn(&Record) -> Vec<String> + Send + Sync>;

// ============================================================================
// AGGREGATION
// ============================================================================

/// One effective (field, function) pair after validation against the columns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AggregationRule {
    pub field: FieldId,
    pub function_name: String,
}

/// Where a group's aggregated values are displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AggregationPosition {
    /// On the group row itself.
    Inline,
    /// On a dedicated footer row closing the group.
    Footer,
}

/// Decides, per group, where aggregates go. `None` disables aggregation for that group.
pub type AggregationPositionPolicy = Arc<dyn Fn(&GroupNode) -> Option<AggregationPosition> + Send + Sync>;

/// The root aggregates in a footer; every other group aggregates inline.
pub fn default_aggregation_position(group: &GroupNode) -> Option<AggregationPosition> {
    if group.depth == -1 {
        Some(AggregationPosition::Footer)
    } else {
        Some(AggregationPosition::Inline)
    }
}

pub fn default_aggregation_position_policy() -> AggregationPositionPolicy {
    Arc::new(default_aggregation_position)
}

// ============================================================================
// OPTIONS
// ============================================================================

/// How grouping columns are synthesized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum GroupingColumnMode {
    /// One column shows the grouping key of every depth.
    #[default]
    Single,
    /// One column per grouping criterion, each only filled at its own depth.
    Multiple,
}

/// Which descendant rows feed a group's aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum AggregationRowsScope {
    /// Only rows passing the active filter.
    #[default]
    Filtered,
    All,
}

/// Serializable configuration of the row grouping engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RowGroupingOptions {
    /// Single or multiple grouping column(s).
    pub grouping_column_mode: GroupingColumnMode,

    /// Which rows are aggregated.
    pub aggregation_rows_scope: AggregationRowsScope,

    /// Build the tree from per-record paths instead of the grouping model.
    pub tree_data: bool,

    /// Depth up to which groups start expanded. `-1` expands everything.
    pub default_grouping_expansion_depth: i32,

    /// Field the default row id getter reads.
    pub row_id_field: String,

    /// Ignore the grouping model entirely.
    pub disable_row_grouping: bool,

    /// Ignore the aggregation model entirely.
    pub disable_aggregation: bool,
}

impl Default for RowGroupingOptions {
    fn default() -> Self {
        RowGroupingOptions {
            grouping_column_mode: GroupingColumnMode::Single,
            aggregation_rows_scope: AggregationRowsScope::Filtered,
            tree_data: false,
            default_grouping_expansion_depth: 0,
            row_id_field: DEFAULT_ROW_ID_FIELD.to_string(),
            disable_row_grouping: false,
            disable_aggregation: false,
        }
    }
}

impl RowGroupingOptions {
    /// Whether a newly created group at `depth` starts expanded.
    pub fn is_expanded_by_default(&self, depth: i32) -> bool {
        self.default_grouping_expansion_depth == -1 || depth < self.default_grouping_expansion_depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grouping_column_field_round_trip() {
        let field = grouping_column_field("region");
        assert_eq!(field, "__row_group_by_columns_group_region__");
        assert_eq!(criterion_from_grouping_field(&field), Some("region"));
        assert_eq!(criterion_from_grouping_field(GROUPING_COLUMN_SINGLE_FIELD), None);
        assert!(is_grouping_column_field(GROUPING_COLUMN_SINGLE_FIELD));
        assert!(!is_grouping_column_field("region"));
    }

    #[test]
    fn test_options_from_partial_json() {
        let options: RowGroupingOptions =
            serde_json::from_str(r#"{"groupingColumnMode": "multiple", "defaultGroupingExpansionDepth": -1}"#)
                .unwrap();
        assert_eq!(options.grouping_column_mode, GroupingColumnMode::Multiple);
        assert_eq!(options.aggregation_rows_scope, AggregationRowsScope::Filtered);
        assert!(options.is_expanded_by_default(5));
    }

    #[test]
    fn test_expansion_depth() {
        let options = RowGroupingOptions {
            default_grouping_expansion_depth: 1,
            ..RowGroupingOptions::default()
        };
        assert!(options.is_expanded_by_default(0));
        assert!(!options.is_expanded_by_default(1));
    }
}
