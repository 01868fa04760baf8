//! FILENAME: core/grid-model/src/model.rs
//! PURPOSE: The externally settable models of a grid session.
//! CONTEXT: These are plain serializable snapshots of user intent. Engines
//! sanitize them against the current columns; they never mutate them in place.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::cell::CellValue;
use crate::error::ModelError;
use crate::record::{FieldId, RowId};

// ============================================================================
// ROW GROUPING MODEL
// ============================================================================

/// Ordered grouping fields, outermost first.
pub type RowGroupingModel = Vec<FieldId>;

// ============================================================================
// AGGREGATION MODEL
// ============================================================================

/// Mapping field -> aggregation function name. At most one rule per field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregationModel(pub BTreeMap<FieldId, String>);

impl AggregationModel {
    pub fn new() -> Self {
        AggregationModel::default()
    }

    pub fn with(mut self, field: &str, function_name: &str) -> Self {
        self.0.insert(field.to_string(), function_name.to_string());
        self
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldId, &String)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        Ok(serde_json::from_str(json)?)
    }
}

// ============================================================================
// SORT MODEL
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortItem {
    pub field: FieldId,
    pub sort: SortDirection,
}

impl SortItem {
    pub fn asc(field: &str) -> Self {
        SortItem {
            field: field.to_string(),
            sort: SortDirection::Asc,
        }
    }

    pub fn desc(field: &str) -> Self {
        SortItem {
            field: field.to_string(),
            sort: SortDirection::Desc,
        }
    }
}

/// Sort items by priority, highest first.
pub type SortModel = Vec<SortItem>;

// ============================================================================
// FILTER MODEL
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum LogicOperator {
    #[default]
    And,
    Or,
}

/// One filter condition on one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterItem {
    /// Unique within its model; used to merge per-item results across tree levels.
    pub id: u32,
    pub field: FieldId,
    pub operator: String,
    #[serde(default)]
    pub value: CellValue,
    /// Values for list operators such as `isAnyOf`.
    #[serde(default)]
    pub values: Vec<CellValue>,
}

impl FilterItem {
    pub fn new(id: u32, field: &str, operator: &str, value: impl Into<CellValue>) -> Self {
        FilterItem {
            id,
            field: field.to_string(),
            operator: operator.to_string(),
            value: value.into(),
            values: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterModel {
    #[serde(default)]
    pub items: Vec<FilterItem>,
    #[serde(default)]
    pub logic_operator: LogicOperator,
}

impl FilterModel {
    pub fn new(items: Vec<FilterItem>, logic_operator: LogicOperator) -> Self {
        FilterModel { items, logic_operator }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        Ok(serde_json::from_str(json)?)
    }
}

// ============================================================================
// CELL SELECTION MODEL
// ============================================================================

/// Selected fields of one row, in insertion order.
pub type SelectedFields = SmallVec<[FieldId; 4]>;

/// Sparse selection store: row id -> selected fields. Only selected cells are
/// stored; a row with no selected field is removed entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellSelectionModel {
    rows: FxHashMap<RowId, SelectedFields>,
}

impl CellSelectionModel {
    pub fn new() -> Self {
        CellSelectionModel::default()
    }

    pub fn is_selected(&self, row_id: &RowId, field: &str) -> bool {
        self.rows
            .get(row_id)
            .map(|fields| fields.iter().any(|f| f == field))
            .unwrap_or(false)
    }

    /// Marks a cell selected. Returns false if it already was.
    pub fn select(&mut self, row_id: &RowId, field: &str) -> bool {
        let fields = self.rows.entry(row_id.clone()).or_default();
        if fields.iter().any(|f| f == field) {
            return false;
        }
        fields.push(field.to_string());
        true
    }

    /// Unmarks a cell. Rows left without selected fields are dropped.
    pub fn deselect(&mut self, row_id: &RowId, field: &str) -> bool {
        let Some(fields) = self.rows.get_mut(row_id) else {
            return false;
        };
        let before = fields.len();
        fields.retain(|f| f != field);
        let removed = fields.len() != before;
        if fields.is_empty() {
            self.rows.remove(row_id);
        }
        removed
    }

    /// Flips a cell's membership. Returns the new state.
    pub fn toggle(&mut self, row_id: &RowId, field: &str) -> bool {
        if self.deselect(row_id, field) {
            false
        } else {
            self.select(row_id, field)
        }
    }

    /// Adds every cell of `other` to this model.
    pub fn merge(&mut self, other: &CellSelectionModel) {
        for (row_id, fields) in &other.rows {
            for field in fields {
                self.select(row_id, field);
            }
        }
    }

    /// Selected fields of a row in insertion order.
    pub fn fields_of(&self, row_id: &RowId) -> Option<&SelectedFields> {
        self.rows.get(row_id)
    }

    pub fn rows(&self) -> impl Iterator<Item = (&RowId, &SelectedFields)> {
        self.rows.iter()
    }

    /// Number of selected cells.
    pub fn len(&self) -> usize {
        self.rows.values().map(|fields| fields.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let mut parsed: CellSelectionModel = serde_json::from_str(json)?;
        parsed.rows.retain(|_, fields| !fields.is_empty());
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_model_stays_sparse() {
        let mut model = CellSelectionModel::new();
        let row = RowId::Number(1);
        assert!(model.select(&row, "a"));
        assert!(!model.select(&row, "a"));
        assert!(model.select(&row, "b"));
        assert_eq!(model.len(), 2);

        assert!(model.deselect(&row, "a"));
        assert!(model.deselect(&row, "b"));
        assert!(model.is_empty());
        assert!(model.fields_of(&row).is_none());
    }

    #[test]
    fn test_selection_model_toggle_and_merge() {
        let mut model = CellSelectionModel::new();
        let row = RowId::Number(1);
        assert!(model.toggle(&row, "a"));
        assert!(!model.toggle(&row, "a"));
        assert!(model.is_empty());

        let mut other = CellSelectionModel::new();
        other.select(&row, "x");
        other.select(&RowId::Number(2), "y");
        model.select(&row, "w");
        model.merge(&other);
        assert_eq!(model.len(), 3);
        let fields: Vec<&str> = model.fields_of(&row).unwrap().iter().map(String::as_str).collect();
        assert_eq!(fields, vec!["w", "x"]);
    }

    #[test]
    fn test_selection_model_json_round_trip() {
        let json = r#"{"row-1": ["a", "b"], "row-2": ["c"], "row-3": []}"#;
        let model = CellSelectionModel::from_json(json).unwrap();
        assert!(model.is_selected(&RowId::text("row-1"), "a"));
        assert!(model.is_selected(&RowId::text("row-2"), "c"));
        assert_eq!(model.len(), 3);
    }

    #[test]
    fn test_aggregation_model_json() {
        let model = AggregationModel::from_json(r#"{"price": "sum", "qty": "avg"}"#).unwrap();
        assert_eq!(model, AggregationModel::new().with("price", "sum").with("qty", "avg"));
    }

    #[test]
    fn test_filter_model_json_defaults() {
        let model = FilterModel::from_json(
            r#"{"items": [{"id": 1, "field": "name", "operator": "contains", "value": {"type": "text", "value": "a"}}]}"#,
        )
        .unwrap();
        assert_eq!(model.logic_operator, LogicOperator::And);
        assert_eq!(model.items[0].value, CellValue::text("a"));
    }
}
