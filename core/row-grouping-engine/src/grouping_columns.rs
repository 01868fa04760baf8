//! FILENAME: core/row-grouping-engine/src/grouping_columns.rs
//! Synthesizes the grouping column(s) shown in front of the data columns.
//!
//! Single mode: one column whose value is the grouping key of every group.
//! Multiple mode: one column per criterion, filled only at that criterion's depth.
//! Tree data: one column whose value is the node's path segment.

use std::cmp::Ordering;
use std::sync::Arc;

use grid_model::{CellParams, CellValue, ColumnDef, ColumnKind, ColumnType, FieldId, GroupKey};
use rustc_hash::FxHashMap;

use crate::definition::{
    grouping_column_field, GroupingColumnMode, GROUPING_COLUMN_SINGLE_FIELD, TREE_DATA_GROUPING_FIELD,
};

/// Orders nodes grouped by different fields: nodes without a grouping field
/// first, then by the position of the field in the grouping model.
///
/// Not direction invariant: a descending sort reverses this order too.
pub fn grouping_field_index_comparator(a: Option<&str>, b: Option<&str>, model: &[FieldId]) -> Ordering {
    let position = |field: &str| model.iter().position(|f| f == field).unwrap_or(usize::MAX);
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => position(a).cmp(&position(b)),
    }
}

fn grouping_column_base(field: &str, header: String) -> ColumnDef {
    let mut column = ColumnDef::new(field, ColumnType::String)
        .with_header(header)
        .with_kind(ColumnKind::RowGrouping)
        .with_groupable(false)
        .with_aggregable(false);
    column.available_aggregation_functions = Some(Vec::new());
    column
}

fn original_columns(model: &[FieldId], columns: &[ColumnDef]) -> FxHashMap<FieldId, ColumnDef> {
    model
        .iter()
        .filter_map(|field| {
            columns
                .iter()
                .find(|c| &c.field == field)
                .map(|c| (field.clone(), c.clone()))
        })
        .collect()
}

/// The single grouping column for a sanitized grouping model.
pub fn single_grouping_column(model: &[FieldId], columns: &[ColumnDef]) -> ColumnDef {
    let originals = original_columns(model, columns);
    let model = model.to_vec();

    grouping_column_base(GROUPING_COLUMN_SINGLE_FIELD, "Group".to_string())
        .with_value_getter(|params: &CellParams<'_>| {
            params.group_key.map(GroupKey::to_cell_value).unwrap_or_default()
        })
        .with_sort_comparator(move |a, b, params_a, params_b| {
            match (params_a.grouping_field, params_b.grouping_field) {
                (Some(field_a), Some(field_b)) if field_a == field_b => match originals.get(field_a) {
                    Some(original) => original.compare(a, b, params_a, params_b),
                    None => a.compare(b),
                },
                (field_a, field_b) => grouping_field_index_comparator(field_a, field_b, &model),
            }
        })
}

/// One grouping column per criterion of a sanitized grouping model.
pub fn multiple_grouping_columns(model: &[FieldId], columns: &[ColumnDef]) -> Vec<ColumnDef> {
    let originals = original_columns(model, columns);

    model
        .iter()
        .map(|criterion| {
            let original = originals.get(criterion).cloned();
            let header = original
                .as_ref()
                .map(ColumnDef::header)
                .unwrap_or_else(|| criterion.clone());
            let getter_criterion = criterion.clone();
            let comparator_criterion = criterion.clone();
            let model = model.to_vec();

            grouping_column_base(&grouping_column_field(criterion), header)
                .with_value_getter(move |params: &CellParams<'_>| {
                    match (params.grouping_field, params.group_key) {
                        (Some(field), Some(key)) if field == getter_criterion => key.to_cell_value(),
                        _ => CellValue::Empty,
                    }
                })
                .with_sort_comparator(move |a, b, params_a, params_b| {
                    let own = Some(comparator_criterion.as_str());
                    if params_a.grouping_field == own && params_b.grouping_field == own {
                        match &original {
                            Some(original) => original.compare(a, b, params_a, params_b),
                            None => a.compare(b),
                        }
                    } else {
                        grouping_field_index_comparator(params_a.grouping_field, params_b.grouping_field, &model)
                    }
                })
        })
        .collect()
}

/// The grouping column of tree data: every node shows its own path segment.
pub fn tree_data_grouping_column() -> ColumnDef {
    grouping_column_base(TREE_DATA_GROUPING_FIELD, "Group".to_string()).with_value_getter(
        |params: &CellParams<'_>| params.group_key.map(GroupKey::to_cell_value).unwrap_or_default(),
    )
}

/// Grouping columns for the current configuration; empty when nothing is grouped.
pub fn create_grouping_columns(
    mode: GroupingColumnMode,
    tree_data: bool,
    model: &[FieldId],
    columns: &[ColumnDef],
) -> Vec<ColumnDef> {
    if tree_data {
        return vec![tree_data_grouping_column()];
    }
    if model.is_empty() {
        return Vec::new();
    }
    match mode {
        GroupingColumnMode::Single => vec![single_grouping_column(model, columns)],
        GroupingColumnMode::Multiple => multiple_grouping_columns(model, columns),
    }
}
