//! FILENAME: core/cell-selection-engine/src/clipboard.rs
//! Serializes a multi-cell selection for the clipboard.

use grid_model::{CellSelectionModel, RowId};

use crate::index::VisibleIndexSpace;

pub const ROW_SEPARATOR: &str = "\r\n";

/// Rows in visible order, each row's fields in selection order, fields joined
/// by `delimiter` and rows by CRLF. Selected rows that are not visible are
/// skipped.
///
/// Returns `None` for selections of at most one cell so the host falls back
/// to copying the single focused value.
pub fn serialize_selection<F>(
    model: &CellSelectionModel,
    index: &VisibleIndexSpace,
    delimiter: &str,
    mut value_of: F,
) -> Option<String>
where
    F: FnMut(&RowId, &str) -> String,
{
    if model.len() <= 1 {
        return None;
    }

    let lines: Vec<String> = index
        .rows()
        .iter()
        .filter_map(|id| {
            let fields = model.fields_of(id)?;
            let values: Vec<String> = fields.iter().map(|field| value_of(id, field)).collect();
            Some(values.join(delimiter))
        })
        .collect();

    log::debug!(target: "SELECTION", "copied {} cells in {} rows", model.len(), lines.len());
    Some(lines.join(ROW_SEPARATOR))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(id: &RowId, field: &str) -> String {
        format!("{}{}", field, id)
    }

    #[test]
    fn test_rows_follow_visible_order() {
        let index = VisibleIndexSpace::from_ids(&[RowId::Number(2), RowId::Number(1)], &["a", "b"]);
        let mut model = CellSelectionModel::new();
        model.select(&RowId::Number(1), "b");
        model.select(&RowId::Number(1), "a");
        model.select(&RowId::Number(2), "a");

        let text = serialize_selection(&model, &index, "\t", value).unwrap();
        assert_eq!(text, "a2\r\nb1\ta1");
    }

    #[test]
    fn test_single_cell_falls_back() {
        let index = VisibleIndexSpace::from_ids(&[RowId::Number(1)], &["a"]);
        let mut model = CellSelectionModel::new();
        assert_eq!(serialize_selection(&model, &index, ",", value), None);
        model.select(&RowId::Number(1), "a");
        assert_eq!(serialize_selection(&model, &index, ",", value), None);
    }
}
