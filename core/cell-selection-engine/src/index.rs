//! FILENAME: core/cell-selection-engine/src/index.rs
//! Visible Index Space - Row and column order as currently displayed.
//!
//! Range selection works in this coordinate system: rows after filtering,
//! sorting and collapsing, columns after reordering. A cell that cannot be
//! resolved to a visible position takes no part in a range.

use grid_model::{ColumnDef, ColumnKind, ColumnType, FieldId, RowId, RowKind};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::definition::CellCoord;

/// A displayed row and what kind of row it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibleRow {
    pub id: RowId,
    pub kind: RowKind,
}

/// A displayed column and whether its cells can be selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibleColumn {
    pub field: FieldId,
    pub selectable: bool,
}

impl VisibleColumn {
    /// Checkbox, detail-toggle and action columns are not selectable.
    pub fn from_column(column: &ColumnDef) -> Self {
        let selectable = !matches!(column.kind, ColumnKind::CheckboxSelection | ColumnKind::DetailPanelToggle)
            && column.column_type != ColumnType::Actions;
        VisibleColumn {
            field: column.field.clone(),
            selectable,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct VisibleIndexSpace {
    rows: Vec<RowId>,
    columns: Vec<FieldId>,
    row_positions: FxHashMap<RowId, usize>,
    column_positions: FxHashMap<FieldId, usize>,
    /// Footer and pinned rows.
    ineligible_rows: FxHashSet<RowId>,
    ineligible_columns: FxHashSet<FieldId>,
}

impl VisibleIndexSpace {
    pub fn new(rows: Vec<VisibleRow>, columns: Vec<VisibleColumn>) -> Self {
        let mut space = VisibleIndexSpace::default();
        for row in rows {
            if space.row_positions.contains_key(&row.id) {
                continue;
            }
            if matches!(row.kind, RowKind::Footer | RowKind::PinnedRow) {
                space.ineligible_rows.insert(row.id.clone());
            }
            space.row_positions.insert(row.id.clone(), space.rows.len());
            space.rows.push(row.id);
        }
        for column in columns {
            if space.column_positions.contains_key(&column.field) {
                continue;
            }
            if !column.selectable {
                space.ineligible_columns.insert(column.field.clone());
            }
            space.column_positions.insert(column.field.clone(), space.columns.len());
            space.columns.push(column.field);
        }
        space
    }

    /// Only leaf rows and selectable columns; handy for hosts without groups.
    pub fn from_ids(rows: &[RowId], fields: &[&str]) -> Self {
        VisibleIndexSpace::new(
            rows.iter()
                .map(|id| VisibleRow {
                    id: id.clone(),
                    kind: RowKind::Leaf,
                })
                .collect(),
            fields
                .iter()
                .map(|field| VisibleColumn {
                    field: field.to_string(),
                    selectable: true,
                })
                .collect(),
        )
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn rows(&self) -> &[RowId] {
        &self.rows
    }

    pub fn columns(&self) -> &[FieldId] {
        &self.columns
    }

    pub fn row_index(&self, id: &RowId) -> Option<usize> {
        self.row_positions.get(id).copied()
    }

    pub fn column_index(&self, field: &str) -> Option<usize> {
        self.column_positions.get(field).copied()
    }

    /// `(row index, column index)` of a cell.
    pub fn position(&self, cell: &CellCoord) -> Option<(usize, usize)> {
        Some((self.row_index(&cell.id)?, self.column_index(&cell.field)?))
    }

    pub fn cell_at(&self, row: usize, column: usize) -> Option<CellCoord> {
        Some(CellCoord {
            id: self.rows.get(row)?.clone(),
            field: self.columns.get(column)?.clone(),
        })
    }

    /// Whether a cell can be part of a selection: it is visible, not in a
    /// footer or pinned row, and not in a checkbox, detail-toggle or action column.
    pub fn is_eligible(&self, cell: &CellCoord) -> bool {
        self.position(cell).is_some()
            && !self.ineligible_rows.contains(&cell.id)
            && !self.ineligible_columns.contains(&cell.field)
    }

    /// The cell one step away, or `None` when the step leaves the grid.
    pub fn step(&self, cell: &CellCoord, row_delta: isize, column_delta: isize) -> Option<CellCoord> {
        let (row, column) = self.position(cell)?;
        let row = row.checked_add_signed(row_delta)?;
        let column = column.checked_add_signed(column_delta)?;
        self.cell_at(row, column)
    }

    /// Every eligible cell of the rectangle spanned by two cells, in visible
    /// order. The corners may be given in either order.
    pub fn rectangle(&self, start: &CellCoord, end: &CellCoord) -> Option<Vec<CellCoord>> {
        let (start_row, start_column) = self.position(start)?;
        let (end_row, end_column) = self.position(end)?;
        let (first_row, last_row) = (start_row.min(end_row), start_row.max(end_row));
        let (first_column, last_column) = (start_column.min(end_column), start_column.max(end_column));

        let mut cells = Vec::with_capacity((last_row - first_row + 1) * (last_column - first_column + 1));
        for id in &self.rows[first_row..=last_row] {
            if self.ineligible_rows.contains(id) {
                continue;
            }
            for field in &self.columns[first_column..=last_column] {
                if self.ineligible_columns.contains(field) {
                    continue;
                }
                cells.push(CellCoord {
                    id: id.clone(),
                    field: field.clone(),
                });
            }
        }
        Some(cells)
    }
}
