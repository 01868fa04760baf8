//! FILENAME: core/cell-selection-engine/tests/range_properties.rs
//! Property tests for rectangular range selection.

use cell_selection_engine::{CellCoord, CellSelectionEngine, Modifiers, VisibleIndexSpace};
use grid_model::RowId;
use proptest::prelude::*;

const FIELDS: [&str; 6] = ["a", "b", "c", "d", "e", "f"];

fn engine(rows: usize, columns: usize) -> CellSelectionEngine {
    let ids: Vec<RowId> = (0..rows as i64).map(RowId::Number).collect();
    let mut engine = CellSelectionEngine::default();
    engine.set_visible_index_space(VisibleIndexSpace::from_ids(&ids, &FIELDS[..columns]));
    engine
}

fn cell(row: usize, column: usize) -> CellCoord {
    CellCoord::new(row as i64, FIELDS[column])
}

fn corner() -> impl Strategy<Value = (usize, usize)> {
    (0usize..8, 0usize..6)
}

proptest! {
    #[test]
    fn range_is_exact_rectangle(start in corner(), end in corner()) {
        let mut engine = engine(8, 6);
        engine.select_cell_range(&cell(start.0, start.1), &cell(end.0, end.1), false);

        let rows = start.0.min(end.0)..=start.0.max(end.0);
        let columns = start.1.min(end.1)..=start.1.max(end.1);
        let expected = rows.clone().count() * columns.clone().count();
        prop_assert_eq!(engine.cell_selection_model().len(), expected);

        for row in 0..8 {
            for column in 0..6 {
                let inside = rows.contains(&row) && columns.contains(&column);
                prop_assert_eq!(
                    engine.is_cell_selected(&RowId::Number(row as i64), FIELDS[column]),
                    inside
                );
            }
        }
    }

    #[test]
    fn range_ignores_corner_order(start in corner(), end in corner()) {
        let mut forward = engine(8, 6);
        let mut backward = engine(8, 6);
        forward.select_cell_range(&cell(start.0, start.1), &cell(end.0, end.1), false);
        backward.select_cell_range(&cell(end.0, end.1), &cell(start.0, start.1), false);
        prop_assert_eq!(forward.cell_selection_model(), backward.cell_selection_model());
    }

    #[test]
    fn replacing_range_discards_previous(first in (corner(), corner()), second in (corner(), corner())) {
        let mut engine = engine(8, 6);
        engine.select_cell_range(&cell(first.0.0, first.0.1), &cell(first.1.0, first.1.1), false);
        engine.select_cell_range(&cell(second.0.0, second.0.1), &cell(second.1.0, second.1.1), false);

        let mut fresh = engine_with_range(second);
        prop_assert_eq!(engine.cell_selection_model(), fresh.cell_selection_model());
        fresh.clear_cell_selection();
        prop_assert!(fresh.cell_selection_model().is_empty());
    }

    #[test]
    fn drag_matches_direct_range(start in corner(), path in prop::collection::vec(corner(), 1..6)) {
        let mut dragged = engine(8, 6);
        dragged.mouse_down(&cell(start.0, start.1), Modifiers::NONE);
        for step in &path {
            dragged.mouse_over(&cell(step.0, step.1));
        }
        dragged.mouse_up();

        let last = path[path.len() - 1];
        let mut direct = engine(8, 6);
        if last != start || path.iter().any(|step| *step != start) {
            direct.select_cell_range(&cell(start.0, start.1), &cell(last.0, last.1), false);
        }
        prop_assert_eq!(dragged.cell_selection_model(), direct.cell_selection_model());
    }
}

fn engine_with_range(range: ((usize, usize), (usize, usize))) -> CellSelectionEngine {
    let mut engine = engine(8, 6);
    engine.select_cell_range(&cell(range.0 .0, range.0 .1), &cell(range.1 .0, range.1 .1), false);
    engine
}

#[test]
fn test_three_by_three_then_two_by_three() {
    let mut engine = engine(3, 3);
    engine.select_cell_range(&cell(2, 2), &cell(0, 0), false);
    assert_eq!(engine.cell_selection_model().len(), 9);

    engine.select_cell_range(&cell(1, 0), &cell(2, 2), false);
    assert_eq!(engine.cell_selection_model().len(), 6);
    for column in 0..3 {
        assert!(!engine.is_cell_selected(&RowId::Number(0), FIELDS[column]));
    }
}
