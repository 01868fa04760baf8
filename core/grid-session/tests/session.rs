//! FILENAME: core/grid-session/tests/session.rs
//! Row grouping and cell selection working together through `GridSession`.

mod common;

use common::{team, EventLog, SalesFixture};
use grid_session::{
    AggregationModel, CellCoord, FilterItem, FilterModel, GridEvent, GridEventKind, GridSession,
    LogicOperator, Modifiers, NavigationKey, RowId, SortItem,
};
use pretty_assertions::assert_eq;

fn grouped() -> GridSession {
    let mut session = SalesFixture::session();
    session.set_row_grouping_model(vec!["team".to_string()]);
    session
}

#[test]
fn test_visible_rows_feed_the_selection_index() {
    let session = grouped();
    let index = session.selection_engine().visible_index_space();

    assert_eq!(
        index.rows(),
        &[
            team("Red"),
            RowId::Number(1),
            RowId::Number(3),
            RowId::Number(5),
            team("Blue"),
            RowId::Number(2),
            RowId::Number(4),
            RowId::Number(6),
        ]
    );
    assert_eq!(index.columns()[0], "__row_group_by_columns_group__");
    assert_eq!(index.column_count(), 4);
}

#[test]
fn test_range_spans_groups_in_display_order() {
    let mut session = grouped();
    session.select_cell_range(&CellCoord::new(2, "amount"), &CellCoord::new(1, "rep"), false);

    assert_eq!(session.cell_selection_model().len(), 10);
    assert!(session.is_cell_selected(&team("Blue"), "rep"));
    assert!(!session.is_cell_selected(&RowId::Number(4), "rep"));
    assert_eq!(
        session.selected_cells()[..3],
        [
            CellCoord::new(1, "rep"),
            CellCoord::new(1, "amount"),
            CellCoord::new(3, "rep"),
        ]
    );
}

#[test]
fn test_footer_rows_are_not_selectable() {
    let mut session = grouped();
    session.set_aggregation_model(AggregationModel::new().with("amount", "sum"));
    let footer = RowId::text("auto-generated-group-footer-auto-generated-group-node-root");
    assert_eq!(session.visible_rows().last(), Some(&footer));

    session.click(&CellCoord { id: footer.clone(), field: "amount".to_string() }, Modifiers::NONE);
    assert!(session.cell_selection_model().is_empty());

    session.select_cell_range(
        &CellCoord::new(6, "amount"),
        &CellCoord { id: footer, field: "amount".to_string() },
        false,
    );
    assert_eq!(session.selected_cells(), vec![CellCoord::new(6, "amount")]);
}

#[test]
fn test_hidden_rows_cannot_anchor_a_range() {
    let mut session = grouped();
    session.select_cell_range(&CellCoord::new(1, "rep"), &CellCoord::new(3, "rep"), false);
    session.set_filter_model(FilterModel::new(
        vec![FilterItem::new(1, "amount", ">", 50.0)],
        LogicOperator::And,
    ));

    // the selection is kept by id across the filter change
    assert_eq!(session.cell_selection_model().len(), 2);

    session.select_cell_range(&CellCoord::new(5, "rep"), &CellCoord::new(4, "rep"), false);
    assert_eq!(session.cell_selection_model().len(), 2);

    session.select_cell_range(&CellCoord::new(1, "rep"), &CellCoord::new(4, "rep"), false);
    let ids: Vec<RowId> = session.selected_cells().into_iter().map(|cell| cell.id).collect();
    assert_eq!(ids, vec![RowId::Number(1), RowId::Number(3), team("Blue"), RowId::Number(4)]);
}

#[test]
fn test_copy_uses_aggregates_for_group_rows() {
    let mut session = grouped();
    session.set_aggregation_model(AggregationModel::new().with("amount", "sum"));
    session.select_cell_range(&CellCoord { id: team("Blue"), field: "amount".to_string() }, &CellCoord::new(4, "amount"), false);

    assert_eq!(session.copy_selection().as_deref(), Some("1550\r\n40\r\n1500"));
}

#[test]
fn test_sorting_moves_the_range_geometry() {
    let mut session = grouped();
    session.set_sort_model(vec![SortItem::desc("amount")]);
    session.click(&CellCoord::new(4, "amount"), Modifiers::NONE);
    session.key_down(NavigationKey::ArrowDown, Modifiers::SHIFT);
    session.key_down(NavigationKey::ArrowDown, Modifiers::SHIFT);

    let ids: Vec<RowId> = session.selected_cells().into_iter().map(|cell| cell.id).collect();
    assert_eq!(ids, vec![RowId::Number(4), RowId::Number(2), RowId::Number(6)]);
}

#[test]
fn test_events_are_routed_to_their_engine() {
    let mut session = SalesFixture::session();
    let grouping = EventLog::attach(&mut session, GridEventKind::RowGroupingModelChange);
    let selection = EventLog::attach(&mut session, GridEventKind::CellSelectionChange);

    session.add_row_grouping_criteria("team", None);
    session.add_row_grouping_criteria("missing", None);
    session.click(&CellCoord::new(1, "rep"), Modifiers::NONE);

    assert_eq!(
        grouping.events(),
        vec![GridEvent::RowGroupingModelChange(vec!["team".to_string()])]
    );
    assert_eq!(selection.events().len(), 1);
}

#[test]
fn test_disabled_selection_ignores_input() {
    let mut session = GridSession::from_json(r#"{"cellSelection": {"enabled": false}}"#).unwrap();
    session.set_columns(SalesFixture::columns());
    session.set_rows(SalesFixture::records());

    session.click(&CellCoord::new(1, "rep"), Modifiers::NONE);
    session.select_cell_range(&CellCoord::new(1, "rep"), &CellCoord::new(2, "amount"), false);
    assert!(session.selected_cells().is_empty());
    assert!(!session.options().cell_selection.enabled);
}
