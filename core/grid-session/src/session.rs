//! FILENAME: core/grid-session/src/session.rs
//! Grid Session - One row grouping engine and one cell selection engine.
//!
//! The session is the single writer of both engines. After every operation
//! that can change which rows or columns are visible it hands the new visible
//! index space to the selection engine, so ranges always resolve against what
//! is displayed.

use cell_selection_engine::{
    CellCoord, CellSelectionEngine, Modifiers, NavigationKey, ScrollDelta, Viewport, VisibleColumn,
    VisibleIndexSpace, VisibleRow,
};
use grid_model::{
    AggregationModel, CellSelectionModel, CellValue, ColumnDef, FilterModel, GridEvent,
    GridEventKind, ModelError, Record, RowGroupingModel, RowId, RowIdGetter, RowUpdate, SortModel,
    SubscriptionId,
};
use row_grouping_engine::{
    AggregationCell, AggregationFunction, AggregationPositionPolicy, FilterPredicate, NodeId,
    RowGroupingEngine, TreeDataPathGetter,
};

use crate::options::GridOptions;

/// Handle for a listener registered through the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionSubscription {
    Rows(SubscriptionId),
    Selection(SubscriptionId),
}

#[derive(Debug)]
pub struct GridSession {
    rows: RowGroupingEngine,
    selection: CellSelectionEngine,
}

impl Default for GridSession {
    fn default() -> Self {
        GridSession::new(GridOptions::default())
    }
}

impl GridSession {
    pub fn new(options: GridOptions) -> Self {
        log::info!(target: "SESSION", "new session: {:?}", options);
        GridSession {
            rows: RowGroupingEngine::new(options.row_grouping),
            selection: CellSelectionEngine::new(options.cell_selection),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        Ok(GridSession::new(GridOptions::from_json(json)?))
    }

    pub fn options(&self) -> GridOptions {
        GridOptions {
            row_grouping: self.rows.options().clone(),
            cell_selection: self.selection.options().clone(),
        }
    }

    pub fn row_engine(&self) -> &RowGroupingEngine {
        &self.rows
    }

    pub fn selection_engine(&self) -> &CellSelectionEngine {
        &self.selection
    }

    /// Runs `f` against the row engine and re-syncs the selection's index space.
    pub fn with_row_engine<R>(&mut self, f: impl FnOnce(&mut RowGroupingEngine) -> R) -> R {
        let result = f(&mut self.rows);
        self.sync_index_space();
        result
    }

    fn sync_index_space(&mut self) {
        let tree = self.rows.tree();
        let rows: Vec<VisibleRow> = self
            .rows
            .visible_rows()
            .into_iter()
            .filter_map(|id| {
                let kind = tree.get(&id)?.kind();
                Some(VisibleRow { id, kind })
            })
            .collect();
        let columns: Vec<VisibleColumn> = self.rows.columns().iter().map(VisibleColumn::from_column).collect();

        log::debug!(target: "SESSION", "sync index space: {} rows, {} columns", rows.len(), columns.len());
        self.selection
            .set_visible_index_space(VisibleIndexSpace::new(rows, columns));
    }

    // ========================================================================
    // ROWS AND COLUMNS
    // ========================================================================

    pub fn set_rows(&mut self, rows: Vec<Record>) {
        self.with_row_engine(|engine| engine.set_rows(rows));
    }

    pub fn update_rows(&mut self, updates: Vec<RowUpdate>) -> usize {
        self.with_row_engine(|engine| engine.update_rows(updates))
    }

    pub fn set_row_id_getter(&mut self, get_row_id: RowIdGetter) {
        self.with_row_engine(|engine| engine.set_row_id_getter(get_row_id));
    }

    pub fn set_columns(&mut self, columns: Vec<ColumnDef>) {
        self.with_row_engine(|engine| engine.set_columns(columns));
    }

    pub fn columns(&self) -> &[ColumnDef] {
        self.rows.columns()
    }

    pub fn visible_rows(&self) -> Vec<NodeId> {
        self.rows.visible_rows()
    }

    pub fn set_row_children_expansion(&mut self, id: &NodeId, expanded: bool) -> bool {
        self.with_row_engine(|engine| engine.set_row_children_expansion(id, expanded))
    }

    // ========================================================================
    // GROUPING, AGGREGATION, FILTER, SORT
    // ========================================================================

    pub fn row_grouping_model(&self) -> RowGroupingModel {
        self.rows.row_grouping_model()
    }

    pub fn set_row_grouping_model(&mut self, model: RowGroupingModel) {
        self.with_row_engine(|engine| engine.set_row_grouping_model(model));
    }

    pub fn add_row_grouping_criteria(&mut self, field: &str, index: Option<usize>) {
        self.with_row_engine(|engine| engine.add_row_grouping_criteria(field, index));
    }

    pub fn remove_row_grouping_criteria(&mut self, field: &str) {
        self.with_row_engine(|engine| engine.remove_row_grouping_criteria(field));
    }

    pub fn set_row_grouping_criteria_index(&mut self, field: &str, index: usize) {
        self.with_row_engine(|engine| engine.set_row_grouping_criteria_index(field, index));
    }

    pub fn set_tree_data_path(&mut self, get_path: Option<TreeDataPathGetter>) {
        self.with_row_engine(|engine| engine.set_tree_data_path(get_path));
    }

    pub fn aggregation_model(&self) -> AggregationModel {
        self.rows.aggregation_model()
    }

    pub fn set_aggregation_model(&mut self, model: AggregationModel) {
        self.with_row_engine(|engine| engine.set_aggregation_model(model));
    }

    pub fn register_aggregation_function(&mut self, name: &str, function: AggregationFunction) {
        self.with_row_engine(|engine| engine.register_aggregation_function(name, function));
    }

    pub fn available_aggregation_functions(&self, field: &str) -> Vec<String> {
        self.rows.available_aggregation_functions(field)
    }

    pub fn set_aggregation_position_policy(&mut self, policy: AggregationPositionPolicy) {
        self.with_row_engine(|engine| engine.set_aggregation_position_policy(policy));
    }

    pub fn aggregation_cell(&self, id: &NodeId, field: &str) -> Option<&AggregationCell> {
        self.rows.aggregation_cell(id, field)
    }

    pub fn filter_model(&self) -> &FilterModel {
        self.rows.filter_model()
    }

    pub fn set_filter_model(&mut self, model: FilterModel) {
        self.with_row_engine(|engine| engine.set_filter_model(model));
    }

    pub fn set_filter_predicate(&mut self, predicate: Option<FilterPredicate>) {
        self.with_row_engine(|engine| engine.set_filter_predicate(predicate));
    }

    pub fn sort_model(&self) -> &SortModel {
        self.rows.sort_model()
    }

    pub fn set_sort_model(&mut self, model: SortModel) {
        self.with_row_engine(|engine| engine.set_sort_model(model));
    }

    pub fn cell_value(&self, id: &NodeId, field: &str) -> Option<CellValue> {
        self.rows.cell_value(id, field)
    }

    pub fn formatted_cell(&self, id: &NodeId, field: &str) -> Option<String> {
        self.rows.formatted_cell(id, field)
    }

    // ========================================================================
    // CELL SELECTION
    // ========================================================================

    pub fn is_cell_selected(&self, id: &RowId, field: &str) -> bool {
        self.selection.is_cell_selected(id, field)
    }

    pub fn cell_selection_model(&self) -> &CellSelectionModel {
        self.selection.cell_selection_model()
    }

    pub fn set_cell_selection_model(&mut self, model: CellSelectionModel) {
        self.selection.set_cell_selection_model(model);
    }

    pub fn select_cell_range(&mut self, start: &CellCoord, end: &CellCoord, keep_others: bool) {
        self.selection.select_cell_range(start, end, keep_others);
    }

    pub fn selected_cells(&self) -> Vec<CellCoord> {
        self.selection.selected_cells()
    }

    pub fn clear_cell_selection(&mut self) {
        self.selection.clear_cell_selection();
    }

    pub fn mouse_down(&mut self, cell: &CellCoord, modifiers: Modifiers) {
        self.selection.mouse_down(cell, modifiers);
    }

    pub fn mouse_over(&mut self, cell: &CellCoord) {
        self.selection.mouse_over(cell);
    }

    pub fn mouse_up(&mut self) {
        self.selection.mouse_up();
    }

    pub fn click(&mut self, cell: &CellCoord, modifiers: Modifiers) {
        self.selection.click(cell, modifiers);
    }

    pub fn key_down(&mut self, key: NavigationKey, modifiers: Modifiers) {
        self.selection.key_down(key, modifiers);
    }

    pub fn set_focused_cell(&mut self, cell: Option<CellCoord>) {
        self.selection.set_focused_cell(cell);
    }

    pub fn pointer_move(&mut self, x: f64, y: f64, viewport: Viewport) {
        self.selection.pointer_move(x, y, viewport);
    }

    pub fn auto_scroll_step(&self) -> Option<ScrollDelta> {
        self.selection.auto_scroll_step()
    }

    pub fn cell_class_names(&self, id: &RowId, field: &str) -> Vec<&'static str> {
        self.selection.cell_class_names(id, field)
    }

    /// Clipboard text of the selection using displayed (formatted) values.
    pub fn copy_selection(&self) -> Option<String> {
        self.selection
            .copy_selection(|id, field| self.rows.formatted_cell(id, field).unwrap_or_default())
    }

    // ========================================================================
    // EVENTS
    // ========================================================================

    /// Registers a listener with whichever engine publishes `kind`.
    pub fn subscribe(
        &mut self,
        kind: GridEventKind,
        listener: impl FnMut(&GridEvent) + Send + 'static,
    ) -> SessionSubscription {
        match kind {
            GridEventKind::CellSelectionChange => SessionSubscription::Selection(self.selection.subscribe(listener)),
            _ => SessionSubscription::Rows(self.rows.subscribe(kind, listener)),
        }
    }

    pub fn unsubscribe(&mut self, subscription: SessionSubscription) -> bool {
        match subscription {
            SessionSubscription::Rows(id) => self.rows.unsubscribe(id),
            SessionSubscription::Selection(id) => self.selection.unsubscribe(id),
        }
    }
}
