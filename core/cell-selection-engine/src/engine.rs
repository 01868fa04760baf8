//! FILENAME: core/cell-selection-engine/src/engine.rs
//! Cell Selection Engine - Pointer and keyboard driven range selection.
//!
//! States:
//! - Idle: no drag in progress
//! - Dragging: a mouse-down on an eligible cell recorded the anchor; every
//!   mouse-over recomputes the range between anchor and hovered cell
//!
//! Mouse-up returns to Idle. Clicks and Shift+Arrow keys work from the
//! virtually focused cell, which is tracked here and not taken from the host.

use grid_model::{CellSelectionModel, EventBus, GridEvent, GridEventKind, RowId, SubscriptionId};

use crate::autoscroll::{AutoScrollController, ScrollDelta, Viewport};
use crate::clipboard::serialize_selection;
use crate::definition::{
    CellCoord, CellSelectionOptions, EdgeClasses, Modifiers, NavigationKey, CLASS_RANGE_BOTTOM,
    CLASS_RANGE_LEFT, CLASS_RANGE_RIGHT, CLASS_RANGE_TOP, CLASS_SELECTED,
};
use crate::index::VisibleIndexSpace;

#[derive(Debug, Clone)]
struct DragSession {
    anchor: CellCoord,
    /// Selection before the drag began; additive drags merge into it.
    base: CellSelectionModel,
    additive: bool,
    moved: bool,
}

#[derive(Debug)]
pub struct CellSelectionEngine {
    options: CellSelectionOptions,
    model: CellSelectionModel,
    index: VisibleIndexSpace,

    drag: Option<DragSession>,
    /// The virtually focused cell, moved by clicks and arrow keys.
    focused: Option<CellCoord>,
    /// The fixed corner of keyboard and shift-click ranges.
    range_origin: Option<CellCoord>,

    auto_scroll: AutoScrollController,
    events: EventBus,
}

impl Default for CellSelectionEngine {
    fn default() -> Self {
        CellSelectionEngine::new(CellSelectionOptions::default())
    }
}

impl CellSelectionEngine {
    pub fn new(options: CellSelectionOptions) -> Self {
        let auto_scroll = AutoScrollController::new(options.auto_scroll_sensitivity, options.auto_scroll_speed);
        CellSelectionEngine {
            options,
            model: CellSelectionModel::new(),
            index: VisibleIndexSpace::default(),
            drag: None,
            focused: None,
            range_origin: None,
            auto_scroll,
            events: EventBus::new(),
        }
    }

    pub fn options(&self) -> &CellSelectionOptions {
        &self.options
    }

    pub fn is_enabled(&self) -> bool {
        self.options.enabled
    }

    /// Disabling ends any drag; the current selection is kept.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.options.enabled = enabled;
        if !enabled {
            self.end_drag();
        }
    }

    pub fn set_clipboard_delimiter(&mut self, delimiter: &str) {
        self.options.clipboard_delimiter = delimiter.to_string();
    }

    /// Replaces the visible rows and columns. The selection is kept by id.
    pub fn set_visible_index_space(&mut self, index: VisibleIndexSpace) {
        log::debug!(
            target: "SELECTION",
            "index space: {} rows x {} columns",
            index.row_count(),
            index.column_count()
        );
        self.index = index;
    }

    pub fn visible_index_space(&self) -> &VisibleIndexSpace {
        &self.index
    }

    // ========================================================================
    // MODEL ACCESS
    // ========================================================================

    pub fn is_cell_selected(&self, id: &RowId, field: &str) -> bool {
        self.model.is_selected(id, field)
    }

    pub fn cell_selection_model(&self) -> &CellSelectionModel {
        &self.model
    }

    pub fn set_cell_selection_model(&mut self, model: CellSelectionModel) {
        if !self.options.enabled {
            return;
        }
        self.replace_model(model);
    }

    pub fn clear_cell_selection(&mut self) {
        self.set_cell_selection_model(CellSelectionModel::new());
    }

    /// Selects the rectangle spanned by `start` and `end` in visible order.
    /// With `keep_others` the rectangle is added to the current selection,
    /// otherwise it replaces it. A corner that is not visible makes this a no-op.
    pub fn select_cell_range(&mut self, start: &CellCoord, end: &CellCoord, keep_others: bool) {
        if !self.options.enabled {
            return;
        }
        let base = if keep_others {
            self.model.clone()
        } else {
            CellSelectionModel::new()
        };
        if let Some(model) = self.range_model(base, start, end) {
            self.replace_model(model);
        }
    }

    /// Every selected cell: visible rows first in display order, then rows
    /// that are currently not visible ordered by id. Fields keep selection order.
    pub fn selected_cells(&self) -> Vec<CellCoord> {
        let mut hidden: Vec<&RowId> = self
            .model
            .rows()
            .map(|(id, _)| id)
            .filter(|id| self.index.row_index(id).is_none())
            .collect();
        hidden.sort();

        self.index
            .rows()
            .iter()
            .chain(hidden)
            .filter_map(|id| self.model.fields_of(id).map(|fields| (id, fields)))
            .flat_map(|(id, fields)| {
                fields.iter().map(move |field| CellCoord {
                    id: id.clone(),
                    field: field.clone(),
                })
            })
            .collect()
    }

    // ========================================================================
    // POINTER
    // ========================================================================

    /// Starts a drag session on an eligible cell.
    pub fn mouse_down(&mut self, cell: &CellCoord, modifiers: Modifiers) {
        if !self.options.enabled || !self.index.is_eligible(cell) {
            return;
        }
        self.drag = Some(DragSession {
            anchor: cell.clone(),
            base: self.model.clone(),
            additive: modifiers.ctrl,
            moved: false,
        });
    }

    /// Grows the dragged range to `cell`. Ignored outside a drag session and
    /// for cells that cannot be resolved.
    pub fn mouse_over(&mut self, cell: &CellCoord) {
        if !self.options.enabled {
            return;
        }
        let Some(drag) = &self.drag else {
            return;
        };
        if !drag.moved && drag.anchor == *cell {
            return;
        }
        let base = if drag.additive {
            drag.base.clone()
        } else {
            CellSelectionModel::new()
        };
        let anchor = drag.anchor.clone();
        if let Some(model) = self.range_model(base, &anchor, cell) {
            if let Some(drag) = &mut self.drag {
                drag.moved = true;
            }
            self.range_origin = Some(anchor);
            self.focused = Some(cell.clone());
            self.replace_model(model);
        }
    }

    /// Feeds the pointer position during a drag to the auto-scroller.
    pub fn pointer_move(&mut self, x: f64, y: f64, viewport: Viewport) {
        if self.drag.is_some() {
            self.auto_scroll.update(x, y, viewport);
        }
    }

    /// The scroll to apply this animation frame, if auto-scroll is active.
    pub fn auto_scroll_step(&self) -> Option<ScrollDelta> {
        self.auto_scroll.step()
    }

    pub fn mouse_up(&mut self) {
        self.end_drag();
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    fn end_drag(&mut self) {
        self.drag = None;
        self.auto_scroll.stop();
    }

    /// A click that was not part of a drag.
    ///
    /// - plain: select only this cell
    /// - ctrl: toggle this cell
    /// - shift with a focused cell: range from the focused cell
    pub fn click(&mut self, cell: &CellCoord, modifiers: Modifiers) {
        if !self.options.enabled || !self.index.is_eligible(cell) {
            return;
        }

        if modifiers.shift {
            if let Some(origin) = self.range_origin.clone().or_else(|| self.focused.clone()) {
                self.select_cell_range(&origin, cell, modifiers.ctrl);
                self.range_origin = Some(origin);
                self.focused = Some(cell.clone());
                return;
            }
        }

        let mut model = if modifiers.ctrl {
            self.model.clone()
        } else {
            CellSelectionModel::new()
        };
        if modifiers.ctrl {
            model.toggle(&cell.id, &cell.field);
        } else {
            model.select(&cell.id, &cell.field);
        }
        self.focused = Some(cell.clone());
        self.range_origin = Some(cell.clone());
        self.replace_model(model);
    }

    // ========================================================================
    // KEYBOARD
    // ========================================================================

    /// Moves the virtual focus without touching the selection.
    pub fn set_focused_cell(&mut self, cell: Option<CellCoord>) {
        self.range_origin = cell.clone();
        self.focused = cell;
    }

    pub fn focused_cell(&self) -> Option<&CellCoord> {
        self.focused.as_ref()
    }

    /// Shift+Arrow extends the range from the origin by one step; steps off the
    /// grid are ignored. Any navigation without Shift clears the selection.
    pub fn key_down(&mut self, key: NavigationKey, modifiers: Modifiers) {
        if !self.options.enabled {
            return;
        }
        if !modifiers.shift {
            if !self.model.is_empty() {
                self.replace_model(CellSelectionModel::new());
            }
            if let (Some(focused), Some((rows, columns))) = (&self.focused, key.arrow_step()) {
                if let Some(next) = self.index.step(focused, rows, columns) {
                    self.set_focused_cell(Some(next));
                }
            }
            return;
        }

        let (Some((rows, columns)), Some(focused)) = (key.arrow_step(), self.focused.clone()) else {
            return;
        };
        let Some(next) = self.index.step(&focused, rows, columns) else {
            return;
        };
        let origin = self.range_origin.clone().unwrap_or(focused);
        if let Some(model) = self.range_model(CellSelectionModel::new(), &origin, &next) {
            self.range_origin = Some(origin);
            self.focused = Some(next);
            self.replace_model(model);
        }
    }

    // ========================================================================
    // RENDERING
    // ========================================================================

    /// Range edges of a selected cell. Unselected cells have none.
    pub fn edge_classes(&self, id: &RowId, field: &str) -> EdgeClasses {
        if !self.model.is_selected(id, field) {
            return EdgeClasses::default();
        }
        let cell = CellCoord {
            id: id.clone(),
            field: field.to_string(),
        };
        let open = |rows: isize, columns: isize| match self.index.step(&cell, rows, columns) {
            Some(neighbour) => !self.model.is_selected(&neighbour.id, &neighbour.field),
            None => true,
        };
        EdgeClasses {
            top: open(-1, 0),
            bottom: open(1, 0),
            left: open(0, -1),
            right: open(0, 1),
        }
    }

    pub fn cell_class_names(&self, id: &RowId, field: &str) -> Vec<&'static str> {
        if !self.model.is_selected(id, field) {
            return Vec::new();
        }
        let edges = self.edge_classes(id, field);
        let mut classes = vec![CLASS_SELECTED];
        for (on, class) in [
            (edges.top, CLASS_RANGE_TOP),
            (edges.bottom, CLASS_RANGE_BOTTOM),
            (edges.left, CLASS_RANGE_LEFT),
            (edges.right, CLASS_RANGE_RIGHT),
        ] {
            if on {
                classes.push(class);
            }
        }
        classes
    }

    // ========================================================================
    // CLIPBOARD
    // ========================================================================

    /// Clipboard text of a multi-cell selection; `None` for at most one cell.
    pub fn copy_selection<F>(&self, value_of: F) -> Option<String>
    where
        F: FnMut(&RowId, &str) -> String,
    {
        serialize_selection(&self.model, &self.index, &self.options.clipboard_delimiter, value_of)
    }

    // ========================================================================
    // EVENTS
    // ========================================================================

    pub fn subscribe(
        &mut self,
        listener: impl FnMut(&GridEvent) + Send + 'static,
    ) -> SubscriptionId {
        self.events.subscribe(GridEventKind::CellSelectionChange, listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    fn range_model(&self, base: CellSelectionModel, start: &CellCoord, end: &CellCoord) -> Option<CellSelectionModel> {
        let Some(cells) = self.index.rectangle(start, end) else {
            log::debug!(target: "SELECTION", "range corner not visible: {:?} .. {:?}", start, end);
            return None;
        };
        let mut model = base;
        for cell in &cells {
            model.select(&cell.id, &cell.field);
        }
        Some(model)
    }

    fn replace_model(&mut self, model: CellSelectionModel) {
        if model == self.model {
            return;
        }
        self.model = model;
        log::debug!(target: "SELECTION", "selection changed: {} cells", self.model.len());
        self.events.publish(GridEvent::CellSelectionChange(self.model.clone()));
    }
}
