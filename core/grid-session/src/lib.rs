//! FILENAME: core/grid-session/src/lib.rs
//! Headless data grid session.
//!
//! `GridSession` owns a `RowGroupingEngine` and a `CellSelectionEngine`,
//! keeps the selection's visible index space in step with the row tree and
//! routes event subscriptions to the engine that publishes them.

pub mod options;
pub mod session;

pub use options::GridOptions;
pub use session::{GridSession, SessionSubscription};

pub use cell_selection_engine::{CellCoord, CellSelectionOptions, Modifiers, NavigationKey, Viewport};
pub use grid_model::{
    AggregationModel, CellSelectionModel, CellValue, ColumnDef, FilterItem, FilterModel, GridEvent,
    GridEventKind, LogicOperator, Record, RowGroupingModel, RowId, RowUpdate, SortItem, SortModel,
};
pub use row_grouping_engine::{RowGroupingOptions, TreeDataPathGetter};
