//! FILENAME: core/grid-model/src/lib.rs
//! PURPOSE: Main library entry point for the shared data-grid model.
//! CONTEXT: Re-exports the types every engine crate builds on: cell values,
//! records, column definitions, the externally settable models and events.

pub mod cell;
pub mod column;
pub mod error;
pub mod event;
pub mod format;
pub mod model;
pub mod record;

// Re-export commonly used types at the crate root
pub use cell::{escape_id_component, CellValue, GroupKey, OrderedFloat};
pub use column::{
    same_callback, same_filter_operators, CellParams, CellRenderer, ColumnDef, ColumnKind,
    ColumnType, FilterApply, FilterOperator, GroupingValueGetter, HeaderRenderer, RowKind,
    SortComparator, ValueFormatter, ValueGetter,
};
pub use error::ModelError;
pub use event::{EventBus, GridEvent, GridEventKind, Listener, SubscriptionId};
pub use format::{format_cell_value, format_grouped};
pub use model::{
    AggregationModel, CellSelectionModel, FilterItem, FilterModel, LogicOperator,
    RowGroupingModel, SelectedFields, SortDirection, SortItem, SortModel,
};
pub use record::{
    default_row_id_getter, field_row_id_getter, FieldId, Record, RecordSet, RowId, RowIdGetter,
    RowUpdate, DEFAULT_ROW_ID_FIELD,
};
