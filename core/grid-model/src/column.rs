//! FILENAME: core/grid-model/src/column.rs
//! PURPOSE: Column definitions and the callbacks a column may carry.
//! CONTEXT: Callbacks are reference-counted closures so that a column can be
//! wrapped (aggregation) and later unwrapped back to the very same closures;
//! identity is checked with `Arc::ptr_eq`, never by behaviour.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::cell::{CellValue, GroupKey};
use crate::format::format_cell_value;
use crate::model::FilterItem;
use crate::record::{FieldId, Record, RowId};

// ============================================================================
// COLUMN TYPES
// ============================================================================

/// Declared type of a column; drives aggregation-function compatibility and
/// the default filter operators.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnType {
    String,
    Number,
    Date,
    DateTime,
    Boolean,
    SingleSelect,
    Actions,
    Custom(String),
}

impl ColumnType {
    pub fn as_str(&self) -> &str {
        match self {
            ColumnType::String => "string",
            ColumnType::Number => "number",
            ColumnType::Date => "date",
            ColumnType::DateTime => "dateTime",
            ColumnType::Boolean => "boolean",
            ColumnType::SingleSelect => "singleSelect",
            ColumnType::Actions => "actions",
            ColumnType::Custom(name) => name.as_str(),
        }
    }
}

impl Default for ColumnType {
    fn default() -> Self {
        ColumnType::String
    }
}

/// Structural role of a column. Checkbox and detail-toggle columns never take
/// part in cell selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColumnKind {
    #[default]
    Data,
    CheckboxSelection,
    DetailPanelToggle,
    /// A column synthesized for the row grouping model.
    RowGrouping,
}

/// What kind of tree node a cell belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowKind {
    Leaf,
    Group,
    Footer,
    PinnedRow,
}

// ============================================================================
// CELL PARAMS
// ============================================================================

/// Everything a column callback may inspect about the cell being evaluated.
#[derive(Debug, Clone, Copy)]
pub struct CellParams<'a> {
    pub row_id: &'a RowId,
    pub field: &'a str,
    pub row_kind: RowKind,
    /// Depth of the node in the tree (-1 for the root).
    pub depth: i32,
    /// The backing record, when the node has one.
    pub record: Option<&'a Record>,
    /// Grouping field of a group node.
    pub grouping_field: Option<&'a str>,
    /// Grouping key of a group node.
    pub group_key: Option<&'a GroupKey>,
    /// Aggregated value computed for this (node, field), if any.
    pub aggregate: Option<&'a CellValue>,
}

impl<'a> CellParams<'a> {
    /// Params for a plain data row, outside of any tree.
    pub fn for_record(row_id: &'a RowId, field: &'a str, record: &'a Record) -> Self {
        CellParams {
            row_id,
            field,
            row_kind: RowKind::Leaf,
            depth: 0,
            record: Some(record),
            grouping_field: None,
            group_key: None,
            aggregate: None,
        }
    }

    /// The record's own value for the cell's field.
    pub fn raw_value(&self) -> CellValue {
        self.record
            .map(|record| record.get(self.field).clone())
            .unwrap_or(CellValue::Empty)
    }
}

// ============================================================================
// CALLBACKS
// ============================================================================

pub type ValueGetter = Arc<dyn Fn(&CellParams<'_>) -> CellValue + Send + Sync>;
pub type ValueFormatter = Arc<dyn Fn(&CellValue, &CellParams<'_>) -> String + Send + Sync>;
/// Renders a cell given its formatted text.
pub type CellRenderer = Arc<dyn Fn(&CellParams<'_>, &str) -> String + Send + Sync>;
pub type HeaderRenderer = Arc<dyn Fn(&ColumnDef) -> String + Send + Sync>;
pub type SortComparator =
    Arc<dyn Fn(&CellValue, &CellValue, &CellParams<'_>, &CellParams<'_>) -> Ordering + Send + Sync>;
/// Derives the grouping key from (raw field value, record, column).
pub type GroupingValueGetter = Arc<dyn Fn(&CellValue, &Record, &ColumnDef) -> GroupKey + Send + Sync>;
pub type FilterApply = Arc<dyn Fn(&CellValue, &FilterItem, &CellParams<'_>) -> bool + Send + Sync>;

/// A named filter operator a column offers.
#[derive(Clone)]
pub struct FilterOperator {
    pub value: String,
    pub apply: FilterApply,
}

impl FilterOperator {
    pub fn new(
        value: impl Into<String>,
        apply: impl Fn(&CellValue, &FilterItem, &CellParams<'_>) -> bool + Send + Sync + 'static,
    ) -> Self {
        FilterOperator {
            value: value.into(),
            apply: Arc::new(apply),
        }
    }
}

impl fmt::Debug for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterOperator").field("value", &self.value).finish()
    }
}

/// Identity comparison of two optional callbacks.
pub fn same_callback<T: ?Sized>(a: &Option<Arc<T>>, b: &Option<Arc<T>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

/// Identity comparison of two optional filter operator lists.
pub fn same_filter_operators(a: &Option<Arc<[FilterOperator]>>, b: &Option<Arc<[FilterOperator]>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

// ============================================================================
// COLUMN DEFINITION
// ============================================================================

/// Definition of one column.
#[derive(Clone)]
pub struct ColumnDef {
    pub field: FieldId,
    pub header_name: Option<String>,
    pub column_type: ColumnType,
    pub kind: ColumnKind,

    /// Whether the column may appear in the row grouping model.
    pub groupable: bool,

    /// Whether the column may appear in the aggregation model.
    pub aggregable: bool,

    pub sortable: bool,
    pub filterable: bool,

    /// Explicit whitelist of aggregation function names. Overrides type compatibility.
    pub available_aggregation_functions: Option<Vec<String>>,

    pub grouping_value_getter: Option<GroupingValueGetter>,
    pub value_getter: Option<ValueGetter>,
    pub value_formatter: Option<ValueFormatter>,
    pub render_cell: Option<CellRenderer>,
    pub render_header: Option<HeaderRenderer>,
    pub sort_comparator: Option<SortComparator>,
    pub filter_operators: Option<Arc<[FilterOperator]>>,
}

impl fmt::Debug for ColumnDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnDef")
            .field("field", &self.field)
            .field("column_type", &self.column_type)
            .field("kind", &self.kind)
            .field("groupable", &self.groupable)
            .field("aggregable", &self.aggregable)
            .field("available_aggregation_functions", &self.available_aggregation_functions)
            .finish_non_exhaustive()
    }
}

impl ColumnDef {
    pub fn new(field: impl Into<FieldId>, column_type: ColumnType) -> Self {
        ColumnDef {
            field: field.into(),
            header_name: None,
            column_type,
            kind: ColumnKind::Data,
            groupable: true,
            aggregable: true,
            sortable: true,
            filterable: true,
            available_aggregation_functions: None,
            grouping_value_getter: None,
            value_getter: None,
            value_formatter: None,
            render_cell: None,
            render_header: None,
            sort_comparator: None,
            filter_operators: None,
        }
    }

    pub fn string(field: impl Into<FieldId>) -> Self {
        ColumnDef::new(field, ColumnType::String)
    }

    pub fn number(field: impl Into<FieldId>) -> Self {
        ColumnDef::new(field, ColumnType::Number)
    }

    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header_name = Some(header.into());
        self
    }

    pub fn with_kind(mut self, kind: ColumnKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_groupable(mut self, groupable: bool) -> Self {
        self.groupable = groupable;
        self
    }

    pub fn with_aggregable(mut self, aggregable: bool) -> Self {
        self.aggregable = aggregable;
        self
    }

    pub fn with_aggregation_functions(mut self, names: &[&str]) -> Self {
        self.available_aggregation_functions = Some(names.iter().map(|n| n.to_string()).collect());
        self
    }

    pub fn with_value_getter(
        mut self,
        getter: impl Fn(&CellParams<'_>) -> CellValue + Send + Sync + 'static,
    ) -> Self {
        self.value_getter = Some(Arc::new(getter));
        self
    }

    pub fn with_value_formatter(
        mut self,
        formatter: impl Fn(&CellValue, &CellParams<'_>) -> String + Send + Sync + 'static,
    ) -> Self {
        self.value_formatter = Some(Arc::new(formatter));
        self
    }

    pub fn with_grouping_value_getter(
        mut self,
        getter: impl Fn(&CellValue, &Record, &ColumnDef) -> GroupKey + Send + Sync + 'static,
    ) -> Self {
        self.grouping_value_getter = Some(Arc::new(getter));
        self
    }

    pub fn with_sort_comparator(
        mut self,
        comparator: impl Fn(&CellValue, &CellValue, &CellParams<'_>, &CellParams<'_>) -> Ordering
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.sort_comparator = Some(Arc::new(comparator));
        self
    }

    pub fn with_filter_operators(mut self, operators: Vec<FilterOperator>) -> Self {
        self.filter_operators = Some(operators.into());
        self
    }

    /// The cell's value: the value getter if present, else the record field.
    pub fn value_of(&self, params: &CellParams<'_>) -> CellValue {
        match &self.value_getter {
            Some(getter) => getter(params),
            None => params.raw_value(),
        }
    }

    /// The cell's display text.
    pub fn format_value(&self, value: &CellValue, params: &CellParams<'_>) -> String {
        match &self.value_formatter {
            Some(formatter) => formatter(value, params),
            None => format_cell_value(value),
        }
    }

    /// The cell's rendered output: value, then formatter, then renderer.
    pub fn render(&self, params: &CellParams<'_>) -> String {
        let value = self.value_of(params);
        let formatted = self.format_value(&value, params);
        match &self.render_cell {
            Some(renderer) => renderer(params, &formatted),
            None => formatted,
        }
    }

    /// Text shown in the column header.
    pub fn header(&self) -> String {
        match &self.render_header {
            Some(renderer) => renderer(self),
            None => self.header_name.clone().unwrap_or_else(|| self.field.clone()),
        }
    }

    /// Compares two cell values with the column's comparator, or the default order.
    pub fn compare(
        &self,
        a: &CellValue,
        b: &CellValue,
        params_a: &CellParams<'_>,
        params_b: &CellParams<'_>,
    ) -> Ordering {
        match &self.sort_comparator {
            Some(comparator) => comparator(a, b, params_a, params_b),
            None => a.compare(b),
        }
    }

    /// Looks up a column-provided filter operator.
    pub fn filter_operator(&self, name: &str) -> Option<&FilterOperator> {
        self.filter_operators
            .as_ref()
            .and_then(|ops| ops.iter().find(|op| op.value == name))
    }
}
