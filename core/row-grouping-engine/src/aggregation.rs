//! FILENAME: core/row-grouping-engine/src/aggregation.rs
//! Aggregation Engine - Validates aggregation rules, hydrates footer rows,
//! wraps aggregated columns and computes the aggregated values.
//!
//! The work is split the same way the refresh scheduler invalidates it:
//! - Row hydration: which groups carry a footer row (shape only).
//! - Column hydration: which columns are wrapped to show aggregates.
//! - Value pass: the aggregated value of every (group, rule) pair.

use std::sync::Arc;

use grid_model::{
    format_cell_value, AggregationModel, CellParams, CellRenderer, CellValue, ColumnDef, ColumnKind,
    FilterOperator, HeaderRenderer, RecordSet, RowKind, ValueFormatter, ValueGetter,
};
use rustc_hash::FxHashMap;

use crate::builder::footer_node_id;
use crate::context::CellContext;
use crate::definition::{
    AggregationPosition, AggregationPositionPolicy, AggregationRowsScope, AggregationRule,
};
use crate::filter::{builtin_filter_operators, FilterAnnotations};
use crate::functions::{AggregationFunction, AggregationFunctions};
use crate::tree::{FooterNode, NodeId, RowTree, TreeNode};

// ============================================================================
// RULES
// ============================================================================

/// Whether `name` may aggregate `column`.
///
/// An explicit whitelist on the column decides on its own; otherwise the
/// function's applicable types do, where no types means every type.
pub fn can_column_have_aggregation_function(
    column: &ColumnDef,
    name: &str,
    function: Option<&AggregationFunction>,
) -> bool {
    if !column.aggregable || column.kind != ColumnKind::Data {
        return false;
    }
    let Some(function) = function else {
        return false;
    };
    match &column.available_aggregation_functions {
        Some(whitelist) => whitelist.iter().any(|allowed| allowed == name),
        None => function.accepts(&column.column_type),
    }
}

/// Names of the functions a column accepts, in registration order.
pub fn available_aggregation_functions(column: &ColumnDef, functions: &AggregationFunctions) -> Vec<String> {
    functions
        .iter()
        .filter(|(name, function)| can_column_have_aggregation_function(column, name, Some(function)))
        .map(|(name, _)| name.to_string())
        .collect()
}

/// The effective rules of a model: entries naming an unknown column, an
/// unknown function or an incompatible function are dropped. Ordered by field.
pub fn get_aggregation_rules(
    model: &AggregationModel,
    columns: &[ColumnDef],
    functions: &AggregationFunctions,
) -> Vec<AggregationRule> {
    let mut rules = Vec::new();
    for (field, function_name) in model.iter() {
        let Some(column) = columns.iter().find(|c| &c.field == field) else {
            log::warn!(target: "AGGREGATION", "dropping rule on unknown column '{}'", field);
            continue;
        };
        if !can_column_have_aggregation_function(column, function_name, functions.get(function_name)) {
            log::warn!(
                target: "AGGREGATION",
                "dropping rule '{}' on column '{}': function unknown or not applicable",
                function_name,
                field
            );
            continue;
        }
        rules.push(AggregationRule {
            field: field.clone(),
            function_name: function_name.clone(),
        });
    }
    rules
}

/// The model made of the effective rules only.
pub fn rules_to_model(rules: &[AggregationRule]) -> AggregationModel {
    AggregationModel(
        rules
            .iter()
            .map(|rule| (rule.field.clone(), rule.function_name.clone()))
            .collect(),
    )
}

// ============================================================================
// ROW HYDRATION
// ============================================================================

/// Footer rows added and removed by one hydration pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FooterChanges {
    pub added: usize,
    pub removed: usize,
}

/// Gives every group whose aggregates go to a footer exactly one footer row
/// and removes footers that are no longer needed or carry a stale id.
///
/// A group's footer is its last child; the root footer is pinned at the bottom.
pub fn hydrate_footers(
    tree: &mut RowTree,
    rules: &[AggregationRule],
    policy: &AggregationPositionPolicy,
) -> FooterChanges {
    let mut changes = FooterChanges::default();

    for group_id in tree.group_ids_top_down() {
        let Some(group) = tree.group(&group_id) else {
            continue;
        };
        let needs_footer = !rules.is_empty() && policy(group) == Some(AggregationPosition::Footer);
        let expected = footer_node_id(&group_id);
        let current = group.footer_id.clone();
        let is_root = group.is_root();
        let depth = group.depth + 1;

        if needs_footer && current.as_ref() == Some(&expected) {
            continue;
        }

        if let Some(stale) = current {
            tree.remove_node(&stale);
            if let Some(group) = tree.group_mut(&group_id) {
                group.footer_id = None;
            }
            changes.removed += 1;
        }

        if needs_footer {
            let footer = TreeNode::Footer(FooterNode {
                id: expected.clone(),
                parent: group_id.clone(),
                depth,
            });
            let inserted = if is_root {
                let inserted = tree.insert_detached(footer);
                if inserted {
                    tree.pinned_bottom.push(expected.clone());
                }
                inserted
            } else {
                tree.insert_child(footer)
            };
            if !inserted {
                continue;
            }
            if let Some(group) = tree.group_mut(&group_id) {
                group.footer_id = Some(expected);
            }
            changes.added += 1;
        }
    }

    log::debug!(
        target: "AGGREGATION",
        "row hydration: {} footers added, {} removed",
        changes.added,
        changes.removed
    );
    changes
}

// ============================================================================
// COLUMN HYDRATION
// ============================================================================

/// Shared callbacks compared by identity.
pub trait SharedCallback: Clone {
    fn same(&self, other: &Self) -> bool;
}

impl<T: ?Sized> SharedCallback for Arc<T> {
    fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

/// One wrapped column property: its name, the value it replaced and the wrapper.
#[derive(Clone)]
pub struct Wrapped<A: SharedCallback> {
    pub name: &'static str,
    pub original: Option<A>,
    pub wrapped: A,
}

impl<A: SharedCallback> Wrapped<A> {
    /// The value the property should hold after unwrapping. A property that
    /// was replaced since wrapping is left as it is.
    pub fn restore(&self, current: &Option<A>) -> Option<A> {
        match current {
            Some(value) if value.same(&self.wrapped) => self.original.clone(),
            other => other.clone(),
        }
    }
}

/// Everything needed to undo the wrapping of one column.
#[derive(Clone)]
pub struct ColumnWrap {
    pub rule: AggregationRule,
    pub value_getter: Wrapped<ValueGetter>,
    pub value_formatter: Wrapped<ValueFormatter>,
    pub render_cell: Wrapped<CellRenderer>,
    pub render_header: Wrapped<HeaderRenderer>,
    pub filter_operators: Wrapped<Arc<[FilterOperator]>>,
}

impl std::fmt::Debug for ColumnWrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnWrap").field("rule", &self.rule).finish_non_exhaustive()
    }
}

fn wrap_value_getter(original: Option<ValueGetter>) -> ValueGetter {
    Arc::new(move |params: &CellParams<'_>| match params.aggregate {
        Some(aggregate) => aggregate.clone(),
        None => match &original {
            Some(getter) => getter(params),
            None => params.raw_value(),
        },
    })
}

fn wrap_value_formatter(original: Option<ValueFormatter>, function: &AggregationFunction) -> ValueFormatter {
    let aggregate_formatter = function.value_formatter.clone();
    Arc::new(move |value: &CellValue, params: &CellParams<'_>| {
        if params.aggregate.is_some() {
            if let Some(formatter) = &aggregate_formatter {
                return formatter(value, params);
            }
        }
        match &original {
            Some(formatter) => formatter(value, params),
            None => format_cell_value(value),
        }
    })
}

fn wrap_render_cell(original: Option<CellRenderer>) -> CellRenderer {
    Arc::new(move |params: &CellParams<'_>, formatted: &str| {
        // footer cells only ever show the aggregate text
        if params.aggregate.is_some() && params.row_kind == RowKind::Footer {
            return formatted.to_string();
        }
        match &original {
            Some(renderer) => renderer(params, formatted),
            None => formatted.to_string(),
        }
    })
}

fn wrap_render_header(original: Option<HeaderRenderer>, label: String) -> HeaderRenderer {
    Arc::new(move |column: &ColumnDef| {
        let base = match &original {
            Some(renderer) => renderer(column),
            None => column.header_name.clone().unwrap_or_else(|| column.field.clone()),
        };
        format!("{} ({})", base, label)
    })
}

fn wrap_filter_operators(original: &Arc<[FilterOperator]>) -> Arc<[FilterOperator]> {
    original
        .iter()
        .map(|operator| {
            let apply = operator.apply.clone();
            FilterOperator::new(operator.value.clone(), move |value, item, params| {
                params.aggregate.is_some() || apply(value, item, params)
            })
        })
        .collect()
}

/// Wraps a column so that aggregated cells show, format, render and filter
/// their aggregate. Leaf cells go through the original callbacks.
pub fn wrap_column(
    column: &ColumnDef,
    rule: &AggregationRule,
    function: &AggregationFunction,
    label: &str,
) -> (ColumnDef, ColumnWrap) {
    let operators_source = column
        .filter_operators
        .clone()
        .unwrap_or_else(builtin_filter_operators);

    let wrap = ColumnWrap {
        rule: rule.clone(),
        value_getter: Wrapped {
            name: "valueGetter",
            original: column.value_getter.clone(),
            wrapped: wrap_value_getter(column.value_getter.clone()),
        },
        value_formatter: Wrapped {
            name: "valueFormatter",
            original: column.value_formatter.clone(),
            wrapped: wrap_value_formatter(column.value_formatter.clone(), function),
        },
        render_cell: Wrapped {
            name: "renderCell",
            original: column.render_cell.clone(),
            wrapped: wrap_render_cell(column.render_cell.clone()),
        },
        render_header: Wrapped {
            name: "renderHeader",
            original: column.render_header.clone(),
            wrapped: wrap_render_header(column.render_header.clone(), label.to_string()),
        },
        filter_operators: Wrapped {
            name: "filterOperators",
            original: column.filter_operators.clone(),
            wrapped: wrap_filter_operators(&operators_source),
        },
    };

    let mut wrapped = column.clone();
    wrapped.value_getter = Some(wrap.value_getter.wrapped.clone());
    wrapped.value_formatter = Some(wrap.value_formatter.wrapped.clone());
    wrapped.render_cell = Some(wrap.render_cell.wrapped.clone());
    wrapped.render_header = Some(wrap.render_header.wrapped.clone());
    wrapped.filter_operators = Some(wrap.filter_operators.wrapped.clone());
    (wrapped, wrap)
}

/// Inverse of `wrap_column`.
pub fn unwrap_column(column: &ColumnDef, wrap: &ColumnWrap) -> ColumnDef {
    let mut unwrapped = column.clone();
    unwrapped.value_getter = wrap.value_getter.restore(&column.value_getter);
    unwrapped.value_formatter = wrap.value_formatter.restore(&column.value_formatter);
    unwrapped.render_cell = wrap.render_cell.restore(&column.render_cell);
    unwrapped.render_header = wrap.render_header.restore(&column.render_header);
    unwrapped.filter_operators = wrap.filter_operators.restore(&column.filter_operators);
    unwrapped
}

// ============================================================================
// VALUES
// ============================================================================

/// One aggregated value and where it is displayed.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationCell {
    pub value: CellValue,
    pub position: AggregationPosition,
}

/// group id -> field -> aggregated value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregationLookup {
    cells: FxHashMap<NodeId, FxHashMap<String, AggregationCell>>,
}

impl AggregationLookup {
    pub fn get(&self, group_id: &NodeId, field: &str) -> Option<&AggregationCell> {
        self.cells.get(group_id).and_then(|fields| fields.get(field))
    }

    /// The aggregate shown in the cell (`id`, `field`): inline values on the
    /// group row itself, footer values on the group's footer row.
    pub fn cell_for(&self, tree: &RowTree, id: &NodeId, field: &str) -> Option<&AggregationCell> {
        let (group_id, position) = match tree.get(id)? {
            TreeNode::Footer(footer) => (&footer.parent, AggregationPosition::Footer),
            _ => (id, AggregationPosition::Inline),
        };
        self.get(group_id, field).filter(|cell| cell.position == position)
    }

    pub fn len(&self) -> usize {
        self.cells.values().map(|fields| fields.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }
}

/// Inputs of one aggregated-values pass.
pub struct AggregationPass<'a> {
    pub tree: &'a RowTree,
    pub records: &'a RecordSet,
    pub columns: &'a [ColumnDef],
    pub rules: &'a [AggregationRule],
    pub functions: &'a AggregationFunctions,
    pub policy: &'a AggregationPositionPolicy,
    pub scope: AggregationRowsScope,
    pub filter: &'a FilterAnnotations,
}

impl<'a> AggregationPass<'a> {
    pub fn run(&self) -> AggregationLookup {
        let mut lookup = AggregationLookup::default();
        if self.rules.is_empty() {
            return lookup;
        }

        let resolved: Vec<(&AggregationRule, &ColumnDef, &AggregationFunction)> = self
            .rules
            .iter()
            .filter_map(|rule| {
                let column = self.columns.iter().find(|c| c.field == rule.field)?;
                let function = self.functions.get(&rule.function_name)?;
                Some((rule, column, function))
            })
            .collect();

        // leaves never carry aggregates, so their params need no lookup
        let no_aggregates = AggregationLookup::default();
        let ctx = CellContext::new(self.tree, self.records, &no_aggregates);

        for group_id in self.tree.group_ids_top_down() {
            let Some(group) = self.tree.group(&group_id) else {
                continue;
            };
            let Some(position) = (self.policy)(group) else {
                continue;
            };

            let leaves: Vec<&TreeNode> = self
                .tree
                .data_descendants(&group_id)
                .iter()
                .filter_map(|id| self.tree.get(id))
                .filter(|node| matches!(node, TreeNode::Leaf(_)))
                .filter(|node| match self.scope {
                    AggregationRowsScope::All => true,
                    AggregationRowsScope::Filtered => self.filter.passes(self.tree, node.id()),
                })
                .collect();

            let fields = lookup.cells.entry(group_id.clone()).or_default();
            for (rule, column, function) in &resolved {
                let values: Vec<CellValue> = leaves
                    .iter()
                    .map(|leaf| column.value_of(&ctx.params(leaf, &rule.field)))
                    .collect();
                fields.insert(
                    rule.field.clone(),
                    AggregationCell {
                        value: (function.apply)(&values),
                        position,
                    },
                );
            }
        }

        log::debug!(
            target: "AGGREGATION",
            "computed {} aggregated cells for {} rules",
            lookup.len(),
            self.rules.len()
        );
        lookup
    }
}
