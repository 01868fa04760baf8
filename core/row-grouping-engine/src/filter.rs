//! FILENAME: core/row-grouping-engine/src/filter.rs
//! Filter Propagator - Decides which tree nodes pass the filter model and
//! counts the passing rows beneath every group.
//!
//! Evaluation is depth-first and post-order:
//! - Data rows (leaves, record-backed groups) evaluate every filter item.
//! - Auto-generated groups evaluate only the items targeting their own
//!   grouping column. An item they pass counts as passed for every row below.
//! - A group passes when it matches on its own or when any descendant passes.
//! - Footers follow their group and never influence it.

use std::cmp::Ordering;
use std::sync::Arc;

use grid_model::{
    format_cell_value, CellParams, CellValue, ColumnDef, FilterApply, FilterItem, FilterModel,
    FilterOperator, LogicOperator, Record, RowId,
};
use rustc_hash::FxHashMap;

use crate::context::CellContext;
use crate::definition::{criterion_from_grouping_field, GROUPING_COLUMN_SINGLE_FIELD, TREE_DATA_GROUPING_FIELD};
use crate::tree::{root_id, GroupNode, NodeId, RowTree, TreeNode};

/// Extra host-supplied predicate, evaluated on data rows only.
pub type FilterPredicate = Arc<dyn Fn(&RowId, &Record) -> bool + Send + Sync>;

// ============================================================================
// BUILT-IN OPERATORS
// ============================================================================

fn lower_text(value: &CellValue) -> String {
    format_cell_value(value).to_lowercase()
}

fn text_equals(value: &CellValue, target: &CellValue) -> bool {
    match (value.as_ordinal(), target.as_ordinal()) {
        (Some(a), Some(b)) => a == b,
        _ => lower_text(value) == lower_text(target),
    }
}

fn compare_values(value: &CellValue, target: &CellValue) -> Option<Ordering> {
    match (value.as_ordinal(), target.as_ordinal()) {
        (Some(a), Some(b)) => a.partial_cmp(&b),
        _ => match (value, target) {
            (CellValue::Text(a), CellValue::Text(b)) => Some(a.cmp(b)),
            (CellValue::Boolean(a), CellValue::Boolean(b)) => Some(a.cmp(b)),
            _ => None,
        },
    }
}

fn is_blank(value: &CellValue) -> bool {
    value.is_nullish() || value.as_text().map_or(false, str::is_empty)
}

/// The operators every filterable column offers unless it brings its own.
pub fn builtin_filter_operators() -> Arc<[FilterOperator]> {
    vec![
        FilterOperator::new("contains", |value, item, _| {
            lower_text(value).contains(&lower_text(&item.value))
        }),
        FilterOperator::new("equals", |value, item, _| text_equals(value, &item.value)),
        FilterOperator::new("startsWith", |value, item, _| {
            lower_text(value).starts_with(&lower_text(&item.value))
        }),
        FilterOperator::new("endsWith", |value, item, _| {
            lower_text(value).ends_with(&lower_text(&item.value))
        }),
        FilterOperator::new("isEmpty", |value, _, _| is_blank(value)),
        FilterOperator::new("isNotEmpty", |value, _, _| !is_blank(value)),
        FilterOperator::new("isAnyOf", |value, item, _| {
            item.values.iter().any(|target| text_equals(value, target))
        }),
        FilterOperator::new("=", |value, item, _| {
            compare_values(value, &item.value) == Some(Ordering::Equal)
        }),
        FilterOperator::new("!=", |value, item, _| {
            compare_values(value, &item.value) != Some(Ordering::Equal)
        }),
        FilterOperator::new(">", |value, item, _| {
            compare_values(value, &item.value) == Some(Ordering::Greater)
        }),
        FilterOperator::new(">=", |value, item, _| {
            matches!(compare_values(value, &item.value), Some(Ordering::Greater | Ordering::Equal))
        }),
        FilterOperator::new("<", |value, item, _| {
            compare_values(value, &item.value) == Some(Ordering::Less)
        }),
        FilterOperator::new("<=", |value, item, _| {
            matches!(compare_values(value, &item.value), Some(Ordering::Less | Ordering::Equal))
        }),
    ]
    .into()
}

/// Whether an item carries what its operator needs to be applied.
fn has_operand(item: &FilterItem) -> bool {
    match item.operator.as_str() {
        "isEmpty" | "isNotEmpty" => true,
        "isAnyOf" => !item.values.is_empty(),
        _ => !item.value.is_undefined(),
    }
}

// ============================================================================
// RESULTS
// ============================================================================

/// Filter outcome of one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterResult {
    pub passes: bool,
    /// Immediate non-footer children that pass.
    pub filtered_children_count: usize,
    /// Passing data rows beneath the node, transitively.
    pub filtered_descendant_count: usize,
}

impl FilterResult {
    fn passing() -> Self {
        FilterResult {
            passes: true,
            filtered_children_count: 0,
            filtered_descendant_count: 0,
        }
    }
}

/// Per-node filter results of one pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterAnnotations {
    results: FxHashMap<NodeId, FilterResult>,
}

impl FilterAnnotations {
    pub fn get(&self, id: &NodeId) -> Option<&FilterResult> {
        self.results.get(id)
    }

    /// Whether a row is kept. Footers follow their group; nodes the pass has
    /// not seen (before the first pass) are kept.
    pub fn passes(&self, tree: &RowTree, id: &NodeId) -> bool {
        match tree.get(id) {
            Some(TreeNode::Footer(footer)) => self.passes(tree, &footer.parent),
            _ => self.results.get(id).map_or(true, |result| result.passes),
        }
    }

    /// Passing data rows in the whole tree.
    pub fn passing_rows(&self) -> usize {
        self.results
            .get(&root_id())
            .map_or(0, |root| root.filtered_descendant_count)
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

// ============================================================================
// PASS
// ============================================================================

/// A filter item resolved against its column and operator.
struct ActiveItem<'a> {
    item: &'a FilterItem,
    column: &'a ColumnDef,
    apply: FilterApply,
}

impl<'a> ActiveItem<'a> {
    fn applies_to_group(&self, group: &GroupNode) -> bool {
        let field = self.item.field.as_str();
        if field == GROUPING_COLUMN_SINGLE_FIELD || field == TREE_DATA_GROUPING_FIELD {
            return true;
        }
        match (criterion_from_grouping_field(field), group.grouping_field.as_deref()) {
            (Some(criterion), Some(grouping_field)) => criterion == grouping_field,
            _ => false,
        }
    }
}

/// Inputs of one filter pass.
pub struct FilterPass<'a> {
    pub ctx: CellContext<'a>,
    /// Hydrated columns, grouping columns included.
    pub columns: &'a [ColumnDef],
    pub model: &'a FilterModel,
    pub predicate: Option<&'a FilterPredicate>,
}

impl<'a> FilterPass<'a> {
    fn active_items(&self) -> Vec<ActiveItem<'a>> {
        let builtins = builtin_filter_operators();
        let mut active = Vec::new();

        for item in &self.model.items {
            let Some(column) = self.columns.iter().find(|c| c.field == item.field) else {
                log::warn!(target: "FILTER", "ignoring filter item {} on unknown column '{}'", item.id, item.field);
                continue;
            };
            if !column.filterable || !has_operand(item) {
                continue;
            }
            let apply = column
                .filter_operator(&item.operator)
                .or_else(|| builtins.iter().find(|op| op.value == item.operator))
                .map(|op| op.apply.clone());
            match apply {
                Some(apply) => active.push(ActiveItem { item, column, apply }),
                None => {
                    log::warn!(target: "FILTER", "ignoring filter item {} with unknown operator '{}'", item.id, item.operator);
                }
            }
        }
        active
    }

    pub fn run(&self) -> FilterAnnotations {
        let items = self.active_items();
        let mut annotations = FilterAnnotations::default();
        let inherited = vec![false; items.len()];
        let root = root_id();
        self.visit(&root, &items, &inherited, &mut annotations);

        for pinned in self.ctx.tree.pinned_top.iter().chain(&self.ctx.tree.pinned_bottom) {
            if matches!(self.ctx.tree.get(pinned), Some(TreeNode::PinnedRow(_))) {
                annotations.results.insert(pinned.clone(), FilterResult::passing());
            }
        }

        log::debug!(
            target: "FILTER",
            "filter pass: {} active items, {} passing rows",
            items.len(),
            annotations.passing_rows()
        );
        annotations
    }

    fn evaluate(&self, item: &ActiveItem<'a>, node: &'a TreeNode) -> bool {
        let params: CellParams<'_> = self.ctx.params(node, &item.item.field);
        let value = item.column.value_of(&params);
        (item.apply)(&value, item.item, &params)
    }

    fn combine(&self, results: impl Iterator<Item = bool>) -> bool {
        match self.model.logic_operator {
            LogicOperator::And => results.fold(true, |acc, r| acc && r),
            LogicOperator::Or => results.fold(false, |acc, r| acc || r),
        }
    }

    fn visit(
        &self,
        id: &NodeId,
        items: &[ActiveItem<'a>],
        inherited: &[bool],
        out: &mut FilterAnnotations,
    ) -> FilterResult {
        let tree = self.ctx.tree;
        let Some(node) = tree.get(id) else {
            return FilterResult::passing();
        };

        let (own_match, child_inherited) = match node {
            TreeNode::Footer(_) | TreeNode::PinnedRow(_) => {
                let result = FilterResult::passing();
                out.results.insert(id.clone(), result);
                return result;
            }
            TreeNode::Group(group) if group.is_root() => (true, inherited.to_vec()),
            TreeNode::Group(group) if group.is_auto_generated => {
                let mut child_inherited = inherited.to_vec();
                let mut own = Vec::new();
                for (index, item) in items.iter().enumerate() {
                    if item.applies_to_group(group) {
                        let passed = self.evaluate(item, node);
                        child_inherited[index] |= passed;
                        own.push(passed || inherited[index]);
                    }
                }
                let own_match = !own.is_empty() && self.combine(own.into_iter());
                (own_match, child_inherited)
            }
            _ => {
                let items_match = items.is_empty()
                    || self.combine(
                        items
                            .iter()
                            .enumerate()
                            .map(|(index, item)| inherited[index] || self.evaluate(item, node)),
                    );
                let predicate_match = match (self.predicate, self.ctx.records.get(id)) {
                    (Some(predicate), Some(record)) => predicate(id, record),
                    _ => true,
                };
                (items_match && predicate_match, inherited.to_vec())
            }
        };

        let mut result = FilterResult {
            passes: own_match,
            filtered_children_count: 0,
            filtered_descendant_count: 0,
        };

        if let TreeNode::Group(group) = node {
            for child_id in &group.children {
                let Some(child) = tree.get(child_id) else {
                    continue;
                };
                if matches!(child, TreeNode::Footer(_)) {
                    continue;
                }
                let child_result = self.visit(child_id, items, &child_inherited, out);
                if child_result.passes {
                    result.filtered_children_count += 1;
                    result.filtered_descendant_count += child_result.filtered_descendant_count;
                    if child.is_data_row() {
                        result.filtered_descendant_count += 1;
                    }
                }
            }
            result.passes = group.is_root() || own_match || result.filtered_descendant_count > 0;

            if let Some(footer_id) = &group.footer_id {
                out.results.insert(
                    footer_id.clone(),
                    FilterResult {
                        passes: result.passes,
                        filtered_children_count: 0,
                        filtered_descendant_count: 0,
                    },
                );
            }
        }

        out.results.insert(id.clone(), result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::AggregationLookup;
    use crate::builder::RowTreeBuilder;
    use crate::definition::{GroupingCriterion, RowGroupingOptions, TreeDataPathGetter};
    use grid_model::RecordSet;

    fn run(tree: &RowTree, records: &RecordSet, columns: &[ColumnDef], model: &FilterModel) -> FilterAnnotations {
        let lookup = AggregationLookup::default();
        FilterPass {
            ctx: CellContext::new(tree, records, &lookup),
            columns,
            model,
            predicate: None,
        }
        .run()
    }

    #[test]
    fn test_builtin_operators() {
        let ops = builtin_filter_operators();
        let id = RowId::Number(1);
        let record = Record::new();
        let params = CellParams::for_record(&id, "f", &record);
        let check = |name: &str, value: CellValue, target: CellValue| {
            let op = ops.iter().find(|op| op.value == name).unwrap();
            let item = FilterItem::new(1, "f", name, target);
            (op.apply)(&value, &item, &params)
        };

        assert!(check("contains", CellValue::text("Hello"), CellValue::text("ELL")));
        assert!(check("startsWith", CellValue::text("Hello"), CellValue::text("he")));
        assert!(check("endsWith", CellValue::text("B.A"), CellValue::text("A")));
        assert!(!check("endsWith", CellValue::text("B.B"), CellValue::text("A")));
        assert!(check("isEmpty", CellValue::text(""), CellValue::Empty));
        assert!(check("isNotEmpty", CellValue::Number(0.0), CellValue::Empty));
        assert!(check(">", CellValue::Number(5.0), CellValue::Number(3.0)));
        assert!(!check(">", CellValue::text("x"), CellValue::Number(3.0)));
        assert!(check("<=", CellValue::Date(3), CellValue::Date(3)));
        assert!(check("!=", CellValue::Null, CellValue::Number(3.0)));
        assert!(check("equals", CellValue::text("abc"), CellValue::text("ABC")));
    }

    #[test]
    fn test_group_kept_for_matching_descendant() {
        let records = RecordSet::from_records(vec![
            Record::new().with("id", 1).with("name", "B").with("path", "B"),
            Record::new().with("id", 2).with("name", "B.A").with("path", "B.A"),
            Record::new().with("id", 3).with("name", "B.B").with("path", "B.B"),
        ]);
        let get_path: TreeDataPathGetter = Arc::new(|record: &Record| {
            record
                .get("path")
                .as_text()
                .map(|p| p.split('.').map(str::to_string).collect())
                .unwrap_or_default()
        });
        let options = RowGroupingOptions::default();
        let tree = RowTreeBuilder::new(&options).build_tree_data(&records, &get_path);
        let model = FilterModel::new(vec![FilterItem::new(1, "name", "endsWith", "A")], LogicOperator::And);

        let annotations = run(&tree, &records, &[ColumnDef::string("name")], &model);

        assert!(annotations.passes(&tree, &RowId::Number(1)));
        assert!(annotations.passes(&tree, &RowId::Number(2)));
        assert!(!annotations.passes(&tree, &RowId::Number(3)));
        let b = annotations.get(&RowId::Number(1)).unwrap();
        assert_eq!(b.filtered_children_count, 1);
        assert_eq!(b.filtered_descendant_count, 1);
        assert_eq!(annotations.passing_rows(), 2);
    }

    #[test]
    fn test_auto_generated_group_evaluates_grouping_column_only() {
        let records = RecordSet::from_records(vec![
            Record::new().with("id", 1).with("g", "EU").with("v", 10.0),
            Record::new().with("id", 2).with("g", "EU").with("v", 1.0),
            Record::new().with("id", 3).with("g", "US").with("v", 50.0),
        ]);
        let columns = vec![ColumnDef::string("g"), ColumnDef::number("v")];
        let options = RowGroupingOptions::default();
        let tree = RowTreeBuilder::new(&options).build(&records, &[GroupingCriterion::new("g")], &columns);
        let mut hydrated = vec![crate::grouping_columns::single_grouping_column(&["g".to_string()], &columns)];
        hydrated.extend(columns);

        let model = FilterModel::new(
            vec![FilterItem::new(1, GROUPING_COLUMN_SINGLE_FIELD, "equals", "EU")],
            LogicOperator::And,
        );
        let annotations = run(&tree, &records, &hydrated, &model);

        assert!(annotations.passes(&tree, &RowId::text("auto-generated-row-g/EU")));
        assert!(!annotations.passes(&tree, &RowId::text("auto-generated-row-g/US")));
        // leaves inherit the pass of their group on the grouping column item
        assert!(annotations.passes(&tree, &RowId::Number(1)));
        assert!(!annotations.passes(&tree, &RowId::Number(3)));
        assert_eq!(annotations.passing_rows(), 2);

        let model = FilterModel::new(
            vec![
                FilterItem::new(1, GROUPING_COLUMN_SINGLE_FIELD, "equals", "EU"),
                FilterItem::new(2, "v", ">", 5.0),
            ],
            LogicOperator::And,
        );
        let annotations = run(&tree, &records, &hydrated, &model);
        assert!(annotations.passes(&tree, &RowId::Number(1)));
        assert!(!annotations.passes(&tree, &RowId::Number(2)));
        assert_eq!(
            annotations.get(&RowId::text("auto-generated-row-g/EU")).map(|r| r.filtered_children_count),
            Some(1)
        );
    }

    #[test]
    fn test_unknown_fields_and_operators_are_ignored() {
        let records = RecordSet::from_records(vec![Record::new().with("id", 1).with("name", "x")]);
        let options = RowGroupingOptions::default();
        let tree = RowTreeBuilder::new(&options).build(&records, &[], &[]);
        let model = FilterModel::new(
            vec![
                FilterItem::new(1, "missing", "contains", "a"),
                FilterItem::new(2, "name", "soundsLike", "a"),
                FilterItem::new(3, "name", "contains", CellValue::Empty),
            ],
            LogicOperator::And,
        );
        let annotations = run(&tree, &records, &[ColumnDef::string("name")], &model);
        assert!(annotations.passes(&tree, &RowId::Number(1)));
    }

    #[test]
    fn test_custom_predicate_and_or_logic() {
        let records = RecordSet::from_records(vec![
            Record::new().with("id", 1).with("name", "apple"),
            Record::new().with("id", 2).with("name", "banana"),
            Record::new().with("id", 3).with("name", "cherry"),
        ]);
        let options = RowGroupingOptions::default();
        let tree = RowTreeBuilder::new(&options).build(&records, &[], &[]);
        let columns = vec![ColumnDef::string("name")];
        let model = FilterModel::new(
            vec![
                FilterItem::new(1, "name", "startsWith", "a"),
                FilterItem::new(2, "name", "startsWith", "b"),
            ],
            LogicOperator::Or,
        );
        let predicate: FilterPredicate = Arc::new(|id: &RowId, _: &Record| *id != RowId::Number(2));
        let lookup = AggregationLookup::default();
        let annotations = FilterPass {
            ctx: CellContext::new(&tree, &records, &lookup),
            columns: &columns,
            model: &model,
            predicate: Some(&predicate),
        }
        .run();

        assert!(annotations.passes(&tree, &RowId::Number(1)));
        assert!(!annotations.passes(&tree, &RowId::Number(2)));
        assert!(!annotations.passes(&tree, &RowId::Number(3)));
    }
}
