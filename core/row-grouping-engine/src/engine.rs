//! FILENAME: core/row-grouping-engine/src/engine.rs
//! Row Grouping Engine - Owns the record set, the models and the derived tree.
//!
//! Every public mutation is turned into a `ModelChange`; the `DiffScheduler`
//! decides which phases to re-run and they always run in this order:
//! 1. Rebuild the tree from records and the sanitized grouping model
//! 2. Row hydration: footer rows for groups that aggregate in a footer
//! 3. Column hydration: grouping columns and wrapped aggregated columns
//! 4. Filter propagation (publishes `FilteredRowsSet`)
//! 5. Aggregated values (depend on the filter in the `filtered` scope)
//! 6. Sorting of every sibling list

use std::fmt;

use grid_model::{
    field_row_id_getter, AggregationModel, CellParams, CellValue, ColumnDef, EventBus, FieldId,
    FilterModel, GridEvent, GridEventKind, Record, RecordSet, RowGroupingModel, RowIdGetter,
    RowUpdate, SortModel, SubscriptionId,
};
use rustc_hash::FxHashMap;

use crate::aggregation::{
    available_aggregation_functions, get_aggregation_rules, hydrate_footers, rules_to_model,
    unwrap_column, wrap_column, AggregationCell, AggregationLookup, AggregationPass, ColumnWrap,
};
use crate::builder::{sanitize_grouping_model, RowTreeBuilder};
use crate::context::CellContext;
use crate::definition::{
    default_aggregation_position_policy, AggregationPositionPolicy, AggregationRule,
    GroupingCriterion, RowGroupingOptions, TreeDataPathGetter,
};
use crate::filter::{FilterAnnotations, FilterPass, FilterPredicate, FilterResult};
use crate::functions::{AggregationFunction, AggregationFunctions};
use crate::grouping_columns::create_grouping_columns;
use crate::scheduler::{DiffScheduler, ModelChange, RefreshPlan, RefreshStats};
use crate::sort::{apply_child_order, capture_natural_order, visible_rows, NaturalOrder, SortPass};
use crate::tree::{NodeId, RowTree, TreeNode};

/// One grid session's grouping, aggregation, filtering and sorting state.
pub struct RowGroupingEngine {
    options: RowGroupingOptions,
    records: RecordSet,

    /// Hydrated columns: grouping columns first, then the data columns
    /// (wrapped where an aggregation rule applies).
    columns: Vec<ColumnDef>,
    grouping_column_count: usize,
    column_wraps: FxHashMap<FieldId, ColumnWrap>,

    // Models as last set through the API; getters return them sanitized.
    row_grouping_model: RowGroupingModel,
    aggregation_model: AggregationModel,
    filter_model: FilterModel,
    sort_model: SortModel,

    filter_predicate: Option<FilterPredicate>,
    functions: AggregationFunctions,
    position_policy: AggregationPositionPolicy,
    tree_data_path: Option<TreeDataPathGetter>,
    expansion: FxHashMap<NodeId, bool>,

    // Derived state
    tree: RowTree,
    natural_order: NaturalOrder,
    filter: FilterAnnotations,
    lookup: AggregationLookup,

    scheduler: DiffScheduler,
    events: EventBus,
}

impl fmt::Debug for RowGroupingEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowGroupingEngine")
            .field("options", &self.options)
            .field("records", &self.records)
            .field("columns", &self.columns.len())
            .field("row_grouping_model", &self.row_grouping_model)
            .field("aggregation_model", &self.aggregation_model)
            .field("nodes", &self.tree.len())
            .field("stats", &self.scheduler.stats())
            .finish_non_exhaustive()
    }
}

impl Default for RowGroupingEngine {
    fn default() -> Self {
        RowGroupingEngine::new(RowGroupingOptions::default())
    }
}

impl RowGroupingEngine {
    pub fn new(options: RowGroupingOptions) -> Self {
        let records = RecordSet::new(field_row_id_getter(&options.row_id_field));
        RowGroupingEngine {
            options,
            records,
            columns: Vec::new(),
            grouping_column_count: 0,
            column_wraps: FxHashMap::default(),
            row_grouping_model: Vec::new(),
            aggregation_model: AggregationModel::default(),
            filter_model: FilterModel::default(),
            sort_model: Vec::new(),
            filter_predicate: None,
            functions: AggregationFunctions::builtin(),
            position_policy: default_aggregation_position_policy(),
            tree_data_path: None,
            expansion: FxHashMap::default(),
            tree: RowTree::new(),
            natural_order: NaturalOrder::default(),
            filter: FilterAnnotations::default(),
            lookup: AggregationLookup::default(),
            scheduler: DiffScheduler::new(),
            events: EventBus::new(),
        }
    }

    pub fn options(&self) -> &RowGroupingOptions {
        &self.options
    }

    // ========================================================================
    // ROWS AND COLUMNS
    // ========================================================================

    /// Replaces every record.
    pub fn set_rows(&mut self, rows: Vec<Record>) {
        self.records.set_rows(rows);
        log::info!(target: "ROWTREE", "rows set: {} records", self.records.len());
        self.refresh(ModelChange::Rows);
        self.events.publish(GridEvent::RowsSet {
            row_count: self.records.len(),
        });
    }

    /// Upserts and deletes records. Returns the number of applied updates.
    pub fn update_rows(&mut self, updates: Vec<RowUpdate>) -> usize {
        let applied = self.records.update_rows(updates);
        if applied > 0 {
            log::info!(target: "ROWTREE", "rows updated: {} changes", applied);
            self.refresh(ModelChange::Rows);
            self.events.publish(GridEvent::RowsSet {
                row_count: self.records.len(),
            });
        }
        applied
    }

    pub fn set_row_id_getter(&mut self, get_row_id: RowIdGetter) {
        self.records.set_row_id_getter(get_row_id);
        self.refresh(ModelChange::Rows);
    }

    pub fn records(&self) -> &RecordSet {
        &self.records
    }

    /// Replaces the column definitions. Columns are taken unwrapped.
    pub fn set_columns(&mut self, columns: Vec<ColumnDef>) {
        let grouping_before = self.row_grouping_model();
        self.column_wraps.clear();
        self.columns = columns;
        self.grouping_column_count = 0;

        // Grouping keys come from the grouping columns' getters, so any column
        // change while grouped can move rows between groups.
        let grouping_after = self.row_grouping_model();
        let change = if grouping_after != grouping_before || !grouping_after.is_empty() {
            ModelChange::RowGroupingModel
        } else {
            ModelChange::Columns
        };
        log::info!(target: "ROWTREE", "columns set: {} columns", self.columns.len());
        self.refresh(change);
        self.events.publish(GridEvent::ColumnsChange {
            column_count: self.columns.len(),
        });
    }

    /// Hydrated columns: grouping columns first, then data columns.
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    fn data_columns(&self) -> &[ColumnDef] {
        &self.columns[self.grouping_column_count..]
    }

    pub fn column(&self, field: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.field == field)
    }

    pub fn column_header(&self, field: &str) -> Option<String> {
        self.column(field).map(ColumnDef::header)
    }

    // ========================================================================
    // ROW GROUPING
    // ========================================================================

    /// The grouping model without unknown, non-groupable or repeated fields.
    pub fn row_grouping_model(&self) -> RowGroupingModel {
        if self.options.disable_row_grouping {
            return Vec::new();
        }
        sanitize_grouping_model(&self.row_grouping_model, self.data_columns())
    }

    pub fn set_row_grouping_model(&mut self, model: RowGroupingModel) {
        if model == self.row_grouping_model {
            return;
        }
        let sanitized_before = self.row_grouping_model();
        self.row_grouping_model = model;
        let sanitized = self.row_grouping_model();
        log::info!(target: "ROWTREE", "row grouping model set to {:?}", sanitized);

        if sanitized != sanitized_before {
            self.refresh(ModelChange::RowGroupingModel);
            self.events.publish(GridEvent::RowGroupingModelChange(sanitized));
        }
    }

    /// Adds a grouping field at `index` (appended when `None`). No-op if already grouped.
    pub fn add_row_grouping_criteria(&mut self, field: &str, index: Option<usize>) {
        if self.row_grouping_model.iter().any(|f| f == field) {
            return;
        }
        let mut model = self.row_grouping_model.clone();
        let position = index.unwrap_or(model.len()).min(model.len());
        model.insert(position, field.to_string());
        self.set_row_grouping_model(model);
    }

    pub fn remove_row_grouping_criteria(&mut self, field: &str) {
        let model: RowGroupingModel = self
            .row_grouping_model
            .iter()
            .filter(|f| f.as_str() != field)
            .cloned()
            .collect();
        self.set_row_grouping_model(model);
    }

    /// Moves a grouping field to `index`. No-op if the field is not grouped.
    pub fn set_row_grouping_criteria_index(&mut self, field: &str, index: usize) {
        let Some(current) = self.row_grouping_model.iter().position(|f| f == field) else {
            return;
        };
        let mut model = self.row_grouping_model.clone();
        let moved = model.remove(current);
        model.insert(index.min(model.len()), moved);
        self.set_row_grouping_model(model);
    }

    /// Switches to tree data built from `get_path`, or back to column grouping with `None`.
    pub fn set_tree_data_path(&mut self, get_path: Option<TreeDataPathGetter>) {
        self.options.tree_data = get_path.is_some();
        self.tree_data_path = get_path;
        self.refresh(ModelChange::RowGroupingModel);
    }

    /// Expands or collapses a group. Survives rebuilds while the group id is unchanged.
    pub fn set_row_children_expansion(&mut self, id: &NodeId, expanded: bool) -> bool {
        let Some(group) = self.tree.group_mut(id) else {
            return false;
        };
        group.children_expanded = expanded;
        self.expansion.insert(id.clone(), expanded);
        true
    }

    // ========================================================================
    // AGGREGATION
    // ========================================================================

    /// The effective aggregation rules after validation against the columns.
    pub fn aggregation_rules(&self) -> Vec<AggregationRule> {
        if self.options.disable_aggregation {
            return Vec::new();
        }
        get_aggregation_rules(&self.aggregation_model, self.data_columns(), &self.functions)
    }

    /// The aggregation model without invalid rules.
    pub fn aggregation_model(&self) -> AggregationModel {
        rules_to_model(&self.aggregation_rules())
    }

    pub fn set_aggregation_model(&mut self, model: AggregationModel) {
        if model == self.aggregation_model {
            return;
        }
        self.aggregation_model = model;
        let sanitized = self.aggregation_model();
        log::info!(target: "AGGREGATION", "aggregation model set to {:?}", sanitized.0);
        self.refresh(ModelChange::AggregationModel);
        self.events.publish(GridEvent::AggregationModelChange(sanitized));
    }

    /// Registers (or replaces) a named aggregation function.
    pub fn register_aggregation_function(&mut self, name: &str, function: AggregationFunction) {
        self.functions.register(name, function);
        self.unwrap_all_columns();
        self.refresh(ModelChange::Columns);
    }

    pub fn available_aggregation_functions(&self, field: &str) -> Vec<String> {
        self.data_columns()
            .iter()
            .find(|c| c.field == field)
            .map(|column| available_aggregation_functions(column, &self.functions))
            .unwrap_or_default()
    }

    pub fn set_aggregation_position_policy(&mut self, policy: AggregationPositionPolicy) {
        self.position_policy = policy;
        let rules = self.aggregation_rules();
        let plan = RefreshPlan {
            hydrate_rows: true,
            aggregate_values: true,
            ..RefreshPlan::default()
        };
        self.run_plan(plan, &rules);
    }

    /// The aggregate displayed in cell (`id`, `field`), if any.
    pub fn aggregation_cell(&self, id: &NodeId, field: &str) -> Option<&AggregationCell> {
        self.lookup.cell_for(&self.tree, id, field)
    }

    // ========================================================================
    // FILTER AND SORT
    // ========================================================================

    pub fn filter_model(&self) -> &FilterModel {
        &self.filter_model
    }

    pub fn set_filter_model(&mut self, model: FilterModel) {
        if model == self.filter_model {
            return;
        }
        log::info!(target: "FILTER", "filter model set: {} items", model.items.len());
        self.filter_model = model;
        self.refresh(ModelChange::FilterModel);
        self.events.publish(GridEvent::FilterModelChange(self.filter_model.clone()));
    }

    /// Installs an extra predicate every data row must satisfy.
    pub fn set_filter_predicate(&mut self, predicate: Option<FilterPredicate>) {
        self.filter_predicate = predicate;
        self.refresh(ModelChange::FilterModel);
    }

    pub fn filter_result(&self, id: &NodeId) -> Option<&FilterResult> {
        self.filter.get(id)
    }

    pub fn is_row_passing(&self, id: &NodeId) -> bool {
        self.tree.contains(id) && self.filter.passes(&self.tree, id)
    }

    pub fn sort_model(&self) -> &SortModel {
        &self.sort_model
    }

    pub fn set_sort_model(&mut self, model: SortModel) {
        if model == self.sort_model {
            return;
        }
        log::info!(target: "ROWTREE", "sort model set: {:?}", model);
        self.sort_model = model;
        self.refresh(ModelChange::SortModel);
        self.events.publish(GridEvent::SortModelChange(self.sort_model.clone()));
    }

    // ========================================================================
    // TREE AND CELLS
    // ========================================================================

    pub fn tree(&self) -> &RowTree {
        &self.tree
    }

    pub fn node(&self, id: &NodeId) -> Option<&TreeNode> {
        self.tree.get(id)
    }

    /// Rows in display order: filtered, sorted, collapsed groups closed.
    pub fn visible_rows(&self) -> Vec<NodeId> {
        visible_rows(&self.tree, &self.filter)
    }

    pub fn cell_params<'a>(&'a self, id: &NodeId, field: &'a str) -> Option<CellParams<'a>> {
        let node = self.tree.get(id)?;
        Some(CellContext::new(&self.tree, &self.records, &self.lookup).params(node, field))
    }

    /// Value of a cell through the hydrated column, aggregates included.
    pub fn cell_value(&self, id: &NodeId, field: &str) -> Option<CellValue> {
        let column = self.column(field)?;
        let params = self.cell_params(id, field)?;
        Some(column.value_of(&params))
    }

    pub fn formatted_cell(&self, id: &NodeId, field: &str) -> Option<String> {
        let column = self.column(field)?;
        let params = self.cell_params(id, field)?;
        let value = column.value_of(&params);
        Some(column.format_value(&value, &params))
    }

    pub fn rendered_cell(&self, id: &NodeId, field: &str) -> Option<String> {
        let column = self.column(field)?;
        let params = self.cell_params(id, field)?;
        Some(column.render(&params))
    }

    // ========================================================================
    // EVENTS
    // ========================================================================

    pub fn subscribe(
        &mut self,
        kind: GridEventKind,
        listener: impl FnMut(&GridEvent) + Send + 'static,
    ) -> SubscriptionId {
        self.events.subscribe(kind, listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    pub fn stats(&self) -> RefreshStats {
        self.scheduler.stats()
    }

    pub fn scheduler(&self) -> &DiffScheduler {
        &self.scheduler
    }

    // ========================================================================
    // REFRESH PHASES
    // ========================================================================

    fn refresh(&mut self, change: ModelChange) {
        let rules = self.aggregation_rules();
        let plan = self.scheduler.plan(change, &rules, !self.sort_model.is_empty());
        self.run_plan(plan, &rules);
    }

    fn run_plan(&mut self, plan: RefreshPlan, rules: &[AggregationRule]) {
        let mut plan = plan;

        if plan.rebuild_tree {
            self.rebuild_tree();
        }
        if plan.hydrate_rows {
            hydrate_footers(&mut self.tree, rules, &self.position_policy);
            self.scheduler.mark_rows_hydrated(rules);
        }
        if plan.hydrate_columns {
            self.hydrate_columns(rules);
        }
        if plan.filter {
            self.run_filter();
            let follow_up = self
                .scheduler
                .plan(ModelChange::FilteredRowsSet, rules, !self.sort_model.is_empty());
            plan = plan.merge(follow_up);
        }
        if plan.aggregate_values {
            self.run_aggregation(rules);
        }
        if plan.sort {
            self.run_sort();
        }

        debug_assert_eq!(self.tree.validate(), Ok(()));
    }

    fn rebuild_tree(&mut self) {
        let tree = {
            let builder = RowTreeBuilder::new(&self.options).with_expansion_overrides(&self.expansion);
            match (&self.tree_data_path, self.options.tree_data) {
                (Some(get_path), true) => builder.build_tree_data(&self.records, get_path),
                _ => {
                    let data_columns = self.data_columns();
                    let criteria: Vec<GroupingCriterion> = self
                        .row_grouping_model()
                        .iter()
                        .filter_map(|field| data_columns.iter().find(|c| &c.field == field))
                        .map(GroupingCriterion::from_column)
                        .collect();
                    builder.build(&self.records, &criteria, data_columns)
                }
            }
        };

        self.tree = tree;
        self.natural_order = capture_natural_order(&self.tree);
        self.filter = FilterAnnotations::default();
        self.lookup.clear();
        self.scheduler.mark_tree_rebuilt();
    }

    fn unwrap_all_columns(&mut self) {
        for column in self.columns.iter_mut() {
            if let Some(wrap) = self.column_wraps.remove(&column.field) {
                *column = unwrap_column(column, &wrap);
            }
        }
    }

    /// Regenerates grouping columns and wraps or unwraps data columns whose
    /// rule changed. Columns whose rule is unchanged keep their wrapper.
    fn hydrate_columns(&mut self, rules: &[AggregationRule]) {
        let mut data: Vec<ColumnDef> = self.columns.drain(self.grouping_column_count..).collect();

        for column in data.iter_mut() {
            let desired = rules.iter().find(|rule| rule.field == column.field);
            let current = self.column_wraps.get(&column.field).map(|wrap| &wrap.rule);
            if current == desired {
                continue;
            }
            if let Some(wrap) = self.column_wraps.remove(&column.field) {
                *column = unwrap_column(column, &wrap);
            }
            let Some(rule) = desired else {
                continue;
            };
            let Some(function) = self.functions.get(&rule.function_name) else {
                continue;
            };
            let label = self.functions.label(&rule.function_name);
            let (wrapped, wrap) = wrap_column(column, rule, function, &label);
            *column = wrapped;
            self.column_wraps.insert(column.field.clone(), wrap);
        }

        let model = if self.options.disable_row_grouping {
            Vec::new()
        } else {
            sanitize_grouping_model(&self.row_grouping_model, &data)
        };
        let grouping = create_grouping_columns(
            self.options.grouping_column_mode,
            self.options.tree_data,
            &model,
            &data,
        );

        self.grouping_column_count = grouping.len();
        self.columns = grouping;
        self.columns.extend(data);
        self.scheduler.mark_columns_hydrated(rules);

        log::debug!(
            target: "AGGREGATION",
            "column hydration: {} grouping columns, {} wrapped columns",
            self.grouping_column_count,
            self.column_wraps.len()
        );
    }

    fn run_filter(&mut self) {
        let annotations = FilterPass {
            ctx: CellContext::new(&self.tree, &self.records, &self.lookup),
            columns: &self.columns,
            model: &self.filter_model,
            predicate: self.filter_predicate.as_ref(),
        }
        .run();

        self.filter = annotations;
        self.scheduler.mark_filtered();
        self.events.publish(GridEvent::FilteredRowsSet {
            passing_rows: self.filter.passing_rows(),
        });
    }

    fn run_aggregation(&mut self, rules: &[AggregationRule]) {
        let lookup = AggregationPass {
            tree: &self.tree,
            records: &self.records,
            columns: &self.columns,
            rules,
            functions: &self.functions,
            policy: &self.position_policy,
            scope: self.options.aggregation_rows_scope,
            filter: &self.filter,
        }
        .run();

        self.lookup = lookup;
        self.scheduler.mark_aggregated();
    }

    fn run_sort(&mut self) {
        let orders = SortPass {
            ctx: CellContext::new(&self.tree, &self.records, &self.lookup),
            columns: &self.columns,
            model: &self.sort_model,
        }
        .sorted_children(&self.natural_order);

        apply_child_order(&mut self.tree, orders);
        self.scheduler.mark_sorted();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{AggregationPosition, GROUPING_COLUMN_SINGLE_FIELD};
    use crate::tree::root_id;
    use grid_model::{FilterItem, LogicOperator, RowId, SortItem};
    use std::sync::{Arc, Mutex};

    fn engine() -> RowGroupingEngine {
        let mut engine = RowGroupingEngine::default();
        engine.set_columns(vec![ColumnDef::string("g"), ColumnDef::number("v")]);
        engine.set_rows(vec![
            Record::new().with("id", 1).with("g", "A").with("v", 10.0),
            Record::new().with("id", 2).with("g", "A").with("v", "x"),
            Record::new().with("id", 3).with("g", "B").with("v", 5.0),
        ]);
        engine
    }

    fn group(key: &str) -> NodeId {
        RowId::text(format!("auto-generated-row-g/{}", key))
    }

    #[test]
    fn test_grouping_builds_groups_and_grouping_column() {
        let mut engine = engine();
        engine.set_row_grouping_model(vec!["g".to_string()]);

        assert_eq!(engine.tree().children(&root_id()), vec![group("A"), group("B")]);
        assert_eq!(engine.columns()[0].field, GROUPING_COLUMN_SINGLE_FIELD);
        assert_eq!(
            engine.cell_value(&group("A"), GROUPING_COLUMN_SINGLE_FIELD),
            Some(CellValue::text("A"))
        );
    }

    #[test]
    fn test_sum_inline_and_root_footer() {
        let mut engine = engine();
        engine.set_row_grouping_model(vec!["g".to_string()]);
        engine.set_aggregation_model(AggregationModel::default().with("v", "sum"));

        assert_eq!(engine.cell_value(&group("A"), "v"), Some(CellValue::Number(10.0)));
        assert_eq!(engine.cell_value(&group("B"), "v"), Some(CellValue::Number(5.0)));
        assert_eq!(engine.cell_value(&RowId::Number(1), "v"), Some(CellValue::Number(10.0)));

        let footer = crate::builder::footer_node_id(&root_id());
        assert_eq!(engine.tree().pinned_bottom, vec![footer.clone()]);
        let cell = engine.aggregation_cell(&footer, "v").unwrap();
        assert_eq!(cell.value, CellValue::Number(15.0));
        assert_eq!(cell.position, AggregationPosition::Footer);
        assert_eq!(engine.column_header("v"), Some("v (sum)".to_string()));
        assert_eq!(engine.visible_rows().last(), Some(&footer));
    }

    #[test]
    fn test_filtered_scope_follows_filter() {
        let mut engine = engine();
        engine.set_row_grouping_model(vec!["g".to_string()]);
        engine.set_aggregation_model(AggregationModel::default().with("v", "size"));
        assert_eq!(engine.cell_value(&group("A"), "v"), Some(CellValue::Number(2.0)));

        engine.set_filter_model(FilterModel::new(
            vec![FilterItem::new(1, "v", ">", 1.0)],
            LogicOperator::And,
        ));
        assert_eq!(engine.cell_value(&group("A"), "v"), Some(CellValue::Number(1.0)));
        assert_eq!(engine.formatted_cell(&group("A"), "v"), Some("1".to_string()));
        assert_eq!(engine.filter_result(&group("A")).map(|r| r.filtered_descendant_count), Some(1));
    }

    #[test]
    fn test_models_read_back_sanitized() {
        let mut engine = engine();
        engine.set_row_grouping_model(vec!["g".to_string(), "nope".to_string()]);
        assert_eq!(engine.row_grouping_model(), vec!["g".to_string()]);

        engine.set_aggregation_model(AggregationModel::default().with("v", "sum").with("g", "sum"));
        assert_eq!(engine.aggregation_model(), AggregationModel::default().with("v", "sum"));
    }

    #[test]
    fn test_grouping_api() {
        let mut engine = engine();
        engine.set_columns(vec![ColumnDef::string("g"), ColumnDef::number("v"), ColumnDef::string("h")]);
        engine.add_row_grouping_criteria("g", None);
        engine.add_row_grouping_criteria("h", Some(0));
        assert_eq!(engine.row_grouping_model(), vec!["h".to_string(), "g".to_string()]);

        engine.set_row_grouping_criteria_index("h", 5);
        assert_eq!(engine.row_grouping_model(), vec!["g".to_string(), "h".to_string()]);

        engine.remove_row_grouping_criteria("g");
        assert_eq!(engine.row_grouping_model(), vec!["h".to_string()]);
    }

    #[test]
    fn test_aggregation_change_keeps_topology() {
        let mut engine = engine();
        engine.set_row_grouping_model(vec!["g".to_string()]);
        engine.set_aggregation_model(AggregationModel::default().with("v", "sum"));
        let before = engine.stats();
        let ids_before: Vec<NodeId> = engine.tree().children(&root_id()).to_vec();

        engine.set_aggregation_model(AggregationModel::default().with("v", "avg"));
        let after = engine.stats();

        assert_eq!(after.tree_builds, before.tree_builds);
        assert_eq!(after.row_hydrations, before.row_hydrations + 1);
        assert_eq!(engine.tree().children(&root_id()), ids_before);
        assert_eq!(engine.cell_value(&group("A"), "v"), Some(CellValue::Number(10.0)));
    }

    #[test]
    fn test_sort_groups_by_aggregate() {
        let mut engine = engine();
        engine.set_row_grouping_model(vec!["g".to_string()]);
        engine.set_aggregation_model(AggregationModel::default().with("v", "sum"));
        engine.set_sort_model(vec![SortItem::asc("v")]);
        assert_eq!(engine.tree().children(&root_id()), vec![group("B"), group("A")]);

        engine.set_sort_model(Vec::new());
        assert_eq!(engine.tree().children(&root_id()), vec![group("A"), group("B")]);
    }

    #[test]
    fn test_events_carry_sanitized_models() {
        let mut engine = engine();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        engine.subscribe(GridEventKind::RowGroupingModelChange, move |event| {
            sink.lock().unwrap().push(event.clone());
        });

        engine.set_row_grouping_model(vec!["g".to_string(), "missing".to_string()]);
        engine.set_row_grouping_model(vec!["g".to_string(), "missing".to_string()]);
        engine.set_row_grouping_model(vec!["g".to_string()]);
        engine.remove_row_grouping_criteria("missing");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], GridEvent::RowGroupingModelChange(vec!["g".to_string()]));
    }

    #[test]
    fn test_expansion_survives_rebuild() {
        let mut engine = engine();
        engine.set_row_grouping_model(vec!["g".to_string()]);
        assert!(!engine.tree().group(&group("A")).unwrap().children_expanded);
        assert!(engine.set_row_children_expansion(&group("A"), true));
        assert!(!engine.set_row_children_expansion(&RowId::Number(1), true));

        engine.update_rows(vec![RowUpdate::Upsert(Record::new().with("id", 4).with("g", "A").with("v", 1.0))]);
        assert!(engine.tree().group(&group("A")).unwrap().children_expanded);
        assert_eq!(engine.visible_rows(), vec![group("A"), RowId::Number(1), RowId::Number(2), RowId::Number(4), group("B")]);
    }
}
