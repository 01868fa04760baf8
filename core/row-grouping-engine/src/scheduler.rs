//! FILENAME: core/row-grouping-engine/src/scheduler.rs
//! Diff Scheduler - Decides the minimal re-work for a model change.
//!
//! The two "last rules" caches are explicit state: footer rows and column
//! wrapping each remember the effective aggregation rules they were last
//! hydrated with and only re-run when the rules they would apply differ.

use crate::definition::AggregationRule;

/// What changed since the last refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelChange {
    RowGroupingModel,
    Rows,
    Columns,
    AggregationModel,
    FilterModel,
    /// Filtering finished and the set of passing rows may differ.
    FilteredRowsSet,
    SortModel,
}

/// The phases a refresh runs. Phases execute in declaration order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshPlan {
    pub rebuild_tree: bool,
    pub hydrate_rows: bool,
    pub hydrate_columns: bool,
    pub filter: bool,
    pub aggregate_values: bool,
    pub sort: bool,
}

impl RefreshPlan {
    pub fn is_empty(&self) -> bool {
        *self == RefreshPlan::default()
    }

    /// Union of two plans.
    pub fn merge(self, other: RefreshPlan) -> RefreshPlan {
        RefreshPlan {
            rebuild_tree: self.rebuild_tree || other.rebuild_tree,
            hydrate_rows: self.hydrate_rows || other.hydrate_rows,
            hydrate_columns: self.hydrate_columns || other.hydrate_columns,
            filter: self.filter || other.filter,
            aggregate_values: self.aggregate_values || other.aggregate_values,
            sort: self.sort || other.sort,
        }
    }
}

/// How often each phase has run. Lets hosts and tests check invalidation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshStats {
    pub tree_builds: usize,
    pub row_hydrations: usize,
    pub column_hydrations: usize,
    pub filter_passes: usize,
    pub aggregation_passes: usize,
    pub sort_passes: usize,
}

#[derive(Debug, Default)]
pub struct DiffScheduler {
    last_row_hydration_rules: Vec<AggregationRule>,
    last_column_hydration_rules: Vec<AggregationRule>,
    stats: RefreshStats,
}

impl DiffScheduler {
    pub fn new() -> Self {
        DiffScheduler::default()
    }

    /// The phases needed after `change`, given the current effective rules and
    /// whether a sort model is active.
    pub fn plan(&self, change: ModelChange, rules: &[AggregationRule], sort_active: bool) -> RefreshPlan {
        let rows_stale = rules != self.last_row_hydration_rules.as_slice();
        let columns_stale = rules != self.last_column_hydration_rules.as_slice();

        let plan = match change {
            ModelChange::RowGroupingModel => RefreshPlan {
                rebuild_tree: true,
                hydrate_rows: true,
                hydrate_columns: true,
                filter: true,
                aggregate_values: true,
                sort: true,
            },
            ModelChange::Rows => RefreshPlan {
                rebuild_tree: true,
                hydrate_rows: true,
                hydrate_columns: false,
                filter: true,
                aggregate_values: true,
                sort: true,
            },
            ModelChange::Columns => RefreshPlan {
                hydrate_rows: rows_stale,
                hydrate_columns: true,
                filter: true,
                aggregate_values: true,
                sort: sort_active,
                ..RefreshPlan::default()
            },
            ModelChange::AggregationModel => RefreshPlan {
                hydrate_rows: rows_stale,
                hydrate_columns: columns_stale,
                aggregate_values: rows_stale || columns_stale,
                sort: (rows_stale || columns_stale) && sort_active,
                ..RefreshPlan::default()
            },
            ModelChange::FilterModel => RefreshPlan {
                filter: true,
                ..RefreshPlan::default()
            },
            ModelChange::FilteredRowsSet => RefreshPlan {
                aggregate_values: true,
                sort: sort_active,
                ..RefreshPlan::default()
            },
            ModelChange::SortModel => RefreshPlan {
                sort: true,
                ..RefreshPlan::default()
            },
        };

        log::debug!(target: "SCHEDULER", "{:?} -> {:?}", change, plan);
        plan
    }

    /// Records that footer rows now reflect `rules`.
    pub fn mark_rows_hydrated(&mut self, rules: &[AggregationRule]) {
        self.last_row_hydration_rules = rules.to_vec();
        self.stats.row_hydrations += 1;
    }

    /// Records that column wrapping now reflects `rules`.
    pub fn mark_columns_hydrated(&mut self, rules: &[AggregationRule]) {
        self.last_column_hydration_rules = rules.to_vec();
        self.stats.column_hydrations += 1;
    }

    /// A rebuilt tree has no footers yet, whatever rules were applied before.
    pub fn mark_tree_rebuilt(&mut self) {
        self.last_row_hydration_rules.clear();
        self.stats.tree_builds += 1;
    }

    pub fn mark_filtered(&mut self) {
        self.stats.filter_passes += 1;
    }

    pub fn mark_aggregated(&mut self) {
        self.stats.aggregation_passes += 1;
    }

    pub fn mark_sorted(&mut self) {
        self.stats.sort_passes += 1;
    }

    pub fn last_row_hydration_rules(&self) -> &[AggregationRule] {
        &self.last_row_hydration_rules
    }

    pub fn last_column_hydration_rules(&self) -> &[AggregationRule] {
        &self.last_column_hydration_rules
    }

    pub fn stats(&self) -> RefreshStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(field: &str, function_name: &str) -> AggregationRule {
        AggregationRule {
            field: field.to_string(),
            function_name: function_name.to_string(),
        }
    }

    #[test]
    fn test_grouping_change_rebuilds_everything() {
        let scheduler = DiffScheduler::new();
        let plan = scheduler.plan(ModelChange::RowGroupingModel, &[], false);
        assert!(plan.rebuild_tree && plan.hydrate_rows && plan.filter && plan.aggregate_values);
    }

    #[test]
    fn test_unchanged_rules_skip_hydration() {
        let mut scheduler = DiffScheduler::new();
        let rules = vec![rule("v", "sum")];
        scheduler.mark_rows_hydrated(&rules);
        scheduler.mark_columns_hydrated(&rules);

        assert!(scheduler.plan(ModelChange::AggregationModel, &rules, true).is_empty());

        let changed = vec![rule("v", "avg")];
        let plan = scheduler.plan(ModelChange::AggregationModel, &changed, false);
        assert!(plan.hydrate_rows && plan.hydrate_columns && plan.aggregate_values);
        assert!(!plan.rebuild_tree && !plan.filter && !plan.sort);
    }

    #[test]
    fn test_caches_are_independent() {
        let mut scheduler = DiffScheduler::new();
        let rules = vec![rule("v", "sum")];
        scheduler.mark_columns_hydrated(&rules);
        scheduler.mark_rows_hydrated(&rules);
        scheduler.mark_tree_rebuilt();

        let plan = scheduler.plan(ModelChange::AggregationModel, &rules, false);
        assert!(plan.hydrate_rows);
        assert!(!plan.hydrate_columns);
    }

    #[test]
    fn test_filtered_rows_set_only_reaggregates() {
        let scheduler = DiffScheduler::new();
        let plan = scheduler.plan(ModelChange::FilteredRowsSet, &[], false);
        assert_eq!(
            plan,
            RefreshPlan {
                aggregate_values: true,
                ..RefreshPlan::default()
            }
        );
        assert!(scheduler.plan(ModelChange::SortModel, &[], true).sort);
    }

    #[test]
    fn test_merge() {
        let a = RefreshPlan { filter: true, ..RefreshPlan::default() };
        let b = RefreshPlan { sort: true, ..RefreshPlan::default() };
        let merged = a.merge(b);
        assert!(merged.filter && merged.sort && !merged.rebuild_tree);
    }
}
