//! FILENAME: core/row-grouping-engine/src/sort.rs
//! Sorting of sibling lists and flattening of the tree into visible rows.

use std::cmp::Ordering;

use grid_model::{CellValue, ColumnDef, SortDirection, SortModel};
use rustc_hash::FxHashMap;

use crate::context::CellContext;
use crate::filter::FilterAnnotations;
use crate::tree::{root_id, NodeId, RowTree, TreeNode};

/// Children of every group in first-appearance order, footers excluded.
pub type NaturalOrder = FxHashMap<NodeId, Vec<NodeId>>;

/// Captures the builder's child order so sorting can always start from it.
pub fn capture_natural_order(tree: &RowTree) -> NaturalOrder {
    tree.group_ids_top_down()
        .into_iter()
        .map(|id| {
            let children = tree
                .children(&id)
                .iter()
                .filter(|child| !matches!(tree.get(child), Some(TreeNode::Footer(_))))
                .cloned()
                .collect();
            (id, children)
        })
        .collect()
}

/// Inputs of one sort pass.
pub struct SortPass<'a> {
    pub ctx: CellContext<'a>,
    /// Hydrated columns, grouping columns included.
    pub columns: &'a [ColumnDef],
    pub model: &'a SortModel,
}

impl<'a> SortPass<'a> {
    /// The sorted child list of every group. Sorting is stable, so siblings
    /// that compare equal keep their natural order; footers stay last.
    pub fn sorted_children(&self, natural: &NaturalOrder) -> Vec<(NodeId, Vec<NodeId>)> {
        let tree = self.ctx.tree;
        let criteria: Vec<(&'a str, &'a ColumnDef, SortDirection)> = self
            .model
            .iter()
            .filter_map(|item| {
                let column = self.columns.iter().find(|c| c.field == item.field)?;
                column.sortable.then_some((item.field.as_str(), column, item.sort))
            })
            .collect();

        let mut orders = Vec::new();
        for group_id in tree.group_ids_top_down() {
            let Some(group) = tree.group(&group_id) else {
                continue;
            };
            let base: Vec<NodeId> = match natural.get(&group_id) {
                Some(children) => children.iter().filter(|id| tree.contains(id)).cloned().collect(),
                None => group
                    .children
                    .iter()
                    .filter(|id| !matches!(tree.get(id), Some(TreeNode::Footer(_))))
                    .cloned()
                    .collect(),
            };

            let mut keyed: Vec<(&'a TreeNode, Vec<CellValue>)> = base
                .iter()
                .filter_map(|id| tree.get(id))
                .map(|node| {
                    let values = criteria
                        .iter()
                        .map(|(field, column, _)| column.value_of(&self.ctx.params(node, field)))
                        .collect();
                    (node, values)
                })
                .collect();

            if !criteria.is_empty() {
                keyed.sort_by(|(node_a, values_a), (node_b, values_b)| {
                    for (index, (field, column, direction)) in criteria.iter().enumerate() {
                        let params_a = self.ctx.params(node_a, field);
                        let params_b = self.ctx.params(node_b, field);
                        let ordering = column.compare(&values_a[index], &values_b[index], &params_a, &params_b);
                        let ordering = match direction {
                            SortDirection::Asc => ordering,
                            SortDirection::Desc => ordering.reverse(),
                        };
                        if ordering != Ordering::Equal {
                            return ordering;
                        }
                    }
                    Ordering::Equal
                });
            }

            let mut children: Vec<NodeId> = keyed.into_iter().map(|(node, _)| node.id().clone()).collect();
            if let Some(footer_id) = &group.footer_id {
                if !group.is_root() {
                    children.push(footer_id.clone());
                }
            }
            orders.push((group_id, children));
        }

        log::debug!(target: "ROWTREE", "sorted {} sibling lists by {} criteria", orders.len(), criteria.len());
        orders
    }
}

/// Writes sorted child lists back into the tree.
pub fn apply_child_order(tree: &mut RowTree, orders: Vec<(NodeId, Vec<NodeId>)>) {
    for (group_id, children) in orders {
        if let Some(group) = tree.group_mut(&group_id) {
            group.children = children;
        }
    }
}

/// The rows a viewer shows, top to bottom: passing rows only, descending into
/// expanded groups only, with the root footer last.
pub fn visible_rows(tree: &RowTree, filter: &FilterAnnotations) -> Vec<NodeId> {
    fn walk(tree: &RowTree, filter: &FilterAnnotations, group_id: &NodeId, out: &mut Vec<NodeId>) {
        for child_id in tree.children(group_id) {
            if !filter.passes(tree, child_id) {
                continue;
            }
            out.push(child_id.clone());
            if let Some(TreeNode::Group(group)) = tree.get(child_id) {
                if group.children_expanded {
                    walk(tree, filter, child_id, out);
                }
            }
        }
    }

    let mut rows: Vec<NodeId> = tree.pinned_top.clone();
    walk(tree, filter, &root_id(), &mut rows);
    rows.extend(
        tree.pinned_bottom
            .iter()
            .filter(|id| filter.passes(tree, id))
            .cloned(),
    );
    rows
}
