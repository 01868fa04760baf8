//! FILENAME: core/row-grouping-engine/src/context.rs
//! Builds the `CellParams` column callbacks receive for a node of the tree.

use grid_model::{CellParams, RecordSet};

use crate::aggregation::AggregationLookup;
use crate::tree::{RowTree, TreeNode};

/// Read-only view over everything a cell of the tree may need.
#[derive(Clone, Copy)]
pub struct CellContext<'a> {
    pub tree: &'a RowTree,
    pub records: &'a RecordSet,
    pub lookup: &'a AggregationLookup,
}

impl<'a> CellContext<'a> {
    pub fn new(tree: &'a RowTree, records: &'a RecordSet, lookup: &'a AggregationLookup) -> Self {
        CellContext { tree, records, lookup }
    }

    pub fn params(&self, node: &'a TreeNode, field: &'a str) -> CellParams<'a> {
        let id = node.id();
        let record = if node.is_data_row() { self.records.get(id) } else { None };
        let aggregate = self
            .lookup
            .cell_for(self.tree, id, field)
            .map(|cell| &cell.value);

        CellParams {
            row_id: id,
            field,
            row_kind: node.kind(),
            depth: node.depth(),
            record,
            grouping_field: node.grouping_field(),
            group_key: node.grouping_key(),
            aggregate,
        }
    }
}
