//! FILENAME: core/row-grouping-engine/src/lib.rs
//! Row grouping subsystem of the data grid.
//!
//! Turns a flat record set into a tree of groups (or a tree-data hierarchy),
//! computes aggregates per group, propagates filters through the tree and keeps
//! all of it current with as little re-work as possible when a model changes.
//!
//! Layers:
//! - `definition`: Serializable options and the grouping/aggregation vocabulary
//! - `tree`, `builder`: The row tree arena and how it is built from records
//! - `functions`, `aggregation`: Aggregation functions, footer rows, column wrapping, values
//! - `filter`, `sort`, `grouping_columns`: Per-node passes over the tree
//! - `scheduler`: Which phases a model change re-runs
//! - `engine`: The session object tying it together

pub mod aggregation;
pub mod builder;
pub mod context;
pub mod definition;
pub mod engine;
pub mod error;
pub mod filter;
pub mod functions;
pub mod grouping_columns;
pub mod scheduler;
pub mod sort;
pub mod tree;

pub use aggregation::{
    available_aggregation_functions, can_column_have_aggregation_function, get_aggregation_rules,
    AggregationCell, AggregationLookup,
};
pub use builder::{footer_node_id, group_node_id, sanitize_grouping_model, RowTreeBuilder};
pub use definition::*;
pub use engine::RowGroupingEngine;
pub use error::TreeError;
pub use filter::{FilterPredicate, FilterResult};
pub use functions::{AggregationFunction, AggregationFunctions};
pub use scheduler::{ModelChange, RefreshPlan, RefreshStats};
pub use tree::{root_id, FooterNode, GroupNode, LeafNode, NodeId, PinnedPosition, PinnedRowNode, RowTree, TreeNode};
