//! FILENAME: core/row-grouping-engine/src/error.rs

use thiserror::Error;

/// Internal invariant violations of the row tree. Only produced by
/// `RowTree::validate`; ordinary data never triggers them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("node {node} references missing parent {parent}")]
    MissingParent { node: String, parent: String },

    #[error("node {node} has depth {depth} but its parent has depth {parent_depth}")]
    DepthMismatch { node: String, depth: i32, parent_depth: i32 },

    #[error("node {node} is not listed among the children of {parent}")]
    UnlinkedChild { node: String, parent: String },

    #[error("group {parent} lists child {child} whose parent link points elsewhere")]
    BrokenBackReference { parent: String, child: String },

    #[error("group {group} has more than one footer")]
    DuplicateFooter { group: String },

    #[error("group {group} references missing footer {footer}")]
    DanglingFooter { group: String, footer: String },
}
