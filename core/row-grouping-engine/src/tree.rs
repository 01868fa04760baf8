//! FILENAME: core/row-grouping-engine/src/tree.rs
//! Row Tree - An id-indexed arena of group, leaf, footer and pinned nodes.
//!
//! Nodes never point at each other directly: parents and children are
//! referenced by id through the arena map. Rebuilding or patching the tree is
//! replacing map entries.

use grid_model::{GroupKey, RowId, RowKind};
use rustc_hash::FxHashMap;

use crate::definition::ROOT_NODE_ID;
use crate::error::TreeError;

/// Ids of tree nodes. Leaves reuse their record's row id; synthesized nodes use text ids.
pub type NodeId = RowId;

/// The id of the root node.
pub fn root_id() -> NodeId {
    RowId::text(ROOT_NODE_ID)
}

// ============================================================================
// NODE VARIANTS
// ============================================================================

/// Wraps exactly one record.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafNode {
    pub id: NodeId,
    pub parent: NodeId,
    pub depth: i32,
    /// Path segment key in tree-data mode; `None` under column grouping.
    pub grouping_key: Option<GroupKey>,
}

/// One distinct value of one grouping criterion at one depth, or the root.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupNode {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub depth: i32,
    pub grouping_field: Option<String>,
    pub grouping_key: Option<GroupKey>,
    pub children: Vec<NodeId>,
    pub children_expanded: bool,
    pub footer_id: Option<NodeId>,
    /// True when no record backs this group.
    pub is_auto_generated: bool,
}

impl GroupNode {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Holds the aggregates of its parent group.
#[derive(Debug, Clone, PartialEq)]
pub struct FooterNode {
    pub id: NodeId,
    pub parent: NodeId,
    pub depth: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinnedPosition {
    Top,
    Bottom,
}

/// A record pinned above or below the scrollable rows.
#[derive(Debug, Clone, PartialEq)]
pub struct PinnedRowNode {
    pub id: NodeId,
    pub position: PinnedPosition,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TreeNode {
    Leaf(LeafNode),
    Group(GroupNode),
    Footer(FooterNode),
    PinnedRow(PinnedRowNode),
}

impl TreeNode {
    pub fn id(&self) -> &NodeId {
        match self {
            TreeNode::Leaf(node) => &node.id,
            TreeNode::Group(node) => &node.id,
            TreeNode::Footer(node) => &node.id,
            TreeNode::PinnedRow(node) => &node.id,
        }
    }

    pub fn parent(&self) -> Option<&NodeId> {
        match self {
            TreeNode::Leaf(node) => Some(&node.parent),
            TreeNode::Group(node) => node.parent.as_ref(),
            TreeNode::Footer(node) => Some(&node.parent),
            TreeNode::PinnedRow(_) => None,
        }
    }

    pub fn depth(&self) -> i32 {
        match self {
            TreeNode::Leaf(node) => node.depth,
            TreeNode::Group(node) => node.depth,
            TreeNode::Footer(node) => node.depth,
            TreeNode::PinnedRow(_) => 0,
        }
    }

    pub fn kind(&self) -> RowKind {
        match self {
            TreeNode::Leaf(_) => RowKind::Leaf,
            TreeNode::Group(_) => RowKind::Group,
            TreeNode::Footer(_) => RowKind::Footer,
            TreeNode::PinnedRow(_) => RowKind::PinnedRow,
        }
    }

    pub fn as_group(&self) -> Option<&GroupNode> {
        match self {
            TreeNode::Group(group) => Some(group),
            _ => None,
        }
    }

    /// Whether the node is backed by a record: leaves, record-backed groups and pinned rows.
    pub fn is_data_row(&self) -> bool {
        match self {
            TreeNode::Leaf(_) | TreeNode::PinnedRow(_) => true,
            TreeNode::Group(group) => !group.is_auto_generated,
            TreeNode::Footer(_) => false,
        }
    }

    pub fn grouping_field(&self) -> Option<&str> {
        match self {
            TreeNode::Group(group) => group.grouping_field.as_deref(),
            _ => None,
        }
    }

    pub fn grouping_key(&self) -> Option<&GroupKey> {
        match self {
            TreeNode::Group(group) => group.grouping_key.as_ref(),
            TreeNode::Leaf(leaf) => leaf.grouping_key.as_ref(),
            _ => None,
        }
    }
}

// ============================================================================
// ROW TREE
// ============================================================================

/// Flat id -> node map with the root group always present.
#[derive(Debug, Clone, PartialEq)]
pub struct RowTree {
    nodes: FxHashMap<NodeId, TreeNode>,
    /// Rows pinned below the scrollable area (the root footer lives here).
    pub pinned_bottom: Vec<NodeId>,
    /// Rows pinned above the scrollable area.
    pub pinned_top: Vec<NodeId>,
    /// Deepest depth of any node.
    pub max_depth: i32,
}

impl Default for RowTree {
    fn default() -> Self {
        RowTree::new()
    }
}

impl RowTree {
    /// Creates a tree holding only the root group.
    pub fn new() -> Self {
        let mut nodes = FxHashMap::default();
        let root = root_id();
        nodes.insert(
            root.clone(),
            TreeNode::Group(GroupNode {
                id: root,
                parent: None,
                depth: -1,
                grouping_field: None,
                grouping_key: None,
                children: Vec::new(),
                children_expanded: true,
                footer_id: None,
                is_auto_generated: true,
            }),
        );
        RowTree {
            nodes,
            pinned_bottom: Vec::new(),
            pinned_top: Vec::new(),
            max_depth: -1,
        }
    }

    pub fn get(&self, id: &NodeId) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: &NodeId) -> Option<&mut TreeNode> {
        self.nodes.get_mut(id)
    }

    pub fn group(&self, id: &NodeId) -> Option<&GroupNode> {
        self.nodes.get(id).and_then(TreeNode::as_group)
    }

    pub fn group_mut(&mut self, id: &NodeId) -> Option<&mut GroupNode> {
        match self.nodes.get_mut(id) {
            Some(TreeNode::Group(group)) => Some(group),
            _ => None,
        }
    }

    pub fn root(&self) -> Option<&GroupNode> {
        self.group(&root_id())
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children(&root_id()).is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &TreeNode> {
        self.nodes.values()
    }

    /// Children of a group, empty for other node kinds.
    pub fn children(&self, id: &NodeId) -> &[NodeId] {
        self.group(id).map(|g| g.children.as_slice()).unwrap_or(&[])
    }

    /// Inserts a node and links it as the last child of its parent.
    /// Returns `false`, leaving the tree untouched, when the id is taken.
    pub(crate) fn insert_child(&mut self, node: TreeNode) -> bool {
        let id = node.id().clone();
        if self.nodes.contains_key(&id) {
            log::warn!(target: "ROWTREE", "node id {} is already in the tree, not inserting", id);
            return false;
        }
        if let Some(parent) = node.parent().cloned() {
            if let Some(group) = self.group_mut(&parent) {
                group.children.push(id.clone());
            }
        }
        self.max_depth = self.max_depth.max(node.depth());
        self.nodes.insert(id, node);
        true
    }

    /// Inserts a node without linking it to any parent's children.
    /// Returns `false` when the id is taken.
    pub(crate) fn insert_detached(&mut self, node: TreeNode) -> bool {
        if self.nodes.contains_key(node.id()) {
            log::warn!(target: "ROWTREE", "node id {} is already in the tree, not inserting", node.id());
            return false;
        }
        self.max_depth = self.max_depth.max(node.depth());
        self.nodes.insert(node.id().clone(), node);
        true
    }

    /// Replaces the node at `old_id` with `node` (possibly under a new id),
    /// re-pointing the parent's child entry and the children's parent links.
    pub(crate) fn replace_node(&mut self, old_id: &NodeId, node: TreeNode) {
        let new_id = node.id().clone();
        let removed = self.nodes.remove(old_id);

        if let Some(parent) = node.parent().cloned() {
            if let Some(group) = self.group_mut(&parent) {
                for child in group.children.iter_mut() {
                    if child == old_id {
                        *child = new_id.clone();
                    }
                }
            }
        }

        if new_id != *old_id {
            let children = node.as_group().map(|g| g.children.clone()).unwrap_or_default();
            for child_id in children {
                match self.nodes.get_mut(&child_id) {
                    Some(TreeNode::Leaf(leaf)) => leaf.parent = new_id.clone(),
                    Some(TreeNode::Group(group)) => group.parent = Some(new_id.clone()),
                    Some(TreeNode::Footer(footer)) => footer.parent = new_id.clone(),
                    _ => {}
                }
            }
        }

        debug_assert!(removed.is_some(), "replacing a node that does not exist");
        self.nodes.insert(new_id, node);
    }

    /// Removes a childless node and unlinks it from its parent.
    pub(crate) fn remove_node(&mut self, id: &NodeId) -> Option<TreeNode> {
        let node = self.nodes.remove(id)?;
        if let Some(parent) = node.parent() {
            if let Some(group) = self.group_mut(parent) {
                group.children.retain(|child| child != id);
            }
        }
        self.pinned_bottom.retain(|pinned| pinned != id);
        self.pinned_top.retain(|pinned| pinned != id);
        Some(node)
    }

    /// Ids of all group nodes, parents before children.
    pub fn group_ids_top_down(&self) -> Vec<NodeId> {
        let mut ordered = Vec::new();
        let mut stack = vec![root_id()];
        while let Some(id) = stack.pop() {
            if let Some(group) = self.group(&id) {
                ordered.push(id.clone());
                for child in group.children.iter().rev() {
                    if matches!(self.nodes.get(child), Some(TreeNode::Group(_))) {
                        stack.push(child.clone());
                    }
                }
            }
        }
        ordered
    }

    /// Record-backed descendants of a node (excluding the node itself), depth first.
    pub fn data_descendants(&self, id: &NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<&NodeId> = self.children(id).iter().rev().collect();
        while let Some(child_id) = stack.pop() {
            let Some(node) = self.nodes.get(child_id) else {
                continue;
            };
            if node.is_data_row() {
                out.push(child_id.clone());
            }
            if let TreeNode::Group(group) = node {
                stack.extend(group.children.iter().rev());
            }
        }
        out
    }

    /// Checks parent/child integrity, depths and footer uniqueness.
    pub fn validate(&self) -> Result<(), TreeError> {
        for node in self.nodes.values() {
            let id = node.id();
            if let Some(parent_id) = node.parent() {
                let parent = self
                    .group(parent_id)
                    .ok_or_else(|| TreeError::MissingParent {
                        node: id.to_string(),
                        parent: parent_id.to_string(),
                    })?;

                if node.depth() != parent.depth + 1 {
                    return Err(TreeError::DepthMismatch {
                        node: id.to_string(),
                        depth: node.depth(),
                        parent_depth: parent.depth,
                    });
                }

                let linked = parent.children.contains(id)
                    || (matches!(node, TreeNode::Footer(_)) && parent.footer_id.as_ref() == Some(id));
                if !linked {
                    return Err(TreeError::UnlinkedChild {
                        node: id.to_string(),
                        parent: parent_id.to_string(),
                    });
                }
            }

            if let TreeNode::Group(group) = node {
                for child_id in &group.children {
                    match self.nodes.get(child_id).and_then(TreeNode::parent) {
                        Some(back) if back == id => {}
                        _ => {
                            return Err(TreeError::BrokenBackReference {
                                parent: id.to_string(),
                                child: child_id.to_string(),
                            })
                        }
                    }
                }

                let footers = group
                    .children
                    .iter()
                    .filter(|c| matches!(self.nodes.get(*c), Some(TreeNode::Footer(_))))
                    .count();
                if footers > 1 || (footers == 1 && group.is_root()) {
                    return Err(TreeError::DuplicateFooter { group: id.to_string() });
                }
                if let Some(footer_id) = &group.footer_id {
                    if !matches!(self.nodes.get(footer_id), Some(TreeNode::Footer(_))) {
                        return Err(TreeError::DanglingFooter {
                            group: id.to_string(),
                            footer: footer_id.to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}
