//! FILENAME: core/row-grouping-engine/src/builder.rs
//! Row Tree Builder - Turns the flat record set into the grouped row tree.
//!
//! Two strategies share the same arena and node id scheme:
//! 1. Column grouping: every record gets one grouping key per criterion and is
//!    inserted as a leaf under the path those keys describe.
//! 2. Tree data: every record carries its own path; records can be groups and
//!    missing intermediate segments are filled with auto-generated groups.
//!
//! Children keep the order in which the records first reached them.

use grid_model::{escape_id_component, ColumnDef, FieldId, GroupKey, Record, RecordSet, RowId, RowGroupingModel};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::definition::{
    GroupingCriterion, RowGroupingOptions, TreeDataPathGetter, FOOTER_NODE_ID_PREFIX,
    GROUP_NODE_ID_PREFIX, NO_FIELD_SEGMENT,
};
use crate::tree::{root_id, GroupNode, LeafNode, NodeId, RowTree, TreeNode};

// ============================================================================
// KEY RESOLUTION
// ============================================================================

/// Computes the grouping key of a record for one criterion.
///
/// A criterion with its own value getter receives the raw field value, the
/// record and the column. Absent fields resolve to `GroupKey::Undefined` and
/// form a group of their own.
pub fn resolve_group_key(record: &Record, criterion: &GroupingCriterion, column: Option<&ColumnDef>) -> GroupKey {
    let raw = record.get(&criterion.field);
    match &criterion.value_getter {
        Some(getter) => match column {
            Some(column) => getter(raw, record, column),
            None => getter(raw, record, &ColumnDef::string(criterion.field.as_str())),
        },
        None => GroupKey::from(raw),
    }
}

/// Drops grouping fields that name no column, name a non-groupable column,
/// or repeat an earlier field.
pub fn sanitize_grouping_model(model: &[FieldId], columns: &[ColumnDef]) -> RowGroupingModel {
    let mut seen = FxHashSet::default();
    let mut sanitized = Vec::with_capacity(model.len());

    for field in model {
        match columns.iter().find(|c| &c.field == field) {
            Some(column) if column.groupable => {
                if seen.insert(field.as_str()) {
                    sanitized.push(field.clone());
                }
            }
            Some(_) => {
                log::warn!(target: "ROWTREE", "ignoring grouping on non-groupable column '{}'", field);
            }
            None => {
                log::warn!(target: "ROWTREE", "ignoring grouping on unknown column '{}'", field);
            }
        }
    }

    sanitized
}

// ============================================================================
// NODE IDS
// ============================================================================

/// Deterministic id of a group node from its path of (field, key) segments.
pub fn group_node_id<'a>(path: impl IntoIterator<Item = (Option<&'a str>, &'a GroupKey)>) -> NodeId {
    let segments: Vec<String> = path
        .into_iter()
        .map(|(field, key)| {
            let field = field.map(escape_id_component).unwrap_or_else(|| NO_FIELD_SEGMENT.to_string());
            format!("{}/{}", field, key.id_segment())
        })
        .collect();
    RowId::text(format!("{}{}", GROUP_NODE_ID_PREFIX, segments.join("-")))
}

/// Deterministic id of the footer of a group.
pub fn footer_node_id(group_id: &NodeId) -> NodeId {
    RowId::text(format!("{}{}", FOOTER_NODE_ID_PREFIX, group_id))
}

// ============================================================================
// BUILDER
// ============================================================================

/// Child lookup key: (parent, grouping field, key).
type ChildKey = (NodeId, Option<FieldId>, GroupKey);

/// Builds a fresh `RowTree` from the record set.
pub struct RowTreeBuilder<'a> {
    options: &'a RowGroupingOptions,
    expansion: Option<&'a FxHashMap<NodeId, bool>>,
}

impl<'a> RowTreeBuilder<'a> {
    pub fn new(options: &'a RowGroupingOptions) -> Self {
        RowTreeBuilder { options, expansion: None }
    }

    /// Expansion states set explicitly by the user, applied over the default depth.
    pub fn with_expansion_overrides(mut self, expansion: &'a FxHashMap<NodeId, bool>) -> Self {
        self.expansion = Some(expansion);
        self
    }

    fn is_expanded(&self, id: &NodeId, depth: i32) -> bool {
        self.expansion
            .and_then(|overrides| overrides.get(id).copied())
            .unwrap_or_else(|| self.options.is_expanded_by_default(depth))
    }

    fn new_group(&self, id: NodeId, parent: NodeId, depth: i32, field: Option<FieldId>, key: GroupKey) -> GroupNode {
        GroupNode {
            children_expanded: self.is_expanded(&id, depth),
            id,
            parent: Some(parent),
            depth,
            grouping_field: field,
            grouping_key: Some(key),
            children: Vec::new(),
            footer_id: None,
            is_auto_generated: true,
        }
    }

    /// Groups records by the given (already sanitized) criteria.
    pub fn build(&self, records: &RecordSet, criteria: &[GroupingCriterion], columns: &[ColumnDef]) -> RowTree {
        let mut tree = RowTree::new();
        let mut lookup: FxHashMap<ChildKey, NodeId> = FxHashMap::default();
        let criterion_columns: Vec<Option<&ColumnDef>> = criteria
            .iter()
            .map(|criterion| columns.iter().find(|c| c.field == criterion.field))
            .collect();

        'records: for (row_id, record) in records.iter() {
            let keys: Vec<GroupKey> = criteria
                .iter()
                .zip(&criterion_columns)
                .map(|(criterion, column)| resolve_group_key(record, criterion, *column))
                .collect();

            let mut parent = root_id();
            for (depth, (criterion, key)) in criteria.iter().zip(&keys).enumerate() {
                let lookup_key = (parent.clone(), Some(criterion.field.clone()), key.clone());
                parent = match lookup.get(&lookup_key).cloned() {
                    Some(existing) => existing,
                    None => {
                        let id = group_node_id(
                            criteria[..=depth]
                                .iter()
                                .zip(&keys)
                                .map(|(c, k)| (Some(c.field.as_str()), k)),
                        );
                        let group = self.new_group(
                            id.clone(),
                            parent,
                            depth as i32,
                            Some(criterion.field.clone()),
                            key.clone(),
                        );
                        if !tree.insert_child(TreeNode::Group(group)) {
                            continue 'records;
                        }
                        lookup.insert(lookup_key, id.clone());
                        id
                    }
                };
            }

            if tree.contains(row_id) {
                log::warn!(target: "ROWTREE", "row id {} collides with an existing node, skipping", row_id);
                continue;
            }
            tree.insert_child(TreeNode::Leaf(LeafNode {
                id: row_id.clone(),
                parent,
                depth: criteria.len() as i32,
                grouping_key: None,
            }));
        }

        log::debug!(
            target: "ROWTREE",
            "built grouped tree: {} nodes, {} criteria, max depth {}",
            tree.len(),
            criteria.len(),
            tree.max_depth
        );
        tree
    }

    /// Builds the tree from per-record paths.
    pub fn build_tree_data(&self, records: &RecordSet, get_path: &TreeDataPathGetter) -> RowTree {
        let mut tree = RowTree::new();
        let mut lookup: FxHashMap<ChildKey, NodeId> = FxHashMap::default();

        'records: for (row_id, record) in records.iter() {
            let path: Vec<GroupKey> = get_path(record)
                .into_iter()
                .map(GroupKey::Text)
                .collect();
            let Some((last, ancestors)) = path.split_last() else {
                log::warn!(target: "ROWTREE", "row {} has an empty tree data path, skipping", row_id);
                continue;
            };

            let mut parent = root_id();
            for (depth, key) in ancestors.iter().enumerate() {
                let lookup_key = (parent.clone(), None, key.clone());
                parent = match lookup.get(&lookup_key).cloned() {
                    Some(existing) => {
                        self.ensure_group(&mut tree, &existing);
                        existing
                    }
                    None => {
                        let id = group_node_id(path[..=depth].iter().map(|k| (None, k)));
                        let group = self.new_group(id.clone(), parent, depth as i32, None, key.clone());
                        if !tree.insert_child(TreeNode::Group(group)) {
                            continue 'records;
                        }
                        lookup.insert(lookup_key, id.clone());
                        id
                    }
                };
            }

            if tree.contains(row_id) {
                log::warn!(target: "ROWTREE", "row id {} collides with an existing node, skipping", row_id);
                continue;
            }

            let depth = ancestors.len() as i32;
            let lookup_key = (parent.clone(), None, last.clone());
            match lookup.get(&lookup_key).cloned() {
                Some(existing) if Self::is_placeholder(&tree, &existing) => {
                    self.promote_placeholder(&mut tree, &existing, row_id);
                    lookup.insert(lookup_key, row_id.clone());
                }
                Some(_) => {
                    log::warn!(target: "ROWTREE", "duplicate tree data path for row {}", row_id);
                    tree.insert_child(TreeNode::Leaf(LeafNode {
                        id: row_id.clone(),
                        parent,
                        depth,
                        grouping_key: Some(last.clone()),
                    }));
                }
                None => {
                    tree.insert_child(TreeNode::Leaf(LeafNode {
                        id: row_id.clone(),
                        parent,
                        depth,
                        grouping_key: Some(last.clone()),
                    }));
                    lookup.insert(lookup_key, row_id.clone());
                }
            }
        }

        log::debug!(
            target: "ROWTREE",
            "built tree data: {} nodes, max depth {}",
            tree.len(),
            tree.max_depth
        );
        tree
    }

    fn is_placeholder(tree: &RowTree, id: &NodeId) -> bool {
        tree.group(id).map_or(false, |group| group.is_auto_generated)
    }

    /// Turns a record leaf into a record-backed group so it can take children.
    fn ensure_group(&self, tree: &mut RowTree, id: &NodeId) {
        let Some(TreeNode::Leaf(leaf)) = tree.get(id).cloned() else {
            return;
        };
        let group = GroupNode {
            children_expanded: self.is_expanded(&leaf.id, leaf.depth),
            id: leaf.id.clone(),
            parent: Some(leaf.parent),
            depth: leaf.depth,
            grouping_field: None,
            grouping_key: leaf.grouping_key,
            children: Vec::new(),
            footer_id: None,
            is_auto_generated: false,
        };
        tree.replace_node(id, TreeNode::Group(group));
    }

    /// Gives an auto-generated group the identity of the record that fills its path.
    fn promote_placeholder(&self, tree: &mut RowTree, placeholder: &NodeId, row_id: &RowId) {
        let Some(mut group) = tree.group(placeholder).cloned() else {
            return;
        };
        group.id = row_id.clone();
        group.is_auto_generated = false;
        group.children_expanded = self.is_expanded(row_id, group.depth);
        tree.replace_node(placeholder, TreeNode::Group(group));
        log::debug!(target: "ROWTREE", "promoted placeholder {} to row {}", placeholder, row_id);
    }
}
