//! Nested-set arena and insertion planning
//!
//! [`NestedSet`] holds the node records of one page tree, addressed by id.
//! Planning an insertion never mutates the arena: it returns a
//! [`TreeChangeSet`] (every shifted record plus the inserted one) that a store
//! applies atomically, or that [`NestedSet::apply`] turns into a new arena.
//!
//! # Insertion
//!
//! For a parent `P` with bounds `(l, r)`:
//!
//! - first child: bounds `> l` shift by +2, new node gets `(l + 1, l + 2)`
//! - last child: bounds `> r - 1` shift by +2, new node gets `(r, r + 1)`
//!
//! The new node is one level below `P` and belongs to `P`'s root.

use super::error::TreeOperationError;
use crate::models::TreeNode;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Width added to the tree by inserting one leaf
const LEAF_WIDTH: i64 = 2;

/// Where to splice a new node relative to its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertPosition {
    FirstChild,
    LastChild,
}

/// Records produced by planning one insertion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeChangeSet {
    pub root_id: String,
    pub parent_id: String,
    pub position: InsertPosition,
    /// Bounds strictly above this value were shifted
    pub threshold: i64,
    pub delta: i64,
    /// Existing records with their shifted bounds
    pub updated: Vec<TreeNode>,
    /// The new record
    pub inserted: TreeNode,
}

/// Arena of the node records of one tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NestedSet {
    root_id: String,
    nodes: BTreeMap<String, TreeNode>,
}

impl NestedSet {
    /// Empty arena for the tree rooted at `root_id`
    pub fn new(root_id: impl Into<String>) -> Self {
        Self {
            root_id: root_id.into(),
            nodes: BTreeMap::new(),
        }
    }

    /// Arena from existing records; records of other trees are ignored
    pub fn from_nodes(root_id: impl Into<String>, nodes: impl IntoIterator<Item = TreeNode>) -> Self {
        let root_id = root_id.into();
        let nodes = nodes
            .into_iter()
            .filter(|n| n.root_id() == root_id)
            .map(|n| (n.id().to_string(), n))
            .collect();
        Self { root_id, nodes }
    }

    pub fn root_id(&self) -> &str {
        &self.root_id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Records ordered by left bound (pre-order traversal)
    pub fn ordered(&self) -> Vec<&TreeNode> {
        let mut nodes: Vec<&TreeNode> = self.nodes.values().collect();
        nodes.sort_by_key(|n| n.left());
        nodes
    }

    /// Direct children of `id`, in display order
    pub fn children(&self, id: &str) -> Vec<&TreeNode> {
        self.ordered()
            .into_iter()
            .filter(|n| n.parent_id() == Some(id))
            .collect()
    }

    /// Every node strictly inside `id`'s bounds, in display order
    pub fn descendants(&self, id: &str) -> Vec<&TreeNode> {
        match self.nodes.get(id) {
            Some(node) => self
                .ordered()
                .into_iter()
                .filter(|n| node.contains(n))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Every node whose bounds contain `id`, root first
    pub fn ancestors(&self, id: &str) -> Vec<&TreeNode> {
        match self.nodes.get(id) {
            Some(node) => self
                .ordered()
                .into_iter()
                .filter(|n| n.contains(node))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Check the nested-set encoding
    ///
    /// Verifies, for every record: `left < right`, odd width matching the
    /// subtree size, unique bound values, parent present and containing the
    /// node one level up. The root must span `(1, 2 * len)`.
    pub fn validate(&self) -> Result<(), TreeOperationError> {
        let corrupt = |reason: String| TreeOperationError::corrupt_bounds(&self.root_id, reason);

        if self.nodes.is_empty() {
            return Ok(());
        }

        let root = self
            .nodes
            .get(&self.root_id)
            .ok_or_else(|| corrupt(format!("root '{}' is missing", self.root_id)))?;
        let expected_right = 2 * self.nodes.len() as i64;
        if root.left() != 1 || root.right() != expected_right {
            return Err(corrupt(format!(
                "root spans ({}, {}), expected (1, {})",
                root.left(),
                root.right(),
                expected_right
            )));
        }

        let mut seen = HashSet::with_capacity(self.nodes.len() * 2);
        for node in self.nodes.values() {
            if node.left() >= node.right() {
                return Err(corrupt(format!(
                    "node '{}' has left {} >= right {}",
                    node.id(),
                    node.left(),
                    node.right()
                )));
            }
            for bound in [node.left(), node.right()] {
                if !seen.insert(bound) {
                    return Err(corrupt(format!("duplicate bound {}", bound)));
                }
            }

            let inside = self.nodes.values().filter(|n| node.contains(n)).count() as i64;
            if node.right() - node.left() != 2 * inside + 1 {
                return Err(corrupt(format!(
                    "node '{}' spans ({}, {}) but has {} descendants",
                    node.id(),
                    node.left(),
                    node.right(),
                    inside
                )));
            }

            match node.parent_id() {
                None if node.id() != self.root_id => {
                    return Err(corrupt(format!("node '{}' has no parent", node.id())));
                }
                None => {}
                Some(parent_id) => {
                    let parent = self.nodes.get(parent_id).ok_or_else(|| {
                        corrupt(format!(
                            "node '{}' references missing parent '{}'",
                            node.id(),
                            parent_id
                        ))
                    })?;
                    if !parent.contains(node) {
                        return Err(corrupt(format!(
                            "node '{}' ({}, {}) is outside parent '{}' ({}, {})",
                            node.id(),
                            node.left(),
                            node.right(),
                            parent.id(),
                            parent.left(),
                            parent.right()
                        )));
                    }
                    if node.level() != parent.level() + 1 {
                        return Err(corrupt(format!(
                            "node '{}' has level {}, parent level is {}",
                            node.id(),
                            node.level(),
                            parent.level()
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Plan the insertion of `new_id` under `parent_id`
    pub fn plan_insert(
        &self,
        parent_id: &str,
        new_id: &str,
        position: InsertPosition,
    ) -> Result<TreeChangeSet, TreeOperationError> {
        let parent = self
            .nodes
            .get(parent_id)
            .ok_or_else(|| TreeOperationError::node_not_found(parent_id))?;
        if self.nodes.contains_key(new_id) {
            return Err(TreeOperationError::node_already_in_tree(
                new_id,
                &self.root_id,
            ));
        }

        let (threshold, left) = match position {
            InsertPosition::FirstChild => (parent.left(), parent.left() + 1),
            InsertPosition::LastChild => (parent.right() - 1, parent.right()),
        };

        let mut updated = Vec::new();
        for node in self.ordered() {
            let mut shifted = node.clone();
            if shifted.shift_bounds_above(threshold, LEAF_WIDTH) {
                updated.push(shifted);
            }
        }

        let mut inserted = TreeNode::new_root(new_id);
        inserted.attach_to(parent);
        inserted.place(left, left + 1, parent.level() + 1);

        Ok(TreeChangeSet {
            root_id: self.root_id.clone(),
            parent_id: parent_id.to_string(),
            position,
            threshold,
            delta: LEAF_WIDTH,
            updated,
            inserted,
        })
    }

    /// New arena with `change` applied
    pub fn apply(&self, change: &TreeChangeSet) -> NestedSet {
        let mut next = self.clone();
        for node in &change.updated {
            next.nodes.insert(node.id().to_string(), node.clone());
        }
        next.nodes
            .insert(change.inserted.id().to_string(), change.inserted.clone());
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// root(1,10) -> a(2,7) -> [b(3,4), c(5,6)], d(8,9)
    fn sample() -> NestedSet {
        NestedSet::from_nodes(
            "root",
            vec![
                TreeNode::restore("root", 1, 10, 0, None, "root"),
                TreeNode::restore("a", 2, 7, 1, Some("root".into()), "root"),
                TreeNode::restore("b", 3, 4, 2, Some("a".into()), "root"),
                TreeNode::restore("c", 5, 6, 2, Some("a".into()), "root"),
                TreeNode::restore("d", 8, 9, 1, Some("root".into()), "root"),
            ],
        )
    }

    fn bounds(set: &NestedSet, id: &str) -> (i64, i64) {
        let n = set.get(id).unwrap();
        (n.left(), n.right())
    }

    #[test]
    fn test_sample_is_valid() {
        sample().validate().unwrap();
    }

    #[test]
    fn test_navigation() {
        let set = sample();
        let children: Vec<&str> = set.children("a").iter().map(|n| n.id()).collect();
        assert_eq!(children, vec!["b", "c"]);

        let descendants: Vec<&str> = set.descendants("root").iter().map(|n| n.id()).collect();
        assert_eq!(descendants, vec!["a", "b", "c", "d"]);

        let ancestors: Vec<&str> = set.ancestors("c").iter().map(|n| n.id()).collect();
        assert_eq!(ancestors, vec!["root", "a"]);
    }

    #[test]
    fn test_insert_first_child() {
        let set = sample();
        let change = set
            .plan_insert("a", "new", InsertPosition::FirstChild)
            .unwrap();
        assert_eq!(change.threshold, 2);
        assert_eq!((change.inserted.left(), change.inserted.right()), (3, 4));
        assert_eq!(change.inserted.level(), 2);
        assert_eq!(change.inserted.parent_id(), Some("a"));
        assert_eq!(change.inserted.root_id(), "root");

        let next = set.apply(&change);
        next.validate().unwrap();
        assert_eq!(bounds(&next, "a"), (2, 9));
        assert_eq!(bounds(&next, "b"), (5, 6));
        assert_eq!(bounds(&next, "root"), (1, 12));
        let children: Vec<&str> = next.children("a").iter().map(|n| n.id()).collect();
        assert_eq!(children, vec!["new", "b", "c"]);
    }

    #[test]
    fn test_insert_last_child() {
        let set = sample();
        let change = set
            .plan_insert("a", "new", InsertPosition::LastChild)
            .unwrap();
        assert_eq!(change.threshold, 6);
        assert_eq!((change.inserted.left(), change.inserted.right()), (7, 8));

        let next = set.apply(&change);
        next.validate().unwrap();
        assert_eq!(bounds(&next, "a"), (2, 9));
        assert_eq!(bounds(&next, "c"), (5, 6));
        assert_eq!(bounds(&next, "d"), (10, 11));
        let children: Vec<&str> = next.children("a").iter().map(|n| n.id()).collect();
        assert_eq!(children, vec!["b", "c", "new"]);
    }

    #[test]
    fn test_plan_does_not_mutate_arena() {
        let set = sample();
        let before = set.clone();
        set.plan_insert("root", "x", InsertPosition::LastChild)
            .unwrap();
        assert_eq!(set, before);
    }

    #[test]
    fn test_insert_under_leaf() {
        let set = sample();
        let next = set.apply(
            &set.plan_insert("d", "leaf-child", InsertPosition::FirstChild)
                .unwrap(),
        );
        next.validate().unwrap();
        assert_eq!(bounds(&next, "d"), (8, 11));
        assert_eq!(bounds(&next, "leaf-child"), (9, 10));
    }

    #[test]
    fn test_unknown_parent() {
        let err = sample()
            .plan_insert("ghost", "x", InsertPosition::LastChild)
            .unwrap_err();
        assert!(matches!(err, TreeOperationError::NodeNotFound { .. }));
    }

    #[test]
    fn test_duplicate_insert() {
        let err = sample()
            .plan_insert("root", "b", InsertPosition::LastChild)
            .unwrap_err();
        assert!(matches!(err, TreeOperationError::NodeAlreadyInTree { .. }));
    }

    #[test]
    fn test_validate_detects_overlap() {
        let set = NestedSet::from_nodes(
            "root",
            vec![
                TreeNode::restore("root", 1, 6, 0, None, "root"),
                TreeNode::restore("a", 2, 4, 1, Some("root".into()), "root"),
                TreeNode::restore("b", 3, 5, 1, Some("root".into()), "root"),
            ],
        );
        let err = set.validate().unwrap_err();
        assert!(matches!(err, TreeOperationError::CorruptBounds { .. }));
    }

    #[test]
    fn test_validate_detects_wrong_level() {
        let set = NestedSet::from_nodes(
            "root",
            vec![
                TreeNode::restore("root", 1, 4, 0, None, "root"),
                TreeNode::restore("a", 2, 3, 2, Some("root".into()), "root"),
            ],
        );
        assert!(set.validate().is_err());
    }

    #[test]
    fn test_from_nodes_ignores_other_trees() {
        let set = NestedSet::from_nodes(
            "root",
            vec![
                TreeNode::restore("root", 1, 2, 0, None, "root"),
                TreeNode::restore("other", 1, 2, 0, None, "other"),
            ],
        );
        assert_eq!(set.len(), 1);
        assert!(!set.contains("other"));
    }
}
