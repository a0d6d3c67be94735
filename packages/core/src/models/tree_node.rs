//! Nested-Set Tree Node
//!
//! A `TreeNode` is the positional record every page carries: its nested-set
//! bounds, its depth and weak references (by id) to its parent and to the root
//! of the tree it belongs to.
//!
//! # Encoding
//!
//! ```text
//!            root (1, 8)
//!           /           \
//!      a (2, 5)        d (6, 7)
//!         |
//!      b (3, 4)
//! ```
//!
//! - A node contains another iff `outer.left < inner.left && inner.right < outer.right`
//! - `right - left` is always odd: `right - left = 2 * subtree_size - 1`
//! - Sibling ranges are disjoint and ordered left-to-right in display order
//!
//! Bounds are never set through public setters. They are assigned by the
//! insertion algorithm in [`crate::operations`] and hydrated by stores through
//! [`TreeNode::restore`].

use serde::{Deserialize, Serialize};

/// Position of one page in its nested-set tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    id: String,
    left: i64,
    right: i64,
    level: i64,
    parent_id: Option<String>,
    root_id: String,
}

impl TreeNode {
    /// Create a single-node tree rooted at `id` (bounds `(1, 2)`, level 0)
    pub fn new_root(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            root_id: id.clone(),
            id,
            left: 1,
            right: 2,
            level: 0,
            parent_id: None,
        }
    }

    /// Rebuild a node record from persisted values
    ///
    /// Used by stores and fixtures when hydrating an existing tree. No
    /// invariant is checked here; run [`crate::operations::NestedSet::validate`]
    /// over the whole arena to verify the encoding.
    pub fn restore(
        id: impl Into<String>,
        left: i64,
        right: i64,
        level: i64,
        parent_id: Option<String>,
        root_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            left,
            right,
            level,
            parent_id,
            root_id: root_id.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn left(&self) -> i64 {
        self.left
    }

    pub fn right(&self) -> i64 {
        self.right
    }

    pub fn level(&self) -> i64 {
        self.level
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    pub fn root_id(&self) -> &str {
        &self.root_id
    }

    /// True when the node has no parent
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// True when the node has no descendants
    pub fn is_leaf(&self) -> bool {
        self.right - self.left == 1
    }

    /// Number of nodes in the subtree rooted here, this node included
    pub fn subtree_size(&self) -> i64 {
        (self.right - self.left + 1) / 2
    }

    /// True when `other` lies strictly inside this node's bounds
    pub fn contains(&self, other: &TreeNode) -> bool {
        self.root_id == other.root_id && self.left < other.left && other.right < self.right
    }

    /// True when this node is an ancestor of `other`
    pub fn is_ancestor_of(&self, other: &TreeNode) -> bool {
        self.contains(other)
    }

    /// True when this node is a descendant of `other`
    pub fn is_descendant_of(&self, other: &TreeNode) -> bool {
        other.contains(self)
    }

    /// Attach this node under `parent` without touching bounds
    ///
    /// Only level and references are updated; bounds follow when the node is
    /// spliced into the parent's tree.
    pub(crate) fn attach_to(&mut self, parent: &TreeNode) {
        self.parent_id = Some(parent.id.clone());
        self.root_id = parent.root_id.clone();
        self.level = parent.level + 1;
    }

    pub(crate) fn set_root_id(&mut self, root_id: impl Into<String>) {
        self.root_id = root_id.into();
    }

    /// Shift every bound strictly greater than `threshold` by `delta`
    ///
    /// Returns true when at least one bound moved.
    pub(crate) fn shift_bounds_above(&mut self, threshold: i64, delta: i64) -> bool {
        let mut moved = false;
        if self.left > threshold {
            self.left += delta;
            moved = true;
        }
        if self.right > threshold {
            self.right += delta;
            moved = true;
        }
        moved
    }

    pub(crate) fn place(&mut self, left: i64, right: i64, level: i64) {
        self.left = left;
        self.right = right;
        self.level = level;
    }
}
