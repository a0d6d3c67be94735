//! Error types for nested-set tree operations
//!
//! These errors cover planning an insertion into a page tree, validating the
//! nested-set encoding and committing a change set against a store.

use crate::db::StoreError;
use thiserror::Error;

/// Errors that can occur during tree operations
///
/// # Examples
///
/// ```rust
/// use folio_core::operations::TreeOperationError;
///
/// let err = TreeOperationError::node_not_found("page-1");
/// assert_eq!(err.to_string(), "Node 'page-1' does not exist in the tree");
/// ```
#[derive(Error, Debug)]
pub enum TreeOperationError {
    /// Referenced node is not part of the tree
    #[error("Node '{node_id}' does not exist in the tree")]
    NodeNotFound { node_id: String },

    /// The node to insert already has a position in the tree
    #[error("Node '{node_id}' is already part of tree '{root_id}'")]
    NodeAlreadyInTree { node_id: String, root_id: String },

    /// The tree changed between snapshot and commit
    ///
    /// Retriable: re-read the tree and plan the insertion again.
    #[error("Version conflict for tree '{root_id}': expected version {expected_version}, but current version is {actual_version}")]
    VersionConflict {
        root_id: String,
        expected_version: u64,
        actual_version: u64,
    },

    /// The nested-set encoding does not hold
    #[error("Corrupt bounds in tree '{root_id}': {reason}")]
    CorruptBounds { root_id: String, reason: String },

    /// Invalid operation attempted
    #[error("Invalid operation: {reason}")]
    InvalidOperation { reason: String },

    /// Store error other than a version conflict
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl TreeOperationError {
    pub fn node_not_found(node_id: impl Into<String>) -> Self {
        Self::NodeNotFound {
            node_id: node_id.into(),
        }
    }

    pub fn node_already_in_tree(node_id: impl Into<String>, root_id: impl Into<String>) -> Self {
        Self::NodeAlreadyInTree {
            node_id: node_id.into(),
            root_id: root_id.into(),
        }
    }

    pub fn version_conflict(root_id: impl Into<String>, expected: u64, actual: u64) -> Self {
        Self::VersionConflict {
            root_id: root_id.into(),
            expected_version: expected,
            actual_version: actual,
        }
    }

    pub fn corrupt_bounds(root_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CorruptBounds {
            root_id: root_id.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_operation(reason: impl Into<String>) -> Self {
        Self::InvalidOperation {
            reason: reason.into(),
        }
    }

    /// True for errors worth retrying with a fresh snapshot
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }
}

impl From<StoreError> for TreeOperationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::VersionConflict {
                root_id,
                expected_version,
                actual_version,
            } => Self::VersionConflict {
                root_id,
                expected_version,
                actual_version,
            },
            other => Self::Store(other),
        }
    }
}
