//! Store Error Types
//!
//! Errors raised by page, content and revision stores. Service layers wrap
//! these into their own error types.

use crate::models::{ActorId, ContentRef};
use thiserror::Error;

/// Store operation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Page not found: {uid}")]
    PageNotFound { uid: String },

    #[error("Content not found: {reference}")]
    ContentNotFound { reference: ContentRef },

    /// The tree was modified since the snapshot the change was planned on
    #[error("Version conflict for tree '{root_id}': expected version {expected_version}, but current version is {actual_version}")]
    VersionConflict {
        root_id: String,
        expected_version: u64,
        actual_version: u64,
    },

    /// A second uncommitted draft for the same content and actor
    #[error("Actor '{owner}' already holds a draft of {content}")]
    DuplicateDraft { content: ContentRef, owner: ActorId },

    /// A tree change set does not fit the stored tree
    #[error("Tree change rejected for '{root_id}': {reason}")]
    TreeMismatch { root_id: String, reason: String },
}

impl StoreError {
    pub fn page_not_found(uid: impl Into<String>) -> Self {
        Self::PageNotFound { uid: uid.into() }
    }

    pub fn content_not_found(reference: ContentRef) -> Self {
        Self::ContentNotFound { reference }
    }

    pub fn version_conflict(root_id: impl Into<String>, expected: u64, actual: u64) -> Self {
        Self::VersionConflict {
            root_id: root_id.into(),
            expected_version: expected,
            actual_version: actual,
        }
    }

    pub fn duplicate_draft(content: ContentRef, owner: ActorId) -> Self {
        Self::DuplicateDraft { content, owner }
    }

    pub fn tree_mismatch(root_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TreeMismatch {
            root_id: root_id.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;
