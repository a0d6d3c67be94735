//! Service Layer Error Types
//!
//! Errors raised while reconciling contents with their revisions.

use crate::db::StoreError;
use crate::models::ContentRef;
use thiserror::Error;

/// Content service errors
///
/// `AlreadyUpToDate` is benign: the draft has nothing to rebase and callers
/// usually treat it as success.
#[derive(Error, Debug)]
pub enum ContentServiceError {
    /// No authenticated actor for an operation that requires one
    #[error("Unauthorized: {action} requires an authenticated actor")]
    Unauthorized { action: String },

    /// Draft or committed revision could not be found
    #[error("Missing revision for {content}: {reason}")]
    MissingRevision { content: ContentRef, reason: String },

    /// Draft already based on the content's current revision
    #[error("Content {content} is up to date at revision {revision}")]
    AlreadyUpToDate { content: ContentRef, revision: i64 },

    /// Draft based on an older revision than the content's
    #[error("Draft of {content} is based on revision {draft_revision}, content is at {content_revision}")]
    StaleDraft {
        content: ContentRef,
        draft_revision: i64,
        content_revision: i64,
    },

    #[error("Store operation failed: {0}")]
    Store(#[from] StoreError),
}

impl ContentServiceError {
    pub fn unauthorized(action: impl Into<String>) -> Self {
        Self::Unauthorized {
            action: action.into(),
        }
    }

    pub fn missing_revision(content: ContentRef, reason: impl Into<String>) -> Self {
        Self::MissingRevision {
            content,
            reason: reason.into(),
        }
    }

    pub fn already_up_to_date(content: ContentRef, revision: i64) -> Self {
        Self::AlreadyUpToDate { content, revision }
    }

    pub fn stale_draft(content: ContentRef, draft_revision: i64, content_revision: i64) -> Self {
        Self::StaleDraft {
            content,
            draft_revision,
            content_revision,
        }
    }

    pub fn is_up_to_date(&self) -> bool {
        matches!(self, Self::AlreadyUpToDate { .. })
    }
}
