//! Store Events
//!
//! Events emitted by stores after a change is applied. Subscribers receive
//! them through a tokio broadcast channel; a store with no subscribers drops
//! them silently.

use crate::models::{ActorId, ContentRef, RevisionState};
use serde::{Deserialize, Serialize};

/// Payload of a committed tree insertion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeChange {
    pub root_id: String,
    pub parent_id: String,
    pub inserted_id: String,
    /// Bounds strictly above this value moved by `delta`
    pub threshold: i64,
    pub delta: i64,
    /// Number of existing records whose bounds moved
    pub shifted: usize,
    /// Tree version after the change
    pub version: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StoreEvent {
    #[serde(rename_all = "camelCase")]
    PageSaved { uid: String, root_id: String },

    TreeChanged(TreeChange),

    #[serde(rename_all = "camelCase")]
    ContentSaved { reference: ContentRef, revision: i64 },

    #[serde(rename_all = "camelCase")]
    DraftCheckedOut {
        content: ContentRef,
        owner: ActorId,
        revision_uid: String,
    },

    #[serde(rename_all = "camelCase")]
    RevisionSaved {
        content: ContentRef,
        revision: i64,
        state: RevisionState,
    },
}

impl StoreEvent {
    /// Get a string representation of the event type
    pub fn event_type(&self) -> &str {
        match self {
            StoreEvent::PageSaved { .. } => "page:saved",
            StoreEvent::TreeChanged(_) => "tree:changed",
            StoreEvent::ContentSaved { .. } => "content:saved",
            StoreEvent::DraftCheckedOut { .. } => "draft:checked-out",
            StoreEvent::RevisionSaved { .. } => "revision:saved",
        }
    }
}
