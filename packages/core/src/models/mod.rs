//! Data Models
//!
//! This module contains the core data structures used throughout Folio:
//!
//! - `TreeNode` - Nested-set position of a page
//! - `Page` - Page entity with state flags, scheduling and content-set
//! - `ClassContent` - Typed content elements and their field values
//! - `Revision` - Committed revisions and editor drafts
//! - `Site`, `Layout` - References owned by pages
//! - `WorkflowState` - Pre/post-online workflow stages

mod content;
mod page;
mod revision;
mod site;
mod tree_node;
mod workflow;

pub use content::{
    ClassContent, ContentColumn, ContentRef, ContentSet, ContentState, FieldAccess, FieldValue,
    CONTENT_SET_TYPE, LABELIZED_BY_PROPERTY, NAME_PROPERTY,
};
pub use page::{normalize_url, Page, PageState, ValidationError};
pub use revision::{ActorId, MergeOutcome, Revision, RevisionState};
pub use site::{Layout, LayoutZone, Site};
pub use tree_node::TreeNode;
pub use workflow::WorkflowState;
