//! Tree Operations
//!
//! Nested-set planning ([`NestedSet`]), the errors it raises and the
//! retrying insertion queue that commits plans against a
//! [`PageStore`](crate::db::PageStore).

mod error;
pub mod nested_set;
pub mod tree_queue;

pub use error::TreeOperationError;
pub use nested_set::{InsertPosition, NestedSet, TreeChangeSet};
pub use tree_queue::TreeInsertQueue;
