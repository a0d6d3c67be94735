//! Persistence Layer
//!
//! Store traits consumed by the services, the in-memory implementation and
//! the events stores broadcast after applying a change:
//!
//! - [`PageStore`] for pages, page queries and nested-set trees
//! - [`ContentStore`] and [`RevisionStore`] for contents and their drafts
//! - [`MemoryStore`] implementing all three behind one `RwLock`

mod error;
pub mod events;
mod memory_store;
mod store;

pub use error::{StoreError, StoreResult};
pub use events::{StoreEvent, TreeChange};
pub use memory_store::{MemoryStore, DEFAULT_EVENT_CAPACITY};
pub use store::{ContentStore, PageStore, RevisionStore, TreeSnapshot};
