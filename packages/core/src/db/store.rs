//! Store Traits - Persistence Abstraction
//!
//! The services depend on three narrow async traits rather than on a concrete
//! backend:
//!
//! - [`PageStore`]: pages, page queries and nested-set trees
//! - [`ContentStore`]: content elements
//! - [`RevisionStore`]: drafts and committed revisions
//!
//! [`MemoryStore`](super::MemoryStore) implements all three.
//!
//! # Tree commits
//!
//! Each tree root carries a version. A writer reads a [`TreeSnapshot`], plans
//! a change set against it and commits with the snapshot version. The commit
//! is applied atomically or rejected with
//! [`StoreError::VersionConflict`](super::StoreError::VersionConflict) when the
//! tree moved in the meantime.
//!
//! # Examples
//!
//! ```rust
//! use folio_core::db::{MemoryStore, PageStore};
//! use folio_core::models::Page;
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let store = MemoryStore::new();
//! store.save_page(Page::new(Some("root".into()))).await?;
//!
//! let snapshot = store.load_tree("root").await?;
//! assert_eq!(snapshot.set.len(), 1);
//! # Ok(())
//! # }
//! ```

use super::error::StoreResult;
use super::events::StoreEvent;
use crate::models::{ActorId, ClassContent, ContentRef, Page, Revision};
use crate::operations::{NestedSet, TreeChangeSet};
use crate::query::PageQuery;
use async_trait::async_trait;
use tokio::sync::broadcast;

/// A tree read at a given version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeSnapshot {
    pub set: NestedSet,
    pub version: u64,
}

#[async_trait]
pub trait PageStore: Send + Sync {
    async fn get_page(&self, uid: &str) -> StoreResult<Option<Page>>;

    /// Pages for the given uids, in the given order; unknown uids are skipped
    async fn get_pages(&self, uids: &[String]) -> StoreResult<Vec<Page>>;

    /// Insert or update a page
    ///
    /// A new page must be the root of its own tree; pages attached to a
    /// tree go through [`commit_tree_change`] and fail here with
    /// `TreeMismatch`. An existing page keeps its stored position, which only
    /// [`commit_tree_change`] moves.
    ///
    /// [`commit_tree_change`]: PageStore::commit_tree_change
    async fn save_page(&self, page: Page) -> StoreResult<()>;

    /// Pages matching `query`, ordered by it
    ///
    /// Deferred bound parameters are resolved against the stored trees at
    /// execution time.
    async fn query(&self, query: &PageQuery) -> StoreResult<Vec<Page>>;

    /// Current nested set and version of the tree rooted at `root_id`
    async fn load_tree(&self, root_id: &str) -> StoreResult<TreeSnapshot>;

    /// Apply `change` and store `page` at its inserted position, atomically
    ///
    /// Returns the new tree version. Fails with `VersionConflict` when the
    /// tree version is not `expected_version`.
    async fn commit_tree_change(
        &self,
        change: &TreeChangeSet,
        expected_version: u64,
        page: Page,
    ) -> StoreResult<u64>;

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent>;
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn find_content(&self, reference: &ContentRef) -> StoreResult<Option<ClassContent>>;

    async fn save_content(&self, content: ClassContent) -> StoreResult<()>;
}

#[async_trait]
pub trait RevisionStore: Send + Sync {
    /// Uncommitted draft of `content` held by `owner`
    async fn get_draft(
        &self,
        content: &ContentRef,
        owner: &ActorId,
    ) -> StoreResult<Option<Revision>>;

    /// Draft of `content` for `owner`, created on first call
    ///
    /// Repeated calls return the same draft.
    async fn checkout(&self, content: &ClassContent, owner: &ActorId) -> StoreResult<Revision>;

    /// Committed revision `revision` of `content`
    async fn find_committed(
        &self,
        content: &ContentRef,
        revision: i64,
    ) -> StoreResult<Option<Revision>>;

    /// Store a revision
    ///
    /// An uncommitted revision replaces the owner's draft with the same uid;
    /// a different uid fails with `DuplicateDraft`. A committed revision is
    /// added to the history and releases the owner's draft with the same uid.
    async fn save_revision(&self, revision: Revision) -> StoreResult<()>;
}
