//! Tree insertion with retry logic for optimistic concurrency control
//!
//! Inserting a page shifts the bounds of every node to its right, so two
//! writers inserting into the same tree conflict even when they target
//! different parents. The store rejects a commit planned on a stale snapshot;
//! this queue re-reads the tree and plans again, with exponential backoff.
//!
//! # Example
//!
//! ```rust
//! use folio_core::config::TreeConfig;
//! use folio_core::db::{MemoryStore, PageStore};
//! use folio_core::models::Page;
//! use folio_core::operations::{InsertPosition, TreeInsertQueue};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let store = Arc::new(MemoryStore::new());
//! store.save_page(Page::new(Some("root".into()))).await?;
//!
//! let queue = TreeInsertQueue::new(store, TreeConfig::default());
//! let child = queue
//!     .insert_with_retry("root", Page::new(None), InsertPosition::LastChild)
//!     .await?;
//! assert_eq!((child.left(), child.right()), (2, 3));
//! # Ok(())
//! # }
//! ```

use super::error::TreeOperationError;
use super::nested_set::InsertPosition;
use crate::config::TreeConfig;
use crate::db::PageStore;
use crate::models::Page;
use std::sync::Arc;

/// Inserts pages into nested-set trees, retrying on version conflicts
#[derive(Clone)]
pub struct TreeInsertQueue {
    store: Arc<dyn PageStore>,
    config: TreeConfig,
}

impl TreeInsertQueue {
    pub fn new(store: Arc<dyn PageStore>, config: TreeConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Insert `page` as first or last child of `parent_id`
    ///
    /// # Retry Behavior
    ///
    /// - **Retry on**: `TreeOperationError::VersionConflict` only
    /// - **Backoff**: exponential from `base_backoff_ms` (10ms, 20ms, 40ms, ...)
    /// - **Fresh data**: each attempt reloads the parent and the tree
    /// - **Other errors**: fail immediately
    ///
    /// # Returns
    ///
    /// The stored page carrying its new tree position.
    pub async fn insert_with_retry(
        &self,
        parent_id: &str,
        mut page: Page,
        position: InsertPosition,
    ) -> Result<Page, TreeOperationError> {
        let max_retries = self.config.max_retries;
        let mut attempt = 0;

        loop {
            match self.try_insert(parent_id, &page, position).await {
                Ok((node, version)) => {
                    if attempt > 0 {
                        tracing::debug!(
                            "Tree insertion succeeded after {} retry(ies) for page '{}'",
                            attempt,
                            page.uid()
                        );
                    }
                    tracing::info!(
                        "Inserted page '{}' as {:?} of '{}' at ({}, {}), tree '{}' v{}",
                        page.uid(),
                        position,
                        parent_id,
                        node.left(),
                        node.right(),
                        node.root_id(),
                        version
                    );
                    page.set_node(node);
                    return Ok(page);
                }

                Err(TreeOperationError::VersionConflict {
                    ref root_id,
                    expected_version,
                    actual_version,
                }) if attempt < max_retries => {
                    tracing::debug!(
                        "Version conflict on attempt {}/{} for tree '{}': expected v{}, got v{}. Retrying...",
                        attempt + 1,
                        max_retries + 1,
                        root_id,
                        expected_version,
                        actual_version
                    );
                    tokio::time::sleep(self.config.backoff(attempt)).await;
                    attempt += 1;
                }

                Err(e) => {
                    if e.is_retriable() {
                        tracing::warn!(
                            "Max retries ({}) exceeded inserting page '{}' under '{}'",
                            max_retries,
                            page.uid(),
                            parent_id
                        );
                    }
                    return Err(e);
                }
            }
        }
    }

    async fn try_insert(
        &self,
        parent_id: &str,
        page: &Page,
        position: InsertPosition,
    ) -> Result<(crate::models::TreeNode, u64), TreeOperationError> {
        let parent = self
            .store
            .get_page(parent_id)
            .await?
            .ok_or_else(|| TreeOperationError::node_not_found(parent_id))?;

        let snapshot = self.store.load_tree(parent.root_id()).await?;
        let change = snapshot.set.plan_insert(parent_id, page.uid(), position)?;
        let version = self
            .store
            .commit_tree_change(&change, snapshot.version, page.clone())
            .await?;
        Ok((change.inserted, version))
    }
}
