//! Page Service - Tree Placement and Sibling Navigation
//!
//! This module ties the page store, the query builder and the retrying tree
//! insertion queue together:
//!
//! - Insertion as first or last child of a stored parent
//! - Sibling navigation (online/visible siblings, previous/next sibling)
//! - Hierarchy reads (children, descendants, ancestors) from the nested set
//!
//! # Previous and next siblings
//!
//! The previous/next predicates are inclusive: the page itself matches its
//! own bound. The helpers here run the query ordered by proximity and return
//! the first match that is not the page.

use crate::builder::PageBuilder;
use crate::config::FolioConfig;
use crate::db::{PageStore, StoreEvent};
use crate::models::{Page, TreeNode};
use crate::operations::{InsertPosition, NestedSet, TreeInsertQueue, TreeOperationError};
use crate::query::{Clock, PageQuery, PageQueryBuilder, SystemClock};
use std::sync::Arc;
use tokio::sync::broadcast;

pub struct PageService {
    store: Arc<dyn PageStore>,
    queue: TreeInsertQueue,
    clock: Arc<dyn Clock>,
    alias: String,
}

impl PageService {
    pub fn new(store: Arc<dyn PageStore>, config: &FolioConfig) -> Self {
        Self {
            queue: TreeInsertQueue::new(store.clone(), config.tree.clone()),
            store,
            clock: Arc::new(SystemClock),
            alias: config.query.alias.clone(),
        }
    }

    /// Replace the time source of online/visible queries
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &Arc<dyn PageStore> {
        &self.store
    }

    pub fn tree_queue(&self) -> &TreeInsertQueue {
        &self.queue
    }

    pub fn subscribe_to_events(&self) -> broadcast::Receiver<StoreEvent> {
        self.store.subscribe()
    }

    /// Fresh query builder using the configured alias and clock
    pub fn query_builder(&self) -> PageQueryBuilder {
        PageQueryBuilder::new(self.alias.clone()).with_clock(self.clock.clone())
    }

    /// Page builder persisting through this service's tree queue
    pub fn page_builder(&self) -> PageBuilder {
        PageBuilder::new().with_tree_queue(self.queue.clone())
    }

    pub async fn find(&self, uid: &str) -> Result<Option<Page>, TreeOperationError> {
        Ok(self.store.get_page(uid).await?)
    }

    pub async fn query(&self, query: &PageQuery) -> Result<Vec<Page>, TreeOperationError> {
        tracing::debug!("Running page query: {}", query.dql());
        Ok(self.store.query(query).await?)
    }

    /// Store `page` as the root of its own tree
    pub async fn save_root(&self, page: Page) -> Result<Page, TreeOperationError> {
        if !page.is_root() {
            return Err(TreeOperationError::invalid_operation(format!(
                "page '{}' is attached to '{}'",
                page.uid(),
                page.parent_id().unwrap_or_default()
            )));
        }
        self.store.save_page(page.clone()).await?;
        Ok(page)
    }

    pub async fn insert_as_first_child(
        &self,
        parent_id: &str,
        page: Page,
    ) -> Result<Page, TreeOperationError> {
        self.queue
            .insert_with_retry(parent_id, page, InsertPosition::FirstChild)
            .await
    }

    pub async fn insert_as_last_child(
        &self,
        parent_id: &str,
        page: Page,
    ) -> Result<Page, TreeOperationError> {
        self.queue
            .insert_with_retry(parent_id, page, InsertPosition::LastChild)
            .await
    }

    /// Online pages sharing `page`'s parent, in display order
    pub async fn online_siblings(&self, page: &Page) -> Result<Vec<Page>, TreeOperationError> {
        let query = self.query_builder().and_is_online_siblings_of(page).build();
        self.query(&query).await
    }

    /// Visible pages sharing `page`'s parent, in display order
    pub async fn visible_siblings(&self, page: &Page) -> Result<Vec<Page>, TreeOperationError> {
        let query = self.query_builder().and_is_visible_siblings_of(page).build();
        self.query(&query).await
    }

    pub async fn previous_online_sibling(
        &self,
        page: &Page,
    ) -> Result<Option<Page>, TreeOperationError> {
        let query = self
            .query_builder()
            .and_is_previous_online_sibling_of(page)
            .build();
        self.nearest_other(page, &query).await
    }

    pub async fn next_online_sibling(
        &self,
        page: &Page,
    ) -> Result<Option<Page>, TreeOperationError> {
        let query = self.query_builder().and_is_next_online_sibling_of(page).build();
        self.nearest_other(page, &query).await
    }

    pub async fn previous_visible_sibling(
        &self,
        page: &Page,
    ) -> Result<Option<Page>, TreeOperationError> {
        let query = self
            .query_builder()
            .and_is_previous_visible_sibling_of(page)
            .build();
        self.nearest_other(page, &query).await
    }

    pub async fn next_visible_sibling(
        &self,
        page: &Page,
    ) -> Result<Option<Page>, TreeOperationError> {
        let query = self
            .query_builder()
            .and_is_next_visible_sibling_of(page)
            .build();
        self.nearest_other(page, &query).await
    }

    /// Direct children of `uid`, in display order
    pub async fn children(&self, uid: &str) -> Result<Vec<Page>, TreeOperationError> {
        self.related(uid, |set, id| set.children(id)).await
    }

    /// Every page below `uid`, in display order
    pub async fn descendants(&self, uid: &str) -> Result<Vec<Page>, TreeOperationError> {
        self.related(uid, |set, id| set.descendants(id)).await
    }

    /// Every page above `uid`, root first
    pub async fn ancestors(&self, uid: &str) -> Result<Vec<Page>, TreeOperationError> {
        self.related(uid, |set, id| set.ancestors(id)).await
    }

    /// Check the nested-set encoding of the tree rooted at `root_id`
    pub async fn validate_tree(&self, root_id: &str) -> Result<(), TreeOperationError> {
        let snapshot = self.store.load_tree(root_id).await?;
        snapshot.set.validate()
    }

    async fn nearest_other(
        &self,
        page: &Page,
        query: &PageQuery,
    ) -> Result<Option<Page>, TreeOperationError> {
        let candidates = self.query(query).await?;
        Ok(candidates.into_iter().find(|p| p.uid() != page.uid()))
    }

    async fn related<F>(&self, uid: &str, select: F) -> Result<Vec<Page>, TreeOperationError>
    where
        F: for<'a> Fn(&'a NestedSet, &str) -> Vec<&'a TreeNode>,
    {
        let page = self
            .store
            .get_page(uid)
            .await?
            .ok_or_else(|| TreeOperationError::node_not_found(uid))?;
        let snapshot = self.store.load_tree(page.root_id()).await?;
        let ids: Vec<String> = select(&snapshot.set, uid)
            .into_iter()
            .map(|node| node.id().to_string())
            .collect();
        Ok(self.store.get_pages(&ids).await?)
    }
}

#[cfg(test)]
#[path = "page_service_test.rs"]
mod page_service_test;
