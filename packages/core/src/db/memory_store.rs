//! In-Memory Store
//!
//! `MemoryStore` keeps pages, contents and revisions behind a single tokio
//! `RwLock`. Tree commits take the write lock, check the tree version and
//! apply every record of the change set before releasing it, so readers never
//! observe a half-shifted tree.

use super::error::{StoreError, StoreResult};
use super::events::{StoreEvent, TreeChange};
use super::store::{ContentStore, PageStore, RevisionStore, TreeSnapshot};
use crate::config::EventsConfig;
use crate::models::{ActorId, ClassContent, ContentRef, Page, Revision};
use crate::operations::{NestedSet, TreeChangeSet};
use crate::query::{BoundResolver, PageQuery};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// Default broadcast capacity for store events
pub const DEFAULT_EVENT_CAPACITY: usize = 128;

#[derive(Debug, Default)]
struct State {
    pages: HashMap<String, Page>,
    /// Version per tree root
    versions: HashMap<String, u64>,
    contents: HashMap<ContentRef, ClassContent>,
    drafts: HashMap<(ContentRef, ActorId), Revision>,
    committed: HashMap<(ContentRef, i64), Revision>,
}

impl State {
    fn version(&self, root_id: &str) -> u64 {
        self.versions.get(root_id).copied().unwrap_or(0)
    }

    fn bump(&mut self, root_id: &str) -> u64 {
        let version = self.versions.entry(root_id.to_string()).or_insert(0);
        *version += 1;
        *version
    }
}

impl BoundResolver for State {
    fn left_bound(&self, page_uid: &str) -> Option<i64> {
        self.pages.get(page_uid).map(Page::left)
    }
}

#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
    event_tx: broadcast::Sender<StoreEvent>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_event_capacity(DEFAULT_EVENT_CAPACITY)
    }

    pub fn with_event_capacity(capacity: usize) -> Self {
        let (event_tx, _) = broadcast::channel(capacity.max(1));
        Self {
            state: Arc::new(RwLock::new(State::default())),
            event_tx,
        }
    }

    pub fn from_config(config: &EventsConfig) -> Self {
        Self::with_event_capacity(config.capacity)
    }

    /// Current version of the tree rooted at `root_id` (0 when unknown)
    pub async fn tree_version(&self, root_id: &str) -> u64 {
        self.state.read().await.version(root_id)
    }

    pub async fn page_count(&self) -> usize {
        self.state.read().await.pages.len()
    }

    /// Ignores errors if no subscribers
    fn emit_event(&self, event: StoreEvent) {
        let _ = self.event_tx.send(event);
    }
}

#[async_trait]
impl PageStore for MemoryStore {
    async fn get_page(&self, uid: &str) -> StoreResult<Option<Page>> {
        Ok(self.state.read().await.pages.get(uid).cloned())
    }

    async fn get_pages(&self, uids: &[String]) -> StoreResult<Vec<Page>> {
        let state = self.state.read().await;
        Ok(uids
            .iter()
            .filter_map(|uid| state.pages.get(uid).cloned())
            .collect())
    }

    async fn save_page(&self, mut page: Page) -> StoreResult<()> {
        let uid = page.uid().to_string();
        let root_id = {
            let mut state = self.state.write().await;
            let stored_node = state.pages.get(&uid).map(|p| p.node().clone());
            match stored_node {
                Some(node) => page.set_node(node),
                None if page.parent_id().is_some() || page.root_id() != uid => {
                    return Err(StoreError::tree_mismatch(
                        page.root_id(),
                        format!(
                            "new page '{}' is attached to a tree; insert it with commit_tree_change",
                            uid
                        ),
                    ));
                }
                None => {
                    state.bump(page.root_id());
                }
            }
            let root_id = page.root_id().to_string();
            state.pages.insert(uid.clone(), page);
            root_id
        };

        tracing::debug!("Saved page '{}' in tree '{}'", uid, root_id);
        self.emit_event(StoreEvent::PageSaved { uid, root_id });
        Ok(())
    }

    async fn query(&self, query: &PageQuery) -> StoreResult<Vec<Page>> {
        let state = self.state.read().await;
        let mut pages: Vec<Page> = state
            .pages
            .values()
            .filter(|page| query.matches(page, &*state))
            .cloned()
            .collect();
        drop(state);

        query.sort(&mut pages);
        tracing::debug!("Query matched {} page(s): {}", pages.len(), query.dql());
        Ok(pages)
    }

    async fn load_tree(&self, root_id: &str) -> StoreResult<TreeSnapshot> {
        let state = self.state.read().await;
        if !state.pages.contains_key(root_id) {
            return Err(StoreError::page_not_found(root_id));
        }
        let set = NestedSet::from_nodes(
            root_id,
            state
                .pages
                .values()
                .filter(|p| p.root_id() == root_id)
                .map(|p| p.node().clone()),
        );
        Ok(TreeSnapshot {
            set,
            version: state.version(root_id),
        })
    }

    async fn commit_tree_change(
        &self,
        change: &TreeChangeSet,
        expected_version: u64,
        mut page: Page,
    ) -> StoreResult<u64> {
        let root_id = change.root_id.as_str();
        if page.uid() != change.inserted.id() {
            return Err(StoreError::tree_mismatch(
                root_id,
                format!(
                    "page '{}' does not match inserted node '{}'",
                    page.uid(),
                    change.inserted.id()
                ),
            ));
        }

        let version = {
            let mut state = self.state.write().await;

            let actual = state.version(root_id);
            if actual != expected_version {
                return Err(StoreError::version_conflict(root_id, expected_version, actual));
            }
            if let Some(missing) = change
                .updated
                .iter()
                .find(|node| !state.pages.contains_key(node.id()))
            {
                return Err(StoreError::tree_mismatch(
                    root_id,
                    format!("shifted node '{}' is not stored", missing.id()),
                ));
            }
            if state.pages.contains_key(page.uid()) {
                return Err(StoreError::tree_mismatch(
                    root_id,
                    format!("page '{}' is already stored", page.uid()),
                ));
            }

            for node in &change.updated {
                if let Some(stored) = state.pages.get_mut(node.id()) {
                    stored.set_node(node.clone());
                }
            }
            page.set_node(change.inserted.clone());
            state.pages.insert(page.uid().to_string(), page);
            state.bump(root_id)
        };

        tracing::debug!(
            "Committed insertion of '{}' under '{}' (tree '{}' now v{})",
            change.inserted.id(),
            change.parent_id,
            root_id,
            version
        );
        self.emit_event(StoreEvent::TreeChanged(TreeChange {
            root_id: root_id.to_string(),
            parent_id: change.parent_id.clone(),
            inserted_id: change.inserted.id().to_string(),
            threshold: change.threshold,
            delta: change.delta,
            shifted: change.updated.len(),
            version,
        }));
        self.emit_event(StoreEvent::PageSaved {
            uid: change.inserted.id().to_string(),
            root_id: root_id.to_string(),
        });
        Ok(version)
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.event_tx.subscribe()
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn find_content(&self, reference: &ContentRef) -> StoreResult<Option<ClassContent>> {
        Ok(self.state.read().await.contents.get(reference).cloned())
    }

    async fn save_content(&self, content: ClassContent) -> StoreResult<()> {
        let reference = content.reference();
        let revision = content.revision;
        self.state
            .write()
            .await
            .contents
            .insert(reference.clone(), content);
        self.emit_event(StoreEvent::ContentSaved {
            reference,
            revision,
        });
        Ok(())
    }
}

#[async_trait]
impl RevisionStore for MemoryStore {
    async fn get_draft(
        &self,
        content: &ContentRef,
        owner: &ActorId,
    ) -> StoreResult<Option<Revision>> {
        let key = (content.clone(), owner.clone());
        Ok(self.state.read().await.drafts.get(&key).cloned())
    }

    async fn checkout(&self, content: &ClassContent, owner: &ActorId) -> StoreResult<Revision> {
        let key = (content.reference(), owner.clone());
        let draft = {
            let mut state = self.state.write().await;
            if let Some(existing) = state.drafts.get(&key) {
                return Ok(existing.clone());
            }
            let draft = Revision::checkout(content, owner.clone());
            state.drafts.insert(key, draft.clone());
            draft
        };

        tracing::debug!("Actor '{}' checked out {}", owner, draft.content);
        self.emit_event(StoreEvent::DraftCheckedOut {
            content: draft.content.clone(),
            owner: owner.clone(),
            revision_uid: draft.uid.clone(),
        });
        Ok(draft)
    }

    async fn find_committed(
        &self,
        content: &ContentRef,
        revision: i64,
    ) -> StoreResult<Option<Revision>> {
        let key = (content.clone(), revision);
        Ok(self.state.read().await.committed.get(&key).cloned())
    }

    async fn save_revision(&self, revision: Revision) -> StoreResult<()> {
        let key = (revision.content.clone(), revision.owner.clone());
        let event = StoreEvent::RevisionSaved {
            content: revision.content.clone(),
            revision: revision.revision,
            state: revision.state,
        };
        {
            let mut state = self.state.write().await;
            let held = state.drafts.get(&key).map(|d| d.uid.clone());

            if revision.is_committed() {
                if held.as_deref() == Some(revision.uid.as_str()) {
                    state.drafts.remove(&key);
                }
                state
                    .committed
                    .insert((revision.content.clone(), revision.revision), revision);
            } else {
                if held.is_some_and(|uid| uid != revision.uid) {
                    return Err(StoreError::duplicate_draft(key.0, key.1));
                }
                state.drafts.insert(key, revision);
            }
        }
        self.emit_event(event);
        Ok(())
    }
}
