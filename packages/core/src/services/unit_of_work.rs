//! Unit of Work
//!
//! Identity map and change tracking for contents during one flush cycle.
//!
//! - Contents are tracked by [`ContentRef`]; a reference resolves to at most
//!   one tracked instance.
//! - [`persist`](UnitOfWork::persist) schedules a new content for insertion;
//!   tracked contents whose data or label differ from their snapshot are
//!   scheduled for update by [`compute_change_sets`](UnitOfWork::compute_change_sets).
//! - [`flush`](UnitOfWork::flush) computes change sets, runs the flush
//!   listeners, writes every scheduled content and takes new snapshots.

use super::error::ContentServiceError;
use crate::db::{ContentStore, StoreResult};
use crate::models::{ClassContent, ContentRef, FieldValue};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Pseudo-field under which label changes appear in a change set
pub const LABEL_FIELD: &str = "@label";

/// Old and new value of one field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub old: Option<FieldValue>,
    pub new: Option<FieldValue>,
}

/// Field-level differences of one content against its snapshot
pub type ChangeSet = BTreeMap<String, FieldChange>;

/// Hook run during [`UnitOfWork::flush`], before anything is written
#[async_trait]
pub trait FlushListener: Send + Sync {
    async fn on_flush(&self, uow: &mut UnitOfWork) -> Result<(), ContentServiceError>;
}

#[derive(Debug, Clone, Default)]
struct Snapshot {
    data: BTreeMap<String, FieldValue>,
    label: Option<String>,
}

impl Snapshot {
    fn of(content: &ClassContent) -> Self {
        Self {
            data: content.data.clone(),
            label: content.label.clone(),
        }
    }
}

pub struct UnitOfWork {
    store: Arc<dyn ContentStore>,
    identity_map: HashMap<ContentRef, ClassContent>,
    snapshots: HashMap<ContentRef, Snapshot>,
    insertions: Vec<ContentRef>,
    updates: Vec<ContentRef>,
    change_sets: HashMap<ContentRef, ChangeSet>,
}

impl UnitOfWork {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self {
            store,
            identity_map: HashMap::new(),
            snapshots: HashMap::new(),
            insertions: Vec::new(),
            updates: Vec::new(),
            change_sets: HashMap::new(),
        }
    }

    /// Track a new content and schedule it for insertion
    pub fn persist(&mut self, content: ClassContent) -> ContentRef {
        let reference = content.reference();
        self.snapshots.insert(reference.clone(), Snapshot::default());
        self.identity_map.insert(reference.clone(), content);
        if !self.insertions.contains(&reference) {
            self.insertions.push(reference.clone());
        }
        reference
    }

    /// Track an already persisted content
    ///
    /// A content already tracked under the same reference is kept.
    pub fn track(&mut self, content: ClassContent) -> ContentRef {
        let reference = content.reference();
        if !self.identity_map.contains_key(&reference) {
            self.snapshots
                .insert(reference.clone(), Snapshot::of(&content));
            self.identity_map.insert(reference.clone(), content);
        }
        reference
    }

    pub fn contains(&self, reference: &ContentRef) -> bool {
        self.identity_map.contains_key(reference)
    }

    pub fn get(&self, reference: &ContentRef) -> Option<&ClassContent> {
        self.identity_map.get(reference)
    }

    pub fn get_mut(&mut self, reference: &ContentRef) -> Option<&mut ClassContent> {
        self.identity_map.get_mut(reference)
    }

    /// The tracked instance, loading and tracking it from the store if needed
    pub async fn find(&mut self, reference: &ContentRef) -> StoreResult<Option<&ClassContent>> {
        if !self.identity_map.contains_key(reference) {
            match self.store.find_content(reference).await? {
                Some(content) => {
                    tracing::debug!("Loaded untracked content {}", reference);
                    self.track(content);
                }
                None => return Ok(None),
            }
        }
        Ok(self.identity_map.get(reference))
    }

    pub fn is_scheduled_for_insert(&self, reference: &ContentRef) -> bool {
        self.insertions.contains(reference)
    }

    pub fn is_scheduled_for_update(&self, reference: &ContentRef) -> bool {
        self.updates.contains(reference)
    }

    pub fn scheduled_insertions(&self) -> &[ContentRef] {
        &self.insertions
    }

    pub fn scheduled_updates(&self) -> &[ContentRef] {
        &self.updates
    }

    /// Scheduled insertions followed by scheduled updates
    pub fn scheduled(&self) -> Vec<ContentRef> {
        self.insertions
            .iter()
            .chain(self.updates.iter())
            .cloned()
            .collect()
    }

    pub fn change_set(&self, reference: &ContentRef) -> Option<&ChangeSet> {
        self.change_sets.get(reference)
    }

    /// Diff every tracked content; dirty ones are scheduled for update
    pub fn compute_change_sets(&mut self) {
        let references: Vec<ContentRef> = self.identity_map.keys().cloned().collect();
        for reference in references {
            self.recompute_change_set(&reference);
            let dirty = self
                .change_sets
                .get(&reference)
                .is_some_and(|changes| !changes.is_empty());
            if dirty
                && !self.insertions.contains(&reference)
                && !self.updates.contains(&reference)
            {
                self.updates.push(reference);
            }
        }
    }

    /// Recompute the change set of one tracked content
    pub fn recompute_change_set(&mut self, reference: &ContentRef) {
        let (Some(content), Some(snapshot)) = (
            self.identity_map.get(reference),
            self.snapshots.get(reference),
        ) else {
            return;
        };

        let mut changes = ChangeSet::new();
        for key in content.data.keys().chain(snapshot.data.keys()) {
            let old = snapshot.data.get(key);
            let new = content.data.get(key);
            if old != new && !changes.contains_key(key) {
                changes.insert(
                    key.clone(),
                    FieldChange {
                        old: old.cloned(),
                        new: new.cloned(),
                    },
                );
            }
        }
        if content.label != snapshot.label {
            changes.insert(
                LABEL_FIELD.to_string(),
                FieldChange {
                    old: snapshot.label.clone().map(FieldValue::text),
                    new: content.label.clone().map(FieldValue::text),
                },
            );
        }
        self.change_sets.insert(reference.clone(), changes);
    }

    /// Run listeners and write every scheduled content
    ///
    /// Returns the number of contents written.
    pub async fn flush(
        &mut self,
        listeners: &[Arc<dyn FlushListener>],
    ) -> Result<usize, ContentServiceError> {
        self.compute_change_sets();
        for listener in listeners {
            listener.on_flush(self).await?;
        }

        let scheduled = self.scheduled();
        for reference in &scheduled {
            if let Some(content) = self.identity_map.get(reference) {
                self.store.save_content(content.clone()).await?;
                self.snapshots
                    .insert(reference.clone(), Snapshot::of(content));
            }
        }

        tracing::debug!(
            "Flushed {} content(s) ({} insert(s), {} update(s))",
            scheduled.len(),
            self.insertions.len(),
            self.updates.len()
        );
        self.insertions.clear();
        self.updates.clear();
        self.change_sets.clear();
        Ok(scheduled.len())
    }
}
