//! Content Revisions
//!
//! A revision is a snapshot of a content's data. Committed revisions form the
//! content history; an uncommitted revision is an editor's draft. At most one
//! uncommitted draft exists per (content, actor) pair; stores enforce this by
//! making checkout idempotent.
//!
//! # Draft rebasing
//!
//! A draft remembers the data it was checked out from (`base`). When the
//! content moved on in the meantime, [`Revision::merge_committed`] performs a
//! three-way merge:
//!
//! | draft vs base | committed vs base | result                       |
//! |---------------|-------------------|------------------------------|
//! | unchanged     | any               | committed value              |
//! | changed       | unchanged         | draft value                  |
//! | changed       | changed, equal    | draft value                  |
//! | changed       | changed, differs  | draft value, **conflicted**  |

use super::content::{ClassContent, ContentRef, FieldValue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Identifier of an authenticated actor (user token owner)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(pub String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of a revision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RevisionState {
    New,
    Modified,
    Committed,
    Deleted,
    Conflicted,
}

impl RevisionState {
    /// True for states that still belong to a draft
    pub fn is_uncommitted(self) -> bool {
        matches!(self, Self::New | Self::Modified | Self::Conflicted)
    }
}

/// Result of rebasing a draft on a committed revision
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Fields that took the committed value
    pub updated: BTreeSet<String>,
    /// Fields changed on both sides with different values
    pub conflicts: BTreeSet<String>,
}

impl MergeOutcome {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Revision {
    pub uid: String,
    pub content: ContentRef,
    pub owner: ActorId,
    /// Committed revision this snapshot is based on (or is, once committed)
    pub revision: i64,
    pub state: RevisionState,
    #[serde(default)]
    pub data: BTreeMap<String, FieldValue>,
    /// Data at checkout time, used for three-way merges
    #[serde(default)]
    pub base: BTreeMap<String, FieldValue>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl Revision {
    /// Check out a new draft of `content` for `owner`
    pub fn checkout(content: &ClassContent, owner: ActorId) -> Self {
        let now = Utc::now();
        Self {
            uid: Uuid::new_v4().to_string(),
            content: content.reference(),
            owner,
            revision: content.revision,
            state: RevisionState::New,
            data: content.data.clone(),
            base: content.data.clone(),
            created_at: now,
            modified_at: now,
        }
    }

    /// Snapshot `content` as a committed revision at its current revision number
    pub fn committed(content: &ClassContent, owner: ActorId) -> Self {
        let now = Utc::now();
        Self {
            uid: Uuid::new_v4().to_string(),
            content: content.reference(),
            owner,
            revision: content.revision,
            state: RevisionState::Committed,
            data: content.data.clone(),
            base: content.data.clone(),
            created_at: now,
            modified_at: now,
        }
    }

    pub fn is_committed(&self) -> bool {
        self.state == RevisionState::Committed
    }

    /// Edit a field of the draft
    pub fn set_data(&mut self, name: impl Into<String>, value: FieldValue) {
        self.data.insert(name.into(), value);
        if self.state == RevisionState::New {
            self.state = RevisionState::Modified;
        }
        self.modified_at = Utc::now();
    }

    /// Fields whose draft value differs from the checkout snapshot
    pub fn changed_fields(&self) -> BTreeSet<String> {
        self.data
            .keys()
            .chain(self.base.keys())
            .filter(|k| self.data.get(*k) != self.base.get(*k))
            .cloned()
            .collect()
    }

    /// Rebase this draft on `committed`
    ///
    /// After the merge the draft is based on `committed.revision`, its base
    /// snapshot is the committed data and its state is `Modified`, or
    /// `Conflicted` when a field changed differently on both sides.
    pub fn merge_committed(&mut self, committed: &Revision) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();
        let keys: BTreeSet<String> = self
            .data
            .keys()
            .chain(self.base.keys())
            .chain(committed.data.keys())
            .cloned()
            .collect();

        for key in keys {
            let base = self.base.get(&key);
            let mine = self.data.get(&key);
            let theirs = committed.data.get(&key);

            if mine == base {
                if theirs != mine {
                    match theirs {
                        Some(value) => {
                            self.data.insert(key.clone(), value.clone());
                        }
                        None => {
                            self.data.remove(&key);
                        }
                    }
                    outcome.updated.insert(key);
                }
            } else if theirs != base && theirs != mine {
                outcome.conflicts.insert(key);
            }
        }

        self.revision = committed.revision;
        self.base = committed.data.clone();
        self.state = if outcome.has_conflicts() {
            RevisionState::Conflicted
        } else {
            RevisionState::Modified
        };
        self.modified_at = Utc::now();
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article() -> ClassContent {
        let mut content = ClassContent::with_uid("Article", "a-1")
            .with_data("title", FieldValue::text("Draft title"))
            .with_data("body", FieldValue::text("Body"));
        content.revision = 1;
        content
    }

    #[test]
    fn test_checkout_snapshots_content() {
        let content = article();
        let draft = Revision::checkout(&content, ActorId::new("alice"));
        assert_eq!(draft.revision, 1);
        assert_eq!(draft.state, RevisionState::New);
        assert_eq!(draft.data, content.data);
        assert!(draft.changed_fields().is_empty());
    }

    #[test]
    fn test_set_data_marks_modified() {
        let mut draft = Revision::checkout(&article(), ActorId::new("alice"));
        draft.set_data("title", FieldValue::text("Mine"));
        assert_eq!(draft.state, RevisionState::Modified);
        assert_eq!(
            draft.changed_fields().into_iter().collect::<Vec<_>>(),
            vec!["title".to_string()]
        );
    }

    #[test]
    fn test_merge_takes_untouched_fields_from_committed() {
        let mut content = article();
        let mut draft = Revision::checkout(&content, ActorId::new("alice"));
        draft.set_data("title", FieldValue::text("Alice title"));

        content.data.insert("body".into(), FieldValue::text("Bob body"));
        content.revision = 2;
        let committed = Revision::committed(&content, ActorId::new("bob"));

        let outcome = draft.merge_committed(&committed);
        assert!(!outcome.has_conflicts());
        assert!(outcome.updated.contains("body"));
        assert_eq!(draft.revision, 2);
        assert_eq!(draft.state, RevisionState::Modified);
        assert_eq!(draft.data["title"], FieldValue::text("Alice title"));
        assert_eq!(draft.data["body"], FieldValue::text("Bob body"));
    }

    #[test]
    fn test_merge_detects_conflicts() {
        let mut content = article();
        let mut draft = Revision::checkout(&content, ActorId::new("alice"));
        draft.set_data("title", FieldValue::text("Alice title"));

        content.data.insert("title".into(), FieldValue::text("Bob title"));
        content.revision = 2;
        let committed = Revision::committed(&content, ActorId::new("bob"));

        let outcome = draft.merge_committed(&committed);
        assert!(outcome.conflicts.contains("title"));
        assert_eq!(draft.state, RevisionState::Conflicted);
        assert_eq!(draft.data["title"], FieldValue::text("Alice title"));
    }

    #[test]
    fn test_merge_same_change_on_both_sides_is_not_a_conflict() {
        let mut content = article();
        let mut draft = Revision::checkout(&content, ActorId::new("alice"));
        draft.set_data("title", FieldValue::text("Same"));

        content.data.insert("title".into(), FieldValue::text("Same"));
        content.revision = 2;
        let committed = Revision::committed(&content, ActorId::new("bob"));

        let outcome = draft.merge_committed(&committed);
        assert!(!outcome.has_conflicts());
        assert_eq!(draft.state, RevisionState::Modified);
    }

    #[test]
    fn test_merge_propagates_removed_fields() {
        let mut content = article();
        let mut draft = Revision::checkout(&content, ActorId::new("alice"));

        content.data.remove("body");
        content.revision = 2;
        let committed = Revision::committed(&content, ActorId::new("bob"));

        draft.merge_committed(&committed);
        assert!(!draft.data.contains_key("body"));
    }
}
