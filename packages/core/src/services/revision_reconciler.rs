//! Content Revision Reconciler
//!
//! Keeps contents consistent with their labels and revisions:
//!
//! - [`on_flush`](ContentRevisionReconciler::on_flush) derives labels of
//!   contents scheduled for insert or update from their `labelized-by` path
//! - [`on_update`](ContentRevisionReconciler::on_update) rebases an editor's
//!   draft on the last committed revision
//! - [`checkout`](ContentRevisionReconciler::checkout) and
//!   [`commit`](ContentRevisionReconciler::commit) open and close a draft
//!
//! # Label paths
//!
//! A path such as `author->name` (or `author.name`) is walked from the
//! content through [`FieldAccess::get_field`]. Intermediate references are
//! resolved through the unit of work, which loads and tracks contents it does
//! not know yet. The last value becomes the label: scalars as text, a content
//! as its own label (or uid when it has none). Contents without a derived
//! label fall back to their `name` property.

use super::error::ContentServiceError;
use super::unit_of_work::{FlushListener, UnitOfWork};
use crate::db::{ContentStore, RevisionStore, StoreResult};
use crate::models::{
    ActorId, ClassContent, ContentRef, ContentState, FieldAccess, FieldValue, MergeOutcome, Revision,
    RevisionState, NAME_PROPERTY,
};
use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use std::sync::{Arc, OnceLock};

/// Split a label path on `->` or `.`
pub fn split_label_path(path: &str) -> Vec<&str> {
    static SEPARATOR: OnceLock<Regex> = OnceLock::new();
    let separator = SEPARATOR.get_or_init(|| Regex::new(r"\s*(?:->|\.)\s*").unwrap());
    separator
        .split(path.trim())
        .filter(|segment| !segment.is_empty())
        .collect()
}

pub struct ContentRevisionReconciler {
    contents: Arc<dyn ContentStore>,
    revisions: Arc<dyn RevisionStore>,
}

impl ContentRevisionReconciler {
    pub fn new(contents: Arc<dyn ContentStore>, revisions: Arc<dyn RevisionStore>) -> Self {
        Self {
            contents,
            revisions,
        }
    }

    /// Derive labels of every content scheduled for insert or update
    pub async fn on_flush(&self, uow: &mut UnitOfWork) -> Result<(), ContentServiceError> {
        for reference in uow.scheduled() {
            let Some(content) = uow.get(&reference).cloned() else {
                continue;
            };

            let mut label = content.label.clone();
            if let Some(path) = content.labelized_by() {
                label = resolve_label(uow, &content, path).await?;
            }
            if label.is_none() {
                label = content.property(NAME_PROPERTY).map(str::to_string);
            }

            if let Some(tracked) = uow.get_mut(&reference) {
                tracked.set_label(label);
            }
            uow.recompute_change_set(&reference);
        }
        Ok(())
    }

    /// Rebase the actor's draft of `content` on its last committed revision
    ///
    /// Checks run in order and nothing is mutated until all pass:
    ///
    /// 1. no actor: `Unauthorized`
    /// 2. no draft attached nor stored for the actor: `MissingRevision`
    /// 3. draft at revision 0 or at the content revision: `AlreadyUpToDate`
    /// 4. no committed revision matching the content revision: `MissingRevision`
    ///
    /// On success the rebased draft is attached to `content` and stored.
    pub async fn on_update(
        &self,
        content: &mut ClassContent,
        actor: Option<&ActorId>,
    ) -> Result<MergeOutcome, ContentServiceError> {
        let actor = actor.ok_or_else(|| ContentServiceError::unauthorized("content update"))?;
        let reference = content.reference();

        let draft = self.current_draft(content, &reference, actor).await?;
        if draft.revision == 0 || draft.revision == content.revision {
            return Err(ContentServiceError::already_up_to_date(
                reference,
                content.revision,
            ));
        }

        let committed = self
            .revisions
            .find_committed(&reference, content.revision)
            .await?
            .ok_or_else(|| {
                ContentServiceError::missing_revision(
                    reference.clone(),
                    format!("no committed revision {}", content.revision),
                )
            })?;

        content.set_draft(draft);
        let outcome = content.update_draft(&committed).unwrap_or_default();
        if let Some(rebased) = content.draft.clone() {
            self.revisions.save_revision(rebased).await?;
        }

        if outcome.has_conflicts() {
            tracing::warn!(
                "Draft of {} by '{}' rebased on revision {} with conflicts: {:?}",
                reference,
                actor,
                committed.revision,
                outcome.conflicts
            );
        } else {
            tracing::info!(
                "Draft of {} by '{}' rebased on revision {} ({} field(s) updated)",
                reference,
                actor,
                committed.revision,
                outcome.updated.len()
            );
        }
        Ok(outcome)
    }

    /// Open (or reopen) the actor's draft and attach it to `content`
    pub async fn checkout(
        &self,
        content: &mut ClassContent,
        actor: Option<&ActorId>,
    ) -> Result<Revision, ContentServiceError> {
        let actor = actor.ok_or_else(|| ContentServiceError::unauthorized("content checkout"))?;
        let draft = self.revisions.checkout(content, actor).await?;
        content.set_draft(draft.clone());
        Ok(draft)
    }

    /// Commit the actor's draft
    ///
    /// The content takes the draft data and its revision is bumped; the
    /// draft is stored as a COMMITTED revision and released. A draft based on
    /// an older revision must be rebased with
    /// [`on_update`](Self::on_update) first. The draft values win for
    /// conflicted fields.
    pub async fn commit(
        &self,
        content: &mut ClassContent,
        actor: Option<&ActorId>,
    ) -> Result<Revision, ContentServiceError> {
        let actor = actor.ok_or_else(|| ContentServiceError::unauthorized("content commit"))?;
        let reference = content.reference();

        let draft = self.current_draft(content, &reference, actor).await?;
        if draft.revision != content.revision {
            return Err(ContentServiceError::stale_draft(
                reference,
                draft.revision,
                content.revision,
            ));
        }

        let mut committed = draft;
        committed.revision = content.revision + 1;
        committed.state = RevisionState::Committed;
        committed.base = committed.data.clone();
        committed.modified_at = Utc::now();
        self.revisions.save_revision(committed.clone()).await?;

        content.data = committed.data.clone();
        content.stamp(committed.revision, ContentState::Normal);
        content.modified_at = committed.modified_at;
        content.release_draft();
        self.contents.save_content(content.clone()).await?;

        tracing::info!(
            "Committed {} at revision {} for '{}'",
            reference,
            committed.revision,
            actor
        );
        Ok(committed)
    }

    /// The draft attached to `content`, else the one stored for `actor`
    async fn current_draft(
        &self,
        content: &ClassContent,
        reference: &ContentRef,
        actor: &ActorId,
    ) -> Result<Revision, ContentServiceError> {
        if let Some(draft) = &content.draft {
            return Ok(draft.clone());
        }
        self.revisions
            .get_draft(reference, actor)
            .await?
            .ok_or_else(|| {
                ContentServiceError::missing_revision(
                    reference.clone(),
                    format!("no draft held by '{}'", actor),
                )
            })
    }
}

#[async_trait]
impl FlushListener for ContentRevisionReconciler {
    async fn on_flush(&self, uow: &mut UnitOfWork) -> Result<(), ContentServiceError> {
        ContentRevisionReconciler::on_flush(self, uow).await
    }
}

/// Walk `path` from `content`, resolving references through `uow`
async fn resolve_label(
    uow: &mut UnitOfWork,
    content: &ClassContent,
    path: &str,
) -> StoreResult<Option<String>> {
    let segments = split_label_path(path);
    let Some((last, intermediate)) = segments.split_last() else {
        return Ok(None);
    };

    let mut owner = content.clone();
    for segment in intermediate {
        let next = match owner.get_field(segment) {
            Some(FieldValue::Content(reference)) => uow.find(&reference).await?.cloned(),
            _ => None,
        };
        match next {
            Some(next) => owner = next,
            None => {
                tracing::warn!(
                    "Label path '{}' of {} breaks at '{}'",
                    path,
                    content.reference(),
                    segment
                );
                return Ok(None);
            }
        }
    }

    Ok(match owner.get_field(last) {
        Some(FieldValue::Content(reference)) => match uow.find(&reference).await? {
            Some(target) => target.label.clone().or_else(|| Some(target.uid.clone())),
            None => Some(reference.uid),
        },
        Some(value) => value.scalar_text(),
        None => None,
    })
}


#[cfg(test)]
#[path = "revision_reconciler_test.rs"]
mod revision_reconciler_test;
