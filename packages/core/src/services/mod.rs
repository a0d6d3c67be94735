//! Business Services
//!
//! This module contains the services built on top of the stores:
//!
//! - `PageService` - Tree placement, sibling navigation and hierarchy reads
//! - `UnitOfWork` - Identity map and change sets of contents during a flush
//! - `ContentRevisionReconciler` - Label derivation, draft rebasing and commits
//!
//! Services coordinate between the store layer and callers, enforcing the
//! authorization and revision rules of content editing.

pub mod error;
pub mod page_service;
pub mod revision_reconciler;
pub mod unit_of_work;

pub use error::ContentServiceError;
pub use page_service::PageService;
pub use revision_reconciler::{split_label_path, ContentRevisionReconciler};
pub use unit_of_work::{ChangeSet, FieldChange, FlushListener, UnitOfWork, LABEL_FIELD};
