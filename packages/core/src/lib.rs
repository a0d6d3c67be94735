//! Folio Core
//!
//! Page tree and content revision core of the Folio content management
//! system.
//!
//! # Architecture
//!
//! - **Nested set**: pages form per-site trees encoded with left/right bounds;
//!   insertions are planned as pure change sets and committed with optimistic
//!   concurrency control
//! - **Query predicates**: online/visible/sibling filters render to DQL and
//!   evaluate in memory against the same parameters
//! - **Revisions**: editors work on drafts that are rebased on committed
//!   revisions with a three-way merge
//!
//! # Modules
//!
//! - [`models`] - Data structures (Page, TreeNode, ClassContent, Revision, etc.)
//! - [`operations`] - Nested-set planning and retrying tree insertion
//! - [`query`] - Page query builder and predicates
//! - [`db`] - Store traits, in-memory store and store events
//! - [`services`] - Page service, unit of work and revision reconciler
//! - [`builder`] - Page builder
//! - [`config`] - Configuration with environment overrides
//! - [`logging`] - Tracing subscriber setup

pub mod builder;
pub mod config;
pub mod db;
pub mod logging;
pub mod models;
pub mod operations;
pub mod query;
pub mod services;

// Re-export commonly used types
pub use builder::{BuilderError, PageBuilder, PersistMode};
pub use config::FolioConfig;
pub use models::*;
pub use services::*;
