//! Page Assembly
//!
//! [`PageBuilder`] stages page configuration and content elements, then
//! assembles (and optionally places) a page in one step.

mod page_builder;

pub use page_builder::{BuilderError, PageBuilder, PersistMode, StagedElement};
