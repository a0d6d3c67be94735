//! Page Builder
//!
//! Stages everything a page needs, then [`build`](PageBuilder::build)s it:
//!
//! - site, layout and title are required; everything else is optional
//! - staged elements are pushed into their content-set column, at most one of
//!   them flagged as the page's main node
//! - every content of the new content-set is stamped revision 1, NORMAL
//! - with a persist mode and a parent, the page is spliced into the parent's
//!   tree through a [`TreeInsertQueue`]
//!
//! A successful build resets the builder. A failed build keeps the staged
//! configuration so the caller can complete it and retry.
//!
//! # Example
//!
//! ```rust
//! use folio_core::builder::PageBuilder;
//! use folio_core::models::{Layout, Site};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # tokio_test::block_on(async {
//! let mut builder = PageBuilder::new();
//! let page = builder
//!     .set_site(Site::new("www"))
//!     .set_layout(Layout::new("default"), None)
//!     .set_title("Home")
//!     .set_url("//home//")
//!     .put_online_and_visible()
//!     .build()
//!     .await?;
//!
//! assert_eq!(page.url(), Some("/home/"));
//! assert!(builder.title().is_none());
//! # Ok::<(), folio_core::builder::BuilderError>(())
//! # })?;
//! # Ok(())
//! # }
//! ```

use crate::models::{
    ClassContent, ContentState, Layout, Page, PageState, Site, ValidationError, WorkflowState,
};
use crate::operations::{InsertPosition, TreeInsertQueue, TreeOperationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by [`PageBuilder`]
#[derive(Error, Debug)]
pub enum BuilderError {
    #[error("Invalid page: {0}")]
    Validation(#[from] ValidationError),

    #[error("Tree insertion failed: {0}")]
    Tree(#[from] TreeOperationError),
}

/// How a built page is placed in its parent's tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistMode {
    /// Build only; the tree is left untouched
    #[default]
    NoPersist,
    FirstChild,
    LastChild,
}

impl PersistMode {
    pub fn position(self) -> Option<InsertPosition> {
        match self {
            Self::NoPersist => None,
            Self::FirstChild => Some(InsertPosition::FirstChild),
            Self::LastChild => Some(InsertPosition::LastChild),
        }
    }
}

/// A content element waiting to be pushed into a content-set column
#[derive(Debug, Clone, PartialEq)]
pub struct StagedElement {
    pub content: ClassContent,
    /// Make the built page the element's main node
    pub set_main_node: bool,
    /// Content-set column receiving the element
    pub column: usize,
}

#[derive(Debug, Clone, Default)]
struct Staged {
    uid: Option<String>,
    title: Option<String>,
    url: Option<String>,
    redirect: Option<String>,
    target: Option<String>,
    alt_title: Option<String>,
    site: Option<Site>,
    root: Option<Page>,
    parent: Option<Page>,
    layout: Option<Layout>,
    main_zone_item: Option<ClassContent>,
    state: Option<PageState>,
    publishing: Option<DateTime<Utc>>,
    created: Option<DateTime<Utc>>,
    archiving: Option<DateTime<Utc>>,
    workflow_state: Option<WorkflowState>,
    elements: Vec<StagedElement>,
    persist: PersistMode,
}

/// One-shot page assembler; see the [module docs](self)
#[derive(Default)]
pub struct PageBuilder {
    tree: Option<TreeInsertQueue>,
    staged: Staged,
}

impl std::fmt::Debug for PageBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageBuilder")
            .field("has_tree_queue", &self.tree.is_some())
            .field("staged", &self.staged)
            .finish()
    }
}

impl PageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue used to place pages built with a persist mode
    pub fn with_tree_queue(mut self, queue: TreeInsertQueue) -> Self {
        self.tree = Some(queue);
        self
    }

    pub fn set_uid(&mut self, uid: impl Into<String>) -> &mut Self {
        self.staged.uid = Some(uid.into());
        self
    }

    pub fn uid(&self) -> Option<&str> {
        self.staged.uid.as_deref()
    }

    pub fn set_title(&mut self, title: impl Into<String>) -> &mut Self {
        self.staged.title = Some(title.into());
        self
    }

    pub fn title(&self) -> Option<&str> {
        self.staged.title.as_deref()
    }

    /// Set the url; runs of `/` collapse into one
    pub fn set_url(&mut self, url: &str) -> &mut Self {
        self.staged.url = Some(crate::models::normalize_url(url));
        self
    }

    pub fn url(&self) -> Option<&str> {
        self.staged.url.as_deref()
    }

    pub fn set_redirect(&mut self, redirect: impl Into<String>) -> &mut Self {
        self.staged.redirect = Some(redirect.into());
        self
    }

    pub fn redirect(&self) -> Option<&str> {
        self.staged.redirect.as_deref()
    }

    pub fn set_target(&mut self, target: impl Into<String>) -> &mut Self {
        self.staged.target = Some(target.into());
        self
    }

    pub fn target(&self) -> Option<&str> {
        self.staged.target.as_deref()
    }

    pub fn set_alt_title(&mut self, alt_title: impl Into<String>) -> &mut Self {
        self.staged.alt_title = Some(alt_title.into());
        self
    }

    pub fn alt_title(&self) -> Option<&str> {
        self.staged.alt_title.as_deref()
    }

    pub fn set_site(&mut self, site: Site) -> &mut Self {
        self.staged.site = Some(site);
        self
    }

    pub fn site(&self) -> Option<&Site> {
        self.staged.site.as_ref()
    }

    /// Set the tree root; a top-level page also gets `root` as parent
    pub fn set_root(&mut self, root: Page, is_top_level: bool) -> &mut Self {
        if is_top_level {
            self.staged.parent = Some(root.clone());
        }
        self.staged.root = Some(root);
        self
    }

    pub fn root(&self) -> Option<&Page> {
        self.staged.root.as_ref()
    }

    pub fn set_parent(&mut self, parent: Page) -> &mut Self {
        self.staged.parent = Some(parent);
        self
    }

    pub fn parent(&self) -> Option<&Page> {
        self.staged.parent.as_ref()
    }

    /// Set the layout and the item pushed into its main zone
    pub fn set_layout(&mut self, layout: Layout, main_zone_item: Option<ClassContent>) -> &mut Self {
        self.staged.layout = Some(layout);
        self.staged.main_zone_item = main_zone_item;
        self
    }

    pub fn layout(&self) -> Option<&Layout> {
        self.staged.layout.as_ref()
    }

    pub fn main_zone_item(&self) -> Option<&ClassContent> {
        self.staged.main_zone_item.as_ref()
    }

    pub fn set_state(&mut self, state: PageState) -> &mut Self {
        self.staged.state = Some(state);
        self
    }

    pub fn state(&self) -> Option<PageState> {
        self.staged.state
    }

    pub fn put_online_and_visible(&mut self) -> &mut Self {
        self.set_state(PageState::ONLINE)
    }

    pub fn put_online_and_hidden(&mut self) -> &mut Self {
        self.set_state(PageState::ONLINE | PageState::HIDDEN)
    }

    pub fn published_at(&mut self, publishing: Option<DateTime<Utc>>) -> &mut Self {
        self.staged.publishing = publishing;
        self
    }

    /// Alias of [`published_at`](Self::published_at)
    pub fn set_publishing(&mut self, publishing: Option<DateTime<Utc>>) -> &mut Self {
        self.published_at(publishing)
    }

    pub fn publishing(&self) -> Option<DateTime<Utc>> {
        self.staged.publishing
    }

    pub fn created_at(&mut self, created: DateTime<Utc>) -> &mut Self {
        self.staged.created = Some(created);
        self
    }

    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.staged.created
    }

    pub fn set_archiving(&mut self, archiving: Option<DateTime<Utc>>) -> &mut Self {
        self.staged.archiving = archiving;
        self
    }

    pub fn archiving(&self) -> Option<DateTime<Utc>> {
        self.staged.archiving
    }

    pub fn set_workflow_state(&mut self, state: Option<WorkflowState>) -> &mut Self {
        self.staged.workflow_state = state;
        self
    }

    pub fn workflow_state(&self) -> Option<&WorkflowState> {
        self.staged.workflow_state.as_ref()
    }

    /// Stage an element at the end of the element list
    pub fn push_element(
        &mut self,
        content: ClassContent,
        set_main_node: bool,
        column: usize,
    ) -> &mut Self {
        self.staged.elements.push(StagedElement {
            content,
            set_main_node,
            column,
        });
        self
    }

    /// Stage an element, replacing the one at `index` when given
    ///
    /// Fails when `index` does not address a staged element.
    pub fn add_element(
        &mut self,
        content: ClassContent,
        index: Option<usize>,
        set_main_node: bool,
        column: usize,
    ) -> Result<&mut Self, ValidationError> {
        let element = StagedElement {
            content,
            set_main_node,
            column,
        };
        match index {
            Some(index) => {
                let slot = self
                    .staged
                    .elements
                    .get_mut(index)
                    .ok_or(ValidationError::UnknownElementIndex(index))?;
                *slot = element;
            }
            None => self.staged.elements.push(element),
        }
        Ok(self)
    }

    pub fn get_element(&self, index: usize) -> Option<&StagedElement> {
        self.staged.elements.get(index)
    }

    pub fn elements(&self) -> &[StagedElement] {
        &self.staged.elements
    }

    pub fn clear_elements(&mut self) -> &mut Self {
        self.staged.elements.clear();
        self
    }

    pub fn set_persist_mode(&mut self, mode: PersistMode) -> &mut Self {
        self.staged.persist = mode;
        self
    }

    pub fn persist_mode(&self) -> PersistMode {
        self.staged.persist
    }

    /// Assemble the staged page, place it when asked to, then reset
    pub async fn build(&mut self) -> Result<Page, BuilderError> {
        let page = self.assemble()?;

        let page = match (self.staged.persist.position(), &self.staged.parent) {
            (Some(position), Some(parent)) => {
                let queue = self.tree.as_ref().ok_or_else(|| {
                    TreeOperationError::invalid_operation(
                        "persist mode set but builder has no tree queue",
                    )
                })?;
                queue
                    .insert_with_retry(parent.uid(), page, position)
                    .await?
            }
            _ => page,
        };

        tracing::debug!(
            "Built page '{}' ({}), persist mode {:?}",
            page.uid(),
            page.title,
            self.staged.persist
        );
        self.reset();
        Ok(page)
    }

    /// Drop every staged value; the tree queue is kept
    pub fn reset(&mut self) {
        self.staged = Staged::default();
    }

    fn assemble(&self) -> Result<Page, ValidationError> {
        let staged = &self.staged;
        let site = staged
            .site
            .clone()
            .ok_or_else(|| ValidationError::MissingField("site".into()))?;
        let layout = staged
            .layout
            .clone()
            .ok_or_else(|| ValidationError::MissingField("layout".into()))?;
        let title = staged
            .title
            .clone()
            .ok_or_else(|| ValidationError::MissingField("title".into()))?;

        let available = layout.column_count();
        if let Some(element) = staged.elements.iter().find(|e| e.column >= available) {
            return Err(ValidationError::UnknownColumn {
                column: element.column,
                available,
            });
        }
        let main_nodes = staged.elements.iter().filter(|e| e.set_main_node).count();
        if main_nodes > 1 {
            return Err(ValidationError::DuplicateMainNode(main_nodes));
        }

        let mut page = Page::new(staged.uid.clone());
        page.title = title;
        page.site = Some(site);
        if let Some(root) = &staged.root {
            page.set_root(root);
        }
        if let Some(parent) = &staged.parent {
            page.set_parent(parent);
        }
        page.set_layout(layout, staged.main_zone_item.clone());

        if let Some(url) = &staged.url {
            page.set_url(url);
        }
        if staged.redirect.is_some() {
            page.redirect = staged.redirect.clone();
        }
        if staged.target.is_some() {
            page.target = staged.target.clone();
        }
        if staged.alt_title.is_some() {
            page.alt_title = staged.alt_title.clone();
        }
        if let Some(state) = staged.state {
            page.set_state(state);
        }
        if staged.publishing.is_some() {
            page.publishing = staged.publishing;
        }
        if let Some(created) = staged.created {
            page.created = created;
        }
        if staged.archiving.is_some() {
            page.archiving = staged.archiving;
        }
        if staged.workflow_state.is_some() {
            page.set_workflow_state(staged.workflow_state.clone());
        }

        let page_uid = page.uid().to_string();
        for element in &staged.elements {
            let mut content = element.content.clone();
            if element.set_main_node {
                content.set_main_node(page_uid.clone());
            }
            if let Some(column) = page.content_set.item_mut(element.column) {
                column.push(content);
            }
        }
        page.content_set
            .for_each_content_mut(|content| content.stamp(1, ContentState::Normal));

        Ok(page)
    }
}
