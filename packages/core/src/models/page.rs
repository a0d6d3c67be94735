//! Page Entity
//!
//! A page is a node of a site's nested-set tree plus everything needed to
//! render it: layout, content-set, url, scheduling and state flags.
//!
//! # Online and visible
//!
//! - **online**: `state` intersects [`PageState::ONLINE`], and
//!   `publishing` is unset or in the past, and `archiving` is unset or in the
//!   future
//! - **visible**: online and `state` is exactly [`PageState::ONLINE`]
//!   (no HIDDEN bit)
//!
//! # Examples
//!
//! ```rust
//! use folio_core::models::{Page, PageState};
//! use chrono::Utc;
//!
//! let mut page = Page::new(None);
//! page.set_state(PageState::ONLINE | PageState::HIDDEN);
//! assert!(page.is_online_at(Utc::now()));
//! assert!(!page.is_visible_at(Utc::now()));
//! ```

use super::content::{ClassContent, ContentSet};
use super::site::{Layout, Site};
use super::tree_node::TreeNode;
use super::workflow::WorkflowState;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};
use std::sync::OnceLock;
use thiserror::Error;
use uuid::Uuid;

/// Validation errors for model construction and assembly
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("No staged element at index {0}")]
    UnknownElementIndex(usize),

    #[error("Layout has no column {column} (columns: {available})")]
    UnknownColumn { column: usize, available: usize },

    #[error("Only one element can be flagged as main node, found {0}")]
    DuplicateMainNode(usize),

    #[error("Invalid page state bits: {0}")]
    InvalidState(u8),

    #[error("Invalid workflow state: {0}")]
    InvalidWorkflowState(String),
}

/// Page state flags
///
/// States compose: `ONLINE | HIDDEN` is an online page left out of menus.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageState(u8);

impl PageState {
    pub const OFFLINE: Self = Self(0);
    pub const ONLINE: Self = Self(1);
    pub const HIDDEN: Self = Self(2);
    pub const DELETED: Self = Self(4);

    const KNOWN_BITS: u8 = 1 | 2 | 4;

    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Build a state from raw bits, rejecting unknown bits
    pub fn from_bits(bits: u8) -> Result<Self, ValidationError> {
        if bits & !Self::KNOWN_BITS != 0 {
            return Err(ValidationError::InvalidState(bits));
        }
        Ok(Self(bits))
    }

    /// True when every bit of `other` is set
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// True when at least one bit is shared
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    pub const fn is_offline(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for PageState {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for PageState {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for PageState {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Debug for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_offline() {
            return f.write_str("OFFLINE");
        }
        let names: Vec<&str> = [
            (Self::ONLINE, "ONLINE"),
            (Self::HIDDEN, "HIDDEN"),
            (Self::DELETED, "DELETED"),
        ]
        .iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, name)| *name)
        .collect();
        f.write_str(&names.join(" | "))
    }
}

/// Collapse runs of `/` into a single separator
pub fn normalize_url(url: &str) -> String {
    static SLASHES: OnceLock<Regex> = OnceLock::new();
    let slashes = SLASHES.get_or_init(|| Regex::new(r"/+").unwrap());
    slashes.replace_all(url, "/").into_owned()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    uid: String,
    pub title: String,
    pub alt_title: Option<String>,
    url: Option<String>,
    pub redirect: Option<String>,
    pub target: Option<String>,
    /// Owning site; always set on pages produced by the builder
    pub site: Option<Site>,
    /// Layout; always set on pages produced by the builder
    layout: Option<Layout>,
    pub content_set: ContentSet,
    pub state: PageState,
    pub publishing: Option<DateTime<Utc>>,
    pub archiving: Option<DateTime<Utc>>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub workflow_state: Option<WorkflowState>,
    node: TreeNode,
}

impl Page {
    /// Create an offline, single-node page
    ///
    /// A uid is generated when none is given.
    pub fn new(uid: Option<String>) -> Self {
        let uid = uid.unwrap_or_else(|| Uuid::new_v4().simple().to_string());
        let now = Utc::now();
        Self {
            node: TreeNode::new_root(uid.clone()),
            uid,
            title: String::new(),
            alt_title: None,
            url: None,
            redirect: None,
            target: None,
            site: None,
            layout: None,
            content_set: ContentSet::default(),
            state: PageState::OFFLINE,
            publishing: None,
            archiving: None,
            created: now,
            modified: now,
            workflow_state: None,
        }
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn node(&self) -> &TreeNode {
        &self.node
    }

    pub(crate) fn node_mut(&mut self) -> &mut TreeNode {
        &mut self.node
    }

    /// Replace the tree position with a record coming from a tree change set
    pub(crate) fn set_node(&mut self, node: TreeNode) {
        debug_assert_eq!(node.id(), self.uid);
        self.node = node;
    }

    pub fn left(&self) -> i64 {
        self.node.left()
    }

    pub fn right(&self) -> i64 {
        self.node.right()
    }

    pub fn level(&self) -> i64 {
        self.node.level()
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.node.parent_id()
    }

    pub fn root_id(&self) -> &str {
        self.node.root_id()
    }

    pub fn is_root(&self) -> bool {
        self.node.is_root()
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn set_url(&mut self, url: &str) {
        self.url = Some(normalize_url(url));
    }

    pub fn layout(&self) -> Option<&Layout> {
        self.layout.as_ref()
    }

    pub fn site_uid(&self) -> Option<&str> {
        self.site.as_ref().map(|s| s.uid.as_str())
    }

    pub fn layout_uid(&self) -> Option<&str> {
        self.layout.as_ref().map(|l| l.uid.as_str())
    }

    /// Attach the page under `parent` (references and level only)
    pub fn set_parent(&mut self, parent: &Page) {
        self.node.attach_to(&parent.node);
    }

    /// Join the tree `root` belongs to
    pub fn set_root(&mut self, root: &Page) {
        self.node.set_root_id(root.root_id());
    }

    /// Apply a layout and rebuild the content-set
    ///
    /// One column is created per layout zone. `main_item`, when given, is
    /// pushed into the main zone column.
    pub fn set_layout(&mut self, layout: Layout, main_item: Option<ClassContent>) {
        let zones: Vec<Option<String>> = if layout.zones.is_empty() {
            vec![None]
        } else {
            layout.zones.iter().map(|z| Some(z.id.clone())).collect()
        };
        let mut content_set = ContentSet::with_zones(&zones);
        if let Some(item) = main_item {
            if let Some(column) = content_set.item_mut(layout.main_zone_index()) {
                column.push(item);
            }
        }
        self.content_set = content_set;
        self.layout = Some(layout);
    }

    pub fn set_state(&mut self, state: PageState) {
        self.state = state;
    }

    pub fn is_deleted(&self) -> bool {
        self.state.contains(PageState::DELETED)
    }

    /// True when `now` falls inside the publishing window
    pub fn is_within_schedule(&self, now: DateTime<Utc>) -> bool {
        self.publishing.map_or(true, |p| p <= now) && self.archiving.map_or(true, |a| a > now)
    }

    pub fn is_online_at(&self, now: DateTime<Utc>) -> bool {
        self.state.intersects(PageState::ONLINE) && self.is_within_schedule(now)
    }

    pub fn is_visible_at(&self, now: DateTime<Utc>) -> bool {
        self.state == PageState::ONLINE && self.is_within_schedule(now)
    }

    pub fn set_workflow_state(&mut self, state: Option<WorkflowState>) {
        self.workflow_state = state;
    }

    pub fn touch(&mut self) {
        self.modified = Utc::now();
    }
}
