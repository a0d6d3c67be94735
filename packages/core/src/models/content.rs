//! Class Content Elements
//!
//! Typed editorial content. Each content carries schema-defined data fields,
//! schema properties (`name`, `labelized-by`, ...), a derived or explicit
//! label, a committed revision number and, while an editor works on it, a
//! draft [`Revision`].
//!
//! Contents reference each other by [`ContentRef`] (type + uid) rather than by
//! pointer, so label paths such as `author->name` are resolved through an
//! identity map (see [`crate::services::UnitOfWork`]).

use super::revision::{MergeOutcome, Revision};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Schema property naming the path used to derive a content label
pub const LABELIZED_BY_PROPERTY: &str = "labelized-by";

/// Schema property holding the human name of a content type
pub const NAME_PROPERTY: &str = "name";

/// Content type of the container every page owns
pub const CONTENT_SET_TYPE: &str = "ContentSet";

/// Reference to a content by type and uid
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRef {
    pub content_type: String,
    pub uid: String,
}

impl ContentRef {
    pub fn new(content_type: impl Into<String>, uid: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            uid: uid.into(),
        }
    }
}

impl std::fmt::Display for ContentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.content_type, self.uid)
    }
}

/// Value of one data field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum FieldValue {
    /// Plain JSON value (text, number, boolean, null, ...)
    Scalar(serde_json::Value),
    /// Reference to another content
    Content(ContentRef),
    /// Ordered references to other contents
    Contents(Vec<ContentRef>),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Scalar(serde_json::Value::String(value.into()))
    }

    pub fn null() -> Self {
        Self::Scalar(serde_json::Value::Null)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Scalar(serde_json::Value::Null))
    }

    pub fn as_content(&self) -> Option<&ContentRef> {
        match self {
            Self::Content(r) => Some(r),
            _ => None,
        }
    }

    /// Text usable as a label for a scalar value
    ///
    /// Strings are returned as-is, other scalars in their JSON form; null and
    /// content references have no scalar text.
    pub fn scalar_text(&self) -> Option<String> {
        match self {
            Self::Scalar(serde_json::Value::Null) => None,
            Self::Scalar(serde_json::Value::String(s)) => Some(s.clone()),
            Self::Scalar(other) => Some(other.to_string()),
            Self::Content(_) | Self::Contents(_) => None,
        }
    }
}

/// Field lookup capability used by label paths
pub trait FieldAccess {
    /// Value of the named field, `None` when the field does not exist
    fn get_field(&self, name: &str) -> Option<FieldValue>;
}

/// Lifecycle state of a content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentState {
    Normal,
    New,
    Modified,
    Deleted,
}

/// A typed content element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassContent {
    pub uid: String,
    pub content_type: String,
    #[serde(default)]
    pub data: BTreeMap<String, FieldValue>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    pub label: Option<String>,
    pub revision: i64,
    pub state: ContentState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft: Option<Revision>,
    /// Page whose layout main zone this content anchors
    pub main_node: Option<String>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl ClassContent {
    /// Create a new, never persisted content of the given type
    pub fn new(content_type: impl Into<String>) -> Self {
        Self::with_uid(content_type, Uuid::new_v4().to_string())
    }

    pub fn with_uid(content_type: impl Into<String>, uid: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            uid: uid.into(),
            content_type: content_type.into(),
            data: BTreeMap::new(),
            properties: BTreeMap::new(),
            label: None,
            revision: 0,
            state: ContentState::New,
            draft: None,
            main_node: None,
            created_at: now,
            modified_at: now,
        }
    }

    pub fn reference(&self) -> ContentRef {
        ContentRef::new(self.content_type.clone(), self.uid.clone())
    }

    /// Set a data field (builder style)
    pub fn with_data(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.data.insert(name.into(), value);
        self
    }

    /// Set a schema property (builder style)
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn set_data(&mut self, name: impl Into<String>, value: FieldValue) {
        self.data.insert(name.into(), value);
        self.modified_at = Utc::now();
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    /// Path expression used to derive the label, if the type declares one
    pub fn labelized_by(&self) -> Option<&str> {
        self.property(LABELIZED_BY_PROPERTY)
    }

    pub fn set_label(&mut self, label: Option<String>) {
        self.label = label;
    }

    /// Stamp revision and state in one go
    pub fn stamp(&mut self, revision: i64, state: ContentState) {
        self.revision = revision;
        self.state = state;
    }

    pub fn set_main_node(&mut self, page_uid: impl Into<String>) {
        self.main_node = Some(page_uid.into());
    }

    pub fn set_draft(&mut self, draft: Revision) {
        self.draft = Some(draft);
    }

    /// Detach and return the current draft
    pub fn release_draft(&mut self) -> Option<Revision> {
        self.draft.take()
    }

    /// Rebase the attached draft on a committed revision
    ///
    /// Returns `None` when no draft is attached.
    pub fn update_draft(&mut self, committed: &Revision) -> Option<MergeOutcome> {
        self.draft.as_mut().map(|draft| draft.merge_committed(committed))
    }
}

impl FieldAccess for ClassContent {
    fn get_field(&self, name: &str) -> Option<FieldValue> {
        self.data.get(name).cloned()
    }
}

/// One column of a content-set, bound to a layout zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentColumn {
    pub content: ClassContent,
    pub zone: Option<String>,
    #[serde(default)]
    pub elements: Vec<ClassContent>,
}

impl ContentColumn {
    pub fn push(&mut self, element: ClassContent) {
        self.content
            .data
            .entry("items".to_string())
            .and_modify(|items| {
                if let FieldValue::Contents(refs) = items {
                    refs.push(element.reference());
                }
            })
            .or_insert_with(|| FieldValue::Contents(vec![element.reference()]));
        self.elements.push(element);
    }
}

/// Root container owned by a page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSet {
    pub content: ClassContent,
    #[serde(default)]
    pub columns: Vec<ContentColumn>,
}

impl Default for ContentSet {
    fn default() -> Self {
        Self {
            content: ClassContent::new(CONTENT_SET_TYPE),
            columns: Vec::new(),
        }
    }
}

impl ContentSet {
    /// Create a content-set with one column per zone
    pub fn with_zones(zones: &[Option<String>]) -> Self {
        let columns = zones
            .iter()
            .map(|zone| ContentColumn {
                content: ClassContent::new(CONTENT_SET_TYPE),
                zone: zone.clone(),
                elements: Vec::new(),
            })
            .collect();
        Self {
            content: ClassContent::new(CONTENT_SET_TYPE),
            columns,
        }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column at `index`
    pub fn item(&self, index: usize) -> Option<&ContentColumn> {
        self.columns.get(index)
    }

    pub fn item_mut(&mut self, index: usize) -> Option<&mut ContentColumn> {
        self.columns.get_mut(index)
    }

    /// Visit every content reachable from the set: itself, columns, elements
    pub fn for_each_content_mut(&mut self, mut visit: impl FnMut(&mut ClassContent)) {
        visit(&mut self.content);
        for column in &mut self.columns {
            visit(&mut column.content);
            for element in &mut column.elements {
                visit(element);
            }
        }
    }

    /// Every content reachable from the set, in column order
    pub fn contents(&self) -> Vec<&ClassContent> {
        let mut out = vec![&self.content];
        for column in &self.columns {
            out.push(&column.content);
            out.extend(column.elements.iter());
        }
        out
    }
}
