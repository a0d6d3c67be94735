//! Sites and layouts referenced by pages

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A site owning a page tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub uid: String,
    pub label: String,
    pub server_name: Option<String>,
}

impl Site {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            uid: Uuid::new_v4().to_string(),
            label: label.into(),
            server_name: None,
        }
    }

    pub fn with_uid(uid: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            label: label.into(),
            server_name: None,
        }
    }
}

/// One zone of a layout; each zone becomes a column of the page content-set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutZone {
    pub id: String,
    /// The primary zone receives the layout's main item
    #[serde(default)]
    pub main: bool,
}

/// A page layout
///
/// A layout without declared zones still yields a single column, which is
/// then the main zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    pub uid: String,
    pub label: String,
    #[serde(default)]
    pub zones: Vec<LayoutZone>,
}

impl Layout {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            uid: Uuid::new_v4().to_string(),
            label: label.into(),
            zones: Vec::new(),
        }
    }

    pub fn with_uid(uid: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            label: label.into(),
            zones: Vec::new(),
        }
    }

    /// Append a zone (builder style)
    pub fn with_zone(mut self, id: impl Into<String>, main: bool) -> Self {
        self.zones.push(LayoutZone {
            id: id.into(),
            main,
        });
        self
    }

    /// Number of content-set columns a page with this layout gets
    pub fn column_count(&self) -> usize {
        self.zones.len().max(1)
    }

    /// Index of the main zone column
    ///
    /// The first zone flagged `main` wins; without any flag, column 0.
    pub fn main_zone_index(&self) -> usize {
        self.zones.iter().position(|z| z.main).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_without_zones_has_one_column() {
        let layout = Layout::new("blank");
        assert_eq!(layout.column_count(), 1);
        assert_eq!(layout.main_zone_index(), 0);
    }

    #[test]
    fn test_layout_main_zone_index() {
        let layout = Layout::new("two columns")
            .with_zone("aside", false)
            .with_zone("body", true);
        assert_eq!(layout.column_count(), 2);
        assert_eq!(layout.main_zone_index(), 1);
    }
}
