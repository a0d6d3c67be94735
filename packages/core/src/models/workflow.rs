//! Workflow States
//!
//! A workflow state is a named stage a page can occupy around its main online
//! state. The sign of `code` places it on the timeline:
//!
//! - negative code: applied before the page goes online (e.g. "in review")
//! - positive code: applied after the page went online (e.g. "needs update")
//!
//! A state may be bound to a layout and/or a listener name.

use super::page::ValidationError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Serialized as `{uid, code, label, layout_uid}`; the listener stays internal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowState {
    uid: String,
    code: i64,
    label: String,
    #[serde(default)]
    layout_uid: Option<String>,
    #[serde(default, skip_serializing)]
    listener: Option<String>,
}

impl WorkflowState {
    /// Create a state; a uid is generated when none is given
    pub fn new(uid: Option<String>, code: i64, label: impl Into<String>) -> Self {
        Self {
            uid: uid.unwrap_or_else(|| Uuid::new_v4().simple().to_string()),
            code,
            label: label.into(),
            layout_uid: None,
            listener: None,
        }
    }

    /// Create a state from a loose options object (`{"code": -1, "label": "..."}`)
    ///
    /// `code` must be an integer when present; `label` is stringified.
    pub fn from_options(
        uid: Option<String>,
        options: &serde_json::Value,
    ) -> Result<Self, ValidationError> {
        let mut state = Self::new(uid, 0, "");
        if let Some(code) = options.get("code") {
            state.set_code(code)?;
        }
        if let Some(label) = options.get("label") {
            state.label = match label {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
        }
        Ok(state)
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn code(&self) -> i64 {
        self.code
    }

    /// Set the code from a loose value; only integers are accepted
    pub fn set_code(&mut self, code: &serde_json::Value) -> Result<(), ValidationError> {
        let parsed = match code {
            serde_json::Value::Number(n) => n.as_i64(),
            serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        self.code = parsed.ok_or_else(|| {
            ValidationError::InvalidWorkflowState(format!(
                "the code of a workflow state has to be an integer, got {}",
                code
            ))
        })?;
        Ok(())
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    pub fn layout_uid(&self) -> Option<&str> {
        self.layout_uid.as_deref()
    }

    pub fn set_layout_uid(&mut self, layout_uid: Option<String>) {
        self.layout_uid = layout_uid;
    }

    pub fn listener(&self) -> Option<&str> {
        self.listener.as_deref()
    }

    pub fn set_listener(&mut self, listener: Option<String>) {
        self.listener = listener;
    }

    pub fn is_before_online(&self) -> bool {
        self.code < 0
    }

    pub fn is_after_online(&self) -> bool {
        self.code > 0
    }
}
