//! Serializable capture document.
//!
//! Field order matches the wire order clients expect. Everything optional is
//! omitted rather than sent empty.

use serde::Deserialize;
use serde::Serialize;

use crate::platform::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Invisible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckState {
    #[serde(rename = "checked")]
    Checked,
    #[serde(rename = "not checked")]
    NotChecked,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Attributes of one node plus its described children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub id: NodeId,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pane_title: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labeled_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labeled_by_id: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkable: Option<CheckState>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_info: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub heading: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_item_info: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeRecord>,
}

impl NodeRecord {
    /// A record with only the always-present fields set.
    pub fn bare(id: NodeId, role: impl Into<String>) -> Self {
        Self {
            id,
            role: role.into(),
            visibility: None,
            x1: 0,
            y1: 0,
            x2: 0,
            y2: 0,
            pane_title: None,
            links: Vec::new(),
            text: None,
            labeled_by: None,
            labeled_by_id: None,
            hint: None,
            content: None,
            state: None,
            checkable: None,
            actions: Vec::new(),
            properties: Vec::new(),
            collection_info: None,
            heading: false,
            collection_item_info: None,
            children: Vec::new(),
        }
    }

    /// Number of records in this subtree, including `self`.
    pub fn subtree_len(&self) -> usize {
        let mut count = 0;
        let mut pending = vec![self];
        while let Some(record) = pending.pop() {
            count += 1;
            pending.extend(record.children.iter());
        }
        count
    }
}

// Deep chains would otherwise be dropped one stack frame per level.
impl Drop for NodeRecord {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut record) = pending.pop() {
            pending.append(&mut record.children);
        }
    }
}

pub const WINDOW_ROLE: &str = "Window";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowRecord {
    pub window_id: i32,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    pub id: NodeId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeRecord>,
    /// False when only window metadata could be read.
    #[serde(skip, default = "default_true")]
    pub root_resolved: bool,
}

fn default_true() -> bool {
    true
}

/// One capture: retained windows in platform order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaptureDocument {
    pub children: Vec<WindowRecord>,
}

impl CaptureDocument {
    pub fn node_count(&self) -> usize {
        self.children
            .iter()
            .flat_map(|w| w.children.iter())
            .map(NodeRecord::subtree_len)
            .sum()
    }
}
