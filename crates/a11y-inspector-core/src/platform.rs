//! Seams to the host accessibility layer.
//!
//! The host owns windows and nodes; this crate only reads them. Handles
//! returned by [`NodeHandle::child`], [`NodeHandle::labeled_by`] and
//! [`WindowHandle::root`] are acquisitions that must be given back through
//! [`NodeHandle::release`]. Callers inside this crate always wrap them in a
//! [`Lease`](crate::Lease) so that happens on every exit path.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::error::HostError;

/// Platform-assigned node identity. Only stable within one capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub i64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Screen-space rectangle, edges inclusive of `left`/`top`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }
}

/// Standard actions the inspector knows how to name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Focus,
    AccessibilityFocus,
    ClearAccessibilityFocus,
    ScrollBackward,
    ScrollForward,
    Click,
    LongClick,
    Expand,
    Collapse,
    /// Any platform action id outside the standard set.
    Other(i32),
}

impl ActionKind {
    /// Position in the serialized action list, `None` for unnamed actions.
    pub fn priority(&self) -> Option<u8> {
        match self {
            ActionKind::Focus => Some(0),
            ActionKind::AccessibilityFocus => Some(1),
            ActionKind::ClearAccessibilityFocus => Some(2),
            ActionKind::ScrollBackward => Some(3),
            ActionKind::ScrollForward => Some(4),
            ActionKind::Click => Some(5),
            ActionKind::LongClick => Some(6),
            ActionKind::Expand => Some(7),
            ActionKind::Collapse => Some(8),
            ActionKind::Other(_) => None,
        }
    }

    pub fn name(&self) -> Option<&'static str> {
        match self {
            ActionKind::Focus => Some("focus"),
            ActionKind::AccessibilityFocus => Some("a11y focus"),
            ActionKind::ClearAccessibilityFocus => Some("clear a11y focus"),
            ActionKind::ScrollBackward => Some("scroll backward"),
            ActionKind::ScrollForward => Some("scroll forward"),
            ActionKind::Click => Some("click"),
            ActionKind::LongClick => Some("long click"),
            ActionKind::Expand => Some("expand"),
            ActionKind::Collapse => Some("collapse"),
            ActionKind::Other(_) => None,
        }
    }

    /// Upper-case tag used by the single-line description.
    pub(crate) fn tag(&self) -> Option<&'static str> {
        match self {
            ActionKind::Focus => Some("FOCUS"),
            ActionKind::AccessibilityFocus => Some("A11Y_FOCUS"),
            ActionKind::ClearAccessibilityFocus => Some("CLEAR_A11Y_FOCUS"),
            ActionKind::ScrollBackward => Some("SCROLL_BACKWARD"),
            ActionKind::ScrollForward => Some("SCROLL_FORWARD"),
            ActionKind::Click => Some("CLICK"),
            ActionKind::LongClick => Some("LONG_CLICK"),
            ActionKind::Expand => Some("EXPAND"),
            ActionKind::Collapse => Some("COLLAPSE"),
            ActionKind::Other(_) => None,
        }
    }
}

/// One entry of the platform action list, in platform order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportedAction {
    pub kind: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ReportedAction {
    pub fn new(kind: ActionKind) -> Self {
        Self { kind, label: None }
    }

    pub fn labeled(kind: ActionKind, label: impl Into<String>) -> Self {
        Self {
            kind,
            label: Some(label.into()),
        }
    }
}

/// Boolean node properties. `enabled` defaults to true.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeFlags {
    pub focusable: bool,
    pub screen_reader_focusable: bool,
    pub focused: bool,
    pub selected: bool,
    pub scrollable: bool,
    pub clickable: bool,
    pub long_clickable: bool,
    pub accessibility_focused: bool,
    pub enabled: bool,
}

impl Default for NodeFlags {
    fn default() -> Self {
        Self {
            focusable: false,
            screen_reader_focusable: false,
            focused: false,
            selected: false,
            scrollable: false,
            clickable: false,
            long_clickable: false,
            accessibility_focused: false,
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub row_count: i32,
    pub column_count: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionItemInfo {
    pub row_index: i32,
    pub column_index: i32,
}

/// Which views the host exposes to the walker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewFilter {
    /// Only views the platform considers important for accessibility.
    #[default]
    Reduced,
    /// Also surface views normally hidden from assistive technology.
    Expanded,
}

impl ViewFilter {
    pub fn toggled(self) -> Self {
        match self {
            ViewFilter::Reduced => ViewFilter::Expanded,
            ViewFilter::Expanded => ViewFilter::Reduced,
        }
    }
}

/// A node handle acquired from the host.
///
/// Handles are only valid on the thread that owns the host, so nothing here
/// requires `Send`.
pub trait NodeHandle: Sized {
    fn identity(&self) -> NodeId;
    fn window_id(&self) -> i32;
    fn class_name(&self) -> Option<String>;
    fn role_description(&self) -> Option<String>;
    fn is_visible_to_user(&self) -> bool;
    fn bounds_in_screen(&self) -> Rect;
    fn pane_title(&self) -> Option<String>;
    fn text(&self) -> Option<String>;
    /// Text of clickable spans inside the node's text.
    fn clickable_spans(&self) -> Vec<String>;
    fn content_description(&self) -> Option<String>;
    fn hint_text(&self) -> Option<String>;
    fn state(&self) -> Option<String>;
    fn state_description(&self) -> Option<String>;
    fn is_checkable(&self) -> bool;
    fn is_checked(&self) -> bool;
    fn actions(&self) -> Vec<ReportedAction>;
    fn flags(&self) -> NodeFlags;
    fn collection_info(&self) -> Option<CollectionInfo>;
    fn collection_item_info(&self) -> Option<CollectionItemInfo>;
    fn is_heading(&self) -> bool;

    /// Acquires the node that labels this one.
    fn labeled_by(&self) -> Option<Self>;

    fn child_count(&self) -> Result<usize, HostError>;

    /// Acquires the child at `index`. `Ok(None)` means the platform could not
    /// materialize it; siblings are still reachable.
    fn child(&self, index: usize) -> Result<Option<Self>, HostError>;

    /// Gives the handle back to the host.
    fn release(self);
}

pub trait WindowHandle {
    type Node: NodeHandle;

    fn id(&self) -> i32;
    fn title(&self) -> Option<String>;
    fn bounds_in_screen(&self) -> Rect;

    /// Acquires the window's root node.
    fn root(&self) -> Result<Self::Node, HostError>;
}

/// The host accessibility layer, owned by the capture thread.
pub trait AccessibilityHost {
    type Window: WindowHandle;

    /// Interactive windows in platform order.
    fn windows(&self) -> Result<Vec<Self::Window>, HostError>;

    fn set_view_filter(&mut self, filter: ViewFilter);

    /// PNG bytes of the current screen, when the host can take one.
    fn screenshot_png(&self) -> Option<Vec<u8>> {
        None
    }
}
