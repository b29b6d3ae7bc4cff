//! In-memory accessibility host.
//!
//! A [`Scene`] is a flat arena of nodes that reference each other by id, so
//! it can describe anything a live platform can hand out: shared children,
//! cycles, null children, stale nodes and windows without a root. The serve
//! command replays scene files through [`SceneHost`]; tests build them with
//! `serde_json::json!`.

use std::cell::Cell;
use std::collections::HashMap;
use std::collections::HashSet;
use std::path::Path;
use std::rc::Rc;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::error::HostError;
use crate::platform::AccessibilityHost;
use crate::platform::CollectionInfo;
use crate::platform::CollectionItemInfo;
use crate::platform::NodeFlags;
use crate::platform::NodeHandle;
use crate::platform::NodeId;
use crate::platform::Rect;
use crate::platform::ReportedAction;
use crate::platform::ViewFilter;
use crate::platform::WindowHandle;

#[derive(Error, Debug)]
pub enum SceneError {
    #[error("failed to read scene {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid scene: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scene {
    pub windows: Vec<SceneWindow>,
    pub nodes: Vec<SceneNode>,
    /// Makes window enumeration fail, as when the host service is gone.
    pub windows_unavailable: bool,
}

impl Scene {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SceneError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| SceneError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&contents)?)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneWindow {
    pub id: i32,
    pub title: Option<String>,
    pub bounds: Rect,
    /// Root node id; absent means the platform cannot produce a root.
    pub root: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneNode {
    pub id: i64,
    pub window_id: i32,
    pub class_name: Option<String>,
    pub role_description: Option<String>,
    pub visible: bool,
    pub bounds: Rect,
    pub pane_title: Option<String>,
    pub text: Option<String>,
    pub links: Vec<String>,
    pub content_description: Option<String>,
    pub hint_text: Option<String>,
    pub state: Option<String>,
    pub state_description: Option<String>,
    pub checkable: bool,
    pub checked: bool,
    pub actions: Vec<ReportedAction>,
    #[serde(flatten)]
    pub flags: NodeFlags,
    pub collection_info: Option<CollectionInfo>,
    pub collection_item_info: Option<CollectionItemInfo>,
    pub heading: bool,
    pub labeled_by: Option<i64>,
    /// Child ids in platform order; `null` is a child that cannot be read.
    pub children: Vec<Option<i64>>,
    /// Hidden under [`ViewFilter::Reduced`]; its children are hoisted.
    pub important: bool,
    /// Child enumeration fails with [`HostError::StaleNode`].
    pub stale: bool,
}

impl Default for SceneNode {
    fn default() -> Self {
        Self {
            id: 0,
            window_id: 0,
            class_name: None,
            role_description: None,
            visible: true,
            bounds: Rect::default(),
            pane_title: None,
            text: None,
            links: Vec::new(),
            content_description: None,
            hint_text: None,
            state: None,
            state_description: None,
            checkable: false,
            checked: false,
            actions: Vec::new(),
            flags: NodeFlags::default(),
            collection_info: None,
            collection_item_info: None,
            heading: false,
            labeled_by: None,
            children: Vec::new(),
            important: true,
            stale: false,
        }
    }
}

/// Handle bookkeeping, for leak checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandleStats {
    pub acquired: usize,
    pub released: usize,
}

struct SceneState {
    scene: Scene,
    index: HashMap<i64, usize>,
    filter: Cell<ViewFilter>,
    acquired: Cell<usize>,
    released: Cell<usize>,
}

impl SceneState {
    fn lookup(&self, id: i64) -> Option<usize> {
        self.index.get(&id).copied()
    }

    fn node(&self, index: usize) -> &SceneNode {
        &self.scene.nodes[index]
    }

    fn visible_children(&self, index: usize) -> Vec<Option<i64>> {
        let children = &self.node(index).children;
        match self.filter.get() {
            ViewFilter::Expanded => children.clone(),
            ViewFilter::Reduced => {
                let mut out = Vec::with_capacity(children.len());
                let mut hoisted = HashSet::new();
                self.hoist_important(children, &mut out, &mut hoisted);
                out
            }
        }
    }

    fn hoist_important(
        &self,
        children: &[Option<i64>],
        out: &mut Vec<Option<i64>>,
        hoisted: &mut HashSet<usize>,
    ) {
        let mut pending = vec![children.iter()];
        while let Some(level) = pending.last_mut() {
            let Some(child) = level.next() else {
                pending.pop();
                continue;
            };
            match child.and_then(|id| self.lookup(id)) {
                Some(i) if !self.node(i).important => {
                    if hoisted.insert(i) {
                        pending.push(self.node(i).children.iter());
                    }
                }
                _ => out.push(*child),
            }
        }
    }
}

fn acquire(state: &Rc<SceneState>, index: usize) -> SceneNodeRef {
    state.acquired.set(state.acquired.get() + 1);
    SceneNodeRef {
        state: Rc::clone(state),
        index,
    }
}

pub struct SceneHost {
    state: Rc<SceneState>,
    screenshot: Option<Vec<u8>>,
}

impl SceneHost {
    pub fn new(scene: Scene) -> Self {
        let mut index = HashMap::with_capacity(scene.nodes.len());
        for (i, node) in scene.nodes.iter().enumerate() {
            index.entry(node.id).or_insert(i);
        }
        Self {
            state: Rc::new(SceneState {
                scene,
                index,
                filter: Cell::new(ViewFilter::default()),
                acquired: Cell::new(0),
                released: Cell::new(0),
            }),
            screenshot: None,
        }
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, SceneError> {
        Ok(Self::new(serde_json::from_value(value)?))
    }

    pub fn with_screenshot(mut self, png: Vec<u8>) -> Self {
        self.screenshot = Some(png);
        self
    }

    /// Acquires any node by id, bypassing the view filter.
    pub fn node(&self, id: NodeId) -> Option<SceneNodeRef> {
        self.state.lookup(id.0).map(|i| acquire(&self.state, i))
    }

    pub fn handle_stats(&self) -> HandleStats {
        HandleStats {
            acquired: self.state.acquired.get(),
            released: self.state.released.get(),
        }
    }

    pub fn view_filter(&self) -> ViewFilter {
        self.state.filter.get()
    }
}

impl AccessibilityHost for SceneHost {
    type Window = SceneWindowRef;

    fn windows(&self) -> Result<Vec<SceneWindowRef>, HostError> {
        if self.state.scene.windows_unavailable {
            return Err(HostError::WindowsUnavailable(
                "scene marks windows unavailable".to_string(),
            ));
        }
        Ok((0..self.state.scene.windows.len())
            .map(|index| SceneWindowRef {
                state: Rc::clone(&self.state),
                index,
            })
            .collect())
    }

    fn set_view_filter(&mut self, filter: ViewFilter) {
        self.state.filter.set(filter);
    }

    fn screenshot_png(&self) -> Option<Vec<u8>> {
        self.screenshot.clone()
    }
}

pub struct SceneWindowRef {
    state: Rc<SceneState>,
    index: usize,
}

impl SceneWindowRef {
    fn window(&self) -> &SceneWindow {
        &self.state.scene.windows[self.index]
    }
}

impl WindowHandle for SceneWindowRef {
    type Node = SceneNodeRef;

    fn id(&self) -> i32 {
        self.window().id
    }

    fn title(&self) -> Option<String> {
        self.window().title.clone()
    }

    fn bounds_in_screen(&self) -> Rect {
        self.window().bounds
    }

    fn root(&self) -> Result<SceneNodeRef, HostError> {
        let window = self.window();
        window
            .root
            .and_then(|id| self.state.lookup(id))
            .map(|i| acquire(&self.state, i))
            .ok_or(HostError::RootUnavailable {
                window_id: window.id,
            })
    }
}

pub struct SceneNodeRef {
    state: Rc<SceneState>,
    index: usize,
}

impl SceneNodeRef {
    fn node(&self) -> &SceneNode {
        self.state.node(self.index)
    }
}

impl NodeHandle for SceneNodeRef {
    fn identity(&self) -> NodeId {
        NodeId(self.node().id)
    }

    fn window_id(&self) -> i32 {
        self.node().window_id
    }

    fn class_name(&self) -> Option<String> {
        self.node().class_name.clone()
    }

    fn role_description(&self) -> Option<String> {
        self.node().role_description.clone()
    }

    fn is_visible_to_user(&self) -> bool {
        self.node().visible
    }

    fn bounds_in_screen(&self) -> Rect {
        self.node().bounds
    }

    fn pane_title(&self) -> Option<String> {
        self.node().pane_title.clone()
    }

    fn text(&self) -> Option<String> {
        self.node().text.clone()
    }

    fn clickable_spans(&self) -> Vec<String> {
        self.node().links.clone()
    }

    fn content_description(&self) -> Option<String> {
        self.node().content_description.clone()
    }

    fn hint_text(&self) -> Option<String> {
        self.node().hint_text.clone()
    }

    fn state(&self) -> Option<String> {
        self.node().state.clone()
    }

    fn state_description(&self) -> Option<String> {
        self.node().state_description.clone()
    }

    fn is_checkable(&self) -> bool {
        self.node().checkable
    }

    fn is_checked(&self) -> bool {
        self.node().checked
    }

    fn actions(&self) -> Vec<ReportedAction> {
        self.node().actions.clone()
    }

    fn flags(&self) -> NodeFlags {
        self.node().flags
    }

    fn collection_info(&self) -> Option<CollectionInfo> {
        self.node().collection_info
    }

    fn collection_item_info(&self) -> Option<CollectionItemInfo> {
        self.node().collection_item_info
    }

    fn is_heading(&self) -> bool {
        self.node().heading
    }

    fn labeled_by(&self) -> Option<Self> {
        self.node()
            .labeled_by
            .and_then(|id| self.state.lookup(id))
            .map(|i| acquire(&self.state, i))
    }

    fn child_count(&self) -> Result<usize, HostError> {
        if self.node().stale {
            return Err(HostError::StaleNode(self.identity()));
        }
        Ok(self.state.visible_children(self.index).len())
    }

    fn child(&self, index: usize) -> Result<Option<Self>, HostError> {
        if self.node().stale {
            return Err(HostError::StaleNode(self.identity()));
        }
        Ok(self
            .state
            .visible_children(self.index)
            .get(index)
            .copied()
            .flatten()
            .and_then(|id| self.state.lookup(id))
            .map(|i| acquire(&self.state, i)))
    }

    fn release(self) {
        self.state.released.set(self.state.released.get() + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lease::Lease;
    use serde_json::json;

    #[test]
    fn test_node_defaults() {
        let node: SceneNode = serde_json::from_value(json!({ "id": 3 })).unwrap();
        assert!(node.visible);
        assert!(node.important);
        assert!(node.flags.enabled);
        assert!(node.children.is_empty());
    }

    #[test]
    fn test_reduced_filter_hoists_unimportant_children() {
        let mut host = SceneHost::from_value(json!({
            "nodes": [
                { "id": 1, "children": [2, 4] },
                { "id": 2, "important": false, "children": [3, 2] },
                { "id": 3 },
                { "id": 4 }
            ]
        }))
        .unwrap();
        let root = Lease::new(host.node(NodeId(1)).unwrap());
        assert_eq!(root.child_count().unwrap(), 2);
        let first = Lease::new(root.child(0).unwrap().unwrap());
        assert_eq!(first.identity(), NodeId(3));
        drop(first);

        host.set_view_filter(ViewFilter::Expanded);
        let first = Lease::new(root.child(0).unwrap().unwrap());
        assert_eq!(first.identity(), NodeId(2));
    }

    #[test]
    fn test_window_without_root() {
        let host = SceneHost::from_value(json!({
            "windows": [{ "id": 9, "title": "Toast" }]
        }))
        .unwrap();
        let windows = host.windows().unwrap();
        assert_eq!(
            windows[0].root().err(),
            Some(HostError::RootUnavailable { window_id: 9 })
        );
    }

    #[test]
    fn test_windows_unavailable() {
        let host = SceneHost::from_value(json!({ "windows_unavailable": true })).unwrap();
        assert!(matches!(
            host.windows(),
            Err(HostError::WindowsUnavailable(_))
        ));
    }

    #[test]
    fn test_scene_from_path_reports_missing_file() {
        let err = Scene::from_path("/nonexistent/scene.json").unwrap_err();
        assert!(matches!(err, SceneError::Io { .. }));
    }
}
