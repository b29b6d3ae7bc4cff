//! Window enumeration, noise filtering and document assembly.

use std::time::Instant;

use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::error::CaptureError;
use crate::error::HostError;
use crate::lease::Lease;
use crate::platform::AccessibilityHost;
use crate::platform::NodeHandle;
use crate::platform::NodeId;
use crate::platform::ViewFilter;
use crate::platform::WindowHandle;
use crate::record::CaptureDocument;
use crate::record::WindowRecord;
use crate::record::WINDOW_ROLE;
use crate::walker::TreeWalker;
use crate::walker::VisitedSet;

pub const NAVIGATION_BAR_TITLE: &str = "Navigation bar";

/// First-child pane titles of system overlay windows.
pub const OVERLAY_PANE_TITLES: [&str; 2] = ["Status bar", "Notification shade."];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureKind {
    /// Important views only.
    Standard,
    /// Flip whether not-important views are included.
    NotImportant,
}

/// Builds the record for one window.
///
/// The window's children are the children of its root's record, and its
/// bounds and id are the root's. When the root cannot be resolved the
/// window is still reported, with its own bounds and id and no children.
pub fn build_window_record<W: WindowHandle>(
    window: &W,
    visited: &mut VisitedSet,
) -> Result<WindowRecord, HostError> {
    let window_id = window.id();
    let title = window.title();

    let root = match window.root() {
        Ok(root) => Lease::new(root),
        Err(err) => {
            debug!(window_id, error = %err, "root unavailable, reporting window metadata");
            let bounds = window.bounds_in_screen();
            return Ok(WindowRecord {
                window_id,
                role: WINDOW_ROLE.to_string(),
                title,
                x1: bounds.left,
                y1: bounds.top,
                x2: bounds.right,
                y2: bounds.bottom,
                id: NodeId(i64::from(window_id)),
                children: Vec::new(),
                root_resolved: false,
            });
        }
    };

    let bounds = root.bounds_in_screen();
    let id = root.identity();
    let children = TreeWalker::new(visited)
        .walk(&*root)?
        .map(|mut record| std::mem::take(&mut record.children))
        .unwrap_or_default();

    Ok(WindowRecord {
        window_id,
        role: WINDOW_ROLE.to_string(),
        title,
        x1: bounds.left,
        y1: bounds.top,
        x2: bounds.right,
        y2: bounds.bottom,
        id,
        children,
        root_resolved: true,
    })
}

/// System chrome that clients never want to see.
pub fn is_noise_window(window: &WindowRecord) -> bool {
    if window.title.as_deref() == Some(NAVIGATION_BAR_TITLE) {
        return true;
    }
    if !window.root_resolved {
        return false;
    }
    match window.children.first() {
        None => true,
        Some(first) => first
            .pane_title
            .as_deref()
            .is_some_and(|pane| OVERLAY_PANE_TITLES.contains(&pane)),
    }
}

/// Captures `windows` in order, sharing one visited set across all of them.
///
/// A window that fails part way is dropped; the rest of the capture goes on.
pub fn assemble_document<W: WindowHandle>(windows: &[W]) -> CaptureDocument {
    let mut visited = VisitedSet::new();
    let mut document = CaptureDocument::default();

    for window in windows {
        let record = match build_window_record(window, &mut visited) {
            Ok(record) => record,
            Err(err) => {
                warn!(window_id = window.id(), error = %err, "dropping window");
                continue;
            }
        };
        if is_noise_window(&record) {
            debug!(
                window_id = record.window_id,
                title = record.title.as_deref().unwrap_or(""),
                "skipping system window"
            );
            continue;
        }
        document.children.push(record);
    }

    document
}

/// Owns the host and the view filter between captures.
pub struct CaptureCoordinator<H: AccessibilityHost> {
    host: H,
    filter: ViewFilter,
}

impl<H: AccessibilityHost> CaptureCoordinator<H> {
    pub fn new(mut host: H) -> Self {
        let filter = ViewFilter::default();
        host.set_view_filter(filter);
        Self { host, filter }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn view_filter(&self) -> ViewFilter {
        self.filter
    }

    pub fn capture(&mut self, kind: CaptureKind) -> Result<CaptureDocument, CaptureError> {
        self.filter = match kind {
            CaptureKind::Standard => ViewFilter::Reduced,
            CaptureKind::NotImportant => self.filter.toggled(),
        };
        self.host.set_view_filter(self.filter);

        let started = Instant::now();
        let windows = self.host.windows().map_err(CaptureError::WindowList)?;
        let document = assemble_document(&windows);

        info!(
            kind = ?kind,
            filter = ?self.filter,
            windows = windows.len(),
            retained = document.children.len(),
            nodes = document.node_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "capture complete"
        );
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::NodeRecord;
    use crate::scene::SceneHost;
    use serde_json::json;

    fn fixture() -> SceneHost {
        SceneHost::from_value(json!({
            "windows": [
                { "id": 1, "title": "Navigation bar", "root": 10 },
                { "id": 2, "title": "Status", "root": 20 },
                { "id": 3, "title": "App", "root": 30 }
            ],
            "nodes": [
                { "id": 10, "class_name": "android.widget.FrameLayout", "children": [11] },
                { "id": 11, "class_name": "android.widget.ImageButton", "content_description": "Back" },
                { "id": 20, "class_name": "android.widget.FrameLayout", "children": [21] },
                { "id": 21, "class_name": "android.widget.FrameLayout", "pane_title": "Status bar" },
                {
                    "id": 30,
                    "class_name": "android.widget.FrameLayout",
                    "bounds": { "left": 0, "top": 0, "right": 1080, "bottom": 2400 },
                    "children": [31]
                },
                {
                    "id": 31,
                    "class_name": "android.widget.TextView",
                    "text": "Hello",
                    "bounds": { "left": 10, "top": 20, "right": 200, "bottom": 80 }
                }
            ]
        }))
        .unwrap()
    }

    fn window(title: Option<&str>, children: Vec<NodeRecord>) -> WindowRecord {
        WindowRecord {
            window_id: 1,
            role: WINDOW_ROLE.to_string(),
            title: title.map(str::to_string),
            x1: 0,
            y1: 0,
            x2: 0,
            y2: 0,
            id: NodeId(1),
            children,
            root_resolved: true,
        }
    }

    #[test]
    fn test_system_windows_filtered_app_retained() {
        let mut coordinator = CaptureCoordinator::new(fixture());
        let document = coordinator.capture(CaptureKind::Standard).unwrap();

        let value = serde_json::to_value(&document).unwrap();
        assert_eq!(
            value,
            json!({
                "children": [{
                    "windowId": 3,
                    "role": "Window",
                    "title": "App",
                    "x1": 0, "y1": 0, "x2": 1080, "y2": 2400,
                    "id": 30,
                    "children": [{
                        "id": 31,
                        "role": "TextView",
                        "x1": 10, "y1": 20, "x2": 200, "y2": 80,
                        "text": "Hello"
                    }]
                }]
            })
        );
    }

    #[test]
    fn test_noise_rules() {
        let mut status = NodeRecord::bare(NodeId(2), "FrameLayout");
        status.pane_title = Some("Notification shade.".into());
        let plain = NodeRecord::bare(NodeId(3), "TextView");

        assert!(is_noise_window(&window(Some(NAVIGATION_BAR_TITLE), vec![plain.clone()])));
        assert!(is_noise_window(&window(Some("Shade"), vec![status.clone()])));
        assert!(is_noise_window(&window(Some("Empty"), Vec::new())));
        assert!(!is_noise_window(&window(Some("App"), vec![plain.clone(), status])));
        assert!(!is_noise_window(&window(None, vec![plain])));
    }

    #[test]
    fn test_metadata_only_window_reported() {
        let host = SceneHost::from_value(json!({
            "windows": [
                {
                    "id": 7,
                    "title": "Toast",
                    "bounds": { "left": 100, "top": 1800, "right": 980, "bottom": 1900 }
                },
                { "id": 8, "title": "Navigation bar" }
            ]
        }))
        .unwrap();
        let document = CaptureCoordinator::new(host)
            .capture(CaptureKind::Standard)
            .unwrap();

        assert_eq!(document.children.len(), 1);
        let toast = &document.children[0];
        assert_eq!(toast.id, NodeId(7));
        assert_eq!((toast.x1, toast.y2), (100, 1900));
        assert!(toast.children.is_empty());
        assert!(!toast.root_resolved);
    }

    #[test]
    fn test_failed_window_dropped_others_kept() {
        let host = SceneHost::from_value(json!({
            "windows": [
                { "id": 1, "title": "Broken", "root": 40 },
                { "id": 2, "title": "App", "root": 30 }
            ],
            "nodes": [
                { "id": 40, "class_name": "FrameLayout", "children": [41] },
                { "id": 41, "class_name": "ListView", "stale": true, "children": [42] },
                { "id": 42, "class_name": "TextView" },
                { "id": 30, "class_name": "FrameLayout", "children": [31] },
                { "id": 31, "class_name": "TextView", "text": "Hello" }
            ]
        }))
        .unwrap();
        let mut coordinator = CaptureCoordinator::new(host);
        let document = coordinator.capture(CaptureKind::Standard).unwrap();

        assert_eq!(document.children.len(), 1);
        assert_eq!(document.children[0].title.as_deref(), Some("App"));
        let stats = coordinator.host().handle_stats();
        assert_eq!(stats.acquired, stats.released);
    }

    #[test]
    fn test_window_list_failure_is_an_error() {
        let host = SceneHost::from_value(json!({ "windows_unavailable": true })).unwrap();
        let result = CaptureCoordinator::new(host).capture(CaptureKind::Standard);
        assert!(matches!(result, Err(CaptureError::WindowList(_))));
    }

    #[test]
    fn test_nodes_shared_across_windows_described_once() {
        let host = SceneHost::from_value(json!({
            "windows": [
                { "id": 1, "title": "First", "root": 1 },
                { "id": 2, "title": "Second", "root": 2 },
                { "id": 3, "title": "Same root", "root": 1 }
            ],
            "nodes": [
                { "id": 1, "class_name": "FrameLayout", "children": [3, 2] },
                { "id": 2, "class_name": "FrameLayout", "children": [3, 4] },
                { "id": 3, "class_name": "TextView", "text": "shared" },
                { "id": 4, "class_name": "TextView", "text": "own" }
            ]
        }))
        .unwrap();
        let document = CaptureCoordinator::new(host)
            .capture(CaptureKind::Standard)
            .unwrap();

        // Window 2's root was already walked inside window 1.
        assert_eq!(document.children.len(), 1);
        assert_eq!(document.children[0].title.as_deref(), Some("First"));
        assert_eq!(document.node_count(), 3);
    }

    #[test]
    fn test_not_important_toggles_filter() {
        let host = SceneHost::from_value(json!({
            "windows": [{ "id": 1, "title": "App", "root": 1 }],
            "nodes": [
                { "id": 1, "class_name": "FrameLayout", "children": [2] },
                { "id": 2, "class_name": "LinearLayout", "important": false, "children": [3] },
                { "id": 3, "class_name": "TextView", "text": "Hello" }
            ]
        }))
        .unwrap();
        let mut coordinator = CaptureCoordinator::new(host);
        let first_child = |document: &CaptureDocument| document.children[0].children[0].id;

        let reduced = coordinator.capture(CaptureKind::Standard).unwrap();
        assert_eq!(first_child(&reduced), NodeId(3));

        let expanded = coordinator.capture(CaptureKind::NotImportant).unwrap();
        assert_eq!(coordinator.view_filter(), ViewFilter::Expanded);
        assert_eq!(coordinator.host().view_filter(), ViewFilter::Expanded);
        assert_eq!(first_child(&expanded), NodeId(2));

        coordinator.capture(CaptureKind::NotImportant).unwrap();
        assert_eq!(coordinator.view_filter(), ViewFilter::Reduced);

        coordinator.capture(CaptureKind::NotImportant).unwrap();
        coordinator.capture(CaptureKind::Standard).unwrap();
        assert_eq!(coordinator.view_filter(), ViewFilter::Reduced);
    }

    const CHAIN_DEPTH: i64 = 10_000;
    const CAPTURE_STACK: usize = 2 * 1024 * 1024;

    fn chain_host(important: bool) -> SceneHost {
        let nodes: Vec<_> = (0..=CHAIN_DEPTH)
            .map(|id| {
                let children = if id < CHAIN_DEPTH { vec![id + 1] } else { vec![] };
                json!({
                    "id": id,
                    "class_name": "android.view.View",
                    "text": format!("level {id}"),
                    "important": important || id == 0 || id == CHAIN_DEPTH,
                    "children": children,
                })
            })
            .collect();
        SceneHost::from_value(json!({
            "windows": [{ "id": 1, "title": "Web", "root": 0 }],
            "nodes": nodes,
        }))
        .unwrap()
    }

    fn on_capture_sized_thread<T: Send + 'static>(f: impl FnOnce() -> T + Send + 'static) -> T {
        std::thread::Builder::new()
            .name("inspector-capture".to_string())
            .stack_size(CAPTURE_STACK)
            .spawn(f)
            .unwrap()
            .join()
            .unwrap()
    }

    #[test]
    fn test_deep_chain_captures_on_small_stack() {
        let (nodes, depth, balanced) = on_capture_sized_thread(|| {
            let mut coordinator = CaptureCoordinator::new(chain_host(true));
            let document = coordinator.capture(CaptureKind::Standard).unwrap();

            let mut depth = 0;
            let mut level = document.children[0].children.first();
            while let Some(record) = level {
                depth += 1;
                level = record.children.first();
            }
            let stats = coordinator.host().handle_stats();
            (document.node_count(), depth, stats.acquired == stats.released)
        });
        assert_eq!(nodes, CHAIN_DEPTH as usize);
        assert_eq!(depth, CHAIN_DEPTH);
        assert!(balanced);
    }

    #[test]
    fn test_deep_unimportant_chain_hoists_on_small_stack() {
        let leaf = on_capture_sized_thread(|| {
            let mut coordinator = CaptureCoordinator::new(chain_host(false));
            let document = coordinator.capture(CaptureKind::Standard).unwrap();
            let window = &document.children[0];
            assert_eq!(window.children.len(), 1);
            window.children[0].id
        });
        assert_eq!(leaf, NodeId(CHAIN_DEPTH));
    }
}
