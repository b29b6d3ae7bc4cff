//! The thread that owns the accessibility host.

use std::sync::Arc;
use std::thread;

use a11y_inspector_core::AccessibilityHost;
use a11y_inspector_core::CaptureCoordinator;
use a11y_inspector_core::CaptureKind;
use a11y_inspector_ipc::capture_frame;
use crossbeam_channel::Receiver;
use crossbeam_channel::Sender;
use crossbeam_channel::TrySendError;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::error::DaemonError;
use crate::publisher::Publisher;

pub const CAPTURE_THREAD_NAME: &str = "inspector-capture";

/// Sending half of the capture queue.
#[derive(Clone)]
pub struct CaptureQueue {
    tx: Sender<CaptureKind>,
}

impl CaptureQueue {
    pub fn bounded(capacity: usize) -> (Self, Receiver<CaptureKind>) {
        let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Enqueues without blocking; a full queue drops the request.
    pub fn request(&self, kind: CaptureKind) -> Result<(), DaemonError> {
        match self.tx.try_send(kind) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                warn!(?kind, "Capture queue full; dropping request");
                Err(DaemonError::QueueFull)
            }
            Err(TrySendError::Disconnected(_)) => Err(DaemonError::ShuttingDown),
        }
    }
}

pub struct CaptureWorker {
    pub publisher: Arc<dyn Publisher>,
    pub screenshot: bool,
}

impl CaptureWorker {
    /// Builds the host on a new thread and serves capture requests until
    /// every [`CaptureQueue`] is dropped.
    pub fn spawn<F, H>(
        self,
        host_factory: F,
        requests: Receiver<CaptureKind>,
    ) -> Result<thread::JoinHandle<()>, DaemonError>
    where
        F: FnOnce() -> H + Send + 'static,
        H: AccessibilityHost,
    {
        thread::Builder::new()
            .name(CAPTURE_THREAD_NAME.to_string())
            .spawn(move || {
                let mut coordinator = CaptureCoordinator::new(host_factory());
                info!("Capture thread ready");
                for kind in requests.iter() {
                    self.run_once(&mut coordinator, kind);
                }
                info!("Capture thread stopped");
            })
            .map_err(|source| DaemonError::ThreadSpawn {
                name: CAPTURE_THREAD_NAME,
                source,
            })
    }

    fn run_once<H: AccessibilityHost>(
        &self,
        coordinator: &mut CaptureCoordinator<H>,
        kind: CaptureKind,
    ) {
        let document = match coordinator.capture(kind) {
            Ok(document) => document,
            Err(err) => {
                warn!(error = %err, ?kind, "Capture failed; nothing broadcast");
                return;
            }
        };

        let screenshot = if self.screenshot {
            let png = coordinator.host().screenshot_png();
            if png.is_none() {
                debug!("Host returned no screenshot");
            }
            png
        } else {
            None
        };

        match capture_frame(&document, screenshot.as_deref()) {
            Ok(frame) => {
                self.publisher.publish(frame);
            }
            Err(err) => error!(error = %err, "Failed to serialize capture"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use a11y_inspector_core::Scene;
    use a11y_inspector_core::SceneHost;

    #[derive(Default)]
    struct Recorder {
        frames: Mutex<Vec<String>>,
    }

    impl Publisher for Recorder {
        fn publish(&self, frame: String) -> bool {
            self.frames.lock().unwrap().push(frame);
            true
        }
    }

    fn scene() -> Scene {
        serde_json::from_value(serde_json::json!({
            "windows": [{ "id": 1, "title": "App", "root": 1 }],
            "nodes": [
                { "id": 1, "class_name": "FrameLayout", "children": [2] },
                { "id": 2, "class_name": "TextView", "text": "Hello" }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_full_queue_drops_request() {
        let (queue, _rx) = CaptureQueue::bounded(1);
        queue.request(CaptureKind::Standard).unwrap();
        assert!(matches!(
            queue.request(CaptureKind::Standard),
            Err(DaemonError::QueueFull)
        ));
    }

    #[test]
    fn test_disconnected_queue_reports_shutdown() {
        let (queue, rx) = CaptureQueue::bounded(1);
        drop(rx);
        assert!(matches!(
            queue.request(CaptureKind::Standard),
            Err(DaemonError::ShuttingDown)
        ));
    }

    #[test]
    fn test_worker_publishes_one_frame_per_request() {
        let recorder = Arc::new(Recorder::default());
        let (queue, rx) = CaptureQueue::bounded(4);
        let scene = scene();
        let join = CaptureWorker {
            publisher: recorder.clone(),
            screenshot: true,
        }
        .spawn(move || SceneHost::new(scene).with_screenshot(vec![1, 2, 3]), rx)
        .unwrap();

        queue.request(CaptureKind::Standard).unwrap();
        queue.request(CaptureKind::NotImportant).unwrap();
        drop(queue);
        join.join().unwrap();

        let frames = recorder.frames.lock().unwrap();
        assert_eq!(frames.len(), 2);
        let value: serde_json::Value = serde_json::from_str(&frames[0]).unwrap();
        assert_eq!(value["views"]["children"][0]["title"], "App");
        assert_eq!(value["views"]["children"][0]["children"][0]["text"], "Hello");
        assert_eq!(value["screenshot"], "AQID");
    }

    #[test]
    fn test_failed_capture_publishes_nothing() {
        let recorder = Arc::new(Recorder::default());
        let (queue, rx) = CaptureQueue::bounded(1);
        let join = CaptureWorker {
            publisher: recorder.clone(),
            screenshot: false,
        }
        .spawn(
            || SceneHost::new(Scene {
                windows_unavailable: true,
                ..Scene::default()
            }),
            rx,
        )
        .unwrap();

        queue.request(CaptureKind::Standard).unwrap();
        drop(queue);
        join.join().unwrap();
        assert!(recorder.frames.lock().unwrap().is_empty());
    }

    #[test]
    fn test_deep_tree_published_from_capture_thread() {
        const DEPTH: i64 = 10_000;
        let nodes: Vec<_> = (0..=DEPTH)
            .map(|id| {
                let children = if id < DEPTH { vec![id + 1] } else { vec![] };
                serde_json::json!({ "id": id, "class_name": "android.view.View", "children": children })
            })
            .collect();
        let scene: Scene = serde_json::from_value(serde_json::json!({
            "windows": [{ "id": 1, "title": "Web", "root": 0 }],
            "nodes": nodes,
        }))
        .unwrap();

        let recorder = Arc::new(Recorder::default());
        let (queue, rx) = CaptureQueue::bounded(1);
        let join = CaptureWorker {
            publisher: recorder.clone(),
            screenshot: false,
        }
        .spawn(move || SceneHost::new(scene), rx)
        .unwrap();

        queue.request(CaptureKind::Standard).unwrap();
        drop(queue);
        join.join().unwrap();

        let frames = recorder.frames.lock().unwrap();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].starts_with(r#"{"views":{"children":[{"windowId":1"#));
        assert!(frames[0].contains(r#"{"id":10000,"role":"View""#));
    }
}
