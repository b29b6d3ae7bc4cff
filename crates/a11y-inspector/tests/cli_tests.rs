//! Binary-level tests.

use std::net::TcpListener;

use a11y_inspector_core::Scene;
use a11y_inspector_core::SceneHost;
use a11y_inspector_daemon::InspectorConfig;
use a11y_inspector_daemon::TransportVariant;
use a11y_inspector_daemon::spawn_inspector;
use assert_cmd::Command;
use predicates::prelude::*;

fn inspector() -> Command {
    let mut cmd = Command::cargo_bin("a11y-inspector").unwrap();
    cmd.env_remove("A11Y_INSPECTOR_URL").env_remove("RUST_LOG");
    cmd
}

fn scene() -> Scene {
    serde_json::from_str(
        r#"{
            "windows": [{ "id": 4, "title": "Settings", "root": 1 }],
            "nodes": [
                { "id": 1, "class_name": "android.widget.FrameLayout", "children": [2] },
                { "id": 2, "class_name": "android.widget.Switch", "text": "Wi-Fi",
                  "checkable": true, "checked": true }
            ]
        }"#,
    )
    .unwrap()
}

/// A port nothing is listening on.
fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

#[test]
fn test_help_lists_commands() {
    inspector()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("capture"))
        .stdout(predicate::str::contains("watch"));
}

#[test]
fn test_capture_prints_document() {
    let config = InspectorConfig::default()
        .with_port(0)
        .with_transport(TransportVariant::Relay);
    let scene = scene();
    let handle = spawn_inspector(config, move || SceneHost::new(scene)).unwrap();

    inspector()
        .args(["capture", "--url", &handle.url()])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""title": "Settings""#))
        .stdout(predicate::str::contains(r#""checkable": "checked""#));

    inspector()
        .args(["ping", "--url", &handle.url()])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("pong from"));
    handle.shutdown();
}

#[test]
fn test_unreachable_inspector_suggests_serve() {
    let url = format!("ws://127.0.0.1:{}/", closed_port());
    inspector()
        .args(["ping", "--url", &url, "--timeout", "1"])
        .assert()
        .code(69)
        .stderr(predicate::str::contains("a11y-inspector serve"));
}

#[test]
fn test_serve_rejects_missing_scene() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("scene.json");
    inspector()
        .args(["serve", "--port", "0", "--scene"])
        .arg(&missing)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("failed to read scene"));
}

#[test]
fn test_serve_rejects_invalid_scene() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scene.json");
    std::fs::write(&path, "{ \"windows\": 3 }").unwrap();
    inspector()
        .args(["serve", "--port", "0", "--scene"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid scene"));
}
