use std::io::Write;
use std::path::Path;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use a11y_inspector_core::Scene;
use a11y_inspector_core::SceneHost;
use a11y_inspector_daemon::InspectorConfig;
use a11y_inspector_daemon::spawn_inspector;
use a11y_inspector_ipc::InspectorClient;
use anyhow::Context;
use tracing::info;

use crate::commands::ConnectionArgs;
use crate::commands::TransportArg;

const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

pub struct ServeArgs<'a> {
    pub scene: &'a Path,
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub transport: Option<TransportArg>,
    pub screenshot: Option<&'a Path>,
}

/// Environment first, then flags.
pub fn serve_config(args: &ServeArgs<'_>) -> InspectorConfig {
    let mut config = InspectorConfig::from_env();
    if let Some(bind) = &args.bind {
        config = config.with_bind(bind.clone());
    }
    if let Some(port) = args.port {
        config = config.with_port(port);
    }
    if let Some(transport) = args.transport {
        config = config.with_transport(transport.into());
    }
    if args.screenshot.is_some() {
        config = config.with_screenshot(true);
    }
    config
}

pub fn handle_serve(args: ServeArgs<'_>) -> anyhow::Result<()> {
    let scene = Scene::from_path(args.scene)?;
    let screenshot = match args.screenshot {
        Some(path) => Some(
            std::fs::read(path)
                .with_context(|| format!("failed to read screenshot {}", path.display()))?,
        ),
        None => None,
    };
    let config = serve_config(&args);
    info!(
        scene = %args.scene.display(),
        windows = scene.windows.len(),
        nodes = scene.nodes.len(),
        "Loaded scene"
    );

    let handle = spawn_inspector(config, move || {
        let host = SceneHost::new(scene);
        match screenshot {
            Some(png) => host.with_screenshot(png),
            None => host,
        }
    })?;
    println!("Inspector listening on {}", handle.url());

    wait_for_shutdown()?;
    handle.shutdown();
    Ok(())
}

#[cfg(unix)]
fn wait_for_shutdown() -> anyhow::Result<()> {
    let signals = a11y_inspector_daemon::SignalHandler::setup()?;
    while !signals.shutdown_requested() {
        thread::sleep(SHUTDOWN_POLL);
    }
    Ok(())
}

#[cfg(not(unix))]
fn wait_for_shutdown() -> anyhow::Result<()> {
    loop {
        thread::sleep(SHUTDOWN_POLL);
    }
}

fn connect(conn: &ConnectionArgs) -> anyhow::Result<InspectorClient> {
    let mut client = InspectorClient::connect(&conn.url)?;
    client.set_read_timeout(Some(Duration::from_secs(conn.timeout.max(1))))?;
    Ok(client)
}

pub fn handle_capture(
    conn: &ConnectionArgs,
    not_important: bool,
    save_screenshot: Option<&Path>,
) -> anyhow::Result<()> {
    let mut client = connect(conn)?;
    let reply = client.capture(not_important)?;
    let _ = client.close();

    if let Some(path) = save_screenshot {
        match reply.screenshot_png() {
            Some(png) => std::fs::write(path, png)
                .with_context(|| format!("failed to write {}", path.display()))?,
            None => eprintln!("Inspector sent no screenshot"),
        }
    }
    println!("{}", reply.views_pretty()?);
    Ok(())
}

pub fn handle_ping(conn: &ConnectionArgs) -> anyhow::Result<()> {
    let started = Instant::now();
    let mut client = connect(conn)?;
    client.ping()?;
    let _ = client.close();
    println!("pong from {} in {} ms", conn.url, started.elapsed().as_millis());
    Ok(())
}

pub fn handle_watch(conn: &ConnectionArgs, count: Option<usize>) -> anyhow::Result<()> {
    let mut client = connect(conn)?;
    client.set_read_timeout(None)?;
    let stdout = std::io::stdout();
    let mut seen = 0usize;
    loop {
        if count.is_some_and(|limit| seen >= limit) {
            break;
        }
        let Some(text) = client.next_text()? else {
            break;
        };
        let mut out = stdout.lock();
        writeln!(out, "{text}")?;
        out.flush()?;
        seen += 1;
    }
    let _ = client.close();
    Ok(())
}
