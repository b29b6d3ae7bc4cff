use std::path::PathBuf;

use a11y_inspector_daemon::TransportVariant;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;

const LONG_ABOUT: &str = r#"a11y-inspector serves accessibility tree captures over WebSocket.

A server answers three commands sent as {"message": "<command>"}:
    capture              capture important views and broadcast to every client
    captureNotImportant  toggle not-important views, then capture
    ping                 reply {"message":"pong"} to the sender only

EXAMPLES:
    # Serve a recorded scene on the default port
    a11y-inspector serve --scene scene.json

    # Ask a running inspector for a capture
    a11y-inspector capture
    a11y-inspector capture --not-important --url ws://10.0.2.2:38301/

    # Print every frame the inspector broadcasts
    a11y-inspector watch"#;

#[derive(Debug, Parser)]
#[command(name = "a11y-inspector")]
#[command(author, version)]
#[command(about = "Serve and query accessibility tree captures over WebSocket")]
#[command(long_about = LONG_ABOUT)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransportArg {
    Direct,
    Relay,
}

impl From<TransportArg> for TransportVariant {
    fn from(value: TransportArg) -> Self {
        match value {
            TransportArg::Direct => TransportVariant::Direct,
            TransportArg::Relay => TransportVariant::Relay,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Serve captures of a scene file until interrupted
    Serve {
        /// Scene JSON: windows plus an arena of nodes referenced by id
        #[arg(long)]
        scene: PathBuf,

        /// Address to bind (default: A11Y_INSPECTOR_BIND or 127.0.0.1)
        #[arg(long)]
        bind: Option<String>,

        /// Port to listen on (default: A11Y_INSPECTOR_PORT or 38301)
        #[arg(short, long)]
        port: Option<u16>,

        /// How capture frames reach clients (default: A11Y_INSPECTOR_TRANSPORT or relay)
        #[arg(long, value_enum)]
        transport: Option<TransportArg>,

        /// PNG attached to every capture as a base64 screenshot
        #[arg(long)]
        screenshot: Option<PathBuf>,
    },

    /// Request one capture and print it as JSON
    Capture {
        #[command(flatten)]
        conn: ConnectionArgs,

        /// Toggle not-important views before capturing
        #[arg(long)]
        not_important: bool,

        /// Write the screenshot, if any, to this file
        #[arg(long)]
        save_screenshot: Option<PathBuf>,
    },

    /// Check that an inspector is answering
    Ping {
        #[command(flatten)]
        conn: ConnectionArgs,
    },

    /// Print every frame the inspector sends, one per line
    Watch {
        #[command(flatten)]
        conn: ConnectionArgs,

        /// Stop after this many frames
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },
}

#[derive(Debug, Clone, clap::Args)]
pub struct ConnectionArgs {
    /// Inspector WebSocket URL
    #[arg(long, env = "A11Y_INSPECTOR_URL", default_value = "ws://127.0.0.1:38301/")]
    pub url: String,

    /// Seconds to wait for a reply
    #[arg(long, default_value = "30")]
    pub timeout: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_overrides() {
        let cli = Cli::parse_from([
            "a11y-inspector",
            "serve",
            "--scene",
            "scene.json",
            "--port",
            "0",
            "--transport",
            "direct",
        ]);
        let Commands::Serve {
            scene,
            port,
            transport,
            bind,
            screenshot,
        } = cli.command
        else {
            panic!("expected serve");
        };
        assert_eq!(scene, PathBuf::from("scene.json"));
        assert_eq!(port, Some(0));
        assert_eq!(transport, Some(TransportArg::Direct));
        assert!(bind.is_none());
        assert!(screenshot.is_none());
    }

    #[test]
    fn test_capture_defaults() {
        let cli = Cli::parse_from(["a11y-inspector", "capture", "--not-important"]);
        let Commands::Capture {
            conn,
            not_important,
            save_screenshot,
        } = cli.command
        else {
            panic!("expected capture");
        };
        assert!(not_important);
        assert!(save_screenshot.is_none());
        assert_eq!(conn.timeout, 30);
    }

    #[test]
    fn test_serve_requires_scene() {
        assert!(Cli::try_parse_from(["a11y-inspector", "serve"]).is_err());
    }
}
