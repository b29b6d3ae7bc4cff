use clap::Parser;

use a11y_inspector::commands::Cli;
use a11y_inspector::commands::Commands;
use a11y_inspector::handlers;
use a11y_inspector::handlers::ServeArgs;
use a11y_inspector_common::init_tracing;
use a11y_inspector_daemon::DaemonError;
use a11y_inspector_ipc::ClientError;

fn main() {
    if let Err(e) = run() {
        if let Some(client_error) = e.downcast_ref::<ClientError>() {
            eprintln!("Error: {client_error}");
            if let Some(suggestion) = client_error.suggestion() {
                eprintln!("Suggestion: {suggestion}");
            }
            if client_error.is_retryable() {
                eprintln!("(This error may be transient - retry may succeed)");
            }
            std::process::exit(exit_code_for_client_error(client_error));
        } else if let Some(daemon_error) = e.downcast_ref::<DaemonError>() {
            eprintln!("Error: {daemon_error}");
            eprintln!("Suggestion: {}", daemon_error.suggestion());
            if daemon_error.is_retryable() {
                eprintln!("(This error may be transient - retry may succeed)");
            }
            std::process::exit(74); // EX_IOERR
        } else {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}

fn exit_code_for_client_error(error: &ClientError) -> i32 {
    match error {
        ClientError::InvalidUrl { .. } => 64, // EX_USAGE
        ClientError::ConnectionFailed(_) => 69, // EX_UNAVAILABLE
        ClientError::Timeout => 75,           // EX_TEMPFAIL
        _ => 74,                              // EX_IOERR
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _telemetry = init_tracing(if cli.verbose { "debug" } else { "info" });

    match cli.command {
        Commands::Serve {
            scene,
            bind,
            port,
            transport,
            screenshot,
        } => handlers::handle_serve(ServeArgs {
            scene: &scene,
            bind,
            port,
            transport,
            screenshot: screenshot.as_deref(),
        }),
        Commands::Capture {
            conn,
            not_important,
            save_screenshot,
        } => handlers::handle_capture(&conn, not_important, save_screenshot.as_deref()),
        Commands::Ping { conn } => handlers::handle_ping(&conn),
        Commands::Watch { conn, count } => handlers::handle_watch(&conn, count),
    }
}
