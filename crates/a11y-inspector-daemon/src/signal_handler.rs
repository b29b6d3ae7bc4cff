//! SIGINT/SIGTERM handling for `serve`.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::thread;

use signal_hook::consts::SIGINT;
use signal_hook::consts::SIGTERM;
use signal_hook::iterator::Signals;
use tracing::info;

use crate::error::DaemonError;

/// Sets a shutdown flag when SIGINT or SIGTERM arrives.
pub struct SignalHandler {
    flag: Arc<AtomicBool>,
}

impl SignalHandler {
    pub fn setup() -> Result<Self, DaemonError> {
        let flag = Arc::new(AtomicBool::new(false));
        let mut signals =
            Signals::new([SIGINT, SIGTERM]).map_err(|e| DaemonError::SignalSetup(e.to_string()))?;

        let shutdown = Arc::clone(&flag);
        thread::Builder::new()
            .name("signal-handler".to_string())
            .spawn(move || {
                if let Some(sig) = signals.forever().next() {
                    info!(signal = sig, "Received signal, initiating graceful shutdown");
                    shutdown.store(true, Ordering::SeqCst);
                }
            })
            .map_err(|e| DaemonError::SignalSetup(format!("failed to spawn signal handler: {e}")))?;

        Ok(Self { flag })
    }

    pub fn shutdown_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
