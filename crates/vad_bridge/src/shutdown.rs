//! Process-wide shutdown coordination.
//!
//! One boolean, set by the signal handler (or by tests), polled by every
//! loop. Receivers unblock through their one-second socket timeouts, so no
//! thread waits more than a second past the trigger.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable handle on the running flag.
#[derive(Debug, Clone)]
pub struct ShutdownFlag {
    running: Arc<AtomicBool>,
}

impl ShutdownFlag {
    /// Creates a flag in the running state.
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// True until shutdown has been requested.
    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Requests shutdown. Idempotent.
    pub fn trigger(&self) {
        self.running.store(false, Ordering::Release);
    }
}

impl Default for ShutdownFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Routes SIGINT and SIGTERM to [`ShutdownFlag::trigger`].
pub fn install_signal_handler(flag: &ShutdownFlag) -> Result<(), ctrlc::Error> {
    let flag = flag.clone();
    ctrlc::set_handler(move || {
        tracing::info!("shutdown signal received");
        flag.trigger();
    })
}
