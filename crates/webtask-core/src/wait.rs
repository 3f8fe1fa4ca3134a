//! The console's single-host blocking wait.

use std::sync::Mutex;

use tokio::sync::Notify;

/// Tracks the one host the console is waiting on a result from.
///
/// `exec` arms the gate; a result from the armed host or its expiry
/// releases it. The console awaits [`WaitGate::released`] instead of
/// polling, so a release between check and sleep cannot be missed.
#[derive(Debug, Default)]
pub struct WaitGate {
    blocked: Mutex<Option<String>>,
    notify: Notify,
}

impl WaitGate {
    /// Create an unarmed gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the gate on `host`, replacing any previous target.
    pub fn block_on(&self, host: impl Into<String>) {
        *self.blocked.lock().unwrap() = Some(host.into());
    }

    /// The host currently being waited on, if any.
    #[must_use]
    pub fn blocked_host(&self) -> Option<String> {
        self.blocked.lock().unwrap().clone()
    }

    /// Release the gate unconditionally.
    pub fn clear(&self) {
        *self.blocked.lock().unwrap() = None;
        self.notify.notify_waiters();
    }

    /// Release the gate iff it is armed on `host`. Returns whether it was.
    pub fn clear_if(&self, host: &str) -> bool {
        let mut blocked = self.blocked.lock().unwrap();
        if blocked.as_deref() == Some(host) {
            *blocked = None;
            drop(blocked);
            self.notify.notify_waiters();
            true
        } else {
            false
        }
    }

    /// Wait until the gate is unarmed. Returns immediately if it already is.
    pub async fn released(&self) {
        loop {
            // Register for notification before checking, otherwise a clear
            // landing between the check and the await would be lost.
            let notified = self.notify.notified();
            if self.blocked.lock().unwrap().is_none() {
                return;
            }
            notified.await;
        }
    }
}
