//! Once-a-second session aging.

use std::{sync::Arc, time::Duration};

use tokio::{sync::watch, time::MissedTickBehavior};
use webtask_core::{SessionRegistry, WaitGate};

/// Background loop that ages every session once a second and evicts the
/// ones whose TTL reaches zero.
///
/// Eviction of the host the console is waiting on releases the wait; the
/// command is considered abandoned.
pub struct ExpiryLoop {
    registry: Arc<SessionRegistry>,
    gate: Arc<WaitGate>,
    shutdown: watch::Receiver<bool>,
}

impl ExpiryLoop {
    /// Build the loop over the shared state and a shutdown flag.
    #[must_use]
    pub fn new(
        registry: Arc<SessionRegistry>,
        gate: Arc<WaitGate>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            registry,
            gate,
            shutdown,
        }
    }

    /// Run until the shutdown flag flips. An in-flight tick always
    /// completes before the loop exits.
    pub async fn run(mut self) {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => self.tick_once().await,
                result = self.shutdown.changed() => {
                    if result.is_err() || *self.shutdown.borrow() {
                        tracing::debug!("expiry loop stopping");
                        return;
                    }
                }
            }
        }
    }

    async fn tick_once(&self) {
        for host in self.registry.expire_tick().await {
            tracing::info!(%host, "session expired");
            if self.gate.clear_if(&host) {
                tracing::info!(%host, "console wait released by expiry, command abandoned");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared() -> (Arc<SessionRegistry>, Arc<WaitGate>) {
        (
            Arc::new(SessionRegistry::in_memory(2)),
            Arc::new(WaitGate::new()),
        )
    }

    #[tokio::test]
    async fn expiry_of_awaited_host_releases_the_gate() {
        let (registry, gate) = shared();
        registry.get_or_create("a.test").await;
        gate.block_on("a.test");

        let (_tx, rx) = watch::channel(false);
        let expiry = ExpiryLoop::new(Arc::clone(&registry), Arc::clone(&gate), rx);

        expiry.tick_once().await;
        assert_eq!(gate.blocked_host().as_deref(), Some("a.test"));

        expiry.tick_once().await;
        assert_eq!(gate.blocked_host(), None);
        assert!(registry.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn expiry_of_other_hosts_leaves_the_gate_armed() {
        let (registry, gate) = shared();
        registry.get_or_create("a.test").await;
        gate.block_on("b.test");

        let (_tx, rx) = watch::channel(false);
        let expiry = ExpiryLoop::new(Arc::clone(&registry), Arc::clone(&gate), rx);
        expiry.tick_once().await;
        expiry.tick_once().await;

        assert_eq!(gate.blocked_host().as_deref(), Some("b.test"));
    }

    #[tokio::test(start_paused = true)]
    async fn loop_ticks_once_per_second_and_honors_shutdown() {
        let (registry, gate) = shared();
        registry.get_or_create("a.test").await;

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(
            ExpiryLoop::new(Arc::clone(&registry), Arc::clone(&gate), rx).run(),
        );

        // First tick fires immediately, the next after a full second.
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(registry.snapshot().await.is_empty());

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("loop should stop after shutdown")
            .expect("loop task should not panic");
    }
}
