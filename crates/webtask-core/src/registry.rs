//! The set of active sessions, keyed by hostname.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;

use crate::{session::Session, store::SessionStore};

/// A `(host, ttl)` pair for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    /// Hostname the session is keyed by.
    pub host: String,
    /// Seconds remaining before eviction.
    pub ttl: u32,
}

struct Inner {
    sessions: HashMap<String, Session>,
    next_seq: u64,
}

/// The active session set.
///
/// This is one of the two pieces of state shared between the HTTP
/// handlers, the expiry loop, and the console; every access goes through
/// the write/read lock held here.
pub struct SessionRegistry {
    inner: RwLock<Inner>,
    window: u32,
    store: Arc<dyn SessionStore>,
}

impl SessionRegistry {
    /// Create a registry whose sessions start with `window` seconds of TTL.
    #[must_use]
    pub fn new(window: u32, store: Arc<dyn SessionStore>) -> Self {
        Self {
            inner: RwLock::new(Inner {
                sessions: HashMap::new(),
                next_seq: 0,
            }),
            window,
            store,
        }
    }

    /// Registry backed by no persistence at all.
    #[must_use]
    pub fn in_memory(window: u32) -> Self {
        Self::new(window, Arc::new(crate::store::NullStore))
    }

    /// TTL window new and touched sessions receive.
    #[must_use]
    pub const fn window(&self) -> u32 {
        self.window
    }

    /// Ensure a session exists for `host`, creating one on first contact.
    ///
    /// A stored record for the host, if any, seeds the new session so a
    /// command queued before the agent went quiet is not lost. Returns
    /// `true` if a session was created.
    pub async fn get_or_create(&self, host: &str) -> bool {
        let mut inner = self.inner.write().await;
        if inner.sessions.contains_key(host) {
            return false;
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;

        let session = match self.store.load(host).await {
            Ok(Some(record)) => Session::from_record(record, self.window, seq),
            Ok(None) => Session::new(host, self.window, seq),
            Err(err) => {
                tracing::warn!(%host, %err, "failed to load stored session, starting fresh");
                Session::new(host, self.window, seq)
            }
        };

        inner.sessions.insert(host.to_string(), session);
        true
    }

    /// Reset the TTL of `host`'s session, if one exists.
    pub async fn touch(&self, host: &str) {
        if let Some(session) = self.inner.write().await.sessions.get_mut(host) {
            session.reset_ttl(self.window);
        }
    }

    /// Queue a command for `host`.
    ///
    /// Returns `false` when no session exists, in which case the command
    /// is dropped. Never creates a session.
    pub async fn enqueue(&self, host: &str, command: &str) -> bool {
        let mut inner = self.inner.write().await;
        let Some(session) = inner.sessions.get_mut(host) else {
            return false;
        };
        if let Some(replaced) = session.enqueue(command) {
            tracing::debug!(%host, %replaced, "pending command overwritten before fetch");
        }
        true
    }

    /// Take the pending command for `host`, or `None` when no session
    /// exists. An empty slot yields the no-op sentinel.
    pub async fn consume_next(&self, host: &str) -> Option<String> {
        self.inner
            .write()
            .await
            .sessions
            .get_mut(host)
            .map(Session::consume)
    }

    /// Drop `host`'s session. Returns `true` if one existed.
    pub async fn remove(&self, host: &str) -> bool {
        self.inner.write().await.sessions.remove(host).is_some()
    }

    /// Owned `(host, ttl)` snapshot in insertion order.
    pub async fn snapshot(&self) -> Vec<SessionInfo> {
        let inner = self.inner.read().await;
        let mut sessions: Vec<&Session> = inner.sessions.values().collect();
        sessions.sort_by_key(|s| s.seq());
        sessions
            .into_iter()
            .map(|s| SessionInfo {
                host: s.host().to_string(),
                ttl: s.ttl(),
            })
            .collect()
    }

    /// Age every session by one second and evict those that hit zero.
    ///
    /// Evicted sessions with an unfetched command are written back to the
    /// store so the command survives the agent's absence. Returns the
    /// evicted hosts.
    pub async fn expire_tick(&self) -> Vec<String> {
        let expired: Vec<Session> = {
            let mut inner = self.inner.write().await;
            let hosts: Vec<String> = inner
                .sessions
                .values_mut()
                .filter_map(|s| s.tick().then(|| s.host().to_string()))
                .collect();
            hosts
                .iter()
                .filter_map(|h| inner.sessions.remove(h))
                .collect()
        };

        let mut hosts = Vec::with_capacity(expired.len());
        for session in expired {
            if session.has_pending() {
                if let Err(err) = self.store.save(&session.record()).await {
                    tracing::warn!(host = %session.host(), %err, "failed to persist expired session");
                }
            }
            hosts.push(session.host().to_string());
        }
        hosts
    }
}
