//! Per-agent session state.

use serde::{Deserialize, Serialize};

/// Command returned to an agent when nothing is queued.
///
/// Agents `eval` whatever `/cmd` hands them, so the empty case must still
/// be a harmless script fragment.
pub const NOOP_SENTINEL: &str = "void(0)";

/// Reserved `response` value marking a liveness probe rather than a result.
pub const LIVENESS_MARKER: &str = "ALIVE";

/// State for one agent: a single-slot pending command and a TTL countdown.
///
/// A session exists in the registry iff its agent has contacted the server
/// within the last TTL window.
#[derive(Debug, Clone)]
pub struct Session {
    host: String,
    pending: Option<String>,
    ttl: u32,
    seq: u64,
}

/// The on-disk shape of a session, as stored by a [`SessionStore`].
///
/// TTL is deliberately absent: a reloaded session always starts with a
/// fresh window.
///
/// [`SessionStore`]: crate::store::SessionStore
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Hostname the agent connects through.
    pub host: String,
    /// Command queued but not yet fetched, if any.
    #[serde(default)]
    pub pending: Option<String>,
}

impl Session {
    /// Create a fresh session with a full TTL window.
    #[must_use]
    pub fn new(host: impl Into<String>, ttl: u32, seq: u64) -> Self {
        Self {
            host: host.into(),
            pending: None,
            ttl,
            seq,
        }
    }

    /// Rebuild a session from a persisted record.
    #[must_use]
    pub fn from_record(record: SessionRecord, ttl: u32, seq: u64) -> Self {
        Self {
            host: record.host,
            pending: record.pending,
            ttl,
            seq,
        }
    }

    /// Hostname this session is keyed by.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Seconds left before the session is considered inactive.
    #[must_use]
    pub const fn ttl(&self) -> u32 {
        self.ttl
    }

    /// Insertion sequence number, used only to order display snapshots.
    #[must_use]
    pub const fn seq(&self) -> u64 {
        self.seq
    }

    /// Queue a command for the agent's next poll.
    ///
    /// The slot holds a single command: queueing over an unconsumed one
    /// replaces it, and the replaced command is returned.
    pub fn enqueue(&mut self, command: impl Into<String>) -> Option<String> {
        self.pending.replace(command.into())
    }

    /// Take the pending command, or the no-op sentinel if none is queued.
    pub fn consume(&mut self) -> String {
        self.pending
            .take()
            .unwrap_or_else(|| NOOP_SENTINEL.to_string())
    }

    /// Whether a command is queued and unconsumed.
    #[must_use]
    pub const fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Put the TTL back to a full window. Called on every agent contact.
    pub fn reset_ttl(&mut self, window: u32) {
        self.ttl = window;
    }

    /// Age the session by one second, reporting whether it just expired.
    pub fn tick(&mut self) -> bool {
        self.ttl = self.ttl.saturating_sub(1);
        self.ttl == 0
    }

    /// Snapshot the persistable fields.
    #[must_use]
    pub fn record(&self) -> SessionRecord {
        SessionRecord {
            host: self.host.clone(),
            pending: self.pending.clone(),
        }
    }
}
