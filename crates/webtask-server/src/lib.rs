//! Server side of webtask.
//!
//! Provides:
//! - `CommandRouter` - the operations the HTTP layer and console share
//! - `ExpiryLoop` - once-a-second session aging and eviction
//! - The agent-facing axum routes (`/`, `/cmd`, `/result`)
//! - `ServerConfig` - bind address, TTL window, sessions directory

pub mod config;
pub mod expiry;
pub mod http;
pub mod router;

pub use config::ServerConfig;
pub use expiry::ExpiryLoop;
pub use router::{CommandRouter, ResultEvent};
