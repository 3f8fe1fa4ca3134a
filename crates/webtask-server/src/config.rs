//! Server configuration.

use std::{net::SocketAddr, path::PathBuf};

/// TTL window a session gets on creation and on every agent contact.
pub const DEFAULT_TTL_SECS: u32 = 3;

/// Runtime configuration, read from the environment with sane defaults.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to. `WEBTASK_ADDR`.
    pub bind: SocketAddr,
    /// Session TTL window in seconds. `WEBTASK_TTL_SECS`.
    pub ttl: u32,
    /// Directory for per-host session records. `WEBTASK_SESSIONS_DIR`.
    pub sessions_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 5000)),
            ttl: DEFAULT_TTL_SECS,
            sessions_dir: PathBuf::from("sessions"),
        }
    }
}

impl ServerConfig {
    /// Read configuration from the environment. Unset or unparseable
    /// values fall back to the defaults with a warning.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let bind = env_parsed("WEBTASK_ADDR").unwrap_or(defaults.bind);
        let ttl = env_parsed::<u32>("WEBTASK_TTL_SECS")
            .filter(|&ttl| {
                if ttl == 0 {
                    tracing::warn!("WEBTASK_TTL_SECS must be positive, using default");
                }
                ttl > 0
            })
            .unwrap_or(defaults.ttl);
        let sessions_dir = std::env::var_os("WEBTASK_SESSIONS_DIR")
            .map_or(defaults.sessions_dir, PathBuf::from);

        Self {
            bind,
            ttl,
            sessions_dir,
        }
    }
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(%name, %raw, "unparseable value, using default");
            None
        }
    }
}
