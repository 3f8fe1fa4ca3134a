//! Core session state for the webtask tasking server.
//!
//! This crate provides the building blocks shared by the HTTP layer and
//! the operator console:
//! - `Session` / `SessionRegistry` - per-host state and the active set
//! - `WaitGate` - the console's single-host blocking wait
//! - `SessionStore` - persistence seam for per-host records

pub mod registry;
pub mod session;
pub mod store;
pub mod wait;

pub use registry::{SessionInfo, SessionRegistry};
pub use session::{LIVENESS_MARKER, NOOP_SENTINEL, Session, SessionRecord};
pub use store::{FsStore, NullStore, SessionStore, StoreError};
pub use wait::WaitGate;
