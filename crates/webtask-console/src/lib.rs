//! Operator console for webtask.
//!
//! Provides:
//! - `ConsoleCommand` - the closed set of recognized commands
//! - `ConsoleEnv` - the operator's variable environment
//! - `ConsoleController` - the read-eval loop, including the blocking
//!   wait after `exec`

pub mod command;
pub mod controller;
pub mod env;

pub use command::{ConsoleCommand, ShowTarget};
pub use controller::ConsoleController;
pub use env::ConsoleEnv;
