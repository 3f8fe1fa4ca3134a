//! The operator's variable environment.

use std::collections::BTreeMap;

/// Variable name the `exec` target hosts are read from.
pub const RHOST: &str = "RHOST";

/// Console variables, `set` by the operator and read by `exec`.
#[derive(Debug, Default)]
pub struct ConsoleEnv {
    vars: BTreeMap<String, String>,
}

impl ConsoleEnv {
    /// Empty environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a variable, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    /// Look up a variable.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// The `RHOST` value, if set and non-empty.
    #[must_use]
    pub fn rhost(&self) -> Option<&str> {
        self.get(RHOST).filter(|value| !value.is_empty())
    }

    /// All variables in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}
