//! Console line parsing.

/// Target of a `show` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShowTarget {
    /// `show sessions` - the active session table.
    Sessions,
    /// `show all` - every environment variable.
    All,
    /// `show <name>` - one variable.
    Var(String),
}

/// A parsed console line.
///
/// The command set is closed; anything unrecognized keeps its command
/// word for the error message. A bare `set` or `show` is a quiet no-op,
/// matching a blank line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Blank input, nothing to do.
    Empty,
    /// `help`.
    Help,
    /// `set <name> <value...>` - value rejoined with single spaces.
    Set { name: String, value: String },
    /// `show sessions|all|<name>`.
    Show(ShowTarget),
    /// `exec <script...>` - script is the raw remainder of the line and
    /// may be empty; the controller reports the missing-script error.
    Exec { script: String },
    /// `exit` or `quit`.
    Exit,
    /// Anything else.
    Unknown(String),
}

impl ConsoleCommand {
    /// Parse one line of operator input.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        let mut parts = trimmed.split_whitespace();
        let Some(word) = parts.next() else {
            return Self::Empty;
        };

        match word {
            "exit" | "quit" => Self::Exit,
            "help" => Self::Help,
            "set" => match parts.next() {
                Some(name) => Self::Set {
                    name: name.to_string(),
                    value: parts.collect::<Vec<_>>().join(" "),
                },
                None => Self::Empty,
            },
            "show" => match parts.next() {
                Some("sessions") => Self::Show(ShowTarget::Sessions),
                Some("all") => Self::Show(ShowTarget::All),
                Some(name) => Self::Show(ShowTarget::Var(name.to_string())),
                None => Self::Empty,
            },
            "exec" => {
                // Scripts keep their internal spacing untouched.
                let script = trimmed
                    .split_once(char::is_whitespace)
                    .map(|(_, rest)| rest.trim_start().to_string())
                    .unwrap_or_default();
                Self::Exec { script }
            }
            other => Self::Unknown(other.to_string()),
        }
    }
}
