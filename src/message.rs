//! Message types for Cppcheck diagnostics

use serde::{Deserialize, Serialize};

/// Where a diagnostic instance was reported
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// File path as written by Cppcheck
    pub file: String,
    /// Line number, kept as text (may be "0" for unknown)
    pub line: Option<String>,
}

impl Location {
    pub fn new(file: &str, line: Option<&str>) -> Self {
        Self {
            file: file.to_string(),
            line: line.map(String::from),
        }
    }
}

/// What a message carries besides its text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum Payload {
    /// Diagnostic instance reported at a location
    Located(Location),
    /// Rule definition, optionally pointing at its replacement ("ruleId[:language]")
    Definition { replacement: Option<String> },
}

/// One Cppcheck `error` record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Cppcheck rule id (e.g. "nullPointer")
    pub id: String,
    /// Severity as reported ("error", "style", ...)
    pub severity: Option<String>,
    /// Short message
    pub msg: String,
    /// Long message
    pub verbose: String,
    /// Location or replacement, never both
    pub payload: Payload,
}

impl Message {
    /// Create a diagnostic instance
    pub fn located(id: &str, severity: Option<&str>, msg: &str, verbose: &str, location: Location) -> Self {
        Self {
            id: id.to_string(),
            severity: severity.map(String::from),
            msg: msg.to_string(),
            verbose: verbose.to_string(),
            payload: Payload::Located(location),
        }
    }

    /// Create a rule definition
    pub fn definition(
        id: &str,
        severity: Option<&str>,
        msg: &str,
        verbose: &str,
        replacement: Option<&str>,
    ) -> Self {
        Self {
            id: id.to_string(),
            severity: severity.map(String::from),
            msg: msg.to_string(),
            verbose: verbose.to_string(),
            payload: Payload::Definition {
                replacement: replacement.map(String::from),
            },
        }
    }

    pub fn location(&self) -> Option<&Location> {
        match &self.payload {
            Payload::Located(location) => Some(location),
            Payload::Definition { .. } => None,
        }
    }

    pub fn replacement(&self) -> Option<&str> {
        match &self.payload {
            Payload::Definition { replacement } => replacement.as_deref(),
            Payload::Located(_) => None,
        }
    }

    pub fn filename(&self) -> Option<&str> {
        self.location().map(|l| l.file.as_str())
    }

    pub fn line(&self) -> Option<&str> {
        self.location().and_then(|l| l.line.as_deref())
    }
}
