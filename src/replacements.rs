//! Replacement table: rule id -> "ruleId[:language]"
//!
//! Reads Java-style `.properties` files (`=`, `:` or whitespace separators,
//! backslash escapes and continuations) as well as YAML/JSON maps.

use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Error loading a replacement table
#[derive(Debug, Error)]
pub enum ReplacementError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid entry at line {line}: {content}")]
    Invalid { line: usize, content: String },
}

/// Read-only mapping from deprecated rule ids to their replacement pointers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplacementTable {
    entries: BTreeMap<String, String>,
}

impl ReplacementTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a file, choosing the format by extension
    pub fn load(path: &Path) -> Result<Self, ReplacementError> {
        let content = std::fs::read_to_string(path)?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            "yaml" | "yml" => Ok(Self {
                entries: serde_yaml::from_str(&content)?,
            }),
            "json" => Ok(Self {
                entries: serde_json::from_str(&content)?,
            }),
            _ => Self::parse_properties(&content),
        }
    }

    /// Parse Java-style properties
    ///
    /// The key ends at the first unescaped `=`, `:` or whitespace; `#` and `!`
    /// start comment lines and a trailing backslash continues a line. Lines
    /// with an empty key or no value are rejected.
    pub fn parse_properties(content: &str) -> Result<Self, ReplacementError> {
        let mut entries = BTreeMap::new();
        let mut lines = content.lines().enumerate();
        while let Some((i, raw)) = lines.next() {
            let mut line = raw.trim_start().to_string();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            while continues(&line) {
                line.pop();
                match lines.next() {
                    Some((_, next)) => line.push_str(next.trim_start()),
                    None => break,
                }
            }

            let invalid = || ReplacementError::Invalid {
                line: i + 1,
                content: raw.trim().to_string(),
            };
            let (key, value) = split_property(&line);
            let key = unescape(key).ok_or_else(invalid)?;
            let value = unescape(value).ok_or_else(invalid)?;
            let value = value.trim_end();
            if key.is_empty() || value.is_empty() {
                return Err(invalid());
            }
            entries.insert(key, value.to_string());
        }
        Ok(Self { entries })
    }

    pub fn insert(&mut self, id: &str, replacement: &str) {
        self.entries.insert(id.to_string(), replacement.to_string());
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.entries.get(id).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }
}

/// Odd number of trailing backslashes
fn continues(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

/// Split at the first unescaped `=`, `:` or whitespace
fn split_property(line: &str) -> (&str, &str) {
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => return (&line[..i], line[i + 1..].trim_start()),
            c if c.is_whitespace() => {
                let rest = line[i..].trim_start();
                let rest = rest.strip_prefix(['=', ':']).unwrap_or(rest);
                return (&line[..i], rest.trim_start());
            }
            _ => {}
        }
    }
    (line, "")
}

/// Resolve backslash escapes; `None` on a malformed `\uXXXX`
fn unescape(s: &str) -> Option<String> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{c}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                if hex.len() != 4 {
                    return None;
                }
                out.push(u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32)?);
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    Some(out)
}
