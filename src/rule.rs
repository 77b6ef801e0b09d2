//! Per-language rule repositories built from the catalog

use crate::deprecation::{deprecation_notice, resolve, Resolution};
use crate::events::EventSink;
use crate::message::Message;
use crate::parser::{parse_file, ParseError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Suffix of every repository key (`c-cppcheck`, `cpp-cppcheck`)
pub const REPOSITORY_KEY: &str = "cppcheck";
/// Human-readable repository name
pub const REPOSITORY_NAME: &str = "Cppcheck";

/// Repository key for a language
pub fn repository_key(language: &str) -> String {
    format!("{}-{}", language, REPOSITORY_KEY)
}

/// Rule priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RulePriority {
    Info,
    Minor,
    #[default]
    Major,
    Critical,
    Blocker,
}

impl fmt::Display for RulePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RulePriority::Info => write!(f, "info"),
            RulePriority::Minor => write!(f, "minor"),
            RulePriority::Major => write!(f, "major"),
            RulePriority::Critical => write!(f, "critical"),
            RulePriority::Blocker => write!(f, "blocker"),
        }
    }
}

/// Rule status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleStatus {
    /// Rule is current
    #[default]
    Ready,
    /// Rule has a replacement
    Deprecated,
}

impl fmt::Display for RuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleStatus::Ready => write!(f, "ready"),
            RuleStatus::Deprecated => write!(f, "deprecated"),
        }
    }
}

/// A rule definition in one language's repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Cppcheck rule id
    pub key: String,
    /// Key used in tool configuration (same as `key`)
    pub config_key: String,
    pub name: String,
    /// HTML description
    pub description: String,
    pub priority: RulePriority,
    pub status: RuleStatus,
    /// Rule to use instead, when deprecated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replacement: Option<String>,
}

impl Rule {
    pub fn is_deprecated(&self) -> bool {
        self.status == RuleStatus::Deprecated
    }
}

/// Rules of one language
#[derive(Debug, Clone)]
pub struct RuleRepository {
    language: String,
    rules: Vec<Rule>,
}

impl RuleRepository {
    /// Build from catalog definitions
    ///
    /// Rules whose replacement points into another language are left out.
    pub fn from_definitions(language: &str, definitions: &[Message], sink: &dyn EventSink) -> Self {
        let mut rules = Vec::new();
        for message in definitions {
            let resolution = resolve(message.replacement(), language).unwrap_or_else(|e| {
                sink.warn(&format!("Ignoring replacement of rule {}: {}", message.id, e));
                Resolution::Active
            });

            let mut rule = Rule {
                key: message.id.clone(),
                config_key: message.id.clone(),
                name: message.msg.clone(),
                description: format!("<p>{}</p>", message.verbose),
                priority: RulePriority::Major,
                status: RuleStatus::Ready,
                replacement: None,
            };

            match resolution {
                Resolution::Active => {}
                Resolution::Deprecated { replacement } => {
                    rule.status = RuleStatus::Deprecated;
                    rule.description
                        .push_str(&deprecation_notice(language, &replacement));
                    rule.replacement = Some(replacement);
                }
                Resolution::Dropped => continue,
            }
            rules.push(rule);
        }

        Self {
            language: language.to_string(),
            rules,
        }
    }

    /// Build from a persisted catalog file
    pub fn load(language: &str, catalog_path: &Path, sink: &dyn EventSink) -> Result<Self, ParseError> {
        let definitions = parse_file(catalog_path, sink)?;
        Ok(Self::from_definitions(language, &definitions, sink))
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn key(&self) -> String {
        repository_key(&self.language)
    }

    pub fn name(&self) -> &str {
        REPOSITORY_NAME
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn find(&self, key: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.key == key)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn deprecated_count(&self) -> usize {
        self.rules.iter().filter(|r| r.is_deprecated()).count()
    }
}
