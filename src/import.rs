//! Analysis-time import of a Cppcheck report
//!
//! The host hands over the parsed report, one [`LanguageScope`] per language it
//! analyses and the directory relative paths in the report are resolved against.
//! It gets back the issues to record; nothing here talks to the host directly.

use crate::events::EventSink;
use crate::message::Message;
use crate::rule::RuleRepository;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// What the host knows about one language
pub struct LanguageScope<'a> {
    /// Rules available for the language
    pub repository: &'a RuleRepository,
    /// Files of this language indexed by the host (absolute paths)
    pub indexed_files: HashSet<PathBuf>,
}

impl<'a> LanguageScope<'a> {
    pub fn new(repository: &'a RuleRepository, indexed_files: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            repository,
            indexed_files: indexed_files.into_iter().collect(),
        }
    }

    /// Language has rules to report against
    pub fn is_active(&self) -> bool {
        !self.repository.is_empty()
    }
}

/// An issue to record in the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub repository_key: String,
    pub rule_key: String,
    /// File the issue is on; `None` for project-level issues
    pub file: Option<PathBuf>,
    /// 1-based line; `None` when unknown
    pub line: Option<u32>,
    pub message: String,
}

/// Maps report messages onto rules and files
pub struct Importer<'a> {
    base_dir: PathBuf,
    sink: &'a dyn EventSink,
}

impl<'a> Importer<'a> {
    pub fn new(base_dir: &Path, sink: &'a dyn EventSink) -> Self {
        Self {
            base_dir: base_dir.to_path_buf(),
            sink,
        }
    }

    /// Whether any language has both rules and files
    pub fn should_import(scopes: &[LanguageScope]) -> bool {
        scopes
            .iter()
            .any(|s| s.is_active() && !s.indexed_files.is_empty())
    }

    /// Import messages for every active language
    pub fn import(&self, messages: &[Message], scopes: &[LanguageScope]) -> Vec<Issue> {
        let mut issues = Vec::new();
        for scope in scopes.iter().filter(|s| s.is_active()) {
            for message in messages {
                if let Some(issue) = self.import_message(message, scope) {
                    issues.push(issue);
                }
            }
        }
        issues
    }

    fn import_message(&self, message: &Message, scope: &LanguageScope) -> Option<Issue> {
        let repository = scope.repository;
        let Some(rule) = repository.find(&message.id) else {
            self.sink.warn(&format!(
                "No such rule in {}, so issue from Cppcheck will be ignored: {}",
                repository.key(),
                message.id
            ));
            return None;
        };

        let mut issue = Issue {
            repository_key: repository.key(),
            rule_key: rule.key.clone(),
            file: None,
            line: None,
            message: message.msg.clone(),
        };

        if let Some(location) = message.location() {
            let file = self.resolve(&location.file);
            if !scope.indexed_files.contains(&file) {
                self.sink.info(&format!(
                    "File not indexed for {}, so issue from Cppcheck will be ignored: {}",
                    repository.language(),
                    file.display()
                ));
                return None;
            }
            issue.line = location.line.as_deref().and_then(|l| self.parse_line(l));
            issue.file = Some(file);
        }

        Some(issue)
    }

    fn resolve(&self, file: &str) -> PathBuf {
        let path = Path::new(file);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Line 0 means Cppcheck did not know the line
    fn parse_line(&self, line: &str) -> Option<u32> {
        match line.trim().parse::<u32>() {
            Ok(0) => None,
            Ok(n) => Some(n),
            Err(_) => {
                self.sink
                    .warn(&format!("Invalid line number in Cppcheck report: '{}'", line));
                None
            }
        }
    }
}
