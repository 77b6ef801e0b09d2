//! Deprecation pointers between rules
//!
//! A pointer has the form `ruleId` or `ruleId:language`. Unqualified pointers
//! apply to every language. A qualified pointer deprecates the rule in the named
//! language and removes it from all others.

use std::fmt;
use std::str::FromStr;

/// Parsed replacement pointer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplacementPointer {
    /// Rule to use instead
    pub rule_id: String,
    /// Language the pointer is restricted to
    pub language: Option<String>,
}

impl ReplacementPointer {
    /// Whether the pointer applies to `language`
    pub fn applies_to(&self, language: &str) -> bool {
        self.language
            .as_deref()
            .map_or(true, |lang| lang.eq_ignore_ascii_case(language))
    }
}

impl FromStr for ReplacementPointer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (rule_id, language) = match s.split_once(':') {
            Some((id, lang)) => (id.trim(), Some(lang.trim()).filter(|l| !l.is_empty())),
            None => (s.trim(), None),
        };
        if rule_id.is_empty() {
            return Err(format!("Replacement pointer without rule id: '{}'", s));
        }
        Ok(Self {
            rule_id: rule_id.to_string(),
            language: language.map(String::from),
        })
    }
}

impl fmt::Display for ReplacementPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.language {
            Some(lang) => write!(f, "{}:{}", self.rule_id, lang),
            None => write!(f, "{}", self.rule_id),
        }
    }
}

/// What happens to a rule in one language's catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// No replacement, rule is active
    Active,
    /// Rule stays but is deprecated in favour of `replacement`
    Deprecated { replacement: String },
    /// Rule belongs to another language's catalog only
    Dropped,
}

impl Resolution {
    pub fn is_deprecated(&self) -> bool {
        matches!(self, Resolution::Deprecated { .. })
    }
}

/// Decide the fate of a rule with the given replacement pointer in `language`
///
/// Invalid pointers are reported as `Err` so callers can log them; the rule is
/// then treated as active.
pub fn resolve(replacement: Option<&str>, language: &str) -> Result<Resolution, String> {
    let Some(raw) = replacement else {
        return Ok(Resolution::Active);
    };
    let pointer: ReplacementPointer = raw.parse()?;
    if pointer.applies_to(language) {
        Ok(Resolution::Deprecated {
            replacement: pointer.rule_id,
        })
    } else {
        Ok(Resolution::Dropped)
    }
}

/// Description fragment appended to deprecated rules
pub fn deprecation_notice(language: &str, replacement: &str) -> String {
    format!(
        "<h2>Deprecated</h2><p>This rule is deprecated, use {{rule:{}:{}}} instead.</p>",
        language, replacement
    )
}
