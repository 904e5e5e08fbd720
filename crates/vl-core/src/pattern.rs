//! Allow/deny regular-expression patterns for selecting schemas and views

use crate::error::{CoreError, CoreResult};
use crate::serde_helpers::default_true;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

const ALLOW_ALL: &str = ".*";

fn default_allow() -> Vec<String> {
    vec![ALLOW_ALL.to_string()]
}

/// On-disk shape of a pattern, compiled into [`AllowDenyPattern`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct PatternSpec {
    #[serde(default = "default_allow")]
    allow: Vec<String>,
    #[serde(default)]
    deny: Vec<String>,
    #[serde(default = "default_true", alias = "ignoreCase")]
    ignore_case: bool,
}

/// A list of allow and deny regexes
///
/// A value is allowed when no deny pattern matches it and at least one allow
/// pattern does. Patterns are anchored at the start of the value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "PatternSpec", into = "PatternSpec")]
pub struct AllowDenyPattern {
    allow: Vec<String>,
    deny: Vec<String>,
    ignore_case: bool,
    allow_re: Vec<Regex>,
    deny_re: Vec<Regex>,
}

impl AllowDenyPattern {
    /// Compile a pattern set
    pub fn new(allow: Vec<String>, deny: Vec<String>, ignore_case: bool) -> CoreResult<Self> {
        let allow_re = compile_all(&allow, ignore_case)?;
        let deny_re = compile_all(&deny, ignore_case)?;
        Ok(Self {
            allow,
            deny,
            ignore_case,
            allow_re,
            deny_re,
        })
    }

    /// A pattern that allows everything
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Whether `value` passes the pattern
    pub fn allowed(&self, value: &str) -> bool {
        if self.deny_re.iter().any(|re| re.is_match(value)) {
            return false;
        }
        self.allow_re.iter().any(|re| re.is_match(value))
    }

    /// Replace the allow list (an empty list keeps the current one)
    pub fn with_allow(self, allow: Vec<String>) -> CoreResult<Self> {
        if allow.is_empty() {
            return Ok(self);
        }
        Self::new(allow, self.deny, self.ignore_case)
    }

    /// Raw allow patterns
    pub fn allow(&self) -> &[String] {
        &self.allow
    }

    /// Raw deny patterns
    pub fn deny(&self) -> &[String] {
        &self.deny
    }
}

impl Default for AllowDenyPattern {
    fn default() -> Self {
        let allow_re = compile_all(&default_allow(), true).unwrap_or_default();
        Self {
            allow: default_allow(),
            deny: Vec::new(),
            ignore_case: true,
            allow_re,
            deny_re: Vec::new(),
        }
    }
}

impl TryFrom<PatternSpec> for AllowDenyPattern {
    type Error = CoreError;

    fn try_from(spec: PatternSpec) -> Result<Self, Self::Error> {
        Self::new(spec.allow, spec.deny, spec.ignore_case)
    }
}

impl From<AllowDenyPattern> for PatternSpec {
    fn from(pattern: AllowDenyPattern) -> Self {
        Self {
            allow: pattern.allow,
            deny: pattern.deny,
            ignore_case: pattern.ignore_case,
        }
    }
}

fn compile_all(patterns: &[String], ignore_case: bool) -> CoreResult<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| {
            RegexBuilder::new(&format!("^(?:{p})"))
                .case_insensitive(ignore_case)
                .build()
                .map_err(|e| CoreError::InvalidPattern {
                    pattern: p.clone(),
                    message: e.to_string(),
                })
        })
        .collect()
}

#[cfg(test)]
#[path = "pattern_test.rs"]
mod tests;
