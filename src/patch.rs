/// Pattern-and-replacement rule applied to a snippet payload.
use regex::{NoExpand, Regex};
use thiserror::Error;

use crate::config::PatchConfig;

#[derive(Error, Debug)]
pub enum RuleError {
    #[error("invalid patch pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// A compiled pattern plus the literal text that replaces every match.
#[derive(Debug, Clone)]
pub struct PatchRule {
    pattern: Regex,
    replacement: String,
}

/// Result of applying a [`PatchRule`] to a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transformed {
    pub code: String,
    pub matches: usize,
}

impl Transformed {
    #[must_use]
    pub fn is_changed(&self) -> bool {
        self.matches > 0
    }
}

impl PatchRule {
    pub fn new(pattern: &str, replacement: impl Into<String>) -> Result<Self, RuleError> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            replacement: replacement.into(),
        })
    }

    pub fn from_config(config: &PatchConfig) -> Result<Self, RuleError> {
        Self::new(&config.pattern, config.replacement.clone())
    }

    #[must_use]
    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    /// Replace every match with the replacement text, verbatim.
    ///
    /// `$` in the replacement is never treated as a group reference.
    #[must_use]
    pub fn apply(&self, code: &str) -> Transformed {
        let matches = self.pattern.find_iter(code).count();
        if matches == 0 {
            return Transformed {
                code: code.to_string(),
                matches,
            };
        }

        let code = self
            .pattern
            .replace_all(code, NoExpand(&self.replacement))
            .into_owned();
        Transformed { code, matches }
    }
}
