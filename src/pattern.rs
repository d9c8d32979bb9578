use regex::{Regex, RegexBuilder};

use crate::error::DapisError;

/// A compiled query pattern, scoped to one query.
///
/// Keeps the source text alongside the regex: matches and stored rows record
/// the pattern exactly as the caller typed it.
#[derive(Debug, Clone)]
pub struct Pattern {
    source:           String,
    regex:            Regex,
    case_insensitive: bool,
}

impl Pattern {
    /// Compile `source` as a regex.
    ///
    /// # Errors
    ///
    /// Returns [`DapisError::InvalidPattern`] if `source` is not valid regex syntax.
    pub fn new(source: &str, case_insensitive: bool) -> Result<Self, DapisError> {
        let regex = RegexBuilder::new(source)
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|e| DapisError::InvalidPattern(e.to_string()))?;

        Ok(Self {
            source: source.to_string(),
            regex,
            case_insensitive,
        })
    }

    /// The pattern text as submitted.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    /// Whether the pattern matches anywhere in `haystack`.
    pub fn is_match(&self, haystack: &str) -> bool {
        self.regex.is_match(haystack)
    }
}
