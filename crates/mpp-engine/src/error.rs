//! Engine error types.

use std::path::PathBuf;

/// Fatal engine error.
///
/// Recoverable conditions (missing include targets, malformed settings lines)
/// never surface here; they are resolved inline during substitution.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Rule cannot build a pattern (empty key, no delimiters, ...).
    #[error("invalid rule `{key}`: {reason}")]
    InvalidRule {
        /// Key of the offending rule.
        key: String,
        /// Human-readable reason.
        reason: String,
    },
    /// Regex compilation failed for an otherwise valid rule.
    #[error("failed to build pattern for `{key}`: {source}")]
    Pattern {
        /// Key of the rule whose pattern failed.
        key: String,
        /// Underlying regex error.
        #[source]
        source: regex::Error,
    },
    /// Include nesting went deeper than the configured limit.
    #[error("maximum include depth ({max_depth}) exceeded while including {}", .path.display())]
    IncludeDepthExceeded {
        /// File that would have been inlined past the limit.
        path: PathBuf,
        /// Configured limit.
        max_depth: usize,
    },
}

impl EngineError {
    pub(crate) fn invalid_rule(key: &str, reason: impl Into<String>) -> Self {
        Self::InvalidRule {
            key: key.to_owned(),
            reason: reason.into(),
        }
    }
}
