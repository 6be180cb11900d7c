//! Rule output type.

use std::path::PathBuf;

/// Result of replacing one matched tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutput {
    /// Final text for the span.
    Text(String),
    /// Text inlined from `origin`; the engine re-scans it with the same rule
    /// one include level deeper before splicing it in.
    Inline {
        /// Inlined file contents.
        content: String,
        /// File the contents were read from.
        origin: PathBuf,
    },
}

impl RuleOutput {
    /// Create final text output.
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Create inlined-file output.
    #[must_use]
    pub fn inline(content: impl Into<String>, origin: impl Into<PathBuf>) -> Self {
        Self::Inline {
            content: content.into(),
            origin: origin.into(),
        }
    }
}
