//! Delimiter pairs bounding tagged spans.

use std::fmt;

/// An `(open, close)` pair of literal delimiter strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DelimiterPair {
    /// Opening delimiter, e.g. `(`.
    pub open: String,
    /// Closing delimiter, e.g. `)`.
    pub close: String,
}

impl DelimiterPair {
    /// Create a pair from open and close strings.
    #[must_use]
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }

    /// Parse a pair written as `"OPEN CLOSE"`.
    ///
    /// Returns `None` unless the input holds exactly two whitespace-separated
    /// tokens.
    ///
    /// # Example
    ///
    /// ```
    /// use mpp_engine::DelimiterPair;
    ///
    /// assert_eq!(DelimiterPair::parse("{ }"), Some(DelimiterPair::new("{", "}")));
    /// assert_eq!(DelimiterPair::parse("{"), None);
    /// ```
    #[must_use]
    pub fn parse(spec: &str) -> Option<Self> {
        let mut tokens = spec.split_whitespace();
        let open = tokens.next()?;
        let close = tokens.next()?;
        if tokens.next().is_some() {
            return None;
        }
        Some(Self::new(open, close))
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.open.is_empty() || self.close.is_empty()
    }
}

impl Default for DelimiterPair {
    fn default() -> Self {
        Self::new("(", ")")
    }
}

impl fmt::Display for DelimiterPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.open, self.close)
    }
}
