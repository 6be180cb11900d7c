//! Literal text macros.
//!
//! Macros are declared in a document's settings block and applied after all
//! structural rules in one pass.

use std::collections::HashMap;

use regex::Regex;

use crate::EngineError;

/// A literal token replaced by fixed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Macro {
    /// Token to find.
    pub key: String,
    /// Text substituted for every occurrence of `key`.
    pub replacement: String,
}

impl Macro {
    /// Create a macro.
    #[must_use]
    pub fn new(key: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            replacement: replacement.into(),
        }
    }

    /// Parse a declaration written as `NAME replacement text...`.
    ///
    /// Returns `None` when the name or the replacement text is missing.
    ///
    /// # Example
    ///
    /// ```
    /// use mpp_engine::Macro;
    ///
    /// let m = Macro::parse("LaTeX \\LaTeX{}").unwrap();
    /// assert_eq!(m.key, "LaTeX");
    /// assert_eq!(m.replacement, "\\LaTeX{}");
    /// ```
    #[must_use]
    pub fn parse(declaration: &str) -> Option<Self> {
        let (key, replacement) = declaration.trim().split_once(char::is_whitespace)?;
        let replacement = replacement.trim();
        if replacement.is_empty() {
            return None;
        }
        Some(Self::new(key, replacement))
    }
}

/// Collects macros for single-pass application.
///
/// All keys are searched at once, so replacement text is never re-scanned:
/// a macro whose replacement contains another macro's key is not expanded
/// again. When several keys match at the same position the longest wins.
///
/// Keys match whole tokens only: a key that starts or ends with a word
/// character needs a word boundary on that side, and LaTeX control words
/// such as `\textit` are skipped as a unit.
///
/// # Example
///
/// ```
/// use mpp_engine::{Macro, MacroSet};
///
/// let mut macros = MacroSet::new();
/// macros.add(Macro::new("ACME", "Acme Corporation"));
///
/// let output = macros.apply("Welcome to ACME.").unwrap();
/// assert_eq!(output, "Welcome to Acme Corporation.");
/// ```
#[derive(Debug, Default)]
pub struct MacroSet {
    items: HashMap<String, String>,
}

impl MacroSet {
    /// Create a new empty macro set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a macro; a later macro with the same key replaces the earlier.
    pub fn add(&mut self, item: Macro) {
        self.items.insert(item.key, item.replacement);
    }

    /// Apply all registered macros to `text`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Pattern`] if the combined matcher can't be built.
    pub fn apply(&self, text: &str) -> Result<String, EngineError> {
        if self.items.is_empty() {
            return Ok(text.to_owned());
        }

        let mut keys: Vec<&str> = self.items.keys().map(String::as_str).collect();
        // Leftmost-first alternation: longer keys must come first to win ties.
        keys.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        let mut alternatives: Vec<String> = keys.iter().map(|key| token_pattern(key)).collect();
        // Tried last, so a key spelled with a backslash still wins.
        alternatives.push(CONTROL_WORD.to_owned());
        let source = alternatives.join("|");
        let regex = Regex::new(&source).map_err(|source| EngineError::Pattern {
            key: "macro".to_owned(),
            source,
        })?;

        let output = regex.replace_all(text, |caps: &regex::Captures<'_>| {
            let found = &caps[0];
            self.items
                .get(found)
                .cloned()
                .unwrap_or_else(|| found.to_owned())
        });
        Ok(output.into_owned())
    }

    /// Check if there are any macros registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get the number of registered macros.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// A LaTeX control word, copied through unchanged.
const CONTROL_WORD: &str = r"\\[A-Za-z@]+";

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Escaped `key` with `\b` on each side that begins or ends with a word char.
fn token_pattern(key: &str) -> String {
    let mut pattern = String::with_capacity(key.len() + 4);
    if key.starts_with(is_word_char) {
        pattern.push_str(r"\b");
    }
    pattern.push_str(&regex::escape(key));
    if key.ends_with(is_word_char) {
        pattern.push_str(r"\b");
    }
    pattern
}

impl FromIterator<Macro> for MacroSet {
    fn from_iter<I: IntoIterator<Item = Macro>>(iter: I) -> Self {
        let mut set = Self::new();
        for item in iter {
            set.add(item);
        }
        set
    }
}
