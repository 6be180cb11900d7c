//! Tag rules.
//!
//! A [`Rule`] couples a key and its delimiter pairs with a [`Tag`], the closed
//! set of replacements the engine knows how to produce.

use crate::pattern::{self, TagMatch, TagPattern};
use crate::{DelimiterPair, EngineError, RuleContext, RuleOutput};

/// Default priority for formatting tags.
pub const DEFAULT_PRIORITY: i32 = 0;

/// Default priority for [`Tag::Include`], so inlined text is formatted by the
/// passes that follow.
pub const INCLUDE_PRIORITY: i32 = 10;

/// Replacement produced for a matched tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tag {
    /// `\textbf{BODY}`
    Bold,
    /// `\textit{BODY}`
    Italics,
    /// `\underline{BODY}`
    Underline,
    /// `\textcolor{COLOR}{TEXT}` where the body is `COLOR TEXT`.
    Color,
    /// Contents of the file named by the body.
    Include,
    /// User template; `{body}` and `{head}` are replaced literally.
    Template(String),
}

impl Tag {
    /// Built-in tags, in the order [`Engine::with_builtin_rules`](crate::Engine::with_builtin_rules)
    /// registers them.
    #[must_use]
    pub fn builtins() -> [Self; 5] {
        [
            Self::Include,
            Self::Bold,
            Self::Italics,
            Self::Underline,
            Self::Color,
        ]
    }

    /// Key the tag is registered under by default.
    #[must_use]
    pub fn default_key(&self) -> Option<&'static str> {
        match self {
            Self::Bold => Some("b"),
            Self::Italics => Some("it"),
            Self::Underline => Some("u"),
            Self::Color => Some("color"),
            Self::Include => Some("include"),
            Self::Template(_) => None,
        }
    }

    /// Priority the tag is registered with by default.
    #[must_use]
    pub fn default_priority(&self) -> i32 {
        match self {
            Self::Include => INCLUDE_PRIORITY,
            _ => DEFAULT_PRIORITY,
        }
    }
}

/// A single tag definition: key, delimiter pairs, priority and replacement.
///
/// # Example
///
/// ```
/// use mpp_engine::{DelimiterPair, Rule, Tag};
///
/// let rule = Rule::new("sc", Tag::Template("\\textsc{{body}}".to_owned()))
///     .with_delimiter(DelimiterPair::new("[[", "]]"))
///     .with_priority(5);
///
/// assert_eq!(rule.key(), "sc");
/// assert_eq!(rule.delimiters().len(), 2);
/// assert!(rule.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    key: String,
    delimiters: Vec<DelimiterPair>,
    priority: i32,
    tag: Tag,
}

impl Rule {
    /// Create a rule with the default `( )` delimiters and the tag's default
    /// priority.
    #[must_use]
    pub fn new(key: impl Into<String>, tag: Tag) -> Self {
        Self {
            key: key.into(),
            delimiters: vec![DelimiterPair::default()],
            priority: tag.default_priority(),
            tag,
        }
    }

    /// Rule for a built-in tag under its default key.
    ///
    /// Template tags have no default key and get an empty one, which fails
    /// validation.
    #[must_use]
    pub fn builtin(tag: Tag) -> Self {
        let key = tag.default_key().unwrap_or_default();
        Self::new(key, tag)
    }

    /// Set the priority (higher runs first).
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Append a delimiter pair.
    #[must_use]
    pub fn with_delimiter(mut self, pair: DelimiterPair) -> Self {
        if !self.delimiters.contains(&pair) {
            self.delimiters.push(pair);
        }
        self
    }

    /// Replace the whole delimiter list.
    #[must_use]
    pub fn with_delimiters(mut self, pairs: Vec<DelimiterPair>) -> Self {
        self.delimiters = pairs;
        self
    }

    /// Rule key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Built-in delimiter pairs.
    #[must_use]
    pub fn delimiters(&self) -> &[DelimiterPair] {
        &self.delimiters
    }

    /// Rule priority.
    #[must_use]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Replacement tag.
    #[must_use]
    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    /// Check that the rule can build a pattern.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidRule`] for an empty key, a key with
    /// whitespace, an empty delimiter list or an empty delimiter string.
    pub fn validate(&self) -> Result<(), EngineError> {
        pattern::validate(&self.key, &self.delimiters)
    }

    /// Build the matcher for this rule's delimiters followed by `extra`.
    ///
    /// Pairs in `extra` already present in the rule are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the rule is invalid.
    pub fn pattern(&self, extra: &[DelimiterPair]) -> Result<TagPattern, EngineError> {
        let mut pairs = self.delimiters.clone();
        for pair in extra {
            if !pairs.contains(pair) {
                pairs.push(pair.clone());
            }
        }
        TagPattern::new(&self.key, &pairs)
    }

    /// Produce the output for one match.
    #[must_use]
    pub fn replace(&self, m: &TagMatch<'_>, ctx: &RuleContext<'_>) -> RuleOutput {
        let body = m.body;
        match &self.tag {
            Tag::Bold => RuleOutput::text(format!("\\textbf{{{body}}}")),
            Tag::Italics => RuleOutput::text(format!("\\textit{{{body}}}")),
            Tag::Underline => RuleOutput::text(format!("\\underline{{{body}}}")),
            Tag::Color => {
                let (color, text) = body
                    .split_once(char::is_whitespace)
                    .map_or((body, ""), |(color, text)| (color, text.trim_start()));
                RuleOutput::text(format!("\\textcolor{{{color}}}{{{text}}}"))
            }
            Tag::Include => include(body, ctx),
            Tag::Template(template) => RuleOutput::text(
                template
                    .replace("{head}", m.head)
                    .replace("{body}", body),
            ),
        }
    }
}

/// Inline the file named by `body`, or an error marker if it can't be read.
fn include(body: &str, ctx: &RuleContext<'_>) -> RuleOutput {
    let path = ctx.resolve_path(body);
    match ctx.read(&path) {
        Ok(content) => {
            tracing::debug!(path = %path.display(), depth = ctx.depth + 1, "Including file");
            RuleOutput::inline(content, path)
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to include file");
            RuleOutput::text(format!("[include error: {body}: {e}]"))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::path::{Path, PathBuf};

    use pretty_assertions::assert_eq;

    use super::*;

    fn read_fixture(path: &Path) -> io::Result<String> {
        if path == Path::new("docs/part.tex") {
            Ok("included".to_owned())
        } else {
            Err(io::Error::new(io::ErrorKind::NotFound, "not found"))
        }
    }

    fn ctx() -> RuleContext<'static> {
        RuleContext {
            base_dir: Path::new("docs"),
            depth: 0,
            read_file: &read_fixture,
        }
    }

    fn apply(rule: &Rule, text: &str) -> RuleOutput {
        let pattern = rule.pattern(&[]).unwrap();
        let m = pattern.find(text).unwrap();
        rule.replace(&m, &ctx())
    }

    #[test]
    fn test_builtin_keys_and_priorities() {
        assert_eq!(Rule::builtin(Tag::Bold).key(), "b");
        assert_eq!(Rule::builtin(Tag::Italics).key(), "it");
        assert_eq!(Rule::builtin(Tag::Underline).key(), "u");
        assert_eq!(Rule::builtin(Tag::Color).key(), "color");
        assert_eq!(Rule::builtin(Tag::Include).key(), "include");
        assert_eq!(Rule::builtin(Tag::Bold).priority(), DEFAULT_PRIORITY);
        assert_eq!(Rule::builtin(Tag::Include).priority(), INCLUDE_PRIORITY);
    }

    #[test]
    fn test_formatting_tags() {
        assert_eq!(
            apply(&Rule::builtin(Tag::Bold), "(b hello)"),
            RuleOutput::text("\\textbf{hello}")
        );
        assert_eq!(
            apply(&Rule::builtin(Tag::Italics), "(it hello)"),
            RuleOutput::text("\\textit{hello}")
        );
        assert_eq!(
            apply(&Rule::builtin(Tag::Underline), "(u hello)"),
            RuleOutput::text("\\underline{hello}")
        );
    }

    #[test]
    fn test_color_tag() {
        assert_eq!(
            apply(&Rule::builtin(Tag::Color), "(color red hello world)"),
            RuleOutput::text("\\textcolor{red}{hello world}")
        );
    }

    #[test]
    fn test_color_without_text() {
        assert_eq!(
            apply(&Rule::builtin(Tag::Color), "(color red)"),
            RuleOutput::text("\\textcolor{red}{}")
        );
    }

    #[test]
    fn test_template_tag() {
        let rule = Rule::new("sc", Tag::Template("\\{head}{{body}}".to_owned()));
        assert_eq!(
            apply(&rule, "(sc Small Caps)"),
            RuleOutput::text("\\sc{Small Caps}")
        );
    }

    #[test]
    fn test_include_reads_relative_to_base_dir() {
        assert_eq!(
            apply(&Rule::builtin(Tag::Include), "(include part.tex)"),
            RuleOutput::inline("included", PathBuf::from("docs/part.tex"))
        );
    }

    #[test]
    fn test_include_missing_file_marker() {
        let RuleOutput::Text(marker) = apply(&Rule::builtin(Tag::Include), "(include ./missing.txt)")
        else {
            panic!("expected text output");
        };
        assert!(marker.contains("./missing.txt"));
        assert!(marker.contains("include error"));
    }

    #[test]
    fn test_with_delimiter_deduplicates() {
        let rule = Rule::builtin(Tag::Bold)
            .with_delimiter(DelimiterPair::default())
            .with_delimiter(DelimiterPair::new("{", "}"));
        assert_eq!(rule.delimiters().len(), 2);
    }

    #[test]
    fn test_pattern_with_extra_delimiters() {
        let rule = Rule::builtin(Tag::Bold);
        let pattern = rule
            .pattern(&[DelimiterPair::new("{", "}"), DelimiterPair::default()])
            .unwrap();
        assert!(pattern.find("(b a)").is_some());
        assert!(pattern.find("{b a}").is_some());
    }

    #[test]
    fn test_validate() {
        assert!(Rule::builtin(Tag::Bold).validate().is_ok());
        assert!(
            Rule::builtin(Tag::Template("x".to_owned()))
                .validate()
                .is_err()
        );
        assert!(
            Rule::builtin(Tag::Bold)
                .with_delimiters(Vec::new())
                .validate()
                .is_err()
        );
    }
}
