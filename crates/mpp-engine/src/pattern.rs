//! Delimiter-aware tag matcher.
//!
//! A [`TagPattern`] recognizes `OPEN [ws] KEY ws+ BODY [ws] CLOSE` for every
//! registered delimiter pair. Each pair becomes one alternative of a single
//! regex; the key and delimiters are escaped, so they never act as pattern
//! syntax.

use regex::Regex;

use crate::{DelimiterPair, EngineError};

/// One match of a [`TagPattern`] in a text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagMatch<'t> {
    /// Byte offset of the opening delimiter.
    pub start: usize,
    /// Byte offset right after the closing delimiter.
    pub end: usize,
    /// Matched key.
    pub head: &'t str,
    /// Tag body with surrounding whitespace trimmed.
    pub body: &'t str,
    /// Index of the delimiter pair that matched.
    pub pair: usize,
}

/// Compiled matcher for one key over an ordered list of delimiter pairs.
///
/// Alternatives are tried in pair order, so when two pairs can match at the
/// same position the earlier-registered one wins. The body is lazy: it stops
/// at the first closing delimiter of its pair, which means a span of the same
/// key nested inside another one is cut short.
///
/// # Example
///
/// ```
/// use mpp_engine::{DelimiterPair, TagPattern};
///
/// let pattern = TagPattern::new("b", &[DelimiterPair::default()]).unwrap();
/// let m = pattern.find("say (b hello) twice").unwrap();
///
/// assert_eq!(m.head, "b");
/// assert_eq!(m.body, "hello");
/// assert_eq!((m.start, m.end), (4, 13));
/// ```
#[derive(Debug, Clone)]
pub struct TagPattern {
    regex: Regex,
    pairs: usize,
}

impl TagPattern {
    /// Build a matcher for `key` delimited by any of `pairs`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidRule`] if the key is empty or contains
    /// whitespace, if `pairs` is empty, or if a pair has an empty side.
    pub fn new(key: &str, pairs: &[DelimiterPair]) -> Result<Self, EngineError> {
        validate(key, pairs)?;

        let key_re = regex::escape(key);
        let alternatives: Vec<String> = pairs
            .iter()
            .map(|pair| {
                format!(
                    r"(?:{open}\s*({key_re})\s+(.*?)\s*{close})",
                    open = regex::escape(&pair.open),
                    close = regex::escape(&pair.close),
                )
            })
            .collect();

        let source = format!("(?s){}", alternatives.join("|"));
        let regex = Regex::new(&source).map_err(|source| EngineError::Pattern {
            key: key.to_owned(),
            source,
        })?;

        Ok(Self {
            regex,
            pairs: pairs.len(),
        })
    }

    /// Leftmost match in `text`, if any.
    #[must_use]
    pub fn find<'t>(&self, text: &'t str) -> Option<TagMatch<'t>> {
        self.matches(text).next()
    }

    /// All non-overlapping matches in `text`, left to right.
    pub fn matches<'t>(&self, text: &'t str) -> impl Iterator<Item = TagMatch<'t>> {
        self.regex.captures_iter(text).filter_map(move |caps| {
            let whole = caps.get(0)?;
            (0..self.pairs).find_map(|pair| {
                let head = caps.get(2 * pair + 1)?;
                let body = caps.get(2 * pair + 2)?;
                Some(TagMatch {
                    start: whole.start(),
                    end: whole.end(),
                    head: head.as_str(),
                    body: body.as_str(),
                    pair,
                })
            })
        })
    }
}

/// Check the invariants every rule needs before a pattern can be built.
pub(crate) fn validate(key: &str, pairs: &[DelimiterPair]) -> Result<(), EngineError> {
    if key.is_empty() {
        return Err(EngineError::invalid_rule(key, "key cannot be empty"));
    }
    if key.chars().any(char::is_whitespace) {
        return Err(EngineError::invalid_rule(key, "key cannot contain whitespace"));
    }
    if pairs.is_empty() {
        return Err(EngineError::invalid_rule(
            key,
            "at least one delimiter pair is required",
        ));
    }
    if let Some(pair) = pairs.iter().find(|pair| pair.is_empty()) {
        return Err(EngineError::invalid_rule(
            key,
            format!("delimiter pair `{pair}` has an empty side"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parens() -> Vec<DelimiterPair> {
        vec![DelimiterPair::default()]
    }

    #[test]
    fn test_simple_match() {
        let pattern = TagPattern::new("b", &parens()).unwrap();
        let m = pattern.find("(b hello)").unwrap();
        assert_eq!(m.head, "b");
        assert_eq!(m.body, "hello");
        assert_eq!(m.pair, 0);
    }

    #[test]
    fn test_whitespace_around_key_and_body() {
        let pattern = TagPattern::new("b", &parens()).unwrap();
        let m = pattern.find("( b   spaced out  )").unwrap();
        assert_eq!(m.body, "spaced out");
    }

    #[test]
    fn test_key_requires_trailing_whitespace() {
        let pattern = TagPattern::new("b", &parens()).unwrap();
        assert!(pattern.find("(bold text)").is_none());
        assert!(pattern.find("(b)").is_none());
    }

    #[test]
    fn test_body_spans_lines() {
        let pattern = TagPattern::new("it", &parens()).unwrap();
        let m = pattern.find("(it first\nsecond)").unwrap();
        assert_eq!(m.body, "first\nsecond");
    }

    #[test]
    fn test_multiple_matches() {
        let pattern = TagPattern::new("b", &parens()).unwrap();
        let bodies: Vec<&str> = pattern
            .matches("(b one) and (b two)")
            .map(|m| m.body)
            .collect();
        assert_eq!(bodies, vec!["one", "two"]);
    }

    #[test]
    fn test_delimiters_are_literal() {
        let pairs = vec![DelimiterPair::new(".*", "+?")];
        let pattern = TagPattern::new("b", &pairs).unwrap();
        assert!(pattern.find("xx b text yy").is_none());
        assert_eq!(pattern.find(".*b text+?").unwrap().body, "text");
    }

    #[test]
    fn test_key_is_literal() {
        let pattern = TagPattern::new("a.b", &parens()).unwrap();
        assert!(pattern.find("(axb text)").is_none());
        assert!(pattern.find("(a.b text)").is_some());
    }

    #[test]
    fn test_close_must_match_open_pair() {
        let pairs = vec![DelimiterPair::default(), DelimiterPair::new("{", "}")];
        let pattern = TagPattern::new("b", &pairs).unwrap();

        assert!(pattern.find("(b mixed}").is_none());

        let m = pattern.find("{b curly}").unwrap();
        assert_eq!(m.body, "curly");
        assert_eq!(m.pair, 1);
    }

    #[test]
    fn test_first_registered_pair_wins() {
        let pairs = vec![DelimiterPair::new("<", ">"), DelimiterPair::new("<", ">>")];
        let pattern = TagPattern::new("b", &pairs).unwrap();
        let m = pattern.find("<b x>>").unwrap();
        assert_eq!(m.pair, 0);
        assert_eq!(m.body, "x");
    }

    #[test]
    fn test_same_key_nesting_stops_at_first_close() {
        let pattern = TagPattern::new("b", &parens()).unwrap();
        let m = pattern.find("(b outer (b inner) tail)").unwrap();
        assert_eq!(m.body, "outer (b inner");
        assert_eq!(&"(b outer (b inner) tail)"[m.end..], " tail)");
    }

    #[test]
    fn test_invalid_rules() {
        assert!(matches!(
            TagPattern::new("", &parens()),
            Err(EngineError::InvalidRule { .. })
        ));
        assert!(matches!(
            TagPattern::new("two words", &parens()),
            Err(EngineError::InvalidRule { .. })
        ));
        assert!(matches!(
            TagPattern::new("b", &[]),
            Err(EngineError::InvalidRule { .. })
        ));
        assert!(matches!(
            TagPattern::new("b", &[DelimiterPair::new("", ")")]),
            Err(EngineError::InvalidRule { .. })
        ));
    }
}
