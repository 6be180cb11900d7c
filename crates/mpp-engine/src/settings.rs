//! Document settings block.
//!
//! A document may carry one settings block, by default an HTML comment:
//!
//! ```text
//! <!-- settings
//! delimiters: { }, [[ ]]
//! macro: ACME Acme Corporation
//! -->
//! ```
//!
//! Each line is `key: value`. `delimiters` values are comma-separated pairs;
//! every other key keeps its whole value and may repeat.

use std::collections::BTreeMap;
use std::ops::Range;

use crate::pattern::TagPattern;
use crate::{DelimiterPair, EngineError, Macro};

/// Key holding additional delimiter pairs.
pub const DELIMITERS_KEY: &str = "delimiters";

/// Key declaring one macro per line.
pub const MACRO_KEY: &str = "macro";

/// Delimiters and key identifying the settings block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsBlock {
    /// Delimiter pair surrounding the block.
    pub delimiters: DelimiterPair,
    /// Key following the opening delimiter.
    pub key: String,
}

impl Default for SettingsBlock {
    fn default() -> Self {
        Self {
            delimiters: DelimiterPair::new("<!--", "-->"),
            key: "settings".to_owned(),
        }
    }
}

/// Parsed settings: key to list of values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    values: BTreeMap<String, Vec<String>>,
}

impl Settings {
    /// Parse a settings block body.
    ///
    /// Lines without a `key: value` shape are skipped with a warning.
    #[must_use]
    pub fn parse(body: &str) -> Self {
        let mut settings = Self::default();

        for (idx, line) in body.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let Some((key, value)) = line.split_once(':') else {
                tracing::warn!(line = idx + 1, content = line, "Skipping malformed settings line");
                continue;
            };
            let key = key.trim();
            if key.is_empty() {
                tracing::warn!(line = idx + 1, content = line, "Skipping settings line without key");
                continue;
            }

            let entry = settings.values.entry(key.to_owned()).or_default();
            if key == DELIMITERS_KEY {
                entry.extend(
                    value
                        .split(',')
                        .map(str::trim)
                        .filter(|v| !v.is_empty())
                        .map(str::to_owned),
                );
            } else {
                entry.push(value.trim().to_owned());
            }
        }

        settings
    }

    /// Values declared for `key`, in document order.
    #[must_use]
    pub fn get(&self, key: &str) -> &[String] {
        self.values.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Declared keys.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Check if no settings were declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Delimiter pairs declared under `delimiters`, skipping malformed ones.
    #[must_use]
    pub fn delimiters(&self) -> Vec<DelimiterPair> {
        self.get(DELIMITERS_KEY)
            .iter()
            .filter_map(|spec| {
                let pair = DelimiterPair::parse(spec);
                if pair.is_none() {
                    tracing::warn!(value = %spec, "Skipping malformed delimiter pair");
                }
                pair
            })
            .collect()
    }

    /// Macros declared under `macro`, skipping malformed ones.
    #[must_use]
    pub fn macros(&self) -> Vec<Macro> {
        self.get(MACRO_KEY)
            .iter()
            .filter_map(|decl| {
                let item = Macro::parse(decl);
                if item.is_none() {
                    tracing::warn!(value = %decl, "Skipping malformed macro declaration");
                }
                item
            })
            .collect()
    }
}

/// Settings found in a document together with the block's location.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Parsed settings (empty if there was no block).
    pub settings: Settings,
    /// Byte range of the block, from its opening to its closing delimiter.
    pub span: Option<Range<usize>>,
}

impl Extraction {
    /// Offset right after the closing delimiter, or 0 without a block.
    #[must_use]
    pub fn end_offset(&self) -> usize {
        self.span.as_ref().map_or(0, |span| span.end)
    }

    /// Remove the block, and one line break directly after it, from `text`.
    #[must_use]
    pub fn strip(&self, text: &str) -> String {
        let Some(span) = &self.span else {
            return text.to_owned();
        };

        let rest = &text[span.end..];
        let rest = rest
            .strip_prefix("\r\n")
            .or_else(|| rest.strip_prefix('\n'))
            .unwrap_or(rest);

        let mut output = String::with_capacity(span.start + rest.len());
        output.push_str(&text[..span.start]);
        output.push_str(rest);
        output
    }
}

/// Locates and parses the settings block of a document.
///
/// # Example
///
/// ```
/// use mpp_engine::SettingsExtractor;
///
/// let extractor = SettingsExtractor::new().unwrap();
/// let text = "<!-- settings\ndelimiters: { }\n-->\n{b hi}";
///
/// let (settings, end) = extractor.extract(text);
/// assert_eq!(settings.get("delimiters"), ["{ }"]);
/// assert_eq!(&text[end..], "\n{b hi}");
/// ```
#[derive(Debug, Clone)]
pub struct SettingsExtractor {
    pattern: TagPattern,
}

impl SettingsExtractor {
    /// Extractor for the default `<!-- settings ... -->` block.
    ///
    /// # Errors
    ///
    /// Never fails for the default block; the signature matches
    /// [`with_block`](Self::with_block).
    pub fn new() -> Result<Self, EngineError> {
        Self::with_block(&SettingsBlock::default())
    }

    /// Extractor for a custom block.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidRule`] if the block key or delimiters
    /// are empty.
    pub fn with_block(block: &SettingsBlock) -> Result<Self, EngineError> {
        let pattern = TagPattern::new(&block.key, std::slice::from_ref(&block.delimiters))?;
        Ok(Self { pattern })
    }

    /// Settings and end offset of the first block in `text`.
    ///
    /// Returns empty settings and offset 0 when there is no block.
    #[must_use]
    pub fn extract(&self, text: &str) -> (Settings, usize) {
        let extraction = self.extraction(text);
        let end = extraction.end_offset();
        (extraction.settings, end)
    }

    /// Settings and span of the first block in `text`.
    #[must_use]
    pub fn extraction(&self, text: &str) -> Extraction {
        match self.pattern.find(text) {
            Some(m) => {
                tracing::debug!(start = m.start, end = m.end, "Found settings block");
                Extraction {
                    settings: Settings::parse(m.body),
                    span: Some(m.start..m.end),
                }
            }
            None => Extraction::default(),
        }
    }
}
