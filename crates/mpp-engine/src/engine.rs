//! Substitution engine.
//!
//! Runs settings extraction, then one substitution pass per registered rule
//! in priority order, then the document's macros.

use std::borrow::Cow;
use std::cmp::Reverse;
use std::io;
use std::path::{Path, PathBuf};

use crate::pattern::TagPattern;
use crate::settings::{DELIMITERS_KEY, MACRO_KEY};
use crate::{
    DelimiterPair, EngineError, MacroSet, Rule, RuleContext, RuleOutput, SettingsBlock,
    SettingsExtractor, Tag,
};

/// Type alias for the file reading callback function.
pub type ReadFileFn = dyn Fn(&Path) -> io::Result<String> + Send + Sync;

/// Configuration for the engine.
pub struct EngineConfig {
    /// Base directory for resolving relative include paths.
    pub base_dir: PathBuf,
    /// Callback to read files from the file system.
    ///
    /// Default: `std::fs::read_to_string`
    pub read_file: Option<Box<ReadFileFn>>,
    /// Maximum include depth; deeper nesting aborts processing.
    ///
    /// Default: 10
    pub max_include_depth: usize,
    /// Delimiters and key of the document settings block.
    pub settings_block: SettingsBlock,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            read_file: None,
            max_include_depth: 10,
            settings_block: SettingsBlock::default(),
        }
    }

    /// Set the base directory for resolving relative include paths.
    #[must_use]
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    /// Set the file reading callback.
    #[must_use]
    pub fn with_read_file<F>(mut self, read_file: F) -> Self
    where
        F: Fn(&Path) -> io::Result<String> + Send + Sync + 'static,
    {
        self.read_file = Some(Box::new(read_file));
        self
    }

    /// Set the maximum include depth.
    #[must_use]
    pub fn with_max_include_depth(mut self, depth: usize) -> Self {
        self.max_include_depth = depth;
        self
    }

    /// Set the settings block delimiters and key.
    #[must_use]
    pub fn with_settings_block(mut self, block: SettingsBlock) -> Self {
        self.settings_block = block;
        self
    }

    fn create_context(&self) -> RuleContext<'_> {
        RuleContext {
            base_dir: &self.base_dir,
            depth: 0,
            read_file: self.read_file.as_ref().map_or_else(
                || &default_read_file as &dyn Fn(&Path) -> io::Result<String>,
                |f| f.as_ref(),
            ),
        }
    }
}

/// Default file reading function.
fn default_read_file(path: &Path) -> io::Result<String> {
    std::fs::read_to_string(path)
}

/// One rule paired with its effective pattern for a single `process` call.
struct Pass<'r> {
    rule: &'r Rule,
    pattern: TagPattern,
}

/// Tag substitution engine.
///
/// Rules are registered up front and validated on registration. Each call to
/// [`process`](Self::process) builds its own plan from the registered rules
/// and the document's settings, so no state carries over between documents.
///
/// # Example
///
/// ```
/// use mpp_engine::Engine;
///
/// let engine = Engine::new().with_builtin_rules();
///
/// let output = engine.process("(b hello) (color red hello world)").unwrap();
/// assert_eq!(output, "\\textbf{hello} \\textcolor{red}{hello world}");
/// ```
pub struct Engine {
    config: EngineConfig,
    /// Built from `config.settings_block`; `None` until a custom config is given.
    extractor: Option<SettingsExtractor>,
    rules: Vec<Rule>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Create an engine with default configuration and no rules.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            extractor: None,
            rules: Vec::new(),
        }
    }

    /// Create an engine with custom configuration and no rules.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidRule`] if the settings block is invalid.
    pub fn with_config(config: EngineConfig) -> Result<Self, EngineError> {
        let extractor = SettingsExtractor::with_block(&config.settings_block)?;
        Ok(Self {
            config,
            extractor: Some(extractor),
            rules: Vec::new(),
        })
    }

    /// Register a rule.
    ///
    /// Rules with equal priority run in registration order.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidRule`] if the rule can't build a pattern.
    pub fn register(&mut self, rule: Rule) -> Result<(), EngineError> {
        rule.validate()?;
        tracing::debug!(key = rule.key(), priority = rule.priority(), "Registered rule");
        self.rules.push(rule);
        Ok(())
    }

    /// Register a rule, builder style.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidRule`] if the rule can't build a pattern.
    pub fn with_rule(mut self, rule: Rule) -> Result<Self, EngineError> {
        self.register(rule)?;
        Ok(self)
    }

    /// Register include, bold, italics, underline and color under their
    /// default keys and delimiters.
    #[must_use]
    pub fn with_builtin_rules(mut self) -> Self {
        for tag in Tag::builtins() {
            // Built-in keys and the default delimiter pair are always valid.
            self.rules.push(Rule::builtin(tag));
        }
        self
    }

    /// Registered rules, in registration order.
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Transform a complete document.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::IncludeDepthExceeded`] when includes nest deeper
    /// than the configured limit.
    pub fn process(&self, input: &str) -> Result<String, EngineError> {
        let extraction = self.extractor()?.extraction(input);
        let mut text = extraction.strip(input);

        let settings = &extraction.settings;
        for key in settings.keys() {
            if key != DELIMITERS_KEY && key != MACRO_KEY {
                tracing::debug!(key, "Ignoring unknown settings key");
            }
        }

        let extra_delimiters = settings.delimiters();
        let plan = self.plan(&extra_delimiters)?;
        let ctx = self.config.create_context();

        for pass in &plan {
            tracing::debug!(key = pass.rule.key(), priority = pass.rule.priority(), "Running pass");
            text = self.run_pass(pass, &text, &ctx)?;
        }

        let macros: MacroSet = settings.macros().into_iter().collect();
        if !macros.is_empty() {
            tracing::debug!(count = macros.len(), "Applying macros");
            text = macros.apply(&text)?;
        }

        Ok(text)
    }

    fn extractor(&self) -> Result<Cow<'_, SettingsExtractor>, EngineError> {
        match &self.extractor {
            Some(extractor) => Ok(Cow::Borrowed(extractor)),
            None => SettingsExtractor::with_block(&self.config.settings_block).map(Cow::Owned),
        }
    }

    /// Effective passes for one document, highest priority first.
    fn plan(&self, extra: &[DelimiterPair]) -> Result<Vec<Pass<'_>>, EngineError> {
        let mut plan = Vec::with_capacity(self.rules.len());
        for rule in &self.rules {
            plan.push(Pass {
                rule,
                pattern: rule.pattern(extra)?,
            });
        }
        // Stable: equal priorities keep registration order.
        plan.sort_by_key(|pass| Reverse(pass.rule.priority()));
        Ok(plan)
    }

    fn run_pass(
        &self,
        pass: &Pass<'_>,
        input: &str,
        ctx: &RuleContext<'_>,
    ) -> Result<String, EngineError> {
        let mut output = String::with_capacity(input.len());
        let mut last = 0;

        for m in pass.pattern.matches(input) {
            output.push_str(&input[last..m.start]);

            match pass.rule.replace(&m, ctx) {
                RuleOutput::Text(text) => output.push_str(&text),
                RuleOutput::Inline { content, origin } => {
                    if ctx.depth >= self.config.max_include_depth {
                        return Err(EngineError::IncludeDepthExceeded {
                            path: origin,
                            max_depth: self.config.max_include_depth,
                        });
                    }
                    let base_dir = origin.parent().unwrap_or(ctx.base_dir);
                    let nested = ctx.nested(base_dir);
                    output.push_str(&self.run_pass(pass, &content, &nested)?);
                }
            }

            last = m.end;
        }

        output.push_str(&input[last..]);
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::fs;

    use pretty_assertions::assert_eq;

    use super::*;

    fn builtin() -> Engine {
        Engine::new().with_builtin_rules()
    }

    fn with_files(files: &[(&str, &str)]) -> EngineConfig {
        let files: HashMap<PathBuf, String> = files
            .iter()
            .map(|(path, content)| (PathBuf::from(path), (*content).to_owned()))
            .collect();
        EngineConfig::new()
            .with_base_dir("docs")
            .with_read_file(move |path| {
                files
                    .get(path)
                    .cloned()
                    .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "file not found"))
            })
    }

    #[test]
    fn test_bold() {
        let engine = Engine::new().with_rule(Rule::builtin(Tag::Bold)).unwrap();
        assert_eq!(engine.process("(b hello)").unwrap(), "\\textbf{hello}");
    }

    #[test]
    fn test_color() {
        assert_eq!(
            builtin().process("(color red hello world)").unwrap(),
            "\\textcolor{red}{hello world}"
        );
    }

    #[test]
    fn test_surrounding_text_is_preserved() {
        assert_eq!(
            builtin().process("Say (it this) and (u that).\n").unwrap(),
            "Say \\textit{this} and \\underline{that}.\n"
        );
    }

    #[test]
    fn test_unregistered_key_passes_through() {
        assert_eq!(
            builtin().process("(unknown stays) (b bold)").unwrap(),
            "(unknown stays) \\textbf{bold}"
        );
    }

    #[test]
    fn test_no_settings_block_is_noop() {
        let engine = builtin();
        let input = "plain (b text)\nmore";
        let extraction = engine.extractor().unwrap().extraction(input);
        assert!(extraction.settings.is_empty());
        assert_eq!(extraction.strip(input), input);
        assert_eq!(engine.process(input).unwrap(), "plain \\textbf{text}\nmore");
    }

    #[test]
    fn test_settings_delimiters() {
        let input = "<!-- settings\ndelimiters: { }\n-->\n{b hi}";
        assert_eq!(builtin().process(input).unwrap(), "\\textbf{hi}");
    }

    #[test]
    fn test_settings_delimiters_are_additive() {
        let input = "<!-- settings\ndelimiters: { }\n-->\n(b a) {b b}";
        assert_eq!(
            builtin().process(input).unwrap(),
            "\\textbf{a} \\textbf{b}"
        );
    }

    #[test]
    fn test_settings_do_not_leak_between_documents() {
        let engine = builtin();
        let first = "<!-- settings\ndelimiters: { }\nmacro: X y\n-->\n{b hi} X";
        assert_eq!(engine.process(first).unwrap(), "\\textbf{hi} y");
        assert_eq!(engine.process("{b hi} X").unwrap(), "{b hi} X");
    }

    #[test]
    fn test_macros_applied_after_rules() {
        let input = "<!-- settings\nmacro: ACME Acme Corporation\n-->\n(b ACME) rocks";
        assert_eq!(
            builtin().process(input).unwrap(),
            "\\textbf{Acme Corporation} rocks"
        );
    }

    #[test]
    fn test_macros_are_not_reexpanded() {
        let input = "<!-- settings\nmacro: A B\nmacro: B C\n-->\nA B";
        assert_eq!(builtin().process(input).unwrap(), "B C");
    }

    #[test]
    fn test_macros_leave_generated_commands_intact() {
        let input = "<!-- settings\nmacro: it Italy\n-->\n(it ciao) from it";
        assert_eq!(
            builtin().process(input).unwrap(),
            "\\textit{ciao} from Italy"
        );

        let input = "<!-- settings\nmacro: text words\n-->\n(b context) text";
        assert_eq!(
            builtin().process(input).unwrap(),
            "\\textbf{context} words"
        );
    }

    #[test]
    fn test_settings_delimiters_match_generated_braces() {
        // `{ }` also matches the braces the bold pass just wrote.
        let input = "<!-- settings\ndelimiters: { }\n-->\n(b it works)";
        assert_eq!(
            builtin().process(input).unwrap(),
            "\\textbf\\textit{works}"
        );
    }

    #[test]
    fn test_default_engine_uses_default_settings_block() {
        let engine = Engine::new().with_builtin_rules();
        assert!(engine.extractor.is_none());
        let input = "<!-- settings\nmacro: N x\n-->\n(b N)";
        assert_eq!(engine.process(input).unwrap(), "\\textbf{x}");
    }

    #[test]
    fn test_malformed_settings_line_is_skipped() {
        let input = "<!-- settings\nthis is not a setting\ndelimiters: [ ]\n-->\n[b ok]";
        assert_eq!(builtin().process(input).unwrap(), "\\textbf{ok}");
    }

    #[test]
    fn test_priority_ordering() {
        // `wrap` runs first and produces a `(b ...)` span for the bold pass.
        let engine = Engine::new()
            .with_rule(Rule::builtin(Tag::Bold))
            .unwrap()
            .with_rule(
                Rule::new("wrap", Tag::Template("(b {body})".to_owned())).with_priority(5),
            )
            .unwrap();
        assert_eq!(engine.process("(wrap x)").unwrap(), "\\textbf{x}");
    }

    #[test]
    fn test_lower_priority_output_is_not_seen_by_earlier_pass() {
        let engine = Engine::new()
            .with_rule(Rule::builtin(Tag::Bold).with_priority(5))
            .unwrap()
            .with_rule(Rule::new("wrap", Tag::Template("(b {body})".to_owned())))
            .unwrap();
        assert_eq!(engine.process("(wrap x)").unwrap(), "(b x)");
    }

    #[test]
    fn test_equal_priority_uses_registration_order() {
        let first = Engine::new()
            .with_rule(Rule::new("one", Tag::Template("(two {body})".to_owned())))
            .unwrap()
            .with_rule(Rule::new("two", Tag::Template("<{body}>".to_owned())))
            .unwrap();
        assert_eq!(first.process("(one x)").unwrap(), "<x>");

        let second = Engine::new()
            .with_rule(Rule::new("two", Tag::Template("<{body}>".to_owned())))
            .unwrap()
            .with_rule(Rule::new("one", Tag::Template("(two {body})".to_owned())))
            .unwrap();
        assert_eq!(second.process("(one x)").unwrap(), "(two x)");
    }

    #[test]
    fn test_different_keys_nest() {
        assert_eq!(
            builtin().process("(b bold (it both))").unwrap(),
            "\\textbf{bold \\textit{both}}"
        );
        assert_eq!(
            builtin().process("(it italic (b both) tail)").unwrap(),
            "\\textit{italic \\textbf{both} tail}"
        );
    }

    #[test]
    fn test_same_key_nesting_is_not_recursive() {
        assert_eq!(
            builtin().process("(b outer (b inner) tail)").unwrap(),
            "\\textbf{outer (b inner} tail)"
        );
    }

    #[test]
    fn test_invalid_rule_is_rejected_on_registration() {
        let mut engine = Engine::new();
        let err = engine
            .register(Rule::new("", Tag::Bold))
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidRule { .. }));
        assert!(engine.rules().is_empty());

        let err = engine
            .register(Rule::builtin(Tag::Bold).with_delimiters(Vec::new()))
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidRule { .. }));
    }

    #[test]
    fn test_invalid_settings_block_config() {
        let config = EngineConfig::new().with_settings_block(SettingsBlock {
            delimiters: DelimiterPair::new("", "-->"),
            key: "settings".to_owned(),
        });
        assert!(Engine::with_config(config).is_err());
    }

    #[test]
    fn test_include_then_format() {
        let config = with_files(&[("docs/part.tex", "(b from part)")]);
        let engine = Engine::with_config(config).unwrap().with_builtin_rules();
        assert_eq!(
            engine.process("before (include part.tex) after").unwrap(),
            "before \\textbf{from part} after"
        );
    }

    #[test]
    fn test_nested_include_resolves_against_including_file() {
        let config = with_files(&[
            ("docs/chapters/one.tex", "one (include two.tex)"),
            ("docs/chapters/two.tex", "two"),
        ]);
        let engine = Engine::with_config(config).unwrap().with_builtin_rules();
        assert_eq!(
            engine.process("(include chapters/one.tex)").unwrap(),
            "one two"
        );
    }

    #[test]
    fn test_missing_include_is_recoverable() {
        let engine = Engine::with_config(with_files(&[]))
            .unwrap()
            .with_builtin_rules();
        let output = engine
            .process("start (include ./missing.txt) (b end)")
            .unwrap();
        assert!(output.starts_with("start [include error: ./missing.txt"));
        assert!(output.contains("file not found"));
        assert!(output.ends_with(" \\textbf{end}"));
    }

    #[test]
    fn test_include_cycle_is_fatal() {
        let config = with_files(&[
            ("docs/a.tex", "(include b.tex)"),
            ("docs/b.tex", "(include a.tex)"),
        ]);
        let engine = Engine::with_config(config).unwrap().with_builtin_rules();
        let err = engine.process("(include a.tex)").unwrap_err();
        assert!(matches!(
            err,
            EngineError::IncludeDepthExceeded { max_depth: 10, .. }
        ));
    }

    #[test]
    fn test_include_depth_limit() {
        let files = [
            ("docs/one.tex", "(include two.tex)"),
            ("docs/two.tex", "two"),
        ];

        let shallow = Engine::with_config(with_files(&files).with_max_include_depth(1))
            .unwrap()
            .with_builtin_rules();
        let err = shallow.process("(include one.tex)").unwrap_err();
        match err {
            EngineError::IncludeDepthExceeded { path, max_depth } => {
                assert_eq!(path, PathBuf::from("docs/two.tex"));
                assert_eq!(max_depth, 1);
            }
            other => panic!("unexpected error: {other}"),
        }

        let deep = Engine::with_config(with_files(&files).with_max_include_depth(2))
            .unwrap()
            .with_builtin_rules();
        assert_eq!(deep.process("(include one.tex)").unwrap(), "two");
    }

    #[test]
    fn test_include_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("intro.tex"), "(it Introduction)").unwrap();

        let config = EngineConfig::new().with_base_dir(dir.path());
        let engine = Engine::with_config(config).unwrap().with_builtin_rules();

        assert_eq!(
            engine.process("(include intro.tex)\n").unwrap(),
            "\\textit{Introduction}\n"
        );
        let output = engine.process("(include nope.tex)").unwrap();
        assert!(output.contains("nope.tex"));
        assert!(output.contains("include error"));
    }

    #[test]
    fn test_settings_delimiters_apply_to_included_text() {
        let config = with_files(&[("docs/part.tex", "{b inner}")]);
        let engine = Engine::with_config(config).unwrap().with_builtin_rules();
        let input = "<!-- settings\ndelimiters: { }\n-->\n{include part.tex}";
        assert_eq!(engine.process(input).unwrap(), "\\textbf{inner}");
    }

    #[test]
    fn test_custom_settings_block() {
        let config = EngineConfig::new().with_settings_block(SettingsBlock {
            delimiters: DelimiterPair::new("%%", "%%"),
            key: "mpp".to_owned(),
        });
        let engine = Engine::with_config(config).unwrap().with_builtin_rules();
        let input = "%% mpp\nmacro: NAME World\n%%\nHello (b NAME)";
        assert_eq!(engine.process(input).unwrap(), "Hello \\textbf{World}");
    }
}
