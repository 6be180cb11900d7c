//! Delimiter-aware tag substitution engine.
//!
//! Rewrites tagged spans such as `(b text)` or `(color red text)` into LaTeX
//! commands. A document may start with a settings block that adds delimiter
//! pairs and declares literal macros for that document only.
//!
//! # Architecture
//!
//! Processing a document runs in two phases:
//!
//! 1. **Settings** ([`SettingsExtractor`]): the first settings block is parsed
//!    and removed from the text.
//! 2. **Substitution** ([`Engine::process`]): every registered [`Rule`] gets
//!    one pass over the whole document, highest priority first, with the
//!    document's delimiters appended to its own. Declared macros run last via
//!    a [`MacroSet`].
//!
//! Later passes see the output of earlier ones, so `include` (priority 10)
//! inlines files before the formatting rules (priority 0) run.
//!
//! # Example
//!
//! ```
//! use mpp_engine::{Engine, Rule, Tag};
//!
//! let engine = Engine::new()
//!     .with_builtin_rules()
//!     .with_rule(Rule::new("sc", Tag::Template("\\textsc{{body}}".to_owned())))
//!     .unwrap();
//!
//! let input = "<!-- settings\ndelimiters: { }\nmacro: ACME Acme Inc.\n-->\n{b ACME} (sc rocks)";
//! let output = engine.process(input).unwrap();
//! assert_eq!(output, "\\textbf{Acme Inc.} \\textsc{rocks}");
//! ```

mod context;
mod delimiters;
mod engine;
mod error;
mod macros;
mod output;
mod pattern;
mod rule;
mod settings;

pub use context::RuleContext;
pub use delimiters::DelimiterPair;
pub use engine::{Engine, EngineConfig, ReadFileFn};
pub use error::EngineError;
pub use macros::{Macro, MacroSet};
pub use output::RuleOutput;
pub use pattern::{TagMatch, TagPattern};
pub use rule::{DEFAULT_PRIORITY, INCLUDE_PRIORITY, Rule, Tag};
pub use settings::{
    DELIMITERS_KEY, Extraction, MACRO_KEY, Settings, SettingsBlock, SettingsExtractor,
};
