//! Substitution context.
//!
//! Provides file system access and include nesting information to rules.

use std::io;
use std::path::{Path, PathBuf};

/// Context handed to [`Rule::replace`](crate::Rule::replace) for each match.
///
/// The engine creates one context per document level: the top-level document
/// gets depth 0 and the configured base directory; each inlined file gets a
/// child context rooted at that file's directory.
///
/// # Example
///
/// ```
/// use std::path::Path;
/// use mpp_engine::RuleContext;
///
/// let ctx = RuleContext {
///     base_dir: Path::new("docs"),
///     depth: 0,
///     read_file: &|path| std::fs::read_to_string(path),
/// };
///
/// let resolved = ctx.resolve_path("chapters/intro.tex");
/// assert_eq!(resolved, Path::new("docs/chapters/intro.tex"));
/// ```
pub struct RuleContext<'a> {
    /// Base directory for resolving relative include paths.
    pub base_dir: &'a Path,
    /// Include nesting level of the text being substituted (0 = document).
    pub depth: usize,
    /// Callback to read a file from the file system.
    pub read_file: &'a dyn Fn(&Path) -> io::Result<String>,
}

impl<'a> RuleContext<'a> {
    /// Resolve a path against the base directory.
    ///
    /// Absolute paths are returned unchanged.
    #[must_use]
    pub fn resolve_path(&self, relative: &str) -> PathBuf {
        self.base_dir.join(relative)
    }

    /// Read a file using the context's `read_file` callback.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn read(&self, path: &Path) -> io::Result<String> {
        (self.read_file)(path)
    }

    /// Context for text inlined from a file living in `base_dir`.
    pub(crate) fn nested<'b>(&self, base_dir: &'b Path) -> RuleContext<'b>
    where
        'a: 'b,
    {
        RuleContext {
            base_dir,
            depth: self.depth + 1,
            read_file: self.read_file,
        }
    }
}
