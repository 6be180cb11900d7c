//! Status messages on stderr.

use std::fmt::Display;
use std::path::Path;

use console::{Style, Term};

/// Reports what a run read and wrote; stdout stays free for pipes.
pub(crate) struct Output {
    term: Term,
    done: Style,
    caution: Style,
    failure: Style,
}

impl Output {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            done: Style::new().green(),
            caution: Style::new().yellow(),
            failure: Style::new().red(),
        }
    }

    /// Config file picked up by discovery or `--config`.
    pub(crate) fn config(&self, path: &Path) {
        self.line(None, format_args!("Using config: {}", path.display()));
    }

    pub(crate) fn backup(&self, path: &Path) {
        self.line(None, format_args!("Backup written to {}", path.display()));
    }

    /// In-place rewrite with backups turned off.
    pub(crate) fn overwrite(&self, input: &Path) {
        self.line(
            Some(&self.caution),
            format_args!("Overwriting {} without backup", input.display()),
        );
    }

    pub(crate) fn written(&self, path: &Path) {
        self.line(Some(&self.done), format_args!("Wrote {}", path.display()));
    }

    /// Fatal error, printed before exiting non-zero.
    pub(crate) fn error(&self, err: &dyn Display) {
        self.line(Some(&self.failure), format_args!("Error: {err}"));
    }

    fn line(&self, style: Option<&Style>, msg: impl Display) {
        let text = match style {
            Some(style) => style.apply_to(msg).to_string(),
            None => msg.to_string(),
        };
        let _ = self.term.write_line(&text);
    }
}
