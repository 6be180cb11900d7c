//! Document processing command.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use mpp_config::{CliSettings, Config};
use mpp_engine::{DelimiterPair, Engine, EngineConfig, Rule, SettingsBlock, Tag};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for processing a document.
#[derive(Args)]
pub(crate) struct ProcessArgs {
    /// Document to transform.
    input: PathBuf,

    /// Output file (default: overwrite INPUT, keeping a backup).
    output: Option<PathBuf>,

    /// Path to configuration file (default: auto-discover mpp.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Maximum include nesting (overrides config).
    #[arg(long)]
    max_include_depth: Option<usize>,

    /// Do not write `.INPUT~` before overwriting INPUT.
    #[arg(long)]
    no_backup: bool,

    /// Enable verbose output (show include and pass logs).
    #[arg(short, long)]
    pub verbose: bool,
}

impl ProcessArgs {
    /// Execute the command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails, the input can't be read, the
    /// engine hits a fatal condition, or the output can't be written.
    pub(crate) fn execute(self, output: &Output) -> Result<(), CliError> {
        let cli_settings = CliSettings {
            max_include_depth: self.max_include_depth,
            backup: self.no_backup.then_some(false),
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        if let Some(path) = &config.config_path {
            output.config(path);
        }

        if !self.input.is_file() {
            return Err(CliError::Validation(format!(
                "input file not found: {}",
                self.input.display()
            )));
        }

        let engine = build_engine(&config, &self.input)?;
        let text = fs::read_to_string(&self.input)?;
        let result = engine.process(&text)?;

        let target = self.output.unwrap_or_else(|| self.input.clone());
        if is_same_file(&target, &self.input) {
            if config.output.backup {
                let backup = write_backup(&self.input, &text)?;
                output.backup(&backup);
            } else {
                output.overwrite(&self.input);
            }
        }

        fs::write(&target, result)?;
        output.written(&target);

        Ok(())
    }
}

/// Build an engine with the built-in rules and configured template tags.
///
/// Includes resolve against `engine.base_dir` when configured, otherwise
/// against the directory of `input`.
fn build_engine(config: &Config, input: &Path) -> Result<Engine, CliError> {
    let base_dir = config.engine_resolved.base_dir.clone().unwrap_or_else(|| {
        input
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    });

    let engine_config = EngineConfig::new()
        .with_base_dir(base_dir)
        .with_max_include_depth(config.engine_resolved.max_include_depth)
        .with_settings_block(SettingsBlock {
            delimiters: DelimiterPair::new(&config.settings.open, &config.settings.close),
            key: config.settings.key.clone(),
        });
    let mut engine = Engine::with_config(engine_config)?;

    let default_pair = DelimiterPair::new(&config.delimiters.open, &config.delimiters.close);
    for tag in Tag::builtins() {
        engine.register(Rule::builtin(tag).with_delimiters(vec![default_pair.clone()]))?;
    }

    for tag in &config.tags {
        if Tag::builtins()
            .iter()
            .any(|builtin| builtin.default_key() == Some(tag.key.as_str()))
        {
            return Err(CliError::Validation(format!(
                "tag `{}` clashes with a built-in tag",
                tag.key
            )));
        }
        let rule = Rule::new(&tag.key, Tag::Template(tag.template.clone()))
            .with_priority(tag.priority)
            .with_delimiters(vec![default_pair.clone()]);
        engine.register(rule)?;
        tracing::info!(key = %tag.key, priority = tag.priority, "Registered template tag");
    }

    Ok(engine)
}

/// Check whether `target` names the existing file `input`, however spelled.
fn is_same_file(target: &Path, input: &Path) -> bool {
    if target == input {
        return true;
    }
    match (fs::canonicalize(target), fs::canonicalize(input)) {
        (Ok(target), Ok(input)) => target == input,
        _ => false,
    }
}

/// Path of the hidden backup for `input`: `.NAME~` in the same directory.
fn backup_path(input: &Path) -> Result<PathBuf, CliError> {
    let name = input.file_name().ok_or_else(|| {
        CliError::Validation(format!("invalid input path: {}", input.display()))
    })?;
    let mut backup_name = std::ffi::OsString::from(".");
    backup_name.push(name);
    backup_name.push("~");
    Ok(input.with_file_name(backup_name))
}

/// Write `contents` to the backup path of `input`.
fn write_backup(input: &Path, contents: &str) -> Result<PathBuf, CliError> {
    let path = backup_path(input)?;
    fs::write(&path, contents)?;
    Ok(path)
}
