//! Configuration management for mpp.
//!
//! Parses `mpp.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `engine.base_dir`

mod expand;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override maximum include depth.
    pub max_include_depth: Option<usize>,
    /// Override backup creation when overwriting the input.
    pub backup: Option<bool>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "mpp.toml";

/// Upper bound accepted for `engine.max_include_depth`.
const MAX_INCLUDE_DEPTH: usize = 1000;

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Engine configuration (paths are relative strings from TOML).
    engine: EngineConfigRaw,
    /// Default delimiter pair for every tag.
    pub delimiters: DelimitersConfig,
    /// Settings block recognized inside documents.
    pub settings: SettingsBlockConfig,
    /// Output configuration.
    pub output: OutputConfig,
    /// User-defined template tags.
    pub tags: Vec<TagConfig>,

    /// Resolved engine configuration (set after loading).
    #[serde(skip)]
    pub engine_resolved: EngineConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Raw engine configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct EngineConfigRaw {
    base_dir: Option<String>,
    max_include_depth: Option<usize>,
}

/// Resolved engine configuration.
#[derive(Debug)]
pub struct EngineConfig {
    /// Base directory for include paths.
    ///
    /// `None` means the directory of the document being processed.
    pub base_dir: Option<PathBuf>,
    /// Maximum include nesting.
    pub max_include_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_dir: None,
            max_include_depth: 10,
        }
    }
}

/// Default delimiter pair.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DelimitersConfig {
    /// Opening delimiter.
    pub open: String,
    /// Closing delimiter.
    pub close: String,
}

impl Default for DelimitersConfig {
    fn default() -> Self {
        Self {
            open: "(".to_owned(),
            close: ")".to_owned(),
        }
    }
}

/// Settings block delimiters and key.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SettingsBlockConfig {
    /// Opening delimiter.
    pub open: String,
    /// Closing delimiter.
    pub close: String,
    /// Key following the opening delimiter.
    pub key: String,
}

impl Default for SettingsBlockConfig {
    fn default() -> Self {
        Self {
            open: "<!--".to_owned(),
            close: "-->".to_owned(),
            key: "settings".to_owned(),
        }
    }
}

/// Output configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Write `.NAME~` before overwriting the input in place.
    pub backup: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { backup: true }
    }
}

/// User-defined template tag.
#[derive(Debug, Deserialize)]
pub struct TagConfig {
    /// Tag key.
    pub key: String,
    /// Output template; `{body}` and `{head}` are substituted.
    pub template: String,
    /// Pass priority (higher runs first).
    #[serde(default)]
    pub priority: i32,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`engine.base_dir`").
        field: String,
        /// Error message (e.g., "${`DOCS`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a string field to contain no whitespace.
fn require_no_whitespace(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.chars().any(char::is_whitespace) {
        return Err(ConfigError::Validation(format!(
            "{field} cannot contain whitespace"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `mpp.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(depth) = settings.max_include_depth {
            self.engine_resolved.max_include_depth = depth;
        }
        if let Some(backup) = settings.backup {
            self.output.backup = backup;
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        Self::discover_config_from(current)
    }

    fn discover_config_from(mut current: PathBuf) -> Option<PathBuf> {
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        // Validate configuration after loading and resolution
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Checks that all required fields are properly set and contain valid values.
    /// Called automatically after loading from file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_engine()?;
        self.validate_delimiters()?;
        self.validate_tags()?;
        Ok(())
    }

    fn validate_engine(&self) -> Result<(), ConfigError> {
        let depth = self.engine_resolved.max_include_depth;
        if depth == 0 {
            return Err(ConfigError::Validation(
                "engine.max_include_depth must be greater than 0".to_owned(),
            ));
        }
        if depth > MAX_INCLUDE_DEPTH {
            return Err(ConfigError::Validation(format!(
                "engine.max_include_depth cannot exceed {MAX_INCLUDE_DEPTH}"
            )));
        }
        Ok(())
    }

    fn validate_delimiters(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.delimiters.open, "delimiters.open")?;
        require_non_empty(&self.delimiters.close, "delimiters.close")?;
        require_non_empty(&self.settings.open, "settings.open")?;
        require_non_empty(&self.settings.close, "settings.close")?;
        require_non_empty(&self.settings.key, "settings.key")?;
        require_no_whitespace(&self.settings.key, "settings.key")?;
        Ok(())
    }

    fn validate_tags(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for tag in &self.tags {
            require_non_empty(&tag.key, "tags.key")?;
            require_no_whitespace(&tag.key, "tags.key")?;
            require_non_empty(&tag.template, &format!("tags.{}.template", tag.key))?;
            if !seen.insert(tag.key.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "tag `{}` is defined more than once",
                    tag.key
                )));
            }
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref base_dir) = self.engine.base_dir {
            self.engine.base_dir = Some(expand::expand_env(base_dir, "engine.base_dir")?);
        }
        Ok(())
    }

    /// Resolve relative paths against the config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        self.engine_resolved = EngineConfig {
            base_dir: self.engine.base_dir.as_deref().map(|d| config_dir.join(d)),
            max_include_depth: self
                .engine
                .max_include_depth
                .unwrap_or(EngineConfig::default().max_include_depth),
        };
    }
}
