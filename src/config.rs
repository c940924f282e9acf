//! Configuration system for persona-switcher
//!
//! Supports multiple configuration sources with the following precedence (highest to lowest):
//! 1. CLI arguments
//! 2. Environment variables (PERSONA_SWITCHER_* prefix)
//! 3. Configuration file (TOML)
//! 4. Default values

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::persona::{Persona, PersonaRegistry};

/// Default name of the persisted persona state file
pub const DEFAULT_STATE_FILE: &str = "persona-state.json";

/// Environment variable the launcher reads its working folder from
pub const DEFAULT_WORKING_DIR_ENV: &str = "CLAUDE_WORKING_DIR";

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SwitcherConfig {
    /// Where the state file and persona prompt files live
    pub paths: PathSettings,

    /// Launcher behaviour
    pub launcher: LauncherSettings,

    /// Logging configuration
    pub logging: LoggingSettings,

    /// Extra personas appended to the built-in registry
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub personas: Vec<PersonaEntry>,
}

/// Filesystem locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    /// Base directory (per-user configuration root)
    pub claude_dir: String,

    /// State file name inside `claude_dir`
    pub state_file: String,

    /// Directories searched for `persona-<name>.md`, relative to `claude_dir`
    pub prompt_dirs: Vec<String>,
}

/// Launcher settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherSettings {
    /// Environment variable overriding the working folder
    pub working_dir_env: String,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    pub level: String,

    /// Log file path (empty = no file logging)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Number of rotated log files to keep
    pub max_files: u32,

    /// Enable JSON formatted logging
    pub json_format: bool,
}

/// A registry extension declared in the config file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersonaEntry {
    pub name: String,
    pub display_name: String,
    #[serde(default = "default_icon")]
    pub icon: String,
}

fn default_icon() -> String {
    "$(person)".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            claude_dir: "~/.claude".to_string(),
            state_file: DEFAULT_STATE_FILE.to_string(),
            prompt_dirs: vec!["personas".to_string(), "skills".to_string()],
        }
    }
}

impl Default for LauncherSettings {
    fn default() -> Self {
        Self {
            working_dir_env: DEFAULT_WORKING_DIR_ENV.to_string(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: None,
            max_files: 5,
            json_format: false,
        }
    }
}

impl SwitcherConfig {
    /// Load configuration from file with environment variable overrides
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = Self::find_config_file(config_path)? {
            debug!(path = %path.display(), "Loading configuration file");
            let content = fs::read_to_string(&path).map_err(|e| Error::IoRead {
                path: path.clone(),
                source: e,
            })?;
            config = toml::from_str(&content).map_err(|e| Error::ConfigParse {
                message: format!("{}: {}", path.display(), e),
                source: Some(e),
            })?;
            info!(path = %path.display(), "Configuration loaded from file");
        }

        config.apply_env_overrides();
        config.expand_paths();
        config.validate()?;

        Ok(config)
    }

    /// Find the configuration file to use
    fn find_config_file(explicit_path: Option<&str>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit_path {
            let path = PathBuf::from(expand_path(path));
            if path.exists() {
                return Ok(Some(path));
            }
            return Err(Error::config_not_found(path));
        }

        let search_paths = [
            PathBuf::from("persona-switcher.toml"),
            dirs::config_dir()
                .map(|p| p.join("persona-switcher").join("config.toml"))
                .unwrap_or_default(),
            dirs::home_dir()
                .map(|p| p.join(".persona-switcher.toml"))
                .unwrap_or_default(),
        ];

        for path in &search_paths {
            if !path.as_os_str().is_empty() && path.exists() {
                debug!(path = %path.display(), "Found configuration file");
                return Ok(Some(path.clone()));
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(None)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("PERSONA_SWITCHER_CLAUDE_DIR") {
            self.paths.claude_dir = val;
        }
        if let Ok(val) = std::env::var("PERSONA_SWITCHER_STATE_FILE") {
            self.paths.state_file = val;
        }
        if let Ok(val) = std::env::var("PERSONA_SWITCHER_WORKING_DIR_ENV") {
            self.launcher.working_dir_env = val;
        }

        if let Ok(val) = std::env::var("PERSONA_SWITCHER_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = std::env::var("PERSONA_SWITCHER_LOG_FILE") {
            self.logging.file = Some(val);
        }
        if let Ok(val) = std::env::var("PERSONA_SWITCHER_LOG_JSON") {
            self.logging.json_format = val.to_lowercase() == "true" || val == "1";
        }
    }

    /// Expand ~ and other path variables
    fn expand_paths(&mut self) {
        self.paths.claude_dir = expand_path(&self.paths.claude_dir);

        if let Some(ref file) = self.logging.file {
            self.logging.file = Some(expand_path(file));
        }
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::config_field_invalid(
                "logging.level",
                format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    valid_levels.join(", ")
                ),
            ));
        }

        if self.paths.claude_dir.is_empty() {
            return Err(Error::config_field_invalid(
                "paths.claude_dir",
                "claude_dir cannot be empty",
            ));
        }

        let state_file = &self.paths.state_file;
        if state_file.is_empty() || state_file.contains('/') || state_file.contains('\\') {
            return Err(Error::config_field_invalid(
                "paths.state_file",
                format!("state_file must be a plain file name, got '{}'", state_file),
            ));
        }

        if self.launcher.working_dir_env.is_empty() {
            return Err(Error::config_field_invalid(
                "launcher.working_dir_env",
                "working_dir_env cannot be empty",
            ));
        }

        let builtin = PersonaRegistry::builtin();
        let mut seen: Vec<&str> = Vec::new();
        for entry in &self.personas {
            if entry.name.trim().is_empty() {
                return Err(Error::config_field_invalid(
                    "personas.name",
                    "persona name cannot be empty",
                ));
            }
            if builtin.get(&entry.name).is_some() || seen.contains(&entry.name.as_str()) {
                return Err(Error::config_field_invalid(
                    "personas.name",
                    format!("persona '{}' is declared more than once", entry.name),
                ));
            }
            seen.push(&entry.name);
        }

        Ok(())
    }

    /// Base directory as a PathBuf
    pub fn claude_dir(&self) -> PathBuf {
        PathBuf::from(&self.paths.claude_dir)
    }

    /// Absolute path of the persona state file
    pub fn state_path(&self) -> PathBuf {
        self.claude_dir().join(&self.paths.state_file)
    }

    /// Prompt search directories, resolved against `claude_dir`
    pub fn prompt_dirs(&self) -> Vec<PathBuf> {
        let base = self.claude_dir();
        self.paths
            .prompt_dirs
            .iter()
            .map(|dir| base.join(expand_path(dir)))
            .collect()
    }

    /// Built-in personas followed by the configured extensions
    pub fn registry(&self) -> PersonaRegistry {
        let mut registry = PersonaRegistry::builtin();
        for entry in &self.personas {
            registry.push(Persona::new(&entry.name, &entry.display_name, &entry.icon));
        }
        registry
    }
}

/// Expand ~ and environment variables in paths
fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .unwrap_or_else(|_| std::borrow::Cow::Borrowed(path))
        .into_owned()
}

/// Initialize a new configuration file
pub fn init_config(path: Option<&str>, force: bool) -> Result<PathBuf> {
    let config_path = path
        .map(|p| PathBuf::from(expand_path(p)))
        .unwrap_or_else(|| {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("persona-switcher")
                .join("config.toml")
        });

    if config_path.exists() && !force {
        return Err(Error::config_validation(format!(
            "Configuration file already exists: {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        create_dir(parent)?;
    }

    fs::write(&config_path, generate_default_config()).map_err(|e| Error::IoWrite {
        path: config_path.clone(),
        source: e,
    })?;

    info!(path = %config_path.display(), "Configuration file created");
    Ok(config_path)
}

fn create_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| Error::IoWrite {
        path: dir.to_path_buf(),
        source: e,
    })
}

/// Generate default configuration content with comments
fn generate_default_config() -> String {
    r#"# persona-switcher configuration

[paths]
# Base directory holding the state file and persona prompt files
claude_dir = "~/.claude"

# Persona state file name inside claude_dir
state_file = "persona-state.json"

# Directories (relative to claude_dir) searched for persona-<name>.md
prompt_dirs = ["personas", "skills"]

[launcher]
# Environment variable naming the folder to resolve the persona for
working_dir_env = "CLAUDE_WORKING_DIR"

[logging]
# Log level: trace, debug, info, warn, error
level = "warn"

# Log file path (comment out to disable file logging)
# file = "~/.claude/logs/persona-switcher.log"

# Number of rotated log files to keep
max_files = 5

# Enable JSON formatted logging
json_format = false

# Extra personas, listed after the built-in ones
# [[personas]]
# name = "scribe"
# display_name = "Scribe"
# icon = "$(pencil)"
"#
    .to_string()
}
