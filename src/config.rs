//! Settings for fencefmt.
//!
//! Settings are read once at startup from `.fencefmt.toml` (found by walking up
//! from the working directory, or given with `--config`) and merged over the
//! defaults. The rewrite itself does not read any of them: the recognized tags
//! and the indentation width are fixed.

use crate::formatter::{BuiltinFormatter, CommandFormatter, Formatter, ToolDefinition, ToolRegistry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Name of the configuration file.
pub const CONFIG_FILE: &str = ".fencefmt.toml";

/// Formatter id selecting the in-process formatter.
pub const BUILTIN_FORMATTER: &str = "builtin";

/// Effective settings after merging.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct Settings {
    /// Formatter to use: "builtin" or a tool id
    pub formatter: String,

    /// Timeout per external formatter run in milliseconds (0 = no timeout)
    pub timeout: u64,

    /// Respect .gitignore files when walking directories
    pub respect_gitignore: bool,

    /// Glob patterns excluded from directory walks
    pub exclude: Vec<String>,

    /// Custom tool definitions (override built-ins)
    pub tools: BTreeMap<String, ToolDefinition>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            formatter: BUILTIN_FORMATTER.to_string(),
            timeout: 30_000,
            respect_gitignore: true,
            exclude: Vec::new(),
            tools: BTreeMap::new(),
        }
    }
}

/// Settings as written in a file; absent keys keep their default.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct LoadedSettings {
    pub formatter: Option<String>,
    pub timeout: Option<u64>,
    pub respect_gitignore: Option<bool>,
    pub exclude: Option<Vec<String>>,
    #[serde(default)]
    pub tools: BTreeMap<String, ToolDefinition>,
}

/// Overlay `loaded` on `defaults`. Tools are merged by id.
pub fn merge(defaults: Settings, loaded: LoadedSettings) -> Settings {
    let mut tools = defaults.tools;
    tools.extend(loaded.tools);

    Settings {
        formatter: loaded.formatter.unwrap_or(defaults.formatter),
        timeout: loaded.timeout.unwrap_or(defaults.timeout),
        respect_gitignore: loaded.respect_gitignore.unwrap_or(defaults.respect_gitignore),
        exclude: loaded.exclude.unwrap_or(defaults.exclude),
        tools,
    }
}

/// Errors that can occur when loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("Failed to read config file at {path}: {source}")]
    IoError { source: io::Error, path: String },

    /// Failed to parse the configuration content
    #[error("Failed to parse config file at {path}: {message}")]
    ParseError { path: String, message: String },

    /// Configuration file already exists
    #[error("Configuration file already exists at {path}")]
    FileExists { path: String },

    /// The selected formatter is neither built in nor defined
    #[error("Unknown formatter '{name}' (available: {available})")]
    UnknownFormatter { name: String, available: String },
}

impl Settings {
    /// Render as TOML, as `fencefmt config` prints it.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError {
            path: "<settings>".to_string(),
            message: e.to_string(),
        })
    }

    /// Build the formatter selected by [`Settings::formatter`].
    pub fn build_formatter(&self) -> Result<Box<dyn Formatter>, ConfigError> {
        if self.formatter == BUILTIN_FORMATTER {
            return Ok(Box::new(BuiltinFormatter));
        }

        let registry = ToolRegistry::new(self.tools.clone());
        match registry.get(&self.formatter) {
            Some(tool) => Ok(Box::new(CommandFormatter::new(
                self.formatter.clone(),
                tool.clone(),
                self.timeout,
            ))),
            None => {
                let mut available = vec![BUILTIN_FORMATTER];
                available.extend(registry.list_tools());
                Err(ConfigError::UnknownFormatter {
                    name: self.formatter.clone(),
                    available: available.join(", "),
                })
            }
        }
    }
}

/// Parse the contents of a settings file.
pub fn parse_settings(content: &str, path: &str) -> Result<LoadedSettings, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::ParseError {
        path: path.to_string(),
        message: e.to_string(),
    })
}

/// Look for [`CONFIG_FILE`] in `start` and its parents.
///
/// The search stops at the first directory containing `.git`.
pub fn discover_config_file(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        let candidate = current.join(CONFIG_FILE);
        if candidate.is_file() {
            log::debug!("Found config file: {}", candidate.display());
            return Some(candidate);
        }
        if current.join(".git").exists() {
            break;
        }
        dir = current.parent();
    }
    None
}

/// Load settings from `explicit` if given, otherwise from the discovered file,
/// otherwise the defaults. Returns the settings and the file they came from.
pub fn load_settings(explicit: Option<&Path>, start: &Path) -> Result<(Settings, Option<PathBuf>), ConfigError> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => discover_config_file(start),
    };

    let Some(path) = path else {
        log::debug!("No {CONFIG_FILE} found, using defaults");
        return Ok((Settings::default(), None));
    };

    let display = path.display().to_string();
    let content = fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
        source: e,
        path: display.clone(),
    })?;
    let loaded = parse_settings(&content, &display)?;

    Ok((merge(Settings::default(), loaded), Some(path)))
}

/// Create a default configuration file at the specified path
pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
    if path.exists() {
        return Err(ConfigError::FileExists {
            path: path.display().to_string(),
        });
    }

    let default_config = r#"# fencefmt configuration file

# Formatter for ```sh / ```bash blocks: "builtin", "shfmt", "shfmt:bash",
# "shfmt:posix", or the id of a tool defined below
formatter = "builtin"

# Timeout per external formatter run in milliseconds (0 = no timeout)
timeout = 30000

# Respect .gitignore files when walking directories
respect-gitignore = true

# Glob patterns to skip when walking directories
exclude = [
    "node_modules",
    "vendor",
    "CHANGELOG.md",
]

# Custom formatters; "{indent}" is replaced by the indentation width
# [tools.my-shfmt]
# command = ["/usr/local/bin/shfmt", "-i", "{indent}", "-ci"]
"#;

    fs::write(path, default_config).map_err(|err| ConfigError::IoError {
        source: err,
        path: path.display().to_string(),
    })
}
