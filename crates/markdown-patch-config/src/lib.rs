//! Configuration loader for the markdown-patch pipeline.
//!
//! Settings live in `.markdown-patch.toml`, resolved with the precedence
//! stack: explicit override path, then the closest file found walking up
//! from the working directory, then built-in defaults. Parsed values are
//! normalised into a flat typed structure so the CLI never touches raw TOML.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

const CONFIG_FILE_NAME: &str = ".markdown-patch.toml";

/// Resolved configuration with defaults filled in.
#[derive(Debug, Clone)]
pub struct Config {
    /// External formatter command, e.g. `"mdformat -"`. Absent means no
    /// formatting.
    pub format_command: Option<String>,
    pub atomic: bool,
    pub ensure_final_newline: bool,
    pub preserve_encoding: bool,
    pub preserve_eol: bool,
    /// The file these settings came from, absent for pure defaults.
    pub source: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            format_command: None,
            atomic: true,
            ensure_final_newline: true,
            preserve_encoding: true,
            preserve_eol: true,
            source: None,
        }
    }
}

/// How the loader locates its file.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub override_path: Option<PathBuf>,
    /// Directory the upward search starts from; defaults to the working
    /// directory.
    pub start_dir: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value in config {path}: {message}")]
    Invalid { path: PathBuf, message: String },
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    format: RawFormat,
    #[serde(default)]
    apply: RawApply,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFormat {
    command: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct RawApply {
    atomic: Option<bool>,
    ensure_final_newline: Option<bool>,
    preserve_encoding: Option<bool>,
    preserve_eol: Option<bool>,
}

impl Config {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let path = match options.override_path {
            Some(path) => Some(path),
            None => discover(options.start_dir)?,
        };

        match path {
            Some(path) => Self::from_file(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: RawConfig = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let format_command = match raw.format.command {
            Some(command) if command.trim().is_empty() => {
                return Err(ConfigError::Invalid {
                    path: path.to_path_buf(),
                    message: "format.command must not be empty".to_string(),
                });
            }
            Some(command) if command.trim() == "none" => None,
            other => other,
        };

        let defaults = Self::default();
        Ok(Self {
            format_command,
            atomic: raw.apply.atomic.unwrap_or(defaults.atomic),
            ensure_final_newline: raw
                .apply
                .ensure_final_newline
                .unwrap_or(defaults.ensure_final_newline),
            preserve_encoding: raw
                .apply
                .preserve_encoding
                .unwrap_or(defaults.preserve_encoding),
            preserve_eol: raw.apply.preserve_eol.unwrap_or(defaults.preserve_eol),
            source: Some(path.to_path_buf()),
        })
    }
}

fn discover(start_dir: Option<PathBuf>) -> Result<Option<PathBuf>, ConfigError> {
    let start = match start_dir {
        Some(dir) => dir,
        None => env::current_dir().map_err(|source| ConfigError::Io {
            path: PathBuf::from("."),
            source,
        })?,
    };

    let mut current = Some(start.as_path());
    while let Some(dir) = current {
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Ok(Some(candidate));
        }
        current = dir.parent();
    }

    Ok(None)
}
