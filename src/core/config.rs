//! Configuration system: TOML file + env var overrides + command-line overrides.
//!
//! Layers apply in order, later layers winning: built-in defaults, the TOML
//! file, `ARCHIVE_ROTATE_*` environment variables, then flags. The threshold
//! can be given as a byte count or as an arithmetic expression; within one
//! layer the expression wins, and a later layer replaces both forms.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, RotateError};
use crate::core::expr;

/// Default cap on removals per run.
pub const DEFAULT_MAX_REMOVALS: u64 = 1;
/// Default floor on the length of any deleted path.
pub const DEFAULT_MIN_PATH_LENGTH: usize = 2;

/// Full configuration model, as read from the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    pub rotation: RotationSettings,
    pub output: OutputConfig,
}

/// Rotation knobs. `path` and one threshold form have no default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RotationSettings {
    pub path: Option<PathBuf>,
    pub min_free_bytes: Option<u64>,
    pub min_free_expr: Option<String>,
    pub max_removals: u64,
    pub min_path_length: usize,
    pub log_directory_contents: bool,
}

/// How the run log is rendered on stdout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct OutputConfig {
    /// Emit one JSON object per log entry instead of human-readable lines.
    pub json: bool,
}

impl Default for RotationSettings {
    fn default() -> Self {
        Self {
            path: None,
            min_free_bytes: None,
            min_free_expr: None,
            max_removals: DEFAULT_MAX_REMOVALS,
            min_path_length: DEFAULT_MIN_PATH_LENGTH,
            log_directory_contents: false,
        }
    }
}

/// Values supplied on the command line. `None` leaves the lower layer intact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub path: Option<PathBuf>,
    pub min_free_bytes: Option<u64>,
    pub min_free_expr: Option<String>,
    pub max_removals: Option<u64>,
    pub min_path_length: Option<usize>,
    pub log_directory_contents: bool,
    pub json: bool,
}

/// Immutable, fully resolved input to the rotation engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RotationConfig {
    /// Directory whose immediate entries are subject to rotation.
    pub target_dir: PathBuf,
    /// Rotation stops once this many bytes are available.
    pub min_free_bytes: u64,
    /// Cap on removals per run.
    pub max_removals: u64,
    /// Deletion is refused for any joined path shorter than this.
    pub min_path_length: usize,
    /// Capture full before/after listings in the run log.
    pub log_directory_contents: bool,
}

impl RotationConfig {
    /// Config with the default cap and floor.
    #[must_use]
    pub fn new(target_dir: impl Into<PathBuf>, min_free_bytes: u64) -> Self {
        Self {
            target_dir: target_dir.into(),
            min_free_bytes,
            max_removals: DEFAULT_MAX_REMOVALS,
            min_path_length: DEFAULT_MIN_PATH_LENGTH,
            log_directory_contents: false,
        }
    }
}

impl Config {
    /// Default configuration path, when `HOME` is known.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        env::var_os("HOME").map(|home| {
            PathBuf::from(home)
                .join(".config")
                .join("archive-rotate")
                .join("config.toml")
        })
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(explicit) => {
                if !explicit.exists() {
                    return Err(RotateError::MissingConfig {
                        path: explicit.to_path_buf(),
                    });
                }
                Self::from_file(explicit)?
            }
            None => match Self::default_path() {
                Some(default) if default.exists() => Self::from_file(&default)?,
                _ => Self::default(),
            },
        };

        cfg.apply_env_overrides_from(env_var)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|source| RotateError::io(path, source))?;
        let parsed: Self = toml::from_str(&raw)?;
        Ok(parsed)
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let rotation = &mut self.rotation;

        if let Some(raw) = lookup("ARCHIVE_ROTATE_PATH") {
            rotation.path = Some(PathBuf::from(raw));
        }
        if let Some(raw) = lookup("ARCHIVE_ROTATE_MIN_FREE_BYTES") {
            rotation.min_free_bytes = Some(parse_env_u64("ARCHIVE_ROTATE_MIN_FREE_BYTES", &raw)?);
            rotation.min_free_expr = None;
        }
        if let Some(raw) = lookup("ARCHIVE_ROTATE_MIN_FREE_EXPR") {
            rotation.min_free_expr = Some(raw);
            rotation.min_free_bytes = None;
        }
        if let Some(raw) = lookup("ARCHIVE_ROTATE_MAX_REMOVALS") {
            rotation.max_removals = parse_env_u64("ARCHIVE_ROTATE_MAX_REMOVALS", &raw)?;
        }
        if let Some(raw) = lookup("ARCHIVE_ROTATE_MIN_PATH_LENGTH") {
            rotation.min_path_length = raw.parse::<usize>().map_err(|error| {
                RotateError::ConfigParse {
                    context: "env",
                    details: format!("ARCHIVE_ROTATE_MIN_PATH_LENGTH={raw:?}: {error}"),
                }
            })?;
        }
        if let Some(raw) = lookup("ARCHIVE_ROTATE_LOG_DIRECTORY_CONTENTS") {
            rotation.log_directory_contents =
                parse_env_bool("ARCHIVE_ROTATE_LOG_DIRECTORY_CONTENTS", &raw)?;
        }
        if let Some(raw) = lookup("ARCHIVE_ROTATE_JSON") {
            self.output.json = parse_env_bool("ARCHIVE_ROTATE_JSON", &raw)?;
        }

        Ok(())
    }

    /// Apply command-line values on top of the file and env layers.
    pub fn apply_overrides(&mut self, overrides: Overrides) -> Result<()> {
        let rotation = &mut self.rotation;
        if let Some(path) = overrides.path {
            rotation.path = Some(path);
        }
        if let Some(bytes) = overrides.min_free_bytes {
            rotation.min_free_bytes = Some(bytes);
            rotation.min_free_expr = None;
        }
        if let Some(expression) = overrides.min_free_expr {
            rotation.min_free_expr = Some(expression);
            rotation.min_free_bytes = None;
        }
        if let Some(max) = overrides.max_removals {
            rotation.max_removals = max;
        }
        if let Some(min) = overrides.min_path_length {
            rotation.min_path_length = min;
        }
        if overrides.log_directory_contents {
            rotation.log_directory_contents = true;
        }
        if overrides.json {
            self.output.json = true;
        }
        self.validate()
    }

    fn validate(&self) -> Result<()> {
        if let Some(path) = &self.rotation.path
            && path.as_os_str().is_empty()
        {
            return Err(RotateError::InvalidConfig {
                details: "rotation.path must not be empty".to_string(),
            });
        }

        if let Some(expression) = &self.rotation.min_free_expr
            && expression.trim().is_empty()
        {
            return Err(RotateError::InvalidConfig {
                details: "rotation.min_free_expr must not be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Produce the engine's immutable input, or name what is missing.
    pub fn resolve(&self) -> Result<RotationConfig> {
        let rotation = &self.rotation;

        let mut missing = Vec::new();
        if rotation.path.is_none() {
            missing.push("path");
        }
        if rotation.min_free_bytes.is_none() && rotation.min_free_expr.is_none() {
            missing.push("min_free_bytes");
        }
        let Some(target_dir) = rotation.path.clone() else {
            return Err(RotateError::MissingParameters { names: missing });
        };
        if !missing.is_empty() {
            return Err(RotateError::MissingParameters { names: missing });
        }

        let min_free_bytes = match (&rotation.min_free_expr, rotation.min_free_bytes) {
            (Some(expression), _) => expr::eval_byte_threshold(expression)?,
            (None, Some(bytes)) => bytes,
            (None, None) => return Err(RotateError::MissingParameters { names: missing }),
        };

        Ok(RotationConfig {
            target_dir,
            min_free_bytes,
            max_removals: rotation.max_removals,
            min_path_length: rotation.min_path_length,
            log_directory_contents: rotation.log_directory_contents,
        })
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env_u64(name: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|error| RotateError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })
}

fn parse_env_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(RotateError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: expected a boolean"),
        }),
    }
}
