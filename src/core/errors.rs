//! ARC-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, RotateError>;

/// Top-level error type for archive rotation.
#[derive(Debug, Error)]
pub enum RotateError {
    #[error("[ARC-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[ARC-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[ARC-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[ARC-1004] lack of required parameter(s): {}", .names.join(", "))]
    MissingParameters { names: Vec<&'static str> },

    #[error("[ARC-1005] invalid threshold expression {expression:?}: {details}")]
    InvalidExpression { expression: String, details: String },

    #[error("[ARC-1101] unsupported platform: {details}")]
    UnsupportedPlatform { details: String },

    #[error("[ARC-2001] filesystem stats failure for {path}: {details}")]
    FsStats { path: PathBuf, details: String },

    #[error("[ARC-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[ARC-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RotateError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "ARC-1001",
            Self::MissingConfig { .. } => "ARC-1002",
            Self::ConfigParse { .. } => "ARC-1003",
            Self::MissingParameters { .. } => "ARC-1004",
            Self::InvalidExpression { .. } => "ARC-1005",
            Self::UnsupportedPlatform { .. } => "ARC-1101",
            Self::FsStats { .. } => "ARC-2001",
            Self::Serialization { .. } => "ARC-2101",
            Self::Io { .. } => "ARC-3002",
        }
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for RotateError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for RotateError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
