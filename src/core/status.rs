//! Process exit statuses with a stable numeric contract.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Terminal status of one invocation.
///
/// Numeric codes are stable: schedulers and wrapper scripts match on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitStatus {
    /// Nothing to do, rotation finished, or the directory ran out of entries.
    Ok,
    /// Target directory or threshold was not supplied.
    LackOfRequiredParameters,
    /// A supplied parameter, config file or expression was rejected.
    InvalidParameters,
    /// A deletion target's path was shorter than the configured floor.
    PathTooShort,
    /// The target directory does not exist.
    DirectoryNotFound,
    /// A stat, listing or removal failed.
    FilesystemFailure,
}

impl ExitStatus {
    /// Every status, in code order.
    pub const ALL: [Self; 6] = [
        Self::Ok,
        Self::LackOfRequiredParameters,
        Self::InvalidParameters,
        Self::PathTooShort,
        Self::DirectoryNotFound,
        Self::FilesystemFailure,
    ];

    /// Process exit code.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Ok => 0,
            Self::LackOfRequiredParameters => 1,
            Self::InvalidParameters => 2,
            Self::PathTooShort => 10,
            Self::DirectoryNotFound => 11,
            Self::FilesystemFailure => 12,
        }
    }

    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Short snake_case label used in logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::LackOfRequiredParameters => "lack_of_required_parameters",
            Self::InvalidParameters => "invalid_parameters",
            Self::PathTooShort => "path_too_short",
            Self::DirectoryNotFound => "directory_not_found",
            Self::FilesystemFailure => "filesystem_failure",
        }
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.label())
    }
}
