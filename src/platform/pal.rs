//! PAL trait and platform-specific implementations.

#![allow(missing_docs)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, RotateError};

/// Filesystem statistics for the volume holding a path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FsStats {
    /// Bytes usable without elevated privilege (excludes root-reserved blocks).
    pub available_bytes: u64,
}

/// OS abstraction used by the rotation engine.
pub trait Platform: Send + Sync {
    fn fs_stats(&self, path: &Path) -> Result<FsStats>;
}

/// Unix implementation backed by `statvfs`.
#[cfg(unix)]
#[derive(Debug, Default)]
pub struct StatvfsPlatform;

#[cfg(unix)]
impl StatvfsPlatform {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[cfg(unix)]
impl Platform for StatvfsPlatform {
    #[allow(clippy::useless_conversion)]
    fn fs_stats(&self, path: &Path) -> Result<FsStats> {
        let stat = nix::sys::statvfs::statvfs(path).map_err(|error| RotateError::FsStats {
            path: path.to_path_buf(),
            details: error.to_string(),
        })?;
        let fragment = u64::from(stat.fragment_size());
        Ok(FsStats {
            available_bytes: u64::from(stat.blocks_available()).saturating_mul(fragment),
        })
    }
}

/// Scripted implementation for deterministic tests.
///
/// Each `fs_stats` call consumes the next queued availability reading; the
/// last reading repeats once the queue is down to one entry.
#[derive(Debug)]
pub struct MockPlatform {
    readings: Mutex<VecDeque<u64>>,
    queried: Mutex<Vec<PathBuf>>,
}

impl MockPlatform {
    #[must_use]
    pub fn new(readings: impl IntoIterator<Item = u64>) -> Self {
        Self {
            readings: Mutex::new(readings.into_iter().collect()),
            queried: Mutex::new(Vec::new()),
        }
    }

    /// A volume whose available space never changes.
    #[must_use]
    pub fn constant(available_bytes: u64) -> Self {
        Self::new([available_bytes])
    }

    /// Paths passed to `fs_stats`, in call order.
    #[must_use]
    pub fn queried_paths(&self) -> Vec<PathBuf> {
        self.queried.lock().clone()
    }

    /// Number of `fs_stats` calls so far.
    #[must_use]
    pub fn query_count(&self) -> usize {
        self.queried.lock().len()
    }
}

impl Platform for MockPlatform {
    fn fs_stats(&self, path: &Path) -> Result<FsStats> {
        self.queried.lock().push(path.to_path_buf());
        let available_bytes = {
            let mut readings = self.readings.lock();
            if readings.len() > 1 {
                readings.pop_front()
            } else {
                readings.front().copied()
            }
        }
        .ok_or_else(|| RotateError::FsStats {
            path: path.to_path_buf(),
            details: "mock has no scripted readings".to_string(),
        })?;

        Ok(FsStats { available_bytes })
    }
}

/// Detect active platform implementation.
pub fn detect_platform() -> Result<Arc<dyn Platform>> {
    #[cfg(unix)]
    {
        Ok(Arc::new(StatvfsPlatform::new()))
    }
    #[cfg(not(unix))]
    {
        Err(RotateError::UnsupportedPlatform {
            details: "free-space queries are only implemented for unix targets".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{MockPlatform, Platform};
    use std::path::Path;

    #[test]
    fn mock_consumes_readings_then_repeats_last() {
        let platform = MockPlatform::new([10, 20, 30]);
        let path = Path::new("/backups");
        let seen: Vec<u64> = (0..5)
            .map(|_| platform.fs_stats(path).unwrap().available_bytes)
            .collect();
        assert_eq!(seen, vec![10, 20, 30, 30, 30]);
        assert_eq!(platform.query_count(), 5);
        assert!(platform.queried_paths().iter().all(|p| p == path));
    }

    #[test]
    fn mock_without_readings_fails() {
        let platform = MockPlatform::new(Vec::new());
        let err = platform.fs_stats(Path::new("/x")).expect_err("no readings");
        assert_eq!(err.code(), "ARC-2001");
    }

    #[test]
    #[cfg(unix)]
    fn statvfs_reports_temp_volume() {
        let dir = tempfile::tempdir().unwrap();
        let stats = super::StatvfsPlatform::new()
            .fs_stats(dir.path())
            .expect("statvfs on a temp dir should work");
        let raw = nix::sys::statvfs::statvfs(dir.path()).unwrap();
        #[allow(clippy::useless_conversion)]
        let total_bytes = u64::from(raw.blocks()).saturating_mul(u64::from(raw.fragment_size()));
        assert!(stats.available_bytes <= total_bytes);
    }

    #[test]
    #[cfg(unix)]
    fn statvfs_fails_for_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = super::StatvfsPlatform::new()
            .fs_stats(&dir.path().join("missing"))
            .expect_err("missing path");
        assert_eq!(err.code(), "ARC-2001");
    }
}
