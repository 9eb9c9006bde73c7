//! Rotation engine: keeps a backup directory's volume above a free-space
//! threshold by removing the oldest-named entries.
//!
//! Pipeline: check directory -> measure free space -> (enough? stop) ->
//! list "before" -> loop { re-measure -> remove lexicographically first entry }
//! bounded by `max_removals` -> list "after" -> measure again.
//!
//! Guards:
//! 1. A missing target directory halts before any space measurement.
//! 2. A joined deletion path shorter than `min_path_length` halts the whole
//!    run; nothing is deleted in that step or after it.
//! 3. An empty directory ends the run successfully.
//! 4. Entries that are neither files, directories nor symlinks to either are
//!    logged and left in place.
//!
//! Every terminal condition travels back to [`RotationEngine::execute`] as a
//! [`Halt`], which is the only place a run ends.

#![allow(missing_docs)]

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::config::RotationConfig;
use crate::core::errors::RotateError;
use crate::core::status::ExitStatus;
use crate::logger::trace::{EntryKind, ListingLabel, LogTrace, TraceEvent};
use crate::platform::pal::Platform;

// ──────────────────── control flow ────────────────────

/// Terminal condition raised inside a run and carried up to `execute`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Halt {
    pub status: ExitStatus,
}

impl Halt {
    #[must_use]
    pub const fn new(status: ExitStatus) -> Self {
        Self { status }
    }
}

/// Result of one engine step.
pub type Step<T> = std::result::Result<T, Halt>;

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub status: ExitStatus,
    pub trace: LogTrace,
    /// Set once rotation was attempted; forces the log to be printed.
    pub must_print: bool,
    /// Paths removed, in removal order.
    pub removed: Vec<PathBuf>,
}

impl RunOutcome {
    /// Whether the log belongs on stdout: an action was taken or the run failed.
    #[must_use]
    pub fn should_print(&self) -> bool {
        self.must_print || !self.status.is_ok()
    }
}

// ──────────────────── engine ────────────────────

/// Single-run rotation state machine.
pub struct RotationEngine {
    config: RotationConfig,
    platform: Arc<dyn Platform>,
    trace: LogTrace,
    must_print: bool,
    removed: Vec<PathBuf>,
}

impl RotationEngine {
    #[must_use]
    pub fn new(config: RotationConfig, platform: Arc<dyn Platform>) -> Self {
        Self {
            config,
            platform,
            trace: LogTrace::new(),
            must_print: false,
            removed: Vec::new(),
        }
    }

    #[must_use]
    pub fn trace(&self) -> &LogTrace {
        &self.trace
    }

    #[must_use]
    pub fn removed(&self) -> &[PathBuf] {
        &self.removed
    }

    /// Run to completion and report the terminal status.
    pub fn execute(mut self) -> RunOutcome {
        self.trace.push(TraceEvent::Begin);
        let status = match self.run() {
            Ok(()) => ExitStatus::Ok,
            Err(halt) => halt.status,
        };
        self.trace.push(TraceEvent::End { status });

        RunOutcome {
            status,
            trace: self.trace,
            must_print: self.must_print,
            removed: self.removed,
        }
    }

    fn run(&mut self) -> Step<()> {
        self.check_directory_exists()?;

        let available = self.measure_free_bytes()?;
        if available >= self.config.min_free_bytes {
            self.trace.push(TraceEvent::NoActionNeeded {
                available_bytes: available,
                min_free_bytes: self.config.min_free_bytes,
            });
            return Ok(());
        }

        self.trace.push(TraceEvent::RotationNeeded {
            available_bytes: available,
            min_free_bytes: self.config.min_free_bytes,
        });
        self.must_print = true;
        self.rotate()?;
        self.measure_free_bytes()?;
        Ok(())
    }

    /// Halts with `DirectoryNotFound` unless the target is an existing directory.
    pub fn check_directory_exists(&mut self) -> Step<()> {
        let target = self.config.target_dir.clone();
        let is_dir = match target.try_exists() {
            Ok(true) => target.is_dir(),
            Ok(false) => false,
            Err(source) => return Err(self.fail(RotateError::io(&target, source))),
        };
        if is_dir {
            return Ok(());
        }
        self.trace.push(TraceEvent::DirectoryNotFound {
            path: display(&target),
        });
        Err(Halt::new(ExitStatus::DirectoryNotFound))
    }

    /// Bytes available to unprivileged users on the target's volume.
    pub fn measure_free_bytes(&mut self) -> Step<u64> {
        let measured = self.platform.fs_stats(&self.config.target_dir);
        let stats = match measured {
            Ok(stats) => stats,
            Err(err) => return Err(self.fail(err)),
        };
        self.trace.push(TraceEvent::FreeSpace {
            path: display(&self.config.target_dir),
            available_bytes: stats.available_bytes,
        });
        Ok(stats.available_bytes)
    }

    /// Snapshot of the target's entry names, sorted; logged when enabled.
    pub fn list_directory(&mut self, label: ListingLabel) -> Step<Vec<OsString>> {
        let entries = self.read_entries()?;
        if self.config.log_directory_contents {
            self.trace.push(TraceEvent::Listing {
                label,
                path: display(&self.config.target_dir),
                entries: entries
                    .iter()
                    .map(|name| name.to_string_lossy().into_owned())
                    .collect(),
            });
        }
        Ok(entries)
    }

    /// Remove the lexicographically first entry of the target directory.
    pub fn remove_oldest_entry(&mut self) -> Step<()> {
        let entries = self.read_entries()?;
        let Some(oldest) = entries.first() else {
            self.trace.push(TraceEvent::DirectoryEmpty {
                path: display(&self.config.target_dir),
            });
            return Err(Halt::new(ExitStatus::Ok));
        };

        let target = self.config.target_dir.join(oldest);
        let length = path_length(&target);
        if length < self.config.min_path_length {
            self.trace.push(TraceEvent::PathTooShort {
                path: display(&target),
                length,
                min_length: self.config.min_path_length,
            });
            return Err(Halt::new(ExitStatus::PathTooShort));
        }

        let kind = match classify(&target) {
            Ok(kind) => kind,
            Err(source) => return Err(self.fail(RotateError::io(&target, source))),
        };
        let Some(kind) = kind else {
            self.trace.push(TraceEvent::Unrecognized {
                path: display(&target),
            });
            return Ok(());
        };

        self.trace.push(TraceEvent::Removing {
            path: display(&target),
            kind,
        });
        let removal = match kind {
            EntryKind::Directory => fs::remove_dir_all(&target),
            EntryKind::File | EntryKind::Symlink => fs::remove_file(&target),
        };
        if let Err(source) = removal {
            return Err(self.fail(RotateError::io(&target, source)));
        }
        self.removed.push(target);
        Ok(())
    }

    /// Remove oldest entries until the threshold is met or the cap is spent.
    pub fn rotate(&mut self) -> Step<()> {
        self.list_directory(ListingLabel::Before)?;
        for _ in 0..self.config.max_removals {
            if self.measure_free_bytes()? >= self.config.min_free_bytes {
                break;
            }
            self.remove_oldest_entry()?;
        }
        self.list_directory(ListingLabel::After)?;
        Ok(())
    }

    fn read_entries(&mut self) -> Step<Vec<OsString>> {
        match read_sorted_names(&self.config.target_dir) {
            Ok(names) => Ok(names),
            Err(source) => {
                let err = RotateError::io(&self.config.target_dir, source);
                Err(self.fail(err))
            }
        }
    }

    fn fail(&mut self, err: RotateError) -> Halt {
        self.trace.push(TraceEvent::Failure {
            code: err.code().to_string(),
            message: err.to_string(),
        });
        Halt::new(ExitStatus::FilesystemFailure)
    }
}

// ──────────────────── filesystem helpers ────────────────────

/// Length of a path in characters, as compared against `min_path_length`.
#[must_use]
pub fn path_length(path: &Path) -> usize {
    path.to_string_lossy().chars().count()
}

/// Immediate child names of `dir`, in ascending byte order.
///
/// Byte order equals code-point order for UTF-8 names, so names that start
/// with a sortable timestamp come out oldest first.
pub fn read_sorted_names(dir: &Path) -> std::io::Result<Vec<OsString>> {
    let mut names = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.file_name()))
        .collect::<std::io::Result<Vec<_>>>()?;
    names.sort();
    Ok(names)
}

/// Decide how an entry can be removed; `None` means it should be left alone.
fn classify(path: &Path) -> std::io::Result<Option<EntryKind>> {
    let file_type = fs::symlink_metadata(path)?.file_type();
    if file_type.is_symlink() {
        // Dangling links, loops and links to special files are not ours to judge.
        return Ok(fs::metadata(path)
            .ok()
            .filter(|target| target.is_file() || target.is_dir())
            .map(|_| EntryKind::Symlink));
    }
    if file_type.is_dir() {
        Ok(Some(EntryKind::Directory))
    } else if file_type.is_file() {
        Ok(Some(EntryKind::File))
    } else {
        Ok(None)
    }
}

fn display(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

// ──────────────────── tests ────────────────────
