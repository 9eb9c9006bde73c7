//! Run trace: structured, timestamped entries accumulated during one rotation
//! run and rendered once at termination.
//!
//! The engine only appends [`TraceEvent`] values; turning them into text is
//! left to [`LogTrace::render`], so tests assert on events rather than wording.

#![allow(missing_docs)]

use std::fmt::Write as _;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::core::errors::Result;
use crate::core::status::ExitStatus;

/// Tag attached to a directory listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingLabel {
    Before,
    After,
}

impl ListingLabel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::After => "after",
        }
    }
}

/// What kind of entry a removal targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    File,
    Directory,
    /// The link itself is removed; its target is never touched.
    Symlink,
}

impl EntryKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Directory => "directory",
            Self::Symlink => "symlink",
        }
    }
}

/// Events the rotation engine records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    Begin,
    DirectoryNotFound {
        path: String,
    },
    FreeSpace {
        path: String,
        available_bytes: u64,
    },
    NoActionNeeded {
        available_bytes: u64,
        min_free_bytes: u64,
    },
    RotationNeeded {
        available_bytes: u64,
        min_free_bytes: u64,
    },
    Listing {
        label: ListingLabel,
        path: String,
        entries: Vec<String>,
    },
    Removing {
        path: String,
        kind: EntryKind,
    },
    Unrecognized {
        path: String,
    },
    PathTooShort {
        path: String,
        length: usize,
        min_length: usize,
    },
    DirectoryEmpty {
        path: String,
    },
    Failure {
        code: String,
        message: String,
    },
    End {
        status: ExitStatus,
    },
}

impl TraceEvent {
    /// Human-readable message, without timestamp.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Begin => "begin".to_string(),
            Self::DirectoryNotFound { path } => format!("directory: {path} not found"),
            Self::FreeSpace {
                path,
                available_bytes,
            } => format!(
                "drive: {path}, bytes free: {available_bytes} ({})",
                format_bytes(*available_bytes)
            ),
            Self::NoActionNeeded { .. } => "no action needed".to_string(),
            Self::RotationNeeded {
                available_bytes,
                min_free_bytes,
            } => format!(
                "not enough disk space ({available_bytes} < {min_free_bytes} bytes), rotate needed"
            ),
            Self::Listing {
                label,
                path,
                entries,
            } => format!(
                "[{}] directory: {path}, content: [{}]",
                label.as_str(),
                entries.join(", ")
            ),
            Self::Removing { path, kind } => format!("removing {}: {path}", kind.as_str()),
            Self::Unrecognized { path } => {
                format!("not recognized as file or directory, left untouched: {path}")
            }
            Self::PathTooShort {
                path,
                length,
                min_length,
            } => format!(
                "path too short: {path} ({length} < {min_length} characters), operation aborted"
            ),
            Self::DirectoryEmpty { path } => {
                format!("no more files in directory: {path}, exiting")
            }
            Self::Failure { code, message } => format!("[{code}] {message}"),
            Self::End { status } => format!("end, with status: {status}"),
        }
    }
}

/// One timestamped trace entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceEntry {
    pub at: DateTime<Local>,
    #[serde(flatten)]
    pub event: TraceEvent,
}

/// Output format for [`LogTrace::render`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderFormat {
    #[default]
    Human,
    JsonLines,
}

/// Ordered, append-only log of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogTrace {
    entries: Vec<TraceEntry>,
}

impl LogTrace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event stamped with the current local time.
    pub fn push(&mut self, event: TraceEvent) {
        self.entries.push(TraceEntry {
            at: Local::now(),
            event,
        });
    }

    #[must_use]
    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    /// Events without timestamps, in order.
    pub fn events(&self) -> impl DoubleEndedIterator<Item = &TraceEvent> {
        self.entries.iter().map(|entry| &entry.event)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render every entry, one per line, newline-terminated.
    pub fn render(&self, format: RenderFormat) -> Result<String> {
        let mut out = String::new();
        for entry in &self.entries {
            match format {
                RenderFormat::Human => {
                    let _ = writeln!(
                        out,
                        "{} {}",
                        entry.at.format("%Y-%m-%d %H:%M:%S%.6f"),
                        entry.event.message()
                    );
                }
                RenderFormat::JsonLines => {
                    out.push_str(&serde_json::to_string(entry)?);
                    out.push('\n');
                }
            }
        }
        Ok(out)
    }
}

/// Format a byte count with binary units, one decimal place.
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * KIB;
    const GIB: u64 = 1024 * MIB;
    const TIB: u64 = 1024 * GIB;

    #[allow(clippy::cast_precision_loss)]
    let scaled = |unit: u64| bytes as f64 / unit as f64;

    if bytes >= TIB {
        format!("{:.1} TiB", scaled(TIB))
    } else if bytes >= GIB {
        format!("{:.1} GiB", scaled(GIB))
    } else if bytes >= MIB {
        format!("{:.1} MiB", scaled(MIB))
    } else if bytes >= KIB {
        format!("{:.1} KiB", scaled(KIB))
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_trace() -> LogTrace {
        let mut trace = LogTrace::new();
        trace.push(TraceEvent::Begin);
        trace.push(TraceEvent::FreeSpace {
            path: "/backups".to_string(),
            available_bytes: 2048,
        });
        trace.push(TraceEvent::Listing {
            label: ListingLabel::Before,
            path: "/backups".to_string(),
            entries: vec!["a.tar".to_string(), "b.tar".to_string()],
        });
        trace.push(TraceEvent::End {
            status: ExitStatus::Ok,
        });
        trace
    }

    #[test]
    fn push_keeps_chronological_order() {
        let trace = sample_trace();
        assert_eq!(trace.len(), 4);
        assert!(
            trace
                .entries()
                .windows(2)
                .all(|pair| pair[0].at <= pair[1].at)
        );
        assert_eq!(trace.events().next(), Some(&TraceEvent::Begin));
    }

    #[test]
    fn events_walk_backwards_from_the_end() {
        let trace = sample_trace();
        assert_eq!(
            trace.events().next_back(),
            Some(&TraceEvent::End {
                status: ExitStatus::Ok
            })
        );
        let tail: Vec<&TraceEvent> = trace.events().rev().take(2).collect();
        assert!(matches!(tail[1], TraceEvent::Listing { .. }));
    }

    #[test]
    fn human_render_has_one_line_per_entry() {
        let text = sample_trace().render(RenderFormat::Human).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].ends_with(" begin"), "got: {}", lines[0]);
        assert!(lines[1].contains("bytes free: 2048 (2.0 KiB)"), "got: {}", lines[1]);
        assert!(
            lines[2].contains("[before] directory: /backups, content: [a.tar, b.tar]"),
            "got: {}",
            lines[2]
        );
        assert!(lines[3].contains("with status: 0 (ok)"), "got: {}", lines[3]);
    }

    #[test]
    fn json_render_is_tagged_per_line() {
        let text = sample_trace().render(RenderFormat::JsonLines).unwrap();
        let values: Vec<serde_json::Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).expect("each line is JSON"))
            .collect();
        assert_eq!(values.len(), 4);
        assert_eq!(values[0]["event"], "begin");
        assert!(values[0]["at"].is_string());
        assert_eq!(values[1]["available_bytes"], 2048);
        assert_eq!(values[2]["label"], "before");
        assert_eq!(values[3]["status"], "ok");
    }

    #[test]
    fn empty_trace_renders_nothing() {
        assert!(LogTrace::new().render(RenderFormat::Human).unwrap().is_empty());
    }

    #[test]
    fn path_too_short_message_names_lengths() {
        let msg = TraceEvent::PathTooShort {
            path: "a".to_string(),
            length: 1,
            min_length: 2,
        }
        .message();
        assert!(msg.contains("path too short: a (1 < 2"), "got: {msg}");
    }

    #[test]
    fn format_bytes_picks_unit() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1536), "1.5 KiB");
        assert_eq!(format_bytes(30 * 1024 * 1024 * 1024), "30.0 GiB");
        assert_eq!(format_bytes(2 * 1024 * 1024 * 1024 * 1024), "2.0 TiB");
    }
}
