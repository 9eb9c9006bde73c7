//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use archive_rotate::prelude::*;
//! ```

// Core
pub use crate::core::config::{Config, Overrides, RotationConfig};
pub use crate::core::errors::{Result, RotateError};
pub use crate::core::expr::eval_byte_threshold;
pub use crate::core::status::ExitStatus;

// Logging
pub use crate::logger::trace::{LogTrace, RenderFormat, TraceEvent};

// Platform
pub use crate::platform::pal::{FsStats, MockPlatform, Platform, detect_platform};

// Rotation
pub use crate::rotation::engine::{RotationEngine, RunOutcome};
