#![forbid(unsafe_code)]

//! archive-rotate: keeps a backup volume above a free-space threshold.
//!
//! Meant to run from cron or a systemd timer next to a job that writes
//! timestamp-named archives into one directory. Each run:
//! 1. **Checks** that the target directory exists
//! 2. **Measures** space available to unprivileged users on its volume
//! 3. **Rotates** away the lexicographically first entries until the
//!    threshold is met or the removal cap is spent, refusing any path shorter
//!    than a configured floor
//!
//! # Library usage
//!
//! ```rust,no_run
//! use archive_rotate::prelude::*;
//!
//! let config = RotationConfig::new("/srv/backups", 30 * 1_000_000_000);
//! let platform = detect_platform().expect("unix platform");
//! let outcome = RotationEngine::new(config, platform).execute();
//! if outcome.should_print() {
//!     print!("{}", outcome.trace.render(RenderFormat::Human).unwrap());
//! }
//! std::process::exit(i32::from(outcome.status.code()));
//! ```

pub mod prelude;

pub mod core;
pub mod logger;
pub mod platform;
pub mod rotation;
