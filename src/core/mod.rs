//! Core types: errors, configuration, threshold expressions, exit statuses.

pub mod config;
pub mod errors;
pub mod expr;
pub mod status;
