//! Run logging: structured trace entries rendered once at termination.

pub mod trace;
