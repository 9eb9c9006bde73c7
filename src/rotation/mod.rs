//! Rotation decision engine: free-space check, oldest-first removal, guards.

pub mod engine;
