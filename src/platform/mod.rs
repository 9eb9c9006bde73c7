//! Platform abstraction layer: filesystem statistics.

pub mod pal;
