//! Foundation utilities shared across the core

pub mod logging;
pub mod math;
