//! Driver-wide constants.

pub mod ps2;
