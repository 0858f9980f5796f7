//! Device drivers.

pub mod ps2_dev;
