//! PS/2 device management module
//!
//! This module provides the PS/2 link to a mouse-class device and the
//! Synaptics touchpad driver running over it.
//!
//! - [`frame`] encodes and checks the 11-bit wire frame
//! - [`hal`] is what the platform has to provide
//! - [`controller`] runs the link in both directions
//! - [`packet`] and [`touchpad`] decode reports and drive the device modes

pub mod controller;
pub mod frame;
pub mod hal;
pub mod packet;
pub mod touchpad;

pub use controller::{LinkConfig, LinkStats, Ps2Capture, Ps2Link, Ps2Receiver, Ps2Transport};
pub use packet::{AbsolutePositionReport, Contact, MovementFlags, MovementReport};
pub use touchpad::{
    DeviceMode, Report, SampleRate, SynapticsMode, Touchpad, TouchpadError, TouchpadResult,
};
