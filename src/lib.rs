//! PS/2 touchpad driver.
//!
//! A PS/2 link built from a serial-capture peripheral for reception and two
//! bit-banged open-drain lines for transmission, plus a Synaptics touchpad
//! driver that switches between relative movement and absolute position
//! reporting.
//!
//! Wiring it up on a target looks roughly like this:
//!
//! ```ignore
//! static RING: RxBuffer<RX_BUFFER_SIZE> = RxBuffer::new();
//! static CAPTURE: Ps2Capture<Spi2Capture> = Ps2Capture::new(Spi2Capture);
//!
//! let (producer, consumer) = RING.split().unwrap();
//! // The receiver goes to the capture interrupt handler.
//! let receiver = Ps2Receiver::new(&CAPTURE, producer);
//! let link = Ps2Link::new(&CAPTURE, consumer, clock, data, ticks, LinkConfig::default());
//!
//! let mut pad = Touchpad::new(link);
//! pad.set_mode(DeviceMode::Absolute)?;
//! loop {
//!     match pad.read_absolute() {
//!         Ok(report) => handle(report),
//!         Err(e) if e.is_transient() => continue,
//!         Err(e) => return Err(e),
//!     }
//! }
//! ```

#![cfg_attr(not(test), no_std)]
#![cfg_attr(feature = "strict", deny(warnings))]

pub mod constants;
pub mod devices;
pub mod ipc;

#[cfg(test)]
mod testing;

pub use constants::ps2::RX_BUFFER_SIZE;
pub use devices::ps2_dev::{
    controller::{LinkConfig, LinkStats, Ps2Capture, Ps2Link, Ps2Receiver, Ps2Transport},
    hal::{CaptureError, CapturePeripheral, OpenDrainLine, TickSource},
    packet::{AbsolutePositionReport, Contact, MovementReport},
    touchpad::{DeviceMode, Report, SampleRate, Touchpad, TouchpadError, TouchpadResult},
};
pub use ipc::spsc::RxBuffer;
