//! Platform seams for the PS/2 link
//!
//! The link needs three things from the platform: a serial-capture peripheral
//! that samples one 11-bit frame per arm, two open-drain lines it can drive low
//! or release to their pull-ups, and a free-running millisecond counter.

use core::fmt;
use embedded_hal::digital::{InputPin, OutputPin};

/// Reasons a capture peripheral refuses to arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureError {
    /// A capture is already in flight
    Busy,
    /// The peripheral reported a hardware fault
    Fault,
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy => write!(f, "capture peripheral busy"),
            Self::Fault => write!(f, "capture peripheral fault"),
        }
    }
}

/// Serial-capture hardware clocked by the device, e.g. an SPI block in
/// receive-only slave mode with an 11-bit word.
///
/// Completed frames are handed to
/// [`Ps2Receiver::on_capture_complete`](super::controller::Ps2Receiver::on_capture_complete)
/// and failures to
/// [`Ps2Receiver::on_capture_error`](super::controller::Ps2Receiver::on_capture_error)
/// by the platform's interrupt handler. All methods take `&self` because both
/// the foreground and the interrupt handler arm the peripheral.
pub trait CapturePeripheral {
    /// Starts capturing the next frame.
    fn arm(&self) -> Result<(), CaptureError>;

    /// Aborts any capture in flight and hands both lines over to manual drive.
    ///
    /// The peripheral must not count clock edges until [`Self::restart`].
    fn shutdown(&self);

    /// Reconfigures the peripheral for reception after [`Self::shutdown`].
    fn restart(&self);
}

impl<C: CapturePeripheral + ?Sized> CapturePeripheral for &C {
    fn arm(&self) -> Result<(), CaptureError> {
        (**self).arm()
    }

    fn shutdown(&self) {
        (**self).shutdown()
    }

    fn restart(&self) {
        (**self).restart()
    }
}

/// One open-drain PS/2 line.
///
/// Only the pull-up may bring a line high; the host either drives it low or
/// lets go of it.
pub trait OpenDrainLine {
    fn drive_low(&mut self);

    /// Stops driving the line so the pull-up (or the device) sets the level.
    fn release(&mut self);

    fn is_high(&mut self) -> bool;

    fn set_level(&mut self, high: bool) {
        if high {
            self.release()
        } else {
            self.drive_low()
        }
    }
}

/// Any open-drain GPIO configured as output with input readback works as a
/// line: setting it high releases it.
impl<P: InputPin + OutputPin> OpenDrainLine for P {
    fn drive_low(&mut self) {
        let _ = self.set_low();
    }

    fn release(&mut self) {
        let _ = self.set_high();
    }

    fn is_high(&mut self) -> bool {
        // An unreadable line is treated as idle.
        InputPin::is_high(self).unwrap_or(true)
    }
}

/// Free-running millisecond counter. Wraps around.
pub trait TickSource {
    fn now_ms(&self) -> u32;
}

impl<T: TickSource + ?Sized> TickSource for &T {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}

/// A timeout computed once and checked against a [`TickSource`].
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    start: u32,
    timeout_ms: u32,
}

impl Deadline {
    pub fn after(ticks: &impl TickSource, timeout_ms: u32) -> Self {
        Self {
            start: ticks.now_ms(),
            timeout_ms,
        }
    }

    pub fn expired(&self, ticks: &impl TickSource) -> bool {
        ticks.now_ms().wrapping_sub(self.start) >= self.timeout_ms
    }
}

/// Busy-waits for `ms` milliseconds.
pub fn delay_ms(ticks: &impl TickSource, ms: u32) {
    let deadline = Deadline::after(ticks, ms);
    while !deadline.expired(ticks) {
        core::hint::spin_loop();
    }
}
