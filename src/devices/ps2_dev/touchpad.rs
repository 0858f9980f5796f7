//! PS/2 touchpad management
//!
//! Drives the device through its modes and turns queued bytes into reports.
//! Every command is a send-then-ACK round trip; one missing ACK aborts the
//! whole operation and nothing is retried here.
//!
//! ```text
//! Uninitialized --initialize--> Movement --unlock sequence--> Absolute
//!                                   ^                            |
//!                                   +-------- initialize --------+
//! ```

use super::{
    controller::Ps2Transport,
    packet::{
        is_absolute_header, is_absolute_trailer, AbsolutePositionReport, MovementFlags,
        MovementReport, ABSOLUTE_PACKET_LEN, MOVEMENT_PACKET_LEN,
    },
};
use crate::constants::ps2::{
    CMD_ENABLE_REPORTING, CMD_RESET, CMD_SET_RESOLUTION, CMD_SET_SAMPLE_RATE,
    COMMAND_SPACING_MS, SYNAPTICS_SET_MODE_RATE,
};
use bitflags::bitflags;
use core::fmt;

/// Touchpad error types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchpadError {
    /// Not enough bytes queued for a whole packet yet
    NoData,
    /// Packet sync bits were wrong, usually line noise
    CorruptPacket,
    /// Read or mode request that does not fit the current mode
    WrongMode,
    /// Device did not acknowledge a command
    SetModeFailed,
}

/// Result type for touchpad operations
pub type TouchpadResult<T> = core::result::Result<T, TouchpadError>;

impl TouchpadError {
    /// Errors that happen routinely and only mean "poll again later".
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::NoData | Self::CorruptPacket)
    }
}

impl fmt::Display for TouchpadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoData => write!(f, "No touchpad data to read"),
            Self::CorruptPacket => write!(f, "Corrupt touchpad packet"),
            Self::WrongMode => write!(f, "Touchpad is in the wrong mode"),
            Self::SetModeFailed => write!(f, "Touchpad did not acknowledge command"),
        }
    }
}

/// Reporting mode of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceMode {
    /// [`Touchpad::initialize`] has not succeeded yet
    #[default]
    Uninitialized,
    /// Relative movement, 3-byte packets
    Movement,
    /// Synaptics absolute position, 6-byte packets
    Absolute,
}

/// Report rates accepted by the set-sample-rate command.
///
/// Not every device honours the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SampleRate {
    Hz10 = 10,
    Hz20 = 20,
    Hz40 = 40,
    Hz60 = 60,
    Hz80 = 80,
    Hz100 = 100,
    Hz200 = 200,
}

impl SampleRate {
    pub const fn per_second(self) -> u8 {
        self as u8
    }
}

bitflags! {
    /// Synaptics mode byte.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SynapticsMode: u8 {
        /// Report absolute position packets
        const ABSOLUTE = 1 << 7;
        /// 80 packets per second instead of 40
        const HIGH_RATE = 1 << 6;
        const SLEEP = 1 << 3;
        const DISABLE_GESTURES = 1 << 2;
        const PACKET_SIZE = 1 << 1;
        /// Report finger width in absolute packets
        const W_MODE = 1 << 0;
    }
}

/// Length of the command sequence that writes the mode byte.
pub const MODE_SEQUENCE_LEN: usize = 10;

impl SynapticsMode {
    /// Command bytes that write this mode byte to the device.
    ///
    /// The byte is smuggled through four set-resolution commands, two bits
    /// each starting with the most significant pair, and latched by setting
    /// the sample rate to 20.
    pub fn command_sequence(self) -> [u8; MODE_SEQUENCE_LEN] {
        let mode = self.bits();
        let mut seq = [0; MODE_SEQUENCE_LEN];
        for (pair, shift) in [6, 4, 2, 0].into_iter().enumerate() {
            seq[pair * 2] = CMD_SET_RESOLUTION;
            seq[pair * 2 + 1] = (mode >> shift) & 0x03;
        }
        seq[8] = CMD_SET_SAMPLE_RATE;
        seq[9] = SYNAPTICS_SET_MODE_RATE;
        seq
    }
}

/// One decoded report, whichever mode produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Report {
    Movement(MovementReport),
    Absolute(AbsolutePositionReport),
}

/// Touchpad driver on top of a PS/2 link.
pub struct Touchpad<T> {
    link: T,
    mode: DeviceMode,
}

impl<T: Ps2Transport> Touchpad<T> {
    pub const fn new(link: T) -> Self {
        Self {
            link,
            mode: DeviceMode::Uninitialized,
        }
    }

    pub fn current_mode(&self) -> DeviceMode {
        self.mode
    }

    pub fn link(&self) -> &T {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut T {
        &mut self.link
    }

    pub fn into_link(self) -> T {
        self.link
    }

    /// Resets the device and turns on reporting in movement mode.
    pub fn initialize(&mut self) -> TouchpadResult<()> {
        self.command(CMD_RESET)?;
        self.command(CMD_ENABLE_REPORTING)?;
        self.mode = DeviceMode::Movement;
        log::debug!("Touchpad initialized in movement mode");
        Ok(())
    }

    /// Switches the device to `target`.
    ///
    /// Movement always goes through a fresh [`Self::initialize`]. Absolute
    /// initializes first only when the device has never been initialized,
    /// then writes the Synaptics mode byte. If that fails the mode stays
    /// whatever the initialization left it at.
    pub fn set_mode(&mut self, target: DeviceMode) -> TouchpadResult<()> {
        if target == DeviceMode::Uninitialized {
            return Err(TouchpadError::WrongMode);
        }

        if self.mode == DeviceMode::Uninitialized || target == DeviceMode::Movement {
            self.initialize()?;
        }

        if target == DeviceMode::Absolute {
            self.write_synaptics_mode(SynapticsMode::ABSOLUTE)?;
            self.mode = DeviceMode::Absolute;
            log::debug!("Touchpad switched to absolute mode");
        }

        Ok(())
    }

    fn write_synaptics_mode(&mut self, mode: SynapticsMode) -> TouchpadResult<()> {
        for byte in mode.command_sequence() {
            self.command(byte)?;
        }
        Ok(())
    }

    /// Asks the device for a different report rate. Leaves the mode alone.
    pub fn set_sample_rate(&mut self, rate: SampleRate) -> TouchpadResult<()> {
        self.link.delay_ms(COMMAND_SPACING_MS);
        self.command(CMD_SET_SAMPLE_RATE)?;
        self.command(rate.per_second())?;
        Ok(())
    }

    /// Decodes the next movement packet.
    ///
    /// A bad status byte is the only byte consumed, so a misaligned stream
    /// realigns over the next polls.
    pub fn read_movement(&mut self) -> TouchpadResult<MovementReport> {
        if self.mode != DeviceMode::Movement {
            return Err(TouchpadError::WrongMode);
        }
        self.require(MOVEMENT_PACKET_LEN)?;

        let status = MovementFlags::from_bits_retain(self.next_byte()?);
        if !status.is_status() {
            log::trace!("Dropping movement packet with status {:#04x}", status.bits());
            return Err(TouchpadError::CorruptPacket);
        }
        let x = self.next_byte()?;
        let y = self.next_byte()?;

        Ok(MovementReport::from_packet(status, x, y))
    }

    /// Decodes the next absolute position packet.
    ///
    /// Checks the header after the first byte and the trailer after the
    /// fourth, consuming only what was read when either check fails.
    pub fn read_absolute(&mut self) -> TouchpadResult<AbsolutePositionReport> {
        if self.mode != DeviceMode::Absolute {
            return Err(TouchpadError::WrongMode);
        }
        self.require(ABSOLUTE_PACKET_LEN)?;

        let mut packet = [0u8; ABSOLUTE_PACKET_LEN];
        packet[0] = self.next_byte()?;
        if !is_absolute_header(packet[0]) {
            log::trace!("Dropping absolute packet with header {:#04x}", packet[0]);
            return Err(TouchpadError::CorruptPacket);
        }
        for byte in &mut packet[1..4] {
            *byte = self.next_byte()?;
        }
        if !is_absolute_trailer(packet[3]) {
            log::trace!("Dropping absolute packet with trailer {:#04x}", packet[3]);
            return Err(TouchpadError::CorruptPacket);
        }
        for byte in &mut packet[4..] {
            *byte = self.next_byte()?;
        }

        Ok(AbsolutePositionReport::from_packet(&packet))
    }

    /// Reads one report in whatever mode the device is in.
    pub fn poll(&mut self) -> TouchpadResult<Report> {
        match self.mode {
            DeviceMode::Uninitialized => Err(TouchpadError::WrongMode),
            DeviceMode::Movement => self.read_movement().map(Report::Movement),
            DeviceMode::Absolute => self.read_absolute().map(Report::Absolute),
        }
    }

    fn command(&mut self, byte: u8) -> TouchpadResult<()> {
        if self.link.command(byte) {
            Ok(())
        } else {
            log::warn!("Touchpad did not acknowledge {byte:#04x}");
            Err(TouchpadError::SetModeFailed)
        }
    }

    /// Fails with `NoData` unless `len` bytes are queued. Re-arms reception in
    /// case it stalled.
    fn require(&mut self, len: usize) -> TouchpadResult<()> {
        if self.link.bytes_available(len) {
            Ok(())
        } else {
            self.link.arm_receive();
            Err(TouchpadError::NoData)
        }
    }

    fn next_byte(&mut self) -> TouchpadResult<u8> {
        self.link.read_byte().ok_or(TouchpadError::NoData)
    }
}
