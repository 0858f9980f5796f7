//! Touchpad packet layouts
//!
//! Movement mode sends the standard 3-byte PS/2 mouse packet. Absolute mode
//! (Synaptics) sends 6-byte packets whose first and fourth bytes carry fixed
//! bit patterns that let the host spot a misaligned stream.

use bitflags::bitflags;

/// Bytes per movement packet
pub const MOVEMENT_PACKET_LEN: usize = 3;

/// Bytes per absolute packet
pub const ABSOLUTE_PACKET_LEN: usize = 6;

const SYNC_MASK: u8 = 0xC8;
const ABSOLUTE_HEADER: u8 = 0x80;
const ABSOLUTE_TRAILER: u8 = 0xC0;

bitflags! {
    /// Status byte of a movement packet.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MovementFlags: u8 {
        const LEFT_BUTTON = 1 << 0;
        const RIGHT_BUTTON = 1 << 1;
        const MIDDLE_BUTTON = 1 << 2;
        /// Always set by the device; used to check packet alignment
        const ALWAYS_ONE = 1 << 3;
        const X_SIGN = 1 << 4;
        const Y_SIGN = 1 << 5;
        const X_OVERFLOW = 1 << 6;
        const Y_OVERFLOW = 1 << 7;
    }
}

impl MovementFlags {
    /// Whether this byte can start a movement packet.
    pub const fn is_status(&self) -> bool {
        self.contains(Self::ALWAYS_ONE)
    }
}

/// Relative displacement from one movement packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovementReport {
    /// X movement delta
    pub dx: i16,
    /// Y movement delta, positive is away from the user
    pub dy: i16,
    /// Primary button state
    pub button: bool,
    /// Raw status byte
    pub flags: MovementFlags,
}

impl MovementReport {
    pub fn from_packet(status: MovementFlags, x: u8, y: u8) -> Self {
        Self {
            dx: sign_extend(x, status.contains(MovementFlags::X_SIGN)),
            dy: sign_extend(y, status.contains(MovementFlags::Y_SIGN)),
            button: status.contains(MovementFlags::LEFT_BUTTON),
            flags: status,
        }
    }

    pub fn right_button(&self) -> bool {
        self.flags.contains(MovementFlags::RIGHT_BUTTON)
    }

    pub fn middle_button(&self) -> bool {
        self.flags.contains(MovementFlags::MIDDLE_BUTTON)
    }
}

/// Widens a 9-bit two's complement value whose sign lives in the status byte.
const fn sign_extend(magnitude: u8, negative: bool) -> i16 {
    let high: u16 = if negative { 0xFF00 } else { 0x0000 };
    (high | magnitude as u16) as i16
}

/// First byte of an absolute packet has the expected fixed bits.
pub const fn is_absolute_header(byte: u8) -> bool {
    byte & SYNC_MASK == ABSOLUTE_HEADER
}

/// Fourth byte of an absolute packet has the expected fixed bits.
pub const fn is_absolute_trailer(byte: u8) -> bool {
    byte & SYNC_MASK == ABSOLUTE_TRAILER
}

/// Finger position and pressure from one absolute packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbsolutePositionReport {
    pub x: u16,
    pub y: u16,
    /// Contact pressure, 0 when no finger is on the pad
    pub pressure: u8,
}

impl AbsolutePositionReport {
    /// Assembles the coordinates from their bit fields. The header and trailer
    /// bytes are not checked here.
    pub fn from_packet(packet: &[u8; ABSOLUTE_PACKET_LEN]) -> Self {
        let [_, b2, pressure, b4, b5, b6] = *packet;
        let (b2, b4) = (u16::from(b2), u16::from(b4));
        Self {
            x: u16::from(b5) | (b2 & 0x0F) << 8 | (b4 & 0x10) << 8,
            y: u16::from(b6) | (b2 & 0xF0) << 4 | (b4 & 0x20) << 7,
            pressure,
        }
    }

    pub fn contact(&self) -> Contact {
        Contact::from_pressure(self.pressure)
    }

    pub fn within(&self, bounds: &Bounds) -> bool {
        bounds.x.contains(self.x) && bounds.y.contains(self.y)
    }
}

/// How firmly a finger rests on the pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Contact {
    /// Nothing on the pad
    None,
    /// Finger hovering near the surface
    Hover,
    /// Very light touch
    Light,
    /// Normal finger contact
    Normal,
    /// Very heavy contact
    Heavy,
}

impl Contact {
    pub const fn from_pressure(pressure: u8) -> Self {
        match pressure {
            0 => Self::None,
            1..=29 => Self::Hover,
            30..=79 => Self::Light,
            80..=110 => Self::Normal,
            _ => Self::Heavy,
        }
    }

    pub const fn is_touching(&self) -> bool {
        !matches!(self, Self::None | Self::Hover)
    }
}

/// Inclusive coordinate range on one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisRange {
    pub min: u16,
    pub max: u16,
}

impl AxisRange {
    pub const fn contains(&self, value: u16) -> bool {
        self.min <= value && value <= self.max
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub x: AxisRange,
    pub y: AxisRange,
}

/// Everything the device can report.
pub const ABSOLUTE_LIMITS: Bounds = Bounds {
    x: AxisRange { min: 0, max: 6143 },
    y: AxisRange { min: 0, max: 6143 },
};

/// Typical area inside the bezel.
pub const BEZEL_LIMITS: Bounds = Bounds {
    x: AxisRange { min: 1472, max: 5472 },
    y: AxisRange { min: 1408, max: 4448 },
};

/// Typical area away from the edges, where edge gestures do not trigger.
pub const EDGE_MARGINS: Bounds = Bounds {
    x: AxisRange { min: 1632, max: 5312 },
    y: AxisRange { min: 1568, max: 4288 },
};
