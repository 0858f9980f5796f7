//! PS/2 frame codec
//!
//! A frame is 11 bits, least significant first: a start bit (always 0), the
//! data byte LSB first, a parity bit and a stop bit (always 1). The parity bit
//! is set when the data byte has an even number of ones, so data and parity
//! together always carry an odd count.

use core::fmt;

const START_BIT: u16 = 1 << 0;
const PARITY_BIT: u16 = 1 << 9;
const STOP_BIT: u16 = 1 << 10;
const DATA_SHIFT: u16 = 1;

/// Number of bits the capture peripheral samples per frame.
pub const FRAME_BITS: u32 = 11;

/// Why a captured frame was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// Start bit was high or stop bit was low
    Framing,
    /// Parity bit does not match the data byte
    Parity,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Framing => write!(f, "PS/2 framing error"),
            Self::Parity => write!(f, "PS/2 parity error"),
        }
    }
}

/// Parity bit the wire carries for `byte`.
pub const fn parity_bit(byte: u8) -> bool {
    byte.count_ones() % 2 == 0
}

/// Checks start, stop and parity and extracts the data byte.
///
/// Bits above the 11th are ignored.
pub fn decode(raw: u16) -> Result<u8, FrameError> {
    if raw & START_BIT != 0 || raw & STOP_BIT == 0 {
        return Err(FrameError::Framing);
    }

    let byte = (raw >> DATA_SHIFT) as u8;
    if parity_bit(byte) != (raw & PARITY_BIT != 0) {
        return Err(FrameError::Parity);
    }

    Ok(byte)
}

/// [`decode`] without the reason.
pub fn validate(raw: u16) -> Option<u8> {
    decode(raw).ok()
}

/// Builds the frame a device would put on the wire for `byte`.
pub const fn encode(byte: u8) -> u16 {
    let mut raw = STOP_BIT | (byte as u16) << DATA_SHIFT;
    if parity_bit(byte) {
        raw |= PARITY_BIT;
    }
    raw
}
