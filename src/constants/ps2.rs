//! PS/2 protocol configuration constants.

/// Receive ring capacity in bytes.
/// Holds three absolute packets with room to spare.
pub const RX_BUFFER_SIZE: usize = 24;

/// Byte the device answers with after accepting a command.
pub const ACK: u8 = 0xFA;

/// Reset and run the built-in self test.
pub const CMD_RESET: u8 = 0xFF;
/// Start streaming movement packets.
pub const CMD_ENABLE_REPORTING: u8 = 0xF4;
/// Next byte is the sample rate in reports per second.
pub const CMD_SET_SAMPLE_RATE: u8 = 0xF3;
/// Next byte is the resolution, 0..=3.
pub const CMD_SET_RESOLUTION: u8 = 0xE8;

/// Sample rate argument that makes a Synaptics pad latch the mode byte
/// encoded by the preceding set-resolution commands.
pub const SYNAPTICS_SET_MODE_RATE: u8 = 0x14;

/// Upper bound on one device clock phase while bit-banging a byte out.
pub const CLOCK_TIMEOUT_MS: u32 = 40;

/// Upper bound on the device acknowledging or releasing the lines.
pub const LINE_TIMEOUT_MS: u32 = 30;

/// Upper bound on the device answering a command.
pub const ACK_TIMEOUT_MS: u32 = 30;

/// How long the clock is held low to request the bus.
pub const REQUEST_TO_SEND_HOLD_MS: u32 = 1;

/// Pause before a set-sample-rate exchange.
pub const COMMAND_SPACING_MS: u32 = 1;
