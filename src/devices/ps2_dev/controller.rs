//! PS/2 link layer
//!
//! Reception runs on a capture peripheral that samples one 11-bit frame per
//! arm. The completion context validates each frame and hands the byte to the
//! foreground through the SPSC ring, then re-arms straight away so no device
//! byte is missed.
//!
//! Transmission is bit-banged from the foreground. Host-to-device transfers
//! need the host to pull the clock line and then follow the device's clock,
//! which the capture peripheral cannot do, so it is shut down for the whole
//! transfer and only brought back by [`Ps2Transport::get_ack`] or an explicit
//! re-arm.
//!
//! The pieces are split by execution context:
//! - [`Ps2Capture`] is shared by both contexts and only holds atomics
//! - [`Ps2Receiver`] lives in the interrupt handler and owns the ring's producer
//! - [`Ps2Link`] lives in the foreground and owns the consumer, both lines and
//!   the tick source

use super::{
    frame::{self, FrameError},
    hal::{self, CapturePeripheral, Deadline, OpenDrainLine, TickSource},
};
use crate::{
    constants::ps2::{
        ACK, ACK_TIMEOUT_MS, CLOCK_TIMEOUT_MS, LINE_TIMEOUT_MS, REQUEST_TO_SEND_HOLD_MS,
    },
    ipc::spsc::{Consumer, Producer},
};
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Timing knobs for the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkConfig {
    /// Longest wait for one device clock edge while sending
    pub clock_timeout_ms: u32,
    /// Longest wait for the device to acknowledge or release the lines
    pub line_timeout_ms: u32,
    /// Longest wait for the response byte after a command
    pub ack_timeout_ms: u32,
    /// How long the clock is held low to request the bus
    pub request_hold_ms: u32,
    /// Wait for one extra device clock cycle between the request-to-send and
    /// the first data bit.
    ///
    /// Some setups only transmit reliably with these waits and others only
    /// without them (attaching a scope probe was seen to flip it), so this is
    /// left to calibration.
    pub settle_waits: bool,
}

impl LinkConfig {
    pub const fn new() -> Self {
        Self {
            clock_timeout_ms: CLOCK_TIMEOUT_MS,
            line_timeout_ms: LINE_TIMEOUT_MS,
            ack_timeout_ms: ACK_TIMEOUT_MS,
            request_hold_ms: REQUEST_TO_SEND_HOLD_MS,
            settle_waits: false,
        }
    }

    pub const fn with_settle_waits(mut self, enabled: bool) -> Self {
        self.settle_waits = enabled;
        self
    }

    pub const fn with_ack_timeout(mut self, timeout_ms: u32) -> Self {
        self.ack_timeout_ms = timeout_ms;
        self
    }

    pub const fn with_clock_timeout(mut self, timeout_ms: u32) -> Self {
        self.clock_timeout_ms = timeout_ms;
        self
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of the link counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    /// Frames that passed validation
    pub frames: u32,
    pub framing_errors: u32,
    pub parity_errors: u32,
    /// Valid bytes lost because the ring was full
    pub dropped: u32,
    /// Errors reported by the capture peripheral
    pub capture_errors: u32,
    /// Transmit waits that ran into their timeout
    pub clock_timeouts: u32,
}

struct Counters {
    frames: AtomicU32,
    framing_errors: AtomicU32,
    parity_errors: AtomicU32,
    dropped: AtomicU32,
    capture_errors: AtomicU32,
    clock_timeouts: AtomicU32,
}

impl Counters {
    const fn new() -> Self {
        Self {
            frames: AtomicU32::new(0),
            framing_errors: AtomicU32::new(0),
            parity_errors: AtomicU32::new(0),
            dropped: AtomicU32::new(0),
            capture_errors: AtomicU32::new(0),
            clock_timeouts: AtomicU32::new(0),
        }
    }

    fn bump(counter: &AtomicU32) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Capture peripheral control shared by the interrupt handler and the
/// foreground.
pub struct Ps2Capture<C> {
    peripheral: C,
    /// A capture is armed and has not completed yet
    armed: AtomicBool,
    /// Peripheral was shut down for a transmit and needs a restart
    offline: AtomicBool,
    counters: Counters,
}

impl<C: CapturePeripheral> Ps2Capture<C> {
    pub const fn new(peripheral: C) -> Self {
        Self {
            peripheral,
            armed: AtomicBool::new(false),
            offline: AtomicBool::new(false),
            counters: Counters::new(),
        }
    }

    /// Arms the peripheral for the next frame unless it is armed already.
    ///
    /// Safe to call from either context: whoever flips the flag first does the
    /// arming. If the peripheral refuses, the flag is cleared again so the next
    /// call retries.
    pub fn arm_receive(&self) {
        if self.armed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Err(e) = self.peripheral.arm() {
            self.armed.store(false, Ordering::Release);
            log::trace!("PS/2 capture not armed: {e}");
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> LinkStats {
        let c = &self.counters;
        LinkStats {
            frames: c.frames.load(Ordering::Relaxed),
            framing_errors: c.framing_errors.load(Ordering::Relaxed),
            parity_errors: c.parity_errors.load(Ordering::Relaxed),
            dropped: c.dropped.load(Ordering::Relaxed),
            capture_errors: c.capture_errors.load(Ordering::Relaxed),
            clock_timeouts: c.clock_timeouts.load(Ordering::Relaxed),
        }
    }

    pub fn peripheral(&self) -> &C {
        &self.peripheral
    }

    /// Marks the in-flight capture as finished and arms the next one.
    fn rearm(&self) {
        self.armed.store(false, Ordering::Release);
        self.arm_receive();
    }

    fn shutdown(&self) {
        self.offline.store(true, Ordering::Release);
        self.peripheral.shutdown();
        self.armed.store(false, Ordering::Release);
    }

    fn restart(&self) {
        self.peripheral.restart();
        self.armed.store(false, Ordering::Release);
        self.offline.store(false, Ordering::Release);
    }

    /// Foreground re-arm: brings the peripheral back first if a transmit
    /// left it shut down.
    fn resume(&self) {
        if self.offline.load(Ordering::Acquire) {
            self.restart();
        }
        self.arm_receive();
    }
}

/// Interrupt-context half of the link.
pub struct Ps2Receiver<'a, C, const N: usize> {
    capture: &'a Ps2Capture<C>,
    rx: Producer<'a, N>,
}

impl<'a, C: CapturePeripheral, const N: usize> Ps2Receiver<'a, C, N> {
    pub fn new(capture: &'a Ps2Capture<C>, rx: Producer<'a, N>) -> Self {
        Self { capture, rx }
    }

    /// Capture-complete handler: `raw` holds the 11 sampled bits.
    ///
    /// Invalid frames and bytes that do not fit are dropped; either way the
    /// peripheral is armed again before returning.
    pub fn on_capture_complete(&mut self, raw: u16) {
        let counters = &self.capture.counters;

        match frame::decode(raw) {
            Ok(byte) => {
                Counters::bump(&counters.frames);
                if self.rx.push(byte).is_err() {
                    Counters::bump(&counters.dropped);
                    log::trace!("PS/2 receive ring full, dropped {byte:#04x}");
                }
            }
            Err(e) => {
                match e {
                    FrameError::Framing => Counters::bump(&counters.framing_errors),
                    FrameError::Parity => Counters::bump(&counters.parity_errors),
                }
                log::trace!("PS/2 frame {raw:#05x} rejected: {e}");
            }
        }

        self.capture.rearm();
    }

    /// Capture-error handler. Errors are expected on a noisy line: the attempt
    /// is discarded and the peripheral re-armed.
    pub fn on_capture_error(&mut self) {
        Counters::bump(&self.capture.counters.capture_errors);
        self.capture.rearm();
    }
}

/// Byte-level operations the touchpad layer needs from a PS/2 link.
pub trait Ps2Transport {
    /// Clocks one byte out to the device. Blocking.
    ///
    /// Leaves reception off; the next [`Self::get_ack`] or
    /// [`Self::arm_receive`] turns it back on.
    fn send_byte(&mut self, byte: u8);

    /// Restarts reception and waits for the device to answer with ACK.
    fn get_ack(&mut self) -> bool;

    fn bytes_available(&self, n: usize) -> bool;

    fn read_byte(&mut self) -> Option<u8>;

    fn arm_receive(&self);

    fn delay_ms(&self, ms: u32);

    /// One command round trip.
    fn command(&mut self, byte: u8) -> bool {
        self.send_byte(byte);
        self.get_ack()
    }
}

/// Foreground half of the link.
pub struct Ps2Link<'a, C, CLK, DATA, T, const N: usize> {
    capture: &'a Ps2Capture<C>,
    rx: Consumer<'a, N>,
    clock: CLK,
    data: DATA,
    ticks: T,
    config: LinkConfig,
}

impl<'a, C, CLK, DATA, T, const N: usize> Ps2Link<'a, C, CLK, DATA, T, N>
where
    C: CapturePeripheral,
    CLK: OpenDrainLine,
    DATA: OpenDrainLine,
    T: TickSource,
{
    pub fn new(
        capture: &'a Ps2Capture<C>,
        rx: Consumer<'a, N>,
        clock: CLK,
        data: DATA,
        ticks: T,
        config: LinkConfig,
    ) -> Self {
        Self {
            capture,
            rx,
            clock,
            data,
            ticks,
            config,
        }
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn stats(&self) -> LinkStats {
        self.capture.stats()
    }

    pub fn ticks(&self) -> &T {
        &self.ticks
    }

    /// Hands the lines and tick source back.
    pub fn release(self) -> (CLK, DATA, T) {
        (self.clock, self.data, self.ticks)
    }

    /// Drives `bit` while the device holds the clock low, then lets it latch
    /// on the rising edge.
    fn clock_out(&mut self, bit: bool) {
        self.wait_clock_low();
        self.data.set_level(bit);
        self.wait_clock_high();
    }

    fn wait_clock_low(&mut self) -> bool {
        let timeout = self.config.clock_timeout_ms;
        self.wait_while(timeout, |link| link.clock.is_high())
    }

    fn wait_clock_high(&mut self) -> bool {
        let timeout = self.config.clock_timeout_ms;
        self.wait_while(timeout, |link| !link.clock.is_high())
    }

    /// Spins while `busy` holds. Returns false if the deadline hit first; the
    /// timeout is counted and the caller carries on regardless.
    fn wait_while(&mut self, timeout_ms: u32, mut busy: impl FnMut(&mut Self) -> bool) -> bool {
        let deadline = Deadline::after(&self.ticks, timeout_ms);
        while busy(self) {
            if deadline.expired(&self.ticks) {
                Counters::bump(&self.capture.counters.clock_timeouts);
                log::trace!("PS/2 line wait timed out after {timeout_ms} ms");
                return false;
            }
        }
        true
    }
}

impl<C, CLK, DATA, T, const N: usize> Ps2Transport for Ps2Link<'_, C, CLK, DATA, T, N>
where
    C: CapturePeripheral,
    CLK: OpenDrainLine,
    DATA: OpenDrainLine,
    T: TickSource,
{
    fn send_byte(&mut self, byte: u8) {
        self.capture.shutdown();

        // Request to send: holding the clock low makes the device stop
        // talking and listen. Data low is the start bit.
        self.clock.drive_low();
        hal::delay_ms(&self.ticks, self.config.request_hold_ms);
        self.data.drive_low();
        self.clock.release();

        if self.config.settle_waits {
            self.wait_clock_low();
            self.wait_clock_high();
        }

        for i in 0..8 {
            self.clock_out((byte >> i) & 1 != 0);
        }
        self.clock_out(frame::parity_bit(byte));

        // Stop bit: let both lines float high.
        self.wait_clock_low();
        self.clock.release();
        self.data.release();

        // The device pulls data low to acknowledge, then frees both lines.
        let timeout = self.config.line_timeout_ms;
        let acked = self.wait_while(timeout, |link| link.data.is_high());
        self.wait_clock_low();
        self.wait_while(timeout, |link| !link.clock.is_high() && !link.data.is_high());

        if acked {
            log::trace!("PS/2 sent {byte:#04x}");
        } else {
            log::debug!("PS/2 sent {byte:#04x} but the device never pulled data low");
        }
    }

    fn get_ack(&mut self) -> bool {
        self.rx.flush();
        self.capture.restart();
        self.capture.arm_receive();

        let deadline = Deadline::after(&self.ticks, self.config.ack_timeout_ms);
        while !self.bytes_available(1) {
            if deadline.expired(&self.ticks) {
                break;
            }
        }

        match self.rx.pop() {
            Some(ACK) => true,
            Some(other) => {
                log::debug!("PS/2 expected ACK, device answered {other:#04x}");
                false
            }
            None => {
                log::debug!("PS/2 no answer within {} ms", self.config.ack_timeout_ms);
                false
            }
        }
    }

    fn bytes_available(&self, n: usize) -> bool {
        self.rx.len() >= n
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.rx.pop()
    }

    fn arm_receive(&self) {
        self.capture.resume();
    }

    fn delay_ms(&self, ms: u32) {
        hal::delay_ms(&self.ticks, ms);
    }
}
