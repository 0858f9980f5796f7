//! Simulated hardware for the unit tests.
//!
//! [`SimBus`] plays the device side of the two lines: it runs the clock
//! whenever the host is not holding it, latches the data line on every rising
//! edge, pulls data low once to acknowledge a complete byte and records the
//! bytes it understood. [`SimTicks`] is the millisecond counter; every read
//! advances it by one and, like an interrupt firing mid-wait, delivers the
//! device's queued answer once the host has sent something and armed capture.

use crate::{
    constants::ps2::RX_BUFFER_SIZE,
    devices::ps2_dev::{
        controller::{LinkConfig, Ps2Capture, Ps2Link, Ps2Receiver, Ps2Transport},
        frame,
        hal::{CaptureError, CapturePeripheral, TickSource},
    },
    ipc::spsc::RxBuffer,
};
use core::{
    cell::{Cell, RefCell},
    convert::Infallible,
};
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use std::{collections::VecDeque, rc::Rc};

#[derive(Default)]
pub struct SimCapture {
    pub arms: Cell<u32>,
    pub shutdowns: Cell<u32>,
    pub restarts: Cell<u32>,
    /// Refuse every arm request
    pub refuse: Cell<bool>,
    offline: Cell<bool>,
}

impl CapturePeripheral for SimCapture {
    fn arm(&self) -> Result<(), CaptureError> {
        if self.refuse.get() || self.offline.get() {
            return Err(CaptureError::Fault);
        }
        self.arms.set(self.arms.get() + 1);
        Ok(())
    }

    fn shutdown(&self) {
        self.shutdowns.set(self.shutdowns.get() + 1);
        self.offline.set(true);
    }

    fn restart(&self) {
        self.restarts.set(self.restarts.get() + 1);
        self.offline.set(false);
    }
}

#[derive(Default)]
struct BusState {
    host_clock_low: bool,
    host_data_low: bool,
    device_clock_high: bool,
    /// Device neither clocks nor acknowledges
    dead: bool,
    /// Bits latched since the last request to send
    frame_bits: Vec<bool>,
    acked: bool,
    latched: Vec<bool>,
    sent: Vec<u8>,
}

impl BusState {
    fn latch(&mut self) {
        let level = !self.host_data_low;
        self.latched.push(level);
        self.frame_bits.push(level);
        if self.frame_bits.len() == 9 {
            let byte = self.frame_bits[..8]
                .iter()
                .rev()
                .fold(0u8, |acc, &bit| acc << 1 | u8::from(bit));
            self.sent.push(byte);
        }
    }
}

/// Device end of the clock and data lines.
#[derive(Clone, Default)]
pub struct SimBus(Rc<RefCell<BusState>>);

impl SimBus {
    /// A bus whose device never drives the clock.
    pub fn dead() -> Self {
        let bus = Self::default();
        bus.0.borrow_mut().dead = true;
        bus
    }

    pub fn clock(&self) -> ClockPin {
        ClockPin(self.clone())
    }

    pub fn data(&self) -> DataPin {
        DataPin(self.clone())
    }

    /// Bytes the device received, decoded from the latched bits.
    pub fn sent(&self) -> Vec<u8> {
        self.0.borrow().sent.clone()
    }

    /// Every data level the device latched on a rising clock edge.
    pub fn latched(&self) -> Vec<bool> {
        self.0.borrow().latched.clone()
    }
}

pub struct ClockPin(SimBus);

pub struct DataPin(SimBus);

impl ErrorType for ClockPin {
    type Error = Infallible;
}

impl OutputPin for ClockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        let mut bus = (self.0).0.borrow_mut();
        bus.host_clock_low = true;
        bus.device_clock_high = true;
        bus.frame_bits.clear();
        bus.acked = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        (self.0).0.borrow_mut().host_clock_low = false;
        Ok(())
    }
}

impl InputPin for ClockPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        let mut bus = (self.0).0.borrow_mut();
        if bus.host_clock_low {
            return Ok(false);
        }
        if bus.dead {
            return Ok(true);
        }
        bus.device_clock_high = !bus.device_clock_high;
        if bus.device_clock_high {
            bus.latch();
        }
        Ok(bus.device_clock_high)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        InputPin::is_high(self).map(|high| !high)
    }
}

impl ErrorType for DataPin {
    type Error = Infallible;
}

impl OutputPin for DataPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        (self.0).0.borrow_mut().host_data_low = true;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        (self.0).0.borrow_mut().host_data_low = false;
        Ok(())
    }
}

impl InputPin for DataPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        let mut bus = (self.0).0.borrow_mut();
        if bus.host_data_low {
            return Ok(false);
        }
        if !bus.dead && bus.frame_bits.len() >= 9 && !bus.acked {
            bus.acked = true;
            return Ok(false);
        }
        Ok(true)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        InputPin::is_high(self).map(|high| !high)
    }
}

/// Millisecond counter that also stands in for the capture interrupt.
pub struct SimTicks<'a, const N: usize> {
    now: Cell<u32>,
    capture: &'a Ps2Capture<SimCapture>,
    receiver: RefCell<Ps2Receiver<'a, SimCapture, N>>,
    bus: SimBus,
    replies: RefCell<VecDeque<u16>>,
    answered: Cell<usize>,
}

impl<'a, const N: usize> SimTicks<'a, N> {
    pub fn new(
        capture: &'a Ps2Capture<SimCapture>,
        receiver: Ps2Receiver<'a, SimCapture, N>,
        bus: SimBus,
    ) -> Self {
        Self {
            now: Cell::new(0),
            capture,
            receiver: RefCell::new(receiver),
            bus,
            replies: RefCell::new(VecDeque::new()),
            answered: Cell::new(0),
        }
    }

    /// Queues the device's answer to the next byte it receives.
    pub fn reply(&self, byte: u8) {
        self.reply_raw(frame::encode(byte));
    }

    pub fn reply_raw(&self, raw: u16) {
        self.replies.borrow_mut().push_back(raw);
    }

    /// Fires the capture-complete interrupt with `byte` right now.
    pub fn deliver(&self, byte: u8) {
        self.deliver_raw(frame::encode(byte));
    }

    pub fn deliver_raw(&self, raw: u16) {
        self.receiver.borrow_mut().on_capture_complete(raw);
    }

    /// Fires the capture-error interrupt.
    pub fn fail_capture(&self) {
        self.receiver.borrow_mut().on_capture_error();
    }
}

impl<const N: usize> TickSource for SimTicks<'_, N> {
    fn now_ms(&self) -> u32 {
        let now = self.now.get();
        self.now.set(now.wrapping_add(1));

        let unanswered = self.bus.sent().len() > self.answered.get();
        if unanswered && self.capture.is_armed() {
            let next = self.replies.borrow_mut().pop_front();
            if let Some(raw) = next {
                self.answered.set(self.answered.get() + 1);
                self.deliver_raw(raw);
            }
        }
        now
    }
}

pub const SIM_RING: usize = RX_BUFFER_SIZE;

pub type SimLink<'a> = Ps2Link<'a, SimCapture, ClockPin, DataPin, SimTicks<'a, SIM_RING>, SIM_RING>;

/// Owns everything a simulated link borrows.
pub struct SimParts {
    pub ring: RxBuffer<SIM_RING>,
    pub capture: Ps2Capture<SimCapture>,
    pub bus: SimBus,
}

impl SimParts {
    pub fn new() -> Self {
        Self::with_bus(SimBus::default())
    }

    pub fn with_bus(bus: SimBus) -> Self {
        Self {
            ring: RxBuffer::new(),
            capture: Ps2Capture::new(SimCapture::default()),
            bus,
        }
    }

    pub fn link(&self, config: LinkConfig) -> SimLink<'_> {
        let (producer, consumer) = self.ring.split().expect("ring already split");
        let ticks = SimTicks::new(
            &self.capture,
            Ps2Receiver::new(&self.capture, producer),
            self.bus.clone(),
        );
        Ps2Link::new(
            &self.capture,
            consumer,
            self.bus.clock(),
            self.bus.data(),
            ticks,
            config,
        )
    }
}

/// Scripted transport for exercising the touchpad state machine alone.
#[derive(Default)]
pub struct FakeTransport {
    pub sent: Vec<u8>,
    pub rx: VecDeque<u8>,
    /// Index into `sent` of the command that is not acknowledged
    pub nak_at: Option<usize>,
    pub arms: Cell<u32>,
    pub delays: Cell<u32>,
}

impl FakeTransport {
    pub fn queue(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes.iter().copied());
    }
}

impl Ps2Transport for FakeTransport {
    fn send_byte(&mut self, byte: u8) {
        self.sent.push(byte);
    }

    fn get_ack(&mut self) -> bool {
        self.nak_at != Some(self.sent.len() - 1)
    }

    fn bytes_available(&self, n: usize) -> bool {
        self.rx.len() >= n
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.rx.pop_front()
    }

    fn arm_receive(&self) {
        self.arms.set(self.arms.get() + 1);
    }

    fn delay_ms(&self, ms: u32) {
        self.delays.set(self.delays.get() + ms);
    }
}
