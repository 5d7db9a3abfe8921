//! Testing utilities and mock implementations
//!
//! This module provides a simulated radio peripheral and mock collaborators
//! for exercising the engine on the host without hardware access.
//!
//! Only available when running `cargo test`.

// Note: The #[cfg(test)] attribute is applied in lib.rs where this module is declared
#![allow(missing_docs)]
#![allow(clippy::std_instead_of_core, clippy::std_instead_of_alloc)]

extern crate std;

use core::cell::RefCell;
use std::collections::VecDeque;
use std::vec::Vec;

use embedded_hal::digital::{ErrorKind, ErrorType, OutputPin};

use crate::driver::config::{ChainMode, EngineConfig, FrequencyWord, RadioState, RfPath};
use crate::driver::engine::RadioCore;
use crate::hal::cipher::BlockCipher;
use crate::hal::mac::MacPolicy;
use crate::hal::radio::{HardwareState, LengthMode, OffModes, RadioPeripheral};
use crate::internal::constants::{CBC_MAC_TAG_LEN, DEFAULT_SLOT_SIZE};
use crate::internal::register::RFIF_DONE;

// =============================================================================
// Mock Radio
// =============================================================================

#[derive(Debug)]
struct Sim {
    state: HardwareState,
    requests: Vec<RadioState>,
    off: OffModes,
    mode: LengthMode,
    packet_length: u8,
    flags: u8,
    mask: u8,
    frequency: Option<FrequencyWord>,
    tx_log: Vec<u8>,
    tx_count: u32,
    rx_fifo: VecDeque<u8>,
    rx_count: u32,
    first_byte: Option<u8>,
    byte_irq: bool,
    stuck: bool,
    frozen: bool,
    paths: Vec<RfPath>,
}

impl Sim {
    fn new() -> Self {
        Self {
            state: HardwareState::Idle,
            requests: Vec::new(),
            off: OffModes::IDLE,
            mode: LengthMode::Fixed,
            packet_length: 0xFF,
            flags: 0,
            mask: 0,
            frequency: None,
            tx_log: Vec::new(),
            tx_count: 0,
            rx_fifo: VecDeque::new(),
            rx_count: 0,
            first_byte: None,
            byte_irq: false,
            stuck: false,
            frozen: false,
            paths: Vec::new(),
        }
    }

    fn settle(&mut self, state: RadioState) {
        self.state = match state {
            RadioState::Idle => HardwareState::Idle,
            RadioState::Receiving => HardwareState::Receive,
            RadioState::Transmitting => HardwareState::Transmit,
        };
        self.tx_count = 0;
        self.rx_count = 0;
        self.first_byte = None;
    }

    fn packet_complete(&self, count: u32) -> bool {
        match self.mode {
            LengthMode::Fixed => count % 256 == u32::from(self.packet_length),
            LengthMode::Variable => self
                .first_byte
                .is_some_and(|n| count == u32::from(n) + 1),
            LengthMode::Infinite => false,
        }
    }

    fn finish(&mut self, next: RadioState) {
        self.settle(next);
        self.flags |= RFIF_DONE;
    }
}

/// Simulated packet radio.
///
/// State requests take effect immediately. In fixed mode a packet completes
/// when the byte count modulo 256 matches the packet length register, in
/// variable mode after `first byte + 1` bytes, and never in infinite mode.
/// Completion raises DONE and settles in the configured off mode.
#[derive(Debug)]
pub struct MockRadio {
    sim: RefCell<Sim>,
}

impl Default for MockRadio {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRadio {
    pub fn new() -> Self {
        Self {
            sim: RefCell::new(Sim::new()),
        }
    }

    /// Queue bytes for the receiver
    pub fn inject_rx(&self, bytes: &[u8]) {
        self.sim.borrow_mut().rx_fifo.extend(bytes.iter().copied());
    }

    /// Set event flags as the hardware would
    pub fn raise(&self, flags: u8) {
        self.sim.borrow_mut().flags |= flags;
    }

    /// Ignore every state request
    pub fn set_stuck(&self, stuck: bool) {
        self.sim.borrow_mut().stuck = stuck;
    }

    /// Stop requesting byte interrupts
    pub fn set_frozen(&self, frozen: bool) {
        self.sim.borrow_mut().frozen = frozen;
    }

    pub fn force_hardware_state(&self, state: HardwareState) {
        self.sim.borrow_mut().state = state;
    }

    pub fn transmitted(&self) -> Vec<u8> {
        self.sim.borrow().tx_log.clone()
    }

    pub fn requests(&self) -> Vec<RadioState> {
        self.sim.borrow().requests.clone()
    }

    pub fn clear_requests(&self) {
        self.sim.borrow_mut().requests.clear();
    }

    pub fn paths(&self) -> Vec<RfPath> {
        self.sim.borrow().paths.clone()
    }

    pub fn last_path(&self) -> Option<RfPath> {
        self.sim.borrow().paths.last().copied()
    }

    pub fn frequency(&self) -> Option<FrequencyWord> {
        self.sim.borrow().frequency
    }

    pub fn mask(&self) -> u8 {
        self.sim.borrow().mask
    }

    pub fn off_modes(&self) -> OffModes {
        self.sim.borrow().off
    }

    /// Whether the byte interrupt line is asserted
    pub fn wants_byte(&self) -> bool {
        let sim = self.sim.borrow();
        sim.byte_irq
            && !sim.frozen
            && match sim.state {
                HardwareState::Transmit => true,
                HardwareState::Receive => !sim.rx_fifo.is_empty(),
                HardwareState::Idle | HardwareState::Transitional => false,
            }
    }

    /// Whether the event interrupt line is asserted
    pub fn irq_pending(&self) -> bool {
        let sim = self.sim.borrow();
        sim.flags & sim.mask != 0
    }
}

impl RadioPeripheral for MockRadio {
    fn set_frequency(&self, word: FrequencyWord) {
        self.sim.borrow_mut().frequency = Some(word);
    }

    fn request_state(&self, state: RadioState) {
        let mut sim = self.sim.borrow_mut();
        sim.requests.push(state);
        if !sim.stuck {
            sim.settle(state);
        }
    }

    fn hardware_state(&self) -> HardwareState {
        self.sim.borrow().state
    }

    fn read_byte(&self) -> u8 {
        let mut sim = self.sim.borrow_mut();
        if sim.state != HardwareState::Receive {
            return 0;
        }
        let byte = sim.rx_fifo.pop_front().unwrap_or(0);
        sim.rx_count += 1;
        if sim.first_byte.is_none() {
            sim.first_byte = Some(byte);
        }
        let count = sim.rx_count;
        if sim.packet_complete(count) {
            let next = sim.off.after_rx;
            sim.finish(next);
        }
        byte
    }

    fn write_byte(&self, byte: u8) {
        let mut sim = self.sim.borrow_mut();
        if sim.state != HardwareState::Transmit {
            return;
        }
        sim.tx_log.push(byte);
        sim.tx_count += 1;
        if sim.first_byte.is_none() {
            sim.first_byte = Some(byte);
        }
        let count = sim.tx_count;
        if sim.packet_complete(count) {
            let next = sim.off.after_tx;
            sim.finish(next);
        }
    }

    fn mask_events(&self, flags: u8) {
        self.sim.borrow_mut().mask &= !flags;
    }

    fn unmask_events(&self, flags: u8) {
        self.sim.borrow_mut().mask |= flags;
    }

    fn clear_events(&self, flags: u8) {
        self.sim.borrow_mut().flags &= !flags;
    }

    fn pending_events(&self) -> u8 {
        self.sim.borrow().flags
    }

    fn length_mode(&self) -> LengthMode {
        self.sim.borrow().mode
    }

    fn set_length_mode(&self, mode: LengthMode) {
        self.sim.borrow_mut().mode = mode;
    }

    fn packet_length(&self) -> u8 {
        self.sim.borrow().packet_length
    }

    fn set_packet_length(&self, len: u8) {
        self.sim.borrow_mut().packet_length = len;
    }

    fn set_off_modes(&self, modes: OffModes) {
        self.sim.borrow_mut().off = modes;
    }

    fn enable_byte_interrupt(&self) {
        self.sim.borrow_mut().byte_irq = true;
    }

    fn select_rf_path(&self, path: RfPath) {
        self.sim.borrow_mut().paths.push(path);
    }
}

// =============================================================================
// Mock MAC Policy
// =============================================================================

#[derive(Debug, Default)]
pub struct MockMac {
    timestamp: u16,
    starvations: u32,
}

impl MockMac {
    pub fn set_timestamp(&mut self, value: u16) {
        self.timestamp = value;
    }

    pub fn starvations(&self) -> u32 {
        self.starvations
    }
}

impl MacPolicy for MockMac {
    fn timestamp(&self) -> u16 {
        self.timestamp
    }

    fn notify_starvation(&mut self) {
        self.starvations += 1;
    }
}

// =============================================================================
// Mock Cipher
// =============================================================================

/// XOR "cipher" that makes transformed bytes easy to predict.
///
/// CBC-MAC fills the tag bytes with [`XorCipher::TAG`]. A
/// [`watching`](XorCipher::watching) cipher also checks, on every call,
/// that another thread can enter a critical section meanwhile.
#[derive(Debug, Default)]
pub struct XorCipher {
    encrypts: usize,
    decrypts: usize,
    watch: bool,
    masked_calls: usize,
}

impl XorCipher {
    pub const KEY: u8 = 0x5C;
    pub const TAG: u8 = 0xA7;

    fn apply(buf: &mut [u8], mode: ChainMode) {
        if mode == ChainMode::CbcMac {
            let tag = buf.len().min(CBC_MAC_TAG_LEN);
            buf[..tag].fill(Self::TAG);
        } else {
            for b in buf.iter_mut() {
                *b ^= Self::KEY;
            }
        }
    }

    pub fn watching() -> Self {
        Self {
            watch: true,
            ..Self::default()
        }
    }

    /// Calls made while another context was locked out
    pub fn masked_calls(&self) -> usize {
        self.masked_calls
    }

    fn observe(&mut self) {
        if !self.watch {
            return;
        }
        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            critical_section::with(|_| ());
            let _ = tx.send(());
        });
        if rx.recv_timeout(std::time::Duration::from_millis(500)).is_err() {
            self.masked_calls += 1;
        }
    }

    pub fn encrypt_calls(&self) -> usize {
        self.encrypts
    }

    pub fn decrypt_calls(&self) -> usize {
        self.decrypts
    }
}

impl BlockCipher for XorCipher {
    fn encrypt(&mut self, buf: &mut [u8], mode: ChainMode) {
        self.encrypts += 1;
        self.observe();
        Self::apply(buf, mode);
    }

    fn decrypt(&mut self, buf: &mut [u8], mode: ChainMode) {
        self.decrypts += 1;
        self.observe();
        Self::apply(buf, mode);
    }
}

// =============================================================================
// Mock GPIO
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockPinError;

impl embedded_hal::digital::Error for MockPinError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// Output pin that records its level, or refuses every change
#[derive(Debug, Default)]
pub struct MockPin {
    high: bool,
    fail: bool,
    refuse_high: bool,
}

impl MockPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Pin that can be driven low but never high
    pub fn refusing_high() -> Self {
        Self {
            refuse_high: true,
            ..Self::default()
        }
    }

    pub fn is_high(&self) -> bool {
        self.high
    }
}

impl ErrorType for MockPin {
    type Error = MockPinError;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        if self.fail {
            return Err(MockPinError);
        }
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        if self.fail || self.refuse_high {
            return Err(MockPinError);
        }
        self.high = true;
        Ok(())
    }
}

// =============================================================================
// Engine Harness
// =============================================================================

pub type TestCore = RadioCore<MockRadio, XorCipher, MockMac, DEFAULT_SLOT_SIZE>;

pub fn test_core(config: EngineConfig) -> TestCore {
    RadioCore::new(MockRadio::new(), XorCipher::default(), MockMac::default(), config)
}

/// Engine whose cipher reports calls made inside a critical section.
pub fn watched_core(config: EngineConfig) -> TestCore {
    RadioCore::new(MockRadio::new(), XorCipher::watching(), MockMac::default(), config)
}

/// Service whichever interrupt lines the simulated radio asserts, byte
/// interrupt first.
pub fn pump(core: &TestCore) {
    if core.radio().wants_byte() {
        core.byte_interrupt().service();
    }
    if core.radio().irq_pending() {
        core.event_interrupt().service();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_packet_completes_into_off_mode() {
        let radio = MockRadio::new();
        radio.set_off_modes(OffModes::RECEIVE);
        radio.set_packet_length(2);
        radio.request_state(RadioState::Transmitting);
        radio.write_byte(1);
        assert_eq!(radio.hardware_state(), HardwareState::Transmit);
        radio.write_byte(2);
        assert_eq!(radio.hardware_state(), HardwareState::Receive);
        assert_eq!(radio.pending_events(), RFIF_DONE);
    }

    #[test]
    fn variable_packet_uses_first_byte() {
        let radio = MockRadio::new();
        radio.set_length_mode(LengthMode::Variable);
        radio.request_state(RadioState::Receiving);
        radio.inject_rx(&[1, 9]);
        radio.read_byte();
        assert_eq!(radio.hardware_state(), HardwareState::Receive);
        assert_eq!(radio.read_byte(), 9);
        assert_eq!(radio.hardware_state(), HardwareState::Idle);
    }

    #[test]
    fn stuck_radio_ignores_requests() {
        let radio = MockRadio::new();
        radio.set_stuck(true);
        radio.request_state(RadioState::Receiving);
        assert_eq!(radio.hardware_state(), HardwareState::Idle);
        assert_eq!(radio.requests(), std::vec![RadioState::Receiving]);
    }
}
