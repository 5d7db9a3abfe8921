//! External RF front end
//!
//! Boards with a power amplifier / LNA in front of the transceiver switch the
//! signal path with three GPIOs. [`FrontEnd`] drives them through
//! `embedded_hal::digital::OutputPin`, and [`WithFrontEnd`] wraps a radio
//! peripheral so the engine's path selection reaches the pins.
//!
//! # Example
//!
//! ```ignore
//! use subghz_nic::hal::{FrontEnd, WithFrontEnd};
//!
//! let front_end = FrontEnd::new(tx_en, rx_en, bypass)?;
//! let radio = WithFrontEnd::new(radio, front_end);
//! let core: RadioCore<_, _, _> = RadioCore::new(radio, cipher, mac, config);
//! core.set_amplifier(true);
//! ```

use embedded_hal::digital::OutputPin;

use crate::driver::config::{FrequencyWord, RadioState, RfPath};
use crate::hal::radio::{HardwareState, LengthMode, OffModes, RadioPeripheral};
use crate::sync::CriticalSectionCell;

/// Amplifier path switch on three active-high enable pins
#[derive(Debug)]
pub struct FrontEnd<TX: OutputPin, RX: OutputPin, BY: OutputPin> {
    tx_enable: TX,
    rx_enable: RX,
    bypass: BY,
    path: RfPath,
}

impl<TX: OutputPin, RX: OutputPin, BY: OutputPin> FrontEnd<TX, RX, BY> {
    /// Create the switch. Pins are driven to bypass immediately.
    ///
    /// # Errors
    ///
    /// Returns [`FrontEndError`] if a pin refuses its bypass level.
    pub fn new(tx_enable: TX, rx_enable: RX, bypass: BY) -> Result<Self, FrontEndError> {
        let mut front_end = Self {
            tx_enable,
            rx_enable,
            bypass,
            path: RfPath::Bypass,
        };
        front_end.select(RfPath::Bypass)?;
        Ok(front_end)
    }

    /// Drive the pins for `path`.
    ///
    /// Both enables are released before the new one is asserted, so the PA and
    /// LNA are never on together.
    pub fn select(&mut self, path: RfPath) -> Result<(), FrontEndError> {
        self.tx_enable.set_low().map_err(|_| FrontEndError)?;
        self.rx_enable.set_low().map_err(|_| FrontEndError)?;
        match path {
            RfPath::Transmit => {
                self.bypass.set_low().map_err(|_| FrontEndError)?;
                self.tx_enable.set_high().map_err(|_| FrontEndError)?;
            }
            RfPath::Receive => {
                self.bypass.set_low().map_err(|_| FrontEndError)?;
                self.rx_enable.set_high().map_err(|_| FrontEndError)?;
            }
            RfPath::Bypass => {
                self.bypass.set_high().map_err(|_| FrontEndError)?;
            }
        }
        self.path = path;
        Ok(())
    }

    /// Last path successfully selected
    pub fn path(&self) -> RfPath {
        self.path
    }

    /// Consume the switch and return its pins
    pub fn release(self) -> (TX, RX, BY) {
        (self.tx_enable, self.rx_enable, self.bypass)
    }
}

/// A front-end pin refused a level change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrontEndError;

/// Radio peripheral with an external front end attached
pub struct WithFrontEnd<R, TX: OutputPin, RX: OutputPin, BY: OutputPin> {
    radio: R,
    front_end: CriticalSectionCell<FrontEnd<TX, RX, BY>>,
}

impl<R, TX: OutputPin, RX: OutputPin, BY: OutputPin> WithFrontEnd<R, TX, RX, BY> {
    /// Attach `front_end` to `radio`
    pub const fn new(radio: R, front_end: FrontEnd<TX, RX, BY>) -> Self {
        Self {
            radio,
            front_end: CriticalSectionCell::new(front_end),
        }
    }

    /// The wrapped radio
    pub fn inner(&self) -> &R {
        &self.radio
    }

    /// Currently selected path
    pub fn path(&self) -> RfPath {
        self.front_end.with_ref(FrontEnd::path)
    }
}

impl<R, TX, RX, BY> RadioPeripheral for WithFrontEnd<R, TX, RX, BY>
where
    R: RadioPeripheral,
    TX: OutputPin,
    RX: OutputPin,
    BY: OutputPin,
{
    fn set_frequency(&self, word: FrequencyWord) {
        self.radio.set_frequency(word);
    }
    fn request_state(&self, state: RadioState) {
        self.radio.request_state(state);
    }
    fn hardware_state(&self) -> HardwareState {
        self.radio.hardware_state()
    }
    fn read_byte(&self) -> u8 {
        self.radio.read_byte()
    }
    fn write_byte(&self, byte: u8) {
        self.radio.write_byte(byte);
    }
    fn mask_events(&self, flags: u8) {
        self.radio.mask_events(flags);
    }
    fn unmask_events(&self, flags: u8) {
        self.radio.unmask_events(flags);
    }
    fn clear_events(&self, flags: u8) {
        self.radio.clear_events(flags);
    }
    fn pending_events(&self) -> u8 {
        self.radio.pending_events()
    }
    fn length_mode(&self) -> LengthMode {
        self.radio.length_mode()
    }
    fn set_length_mode(&self, mode: LengthMode) {
        self.radio.set_length_mode(mode);
    }
    fn packet_length(&self) -> u8 {
        self.radio.packet_length()
    }
    fn set_packet_length(&self, len: u8) {
        self.radio.set_packet_length(len);
    }
    fn set_off_modes(&self, modes: OffModes) {
        self.radio.set_off_modes(modes);
    }
    fn enable_byte_interrupt(&self) {
        self.radio.enable_byte_interrupt();
    }

    fn select_rf_path(&self, path: RfPath) {
        let result = self.front_end.with(|fe| fe.select(path));
        if result.is_err() {
            #[cfg(feature = "defmt")]
            defmt::warn!("front end refused path {}", path);
        }
        self.radio.select_rf_path(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockPin, MockRadio};

    fn front_end() -> FrontEnd<MockPin, MockPin, MockPin> {
        FrontEnd::new(MockPin::new(), MockPin::new(), MockPin::new()).unwrap()
    }

    #[test]
    fn starts_in_bypass() {
        let fe = front_end();
        assert_eq!(fe.path(), RfPath::Bypass);
        let (tx, rx, by) = fe.release();
        assert!(!tx.is_high());
        assert!(!rx.is_high());
        assert!(by.is_high());
    }

    #[test]
    fn transmit_path_enables_pa_only() {
        let mut fe = front_end();
        fe.select(RfPath::Transmit).unwrap();
        let (tx, rx, by) = fe.release();
        assert!(tx.is_high());
        assert!(!rx.is_high());
        assert!(!by.is_high());
    }

    #[test]
    fn receive_path_enables_lna_only() {
        let mut fe = front_end();
        fe.select(RfPath::Transmit).unwrap();
        fe.select(RfPath::Receive).unwrap();
        let (tx, rx, by) = fe.release();
        assert!(!tx.is_high());
        assert!(rx.is_high());
        assert!(!by.is_high());
    }

    #[test]
    fn new_reports_pin_failure() {
        let result = FrontEnd::new(MockPin::new(), MockPin::new(), MockPin::failing());
        assert!(matches!(result, Err(FrontEndError)));
    }

    #[test]
    fn failing_pin_keeps_previous_path() {
        let mut fe =
            FrontEnd::new(MockPin::new(), MockPin::refusing_high(), MockPin::new()).unwrap();
        assert_eq!(fe.select(RfPath::Receive), Err(FrontEndError));
        assert_eq!(fe.path(), RfPath::Bypass);
    }

    #[test]
    fn wrapper_routes_path_and_forwards_registers() {
        let radio = WithFrontEnd::new(MockRadio::new(), front_end());
        radio.select_rf_path(RfPath::Receive);
        assert_eq!(radio.path(), RfPath::Receive);
        assert_eq!(radio.inner().last_path(), Some(RfPath::Receive));
        radio.set_packet_length(42);
        assert_eq!(radio.packet_length(), 42);
    }
}
