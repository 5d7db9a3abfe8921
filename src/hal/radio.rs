//! Radio peripheral boundary
//!
//! The engine never touches registers directly. Everything it needs from the
//! transceiver goes through [`RadioPeripheral`]: carrier programming, state
//! requests, the one-byte data port, the event flag/mask pair and the packet
//! framing registers.
//!
//! All methods take `&self`. Register writes are single volatile stores on
//! real hardware and need no exclusive borrow, which lets the main context and
//! both interrupt handles share one peripheral.

use crate::driver::config::{FrequencyWord, RadioState, RfPath};

/// Hardware-reported radio state (`MARCSTATE` collapsed to what the engine
/// distinguishes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HardwareState {
    /// Idle, synthesizer off
    #[default]
    Idle,
    /// Receiving
    Receive,
    /// Transmitting
    Transmit,
    /// Calibrating or settling between states
    Transitional,
}

/// Packet length framing (`PKTCTRL0.LENGTH_CONFIG`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LengthMode {
    /// Length programmed in the packet length register
    #[default]
    Fixed,
    /// First payload byte carries the length
    Variable,
    /// No hardware length, software ends the packet by switching to fixed
    Infinite,
}

/// States the hardware settles in after a packet completes (`MCSM1`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OffModes {
    /// State after a received packet
    pub after_rx: RadioState,
    /// State after a transmitted packet
    pub after_tx: RadioState,
}

impl OffModes {
    /// Drop back to idle after every packet
    pub const IDLE: Self = Self {
        after_rx: RadioState::Idle,
        after_tx: RadioState::Idle,
    };

    /// Keep listening after receive, return to receive after transmit
    pub const RECEIVE: Self = Self {
        after_rx: RadioState::Receiving,
        after_tx: RadioState::Receiving,
    };

    /// Keep transmitting after transmit, transmit after receive
    pub const TRANSMIT: Self = Self {
        after_rx: RadioState::Transmitting,
        after_tx: RadioState::Transmitting,
    };

    /// Off modes that keep the hardware in `state` between packets
    pub const fn for_state(state: RadioState) -> Self {
        match state {
            RadioState::Idle => Self::IDLE,
            RadioState::Receiving => Self::RECEIVE,
            RadioState::Transmitting => Self::TRANSMIT,
        }
    }
}

/// Register-level access to the sub-GHz transceiver.
///
/// Event flag arguments use the 8-bit `RFIF` layout. Clearing is
/// write-zero-to-clear on hardware; implementations clear exactly the bits
/// passed.
pub trait RadioPeripheral {
    /// Program the carrier frequency
    fn set_frequency(&self, word: FrequencyWord);

    /// Issue a state strobe
    fn request_state(&self, state: RadioState);

    /// Current hardware state
    fn hardware_state(&self) -> HardwareState;

    /// Read the next received byte from the data port
    fn read_byte(&self) -> u8;

    /// Write the next byte to transmit into the data port
    fn write_byte(&self, byte: u8);

    /// Stop `flags` from raising the event interrupt
    fn mask_events(&self, flags: u8);

    /// Let `flags` raise the event interrupt
    fn unmask_events(&self, flags: u8);

    /// Clear pending `flags`
    fn clear_events(&self, flags: u8);

    /// Currently pending flags
    fn pending_events(&self) -> u8;

    /// Current framing mode
    fn length_mode(&self) -> LengthMode;

    /// Change framing mode
    fn set_length_mode(&self, mode: LengthMode);

    /// Programmed packet length
    fn packet_length(&self) -> u8;

    /// Program the packet length
    fn set_packet_length(&self, len: u8);

    /// Select where the hardware settles after a packet
    fn set_off_modes(&self, modes: OffModes);

    /// Enable the per-byte data interrupt
    fn enable_byte_interrupt(&self);

    /// Route the external front end. Radios without one ignore this.
    fn select_rf_path(&self, path: RfPath) {
        let _ = path;
    }
}

impl<R: RadioPeripheral + ?Sized> RadioPeripheral for &R {
    fn set_frequency(&self, word: FrequencyWord) {
        (**self).set_frequency(word);
    }
    fn request_state(&self, state: RadioState) {
        (**self).request_state(state);
    }
    fn hardware_state(&self) -> HardwareState {
        (**self).hardware_state()
    }
    fn read_byte(&self) -> u8 {
        (**self).read_byte()
    }
    fn write_byte(&self, byte: u8) {
        (**self).write_byte(byte);
    }
    fn mask_events(&self, flags: u8) {
        (**self).mask_events(flags);
    }
    fn unmask_events(&self, flags: u8) {
        (**self).unmask_events(flags);
    }
    fn clear_events(&self, flags: u8) {
        (**self).clear_events(flags);
    }
    fn pending_events(&self) -> u8 {
        (**self).pending_events()
    }
    fn length_mode(&self) -> LengthMode {
        (**self).length_mode()
    }
    fn set_length_mode(&self, mode: LengthMode) {
        (**self).set_length_mode(mode);
    }
    fn packet_length(&self) -> u8 {
        (**self).packet_length()
    }
    fn set_packet_length(&self, len: u8) {
        (**self).set_packet_length(len);
    }
    fn set_off_modes(&self, modes: OffModes) {
        (**self).set_off_modes(modes);
    }
    fn enable_byte_interrupt(&self) {
        (**self).enable_byte_interrupt();
    }
    fn select_rf_path(&self, path: RfPath) {
        (**self).select_rf_path(path);
    }
}
