//! Configuration types for the transceiver engine

use crate::driver::error::{ConfigError, ConfigResult};
use crate::internal::constants::{
    DEFAULT_CRYSTAL_HZ, FREQ_WORD_MAX, REIDLE_SPIN_LIMIT, TX_BUSY_POLLS, TX_ENTRY_POLLS,
};

/// Logical radio state recorded by the engine
///
/// Exactly one is in force at a time. `Receiving` and `Transmitting` are only
/// reachable from `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RadioState {
    /// Radio off, no event delivery for completed frames
    #[default]
    Idle,
    /// Receiver armed into the double buffer
    Receiving,
    /// Transmitter keyed
    Transmitting,
}

/// Signal path selected on the external RF front end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RfPath {
    /// Power amplifier in line
    Transmit,
    /// Low-noise amplifier in line
    Receive,
    /// Both amplifiers bypassed
    #[default]
    Bypass,
}

impl RfPath {
    /// Path that matches a logical state when amplification is enabled
    #[inline]
    pub const fn for_state(state: RadioState) -> Self {
        match state {
            RadioState::Idle => RfPath::Bypass,
            RadioState::Receiving => RfPath::Receive,
            RadioState::Transmitting => RfPath::Transmit,
        }
    }
}

// =============================================================================
// Cipher Configuration
// =============================================================================

/// Block chaining mode of the payload cipher
///
/// Discriminants are the values of bits 7..4 of the host cipher byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ChainMode {
    /// Cipher block chaining
    #[default]
    Cbc = 0x00,
    /// Cipher feedback
    Cfb = 0x10,
    /// Output feedback
    Ofb = 0x20,
    /// Counter
    Ctr = 0x30,
    /// Electronic codebook
    Ecb = 0x40,
    /// CBC message authentication code, only the tag is transmitted
    CbcMac = 0x50,
}

impl ChainMode {
    /// Decode from the upper nibble of the host cipher byte
    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits & 0xF0 {
            0x00 => Some(ChainMode::Cbc),
            0x10 => Some(ChainMode::Cfb),
            0x20 => Some(ChainMode::Ofb),
            0x30 => Some(ChainMode::Ctr),
            0x40 => Some(ChainMode::Ecb),
            0x50 => Some(ChainMode::CbcMac),
            _ => None,
        }
    }
}

const CRYPTO_OUT_ON: u8 = 1 << 3;
const CRYPTO_OUT_ENCRYPT: u8 = 1 << 2;
const CRYPTO_IN_ON: u8 = 1 << 1;
const CRYPTO_IN_ENCRYPT: u8 = 1 << 0;

/// Payload cipher settings for both directions
///
/// Read by the interrupts, changed only while no transfer is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CipherConfig {
    /// Transform outbound payloads
    pub out_enabled: bool,
    /// Outbound transform encrypts (otherwise decrypts)
    pub out_encrypt: bool,
    /// Transform inbound payloads
    pub in_enabled: bool,
    /// Inbound transform encrypts (otherwise decrypts)
    pub in_encrypt: bool,
    /// Chaining mode shared by both directions
    pub chain_mode: ChainMode,
}

impl CipherConfig {
    /// Cipher disabled in both directions
    pub const NONE: Self = Self {
        out_enabled: false,
        out_encrypt: false,
        in_enabled: false,
        in_encrypt: false,
        chain_mode: ChainMode::Cbc,
    };

    /// Encrypt outbound and decrypt inbound under `mode`
    pub const fn symmetric(mode: ChainMode) -> Self {
        Self {
            out_enabled: true,
            out_encrypt: true,
            in_enabled: true,
            in_encrypt: false,
            chain_mode: mode,
        }
    }

    /// Decode the host cipher byte.
    ///
    /// Returns `None` for an unknown chain mode nibble.
    pub const fn from_byte(byte: u8) -> Option<Self> {
        let Some(chain_mode) = ChainMode::from_bits(byte) else {
            return None;
        };
        Some(Self {
            out_enabled: byte & CRYPTO_OUT_ON != 0,
            out_encrypt: byte & CRYPTO_OUT_ENCRYPT != 0,
            in_enabled: byte & CRYPTO_IN_ON != 0,
            in_encrypt: byte & CRYPTO_IN_ENCRYPT != 0,
            chain_mode,
        })
    }

    /// Encode as the host cipher byte
    pub const fn to_byte(&self) -> u8 {
        let mut byte = self.chain_mode as u8;
        if self.out_enabled {
            byte |= CRYPTO_OUT_ON;
        }
        if self.out_encrypt {
            byte |= CRYPTO_OUT_ENCRYPT;
        }
        if self.in_enabled {
            byte |= CRYPTO_IN_ON;
        }
        if self.in_encrypt {
            byte |= CRYPTO_IN_ENCRYPT;
        }
        byte
    }
}

// =============================================================================
// Frequency
// =============================================================================

/// 24-bit frequency control word (`FREQ2:FREQ1:FREQ0`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrequencyWord(u32);

impl FrequencyWord {
    /// Compute `hz * 2^16 / crystal_hz`, rejecting values wider than 24 bits.
    pub const fn from_hz(hz: u32, crystal_hz: u32) -> ConfigResult<Self> {
        if crystal_hz == 0 {
            return Err(ConfigError::InvalidFrequency);
        }
        let word = ((hz as u64) << 16) / crystal_hz as u64;
        if word > FREQ_WORD_MAX as u64 {
            return Err(ConfigError::InvalidFrequency);
        }
        Ok(Self(word as u32))
    }

    /// Carrier frequency this word programs, truncated to whole Hz
    pub const fn to_hz(self, crystal_hz: u32) -> u32 {
        ((self.0 as u64 * crystal_hz as u64) >> 16) as u32
    }

    /// Raw word value
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Register bytes, most significant first
    #[inline]
    pub const fn to_bytes(self) -> [u8; 3] {
        [(self.0 >> 16) as u8, (self.0 >> 8) as u8, self.0 as u8]
    }
}

// =============================================================================
// Engine Configuration
// =============================================================================

/// Engine configuration
///
/// Poll budgets count iterations of a main-context wait loop. Each iteration
/// yields once to the caller's event hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EngineConfig {
    /// Reference crystal frequency in Hz
    pub crystal_hz: u32,
    /// Wait budget for a previous transmit to drain before starting
    pub tx_busy_polls: u32,
    /// Wait budget for the hardware to report TX after keying
    pub tx_entry_polls: u32,
    /// Wait budget for the hardware to leave TX; `None` waits indefinitely
    pub tx_drain_polls: Option<u32>,
    /// Spin budget for each hardware confirmation inside `force_reidle`
    pub reidle_spin_limit: u32,
    /// Initial chained receive length (0 keeps native framing)
    pub receive_block_len: u16,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineConfig {
    /// Create configuration with default values
    #[must_use]
    pub const fn new() -> Self {
        Self {
            crystal_hz: DEFAULT_CRYSTAL_HZ,
            tx_busy_polls: TX_BUSY_POLLS,
            tx_entry_polls: TX_ENTRY_POLLS,
            tx_drain_polls: None,
            reidle_spin_limit: REIDLE_SPIN_LIMIT,
            receive_block_len: 0,
        }
    }

    /// Set reference crystal frequency
    #[must_use]
    pub const fn with_crystal_hz(mut self, hz: u32) -> Self {
        self.crystal_hz = hz;
        self
    }

    /// Set busy-wait budget before a transmit starts
    #[must_use]
    pub const fn with_tx_busy_polls(mut self, polls: u32) -> Self {
        self.tx_busy_polls = polls;
        self
    }

    /// Set TX entry wait budget
    #[must_use]
    pub const fn with_tx_entry_polls(mut self, polls: u32) -> Self {
        self.tx_entry_polls = polls;
        self
    }

    /// Bound the TX drain wait
    #[must_use]
    pub const fn with_tx_drain_polls(mut self, polls: Option<u32>) -> Self {
        self.tx_drain_polls = polls;
        self
    }

    /// Set the recovery spin budget
    #[must_use]
    pub const fn with_reidle_spin_limit(mut self, spins: u32) -> Self {
        self.reidle_spin_limit = spins;
        self
    }

    /// Set the initial chained receive length
    #[must_use]
    pub const fn with_receive_block_len(mut self, len: u16) -> Self {
        self.receive_block_len = len;
        self
    }
}
