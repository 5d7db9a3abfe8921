//! Error types for the sub-GHz transceiver engine
//!
//! Errors are organized by domain for better diagnostics:
//! - [`ConfigError`]: frequency, cipher and receive-framing configuration
//! - [`StateError`]: radio state machine transitions and recovery
//! - [`TxError`]: transmit set-up and in-flight failures
//! - [`RxError`]: consumer-side receive failures
//!
//! The unified [`Error`] enum wraps all domain errors and is returned by most
//! engine methods. [`Error::status_code`] maps each one to the single-byte
//! reply the command layer hands back to the host.
//!
//! Errors detected inside an interrupt are never returned from it. They are
//! recovered in place and surfaced through the pending-event word.

use crate::internal::constants::{
    RC_ERR_BUFFER_SIZE_EXCEEDED, RC_NO_ERROR, RC_RF_BLOCKSIZE_INCOMPAT, RC_RF_MODE_INCOMPAT,
    RC_TEMP_ERR_BUFFER_NOT_AVAILABLE, RC_TX_DROPPED_PACKET, RC_TX_ERROR,
};

// =============================================================================
// Configuration Errors
// =============================================================================

/// Configuration errors
///
/// These errors occur when programming the carrier, the payload cipher or the
/// receive framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Frequency does not fit the 24-bit frequency control word
    InvalidFrequency,
    /// A transmit is in flight, settings must not change mid-transfer
    TransferInFlight,
    /// Requested length exceeds the receive slot capacity
    BufferSizeExceeded,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ConfigError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ConfigError::InvalidFrequency => "frequency out of range",
            ConfigError::TransferInFlight => "transfer in flight",
            ConfigError::BufferSizeExceeded => "length exceeds receive slot",
        }
    }
}

// =============================================================================
// State Errors
// =============================================================================

/// Radio state machine errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StateError {
    /// Direct Receiving/Transmitting switch requested, go through Idle first
    InvalidTransition,
    /// Hardware did not confirm the forced state change in time
    RecoveryStalled,
}

impl core::fmt::Display for StateError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StateError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            StateError::InvalidTransition => "invalid state transition",
            StateError::RecoveryStalled => "recovery stalled",
        }
    }
}

// =============================================================================
// Transmit Errors
// =============================================================================

/// Transmit errors
///
/// Set-up errors are returned before the radio is touched. In-flight errors
/// (`SupplyUnderrun`, `TxUnderflow`, `Timeout`) are returned after the engine
/// has already recovered the radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxError {
    /// A previous transmit did not drain within the configured poll budget
    Busy,
    /// Length is zero where a payload is required, or the streamed total overflows
    InvalidLength,
    /// Argument combination is meaningless (offset past end, prefix with repeat)
    InvalidArgs,
    /// Caller buffer cannot hold the payload plus prefix or cipher padding
    BufferTooSmall,
    /// Block length does not fit the chained arena or the native block size
    BlockSizeIncompatible,
    /// Requested framing does not fit the configured length mode
    ModeIncompatible,
    /// Hardware never reported entering TX
    NeverEnteredTx,
    /// Chained transmit ran out of supplied blocks
    SupplyUnderrun,
    /// Hardware reported a TX FIFO underflow
    TxUnderflow,
    /// Hardware did not leave TX within the configured drain budget
    Timeout,
    /// Next chained block has not been released yet, retry later
    BufferNotAvailable,
    /// Chunk does not fit one chained block
    BufferSizeExceeded,
    /// No chained transmit is in progress
    NoTransfer,
}

impl core::fmt::Display for TxError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TxError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            TxError::Busy => "transmitter busy",
            TxError::InvalidLength => "invalid transmit length",
            TxError::InvalidArgs => "invalid transmit arguments",
            TxError::BufferTooSmall => "buffer too small",
            TxError::BlockSizeIncompatible => "block size incompatible",
            TxError::ModeIncompatible => "length mode incompatible",
            TxError::NeverEnteredTx => "radio never entered TX",
            TxError::SupplyUnderrun => "chained supply underrun",
            TxError::TxUnderflow => "TX FIFO underflow",
            TxError::Timeout => "transmit timed out",
            TxError::BufferNotAvailable => "block not available",
            TxError::BufferSizeExceeded => "chunk exceeds block",
            TxError::NoTransfer => "no chained transfer",
        }
    }
}

// =============================================================================
// Receive Errors
// =============================================================================

/// Consumer-side receive errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxError {
    /// No frame became ready within the poll budget
    Timeout,
    /// The ready frame is already held by another guard
    FrameClaimed,
}

impl core::fmt::Display for RxError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl RxError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            RxError::Timeout => "receive timed out",
            RxError::FrameClaimed => "frame already claimed",
        }
    }
}

// =============================================================================
// Unified Error Type
// =============================================================================

/// This enum wraps all domain-specific errors for unified error handling.
///
/// Match on the inner domain error for specific handling:
/// ```ignore
/// match core.begin_transmit(&mut buf, 3, 0, 0, &mut hook) {
///     Err(Error::Tx(TxError::Busy)) => { /* retry later */ }
///     Err(e) => reply(e.status_code()),
///     Ok(_) => reply(RC_NO_ERROR),
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Configuration error
    Config(ConfigError),
    /// State machine error
    State(StateError),
    /// Transmit error
    Tx(TxError),
    /// Receive error
    Rx(RxError),
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Config(e) => write!(f, "config: {}", e.as_str()),
            Error::State(e) => write!(f, "state: {}", e.as_str()),
            Error::Tx(e) => write!(f, "tx: {}", e.as_str()),
            Error::Rx(e) => write!(f, "rx: {}", e.as_str()),
        }
    }
}

impl Error {
    /// Single-byte status reported to the host for this error
    #[must_use]
    pub const fn status_code(&self) -> u8 {
        match self {
            Error::Tx(TxError::BlockSizeIncompatible) => RC_RF_BLOCKSIZE_INCOMPAT,
            Error::Tx(TxError::ModeIncompatible) => RC_RF_MODE_INCOMPAT,
            Error::Tx(TxError::SupplyUnderrun | TxError::TxUnderflow)
            | Error::State(StateError::RecoveryStalled) => RC_TX_DROPPED_PACKET,
            Error::Tx(TxError::BufferNotAvailable | TxError::Busy) => {
                RC_TEMP_ERR_BUFFER_NOT_AVAILABLE
            }
            Error::Tx(TxError::BufferSizeExceeded | TxError::BufferTooSmall)
            | Error::Config(ConfigError::BufferSizeExceeded) => RC_ERR_BUFFER_SIZE_EXCEEDED,
            _ => RC_TX_ERROR,
        }
    }
}

// From impls for automatic conversion
impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<StateError> for Error {
    fn from(e: StateError) -> Self {
        Error::State(e)
    }
}

impl From<TxError> for Error {
    fn from(e: TxError) -> Self {
        Error::Tx(e)
    }
}

impl From<RxError> for Error {
    fn from(e: RxError) -> Self {
        Error::Rx(e)
    }
}

/// Result type alias for engine operations
pub type Result<T> = core::result::Result<T, Error>;

/// Host status byte for an engine result
#[inline]
pub fn status_of<T>(result: &Result<T>) -> u8 {
    match result {
        Ok(_) => RC_NO_ERROR,
        Err(e) => e.status_code(),
    }
}

/// Result type alias for configuration operations
pub type ConfigResult<T> = core::result::Result<T, ConfigError>;

/// Result type alias for transmit operations
pub type TxResult<T> = core::result::Result<T, TxError>;

// =============================================================================
// Unit Tests
// =============================================================================
