//! Core engine components for the sub-GHz transceiver.
//!
//! - [`config`] - Configuration types and builder patterns
//! - [`error`] - Error types, result aliases and host status codes
//! - [`events`] - Pending event word decoding
//! - [`engine`] - The [`RadioCore`] engine and its state machine
//! - [`isr`] - Byte and event interrupt handlers
//! - `transmit` - Synchronous, repeat and chained transmit
//!
//! # Example
//!
//! ```ignore
//! use subghz_nic::driver::{EngineConfig, RadioCore, Error};
//!
//! let config = EngineConfig::new()
//!     .with_crystal_hz(26_000_000)
//!     .with_tx_drain_polls(Some(100_000));
//! ```

// Submodules
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod isr;
mod transmit;

// Re-exports for convenience
pub use config::{CipherConfig, ChainMode, EngineConfig, FrequencyWord, RadioState, RfPath};
pub use engine::{RadioCore, RadioCoreDefault, RadioCoreSmall};
pub use error::{
    ConfigError, ConfigResult, Error, Result, RxError, StateError, TxError, TxResult, status_of,
};
pub use events::EventSet;
pub use isr::{ByteInterrupt, EventInterrupt};
