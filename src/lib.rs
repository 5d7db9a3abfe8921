//! Sub-GHz Transceiver Engine
//!
//! A `no_std`, `no_alloc` interrupt-driven engine for packet radios of the
//! CC1101/CC1111 family, as found in USB radio dongles.
//!
//! The engine moves bytes between the radio's one-byte data port and caller
//! buffers from two interrupts, runs the Idle/Receiving/Transmitting state
//! machine, double-buffers received frames for a cooperative main loop and
//! frames outbound payloads (length prefixes, repeats, chained blocks,
//! optional block cipher).
//!
//! # Architecture
//!
//! 1. **Engine** ([`driver`]): [`RadioCore`], its state machine, transmit
//!    paths and interrupt handlers
//! 2. **Buffers** ([`buffer`]): receive slot hand-off and transmit streaming
//! 3. **HAL** ([`hal`]): traits for the radio peripheral, cipher and MAC
//!    policy, plus the GPIO front-end adapter
//! 4. **Sync** ([`sync`]): critical-section primitives shared by all contexts
//!
//! # Features
//!
//! - `soft-aes` (default): software AES-128 [`SoftAes`] cipher adapter
//! - `defmt`: defmt formatting and logging
//!
//! # Example
//!
//! ```ignore
//! use subghz_nic::{EngineConfig, NoMac, NullCipher, RadioCoreDefault};
//!
//! static RADIO: RadioCoreDefault<Cc1111, NullCipher, NoMac> =
//!     RadioCoreDefault::new(Cc1111, NullCipher, NoMac, EngineConfig::new());
//!
//! RADIO.init()?;
//! RADIO.set_frequency(433_920_000)?;
//!
//! let mut hook = || usb.process_events();
//! let mut frame = [0xAA, 0xBB, 0xCC];
//! RADIO.begin_transmit(&mut frame, 3, 2, 1, &mut hook)?;
//!
//! RADIO.enter_receive()?;
//! loop {
//!     if let Some(frame) = RADIO.read_ready_slot() {
//!         usb.send(&frame);
//!     }
//!     hook();
//! }
//! ```
//!
//! # Memory Requirements
//!
//! Two receive slots of `N` bytes each live inside the engine (1 KB with the
//! default 512-byte slots). Transmit buffers are borrowed from the caller for
//! the duration of each call.

#![cfg_attr(not(test), no_std)]
#![deny(missing_docs)]
#![allow(unsafe_code)]
#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::correctness)]
#![warn(
    clippy::suspicious,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::cloned_instead_of_copied,
    clippy::explicit_iter_loop,
    clippy::implicit_clone,
    clippy::inconsistent_struct_constructor,
    clippy::manual_assert,
    clippy::manual_let_else,
    clippy::match_same_arms,
    clippy::needless_pass_by_value,
    clippy::semicolon_if_nothing_returned,
    clippy::uninlined_format_args,
    clippy::unnested_or_patterns,
    clippy::std_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::alloc_instead_of_core
)]
#![allow(
    clippy::mod_module_files,
    clippy::self_named_module_files,
    clippy::similar_names,
    clippy::too_many_arguments,
    clippy::struct_excessive_bools,
    clippy::fn_params_excessive_bools,
    clippy::type_complexity,
    clippy::must_use_candidate,
    clippy::assertions_on_constants,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::cast_lossless,
    clippy::panic_in_result_fn,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::module_name_repetitions,
    clippy::wildcard_imports,
    clippy::items_after_statements
)]

// =============================================================================
// Modules
// =============================================================================

pub mod buffer;
pub mod driver;
pub mod hal;
pub mod sync;

// Internal implementation details (pub(crate) only)
mod internal;

// Test utilities (only available during testing)
#[cfg(test)]
pub mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use buffer::{BufferPool, ReadyFrame, SlotState, SwapOutcome, load_block};
pub use driver::config::{
    ChainMode, CipherConfig, EngineConfig, FrequencyWord, RadioState, RfPath,
};
pub use driver::engine::{RadioCore, RadioCoreDefault, RadioCoreSmall};
pub use driver::error::{
    ConfigError, ConfigResult, Error, Result, RxError, StateError, TxError, TxResult, status_of,
};
pub use driver::events::EventSet;
pub use driver::isr::{ByteInterrupt, EventInterrupt};

#[cfg(feature = "soft-aes")]
pub use hal::SoftAes;
pub use hal::{
    BlockCipher, EventHook, FrontEnd, FrontEndError, HardwareState, LengthMode, MacPolicy, NoMac,
    NullCipher, OffModes, RadioPeripheral, WithFrontEnd,
};

/// Host-visible constants.
///
/// Status bytes returned to the host for each outcome (see
/// [`Error::status_code`]) and the repeat count that never stops.
pub mod constants {
    pub use crate::internal::constants::{
        DEFAULT_SLOT_SIZE, RC_ERR_BUFFER_SIZE_EXCEEDED, RC_NO_ERROR, RC_RF_BLOCKSIZE_INCOMPAT,
        RC_RF_MODE_INCOMPAT, RC_TEMP_ERR_BUFFER_NOT_AVAILABLE, RC_TX_DROPPED_PACKET, RC_TX_ERROR,
        REPEAT_FOREVER,
    };
}
