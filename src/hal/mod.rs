//! Hardware Abstraction Layer
//!
//! The trait boundaries the engine consumes, plus the concrete adapters that
//! ship with the crate.
//!
//! # Modules
//!
//! - [`radio`]: radio peripheral register access
//! - [`cipher`]: in-place payload block cipher
//! - [`mac`]: MAC policy and cooperative event hook
//! - [`front_end`]: external PA/LNA path switch on GPIO
//!
//! # GPIO Integration
//!
//! Front-end pins use `embedded_hal::digital::OutputPin` directly. Pass any
//! output pin from your HAL.

pub mod cipher;
pub mod front_end;
pub mod mac;
pub mod radio;

// Re-export commonly used types
#[cfg(feature = "soft-aes")]
pub use cipher::SoftAes;
pub use cipher::{BlockCipher, NullCipher};
pub use front_end::{FrontEnd, FrontEndError, WithFrontEnd};
pub use mac::{EventHook, MacPolicy, NoMac};
pub use radio::{HardwareState, LengthMode, OffModes, RadioPeripheral};
