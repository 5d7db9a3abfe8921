//! Peripheral event-flag bit layout
//!
//! The radio reports frame and error conditions through one 8-bit flag
//! register (write-zero-to-clear) with a matching mask register selecting
//! which flags raise the event interrupt. Software-only conditions the engine
//! reports to the main context sit above bit 7 of the pending-event word.

// =============================================================================
// Hardware Flags (RFIF / RFIM)
// =============================================================================

/// Start of frame delimiter (sync word) detected
pub const RFIF_SFD: u8 = 1 << 0;

/// Clear channel assessment failed
pub const RFIF_CCA: u8 = 1 << 1;

/// Packet received or transmitted
pub const RFIF_DONE: u8 = 1 << 4;

/// Receive timeout
pub const RFIF_TIMEOUT: u8 = 1 << 5;

/// Receive FIFO overflow
pub const RFIF_RXOVF: u8 = 1 << 6;

/// Transmit FIFO underflow
pub const RFIF_TXUNF: u8 = 1 << 7;

/// Flags that end a receive frame
pub const RFIF_FRAME_END: u8 = RFIF_DONE | RFIF_RXOVF | RFIF_TIMEOUT;

/// Flags armed at start-up: underflow, overflow, done and frame sync
pub const RFIM_DEFAULT: u8 = RFIF_TXUNF | RFIF_RXOVF | RFIF_DONE | RFIF_SFD;

// =============================================================================
// Software Flags (pending-event word, bits 8..)
// =============================================================================

/// A receive slot was swapped and is ready for the consumer
pub const EVT_FRAME_READY: u16 = 1 << 8;

/// Chained transmit ran out of supplied blocks
pub const EVT_SUPPLY_UNDERRUN: u16 = 1 << 9;

/// `force_reidle` gave up waiting for the hardware
pub const EVT_RECOVERY_STALLED: u16 = 1 << 10;
