//! Centralized Constants
//!
//! This module provides a single source of truth for all magic numbers and
//! configuration constants used throughout the transceiver engine.
//!
//! # Organization
//!
//! Constants are grouped by category:
//! - **Block sizes**: native framing limits and chained-mode thresholds
//! - **Buffers**: receive slot capacity and chained-block markers
//! - **Cipher**: block granularity and authentication tag size
//! - **Timing**: bounded poll counts for main-context waits and recovery
//! - **Clock**: reference crystal used for frequency programming
//! - **Status codes**: single-byte replies understood by the host
//!
//! # Note
//!
//! Event-flag bit definitions live in `internal::register` next to the
//! other peripheral-facing bit layouts.

// =============================================================================
// Block Sizes
// =============================================================================

/// Largest payload the peripheral frames natively in one transmit block
pub const RF_MAX_TX_BLOCK: u16 = 255;

/// Largest payload the peripheral frames natively in one receive block
pub const RF_MAX_RX_BLOCK: u16 = 255;

/// Modulus of the peripheral's 8-bit packet length counter
pub const NATIVE_BLOCK_MODULUS: u16 = 256;

/// Remaining-byte count at which chained transmit mode is switched off so the
/// final short block terminates on the programmed packet length
pub const INFINITE_EXIT_THRESHOLD: u16 = 255;

/// Repeat count meaning "repeat until the radio is forced out of TX"
pub const REPEAT_FOREVER: u16 = 0xFFFF;

// =============================================================================
// Buffers
// =============================================================================

/// Default capacity of each receive slot in bytes
pub const DEFAULT_SLOT_SIZE: usize = 512;

/// Number of receive slots in the double buffer
pub const RX_SLOT_COUNT: usize = 2;

/// Marker byte of a chained transmit block that is empty and may be refilled
pub const BLOCK_AVAILABLE: u8 = 0x00;

// =============================================================================
// Cipher
// =============================================================================

/// Block granularity of the payload cipher
pub const CIPHER_BLOCK_SIZE: usize = 16;

/// Length of the authentication tag sent instead of the payload in CBC-MAC mode
pub const CBC_MAC_TAG_LEN: usize = 16;

// =============================================================================
// Timing Constants
// =============================================================================

/// Polls (each yielding to the event hook) while waiting for a previous
/// transmit to drain before a new one may start
pub const TX_BUSY_POLLS: u32 = 60_000;

/// Polls while waiting for the hardware to confirm it entered TX
pub const TX_ENTRY_POLLS: u32 = 60_000;

/// Spins while waiting for the hardware to confirm a forced state change
pub const REIDLE_SPIN_LIMIT: u32 = 60_000;

// =============================================================================
// Clock Frequencies
// =============================================================================

/// Reference crystal frequency in Hz
pub const DEFAULT_CRYSTAL_HZ: u32 = 24_000_000;

/// Largest value the 24-bit frequency control word can hold
pub const FREQ_WORD_MAX: u32 = 0x00FF_FFFF;

// =============================================================================
// Status Codes
// =============================================================================

/// Operation completed
pub const RC_NO_ERROR: u8 = 0x00;

/// Transmit dropped mid-transfer (underrun or forced recovery)
pub const RC_TX_DROPPED_PACKET: u8 = 0xEC;

/// Transmit failed to start or complete
pub const RC_TX_ERROR: u8 = 0xED;

/// Requested block size does not fit the current framing
pub const RC_RF_BLOCKSIZE_INCOMPAT: u8 = 0xEE;

/// Requested operation does not fit the current framing mode
pub const RC_RF_MODE_INCOMPAT: u8 = 0xEF;

/// Buffer temporarily unavailable, the host should retry
pub const RC_TEMP_ERR_BUFFER_NOT_AVAILABLE: u8 = 0xFE;

/// Data exceeds the buffer it was aimed at
pub const RC_ERR_BUFFER_SIZE_EXCEEDED: u8 = 0xFF;
