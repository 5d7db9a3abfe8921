//! Pending event handling for the transceiver engine.
//!
//! The event interrupt ORs every hardware flag it sees into one pending word,
//! and adds software-only conditions above bit 7. The main context drains the
//! word with [`RadioCore::poll_events`](crate::driver::engine::RadioCore::poll_events)
//! and gets an [`EventSet`] back.

use crate::internal::register::{
    EVT_FRAME_READY, EVT_RECOVERY_STALLED, EVT_SUPPLY_UNDERRUN, RFIF_CCA, RFIF_DONE, RFIF_RXOVF,
    RFIF_SFD, RFIF_TIMEOUT, RFIF_TXUNF,
};

// =============================================================================
// Event Set
// =============================================================================

/// Events seen since the previous drain.
///
/// # Example
///
/// ```ignore
/// let events = core.poll_events();
/// if events.frame_ready {
///     if let Some(frame) = core.read_ready_slot() {
///         host.send(&frame);
///     }
/// }
/// if events.has_error() {
///     host.report_drop();
/// }
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EventSet {
    /// Sync word detected, receive timestamp latched
    pub sync_detected: bool,
    /// Clear channel assessment failed
    pub cca_failed: bool,
    /// Packet done (receive or transmit)
    pub done: bool,
    /// Receive timeout
    pub timeout: bool,
    /// RX FIFO overflow, receiver restarted
    pub rx_overflow: bool,
    /// TX FIFO underflow, transmit dropped
    pub tx_underflow: bool,
    /// A receive slot was handed to the consumer
    pub frame_ready: bool,
    /// Chained transmit starved, transmit dropped
    pub supply_underrun: bool,
    /// Recovery gave up waiting for the hardware
    pub recovery_stalled: bool,
}

impl EventSet {
    /// Create from the raw pending word
    #[inline]
    pub fn from_raw(bits: u16) -> Self {
        let hw = bits as u8;
        Self {
            sync_detected: (hw & RFIF_SFD) != 0,
            cca_failed: (hw & RFIF_CCA) != 0,
            done: (hw & RFIF_DONE) != 0,
            timeout: (hw & RFIF_TIMEOUT) != 0,
            rx_overflow: (hw & RFIF_RXOVF) != 0,
            tx_underflow: (hw & RFIF_TXUNF) != 0,
            frame_ready: (bits & EVT_FRAME_READY) != 0,
            supply_underrun: (bits & EVT_SUPPLY_UNDERRUN) != 0,
            recovery_stalled: (bits & EVT_RECOVERY_STALLED) != 0,
        }
    }

    /// Convert back to the raw pending word
    #[inline]
    pub fn to_raw(&self) -> u16 {
        let mut hw = 0u8;
        if self.sync_detected {
            hw |= RFIF_SFD;
        }
        if self.cca_failed {
            hw |= RFIF_CCA;
        }
        if self.done {
            hw |= RFIF_DONE;
        }
        if self.timeout {
            hw |= RFIF_TIMEOUT;
        }
        if self.rx_overflow {
            hw |= RFIF_RXOVF;
        }
        if self.tx_underflow {
            hw |= RFIF_TXUNF;
        }
        let mut val = u16::from(hw);
        if self.frame_ready {
            val |= EVT_FRAME_READY;
        }
        if self.supply_underrun {
            val |= EVT_SUPPLY_UNDERRUN;
        }
        if self.recovery_stalled {
            val |= EVT_RECOVERY_STALLED;
        }
        val
    }

    /// Check if any event occurred
    #[inline]
    pub fn any(&self) -> bool {
        self.to_raw() != 0
    }

    /// Check if any error occurred
    ///
    /// Every error here has already been recovered by the engine; the flag
    /// only reports that an in-flight frame or transfer was lost.
    #[inline]
    pub fn has_error(&self) -> bool {
        self.rx_overflow || self.tx_underflow || self.supply_underrun || self.recovery_stalled
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
