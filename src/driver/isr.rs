//! Interrupt handlers
//!
//! The radio raises two interrupts. The byte interrupt fires once per byte
//! moved through the data port; the event interrupt fires on sync word,
//! packet done, timeout and FIFO faults. Neither ever blocks beyond the
//! bounded recovery spin and neither returns an error: faults are recovered
//! in place and reported through the pending-event word.
//!
//! # Usage
//!
//! ```ignore
//! #[interrupt]
//! fn RFTXRX() {
//!     RADIO.byte_interrupt().service();
//! }
//!
//! #[interrupt]
//! fn RF() {
//!     RADIO.event_interrupt().service();
//! }
//! ```

use crate::buffer::pool::SwapOutcome;
use crate::buffer::stream::{RxFraming, TxStep};
use crate::driver::engine::RadioCore;
use crate::driver::error::TxError;
use crate::hal::cipher::BlockCipher;
use crate::hal::mac::MacPolicy;
use crate::hal::radio::{HardwareState, LengthMode, RadioPeripheral};
use crate::internal::register::{
    EVT_FRAME_READY, EVT_SUPPLY_UNDERRUN, RFIF_DONE, RFIF_FRAME_END, RFIF_RXOVF, RFIF_SFD,
    RFIF_TIMEOUT, RFIF_TXUNF,
};

/// Handle for the per-byte data interrupt
pub struct ByteInterrupt<'a, R, C, M, const N: usize> {
    core: &'a RadioCore<R, C, M, N>,
}

/// Handle for the radio event interrupt
pub struct EventInterrupt<'a, R, C, M, const N: usize> {
    core: &'a RadioCore<R, C, M, N>,
}

impl<R, C, M, const N: usize> ByteInterrupt<'_, R, C, M, N>
where
    R: RadioPeripheral,
    C: BlockCipher,
    M: MacPolicy,
{
    /// Move one byte between the data port and the current buffer.
    #[inline]
    pub fn service(&self) {
        self.core.on_byte();
    }
}

impl<R, C, M, const N: usize> EventInterrupt<'_, R, C, M, N>
where
    R: RadioPeripheral,
    C: BlockCipher,
    M: MacPolicy,
{
    /// Dispatch and clear the pending radio event flags.
    #[inline]
    pub fn service(&self) {
        self.core.on_event();
    }
}

impl<R, C, M, const N: usize> RadioCore<R, C, M, N>
where
    R: RadioPeripheral,
    C: BlockCipher,
    M: MacPolicy,
{
    /// Handle to call from the byte interrupt vector
    pub fn byte_interrupt(&self) -> ByteInterrupt<'_, R, C, M, N> {
        ByteInterrupt { core: self }
    }

    /// Handle to call from the event interrupt vector
    pub fn event_interrupt(&self) -> EventInterrupt<'_, R, C, M, N> {
        EventInterrupt { core: self }
    }

    // =========================================================================
    // Byte interrupt
    // =========================================================================

    pub(crate) fn on_byte(&self) {
        match self.radio.hardware_state() {
            HardwareState::Receive => self.receive_byte(),
            HardwareState::Transmit => self.transmit_byte(),
            HardwareState::Idle | HardwareState::Transitional => {}
        }
    }

    fn receive_byte(&self) {
        if self.control.with(|c| c.rx.before_byte()) == RxFraming::Fixed {
            self.radio.set_length_mode(LengthMode::Fixed);
        }
        self.pool.write_byte(self.radio.read_byte());
        if let RxFraming::Rearm { packet_length } = self.control.with(|c| c.rx.after_byte()) {
            self.radio.set_packet_length(packet_length);
            self.radio.set_length_mode(LengthMode::Infinite);
        }
    }

    fn transmit_byte(&self) {
        let step = self.control.with(|c| c.tx.as_mut().map(|tx| tx.advance()));
        match step {
            Some(TxStep::Send {
                byte,
                leave_infinite,
            }) => {
                if leave_infinite {
                    self.radio.set_length_mode(LengthMode::Fixed);
                }
                self.radio.write_byte(byte);
            }
            Some(TxStep::Underrun) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("chained transmit starved");

                self.mac.with(|mac| mac.notify_starvation());
                self.pending.raise(EVT_SUPPLY_UNDERRUN);
                let _ = self.force_reidle();
            }
            Some(TxStep::Exhausted) | None => {}
        }
    }

    // =========================================================================
    // Event interrupt
    // =========================================================================

    pub(crate) fn on_event(&self) {
        let flags = self.radio.pending_events();

        // A frame end while transmitting belongs to the transmit loop, its
        // done and timeout bits are not latched.
        let transmit_side = flags & RFIF_FRAME_END != 0 && {
            let done = flags & RFIF_DONE != 0;
            let tx_installed = self.control.with(|c| match c.tx.as_mut() {
                Some(tx) => {
                    tx.finished |= done;
                    true
                }
                None => false,
            });
            tx_installed || self.radio.hardware_state() == HardwareState::Transmit
        };
        let reported = if transmit_side {
            flags & !(RFIF_DONE | RFIF_TIMEOUT)
        } else {
            flags
        };
        self.pending.raise(u16::from(reported));

        if flags & RFIF_SFD != 0 {
            let stamp = self.mac.with_ref(|mac| mac.timestamp());
            self.control.with(|c| c.last_receive = stamp);
            self.radio.clear_events(RFIF_SFD);
        }

        if flags & RFIF_FRAME_END != 0 {
            if !transmit_side {
                self.complete_frame();
            }
            self.radio.clear_events(RFIF_DONE | RFIF_TIMEOUT);
        }

        if flags & RFIF_RXOVF != 0 {
            #[cfg(feature = "defmt")]
            defmt::warn!("rx overflow");

            let _ = self.force_reidle();
            self.radio.clear_events(RFIF_RXOVF);
        }

        if flags & RFIF_TXUNF != 0 {
            #[cfg(feature = "defmt")]
            defmt::warn!("tx underflow");

            self.control.with(|c| {
                if let Some(tx) = c.tx.as_mut() {
                    tx.finished = true;
                    tx.outcome.get_or_insert(TxError::TxUnderflow);
                }
            });
            let _ = self.force_reidle();
            self.radio.clear_events(RFIF_TXUNF);
        }
    }

    /// Swap a finished inbound frame to the consumer, deciphering it first.
    ///
    /// The cipher runs with interrupts enabled. If the main context holds
    /// it, the frame cannot be deciphered and is dropped.
    fn complete_frame(&self) {
        let cipher = self.cipher_config();
        let claimed = if cipher.in_enabled {
            let Some(guard) = self.cipher.try_claim() else {
                #[cfg(feature = "defmt")]
                defmt::debug!("rx frame dropped, cipher in use");

                self.pool.discard_active();
                return;
            };
            Some(guard)
        } else {
            None
        };
        let skip = usize::from(self.radio.length_mode() == LengthMode::Variable);
        let outcome = self.pool.try_swap_on_frame_done(|frame| {
            let Some(mut c) = claimed else {
                return;
            };
            if frame.len() <= skip {
                return;
            }
            let body = &mut frame[skip..];
            if cipher.in_encrypt {
                c.encrypt(body, cipher.chain_mode);
            } else {
                c.decrypt(body, cipher.chain_mode);
            }
        });
        match outcome {
            SwapOutcome::Swapped(_) => self.pending.raise(EVT_FRAME_READY),
            SwapOutcome::Dropped => {
                #[cfg(feature = "defmt")]
                defmt::debug!("rx frame dropped, consumer holds the other slot");
            }
        }
    }
}
