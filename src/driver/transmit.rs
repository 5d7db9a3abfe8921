//! Synchronous transmit operations.
//!
//! Every transmit installs a [`TxDescriptor`] over the caller's buffer,
//! requests TX and waits (yielding to the caller's [`EventHook`]) until the
//! byte interrupt has drained the descriptor. The descriptor is always removed
//! before the call returns, on success and on every failure path.
//!
//! # Transfer shapes
//!
//! | `len` | `repeat` | Fixed mode                         | Variable mode                   |
//! |-------|----------|------------------------------------|---------------------------------|
//! | 0     | 0        | `buf[0]` is the length, not sent   | `buf[0]` is the length, sent    |
//! | n     | 0        | `buf[..n]`, packet length `n`      | length byte prepended in place  |
//! | n     | r        | `buf[..n]` then `r` replays        | rejected                        |
//!
//! Chained transmit ([`begin_chained_transmit`](RadioCore::begin_chained_transmit))
//! streams a ring of blocks refilled with [`supply_block`](RadioCore::supply_block)
//! while the transfer runs.

use crate::buffer::stream::{TxDescriptor, byte_shuffle, repeat_total};
use crate::driver::config::{ChainMode, RadioState, RfPath};
use crate::driver::engine::{Framing, RadioCore};
use crate::driver::error::{Result, TxError};
use crate::hal::cipher::BlockCipher;
use crate::hal::mac::{EventHook, MacPolicy};
use crate::hal::radio::{HardwareState, LengthMode, RadioPeripheral};
use crate::internal::constants::{
    BLOCK_AVAILABLE, CBC_MAC_TAG_LEN, NATIVE_BLOCK_MODULUS, REPEAT_FOREVER, RF_MAX_TX_BLOCK,
};
use crate::internal::register::{RFIF_DONE, RFIF_TXUNF};

/// Where the payload sits in the caller buffer once framing is decided
struct Layout {
    /// First byte clocked out
    start: usize,
    /// Payload bytes, excluding a leading length byte
    payload: usize,
    /// A length byte precedes the payload
    length_byte: bool,
}

impl Layout {
    fn body(&self) -> usize {
        self.start + usize::from(self.length_byte)
    }

    fn wire_len(&self) -> u16 {
        (self.payload + usize::from(self.length_byte)) as u16
    }
}

impl<R, C, M, const N: usize> RadioCore<R, C, M, N>
where
    R: RadioPeripheral,
    C: BlockCipher,
    M: MacPolicy,
{
    /// Transmit `buf` and wait for it to leave the radio.
    ///
    /// # Arguments
    ///
    /// * `buf` - Payload, modified in place (length prefix, padding, cipher)
    /// * `len` - Payload length, or 0 if `buf[0]` carries it
    /// * `repeat` - Extra replays of `buf[offset..len]`, [`REPEAT_FOREVER`]
    ///   for an endless carrier
    /// * `offset` - Start of the replayed tail
    /// * `hook` - Serviced on every wait iteration
    ///
    /// Returns the number of bytes handed to the radio.
    ///
    /// # Errors
    ///
    /// Set-up errors are returned before the radio is touched. In-flight
    /// failures are returned after the radio has been recovered.
    pub fn begin_transmit<H: EventHook>(
        &self,
        buf: &mut [u8],
        len: u16,
        repeat: u16,
        offset: u16,
        hook: &mut H,
    ) -> Result<u32> {
        self.wait_transmit_idle(hook)?;

        let saved = Framing {
            mode: self.radio.length_mode(),
            packet_length: self.radio.packet_length(),
        };
        let cipher = self.cipher_config();

        if saved.mode == LengthMode::Infinite {
            return Err(TxError::ModeIncompatible.into());
        }
        if len == 0 && (repeat != 0 || offset != 0) {
            return Err(TxError::InvalidArgs.into());
        }
        if len != 0 && offset >= len {
            return Err(TxError::InvalidArgs.into());
        }
        if repeat != 0 && (saved.mode == LengthMode::Variable || cipher.out_enabled) {
            return Err(TxError::ModeIncompatible.into());
        }

        let variable = saved.mode == LengthMode::Variable;
        let mut layout = if len == 0 {
            let &n = buf.first().ok_or(TxError::BufferTooSmall)?;
            if n == 0 {
                return Err(TxError::InvalidLength.into());
            }
            if buf.len() < usize::from(n) + 1 {
                return Err(TxError::BufferTooSmall.into());
            }
            Layout {
                start: usize::from(!variable),
                payload: usize::from(n),
                length_byte: variable,
            }
        } else {
            if repeat == 0 && len > RF_MAX_TX_BLOCK {
                return Err(TxError::BlockSizeIncompatible.into());
            }
            let needed = usize::from(len) + usize::from(variable);
            if buf.len() < needed {
                return Err(TxError::BufferTooSmall.into());
            }
            Layout {
                start: 0,
                payload: usize::from(len),
                length_byte: variable,
            }
        };

        if cipher.out_enabled {
            let padded = layout.payload.div_ceil(C::BLOCK_SIZE) * C::BLOCK_SIZE;
            if padded > usize::from(RF_MAX_TX_BLOCK) {
                return Err(TxError::BlockSizeIncompatible.into());
            }
            if buf.len() < layout.body() + padded {
                return Err(TxError::BufferTooSmall.into());
            }
        }

        // Claimed before the buffer changes, so a busy cipher leaves it intact.
        let claimed = if cipher.out_enabled {
            Some(self.cipher.try_claim().ok_or(TxError::Busy)?)
        } else {
            None
        };

        // Framing is settled, the buffer may change from here on.
        if len != 0 && variable {
            byte_shuffle(buf, usize::from(len), 1);
            buf[0] = len as u8;
        }

        if let Some(mut c) = claimed {
            let body = layout.body();
            let padded = c
                .pad(&mut buf[body..], layout.payload)
                .ok_or(TxError::BufferTooSmall)?;
            let region = &mut buf[body..body + padded];
            if cipher.out_encrypt {
                c.encrypt(region, cipher.chain_mode);
            } else {
                c.decrypt(region, cipher.chain_mode);
            }
            drop(c);
            layout.payload = if cipher.chain_mode == ChainMode::CbcMac {
                CBC_MAC_TAG_LEN
            } else {
                padded
            };
            if layout.length_byte {
                buf[layout.start] = layout.payload as u8;
            }
        }

        let (descriptor, packet_length, mode) = if repeat == 0 {
            let packet_length = if variable {
                saved.packet_length
            } else {
                layout.payload as u8
            };
            (
                TxDescriptor::single(&mut buf[layout.start..], layout.wire_len()),
                packet_length,
                saved.mode,
            )
        } else {
            let forever = repeat == REPEAT_FOREVER;
            let total = if forever {
                0
            } else {
                repeat_total(len, repeat, offset).ok_or(TxError::InvalidLength)?
            };
            let mode = if forever || total > RF_MAX_TX_BLOCK {
                LengthMode::Infinite
            } else {
                LengthMode::Fixed
            };
            (
                TxDescriptor::repeating(buf, len, repeat, offset, total),
                (total % NATIVE_BLOCK_MODULUS) as u8,
                mode,
            )
        };

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "tx: {} bytes, repeat {}, offset {}",
            layout.wire_len(),
            repeat,
            offset
        );

        self.run_transfer(descriptor, packet_length, mode, saved, hook)
    }

    /// Stream `total_len` bytes out of a ring of blocks in `arena`.
    ///
    /// Each block is `block_length` bytes with a marker in byte 0 (see
    /// [`load_block`](crate::buffer::load_block)). Block 0 must be filled
    /// before the call; the rest can be supplied with
    /// [`supply_block`](Self::supply_block) from `hook` while the transfer
    /// runs. If the interrupt reaches a block that is still free the transfer
    /// stops with [`TxError::SupplyUnderrun`].
    pub fn begin_chained_transmit<H: EventHook>(
        &self,
        arena: &mut [u8],
        block_length: u16,
        total_len: u16,
        hook: &mut H,
    ) -> Result<u32> {
        self.wait_transmit_idle(hook)?;

        let saved = Framing {
            mode: self.radio.length_mode(),
            packet_length: self.radio.packet_length(),
        };
        if saved.mode != LengthMode::Fixed || self.cipher_config().out_enabled {
            return Err(TxError::ModeIncompatible.into());
        }
        if total_len == 0 {
            return Err(TxError::InvalidLength.into());
        }
        let block = usize::from(block_length);
        if !(2..=usize::from(NATIVE_BLOCK_MODULUS)).contains(&block) {
            return Err(TxError::BlockSizeIncompatible.into());
        }
        let count = arena.len() / block;
        if count == 0 || count > usize::from(u8::MAX) {
            return Err(TxError::BlockSizeIncompatible.into());
        }
        if arena[0] == BLOCK_AVAILABLE {
            return Err(TxError::BufferNotAvailable.into());
        }

        let mode = if total_len > RF_MAX_TX_BLOCK {
            LengthMode::Infinite
        } else {
            LengthMode::Fixed
        };
        let descriptor =
            TxDescriptor::chained(&mut arena[..count * block], block_length, count as u8, total_len);

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "tx chained: {} bytes over {} blocks of {}",
            total_len,
            count,
            block_length
        );

        self.run_transfer(
            descriptor,
            (total_len % NATIVE_BLOCK_MODULUS) as u8,
            mode,
            saved,
            hook,
        )
    }

    /// Copy the next chunk of a chained transmit into the next free block.
    ///
    /// Returns the number of bytes queued. [`TxError::BufferNotAvailable`]
    /// means the ring is full; call again after the interrupt frees a block.
    pub fn supply_block(&self, data: &[u8]) -> Result<usize> {
        let queued = self.control.with(|c| match c.tx.as_mut() {
            Some(tx) => tx.supply(data),
            None => Err(TxError::NoTransfer),
        })?;
        Ok(queued)
    }

    fn wait_transmit_idle<H: EventHook>(&self, hook: &mut H) -> Result<()> {
        for _ in 0..self.config.tx_busy_polls {
            if self.transmitter_free() {
                return Ok(());
            }
            hook.process_events();
        }
        if self.transmitter_free() {
            Ok(())
        } else {
            Err(TxError::Busy.into())
        }
    }

    /// No descriptor installed, and the hardware is not in the middle of
    /// someone else's packet. A keyed carrier in Transmitting state is free.
    fn transmitter_free(&self) -> bool {
        let (installed, state) = self.control.with_ref(|c| (c.tx.is_some(), c.state));
        !installed
            && (state == RadioState::Transmitting
                || self.radio.hardware_state() != HardwareState::Transmit)
    }

    fn transfer_finished(&self) -> bool {
        self.control
            .with_ref(|c| c.tx.as_ref().is_none_or(|tx| tx.finished))
    }

    fn run_transfer<H: EventHook>(
        &self,
        descriptor: TxDescriptor,
        packet_length: u8,
        mode: LengthMode,
        saved: Framing,
        hook: &mut H,
    ) -> Result<u32> {
        self.radio.set_packet_length(packet_length);
        self.radio.set_length_mode(mode);
        self.control.with(|c| c.tx = Some(descriptor));
        self.radio.enable_byte_interrupt();
        self.radio.clear_events(RFIF_DONE);
        self.radio.unmask_events(RFIF_DONE | RFIF_TXUNF);
        if self.control.with_ref(|c| c.amplifier) {
            self.radio.select_rf_path(RfPath::Transmit);
        }
        self.radio.request_state(RadioState::Transmitting);

        let entered = self.wait_transmit_entry(hook);
        let drained = if entered {
            self.wait_transmit_drain(hook)
        } else {
            Ok(())
        };

        let descriptor = critical_section::with(|_| {
            self.radio.clear_events(RFIF_DONE);
            self.control.with(|c| c.tx.take())
        });
        self.radio.set_packet_length(saved.packet_length);
        self.radio.set_length_mode(saved.mode);
        let state = self.state();
        if state == RadioState::Idle {
            self.radio.mask_events(RFIF_DONE);
        }
        self.route_front_end(state);

        let descriptor = descriptor.ok_or(TxError::NoTransfer)?;
        if let Some(outcome) = descriptor.outcome {
            #[cfg(feature = "defmt")]
            defmt::warn!("tx failed after {} bytes: {}", descriptor.sent(), outcome);
            return Err(outcome.into());
        }
        if !entered {
            #[cfg(feature = "defmt")]
            defmt::warn!("tx: radio never entered TX");
            return Err(TxError::NeverEnteredTx.into());
        }
        drained?;
        Ok(descriptor.sent())
    }

    fn wait_transmit_entry<H: EventHook>(&self, hook: &mut H) -> bool {
        for _ in 0..self.config.tx_entry_polls {
            if self.radio.hardware_state() == HardwareState::Transmit || self.transfer_finished() {
                return true;
            }
            hook.process_events();
        }
        self.radio.hardware_state() == HardwareState::Transmit || self.transfer_finished()
    }

    fn wait_transmit_drain<H: EventHook>(&self, hook: &mut H) -> Result<()> {
        let mut polls: u32 = 0;
        loop {
            if self.transfer_finished() || self.radio.hardware_state() != HardwareState::Transmit {
                return Ok(());
            }
            if self.config.tx_drain_polls.is_some_and(|limit| polls >= limit) {
                let _ = self.force_reidle();
                return Err(TxError::Timeout.into());
            }
            polls = polls.saturating_add(1);
            hook.process_events();
        }
    }
}
