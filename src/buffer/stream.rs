//! Byte streaming state for transmit and chained receive
//!
//! [`TxDescriptor`] is the cursor the byte interrupt walks over a caller's
//! buffer. It covers three shapes of transfer:
//!
//! - **single block**: bytes `0..len` once
//! - **repeat**: bytes `0..len`, then `offset..len` again `repeat` times
//! - **chained**: a ring of equally sized blocks, byte 0 of each one a marker
//!   (`0x00` free, anything else filled) refilled by the main context while
//!   the interrupt drains the others
//!
//! For repeat and chained transfers the peripheral runs in infinite length
//! mode and is switched back to fixed mode when exactly
//! [`INFINITE_EXIT_THRESHOLD`] bytes remain, so the programmed packet length
//! (`total % 256`) ends the final partial block.

use crate::driver::error::{TxError, TxResult};
use crate::internal::constants::{
    BLOCK_AVAILABLE, INFINITE_EXIT_THRESHOLD, NATIVE_BLOCK_MODULUS, REPEAT_FOREVER,
};

/// Move `buf[..len]` up by `offset` bytes, highest byte first.
///
/// Overlapping ranges are safe because every byte is read before anything
/// below it is overwritten. Bytes `..offset` keep their old values.
///
/// # Panics
///
/// Panics if `len + offset > buf.len()`.
pub fn byte_shuffle(buf: &mut [u8], len: usize, offset: usize) {
    for i in (0..len).rev() {
        buf[i + offset] = buf[i];
    }
}

/// Total bytes clocked out by a repeat transfer
///
/// `len + repeat * (len - offset)`, or `None` if it does not fit `u16`.
pub const fn repeat_total(len: u16, repeat: u16, offset: u16) -> Option<u16> {
    if offset > len {
        return None;
    }
    let total = len as u32 + repeat as u32 * (len - offset) as u32;
    if total > u16::MAX as u32 {
        None
    } else {
        Some(total as u16)
    }
}

/// Copy `data` into block `index` of a chained arena and mark it filled.
///
/// The marker byte is set to `data.len()`, so empty chunks are rejected.
pub fn load_block(arena: &mut [u8], block_length: u16, index: u8, data: &[u8]) -> TxResult<()> {
    let block_length = usize::from(block_length);
    if block_length < 2 || block_length > usize::from(NATIVE_BLOCK_MODULUS) {
        return Err(TxError::BlockSizeIncompatible);
    }
    if data.is_empty() {
        return Err(TxError::InvalidLength);
    }
    if data.len() > block_length - 1 {
        return Err(TxError::BufferSizeExceeded);
    }
    let start = usize::from(index) * block_length;
    let block = arena
        .get_mut(start..start + block_length)
        .ok_or(TxError::BlockSizeIncompatible)?;
    block[1..=data.len()].copy_from_slice(data);
    block[0] = data.len() as u8;
    Ok(())
}

/// One step of the transmit byte interrupt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TxStep {
    /// Write `byte`. Switch the peripheral to fixed length first if
    /// `leave_infinite` is set.
    Send { byte: u8, leave_infinite: bool },
    /// Next chained block was not supplied in time
    Underrun,
    /// Nothing left to send
    Exhausted,
}

/// Transmit cursor over a caller buffer.
///
/// The buffer is borrowed for the synchronous duration of the transmit call
/// that installs the descriptor, and the descriptor is removed before that
/// call returns, so the raw pointer never outlives the borrow.
#[derive(Debug)]
pub(crate) struct TxDescriptor {
    base: *mut u8,
    span: usize,
    cursor: u16,
    block_length: u16,
    repeat_count: u16,
    repeat_offset: u16,
    total_remaining: u16,
    forever: bool,
    infinite_mode: bool,
    chained: bool,
    block_index: u8,
    block_count: u8,
    fill_index: u8,
    sent: u32,
    pub(crate) finished: bool,
    pub(crate) outcome: Option<TxError>,
}

impl TxDescriptor {
    /// Single pass over `buf[..len]`
    pub(crate) fn single(buf: &mut [u8], len: u16) -> Self {
        Self::with_shape(buf, len, 0, 0, len, false, false)
    }

    /// `buf[..len]` followed by `repeat` replays of `buf[offset..len]`.
    ///
    /// `total` is the precomputed byte count; it is ignored for
    /// [`REPEAT_FOREVER`].
    pub(crate) fn repeating(buf: &mut [u8], len: u16, repeat: u16, offset: u16, total: u16) -> Self {
        let forever = repeat == REPEAT_FOREVER;
        Self::with_shape(buf, len, repeat, offset, total, forever, true)
    }

    /// Ring of `arena.len() / block_length` chained blocks carrying `total`
    /// payload bytes. Block 0 must already be filled.
    pub(crate) fn chained(arena: &mut [u8], block_length: u16, block_count: u8, total: u16) -> Self {
        let mut desc = Self::with_shape(arena, block_length, 0, 0, total, false, true);
        desc.chained = true;
        desc.cursor = 1;
        desc.block_count = block_count;
        desc.fill_index = (1..block_count)
            .find(|&i| desc.marker(i) == BLOCK_AVAILABLE)
            .unwrap_or(0);
        desc
    }

    fn with_shape(
        buf: &mut [u8],
        block_length: u16,
        repeat: u16,
        offset: u16,
        total: u16,
        forever: bool,
        infinite_mode: bool,
    ) -> Self {
        Self {
            base: buf.as_mut_ptr(),
            span: buf.len(),
            cursor: 0,
            block_length,
            repeat_count: repeat,
            repeat_offset: offset,
            total_remaining: total,
            forever,
            infinite_mode,
            chained: false,
            block_index: 0,
            block_count: 1,
            fill_index: 0,
            sent: 0,
            finished: false,
            outcome: None,
        }
    }

    fn block_start(&self, index: u8) -> usize {
        usize::from(index) * usize::from(self.block_length)
    }

    fn marker(&self, index: u8) -> u8 {
        let pos = self.block_start(index);
        if pos >= self.span {
            return BLOCK_AVAILABLE;
        }
        // SAFETY: `pos < span` and the buffer outlives the descriptor.
        unsafe { *self.base.add(pos) }
    }

    fn set_marker(&mut self, index: u8, value: u8) {
        let pos = self.block_start(index);
        if pos < self.span {
            // SAFETY: `pos < span` and the buffer outlives the descriptor.
            unsafe { *self.base.add(pos) = value };
        }
    }

    /// Produce the next byte for the peripheral (byte interrupt only).
    pub(crate) fn advance(&mut self) -> TxStep {
        if self.finished || (!self.forever && self.total_remaining == 0) {
            return TxStep::Exhausted;
        }

        let mut leave_infinite = false;
        if self.infinite_mode {
            if self.cursor >= self.block_length {
                if self.repeat_count > 0 {
                    if !self.forever {
                        self.repeat_count -= 1;
                    }
                    self.cursor = self.repeat_offset;
                } else if self.chained {
                    self.set_marker(self.block_index, BLOCK_AVAILABLE);
                    self.block_index = (self.block_index + 1) % self.block_count;
                    if self.marker(self.block_index) == BLOCK_AVAILABLE {
                        self.finished = true;
                        self.outcome = Some(TxError::SupplyUnderrun);
                        return TxStep::Underrun;
                    }
                    self.cursor = 1;
                } else {
                    return TxStep::Exhausted;
                }
            }
            if !self.forever {
                leave_infinite = self.total_remaining == INFINITE_EXIT_THRESHOLD;
            }
        }
        if !self.forever {
            self.total_remaining -= 1;
        }

        let pos = self.block_start(self.block_index) + usize::from(self.cursor);
        if pos >= self.span || (!self.infinite_mode && self.cursor >= self.block_length) {
            return TxStep::Exhausted;
        }
        // SAFETY: `pos < span` and the buffer outlives the descriptor.
        let byte = unsafe { *self.base.add(pos) };
        self.cursor += 1;
        self.sent += 1;
        TxStep::Send {
            byte,
            leave_infinite,
        }
    }

    /// Copy the next chained chunk into the next free block (main context).
    pub(crate) fn supply(&mut self, data: &[u8]) -> TxResult<usize> {
        if !self.chained || self.finished {
            return Err(TxError::NoTransfer);
        }
        if data.is_empty() {
            return Ok(0);
        }
        if data.len() > usize::from(self.block_length) - 1 {
            return Err(TxError::BufferSizeExceeded);
        }
        let index = self.fill_index;
        if self.marker(index) != BLOCK_AVAILABLE || index == self.block_index {
            return Err(TxError::BufferNotAvailable);
        }
        let start = self.block_start(index);
        // SAFETY: `start + block_length <= span` for every ring index, and
        // the interrupt never reads a block whose marker is free.
        unsafe {
            core::ptr::copy_nonoverlapping(data.as_ptr(), self.base.add(start + 1), data.len());
            *self.base.add(start) = data.len() as u8;
        }
        self.fill_index = (index + 1) % self.block_count;
        Ok(data.len())
    }

    /// Bytes handed to the peripheral so far
    pub(crate) fn sent(&self) -> u32 {
        self.sent
    }

    /// Bytes still to send, `None` when repeating forever
    pub(crate) fn remaining(&self) -> Option<u16> {
        (!self.forever).then_some(self.total_remaining)
    }
}

/// Inbound chained-mode bookkeeping.
///
/// While active the peripheral runs in infinite mode and the counter tracks
/// the configured logical length. Fixed mode takes over below one native
/// block, and the counter reloads when a frame ends so the next frame starts
/// in infinite mode again.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct RxStream {
    pub(crate) infinite: bool,
    pub(crate) large_len: u16,
    total_remaining: u16,
}

/// Framing change requested by the receive byte interrupt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RxFraming {
    /// Leave framing alone
    Keep,
    /// Switch to fixed length for the final native block
    Fixed,
    /// Reload: program `packet_length` and switch back to infinite mode
    Rearm { packet_length: u8 },
}

impl RxStream {
    pub(crate) const fn new() -> Self {
        Self {
            infinite: false,
            large_len: 0,
            total_remaining: 0,
        }
    }

    /// Enable chained receive for frames of `len` bytes
    pub(crate) fn enable(&mut self, len: u16) {
        self.infinite = true;
        self.large_len = len;
        self.total_remaining = len;
    }

    /// Disable chained receive
    pub(crate) fn disable(&mut self) {
        self.infinite = false;
        self.total_remaining = 0;
    }

    /// Restart the counter for a fresh frame
    pub(crate) fn restart(&mut self) {
        if self.infinite {
            self.total_remaining = self.large_len;
        }
    }

    /// Packet length programmed alongside infinite mode
    pub(crate) fn packet_length(&self) -> u8 {
        (self.large_len % NATIVE_BLOCK_MODULUS) as u8
    }

    /// Account for the byte about to be stored
    pub(crate) fn before_byte(&mut self) -> RxFraming {
        if !self.infinite {
            return RxFraming::Keep;
        }
        let before = self.total_remaining;
        self.total_remaining = before.wrapping_sub(1);
        if before < NATIVE_BLOCK_MODULUS {
            RxFraming::Fixed
        } else {
            RxFraming::Keep
        }
    }

    /// Reload after the byte that completed the logical frame
    pub(crate) fn after_byte(&mut self) -> RxFraming {
        if self.infinite && self.total_remaining == 0 {
            self.total_remaining = self.large_len;
            RxFraming::Rearm {
                packet_length: self.packet_length(),
            }
        } else {
            RxFraming::Keep
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use super::*;
    use proptest::prelude::*;
    use std::vec;
    use std::vec::Vec;

    fn drain(desc: &mut TxDescriptor) -> (Vec<u8>, Vec<usize>) {
        let mut out = Vec::new();
        let mut exits = Vec::new();
        loop {
            match desc.advance() {
                TxStep::Send {
                    byte,
                    leave_infinite,
                } => {
                    if leave_infinite {
                        exits.push(out.len());
                    }
                    out.push(byte);
                }
                TxStep::Underrun | TxStep::Exhausted => return (out, exits),
            }
        }
    }

    #[test]
    fn shuffle_moves_up_by_one() {
        let mut buf = [1u8, 2, 3, 0];
        byte_shuffle(&mut buf, 3, 1);
        assert_eq!(&buf[1..], &[1, 2, 3]);
    }

    #[test]
    fn shuffle_zero_offset_is_noop() {
        let mut buf = [5u8, 6, 7];
        byte_shuffle(&mut buf, 3, 0);
        assert_eq!(buf, [5, 6, 7]);
    }

    #[test]
    fn repeat_total_formula() {
        assert_eq!(repeat_total(3, 2, 1), Some(7));
        assert_eq!(repeat_total(10, 0, 0), Some(10));
        assert_eq!(repeat_total(255, 300, 0), None);
        assert_eq!(repeat_total(3, 1, 4), None);
    }

    #[test]
    fn repeat_with_offset_replays_tail() {
        let mut buf = [0xAA, 0xBB, 0xCC];
        let total = repeat_total(3, 2, 1).unwrap();
        let mut desc = TxDescriptor::repeating(&mut buf, 3, 2, 1, total);
        let (out, _) = drain(&mut desc);
        assert_eq!(out, vec![0xAA, 0xBB, 0xCC, 0xBB, 0xCC, 0xBB, 0xCC]);
        assert_eq!(desc.sent(), 7);
        assert_eq!(desc.remaining(), Some(0));
    }

    #[test]
    fn single_pass_stops_at_length() {
        let mut buf = [1u8, 2, 3, 4];
        let mut desc = TxDescriptor::single(&mut buf, 3);
        let (out, exits) = drain(&mut desc);
        assert_eq!(out, vec![1, 2, 3]);
        assert!(exits.is_empty());
    }

    #[test]
    fn forever_keeps_replaying() {
        let mut buf = [1u8, 2];
        let mut desc = TxDescriptor::repeating(&mut buf, 2, REPEAT_FOREVER, 0, 0);
        let mut out = Vec::new();
        for _ in 0..1000 {
            match desc.advance() {
                TxStep::Send {
                    byte,
                    leave_infinite,
                } => {
                    assert!(!leave_infinite);
                    out.push(byte);
                }
                other => panic!("unexpected {other:?}"),
            }
        }
        assert_eq!(desc.remaining(), None);
        assert!(out.chunks(2).all(|c| c == [1, 2]));
    }

    #[test]
    fn exit_threshold_fires_once_with_255_left() {
        let mut buf = [0x55u8; 100];
        let total = repeat_total(100, 6, 0).unwrap();
        let mut desc = TxDescriptor::repeating(&mut buf, 100, 6, 0, total);
        let (out, exits) = drain(&mut desc);
        assert_eq!(out.len(), 700);
        assert_eq!(exits, vec![700 - 255]);
    }

    #[test]
    fn chained_walks_blocks_and_releases_them() {
        let mut arena = [0u8; 12];
        load_block(&mut arena, 4, 0, &[1, 2, 3]).unwrap();
        load_block(&mut arena, 4, 1, &[4, 5, 6]).unwrap();
        load_block(&mut arena, 4, 2, &[7, 8]).unwrap();
        let mut desc = TxDescriptor::chained(&mut arena, 4, 3, 8);
        let (out, _) = drain(&mut desc);
        assert_eq!(out, vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(desc.outcome, None);
        drop(desc);
        assert_eq!(arena[0], BLOCK_AVAILABLE);
        assert_eq!(arena[4], BLOCK_AVAILABLE);
        assert_eq!(arena[8], 2);
    }

    #[test]
    fn chained_underrun_when_next_block_empty() {
        let mut arena = [0u8; 8];
        load_block(&mut arena, 4, 0, &[1, 2, 3]).unwrap();
        let mut desc = TxDescriptor::chained(&mut arena, 4, 2, 6);
        let mut out = Vec::new();
        let step = loop {
            match desc.advance() {
                TxStep::Send { byte, .. } => out.push(byte),
                other => break other,
            }
        };
        assert_eq!(step, TxStep::Underrun);
        assert_eq!(out, vec![1, 2, 3]);
        assert_eq!(desc.outcome, Some(TxError::SupplyUnderrun));
        assert_eq!(desc.advance(), TxStep::Exhausted);
    }

    #[test]
    fn supply_refills_in_ring_order() {
        let mut arena = [0u8; 8];
        load_block(&mut arena, 4, 0, &[1, 2, 3]).unwrap();
        let mut desc = TxDescriptor::chained(&mut arena, 4, 2, 9);
        assert_eq!(desc.supply(&[4, 5, 6]), Ok(3));
        assert_eq!(desc.supply(&[7, 8, 9]), Err(TxError::BufferNotAvailable));
        let mut out = Vec::new();
        for _ in 0..4 {
            if let TxStep::Send { byte, .. } = desc.advance() {
                out.push(byte);
            }
        }
        assert_eq!(desc.supply(&[7, 8, 9]), Ok(3));
        let (rest, _) = drain(&mut desc);
        out.extend(rest);
        assert_eq!(out, vec![1, 2, 3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn supply_rejects_oversized_and_accepts_empty() {
        let mut arena = [0u8; 8];
        load_block(&mut arena, 4, 0, &[1]).unwrap();
        let mut desc = TxDescriptor::chained(&mut arena, 4, 2, 1);
        assert_eq!(desc.supply(&[1, 2, 3, 4]), Err(TxError::BufferSizeExceeded));
        assert_eq!(desc.supply(&[]), Ok(0));
    }

    #[test]
    fn supply_on_plain_transfer_is_rejected() {
        let mut buf = [1u8];
        let mut desc = TxDescriptor::single(&mut buf, 1);
        assert_eq!(desc.supply(&[1]), Err(TxError::NoTransfer));
    }

    #[test]
    fn chained_start_skips_preloaded_blocks() {
        let mut arena = [0u8; 12];
        load_block(&mut arena, 4, 0, &[1]).unwrap();
        load_block(&mut arena, 4, 1, &[2]).unwrap();
        arena[8] = 0xFF;
        let desc = TxDescriptor::chained(&mut arena, 4, 3, 3);
        assert_eq!(desc.fill_index, 0);
    }

    #[test]
    fn load_block_validates() {
        let mut arena = [0u8; 8];
        assert_eq!(load_block(&mut arena, 1, 0, &[1]), Err(TxError::BlockSizeIncompatible));
        assert_eq!(load_block(&mut arena, 4, 0, &[]), Err(TxError::InvalidLength));
        assert_eq!(load_block(&mut arena, 4, 0, &[1, 2, 3, 4]), Err(TxError::BufferSizeExceeded));
        assert_eq!(load_block(&mut arena, 4, 2, &[1]), Err(TxError::BlockSizeIncompatible));
    }

    #[test]
    fn rx_stream_switches_and_rearms() {
        let mut rx = RxStream::default();
        rx.enable(300);
        let mut fixed_at = None;
        let mut rearm_at = None;
        for i in 0..300u16 {
            if rx.before_byte() == RxFraming::Fixed && fixed_at.is_none() {
                fixed_at = Some(i);
            }
            if let RxFraming::Rearm { packet_length } = rx.after_byte() {
                assert_eq!(packet_length, 44);
                rearm_at = Some(i);
            }
        }
        assert_eq!(fixed_at, Some(300 - 255));
        assert_eq!(rearm_at, Some(299));
    }

    #[test]
    fn rx_stream_inactive_keeps_framing() {
        let mut rx = RxStream::default();
        assert_eq!(rx.before_byte(), RxFraming::Keep);
        assert_eq!(rx.after_byte(), RxFraming::Keep);
    }

    proptest! {
        #[test]
        fn replay_matches_repeat_rule(
            data in proptest::collection::vec(any::<u8>(), 1..64),
            repeat in 0u16..12,
            offset_seed in any::<u16>(),
        ) {
            let len = data.len() as u16;
            let offset = offset_seed % len;
            let total = repeat_total(len, repeat, offset).unwrap();
            prop_assert_eq!(u32::from(total), u32::from(len) + u32::from(repeat) * u32::from(len - offset));

            let mut expected = data.clone();
            for _ in 0..repeat {
                expected.extend_from_slice(&data[usize::from(offset)..]);
            }

            let mut buf = data.clone();
            let mut desc = if repeat == 0 {
                TxDescriptor::single(&mut buf, len)
            } else {
                TxDescriptor::repeating(&mut buf, len, repeat, offset, total)
            };
            let (out, exits) = drain(&mut desc);
            prop_assert_eq!(out.len(), usize::from(total));
            prop_assert_eq!(out, expected);
            if repeat > 0 && total >= 255 {
                prop_assert_eq!(exits, vec![usize::from(total) - 255]);
            } else {
                prop_assert!(exits.is_empty());
            }
        }

        #[test]
        fn shuffle_preserves_bytes(
            data in proptest::collection::vec(any::<u8>(), 0..48),
            offset in 0usize..16,
        ) {
            let len = data.len();
            let mut buf = data.clone();
            buf.resize(len + offset, 0xEE);
            byte_shuffle(&mut buf, len, offset);
            prop_assert_eq!(&buf[offset..offset + len], &data[..]);
        }
    }
}
