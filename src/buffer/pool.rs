//! Double-buffered receive slots
//!
//! Two fixed slots alternate between the byte interrupt (which fills the
//! active one) and the consumer (which reads the other after a swap). A slot
//! changes hands only inside [`BufferPool::try_swap_on_frame_done`], and only
//! when the consumer has released the inactive slot; otherwise the finished
//! frame is discarded and the active slot is refilled in place.
//!
//! # Ownership
//!
//! ```text
//!   byte ISR ──write──▶ slot[active]          slot[other] ◀──read── consumer
//!                            │ frame done            │ release()
//!                            ▼                       ▼
//!             swap only if slot[other] is Processed and not claimed
//! ```
//!
//! Bookkeeping lives in one critical-section cell. Slot bytes sit in
//! `UnsafeCell`s and are only touched by the side that currently owns them.

use core::cell::UnsafeCell;
use core::ops::Deref;

use crate::driver::error::RxError;
use crate::internal::constants::RX_SLOT_COUNT;
use crate::sync::CriticalSectionCell;

/// Hand-off flag of one receive slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SlotState {
    /// Consumer is done, hardware may reuse the slot on the next swap
    #[default]
    Processed,
    /// Being filled, or holding a frame the consumer has not released
    Unprocessed,
}

/// Result of a frame-done swap attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SwapOutcome {
    /// The slot at this index now holds a finished frame for the consumer
    Swapped(usize),
    /// Consumer still owns the other slot, the frame was discarded
    Dropped,
}

#[derive(Debug)]
struct SlotBook {
    fill: [u16; RX_SLOT_COUNT],
    state: [SlotState; RX_SLOT_COUNT],
    claimed: [bool; RX_SLOT_COUNT],
    active: usize,
    ready: Option<usize>,
    publishing: bool,
    dropped: u32,
}

impl SlotBook {
    const fn new() -> Self {
        Self {
            fill: [0; RX_SLOT_COUNT],
            state: [SlotState::Unprocessed, SlotState::Processed],
            claimed: [false; RX_SLOT_COUNT],
            active: 0,
            ready: None,
            publishing: false,
            dropped: 0,
        }
    }
}

/// Two receive slots of `N` bytes each
pub struct BufferPool<const N: usize> {
    slots: [UnsafeCell<[u8; N]>; RX_SLOT_COUNT],
    book: CriticalSectionCell<SlotBook>,
}

// SAFETY: slot bytes are only accessed by the current owner recorded in the
// critical-section protected book: the byte ISR for the active slot, the
// event ISR for a slot being published, a `ReadyFrame` for a claimed slot.
unsafe impl<const N: usize> Sync for BufferPool<N> {}

impl<const N: usize> Default for BufferPool<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> BufferPool<N> {
    /// Create an empty pool (const, suitable for static initialization)
    pub const fn new() -> Self {
        Self {
            slots: [UnsafeCell::new([0; N]), UnsafeCell::new([0; N])],
            book: CriticalSectionCell::new(SlotBook::new()),
        }
    }

    /// Slot capacity in bytes
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Prepare both slots for a fresh receive.
    ///
    /// Slot 0 becomes active and `Unprocessed`, slot 1 `Processed`. A slot
    /// held by a live [`ReadyFrame`] stays with the consumer and the other
    /// slot becomes active instead. Any published but unclaimed frame is lost.
    pub fn reset_for_receive(&self) {
        self.book.with(|book| {
            book.ready = None;
            book.publishing = false;
            match book.claimed.iter().position(|&c| c) {
                Some(held) => {
                    let active = held ^ 1;
                    book.active = active;
                    book.fill[active] = 0;
                    book.state[active] = SlotState::Unprocessed;
                    book.state[held] = SlotState::Unprocessed;
                }
                None => {
                    book.active = 0;
                    book.fill = [0; RX_SLOT_COUNT];
                    book.state = [SlotState::Unprocessed, SlotState::Processed];
                }
            }
        });
    }

    /// Append one received byte to the active slot (byte interrupt only).
    ///
    /// The counter is pinned at `N - 1` on overflow, so the last byte of an
    /// over-long frame keeps being overwritten.
    pub fn write_byte(&self, byte: u8) {
        self.book.with(|book| {
            let slot = book.active;
            let pos = usize::from(book.fill[slot]).min(N - 1);
            // SAFETY: the active slot is owned by the byte interrupt, and this
            // critical section excludes any concurrent swap or reset.
            unsafe {
                (&mut *self.slots[slot].get())[pos] = byte;
            }
            let next = pos + 1;
            book.fill[slot] = if next >= N { (N - 1) as u16 } else { next as u16 };
        });
    }

    /// Hand the active slot to the consumer if the other slot is free.
    ///
    /// On success `transform` runs over the finished frame after the active
    /// index has moved, so the byte interrupt can already fill the new slot,
    /// and before the frame is visible to [`take_ready`](Self::take_ready).
    /// On failure the active slot is rewound and the frame is counted as
    /// dropped.
    pub fn try_swap_on_frame_done<F>(&self, transform: F) -> SwapOutcome
    where
        F: FnOnce(&mut [u8]),
    {
        let swapped = self.book.with(|book| {
            let filled = book.active;
            let other = filled ^ 1;
            if book.state[other] == SlotState::Processed && !book.claimed[other] {
                book.active = other;
                book.fill[other] = 0;
                book.state = [SlotState::Unprocessed; RX_SLOT_COUNT];
                book.publishing = true;
                Some((filled, usize::from(book.fill[filled])))
            } else {
                book.fill[filled] = 0;
                book.dropped = book.dropped.wrapping_add(1);
                None
            }
        });

        let Some((filled, len)) = swapped else {
            return SwapOutcome::Dropped;
        };

        // SAFETY: `filled` is no longer active and not yet published, so
        // nothing else references it until `ready` is set below.
        let frame = unsafe { &mut (&mut *self.slots[filled].get())[..len] };
        transform(frame);

        self.book.with(|book| {
            if book.publishing {
                book.publishing = false;
                book.ready = Some(filled);
            }
        });
        SwapOutcome::Swapped(filled)
    }

    /// Rewind the active slot without handing it over, counting the frame
    /// as dropped.
    pub fn discard_active(&self) {
        self.book.with(|book| {
            book.fill[book.active] = 0;
            book.dropped = book.dropped.wrapping_add(1);
        });
    }

    /// Claim the published frame, if any.
    pub fn take_ready(&self) -> Option<ReadyFrame<'_, N>> {
        let (slot, len) = self.book.with(|book| {
            let slot = book.ready.take()?;
            book.claimed[slot] = true;
            Some((slot, usize::from(book.fill[slot])))
        })?;
        Some(ReadyFrame {
            pool: self,
            slot,
            len,
        })
    }

    /// Release `slot` back to the hardware.
    ///
    /// Releasing the active slot has no effect. A slot held by a
    /// [`ReadyFrame`] is released by that guard instead.
    pub fn mark_consumed(&self, slot: usize) -> Result<(), RxError> {
        self.book.with(|book| {
            let slot = slot % RX_SLOT_COUNT;
            if book.claimed[slot] {
                return Err(RxError::FrameClaimed);
            }
            if slot != book.active {
                book.state[slot] = SlotState::Processed;
                if book.ready == Some(slot) {
                    book.ready = None;
                }
            }
            Ok(())
        })
    }

    fn release(&self, slot: usize) {
        self.book.with(|book| {
            book.claimed[slot] = false;
            if slot != book.active {
                book.state[slot] = SlotState::Processed;
            }
        });
    }

    /// Index of the slot the hardware is filling
    pub fn active(&self) -> usize {
        self.book.with_ref(|book| book.active)
    }

    /// Bytes counted in `slot`
    pub fn fill(&self, slot: usize) -> u16 {
        self.book.with_ref(|book| book.fill[slot % RX_SLOT_COUNT])
    }

    /// Hand-off flag of `slot`
    pub fn slot_state(&self, slot: usize) -> SlotState {
        self.book.with_ref(|book| book.state[slot % RX_SLOT_COUNT])
    }

    /// Frames discarded because the consumer still held the other slot
    pub fn dropped(&self) -> u32 {
        self.book.with_ref(|book| book.dropped)
    }
}

/// A received frame lent to the consumer.
///
/// The slot goes back to the hardware when the guard is released or dropped.
pub struct ReadyFrame<'a, const N: usize> {
    pool: &'a BufferPool<N>,
    slot: usize,
    len: usize,
}

impl<const N: usize> ReadyFrame<'_, N> {
    /// Slot index holding the frame
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Frame bytes
    pub fn bytes(&self) -> &[u8] {
        // SAFETY: the slot is claimed, so neither interrupt writes it until
        // this guard releases it.
        unsafe { &(&*self.pool.slots[self.slot].get())[..self.len] }
    }

    /// Give the slot back to the hardware
    pub fn release(self) {}
}

impl<const N: usize> Deref for ReadyFrame<'_, N> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.bytes()
    }
}

impl<const N: usize> Drop for ReadyFrame<'_, N> {
    fn drop(&mut self) {
        self.pool.release(self.slot);
    }
}

impl<const N: usize> core::fmt::Debug for ReadyFrame<'_, N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ReadyFrame")
            .field("slot", &self.slot)
            .field("len", &self.len)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn fill_frame<const N: usize>(pool: &BufferPool<N>, bytes: &[u8]) {
        for &b in bytes {
            pool.write_byte(b);
        }
    }

    #[test]
    fn reset_layout() {
        let pool: BufferPool<8> = BufferPool::new();
        fill_frame(&pool, &[1, 2, 3]);
        pool.reset_for_receive();
        assert_eq!(pool.active(), 0);
        assert_eq!(pool.fill(0), 0);
        assert_eq!(pool.fill(1), 0);
        assert_eq!(pool.slot_state(0), SlotState::Unprocessed);
        assert_eq!(pool.slot_state(1), SlotState::Processed);
    }

    #[test]
    fn swap_publishes_frame() {
        let pool: BufferPool<8> = BufferPool::new();
        pool.reset_for_receive();
        fill_frame(&pool, &[0xAA, 0xBB]);
        assert_eq!(pool.try_swap_on_frame_done(|_| {}), SwapOutcome::Swapped(0));
        assert_eq!(pool.active(), 1);
        assert_eq!(pool.slot_state(0), SlotState::Unprocessed);
        assert_eq!(pool.slot_state(1), SlotState::Unprocessed);
        let frame = pool.take_ready().unwrap();
        assert_eq!(&*frame, &[0xAA, 0xBB]);
        assert_eq!(frame.slot(), 0);
        frame.release();
        assert_eq!(pool.slot_state(0), SlotState::Processed);
    }

    #[test]
    fn swap_drops_when_consumer_behind() {
        let pool: BufferPool<8> = BufferPool::new();
        pool.reset_for_receive();
        fill_frame(&pool, &[1]);
        assert_eq!(pool.try_swap_on_frame_done(|_| {}), SwapOutcome::Swapped(0));
        fill_frame(&pool, &[2, 2]);
        assert_eq!(pool.try_swap_on_frame_done(|_| {}), SwapOutcome::Dropped);
        assert_eq!(pool.active(), 1);
        assert_eq!(pool.fill(1), 0);
        assert_eq!(pool.dropped(), 1);
        assert_eq!(&*pool.take_ready().unwrap(), &[1]);
    }

    #[test]
    fn transform_runs_before_publication() {
        let pool: BufferPool<8> = BufferPool::new();
        pool.reset_for_receive();
        fill_frame(&pool, &[1, 2, 3]);
        let outcome = pool.try_swap_on_frame_done(|frame| {
            assert_eq!(frame, &[1, 2, 3]);
            for b in frame.iter_mut() {
                *b ^= 0xFF;
            }
        });
        assert_eq!(outcome, SwapOutcome::Swapped(0));
        assert_eq!(&*pool.take_ready().unwrap(), &[0xFE, 0xFD, 0xFC]);
    }

    #[test]
    fn discard_active_rewinds_in_place() {
        let pool: BufferPool<8> = BufferPool::new();
        pool.reset_for_receive();
        fill_frame(&pool, &[5, 5, 5]);
        pool.discard_active();
        assert_eq!(pool.active(), 0);
        assert_eq!(pool.fill(0), 0);
        assert_eq!(pool.dropped(), 1);
        fill_frame(&pool, &[6]);
        assert_eq!(pool.try_swap_on_frame_done(|_| {}), SwapOutcome::Swapped(0));
        assert_eq!(&*pool.take_ready().unwrap(), &[6]);
    }

    #[test]
    fn tail_clamp_pins_counter() {
        let pool: BufferPool<4> = BufferPool::new();
        pool.reset_for_receive();
        fill_frame(&pool, &[1, 2, 3, 4, 5, 6]);
        assert_eq!(pool.fill(0), 3);
        pool.try_swap_on_frame_done(|_| {});
        assert_eq!(&*pool.take_ready().unwrap(), &[1, 2, 3]);
    }

    #[test]
    fn claimed_slot_cannot_be_marked() {
        let pool: BufferPool<8> = BufferPool::new();
        pool.reset_for_receive();
        fill_frame(&pool, &[9]);
        pool.try_swap_on_frame_done(|_| {});
        let frame = pool.take_ready().unwrap();
        assert_eq!(pool.mark_consumed(0), Err(RxError::FrameClaimed));
        drop(frame);
        assert_eq!(pool.mark_consumed(0), Ok(()));
    }

    #[test]
    fn mark_consumed_discards_unclaimed_frame() {
        let pool: BufferPool<8> = BufferPool::new();
        pool.reset_for_receive();
        fill_frame(&pool, &[9]);
        pool.try_swap_on_frame_done(|_| {});
        pool.mark_consumed(0).unwrap();
        assert!(pool.take_ready().is_none());
        assert_eq!(pool.slot_state(0), SlotState::Processed);
    }

    #[test]
    fn reset_keeps_claimed_slot_with_consumer() {
        let pool: BufferPool<8> = BufferPool::new();
        pool.reset_for_receive();
        fill_frame(&pool, &[7, 7]);
        pool.try_swap_on_frame_done(|_| {});
        let frame = pool.take_ready().unwrap();
        pool.reset_for_receive();
        assert_eq!(pool.active(), 1);
        assert_eq!(&*frame, &[7, 7]);
        fill_frame(&pool, &[8]);
        assert_eq!(pool.try_swap_on_frame_done(|_| {}), SwapOutcome::Dropped);
        drop(frame);
        fill_frame(&pool, &[8]);
        assert_eq!(pool.try_swap_on_frame_done(|_| {}), SwapOutcome::Swapped(1));
    }

    #[derive(Debug, Clone, Copy)]
    enum Op {
        Byte,
        FrameDone,
        Claim,
        Release,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            4 => Just(Op::Byte),
            2 => Just(Op::FrameDone),
            1 => Just(Op::Claim),
            1 => Just(Op::Release),
        ]
    }

    proptest! {
        #[test]
        fn interleavings_never_corrupt_or_double_swap(ops in proptest::collection::vec(op(), 1..200)) {
            let pool: BufferPool<16> = BufferPool::new();
            pool.reset_for_receive();

            let mut frame_id: u8 = 1;
            let mut unreleased_swap = false;
            let mut last_seen: u8 = 0;
            let mut held: Option<ReadyFrame<'_, 16>> = None;

            for op in ops {
                match op {
                    Op::Byte => pool.write_byte(frame_id),
                    Op::FrameDone => {
                        let other = pool.active() ^ 1;
                        let other_free = pool.slot_state(other) == SlotState::Processed
                            && held.as_ref().is_none_or(|f| f.slot() != other);
                        let outcome = pool.try_swap_on_frame_done(|_| {});
                        match outcome {
                            SwapOutcome::Swapped(_) => {
                                prop_assert!(other_free);
                                prop_assert!(!unreleased_swap);
                                unreleased_swap = true;
                            }
                            SwapOutcome::Dropped => prop_assert!(!other_free),
                        }
                        frame_id = frame_id.wrapping_add(1).max(1);
                    }
                    Op::Claim => {
                        if held.is_none() {
                            if let Some(frame) = pool.take_ready() {
                                prop_assert!(frame.slot() != pool.active());
                                if let Some(&first) = frame.first() {
                                    prop_assert!(frame.iter().all(|&b| b == first));
                                    prop_assert!(first != last_seen);
                                    last_seen = first;
                                }
                                held = Some(frame);
                            }
                        }
                    }
                    Op::Release => {
                        if let Some(frame) = held.take() {
                            frame.release();
                            unreleased_swap = false;
                        }
                    }
                }
            }
            drop(held);
        }
    }
}
