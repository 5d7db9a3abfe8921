//! Buffer management
//!
//! - [`pool`]: the two receive slots and their hand-off protocol
//! - [`stream`]: transmit cursor, chained receive counter and helpers for
//!   length-prefix shuffling and chained block loading

pub mod pool;
pub mod stream;

pub use pool::{BufferPool, ReadyFrame, SlotState, SwapOutcome};
pub use stream::{byte_shuffle, load_block, repeat_total};
