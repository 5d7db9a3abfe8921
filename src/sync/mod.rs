//! Synchronization and Concurrency Support
//!
//! The engine runs in three contexts: the cooperative main loop, the
//! per-byte interrupt and the lower-priority event interrupt. Everything
//! they share goes through the primitives here:
//!
//! - [`CriticalSectionCell`] - ISR-safe interior mutability
//! - [`EventLatch`] - OR-accumulate / take-and-clear event word
//! - [`ExclusiveCell`] - claim-flag ownership for long work that must run
//!   with interrupts enabled
//!
//! # Example
//!
//! ```ignore
//! use subghz_nic::sync::{CriticalSectionCell, EventLatch};
//!
//! static COUNTER: CriticalSectionCell<u32> = CriticalSectionCell::new(0);
//! static EVENTS: EventLatch = EventLatch::new();
//!
//! #[interrupt]
//! fn RF() {
//!     COUNTER.with(|c| *c += 1);
//!     EVENTS.raise(0x10);
//! }
//!
//! fn main_loop() {
//!     let seen = EVENTS.take();
//! }
//! ```

mod primitives;

pub use primitives::{CriticalSectionCell, EventLatch, ExclusiveCell, ExclusiveGuard};
