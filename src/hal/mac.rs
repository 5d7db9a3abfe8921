//! MAC policy and cooperative event hooks
//!
//! Two capability traits sit on the engine's outer edge:
//!
//! - [`MacPolicy`] is the frequency-hopping / media-access layer. The engine
//!   asks it for receive timestamps and tells it when chained transmit
//!   starved.
//! - [`EventHook`] is what main-context waits yield to on every iteration, so
//!   USB and other subsystems keep being serviced while a transmit drains.

/// Media-access policy consumed by the engine
pub trait MacPolicy {
    /// Free-running MAC timer value, latched on frame sync
    fn timestamp(&self) -> u16;

    /// Chained transmit ran out of supplied blocks. The policy must stop
    /// hopping until the host recovers.
    fn notify_starvation(&mut self);
}

/// Policy for radios used without a MAC layer
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMac;

impl MacPolicy for NoMac {
    fn timestamp(&self) -> u16 {
        0
    }

    fn notify_starvation(&mut self) {}
}

/// Work performed while the main context waits on the radio
pub trait EventHook {
    /// Service pending events once. Must not block.
    fn process_events(&mut self);
}

impl<F: FnMut()> EventHook for F {
    #[inline]
    fn process_events(&mut self) {
        self();
    }
}
