//! Transceiver engine: state machine, configuration and receive hand-off.
//!
//! [`RadioCore`] owns everything the main context and the two radio
//! interrupts share. The main context drives it through `&self` methods; the
//! interrupts get narrow handles from
//! [`byte_interrupt`](RadioCore::byte_interrupt) and
//! [`event_interrupt`](RadioCore::event_interrupt).
//!
//! # State machine
//!
//! ```text
//!          enter_receive            enter_transmit
//!   Receiving ◀──────── Idle ────────▶ Transmitting
//!             ────────▶      ◀────────
//!             enter_idle        enter_idle
//! ```
//!
//! There is no direct Receiving/Transmitting edge.
//! [`force_reidle`](RadioCore::force_reidle) cycles the hardware through idle
//! and back into the recorded state; it is the only transition the interrupts
//! perform.

use crate::buffer::pool::{BufferPool, ReadyFrame};
use crate::buffer::stream::{RxStream, TxDescriptor};
use crate::driver::config::{CipherConfig, EngineConfig, FrequencyWord, RadioState, RfPath};
use crate::driver::error::{ConfigError, Result, RxError, StateError};
use crate::driver::events::EventSet;
use crate::hal::cipher::BlockCipher;
use crate::hal::mac::{EventHook, MacPolicy};
use crate::hal::radio::{HardwareState, LengthMode, OffModes, RadioPeripheral};
use crate::internal::constants::{DEFAULT_SLOT_SIZE, NATIVE_BLOCK_MODULUS, RF_MAX_RX_BLOCK};
use crate::internal::register::{EVT_RECOVERY_STALLED, RFIF_DONE, RFIM_DEFAULT};
use crate::sync::{CriticalSectionCell, EventLatch, ExclusiveCell};

/// Framing registers saved around an operation that changes them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Framing {
    pub(crate) mode: LengthMode,
    pub(crate) packet_length: u8,
}

/// State shared between the main context and both interrupts
pub(crate) struct Control {
    pub(crate) state: RadioState,
    pub(crate) cipher: CipherConfig,
    pub(crate) tx: Option<TxDescriptor>,
    pub(crate) rx: RxStream,
    pub(crate) saved_framing: Option<Framing>,
    pub(crate) amplifier: bool,
    pub(crate) last_receive: u16,
}

impl Control {
    const fn new() -> Self {
        Self {
            state: RadioState::Idle,
            cipher: CipherConfig::NONE,
            tx: None,
            rx: RxStream::new(),
            saved_framing: None,
            amplifier: false,
            last_receive: 0,
        }
    }
}

/// Interrupt-driven sub-GHz transceiver engine
///
/// # Type Parameters
///
/// * `R` - Radio peripheral
/// * `C` - Payload block cipher
/// * `M` - MAC policy hook
/// * `N` - Capacity of each of the two receive slots
///
/// # Example
///
/// ```ignore
/// use subghz_nic::{RadioCoreDefault, EngineConfig, NullCipher, NoMac};
///
/// static RADIO: RadioCoreDefault<Cc1111Radio, NullCipher, NoMac> =
///     RadioCore::new(Cc1111Radio, NullCipher, NoMac, EngineConfig::new());
///
/// #[interrupt]
/// fn RFTXRX() {
///     RADIO.byte_interrupt().service();
/// }
///
/// #[interrupt]
/// fn RF() {
///     RADIO.event_interrupt().service();
/// }
///
/// fn main() -> ! {
///     RADIO.init().unwrap();
///     RADIO.set_frequency(433_920_000).unwrap();
///     RADIO.enter_receive().unwrap();
///     loop {
///         if let Some(frame) = RADIO.read_ready_slot() {
///             usb.send(&frame);
///         }
///         usb.process_events();
///     }
/// }
/// ```
pub struct RadioCore<R, C, M, const N: usize> {
    pub(crate) radio: R,
    pub(crate) cipher: ExclusiveCell<C>,
    pub(crate) mac: CriticalSectionCell<M>,
    pub(crate) control: CriticalSectionCell<Control>,
    pub(crate) pool: BufferPool<N>,
    pub(crate) pending: EventLatch,
    pub(crate) config: EngineConfig,
}

/// Engine with 512-byte receive slots
pub type RadioCoreDefault<R, C, M> = RadioCore<R, C, M, DEFAULT_SLOT_SIZE>;

/// Engine with 256-byte receive slots (native framing only)
pub type RadioCoreSmall<R, C, M> = RadioCore<R, C, M, 256>;

impl<R, C, M, const N: usize> RadioCore<R, C, M, N> {
    /// Create the engine (const, suitable for static initialization).
    ///
    /// Nothing touches the hardware until [`init`](Self::init).
    pub const fn new(radio: R, cipher: C, mac: M, config: EngineConfig) -> Self {
        Self {
            radio,
            cipher: ExclusiveCell::new(cipher),
            mac: CriticalSectionCell::new(mac),
            control: CriticalSectionCell::new(Control::new()),
            pool: BufferPool::new(),
            pending: EventLatch::new(),
            config,
        }
    }

    /// The radio peripheral
    pub fn radio(&self) -> &R {
        &self.radio
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Receive slots
    pub fn pool(&self) -> &BufferPool<N> {
        &self.pool
    }

    /// Run `f` with exclusive access to the MAC policy
    pub fn with_mac<T>(&self, f: impl FnOnce(&mut M) -> T) -> T {
        self.mac.with(f)
    }

    /// Run `f` with exclusive access to the cipher (key and IV management).
    ///
    /// Interrupts stay enabled while `f` runs. Returns `None` if an
    /// interrupt is using the cipher at that moment.
    pub fn with_cipher<T>(&self, f: impl FnOnce(&mut C) -> T) -> Option<T> {
        self.cipher.try_claim().map(|mut cipher| f(&mut *cipher))
    }

    /// Recorded logical state
    pub fn state(&self) -> RadioState {
        self.control.with_ref(|c| c.state)
    }

    /// Active cipher settings
    pub fn cipher_config(&self) -> CipherConfig {
        self.control.with_ref(|c| c.cipher)
    }

    /// MAC timer value latched at the last frame sync
    pub fn last_receive_timestamp(&self) -> u16 {
        self.control.with_ref(|c| c.last_receive)
    }

    /// Frames discarded because the consumer still held the other slot
    pub fn dropped_frames(&self) -> u32 {
        self.pool.dropped()
    }

    /// Bytes left in the in-flight transmit, `None` if idle or repeating
    /// forever
    pub fn transmit_remaining(&self) -> Option<u16> {
        self.control
            .with_ref(|c| c.tx.as_ref().and_then(TxDescriptor::remaining))
    }

    /// Drain the pending-event word
    pub fn poll_events(&self) -> EventSet {
        EventSet::from_raw(self.pending.take())
    }

    /// Look at the pending-event word without draining it
    pub fn peek_events(&self) -> EventSet {
        EventSet::from_raw(self.pending.peek())
    }

    /// Claim the frame handed over by the last swap, if any.
    ///
    /// The slot returns to the hardware when the guard is released or dropped.
    pub fn read_ready_slot(&self) -> Option<ReadyFrame<'_, N>> {
        self.pool.take_ready()
    }

    /// Release `slot` without claiming it first
    pub fn mark_consumed(&self, slot: usize) -> Result<()> {
        self.pool.mark_consumed(slot)?;
        Ok(())
    }

    /// Wait for a frame, yielding to `hook` between polls
    pub fn wait_frame<H: EventHook>(&self, hook: &mut H, polls: u32) -> Result<ReadyFrame<'_, N>> {
        for _ in 0..polls {
            if let Some(frame) = self.pool.take_ready() {
                return Ok(frame);
            }
            hook.process_events();
        }
        self.pool.take_ready().ok_or(RxError::Timeout.into())
    }
}

impl<R, C, M, const N: usize> RadioCore<R, C, M, N>
where
    R: RadioPeripheral,
    C: BlockCipher,
    M: MacPolicy,
{
    /// Bring the radio to a known idle state and arm the event sources.
    pub fn init(&self) -> Result<()> {
        self.radio.mask_events(0xFF);
        self.radio.clear_events(0xFF);
        self.radio.set_off_modes(OffModes::IDLE);
        self.radio.request_state(RadioState::Idle);
        self.control.with(|c| {
            c.state = RadioState::Idle;
            c.tx = None;
            c.last_receive = 0;
        });
        self.pool.reset_for_receive();
        self.pending.take();
        self.radio.unmask_events(RFIM_DEFAULT);
        self.radio.select_rf_path(RfPath::Bypass);
        if self.config.receive_block_len != 0 {
            self.configure_receive_large(self.config.receive_block_len)?;
        }

        #[cfg(feature = "defmt")]
        defmt::info!("radio engine initialized, {} byte slots", N);

        Ok(())
    }

    /// Program the carrier frequency
    pub fn set_frequency(&self, hz: u32) -> Result<FrequencyWord> {
        let word = FrequencyWord::from_hz(hz, self.config.crystal_hz)?;
        self.radio.set_frequency(word);
        Ok(word)
    }

    /// Replace the cipher settings.
    ///
    /// Rejected while a transmit is in flight so one transfer never sees two
    /// configurations.
    pub fn configure_cipher(&self, config: CipherConfig) -> Result<()> {
        if self.transmit_in_flight() {
            return Err(ConfigError::TransferInFlight.into());
        }
        self.control.with(|c| c.cipher = config);

        #[cfg(feature = "defmt")]
        defmt::info!("cipher configured: {=u8:#x}", config.to_byte());

        Ok(())
    }

    /// Configure inbound framing for frames longer than one native block.
    ///
    /// - `len > 255`: chained receive of `len`-byte frames
    /// - `1..=255`: fixed length `len`
    /// - `0`: restore the framing in force before the first call
    pub fn configure_receive_large(&self, len: u16) -> Result<()> {
        if self.transmit_in_flight() {
            return Err(ConfigError::TransferInFlight.into());
        }
        if usize::from(len) >= self.pool.capacity() {
            return Err(ConfigError::BufferSizeExceeded.into());
        }
        let current = Framing {
            mode: self.radio.length_mode(),
            packet_length: self.radio.packet_length(),
        };

        if len == 0 {
            let saved = self.control.with(|c| {
                c.rx.disable();
                c.saved_framing.take()
            });
            if let Some(framing) = saved {
                self.radio.set_packet_length(framing.packet_length);
                self.radio.set_length_mode(framing.mode);
            }
            return Ok(());
        }

        self.control.with(|c| {
            c.saved_framing.get_or_insert(current);
            if len > RF_MAX_RX_BLOCK {
                c.rx.enable(len);
            } else {
                c.rx.disable();
            }
        });
        self.radio
            .set_packet_length((len % NATIVE_BLOCK_MODULUS) as u8);
        if len > RF_MAX_RX_BLOCK {
            self.radio.set_length_mode(LengthMode::Infinite);
        } else {
            self.radio.set_length_mode(LengthMode::Fixed);
        }
        Ok(())
    }

    /// Enable or bypass the external amplifiers
    pub fn set_amplifier(&self, enabled: bool) {
        let state = self.control.with(|c| {
            c.amplifier = enabled;
            c.state
        });
        self.route_front_end(state);
    }

    pub(crate) fn route_front_end(&self, state: RadioState) {
        let amplifier = self.control.with_ref(|c| c.amplifier);
        let path = if amplifier {
            RfPath::for_state(state)
        } else {
            RfPath::Bypass
        };
        self.radio.select_rf_path(path);
    }

    pub(crate) fn transmit_in_flight(&self) -> bool {
        self.control.with_ref(|c| c.tx.is_some())
            || self.radio.hardware_state() == HardwareState::Transmit
    }

    // =========================================================================
    // State machine
    // =========================================================================

    /// Enter Idle. Does nothing if already idle.
    pub fn enter_idle(&self) {
        let was = self
            .control
            .with(|c| core::mem::replace(&mut c.state, RadioState::Idle));
        if was == RadioState::Idle {
            return;
        }
        self.radio.set_off_modes(OffModes::IDLE);
        self.radio.mask_events(RFIF_DONE);
        self.radio.request_state(RadioState::Idle);
        self.radio.clear_events(RFIF_DONE);
        self.route_front_end(RadioState::Idle);

        #[cfg(feature = "defmt")]
        defmt::debug!("radio {} -> Idle", was);
    }

    /// Enter Receiving from Idle. Does nothing if already receiving.
    pub fn enter_receive(&self) -> Result<()> {
        self.transition(RadioState::Receiving)?;
        Ok(())
    }

    /// Enter Transmitting from Idle. Does nothing if already transmitting.
    pub fn enter_transmit(&self) -> Result<()> {
        self.transition(RadioState::Transmitting)?;
        Ok(())
    }

    fn transition(&self, target: RadioState) -> core::result::Result<(), StateError> {
        let was = self.control.with(|c| {
            let was = c.state;
            if was == RadioState::Idle {
                c.state = target;
            }
            was
        });
        if was == target {
            return Ok(());
        }
        if was != RadioState::Idle {
            return Err(StateError::InvalidTransition);
        }

        self.radio.set_off_modes(OffModes::for_state(target));
        match target {
            RadioState::Receiving => self.arm_receive(),
            RadioState::Transmitting => self.radio.request_state(RadioState::Transmitting),
            RadioState::Idle => {}
        }
        self.route_front_end(target);

        #[cfg(feature = "defmt")]
        defmt::debug!("radio Idle -> {}", target);

        Ok(())
    }

    /// Point the pool at a fresh receive and start the receiver.
    pub(crate) fn arm_receive(&self) {
        self.radio.enable_byte_interrupt();
        self.pool.reset_for_receive();
        let rearm = self.control.with(|c| {
            c.rx.restart();
            c.rx.infinite.then(|| c.rx.packet_length())
        });
        if let Some(packet_length) = rearm {
            self.radio.set_packet_length(packet_length);
            self.radio.set_length_mode(LengthMode::Infinite);
        }
        self.radio.clear_events(RFIF_DONE);
        self.radio.request_state(RadioState::Receiving);
        self.radio.unmask_events(RFIF_DONE);
    }

    /// Cycle the hardware through idle and back into the recorded state.
    ///
    /// Lossy: whatever frame or transfer was in flight is gone. Each hardware
    /// confirmation is bounded by `reidle_spin_limit`; on expiry the
    /// `recovery_stalled` event is raised. Safe to call from either interrupt.
    pub fn force_reidle(&self) -> core::result::Result<(), StateError> {
        let state = self.state();

        #[cfg(feature = "defmt")]
        defmt::warn!("forcing radio through idle, restoring {}", state);

        self.radio.request_state(RadioState::Idle);
        self.spin_until(|hw| hw == HardwareState::Idle)?;

        match state {
            RadioState::Idle => return Ok(()),
            RadioState::Receiving => self.arm_receive(),
            RadioState::Transmitting => self.radio.request_state(RadioState::Transmitting),
        }
        self.spin_until(|hw| hw != HardwareState::Idle)
    }

    fn spin_until(
        &self,
        reached: impl Fn(HardwareState) -> bool,
    ) -> core::result::Result<(), StateError> {
        for _ in 0..=self.config.reidle_spin_limit {
            if reached(self.radio.hardware_state()) {
                return Ok(());
            }
            core::hint::spin_loop();
        }
        self.pending.raise(EVT_RECOVERY_STALLED);

        #[cfg(feature = "defmt")]
        defmt::warn!("radio recovery stalled");

        Err(StateError::RecoveryStalled)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
