//! Synchronization primitives for ISR-safe access.
//!
//! Low-level primitives shared by the main context and both radio interrupts.

use core::cell::{RefCell, UnsafeCell};
use core::ops::{Deref, DerefMut};
use critical_section::Mutex;

/// Cell providing interior mutability with critical section protection.
///
/// Combines `critical_section::Mutex` with `RefCell` for safe mutable access
/// from both normal code and interrupt handlers.
pub struct CriticalSectionCell<T> {
    inner: Mutex<RefCell<T>>,
}

impl<T> CriticalSectionCell<T> {
    /// Create a new cell (const, suitable for static initialization).
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(value)),
        }
    }

    /// Execute a closure with exclusive mutable access.
    ///
    /// Interrupts are disabled for the duration of the closure.
    #[inline]
    pub fn with<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        critical_section::with(|cs| {
            let mut value = self.inner.borrow_ref_mut(cs);
            f(&mut value)
        })
    }

    /// Execute a closure with immutable access.
    #[inline]
    pub fn with_ref<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        critical_section::with(|cs| {
            let value = self.inner.borrow_ref(cs);
            f(&value)
        })
    }
}

// SAFETY: CriticalSectionCell uses critical sections to protect all access.
unsafe impl<T> Sync for CriticalSectionCell<T> {}

/// Cell whose value is used outside any critical section.
///
/// A critical section only flips the ownership flag; the holder of an
/// [`ExclusiveGuard`] then works on the value with interrupts enabled. A
/// context that finds the flag taken gets `None` and must back off.
pub struct ExclusiveCell<T> {
    taken: CriticalSectionCell<bool>,
    value: UnsafeCell<T>,
}

impl<T> ExclusiveCell<T> {
    /// Create a free cell (const, suitable for static initialization).
    pub const fn new(value: T) -> Self {
        Self {
            taken: CriticalSectionCell::new(false),
            value: UnsafeCell::new(value),
        }
    }

    /// Claim the value, or `None` while another context holds it.
    pub fn try_claim(&self) -> Option<ExclusiveGuard<'_, T>> {
        let claimed = self.taken.with(|taken| !core::mem::replace(taken, true));
        claimed.then(|| ExclusiveGuard { cell: self })
    }
}

// SAFETY: the flag hands the value to at most one guard at a time.
unsafe impl<T: Send> Sync for ExclusiveCell<T> {}

/// Access to an [`ExclusiveCell`] value; releases the claim on drop.
pub struct ExclusiveGuard<'a, T> {
    cell: &'a ExclusiveCell<T>,
}

impl<T> Deref for ExclusiveGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: this guard is the only claim on the value.
        unsafe { &*self.cell.value.get() }
    }
}

impl<T> DerefMut for ExclusiveGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: as above.
        unsafe { &mut *self.cell.value.get() }
    }
}

impl<T> Drop for ExclusiveGuard<'_, T> {
    fn drop(&mut self) {
        self.cell.taken.with(|taken| *taken = false);
    }
}

/// Event word written by interrupts and drained by the main context.
///
/// Writers OR bits in, the reader takes and clears the whole word in one
/// critical section, so no flag raised between two drains is lost.
pub struct EventLatch {
    bits: CriticalSectionCell<u16>,
}

impl EventLatch {
    /// Create an empty latch (const, suitable for static initialization).
    pub const fn new() -> Self {
        Self {
            bits: CriticalSectionCell::new(0),
        }
    }

    /// OR `bits` into the latch.
    #[inline]
    pub fn raise(&self, bits: u16) {
        self.bits.with(|b| *b |= bits);
    }

    /// Read the latch without clearing it.
    #[inline]
    pub fn peek(&self) -> u16 {
        self.bits.with_ref(|b| *b)
    }

    /// Take every latched bit, leaving the latch empty.
    #[inline]
    pub fn take(&self) -> u16 {
        self.bits.with(core::mem::take)
    }
}

impl Default for EventLatch {
    fn default() -> Self {
        Self::new()
    }
}
