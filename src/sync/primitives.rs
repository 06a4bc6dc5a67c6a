//! Critical-section cell used by the shared stream wrapper.

use core::cell::RefCell;
use critical_section::Mutex;

/// Cell providing interior mutability with critical section protection.
///
/// Combines `critical_section::Mutex` with `RefCell` so the same value can be
/// reached from the foreground and from an interrupt handler.
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

    /// Try to execute a closure, returning `None` if already borrowed
    /// (re-entered from inside `with`).
    #[inline]
    pub fn try_with<R, F>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut T) -> R,
    {
        critical_section::with(|cs| {
            self.inner
                .borrow(cs)
                .try_borrow_mut()
                .ok()
                .map(|mut value| f(&mut value))
        })
    }
}

// SAFETY: every access goes through a critical section; `T: Send` because the
// value is handed between execution contexts.
unsafe impl<T: Send> Sync for CriticalSectionCell<T> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_mutates_value() {
        let cell = CriticalSectionCell::new(1u32);
        cell.with(|v| *v += 41);
        assert_eq!(cell.with(|v| *v), 42);
    }

    #[test]
    fn try_with_fails_when_reentered() {
        let cell = CriticalSectionCell::new(0u32);
        let inner = cell.with(|_| cell.try_with(|v| *v));
        assert_eq!(inner, None);
        assert_eq!(cell.try_with(|v| *v), Some(0));
    }

    #[test]
    fn usable_as_static() {
        static CELL: CriticalSectionCell<u8> = CriticalSectionCell::new(7);
        assert_eq!(CELL.with(|v| *v), 7);
    }
}
