//! Interrupt-to-foreground signals.
//!
//! Each [`EventSlot`] is a pair of monotonically increasing counters: the
//! interrupt context advances `posted`, the foreground advances `consumed`.
//! Either side only ever stores to its own counter, so plain atomic loads and
//! stores suffice (no read-modify-write), which keeps the slots usable on
//! cores without compare-and-swap.

use core::sync::atomic::{AtomicU32, Ordering};

/// Single-writer / single-reader event counter
#[derive(Debug, Default)]
pub struct EventSlot {
    posted: AtomicU32,
    consumed: AtomicU32,
}

impl EventSlot {
    /// Create an empty slot (const, suitable for static initialization)
    pub const fn new() -> Self {
        Self {
            posted: AtomicU32::new(0),
            consumed: AtomicU32::new(0),
        }
    }

    /// Post `count` events. Writer side only.
    #[inline]
    pub fn post(&self, count: u32) {
        let posted = self.posted.load(Ordering::Relaxed);
        self.posted
            .store(posted.wrapping_add(count), Ordering::Release);
    }

    /// Events posted but not yet taken
    #[inline]
    pub fn pending(&self) -> u32 {
        let posted = self.posted.load(Ordering::Acquire);
        posted.wrapping_sub(self.consumed.load(Ordering::Relaxed))
    }

    /// Take every pending event. Reader side only.
    #[inline]
    pub fn take(&self) -> u32 {
        let posted = self.posted.load(Ordering::Acquire);
        let consumed = self.consumed.load(Ordering::Relaxed);
        self.consumed.store(posted, Ordering::Release);
        posted.wrapping_sub(consumed)
    }

    /// Events posted since creation (wrapping)
    #[inline]
    pub fn total(&self) -> u32 {
        self.posted.load(Ordering::Acquire)
    }
}

/// Signals a [`DmaStream`](crate::driver::stream::DmaStream) raises from
/// interrupt context.
///
/// Lives outside the stream so a polling loop can sample it without taking
/// whatever lock guards the stream. Sample once per loop iteration; the
/// value may change right after the read.
///
/// # Example
///
/// ```ignore
/// static SIGNALS: StreamSignals = StreamSignals::new();
///
/// loop {
///     if SIGNALS.take_fault() {
///         STREAM.with(|s| s.restart()).ok();
///     }
///     if SIGNALS.resubmit_pending() > 0 {
///         STREAM.with(|s| s.resubmit_pending()).ok();
///     }
/// }
/// ```
#[derive(Debug, Default)]
pub struct StreamSignals {
    fault: EventSlot,
    resubmit: EventSlot,
}

impl StreamSignals {
    /// Create cleared signals (const, suitable for static initialization)
    pub const fn new() -> Self {
        Self {
            fault: EventSlot::new(),
            resubmit: EventSlot::new(),
        }
    }

    pub(crate) fn raise_fault(&self) {
        self.fault.post(1);
    }

    pub(crate) fn request_resubmit(&self, transfers: u32) {
        if transfers > 0 {
            self.resubmit.post(transfers);
        }
    }

    /// A fault was raised and not yet taken
    #[inline]
    pub fn fault_pending(&self) -> bool {
        self.fault.pending() > 0
    }

    /// Take the fault flag, returning whether it was set
    #[inline]
    pub fn take_fault(&self) -> bool {
        self.fault.take() > 0
    }

    /// Faults raised since creation
    #[inline]
    pub fn fault_count(&self) -> u32 {
        self.fault.total()
    }

    /// Transfers waiting to be resubmitted from the foreground
    #[inline]
    pub fn resubmit_pending(&self) -> u32 {
        self.resubmit.pending()
    }

    pub(crate) fn take_resubmit(&self) -> u32 {
        self.resubmit.take()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
