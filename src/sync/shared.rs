//! ISR-safe stream wrapper using critical sections.
//!
//! The dispatcher's ack → classify → reap/reset sequence must not be
//! interleaved with foreground work on the same ring. [`SharedStream`] runs
//! both sides inside `critical_section::with()`, so neither can preempt the
//! other partway.

use super::primitives::CriticalSectionCell;
use crate::driver::dispatch::DispatchOutcome;
use crate::driver::error::Result;
use crate::driver::stream::DmaStream;
use crate::hal::channel::DmaChannel;
use crate::hal::reset::{ResetWait, SpinWait};

/// ISR-safe [`DmaStream`] slot.
///
/// Starts empty so it can live in a `static`; install the stream once its
/// ring memory and channel exist.
///
/// # Example
///
/// ```ignore
/// static SIGNALS: StreamSignals = StreamSignals::new();
/// static STREAM: SharedStream<'static, AxiDmaChannel> = SharedStream::new();
///
/// fn main() {
///     let ring = DescriptorRing::create(ring_mem, RING_PHYS, 64, MAX_LEN).unwrap();
///     let engine = RingEngine::new(ring, unsafe { AxiDmaChannel::mm2s(DMA_BASE) });
///     let mut stream = DmaStream::new(engine, StreamConfig::new(), &SIGNALS).unwrap();
///     stream.set_buffer(TransferBuffer::new(BUF_PHYS, BUF_LEN)).unwrap();
///     stream.start().unwrap();
///     STREAM.install(stream);
///
///     loop {
///         if SIGNALS.resubmit_pending() > 0 {
///             STREAM.resubmit_pending();
///         }
///     }
/// }
///
/// #[interrupt]
/// fn DMA_MM2S() {
///     STREAM.on_interrupt();
/// }
/// ```
pub struct SharedStream<'a, C: DmaChannel, W: ResetWait = SpinWait> {
    inner: CriticalSectionCell<Option<DmaStream<'a, C, W>>>,
}

impl<'a, C: DmaChannel, W: ResetWait> SharedStream<'a, C, W> {
    /// Create an empty slot (const, suitable for static initialization).
    pub const fn new() -> Self {
        Self {
            inner: CriticalSectionCell::new(None),
        }
    }

    /// Install a stream, returning the one it replaces
    pub fn install(&self, stream: DmaStream<'a, C, W>) -> Option<DmaStream<'a, C, W>> {
        self.inner.with(|slot| slot.replace(stream))
    }

    /// Remove the stream
    pub fn take(&self) -> Option<DmaStream<'a, C, W>> {
        self.inner.with(Option::take)
    }

    /// Check whether a stream is installed
    pub fn is_installed(&self) -> bool {
        self.inner.with(|slot| slot.is_some())
    }

    /// Execute a closure with exclusive access to the stream.
    ///
    /// Returns `None` if no stream is installed. Interrupts are disabled for
    /// the duration of the closure.
    #[inline]
    pub fn with<R, F>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut DmaStream<'a, C, W>) -> R,
    {
        self.inner.with(|slot| slot.as_mut().map(f))
    }

    /// Like [`with`](Self::with), but also `None` when re-entered.
    #[inline]
    pub fn try_with<R, F>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut DmaStream<'a, C, W>) -> R,
    {
        self.inner.try_with(|slot| slot.as_mut().map(f)).flatten()
    }

    /// Interrupt handler body; `None` if no stream is installed
    pub fn on_interrupt(&self) -> Option<DispatchOutcome> {
        self.with(DmaStream::on_interrupt)
    }

    /// Serve deferred resubmit requests; `None` if no stream is installed
    pub fn resubmit_pending(&self) -> Option<Result<u32>> {
        self.with(DmaStream::resubmit_pending)
    }
}

impl<C: DmaChannel, W: ResetWait> Default for SharedStream<'_, C, W> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
