//! Testing utilities and mock implementations
//!
//! This module provides mock implementations for testing the DMA engine
//! on the host without hardware access.
//!
//! Only available when running `cargo test`.

// Note: The #[cfg(test)] attribute is applied in lib.rs where this module is declared
#![allow(missing_docs)]
#![allow(clippy::std_instead_of_core, clippy::std_instead_of_alloc)]

extern crate std;

use core::cell::{Cell, RefCell};
use std::vec::Vec;

use crate::dma::descriptor::bits::status;
use crate::dma::{BufferDescriptor, DescriptorRing, DmaAddr};
use crate::driver::interrupt::IrqStatus;
use crate::hal::channel::{ChannelStatus, DmaChannel};
use crate::internal::register::dma::{
    DMACR_CYCLIC, DMACR_RUNSTOP, DMASR_DMA_SLV_ERR, DMASR_HALTED,
};

// =============================================================================
// Descriptor Memory
// =============================================================================

/// Zeroed, 64-byte aligned memory for a descriptor region
#[repr(C, align(64))]
pub struct AlignedRegion<const N: usize>([u8; N]);

impl<const N: usize> AlignedRegion<N> {
    pub const fn new() -> Self {
        Self([0; N])
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

impl<const N: usize> Default for AlignedRegion<N> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Simulated Hardware Writes
// =============================================================================

/// Complete a descriptor the way the hardware does (full length moved)
pub fn mark_complete(desc: &BufferDescriptor) {
    desc.set_raw_status(status::COMPLETE | desc.length());
}

/// Complete a receive descriptor with `len` bytes, optionally ending a packet
pub fn mark_received(desc: &BufferDescriptor, len: u32, end_of_frame: bool) {
    let eof = if end_of_frame { status::RXEOF } else { 0 };
    desc.set_raw_status(status::COMPLETE | eof | len);
}

/// Flag a descriptor with a slave error
pub fn mark_error(desc: &BufferDescriptor) {
    desc.set_raw_status(status::SLV_ERR);
}

/// Complete the `count` oldest hardware-owned descriptors
pub fn complete_in_flight(ring: &DescriptorRing<'_>, count: usize) {
    let first = ring.region().index_of(ring.hw_head()).unwrap_or(0);
    for offset in 0..count.min(ring.hw_count()) {
        let desc = ring.region().get((first + offset) % ring.capacity()).unwrap();
        mark_complete(desc);
    }
}

// =============================================================================
// Mock DMA Channel
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResetBehaviour {
    /// Done after this many unsuccessful polls
    After(u32),
    Never,
}

/// Mock DMA channel for testing without hardware
///
/// Interior-mutable so that `&self` polls can advance simulated hardware state
/// (e.g. a reset finishing).
#[derive(Debug)]
pub struct MockChannel {
    pending: Cell<IrqStatus>,
    acked: RefCell<Vec<IrqStatus>>,
    irq_enable: Cell<IrqStatus>,
    coalesce: Cell<Option<(u8, u8)>>,
    cyclic: Cell<bool>,
    current_desc: Cell<Option<DmaAddr>>,
    tail_writes: RefCell<Vec<DmaAddr>>,
    running: Cell<bool>,
    halted: Cell<bool>,
    error_bits: Cell<u32>,
    reset_behaviour: Cell<ResetBehaviour>,
    reset_pending: Cell<bool>,
    reset_polls: Cell<u32>,
    resets_requested: Cell<u32>,
}

impl Default for MockChannel {
    fn default() -> Self {
        Self {
            pending: Cell::new(IrqStatus::default()),
            acked: RefCell::new(Vec::new()),
            irq_enable: Cell::new(IrqStatus::default()),
            coalesce: Cell::new(None),
            cyclic: Cell::new(false),
            current_desc: Cell::new(None),
            tail_writes: RefCell::new(Vec::new()),
            running: Cell::new(false),
            halted: Cell::new(true),
            error_bits: Cell::new(0),
            reset_behaviour: Cell::new(ResetBehaviour::After(0)),
            reset_pending: Cell::new(false),
            reset_polls: Cell::new(0),
            resets_requested: Cell::new(0),
        }
    }
}

impl MockChannel {
    /// Create a halted channel whose resets finish on the first poll
    pub fn new() -> Self {
        Self::default()
    }

    // --- scripting ---

    /// Resets finish after `polls` unsuccessful polls
    pub fn set_reset_done_after(&self, polls: u32) {
        self.reset_behaviour.set(ResetBehaviour::After(polls));
    }

    /// Resets never finish
    pub fn set_reset_never_completes(&self) {
        self.reset_behaviour.set(ResetBehaviour::Never);
    }

    /// Force the halted status
    pub fn set_halted(&self, halted: bool) {
        self.halted.set(halted);
    }

    /// Raise interrupt flags
    pub fn raise(&self, irq: IrqStatus) {
        let p = self.pending.get();
        self.pending.set(IrqStatus {
            ioc: p.ioc || irq.ioc,
            delay: p.delay || irq.delay,
            error: p.error || irq.error,
        });
    }

    /// Raise a completion interrupt
    pub fn raise_completion(&self) {
        self.raise(IrqStatus {
            ioc: true,
            ..IrqStatus::default()
        });
    }

    /// Raise an error interrupt; the channel halts as real hardware does
    pub fn raise_error(&self) {
        self.raise(IrqStatus {
            error: true,
            ..IrqStatus::default()
        });
        self.error_bits.set(DMASR_DMA_SLV_ERR);
        self.halted.set(true);
    }

    // --- inspection ---

    pub fn acked(&self) -> Vec<IrqStatus> {
        self.acked.borrow().clone()
    }

    pub fn irq_enable(&self) -> IrqStatus {
        self.irq_enable.get()
    }

    pub fn coalesce(&self) -> Option<(u8, u8)> {
        self.coalesce.get()
    }

    pub fn is_cyclic(&self) -> bool {
        self.cyclic.get()
    }

    pub fn current_desc(&self) -> Option<DmaAddr> {
        self.current_desc.get()
    }

    pub fn tail_writes(&self) -> Vec<DmaAddr> {
        self.tail_writes.borrow().clone()
    }

    pub fn last_tail(&self) -> Option<DmaAddr> {
        self.tail_writes.borrow().last().copied()
    }

    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    /// Polls of the reset-done condition since the last reset request
    pub fn reset_polls(&self) -> u32 {
        self.reset_polls.get()
    }

    pub fn resets_requested(&self) -> u32 {
        self.resets_requested.get()
    }

    fn finish_reset(&self) {
        self.reset_pending.set(false);
        self.pending.set(IrqStatus::default());
        self.irq_enable.set(IrqStatus::default());
        self.coalesce.set(None);
        self.cyclic.set(false);
        self.current_desc.set(None);
        self.running.set(false);
        self.halted.set(true);
        self.error_bits.set(0);
    }
}

impl DmaChannel for MockChannel {
    fn irq_status(&self) -> IrqStatus {
        self.pending.get()
    }

    fn ack_irq(&mut self, irq: IrqStatus) {
        let p = self.pending.get();
        self.pending.set(IrqStatus {
            ioc: p.ioc && !irq.ioc,
            delay: p.delay && !irq.delay,
            error: p.error && !irq.error,
        });
        self.acked.borrow_mut().push(irq);
    }

    fn set_irq_enable(&mut self, mask: IrqStatus) {
        self.irq_enable.set(mask);
    }

    fn set_coalesce(&mut self, threshold: u8, delay: u8) {
        self.coalesce.set(Some((threshold, delay)));
    }

    fn set_cyclic(&mut self, enable: bool) {
        self.cyclic.set(enable);
    }

    fn set_current_desc(&mut self, addr: DmaAddr) {
        self.current_desc.set(Some(addr));
    }

    fn set_tail_desc(&mut self, addr: DmaAddr) {
        self.tail_writes.borrow_mut().push(addr);
    }

    fn run(&mut self) {
        self.running.set(true);
        self.halted.set(false);
    }

    fn is_halted(&self) -> bool {
        self.halted.get()
    }

    fn snapshot(&self) -> ChannelStatus {
        let mut control = 0;
        if self.running.get() {
            control |= DMACR_RUNSTOP;
        }
        if self.cyclic.get() {
            control |= DMACR_CYCLIC;
        }
        let mut status = self.pending.get().to_raw() | self.error_bits.get();
        if self.halted.get() {
            status |= DMASR_HALTED;
        }
        ChannelStatus {
            control,
            status,
            current_desc: self.current_desc.get().unwrap_or(0),
            tail_desc: self.last_tail().unwrap_or(0),
        }
    }

    fn start_reset(&mut self) {
        self.reset_pending.set(true);
        self.reset_polls.set(0);
        self.resets_requested.set(self.resets_requested.get() + 1);
        self.running.set(false);
    }

    fn is_reset_done(&self) -> bool {
        if !self.reset_pending.get() {
            return true;
        }
        let polls = self.reset_polls.get() + 1;
        self.reset_polls.set(polls);
        match self.reset_behaviour.get() {
            ResetBehaviour::After(n) if polls > n => {
                self.finish_reset();
                true
            }
            _ => false,
        }
    }
}

// =============================================================================
// Mock Delay
// =============================================================================

/// Mock delay for testing without actual timing
///
/// Records delays for verification without actually waiting.
#[derive(Debug, Default)]
pub struct MockDelay {
    /// Total nanoseconds delayed
    total_ns: Cell<u64>,
}

impl MockDelay {
    /// Create a new mock delay
    pub fn new() -> Self {
        Self::default()
    }

    /// Get total nanoseconds that were "delayed"
    pub fn total_ns(&self) -> u64 {
        self.total_ns.get()
    }
}

impl embedded_hal::delay::DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns.set(self.total_ns.get() + ns as u64);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_channel_starts_halted() {
        let channel = MockChannel::new();
        assert!(channel.is_halted());
        assert!(!channel.irq_status().any());
        assert!(channel.tail_writes().is_empty());
    }

    #[test]
    fn mock_channel_ack_clears_only_acked_bits() {
        let mut channel = MockChannel::new();
        channel.raise_completion();
        channel.raise_error();

        channel.ack_irq(IrqStatus {
            ioc: true,
            ..IrqStatus::default()
        });
        let left = channel.irq_status();
        assert!(!left.ioc);
        assert!(left.error);
        assert_eq!(channel.acked().len(), 1);
    }

    #[test]
    fn mock_channel_reset_clears_state() {
        let mut channel = MockChannel::new();
        channel.set_cyclic(true);
        channel.run();
        channel.raise_error();

        channel.start_reset();
        assert!(channel.is_reset_done());
        assert!(!channel.is_cyclic());
        assert!(!channel.is_running());
        assert_eq!(channel.snapshot().error_bits(), 0);
    }

    #[test]
    fn mock_delay_accumulates() {
        use embedded_hal::delay::DelayNs;

        let mut delay = MockDelay::new();
        delay.delay_us(3);
        delay.delay_ns(500);
        assert_eq!(delay.total_ns(), 3_500);
    }
}
