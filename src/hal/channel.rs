//! DMA channel access
//!
//! [`DmaChannel`] is the register-level contract the engine drives. It is
//! implemented for memory-mapped AXI-style DMA blocks by [`AxiDmaChannel`] and
//! can be implemented by other backends (or mocks) without touching the ring.

use crate::dma::DmaAddr;
use crate::driver::interrupt::IrqStatus;
use crate::internal::register::dma::{
    DMACR_COALESCE_MASK, DMACR_COALESCE_SHIFT, DMACR_DELAY_MASK, DMACR_DELAY_SHIFT,
    DMACR_RESET, DMASR_ALL_ERRORS, DMASR_HALTED, DMASR_IDLE, DMASR_IRQ_ALL, DmaRegs,
    MM2S_CHANNEL_OFFSET, S2MM_CHANNEL_OFFSET,
};

// =============================================================================
// Channel Status Snapshot
// =============================================================================

/// Raw register snapshot of a channel, for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelStatus {
    /// Control register
    pub control: u32,
    /// Status register
    pub status: u32,
    /// Current descriptor pointer
    pub current_desc: DmaAddr,
    /// Tail descriptor pointer
    pub tail_desc: DmaAddr,
}

impl ChannelStatus {
    /// Channel is halted
    #[must_use]
    pub const fn is_halted(&self) -> bool {
        (self.status & DMASR_HALTED) != 0
    }

    /// Channel reached the tail descriptor
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        (self.status & DMASR_IDLE) != 0
    }

    /// Error detail bits latched by the channel
    #[must_use]
    pub const fn error_bits(&self) -> u32 {
        self.status & DMASR_ALL_ERRORS
    }
}

// =============================================================================
// Channel Trait
// =============================================================================

/// Register-level contract of one scatter-gather DMA channel.
///
/// Reads take `&self`, anything that changes channel state takes `&mut self`.
pub trait DmaChannel {
    /// Pending interrupt flags
    fn irq_status(&self) -> IrqStatus;

    /// Acknowledge (clear) interrupt flags
    fn ack_irq(&mut self, status: IrqStatus);

    /// Enable exactly the interrupt sources set in `mask`
    fn set_irq_enable(&mut self, mask: IrqStatus);

    /// Program the completion coalescing threshold and delay timer
    fn set_coalesce(&mut self, threshold: u8, delay: u8);

    /// Select cyclic descriptor mode
    fn set_cyclic(&mut self, enable: bool);

    /// Program the current descriptor pointer (channel must be halted)
    fn set_current_desc(&mut self, addr: DmaAddr);

    /// Program the tail descriptor pointer; starts fetching when running
    fn set_tail_desc(&mut self, addr: DmaAddr);

    /// Set the run bit
    fn run(&mut self);

    /// Channel is halted
    fn is_halted(&self) -> bool;

    /// Raw register snapshot
    fn snapshot(&self) -> ChannelStatus;

    /// Request a soft reset of the DMA block
    fn start_reset(&mut self);

    /// Reset has finished
    fn is_reset_done(&self) -> bool;
}

// =============================================================================
// AXI DMA Channel
// =============================================================================

/// Memory-mapped AXI DMA channel
#[derive(Debug, Clone, Copy)]
pub struct AxiDmaChannel {
    regs: DmaRegs,
}

impl AxiDmaChannel {
    /// Channel whose registers start at `channel_base`
    ///
    /// # Safety
    /// `channel_base` must be the address of a mapped DMA channel register
    /// block, and no other code may drive the same channel.
    pub const unsafe fn new(channel_base: usize) -> Self {
        Self {
            // SAFETY: forwarded to the caller
            regs: unsafe { DmaRegs::new(channel_base) },
        }
    }

    /// Memory-to-device (read) channel of the DMA block at `dma_base`
    ///
    /// # Safety
    /// See [`AxiDmaChannel::new`].
    pub const unsafe fn mm2s(dma_base: usize) -> Self {
        // SAFETY: forwarded to the caller
        unsafe { Self::new(dma_base + MM2S_CHANNEL_OFFSET) }
    }

    /// Device-to-memory (write) channel of the DMA block at `dma_base`
    ///
    /// # Safety
    /// See [`AxiDmaChannel::new`].
    pub const unsafe fn s2mm(dma_base: usize) -> Self {
        // SAFETY: forwarded to the caller
        unsafe { Self::new(dma_base + S2MM_CHANNEL_OFFSET) }
    }

    /// Underlying register block
    pub const fn regs(&self) -> &DmaRegs {
        &self.regs
    }
}

impl DmaChannel for AxiDmaChannel {
    fn irq_status(&self) -> IrqStatus {
        IrqStatus::from_raw(self.regs.status())
    }

    fn ack_irq(&mut self, status: IrqStatus) {
        self.regs.set_status(status.to_raw() & DMASR_IRQ_ALL);
    }

    fn set_irq_enable(&mut self, mask: IrqStatus) {
        // Enable bits share their positions with the status flags
        let control = self.regs.control() & !DMASR_IRQ_ALL;
        self.regs.set_control(control | mask.to_raw());
    }

    fn set_coalesce(&mut self, threshold: u8, delay: u8) {
        let control = self.regs.control() & !(DMACR_COALESCE_MASK | DMACR_DELAY_MASK);
        self.regs.set_control(
            control
                | ((threshold as u32) << DMACR_COALESCE_SHIFT)
                | ((delay as u32) << DMACR_DELAY_SHIFT),
        );
    }

    fn set_cyclic(&mut self, enable: bool) {
        if enable {
            self.regs.enable_cyclic();
        } else {
            self.regs.disable_cyclic();
        }
    }

    fn set_current_desc(&mut self, addr: DmaAddr) {
        self.regs.set_current_desc(addr as u32);
        self.regs.set_current_desc_msb((addr >> 32) as u32);
    }

    fn set_tail_desc(&mut self, addr: DmaAddr) {
        // Writing the low word starts the fetch, so it goes last
        self.regs.set_tail_desc_msb((addr >> 32) as u32);
        self.regs.set_tail_desc(addr as u32);
    }

    fn run(&mut self) {
        self.regs.set_run();
    }

    fn is_halted(&self) -> bool {
        (self.regs.status() & DMASR_HALTED) != 0
    }

    fn snapshot(&self) -> ChannelStatus {
        ChannelStatus {
            control: self.regs.control(),
            status: self.regs.status(),
            current_desc: ((self.regs.current_desc_msb() as u64) << 32)
                | self.regs.current_desc() as u64,
            tail_desc: ((self.regs.tail_desc_msb() as u64) << 32) | self.regs.tail_desc() as u64,
        }
    }

    fn start_reset(&mut self) {
        self.regs.set_control(DMACR_RESET);
    }

    fn is_reset_done(&self) -> bool {
        (self.regs.control() & DMACR_RESET) == 0
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
