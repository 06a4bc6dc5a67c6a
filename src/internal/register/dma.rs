//! Scatter-gather DMA channel register definitions.
//!
//! One DMA block carries two channels with identical layouts: memory-to-device
//! (MM2S, read channel) at offset 0x00 and device-to-memory (S2MM, write
//! channel) at offset 0x30.

#![allow(dead_code)]

use super::{reg_bit_ops, reg_rw};

// =============================================================================
// Channel Offsets
// =============================================================================

/// Offset of the memory-to-device channel within the DMA block
pub const MM2S_CHANNEL_OFFSET: usize = 0x00;
/// Offset of the device-to-memory channel within the DMA block
pub const S2MM_CHANNEL_OFFSET: usize = 0x30;

// =============================================================================
// Register Offsets (relative to channel base)
// =============================================================================

/// Channel Control Register offset
pub const DMACR_OFFSET: usize = 0x00;
/// Channel Status Register offset
pub const DMASR_OFFSET: usize = 0x04;
/// Current Descriptor Pointer (low word) offset
pub const CURDESC_OFFSET: usize = 0x08;
/// Current Descriptor Pointer (high word) offset
pub const CURDESC_MSB_OFFSET: usize = 0x0C;
/// Tail Descriptor Pointer (low word) offset
pub const TAILDESC_OFFSET: usize = 0x10;
/// Tail Descriptor Pointer (high word) offset
pub const TAILDESC_MSB_OFFSET: usize = 0x14;
/// Scatter-gather control register (shared, relative to DMA block base)
pub const SG_CTL_OFFSET: usize = 0x2C;

// =============================================================================
// Control Register (DMACR) Bits
// =============================================================================

/// Run/Stop - 1 starts the channel, 0 halts it after the current transfer
pub const DMACR_RUNSTOP: u32 = 1 << 0;
/// Soft Reset - resets the whole DMA block, self-clearing when done
pub const DMACR_RESET: u32 = 1 << 2;
/// Keyhole - fixed address transfers (unused by this driver)
pub const DMACR_KEYHOLE: u32 = 1 << 3;
/// Cyclic BD Enable - descriptor chain is fetched endlessly
pub const DMACR_CYCLIC: u32 = 1 << 4;
/// Interrupt enable bits live in the same positions as the status bits
pub const DMACR_IRQ_SHIFT: u32 = 12;
/// Interrupt coalescing threshold shift (8 bits)
pub const DMACR_COALESCE_SHIFT: u32 = 16;
/// Interrupt coalescing threshold mask
pub const DMACR_COALESCE_MASK: u32 = 0xFF << 16;
/// Interrupt delay timer shift (8 bits)
pub const DMACR_DELAY_SHIFT: u32 = 24;
/// Interrupt delay timer mask
pub const DMACR_DELAY_MASK: u32 = 0xFF << 24;

// =============================================================================
// Status Register (DMASR) Bits
// =============================================================================

/// Halted - channel is stopped
pub const DMASR_HALTED: u32 = 1 << 0;
/// Idle - channel reached the tail descriptor
pub const DMASR_IDLE: u32 = 1 << 1;
/// Scatter-gather engine included in the hardware build
pub const DMASR_SG_INCLUDED: u32 = 1 << 3;
/// DMA internal error
pub const DMASR_DMA_INT_ERR: u32 = 1 << 4;
/// DMA slave error
pub const DMASR_DMA_SLV_ERR: u32 = 1 << 5;
/// DMA decode error
pub const DMASR_DMA_DEC_ERR: u32 = 1 << 6;
/// Scatter-gather internal error
pub const DMASR_SG_INT_ERR: u32 = 1 << 8;
/// Scatter-gather slave error
pub const DMASR_SG_SLV_ERR: u32 = 1 << 9;
/// Scatter-gather decode error
pub const DMASR_SG_DEC_ERR: u32 = 1 << 10;
/// Interrupt on complete (write 1 to clear)
pub const DMASR_IOC_IRQ: u32 = 1 << 12;
/// Delay timer interrupt (write 1 to clear)
pub const DMASR_DLY_IRQ: u32 = 1 << 13;
/// Error interrupt (write 1 to clear)
pub const DMASR_ERR_IRQ: u32 = 1 << 14;
/// All interrupt bits
pub const DMASR_IRQ_ALL: u32 = DMASR_IOC_IRQ | DMASR_DLY_IRQ | DMASR_ERR_IRQ;
/// Current coalescing counter value shift (read-only)
pub const DMASR_COALESCE_SHIFT: u32 = 16;
/// Current delay counter value shift (read-only)
pub const DMASR_DELAY_SHIFT: u32 = 24;

/// All error detail bits
pub const DMASR_ALL_ERRORS: u32 = DMASR_DMA_INT_ERR
    | DMASR_DMA_SLV_ERR
    | DMASR_DMA_DEC_ERR
    | DMASR_SG_INT_ERR
    | DMASR_SG_SLV_ERR
    | DMASR_SG_DEC_ERR;

// =============================================================================
// Register Block
// =============================================================================

/// Register block of a single DMA channel.
///
/// Holds the channel base address; every accessor is a volatile access at
/// `base + offset`.
#[derive(Debug, Clone, Copy)]
pub struct DmaRegs {
    base: usize,
}

impl DmaRegs {
    /// Create a register block for the channel at `base`.
    ///
    /// # Safety
    /// `base` must be the address of a mapped DMA channel register block that
    /// stays mapped for the lifetime of the returned value.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    /// Channel base address
    pub const fn base(&self) -> usize {
        self.base
    }

    reg_rw!(control, set_control, DMACR_OFFSET, "channel control register");
    reg_rw!(status, set_status, DMASR_OFFSET, "channel status register");
    reg_rw!(
        current_desc,
        set_current_desc,
        CURDESC_OFFSET,
        "current descriptor pointer (low word)"
    );
    reg_rw!(
        current_desc_msb,
        set_current_desc_msb,
        CURDESC_MSB_OFFSET,
        "current descriptor pointer (high word)"
    );
    reg_rw!(
        tail_desc,
        set_tail_desc,
        TAILDESC_OFFSET,
        "tail descriptor pointer (low word)"
    );
    reg_rw!(
        tail_desc_msb,
        set_tail_desc_msb,
        TAILDESC_MSB_OFFSET,
        "tail descriptor pointer (high word)"
    );
    reg_bit_ops!(set_run, clear_run, DMACR_OFFSET, DMACR_RUNSTOP, "the run/stop bit");
    reg_bit_ops!(
        enable_cyclic,
        disable_cyclic,
        DMACR_OFFSET,
        DMACR_CYCLIC,
        "cyclic descriptor mode"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn irq_bits_are_disjoint_from_error_detail_bits() {
        assert_eq!(DMASR_IRQ_ALL & DMASR_ALL_ERRORS, 0);
        assert_eq!(DMASR_IRQ_ALL, 0x7000);
    }

    #[test]
    fn control_irq_enable_matches_status_positions() {
        assert_eq!(DMASR_IOC_IRQ >> DMACR_IRQ_SHIFT, 1);
        assert_eq!(DMASR_ERR_IRQ >> DMACR_IRQ_SHIFT, 4);
    }

    #[test]
    fn register_block_accesses_offsets_from_base() {
        let mut block = [0u32; 12];
        let base = block.as_mut_ptr() as usize;
        // SAFETY: `block` outlives `regs` and covers every channel offset
        let regs = unsafe { DmaRegs::new(base) };

        regs.set_tail_desc(0xDEAD_BEC0);
        regs.set_run();
        regs.enable_cyclic();

        assert_eq!(block[TAILDESC_OFFSET / 4], 0xDEAD_BEC0);
        assert_eq!(block[DMACR_OFFSET / 4], DMACR_RUNSTOP | DMACR_CYCLIC);

        regs.clear_run();
        assert_eq!(regs.control(), DMACR_CYCLIC);
    }
}
