//! Interrupt status handling for a scatter-gather DMA channel.
//!
//! This module provides the [`IrqStatus`] structure for parsing and
//! acknowledging channel interrupt flags.

use crate::internal::register::dma::{DMASR_DLY_IRQ, DMASR_ERR_IRQ, DMASR_IOC_IRQ};

// =============================================================================
// Interrupt Status
// =============================================================================

/// Interrupt flags of one DMA channel.
///
/// Used both for pending status (read, then written back to acknowledge) and
/// as an enable mask.
///
/// # Example
///
/// ```ignore
/// let status = channel.irq_status();
/// channel.ack_irq(status);
/// if status.has_error() {
///     // reset
/// } else if status.is_completion() {
///     // reap
/// }
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IrqStatus {
    /// Completion - coalescing threshold reached
    pub ioc: bool,
    /// Delay timer expired with completions pending
    pub delay: bool,
    /// Error - the channel halted
    pub error: bool,
}

impl IrqStatus {
    /// Every interrupt source
    pub const ALL: Self = Self {
        ioc: true,
        delay: true,
        error: true,
    };

    /// Error interrupt only (cyclic mode)
    pub const ERROR_ONLY: Self = Self {
        ioc: false,
        delay: false,
        error: true,
    };

    /// Create from raw status register value
    #[inline]
    pub const fn from_raw(status: u32) -> Self {
        Self {
            ioc: (status & DMASR_IOC_IRQ) != 0,
            delay: (status & DMASR_DLY_IRQ) != 0,
            error: (status & DMASR_ERR_IRQ) != 0,
        }
    }

    /// Convert to raw value for clearing (write-1-to-clear)
    #[inline]
    pub const fn to_raw(&self) -> u32 {
        let mut val = 0u32;
        if self.ioc {
            val |= DMASR_IOC_IRQ;
        }
        if self.delay {
            val |= DMASR_DLY_IRQ;
        }
        if self.error {
            val |= DMASR_ERR_IRQ;
        }
        val
    }

    /// Check if any interrupt occurred
    #[inline]
    pub const fn any(&self) -> bool {
        self.ioc || self.delay || self.error
    }

    /// Check if the error interrupt occurred
    #[inline]
    pub const fn has_error(&self) -> bool {
        self.error
    }

    /// Check for a completion or coalescing-timeout interrupt
    #[inline]
    pub const fn is_completion(&self) -> bool {
        self.ioc || self.delay
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn irq_status_from_raw_zero() {
        let status = IrqStatus::from_raw(0);
        assert!(!status.any());
        assert!(!status.has_error());
        assert!(!status.is_completion());
    }

    #[test]
    fn irq_status_ignores_non_irq_bits() {
        // Halted, idle and error detail bits are not interrupt sources
        let status = IrqStatus::from_raw(0x0000_0773);
        assert!(!status.any());
    }

    #[test]
    fn irq_status_completion_bits() {
        assert!(IrqStatus::from_raw(DMASR_IOC_IRQ).is_completion());
        assert!(IrqStatus::from_raw(DMASR_DLY_IRQ).is_completion());
        assert!(!IrqStatus::from_raw(DMASR_ERR_IRQ).is_completion());
    }

    #[test]
    fn irq_status_error_with_completion() {
        let status = IrqStatus::from_raw(DMASR_ERR_IRQ | DMASR_IOC_IRQ);
        assert!(status.has_error());
        assert!(status.is_completion());
    }

    #[test]
    fn irq_status_raw_roundtrip() {
        for raw in [0, DMASR_IOC_IRQ, DMASR_DLY_IRQ | DMASR_ERR_IRQ, IrqStatus::ALL.to_raw()] {
            assert_eq!(IrqStatus::from_raw(raw).to_raw(), raw);
        }
        assert_eq!(IrqStatus::ALL.to_raw(), 0x7000);
    }

    #[test]
    fn error_only_mask() {
        assert!(IrqStatus::ERROR_ONLY.has_error());
        assert!(!IrqStatus::ERROR_ONLY.is_completion());
    }
}
