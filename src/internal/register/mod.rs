//! Memory-mapped register access for the DMA channel block.
//!
//! All register access is volatile to ensure proper hardware interaction.
//! Register blocks are addressed by an instance base, so several engines can
//! coexist at different addresses.

pub mod dma;

/// Read a 32-bit register at the given address
///
/// # Safety
/// The caller must ensure the address is valid and properly aligned.
#[inline(always)]
pub unsafe fn read_reg(addr: usize) -> u32 {
    unsafe { core::ptr::read_volatile(addr as *const u32) }
}

/// Write a 32-bit value to a register at the given address
///
/// # Safety
/// The caller must ensure the address is valid and properly aligned.
#[inline(always)]
pub unsafe fn write_reg(addr: usize, value: u32) {
    unsafe { core::ptr::write_volatile(addr as *mut u32, value) }
}

/// Modify a register using a read-modify-write operation
///
/// # Safety
/// The caller must ensure the address is valid and properly aligned.
#[inline(always)]
pub unsafe fn modify_reg<F>(addr: usize, f: F)
where
    F: FnOnce(u32) -> u32,
{
    // SAFETY: caller guarantees address validity
    let value = unsafe { read_reg(addr) };
    unsafe { write_reg(addr, f(value)) }
}

// =============================================================================
// Register Access Macros
// =============================================================================

/// Generate read/write accessor methods for a register relative to `self.base`.
///
/// # Example
/// ```ignore
/// impl DmaRegs {
///     reg_rw!(control, set_control, DMACR_OFFSET, "channel control register");
/// }
/// ```
macro_rules! reg_rw {
    ($read_fn:ident, $write_fn:ident, $offset:expr, $doc:expr) => {
        #[doc = concat!("Read ", $doc)]
        #[inline(always)]
        pub fn $read_fn(&self) -> u32 {
            // SAFETY: `base` was validated as a mapped register block at construction
            unsafe { $crate::internal::register::read_reg(self.base + $offset) }
        }

        #[doc = concat!("Write ", $doc)]
        #[inline(always)]
        pub fn $write_fn(&self, value: u32) {
            // SAFETY: `base` was validated as a mapped register block at construction
            unsafe { $crate::internal::register::write_reg(self.base + $offset, value) }
        }
    };
}

/// Generate set/clear bit operation methods for a register relative to `self.base`.
macro_rules! reg_bit_ops {
    ($set_fn:ident, $clear_fn:ident, $offset:expr, $bit:expr, $what:expr) => {
        #[doc = concat!("Set ", $what)]
        #[inline(always)]
        pub fn $set_fn(&self) {
            // SAFETY: `base` was validated as a mapped register block at construction
            unsafe { $crate::internal::register::modify_reg(self.base + $offset, |v| v | $bit) }
        }

        #[doc = concat!("Clear ", $what)]
        #[inline(always)]
        pub fn $clear_fn(&self) {
            // SAFETY: `base` was validated as a mapped register block at construction
            unsafe { $crate::internal::register::modify_reg(self.base + $offset, |v| v & !$bit) }
        }
    };
}

pub(crate) use reg_bit_ops;
pub(crate) use reg_rw;
