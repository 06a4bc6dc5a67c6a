//! AXI-Style Scatter-Gather DMA Ring Engine
//!
//! A `no_std`, `no_alloc` driver for scatter-gather DMA channels that fetch
//! chained buffer descriptors from memory.
//!
//! Software and hardware share a fixed ring of descriptors. The ring tracks
//! every ownership transition with monotonic sequence counters; a channel
//! engine writes the tail pointer to hand committed descriptors over; a
//! stream splits one large buffer into transfers and keeps them flowing from
//! the channel's interrupt.
//!
//! # Architecture
//!
//! 1. **Ring Layer** ([`dma`]): descriptor layout, allocate / configure /
//!    commit / reap / free, cyclic arming
//! 2. **Driver Layer** ([`driver`]): engine, stream orchestration, interrupt
//!    dispatch and fault recovery
//! 3. **HAL Layer** ([`hal`]): the [`DmaChannel`] register seam and bounded
//!    channel reset
//!
//! # Features
//!
//! - `defmt`: Enable defmt formatting for status and error types
//! - `log`: Emit diagnostics through the `log` facade
//! - `critical-section`: Enable the ISR-safe `SharedStream` wrapper
//!
//! # Example
//!
//! ```ignore
//! use ph_axi_sgdma::{AxiDmaChannel, DescriptorRing, DmaStream, RingEngine};
//! use ph_axi_sgdma::{StreamConfig, StreamSignals, TransferBuffer};
//!
//! static SIGNALS: StreamSignals = StreamSignals::new();
//!
//! #[repr(C, align(64))]
//! struct RingMem([u8; 64 * 64]);
//! static mut RING_MEM: RingMem = RingMem([0; 64 * 64]);
//!
//! let mem = unsafe { &mut (*core::ptr::addr_of_mut!(RING_MEM)).0 };
//! let ring = DescriptorRing::create(mem, RING_PHYS, 64, 0x7F_FFFF)?;
//! let engine = RingEngine::new(ring, unsafe { AxiDmaChannel::mm2s(DMA_BASE) });
//!
//! let mut stream = DmaStream::new(engine, StreamConfig::new(), &SIGNALS)?;
//! stream.set_buffer(TransferBuffer::new(BUF_PHYS, 1 << 20))?;
//! stream.start()?;
//!
//! // From the channel interrupt:
//! match stream.on_interrupt() {
//!     DispatchOutcome::Faulted(report) => log::error!("{:?}", report.error()),
//!     _ => {}
//! }
//! ```
//!
//! # Memory Requirements
//!
//! Each descriptor takes 64 bytes; the region must be 64-byte aligned and
//! reachable by the DMA master at the physical address passed in.

#![no_std]
#![deny(missing_docs)]
#![allow(unsafe_code)]
#![deny(unsafe_op_in_unsafe_fn)]
// Clippy lint levels (mirrored in Cargo.toml [lints])
#![deny(clippy::correctness)]
#![warn(
    clippy::suspicious,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::cloned_instead_of_copied,
    clippy::explicit_iter_loop,
    clippy::implicit_clone,
    clippy::inconsistent_struct_constructor,
    clippy::manual_assert,
    clippy::manual_let_else,
    clippy::match_same_arms,
    clippy::needless_pass_by_value,
    clippy::semicolon_if_nothing_returned,
    clippy::uninlined_format_args,
    clippy::unnested_or_patterns,
    clippy::std_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::alloc_instead_of_core
)]
#![allow(
    clippy::mod_module_files,
    clippy::self_named_module_files,
    clippy::similar_names,
    clippy::too_many_arguments,
    clippy::struct_excessive_bools,
    clippy::fn_params_excessive_bools,
    clippy::type_complexity,
    clippy::must_use_candidate,
    clippy::assertions_on_constants,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::cast_lossless,
    clippy::panic_in_result_fn,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::module_name_repetitions,
    clippy::wildcard_imports,
    clippy::items_after_statements,
    clippy::let_underscore_future
)]

// =============================================================================
// Modules
// =============================================================================

pub mod dma;
pub mod driver;
pub mod hal;
pub mod sync;

// Internal implementation details (pub(crate) only)
mod internal;

// Test utilities (only available during testing)
#[cfg(test)]
pub mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use dma::{
    BufferDescriptor, DescriptorFault, DescriptorHandle, DescriptorRegion, DescriptorRing,
    DescriptorRun, DescriptorStatus, DmaAddr, FrameFlags, ReapFault, Reaped,
};
pub use driver::config::{Direction, Mode, ResubmitPolicy, StreamConfig};
pub use driver::dispatch::{Completion, DispatchOutcome, FaultReport};
pub use driver::engine::RingEngine;
pub use driver::error::{
    ConfigError, ConfigResult, Error, HardwareError, HardwareResult, Result, RingError,
    RingResult,
};
pub use driver::interrupt::IrqStatus;
pub use driver::stream::{DmaStream, StreamState, StreamStats, TransferBuffer};
pub use hal::channel::{AxiDmaChannel, ChannelStatus, DmaChannel};
pub use hal::reset::{DelayWait, ResetController, ResetState, ResetWait, SpinWait};
pub use sync::{EventSlot, StreamSignals};

// Re-export the shared wrapper when critical-section is enabled
#[cfg(feature = "critical-section")]
pub use sync::SharedStream;

/// Low-level register accessors for advanced use.
///
/// Most users should drive the channel through [`AxiDmaChannel`] instead.
///
/// # Safety
///
/// Direct register access bypasses the engine's bookkeeping. Writing the
/// tail or run bit behind its back desynchronizes ring ownership.
pub mod unsafe_registers {
    pub use crate::internal::register::dma::DmaRegs;
}

/// Hardware limits and default tunables.
pub mod constants {
    pub use crate::internal::constants::{
        // Descriptor layout
        BD_MIN_ALIGNMENT,
        BD_SIZE,
        // Interrupt coalescing
        DEFAULT_COALESCE_COUNT,
        DEFAULT_DELAY_TIMER,
        // Stream defaults
        DEFAULT_DESCRIPTORS_PER_TRANSFER,
        DEFAULT_MAX_TRANSFER_LEN,
        DEFAULT_TRANSFERS_IN_FLIGHT,
        LENGTH_FIELD_BITS,
        LENGTH_FIELD_MAX,
        MAX_COALESCE_COUNT,
        // Reset
        RESET_POLL_BUDGET,
        RESET_POLL_INTERVAL_US,
        RESET_TIMEOUT_US,
    };
}
