//! Centralized Constants
//!
//! Single source of truth for the magic numbers used by the DMA engine.
//!
//! # Organization
//!
//! - **Descriptor layout**: size and minimum alignment of a buffer descriptor
//! - **Transfer limits**: hardware length field and default ceilings
//! - **Interrupt coalescing**: threshold and delay timer defaults
//! - **Recovery**: reset poll budgets
//! - **Streaming defaults**: descriptors per transfer, transfers in flight
//!
//! Register bit definitions stay in `internal/register/dma.rs` and descriptor
//! bit definitions in `dma/descriptor/bits.rs`.

// =============================================================================
// Descriptor Layout
// =============================================================================

/// Size of one buffer descriptor in bytes (16 words).
pub const BD_SIZE: usize = 64;

/// Minimum alignment the hardware accepts for a buffer descriptor.
///
/// Descriptors are fetched with the low six address bits ignored, so every
/// descriptor must start on a 64-byte boundary.
pub const BD_MIN_ALIGNMENT: usize = 64;

// =============================================================================
// Transfer Limits
// =============================================================================

/// Width of the buffer length field in the descriptor control word.
pub const LENGTH_FIELD_BITS: u32 = 26;

/// Largest value the hardware length field can encode.
pub const LENGTH_FIELD_MAX: u32 = (1 << LENGTH_FIELD_BITS) - 1;

/// Default per-descriptor transfer ceiling (23-bit buffer length register).
pub const DEFAULT_MAX_TRANSFER_LEN: u32 = (1 << 23) - 1;

// =============================================================================
// Interrupt Coalescing
// =============================================================================

/// Default completion interrupt coalescing threshold.
///
/// Matches the default number of descriptors per transfer, so a transfer
/// raises exactly one completion interrupt.
pub const DEFAULT_COALESCE_COUNT: u8 = 10;

/// Default coalescing delay timer (in hardware timer units, 0 disables).
pub const DEFAULT_DELAY_TIMER: u8 = 100;

/// Largest coalescing threshold the control register accepts.
pub const MAX_COALESCE_COUNT: u8 = 255;

// =============================================================================
// Recovery
// =============================================================================

/// Default number of polls waiting for the reset-done condition.
///
/// Iteration-counted, not wall-clock: the engine does not assume a timer.
pub const RESET_POLL_BUDGET: u32 = 10_000;

/// Poll interval for delay-based reset waits, in microseconds.
pub const RESET_POLL_INTERVAL_US: u32 = 10;

/// Default timeout for delay-based reset waits, in microseconds.
pub const RESET_TIMEOUT_US: u32 = 100_000;

// =============================================================================
// Streaming Defaults
// =============================================================================

/// Default number of descriptors a normal-mode transfer is split into.
pub const DEFAULT_DESCRIPTORS_PER_TRANSFER: u16 = 10;

/// Default number of transfers kept committed at once in normal mode.
pub const DEFAULT_TRANSFERS_IN_FLIGHT: u8 = 2;
