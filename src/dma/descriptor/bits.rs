//! Buffer descriptor bit field constants.
//!
//! Layout follows the AXI DMA scatter-gather descriptor: sixteen 32-bit words,
//! of which the hardware owns the first thirteen.

#![allow(dead_code)]

use crate::internal::constants::LENGTH_FIELD_MAX;

// =============================================================================
// Word Offsets
// =============================================================================

/// Word offsets inside a descriptor (in bytes)
pub mod offset {
    /// Next descriptor pointer (low word)
    pub const NEXT_DESC: usize = 0x00;
    /// Next descriptor pointer (high word)
    pub const NEXT_DESC_MSB: usize = 0x04;
    /// Buffer address (low word)
    pub const BUFFER_ADDR: usize = 0x08;
    /// Buffer address (high word)
    pub const BUFFER_ADDR_MSB: usize = 0x0C;
    /// Control word
    pub const CONTROL: usize = 0x18;
    /// Status word
    pub const STATUS: usize = 0x1C;
    /// First application word
    pub const APP0: usize = 0x20;
    /// Software correlation id (not fetched by hardware)
    pub const SW_ID: usize = 0x34;
    /// Software ownership tag (not fetched by hardware)
    pub const SW_TAG: usize = 0x38;
}

// =============================================================================
// Next Descriptor Pointer
// =============================================================================

/// Next descriptor pointer bit field constants
pub mod next {
    /// Low six address bits are ignored by the hardware
    pub const IGNORED_MASK: u32 = 0x3F;
}

// =============================================================================
// Control Word
// =============================================================================

/// Control word bit field constants
pub mod ctrl {
    use super::LENGTH_FIELD_MAX;

    /// Buffer length mask
    pub const LENGTH_MASK: u32 = LENGTH_FIELD_MAX;
    /// End of Frame - last descriptor of a packet (transmit only)
    pub const TXEOF: u32 = 1 << 26;
    /// Start of Frame - first descriptor of a packet (transmit only)
    pub const TXSOF: u32 = 1 << 27;
    /// Frame marker bits
    pub const FRAME_MASK: u32 = TXSOF | TXEOF;
}

// =============================================================================
// Status Word
// =============================================================================

/// Status word bit field constants
pub mod status {
    use super::LENGTH_FIELD_MAX;

    /// Transferred bytes mask
    pub const LENGTH_MASK: u32 = LENGTH_FIELD_MAX;
    /// End of Frame - descriptor holds the end of a received packet
    pub const RXEOF: u32 = 1 << 26;
    /// Start of Frame - descriptor holds the start of a received packet
    pub const RXSOF: u32 = 1 << 27;
    /// DMA internal error
    pub const INT_ERR: u32 = 1 << 28;
    /// DMA slave error
    pub const SLV_ERR: u32 = 1 << 29;
    /// DMA decode error
    pub const DEC_ERR: u32 = 1 << 30;
    /// Completed - written by the hardware once the descriptor is done
    pub const COMPLETE: u32 = 1 << 31;

    /// All error bits
    pub const ALL_ERRORS: u32 = INT_ERR | SLV_ERR | DEC_ERR;
}
