//! Scatter-gather buffer descriptor
//!
//! One descriptor describes one contiguous transfer. The hardware reads the
//! pointer and control words and writes back the status word on completion.

use super::bits::{ctrl, status};
use super::{FrameFlags, VolatileCell};
use crate::dma::DmaAddr;
use crate::internal::constants::BD_SIZE;

// =============================================================================
// Status Decoding
// =============================================================================

/// Error bits reported in a descriptor's status word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DescriptorFault {
    /// DMA internal error (e.g. zero-length transfer)
    pub internal: bool,
    /// Slave error on the data bus
    pub slave: bool,
    /// Decode error (invalid buffer address)
    pub decode: bool,
}

impl DescriptorFault {
    /// Decode the error bits of a raw status word
    #[must_use]
    pub const fn from_status(raw: u32) -> Option<Self> {
        if raw & status::ALL_ERRORS == 0 {
            return None;
        }
        Some(Self {
            internal: (raw & status::INT_ERR) != 0,
            slave: (raw & status::SLV_ERR) != 0,
            decode: (raw & status::DEC_ERR) != 0,
        })
    }

    /// Convert back to raw status bits
    #[must_use]
    pub const fn to_bits(&self) -> u32 {
        let mut bits = 0;
        if self.internal {
            bits |= status::INT_ERR;
        }
        if self.slave {
            bits |= status::SLV_ERR;
        }
        if self.decode {
            bits |= status::DEC_ERR;
        }
        bits
    }
}

/// Hardware-reported state of a descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DescriptorStatus {
    /// Neither complete nor failed; hardware still owns it
    InFlight,
    /// Completed without error
    Complete {
        /// Bytes actually moved
        transferred: u32,
    },
    /// Hardware flagged an error
    Faulted(DescriptorFault),
}

impl DescriptorStatus {
    /// Decode a raw status word
    ///
    /// Error bits win over the complete bit.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        if let Some(fault) = DescriptorFault::from_status(raw) {
            return DescriptorStatus::Faulted(fault);
        }
        if raw & status::COMPLETE != 0 {
            DescriptorStatus::Complete {
                transferred: raw & status::LENGTH_MASK,
            }
        } else {
            DescriptorStatus::InFlight
        }
    }
}

// =============================================================================
// BufferDescriptor Structure
// =============================================================================

/// Scatter-gather buffer descriptor
///
/// 64 bytes, 64-byte aligned. All fields are accessed through volatile
/// operations.
#[repr(C, align(64))]
pub struct BufferDescriptor {
    /// Next descriptor pointer (low word)
    next_desc: VolatileCell<u32>,
    /// Next descriptor pointer (high word)
    next_desc_msb: VolatileCell<u32>,
    /// Buffer address (low word)
    buffer_addr: VolatileCell<u32>,
    /// Buffer address (high word)
    buffer_addr_msb: VolatileCell<u32>,
    /// Reserved
    _reserved0: u32,
    /// Reserved
    _reserved1: u32,
    /// Control: buffer length and frame markers
    control: VolatileCell<u32>,
    /// Status: transferred length, frame markers, error and complete bits
    status: VolatileCell<u32>,
    /// User application words
    app: [VolatileCell<u32>; 5],
    /// Software correlation id
    id: VolatileCell<u32>,
    /// Software ownership tag
    tag: VolatileCell<u32>,
    /// Padding to 64 bytes
    _spare: u32,
}

impl BufferDescriptor {
    /// Size of the descriptor in bytes
    pub const SIZE: usize = BD_SIZE;

    /// Number of user application words
    pub const APP_WORDS: usize = 5;

    /// Create a zeroed descriptor
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next_desc: VolatileCell::new(0),
            next_desc_msb: VolatileCell::new(0),
            buffer_addr: VolatileCell::new(0),
            buffer_addr_msb: VolatileCell::new(0),
            _reserved0: 0,
            _reserved1: 0,
            control: VolatileCell::new(0),
            status: VolatileCell::new(0),
            app: [const { VolatileCell::new(0) }; 5],
            id: VolatileCell::new(0),
            tag: VolatileCell::new(0),
            _spare: 0,
        }
    }

    /// Clear every word except the next pointer
    pub fn clear(&self) {
        self.buffer_addr.set(0);
        self.buffer_addr_msb.set(0);
        self.control.set(0);
        self.status.set(0);
        for word in &self.app {
            word.set(0);
        }
        self.id.set(0);
        self.tag.set(0);
    }

    /// Link this descriptor to the next one in the chain
    #[inline(always)]
    pub fn set_next(&self, addr: DmaAddr) {
        self.next_desc.set(addr as u32);
        self.next_desc_msb.set((addr >> 32) as u32);
    }

    /// Next descriptor address
    #[inline(always)]
    #[must_use]
    pub fn next(&self) -> DmaAddr {
        ((self.next_desc_msb.get() as u64) << 32) | self.next_desc.get() as u64
    }

    /// Set the data buffer address
    #[inline(always)]
    pub fn set_buffer(&self, addr: DmaAddr) {
        self.buffer_addr.set(addr as u32);
        self.buffer_addr_msb.set((addr >> 32) as u32);
    }

    /// Data buffer address
    #[inline(always)]
    #[must_use]
    pub fn buffer(&self) -> DmaAddr {
        ((self.buffer_addr_msb.get() as u64) << 32) | self.buffer_addr.get() as u64
    }

    /// Prepare the descriptor for a transfer
    ///
    /// Writes length and frame markers and clears the status word. The length
    /// is truncated to the hardware field; range checks belong to the ring.
    pub fn prepare(&self, buffer: DmaAddr, len: u32, flags: FrameFlags) {
        self.set_buffer(buffer);
        self.control
            .set((len & ctrl::LENGTH_MASK) | (flags.bits() & ctrl::FRAME_MASK));
        self.status.set(0);
    }

    /// Programmed buffer length
    #[inline(always)]
    #[must_use]
    pub fn length(&self) -> u32 {
        self.control.get() & ctrl::LENGTH_MASK
    }

    /// Programmed frame markers
    #[inline(always)]
    #[must_use]
    pub fn frame_flags(&self) -> FrameFlags {
        FrameFlags::from_bits(self.control.get())
    }

    /// Check if the hardware set the complete bit
    #[inline(always)]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        (self.status.get() & status::COMPLETE) != 0
    }

    /// Check if the hardware flagged an error
    #[inline(always)]
    #[must_use]
    pub fn has_error(&self) -> bool {
        (self.status.get() & status::ALL_ERRORS) != 0
    }

    /// Decoded hardware status
    #[inline(always)]
    #[must_use]
    pub fn state(&self) -> DescriptorStatus {
        DescriptorStatus::from_raw(self.status.get())
    }

    /// Bytes the hardware reports as transferred
    #[inline(always)]
    #[must_use]
    pub fn transferred(&self) -> u32 {
        self.status.get() & status::LENGTH_MASK
    }

    /// Check if this descriptor closes a frame
    ///
    /// True for a transmit descriptor programmed with end-of-frame, or a
    /// receive descriptor the hardware marked as holding the end of a packet.
    #[inline(always)]
    #[must_use]
    pub fn ends_frame(&self) -> bool {
        self.frame_flags().is_end() || (self.status.get() & status::RXEOF) != 0
    }

    /// Clear the status word
    #[inline(always)]
    pub fn clear_status(&self) {
        self.status.set(0);
    }

    /// Set the software correlation id
    #[inline(always)]
    pub fn set_id(&self, id: u32) {
        self.id.set(id);
    }

    /// Software correlation id
    #[inline(always)]
    #[must_use]
    pub fn id(&self) -> u32 {
        self.id.get()
    }

    /// Write a user application word (ignored for out-of-range indices)
    pub fn set_app(&self, index: usize, value: u32) {
        if let Some(word) = self.app.get(index) {
            word.set(value);
        }
    }

    /// Read a user application word
    #[must_use]
    pub fn app(&self, index: usize) -> Option<u32> {
        self.app.get(index).map(VolatileCell::get)
    }

    #[inline(always)]
    pub(crate) fn tag(&self) -> u32 {
        self.tag.get()
    }

    #[inline(always)]
    pub(crate) fn set_tag(&self, tag: u32) {
        self.tag.set(tag);
    }

    /// Get raw control word (for debugging)
    #[inline(always)]
    #[must_use]
    pub fn raw_control(&self) -> u32 {
        self.control.get()
    }

    /// Get raw status word (for debugging)
    #[inline(always)]
    #[must_use]
    pub fn raw_status(&self) -> u32 {
        self.status.get()
    }

    /// Overwrite the status word the way the hardware does
    #[cfg(test)]
    pub(crate) fn set_raw_status(&self, raw: u32) {
        self.status.set(raw);
    }
}

impl Default for BufferDescriptor {
    fn default() -> Self {
        Self::new()
    }
}

// Safety: BufferDescriptor uses volatile cells for all DMA-accessed fields
unsafe impl Sync for BufferDescriptor {}
unsafe impl Send for BufferDescriptor {}

// =============================================================================
// Unit Tests
// =============================================================================
