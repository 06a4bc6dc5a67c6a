//! Buffer descriptor definitions
//!
//! This module defines the scatter-gather buffer descriptor read and written by
//! the DMA channel, and the volatile cell used for every descriptor word.
//!
//! # Architecture
//!
//! Descriptors are chained through their next-pointer words into a ring. The
//! hardware fetches a descriptor, moves `length` bytes to or from the buffer,
//! writes the status word, and follows the next pointer until it reaches the
//! tail descriptor programmed into the channel.
//!
//! Software keeps two words of its own in the descriptor tail (`id` and an
//! ownership tag); the hardware never fetches or writes them.

pub mod bits;
mod buffer;

pub use buffer::{BufferDescriptor, DescriptorFault, DescriptorStatus};

/// Frame markers attached to a descriptor's control word
///
/// Only transmit descriptors carry markers; receive descriptors report them in
/// their status word after completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameFlags(u32);

impl FrameFlags {
    /// No markers (middle of a frame, or a receive descriptor)
    pub const NONE: Self = Self(0);
    /// First descriptor of a frame
    pub const START_OF_FRAME: Self = Self(bits::ctrl::TXSOF);
    /// Last descriptor of a frame
    pub const END_OF_FRAME: Self = Self(bits::ctrl::TXEOF);
    /// Whole frame in a single descriptor
    pub const WHOLE_FRAME: Self = Self(bits::ctrl::TXSOF | bits::ctrl::TXEOF);

    /// Markers from raw control bits (non-marker bits are dropped)
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits & bits::ctrl::FRAME_MASK)
    }

    /// Raw control word bits
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Combine two sets of markers
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Check whether all markers in `other` are set
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Check for the start-of-frame marker
    #[must_use]
    pub const fn is_start(self) -> bool {
        self.contains(Self::START_OF_FRAME)
    }

    /// Check for the end-of-frame marker
    #[must_use]
    pub const fn is_end(self) -> bool {
        self.contains(Self::END_OF_FRAME)
    }
}

impl core::ops::BitOr for FrameFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// Volatile cell wrapper for descriptor fields
///
/// Ensures all accesses are volatile to prevent compiler optimization
/// from reordering or caching descriptor field accesses.
#[repr(transparent)]
pub struct VolatileCell<T: Copy> {
    value: core::cell::UnsafeCell<T>,
}

// Safety: all access is through volatile operations, which are single
// word-sized accesses for the u32 fields used here.
unsafe impl<T: Copy> Sync for VolatileCell<T> {}

impl<T: Copy> VolatileCell<T> {
    /// Create a new volatile cell with the given initial value
    #[inline(always)]
    pub const fn new(value: T) -> Self {
        Self {
            value: core::cell::UnsafeCell::new(value),
        }
    }

    /// Read the value (volatile read)
    #[inline(always)]
    pub fn get(&self) -> T {
        // SAFETY: the pointer comes from a live UnsafeCell
        unsafe { core::ptr::read_volatile(self.value.get()) }
    }

    /// Write a value (volatile write)
    #[inline(always)]
    pub fn set(&self, value: T) {
        // SAFETY: the pointer comes from a live UnsafeCell
        unsafe { core::ptr::write_volatile(self.value.get(), value) }
    }

    /// Update the value using a function (read-modify-write)
    #[inline(always)]
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(T) -> T,
    {
        let old = self.get();
        self.set(f(old));
    }
}

impl<T: Copy + Default> Default for VolatileCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volatile_cell_get_set_update() {
        let cell = VolatileCell::new(5u32);
        assert_eq!(cell.get(), 5);
        cell.set(7);
        assert_eq!(cell.get(), 7);
        cell.update(|v| v << 1);
        assert_eq!(cell.get(), 14);
    }

    #[test]
    fn frame_flags_compose() {
        let flags = FrameFlags::START_OF_FRAME | FrameFlags::END_OF_FRAME;
        assert_eq!(flags, FrameFlags::WHOLE_FRAME);
        assert!(flags.is_start());
        assert!(flags.is_end());
        assert!(!FrameFlags::NONE.is_start());
        assert!(FrameFlags::WHOLE_FRAME.contains(FrameFlags::END_OF_FRAME));
    }

    #[test]
    fn frame_flags_from_bits_drops_length() {
        let flags = FrameFlags::from_bits(bits::ctrl::TXEOF | 0x1234);
        assert_eq!(flags, FrameFlags::END_OF_FRAME);
    }
}
