//! Descriptor memory region.

use core::marker::PhantomData;
use core::ptr::NonNull;

use super::DmaAddr;
use super::descriptor::BufferDescriptor;
use crate::driver::error::{ConfigError, Result, RingError};
use crate::internal::constants::{BD_MIN_ALIGNMENT, BD_SIZE};

/// Contiguous, aligned memory carved into buffer descriptors.
///
/// The region borrows its backing memory exclusively for `'a`. Descriptors sit
/// `stride` bytes apart, where `stride` is the descriptor size rounded up to
/// the requested alignment. The device address of the region may differ from
/// its CPU address (e.g. behind an address translation window); both are
/// fixed at creation.
pub struct DescriptorRegion<'a> {
    base: NonNull<u8>,
    device_base: DmaAddr,
    size: usize,
    stride: usize,
    count: usize,
    _memory: PhantomData<&'a mut [u8]>,
}

// Safety: the region holds the only borrow of its memory; the hardware is the
// only other agent touching it and does so through volatile descriptor words.
unsafe impl Send for DescriptorRegion<'_> {}

impl<'a> DescriptorRegion<'a> {
    /// Number of descriptors a region of `size` bytes holds at `alignment`.
    #[must_use]
    pub const fn descriptor_count(size: usize, alignment: usize) -> usize {
        if alignment == 0 {
            return 0;
        }
        size / BD_SIZE.next_multiple_of(alignment)
    }

    /// Carve `memory` into descriptors.
    ///
    /// `device_base` is the address the DMA channel uses for the first byte of
    /// `memory`.
    ///
    /// # Errors
    ///
    /// - `InvalidAlignment` if `alignment` is not a power of two of at least 64
    /// - `InvalidRegion` if either base is misaligned or the region cannot
    ///   hold one descriptor
    pub fn new(memory: &'a mut [u8], device_base: DmaAddr, alignment: usize) -> Result<Self> {
        if !alignment.is_power_of_two() || alignment < BD_MIN_ALIGNMENT {
            return Err(ConfigError::InvalidAlignment.into());
        }

        let align = alignment as u64;
        if (memory.as_ptr() as usize) % alignment != 0 || device_base % align != 0 {
            return Err(RingError::InvalidRegion.into());
        }

        let count = Self::descriptor_count(memory.len(), alignment);
        if count == 0 || count > u32::MAX as usize {
            return Err(RingError::InvalidRegion.into());
        }

        let size = memory.len();
        if device_base.checked_add(size as u64).is_none() {
            return Err(RingError::InvalidRegion.into());
        }

        Ok(Self {
            base: NonNull::from(memory).cast::<u8>(),
            device_base,
            size,
            stride: BD_SIZE.next_multiple_of(alignment),
            count,
            _memory: PhantomData,
        })
    }

    /// Number of descriptors in the region
    #[inline(always)]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.count
    }

    /// Always false: creation rejects regions without a descriptor
    #[inline(always)]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Distance between consecutive descriptors in bytes
    #[inline(always)]
    #[must_use]
    pub const fn stride(&self) -> usize {
        self.stride
    }

    /// Region size in bytes
    #[inline(always)]
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Device address of the first byte of the region
    #[inline(always)]
    #[must_use]
    pub const fn device_base(&self) -> DmaAddr {
        self.device_base
    }

    /// Device address one past the last byte of the region
    #[inline(always)]
    #[must_use]
    pub const fn device_end(&self) -> DmaAddr {
        self.device_base + self.size as u64
    }

    /// Device address of the descriptor at `index` (wrapping)
    #[inline(always)]
    #[must_use]
    pub fn device_addr(&self, index: usize) -> DmaAddr {
        self.device_base + ((index % self.count) * self.stride) as u64
    }

    /// Ring index of the descriptor at device address `addr`
    #[must_use]
    pub fn index_of(&self, addr: DmaAddr) -> Option<usize> {
        if !self.contains(addr) {
            return None;
        }
        let offset = (addr - self.device_base) as usize;
        let index = offset / self.stride;
        (offset % self.stride == 0 && index < self.count).then_some(index)
    }

    /// Check whether `addr` lies inside `[device_base, device_end)`
    #[inline(always)]
    #[must_use]
    pub const fn contains(&self, addr: DmaAddr) -> bool {
        addr >= self.device_base && addr < self.device_end()
    }

    /// Check whether `[start, start + len)` intersects the region
    #[must_use]
    pub fn overlaps(&self, start: DmaAddr, len: usize) -> bool {
        if len == 0 {
            return false;
        }
        let end = start.saturating_add(len as u64);
        start < self.device_end() && self.device_base < end
    }

    /// Descriptor at `index`, if in range
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&BufferDescriptor> {
        (index < self.count).then(|| self.slot(index))
    }

    /// Descriptor at `index` (wrapping)
    #[inline(always)]
    pub(crate) fn slot(&self, index: usize) -> &BufferDescriptor {
        let offset = (index % self.count) * self.stride;
        // SAFETY: `offset + BD_SIZE <= size` because `index % count < count`
        // and `count * stride <= size`; the base and stride are multiples of
        // an alignment of at least 64, satisfying BufferDescriptor's alignment.
        // All descriptor fields are interior-mutable volatile cells.
        unsafe { &*self.base.as_ptr().add(offset).cast::<BufferDescriptor>() }
    }
}

impl core::fmt::Debug for DescriptorRegion<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DescriptorRegion")
            .field("device_base", &self.device_base)
            .field("size", &self.size)
            .field("stride", &self.stride)
            .field("count", &self.count)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
