//! Descriptor ring with ownership tracking.
//!
//! Every descriptor is in exactly one of four segments, laid out in ring order
//! and delimited by four monotonic sequence counters:
//!
//! ```text
//!  free_seq      reap_seq      commit_seq     alloc_seq     free_seq + N
//!     | unreaped    | hw-owned     | allocated    |     free      |
//! ```
//!
//! A sequence number maps to ring slot `seq % N`. Counters only grow, so a
//! slot's position relative to them tells which segment it is in. Handles carry
//! a stamp that is also written into the descriptor's software tag word on
//! every allocation and reap; a handle whose stamp no longer matches the slot
//! is stale and rejected.

use super::descriptor::{BufferDescriptor, DescriptorFault, DescriptorStatus, FrameFlags};
use super::region::DescriptorRegion;
use super::DmaAddr;
use crate::driver::error::{ConfigError, HardwareError, Result, RingError, RingResult};
use crate::internal::constants::LENGTH_FIELD_MAX;

// =============================================================================
// Handles
// =============================================================================

/// Handle to one descriptor for one ownership cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DescriptorHandle {
    seq: u64,
    stamp: u32,
}

impl DescriptorHandle {
    /// Ring sequence number of the descriptor
    #[inline(always)]
    #[must_use]
    pub const fn seq(&self) -> u64 {
        self.seq
    }
}

/// Contiguous run of descriptors, in ring order, for one ownership cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DescriptorRun {
    start: u64,
    len: u32,
    stamp: u32,
}

impl DescriptorRun {
    const fn empty(at: u64) -> Self {
        Self {
            start: at,
            len: 0,
            stamp: 0,
        }
    }

    /// Number of descriptors in the run
    #[inline(always)]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len as usize
    }

    /// Check if the run holds no descriptors
    #[inline(always)]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Sequence number of the first descriptor
    #[inline(always)]
    #[must_use]
    pub const fn start_seq(&self) -> u64 {
        self.start
    }

    /// Sequence number one past the last descriptor
    #[inline(always)]
    #[must_use]
    pub const fn end_seq(&self) -> u64 {
        self.start + self.len as u64
    }

    /// Handle to the descriptor at `offset` within the run
    #[must_use]
    pub fn handle(&self, offset: usize) -> Option<DescriptorHandle> {
        (offset < self.len()).then_some(DescriptorHandle {
            seq: self.start + offset as u64,
            stamp: self.stamp,
        })
    }

    /// Handle to the first descriptor
    #[must_use]
    pub fn first(&self) -> Option<DescriptorHandle> {
        self.handle(0)
    }

    /// Handle to the last descriptor
    #[must_use]
    pub fn last(&self) -> Option<DescriptorHandle> {
        self.len().checked_sub(1).and_then(|i| self.handle(i))
    }

    /// Iterate over handles in ring order
    pub fn handles(&self) -> impl Iterator<Item = DescriptorHandle> + use<> {
        let stamp = self.stamp;
        (self.start..self.end_seq()).map(move |seq| DescriptorHandle { seq, stamp })
    }
}

// =============================================================================
// Reap Results
// =============================================================================

/// Descriptor the hardware flagged with an error during a reap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReapFault {
    /// Position among the hardware-owned descriptors scanned (0 = oldest)
    pub offset: usize,
    /// Ring slot of the failed descriptor
    pub index: usize,
    /// Error bits reported by the hardware
    pub fault: DescriptorFault,
}

/// Outcome of a reap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Reaped {
    /// Completed descriptors, now software-owned and awaiting `free`
    pub run: DescriptorRun,
    /// Set when the scan stopped at a failed descriptor
    pub fault: Option<ReapFault>,
}

// =============================================================================
// Ring
// =============================================================================

/// Descriptor ring shared between software and one DMA channel.
///
/// The ring only does bookkeeping on descriptor memory; programming the channel
/// is left to [`RingEngine`](crate::driver::engine::RingEngine).
pub struct DescriptorRing<'a> {
    region: DescriptorRegion<'a>,
    max_transfer_len: u32,
    /// Oldest unreaped descriptor
    free_seq: u64,
    /// Oldest hardware-owned descriptor
    reap_seq: u64,
    /// Oldest allocated, uncommitted descriptor
    commit_seq: u64,
    /// Next descriptor to allocate
    alloc_seq: u64,
    last_stamp: u32,
    hw_tail: Option<DmaAddr>,
    cyclic: bool,
}

impl<'a> DescriptorRing<'a> {
    /// Build a ring over `region`, clearing and chaining every descriptor.
    ///
    /// # Errors
    ///
    /// - `InvalidConfig` if `max_transfer_len` is zero
    /// - `MaxLengthTooLarge` if it does not fit the hardware length field
    pub fn new(region: DescriptorRegion<'a>, max_transfer_len: u32) -> Result<Self> {
        if max_transfer_len == 0 {
            return Err(ConfigError::InvalidConfig.into());
        }
        if max_transfer_len > LENGTH_FIELD_MAX {
            return Err(ConfigError::MaxLengthTooLarge.into());
        }

        let mut ring = Self {
            region,
            max_transfer_len,
            free_seq: 0,
            reap_seq: 0,
            commit_seq: 0,
            alloc_seq: 0,
            last_stamp: 0,
            hw_tail: None,
            cyclic: false,
        };
        ring.rearm();
        Ok(ring)
    }

    /// Carve `memory` into descriptors and build a ring over it.
    ///
    /// # Errors
    ///
    /// See [`DescriptorRegion::new`] and [`DescriptorRing::new`].
    pub fn create(
        memory: &'a mut [u8],
        device_base: DmaAddr,
        alignment: usize,
        max_transfer_len: u32,
    ) -> Result<Self> {
        Self::new(
            DescriptorRegion::new(memory, device_base, alignment)?,
            max_transfer_len,
        )
    }

    /// Return every descriptor to the free pool.
    ///
    /// Clears all descriptors, re-links them into a closed chain and drops all
    /// ownership state. Outstanding handles become stale. Only valid while the
    /// channel is halted, i.e. right after creation or a reset.
    pub fn rearm(&mut self) {
        let count = self.region.len();
        for index in 0..count {
            let desc = self.region.slot(index);
            desc.clear();
            desc.set_next(self.region.device_addr(index + 1));
        }

        // Counters restart at the current allocation point so sequence
        // numbers from before the rearm never come back into range.
        let restart = self.alloc_seq;
        self.free_seq = restart;
        self.reap_seq = restart;
        self.commit_seq = restart;
        self.hw_tail = None;
        self.cyclic = false;
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Total number of descriptors
    #[inline(always)]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.region.len()
    }

    /// Descriptors in the free pool
    #[inline(always)]
    #[must_use]
    pub const fn free_count(&self) -> usize {
        self.region.len() - (self.alloc_seq - self.free_seq) as usize
    }

    /// Descriptors allocated but not yet committed
    #[inline(always)]
    #[must_use]
    pub const fn allocated_count(&self) -> usize {
        (self.alloc_seq - self.commit_seq) as usize
    }

    /// Descriptors owned by the hardware
    #[inline(always)]
    #[must_use]
    pub const fn hw_count(&self) -> usize {
        (self.commit_seq - self.reap_seq) as usize
    }

    /// Descriptors reaped but not yet freed
    #[inline(always)]
    #[must_use]
    pub const fn unreaped_count(&self) -> usize {
        (self.reap_seq - self.free_seq) as usize
    }

    /// Per-descriptor length ceiling
    #[inline(always)]
    #[must_use]
    pub const fn max_transfer_len(&self) -> u32 {
        self.max_transfer_len
    }

    /// Check whether a cyclic self-loop is armed
    #[inline(always)]
    #[must_use]
    pub const fn is_cyclic(&self) -> bool {
        self.cyclic
    }

    /// Backing descriptor region
    #[inline(always)]
    #[must_use]
    pub const fn region(&self) -> &DescriptorRegion<'a> {
        &self.region
    }

    /// Address of the oldest hardware-owned descriptor, or of the next one to
    /// be committed when the hardware owns none
    #[inline(always)]
    #[must_use]
    pub fn hw_head(&self) -> DmaAddr {
        self.region.device_addr(self.index(self.reap_seq))
    }

    /// Tail pointer to program into the channel, if anything was committed
    #[inline(always)]
    #[must_use]
    pub const fn hw_tail(&self) -> Option<DmaAddr> {
        self.hw_tail
    }

    /// Tail value used in cyclic mode: one past the end of the region
    #[inline(always)]
    #[must_use]
    pub const fn tail_sentinel(&self) -> DmaAddr {
        self.region.device_end()
    }

    /// Descriptor at ring slot `index`
    #[must_use]
    pub fn descriptor(&self, index: usize) -> Option<&BufferDescriptor> {
        self.region.get(index)
    }

    /// Ring slot a handle refers to
    #[inline(always)]
    #[must_use]
    pub fn index_of(&self, handle: DescriptorHandle) -> usize {
        self.index(handle.seq)
    }

    /// Descriptor behind a handle
    ///
    /// # Errors
    ///
    /// `StaleHandle` if the descriptor moved on to another ownership cycle.
    pub fn get(&self, handle: DescriptorHandle) -> RingResult<&BufferDescriptor> {
        let desc = self.slot(handle.seq);
        if handle.stamp == 0 || desc.tag() != handle.stamp {
            return Err(RingError::StaleHandle);
        }
        Ok(desc)
    }

    // -------------------------------------------------------------------------
    // Ownership Transitions
    // -------------------------------------------------------------------------

    /// Take `count` descriptors from the free pool.
    ///
    /// All or nothing: on error the ring is unchanged.
    ///
    /// # Errors
    ///
    /// - `InvalidLength` if `count` is zero
    /// - `InsufficientFree` if fewer than `count` descriptors are free
    pub fn allocate(&mut self, count: usize) -> RingResult<DescriptorRun> {
        if count == 0 {
            return Err(RingError::InvalidLength);
        }
        if count > self.free_count() {
            return Err(RingError::InsufficientFree);
        }

        let stamp = self.next_stamp();
        let run = DescriptorRun {
            start: self.alloc_seq,
            len: count as u32,
            stamp,
        };
        for seq in run.start..run.end_seq() {
            self.slot(seq).set_tag(stamp);
        }
        self.alloc_seq = run.end_seq();
        Ok(run)
    }

    /// Return the most recent, uncommitted allocation to the free pool.
    ///
    /// # Errors
    ///
    /// - `StaleHandle` if `run` is not allocated
    /// - `OutOfOrder` if a later allocation exists
    pub fn unallocate(&mut self, run: DescriptorRun) -> RingResult<()> {
        self.validate(run, self.commit_seq, self.alloc_seq)?;
        if run.end_seq() != self.alloc_seq {
            return Err(RingError::OutOfOrder);
        }

        for seq in run.start..run.end_seq() {
            self.slot(seq).clear();
        }
        self.alloc_seq = run.start;
        Ok(())
    }

    /// Fill in an allocated descriptor.
    ///
    /// On error the descriptor is left untouched.
    ///
    /// # Errors
    ///
    /// - `StaleHandle` if `handle` is not an allocated, uncommitted descriptor
    /// - `InvalidLength` if `length` is zero
    /// - `LengthExceedsMax` if `length` is above the ring's ceiling
    /// - `RegionOverlap` if the buffer intersects the descriptor region
    pub fn configure(
        &mut self,
        handle: DescriptorHandle,
        buffer: DmaAddr,
        length: u32,
        flags: FrameFlags,
        id: u32,
    ) -> RingResult<()> {
        if handle.seq < self.commit_seq || handle.seq >= self.alloc_seq {
            return Err(RingError::StaleHandle);
        }
        let desc = self.get(handle)?;
        if length == 0 {
            return Err(RingError::InvalidLength);
        }
        if length > self.max_transfer_len {
            return Err(RingError::LengthExceedsMax);
        }
        if self.region.overlaps(buffer, length as usize) {
            return Err(RingError::RegionOverlap);
        }

        desc.prepare(buffer, length, flags);
        desc.set_id(id);
        Ok(())
    }

    /// Hand an allocated run to the hardware.
    ///
    /// Moves the run to the hardware-owned segment and advances the tail. The
    /// descriptors must not be touched again until they are reaped.
    ///
    /// # Errors
    ///
    /// - `InvalidLength` for an empty run
    /// - `StaleHandle` if `run` is not allocated
    /// - `OutOfOrder` if an older allocation is still uncommitted
    /// - `HardwareRejected` if a descriptor in the run was never configured
    /// - `InvalidState` while a cyclic loop is armed
    pub fn commit(&mut self, run: DescriptorRun) -> Result<()> {
        if run.is_empty() {
            return Err(RingError::InvalidLength.into());
        }
        if self.cyclic {
            return Err(HardwareError::InvalidState.into());
        }
        self.validate(run, self.commit_seq, self.alloc_seq)?;
        if run.start != self.commit_seq {
            return Err(RingError::OutOfOrder.into());
        }
        if (run.start..run.end_seq()).any(|seq| self.slot(seq).length() == 0) {
            return Err(HardwareError::HardwareRejected.into());
        }

        self.commit_seq = run.end_seq();
        self.hw_tail = Some(self.region.device_addr(self.index(run.end_seq() - 1)));
        Ok(())
    }

    /// Collect completed descriptors from the hardware.
    ///
    /// Scans hardware-owned descriptors oldest first and stops at the first
    /// one still in flight or flagged with an error. Completion is in commit
    /// order, so the scan touches only newly completed descriptors.
    pub fn reap(&mut self) -> Reaped {
        self.scan(false)
    }

    /// Collect completed descriptors, whole frames only.
    ///
    /// Like [`reap`](Self::reap) but the returned run ends at the last
    /// completed end-of-frame descriptor; completed descriptors of a frame
    /// still in flight stay hardware-owned.
    pub fn reap_frames(&mut self) -> Reaped {
        self.scan(true)
    }

    /// Return reaped descriptors to the free pool.
    ///
    /// Freeing an empty run is a no-op.
    ///
    /// # Errors
    ///
    /// - `StaleHandle` if `run` is not reaped (already freed, never reaped, or
    ///   from an earlier cycle)
    /// - `OutOfOrder` if older reaped descriptors are still unfreed
    pub fn free(&mut self, run: DescriptorRun) -> RingResult<()> {
        if run.is_empty() {
            return Ok(());
        }
        self.validate(run, self.free_seq, self.reap_seq)?;
        if run.start != self.free_seq {
            return Err(RingError::OutOfOrder);
        }

        for seq in run.start..run.end_seq() {
            self.slot(seq).clear();
        }
        self.free_seq = run.end_seq();
        Ok(())
    }

    /// Turn the single hardware-owned descriptor into a self-loop.
    ///
    /// Points the descriptor at itself and moves the tail to a sentinel
    /// outside the region, so the hardware never reaches the tail and replays
    /// the descriptor until reset. Returns the descriptor's address.
    ///
    /// # Errors
    ///
    /// `InvalidState` unless exactly one descriptor is committed and no other
    /// descriptor is in use.
    pub fn close_cyclic_loop(&mut self) -> Result<DmaAddr> {
        if self.cyclic
            || self.hw_count() != 1
            || self.allocated_count() != 0
            || self.unreaped_count() != 0
        {
            return Err(HardwareError::InvalidState.into());
        }

        let addr = self.hw_head();
        self.slot(self.reap_seq).set_next(addr);
        self.hw_tail = Some(self.tail_sentinel());
        self.cyclic = true;
        Ok(addr)
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    #[inline(always)]
    fn index(&self, seq: u64) -> usize {
        (seq % self.region.len() as u64) as usize
    }

    #[inline(always)]
    fn slot(&self, seq: u64) -> &BufferDescriptor {
        self.region.slot(self.index(seq))
    }

    fn next_stamp(&mut self) -> u32 {
        self.last_stamp = self.last_stamp.wrapping_add(1);
        if self.last_stamp == 0 {
            self.last_stamp = 1;
        }
        self.last_stamp
    }

    /// Check that `run` lies in `[lo, hi)` and still carries its stamp.
    fn validate(&self, run: DescriptorRun, lo: u64, hi: u64) -> RingResult<()> {
        if run.is_empty() || run.start < lo || run.end_seq() > hi {
            return Err(RingError::StaleHandle);
        }
        if (run.start..run.end_seq()).any(|seq| self.slot(seq).tag() != run.stamp) {
            return Err(RingError::StaleHandle);
        }
        Ok(())
    }

    fn scan(&mut self, whole_frames: bool) -> Reaped {
        let mut fault = None;
        let mut completed = 0u64;
        let mut through_frame_end = 0u64;

        if !self.cyclic {
            let mut seq = self.reap_seq;
            while seq < self.commit_seq {
                let desc = self.slot(seq);
                match desc.state() {
                    DescriptorStatus::InFlight => break,
                    DescriptorStatus::Faulted(bits) => {
                        fault = Some(ReapFault {
                            offset: (seq - self.reap_seq) as usize,
                            index: self.index(seq),
                            fault: bits,
                        });
                        break;
                    }
                    DescriptorStatus::Complete { .. } => {
                        completed += 1;
                        if desc.ends_frame() {
                            through_frame_end = completed;
                        }
                    }
                }
                seq += 1;
            }
        }

        let count = if whole_frames {
            through_frame_end
        } else {
            completed
        };
        if count == 0 {
            return Reaped {
                run: DescriptorRun::empty(self.reap_seq),
                fault,
            };
        }

        let stamp = self.next_stamp();
        let run = DescriptorRun {
            start: self.reap_seq,
            len: count as u32,
            stamp,
        };
        for seq in run.start..run.end_seq() {
            self.slot(seq).set_tag(stamp);
        }
        self.reap_seq = run.end_seq();
        Reaped { run, fault }
    }
}

impl core::fmt::Debug for DescriptorRing<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DescriptorRing")
            .field("capacity", &self.capacity())
            .field("free", &self.free_count())
            .field("allocated", &self.allocated_count())
            .field("hw", &self.hw_count())
            .field("unreaped", &self.unreaped_count())
            .field("cyclic", &self.cyclic)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
