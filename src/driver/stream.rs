//! Transfer orchestration for a DMA stream.
//!
//! A [`DmaStream`] repeatedly moves one buffer through a [`RingEngine`]:
//!
//! - **Normal mode**: the buffer is split into up to K chained descriptors
//!   (first flagged start-of-frame, last end-of-frame) and a fixed number of
//!   such transfers is kept committed. Each completion is reaped and the
//!   transfer resubmitted, either inside the interrupt handler or from the
//!   foreground, depending on [`ResubmitPolicy`].
//! - **Cyclic mode**: one descriptor covering the whole buffer is committed,
//!   linked to itself and replayed by the hardware until a reset.
//!
//! ```text
//!  Idle ──start──► Building ──► Committed ──irq──► Completed ──┐
//!   ▲                 ▲                        │               │
//!   │                 └────────── resubmit ────┼───────────────┘
//!   └──── stop / restart ◄─── Faulted ◄── error┘
//! ```
//!
//! The interrupt side lives in [`dispatch`](super::dispatch).

#[cfg(feature = "log")]
use log::{info, warn};

use crate::dma::{DmaAddr, FrameFlags};
use crate::driver::config::{Direction, Mode, ResubmitPolicy, StreamConfig};
use crate::driver::engine::RingEngine;
use crate::driver::error::{ConfigError, Error, HardwareError, Result, RingError};
use crate::hal::channel::DmaChannel;
use crate::hal::reset::{ResetController, ResetWait, SpinWait};
use crate::sync::signal::StreamSignals;

// =============================================================================
// Types
// =============================================================================

/// Orchestrator state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StreamState {
    /// Not started, or stopped
    #[default]
    Idle,
    /// Descriptors being allocated and configured
    Building,
    /// At least one transfer handed to the hardware
    Committed,
    /// A transfer completed and was reaped; resubmission pending
    Completed,
    /// Hardware error; an explicit restart is required
    Faulted,
}

/// Data buffer a stream transfers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransferBuffer {
    /// Device address of the first byte
    pub addr: DmaAddr,
    /// Length in bytes
    pub len: u32,
}

impl TransferBuffer {
    /// Buffer of `len` bytes at device address `addr`
    #[must_use]
    pub const fn new(addr: DmaAddr, len: u32) -> Self {
        Self { addr, len }
    }
}

/// How a buffer is carved into descriptors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) struct TransferPlan {
    pub(crate) buffer: TransferBuffer,
    /// Descriptors per transfer
    pub(crate) count: u32,
    /// Length of every chunk but the last
    pub(crate) chunk: u32,
    /// Length of the last chunk (takes the remainder)
    pub(crate) last: u32,
}

impl TransferPlan {
    /// Buffer-relative offset and length of chunk `index`
    const fn slice(&self, index: u32) -> (u32, u32) {
        let offset = index * self.chunk;
        if index + 1 == self.count {
            (offset, self.last)
        } else {
            (offset, self.chunk)
        }
    }
}

/// Counters since the last [`DmaStream::start`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StreamStats {
    /// Descriptors completed
    pub descriptors: u64,
    /// Transfers completed
    pub transfers: u64,
    /// Bytes moved, as reported by the hardware
    pub bytes: u64,
    /// Faults (error interrupts and failed descriptors)
    pub faults: u32,
    /// Interrupts with no relevant flag set
    pub spurious: u32,
}

// =============================================================================
// Stream
// =============================================================================

/// One buffer streamed through a descriptor ring
pub struct DmaStream<'a, C: DmaChannel, W: ResetWait = SpinWait> {
    pub(crate) engine: RingEngine<'a, C>,
    pub(crate) reset: ResetController<W>,
    pub(crate) config: StreamConfig,
    pub(crate) signals: &'a StreamSignals,
    pub(crate) plan: Option<TransferPlan>,
    pub(crate) state: StreamState,
    pub(crate) stats: StreamStats,
    /// Transfers committed and not yet completed
    pub(crate) in_flight: u32,
    /// Reaped descriptors not yet adding up to a whole transfer
    pub(crate) partial: u32,
    /// Resubmit requests taken but not yet served
    pub(crate) backlog: u32,
}

impl<'a, C: DmaChannel> DmaStream<'a, C, SpinWait> {
    /// Create a stream that waits for resets with an iteration budget of
    /// `config.reset_poll_budget`.
    ///
    /// # Errors
    ///
    /// See [`DmaStream::with_reset`].
    pub fn new(
        engine: RingEngine<'a, C>,
        config: StreamConfig,
        signals: &'a StreamSignals,
    ) -> Result<Self> {
        let reset = ResetController::new(SpinWait::new(config.reset_poll_budget));
        Self::with_reset(engine, reset, config, signals)
    }
}

impl<'a, C: DmaChannel, W: ResetWait> DmaStream<'a, C, W> {
    /// Create a stream with a custom reset wait policy.
    ///
    /// # Errors
    ///
    /// - any error of [`StreamConfig::validate`]
    /// - `MaxLengthTooLarge` if the config allows longer descriptors than the
    ///   ring does
    /// - `InvalidConfig` if one transfer needs more descriptors than the ring
    ///   holds
    pub fn with_reset(
        engine: RingEngine<'a, C>,
        reset: ResetController<W>,
        config: StreamConfig,
        signals: &'a StreamSignals,
    ) -> Result<Self> {
        config.validate()?;
        if config.max_transfer_len > engine.ring().max_transfer_len() {
            return Err(ConfigError::MaxLengthTooLarge.into());
        }
        let per_transfer = match config.mode {
            Mode::Normal => config.descriptors_per_transfer as usize,
            Mode::Cyclic => 1,
        };
        if per_transfer > engine.ring().capacity() {
            return Err(ConfigError::InvalidConfig.into());
        }

        Ok(Self {
            engine,
            reset,
            config,
            signals,
            plan: None,
            state: StreamState::Idle,
            stats: StreamStats::default(),
            in_flight: 0,
            partial: 0,
            backlog: 0,
        })
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// Current state
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Counters since the last start
    pub fn stats(&self) -> StreamStats {
        self.stats
    }

    /// Configuration
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Underlying engine
    pub fn engine(&self) -> &RingEngine<'a, C> {
        &self.engine
    }

    /// Reset controller
    pub fn reset_controller(&self) -> &ResetController<W> {
        &self.reset
    }

    /// Signals raised by the dispatcher
    pub fn signals(&self) -> &'a StreamSignals {
        self.signals
    }

    /// Buffer being streamed
    pub fn buffer(&self) -> Option<TransferBuffer> {
        self.plan.map(|p| p.buffer)
    }

    /// Transfers committed and not yet completed
    pub fn in_flight(&self) -> u32 {
        self.in_flight
    }

    // -------------------------------------------------------------------------
    // Control
    // -------------------------------------------------------------------------

    /// Select the buffer to stream.
    ///
    /// # Errors
    ///
    /// - `InvalidState` unless idle or faulted
    /// - `InvalidLength` for an empty buffer or one wrapping the address space
    /// - `RegionOverlap` if the buffer intersects the descriptor region
    /// - `LengthExceedsMax` if a chunk would exceed the descriptor ceiling
    pub fn set_buffer(&mut self, buffer: TransferBuffer) -> Result<()> {
        if !matches!(self.state, StreamState::Idle | StreamState::Faulted) {
            return Err(HardwareError::InvalidState.into());
        }
        self.plan = Some(self.plan_for(buffer)?);
        Ok(())
    }

    /// Start streaming the selected buffer.
    ///
    /// Normal mode programs coalescing and interrupt enables, commits up to
    /// `transfers_in_flight` transfers and starts the channel. Cyclic mode
    /// commits and self-links one descriptor, enables the error interrupt
    /// only and starts the channel; from then on only a reset stops it.
    ///
    /// # Errors
    ///
    /// - `InvalidState` if not idle or no buffer was set
    /// - any error of building, committing or starting
    pub fn start(&mut self) -> Result<()> {
        if self.state != StreamState::Idle {
            return Err(HardwareError::InvalidState.into());
        }
        self.stats = StreamStats::default();
        self.begin()
    }

    /// Resume after a fault.
    ///
    /// The dispatcher already reset the channel and re-armed the ring; this
    /// drops stale resubmit requests and starts again in the configured mode.
    /// Counters keep running.
    ///
    /// # Errors
    ///
    /// - `EngineUnusable` if the recovery reset failed
    /// - `InvalidState` unless faulted or idle
    /// - any error of [`start`](Self::start)
    pub fn restart(&mut self) -> Result<()> {
        if !self.engine.is_usable() || self.reset.is_failed() {
            return Err(HardwareError::EngineUnusable.into());
        }
        if !matches!(self.state, StreamState::Faulted | StreamState::Idle) {
            return Err(HardwareError::InvalidState.into());
        }
        if self.engine.is_running() {
            self.engine.recover(&mut self.reset)?;
        }
        self.signals.take_resubmit();
        self.clear_pipeline();
        self.state = StreamState::Idle;
        self.begin()
    }

    /// Stop the stream by resetting the channel.
    ///
    /// There is no gentler way: everything in flight is discarded.
    ///
    /// # Errors
    ///
    /// `ResetTimedOut` or `EngineUnusable`; the stream is then faulted.
    pub fn stop(&mut self) -> Result<()> {
        self.clear_pipeline();
        self.signals.take_resubmit();
        match self.engine.recover(&mut self.reset) {
            Ok(()) => {
                self.state = StreamState::Idle;
                Ok(())
            }
            Err(e) => {
                self.state = StreamState::Faulted;
                Err(e.into())
            }
        }
    }

    /// Serve resubmit requests posted by the dispatcher under
    /// [`ResubmitPolicy::Deferred`], or left over when an inline resubmit
    /// found the ring full.
    ///
    /// Returns the number of transfers committed. Requests that cannot be
    /// served yet (ring full) are kept for the next call.
    ///
    /// # Errors
    ///
    /// - `InvalidState` when faulted; pending requests are dropped
    /// - any error of building or committing a transfer other than a full
    ///   ring
    pub fn resubmit_pending(&mut self) -> Result<u32> {
        let requested = self.signals.take_resubmit();
        if self.state == StreamState::Faulted {
            self.backlog = 0;
            return Err(HardwareError::InvalidState.into());
        }
        if self.config.mode == Mode::Cyclic {
            return Ok(0);
        }

        self.backlog = self.backlog.saturating_add(requested);
        let mut committed = 0;
        while self.backlog > 0 {
            match self.submit_transfer() {
                Ok(()) => {
                    self.backlog -= 1;
                    committed += 1;
                }
                Err(Error::Ring(RingError::InsufficientFree)) => break,
                Err(e) => return Err(e),
            }
        }
        Ok(committed)
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    /// Commit and start; on failure nothing stays committed.
    ///
    /// Once part of the pipeline reached the ring, the only way back is a
    /// channel reset. The stream is idle again if that reset succeeds and
    /// faulted otherwise.
    fn begin(&mut self) -> Result<()> {
        let Err(e) = self.commit_and_run() else {
            return Ok(());
        };
        if self.in_flight == 0 && !self.engine.is_running() {
            return Err(e);
        }

        #[cfg(feature = "log")]
        warn!("start failed after commit, resetting channel: {}", e);
        self.clear_pipeline();
        self.state = match self.engine.recover(&mut self.reset) {
            Ok(()) => StreamState::Idle,
            Err(_) => StreamState::Faulted,
        };
        Err(e)
    }

    fn commit_and_run(&mut self) -> Result<()> {
        let plan = self.plan.ok_or(HardwareError::InvalidState)?;

        match self.config.mode {
            Mode::Normal => {
                self.engine.configure_interrupts(
                    self.config.irq_mask,
                    Some((self.config.coalesce_count, self.config.delay_timer)),
                )?;
                self.submit_transfer()?;
                for _ in 1..self.config.transfers_in_flight {
                    if self.engine.ring().free_count() < plan.count as usize {
                        break;
                    }
                    self.submit_transfer()?;
                }
                self.engine.start()?;
            }
            Mode::Cyclic => {
                self.submit_transfer()?;
                self.engine.arm_cyclic()?;
                self.engine.configure_interrupts(self.config.irq_mask, None)?;
                self.engine.start()?;
                #[cfg(feature = "log")]
                info!(
                    "cyclic stream started: {} bytes at {:#x}",
                    plan.buffer.len, plan.buffer.addr
                );
            }
        }
        Ok(())
    }

    fn clear_pipeline(&mut self) {
        self.in_flight = 0;
        self.partial = 0;
        self.backlog = 0;
    }

    fn plan_for(&self, buffer: TransferBuffer) -> Result<TransferPlan> {
        if buffer.len == 0 || buffer.addr.checked_add(u64::from(buffer.len)).is_none() {
            return Err(RingError::InvalidLength.into());
        }
        if self
            .engine
            .ring()
            .region()
            .overlaps(buffer.addr, buffer.len as usize)
        {
            return Err(RingError::RegionOverlap.into());
        }

        let count = match self.config.mode {
            Mode::Normal => u32::from(self.config.descriptors_per_transfer).min(buffer.len),
            Mode::Cyclic => 1,
        };
        let chunk = buffer.len / count;
        let last = chunk + buffer.len % count;
        if last > self.config.max_transfer_len {
            return Err(RingError::LengthExceedsMax.into());
        }

        Ok(TransferPlan {
            buffer,
            count,
            chunk,
            last,
        })
    }

    /// Build one transfer of the planned buffer and commit it.
    ///
    /// On any error the descriptors go back to the free pool and the state
    /// is restored.
    pub(crate) fn submit_transfer(&mut self) -> Result<()> {
        let previous = self.state;
        self.state = StreamState::Building;
        match self.build_and_commit() {
            Ok(()) => {
                self.in_flight += 1;
                self.state = StreamState::Committed;
                Ok(())
            }
            Err(e) => {
                self.state = previous;
                #[cfg(feature = "log")]
                warn!("transfer not committed: {}", e);
                Err(e)
            }
        }
    }

    fn build_and_commit(&mut self) -> Result<()> {
        let plan = self.plan.ok_or(HardwareError::InvalidState)?;
        let run = self.engine.allocate(plan.count as usize)?;

        for (index, handle) in (0..plan.count).zip(run.handles()) {
            let (offset, len) = plan.slice(index);
            let flags = self.flags_for(index, plan.count);
            let configured = self.engine.configure(
                handle,
                plan.buffer.addr + u64::from(offset),
                len,
                flags,
                offset,
            );
            if let Err(e) = configured {
                self.engine.unallocate(run)?;
                return Err(e.into());
            }
        }

        if let Err(e) = self.engine.commit(run) {
            self.engine.unallocate(run)?;
            return Err(e);
        }
        Ok(())
    }

    fn flags_for(&self, index: u32, count: u32) -> FrameFlags {
        if self.config.direction == Direction::DeviceToMem {
            // Receive frame markers are reported by the hardware in status
            return FrameFlags::NONE;
        }
        let mut flags = FrameFlags::NONE;
        if index == 0 {
            flags = flags | FrameFlags::START_OF_FRAME;
        }
        if index + 1 == count {
            flags = flags | FrameFlags::END_OF_FRAME;
        }
        flags
    }

    pub(crate) fn resubmit_policy(&self) -> ResubmitPolicy {
        self.config.resubmit
    }
}

impl<C: DmaChannel, W: ResetWait> core::fmt::Debug for DmaStream<'_, C, W> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DmaStream")
            .field("state", &self.state)
            .field("config", &self.config)
            .field("buffer", &self.buffer())
            .field("in_flight", &self.in_flight)
            .field("stats", &self.stats)
            .finish()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dma::DescriptorRing;
    use crate::dma::descriptor::bits::ctrl;
    use crate::driver::interrupt::IrqStatus;
    use crate::testing::{AlignedRegion, MockChannel};

    const RING_BASE: DmaAddr = 0x1000;
    const BUF: DmaAddr = 0x8000_0000;

    type Stream<'a> = DmaStream<'a, MockChannel>;

    fn stream<'a>(
        mem: &'a mut AlignedRegion<1024>,
        signals: &'a StreamSignals,
        config: StreamConfig,
    ) -> Stream<'a> {
        let ring = DescriptorRing::create(mem.as_mut_slice(), RING_BASE, 64, 1 << 20).unwrap();
        let engine = RingEngine::new(ring, MockChannel::new());
        DmaStream::new(engine, config, signals).unwrap()
    }

    fn normal() -> StreamConfig {
        StreamConfig::new()
            .with_max_transfer_len(4096)
            .with_descriptors_per_transfer(4)
            .with_coalesce(4, 0)
    }

    #[test]
    fn construction_checks_ring_against_config() {
        let signals = StreamSignals::new();
        let mut mem = AlignedRegion::<1024>::new();
        let ring = DescriptorRing::create(mem.as_mut_slice(), RING_BASE, 64, 1024).unwrap();
        let engine = RingEngine::new(ring, MockChannel::new());
        let err = DmaStream::new(engine, normal(), &signals).unwrap_err();
        assert_eq!(err, Error::Config(ConfigError::MaxLengthTooLarge));

        let mut mem = AlignedRegion::<1024>::new();
        let ring = DescriptorRing::create(mem.as_mut_slice(), RING_BASE, 64, 4096).unwrap();
        let engine = RingEngine::new(ring, MockChannel::new());
        let config = normal().with_descriptors_per_transfer(17);
        let err = DmaStream::new(engine, config, &signals).unwrap_err();
        assert_eq!(err, Error::Config(ConfigError::InvalidConfig));
    }

    #[test]
    fn buffer_is_split_with_remainder_on_last_chunk() {
        let signals = StreamSignals::new();
        let mut mem = AlignedRegion::<1024>::new();
        let mut s = stream(&mut mem, &signals, normal());

        s.set_buffer(TransferBuffer::new(BUF, 1002)).unwrap();
        s.start().unwrap();

        let ring = s.engine().ring();
        let lens: [u32; 4] = core::array::from_fn(|i| ring.descriptor(i).unwrap().length());
        assert_eq!(lens, [250, 250, 250, 252]);
        let ids: [u32; 4] = core::array::from_fn(|i| ring.descriptor(i).unwrap().id());
        assert_eq!(ids, [0, 250, 500, 750]);
        assert_eq!(ring.descriptor(2).unwrap().buffer(), BUF + 500);
    }

    #[test]
    fn transmit_frame_markers_on_first_and_last() {
        let signals = StreamSignals::new();
        let mut mem = AlignedRegion::<1024>::new();
        let mut s = stream(&mut mem, &signals, normal());
        s.set_buffer(TransferBuffer::new(BUF, 4000)).unwrap();
        s.start().unwrap();

        let ring = s.engine().ring();
        let flags: [FrameFlags; 4] =
            core::array::from_fn(|i| ring.descriptor(i).unwrap().frame_flags());
        assert_eq!(
            flags,
            [
                FrameFlags::START_OF_FRAME,
                FrameFlags::NONE,
                FrameFlags::NONE,
                FrameFlags::END_OF_FRAME,
            ]
        );
    }

    #[test]
    fn receive_descriptors_carry_no_frame_markers() {
        let signals = StreamSignals::new();
        let mut mem = AlignedRegion::<1024>::new();
        let config = normal().with_direction(Direction::DeviceToMem);
        let mut s = stream(&mut mem, &signals, config);
        s.set_buffer(TransferBuffer::new(BUF, 4000)).unwrap();
        s.start().unwrap();

        for index in 0..8 {
            let control = s.engine().ring().descriptor(index).unwrap().raw_control();
            assert_eq!(control & ctrl::FRAME_MASK, 0);
        }
    }

    #[test]
    fn start_fills_pipeline_and_starts_channel() {
        let signals = StreamSignals::new();
        let mut mem = AlignedRegion::<1024>::new();
        let mut s = stream(&mut mem, &signals, normal());
        s.set_buffer(TransferBuffer::new(BUF, 4000)).unwrap();
        s.start().unwrap();

        assert_eq!(s.state(), StreamState::Committed);
        assert_eq!(s.in_flight(), 2);
        let ring = s.engine().ring();
        assert_eq!(ring.hw_count(), 8);

        let channel = s.engine().channel();
        assert_eq!(channel.current_desc(), Some(RING_BASE));
        assert_eq!(channel.coalesce(), Some((4, 0)));
        assert_eq!(channel.irq_enable(), IrqStatus::ALL);
        assert_eq!(channel.tail_writes(), [RING_BASE + 7 * 64]);
        assert!(channel.is_running());
    }

    #[test]
    fn start_requires_buffer_and_idle_state() {
        let signals = StreamSignals::new();
        let mut mem = AlignedRegion::<1024>::new();
        let mut s = stream(&mut mem, &signals, normal());

        assert_eq!(s.start(), Err(Error::Hardware(HardwareError::InvalidState)));
        assert_eq!(s.state(), StreamState::Idle);

        s.set_buffer(TransferBuffer::new(BUF, 64)).unwrap();
        s.start().unwrap();
        assert_eq!(s.start(), Err(Error::Hardware(HardwareError::InvalidState)));
        assert_eq!(
            s.set_buffer(TransferBuffer::new(BUF, 64)),
            Err(Error::Hardware(HardwareError::InvalidState))
        );
    }

    #[test]
    fn buffer_validation() {
        let signals = StreamSignals::new();
        let mut mem = AlignedRegion::<1024>::new();
        let mut s = stream(&mut mem, &signals, normal());

        assert_eq!(
            s.set_buffer(TransferBuffer::new(BUF, 0)),
            Err(Error::Ring(RingError::InvalidLength))
        );
        assert_eq!(
            s.set_buffer(TransferBuffer::new(RING_BASE + 0x100, 16)),
            Err(Error::Ring(RingError::RegionOverlap))
        );
        assert_eq!(
            s.set_buffer(TransferBuffer::new(RING_BASE - 8, 16)),
            Err(Error::Ring(RingError::RegionOverlap))
        );
        assert_eq!(
            s.set_buffer(TransferBuffer::new(BUF, 4 * 4096 + 1)),
            Err(Error::Ring(RingError::LengthExceedsMax))
        );
        assert!(s.set_buffer(TransferBuffer::new(BUF, 4 * 4096)).is_ok());
    }

    #[test]
    fn small_buffer_uses_fewer_descriptors() {
        let signals = StreamSignals::new();
        let mut mem = AlignedRegion::<1024>::new();
        let mut s = stream(&mut mem, &signals, normal());
        s.set_buffer(TransferBuffer::new(BUF, 3)).unwrap();
        s.start().unwrap();

        assert_eq!(s.engine().ring().hw_count(), 6);
        let desc = s.engine().ring().descriptor(2).unwrap();
        assert_eq!(desc.length(), 1);
        assert!(desc.frame_flags().is_end());
    }

    #[test]
    fn pipeline_is_capped_by_ring_capacity() {
        let signals = StreamSignals::new();
        let mut mem = AlignedRegion::<1024>::new();
        let config = normal()
            .with_descriptors_per_transfer(6)
            .with_transfers_in_flight(5);
        let mut s = stream(&mut mem, &signals, config);
        s.set_buffer(TransferBuffer::new(BUF, 6000)).unwrap();
        s.start().unwrap();

        assert_eq!(s.in_flight(), 2);
        assert_eq!(s.engine().ring().free_count(), 4);
    }

    #[test]
    fn cyclic_start_arms_self_loop() {
        let signals = StreamSignals::new();
        let mut mem = AlignedRegion::<1024>::new();
        let config = StreamConfig::cyclic().with_max_transfer_len(1 << 16);
        let mut s = stream(&mut mem, &signals, config);
        s.set_buffer(TransferBuffer::new(BUF, 40_000)).unwrap();
        s.start().unwrap();

        let ring = s.engine().ring();
        let desc = ring.descriptor(0).unwrap();
        assert_eq!(desc.length(), 40_000);
        assert_eq!(desc.frame_flags(), FrameFlags::WHOLE_FRAME);
        assert_eq!(desc.next(), RING_BASE);
        assert!(ring.is_cyclic());

        let channel = s.engine().channel();
        assert!(channel.is_cyclic());
        assert_eq!(channel.irq_enable(), IrqStatus::ERROR_ONLY);
        assert_eq!(channel.coalesce(), None);
        let tail = channel.last_tail().unwrap();
        assert!(!ring.region().contains(tail));
    }

    #[test]
    fn failed_start_after_commit_unwinds_with_reset() {
        let signals = StreamSignals::new();
        let mut mem = AlignedRegion::<1024>::new();
        let config = StreamConfig::cyclic().with_max_transfer_len(4096);
        let mut s = stream(&mut mem, &signals, config);
        s.set_buffer(TransferBuffer::new(BUF, 4096)).unwrap();

        // A descriptor already handed over keeps the loop from closing
        let run = s.engine.allocate(1).unwrap();
        s.engine
            .configure(run.first().unwrap(), BUF, 64, FrameFlags::WHOLE_FRAME, 0)
            .unwrap();
        s.engine.commit(run).unwrap();

        assert_eq!(s.start(), Err(Error::Hardware(HardwareError::InvalidState)));
        assert_eq!(s.state(), StreamState::Idle);
        assert_eq!(s.in_flight(), 0);
        assert_eq!(s.engine().channel().resets_requested(), 1);
        assert_eq!(s.engine().ring().free_count(), 16);
        assert!(!s.engine().channel().is_running());

        s.start().unwrap();
        assert!(s.engine().ring().is_cyclic());
        assert!(s.engine().channel().is_running());
    }

    #[test]
    fn cyclic_buffer_must_fit_one_descriptor() {
        let signals = StreamSignals::new();
        let mut mem = AlignedRegion::<1024>::new();
        let config = StreamConfig::cyclic().with_max_transfer_len(4096);
        let mut s = stream(&mut mem, &signals, config);

        assert_eq!(
            s.set_buffer(TransferBuffer::new(BUF, 4097)),
            Err(Error::Ring(RingError::LengthExceedsMax))
        );
    }

    #[test]
    fn stop_resets_and_returns_to_idle() {
        let signals = StreamSignals::new();
        let mut mem = AlignedRegion::<1024>::new();
        let mut s = stream(&mut mem, &signals, StreamConfig::cyclic().with_max_transfer_len(4096));
        s.set_buffer(TransferBuffer::new(BUF, 4096)).unwrap();
        s.start().unwrap();

        s.stop().unwrap();
        assert_eq!(s.state(), StreamState::Idle);
        assert_eq!(s.engine().channel().resets_requested(), 1);
        assert!(!s.engine().ring().is_cyclic());
        assert_eq!(s.engine().ring().free_count(), 16);

        s.start().unwrap();
        assert!(s.engine().ring().is_cyclic());
    }

    #[test]
    fn stop_with_dead_reset_faults_stream() {
        let signals = StreamSignals::new();
        let mut mem = AlignedRegion::<1024>::new();
        let mut s = stream(&mut mem, &signals, normal().with_reset_poll_budget(3));
        s.set_buffer(TransferBuffer::new(BUF, 64)).unwrap();
        s.start().unwrap();
        s.engine().channel().set_reset_never_completes();

        assert_eq!(s.stop(), Err(Error::Hardware(HardwareError::ResetTimedOut)));
        assert_eq!(s.state(), StreamState::Faulted);
        assert_eq!(s.engine().channel().reset_polls(), 3);
        assert_eq!(s.restart(), Err(Error::Hardware(HardwareError::EngineUnusable)));
    }

    #[test]
    fn rejected_commit_returns_descriptors() {
        let signals = StreamSignals::new();
        let mut mem = AlignedRegion::<1024>::new();
        let config = normal()
            .with_resubmit(ResubmitPolicy::Inline)
            .with_transfers_in_flight(1);
        let mut s = stream(&mut mem, &signals, config);
        s.set_buffer(TransferBuffer::new(BUF, 4000)).unwrap();
        s.start().unwrap();

        s.engine().channel().set_halted(true);
        signals.request_resubmit(1);
        assert_eq!(
            s.resubmit_pending(),
            Err(Error::Hardware(HardwareError::HardwareRejected))
        );
        assert_eq!(s.engine().ring().free_count(), 12);
        assert_eq!(s.engine().ring().allocated_count(), 0);
        assert_eq!(s.state(), StreamState::Committed);
    }
}
