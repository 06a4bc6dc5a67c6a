//! Ring engine: a descriptor ring bound to one DMA channel.
//!
//! The ring does the ownership bookkeeping; the engine adds everything that
//! touches the channel: starting it, moving the tail pointer on commit, arming
//! cyclic mode and recovering through a reset.

use core::sync::atomic::{Ordering, fence};

#[cfg(feature = "log")]
use log::{debug, info, warn};

use crate::dma::{DescriptorHandle, DescriptorRing, DescriptorRun, DmaAddr, FrameFlags, Reaped};
use crate::driver::error::{ConfigError, HardwareError, HardwareResult, Result, RingResult};
use crate::driver::interrupt::IrqStatus;
use crate::hal::channel::{ChannelStatus, DmaChannel};
use crate::hal::reset::{ResetController, ResetWait};

/// Descriptor ring driving one DMA channel
pub struct RingEngine<'a, C: DmaChannel> {
    ring: DescriptorRing<'a>,
    channel: C,
    running: bool,
    usable: bool,
}

impl<'a, C: DmaChannel> RingEngine<'a, C> {
    /// Bind a freshly created (or re-armed) ring to a halted channel
    pub fn new(ring: DescriptorRing<'a>, channel: C) -> Self {
        Self {
            ring,
            channel,
            running: false,
            usable: true,
        }
    }

    /// Descriptor ring
    #[inline(always)]
    pub fn ring(&self) -> &DescriptorRing<'a> {
        &self.ring
    }

    /// DMA channel
    #[inline(always)]
    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Channel has been started and not reset since
    #[inline(always)]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// False once a reset failed to complete
    #[inline(always)]
    pub fn is_usable(&self) -> bool {
        self.usable
    }

    /// Raw register snapshot of the channel
    pub fn snapshot(&self) -> ChannelStatus {
        self.channel.snapshot()
    }

    // -------------------------------------------------------------------------
    // Channel Setup
    // -------------------------------------------------------------------------

    /// Program interrupt enables and, for normal mode, completion coalescing.
    ///
    /// Pass `None` for `coalesce` in cyclic mode.
    ///
    /// # Errors
    ///
    /// - `InvalidState` while the channel is running
    /// - `InvalidCoalesce` for a zero threshold
    /// - `CyclicCompletionInterrupts` if a cyclic loop is armed and `mask`
    ///   enables completion interrupts or coalescing is requested
    pub fn configure_interrupts(
        &mut self,
        mask: IrqStatus,
        coalesce: Option<(u8, u8)>,
    ) -> Result<()> {
        if self.running {
            return Err(HardwareError::InvalidState.into());
        }
        if self.ring.is_cyclic() && (mask.is_completion() || coalesce.is_some()) {
            return Err(ConfigError::CyclicCompletionInterrupts.into());
        }
        if let Some((threshold, delay)) = coalesce {
            if threshold == 0 {
                return Err(ConfigError::InvalidCoalesce.into());
            }
            self.channel.set_coalesce(threshold, delay);
        }
        self.channel.set_irq_enable(mask);
        Ok(())
    }

    /// Start the channel at the oldest hardware-owned descriptor.
    ///
    /// Programs the current-descriptor pointer, sets run, then writes the tail
    /// if anything is already committed.
    ///
    /// # Errors
    ///
    /// - `EngineUnusable` after a failed reset
    /// - `InvalidState` if already running
    pub fn start(&mut self) -> HardwareResult<()> {
        self.ensure_usable()?;
        if self.running {
            return Err(HardwareError::InvalidState);
        }

        self.channel.set_current_desc(self.ring.hw_head());
        self.channel.run();
        self.running = true;

        if self.ring.hw_count() > 0
            && let Some(tail) = self.ring.hw_tail()
        {
            fence(Ordering::SeqCst);
            self.channel.set_tail_desc(tail);
        }
        Ok(())
    }

    /// Turn the single committed descriptor into a self-loop and select
    /// cyclic mode on the channel. Must precede [`start`](Self::start).
    ///
    /// # Errors
    ///
    /// `InvalidState` if running or the ring does not hold exactly one
    /// committed descriptor.
    pub fn arm_cyclic(&mut self) -> Result<DmaAddr> {
        self.ensure_usable()?;
        if self.running {
            return Err(HardwareError::InvalidState.into());
        }
        let addr = self.ring.close_cyclic_loop()?;
        self.channel.set_cyclic(true);
        #[cfg(feature = "log")]
        info!("cyclic descriptor armed at {:#x}", addr);
        Ok(addr)
    }

    // -------------------------------------------------------------------------
    // Ownership Transitions
    // -------------------------------------------------------------------------

    /// See [`DescriptorRing::allocate`]
    ///
    /// # Errors
    ///
    /// `InvalidLength` or `InsufficientFree`.
    pub fn allocate(&mut self, count: usize) -> RingResult<DescriptorRun> {
        self.ring.allocate(count)
    }

    /// See [`DescriptorRing::unallocate`]
    ///
    /// # Errors
    ///
    /// `StaleHandle` or `OutOfOrder`.
    pub fn unallocate(&mut self, run: DescriptorRun) -> RingResult<()> {
        self.ring.unallocate(run)
    }

    /// See [`DescriptorRing::configure`]
    ///
    /// # Errors
    ///
    /// `StaleHandle`, `InvalidLength` or `LengthExceedsMax`.
    pub fn configure(
        &mut self,
        handle: DescriptorHandle,
        buffer: DmaAddr,
        length: u32,
        flags: FrameFlags,
        id: u32,
    ) -> RingResult<()> {
        self.ring.configure(handle, buffer, length, flags, id)
    }

    /// Hand a run to the hardware and, when running, advance the channel's
    /// tail pointer to it.
    ///
    /// On error the run stays allocated; return it with
    /// [`unallocate`](Self::unallocate).
    ///
    /// # Errors
    ///
    /// - `EngineUnusable` after a failed reset
    /// - `HardwareRejected` if the channel halted underneath a running engine,
    ///   or a descriptor was never configured
    /// - any error of [`DescriptorRing::commit`]
    pub fn commit(&mut self, run: DescriptorRun) -> Result<()> {
        self.ensure_usable()?;
        if self.running && self.channel.is_halted() {
            #[cfg(feature = "log")]
            warn!("commit refused: channel halted");
            return Err(HardwareError::HardwareRejected.into());
        }

        self.ring.commit(run)?;

        #[cfg(feature = "log")]
        debug!(
            "committed {} descriptors, {} hw-owned",
            run.len(),
            self.ring.hw_count()
        );

        if self.running
            && let Some(tail) = self.ring.hw_tail()
        {
            // Descriptor writes must land before the tail write starts a fetch
            fence(Ordering::SeqCst);
            self.channel.set_tail_desc(tail);
        }
        Ok(())
    }

    /// See [`DescriptorRing::reap`]
    pub fn reap(&mut self) -> Reaped {
        fence(Ordering::SeqCst);
        let reaped = self.ring.reap();
        self.log_reap(&reaped);
        reaped
    }

    /// See [`DescriptorRing::reap_frames`]
    pub fn reap_frames(&mut self) -> Reaped {
        fence(Ordering::SeqCst);
        let reaped = self.ring.reap_frames();
        self.log_reap(&reaped);
        reaped
    }

    /// See [`DescriptorRing::free`]
    ///
    /// # Errors
    ///
    /// `StaleHandle` or `OutOfOrder`.
    pub fn free(&mut self, run: DescriptorRun) -> RingResult<()> {
        self.ring.free(run)
    }

    // -------------------------------------------------------------------------
    // Interrupts & Recovery
    // -------------------------------------------------------------------------

    /// Read pending interrupt flags and acknowledge them at once
    pub fn take_interrupts(&mut self) -> IrqStatus {
        let status = self.channel.irq_status();
        if status.any() {
            self.channel.ack_irq(status);
        }
        status
    }

    /// Reset the channel and re-arm the ring.
    ///
    /// Everything in flight is discarded and outstanding handles go stale.
    /// A reset that never completes leaves the engine unusable.
    ///
    /// # Errors
    ///
    /// `ResetTimedOut` or `EngineUnusable`.
    pub fn recover<W: ResetWait>(
        &mut self,
        reset: &mut ResetController<W>,
    ) -> HardwareResult<()> {
        self.running = false;
        match reset.reset(&mut self.channel) {
            Ok(()) => {
                self.ring.rearm();
                reset.complete();
                Ok(())
            }
            Err(e) => {
                self.usable = false;
                Err(e)
            }
        }
    }

    fn ensure_usable(&self) -> HardwareResult<()> {
        if self.usable {
            Ok(())
        } else {
            Err(HardwareError::EngineUnusable)
        }
    }

    #[cfg_attr(not(feature = "log"), allow(unused_variables))]
    fn log_reap(&self, reaped: &Reaped) {
        #[cfg(feature = "log")]
        {
            if !reaped.run.is_empty() {
                debug!(
                    "reaped {} descriptors, {} still hw-owned",
                    reaped.run.len(),
                    self.ring.hw_count()
                );
            }
            if let Some(fault) = reaped.fault {
                warn!(
                    "descriptor {} faulted: status=0x{:08x}",
                    fault.index,
                    fault.fault.to_bits()
                );
            }
        }
    }
}

impl<C: DmaChannel + core::fmt::Debug> core::fmt::Debug for RingEngine<'_, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RingEngine")
            .field("ring", &self.ring)
            .field("channel", &self.channel)
            .field("running", &self.running)
            .field("usable", &self.usable)
            .finish()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
