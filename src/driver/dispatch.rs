//! Completion dispatch
//!
//! [`DmaStream::on_interrupt`] is the body of the channel's interrupt handler.
//! It must run to completion without another handler touching the same ring;
//! wrap the stream in [`SharedStream`] when it is shared with the foreground.
//!
//! Sequence per interrupt:
//!
//! 1. read pending flags and acknowledge them before anything else
//! 2. nothing set: spurious wake, return
//! 3. error set: raise the fault signal, reset the channel, return
//! 4. completion set: reap, account, free, then resubmit (inline) or post a
//!    resubmit request (deferred); an inline resubmit the channel refuses is a
//!    fault like any other
//!
//! [`SharedStream`]: crate::sync::SharedStream

#[cfg(feature = "log")]
use log::{error, warn};

use crate::dma::{DescriptorRun, ReapFault};
use crate::driver::config::{Direction, Mode, ResubmitPolicy};
use crate::driver::error::{Error, HardwareError, HardwareResult, Result, RingError};
use crate::driver::stream::{DmaStream, StreamState};
use crate::hal::channel::{ChannelStatus, DmaChannel};
use crate::hal::reset::ResetWait;

// =============================================================================
// Outcome Types
// =============================================================================

/// Completed work reported by one interrupt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Completion {
    /// Id of the oldest reaped descriptor
    pub first_id: u32,
    /// Id of the newest reaped descriptor
    pub last_id: u32,
    /// Descriptors reaped
    pub descriptors: u32,
    /// Transfers finished by this reap
    pub transfers: u32,
    /// Bytes reported by the hardware
    pub bytes: u64,
    /// Transfers completed since start
    pub total: u64,
    /// Transfers committed again inside the handler
    pub resubmitted: u32,
}

/// Details of a fault and the recovery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FaultReport {
    /// Failed descriptor, when found by a reap; `None` for an error interrupt
    pub descriptor: Option<ReapFault>,
    /// Error that stopped an inline resubmission
    pub cause: Option<Error>,
    /// Channel registers before the reset
    pub status: ChannelStatus,
    /// Outcome of the recovery reset
    pub reset: HardwareResult<()>,
}

impl FaultReport {
    /// Error to surface to the caller: the reset failure if recovery failed,
    /// then a hardware refusal that stopped resubmission, otherwise the
    /// transfer fault itself
    #[must_use]
    pub fn error(&self) -> HardwareError {
        match (self.reset, self.cause) {
            (Err(e), _) | (Ok(()), Some(Error::Hardware(e))) => e,
            _ => HardwareError::TransferFault,
        }
    }
}

/// What an interrupt turned out to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DispatchOutcome {
    /// No relevant flag was set
    Spurious,
    /// Completion flagged but no whole transfer finished yet
    InProgress,
    /// Descriptors completed
    Completed(Completion),
    /// Error; the channel was reset and the stream is faulted
    Faulted(FaultReport),
}

// =============================================================================
// Dispatcher
// =============================================================================

impl<C: DmaChannel, W: ResetWait> DmaStream<'_, C, W> {
    /// Handle one assertion of the channel interrupt.
    pub fn on_interrupt(&mut self) -> DispatchOutcome {
        let irq = self.engine.take_interrupts();
        if !irq.any() {
            self.stats.spurious = self.stats.spurious.saturating_add(1);
            return DispatchOutcome::Spurious;
        }

        // An error halts the channel, so nothing else can be pending with it
        if irq.has_error() {
            return DispatchOutcome::Faulted(self.fail(None, None));
        }

        let reaped = match self.config.direction {
            Direction::MemToDevice => self.engine.reap_frames(),
            Direction::DeviceToMem => self.engine.reap(),
        };
        let completion = self.account(reaped.run);

        if self.engine.free(reaped.run).is_err() {
            return DispatchOutcome::Faulted(self.fail(reaped.fault, None));
        }
        if let Some(fault) = reaped.fault {
            return DispatchOutcome::Faulted(self.fail(Some(fault), None));
        }

        match completion {
            None => DispatchOutcome::InProgress,
            Some(mut completion) => match self.after_completion(completion.transfers) {
                Ok(resubmitted) => {
                    completion.resubmitted = resubmitted;
                    DispatchOutcome::Completed(completion)
                }
                Err(e) => DispatchOutcome::Faulted(self.fail(None, Some(e))),
            },
        }
    }

    /// Tally a reaped run before it is freed
    fn account(&mut self, run: DescriptorRun) -> Option<Completion> {
        if run.is_empty() {
            return None;
        }

        let ring = self.engine.ring();
        let mut first_id = 0;
        let mut last_id = 0;
        let mut bytes = 0u64;
        for (offset, handle) in run.handles().enumerate() {
            let Ok(desc) = ring.get(handle) else {
                continue;
            };
            if offset == 0 {
                first_id = desc.id();
            }
            last_id = desc.id();
            bytes += u64::from(desc.transferred());
        }

        let descriptors = run.len() as u32;
        let per_transfer = self.plan.map_or(0, |plan| plan.count);
        let transfers = if per_transfer == 0 {
            0
        } else {
            let done = self.partial + descriptors;
            self.partial = done % per_transfer;
            done / per_transfer
        };

        self.in_flight = self.in_flight.saturating_sub(transfers);
        self.stats.descriptors += u64::from(descriptors);
        self.stats.transfers += u64::from(transfers);
        self.stats.bytes += bytes;

        Some(Completion {
            first_id,
            last_id,
            descriptors,
            transfers,
            bytes,
            total: self.stats.transfers,
            resubmitted: 0,
        })
    }

    /// Keep the pipeline full after `transfers` finished.
    ///
    /// Returns the number of transfers committed inline. Transfers that do
    /// not fit in the ring yet are handed to the foreground as resubmit
    /// requests.
    ///
    /// # Errors
    ///
    /// Any inline build or commit error other than a full ring.
    fn after_completion(&mut self, transfers: u32) -> Result<u32> {
        if transfers == 0 || self.config.mode == Mode::Cyclic {
            return Ok(0);
        }
        self.state = StreamState::Completed;

        match self.resubmit_policy() {
            ResubmitPolicy::Deferred => {
                self.signals.request_resubmit(transfers);
                Ok(0)
            }
            ResubmitPolicy::Inline => {
                let mut committed = 0;
                while committed < transfers {
                    match self.submit_transfer() {
                        Ok(()) => committed += 1,
                        Err(Error::Ring(RingError::InsufficientFree)) => {
                            #[cfg(feature = "log")]
                            warn!(
                                "resubmitted {} of {} transfers, deferring the rest",
                                committed, transfers
                            );
                            self.signals.request_resubmit(transfers - committed);
                            break;
                        }
                        Err(e) => return Err(e),
                    }
                }
                Ok(committed)
            }
        }
    }

    /// Record a fault and reset the channel
    fn fail(&mut self, descriptor: Option<ReapFault>, cause: Option<Error>) -> FaultReport {
        let status = self.engine.snapshot();
        #[cfg(feature = "log")]
        error!(
            "dma error: control=0x{:08x} status=0x{:08x} curdesc=0x{:x} taildesc=0x{:x}",
            status.control, status.status, status.current_desc, status.tail_desc
        );

        self.signals.raise_fault();
        self.state = StreamState::Faulted;
        self.stats.faults = self.stats.faults.saturating_add(1);
        self.in_flight = 0;
        self.partial = 0;
        self.backlog = 0;

        let reset = self.engine.recover(&mut self.reset);
        FaultReport {
            descriptor,
            cause,
            status,
            reset,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
