//! Reset Controller HAL
//!
//! Reset is the only recovery action the engine has: it discards all in-flight
//! descriptors and halts the channel. This module issues the reset and waits a
//! bounded amount for the hardware to report completion.
//!
//! The wait policy is pluggable. [`SpinWait`] counts polls and needs no timer;
//! [`DelayWait`] sleeps between polls with an `embedded_hal` delay. Both give
//! up with `ResetTimedOut` instead of retrying forever.

use embedded_hal::delay::DelayNs;

#[cfg(feature = "log")]
use log::{error, info};

use crate::driver::error::{HardwareError, HardwareResult};
use crate::hal::channel::DmaChannel;
use crate::internal::constants::{RESET_POLL_BUDGET, RESET_POLL_INTERVAL_US, RESET_TIMEOUT_US};

// =============================================================================
// Wait Policies
// =============================================================================

/// Bounded wait for a hardware condition
pub trait ResetWait {
    /// Poll `done` until it returns true or the budget runs out.
    ///
    /// Returns whether the condition was observed.
    fn wait_until<F: FnMut() -> bool>(&mut self, done: F) -> bool;
}

/// Iteration-counted busy wait
///
/// Suitable where no reliable clock source is available; the budget is a poll
/// count, not wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpinWait {
    max_polls: u32,
}

impl SpinWait {
    /// Wait for at most `max_polls` polls
    pub const fn new(max_polls: u32) -> Self {
        Self { max_polls }
    }

    /// Poll budget
    pub const fn max_polls(&self) -> u32 {
        self.max_polls
    }
}

impl Default for SpinWait {
    fn default() -> Self {
        Self::new(RESET_POLL_BUDGET)
    }
}

impl ResetWait for SpinWait {
    fn wait_until<F: FnMut() -> bool>(&mut self, mut done: F) -> bool {
        for _ in 0..self.max_polls {
            if done() {
                return true;
            }
            core::hint::spin_loop();
        }
        false
    }
}

/// Timer-backed wait
#[derive(Debug)]
pub struct DelayWait<D: DelayNs> {
    /// Delay provider
    delay: D,
    /// Overall timeout in microseconds
    timeout_us: u32,
    /// Sleep between polls in microseconds
    poll_interval_us: u32,
}

impl<D: DelayNs> DelayWait<D> {
    /// Create with the default timeout and poll interval
    pub fn new(delay: D) -> Self {
        Self {
            delay,
            timeout_us: RESET_TIMEOUT_US,
            poll_interval_us: RESET_POLL_INTERVAL_US,
        }
    }

    /// Create with a custom timeout
    pub fn with_timeout(delay: D, timeout_us: u32) -> Self {
        Self {
            delay,
            timeout_us,
            poll_interval_us: RESET_POLL_INTERVAL_US,
        }
    }

    /// Get the current timeout setting
    pub fn timeout_us(&self) -> u32 {
        self.timeout_us
    }

    /// Release the delay provider
    pub fn into_inner(self) -> D {
        self.delay
    }
}

impl<D: DelayNs> ResetWait for DelayWait<D> {
    fn wait_until<F: FnMut() -> bool>(&mut self, mut done: F) -> bool {
        let interval = self.poll_interval_us.max(1);
        let polls = (self.timeout_us / interval).max(1);
        for _ in 0..polls {
            if done() {
                return true;
            }
            self.delay.delay_us(interval);
        }
        done()
    }
}

// =============================================================================
// Reset State Machine
// =============================================================================

/// Reset state tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResetState {
    /// Not reset (normal operation)
    #[default]
    Normal,
    /// Reset in progress
    Resetting,
    /// Reset complete, ring must be re-armed before use
    ResetComplete,
    /// Reset never completed; the engine is unusable
    Failed,
}

/// Bounded-retry reset of a DMA channel
#[derive(Debug)]
pub struct ResetController<W: ResetWait> {
    wait: W,
    state: ResetState,
    resets: u32,
}

impl<W: ResetWait> ResetController<W> {
    /// Create a new reset controller
    pub fn new(wait: W) -> Self {
        Self {
            wait,
            state: ResetState::Normal,
            resets: 0,
        }
    }

    /// Get current reset state
    pub fn state(&self) -> ResetState {
        self.state
    }

    /// Number of completed resets
    pub fn reset_count(&self) -> u32 {
        self.resets
    }

    /// Start a reset without waiting
    pub fn start_reset<C: DmaChannel>(&mut self, channel: &mut C) {
        channel.start_reset();
        self.state = ResetState::Resetting;
    }

    /// Poll reset status (non-blocking)
    ///
    /// Returns true once the reset is complete.
    pub fn poll_reset<C: DmaChannel>(&mut self, channel: &C) -> bool {
        if self.state == ResetState::Resetting && channel.is_reset_done() {
            self.state = ResetState::ResetComplete;
            self.resets = self.resets.wrapping_add(1);
        }
        self.state == ResetState::ResetComplete
    }

    /// Reset the channel and wait for completion.
    ///
    /// # Errors
    ///
    /// - `ResetTimedOut` if reset-done never asserts within the wait budget;
    ///   the controller then stays in [`ResetState::Failed`]
    /// - `EngineUnusable` if an earlier reset already failed
    pub fn reset<C: DmaChannel>(&mut self, channel: &mut C) -> HardwareResult<()> {
        if self.state == ResetState::Failed {
            return Err(HardwareError::EngineUnusable);
        }

        self.start_reset(channel);
        let channel: &C = channel;
        if self.wait.wait_until(|| channel.is_reset_done()) {
            self.state = ResetState::ResetComplete;
            self.resets = self.resets.wrapping_add(1);
            #[cfg(feature = "log")]
            info!("dma reset complete ({} total)", self.resets);
            Ok(())
        } else {
            self.state = ResetState::Failed;
            #[cfg(feature = "log")]
            error!("dma reset timed out, engine unusable");
            Err(HardwareError::ResetTimedOut)
        }
    }

    /// Mark reset sequence as complete
    pub fn complete(&mut self) {
        if self.state == ResetState::ResetComplete {
            self.state = ResetState::Normal;
        }
    }

    /// Check whether a reset has failed
    pub fn is_failed(&self) -> bool {
        self.state == ResetState::Failed
    }

    /// Access the wait policy
    pub fn wait(&self) -> &W {
        &self.wait
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockChannel, MockDelay};

    #[test]
    fn spin_wait_polls_exactly_budget() {
        let mut polls = 0;
        let mut wait = SpinWait::new(25);
        assert!(!wait.wait_until(|| {
            polls += 1;
            false
        }));
        assert_eq!(polls, 25);
    }

    #[test]
    fn spin_wait_stops_when_done() {
        let mut polls = 0;
        let mut wait = SpinWait::default();
        assert!(wait.wait_until(|| {
            polls += 1;
            polls == 3
        }));
        assert_eq!(polls, 3);
        assert_eq!(wait.max_polls(), RESET_POLL_BUDGET);
    }

    #[test]
    fn delay_wait_sleeps_between_polls() {
        let mut wait = DelayWait::with_timeout(MockDelay::new(), 100);
        assert!(!wait.wait_until(|| false));
        let delay = wait.into_inner();
        assert_eq!(delay.total_ns(), 100_000);
    }

    #[test]
    fn delay_wait_returns_early() {
        let mut calls = 0;
        let mut wait = DelayWait::new(MockDelay::new());
        assert!(wait.wait_until(|| {
            calls += 1;
            calls > 1
        }));
        assert_eq!(wait.into_inner().total_ns(), u64::from(RESET_POLL_INTERVAL_US) * 1000);
    }

    #[test]
    fn reset_never_done_times_out_after_budget() {
        let mut channel = MockChannel::new();
        channel.set_reset_never_completes();
        let mut ctrl = ResetController::new(SpinWait::new(RESET_POLL_BUDGET));

        assert_eq!(ctrl.reset(&mut channel), Err(HardwareError::ResetTimedOut));
        assert_eq!(channel.reset_polls(), RESET_POLL_BUDGET);
        assert_eq!(ctrl.state(), ResetState::Failed);
        assert!(ctrl.is_failed());
    }

    #[test]
    fn failed_controller_refuses_further_resets() {
        let mut channel = MockChannel::new();
        channel.set_reset_never_completes();
        let mut ctrl = ResetController::new(SpinWait::new(4));
        let _ = ctrl.reset(&mut channel);

        channel.set_reset_done_after(0);
        assert_eq!(ctrl.reset(&mut channel), Err(HardwareError::EngineUnusable));
        assert_eq!(channel.resets_requested(), 1);
    }

    #[test]
    fn reset_completes_within_budget() {
        let mut channel = MockChannel::new();
        channel.set_reset_done_after(5);
        let mut ctrl = ResetController::new(SpinWait::new(10));

        assert_eq!(ctrl.reset(&mut channel), Ok(()));
        assert_eq!(ctrl.state(), ResetState::ResetComplete);
        assert_eq!(ctrl.reset_count(), 1);
        assert!(channel.reset_polls() <= 6);

        ctrl.complete();
        assert_eq!(ctrl.state(), ResetState::Normal);
    }

    #[test]
    fn non_blocking_reset_sequence() {
        let mut channel = MockChannel::new();
        channel.set_reset_done_after(2);
        let mut ctrl = ResetController::new(SpinWait::default());

        ctrl.start_reset(&mut channel);
        assert_eq!(ctrl.state(), ResetState::Resetting);
        assert!(!ctrl.poll_reset(&channel));
        assert!(!ctrl.poll_reset(&channel));
        assert!(ctrl.poll_reset(&channel));
        assert_eq!(ctrl.state(), ResetState::ResetComplete);
    }
}
