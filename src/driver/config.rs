//! Configuration types for a DMA stream

use crate::driver::error::{ConfigError, ConfigResult};
use crate::driver::interrupt::IrqStatus;
use crate::internal::constants::{
    DEFAULT_COALESCE_COUNT, DEFAULT_DELAY_TIMER, DEFAULT_DESCRIPTORS_PER_TRANSFER,
    DEFAULT_MAX_TRANSFER_LEN, DEFAULT_TRANSFERS_IN_FLIGHT, LENGTH_FIELD_MAX, RESET_POLL_BUDGET,
};

/// Transfer direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Memory to device (transmit, MM2S channel)
    #[default]
    MemToDevice,
    /// Device to memory (receive, S2MM channel)
    DeviceToMem,
}

/// Operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Chained transfers, interrupt-driven reap and resubmit
    #[default]
    Normal,
    /// One self-looping descriptor replayed until reset
    Cyclic,
}

/// Where completed transfers are resubmitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResubmitPolicy {
    /// Rebuild and commit inside the interrupt handler (lowest latency)
    Inline,
    /// Post a resubmit request; the foreground drains it
    #[default]
    Deferred,
}

/// Stream configuration
///
/// # Example
///
/// ```ignore
/// let config = StreamConfig::new()
///     .with_direction(Direction::MemToDevice)
///     .with_descriptors_per_transfer(8)
///     .with_coalesce(8, 50)
///     .with_resubmit(ResubmitPolicy::Inline);
/// config.validate()?;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StreamConfig {
    /// Transfer direction
    pub direction: Direction,
    /// Operating mode
    pub mode: Mode,
    /// Per-descriptor byte ceiling
    pub max_transfer_len: u32,
    /// Descriptors a normal-mode transfer is split into
    pub descriptors_per_transfer: u16,
    /// Interrupt sources to enable
    pub irq_mask: IrqStatus,
    /// Completions per interrupt (normal mode)
    pub coalesce_count: u8,
    /// Coalescing delay timer, 0 disables (normal mode)
    pub delay_timer: u8,
    /// Resubmission context
    pub resubmit: ResubmitPolicy,
    /// Transfers kept committed at once (normal mode)
    pub transfers_in_flight: u8,
    /// Polls allowed for a reset to finish
    pub reset_poll_budget: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamConfig {
    /// Normal-mode transmit configuration with defaults
    #[must_use]
    pub const fn new() -> Self {
        Self {
            direction: Direction::MemToDevice,
            mode: Mode::Normal,
            max_transfer_len: DEFAULT_MAX_TRANSFER_LEN,
            descriptors_per_transfer: DEFAULT_DESCRIPTORS_PER_TRANSFER,
            irq_mask: IrqStatus::ALL,
            coalesce_count: DEFAULT_COALESCE_COUNT,
            delay_timer: DEFAULT_DELAY_TIMER,
            resubmit: ResubmitPolicy::Deferred,
            transfers_in_flight: DEFAULT_TRANSFERS_IN_FLIGHT,
            reset_poll_budget: RESET_POLL_BUDGET,
        }
    }

    /// Cyclic transmit configuration: error interrupt only
    #[must_use]
    pub const fn cyclic() -> Self {
        Self::new()
            .with_mode(Mode::Cyclic)
            .with_irq_mask(IrqStatus::ERROR_ONLY)
    }

    /// Check the configuration for consistency.
    ///
    /// # Errors
    ///
    /// - `InvalidConfig` for a zero ceiling, descriptor count, in-flight
    ///   count or reset budget
    /// - `InvalidConfig` for deferred resubmission with a single transfer in
    ///   flight: the ring drains before the foreground can refill it
    /// - `MaxLengthTooLarge` if the ceiling does not fit the length field
    /// - `InvalidCoalesce` for a zero coalescing threshold in normal mode, or
    ///   a threshold above the descriptors ever committed at once with the
    ///   delay timer off (the interrupt would never fire)
    /// - `CyclicCompletionInterrupts` if cyclic mode enables completion or
    ///   delay interrupts
    pub const fn validate(&self) -> ConfigResult<()> {
        if self.max_transfer_len == 0 {
            return Err(ConfigError::InvalidConfig);
        }
        if self.max_transfer_len > LENGTH_FIELD_MAX {
            return Err(ConfigError::MaxLengthTooLarge);
        }
        if self.reset_poll_budget == 0 {
            return Err(ConfigError::InvalidConfig);
        }

        match self.mode {
            Mode::Normal => {
                if self.descriptors_per_transfer == 0 || self.transfers_in_flight == 0 {
                    return Err(ConfigError::InvalidConfig);
                }
                if self.coalesce_count == 0 {
                    return Err(ConfigError::InvalidCoalesce);
                }
                if self.delay_timer == 0
                    && self.coalesce_count as usize > self.descriptors_needed()
                {
                    return Err(ConfigError::InvalidCoalesce);
                }
                if matches!(self.resubmit, ResubmitPolicy::Deferred)
                    && self.transfers_in_flight < 2
                {
                    return Err(ConfigError::InvalidConfig);
                }
            }
            Mode::Cyclic => {
                if self.irq_mask.is_completion() {
                    return Err(ConfigError::CyclicCompletionInterrupts);
                }
            }
        }
        Ok(())
    }

    /// Descriptors needed to keep the configured number of transfers in flight
    #[must_use]
    pub const fn descriptors_needed(&self) -> usize {
        match self.mode {
            Mode::Normal => {
                self.descriptors_per_transfer as usize * self.transfers_in_flight as usize
            }
            Mode::Cyclic => 1,
        }
    }

    // =========================================================================
    // Builder Methods
    // =========================================================================

    /// Set the transfer direction
    #[must_use]
    pub const fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Set the operating mode
    #[must_use]
    pub const fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the per-descriptor byte ceiling
    #[must_use]
    pub const fn with_max_transfer_len(mut self, len: u32) -> Self {
        self.max_transfer_len = len;
        self
    }

    /// Set the number of descriptors per transfer
    #[must_use]
    pub const fn with_descriptors_per_transfer(mut self, count: u16) -> Self {
        self.descriptors_per_transfer = count;
        self
    }

    /// Set the enabled interrupt sources
    #[must_use]
    pub const fn with_irq_mask(mut self, mask: IrqStatus) -> Self {
        self.irq_mask = mask;
        self
    }

    /// Set the coalescing threshold and delay timer
    #[must_use]
    pub const fn with_coalesce(mut self, count: u8, delay: u8) -> Self {
        self.coalesce_count = count;
        self.delay_timer = delay;
        self
    }

    /// Set where completed transfers are resubmitted
    #[must_use]
    pub const fn with_resubmit(mut self, policy: ResubmitPolicy) -> Self {
        self.resubmit = policy;
        self
    }

    /// Set the number of transfers kept in flight
    #[must_use]
    pub const fn with_transfers_in_flight(mut self, count: u8) -> Self {
        self.transfers_in_flight = count;
        self
    }

    /// Set the reset poll budget
    #[must_use]
    pub const fn with_reset_poll_budget(mut self, polls: u32) -> Self {
        self.reset_poll_budget = polls;
        self
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = StreamConfig::new();

        assert_eq!(config, StreamConfig::default());
        assert_eq!(config.direction, Direction::MemToDevice);
        assert_eq!(config.mode, Mode::Normal);
        assert_eq!(config.descriptors_per_transfer, 10);
        assert_eq!(config.coalesce_count, 10);
        assert_eq!(config.delay_timer, 100);
        assert_eq!(config.resubmit, ResubmitPolicy::Deferred);
        assert_eq!(config.reset_poll_budget, 10_000);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn coalesce_threshold_matches_transfer_size() {
        let config = StreamConfig::new();
        assert_eq!(
            u16::from(config.coalesce_count),
            config.descriptors_per_transfer
        );
    }

    #[test]
    fn cyclic_preset_is_valid() {
        let config = StreamConfig::cyclic();
        assert_eq!(config.mode, Mode::Cyclic);
        assert_eq!(config.irq_mask, IrqStatus::ERROR_ONLY);
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.descriptors_needed(), 1);
    }

    #[test]
    fn cyclic_with_completion_interrupts_rejected() {
        let config = StreamConfig::new().with_mode(Mode::Cyclic);
        assert_eq!(
            config.validate(),
            Err(ConfigError::CyclicCompletionInterrupts)
        );

        let delay_only = StreamConfig::cyclic().with_irq_mask(IrqStatus {
            delay: true,
            ..IrqStatus::ERROR_ONLY
        });
        assert_eq!(
            delay_only.validate(),
            Err(ConfigError::CyclicCompletionInterrupts)
        );
    }

    #[test]
    fn zero_coalesce_rejected_in_normal_mode() {
        let config = StreamConfig::new().with_coalesce(0, 0);
        assert_eq!(config.validate(), Err(ConfigError::InvalidCoalesce));
    }

    #[test]
    fn coalesce_threshold_must_be_reachable_without_delay_timer() {
        let config = StreamConfig::new()
            .with_descriptors_per_transfer(2)
            .with_transfers_in_flight(2);

        assert_eq!(
            config.with_coalesce(5, 0).validate(),
            Err(ConfigError::InvalidCoalesce)
        );
        assert_eq!(config.with_coalesce(4, 0).validate(), Ok(()));
        // The delay timer flushes a partial batch
        assert_eq!(config.with_coalesce(5, 10).validate(), Ok(()));
    }

    #[test]
    fn deferred_resubmit_needs_a_spare_transfer() {
        let config = StreamConfig::new().with_transfers_in_flight(1);
        assert_eq!(config.validate(), Err(ConfigError::InvalidConfig));

        let inline = config.with_resubmit(ResubmitPolicy::Inline);
        assert_eq!(inline.validate(), Ok(()));
    }

    #[test]
    fn ceiling_must_fit_length_field() {
        let config = StreamConfig::new().with_max_transfer_len(LENGTH_FIELD_MAX + 1);
        assert_eq!(config.validate(), Err(ConfigError::MaxLengthTooLarge));

        let config = StreamConfig::new().with_max_transfer_len(0);
        assert_eq!(config.validate(), Err(ConfigError::InvalidConfig));

        let config = StreamConfig::new().with_max_transfer_len(LENGTH_FIELD_MAX);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn zero_counts_rejected() {
        for config in [
            StreamConfig::new().with_descriptors_per_transfer(0),
            StreamConfig::new().with_transfers_in_flight(0),
            StreamConfig::new().with_reset_poll_budget(0),
        ] {
            assert_eq!(config.validate(), Err(ConfigError::InvalidConfig));
        }
    }

    #[test]
    fn descriptors_needed_in_normal_mode() {
        let config = StreamConfig::new()
            .with_descriptors_per_transfer(4)
            .with_transfers_in_flight(3);
        assert_eq!(config.descriptors_needed(), 12);
    }

    #[test]
    fn builder_chain() {
        let config = StreamConfig::new()
            .with_direction(Direction::DeviceToMem)
            .with_resubmit(ResubmitPolicy::Inline)
            .with_coalesce(4, 0);

        assert_eq!(config.direction, Direction::DeviceToMem);
        assert_eq!(config.resubmit, ResubmitPolicy::Inline);
        assert_eq!(config.coalesce_count, 4);
        assert_eq!(config.delay_timer, 0);
    }
}
