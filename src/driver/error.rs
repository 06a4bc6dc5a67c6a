//! Error types for the scatter-gather DMA engine
//!
//! Errors are organized by domain for better diagnostics:
//! - [`ConfigError`]: Stream and ring configuration failures
//! - [`RingError`]: Descriptor ring misuse detected synchronously
//! - [`HardwareError`]: Failures reported by, or while driving, the DMA channel
//!
//! The unified [`Error`] enum wraps all domain errors and is returned
//! by most engine methods.

// =============================================================================
// Configuration Errors
// =============================================================================

/// Configuration errors
///
/// These errors occur when building a ring or validating a [`StreamConfig`].
///
/// [`StreamConfig`]: crate::driver::config::StreamConfig
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Invalid configuration parameter
    InvalidConfig,
    /// Descriptor alignment is not a power of two or below the hardware minimum
    InvalidAlignment,
    /// Coalescing threshold outside 1..=255
    InvalidCoalesce,
    /// Per-descriptor ceiling does not fit the hardware length field
    MaxLengthTooLarge,
    /// Completion or delay interrupts requested in cyclic mode
    CyclicCompletionInterrupts,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ConfigError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ConfigError::InvalidConfig => "invalid configuration",
            ConfigError::InvalidAlignment => "invalid descriptor alignment",
            ConfigError::InvalidCoalesce => "invalid coalescing threshold",
            ConfigError::MaxLengthTooLarge => "max transfer length exceeds length field",
            ConfigError::CyclicCompletionInterrupts => {
                "completion interrupts are not allowed in cyclic mode"
            }
        }
    }
}

// =============================================================================
// Ring Errors
// =============================================================================

/// Descriptor ring errors
///
/// Caller-side misuse of the ring. These are never retried automatically;
/// the request has to be fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RingError {
    /// Region is misaligned or too small to hold a single descriptor
    InvalidRegion,
    /// Not enough free descriptors for the request
    InsufficientFree,
    /// Zero-length request or descriptor
    InvalidLength,
    /// Descriptor length above the per-descriptor ceiling
    LengthExceedsMax,
    /// Data buffer overlaps the descriptor region
    RegionOverlap,
    /// Handle does not belong to the descriptor's current ownership cycle
    StaleHandle,
    /// Run is not the next one in ring order for this transition
    OutOfOrder,
}

impl core::fmt::Display for RingError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl RingError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            RingError::InvalidRegion => "invalid descriptor region",
            RingError::InsufficientFree => "insufficient free descriptors",
            RingError::InvalidLength => "invalid length",
            RingError::LengthExceedsMax => "length exceeds max transfer length",
            RingError::RegionOverlap => "buffer overlaps descriptor region",
            RingError::StaleHandle => "stale descriptor handle",
            RingError::OutOfOrder => "descriptor run out of order",
        }
    }
}

// =============================================================================
// Hardware Errors
// =============================================================================

/// Hardware errors
///
/// Raised while handing descriptors to the channel, by descriptors the
/// channel flagged, or by the recovery path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HardwareError {
    /// Channel refused the committed run
    HardwareRejected,
    /// Channel flagged a transfer error
    TransferFault,
    /// Reset-done never asserted within the poll budget
    ResetTimedOut,
    /// Engine failed to reset earlier and can no longer be used
    EngineUnusable,
    /// Operation not valid in the current state
    InvalidState,
}

impl core::fmt::Display for HardwareError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl HardwareError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            HardwareError::HardwareRejected => "hardware rejected descriptors",
            HardwareError::TransferFault => "transfer fault",
            HardwareError::ResetTimedOut => "reset timed out",
            HardwareError::EngineUnusable => "engine unusable",
            HardwareError::InvalidState => "invalid state for operation",
        }
    }

    /// Whether the engine instance must be discarded after this error
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            HardwareError::ResetTimedOut | HardwareError::EngineUnusable
        )
    }
}

// =============================================================================
// Unified Error Type
// =============================================================================

/// This enum wraps all domain-specific errors for unified error handling.
///
/// Match on the inner domain error for specific handling:
/// ```ignore
/// match result {
///     Err(Error::Ring(RingError::InsufficientFree)) => { /* retry later */ }
///     Err(Error::Hardware(HardwareError::ResetTimedOut)) => { /* escalate */ }
///     _ => {}
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Configuration error
    Config(ConfigError),
    /// Ring error
    Ring(RingError),
    /// Hardware error
    Hardware(HardwareError),
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Config(e) => write!(f, "config: {}", e.as_str()),
            Error::Ring(e) => write!(f, "ring: {}", e.as_str()),
            Error::Hardware(e) => write!(f, "hardware: {}", e.as_str()),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<RingError> for Error {
    fn from(e: RingError) -> Self {
        Error::Ring(e)
    }
}

impl From<HardwareError> for Error {
    fn from(e: HardwareError) -> Self {
        Error::Hardware(e)
    }
}

/// Result type alias for engine operations
pub type Result<T> = core::result::Result<T, Error>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = core::result::Result<T, ConfigError>;

/// Result type alias for ring operations
pub type RingResult<T> = core::result::Result<T, RingError>;

/// Result type alias for hardware operations
pub type HardwareResult<T> = core::result::Result<T, HardwareError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    extern crate std;
    use std::format;

    use super::*;

    #[test]
    fn config_error_as_str_non_empty() {
        let variants = [
            ConfigError::InvalidConfig,
            ConfigError::InvalidAlignment,
            ConfigError::InvalidCoalesce,
            ConfigError::MaxLengthTooLarge,
            ConfigError::CyclicCompletionInterrupts,
        ];

        for variant in variants {
            assert!(!variant.as_str().is_empty(), "ConfigError::{variant:?} has empty string");
        }
    }

    #[test]
    fn ring_error_as_str_non_empty() {
        let variants = [
            RingError::InvalidRegion,
            RingError::InsufficientFree,
            RingError::InvalidLength,
            RingError::LengthExceedsMax,
            RingError::RegionOverlap,
            RingError::StaleHandle,
            RingError::OutOfOrder,
        ];

        for variant in variants {
            assert!(!variant.as_str().is_empty(), "RingError::{variant:?} has empty string");
        }
    }

    #[test]
    fn ring_error_display() {
        let display = format!("{}", RingError::InsufficientFree);
        assert_eq!(display, "insufficient free descriptors");
    }

    #[test]
    fn hardware_error_fatality() {
        assert!(HardwareError::ResetTimedOut.is_fatal());
        assert!(HardwareError::EngineUnusable.is_fatal());
        assert!(!HardwareError::HardwareRejected.is_fatal());
        assert!(!HardwareError::TransferFault.is_fatal());
        assert!(!HardwareError::InvalidState.is_fatal());
    }

    #[test]
    fn error_from_domain_errors() {
        assert_eq!(
            Error::from(ConfigError::InvalidCoalesce),
            Error::Config(ConfigError::InvalidCoalesce)
        );
        assert_eq!(
            Error::from(RingError::StaleHandle),
            Error::Ring(RingError::StaleHandle)
        );
        assert_eq!(
            Error::from(HardwareError::ResetTimedOut),
            Error::Hardware(HardwareError::ResetTimedOut)
        );
    }

    #[test]
    fn error_display_carries_domain_prefix() {
        let display = format!("{}", Error::Ring(RingError::LengthExceedsMax));
        assert!(display.starts_with("ring:"));
        assert!(display.contains("max transfer length"));

        let display = format!("{}", Error::Hardware(HardwareError::ResetTimedOut));
        assert_eq!(display, "hardware: reset timed out");
    }

    #[test]
    fn question_mark_converts_domain_results() {
        fn inner() -> RingResult<u32> {
            Err(RingError::InvalidLength)
        }

        fn outer() -> Result<u32> {
            Ok(inner()?)
        }

        assert_eq!(outer(), Err(Error::Ring(RingError::InvalidLength)));
    }
}
