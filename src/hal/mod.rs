//! Hardware Abstraction Layer
//!
//! Channel-level access on top of the raw registers.
//!
//! # Modules
//!
//! - [`channel`]: The [`DmaChannel`] seam and its register-backed implementation
//! - [`reset`]: Bounded channel reset and the engine-unusable latch
//!
//! # Delay Integration
//!
//! Reset waits can use any `embedded_hal::delay::DelayNs` through
//! [`DelayWait`], or spin a fixed number of polls with [`SpinWait`].

pub mod channel;
pub mod reset;

pub use channel::{AxiDmaChannel, ChannelStatus, DmaChannel};
pub use reset::{DelayWait, ResetController, ResetState, ResetWait, SpinWait};
