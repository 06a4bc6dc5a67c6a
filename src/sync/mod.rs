//! Synchronization and Concurrency Support
//!
//! The stream is driven from two contexts: the foreground (start, deferred
//! resubmission, restart) and the channel's interrupt handler (dispatch,
//! recovery). This module provides the glue:
//!
//! - **Signals** (`signal`): lock-free interrupt-to-foreground signals
//!   - [`StreamSignals`] - fault flag and resubmit requests
//!   - [`EventSlot`] - single-writer/single-reader event counter
//!
//! - **Primitives** (`primitives`): Low-level synchronization types
//!   - [`CriticalSectionCell`] - ISR-safe interior mutability
//!
//! - **Shared Wrappers** (`shared`): ISR-safe stream wrapper
//!   - [`SharedStream`] - critical-section protected [`DmaStream`]
//!
//! # Feature Flags
//!
//! - `critical-section`: Enables `primitives` and `shared` modules
//!
//! [`DmaStream`]: crate::driver::stream::DmaStream

pub mod signal;

pub use signal::{EventSlot, StreamSignals};

// Primitives module (requires critical-section)
#[cfg(feature = "critical-section")]
mod primitives;

#[cfg(feature = "critical-section")]
pub use primitives::CriticalSectionCell;

// Shared wrappers (requires critical-section)
#[cfg(feature = "critical-section")]
mod shared;

#[cfg(feature = "critical-section")]
pub use shared::SharedStream;
