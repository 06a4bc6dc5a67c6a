//! Stream driver built on the descriptor ring.
//!
//! - [`config`] - Stream configuration and builder methods
//! - [`engine`] - Ring bound to a hardware channel (start, commit, recover)
//! - [`stream`] - Buffer-to-transfer splitting and the stream lifecycle
//! - [`dispatch`] - Interrupt dispatch: reap, resubmit, fault recovery
//! - [`error`] - Error types and result aliases
//! - [`interrupt`] - Channel interrupt status bits
//!
//! # Example
//!
//! ```ignore
//! use ph_axi_sgdma::driver::{DmaStream, RingEngine, StreamConfig, TransferBuffer};
//!
//! let engine = RingEngine::new(ring, channel);
//! let mut stream = DmaStream::new(engine, StreamConfig::new(), &SIGNALS)?;
//! stream.set_buffer(TransferBuffer::new(buf_phys, 64 * 1024))?;
//! stream.start()?;
//! ```

pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod interrupt;
pub mod stream;

pub use config::{Direction, Mode, ResubmitPolicy, StreamConfig};
pub use dispatch::{Completion, DispatchOutcome, FaultReport};
pub use engine::RingEngine;
pub use error::{
    ConfigError, ConfigResult, Error, HardwareError, HardwareResult, Result, RingError,
    RingResult,
};
pub use interrupt::IrqStatus;
pub use stream::{DmaStream, StreamState, StreamStats, TransferBuffer};
