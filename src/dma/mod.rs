//! Descriptor ring
//!
//! This module provides the descriptor data model and the ring that mediates
//! every ownership transition between software and the DMA channel. Nothing
//! here touches channel registers; see [`RingEngine`] for the hardware side.
//!
//! # Architecture
//!
//! - [`BufferDescriptor`]: fixed-layout record the hardware fetches
//! - [`DescriptorRegion`]: the aligned memory carved into descriptors
//! - [`DescriptorRing`]: free / allocated / hardware-owned / unreaped
//!   partitioning, tracked with monotonic sequence counters
//!
//! # Example
//!
//! ```ignore
//! use ph_axi_sgdma::dma::{DescriptorRing, FrameFlags};
//!
//! let mut ring = DescriptorRing::create(region_mem, region_phys, 64, max_len)?;
//! let run = ring.allocate(2)?;
//! ring.configure(run.handle(0).unwrap(), buf, 512, FrameFlags::START_OF_FRAME, 1)?;
//! ring.configure(run.handle(1).unwrap(), buf + 512, 512, FrameFlags::END_OF_FRAME, 2)?;
//! ring.commit(run)?;
//! ```
//!
//! [`RingEngine`]: crate::driver::engine::RingEngine

pub mod descriptor;
mod region;
mod ring;

pub use descriptor::{BufferDescriptor, DescriptorFault, DescriptorStatus, FrameFlags};
pub use region::DescriptorRegion;
pub use ring::{DescriptorHandle, DescriptorRing, DescriptorRun, ReapFault, Reaped};

/// Device-visible (physical, flat) address
pub type DmaAddr = u64;
