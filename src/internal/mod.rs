//! Internal Implementation Details
//!
//! Not part of the public API; may change without notice.
//!
//! - [`register`]: Memory-mapped channel register definitions
//! - [`constants`]: Hardware limits and default tunables

pub(crate) mod constants;
pub(crate) mod register;
