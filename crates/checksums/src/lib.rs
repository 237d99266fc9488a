#![deny(unsafe_code)]
#![deny(missing_docs)]

//! Checksum primitives for block-based delta synchronization.
//!
//! Two tiers of checksums cooperate during delta detection:
//!
//! - [`RollingChecksum`] is the cheap, weak checksum used to locate candidate
//!   block matches. It supports O(1) incremental updates when the scan window
//!   slides by one byte, which is what makes rolling-window matching viable.
//! - [`strong`] provides the collision-resistant MD5 digest used to confirm a
//!   weak match before a block is reused.
//!
//! Weak collisions are expected and harmless; every weak hit is verified
//! against the strong digest before any data is reused.

mod rolling;
pub mod strong;

pub use rolling::{RollingChecksum, RollingError};
