#![deny(unsafe_code)]
#![deny(missing_docs)]

//! Wire formats for the delta-sync exchange.
//!
//! Two independent implementations must agree byte-for-byte on record
//! boundaries, so every field width here is fixed and every integer is
//! little-endian. The signature stream carries a [`signature::SignatureTable`]
//! between the two sides; the delta stream carries the edit script plus the
//! block size it was computed with.

pub mod wire;

pub use wire::delta::{apply_delta_stream, DeltaReader, PatchStreamError, WireDeltaSink};
pub use wire::signature::{read_signature, write_signature};
pub use wire::WireError;
