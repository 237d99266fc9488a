#![deny(unsafe_code)]
#![deny(missing_docs)]

//! Block signatures over a reference file.
//!
//! A [`SignatureTable`] describes one version of a reference file as an
//! ordered run of contiguous, non-overlapping blocks, each carrying a weak
//! rolling checksum and a strong MD5 digest. The table is immutable once
//! built; a [`SignatureIndex`] derived from it provides O(1) average lookup
//! from weak checksum to candidate blocks during delta detection.

mod block;
mod index;
mod table;

pub use block::BlockSignature;
pub use index::SignatureIndex;
pub use table::{build_signature, SignatureError, SignatureTable};
