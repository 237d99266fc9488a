//! Shared framing primitives.
//!
//! All multi-byte integers on the wire are little-endian with fixed widths;
//! there is no varint encoding anywhere in the protocol.

pub mod delta;
pub mod signature;

use std::io::{self, Read, Write};

use thiserror::Error;

/// Errors raised while encoding or decoding wire streams.
#[derive(Debug, Error)]
pub enum WireError {
    /// Stream did not start with the expected magic bytes.
    #[error("bad magic: expected {expected:?}, found {found:?}")]
    BadMagic {
        /// Magic the decoder was looking for.
        expected: [u8; 4],
        /// Bytes actually present.
        found: [u8; 4],
    },
    /// The advertised block size was zero.
    #[error("wire stream advertises a zero block size")]
    ZeroBlockSize,
    /// Signature records were not in strictly sequential block order.
    #[error("signature record out of order: expected index {expected}, found {found}")]
    NonSequentialIndex {
        /// Index the decoder expected next.
        expected: u64,
        /// Index actually present in the record.
        found: u64,
    },
    /// A signature record carried an impossible block length.
    #[error("block {index} has length {length} incompatible with block size {block_size}")]
    BadBlockLength {
        /// Index of the offending block.
        index: u64,
        /// Length carried by the record.
        length: u32,
        /// Block size advertised in the header.
        block_size: u32,
    },
    /// The sum of record lengths disagrees with the advertised total.
    #[error("record lengths sum to {actual} bytes but header advertises {advertised}")]
    TotalBytesMismatch {
        /// Total implied by the records.
        actual: u64,
        /// Total carried in the header.
        advertised: u64,
    },
    /// An operation tag byte was not one of the defined values.
    #[error("unknown delta operation tag {0:#04x}")]
    UnknownTag(u8),
    /// A literal payload ended before its advertised length.
    #[error("literal payload truncated: expected {expected} bytes, got {got}")]
    TruncatedLiteral {
        /// Length advertised by the frame.
        expected: u32,
        /// Bytes actually available.
        got: u64,
    },
    /// Underlying I/O failure.
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub(crate) fn write_u32<W: Write>(writer: &mut W, value: u32) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

pub(crate) fn read_u32<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

pub(crate) fn write_u64<W: Write>(writer: &mut W, value: u64) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

pub(crate) fn read_u64<R: Read>(reader: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

pub(crate) fn read_magic<R: Read>(reader: &mut R, expected: [u8; 4]) -> Result<(), WireError> {
    let mut found = [0u8; 4];
    reader.read_exact(&mut found)?;
    if found != expected {
        return Err(WireError::BadMagic { expected, found });
    }
    Ok(())
}
