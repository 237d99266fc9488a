//! Signature table construction.

use std::io::{self, Read};

use checksums::strong::strong_digest;
use checksums::RollingChecksum;
use thiserror::Error;

use crate::block::BlockSignature;

/// Errors returned while building a signature table.
#[derive(Debug, Error)]
pub enum SignatureError {
    /// The requested block size was zero.
    #[error("signature block size must be at least 1")]
    ZeroBlockSize,
    /// Underlying I/O failure raised while reading the reference stream.
    #[error("failed to read input while building signature: {0}")]
    Io(
        #[from]
        #[source]
        io::Error,
    ),
}

/// Ordered, immutable signature for exactly one reference file version.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SignatureTable {
    block_size: u32,
    blocks: Vec<BlockSignature>,
    total_bytes: u64,
}

impl SignatureTable {
    /// Creates a table from raw components (wire-format reconstruction).
    #[must_use]
    pub const fn from_raw_parts(
        block_size: u32,
        blocks: Vec<BlockSignature>,
        total_bytes: u64,
    ) -> Self {
        Self {
            block_size,
            blocks,
            total_bytes,
        }
    }

    /// Returns the block size the table was built with.
    #[inline]
    #[must_use]
    pub const fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Returns the block signatures in block order.
    #[inline]
    #[must_use]
    pub fn blocks(&self) -> &[BlockSignature] {
        &self.blocks
    }

    /// Returns the total number of reference bytes described by the table.
    #[inline]
    #[must_use]
    pub const fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Returns the number of blocks in the table.
    #[inline]
    #[must_use]
    pub fn block_count(&self) -> u64 {
        self.blocks.len() as u64
    }

    /// Reports whether the table describes an empty reference file.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub(crate) fn into_blocks(self) -> Vec<BlockSignature> {
        self.blocks
    }
}

/// Builds a [`SignatureTable`] by reading `reader` to the end exactly once.
///
/// Every block except possibly the last spans `block_size` bytes; an empty
/// input produces an empty table. Building twice over identical bytes yields
/// identical tables.
///
/// # Errors
///
/// Returns [`SignatureError::ZeroBlockSize`] for a zero block size and
/// propagates any I/O error raised by the reader, aborting construction.
pub fn build_signature<R: Read>(
    mut reader: R,
    block_size: u32,
) -> Result<SignatureTable, SignatureError> {
    if block_size == 0 {
        return Err(SignatureError::ZeroBlockSize);
    }

    let mut blocks = Vec::new();
    let mut buffer = vec![0u8; block_size as usize];
    let mut total_bytes = 0u64;
    let mut index = 0u64;

    loop {
        let filled = read_full(&mut reader, &mut buffer)?;
        if filled == 0 {
            break;
        }

        let block = &buffer[..filled];
        blocks.push(BlockSignature::from_raw_parts(
            index,
            filled as u32,
            RollingChecksum::from_block(block).value(),
            strong_digest(block),
        ));

        total_bytes += filled as u64;
        index += 1;

        if filled < buffer.len() {
            break;
        }
    }

    Ok(SignatureTable::from_raw_parts(
        block_size,
        blocks,
        total_bytes,
    ))
}

/// Reads until `buf` is full or the stream ends, returning the filled length.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_empty_table() {
        let table = build_signature(&b""[..], 4).expect("signature");
        assert!(table.is_empty());
        assert_eq!(table.total_bytes(), 0);
        assert_eq!(table.block_size(), 4);
    }

    #[test]
    fn zero_block_size_is_rejected() {
        let error = build_signature(&b"data"[..], 0).expect_err("zero block size");
        assert!(matches!(error, SignatureError::ZeroBlockSize));
    }

    #[test]
    fn blocks_are_contiguous_and_indexed_from_zero() {
        let table = build_signature(&b"AAAABBBBCCCCDDDD"[..], 4).expect("signature");
        assert_eq!(table.block_count(), 4);
        assert_eq!(table.total_bytes(), 16);
        for (position, block) in table.blocks().iter().enumerate() {
            assert_eq!(block.index(), position as u64);
            assert_eq!(block.length(), 4);
        }
    }

    #[test]
    fn final_block_may_be_short_but_never_empty() {
        let table = build_signature(&b"AAAABB"[..], 4).expect("signature");
        assert_eq!(table.block_count(), 2);
        assert_eq!(table.blocks()[0].length(), 4);
        assert_eq!(table.blocks()[1].length(), 2);
        assert_eq!(table.total_bytes(), 6);
    }

    #[test]
    fn building_is_idempotent() {
        let data: Vec<u8> = (0u32..10_000).map(|value| (value % 251) as u8).collect();
        let first = build_signature(&data[..], 700).expect("signature");
        let second = build_signature(&data[..], 700).expect("signature");
        assert_eq!(first, second);
    }

    #[test]
    fn identical_blocks_share_checksums() {
        let table = build_signature(&b"XYXY"[..], 2).expect("signature");
        assert_eq!(table.blocks()[0].weak(), table.blocks()[1].weak());
        assert_eq!(table.blocks()[0].strong(), table.blocks()[1].strong());
    }
}
