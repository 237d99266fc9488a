//! Signature stream format.
//!
//! Layout, all integers little-endian:
//!
//! ```text
//! magic        4 bytes  "BSG1"
//! block_size   u32
//! block_count  u64
//! total_bytes  u64
//! records      block_count x 32 bytes:
//!     index    u64
//!     length   u32
//!     weak     u32
//!     strong   16 bytes
//! ```
//!
//! Records are fixed-width so independent implementations agree on record
//! boundaries without any lookahead.

use std::io::{Read, Write};

use checksums::strong::STRONG_LEN;
use signature::{BlockSignature, SignatureTable};

use super::{read_magic, read_u32, read_u64, write_u32, write_u64, WireError};

/// Magic bytes opening a signature stream.
pub const SIGNATURE_MAGIC: [u8; 4] = *b"BSG1";

/// Encodes a signature table to `writer`.
///
/// # Errors
///
/// Propagates I/O failures from the writer.
pub fn write_signature<W: Write>(
    writer: &mut W,
    table: &SignatureTable,
) -> Result<(), WireError> {
    writer.write_all(&SIGNATURE_MAGIC)?;
    write_u32(writer, table.block_size())?;
    write_u64(writer, table.block_count())?;
    write_u64(writer, table.total_bytes())?;

    for block in table.blocks() {
        write_u64(writer, block.index())?;
        write_u32(writer, block.length())?;
        write_u32(writer, block.weak())?;
        writer.write_all(block.strong())?;
    }
    Ok(())
}

/// Decodes a signature table from `reader`, validating structural invariants.
///
/// # Errors
///
/// Rejects bad magic, zero block sizes, out-of-order records, non-final
/// blocks that are not exactly `block_size` long, and totals that disagree
/// with the record lengths. I/O failures (including truncation) propagate.
pub fn read_signature<R: Read>(reader: &mut R) -> Result<SignatureTable, WireError> {
    read_magic(reader, SIGNATURE_MAGIC)?;
    let block_size = read_u32(reader)?;
    if block_size == 0 {
        return Err(WireError::ZeroBlockSize);
    }
    let block_count = read_u64(reader)?;
    let total_bytes = read_u64(reader)?;

    let capacity = usize::try_from(block_count).unwrap_or(0);
    let mut blocks = Vec::with_capacity(capacity.min(1 << 20));
    let mut summed = 0u64;

    for expected in 0..block_count {
        let index = read_u64(reader)?;
        if index != expected {
            return Err(WireError::NonSequentialIndex {
                expected,
                found: index,
            });
        }

        let length = read_u32(reader)?;
        let is_final = expected + 1 == block_count;
        let valid = if is_final {
            length >= 1 && length <= block_size
        } else {
            length == block_size
        };
        if !valid {
            return Err(WireError::BadBlockLength {
                index,
                length,
                block_size,
            });
        }

        let weak = read_u32(reader)?;
        let mut strong = [0u8; STRONG_LEN];
        reader.read_exact(&mut strong)?;

        summed += u64::from(length);
        blocks.push(BlockSignature::from_raw_parts(index, length, weak, strong));
    }

    if summed != total_bytes {
        return Err(WireError::TotalBytesMismatch {
            actual: summed,
            advertised: total_bytes,
        });
    }

    Ok(SignatureTable::from_raw_parts(
        block_size,
        blocks,
        total_bytes,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use signature::build_signature;
    use std::io::Cursor;

    #[test]
    fn encode_decode_round_trip() {
        let table = build_signature(&b"AAAABBBBCC"[..], 4).expect("signature");
        let mut encoded = Vec::new();
        write_signature(&mut encoded, &table).expect("encode");

        let decoded = read_signature(&mut Cursor::new(encoded)).expect("decode");
        assert_eq!(decoded, table);
    }

    #[test]
    fn empty_table_round_trips() {
        let table = build_signature(&b""[..], 2048).expect("signature");
        let mut encoded = Vec::new();
        write_signature(&mut encoded, &table).expect("encode");
        // magic + block_size + block_count + total_bytes, no records.
        assert_eq!(encoded.len(), 4 + 4 + 8 + 8);

        let decoded = read_signature(&mut Cursor::new(encoded)).expect("decode");
        assert!(decoded.is_empty());
        assert_eq!(decoded.block_size(), 2048);
    }

    #[test]
    fn record_layout_is_bit_exact() {
        let table = build_signature(&b"AAAA"[..], 4).expect("signature");
        let mut encoded = Vec::new();
        write_signature(&mut encoded, &table).expect("encode");

        assert_eq!(&encoded[0..4], b"BSG1");
        assert_eq!(&encoded[4..8], &4u32.to_le_bytes());
        assert_eq!(&encoded[8..16], &1u64.to_le_bytes());
        assert_eq!(&encoded[16..24], &4u64.to_le_bytes());
        // Record: index, length, weak, strong.
        assert_eq!(&encoded[24..32], &0u64.to_le_bytes());
        assert_eq!(&encoded[32..36], &4u32.to_le_bytes());
        let block = &table.blocks()[0];
        assert_eq!(&encoded[36..40], &block.weak().to_le_bytes());
        assert_eq!(&encoded[40..56], block.strong());
        assert_eq!(encoded.len(), 56);
    }

    #[test]
    fn bad_magic_is_rejected() {
        let error = read_signature(&mut Cursor::new(b"NOPE".to_vec())).expect_err("bad magic");
        assert!(matches!(error, WireError::BadMagic { .. }));
    }

    #[test]
    fn truncated_stream_is_rejected() {
        let table = build_signature(&b"AAAABBBB"[..], 4).expect("signature");
        let mut encoded = Vec::new();
        write_signature(&mut encoded, &table).expect("encode");
        encoded.truncate(encoded.len() - 3);

        let error = read_signature(&mut Cursor::new(encoded)).expect_err("truncated");
        assert!(matches!(error, WireError::Io(_)));
    }

    #[test]
    fn non_final_short_block_is_rejected() {
        let blocks = vec![
            BlockSignature::from_raw_parts(0, 2, 1, [0u8; STRONG_LEN]),
            BlockSignature::from_raw_parts(1, 4, 2, [0u8; STRONG_LEN]),
        ];
        let table = SignatureTable::from_raw_parts(4, blocks, 6);
        let mut encoded = Vec::new();
        write_signature(&mut encoded, &table).expect("encode");

        let error = read_signature(&mut Cursor::new(encoded)).expect_err("bad length");
        assert!(matches!(error, WireError::BadBlockLength { index: 0, .. }));
    }
}
