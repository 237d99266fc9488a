//! Delta stream format.
//!
//! Layout, all integers little-endian:
//!
//! ```text
//! magic       4 bytes  "BDL1"
//! block_size  u32
//! ops:
//!     0x00  copy     block_index u64, len u32
//!     0x01  literal  len u32, then len raw bytes
//!     0xff  end of stream
//! ```
//!
//! The tag byte makes the two operation shapes unambiguous; the explicit end
//! marker lets the remote side distinguish a complete stream from a
//! truncated one.

use std::io::{self, Read, Seek, Write};

use engine::{ApplyError, DeltaOp, DeltaSink, PatchApplier};
use thiserror::Error;

use super::{read_magic, read_u32, read_u64, write_u32, write_u64, WireError};

/// Magic bytes opening a delta stream.
pub const DELTA_MAGIC: [u8; 4] = *b"BDL1";

const TAG_COPY: u8 = 0x00;
const TAG_LITERAL: u8 = 0x01;
const TAG_END: u8 = 0xff;

/// Errors raised while applying a framed delta stream.
#[derive(Debug, Error)]
pub enum PatchStreamError {
    /// The stream itself was malformed.
    #[error(transparent)]
    Wire(#[from] WireError),
    /// The decoded operations could not be applied to the reference.
    #[error(transparent)]
    Apply(#[from] ApplyError),
}

/// [`DeltaSink`] that frames operations onto a writer as the diff produces
/// them, so the full script never has to sit in memory.
///
/// [`finish`](Self::finish) writes the end marker; dropping the sink without
/// finishing leaves a stream the remote will reject as truncated.
pub struct WireDeltaSink<W: Write> {
    inner: W,
}

impl<W: Write> WireDeltaSink<W> {
    /// Opens a delta stream on `inner`, writing the header immediately.
    pub fn new(mut inner: W, block_size: u32) -> io::Result<Self> {
        inner.write_all(&DELTA_MAGIC)?;
        write_u32(&mut inner, block_size)?;
        Ok(Self { inner })
    }

    /// Terminates the stream with the end marker and returns the writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.inner.write_all(&[TAG_END])?;
        self.inner.flush()?;
        Ok(self.inner)
    }
}

impl<W: Write> DeltaSink for WireDeltaSink<W> {
    fn copy(&mut self, block_index: u64, len: u32) -> io::Result<()> {
        self.inner.write_all(&[TAG_COPY])?;
        write_u64(&mut self.inner, block_index)?;
        write_u32(&mut self.inner, len)
    }

    fn literal(&mut self, bytes: &[u8]) -> io::Result<()> {
        // A literal run longer than u32::MAX does not fit one frame; split
        // it. Only the delta computer's in-memory script promises coalesced
        // literals, the wire may carry several frames back to back.
        for chunk in bytes.chunks(u32::MAX as usize) {
            self.inner.write_all(&[TAG_LITERAL])?;
            write_u32(&mut self.inner, chunk.len() as u32)?;
            self.inner.write_all(chunk)?;
        }
        Ok(())
    }
}

/// Streaming decoder for framed delta operations.
pub struct DeltaReader<R: Read> {
    inner: R,
    block_size: u32,
    done: bool,
}

impl<R: Read> DeltaReader<R> {
    /// Opens a delta stream, reading and validating the header.
    pub fn new(mut inner: R) -> Result<Self, WireError> {
        read_magic(&mut inner, DELTA_MAGIC)?;
        let block_size = read_u32(&mut inner)?;
        if block_size == 0 {
            return Err(WireError::ZeroBlockSize);
        }
        Ok(Self {
            inner,
            block_size,
            done: false,
        })
    }

    /// Returns the block size the delta was computed with.
    #[must_use]
    pub const fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Decodes the next operation, or `None` once the end marker was seen.
    ///
    /// # Errors
    ///
    /// Rejects unknown tags and truncated literals; a stream that ends
    /// before the end marker surfaces as an I/O error.
    pub fn next_op(&mut self) -> Result<Option<DeltaOp>, WireError> {
        if self.done {
            return Ok(None);
        }

        let mut tag = [0u8; 1];
        self.inner.read_exact(&mut tag)?;
        match tag[0] {
            TAG_COPY => {
                let block_index = read_u64(&mut self.inner)?;
                let len = read_u32(&mut self.inner)?;
                Ok(Some(DeltaOp::Copy { block_index, len }))
            }
            TAG_LITERAL => {
                let len = read_u32(&mut self.inner)?;
                let mut bytes = Vec::new();
                let got = (&mut self.inner)
                    .take(u64::from(len))
                    .read_to_end(&mut bytes)?;
                if got as u64 != u64::from(len) {
                    return Err(WireError::TruncatedLiteral {
                        expected: len,
                        got: got as u64,
                    });
                }
                Ok(Some(DeltaOp::Literal(bytes)))
            }
            TAG_END => {
                self.done = true;
                Ok(None)
            }
            other => Err(WireError::UnknownTag(other)),
        }
    }
}

/// Applies a framed delta stream directly against a seekable reference,
/// decoding op-by-op so the script is never buffered.
///
/// # Errors
///
/// Surfaces malformed streams as [`PatchStreamError::Wire`] and invalid copy
/// ranges as [`PatchStreamError::Apply`] (a corrupt script is fatal).
pub fn apply_delta_stream<D: Read, B: Read + Seek, W: Write>(
    delta: D,
    basis: B,
    out: W,
) -> Result<(), PatchStreamError> {
    let mut reader = DeltaReader::new(delta)?;
    let mut applier = PatchApplier::new(basis, reader.block_size(), out)?;
    while let Some(op) = reader.next_op()? {
        applier.apply_op(&op)?;
    }
    applier.finish()?;
    Ok(())
}
