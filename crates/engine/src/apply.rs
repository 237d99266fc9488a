//! Patch application against a seekable reference stream.

use std::cmp::min;
use std::io::{self, Read, Seek, SeekFrom, Write};

use thiserror::Error;

use crate::script::{DeltaOp, DeltaScript};

/// Copy buffer size; large enough that block-sized copies rarely loop.
const COPY_BUFFER_LEN: usize = 32 * 1024;

/// Errors raised while applying a delta script.
#[derive(Debug, Error)]
pub enum ApplyError {
    /// The applier was configured with a zero block size.
    #[error("patch block size must be at least 1")]
    ZeroBlockSize,
    /// A copy operation references bytes beyond the reference file's extent.
    ///
    /// Always fatal: it indicates a protocol error or a reference-version
    /// mismatch between the two sides.
    #[error(
        "copy of {length} bytes from block {block_index} exceeds the {basis_len}-byte reference"
    )]
    CorruptScript {
        /// Block index named by the offending copy operation.
        block_index: u64,
        /// Length requested by the copy operation.
        length: u32,
        /// Total length of the reference stream.
        basis_len: u64,
    },
    /// Underlying I/O failure on the reference stream or output sink.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Reconstructs a target stream by resolving delta operations against a
/// seekable reference.
///
/// Copies are served with seek/read through a bounded buffer, so arbitrarily
/// large reference files are supported without loading them into memory.
pub struct PatchApplier<R, W> {
    basis: R,
    out: W,
    block_size: u64,
    basis_len: u64,
    position: Option<u64>,
    buffer: Vec<u8>,
}

impl<R: Read + Seek, W: Write> PatchApplier<R, W> {
    /// Creates an applier over `basis`, writing reconstructed bytes to `out`.
    ///
    /// # Errors
    ///
    /// Returns [`ApplyError::ZeroBlockSize`] for a zero block size and
    /// propagates I/O errors from determining the reference extent.
    pub fn new(mut basis: R, block_size: u32, out: W) -> Result<Self, ApplyError> {
        if block_size == 0 {
            return Err(ApplyError::ZeroBlockSize);
        }
        let basis_len = basis.seek(SeekFrom::End(0))?;
        Ok(Self {
            basis,
            out,
            block_size: u64::from(block_size),
            basis_len,
            position: None,
            buffer: vec![0u8; COPY_BUFFER_LEN],
        })
    }

    /// Resolves a copy operation by streaming `length` bytes from the
    /// reference at `block_index * block_size`.
    ///
    /// # Errors
    ///
    /// Returns [`ApplyError::CorruptScript`] when the copy range falls outside
    /// the reference extent.
    pub fn apply_copy(&mut self, block_index: u64, length: u32) -> Result<(), ApplyError> {
        let corrupt = || ApplyError::CorruptScript {
            block_index,
            length,
            basis_len: self.basis_len,
        };

        let offset = block_index.checked_mul(self.block_size).ok_or_else(corrupt)?;
        let end = offset.checked_add(u64::from(length)).ok_or_else(corrupt)?;
        if end > self.basis_len {
            return Err(corrupt());
        }

        if self.position != Some(offset) {
            self.basis.seek(SeekFrom::Start(offset))?;
        }

        let mut remaining = length as usize;
        while remaining > 0 {
            let chunk = min(remaining, self.buffer.len());
            self.basis.read_exact(&mut self.buffer[..chunk])?;
            self.out.write_all(&self.buffer[..chunk])?;
            remaining -= chunk;
        }
        self.position = Some(end);
        Ok(())
    }

    /// Writes a literal run straight to the output.
    pub fn apply_literal(&mut self, bytes: &[u8]) -> Result<(), ApplyError> {
        self.out.write_all(bytes)?;
        Ok(())
    }

    /// Resolves a single operation.
    pub fn apply_op(&mut self, op: &DeltaOp) -> Result<(), ApplyError> {
        match op {
            DeltaOp::Copy { block_index, len } => self.apply_copy(*block_index, *len),
            DeltaOp::Literal(bytes) => self.apply_literal(bytes),
        }
    }

    /// Flushes the output and returns it.
    pub fn finish(mut self) -> Result<W, ApplyError> {
        self.out.flush()?;
        Ok(self.out)
    }
}

/// Applies a complete in-memory script against `basis`, writing to `out`.
///
/// # Errors
///
/// Same failure modes as [`PatchApplier`]: corrupt copy ranges are fatal, I/O
/// failures propagate.
pub fn apply_script<R: Read + Seek, W: Write>(
    basis: R,
    block_size: u32,
    script: &DeltaScript,
    out: W,
) -> Result<(), ApplyError> {
    let mut applier = PatchApplier::new(basis, block_size, out)?;
    for op in script.ops() {
        applier.apply_op(op)?;
    }
    applier.finish()?;
    Ok(())
}
