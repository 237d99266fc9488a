//! Delta operations, scripts, and diff accounting.

use std::io;

/// Edit operation describing how to reconstruct a slice of the candidate file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DeltaOp {
    /// Reuse a block from the reference file identified by its index.
    Copy {
        /// Zero-based index of the reference block being reused.
        block_index: u64,
        /// Number of bytes covered by the referenced block.
        len: u32,
    },
    /// Literal byte payload that has no counterpart in the reference file.
    Literal(Vec<u8>),
}

impl DeltaOp {
    /// Returns the number of output bytes contributed by this operation.
    #[must_use]
    pub fn byte_len(&self) -> u64 {
        match self {
            DeltaOp::Copy { len, .. } => u64::from(*len),
            DeltaOp::Literal(bytes) => bytes.len() as u64,
        }
    }

    /// Returns `true` when the operation is a literal payload.
    #[must_use]
    pub const fn is_literal(&self) -> bool {
        matches!(self, DeltaOp::Literal(_))
    }
}

/// Ordered sequence of [`DeltaOp`] values whose concatenated output equals
/// the candidate file.
///
/// Literal runs are coalesced: the delta computer never emits two adjacent
/// `Literal` operations.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DeltaScript {
    ops: Vec<DeltaOp>,
}

impl DeltaScript {
    /// Creates a script from an operation list.
    #[must_use]
    pub fn new(ops: Vec<DeltaOp>) -> Self {
        Self { ops }
    }

    /// Returns the operations in order.
    #[must_use]
    pub fn ops(&self) -> &[DeltaOp] {
        &self.ops
    }

    /// Consumes the script and returns its operation list.
    #[must_use]
    pub fn into_ops(self) -> Vec<DeltaOp> {
        self.ops
    }

    /// Returns `true` when the script contains no operations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Byte accounting produced by a diff pass.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DiffSummary {
    matched_bytes: u64,
    total_bytes: u64,
}

impl DiffSummary {
    pub(crate) fn record_copy(&mut self, len: u32) {
        self.matched_bytes += u64::from(len);
        self.total_bytes += u64::from(len);
    }

    pub(crate) fn record_literal(&mut self, len: usize) {
        self.total_bytes += len as u64;
    }

    /// Returns the number of candidate bytes covered by copy operations.
    #[inline]
    #[must_use]
    pub const fn matched_bytes(&self) -> u64 {
        self.matched_bytes
    }

    /// Returns the candidate stream length in bytes.
    #[inline]
    #[must_use]
    pub const fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Returns the fraction of candidate bytes reconstructable from the
    /// reference file, `0.0` for an empty candidate.
    #[must_use]
    pub fn hit_rate(&self) -> f32 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        self.matched_bytes as f32 / self.total_bytes as f32
    }
}

/// Result of an in-memory diff: the script plus its accounting.
#[derive(Clone, Debug)]
pub struct DiffResult {
    /// Ordered edit script reconstructing the candidate.
    pub script: DeltaScript,
    /// Matched/total byte counts and hit rate.
    pub summary: DiffSummary,
}

/// Receives delta operations as the diff scan produces them.
///
/// Streaming into a sink keeps the scan from buffering the whole script in
/// memory; sinks typically frame operations straight onto the wire or into a
/// spool file.
pub trait DeltaSink {
    /// Receives a copy operation referencing a block of the reference file.
    fn copy(&mut self, block_index: u64, len: u32) -> io::Result<()>;

    /// Receives a coalesced literal run.
    fn literal(&mut self, bytes: &[u8]) -> io::Result<()>;
}

/// Sink that collects operations into an in-memory [`DeltaScript`].
#[derive(Debug, Default)]
pub struct ScriptSink {
    ops: Vec<DeltaOp>,
}

impl ScriptSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes the sink and returns the collected script.
    #[must_use]
    pub fn into_script(self) -> DeltaScript {
        DeltaScript::new(self.ops)
    }
}

impl DeltaSink for ScriptSink {
    fn copy(&mut self, block_index: u64, len: u32) -> io::Result<()> {
        self.ops.push(DeltaOp::Copy { block_index, len });
        Ok(())
    }

    fn literal(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.ops.push(DeltaOp::Literal(bytes.to_vec()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn op_byte_lengths() {
        let copy = DeltaOp::Copy {
            block_index: 3,
            len: 2048,
        };
        assert_eq!(copy.byte_len(), 2048);
        assert!(!copy.is_literal());

        let literal = DeltaOp::Literal(b"abc".to_vec());
        assert_eq!(literal.byte_len(), 3);
        assert!(literal.is_literal());
    }

    #[test]
    fn hit_rate_is_zero_for_empty_candidate() {
        let summary = DiffSummary::default();
        assert_eq!(summary.hit_rate(), 0.0);
    }

    #[test]
    fn hit_rate_reflects_matched_fraction() {
        let mut summary = DiffSummary::default();
        summary.record_copy(8);
        summary.record_literal(1);
        assert_eq!(summary.matched_bytes(), 8);
        assert_eq!(summary.total_bytes(), 9);
        assert!((summary.hit_rate() - 8.0 / 9.0).abs() < 1e-6);
    }
}
