//! Rolling-window delta computation.

use std::collections::VecDeque;
use std::io::{self, Read};

use checksums::RollingChecksum;
use signature::SignatureIndex;

use crate::script::{DeltaSink, DiffResult, DiffSummary, ScriptSink};

/// Read buffer size for the candidate stream.
const BUFFER_LEN: usize = 128 * 1024;

/// Computes a delta script for `reader` against `index`, streaming operations
/// into `sink`.
///
/// The scan keeps a window of the index's block size over the candidate
/// stream. The weak checksum is recomputed incrementally in O(1) per one-byte
/// slide; the strong checksum is only computed when a weak hit occurs. On a
/// verified match the pending literal run is flushed as a single coalesced
/// operation, a copy is emitted, and the window resynchronizes past the
/// matched block. At end of stream the remaining short window gets one chance
/// to match a same-length block (the reference file's final block) before the
/// tail is flushed as a literal.
///
/// A zero-length candidate produces no operations; a non-empty candidate
/// against an empty index produces exactly one literal covering the input.
///
/// # Errors
///
/// Propagates I/O failures from the candidate stream or the sink; no partial
/// summary is returned.
pub fn diff<R: Read, S: DeltaSink>(
    mut reader: R,
    index: &SignatureIndex,
    sink: &mut S,
) -> io::Result<DiffSummary> {
    let block_size = index.block_size() as usize;
    let mut window: VecDeque<u8> = VecDeque::with_capacity(block_size);
    let mut pending_literals: Vec<u8> = Vec::with_capacity(block_size);
    let mut scratch: Vec<u8> = Vec::with_capacity(block_size);
    let mut rolling = RollingChecksum::new();
    let mut outgoing: Option<u8> = None;
    let mut summary = DiffSummary::default();

    let mut buffer = vec![0u8; BUFFER_LEN.max(block_size)];
    let mut buffer_pos = 0usize;
    let mut buffer_len = 0usize;

    loop {
        if buffer_pos == buffer_len {
            buffer_len = read_some(&mut reader, &mut buffer)?;
            buffer_pos = 0;
            if buffer_len == 0 {
                break;
            }
        }

        let byte = buffer[buffer_pos];
        buffer_pos += 1;

        window.push_back(byte);
        if let Some(outgoing_byte) = outgoing.take() {
            rolling
                .roll(outgoing_byte, byte)
                .map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error))?;
        } else {
            rolling.update(&[byte]);
        }

        if window.len() < block_size {
            continue;
        }

        // Materializing the window is only worth it once the weak checksum
        // hits; the common path stays a pure O(1) slide.
        let weak = rolling.value();
        let matched = if index.candidates(weak).is_empty() {
            None
        } else {
            fill_scratch(&window, &mut scratch);
            index.find_match(weak, &scratch)
        };

        if let Some(position) = matched {
            let block = index.block(position);
            flush_literals(&mut pending_literals, sink, &mut summary)?;
            sink.copy(block.index(), block.length())?;
            summary.record_copy(block.length());

            window.clear();
            rolling.reset();
            outgoing = None;
            continue;
        }

        if let Some(front) = window.pop_front() {
            pending_literals.push(front);
            outgoing = Some(front);
        }
    }

    // One attempt at matching the remaining tail against the reference
    // file's short final block. The incremental state can be stale here
    // (it still covers a popped byte), so the tail checksum is recomputed.
    if !window.is_empty() {
        fill_scratch(&window, &mut scratch);
        let tail_weak = RollingChecksum::from_block(&scratch).value();
        if let Some(position) = index.find_match(tail_weak, &scratch) {
            let block = index.block(position);
            flush_literals(&mut pending_literals, sink, &mut summary)?;
            sink.copy(block.index(), block.length())?;
            summary.record_copy(block.length());
        } else {
            pending_literals.extend(window.iter());
        }
    }

    flush_literals(&mut pending_literals, sink, &mut summary)?;
    Ok(summary)
}

/// Convenience wrapper that collects the script in memory.
pub fn diff_to_script<R: Read>(reader: R, index: &SignatureIndex) -> io::Result<DiffResult> {
    let mut sink = ScriptSink::new();
    let summary = diff(reader, index, &mut sink)?;
    Ok(DiffResult {
        script: sink.into_script(),
        summary,
    })
}

fn read_some<R: Read>(reader: &mut R, buffer: &mut [u8]) -> io::Result<usize> {
    loop {
        match reader.read(buffer) {
            Ok(n) => return Ok(n),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
}

fn fill_scratch(window: &VecDeque<u8>, scratch: &mut Vec<u8>) {
    let (front, back) = window.as_slices();
    scratch.clear();
    scratch.extend_from_slice(front);
    scratch.extend_from_slice(back);
}

fn flush_literals<S: DeltaSink>(
    pending: &mut Vec<u8>,
    sink: &mut S,
    summary: &mut DiffSummary,
) -> io::Result<()> {
    if pending.is_empty() {
        return Ok(());
    }
    sink.literal(pending)?;
    summary.record_literal(pending.len());
    pending.clear();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::DeltaOp;
    use signature::{build_signature, SignatureIndex};

    fn index_of(reference: &[u8], block_size: u32) -> SignatureIndex {
        let table = build_signature(reference, block_size).expect("signature");
        SignatureIndex::from_table(table)
    }

    fn assert_no_adjacent_literals(ops: &[DeltaOp]) {
        for pair in ops.windows(2) {
            assert!(
                !(pair[0].is_literal() && pair[1].is_literal()),
                "adjacent literals in {pair:?}"
            );
        }
    }

    #[test]
    fn identical_files_are_pure_copies() {
        let data = b"AAAABBBBCCCCDDDD";
        let index = index_of(data, 4);

        let result = diff_to_script(&data[..], &index).expect("diff");
        let ops = result.script.ops();
        assert_eq!(ops.len(), 4);
        for (position, op) in ops.iter().enumerate() {
            assert_eq!(
                op,
                &DeltaOp::Copy {
                    block_index: position as u64,
                    len: 4
                }
            );
        }
        assert_eq!(result.summary.hit_rate(), 1.0);
    }

    #[test]
    fn fully_changed_file_is_one_literal() {
        let index = index_of(b"AAAA", 4);
        let result = diff_to_script(&b"ZZZZ"[..], &index).expect("diff");

        assert_eq!(result.script.ops(), &[DeltaOp::Literal(b"ZZZZ".to_vec())]);
        assert_eq!(result.summary.hit_rate(), 0.0);
    }

    #[test]
    fn single_byte_insertion_keeps_both_blocks() {
        let index = index_of(b"AAAABBBB", 4);
        let result = diff_to_script(&b"XAAAABBBB"[..], &index).expect("diff");

        assert_eq!(
            result.script.ops(),
            &[
                DeltaOp::Literal(b"X".to_vec()),
                DeltaOp::Copy {
                    block_index: 0,
                    len: 4
                },
                DeltaOp::Copy {
                    block_index: 1,
                    len: 4
                },
            ]
        );
        assert_eq!(result.summary.matched_bytes(), 8);
        assert_eq!(result.summary.total_bytes(), 9);
        assert!((result.summary.hit_rate() - 8.0 / 9.0).abs() < 1e-6);
    }

    #[test]
    fn empty_candidate_yields_empty_script() {
        let index = index_of(b"AAAABBBB", 4);
        let result = diff_to_script(&b""[..], &index).expect("diff");

        assert!(result.script.is_empty());
        assert_eq!(result.summary.total_bytes(), 0);
        assert_eq!(result.summary.hit_rate(), 0.0);
    }

    #[test]
    fn empty_index_turns_candidate_into_single_literal() {
        let index = index_of(b"", 4);
        let data = b"some fresh content, larger than one block";
        let result = diff_to_script(&data[..], &index).expect("diff");

        assert_eq!(result.script.ops(), &[DeltaOp::Literal(data.to_vec())]);
        assert_eq!(result.summary.hit_rate(), 0.0);
    }

    #[test]
    fn short_final_block_matches_at_end_of_stream() {
        let data = b"AAAABBBBCC";
        let index = index_of(data, 4);

        let result = diff_to_script(&data[..], &index).expect("diff");
        assert_eq!(
            result.script.ops().last(),
            Some(&DeltaOp::Copy {
                block_index: 2,
                len: 2
            })
        );
        assert_eq!(result.summary.hit_rate(), 1.0);
    }

    #[test]
    fn literals_are_always_coalesced() {
        let reference = b"0123456789abcdef";
        let index = index_of(reference, 4);
        // Interleave matching blocks with runs of junk of varying lengths.
        let mut candidate = Vec::new();
        candidate.extend_from_slice(b"zz");
        candidate.extend_from_slice(b"0123");
        candidate.extend_from_slice(b"y");
        candidate.extend_from_slice(b"89ab");
        candidate.extend_from_slice(b"xxxxxxxxx");

        let result = diff_to_script(&candidate[..], &index).expect("diff");
        assert_no_adjacent_literals(result.script.ops());

        let reconstructed: u64 = result.script.ops().iter().map(DeltaOp::byte_len).sum();
        assert_eq!(reconstructed, candidate.len() as u64);
    }

    #[test]
    fn candidate_io_failure_propagates() {
        struct FailingReader;
        impl Read for FailingReader {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "candidate gone"))
            }
        }

        let index = index_of(b"AAAABBBB", 4);
        let error = diff_to_script(FailingReader, &index).expect_err("io failure");
        assert_eq!(error.kind(), io::ErrorKind::BrokenPipe);
    }
}
