//! Reconstruction law: applying a diff of a candidate against a reference
//! always reproduces the candidate byte-for-byte.

use std::io::Cursor;

use engine::{apply_script, diff_to_script, DeltaOp};
use proptest::prelude::*;
use signature::{build_signature, SignatureIndex};

fn round_trip(reference: &[u8], candidate: &[u8], block_size: u32) -> Vec<u8> {
    let table = build_signature(reference, block_size).expect("signature");
    let index = SignatureIndex::from_table(table);
    let result = diff_to_script(candidate, &index).expect("diff");

    assert!(result.summary.hit_rate() >= 0.0);
    assert!(result.summary.hit_rate() <= 1.0);
    for pair in result.script.ops().windows(2) {
        assert!(!(pair[0].is_literal() && pair[1].is_literal()));
    }

    let mut out = Vec::new();
    apply_script(
        Cursor::new(reference.to_vec()),
        block_size,
        &result.script,
        &mut out,
    )
    .expect("apply");
    out
}

proptest! {
    #[test]
    fn apply_of_diff_reproduces_candidate(
        reference in proptest::collection::vec(any::<u8>(), 0..512),
        candidate in proptest::collection::vec(any::<u8>(), 0..512),
        block_size in 1u32..32,
    ) {
        prop_assert_eq!(round_trip(&reference, &candidate, block_size), candidate);
    }

    #[test]
    fn mutated_reference_still_round_trips(
        reference in proptest::collection::vec(any::<u8>(), 64..512),
        flip in 0usize..64,
        block_size in 1u32..32,
    ) {
        let mut candidate = reference.clone();
        let position = flip % candidate.len();
        candidate[position] ^= 0xff;
        candidate.insert(position, 0x5a);

        prop_assert_eq!(round_trip(&reference, &candidate, block_size), candidate);
    }
}

#[test]
fn low_entropy_inputs_round_trip() {
    // Repetitive data maximizes weak-checksum collisions between blocks.
    let reference = vec![0u8; 4096];
    let mut candidate = vec![0u8; 4096];
    candidate[1000] = 1;
    assert_eq!(round_trip(&reference, &candidate, 16), candidate);
}

#[test]
fn whole_candidate_matches_when_reference_equals_candidate() {
    let data: Vec<u8> = (0u32..5000).map(|value| (value % 257) as u8).collect();
    let table = build_signature(&data[..], 700).expect("signature");
    let index = SignatureIndex::from_table(table);
    let result = diff_to_script(&data[..], &index).expect("diff");

    assert_eq!(result.summary.hit_rate(), 1.0);
    assert!(result.script.ops().iter().all(|op| !op.is_literal()));
    assert!(matches!(
        result.script.ops().first(),
        Some(DeltaOp::Copy { block_index: 0, .. })
    ));
}
