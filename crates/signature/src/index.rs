//! Weak-checksum lookup index derived from a signature table.

use checksums::strong::strong_digest;
use rustc_hash::FxHashMap;

use crate::block::BlockSignature;
use crate::table::SignatureTable;

/// Read-only multimap from weak checksum to the blocks sharing that value.
///
/// Built once per [`SignatureTable`] and never mutated. Collisions on the
/// weak checksum are expected at a low rate; candidates for a given weak
/// value are kept in ascending block order so that match resolution is
/// deterministic.
#[derive(Clone, Debug)]
pub struct SignatureIndex {
    block_size: u32,
    blocks: Vec<BlockSignature>,
    by_weak: FxHashMap<u32, Vec<u32>>,
}

impl SignatureIndex {
    /// Builds the index by consuming a signature table.
    #[must_use]
    pub fn from_table(table: SignatureTable) -> Self {
        let block_size = table.block_size();
        let blocks = table.into_blocks();

        let mut by_weak: FxHashMap<u32, Vec<u32>> = FxHashMap::default();
        for (position, block) in blocks.iter().enumerate() {
            by_weak
                .entry(block.weak())
                .or_default()
                .push(position as u32);
        }

        Self {
            block_size,
            blocks,
            by_weak,
        }
    }

    /// Returns the block size of the underlying table.
    #[inline]
    #[must_use]
    pub const fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Returns the number of indexed blocks.
    #[inline]
    #[must_use]
    pub fn block_count(&self) -> u64 {
        self.blocks.len() as u64
    }

    /// Reports whether the index holds no blocks at all.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Returns the block stored at `position`.
    ///
    /// # Panics
    ///
    /// Panics if `position` is out of range; positions come from
    /// [`find_match`](Self::find_match) and are always valid.
    #[inline]
    #[must_use]
    pub fn block(&self, position: usize) -> &BlockSignature {
        &self.blocks[position]
    }

    /// Returns candidate block positions for a weak checksum, in ascending
    /// block order.
    #[must_use]
    pub fn candidates(&self, weak: u32) -> &[u32] {
        self.by_weak.get(&weak).map_or(&[], Vec::as_slice)
    }

    /// Finds the first block whose weak and strong checksums both match
    /// `window`.
    ///
    /// The strong digest of the window is computed lazily, only when at least
    /// one same-length candidate shares the weak value; this is the expensive
    /// path and stays rare in practice. Ties are broken by ascending block
    /// index.
    #[must_use]
    pub fn find_match(&self, weak: u32, window: &[u8]) -> Option<usize> {
        let candidates = self.by_weak.get(&weak)?;

        let mut window_strong: Option<[u8; 16]> = None;
        for &position in candidates {
            let block = &self.blocks[position as usize];
            if block.length() as usize != window.len() {
                continue;
            }

            let strong = window_strong.get_or_insert_with(|| strong_digest(window));
            if block.strong() == strong {
                return Some(position as usize);
            }
        }
        None
    }
}
