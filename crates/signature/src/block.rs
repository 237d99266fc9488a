//! Individual block signature representation.

use checksums::strong::STRONG_LEN;

/// Describes a single block within a reference file's signature.
///
/// Blocks are contiguous and non-overlapping; every non-final block has the
/// table's full block size, and the final block may be shorter but is never
/// empty.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BlockSignature {
    index: u64,
    length: u32,
    weak: u32,
    strong: [u8; STRONG_LEN],
}

impl BlockSignature {
    /// Creates a block descriptor from raw components.
    #[must_use]
    pub const fn from_raw_parts(index: u64, length: u32, weak: u32, strong: [u8; STRONG_LEN]) -> Self {
        Self {
            index,
            length,
            weak,
            strong,
        }
    }

    /// Returns the zero-based index of the block within the reference file.
    #[inline]
    #[must_use]
    pub const fn index(&self) -> u64 {
        self.index
    }

    /// Returns the number of bytes covered by the block.
    #[inline]
    #[must_use]
    pub const fn length(&self) -> u32 {
        self.length
    }

    /// Returns the packed weak rolling checksum of the block.
    #[inline]
    #[must_use]
    pub const fn weak(&self) -> u32 {
        self.weak
    }

    /// Returns the strong checksum of the block.
    #[inline]
    #[must_use]
    pub const fn strong(&self) -> &[u8; STRONG_LEN] {
        &self.strong
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_raw_parts_round_trips_fields() {
        let strong = [7u8; STRONG_LEN];
        let block = BlockSignature::from_raw_parts(42, 2048, 0xdead_beef, strong);
        assert_eq!(block.index(), 42);
        assert_eq!(block.length(), 2048);
        assert_eq!(block.weak(), 0xdead_beef);
        assert_eq!(block.strong(), &strong);
    }
}
