//! Adler-style weak rolling checksum.
//!
//! The checksum keeps two 16-bit accumulators: `s1` sums the bytes in the
//! window and `s2` sums the prefix sums. Both survive a one-byte window slide
//! in constant time via [`RollingChecksum::roll`], so the delta scanner never
//! recomputes the window checksum from scratch.

use thiserror::Error;

/// Errors raised by invalid rolling-checksum window operations.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum RollingError {
    /// [`RollingChecksum::roll`] was called before any bytes were observed.
    #[error("cannot roll an empty checksum window")]
    EmptyWindow,
    /// The window grew beyond what the rolling update can represent.
    #[error("checksum window of {len} bytes exceeds the supported maximum")]
    WindowTooLarge {
        /// Number of bytes currently in the window.
        len: usize,
    },
}

/// Weak rolling checksum over a sliding byte window.
///
/// The packed [`value`](Self::value) is `(s2 << 16) | s1` with both halves
/// truncated to 16 bits, which keeps the checksum cheap to compare and to use
/// as a hash-map key.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RollingChecksum {
    s1: u32,
    s2: u32,
    len: usize,
}

impl RollingChecksum {
    /// Creates a new rolling checksum with zeroed state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            s1: 0,
            s2: 0,
            len: 0,
        }
    }

    /// Computes the checksum of `block` in one shot.
    #[must_use]
    pub fn from_block(block: &[u8]) -> Self {
        let mut checksum = Self::new();
        checksum.update(block);
        checksum
    }

    /// Resets the checksum back to its initial state.
    pub fn reset(&mut self) {
        self.s1 = 0;
        self.s2 = 0;
        self.len = 0;
    }

    /// Returns the number of bytes that contributed to the current state.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no bytes have been observed yet.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Updates the checksum with an additional slice of bytes.
    #[inline]
    pub fn update(&mut self, chunk: &[u8]) {
        let mut s1 = self.s1;
        let mut s2 = self.s2;

        let mut iter = chunk.chunks_exact(4);
        for block in &mut iter {
            s1 = s1.wrapping_add(u32::from(block[0]));
            s2 = s2.wrapping_add(s1);

            s1 = s1.wrapping_add(u32::from(block[1]));
            s2 = s2.wrapping_add(s1);

            s1 = s1.wrapping_add(u32::from(block[2]));
            s2 = s2.wrapping_add(s1);

            s1 = s1.wrapping_add(u32::from(block[3]));
            s2 = s2.wrapping_add(s1);
        }

        for &byte in iter.remainder() {
            s1 = s1.wrapping_add(u32::from(byte));
            s2 = s2.wrapping_add(s1);
        }

        self.s1 = s1 & 0xffff;
        self.s2 = s2 & 0xffff;
        self.len = self.len.saturating_add(chunk.len());
    }

    /// Rolls the checksum by removing one byte and adding another.
    ///
    /// The window size remains constant after rolling. This is the O(1)
    /// per-byte slide the delta scanner relies on.
    ///
    /// # Errors
    ///
    /// Returns [`RollingError::EmptyWindow`] if no bytes have been processed.
    #[inline]
    pub fn roll(&mut self, outgoing: u8, incoming: u8) -> Result<(), RollingError> {
        let window_len = self.window_len_u32()?;

        let out = u32::from(outgoing);
        let inn = u32::from(incoming);

        let new_s1 = self.s1.wrapping_sub(out).wrapping_add(inn) & 0xffff;
        let new_s2 = self
            .s2
            .wrapping_sub(window_len.wrapping_mul(out))
            .wrapping_add(new_s1)
            & 0xffff;

        self.s1 = new_s1;
        self.s2 = new_s2;
        Ok(())
    }

    /// Returns the packed 32-bit checksum value: `(s2 << 16) | s1`.
    #[inline]
    #[must_use]
    pub const fn value(&self) -> u32 {
        (self.s2 << 16) | self.s1
    }

    #[inline]
    fn window_len_u32(&self) -> Result<u32, RollingError> {
        if self.len == 0 {
            return Err(RollingError::EmptyWindow);
        }
        u32::try_from(self.len).map_err(|_| RollingError::WindowTooLarge { len: self.len })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn new_checksum_is_empty() {
        let checksum = RollingChecksum::new();
        assert!(checksum.is_empty());
        assert_eq!(checksum.len(), 0);
        assert_eq!(checksum.value(), 0);
    }

    #[test]
    fn update_matches_incremental_updates() {
        let mut split = RollingChecksum::new();
        split.update(b"Hello, ");
        split.update(b"world!");

        let whole = RollingChecksum::from_block(b"Hello, world!");
        assert_eq!(split.value(), whole.value());
        assert_eq!(split.len(), whole.len());
    }

    #[test]
    fn roll_matches_fresh_computation() {
        let data = b"ABCDE";

        let mut rolling = RollingChecksum::from_block(&data[0..3]);
        rolling.roll(data[0], data[3]).unwrap();

        let fresh = RollingChecksum::from_block(&data[1..4]);
        assert_eq!(rolling.value(), fresh.value());
    }

    #[test]
    fn roll_on_empty_window_is_rejected() {
        let mut checksum = RollingChecksum::new();
        assert_eq!(
            checksum.roll(b'a', b'b'),
            Err(RollingError::EmptyWindow)
        );
    }

    #[test]
    fn distinct_blocks_usually_disagree() {
        let a = RollingChecksum::from_block(b"block-a");
        let b = RollingChecksum::from_block(b"block-b");
        assert_ne!(a.value(), b.value());
    }

    proptest! {
        #[test]
        fn rolling_across_whole_buffer_matches_direct(
            data in proptest::collection::vec(any::<u8>(), 2..256),
            window in 1usize..16,
        ) {
            let window = window.min(data.len() - 1);
            let mut rolling = RollingChecksum::from_block(&data[..window]);

            for start in 1..=(data.len() - window) {
                rolling.roll(data[start - 1], data[start + window - 1]).unwrap();
                let fresh = RollingChecksum::from_block(&data[start..start + window]);
                prop_assert_eq!(rolling.value(), fresh.value());
            }
        }
    }
}
