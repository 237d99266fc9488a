//! Strong block checksum (MD5).
//!
//! A weak rolling-checksum hit is only a candidate; the 16-byte MD5 digest
//! confirms the match before any block is reused. MD5 is not used here for
//! cryptographic integrity, only for collision resistance far beyond what the
//! weak checksum provides.

use std::io::{self, Read};

use md5::{Digest, Md5};

/// Width of the strong checksum in bytes.
pub const STRONG_LEN: usize = 16;

/// Computes the strong digest of a single block.
#[must_use]
pub fn strong_digest(block: &[u8]) -> [u8; STRONG_LEN] {
    let mut hasher = Md5::new();
    hasher.update(block);
    hasher.finalize().into()
}

/// Renders a digest as lowercase hex, the form used as an idempotency key
/// when publishing signatures.
#[must_use]
pub fn hex_digest(digest: &[u8; STRONG_LEN]) -> String {
    let mut out = String::with_capacity(STRONG_LEN * 2);
    for byte in digest {
        use std::fmt::Write as _;
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Reader adapter that feeds every byte it yields into an MD5 hasher.
///
/// Lets callers compute a whole-file digest as a side effect of another
/// sequential pass (for example while building a signature), instead of
/// reading the file twice.
pub struct DigestReader<R> {
    inner: R,
    hasher: Md5,
}

impl<R: Read> DigestReader<R> {
    /// Wraps `inner`, hashing all bytes subsequently read through it.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            hasher: Md5::new(),
        }
    }

    /// Finishes hashing and returns the digest of everything read so far.
    #[must_use]
    pub fn finalize(self) -> [u8; STRONG_LEN] {
        self.hasher.finalize().into()
    }
}

impl<R: Read> Read for DigestReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.inner.read(buf)?;
        self.hasher.update(&buf[..read]);
        Ok(read)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 1321 test vector.
    #[test]
    fn digest_matches_reference_vector() {
        let digest = strong_digest(b"abc");
        assert_eq!(hex_digest(&digest), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn empty_block_digest() {
        let digest = strong_digest(b"");
        assert_eq!(hex_digest(&digest), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn digest_reader_matches_one_shot_digest() {
        let data = b"the quick brown fox jumps over the lazy dog";
        let mut reader = DigestReader::new(&data[..]);
        let mut sink = Vec::new();
        std::io::copy(&mut reader, &mut sink).unwrap();

        assert_eq!(sink, data);
        assert_eq!(reader.finalize(), strong_digest(data));
    }

    #[test]
    fn digest_reader_observes_partial_reads() {
        let data = vec![0xa5u8; 10_000];
        let mut reader = DigestReader::new(&data[..]);
        let mut buf = [0u8; 37];
        loop {
            let n = reader.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
        }
        assert_eq!(reader.finalize(), strong_digest(&data));
    }
}
