//! Transfer tuning knobs.

use std::time::Duration;

use bandwidth::{parse_rate, RateParseError};

/// Default block size used when building and publishing signatures, in bytes.
pub const DEFAULT_BLOCK_SIZE: u32 = 2048;

/// Default minimum fraction of candidate bytes that must be reusable for the
/// delta path to be worth taking.
pub const DEFAULT_REUSE_THRESHOLD: f32 = 0.2;

/// Default time to wait for the remote's patch completion event.
pub const DEFAULT_PATCH_TIMEOUT: Duration = Duration::from_secs(120);

const BYTES_PER_MIB: u64 = 1024 * 1024;

/// Tuning parameters for one [`Uploader`](crate::Uploader).
///
/// The block size here governs the signatures this side publishes; diffs
/// always use the block size carried by the remote signature, whatever it is.
#[derive(Clone, Debug)]
pub struct TransferConfig {
    reuse_threshold: f32,
    block_size: u32,
    max_bandwidth_mib: Option<u32>,
    patch_timeout: Duration,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            reuse_threshold: DEFAULT_REUSE_THRESHOLD,
            block_size: DEFAULT_BLOCK_SIZE,
            max_bandwidth_mib: None,
            patch_timeout: DEFAULT_PATCH_TIMEOUT,
        }
    }
}

impl TransferConfig {
    /// Creates a config with the defaults above.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the minimum reusable-byte fraction for the delta path.
    ///
    /// A diff whose hit rate is greater than or equal to this value commits
    /// to delta transfer; anything below falls back to a full upload.
    #[must_use]
    pub fn with_reuse_threshold(mut self, threshold: f32) -> Self {
        self.reuse_threshold = threshold;
        self
    }

    /// Sets the block size for published signatures.
    #[must_use]
    pub fn with_block_size(mut self, block_size: u32) -> Self {
        self.block_size = block_size;
        self
    }

    /// Sets the upload speed, in whole MiB/s, above which delta sync is
    /// skipped entirely.
    #[must_use]
    pub fn with_max_bandwidth_mib(mut self, mib_per_sec: u32) -> Self {
        self.max_bandwidth_mib = Some(mib_per_sec);
        self
    }

    /// Sets the bandwidth cap from a human-readable rate such as `"8M"`.
    ///
    /// The rate is rounded down to whole MiB/s; see
    /// [`with_max_bandwidth_mib`](Self::with_max_bandwidth_mib).
    ///
    /// # Errors
    ///
    /// Returns the parse error for malformed rate strings.
    pub fn with_max_bandwidth_rate(self, rate: &str) -> Result<Self, RateParseError> {
        let bytes_per_sec = parse_rate(rate)?;
        let mib = u32::try_from(bytes_per_sec / BYTES_PER_MIB).unwrap_or(u32::MAX);
        Ok(self.with_max_bandwidth_mib(mib))
    }

    /// Sets how long to wait for the patch completion event.
    #[must_use]
    pub fn with_patch_timeout(mut self, timeout: Duration) -> Self {
        self.patch_timeout = timeout;
        self
    }

    /// Minimum reusable-byte fraction for the delta path.
    #[must_use]
    pub const fn reuse_threshold(&self) -> f32 {
        self.reuse_threshold
    }

    /// Block size used for published signatures.
    #[must_use]
    pub const fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Upload speed cap above which delta sync is skipped, if configured.
    #[must_use]
    pub const fn max_bandwidth_mib(&self) -> Option<u32> {
        self.max_bandwidth_mib
    }

    /// Patch completion wait budget.
    #[must_use]
    pub const fn patch_timeout(&self) -> Duration {
        self.patch_timeout
    }
}
