//! Per-transfer session state: cancellation, outcome reporting.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Cooperative cancellation flag shared between the transfer and its owner.
///
/// Cancellation is checked between phases and while waiting for the patch
/// completion event; an upload already handed to the remote is not torn down.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token in the not-cancelled state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Returns whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// How the file ultimately travelled.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Strategy {
    /// A delta stream was patched against the stored reference.
    Delta,
    /// The whole file was uploaded.
    Full,
}

/// Wall-clock time spent in each phase that actually ran.
#[derive(Clone, Copy, Debug, Default)]
pub struct PhaseTimings {
    /// Bandwidth probe, when a cap is configured and a probe is attached.
    pub probe: Option<Duration>,
    /// Fetching and decoding the remote signature.
    pub signature_fetch: Option<Duration>,
    /// Computing the delta.
    pub diff: Option<Duration>,
    /// Transmitting the patch or the full file.
    pub transfer: Option<Duration>,
    /// Publishing a fresh signature for the new version.
    pub publish: Option<Duration>,
}

/// Outcome of one completed transfer.
#[derive(Clone, Debug)]
pub struct TransferReport {
    strategy: Strategy,
    fell_back: bool,
    hit_rate: Option<f32>,
    timings: PhaseTimings,
    elapsed: Duration,
}

impl TransferReport {
    pub(crate) fn new(
        strategy: Strategy,
        fell_back: bool,
        hit_rate: Option<f32>,
        timings: PhaseTimings,
        elapsed: Duration,
    ) -> Self {
        Self {
            strategy,
            fell_back,
            hit_rate,
            timings,
            elapsed,
        }
    }

    /// How the file travelled.
    #[must_use]
    pub const fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Whether a full upload happened because the delta path was attempted
    /// and abandoned. `false` when the delta path was skipped deliberately,
    /// for example by the bandwidth cap.
    #[must_use]
    pub const fn fell_back(&self) -> bool {
        self.fell_back
    }

    /// Fraction of candidate bytes the diff found reusable, when a diff ran.
    #[must_use]
    pub const fn hit_rate(&self) -> Option<f32> {
        self.hit_rate
    }

    /// Per-phase wall-clock timings.
    #[must_use]
    pub const fn timings(&self) -> &PhaseTimings {
        &self.timings
    }

    /// Total wall-clock time for the transfer.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());

        token.cancel();
        assert!(clone.is_cancelled());
    }
}
