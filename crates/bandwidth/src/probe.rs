//! Upload speed probing with a process-wide cache.

use std::sync::{OnceLock, PoisonError, RwLock};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;

/// Default lifetime of a cached measurement.
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

const BYTES_PER_MIB: u64 = 1024 * 1024;

/// Errors raised by probe collaborators. Always treated as "no answer".
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The speed endpoint could not be reached or answered unusably.
    #[error("speed endpoint unavailable: {0}")]
    Endpoint(String),
    /// An active throughput measurement failed.
    #[error("throughput measurement failed: {0}")]
    Measurement(String),
}

/// Server-side record of previously observed upload speeds.
///
/// Both operations are best-effort; the server may have no record and may
/// reject reports.
pub trait SpeedEndpoint {
    /// Returns the last upload speed the server recorded for this client,
    /// in whole MiB/s, if any.
    fn last_reported(&self) -> Result<Option<u32>, ProbeError>;

    /// Reports a freshly measured upload speed, in whole MiB/s.
    fn report(&self, mib_per_sec: u32) -> Result<(), ProbeError>;
}

/// Active upload throughput measurement.
pub trait UploadMeter {
    /// Measures achievable upload throughput in bytes per second.
    fn measure(&self) -> Result<u64, ProbeError>;
}

#[derive(Clone, Copy, Debug)]
struct CachedSpeed {
    mib_per_sec: u32,
    measured_at: Instant,
}

/// Read-mostly cache of the most recent speed answer.
///
/// The process-wide instance from [`shared_cache`] is the only cross-session
/// shared state in the whole engine; staleness is acceptable because the
/// value is a heuristic, not a correctness input.
#[derive(Debug, Default)]
pub struct SpeedCache {
    inner: RwLock<Option<CachedSpeed>>,
}

impl SpeedCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, ttl: Duration) -> Option<u32> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        guard
            .filter(|cached| cached.measured_at.elapsed() <= ttl)
            .map(|cached| cached.mib_per_sec)
    }

    fn put(&self, mib_per_sec: u32) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(CachedSpeed {
            mib_per_sec,
            measured_at: Instant::now(),
        });
    }
}

/// Returns the process-wide speed cache.
#[must_use]
pub fn shared_cache() -> &'static SpeedCache {
    static CACHE: OnceLock<SpeedCache> = OnceLock::new();
    CACHE.get_or_init(SpeedCache::new)
}

/// Resolves the current upload speed for go/no-go decisions.
pub struct Prober<'a, E, M> {
    endpoint: E,
    meter: M,
    cache: &'a SpeedCache,
    cache_ttl: Duration,
}

impl<'a, E: SpeedEndpoint, M: UploadMeter> Prober<'a, E, M> {
    /// Creates a prober backed by the process-wide cache.
    pub fn new(endpoint: E, meter: M) -> Prober<'static, E, M> {
        Prober {
            endpoint,
            meter,
            cache: shared_cache(),
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }

    /// Creates a prober with an explicit cache (used by tests to avoid the
    /// shared one).
    pub fn with_cache(endpoint: E, meter: M, cache: &'a SpeedCache) -> Self {
        Self {
            endpoint,
            meter,
            cache,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }

    /// Overrides how long cached measurements stay fresh.
    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Returns the achievable upload speed in whole MiB/s.
    ///
    /// Resolution order: fresh cached value, the endpoint's last recorded
    /// value, then an active measurement whose result is reported back and
    /// cached. Endpoint failures only disable their own step; a measurement
    /// failure is the sole fatal path.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Measurement`] when no cached or recorded value
    /// exists and the active measurement fails. Callers treat this as "no
    /// answer" and proceed without a bandwidth short-circuit.
    pub fn probe(&self) -> Result<u32, ProbeError> {
        if let Some(cached) = self.cache.get(self.cache_ttl) {
            debug!(mib_per_sec = cached, "using cached upload speed");
            return Ok(cached);
        }

        match self.endpoint.last_reported() {
            Ok(Some(recorded)) => {
                debug!(mib_per_sec = recorded, "using server-recorded upload speed");
                self.cache.put(recorded);
                return Ok(recorded);
            }
            Ok(None) => {}
            Err(error) => debug!(%error, "speed endpoint lookup failed"),
        }

        let bytes_per_sec = self.meter.measure()?;
        let mib_per_sec = u32::try_from(bytes_per_sec / BYTES_PER_MIB).unwrap_or(u32::MAX);
        debug!(mib_per_sec, "measured upload speed");

        if let Err(error) = self.endpoint.report(mib_per_sec) {
            debug!(%error, "failed to report measured speed");
        }
        self.cache.put(mib_per_sec);
        Ok(mib_per_sec)
    }
}
