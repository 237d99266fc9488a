#![deny(unsafe_code)]
#![deny(missing_docs)]

//! Upload throughput probing.
//!
//! Delta sync only pays off on slow links; when plain upload is already fast
//! the signature fetch and diff are wasted work. The [`Prober`] answers "how
//! fast can this process upload right now" from, in order: a process-wide
//! cached measurement, the collaborating server's last recorded value, or an
//! active measurement. Every answer is a heuristic - staleness and failure
//! are acceptable, and callers must treat a probe error as "no answer", never
//! as a transfer error.

mod parse;
mod probe;

pub use parse::{parse_rate, RateParseError};
pub use probe::{shared_cache, ProbeError, Prober, SpeedCache, SpeedEndpoint, UploadMeter};
