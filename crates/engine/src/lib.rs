#![deny(unsafe_code)]
#![deny(missing_docs)]

//! Delta computation and patch application.
//!
//! [`diff`] scans a candidate byte stream against a [`signature::SignatureIndex`]
//! using the classic rolling-window matching scheme and streams copy/literal
//! operations into a caller-supplied [`DeltaSink`]. [`PatchApplier`] performs
//! the inverse: it resolves those operations against a seekable reference
//! stream to reconstruct the candidate byte-for-byte.

mod apply;
mod diff;
mod script;

pub use apply::{apply_script, ApplyError, PatchApplier};
pub use diff::{diff, diff_to_script};
pub use script::{DeltaOp, DeltaScript, DeltaSink, DiffResult, DiffSummary, ScriptSink};
