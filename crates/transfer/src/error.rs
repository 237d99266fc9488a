//! Transfer-level errors.

use std::io;

use thiserror::Error;

use crate::remote::{PatchWaitError, RemoteError};

/// Fatal transfer failures.
///
/// Everything recoverable is absorbed by the fallback logic before it
/// reaches this type; an error here means the file was not stored.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The local file could not be read for the full upload.
    #[error("cannot read candidate file: {0}")]
    Candidate(#[source] io::Error),
    /// The committed delta stream could not be transmitted.
    #[error("patch transmission failed: {0}")]
    PatchTransport(#[source] RemoteError),
    /// The remote did not confirm the patch.
    #[error("delta patch failed: {0}")]
    Patch(#[source] PatchWaitError),
    /// The full upload failed.
    #[error("full upload failed: {0}")]
    Upload(#[source] RemoteError),
    /// Cancellation was requested before the transfer committed.
    #[error("transfer cancelled")]
    Cancelled,
}
