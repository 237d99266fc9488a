//! Post-upload signature publication.
//!
//! After a version is stored, a signature for it is published so the next
//! upload can diff against it. This is pure preparation for the future:
//! failures are logged and swallowed, they never affect the finished
//! transfer.

use std::fs::File;
use std::io::BufReader;

use checksums::strong::{hex_digest, DigestReader};
use protocol::{write_signature, WireError};
use signature::{build_signature, SignatureError};
use thiserror::Error;
use tracing::debug;

use crate::config::TransferConfig;
use crate::remote::{RemoteError, RemoteStore};
use crate::request::UploadRequest;

#[derive(Debug, Error)]
pub(crate) enum PublishError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Signature(#[from] SignatureError),
    #[error(transparent)]
    Wire(#[from] WireError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

/// Builds and stores a signature for the just-uploaded version, unless one
/// is already there.
///
/// The whole-file MD5 is computed in the same pass that builds the
/// signature and accompanies the upload as an idempotency key.
pub(crate) fn ensure_published<R: RemoteStore + ?Sized>(
    remote: &R,
    request: &UploadRequest,
    config: &TransferConfig,
) -> Result<(), PublishError> {
    if remote.signature_exists(request.target())? {
        debug!(target = request.target(), "signature already stored");
        return Ok(());
    }

    let file = File::open(request.file())?;
    let mut reader = DigestReader::new(BufReader::new(file));
    let table = build_signature(&mut reader, config.block_size())?;
    let content_md5 = hex_digest(&reader.finalize());

    let mut encoded = Vec::new();
    write_signature(&mut encoded, &table)?;
    remote.publish_signature(request.target(), &encoded, &content_md5)?;
    debug!(
        target = request.target(),
        blocks = table.block_count(),
        "signature published"
    );
    Ok(())
}
