#![deny(unsafe_code)]
#![deny(missing_docs)]

//! Transfer orchestration: decide, per upload, whether delta sync is
//! worthwhile, execute it, and fall back safely.
//!
//! The [`Uploader`] drives one file through the transfer state machine:
//! probe bandwidth, fetch the remote signature, diff, decide delta-vs-full,
//! transmit, and finally publish a fresh signature for the stored version.
//! Everything before the transmission commits is an optimization: any
//! failure there silently degrades to a full upload. Once patch bytes are in
//! flight there is no downgrade path; errors surface to the caller.

mod config;
mod error;
mod publish;
mod remote;
mod request;
mod session;
mod upload;

pub use config::TransferConfig;
pub use error::TransferError;
pub use remote::{PatchEvent, PatchEvents, PatchWaitError, RemoteError, RemoteStore};
pub use request::UploadRequest;
pub use session::{CancelToken, PhaseTimings, Strategy, TransferReport};
pub use upload::{BandwidthProbe, Uploader};
