//! Remote repository collaborators.
//!
//! [`RemoteStore`] is the seam between the transfer state machine and the
//! actual repository transport; tests substitute in-memory fakes, production
//! code wraps the repository client. Patch application on the remote side is
//! asynchronous, so [`send_patch`](RemoteStore::send_patch) hands back a
//! [`PatchEvents`] handle the caller blocks on.

use std::io::{self, Read};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use thiserror::Error;

use crate::request::UploadRequest;
use crate::session::CancelToken;

/// How often the completion wait wakes up to check for cancellation.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Errors raised by remote operations.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The remote rejected or could not serve the request.
    #[error("remote unavailable: {0}")]
    Unavailable(String),
    /// The remote did not answer in time.
    #[error("remote operation timed out")]
    TimedOut,
    /// Transport-level failure.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Terminal outcome of a patch the remote is applying.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PatchEvent {
    /// The remote applied the patch and committed the new version.
    Completed,
    /// The remote reported a failure; the message is its diagnostic.
    Error(String),
}

/// Errors from waiting on a patch completion event.
#[derive(Debug, Error)]
pub enum PatchWaitError {
    /// The remote reported a patch failure.
    #[error("patch rejected by remote: {0}")]
    Remote(String),
    /// No terminal event arrived within the wait budget.
    #[error("patch completion timed out after {0:?}")]
    TimedOut(Duration),
    /// The event source went away before a terminal event.
    #[error("patch event stream closed before completion")]
    Disconnected,
    /// Cancellation was requested while waiting.
    #[error("transfer cancelled")]
    Cancelled,
}

/// One-shot handle resolving to the remote's patch outcome.
///
/// The remote side sends exactly one terminal event; anything else (silence,
/// a dropped connection) is a failure, never a silent success.
pub struct PatchEvents {
    receiver: Receiver<PatchEvent>,
}

impl PatchEvents {
    /// Wraps an existing receiver.
    #[must_use]
    pub fn new(receiver: Receiver<PatchEvent>) -> Self {
        Self { receiver }
    }

    /// Creates a connected sender/handle pair.
    #[must_use]
    pub fn channel() -> (Sender<PatchEvent>, Self) {
        let (sender, receiver) = bounded(1);
        (sender, Self::new(receiver))
    }

    /// Blocks until a terminal event arrives, the timeout elapses, or
    /// cancellation is requested.
    ///
    /// The wait wakes periodically so a cancellation does not have to ride
    /// out the full timeout.
    ///
    /// # Errors
    ///
    /// See [`PatchWaitError`]; only [`PatchEvent::Completed`] yields `Ok`.
    pub fn wait(&self, timeout: Duration, cancel: &CancelToken) -> Result<(), PatchWaitError> {
        let deadline = Instant::now() + timeout;
        loop {
            if cancel.is_cancelled() {
                return Err(PatchWaitError::Cancelled);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(PatchWaitError::TimedOut(timeout));
            }
            match self.receiver.recv_timeout(remaining.min(CANCEL_POLL_INTERVAL)) {
                Ok(PatchEvent::Completed) => return Ok(()),
                Ok(PatchEvent::Error(message)) => return Err(PatchWaitError::Remote(message)),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(PatchWaitError::Disconnected)
                }
            }
        }
    }
}

/// Operations the transfer needs from the remote repository.
///
/// All readers are consumed fully by the implementation before it returns.
pub trait RemoteStore {
    /// Fetches the encoded signature stream for a stored version, or `None`
    /// when the remote has no signature for it.
    ///
    /// # Errors
    ///
    /// Remote failures here are advisory; callers fall back to full upload.
    fn fetch_signature(&self, reference: &str) -> Result<Option<Box<dyn Read + '_>>, RemoteError>;

    /// Returns whether a signature is already stored for `target`.
    ///
    /// # Errors
    ///
    /// Propagates remote failures.
    fn signature_exists(&self, target: &str) -> Result<bool, RemoteError>;

    /// Stores an encoded signature for `target`. `content_md5` is the hex
    /// digest of the file the signature describes, used by the remote as an
    /// idempotency key.
    ///
    /// # Errors
    ///
    /// Propagates remote failures.
    fn publish_signature(
        &self,
        target: &str,
        encoded: &[u8],
        content_md5: &str,
    ) -> Result<(), RemoteError>;

    /// Transmits a delta stream for the remote to apply against
    /// `request.reference()`, producing `request.target()`.
    ///
    /// Returns once the bytes are handed off; the actual patch outcome
    /// arrives through the returned [`PatchEvents`].
    ///
    /// # Errors
    ///
    /// Transmission failures are fatal for the transfer; by the time this is
    /// called the delta path is committed.
    fn send_patch(
        &self,
        request: &UploadRequest,
        delta: &mut dyn Read,
    ) -> Result<PatchEvents, RemoteError>;

    /// Uploads the whole file, creating `request.target()`.
    ///
    /// # Errors
    ///
    /// Propagates remote failures; there is nothing left to fall back to.
    fn upload_full(&self, request: &UploadRequest, file: &mut dyn Read) -> Result<(), RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_event_resolves_ok() {
        let (sender, events) = PatchEvents::channel();
        sender.send(PatchEvent::Completed).unwrap();

        let cancel = CancelToken::new();
        events.wait(Duration::from_secs(1), &cancel).unwrap();
    }

    #[test]
    fn error_event_carries_the_remote_message() {
        let (sender, events) = PatchEvents::channel();
        sender
            .send(PatchEvent::Error("block out of range".into()))
            .unwrap();

        let cancel = CancelToken::new();
        let error = events.wait(Duration::from_secs(1), &cancel).unwrap_err();
        assert!(matches!(error, PatchWaitError::Remote(m) if m == "block out of range"));
    }

    #[test]
    fn silence_times_out() {
        let (_sender, events) = PatchEvents::channel();
        let cancel = CancelToken::new();
        let error = events.wait(Duration::from_millis(20), &cancel).unwrap_err();
        assert!(matches!(error, PatchWaitError::TimedOut(_)));
    }

    #[test]
    fn dropped_sender_is_a_failure_not_a_success() {
        let (sender, events) = PatchEvents::channel();
        drop(sender);

        let cancel = CancelToken::new();
        let error = events.wait(Duration::from_secs(1), &cancel).unwrap_err();
        assert!(matches!(error, PatchWaitError::Disconnected));
    }

    #[test]
    fn cancellation_interrupts_the_wait() {
        let (_sender, events) = PatchEvents::channel();
        let cancel = CancelToken::new();
        cancel.cancel();

        let error = events.wait(Duration::from_secs(5), &cancel).unwrap_err();
        assert!(matches!(error, PatchWaitError::Cancelled));
    }

    #[test]
    fn event_sent_from_another_thread_is_observed() {
        let (sender, events) = PatchEvents::channel();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            sender.send(PatchEvent::Completed).unwrap();
        });

        let cancel = CancelToken::new();
        events.wait(Duration::from_secs(5), &cancel).unwrap();
        handle.join().unwrap();
    }
}
