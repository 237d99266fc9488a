//! The transfer state machine.
//!
//! One [`Uploader::upload`] call walks a file through:
//!
//! 1. bandwidth probe (only when a cap is configured): a link faster than
//!    the cap uploads directly, signatures and diffing are skipped;
//! 2. signature fetch and diff: any failure here, including a missing
//!    signature, falls back to a full upload;
//! 3. the threshold decision: a hit rate at or above the configured
//!    threshold commits to the delta path, below it falls back;
//! 4. transmission: full uploads and committed patches that fail are fatal,
//!    a failed patch is never retried as a full upload;
//! 5. signature publication for the new version, best-effort.

use std::fs::File;
use std::io::{BufReader, BufWriter, Seek, SeekFrom};
use std::time::Instant;

use bandwidth::{Prober, SpeedEndpoint, UploadMeter};
use engine::{diff, DiffSummary};
use protocol::{read_signature, WireDeltaSink};
use signature::{SignatureIndex, SignatureTable};
use tracing::{debug, info, warn};

use crate::config::TransferConfig;
use crate::error::TransferError;
use crate::publish;
use crate::remote::{PatchWaitError, RemoteStore};
use crate::request::UploadRequest;
use crate::session::{CancelToken, PhaseTimings, Strategy, TransferReport};

/// Answers "how fast can this process upload right now", in whole MiB/s.
///
/// `None` means no answer; the transfer then proceeds as if no cap were
/// configured. A [`bandwidth::Prober`] satisfies this directly.
pub trait BandwidthProbe {
    /// Current upload speed estimate, if one can be obtained.
    fn current_mib_per_sec(&self) -> Option<u32>;
}

impl<E: SpeedEndpoint, M: UploadMeter> BandwidthProbe for Prober<'_, E, M> {
    fn current_mib_per_sec(&self) -> Option<u32> {
        match self.probe() {
            Ok(mib_per_sec) => Some(mib_per_sec),
            Err(error) => {
                debug!(%error, "bandwidth probe failed");
                None
            }
        }
    }
}

/// A delta stream spooled to disk, ready to transmit.
struct PreparedDelta {
    spool: File,
    summary: DiffSummary,
}

/// Frames the delta onto the spool as the diff produces it, so the script
/// never sits in memory.
fn spool_delta(file: File, spool: &File, index: &SignatureIndex) -> std::io::Result<DiffSummary> {
    let mut sink = WireDeltaSink::new(BufWriter::new(spool), index.block_size())?;
    let summary = diff(BufReader::new(file), index, &mut sink)?;
    sink.finish()?;
    Ok(summary)
}

enum DeltaDecision {
    Commit(PreparedDelta),
    Fallback { hit_rate: Option<f32> },
}

/// Drives single-file transfers against one remote store.
pub struct Uploader<'a, R: RemoteStore> {
    remote: &'a R,
    config: TransferConfig,
    probe: Option<&'a dyn BandwidthProbe>,
}

impl<'a, R: RemoteStore> Uploader<'a, R> {
    /// Creates an uploader with no bandwidth probe attached.
    pub fn new(remote: &'a R, config: TransferConfig) -> Self {
        Self {
            remote,
            config,
            probe: None,
        }
    }

    /// Attaches a bandwidth probe, enabling the cap short-circuit when the
    /// config carries a cap.
    #[must_use]
    pub fn with_probe(mut self, probe: &'a dyn BandwidthProbe) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Transfers one file, never cancelling.
    ///
    /// # Errors
    ///
    /// See [`TransferError`]; recoverable problems fall back to a full
    /// upload internally and do not surface here.
    pub fn upload(&self, request: &UploadRequest) -> Result<TransferReport, TransferError> {
        self.upload_with_cancel(request, &CancelToken::new())
    }

    /// Transfers one file, checking `cancel` between phases and while
    /// waiting for the patch outcome.
    ///
    /// # Errors
    ///
    /// See [`TransferError`].
    pub fn upload_with_cancel(
        &self,
        request: &UploadRequest,
        cancel: &CancelToken,
    ) -> Result<TransferReport, TransferError> {
        let started = Instant::now();
        let mut timings = PhaseTimings::default();

        if cancel.is_cancelled() {
            return Err(TransferError::Cancelled);
        }

        if self.link_exceeds_cap(&mut timings) {
            info!(
                target_version = request.target(),
                "link faster than cap, uploading directly"
            );
            self.full_upload(request, &mut timings)?;
            return Ok(self.finish(request, Strategy::Full, false, None, timings, started));
        }

        match self.prepare_delta(request, &mut timings, cancel)? {
            DeltaDecision::Commit(prepared) => {
                let hit_rate = prepared.summary.hit_rate();
                self.send_delta(request, prepared, &mut timings, cancel)?;
                Ok(self.finish(
                    request,
                    Strategy::Delta,
                    false,
                    Some(hit_rate),
                    timings,
                    started,
                ))
            }
            DeltaDecision::Fallback { hit_rate } => {
                if cancel.is_cancelled() {
                    return Err(TransferError::Cancelled);
                }
                self.full_upload(request, &mut timings)?;
                Ok(self.finish(request, Strategy::Full, true, hit_rate, timings, started))
            }
        }
    }

    fn link_exceeds_cap(&self, timings: &mut PhaseTimings) -> bool {
        let (Some(cap), Some(probe)) = (self.config.max_bandwidth_mib(), self.probe) else {
            return false;
        };

        let probe_started = Instant::now();
        let speed = probe.current_mib_per_sec();
        timings.probe = Some(probe_started.elapsed());

        match speed {
            Some(speed) if speed > cap => {
                info!(speed, cap, "upload link exceeds bandwidth cap");
                true
            }
            Some(speed) => {
                debug!(speed, cap, "upload link within bandwidth cap");
                false
            }
            None => {
                debug!("no bandwidth answer, attempting delta");
                false
            }
        }
    }

    /// Everything before the commit point. The only error that can escape
    /// is cancellation; all other failures degrade to `Fallback`.
    fn prepare_delta(
        &self,
        request: &UploadRequest,
        timings: &mut PhaseTimings,
        cancel: &CancelToken,
    ) -> Result<DeltaDecision, TransferError> {
        let fetch_started = Instant::now();
        let table = self.fetch_reference_table(request);
        timings.signature_fetch = Some(fetch_started.elapsed());
        let Some(table) = table else {
            return Ok(DeltaDecision::Fallback { hit_rate: None });
        };

        if cancel.is_cancelled() {
            return Err(TransferError::Cancelled);
        }

        let index = SignatureIndex::from_table(table);
        let diff_started = Instant::now();
        let prepared = self.compute_delta(request, &index);
        timings.diff = Some(diff_started.elapsed());
        let Some(prepared) = prepared else {
            return Ok(DeltaDecision::Fallback { hit_rate: None });
        };

        let hit_rate = prepared.summary.hit_rate();
        if hit_rate < self.config.reuse_threshold() {
            info!(
                hit_rate = f64::from(hit_rate),
                threshold = f64::from(self.config.reuse_threshold()),
                "block reuse below threshold, uploading fully"
            );
            return Ok(DeltaDecision::Fallback {
                hit_rate: Some(hit_rate),
            });
        }

        Ok(DeltaDecision::Commit(prepared))
    }

    fn fetch_reference_table(&self, request: &UploadRequest) -> Option<SignatureTable> {
        match self.remote.fetch_signature(request.reference()) {
            Ok(Some(mut stream)) => match read_signature(&mut stream) {
                Ok(table) => Some(table),
                Err(error) => {
                    warn!(
                        %error,
                        reference = request.reference(),
                        "stored signature is undecodable"
                    );
                    None
                }
            },
            Ok(None) => {
                info!(
                    reference = request.reference(),
                    "no signature stored for reference"
                );
                None
            }
            Err(error) => {
                warn!(%error, reference = request.reference(), "signature fetch failed");
                None
            }
        }
    }

    fn compute_delta(
        &self,
        request: &UploadRequest,
        index: &SignatureIndex,
    ) -> Option<PreparedDelta> {
        let file = match File::open(request.file()) {
            Ok(file) => file,
            Err(error) => {
                warn!(%error, "cannot open candidate file for diffing");
                return None;
            }
        };
        let mut spool = match tempfile::tempfile() {
            Ok(spool) => spool,
            Err(error) => {
                warn!(%error, "cannot create delta spool");
                return None;
            }
        };

        let summary = match spool_delta(file, &spool, index) {
            Ok(summary) => summary,
            Err(error) => {
                warn!(%error, "delta computation failed");
                return None;
            }
        };

        if let Err(error) = spool.seek(SeekFrom::Start(0)) {
            warn!(%error, "cannot rewind delta spool");
            return None;
        }
        Some(PreparedDelta { spool, summary })
    }

    /// Transmits a committed delta. From here on failure is fatal; the
    /// remote may already be applying the patch, so retrying as a full
    /// upload could race the patched version.
    fn send_delta(
        &self,
        request: &UploadRequest,
        prepared: PreparedDelta,
        timings: &mut PhaseTimings,
        cancel: &CancelToken,
    ) -> Result<(), TransferError> {
        info!(
            target_version = request.target(),
            hit_rate = f64::from(prepared.summary.hit_rate()),
            "sending delta patch"
        );

        let transfer_started = Instant::now();
        let mut spool = prepared.spool;
        let events = self
            .remote
            .send_patch(request, &mut spool)
            .map_err(TransferError::PatchTransport)?;
        let outcome = events.wait(self.config.patch_timeout(), cancel);
        timings.transfer = Some(transfer_started.elapsed());

        match outcome {
            Ok(()) => Ok(()),
            Err(PatchWaitError::Cancelled) => Err(TransferError::Cancelled),
            Err(error) => Err(TransferError::Patch(error)),
        }
    }

    fn full_upload(
        &self,
        request: &UploadRequest,
        timings: &mut PhaseTimings,
    ) -> Result<(), TransferError> {
        let transfer_started = Instant::now();
        let file = File::open(request.file()).map_err(TransferError::Candidate)?;
        let mut reader = BufReader::new(file);
        self.remote
            .upload_full(request, &mut reader)
            .map_err(TransferError::Upload)?;
        timings.transfer = Some(transfer_started.elapsed());
        Ok(())
    }

    fn finish(
        &self,
        request: &UploadRequest,
        strategy: Strategy,
        fell_back: bool,
        hit_rate: Option<f32>,
        mut timings: PhaseTimings,
        started: Instant,
    ) -> TransferReport {
        let publish_started = Instant::now();
        if let Err(error) = publish::ensure_published(self.remote, request, &self.config) {
            debug!(
                %error,
                target_version = request.target(),
                "signature publication skipped"
            );
        }
        timings.publish = Some(publish_started.elapsed());

        let report = TransferReport::new(strategy, fell_back, hit_rate, timings, started.elapsed());
        info!(
            target_version = request.target(),
            strategy = ?report.strategy(),
            fell_back = report.fell_back(),
            elapsed_ms = report.elapsed().as_millis() as u64,
            "transfer complete"
        );
        report
    }
}
