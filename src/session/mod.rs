//! Scan sessions.
//!
//! A session runs from [`Scanner::start`] until it has exactly one
//! outcome: a confirmed payload, a cancellation or a timeout. Frames are
//! pushed through a [`FrameSink`] and decoded on a dedicated worker
//! thread; the outcome is delivered through a one-shot channel.
//!
//! ```text
//! camera → FrameSink (latest only) → worker: FrameIngestor → engine
//!                                                   ↓
//!                                       ScanOutcome (one-shot)
//! ```

mod pump;
mod sink;

pub use pump::{finish_pumped, pump_frames, PumpStop, PumpSummary};
pub use sink::FrameSink;

use crate::acceptance::{AcceptanceEngine, ConfirmedResult, SharedEngine};
use crate::capture::{LeasedFrame, ScannerConfig};
use crate::decoding::Decoder;
use crate::ingestion::{FrameIngestor, IngestOutcome, IngestSnapshot};
use crossbeam_channel::{bounded, select, Receiver, Sender};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Why a session ended without a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScanError {
    /// The session was cancelled before a payload was confirmed.
    #[error("scan cancelled")]
    Cancelled,
    /// No payload was confirmed before the deadline.
    #[error("scan timed out")]
    TimedOut,
}

/// The single outcome of a scan session.
pub type ScanOutcome = Result<ConfirmedResult, ScanError>;

/// Session counters across the scanner's lifetime.
#[derive(Debug, Default)]
pub struct SessionStats {
    started: AtomicU64,
    confirmed: AtomicU64,
    cancelled: AtomicU64,
    timed_out: AtomicU64,
}

/// Point-in-time copy of [`SessionStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Sessions started.
    pub started: u64,
    /// Sessions that confirmed a payload.
    pub confirmed: u64,
    /// Sessions cancelled, including dropped ones.
    pub cancelled: u64,
    /// Sessions that hit their deadline.
    pub timed_out: u64,
}

impl SessionStats {
    fn record(&self, outcome: &ScanOutcome) {
        let counter = match outcome {
            Ok(_) => &self.confirmed,
            Err(ScanError::Cancelled) => &self.cancelled,
            Err(ScanError::TimedOut) => &self.timed_out,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Copies the current counter values.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            started: self.started.load(Ordering::Relaxed),
            confirmed: self.confirmed.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
        }
    }
}

/// First-writer-wins decision of a session outcome.
#[derive(Clone)]
struct Settlement {
    decided: Arc<AtomicBool>,
    outcome: Sender<ScanOutcome>,
    stop: Sender<()>,
}

impl Settlement {
    /// Records `outcome` unless the session already has one.
    fn settle(&self, outcome: ScanOutcome) -> bool {
        if self
            .decided
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        // Only the winning writer reaches the (empty) slot
        let _ = self.outcome.try_send(outcome);
        let _ = self.stop.try_send(());
        true
    }

    fn is_decided(&self) -> bool {
        self.decided.load(Ordering::Acquire)
    }
}

/// Cancels a session from any thread, e.g. a signal handler.
#[derive(Clone)]
pub struct Canceller {
    settlement: Settlement,
}

impl Canceller {
    /// Cancels the session. Returns false if it had already ended.
    pub fn cancel(&self) -> bool {
        self.settlement.settle(Err(ScanError::Cancelled))
    }
}

impl std::fmt::Debug for Canceller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canceller")
            .field("decided", &self.settlement.is_decided())
            .finish()
    }
}

/// Runs scan sessions against one decoder and one acceptance engine.
///
/// Only one session should be active at a time: starting a session
/// reopens the shared engine.
pub struct Scanner {
    ingestor: FrameIngestor,
    stats: Arc<SessionStats>,
    next_id: AtomicU64,
}

impl Scanner {
    /// Creates a scanner with a fresh engine at the configured threshold.
    pub fn new(decoder: Arc<dyn Decoder>, config: &ScannerConfig) -> Self {
        Self::with_engine(
            decoder,
            AcceptanceEngine::new(config.required_confirmations),
        )
    }

    /// Creates a scanner around an existing engine.
    pub fn with_engine(decoder: Arc<dyn Decoder>, engine: AcceptanceEngine) -> Self {
        Self {
            ingestor: FrameIngestor::new(decoder, SharedEngine::new(engine)),
            stats: Arc::new(SessionStats::default()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Starts a new session with a freshly reopened engine.
    pub fn start(&self) -> ScanSession {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.ingestor.engine().reopen();
        self.stats.started.fetch_add(1, Ordering::Relaxed);

        let (frame_tx, frame_rx) = bounded::<LeasedFrame>(1);
        let (outcome_tx, outcome_rx) = bounded::<ScanOutcome>(1);
        let (stop_tx, stop_rx) = bounded::<()>(1);

        let settlement = Settlement {
            decided: Arc::new(AtomicBool::new(false)),
            outcome: outcome_tx,
            stop: stop_tx,
        };
        let sink = FrameSink::new(
            frame_tx,
            frame_rx.clone(),
            Arc::clone(&settlement.decided),
            self.ingestor.stats(),
        );

        let worker = {
            let ingestor = self.ingestor.clone();
            let settlement = settlement.clone();
            thread::spawn(move || run_worker(id, ingestor, frame_rx, stop_rx, settlement))
        };

        info!(session = id, "Scan session started");

        ScanSession {
            id,
            sink,
            settlement,
            outcome: outcome_rx,
            worker: Some(worker),
            stats: Arc::clone(&self.stats),
        }
    }

    /// Returns the shared acceptance engine.
    pub fn engine(&self) -> &SharedEngine {
        self.ingestor.engine()
    }

    /// Frame counters across all sessions.
    pub fn ingest_stats(&self) -> IngestSnapshot {
        self.ingestor.stats().snapshot()
    }

    /// Session outcome counters.
    pub fn session_stats(&self) -> SessionSnapshot {
        self.stats.snapshot()
    }
}

/// Decodes queued frames until the session settles.
fn run_worker(
    id: u64,
    ingestor: FrameIngestor,
    frames: Receiver<LeasedFrame>,
    stop: Receiver<()>,
    settlement: Settlement,
) {
    debug!(session = id, "Scan worker started");

    loop {
        let frame = select! {
            recv(frames) -> msg => msg.ok(),
            recv(stop) -> _ => None,
        };
        let Some(frame) = frame else { break };

        if settlement.is_decided() {
            frame.release();
            break;
        }

        if let IngestOutcome::Confirmed(result) = ingestor.ingest(frame) {
            if !settlement.settle(Ok(result)) {
                debug!(session = id, "Session already ended; confirmation dropped");
            }
            break;
        }
    }

    // Release anything still queued
    let drained = frames.try_iter().count();
    debug!(session = id, drained, "Scan worker stopped");
}

/// A running scan session.
pub struct ScanSession {
    id: u64,
    sink: FrameSink,
    settlement: Settlement,
    outcome: Receiver<ScanOutcome>,
    worker: Option<JoinHandle<()>>,
    stats: Arc<SessionStats>,
}

impl ScanSession {
    /// Session number, starting at 1 for each scanner.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns a producer handle for this session's frames.
    pub fn sink(&self) -> FrameSink {
        self.sink.clone()
    }

    /// Returns a handle that can cancel this session from another thread.
    pub fn canceller(&self) -> Canceller {
        Canceller {
            settlement: self.settlement.clone(),
        }
    }

    /// Returns true once the session has an outcome.
    pub fn is_finished(&self) -> bool {
        self.settlement.is_decided()
    }

    /// Blocks until the session has an outcome.
    pub fn wait(mut self) -> ScanOutcome {
        self.finish()
    }

    /// Blocks for at most `timeout`, then ends the session as timed out.
    ///
    /// A result confirmed concurrently with the deadline still wins.
    pub fn wait_timeout(mut self, timeout: Duration) -> ScanOutcome {
        match self.outcome.recv_timeout(timeout) {
            Ok(outcome) => self.complete(outcome),
            Err(_) => {
                self.settlement.settle(Err(ScanError::TimedOut));
                self.finish()
            }
        }
    }

    /// Cancels the session and returns its outcome, which is a confirmed
    /// result only if confirmation happened first.
    pub fn cancel(mut self) -> ScanOutcome {
        self.settlement.settle(Err(ScanError::Cancelled));
        self.finish()
    }

    fn finish(&mut self) -> ScanOutcome {
        // The session keeps its own sender alive, so recv only fails if
        // the outcome was already taken
        let outcome = self.outcome.recv().unwrap_or(Err(ScanError::Cancelled));
        self.complete(outcome)
    }

    fn complete(&mut self, outcome: ScanOutcome) -> ScanOutcome {
        self.join_worker();
        self.stats.record(&outcome);

        match &outcome {
            Ok(result) => info!(
                session = self.id,
                payload = %result.payload(),
                "Scan session confirmed"
            ),
            Err(reason) => info!(session = self.id, reason = %reason, "Scan session ended"),
        }
        outcome
    }

    fn join_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!(session = self.id, "Scan worker panicked");
            }
        }
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.settlement.settle(Err(ScanError::Cancelled));
            self.join_worker();
            // No outcome was taken yet, so the winning writer's outcome is queued
            let outcome = self.outcome.recv().unwrap_or(Err(ScanError::Cancelled));
            self.stats.record(&outcome);
        }
    }
}

impl std::fmt::Debug for ScanSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanSession")
            .field("id", &self.id)
            .field("finished", &self.is_finished())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{Camera, CaptureConfig, ImageSequenceCamera, MockCamera, ReleaseFrame};
    use crate::decoding::{testing::Modules, RqrrDecoder};
    use crate::ingestion::testing::{marked_frame, PixelDecoder, RecordingReleaser};
    use std::time::Instant;

    fn scanner(threshold: u32) -> Scanner {
        Scanner::with_engine(Arc::new(PixelDecoder), AcceptanceEngine::new(threshold))
    }

    fn lease(marker: u8, sequence: u64, releaser: &Arc<RecordingReleaser>) -> LeasedFrame {
        LeasedFrame::new(
            marked_frame(marker, sequence),
            Arc::clone(releaser) as Arc<dyn ReleaseFrame>,
        )
    }

    /// Pushes frames one at a time, waiting for each to leave the queue.
    fn feed(session: &ScanSession, frames: Vec<LeasedFrame>) {
        let sink = session.sink();
        for frame in frames {
            sink.push(frame);
            let start = Instant::now();
            while !sink.is_closed()
                && sink.queued() > 0
                && start.elapsed() < Duration::from_secs(5)
            {
                thread::sleep(Duration::from_millis(1));
            }
        }
    }

    #[test]
    fn test_session_confirms_payload() {
        let scanner = scanner(2);
        let releaser = Arc::new(RecordingReleaser::default());
        let session = scanner.start();

        feed(
            &session,
            vec![lease(4, 1, &releaser), lease(0, 2, &releaser), lease(4, 3, &releaser)],
        );

        let result = session.wait_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(result.payload(), "P4");
        assert_eq!(releaser.released(), vec![1, 2, 3]);

        let stats = scanner.session_stats();
        assert_eq!(stats.started, 1);
        assert_eq!(stats.confirmed, 1);
    }

    #[test]
    fn test_cancel_wins_over_later_frames() {
        let scanner = scanner(1);
        let releaser = Arc::new(RecordingReleaser::default());
        let session = scanner.start();
        let sink = session.sink();

        assert!(session.canceller().cancel());
        assert!(!sink.push(lease(9, 1, &releaser)));

        assert_eq!(session.wait(), Err(ScanError::Cancelled));
        assert_eq!(releaser.released(), vec![1]);
        assert_eq!(scanner.session_stats().cancelled, 1);
        assert_eq!(scanner.ingest_stats().observations, 0);
    }

    #[test]
    fn test_second_cancel_is_rejected() {
        let scanner = scanner(1);
        let session = scanner.start();
        let canceller = session.canceller();

        assert!(canceller.cancel());
        assert!(!canceller.cancel());
        assert_eq!(session.cancel(), Err(ScanError::Cancelled));
    }

    #[test]
    fn test_idle_session_times_out() {
        let scanner = scanner(1);
        let session = scanner.start();

        assert_eq!(
            session.wait_timeout(Duration::from_millis(20)),
            Err(ScanError::TimedOut)
        );
        assert_eq!(scanner.session_stats().timed_out, 1);
    }

    #[test]
    fn test_new_session_reopens_engine() {
        let scanner = scanner(1);

        let first = scanner.start();
        feed(&first, vec![LeasedFrame::unmanaged(marked_frame(1, 1))]);
        assert_eq!(first.wait().unwrap().payload(), "P1");
        assert!(!scanner.engine().is_accepting());

        let second = scanner.start();
        assert!(scanner.engine().is_accepting());
        feed(&second, vec![LeasedFrame::unmanaged(marked_frame(2, 1))]);
        assert_eq!(second.wait().unwrap().payload(), "P2");
    }

    #[test]
    fn test_dropped_session_counts_as_cancelled() {
        let scanner = scanner(1);
        drop(scanner.start());

        assert_eq!(scanner.session_stats().cancelled, 1);
    }

    #[test]
    fn test_dropped_session_counts_external_cancel() {
        let scanner = scanner(1);
        let session = scanner.start();

        assert!(session.canceller().cancel());
        drop(session);

        let stats = scanner.session_stats();
        assert_eq!(stats.cancelled, 1);
        assert_eq!(stats.confirmed, 0);
    }

    #[test]
    fn test_dropped_session_counts_unclaimed_confirmation() {
        let scanner = scanner(1);
        let session = scanner.start();

        feed(&session, vec![LeasedFrame::unmanaged(marked_frame(3, 1))]);
        let start = Instant::now();
        while !session.is_finished() && start.elapsed() < Duration::from_secs(5) {
            thread::sleep(Duration::from_millis(1));
        }
        drop(session);

        let stats = scanner.session_stats();
        assert_eq!(stats.confirmed, 1);
        assert_eq!(stats.cancelled, 0);
    }

    #[test]
    fn test_pumped_camera_frames_are_all_released() {
        let scanner = scanner(1);
        let mut camera = MockCamera::new();
        camera.open(&CaptureConfig::with_dimensions(16, 16)).unwrap();
        let tracker = camera.tracker();

        let session = scanner.start();
        let deadline = Instant::now() + Duration::from_secs(5);
        let summary = pump_frames(
            &mut camera,
            &session,
            Duration::from_millis(1),
            Some(deadline),
        )
        .unwrap();
        assert_eq!(summary.stop, PumpStop::Settled);

        let result = session.wait().unwrap();
        assert!(result.payload().starts_with('P'));
        assert_eq!(tracker.outstanding(), 0);
        assert_eq!(tracker.released(), tracker.leased());
    }

    #[test]
    fn test_image_files_scan_to_payload() {
        let path = std::env::temp_dir().join(format!(
            "qr-reader-{}-session.png",
            std::process::id()
        ));
        let upright = Modules::encode("https://example.com/ticket/42").render();
        image::imageops::rotate270(&upright).save(&path).unwrap();

        let capture = CaptureConfig::default();
        let mut camera = ImageSequenceCamera::new(vec![path.clone()])
            .with_rotation(90)
            .with_repeat(3);
        camera.open(&capture).unwrap();
        let tracker = camera.tracker();

        let scanner = Scanner::new(Arc::new(RqrrDecoder::new()), &ScannerConfig::default());
        let session = scanner.start();
        pump_frames(&mut camera, &session, Duration::from_millis(5), None).unwrap();

        let result = session.wait().unwrap();
        assert_eq!(result.payload(), "https://example.com/ticket/42");
        assert_eq!(tracker.outstanding(), 0);

        std::fs::remove_file(path).ok();
    }
}
