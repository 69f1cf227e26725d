//! Keep-only-latest frame delivery.

use crate::capture::LeasedFrame;
use crate::ingestion::IngestStats;
use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Producer end of a session's single-slot frame queue.
///
/// A frame pushed while an older one is still queued replaces it; the
/// superseded frame is released at once. Frames pushed after the session
/// has settled are released without being queued.
#[derive(Clone)]
pub struct FrameSink {
    tx: Sender<LeasedFrame>,
    rx: Receiver<LeasedFrame>,
    settled: Arc<AtomicBool>,
    stats: Arc<IngestStats>,
}

impl FrameSink {
    pub(crate) fn new(
        tx: Sender<LeasedFrame>,
        rx: Receiver<LeasedFrame>,
        settled: Arc<AtomicBool>,
        stats: Arc<IngestStats>,
    ) -> Self {
        Self {
            tx,
            rx,
            settled,
            stats,
        }
    }

    /// Queues `frame` for decoding. Returns false if the session no longer
    /// takes frames, in which case the frame has already been released.
    pub fn push(&self, frame: LeasedFrame) -> bool {
        if self.is_closed() {
            return false;
        }

        let mut frame = frame;
        loop {
            match self.tx.try_send(frame) {
                Ok(()) => break,
                Err(TrySendError::Full(returned)) => {
                    if let Ok(stale) = self.rx.try_recv() {
                        tracing::trace!(sequence = stale.sequence(), "Queued frame superseded");
                        self.stats.record_superseded();
                        stale.release();
                    }
                    frame = returned;
                }
                Err(TrySendError::Disconnected(_)) => return false,
            }
        }

        // The worker may have settled and drained between the check and the send
        if self.is_closed() {
            self.rx.try_iter().for_each(LeasedFrame::release);
            return false;
        }
        true
    }

    /// Returns true once the session has an outcome.
    pub fn is_closed(&self) -> bool {
        self.settled.load(Ordering::Acquire)
    }

    /// Number of frames waiting to be decoded (0 or 1).
    pub fn queued(&self) -> usize {
        self.tx.len()
    }
}

impl std::fmt::Debug for FrameSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSink")
            .field("queued", &self.queued())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{Frame, ReleaseFrame};
    use crate::ingestion::testing::RecordingReleaser;
    use crossbeam_channel::bounded;

    fn sink() -> (FrameSink, Receiver<LeasedFrame>, Arc<AtomicBool>, Arc<IngestStats>) {
        let (tx, rx) = bounded(1);
        let settled = Arc::new(AtomicBool::new(false));
        let stats = Arc::new(IngestStats::default());
        let sink = FrameSink::new(tx, rx.clone(), Arc::clone(&settled), Arc::clone(&stats));
        (sink, rx, settled, stats)
    }

    fn lease(sequence: u64, releaser: &Arc<RecordingReleaser>) -> LeasedFrame {
        LeasedFrame::new(
            Frame::new(vec![1u8; 4], 2, 2, sequence),
            Arc::clone(releaser) as Arc<dyn ReleaseFrame>,
        )
    }

    #[test]
    fn test_newest_frame_replaces_queued_one() {
        let (sink, rx, _, stats) = sink();
        let releaser = Arc::new(RecordingReleaser::default());

        assert!(sink.push(lease(1, &releaser)));
        assert!(sink.push(lease(2, &releaser)));
        assert!(sink.push(lease(3, &releaser)));

        assert_eq!(releaser.released(), vec![1, 2]);
        assert_eq!(stats.snapshot().frames_superseded, 2);
        assert_eq!(rx.try_recv().unwrap().sequence(), 3);
        assert_eq!(releaser.released(), vec![1, 2, 3]);
    }

    #[test]
    fn test_closed_sink_releases_immediately() {
        let (sink, rx, settled, _) = sink();
        let releaser = Arc::new(RecordingReleaser::default());
        settled.store(true, Ordering::Release);

        assert!(!sink.push(lease(1, &releaser)));
        assert_eq!(releaser.released(), vec![1]);
        assert!(rx.is_empty());
    }
}
