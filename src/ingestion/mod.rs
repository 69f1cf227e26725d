//! Frame ingestion.
//!
//! Bridges the frame producer to the acceptance engine: each leased frame
//! is decoded, its buffer is returned to the producer, and any payload is
//! offered to the engine. Decode failures are logged and never stop
//! ingestion.

mod stats;

pub use stats::{IngestSnapshot, IngestStats};

use crate::acceptance::{ConfirmedResult, SharedEngine};
use crate::capture::LeasedFrame;
use crate::decoding::Decoder;
use std::sync::Arc;
use tracing::{trace, warn};

/// What became of one ingested frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The payload completed a confirmation.
    Confirmed(ConfirmedResult),
    /// The payload was counted but not yet confirmed.
    Observed,
    /// The frame held no readable payload.
    NoPayload,
    /// The decoder reported an error for the frame.
    DecodeFailed,
    /// The engine was closed, so the frame was not acted upon.
    Ignored,
}

/// Decodes frames and feeds their payloads to a shared engine.
#[derive(Clone)]
pub struct FrameIngestor {
    decoder: Arc<dyn Decoder>,
    engine: SharedEngine,
    stats: Arc<IngestStats>,
}

impl FrameIngestor {
    /// Creates an ingestor feeding `engine` with payloads from `decoder`.
    pub fn new(decoder: Arc<dyn Decoder>, engine: SharedEngine) -> Self {
        Self {
            decoder,
            engine,
            stats: Arc::new(IngestStats::default()),
        }
    }

    /// Processes one frame. The frame's buffer is released before
    /// this returns, whatever the outcome.
    pub fn ingest(&self, leased: LeasedFrame) -> IngestOutcome {
        self.stats.record_received();
        let sequence = leased.sequence();

        // Closed engine: skip the decode, still return the buffer
        if !self.engine.is_accepting() {
            leased.release();
            self.stats.record_ignored();
            return IngestOutcome::Ignored;
        }

        let decoded = self.decoder.decode(leased.frame());
        leased.release();

        let payload = match decoded {
            Ok(Some(payload)) if !payload.is_empty() => payload,
            Ok(_) => {
                self.stats.record_empty();
                trace!(sequence, "No payload in frame");
                return IngestOutcome::NoPayload;
            }
            Err(e) => {
                self.stats.record_failure();
                warn!(sequence, error = %e, "Frame decode failed");
                return IngestOutcome::DecodeFailed;
            }
        };
        self.stats.record_decoded();

        let mut engine = self.engine.lock();
        if !engine.is_accepting() {
            self.stats.record_ignored();
            return IngestOutcome::Ignored;
        }

        self.stats.record_observation();
        match engine.observe(&payload) {
            Some(result) => {
                self.stats.record_confirmation();
                IngestOutcome::Confirmed(result)
            }
            None => IngestOutcome::Observed,
        }
    }

    /// Returns the engine this ingestor feeds.
    pub fn engine(&self) -> &SharedEngine {
        &self.engine
    }

    /// Returns the shared counters.
    pub fn stats(&self) -> Arc<IngestStats> {
        Arc::clone(&self.stats)
    }
}

impl std::fmt::Debug for FrameIngestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameIngestor")
            .field("engine", &self.engine)
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Decoder and releaser doubles shared by ingestion and session tests.

    use crate::capture::{Frame, ReleaseFrame};
    use crate::decoding::{DecodeError, Decoder};
    use std::sync::Mutex;

    /// Decodes the payload encoded in the first pixel of a frame:
    /// 0 is no payload, 255 is a failure, anything else is `"P<n>"`.
    #[derive(Debug, Default)]
    pub struct PixelDecoder;

    impl Decoder for PixelDecoder {
        fn decode(&self, frame: &Frame) -> Result<Option<String>, DecodeError> {
            match frame.pixels().first().copied() {
                None => Err(DecodeError::EmptyFrame),
                Some(0) => Ok(None),
                Some(255) => Err(DecodeError::Backend("synthetic failure".into())),
                Some(n) => Ok(Some(format!("P{}", n))),
            }
        }
    }

    /// Frame with a single-pixel payload marker.
    pub fn marked_frame(marker: u8, sequence: u64) -> Frame {
        Frame::new(vec![marker; 4], 2, 2, sequence)
    }

    /// Records every release by sequence number.
    #[derive(Debug, Default)]
    pub struct RecordingReleaser {
        released: Mutex<Vec<u64>>,
    }

    impl RecordingReleaser {
        pub fn released(&self) -> Vec<u64> {
            let mut released = self.released.lock().unwrap().clone();
            released.sort_unstable();
            released
        }
    }

    impl ReleaseFrame for RecordingReleaser {
        fn release(&self, sequence: u64) {
            self.released.lock().unwrap().push(sequence);
        }
    }
}
