//! Frame counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters updated by ingestion and frame delivery.
#[derive(Debug, Default)]
pub struct IngestStats {
    frames_received: AtomicU64,
    frames_superseded: AtomicU64,
    payloads_decoded: AtomicU64,
    empty_results: AtomicU64,
    decode_failures: AtomicU64,
    observations: AtomicU64,
    ignored: AtomicU64,
    confirmations: AtomicU64,
}

/// Point-in-time copy of [`IngestStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSnapshot {
    /// Frames handed to the ingestor.
    pub frames_received: u64,
    /// Queued frames replaced by a newer one before processing.
    pub frames_superseded: u64,
    /// Frames that produced a non-empty payload.
    pub payloads_decoded: u64,
    /// Frames that produced no payload.
    pub empty_results: u64,
    /// Frames the decoder failed on.
    pub decode_failures: u64,
    /// Payloads counted by the engine.
    pub observations: u64,
    /// Payloads dropped because the engine was closed.
    pub ignored: u64,
    /// Confirmed results.
    pub confirmations: u64,
}

macro_rules! counter {
    ($record:ident, $field:ident) => {
        pub(crate) fn $record(&self) {
            self.$field.fetch_add(1, Ordering::Relaxed);
        }
    };
}

impl IngestStats {
    counter!(record_received, frames_received);
    counter!(record_superseded, frames_superseded);
    counter!(record_decoded, payloads_decoded);
    counter!(record_empty, empty_results);
    counter!(record_failure, decode_failures);
    counter!(record_observation, observations);
    counter!(record_ignored, ignored);
    counter!(record_confirmation, confirmations);

    /// Copies the current counter values.
    pub fn snapshot(&self) -> IngestSnapshot {
        IngestSnapshot {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_superseded: self.frames_superseded.load(Ordering::Relaxed),
            payloads_decoded: self.payloads_decoded.load(Ordering::Relaxed),
            empty_results: self.empty_results.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            observations: self.observations.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
            confirmations: self.confirmations.load(Ordering::Relaxed),
        }
    }
}
