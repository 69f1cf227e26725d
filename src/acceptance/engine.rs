//! Consecutive-read debouncing.
//!
//! The decoder occasionally misreads a code for a single frame. The engine
//! only confirms a payload after it has been observed a required number of
//! times in a row, then closes until the consumer reopens it.

use chrono::{DateTime, Utc};
use tracing::{debug, info, trace};

/// A payload confirmed by consecutive identical reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedResult {
    payload: String,
    confirmations: u32,
    confirmed_at: DateTime<Utc>,
}

impl ConfirmedResult {
    fn new(payload: String, confirmations: u32) -> Self {
        Self {
            payload,
            confirmations,
            confirmed_at: Utc::now(),
        }
    }

    /// Returns the confirmed payload.
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Takes ownership of the payload.
    pub fn into_payload(self) -> String {
        self.payload
    }

    /// Number of consecutive reads that confirmed the payload.
    pub fn confirmations(&self) -> u32 {
        self.confirmations
    }

    /// Wall-clock time of confirmation.
    pub fn confirmed_at(&self) -> DateTime<Utc> {
        self.confirmed_at
    }
}

/// Mutable debounce state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptanceState {
    /// Payload awaiting confirmation.
    pending_payload: Option<String>,
    /// Consecutive observations equal to `pending_payload`.
    match_count: u32,
    /// Whether new observations are counted.
    accepting_new_reads: bool,
}

impl Default for AcceptanceState {
    fn default() -> Self {
        Self {
            pending_payload: None,
            match_count: 0,
            accepting_new_reads: true,
        }
    }
}

impl AcceptanceState {
    /// Payload currently being confirmed, if any.
    pub fn pending_payload(&self) -> Option<&str> {
        self.pending_payload.as_deref()
    }

    /// Consecutive reads of the pending payload so far.
    pub fn match_count(&self) -> u32 {
        self.match_count
    }

    /// Whether the engine is still taking reads.
    pub fn accepting_new_reads(&self) -> bool {
        self.accepting_new_reads
    }
}

/// Two-state debounce machine: Open (counting reads) and Closed
/// (holding off until [`reopen`](Self::reopen)).
#[derive(Debug, Clone)]
pub struct AcceptanceEngine {
    state: AcceptanceState,
    required_confirmations: u32,
}

impl AcceptanceEngine {
    /// Creates an open engine. A threshold of 0 is treated as 1.
    pub fn new(required_confirmations: u32) -> Self {
        Self {
            state: AcceptanceState::default(),
            required_confirmations: required_confirmations.max(1),
        }
    }

    /// Records one decoded payload.
    ///
    /// Returns the confirmed result on the observation that reaches the
    /// threshold. While closed, observations are ignored.
    pub fn observe(&mut self, payload: &str) -> Option<ConfirmedResult> {
        if !self.state.accepting_new_reads {
            trace!("Engine closed; observation ignored");
            return None;
        }

        if self.state.pending_payload.as_deref() == Some(payload) {
            self.state.match_count += 1;
            debug!(times_matched = self.state.match_count, "Consecutive read matched");
        } else {
            debug!(
                old = self.state.pending_payload.as_deref().unwrap_or("<none>"),
                new = payload,
                "Different payload received, candidate updated"
            );
            self.state.pending_payload = Some(payload.to_owned());
            self.state.match_count = 1;
        }

        if self.state.match_count < self.required_confirmations {
            return None;
        }

        let confirmations = self.state.match_count;
        let payload = self
            .state
            .pending_payload
            .take()
            .unwrap_or_else(|| payload.to_owned());
        self.state.match_count = 0;
        self.state.accepting_new_reads = false;

        info!(
            payload = %payload,
            confirmations,
            "Consecutive reading succeeded"
        );
        Some(ConfirmedResult::new(payload, confirmations))
    }

    /// Opens the engine for a new scan, discarding any partial candidate.
    pub fn reopen(&mut self) {
        self.state = AcceptanceState::default();
        trace!("Engine reopened");
    }

    /// Returns true while observations are being counted.
    pub fn is_accepting(&self) -> bool {
        self.state.accepting_new_reads
    }

    /// Returns the current debounce state.
    pub fn state(&self) -> &AcceptanceState {
        &self.state
    }

    /// Returns the configured threshold.
    pub fn required_confirmations(&self) -> u32 {
        self.required_confirmations
    }
}

impl Default for AcceptanceEngine {
    fn default() -> Self {
        Self::new(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Index at which `reads` first holds `n` equal values in a row.
    fn first_run_end(reads: &[String], n: usize) -> Option<usize> {
        let mut run = 0;
        for i in 0..reads.len() {
            run = if i > 0 && reads[i] == reads[i - 1] { run + 1 } else { 1 };
            if run >= n {
                return Some(i);
            }
        }
        None
    }

    #[test]
    fn test_threshold_one_confirms_first_read() {
        let mut engine = AcceptanceEngine::default();

        let result = engine.observe("X").unwrap();
        assert_eq!(result.payload(), "X");
        assert_eq!(result.confirmations(), 1);
        assert!(!engine.is_accepting());
    }

    #[test]
    fn test_threshold_three_scenario() {
        let mut engine = AcceptanceEngine::new(3);

        for read in ["A", "A", "B", "B"] {
            assert!(engine.observe(read).is_none());
        }
        assert_eq!(engine.state().pending_payload(), Some("B"));
        assert_eq!(engine.state().match_count(), 2);

        let result = engine.observe("B").unwrap();
        assert_eq!(result.into_payload(), "B");
        assert!(!engine.is_accepting());
    }

    #[test]
    fn test_interleaved_reads_never_confirm() {
        let mut engine = AcceptanceEngine::new(2);

        assert!(engine.observe("A").is_none());
        assert!(engine.observe("B").is_none());
        assert!(engine.observe("A").is_none());
        assert!(engine.is_accepting());
    }

    #[test]
    fn test_two_matching_reads_confirm_once() {
        let mut engine = AcceptanceEngine::new(2);

        assert!(engine.observe("A").is_none());
        assert_eq!(engine.observe("A").unwrap().payload(), "A");
        assert!(engine.observe("A").is_none());
        assert!(engine.observe("A").is_none());
    }

    #[test]
    fn test_confirmation_resets_candidate() {
        let mut engine = AcceptanceEngine::new(1);
        engine.observe("A");

        assert_eq!(engine.state().pending_payload(), None);
        assert_eq!(engine.state().match_count(), 0);
        assert!(!engine.state().accepting_new_reads());
    }

    #[test]
    fn test_closed_engine_ignores_reads() {
        let mut engine = AcceptanceEngine::new(1);
        engine.observe("A");
        let closed = engine.state().clone();

        assert!(engine.observe("B").is_none());
        assert_eq!(engine.state(), &closed);
    }

    #[test]
    fn test_reopen_clears_partial_candidate() {
        let mut engine = AcceptanceEngine::new(2);
        engine.observe("A");
        engine.reopen();

        // The earlier "A" must not count toward this one
        assert!(engine.observe("A").is_none());
        assert_eq!(engine.observe("A").unwrap().payload(), "A");
    }

    #[test]
    fn test_reopen_after_confirmation_detects_new_payload() {
        let mut engine = AcceptanceEngine::new(1);
        assert_eq!(engine.observe("first").unwrap().payload(), "first");

        engine.reopen();
        assert!(engine.is_accepting());
        assert_eq!(engine.observe("second").unwrap().payload(), "second");
    }

    #[test]
    fn test_zero_threshold_behaves_as_one() {
        let engine = AcceptanceEngine::new(0);
        assert_eq!(engine.required_confirmations(), 1);
    }

    proptest! {
        #[test]
        fn confirms_iff_run_reaches_threshold(
            reads in prop::collection::vec(prop::sample::select(vec!["A", "B", "C"]), 0..40),
            threshold in 1u32..5,
        ) {
            let reads: Vec<String> = reads.into_iter().map(String::from).collect();
            let expected = first_run_end(&reads, threshold as usize);

            let mut engine = AcceptanceEngine::new(threshold);
            let mut emitted = Vec::new();
            for (i, read) in reads.iter().enumerate() {
                if let Some(result) = engine.observe(read) {
                    emitted.push((i, result.into_payload()));
                }
            }

            match expected {
                Some(index) => {
                    prop_assert_eq!(emitted.len(), 1);
                    prop_assert_eq!(emitted[0].0, index);
                    prop_assert_eq!(&emitted[0].1, &reads[index]);
                    prop_assert!(!engine.is_accepting());
                }
                None => {
                    prop_assert!(emitted.is_empty());
                    prop_assert!(engine.is_accepting());
                }
            }
        }
    }
}
