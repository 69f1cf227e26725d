//! Metrics collection and registry.

use crate::ingestion::IngestSnapshot;
use crate::session::SessionSnapshot;
use crate::torch::FlashState;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Registration or encoding failed.
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// A snapshot of scanner state for metrics update.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    /// Frame ingestion counters.
    pub frames: IngestSnapshot,
    /// Session outcome counters.
    pub sessions: SessionSnapshot,
    /// Current torch state.
    pub flash: FlashState,
}

impl MetricsSnapshot {
    /// Creates a snapshot from the current state of scanner components.
    pub fn from_components(
        frames: IngestSnapshot,
        sessions: SessionSnapshot,
        flash: FlashState,
    ) -> Self {
        Self {
            frames,
            sessions,
            flash,
        }
    }
}

/// Prometheus metrics registry for the scanner.
pub struct MetricsRegistry {
    registry: Registry,

    // Frame metrics
    frames_received: IntCounter,
    frames_superseded: IntCounter,
    decode_failures: IntCounter,
    observations: IntCounter,
    confirmations: IntCounter,

    // Session metrics
    sessions_started: IntCounter,
    sessions_cancelled: IntCounter,
    sessions_timed_out: IntCounter,

    flash_enabled: IntGauge,
}

impl MetricsRegistry {
    /// Creates a new metrics registry with all scanner metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let frames_received = IntCounter::new(
            "qr_reader_frames_received_total",
            "Frames handed to the decoder stage",
        )?;
        let frames_superseded = IntCounter::new(
            "qr_reader_frames_superseded_total",
            "Queued frames replaced by a newer frame before decoding",
        )?;
        let decode_failures = IntCounter::new(
            "qr_reader_decode_failures_total",
            "Frames the decoder reported an error for",
        )?;
        let observations = IntCounter::new(
            "qr_reader_observations_total",
            "Decoded payloads counted by the debounce engine",
        )?;
        let confirmations = IntCounter::new(
            "qr_reader_confirmations_total",
            "Payloads confirmed by consecutive reads",
        )?;

        let sessions_started = IntCounter::new(
            "qr_reader_sessions_started_total",
            "Scan sessions started",
        )?;
        let sessions_cancelled = IntCounter::new(
            "qr_reader_sessions_cancelled_total",
            "Scan sessions cancelled before a result",
        )?;
        let sessions_timed_out = IntCounter::new(
            "qr_reader_sessions_timed_out_total",
            "Scan sessions that hit their deadline",
        )?;

        let flash_enabled = IntGauge::new(
            "qr_reader_flash_enabled",
            "Torch state (1=on, 0=off)",
        )?;

        registry.register(Box::new(frames_received.clone()))?;
        registry.register(Box::new(frames_superseded.clone()))?;
        registry.register(Box::new(decode_failures.clone()))?;
        registry.register(Box::new(observations.clone()))?;
        registry.register(Box::new(confirmations.clone()))?;
        registry.register(Box::new(sessions_started.clone()))?;
        registry.register(Box::new(sessions_cancelled.clone()))?;
        registry.register(Box::new(sessions_timed_out.clone()))?;
        registry.register(Box::new(flash_enabled.clone()))?;

        Ok(Self {
            registry,
            frames_received,
            frames_superseded,
            decode_failures,
            observations,
            confirmations,
            sessions_started,
            sessions_cancelled,
            sessions_timed_out,
            flash_enabled,
        })
    }

    /// Updates all metrics from a snapshot of scanner state.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        let frames = &snapshot.frames;
        advance(&self.frames_received, frames.frames_received);
        advance(&self.frames_superseded, frames.frames_superseded);
        advance(&self.decode_failures, frames.decode_failures);
        advance(&self.observations, frames.observations);
        advance(&self.confirmations, frames.confirmations);

        let sessions = &snapshot.sessions;
        advance(&self.sessions_started, sessions.started);
        advance(&self.sessions_cancelled, sessions.cancelled);
        advance(&self.sessions_timed_out, sessions.timed_out);

        self.flash_enabled
            .set(if snapshot.flash.is_enabled() { 1 } else { 0 });
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// Counters only move forward, so increment by the difference.
fn advance(counter: &IntCounter, total: u64) {
    let current = counter.get();
    if total > current {
        counter.inc_by(total - current);
    }
}
