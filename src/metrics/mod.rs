//! Prometheus metrics for scanner monitoring.
//!
//! Metrics are exposed in Prometheus text format through
//! [`MetricsRegistry::encode`]; the CLI prints them on exit.
//!
//! # Metrics Exposed
//!
//! ## Frame Metrics
//! - `qr_reader_frames_received_total` - Frames handed to the decoder stage
//! - `qr_reader_frames_superseded_total` - Queued frames replaced before decoding
//! - `qr_reader_decode_failures_total` - Frames the decoder failed on
//! - `qr_reader_observations_total` - Payloads counted by the debounce engine
//! - `qr_reader_confirmations_total` - Confirmed payloads
//!
//! ## Session Metrics
//! - `qr_reader_sessions_started_total`
//! - `qr_reader_sessions_cancelled_total`
//! - `qr_reader_sessions_timed_out_total`
//!
//! ## Torch
//! - `qr_reader_flash_enabled` - Torch state (1=on, 0=off)

mod collector;

pub use collector::{MetricsError, MetricsRegistry, MetricsSnapshot};
