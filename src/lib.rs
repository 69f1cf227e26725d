//! QR Reader Library
//!
//! A camera QR code scanner that turns a noisy stream of per-frame reads
//! into a single confirmed result per scan session.
//!
//! # Architecture
//!
//! The system follows an explicit data flow:
//!
//! ```text
//! capture → session sink (latest frame only) → ingestion → acceptance
//!                                                  ↓            ↓
//!                                              decoding    ScanOutcome
//! ```
//!
//! # Design Principles
//!
//! - **Every frame is returned**: leased frame buffers are released exactly
//!   once, whatever the decode outcome
//! - **Debounced results**: a payload is confirmed only after a configured
//!   number of consecutive identical reads
//! - **One outcome per session**: a confirmed result, a cancellation or a
//!   timeout, never more than one
//!
//! # Example
//!
//! ```no_run
//! use qr_reader::{
//!     capture::{Camera, CaptureConfig, ImageSequenceCamera, ScannerConfig},
//!     decoding::RqrrDecoder,
//!     session::{pump_frames, Scanner},
//! };
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let capture = CaptureConfig::default();
//! let mut camera = ImageSequenceCamera::new(vec!["ticket.png".into()]).with_repeat(3);
//! camera.open(&capture).unwrap();
//!
//! let scanner = Scanner::new(Arc::new(RqrrDecoder::new()), &ScannerConfig::default());
//! let session = scanner.start();
//!
//! pump_frames(&mut camera, &session, capture.frame_interval(), None).unwrap();
//!
//! match session.wait_timeout(Duration::from_secs(1)) {
//!     Ok(result) => println!("{}", result.payload()),
//!     Err(reason) => eprintln!("no QR code: {}", reason),
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod acceptance;
pub mod capture;
pub mod decoding;
pub mod ingestion;
pub mod metrics;
pub mod session;
pub mod torch;

// Re-export commonly used types at crate root
pub use acceptance::{AcceptanceEngine, AcceptanceState, ConfirmedResult, SharedEngine};
pub use capture::{Camera, CaptureConfig, FileConfig, Frame, LeasedFrame, MockCamera};
pub use decoding::{DecodeError, Decoder, RqrrDecoder};
pub use ingestion::{FrameIngestor, IngestOutcome};
pub use session::{ScanError, ScanOutcome, ScanSession, Scanner};
pub use torch::{Flash, FlashState, TorchControl};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
