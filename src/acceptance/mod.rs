//! Debounce and acceptance of decoded payloads.
//!
//! Turns a noisy stream of per-frame reads into a single confirmed
//! result per scan session.

mod engine;
mod shared;

pub use engine::{AcceptanceEngine, AcceptanceState, ConfirmedResult};
pub use shared::SharedEngine;
