//! Driving a camera into a session.

use super::{ScanOutcome, ScanSession};
use crate::capture::{Camera, CameraError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::warn;

/// Why [`pump_frames`] stopped capturing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpStop {
    /// The session has an outcome.
    Settled,
    /// The camera has no more frames.
    EndOfStream,
    /// The deadline passed first.
    Deadline,
}

/// Summary of one capture run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PumpSummary {
    /// Frames accepted by the session's sink.
    pub frames_pushed: u64,
    /// Captures skipped because every buffer was still on loan.
    pub stalls: u64,
    /// Why the run ended.
    pub stop: PumpStop,
}

/// Captures frames from `camera` into `session` every `frame_interval`
/// until the session settles, the camera runs dry or `deadline` passes.
///
/// Exhausted buffers are treated as a stall and retried on the next tick;
/// any other capture error ends the run.
pub fn pump_frames<C: Camera + ?Sized>(
    camera: &mut C,
    session: &ScanSession,
    frame_interval: Duration,
    deadline: Option<Instant>,
) -> Result<PumpSummary, CameraError> {
    let sink = session.sink();
    let mut frames_pushed = 0;
    let mut stalls = 0;

    let stop = loop {
        if session.is_finished() {
            break PumpStop::Settled;
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break PumpStop::Deadline;
        }

        match camera.capture() {
            Ok(frame) => {
                if sink.push(frame) {
                    frames_pushed += 1;
                }
            }
            Err(CameraError::EndOfStream) => break PumpStop::EndOfStream,
            Err(CameraError::BuffersExhausted(limit)) => {
                stalls += 1;
                tracing::trace!(limit, "Frame buffers exhausted; capture stalled");
            }
            Err(e) => return Err(e),
        }

        thread::sleep(frame_interval);
    };

    tracing::debug!(frames_pushed, stalls, ?stop, "Frame pump stopped");

    Ok(PumpSummary {
        frames_pushed,
        stalls,
        stop,
    })
}

/// Ends `session` according to how its capture run stopped.
///
/// After the camera runs dry, in-flight frames get up to `drain_grace` to
/// confirm. A capture error cancels the session, but a result confirmed
/// before the error is still returned.
pub fn finish_pumped(
    session: ScanSession,
    pumped: Result<PumpSummary, CameraError>,
    drain_grace: Duration,
) -> Result<ScanOutcome, CameraError> {
    match pumped {
        Ok(summary) => Ok(match summary.stop {
            PumpStop::Settled => session.wait(),
            PumpStop::EndOfStream => session.wait_timeout(drain_grace),
            PumpStop::Deadline => session.wait_timeout(Duration::ZERO),
        }),
        Err(e) => match session.cancel() {
            Ok(result) => {
                warn!(error = %e, "Capture failed after a payload was confirmed");
                Ok(Ok(result))
            }
            Err(_) => Err(e),
        },
    }
}
