//! Frame leases and buffer release accounting.
//!
//! A camera hands out a bounded number of frame buffers. Each delivered
//! frame is wrapped in a [`LeasedFrame`] that returns its buffer to the
//! producer when dropped, so the buffer is released exactly once on every
//! processing path. A producer whose buffers are never returned stalls.

use super::Frame;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Receives the buffer of a leased frame when the lease ends.
pub trait ReleaseFrame: Send + Sync {
    /// Called once per lease, with the sequence number of the frame.
    fn release(&self, sequence: u64);
}

/// A frame on loan from its producer.
pub struct LeasedFrame {
    frame: Frame,
    releaser: Option<Arc<dyn ReleaseFrame>>,
}

impl LeasedFrame {
    /// Wraps a frame whose buffer is returned to `releaser` on drop.
    pub fn new(frame: Frame, releaser: Arc<dyn ReleaseFrame>) -> Self {
        Self {
            frame,
            releaser: Some(releaser),
        }
    }

    /// Wraps a frame that owns its buffer outright.
    pub fn unmanaged(frame: Frame) -> Self {
        Self {
            frame,
            releaser: None,
        }
    }

    /// Returns the borrowed frame.
    #[inline]
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Returns the frame sequence number.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.frame.sequence()
    }

    /// Ends the lease now rather than at the end of the enclosing scope.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for LeasedFrame {
    fn drop(&mut self) {
        if let Some(releaser) = self.releaser.take() {
            releaser.release(self.frame.sequence());
        }
    }
}

impl std::fmt::Debug for LeasedFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeasedFrame")
            .field("frame", &self.frame)
            .field("managed", &self.releaser.is_some())
            .finish()
    }
}

/// Counts leased, released and outstanding frame buffers for one producer.
#[derive(Debug, Default)]
pub struct ReleaseTracker {
    outstanding: AtomicUsize,
    leased: AtomicU64,
    released: AtomicU64,
}

impl ReleaseTracker {
    /// Creates a tracker with nothing on loan.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Leases `frame` out, counting it as outstanding until released.
    pub fn lease(self: &Arc<Self>, frame: Frame) -> LeasedFrame {
        self.outstanding.fetch_add(1, Ordering::AcqRel);
        self.leased.fetch_add(1, Ordering::Relaxed);
        LeasedFrame::new(frame, Arc::clone(self) as Arc<dyn ReleaseFrame>)
    }

    /// Number of frames currently on loan.
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    /// Total frames ever leased.
    pub fn leased(&self) -> u64 {
        self.leased.load(Ordering::Relaxed)
    }

    /// Total frames ever released.
    pub fn released(&self) -> u64 {
        self.released.load(Ordering::Relaxed)
    }
}

impl ReleaseFrame for ReleaseTracker {
    fn release(&self, sequence: u64) {
        self.released.fetch_add(1, Ordering::Relaxed);
        self.outstanding.fetch_sub(1, Ordering::AcqRel);
        tracing::trace!(sequence, "frame buffer released");
    }
}
