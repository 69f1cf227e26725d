//! Single owning handle for an engine shared across threads.

use super::{AcceptanceEngine, ConfirmedResult};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Mutex-guarded [`AcceptanceEngine`].
///
/// Decode completions may arrive from a worker thread while the consumer
/// reopens the engine from another, so every access is serialized here.
#[derive(Debug, Clone)]
pub struct SharedEngine {
    inner: Arc<Mutex<AcceptanceEngine>>,
}

impl SharedEngine {
    /// Wraps `engine` for sharing between threads.
    pub fn new(engine: AcceptanceEngine) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    /// Locks the engine for a compound check-then-observe.
    ///
    /// The engine holds only counters, so a panic while locked cannot
    /// leave it unusable and poisoning is ignored.
    pub fn lock(&self) -> MutexGuard<'_, AcceptanceEngine> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Offers a payload to the engine. See [`AcceptanceEngine::observe`].
    pub fn observe(&self, payload: &str) -> Option<ConfirmedResult> {
        self.lock().observe(payload)
    }

    /// Opens the engine for a new scan.
    pub fn reopen(&self) {
        self.lock().reopen();
    }

    /// Whether the engine is still taking reads.
    pub fn is_accepting(&self) -> bool {
        self.lock().is_accepting()
    }
}

impl Default for SharedEngine {
    fn default() -> Self {
        Self::new(AcceptanceEngine::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_clones_share_state() {
        let engine = SharedEngine::new(AcceptanceEngine::new(1));
        let other = engine.clone();

        assert!(other.observe("A").is_some());
        assert!(!engine.is_accepting());

        engine.reopen();
        assert!(other.is_accepting());
    }

    #[test]
    fn test_concurrent_observers_confirm_once() {
        let engine = SharedEngine::new(AcceptanceEngine::new(1));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = engine.clone();
                thread::spawn(move || engine.observe("same").is_some())
            })
            .collect();

        let confirmed = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&c| c)
            .count();
        assert_eq!(confirmed, 1);
    }
}
