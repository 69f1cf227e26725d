//! Torch (continuous flash) control.
//!
//! Toggling the torch is fire-and-forget: the new state is recorded
//! immediately and the command is handed to the torch collaborator with
//! no ordering guarantee relative to frames already in flight.

use serde::{Deserialize, Serialize};

/// Torch status as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashState {
    /// Torch is on.
    Enabled,
    /// Torch is off.
    #[default]
    Disabled,
}

impl FlashState {
    /// Returns the opposite state.
    pub fn toggled(self) -> Self {
        match self {
            FlashState::Enabled => FlashState::Disabled,
            FlashState::Disabled => FlashState::Enabled,
        }
    }

    /// Whether the torch is on.
    pub fn is_enabled(self) -> bool {
        self == FlashState::Enabled
    }
}

impl std::fmt::Display for FlashState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlashState::Enabled => f.write_str("on"),
            FlashState::Disabled => f.write_str("off"),
        }
    }
}

/// Hardware side of the torch.
pub trait TorchControl: Send + Sync {
    /// Turns the torch hardware on or off.
    fn set_torch(&self, enabled: bool);
}

/// Torch for backends without flash support; records requests in the log.
#[derive(Debug, Default)]
pub struct LoggingTorch;

impl TorchControl for LoggingTorch {
    fn set_torch(&self, enabled: bool) {
        tracing::info!(enabled, "Torch requested (no flash on this backend)");
    }
}

/// Holds the flash state and forwards changes to the torch.
pub struct Flash {
    state: FlashState,
    torch: Box<dyn TorchControl>,
}

impl Flash {
    /// Creates the controller, switching the torch on if `initial` asks for it.
    pub fn new(torch: Box<dyn TorchControl>, initial: FlashState) -> Self {
        if initial.is_enabled() {
            torch.set_torch(true);
        }
        Self {
            state: initial,
            torch,
        }
    }

    /// Flips the flash state and returns the new one.
    pub fn toggle(&mut self) -> FlashState {
        self.state = self.state.toggled();
        self.torch.set_torch(self.state.is_enabled());
        tracing::debug!(state = %self.state, "Flash toggled");
        self.state
    }

    /// Returns the current flash state.
    pub fn state(&self) -> FlashState {
        self.state
    }
}

impl std::fmt::Debug for Flash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Flash").field("state", &self.state).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingTorch {
        calls: Arc<Mutex<Vec<bool>>>,
    }

    impl TorchControl for RecordingTorch {
        fn set_torch(&self, enabled: bool) {
            self.calls.lock().unwrap().push(enabled);
        }
    }

    #[test]
    fn test_starts_disabled_without_command() {
        let torch = RecordingTorch::default();
        let calls = Arc::clone(&torch.calls);

        let flash = Flash::new(Box::new(torch), FlashState::default());

        assert_eq!(flash.state(), FlashState::Disabled);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_toggle_alternates_and_commands_torch() {
        let torch = RecordingTorch::default();
        let calls = Arc::clone(&torch.calls);
        let mut flash = Flash::new(Box::new(torch), FlashState::Disabled);

        assert_eq!(flash.toggle(), FlashState::Enabled);
        assert_eq!(flash.toggle(), FlashState::Disabled);
        assert_eq!(*calls.lock().unwrap(), vec![true, false]);
    }

    #[test]
    fn test_enabled_on_start_switches_torch_on() {
        let torch = RecordingTorch::default();
        let calls = Arc::clone(&torch.calls);

        let flash = Flash::new(Box::new(torch), FlashState::Enabled);

        assert!(flash.state().is_enabled());
        assert_eq!(*calls.lock().unwrap(), vec![true]);
    }
}
