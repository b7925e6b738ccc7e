//! Engine lifecycle states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of the engine itself (the meta state machine).
///
/// `Initialized -> Running <-> Paused`, and
/// `Running | Paused -> Stopping -> Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    #[default]
    Initialized,
    Running,
    Paused,
    /// `stop()` in progress; the worker is winding down.
    Stopping,
    /// Terminal.
    Stopped,
}

impl EngineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineState::Initialized => "initialized",
            EngineState::Running => "running",
            EngineState::Paused => "paused",
            EngineState::Stopping => "stopping",
            EngineState::Stopped => "stopped",
        }
    }

    /// Returns true while a worker is attached.
    pub fn is_active(&self) -> bool {
        matches!(self, EngineState::Running | EngineState::Paused)
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_states() {
        assert!(!EngineState::Initialized.is_active());
        assert!(EngineState::Running.is_active());
        assert!(EngineState::Paused.is_active());
        assert!(!EngineState::Stopping.is_active());
        assert!(!EngineState::Stopped.is_active());
    }

    #[test]
    fn test_serialized_form() {
        let json = serde_json::to_string(&EngineState::Paused).unwrap();
        assert_eq!(json, "\"paused\"");
        assert_eq!(EngineState::default(), EngineState::Initialized);
    }
}
