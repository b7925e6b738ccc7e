//! Notification events emitted by the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default event target.
pub const TARGET_ALL: &str = "all";

/// Event names emitted by the engine.
pub mod names {
    pub const INITIALIZED: &str = "StateMachine: Initialized";
    pub const ON_INIT: &str = "OnInit";
    pub const STARTED: &str = "StateMachine: Started";
    pub const PAUSED: &str = "StateMachine: Paused";
    pub const RESUMED: &str = "StateMachine: Resumed";
    pub const STOPPED: &str = "StateMachine: Stopped";
    pub const TRIGGER_ENTERED: &str = "StateMachine: Trigger entered";
    pub const TRIGGER_REJECTED: &str = "StateMachine: Trigger rejected";
    pub const TRANSITION_REJECTED: &str = "StateMachine: Transition rejected";
    pub const GUARDS_EXECUTED: &str = "StateMachine: Guards executed";
    pub const BEGIN_STATE_CHANGE: &str = "StateMachine: Begin state change";
    pub const STATE_CHANGE_COMPLETED: &str = "StateMachine: State change completed";
    pub const WORKER_FAULT: &str = "StateMachine: Worker fault";
    pub const WORKER_RESTARTING: &str = "StateMachine: Worker restarting";
    pub const RESTART_LIMIT_REACHED: &str = "StateMachine: Restart limit reached";
}

/// Event category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    /// Engine bookkeeping: lifecycle, triggers, transitions, faults.
    System,
    /// Commands meant for other machines.
    Command,
}

/// Event severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A structured, timestamped notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineEvent {
    pub name: String,
    /// Free-text detail.
    pub info: String,
    pub event_type: EventType,
    pub severity: Severity,
    pub source: String,
    pub target: String,
    pub timestamp: DateTime<Utc>,
}

impl EngineEvent {
    pub fn new(
        name: impl Into<String>,
        info: impl Into<String>,
        event_type: EventType,
        source: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            info: info.into(),
            event_type,
            severity: Severity::Info,
            source: source.into(),
            target: TARGET_ALL.to_string(),
            timestamp: Utc::now(),
        }
    }

    /// Creates an info-level system event.
    pub fn system(name: impl Into<String>, info: impl Into<String>, source: impl Into<String>) -> Self {
        Self::new(name, info, EventType::System, source)
    }

    /// Creates a command event.
    pub fn command(name: impl Into<String>, info: impl Into<String>, source: impl Into<String>) -> Self {
        Self::new(name, info, EventType::Command, source)
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_command(&self) -> bool {
        self.event_type == EventType::Command
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let event = EngineEvent::system(names::STARTED, "System running", "door");
        assert_eq!(event.event_type, EventType::System);
        assert_eq!(event.severity, Severity::Info);
        assert_eq!(event.target, TARGET_ALL);
        assert_eq!(event.source, "door");
        assert!(!event.is_error());
        assert!(!event.is_command());
    }

    #[test]
    fn test_builders() {
        let event = EngineEvent::command("alarm", "door forced", "door")
            .with_severity(Severity::Error);
        assert!(event.is_command());
        assert!(event.is_error());
        assert_eq!(event.target, TARGET_ALL);
    }

    #[test]
    fn test_json_shape() {
        let event = EngineEvent::system(names::PAUSED, "System waiting", "door");
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event_type"], "system");
        assert_eq!(value["severity"], "info");
        assert_eq!(value["name"], names::PAUSED);

        let parsed: EngineEvent = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, event);
    }
}
