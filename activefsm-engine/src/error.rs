//! Engine error types.

use crate::lifecycle::EngineState;
use std::time::Duration;
use thiserror::Error;

/// Errors from the trigger queue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("trigger queue is full (capacity {capacity})")]
    Full { capacity: usize },

    #[error("trigger queue is closed")]
    Closed,
}

/// Engine errors.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("core error: {0}")]
    Core(#[from] activefsm_core::CoreError),

    #[error("trigger '{trigger}' rejected: queue is full (capacity {capacity})")]
    QueueFull { trigger: String, capacity: usize },

    #[error("trigger '{trigger}' rejected: queue is closed")]
    QueueClosed { trigger: String },

    #[error("cannot {operation} while engine is {state}")]
    InvalidLifecycle {
        operation: &'static str,
        state: EngineState,
    },

    #[error("worker did not stop within {timeout:?}")]
    ShutdownTimeout { timeout: Duration },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),
}

impl EngineError {
    pub(crate) fn from_queue(trigger: &str, err: QueueError) -> Self {
        match err {
            QueueError::Full { capacity } => EngineError::QueueFull {
                trigger: trigger.to_string(),
                capacity,
            },
            QueueError::Closed => EngineError::QueueClosed {
                trigger: trigger.to_string(),
            },
        }
    }

    /// Returns whether the operation may succeed if retried later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::QueueFull { .. })
    }

    /// Returns a stable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            EngineError::Core(e) => e.error_code(),
            EngineError::QueueFull { .. } => "QUEUE_FULL",
            EngineError::QueueClosed { .. } => "QUEUE_CLOSED",
            EngineError::InvalidLifecycle { .. } => "INVALID_LIFECYCLE",
            EngineError::ShutdownTimeout { .. } => "SHUTDOWN_TIMEOUT",
            EngineError::InvalidConfig(_) => "INVALID_CONFIG",
            EngineError::Spawn(_) => "SPAWN_FAILED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_errors_map_to_engine_errors() {
        let err = EngineError::from_queue("go", QueueError::Full { capacity: 1 });
        assert_eq!(err.error_code(), "QUEUE_FULL");
        assert!(err.is_retryable());
        assert_eq!(
            err.to_string(),
            "trigger 'go' rejected: queue is full (capacity 1)"
        );

        let err = EngineError::from_queue("go", QueueError::Closed);
        assert_eq!(err.error_code(), "QUEUE_CLOSED");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_lifecycle_error_message() {
        let err = EngineError::InvalidLifecycle {
            operation: "resume",
            state: EngineState::Running,
        };
        assert_eq!(err.to_string(), "cannot resume while engine is running");
    }
}
