//! Core error types.

use thiserror::Error;

/// Errors from the state graph and the transition protocol.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("state graph has no states")]
    EmptyGraph,

    #[error("duplicate state: {state}")]
    DuplicateState { state: String },

    #[error("no default state in state graph")]
    NoDefaultState,

    #[error("multiple default states: {states:?}")]
    MultipleDefaultStates { states: Vec<String> },

    #[error(
        "transition '{transition}' has wrong source state '{expected}' when system is in '{actual}'"
    )]
    InvalidSourceState {
        transition: String,
        expected: String,
        actual: String,
    },

    #[error(
        "transition '{transition}' has unknown target state '{target}' when system is in '{current}'"
    )]
    UnknownTargetState {
        transition: String,
        target: String,
        current: String,
    },

    #[error("action '{action}' failed: {reason}")]
    ActionFailed { action: String, reason: String },
}

impl CoreError {
    /// Returns whether this error must take the worker down.
    ///
    /// Validation errors are recovered inside the transition protocol;
    /// only a failing action escalates.
    pub fn is_fault(&self) -> bool {
        matches!(self, CoreError::ActionFailed { .. })
    }

    /// Returns a stable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            CoreError::EmptyGraph => "EMPTY_GRAPH",
            CoreError::DuplicateState { .. } => "DUPLICATE_STATE",
            CoreError::NoDefaultState => "NO_DEFAULT_STATE",
            CoreError::MultipleDefaultStates { .. } => "MULTIPLE_DEFAULT_STATES",
            CoreError::InvalidSourceState { .. } => "INVALID_SOURCE_STATE",
            CoreError::UnknownTargetState { .. } => "UNKNOWN_TARGET_STATE",
            CoreError::ActionFailed { .. } => "ACTION_FAILED",
        }
    }
}

/// Failure returned by an action's behavior.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct ActionError {
    pub reason: String,
}

impl ActionError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl From<&str> for ActionError {
    fn from(reason: &str) -> Self {
        Self::new(reason)
    }
}

impl From<String> for ActionError {
    fn from(reason: String) -> Self {
        Self::new(reason)
    }
}
