//! Named units of side-effecting behavior.
//!
//! Actions are attached to states (entry/exit) and transitions
//! (guards/transition actions). They take no input and return nothing
//! but may fail.

use crate::error::{ActionError, CoreError};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Behavior executed by an [`Action`].
pub trait Behavior: Send + Sync {
    fn execute(&self) -> Result<(), ActionError>;
}

impl<F> Behavior for F
where
    F: Fn() -> Result<(), ActionError> + Send + Sync,
{
    fn execute(&self) -> Result<(), ActionError> {
        self()
    }
}

/// A named action.
#[derive(Clone)]
pub struct Action {
    name: String,
    behavior: Arc<dyn Behavior>,
}

impl Action {
    /// Creates an action from a fallible closure.
    pub fn new<F>(name: impl Into<String>, behavior: F) -> Self
    where
        F: Fn() -> Result<(), ActionError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            behavior: Arc::new(behavior),
        }
    }

    /// Creates an action from a closure that cannot fail.
    pub fn infallible<F>(name: impl Into<String>, behavior: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::new(name, move || {
            behavior();
            Ok(())
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the behavior.
    ///
    /// A panic inside the behavior is reported as a failure of this action.
    pub fn execute(&self) -> Result<(), CoreError> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.behavior.execute()));
        let reason = match outcome {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(e)) => e.reason,
            Err(payload) => panic_message(payload.as_ref()),
        };
        Err(CoreError::ActionFailed {
            action: self.name.clone(),
            reason,
        })
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action").field("name", &self.name).finish()
    }
}

/// Runs actions in order, stopping at the first failure.
pub fn execute_all(actions: &[Action]) -> Result<(), CoreError> {
    actions.iter().try_for_each(Action::execute)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}
