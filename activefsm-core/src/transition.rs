//! Transitions between named states.

use crate::action::Action;

/// An edge from one state to another, activated by a trigger.
#[derive(Debug, Clone)]
pub struct Transition {
    name: String,
    source: String,
    target: String,
    trigger: String,
    guards: Vec<Action>,
    actions: Vec<Action>,
}

impl Transition {
    pub fn new(
        name: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        trigger: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            target: target.into(),
            trigger: trigger.into(),
            guards: Vec::new(),
            actions: Vec::new(),
        }
    }

    /// Appends a guard action.
    pub fn with_guard(mut self, guard: Action) -> Self {
        self.guards.push(guard);
        self
    }

    /// Appends a transition action.
    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn trigger(&self) -> &str {
        &self.trigger
    }

    pub fn guards(&self) -> &[Action] {
        &self.guards
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }
}
