//! States and their outgoing transitions.

use crate::action::Action;
use crate::transition::Transition;
use std::collections::HashMap;

/// A named node in the transition graph.
#[derive(Debug, Clone)]
pub struct State {
    name: String,
    /// Outgoing transitions keyed by trigger.
    transitions: HashMap<String, Transition>,
    entry_actions: Vec<Action>,
    exit_actions: Vec<Action>,
    is_default: bool,
}

impl State {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transitions: HashMap::new(),
            entry_actions: Vec::new(),
            exit_actions: Vec::new(),
            is_default: false,
        }
    }

    /// Creates the state the engine starts in.
    pub fn initial(name: impl Into<String>) -> Self {
        Self {
            is_default: true,
            ..Self::new(name)
        }
    }

    /// Adds an outgoing transition, keyed by its trigger.
    ///
    /// A second transition for the same trigger replaces the first.
    pub fn with_transition(mut self, transition: Transition) -> Self {
        self.transitions
            .insert(transition.trigger().to_string(), transition);
        self
    }

    pub fn with_entry_action(mut self, action: Action) -> Self {
        self.entry_actions.push(action);
        self
    }

    pub fn with_exit_action(mut self, action: Action) -> Self {
        self.exit_actions.push(action);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_default(&self) -> bool {
        self.is_default
    }

    /// Returns the transition fired by `trigger` from this state.
    pub fn transition_for(&self, trigger: &str) -> Option<&Transition> {
        self.transitions.get(trigger)
    }

    pub fn transitions(&self) -> impl Iterator<Item = &Transition> {
        self.transitions.values()
    }

    pub fn entry_actions(&self) -> &[Action] {
        &self.entry_actions
    }

    pub fn exit_actions(&self) -> &[Action] {
        &self.exit_actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_lookup_by_trigger() {
        let state = State::initial("Idle")
            .with_transition(Transition::new("T1", "Idle", "Active", "go"))
            .with_transition(Transition::new("T2", "Idle", "Error", "fail"));

        assert!(state.is_default());
        assert_eq!(state.transition_for("go").unwrap().target(), "Active");
        assert_eq!(state.transition_for("fail").unwrap().name(), "T2");
        assert!(state.transition_for("unknown").is_none());
        assert_eq!(state.transitions().count(), 2);
    }

    #[test]
    fn test_same_trigger_replaces_transition() {
        let state = State::new("Idle")
            .with_transition(Transition::new("T1", "Idle", "Active", "go"))
            .with_transition(Transition::new("T1b", "Idle", "Error", "go"));

        assert!(!state.is_default());
        assert_eq!(state.transitions().count(), 1);
        assert_eq!(state.transition_for("go").unwrap().target(), "Error");
    }
}
