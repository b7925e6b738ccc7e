//! The validated set of states an engine operates on.

use crate::error::CoreError;
use crate::state::State;
use crate::transition::Transition;
use std::collections::HashMap;

/// Name-indexed set of states with exactly one default state.
///
/// Fixed after construction. Transition targets are not required to
/// resolve here; the engine checks them when a transition executes.
#[derive(Debug, Clone)]
pub struct StateGraph {
    states: HashMap<String, State>,
    initial: String,
}

impl StateGraph {
    /// Builds and validates a state graph.
    pub fn new(states: impl IntoIterator<Item = State>) -> Result<Self, CoreError> {
        let mut by_name = HashMap::new();
        let mut defaults = Vec::new();

        for state in states {
            if by_name.contains_key(state.name()) {
                return Err(CoreError::DuplicateState {
                    state: state.name().to_string(),
                });
            }
            if state.is_default() {
                defaults.push(state.name().to_string());
            }
            by_name.insert(state.name().to_string(), state);
        }

        if by_name.is_empty() {
            return Err(CoreError::EmptyGraph);
        }

        let initial = match defaults.len() {
            0 => return Err(CoreError::NoDefaultState),
            1 => defaults.remove(0),
            _ => {
                defaults.sort();
                return Err(CoreError::MultipleDefaultStates { states: defaults });
            }
        };

        let graph = Self {
            states: by_name,
            initial,
        };

        for (state, transition) in graph.misplaced_transitions() {
            tracing::warn!(
                "Transition '{}' is registered on state '{}' but declares source '{}'",
                transition.name(),
                state,
                transition.source()
            );
        }

        Ok(graph)
    }

    /// Returns the default state.
    pub fn initial(&self) -> &State {
        // Present by construction.
        &self.states[&self.initial]
    }

    pub fn initial_name(&self) -> &str {
        &self.initial
    }

    pub fn state(&self, name: &str) -> Option<&State> {
        self.states.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.states.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Returns state names, sorted.
    pub fn state_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.states.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Returns transitions whose target is not in the graph.
    pub fn dangling_targets(&self) -> Vec<&Transition> {
        self.states
            .values()
            .flat_map(State::transitions)
            .filter(|t| !self.states.contains_key(t.target()))
            .collect()
    }

    /// Returns `(owning state, transition)` pairs whose declared source
    /// differs from the state that owns them.
    fn misplaced_transitions(&self) -> Vec<(&str, &Transition)> {
        self.states
            .values()
            .flat_map(|s| s.transitions().map(move |t| (s.name(), t)))
            .filter(|(owner, t)| *owner != t.source())
            .collect()
    }
}
