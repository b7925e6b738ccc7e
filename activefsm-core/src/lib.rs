//! # activefsm-core
//!
//! Data model for activefsm.
//!
//! This crate provides:
//! - Named actions with fallible, panic-safe execution
//! - Transitions with guard and transition actions
//! - States with entry/exit actions and trigger-keyed transitions
//! - The validated state graph an engine runs on

pub mod action;
pub mod error;
pub mod graph;
pub mod state;
pub mod transition;

pub use action::{Action, Behavior};
pub use error::{ActionError, CoreError};
pub use graph::StateGraph;
pub use state::State;
pub use transition::Transition;
