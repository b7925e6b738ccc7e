//! # activefsm-engine
//!
//! Active state machine engine for activefsm.
//!
//! This crate provides:
//! - A bounded, fail-fast trigger queue
//! - A single worker thread running the transition protocol
//! - Pause/resume/stop lifecycle with bounded shutdown
//! - Fault supervision with rate-limited restarts
//! - Synchronous notification events, plus a broadcast channel
//! - Engine-to-engine chaining

pub mod bus;
pub mod chain;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod gate;
pub mod lifecycle;
pub mod queue;
pub mod stats;
mod worker;

pub use bus::{EventBus, Subscriber};
pub use chain::{ChainFilter, TriggerForwarder};
pub use config::{ConfigError, EngineConfig, GuardPolicy, RestartConfig};
pub use engine::{Engine, StateSnapshot, WeakEngine};
pub use error::{EngineError, QueueError};
pub use event::{names, EngineEvent, EventType, Severity};
pub use gate::{Latch, PauseGate};
pub use lifecycle::EngineState;
pub use queue::TriggerQueue;
pub use stats::{EngineStats, StatsSnapshot};
