//! The engine: owns the state graph, the trigger queue and the worker
//! lifecycle.

use crate::bus::{EventBus, Subscriber};
use crate::chain::{ChainFilter, TriggerForwarder};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::event::{names, EngineEvent, Severity};
use crate::gate::{Latch, PauseGate};
use crate::lifecycle::EngineState;
use crate::queue::TriggerQueue;
use crate::stats::{EngineStats, StatsSnapshot};
use crate::worker::{self, WorkerHandle};
use activefsm_core::StateGraph;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};
use std::time::Duration;
use tokio::sync::broadcast;

/// Current and previous state names.
#[derive(Debug, Clone)]
pub(crate) struct Cursor {
    pub(crate) current: String,
    /// `None` until the first state change.
    pub(crate) previous: Option<String>,
}

/// Eventually consistent view of the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub current: String,
    pub previous: Option<String>,
    pub lifecycle: EngineState,
}

/// State shared between engine handles and the worker thread.
pub(crate) struct Shared {
    pub(crate) graph: StateGraph,
    pub(crate) cursor: RwLock<Cursor>,
    pub(crate) queue: TriggerQueue,
    pub(crate) gate: PauseGate,
    pub(crate) lifecycle: Mutex<EngineState>,
    pub(crate) bus: EventBus,
    pub(crate) config: EngineConfig,
    pub(crate) stats: EngineStats,
    /// Set once on stop; interrupts restart backoff.
    pub(crate) wake: Latch,
    /// Set by `start()` once STARTED is published; the worker waits for it.
    pub(crate) launched: Latch,
    /// Set when the worker thread exits.
    pub(crate) finished: Latch,
    pub(crate) worker_thread: Mutex<Option<ThreadId>>,
    cancelled: AtomicBool,
}

impl Shared {
    pub(crate) fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub(crate) fn on_worker_thread(&self) -> bool {
        *self.worker_thread.lock() == Some(thread::current().id())
    }

    pub(crate) fn emit(&self, name: &str, info: impl Into<String>) {
        self.emit_with(name, info, Severity::Info);
    }

    pub(crate) fn emit_with(&self, name: &str, info: impl Into<String>, severity: Severity) {
        self.bus.publish(
            EngineEvent::system(name, info, self.config.name.as_str()).with_severity(severity),
        );
    }
}

struct EngineInner {
    shared: Arc<Shared>,
    /// Held only to spawn or take the handle, never across a join.
    worker: Mutex<Option<WorkerHandle>>,
}

impl Drop for EngineInner {
    fn drop(&mut self) {
        // Last handle gone: let a running worker wind down on its own.
        let shared = &self.shared;
        shared.cancel();
        shared.queue.close();
        shared.queue.drain();
        shared.gate.open();
        shared.wake.set();
        shared.launched.set();
    }
}

/// An active state machine.
///
/// Cloning yields another handle to the same engine.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

/// Non-owning engine handle.
#[derive(Clone)]
pub struct WeakEngine {
    inner: Weak<EngineInner>,
}

impl WeakEngine {
    pub fn upgrade(&self) -> Option<Engine> {
        self.inner.upgrade().map(|inner| Engine { inner })
    }
}

impl Engine {
    /// Creates an engine with default configuration and the given queue capacity.
    pub fn new(graph: StateGraph, queue_capacity: usize) -> Result<Self, EngineError> {
        Self::with_config(
            graph,
            EngineConfig::default().with_queue_capacity(queue_capacity),
        )
    }

    /// Creates an engine. The worker is not started.
    pub fn with_config(graph: StateGraph, config: EngineConfig) -> Result<Self, EngineError> {
        config
            .validate()
            .map_err(|e| EngineError::InvalidConfig(e.to_string()))?;

        for transition in graph.dangling_targets() {
            tracing::warn!(
                "Transition '{}' targets unknown state '{}'",
                transition.name(),
                transition.target()
            );
        }

        let cursor = Cursor {
            current: graph.initial_name().to_string(),
            previous: None,
        };

        let shared = Arc::new(Shared {
            cursor: RwLock::new(cursor),
            queue: TriggerQueue::new(config.queue_capacity),
            gate: PauseGate::new(),
            lifecycle: Mutex::new(EngineState::Initialized),
            bus: EventBus::new(config.event_channel_capacity),
            stats: EngineStats::default(),
            wake: Latch::new(),
            launched: Latch::new(),
            finished: Latch::new(),
            worker_thread: Mutex::new(None),
            cancelled: AtomicBool::new(false),
            graph,
            config,
        });

        tracing::info!(
            "Engine '{}' initialized: {} states, initial state '{}', queue capacity {}",
            shared.config.name,
            shared.graph.len(),
            shared.graph.initial_name(),
            shared.config.queue_capacity
        );
        shared.emit(names::INITIALIZED, "System ready to start");
        shared.bus.publish(EngineEvent::command(
            names::ON_INIT,
            "StateMachineInitialized",
            shared.config.name.as_str(),
        ));

        Ok(Self {
            inner: Arc::new(EngineInner {
                shared,
                worker: Mutex::new(None),
            }),
        })
    }

    fn shared(&self) -> &Shared {
        &self.inner.shared
    }

    pub fn downgrade(&self) -> WeakEngine {
        WeakEngine {
            inner: Arc::downgrade(&self.inner),
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Spawns the worker. A no-op while running or paused.
    pub fn start(&self) -> Result<(), EngineError> {
        let shared = &self.inner.shared;
        // Checked before taking the worker lock, so an action calling
        // start() on its own engine never waits on a concurrent stop().
        Self::check_startable(shared, *shared.lifecycle.lock())?;

        {
            let mut worker = self.inner.worker.lock();
            let mut lifecycle = shared.lifecycle.lock();
            if *lifecycle != EngineState::Initialized {
                return Self::check_startable(shared, *lifecycle);
            }

            let handle = worker::spawn(shared.clone()).map_err(EngineError::Spawn)?;
            *worker = Some(handle);
            *lifecycle = EngineState::Running;
        }

        tracing::info!("Engine '{}' running", shared.config.name);
        shared.emit(names::STARTED, "System running");
        shared.launched.set();
        Ok(())
    }

    fn check_startable(shared: &Shared, state: EngineState) -> Result<(), EngineError> {
        match state {
            EngineState::Initialized => Ok(()),
            state if state.is_active() => {
                tracing::debug!("Engine '{}' already {}", shared.config.name, state);
                Ok(())
            }
            state => Err(EngineError::InvalidLifecycle {
                operation: "start",
                state,
            }),
        }
    }

    /// Closes the pause gate. The transition in progress, if any, completes.
    pub fn pause(&self) -> Result<(), EngineError> {
        let shared = self.shared();
        {
            let mut lifecycle = shared.lifecycle.lock();
            if *lifecycle != EngineState::Running {
                return Err(EngineError::InvalidLifecycle {
                    operation: "pause",
                    state: *lifecycle,
                });
            }
            shared.gate.close();
            *lifecycle = EngineState::Paused;
        }

        tracing::info!("Engine '{}' paused", shared.config.name);
        shared.emit(names::PAUSED, "System waiting");
        Ok(())
    }

    /// Reopens the pause gate; queued triggers are processed in order.
    pub fn resume(&self) -> Result<(), EngineError> {
        let shared = self.shared();
        {
            let mut lifecycle = shared.lifecycle.lock();
            if *lifecycle != EngineState::Paused {
                return Err(EngineError::InvalidLifecycle {
                    operation: "resume",
                    state: *lifecycle,
                });
            }
            shared.gate.open();
            *lifecycle = EngineState::Running;
        }

        tracing::info!("Engine '{}' resumed", shared.config.name);
        shared.emit(names::RESUMED, "System running");
        Ok(())
    }

    /// Cancels the worker, discards queued triggers and waits for the
    /// worker to exit (bounded by the configured shutdown timeout).
    ///
    /// The lifecycle is `Stopping` during the wait and `Stopped` afterwards,
    /// even if the wait times out. A concurrent second call waits for the
    /// same worker exit.
    pub fn stop(&self) -> Result<(), EngineError> {
        let shared = self.shared();
        let timeout = shared.config.shutdown_timeout();

        let already_stopped = {
            let mut lifecycle = shared.lifecycle.lock();
            match *lifecycle {
                EngineState::Initialized => {
                    return Err(EngineError::InvalidLifecycle {
                        operation: "stop",
                        state: EngineState::Initialized,
                    });
                }
                EngineState::Stopping => {
                    drop(lifecycle);
                    return worker::await_exit(shared, timeout);
                }
                EngineState::Stopped => true,
                EngineState::Running | EngineState::Paused => {
                    *lifecycle = EngineState::Stopping;
                    false
                }
            }
        };

        shared.cancel();
        shared.queue.close();
        let discarded = shared.queue.drain().len();
        EngineStats::add(&shared.stats.triggers_discarded, discarded as u64);
        shared.gate.open();
        shared.wake.set();
        shared.launched.set();

        let handle = self.inner.worker.lock().take();
        let joined = match handle {
            Some(handle) => handle.join(shared, timeout),
            None => Ok(()),
        };
        *shared.lifecycle.lock() = EngineState::Stopped;

        if let Err(ref e) = joined {
            tracing::error!("Engine '{}': {}", shared.config.name, e);
        }
        if already_stopped {
            return joined;
        }

        tracing::info!(
            "Engine '{}' stopped ({} queued triggers discarded)",
            shared.config.name,
            discarded
        );
        let severity = if joined.is_ok() {
            Severity::Info
        } else {
            Severity::Error
        };
        shared.emit_with(
            names::STOPPED,
            format!(
                "System execution stopped ({} queued triggers discarded)",
                discarded
            ),
            severity,
        );
        joined
    }

    // =========================================================================
    // Triggers and events
    // =========================================================================

    /// Queues a trigger for the worker.
    ///
    /// Never blocks: a full or closed queue rejects the trigger, which is
    /// also reported as an error event.
    pub fn enter_trigger(&self, trigger: impl Into<String>) -> Result<(), EngineError> {
        let shared = self.shared();
        let trigger = trigger.into();

        match shared.queue.push(trigger.as_str()) {
            Ok(()) => {
                EngineStats::incr(&shared.stats.triggers_accepted);
                tracing::debug!("Trigger '{}' entered", trigger);
                shared.emit(names::TRIGGER_ENTERED, trigger);
                Ok(())
            }
            Err(e) => {
                EngineStats::incr(&shared.stats.triggers_rejected);
                tracing::warn!("Trigger '{}' rejected: {}", trigger, e);
                shared.emit_with(
                    names::TRIGGER_REJECTED,
                    format!("{} - {}", trigger, e),
                    Severity::Error,
                );
                Err(EngineError::from_queue(&trigger, e))
            }
        }
    }

    /// Publishes a command event, typically from inside an action.
    pub fn raise_command(&self, name: impl Into<String>, info: impl Into<String>) {
        let shared = self.shared();
        shared
            .bus
            .publish(EngineEvent::command(name, info, shared.config.name.as_str()));
    }

    pub fn subscribe(&self, subscriber: impl Subscriber + 'static) -> String {
        self.shared().bus.subscribe(subscriber)
    }

    pub fn unsubscribe(&self, subscription_id: &str) -> bool {
        self.shared().bus.unsubscribe(subscription_id)
    }

    /// Returns a broadcast receiver for async consumers.
    pub fn subscribe_channel(&self) -> broadcast::Receiver<EngineEvent> {
        self.shared().bus.subscribe_channel()
    }

    pub fn bus(&self) -> &EventBus {
        &self.shared().bus
    }

    /// Feeds this engine's events into `target` as triggers.
    ///
    /// Returns the subscription id on this engine's bus.
    pub fn chain_to(&self, target: &Engine, filter: ChainFilter) -> String {
        tracing::debug!(
            "Chaining '{}' -> '{}' ({:?})",
            self.name(),
            target.name(),
            filter
        );
        self.subscribe(TriggerForwarder::new(target.downgrade(), filter))
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    pub fn name(&self) -> &str {
        &self.shared().config.name
    }

    pub fn config(&self) -> &EngineConfig {
        &self.shared().config
    }

    pub fn graph(&self) -> &StateGraph {
        &self.shared().graph
    }

    pub fn lifecycle(&self) -> EngineState {
        *self.shared().lifecycle.lock()
    }

    pub fn current_state(&self) -> String {
        self.shared().cursor.read().current.clone()
    }

    pub fn previous_state(&self) -> Option<String> {
        self.shared().cursor.read().previous.clone()
    }

    pub fn snapshot(&self) -> StateSnapshot {
        let cursor = self.shared().cursor.read().clone();
        StateSnapshot {
            current: cursor.current,
            previous: cursor.previous,
            lifecycle: self.lifecycle(),
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared().stats.snapshot()
    }

    pub fn queue_len(&self) -> usize {
        self.shared().queue.len()
    }

    /// Waits until every accepted trigger has been processed or discarded.
    ///
    /// Returns false on timeout.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        self.shared().queue.wait_idle(timeout)
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("name", &self.name())
            .field("lifecycle", &self.lifecycle())
            .field("current_state", &self.current_state())
            .field("queue_len", &self.queue_len())
            .finish()
    }
}
