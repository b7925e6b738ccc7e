//! The worker thread: drains the trigger queue and runs the transition
//! protocol, one trigger at a time.
//!
//! The thread hosts a supervisor. Each worker incarnation runs until the
//! queue closes or an action fails; after a failure the incarnation is
//! dropped before a fresh one is created, subject to the restart policy.

use crate::config::GuardPolicy;
use crate::engine::Shared;
use crate::error::EngineError;
use crate::event::{names, Severity};
use crate::lifecycle::EngineState;
use crate::stats::EngineStats;
use activefsm_core::action::execute_all;
use activefsm_core::{CoreError, State, Transition};
use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Handle to a running worker thread.
pub(crate) struct WorkerHandle {
    thread: JoinHandle<()>,
}

impl WorkerHandle {
    /// Waits for the worker to finish. `None` waits forever.
    ///
    /// On timeout the thread is detached; it exits at its next
    /// cancellation check.
    pub(crate) fn join(self, shared: &Shared, timeout: Option<Duration>) -> Result<(), EngineError> {
        if shared.on_worker_thread() {
            return Ok(());
        }
        await_exit(shared, timeout)?;
        if self.thread.join().is_err() {
            tracing::error!("Worker thread panicked during shutdown");
        }
        Ok(())
    }
}

/// Waits for the worker thread to signal its exit.
///
/// Returns immediately when called from the worker thread itself, e.g. by
/// an action or a subscriber stopping its own engine.
pub(crate) fn await_exit(shared: &Shared, timeout: Option<Duration>) -> Result<(), EngineError> {
    if shared.on_worker_thread() || shared.finished.wait(timeout) {
        return Ok(());
    }
    Err(EngineError::ShutdownTimeout {
        timeout: timeout.unwrap_or_default(),
    })
}

/// Sets `finished` when the worker thread exits, however it exits.
struct DoneGuard(Arc<Shared>);

impl Drop for DoneGuard {
    fn drop(&mut self) {
        self.0.finished.set();
    }
}

/// Spawns the worker thread.
///
/// The thread does nothing until `shared.launched` is set, so the engine
/// can announce the start before any worker event.
pub(crate) fn spawn(shared: Arc<Shared>) -> std::io::Result<WorkerHandle> {
    let guard = DoneGuard(shared.clone());
    let thread = thread::Builder::new()
        .name(format!("{}-worker", shared.config.name))
        .spawn(move || {
            let guard = guard;
            guard.0.launched.wait(None);
            supervise(&guard.0);
        })?;
    *shared.worker_thread.lock() = Some(thread.thread().id());
    Ok(WorkerHandle { thread })
}

/// A failed trigger, still owed a `task_done`.
struct Fault {
    trigger: String,
    error: CoreError,
}

fn supervise(shared: &Shared) {
    let restart = &shared.config.restart;
    let mut recent_restarts: VecDeque<Instant> = VecDeque::new();
    let mut incarnation: u64 = 0;

    loop {
        incarnation += 1;
        tracing::info!("Worker {} started for '{}'", incarnation, shared.config.name);

        let fault = match Worker::new(shared).run() {
            Ok(()) => {
                tracing::info!("Worker {} exited", incarnation);
                return;
            }
            Err(fault) => fault,
        };

        EngineStats::incr(&shared.stats.worker_faults);
        tracing::error!(
            "Worker {} failed on trigger '{}': {}",
            incarnation,
            fault.trigger,
            fault.error
        );
        shared.emit_with(
            names::WORKER_FAULT,
            format!(
                "Processing canceled on trigger '{}'! {}",
                fault.trigger, fault.error
            ),
            Severity::Error,
        );

        if shared.is_cancelled() {
            shared.queue.task_done();
            return;
        }

        let now = Instant::now();
        while let Some(first) = recent_restarts.front() {
            if now.duration_since(*first) > restart.window() {
                recent_restarts.pop_front();
            } else {
                break;
            }
        }

        let exhausted = !restart.is_unlimited()
            && recent_restarts.len() >= restart.max_restarts as usize;
        if !restart.enabled || exhausted {
            let reason = if restart.enabled {
                format!(
                    "{} restarts within {}s, giving up",
                    recent_restarts.len(),
                    restart.window_secs
                )
            } else {
                "automatic restart is disabled".to_string()
            };
            give_up(shared, &reason);
            shared.queue.task_done();
            return;
        }

        recent_restarts.push_back(now);
        shared.emit_with(
            names::WORKER_RESTARTING,
            format!(
                "Restart {} in {}ms",
                recent_restarts.len(),
                restart.backoff_ms
            ),
            Severity::Warning,
        );
        shared.queue.task_done();

        if !restart.backoff().is_zero() && shared.wake.wait(Some(restart.backoff())) {
            return;
        }
        if shared.is_cancelled() {
            return;
        }
        EngineStats::incr(&shared.stats.worker_restarts);

        // A restart while paused stays silent; RESUMED announces the worker.
        if *shared.lifecycle.lock() == EngineState::Running {
            shared.emit(
                names::STARTED,
                format!("System running (restart {})", incarnation),
            );
        } else {
            tracing::debug!("Worker restarted while paused");
        }
    }
}

/// Stops the engine from the worker side once restarts are exhausted.
fn give_up(shared: &Shared, reason: &str) {
    shared.cancel();
    shared.queue.close();
    let discarded = shared.queue.drain().len();
    EngineStats::add(&shared.stats.triggers_discarded, discarded as u64);
    shared.gate.open();

    {
        let mut lifecycle = shared.lifecycle.lock();
        if matches!(*lifecycle, EngineState::Stopping | EngineState::Stopped) {
            // stop() is already underway and announces the stop itself.
            return;
        }
        *lifecycle = EngineState::Stopped;
    }

    tracing::error!("Worker for '{}' not restarted: {}", shared.config.name, reason);
    shared.emit_with(names::RESTART_LIMIT_REACHED, reason, Severity::Error);
    shared.emit_with(
        names::STOPPED,
        format!(
            "System execution stopped after worker fault ({} queued triggers discarded)",
            discarded
        ),
        Severity::Error,
    );
}

/// One worker incarnation.
struct Worker<'a> {
    shared: &'a Shared,
}

impl<'a> Worker<'a> {
    fn new(shared: &'a Shared) -> Self {
        Self { shared }
    }

    fn run(&self) -> Result<(), Fault> {
        let shared = self.shared;
        loop {
            shared.gate.wait();
            if shared.is_cancelled() {
                return Ok(());
            }

            let Some(trigger) = shared.queue.pop() else {
                return Ok(());
            };

            // pause() may have landed while parked in pop(); hold the
            // trigger until resumed.
            shared.gate.wait();
            if shared.is_cancelled() {
                EngineStats::incr(&shared.stats.triggers_discarded);
                shared.queue.task_done();
                return Ok(());
            }

            let result = self.process(&trigger);
            EngineStats::incr(&shared.stats.triggers_processed);
            match result {
                Ok(()) => shared.queue.task_done(),
                Err(error) => return Err(Fault { trigger, error }),
            }
        }
    }

    fn process(&self, trigger: &str) -> Result<(), CoreError> {
        let shared = self.shared;
        let current_name = shared.cursor.read().current.clone();
        let transition = shared
            .graph
            .state(&current_name)
            .and_then(|state| state.transition_for(trigger).map(|t| (state, t)));

        match transition {
            Some((state, transition)) => {
                tracing::debug!(
                    "Trigger '{}' matched transition '{}' in state '{}'",
                    trigger,
                    transition.name(),
                    current_name
                );
                self.execute_transition(state, transition)
            }
            None => {
                tracing::debug!(
                    "Trigger '{}' has no transition from state '{}'",
                    trigger,
                    current_name
                );
                EngineStats::incr(&shared.stats.triggers_ignored);
                Ok(())
            }
        }
    }

    /// Runs one transition: validation, exit actions, guards, transition
    /// actions, state swap, entry actions.
    ///
    /// Validation failures are reported and swallowed; action failures
    /// propagate.
    fn execute_transition(&self, current: &State, transition: &Transition) -> Result<(), CoreError> {
        let shared = self.shared;

        let target = match self.resolve(current, transition) {
            Ok(target) => target,
            Err(e) => {
                self.reject(transition, &e, Severity::Error);
                return Ok(());
            }
        };

        if shared.config.guard_policy == GuardPolicy::Enforcing {
            if let Err(e) = execute_all(transition.guards()) {
                self.reject(transition, &e, Severity::Warning);
                return Ok(());
            }
        }

        execute_all(current.exit_actions())?;

        if shared.config.guard_policy == GuardPolicy::Advisory {
            execute_all(transition.guards())?;
        }
        if self.abandoned(transition) {
            return Ok(());
        }
        shared.emit(
            names::GUARDS_EXECUTED,
            format!("{} guard actions executed", transition.guards().len()),
        );

        execute_all(transition.actions())?;
        if self.abandoned(transition) {
            return Ok(());
        }
        shared.emit(
            names::BEGIN_STATE_CHANGE,
            format!(
                "{} transition actions executed",
                transition.actions().len()
            ),
        );

        let previous = {
            let mut cursor = shared.cursor.write();
            let previous = std::mem::replace(&mut cursor.current, target.name().to_string());
            cursor.previous = Some(previous.clone());
            previous
        };

        execute_all(target.entry_actions())?;

        EngineStats::incr(&shared.stats.transitions_completed);
        tracing::debug!("State changed: {} -> {}", previous, target.name());
        if self.abandoned(transition) {
            return Ok(());
        }
        shared.emit(
            names::STATE_CHANGE_COMPLETED,
            format!("Previous state: {} - New state = {}", previous, target.name()),
        );
        Ok(())
    }

    /// True once the stop has been announced, which happens mid-transition
    /// when an action stops its own engine or `stop()` timed out. Nothing
    /// may change or be emitted after that.
    fn abandoned(&self, transition: &Transition) -> bool {
        if *self.shared.lifecycle.lock() != EngineState::Stopped {
            return false;
        }
        tracing::debug!(
            "Transition '{}' abandoned: engine stopped",
            transition.name()
        );
        true
    }

    fn resolve(&self, current: &State, transition: &Transition) -> Result<&'a State, CoreError> {
        if current.name() != transition.source() {
            return Err(CoreError::InvalidSourceState {
                transition: transition.name().to_string(),
                expected: transition.source().to_string(),
                actual: current.name().to_string(),
            });
        }

        self.shared
            .graph
            .state(transition.target())
            .ok_or_else(|| CoreError::UnknownTargetState {
                transition: transition.name().to_string(),
                target: transition.target().to_string(),
                current: current.name().to_string(),
            })
    }

    fn reject(&self, transition: &Transition, error: &CoreError, severity: Severity) {
        tracing::warn!("Transition '{}' rejected: {}", transition.name(), error);
        EngineStats::incr(&self.shared.stats.transitions_rejected);
        self.shared
            .emit_with(names::TRANSITION_REJECTED, error.to_string(), severity);
    }
}
