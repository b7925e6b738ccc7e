//! activefsm - Active State Machine Engine
//!
//! Runs a door engine chained to an alarm engine. Triggers are read from
//! stdin, one per line; `pause`, `resume`, `status` and `quit` control the
//! door engine.

use activefsm_core::{Action, State, StateGraph, Transition};
use activefsm_engine::config::CONFIG_ENV;
use activefsm_engine::{
    ChainFilter, Engine, EngineConfig, EngineError, EngineEvent, Severity, WeakEngine,
};
use std::sync::{Arc, OnceLock};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration (from file if ACTIVEFSM_CONFIG is set, then env overrides)
    let config = match EngineConfig::load() {
        Ok(c) => {
            if let Ok(path) = std::env::var(CONFIG_ENV) {
                tracing::info!("Loaded config from {}", path);
            }
            c
        }
        Err(e) => {
            if std::env::var(CONFIG_ENV).is_ok() {
                tracing::error!("Failed to load config: {}", e);
                return Err(e.into());
            }
            tracing::info!("Using default configuration");
            EngineConfig::default()
        }
    };

    tracing::info!("Starting activefsm");
    tracing::info!("  Queue capacity: {}", config.queue_capacity);
    tracing::info!("  Guard policy: {:?}", config.guard_policy);
    if config.restart.enabled {
        tracing::info!(
            "  Worker restart: enabled (max {} per {}s, backoff {}ms)",
            config.restart.max_restarts,
            config.restart.window_secs,
            config.restart.backoff_ms
        );
    } else {
        tracing::info!("  Worker restart: disabled");
    }

    let alarm = Engine::with_config(alarm_graph()?, named(&config, "alarm"))?;
    let door_handle = Arc::new(OnceLock::new());
    let door = Engine::with_config(door_graph(door_handle.clone())?, named(&config, "door"))?;
    let _ = door_handle.set(door.downgrade());

    door.subscribe(log_event);
    alarm.subscribe(log_event);
    door.chain_to(&alarm, ChainFilter::Commands);

    alarm.start()?;
    door.start()?;

    tracing::info!("Enter triggers (open, close, lock, unlock) or pause/resume/status/quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received shutdown signal, stopping engines...");
                break;
            }
        };
        let Some(line) = line else {
            break;
        };

        match line.trim() {
            "" => continue,
            "quit" | "exit" => break,
            "pause" => report(door.pause()),
            "resume" => report(door.resume()),
            "status" => {
                for engine in [&door, &alarm] {
                    let snapshot = engine.snapshot();
                    tracing::info!(
                        "{}: {} (previous {}), {}, {:?}",
                        engine.name(),
                        snapshot.current,
                        snapshot.previous.as_deref().unwrap_or("-"),
                        snapshot.lifecycle,
                        engine.stats()
                    );
                }
            }
            trigger => report(door.enter_trigger(trigger)),
        }
    }

    // Door first, so no command reaches a stopped alarm.
    report(door.stop());
    report(alarm.stop());

    tracing::info!("Engines stopped");
    Ok(())
}

fn named(base: &EngineConfig, suffix: &str) -> EngineConfig {
    let mut config = base.clone();
    config.name = format!("{}-{}", base.name, suffix);
    config
}

fn report(result: Result<(), EngineError>) {
    if let Err(e) = result {
        tracing::warn!("{} ({})", e, e.error_code());
    }
}

fn log_event(event: &EngineEvent) {
    match event.severity {
        Severity::Error => tracing::error!("[{}] {}: {}", event.source, event.name, event.info),
        Severity::Warning => tracing::warn!("[{}] {}: {}", event.source, event.name, event.info),
        Severity::Info => tracing::info!("[{}] {}: {}", event.source, event.name, event.info),
    }
}

/// Raises a command on the door engine once it exists.
fn raise(door: &Arc<OnceLock<WeakEngine>>, name: &'static str, info: &'static str) -> Action {
    let door = door.clone();
    Action::infallible(format!("raise_{}", name), move || {
        if let Some(engine) = door.get().and_then(WeakEngine::upgrade) {
            engine.raise_command(name, info);
        }
    })
}

fn door_graph(door: Arc<OnceLock<WeakEngine>>) -> Result<StateGraph, activefsm_core::CoreError> {
    StateGraph::new(vec![
        State::initial("Closed")
            .with_transition(Transition::new("Opening", "Closed", "Open", "open"))
            .with_transition(Transition::new("Locking", "Closed", "Locked", "lock")),
        State::new("Open")
            .with_transition(Transition::new("Closing", "Open", "Closed", "close")),
        State::new("Locked")
            .with_entry_action(raise(&door, "ArmAlarm", "door locked"))
            .with_exit_action(raise(&door, "DisarmAlarm", "door unlocked"))
            .with_transition(Transition::new("Unlocking", "Locked", "Closed", "unlock")),
    ])
}

fn alarm_graph() -> Result<StateGraph, activefsm_core::CoreError> {
    StateGraph::new(vec![
        State::initial("Disarmed")
            .with_transition(Transition::new("Arming", "Disarmed", "Armed", "ArmAlarm")),
        State::new("Armed")
            .with_transition(Transition::new("Disarming", "Armed", "Disarmed", "DisarmAlarm")),
    ])
}
