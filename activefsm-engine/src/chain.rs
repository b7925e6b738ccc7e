//! Engine-to-engine chaining: one engine's events become another
//! engine's triggers.

use crate::bus::Subscriber;
use crate::engine::WeakEngine;
use crate::event::{names, EngineEvent};

/// Which events a chain forwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChainFilter {
    /// Every event except trigger intake (`TriggerEntered`,
    /// `TriggerRejected`) becomes a trigger.
    #[default]
    All,
    /// Only command events are forwarded.
    Commands,
}

impl ChainFilter {
    /// Trigger intake events are never forwarded; the target would
    /// otherwise echo them back through a two-way chain forever.
    pub fn accepts(&self, event: &EngineEvent) -> bool {
        if event.name == names::TRIGGER_ENTERED || event.name == names::TRIGGER_REJECTED {
            return false;
        }
        match self {
            ChainFilter::All => true,
            ChainFilter::Commands => event.is_command(),
        }
    }
}

/// Subscriber that enters event names into a target engine.
pub struct TriggerForwarder {
    target: WeakEngine,
    filter: ChainFilter,
}

impl TriggerForwarder {
    pub fn new(target: WeakEngine, filter: ChainFilter) -> Self {
        Self { target, filter }
    }
}

impl Subscriber for TriggerForwarder {
    fn on_event(&self, event: &EngineEvent) {
        if !self.filter.accepts(event) {
            return;
        }
        let Some(target) = self.target.upgrade() else {
            tracing::trace!("Chain target dropped, skipping '{}'", event.name);
            return;
        };
        // Rejections are already reported on the target's own bus.
        let _ = target.enter_trigger(event.name.as_str());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EngineConfig, RestartConfig};
    use crate::engine::Engine;
    use activefsm_core::{Action, State, StateGraph, Transition};
    use std::time::{Duration, Instant};

    const WAIT: Duration = Duration::from_secs(5);

    fn config(name: &str) -> EngineConfig {
        EngineConfig::new(name).with_restart(RestartConfig {
            backoff_ms: 0,
            ..Default::default()
        })
    }

    fn wait_for_state(engine: &Engine, state: &str) -> bool {
        let deadline = Instant::now() + WAIT;
        while Instant::now() < deadline {
            if engine.current_state() == state {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn test_filter_skips_intake_events() {
        let entered = EngineEvent::system(names::TRIGGER_ENTERED, "go", "a");
        let rejected = EngineEvent::system(names::TRIGGER_REJECTED, "go", "a");
        let started = EngineEvent::system(names::STARTED, "", "a");
        let command = EngineEvent::command("Arm", "", "a");

        assert!(!ChainFilter::All.accepts(&entered));
        assert!(!ChainFilter::All.accepts(&rejected));
        assert!(ChainFilter::All.accepts(&started));
        assert!(ChainFilter::All.accepts(&command));

        assert!(!ChainFilter::Commands.accepts(&started));
        assert!(ChainFilter::Commands.accepts(&command));
    }

    #[test]
    fn test_state_change_event_drives_target() {
        let source = Engine::with_config(
            StateGraph::new(vec![
                State::initial("Idle")
                    .with_transition(Transition::new("T1", "Idle", "Active", "go")),
                State::new("Active"),
            ])
            .unwrap(),
            config("source"),
        )
        .unwrap();

        let target = Engine::with_config(
            StateGraph::new(vec![
                State::initial("Waiting").with_transition(Transition::new(
                    "Follow",
                    "Waiting",
                    "Following",
                    names::STATE_CHANGE_COMPLETED,
                )),
                State::new("Following"),
            ])
            .unwrap(),
            config("target"),
        )
        .unwrap();

        let sub_id = source.chain_to(&target, ChainFilter::All);
        assert!(sub_id.starts_with("sub-"));

        target.start().unwrap();
        source.start().unwrap();
        source.enter_trigger("go").unwrap();

        assert!(wait_for_state(&target, "Following"));
        assert_eq!(source.current_state(), "Active");

        source.stop().unwrap();
        target.stop().unwrap();
    }

    #[test]
    fn test_commands_from_actions_drive_target() {
        let alarm = Engine::with_config(
            StateGraph::new(vec![
                State::initial("Disarmed")
                    .with_transition(Transition::new("Arm", "Disarmed", "Armed", "ArmAlarm")),
                State::new("Armed"),
            ])
            .unwrap(),
            config("alarm"),
        )
        .unwrap();

        // The door engine is built after the alarm, so its action reaches
        // it through a weak handle set up once both exist.
        let door_handle = std::sync::Arc::new(parking_lot::Mutex::new(None::<WeakEngine>));
        let h = door_handle.clone();
        let raise = Action::infallible("raise_arm", move || {
            if let Some(door) = h.lock().as_ref().and_then(WeakEngine::upgrade) {
                door.raise_command("ArmAlarm", "door locked");
            }
        });

        let door = Engine::with_config(
            StateGraph::new(vec![
                State::initial("Open")
                    .with_transition(Transition::new("Lock", "Open", "Locked", "lock")),
                State::new("Locked").with_entry_action(raise),
            ])
            .unwrap(),
            config("door"),
        )
        .unwrap();
        *door_handle.lock() = Some(door.downgrade());

        door.chain_to(&alarm, ChainFilter::Commands);
        alarm.start().unwrap();
        door.start().unwrap();
        door.enter_trigger("lock").unwrap();

        assert!(wait_for_state(&alarm, "Armed"));
        assert!(alarm.wait_idle(WAIT));
        // Only the command was forwarded.
        assert_eq!(alarm.stats().triggers_accepted, 1);

        door.stop().unwrap();
        alarm.stop().unwrap();
    }

    #[test]
    fn test_dropped_target_is_skipped() {
        let graph = || StateGraph::new(vec![State::initial("Idle")]).unwrap();
        let source = Engine::with_config(graph(), config("source")).unwrap();
        let target = Engine::with_config(graph(), config("target")).unwrap();

        source.chain_to(&target, ChainFilter::All);
        let weak = target.downgrade();
        drop(target);
        assert!(weak.upgrade().is_none());

        source.raise_command("Anything", "");
        assert_eq!(source.bus().subscriber_count(), 1);
    }
}
