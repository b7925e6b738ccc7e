//! End-to-end trigger throughput benchmarks.

use activefsm_core::{Action, State, StateGraph, Transition};
use activefsm_engine::{Engine, EngineConfig, EngineEvent, GuardPolicy};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::Duration;

const BATCH: usize = 256;

/// Two states toggled by "flip", with one action at each protocol step.
fn toggle_graph() -> StateGraph {
    let noop = |name: &str| Action::infallible(name, || {});
    StateGraph::new(vec![
        State::initial("On")
            .with_exit_action(noop("exit_on"))
            .with_entry_action(noop("enter_on"))
            .with_transition(
                Transition::new("TurnOff", "On", "Off", "flip")
                    .with_guard(noop("guard"))
                    .with_action(noop("act")),
            ),
        State::new("Off")
            .with_exit_action(noop("exit_off"))
            .with_entry_action(noop("enter_off"))
            .with_transition(
                Transition::new("TurnOn", "Off", "On", "flip")
                    .with_guard(noop("guard"))
                    .with_action(noop("act")),
            ),
    ])
    .unwrap()
}

fn start_engine(policy: GuardPolicy, subscribers: usize) -> Engine {
    let config = EngineConfig::new("bench")
        .with_queue_capacity(BATCH)
        .with_guard_policy(policy);
    let engine = Engine::with_config(toggle_graph(), config).unwrap();
    for _ in 0..subscribers {
        engine.subscribe(|e: &EngineEvent| {
            black_box(e);
        });
    }
    engine.start().unwrap();
    engine
}

fn run_batch(engine: &Engine, trigger: &str) {
    for _ in 0..BATCH {
        engine.enter_trigger(trigger).unwrap();
    }
    assert!(engine.wait_idle(Duration::from_secs(10)));
}

fn bench_transitions(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_transitions");
    group.throughput(Throughput::Elements(BATCH as u64));

    for (label, policy) in [
        ("advisory", GuardPolicy::Advisory),
        ("enforcing", GuardPolicy::Enforcing),
    ] {
        let engine = start_engine(policy, 0);
        group.bench_function(label, |b| b.iter(|| run_batch(&engine, "flip")));
        engine.stop().unwrap();
    }

    group.finish();
}

fn bench_ignored_triggers(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_ignored");
    group.throughput(Throughput::Elements(BATCH as u64));

    let engine = start_engine(GuardPolicy::Advisory, 0);
    group.bench_function("unmatched", |b| b.iter(|| run_batch(&engine, "unknown")));
    engine.stop().unwrap();

    group.finish();
}

fn bench_subscribers(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_subscribers");
    group.throughput(Throughput::Elements(BATCH as u64));

    for subscribers in [1usize, 4, 16] {
        let engine = start_engine(GuardPolicy::Advisory, subscribers);
        group.bench_with_input(
            BenchmarkId::from_parameter(subscribers),
            &subscribers,
            |b, _| b.iter(|| run_batch(&engine, "flip")),
        );
        engine.stop().unwrap();
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_transitions,
    bench_ignored_triggers,
    bench_subscribers
);
criterion_main!(benches);
