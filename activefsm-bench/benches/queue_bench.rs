//! Trigger queue benchmarks.

use activefsm_engine::TriggerQueue;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use std::thread;

fn bench_push_pop(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_push_pop");
    group.throughput(Throughput::Elements(1));

    let queue = TriggerQueue::new(16);
    group.bench_function("single_thread", |b| {
        b.iter(|| {
            queue.push(black_box("go")).unwrap();
            let trigger = queue.pop().unwrap();
            queue.task_done();
            black_box(trigger)
        });
    });

    group.finish();
}

fn bench_rejection(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_rejection");

    let queue = TriggerQueue::new(1);
    queue.push("filler").unwrap();
    group.bench_function("full", |b| {
        b.iter(|| black_box(queue.push(black_box("go")).is_err()));
    });

    group.finish();
}

fn bench_producers(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_producers");
    let per_producer = 1_000;

    for producers in [1usize, 2, 4] {
        group.throughput(Throughput::Elements((producers * per_producer) as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(producers),
            &producers,
            |b, &producers| {
                b.iter(|| {
                    let queue = Arc::new(TriggerQueue::new(producers * per_producer));
                    let consumer = {
                        let queue = queue.clone();
                        thread::spawn(move || {
                            let mut seen = 0usize;
                            while queue.pop().is_some() {
                                queue.task_done();
                                seen += 1;
                            }
                            seen
                        })
                    };

                    let handles: Vec<_> = (0..producers)
                        .map(|_| {
                            let queue = queue.clone();
                            thread::spawn(move || {
                                for _ in 0..per_producer {
                                    queue.push("tick").unwrap();
                                }
                            })
                        })
                        .collect();
                    for handle in handles {
                        handle.join().unwrap();
                    }

                    queue.wait_idle(std::time::Duration::from_secs(10));
                    queue.close();
                    black_box(consumer.join().unwrap())
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_push_pop, bench_rejection, bench_producers);
criterion_main!(benches);
