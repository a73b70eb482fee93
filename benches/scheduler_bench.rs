use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use std::time::{Duration, Instant};

use tiered_sched::class::ProcessClass;
use tiered_sched::scheduler::SchedulerState;
use tiered_sched::{Process, TieredQueue};

fn filled_queue(count: usize) -> TieredQueue {
    let mut queue = TieredQueue::new();
    for i in 0..count {
        let class = if i % 2 == 0 {
            ProcessClass::Foreground
        } else {
            ProcessClass::Background
        };
        queue.admit(Process::new(class, Duration::from_millis(10)), class.is_foreground());
    }
    queue
}

fn bench_tiered_queue(c: &mut Criterion) {
    let mut group = c.benchmark_group("tiered_queue");

    group.bench_function("admit_background", |b| {
        b.iter_batched(
            || (filled_queue(100), Process::new(ProcessClass::Background, Duration::from_millis(10))),
            |(mut queue, process)| {
                queue.admit(black_box(process), false);
                queue
            },
            BatchSize::SmallInput,
        );
    });

    group.bench_function("remove", |b| {
        b.iter_batched(
            || filled_queue(100),
            |mut queue| {
                black_box(queue.remove().ok());
                queue
            },
            BatchSize::SmallInput,
        );
    });

    group.bench_function("promote", |b| {
        let mut queue = filled_queue(100);
        b.iter(|| {
            black_box(queue.promote());
        });
    });
}

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("wait_set");

    group.bench_function("tick_100_due", |b| {
        b.iter_batched(
            || {
                let now = Instant::now();
                let mut state = SchedulerState::default();
                for i in 0..100u64 {
                    state.admit_to_wait_set(Process::sleeping_until(
                        ProcessClass::Background,
                        Duration::from_millis(10),
                        now + Duration::from_micros(i),
                    ));
                }
                (state, now + Duration::from_millis(1))
            },
            |(mut state, now)| {
                black_box(state.tick(now));
                state
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_tiered_queue, bench_tick);
criterion_main!(benches);
