use chrono::{TimeZone, Utc};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use visit_tracker::models::{Coordinate, Fix};
use visit_tracker::services::{GeocodeScheduler, MovementGate, MovementSignal};

/// A slow eastward walk with a few meters of GPS jitter, one fix per second.
fn jittery_walk(len: usize) -> Vec<Fix> {
    let start = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
    (0..len)
        .map(|i| {
            let jitter = ((i * 7919) % 11) as f64 * 0.000_005 - 0.000_025;
            let coordinate = Coordinate::new(37.4 + jitter, -122.1 + i as f64 * 0.000_012);
            Fix::new(coordinate, start + chrono::Duration::seconds(i as i64))
        })
        .collect()
}

fn benchmark_movement_gate(c: &mut Criterion) {
    let walk = jittery_walk(3_600);

    let mut group = c.benchmark_group("movement");

    group.bench_function("gate_one_hour_walk", |b| {
        b.iter(|| {
            let mut gate = MovementGate::default();
            let mut moved = 0usize;
            for fix in &walk {
                if matches!(gate.observe(black_box(fix)), MovementSignal::Moved { .. }) {
                    moved += 1;
                }
            }
            moved
        })
    });

    group.bench_function("gate_and_schedule_one_hour_walk", |b| {
        b.iter(|| {
            let mut gate = MovementGate::default();
            let mut scheduler = GeocodeScheduler::default();
            let mut issued = 0usize;
            for (i, fix) in walk.iter().enumerate() {
                match gate.observe(black_box(fix)) {
                    MovementSignal::FirstFix(fix) => {
                        scheduler.first_fix(fix);
                        issued += 1;
                    }
                    MovementSignal::Moved { fix, .. } => scheduler.offer(fix),
                    MovementSignal::Stationary { .. } => {}
                }
                if i % 5 == 4 && scheduler.on_tick().is_some() {
                    issued += 1;
                }
            }
            issued
        })
    });

    group.finish();
}

criterion_group!(benches, benchmark_movement_gate);
criterion_main!(benches);
