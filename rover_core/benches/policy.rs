use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use rover_core::mocks::{RecordingBuzzer, RecordingDrive};
use rover_core::{ControlLoop, LatestDistance, MotorCommand, MotorController, SafetyPolicy};

// Synthetic operator input plus a distance trace that sweeps through the
// near and warn bands.
fn synth_inputs(n: usize, seed: u32) -> Vec<(MotorCommand, f64)> {
    // tiny PRNG
    let mut state = seed.max(1);
    let mut next_f64 = || {
        let mut x = state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        state = x;
        f64::from(x) / (f64::from(u32::MAX) + 1.0)
    };
    (0..n)
        .map(|i| {
            let cmd = MotorCommand::new(next_f64() * 2.0 - 1.0, next_f64() * 2.0 - 1.0);
            let t = i as f64 / 500.0;
            let distance_cm = 25.0 + 20.0 * t.sin();
            (cmd, distance_cm)
        })
        .collect()
}

fn tune(g: &mut criterion::BenchmarkGroup<'_, criterion::measurement::WallTime>) {
    //   BENCH_SAMPLE_SIZE=10 BENCH_MEAS_MS=50 cargo bench -p rover_core --bench policy
    if let Ok(ss) = std::env::var("BENCH_SAMPLE_SIZE") {
        if let Ok(n) = ss.parse::<usize>() {
            g.sample_size(n.max(1));
        }
    } else {
        g.sample_size(50);
    }
    if let Ok(ms) = std::env::var("BENCH_MEAS_MS")
        && let Ok(ms_u64) = ms.parse::<u64>()
    {
        g.measurement_time(std::time::Duration::from_millis(ms_u64));
    }
}

pub fn bench_decide(c: &mut Criterion) {
    let mut g = c.benchmark_group("policy");
    tune(&mut g);

    let inputs = synth_inputs(10_000, 0xC0FFEE);
    let policy = SafetyPolicy::default();
    g.bench_function("decide_10k", |b| {
        b.iter(|| {
            for &(cmd, d) in &inputs {
                black_box(policy.decide(black_box(cmd), black_box(d)));
            }
        })
    });
    g.finish();
}

pub fn bench_submit(c: &mut Criterion) {
    let mut g = c.benchmark_group("control_loop");
    tune(&mut g);

    let inputs = synth_inputs(1_000, 0xBEEF);
    g.bench_function("submit_1k", |b| {
        b.iter_batched(
            || {
                ControlLoop::new(
                    MotorController::new(RecordingDrive::new(), RecordingBuzzer::new()),
                    LatestDistance::new(),
                    SafetyPolicy::default(),
                )
            },
            |control| {
                for &(cmd, _) in &inputs {
                    let _ = black_box(control.submit(cmd));
                }
            },
            BatchSize::SmallInput,
        )
    });
    g.finish();
}

criterion_group!(policy, bench_decide, bench_submit);
criterion_main!(policy);
