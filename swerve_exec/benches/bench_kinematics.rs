//! # Kinematics Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use swerve_lib::{
    drive_ctrl::{compute_module_targets, Params, NUM_MODULES},
    sim::SimRig,
};
use util::angle::Angle;

fn kinematics_benchmark(c: &mut Criterion) {
    let params = Params {
        prepare_settle_time_s: 0.0,
        ..Params::default()
    };
    let last_directions = [Angle::ZERO; NUM_MODULES];

    // ---- Module targets only ----

    c.bench_function("compute_module_targets", |b| {
        b.iter(|| {
            compute_module_targets(
                black_box(0.6),
                black_box(-0.4),
                black_box(0.7),
                &params,
                &last_directions,
            )
        })
    });

    // ---- Full drivetrain, targets plus module steering ----

    let (_rig, mut drive) = SimRig::build(params);

    // Alternate between requests which need the modules to reverse and which don't
    let requests = [(0.6, -0.4, 0.7), (-0.6, 0.4, -0.7), (0.0, 1.0, 0.0), (1.0, 0.0, 0.0)];
    let mut i = 0;

    c.bench_function("drive_components", |b| {
        b.iter(|| {
            let (f, s, r) = requests[i % requests.len()];
            i += 1;

            drive.drive_components(black_box(f), black_box(s), black_box(r))
        })
    });
}

criterion_group!(benches, kinematics_benchmark);
criterion_main!(benches);
