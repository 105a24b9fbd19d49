use std::sync::OnceLock;

use thermal::{Float, InitialFunction, SimulationProcessor, StepParams};

use criterion::{black_box, criterion_group, criterion_main, Criterion};

const N: usize = 239239;

static TS: OnceLock<Vec<Float>> = OnceLock::new();

fn field() -> &'static [Float] {
    TS.get_or_init(|| (0..N).map(|i| ((i * 7919) % 239) as Float / 239.0).collect())
}

fn benchmark_initial_functions(c: &mut Criterion) {
    for f in InitialFunction::ALL {
        c.bench_function(f.name(), |b| b.iter(|| f.generate(black_box(N))));
    }
}

fn benchmark_host_methods(c: &mut Criterion) {
    let processor = SimulationProcessor::host_only();
    let params = StepParams::new(1.0, 1.0, 0.2, 1.0);

    for name in processor.get_method_names().unwrap() {
        c.bench_function(&name, |b| {
            b.iter(|| {
                processor
                    .process_values(black_box(field()), &params, &name, 10)
                    .unwrap()
            })
        });
    }
}

criterion_group!(benches, benchmark_initial_functions, benchmark_host_methods);
criterion_main!(benches);
