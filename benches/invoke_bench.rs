//! Benchmarks for dynbridge invoke round trips

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use dynbridge::{DynamicBridge, ModuleContract, Payload};

dynbridge::host_callback! {
    fn discard(payload) {
        black_box(payload);
    }
}

fn open_echo(release: bool) -> Option<DynamicBridge> {
    let path = option_env!("DYNBRIDGE_ECHO_MODULE")?;
    let release = release.then(|| "release".to_string());
    // SAFETY: the echo fixture exports init/call/release with the standard signatures.
    let contract = unsafe { ModuleContract::trusted("init", "call", release) };
    let mut bridge = DynamicBridge::open(path, contract).ok()?;
    bridge.register_callback(discard).ok()?;
    Some(bridge)
}

/// Benchmark a full invoke: payload conversion, module call, callback, copy-out
fn bench_invoke(c: &mut Criterion) {
    let mut group = c.benchmark_group("invoke");
    group.throughput(Throughput::Elements(1));

    for (name, release) in [("module_owned", false), ("released", true)] {
        let Some(mut bridge) = open_echo(release) else {
            eprintln!("echo module not built, skipping invoke benchmarks");
            return;
        };

        group.bench_function(format!("ping_{}", name), |b| {
            b.iter(|| black_box(bridge.invoke(black_box("ping")).unwrap()))
        });
        group.bench_function(format!("no_response_{}", name), |b| {
            b.iter(|| black_box(bridge.invoke(black_box("silent")).unwrap()))
        });

        let _ = bridge.close();
    }

    group.finish();
}

/// Benchmark request payload conversion on its own
fn bench_payload(c: &mut Criterion) {
    let payload = Payload::from("exchange_info");
    c.bench_function("payload_to_c_string", |b| {
        b.iter(|| black_box(payload.to_c_string().unwrap()))
    });
}

criterion_group!(benches, bench_invoke, bench_payload);
criterion_main!(benches);
