use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pi_sensor_hub::config::AppConfig;
use pi_sensor_hub::gpio::sim::{ScriptedPins, Signal};
use pi_sensor_hub::measure::dht::decode_frame;
use pi_sensor_hub::measure::{Dht11, EchoRanger, RcDischarge};
use pi_sensor_hub::{SensorQuery, SensorRegistry};
use std::sync::Arc;
use std::time::Duration;

/// Benchmark echo ranging against scripted pins at several distances
fn bench_echo_ranging(c: &mut Criterion) {
    let mut group = c.benchmark_group("echo_ranging");
    let ranger = EchoRanger::new(18, 24, Duration::from_millis(100));

    for width_us in [117u64, 1_000, 11_662] {
        let pins = ScriptedPins::new().with_signal(24, Signal::echo(300, width_us));
        group.bench_with_input(BenchmarkId::from_parameter(width_us), &width_us, |b, _| {
            b.iter(|| ranger.measure(&pins).expect("Should measure"))
        });
    }

    group.finish();
}

/// Benchmark RC discharge counting for short and long charge times
fn bench_rc_counting(c: &mut Criterion) {
    let mut group = c.benchmark_group("rc_counting");
    let channel = RcDischarge {
        pin: 21,
        discharge: Duration::from_millis(100),
        max_count: 100_000,
        max_duration: Duration::from_secs(2),
    };

    for charge_us in [1_000u64, 25_000] {
        let pins = ScriptedPins::new().with_signal(21, Signal::rc_charge(charge_us));
        group.bench_with_input(BenchmarkId::from_parameter(charge_us), &charge_us, |b, _| {
            b.iter(|| channel.count(&pins).expect("Should count"))
        });
    }

    group.finish();
}

/// Benchmark the DHT11 exchange and the checksum decode on its own
fn bench_dht11(c: &mut Criterion) {
    let frame = [45u8, 0, 23, 4, 72];
    let pins = ScriptedPins::new().with_signal(22, Signal::dht11_frame(frame));
    let sensor = Dht11::new(22);

    c.bench_function("dht11_read_once", |b| {
        b.iter(|| sensor.read_once(&pins).expect("Should read frame"))
    });

    c.bench_function("dht11_decode_frame", |b| {
        b.iter(|| decode_frame(black_box(frame)).expect("Should decode"))
    });
}

/// Benchmark copying every reading out and serializing it
fn bench_snapshot_serialization(c: &mut Criterion) {
    let pins = Arc::new(ScriptedPins::new().with_signal(24, Signal::echo(300, 1_000)));
    let registry = SensorRegistry::from_config(&AppConfig::default(), pins).expect("Should build registry");
    registry.update_all();
    let query = SensorQuery::new(Arc::new(registry));

    c.bench_function("snapshot_all", |b| b.iter(|| query.get_all()));

    c.bench_function("snapshot_json_serialization", |b| {
        b.iter(|| serde_json::to_string(&query.get_all()).expect("Should serialize"))
    });
}

criterion_group!(
    benches,
    bench_echo_ranging,
    bench_rc_counting,
    bench_dht11,
    bench_snapshot_serialization
);
criterion_main!(benches);
