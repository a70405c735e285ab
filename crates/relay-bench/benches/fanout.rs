//! Fan-out throughput benchmarks for Relay.
//!
//! These benchmarks measure the registry and the publish path; the outbound
//! queues are drained inside each iteration so they never fill up.

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use relay_core::{dispatch, ClientId, Hub, HubConfig, OutboundReceiver, Registry};

fn bench_hub() -> Hub {
    Hub::with_config(HubConfig {
        outbound_capacity: 1024,
    })
}

/// Attach `n` subscribers of `topic` to the hub.
fn attach_subscribers(hub: &Hub, topic: &str, n: usize) -> Vec<OutboundReceiver> {
    (0..n)
        .map(|i| {
            let id = ClientId::new(format!("conn-{i}"));
            let rx = hub.attach(id.clone());
            hub.subscribe(topic, &id);
            rx
        })
        .collect()
}

/// Benchmark registry operations.
fn bench_registry(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry");

    group.bench_function("subscribe", |b| {
        let registry = Registry::new();
        let mut i = 0u64;
        b.iter(|| {
            let topic = format!("topic:{}", i);
            let client = ClientId::new(format!("conn:{}", i));
            i += 1;
            registry.subscribe(&topic, &client);
        });
    });

    group.bench_function("subscribers_of_100", |b| {
        let registry = Registry::new();
        for i in 0..100 {
            registry.subscribe("test", &ClientId::new(format!("conn-{i}")));
        }
        b.iter(|| registry.subscribers_of(black_box("test")));
    });

    group.finish();
}

/// Benchmark the publish path.
fn bench_publish(c: &mut Criterion) {
    let mut group = c.benchmark_group("publish");
    let payload = Bytes::from(vec![b'x'; 64]);

    for size in [1usize, 100, 1000] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let hub = bench_hub();
            let mut receivers = attach_subscribers(&hub, "broadcast", size);

            b.iter(|| {
                let count = hub.publish("broadcast", black_box(payload.clone()), None);
                for rx in &mut receivers {
                    let _ = rx.try_recv();
                }
                count
            });
        });
    }

    group.finish();
}

/// Benchmark envelope decode plus publish, the whole inbound path.
fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");

    let frame: &[u8] = br#"{"topic":"broadcast","action":"publish","message":{"seq":1}}"#;
    group.throughput(Throughput::Bytes(frame.len() as u64));

    group.bench_function("publish_10_sub", |b| {
        let hub = bench_hub();
        let mut receivers = attach_subscribers(&hub, "broadcast", 10);
        let publisher = ClientId::new("publisher");
        let _publisher_rx = hub.attach(publisher.clone());

        b.iter(|| {
            let outcome = dispatch(&hub, &publisher, black_box(frame));
            for rx in &mut receivers {
                let _ = rx.try_recv();
            }
            outcome
        });
    });

    group.finish();
}

criterion_group!(benches, bench_registry, bench_publish, bench_dispatch);
criterion_main!(benches);
