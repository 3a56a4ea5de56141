//! # Gateway Benchmarks
//!
//! Hot paths that run on every call or every node event:
//!
//! | Path | Work |
//! |------|------|
//! | limiter decide | registry lookup + one binding lock |
//! | hub publish | snapshot swap + fan-out to N sinks |
//! | adapter | classify + projection + serialization |

use api_gateway::adapter::{classify, DtoProjection, Sanitizer};
use api_gateway::domain::RateLimitConfig;
use api_gateway::hub::PushMessage;
use api_gateway::{BroadcastHub, RateLimiter, Strategy, Topic};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use tokio::sync::mpsc;

fn limiter(strategy: Strategy) -> RateLimiter {
    let limiter = RateLimiter::new(RateLimitConfig {
        strategy,
        ..RateLimitConfig::default()
    });
    for route in api_gateway::ROUTES {
        limiter.register(route.name, limiter.default_strategy());
    }
    limiter
}

fn bench_limiter_decide(c: &mut Criterion) {
    let mut group = c.benchmark_group("limiter-decide");
    group.measurement_time(Duration::from_secs(5));

    let open = limiter(Strategy::new(u32::MAX, u32::MAX));
    group.bench_function("allow", |b| {
        b.iter(|| black_box(open.decide(black_box("blockchain_current"), None)))
    });

    let closed = limiter(Strategy::new(1, 1));
    closed.decide("blockchain_current", None);
    group.bench_function("deny", |b| {
        b.iter(|| black_box(closed.decide(black_box("blockchain_current"), None)))
    });

    let mut config = RateLimitConfig::default();
    config.scope = api_gateway::limiter::LimiterScope::RouteAndClient;
    config.strategy = Strategy::new(u32::MAX, u32::MAX);
    let per_client = RateLimiter::new(config);
    per_client.register("tx_process", per_client.default_strategy());
    let mut n: u32 = 0;
    group.bench_function("per-client-1k-ips", |b| {
        b.iter(|| {
            n = n.wrapping_add(1);
            let ip = IpAddr::V4(Ipv4Addr::from(0x0A00_0000 | (n % 1000)));
            black_box(per_client.decide("tx_process", Some(ip)))
        })
    });

    group.finish();
}

fn bench_hub_publish(c: &mut Criterion) {
    let mut group = c.benchmark_group("hub-publish");
    let message = json!({ "number": 1, "hash": "00AB", "joiners": [] }).to_string();

    for subscribers in [1usize, 100, 1000] {
        let hub = BroadcastHub::new();
        let mut receivers = Vec::with_capacity(subscribers);
        for _ in 0..subscribers {
            let (tx, rx) = mpsc::unbounded_channel::<PushMessage>();
            hub.subscribe(Topic::Block, tx).unwrap_or_else(|e| panic!("{e}"));
            receivers.push(rx);
        }

        group.throughput(Throughput::Elements(subscribers as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(subscribers),
            &subscribers,
            |b, _| {
                b.iter(|| {
                    let report = hub.publish(Topic::Block, message.as_str());
                    for rx in receivers.iter_mut() {
                        while rx.try_recv().is_ok() {}
                    }
                    black_box(report)
                })
            },
        );
    }

    group.finish();
}

fn bench_adapter_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("adapter");
    let block = json!({
        "version": 10,
        "currency": "g1",
        "number": 123_456,
        "hash": "000001A2B3C4D5",
        "joiners": [],
        "actives": [],
        "transactions": [],
        "fork": false,
        "wrong": false,
    });

    group.bench_function("classify", |b| b.iter(|| black_box(classify(black_box(&block)))));
    group.bench_function("project-and-serialize", |b| {
        b.iter(|| {
            let dto = DtoProjection
                .sanitize(Topic::Block, black_box(&block))
                .unwrap_or_default();
            black_box(dto.to_string())
        })
    });

    group.finish();
}

criterion_group!(benches, bench_limiter_decide, bench_hub_publish, bench_adapter_render);
criterion_main!(benches);
