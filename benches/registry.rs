//! Benchmark for the registry store and query resolution

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::net::SocketAddr;
use treedns::protocol::DomainName;
use treedns::registry::RegistryStore;
use treedns::server::ResolutionEngine;

fn addr(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}

fn populated_store(count: u16) -> std::sync::Arc<RegistryStore> {
    let store = RegistryStore::new(DomainName::parse("com").unwrap());
    for i in 0..count {
        let _ = store.register_host(&format!("host-{:04}", i), addr(53000 + i % 1000));
        let _ = store.register_subdomain(&format!("zone-{:04}", i), addr(54000 + i % 1000));
    }
    store
}

fn bench_register(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry");
    group.throughput(Throughput::Elements(1));

    group.bench_function("register_host", |b| {
        let store = RegistryStore::new(DomainName::root());
        let mut counter = 0u64;

        b.iter(|| {
            counter += 1;
            let name = format!("host-{}", counter);
            let _ = store.register_host(black_box(&name), addr(53000));
        });
    });

    group.finish();
}

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry");
    group.throughput(Throughput::Elements(1));

    let store = populated_store(1000);

    group.bench_function("lookup_host", |b| {
        let mut counter = 0u64;
        b.iter(|| {
            counter += 1;
            let name = format!("host-{:04}", counter % 1000);
            black_box(store.lookup_host(black_box(&name)));
        });
    });

    group.finish();
}

fn bench_concurrent_registrations(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry");
    group.throughput(Throughput::Elements(100));

    let rt = tokio::runtime::Runtime::new().unwrap();

    group.bench_function("concurrent_100_registrations", |b| {
        b.iter(|| {
            let store = RegistryStore::new(DomainName::root());
            rt.block_on(async {
                let mut handles = Vec::new();
                for i in 0..100u16 {
                    let store = store.clone();
                    handles.push(tokio::spawn(async move {
                        let _ = store.register_host(&format!("host-{}", i), addr(53000 + i));
                    }));
                }
                for handle in handles {
                    let _ = handle.await;
                }
            });
        });
    });

    group.finish();
}

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolution");
    group.throughput(Throughput::Elements(1));

    let store = populated_store(1000);
    let engine = ResolutionEngine::new(store, addr(53000), Some(addr(53999)));

    group.bench_function("resolve_referral", |b| {
        b.iter(|| black_box(engine.resolve(black_box("www.zone-0500.com"))));
    });

    group.bench_function("resolve_outside_zone", |b| {
        b.iter(|| black_box(engine.resolve(black_box("www.example.org"))));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_register,
    bench_lookup,
    bench_concurrent_registrations,
    bench_resolve,
);
criterion_main!(benches);
