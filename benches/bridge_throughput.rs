//! Throughput benchmarks for the push/pull bridge.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use futures::StreamExt;
use scorestream::element::PushHandle;
use scorestream::elements::{PushSink, PushSrc};
use scorestream::pipeline::StreamExecutor;
use scorestream::scoring::{ColumnAssembler, LinearModel, Record, ScoringService};
use scorestream::transport::response_channel;
use std::hint::black_box;
use std::thread;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap()
}

/// Benchmark draining a pre-filled source adapter.
fn bench_pushsrc_drain(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("pushsrc_drain");

    for count in [100u64, 1_000, 10_000] {
        group.throughput(Throughput::Elements(count));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                rt.block_on(async {
                    let (mut source, input) = PushSrc::channel();
                    for i in 0..count {
                        input.deliver(i);
                    }
                    input.finish();

                    let mut total = 0;
                    loop {
                        let batch = source.request().await;
                        total += batch.items.len();
                        if batch.is_terminal() {
                            break;
                        }
                    }
                    black_box(total)
                })
            });
        });
    }

    group.finish();
}

/// Benchmark a producer thread pushing through the executor into a response stream.
fn bench_threaded_bridge(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("threaded_bridge");
    let count = 10_000u64;
    group.throughput(Throughput::Elements(count));

    group.bench_function("identity", |b| {
        b.iter(|| {
            rt.block_on(async {
                let (source, input) = PushSrc::channel();
                let (tx, responses) = response_channel();
                let stream = StreamExecutor::new().start(source, |x: u64| Ok(x), PushSink::new(tx));

                let producer = thread::spawn(move || {
                    for i in 0..count {
                        input.deliver(i);
                    }
                    input.finish();
                });

                let received = responses.count().await;
                producer.join().unwrap();
                stream.wait().await.unwrap();
                black_box(received)
            })
        });
    });

    group.finish();
}

/// Benchmark scoring records through the service.
fn bench_scoring(c: &mut Criterion) {
    let rt = runtime();
    let service = ScoringService::new(
        LinearModel::new(vec![0.1; 8], 0.0),
        ColumnAssembler::new((0..8).map(|i| format!("f{i}"))),
    );
    let records: Vec<Record> = (0..1_000)
        .map(|i| {
            (0..8).fold(Record::new(format!("r{i}")), |r, f| {
                r.with(format!("f{f}"), f as f64)
            })
        })
        .collect();

    let mut group = c.benchmark_group("scoring");
    group.throughput(Throughput::Elements(records.len() as u64));
    group.bench_function("linear_8", |b| {
        b.iter(|| {
            rt.block_on(async {
                let scores = service.score_stream(records.clone()).count().await;
                black_box(scores)
            })
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_pushsrc_drain,
    bench_threaded_bridge,
    bench_scoring
);
criterion_main!(benches);
