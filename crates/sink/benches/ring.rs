//! Ring and writer benchmark suite
//!
//! Run with: `cargo bench -p ringlog-sink --bench ring`
//!
//! # What we measure
//!
//! - Item pool get/put cycle (hot path allocation)
//! - Ring insert + drain, single and multiple producers
//! - Buffered `write()` latency as seen by a producer
//! - Direct `write()` for comparison

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use ringlog_sink::{DEFAULT_MAX_SIZE, ItemPool, RingBuffer, Writer, WriterConfig};
use tempfile::TempDir;
use tokio::runtime::Runtime;

/// Typical JSON log line
const RECORD: &[u8] = br#"{"ts":"2024-01-01T00:00:00Z","level":"INFO","target":"app","message":"request served","status":200}
"#;

// =============================================================================
// Item Pool
// =============================================================================

fn bench_item_pool(c: &mut Criterion) {
    let mut group = c.benchmark_group("sink_item_pool");
    let pool = ItemPool::for_ring(1024);

    // warm the pool
    let warm: Vec<_> = (0..64).map(|_| pool.get(RECORD)).collect();
    for item in warm {
        pool.put(item);
    }

    group.throughput(Throughput::Bytes(RECORD.len() as u64));
    group.bench_function("get_put_cycle", |b| {
        b.iter(|| {
            let item = pool.get(black_box(RECORD));
            black_box(&item);
            pool.put(item);
        });
    });

    group.finish();
}

// =============================================================================
// Ring
// =============================================================================

fn bench_ring_single_producer(c: &mut Criterion) {
    let mut group = c.benchmark_group("sink_ring");

    for capacity in [128usize, 4096] {
        let (ring, mut reader) = RingBuffer::with_reader(capacity, 8, None);
        let pool = ItemPool::for_ring(ring.slots());

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("add_drain", capacity), &capacity, |b, _| {
            b.iter(|| {
                if let Ok(seq) = ring.add(pool.get(RECORD)) {
                    black_box(seq);
                }
                if let Some(item) = reader.next() {
                    pool.put(item);
                }
            });
        });
    }

    group.finish();
}

fn bench_ring_contended(c: &mut Criterion) {
    let mut group = c.benchmark_group("sink_ring_contended");
    group.sample_size(20);

    for producers in [2usize, 4, 8] {
        let per_producer = 10_000usize;
        group.throughput(Throughput::Elements((producers * per_producer) as u64));
        group.bench_with_input(BenchmarkId::new("producers", producers), &producers, |b, &producers| {
            b.iter(|| {
                let (ring, mut reader) = RingBuffer::with_reader(65_536, 8, None);
                let handles: Vec<_> = (0..producers)
                    .map(|_| {
                        let ring = Arc::clone(&ring);
                        thread::spawn(move || {
                            let pool = ItemPool::for_ring(64);
                            for _ in 0..per_producer {
                                let _ = ring.add(pool.get(RECORD));
                            }
                        })
                    })
                    .collect();
                for handle in handles {
                    let _ = handle.join();
                }

                let mut drained = 0usize;
                while reader.next().is_some() {
                    drained += 1;
                }
                black_box(drained)
            });
        });
    }

    group.finish();
}

// =============================================================================
// Writer
// =============================================================================

fn bench_writer(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let dir = TempDir::new().expect("temp dir");
    let mut group = c.benchmark_group("sink_writer");
    group.throughput(Throughput::Bytes(RECORD.len() as u64));

    let buffered = {
        let _guard = rt.enter();
        Writer::new(
            WriterConfig::default()
                .with_file(dir.path().join("buffered").display().to_string(), DEFAULT_MAX_SIZE)
                .with_buffer(65_536, 8, Duration::from_millis(100)),
        )
        .expect("buffered writer")
    };
    group.bench_function("buffered_write", |b| {
        b.iter(|| black_box(buffered.write(RECORD)));
    });

    let direct = Writer::new(
        WriterConfig::default().with_file(dir.path().join("direct").display().to_string(), DEFAULT_MAX_SIZE),
    )
    .expect("direct writer");
    group.bench_function("direct_write", |b| {
        b.iter(|| black_box(direct.write(RECORD)));
    });

    group.finish();

    rt.block_on(async {
        buffered.close().await;
        direct.close().await;
    });
}

criterion_group!(
    benches,
    bench_item_pool,
    bench_ring_single_producer,
    bench_ring_contended,
    bench_writer,
);
criterion_main!(benches);
