use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tempfile::TempDir;

use corpus_indexer::config::keys;
use corpus_indexer::pool::RecordPool;
use corpus_indexer::schema::{FieldConfig, FieldDefaults, FieldType, TypeRegistry};
use corpus_indexer::{Indexer, OpenMode, PluginRegistry, Producer, RecordSink, Result, Settings};

fn registry() -> Arc<TypeRegistry> {
    let defaults = FieldDefaults::default();
    let year = FieldConfig::builder("year")
        .field_type(FieldType::Int)
        .build(&defaults);
    Arc::new(TypeRegistry::with_configs(defaults, [year]))
}

// Benchmark: acquire/fill/release churn, pooled vs. effectively unpooled
fn bench_pool_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_churn");
    group.throughput(Throughput::Elements(1));

    for &capacity in [1usize, 128].iter() {
        let pool = RecordPool::new(registry(), capacity);
        group.bench_with_input(BenchmarkId::from_parameter(capacity), &capacity, |b, _| {
            b.iter(|| {
                let mut record = pool.acquire_record();
                pool.add_field(&mut record, "title", "a reasonably sized title");
                pool.add_field(&mut record, "body", "some body text for the record");
                pool.add_field(&mut record, "year", "2024");
                black_box(&record);
                pool.release(record);
            })
        });
    }
    group.finish();
}

struct SyntheticProducer {
    pool: Option<Arc<RecordPool>>,
    count: usize,
}

impl Producer for SyntheticProducer {
    fn initialize(&mut self, pool: Arc<RecordPool>, settings: &Settings) -> Result<()> {
        self.count = settings.get_usize("synthetic.count", 0);
        self.pool = Some(pool);
        Ok(())
    }

    fn produce(&mut self, sink: &mut RecordSink) -> Result<()> {
        let Some(pool) = &self.pool else {
            return Ok(());
        };
        for i in 0..self.count {
            let mut record = pool.acquire_record();
            pool.add_field(&mut record, "title", &format!("document {}", i));
            pool.add_field(&mut record, "body", "the quick brown fox jumps over the lazy dog");
            pool.add_field(&mut record, "year", &(1950 + i % 70).to_string());
            sink.push(record)?;
        }
        Ok(())
    }
}

// Benchmark: end-to-end run throughput by consumer count
fn bench_end_to_end(c: &mut Criterion) {
    const DOCS: usize = 5_000;

    let mut group = c.benchmark_group("end_to_end");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(20));
    group.throughput(Throughput::Elements(DOCS as u64));

    let mut plugins = PluginRegistry::with_builtins();
    plugins.register_producer("synthetic", || {
        Box::new(SyntheticProducer {
            pool: None,
            count: 0,
        })
    });

    for &consumers in [1usize, 2, 4].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(consumers),
            &consumers,
            |b, &consumers| {
                b.iter(|| {
                    let tmp = TempDir::new().unwrap();
                    let settings = Settings::new()
                        .with(keys::INDEX_DIR, tmp.path().to_string_lossy())
                        .with(keys::PRODUCER, "synthetic")
                        .with(keys::CONSUMER_THREADS, consumers.to_string())
                        .with("indexer.default.index", "ANALYZED")
                        .with("indexer.default.analyzer", "standard")
                        .with("indexer.field.title.store", "YES")
                        .with("indexer.field.body.store", "NO")
                        .with("indexer.field.year.fieldtype", "INT")
                        .with("synthetic.count", DOCS.to_string());
                    let mut indexer =
                        Indexer::new(settings, &plugins, OpenMode::Overwrite).unwrap();
                    black_box(indexer.create_index().unwrap());
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_pool_churn, bench_end_to_end);
criterion_main!(benches);
