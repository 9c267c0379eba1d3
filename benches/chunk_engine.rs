use std::{num::NonZeroUsize, sync::Arc};

use chunk_engine::{
    array::ArrayData,
    chunk::generate_chunks,
    engine::ChunkEngineBuilder,
    storage::{store::MemoryStore, StoreKey},
};
use criterion::{
    criterion_group, criterion_main, AxisScale, BenchmarkId, Criterion, PlotConfiguration,
    Throughput,
};

fn chunk_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate_chunks");
    let bytes = vec![0u8; 64 * 1024 * 1024];
    group.throughput(Throughput::Bytes(bytes.len() as u64));
    for chunk_size in [4096, 1024 * 1024, 16 * 1024 * 1024] {
        let chunk_size = NonZeroUsize::new(chunk_size).unwrap();
        group.bench_function(BenchmarkId::new("chunk_size", chunk_size), |b| {
            b.iter(|| generate_chunks(&bytes, chunk_size, Some(chunk_size.get() / 2)).count());
        });
    }
}

fn engine_write_read(c: &mut Criterion) {
    let plot_config = PlotConfiguration::default().summary_scale(AxisScale::Logarithmic);
    let mut group = c.benchmark_group("engine");
    group.plot_config(plot_config);

    // A batch of 3x100x100 f32 images
    let batch_size = 16u64;
    let elements = vec![0.5f32; 16 * 3 * 100 * 100];
    let batch = ArrayData::new_with_elements(vec![batch_size, 3, 100, 100, 1], &elements).unwrap();
    let key = StoreKey::new("images").unwrap();

    for chunk_size in [4096, 64 * 1024, 1024 * 1024, 16 * 1024 * 1024] {
        group.throughput(Throughput::Bytes(batch.bytes().len() as u64));
        group.bench_function(BenchmarkId::new("write_batch", chunk_size), |b| {
            b.iter(|| {
                let engine = ChunkEngineBuilder::new()
                    .chunk_size(NonZeroUsize::new(chunk_size).unwrap())
                    .build(Arc::new(MemoryStore::new()));
                engine.write_sample(&key, &batch, true).unwrap()
            });
        });

        let engine = ChunkEngineBuilder::new()
            .chunk_size(NonZeroUsize::new(chunk_size).unwrap())
            .build(Arc::new(MemoryStore::new()));
        engine.write_sample(&key, &batch, true).unwrap();
        group.throughput(Throughput::Bytes(batch.bytes().len() as u64 / batch_size));
        group.bench_function(BenchmarkId::new("read_sample", chunk_size), |b| {
            b.iter(|| engine.read_sample(&key, batch_size / 2).unwrap());
        });
    }
}

criterion_group!(benches, chunk_generation, engine_write_read);
criterion_main!(benches);
