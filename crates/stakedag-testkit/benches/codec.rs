use criterion::{black_box, criterion_group, criterion_main, Criterion};

use stakedag_core::BlockMetadata;
use stakedag_testkit::fixtures::DagFixture;

fn wide_metadata() -> BlockMetadata {
    let mut dag = DagFixture::new(32);
    let mut tips = Vec::new();
    for proposer in 1..16 {
        let genesis = dag.genesis().block_hash;
        tips.push(*dag.propose(proposer, &[genesis]).unwrap().block_hash());
    }
    dag.propose(0, &tips).unwrap()
}

fn bench_metadata(c: &mut Criterion) {
    let meta = wide_metadata();
    let bytes = meta.to_bytes();

    c.bench_function("metadata_encode", |b| b.iter(|| black_box(&meta).to_bytes()));
    c.bench_function("metadata_decode", |b| {
        b.iter(|| BlockMetadata::from_bytes(black_box(&bytes)).unwrap())
    });
}

criterion_group!(benches, bench_metadata);
criterion_main!(benches);
