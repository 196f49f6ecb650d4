//! Benchmarks for the cache-free engines.
//!
//! Ethash, KawPow and RandomX need multi-second epoch builds; time those
//! with `multipow benchmark` instead.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use multipow_core::{
    Argon2Hasher, Argon2Variant, AstroBwtVariant, CnVariant, CryptoNight, astrobwt, keccak256,
};

const BLOB: &[u8] = b"benchmark input data for multipow, seventy-six bytes of block header........";

fn bench_keccak(c: &mut Criterion) {
    c.bench_function("keccak256_76b", |b| b.iter(|| keccak256(black_box(BLOB))));
}

fn bench_cryptonight(c: &mut Criterion) {
    let mut group = c.benchmark_group("cryptonight");
    group.sample_size(10);
    for (name, variant) in [
        ("cn/2", CnVariant::Two),
        ("cn-lite/1", CnVariant::Lite1),
        ("cn-pico/trtl", CnVariant::Pico),
    ] {
        let mut hasher = CryptoNight::new(variant).unwrap();
        group.bench_function(name, |b| {
            b.iter(|| hasher.hash(black_box(BLOB), variant, 0).unwrap())
        });
    }
    group.finish();
}

fn bench_astrobwt(c: &mut Criterion) {
    let mut group = c.benchmark_group("astrobwt");
    group.sample_size(10);
    group.bench_function("dero-he", |b| {
        b.iter(|| astrobwt(black_box(BLOB), AstroBwtVariant::DeroHe).unwrap())
    });
    group.finish();
}

fn bench_argon2(c: &mut Criterion) {
    let mut hasher = Argon2Hasher::new(Argon2Variant::Chukwa).unwrap();
    c.bench_function("argon2/chukwa", |b| {
        let mut nonce: u32 = 0;
        b.iter(|| {
            let mut input = BLOB.to_vec();
            input[39..43].copy_from_slice(&nonce.to_le_bytes());
            nonce = nonce.wrapping_add(1);
            hasher.hash(black_box(&input)).unwrap()
        })
    });
}

criterion_group!(benches, bench_keccak, bench_cryptonight, bench_astrobwt, bench_argon2);
criterion_main!(benches);
