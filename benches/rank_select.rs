use criterion::{Criterion, criterion_group, criterion_main};
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::hint::black_box;
use textix::prelude::*;

const BITS: usize = 1 << 22;

fn build_random(density: u32) -> RankSelectArray {
    let mut rng = SmallRng::seed_from_u64(0);
    let mut bv = BitVec::with_capacity(BITS);
    for _ in 0..BITS {
        bv.push(rng.random_range(0..100) < density);
    }
    RankSelectArray::from_bit_vec(bv)
}

pub fn criterion_benchmark(c: &mut Criterion) {
    for density in [5u32, 50, 95] {
        let rs = build_random(density);
        let mut rng = SmallRng::seed_from_u64(1);
        let positions: Vec<usize> = (0..1024).map(|_| rng.random_range(0..BITS)).collect();
        let ones = rs.count(true);
        let ranks: Vec<usize> = (0..1024).map(|_| rng.random_range(0..ones)).collect();

        c.bench_function(&format!("rank1 d{density}"), |b| {
            let mut i = 0;
            b.iter(|| {
                i = (i + 1) % positions.len();
                black_box(rs.rank(positions[i], true));
            });
        });

        c.bench_function(&format!("select1 d{density}"), |b| {
            let mut i = 0;
            b.iter(|| {
                i = (i + 1) % ranks.len();
                black_box(rs.select(ranks[i], true));
            });
        });

        c.bench_function(&format!("select0 d{density}"), |b| {
            let zeros = rs.count(false);
            let mut i = 0;
            b.iter(|| {
                i = (i + 1) % ranks.len();
                black_box(rs.select(ranks[i] % zeros, false));
            });
        });
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
