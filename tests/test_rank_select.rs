/*
 * SPDX-FileCopyrightText: 2023 Tommaso Fontana
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use textix::prelude::*;

fn build(bits: &[bool]) -> RankSelectArray {
    RankSelectArray::from_bit_vec(BitVec::from_bits(bits))
}

fn naive_rank(bits: &[bool], pos: usize, bit: bool) -> usize {
    bits.iter().take(pos).filter(|&&b| b == bit).count()
}

fn naive_select(bits: &[bool], rank: usize, bit: bool) -> usize {
    bits.iter()
        .enumerate()
        .filter(|&(_, &b)| b == bit)
        .nth(rank)
        .map(|(i, _)| i)
        .unwrap_or(bits.len())
}

#[test]
fn sixteen_bit_pattern() {
    // 1010 1100 1110 0001, bit 0 = MSB of byte 0
    let rs = RankSelectArray::from_raw(vec![0xAC, 0xE1], 16);
    assert_eq!(rs.len(), 16);
    assert_eq!(rs.count(true), 8);
    assert_eq!(rs.count(false), 8);

    assert_eq!(rs.rank(8, true), 4);
    assert_eq!(rs.rank(16, true), 8);
    assert_eq!(rs.rank(100, true), 8);
    assert_eq!(rs.rank(8, false), 4);

    // ones sit at 0, 2, 4, 5, 8, 9, 10, 15
    assert_eq!(rs.select(0, true), 0);
    assert_eq!(rs.select(3, true), 5);
    assert_eq!(rs.select(7, true), 15);
    assert_eq!(rs.select(8, true), 16);
    assert_eq!(rs.select(0, false), 1);

    assert_eq!(rs.pred(10, true), 9);
    assert_eq!(rs.succ(10, true), 15);
    assert_eq!(rs.pred(10, false), 7);
    assert_eq!(rs.succ(10, false), 11);
    assert_eq!(rs.pred(0, true), 16);
    assert_eq!(rs.succ(15, true), 16);
}

#[test]
fn rank_duality() {
    let mut rng = SmallRng::seed_from_u64(0);
    for len in [1usize, 7, 8, 9, 63, 64, 65, 1000] {
        let bits: Vec<bool> = (0..len).map(|_| rng.random_range(0..2) == 1).collect();
        let rs = build(&bits);
        for p in 0..=len {
            assert_eq!(rs.rank(p, true) + rs.rank(p, false), p);
        }
    }
}

#[test]
fn rank_matches_naive() {
    let mut rng = SmallRng::seed_from_u64(1);
    for len in [1usize, 16, 17, 255, 256, 257, 1000, 5000] {
        for density in [1, 10, 50, 90] {
            let bits: Vec<bool> = (0..len).map(|_| rng.random_range(0..100) < density).collect();
            let rs = build(&bits);
            for p in 0..=len {
                assert_eq!(rs.rank(p, true), naive_rank(&bits, p, true), "len {len} p {p}");
                assert_eq!(rs.rank(p, false), naive_rank(&bits, p, false));
            }
        }
    }
}

#[test]
fn select_matches_naive_and_inverts_rank() {
    let mut rng = SmallRng::seed_from_u64(2);
    for len in [1usize, 100, 999, 5000] {
        for density in [2, 50, 98] {
            let bits: Vec<bool> = (0..len).map(|_| rng.random_range(0..100) < density).collect();
            let rs = build(&bits);
            for bit in [false, true] {
                let total = rs.count(bit);
                for r in 0..total {
                    let p = rs.select(r, bit);
                    assert_eq!(p, naive_select(&bits, r, bit));
                    assert_eq!(bits[p], bit);
                    assert_eq!(rs.rank(p, bit), r);
                }
                assert_eq!(rs.select(total, bit), len);
                assert_eq!(rs.select(total + 100, bit), len);
            }
            // every position selects back through its own rank
            for (p, &b) in bits.iter().enumerate() {
                assert_eq!(rs.select(rs.rank(p, b), b), p);
            }
        }
    }
}

#[test]
fn pred_and_succ_bracket_positions() {
    let mut rng = SmallRng::seed_from_u64(3);
    let len = 2000;
    let bits: Vec<bool> = (0..len).map(|_| rng.random_range(0..5) == 0).collect();
    let rs = build(&bits);
    for p in 0..len {
        for bit in [false, true] {
            let pred = rs.pred(p, bit);
            let succ = rs.succ(p, bit);
            match bits[..p].iter().rposition(|&b| b == bit) {
                Some(q) => assert_eq!(pred, q),
                None => assert_eq!(pred, len),
            }
            match bits[p + 1..].iter().position(|&b| b == bit) {
                Some(q) => assert_eq!(succ, p + 1 + q),
                None => assert_eq!(succ, len),
            }
            // pred < p <= succ, reading len as infinity
            if pred != len {
                assert!(pred < p);
            }
            if succ != len {
                assert!(p < succ);
            }
        }
    }
}

#[test]
fn uniform_arrays() {
    for len in [1usize, 8, 100, 4096] {
        let ones = build(&vec![true; len]);
        assert_eq!(ones.count(true), len);
        assert_eq!(ones.count(false), 0);
        for p in 0..len {
            assert_eq!(ones.rank(p, true), p);
            assert_eq!(ones.select(p, true), p);
        }
        assert_eq!(ones.select(0, false), len);

        let zeros = build(&vec![false; len]);
        assert_eq!(zeros.count(false), len);
        for p in 0..len {
            assert_eq!(zeros.rank(p, false), p);
            assert_eq!(zeros.select(p, false), p);
        }
        assert_eq!(zeros.select(0, true), len);
        assert_eq!(zeros.pred(len, true), len);
    }
}

#[test]
fn long_runs_exercise_sample_jumps() {
    // long 0-run, long 1-run, then alternation: crosses many sample
    // boundaries with skewed counts
    let mut bits = vec![false; 3000];
    bits.extend(vec![true; 3000]);
    for i in 0..3000 {
        bits.push(i % 2 == 0);
    }
    let rs = build(&bits);
    for p in (0..bits.len()).step_by(37) {
        assert_eq!(rs.rank(p, true), naive_rank(&bits, p, true), "p {p}");
    }
    for r in (0..rs.count(true)).step_by(41) {
        assert_eq!(rs.select(r, true), naive_select(&bits, r, true), "r {r}");
    }
    for r in (0..rs.count(false)).step_by(43) {
        assert_eq!(rs.select(r, false), naive_select(&bits, r, false), "r {r}");
    }
}
