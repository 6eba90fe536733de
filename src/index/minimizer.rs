/*
 * SPDX-FileCopyrightText: 2023 Tommaso Fontana
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Minimizer k-mer indices.
//!
//! For each (w, k) scheme the index records, for every k-mer that is the
//! minimum of some window of `w` consecutive k-mers, the absolute offsets
//! at which it wins. Minima are taken over *hash ranks*: the polynomial
//! hash `Σ rank(s[i]) · σ^(len−1−i) mod 2^64` of a k-mer, which for short
//! k-mers coincides with lexicographic rank. The sliding minimum is kept
//! by a monotonic queue that retains ties, so every tied minimizer of a
//! window is indexed.
//!
//! Several sequences can be ingested one after another; offsets are
//! global across them and the per-sequence start offsets are recorded.

use std::collections::{HashMap, VecDeque};

use anyhow::{Result, ensure};

use crate::alphabet::{Alphabet, Xchar};
use crate::traits::SymbolSource;

/// Polynomial lexicographic hasher over an alphabet, with a rolling
/// update for sliding windows. Arithmetic wraps mod 2^64.
#[derive(Debug, Clone)]
pub struct LexHasher {
    ab: Alphabet,
}

impl LexHasher {
    /// The hasher owns the alphabet it ranks with.
    pub fn new(ab: Alphabet) -> Self {
        Self { ab }
    }

    #[inline]
    fn base(&self) -> u64 {
        self.ab.len() as u64
    }

    #[inline]
    fn pow(&self, exp: usize) -> u64 {
        self.base().wrapping_pow(exp as u32)
    }

    /// Hash of a whole k-mer.
    pub fn hash(&self, s: &[Xchar]) -> u64 {
        let mut h: u64 = 0;
        for &c in s {
            h = h
                .wrapping_mul(self.base())
                .wrapping_add(self.ab.rank(c) as u64);
        }
        h
    }

    /// Hash of the k-mer `text[from..to]`.
    #[inline]
    pub fn hash_range(&self, text: &[Xchar], from: usize, to: usize) -> u64 {
        self.hash(&text[from..to])
    }

    /// Rolls the hash of a length-`k` window one position to the right:
    /// `outgoing` leaves on the left, `incoming` enters on the right.
    pub fn roll(&self, k: usize, hash: u64, outgoing: Xchar, incoming: Xchar) -> u64 {
        hash.wrapping_sub(self.pow(k - 1).wrapping_mul(self.ab.rank(outgoing) as u64))
            .wrapping_mul(self.base())
            .wrapping_add(self.ab.rank(incoming) as u64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RankPos {
    rank: u64,
    pos: usize,
}

/// Sliding-window monotonic minimum queue over (hash rank, position)
/// entries. Ties with the minimum are retained so they can all be
/// reported. Positions must be pushed consecutively.
#[derive(Debug, Default)]
struct MinQueue {
    /// Non-decreasing by rank; front is the window minimum.
    items: VecDeque<RankPos>,
    window: usize,
    next_pos: usize,
}

impl MinQueue {
    fn push(&mut self, rank: u64, pos: usize) {
        while let Some(back) = self.items.back() {
            if back.rank > rank {
                self.items.pop_back();
            } else {
                break;
            }
        }
        self.items.push_back(RankPos { rank, pos });
        self.window += 1;
        self.next_pos = pos + 1;
    }

    /// Drops the oldest position of the logical window.
    fn remove_oldest(&mut self) {
        debug_assert!(self.window > 0);
        let oldest = self.next_pos - self.window;
        if self.items.front().is_some_and(|f| f.pos == oldest) {
            self.items.pop_front();
        }
        self.window -= 1;
    }

    #[inline]
    fn len(&self) -> usize {
        self.window
    }

    #[inline]
    fn min(&self) -> Option<RankPos> {
        self.items.front().copied()
    }

    /// All entries tied with the current minimum, oldest first.
    fn all_min(&self) -> impl Iterator<Item = RankPos> + '_ {
        let min_rank = self.items.front().map(|f| f.rank);
        self.items
            .iter()
            .copied()
            .take_while(move |e| Some(e.rank) == min_rank)
    }
}

/// One (w, k) scheme with its offset table.
#[derive(Debug)]
struct Scheme {
    w: usize,
    k: usize,
    table: HashMap<u64, Vec<usize>>,
}

/// A multi-(w,k) minimizer index keyed by rolling polynomial hashes.
#[derive(Debug)]
pub struct MinimizerIndex {
    hasher: LexHasher,
    schemes: Vec<Scheme>,
    /// k → scheme position, for lookups.
    by_k: HashMap<usize, usize>,
    max_window: usize,
    seq_offsets: Vec<usize>,
}

impl MinimizerIndex {
    /// Creates an empty index for the given (w, k) schemes. The alphabet
    /// is owned. Each scheme must use a distinct k so that lookups by
    /// k-mer length are unambiguous.
    pub fn new(ab: Alphabet, schemes: &[(usize, usize)]) -> Result<Self> {
        ensure!(!schemes.is_empty(), "no (w, k) schemes given");
        let mut by_k = HashMap::new();
        let mut max_window = 0;
        for (i, &(w, k)) in schemes.iter().enumerate() {
            ensure!(w >= 1 && k >= 1, "window and k-mer sizes must be positive");
            ensure!(by_k.insert(k, i).is_none(), "duplicate k-mer size {}", k);
            max_window = max_window.max(w + k);
        }
        Ok(Self {
            hasher: LexHasher::new(ab),
            schemes: schemes
                .iter()
                .map(|&(w, k)| Scheme {
                    w,
                    k,
                    table: HashMap::new(),
                })
                .collect(),
            by_k,
            max_window,
            seq_offsets: vec![0],
        })
    }

    #[inline]
    pub fn hasher(&self) -> &LexHasher {
        &self.hasher
    }

    /// Number of ingested sequences.
    #[inline]
    pub fn sequence_count(&self) -> usize {
        self.seq_offsets.len() - 1
    }

    /// Global start offset of each ingested sequence, plus the total
    /// length at the end.
    #[inline]
    pub fn sequence_offsets(&self) -> &[usize] {
        &self.seq_offsets
    }

    /// Ingests one sequence, indexing its window minimizers under every
    /// scheme at global offsets.
    pub fn index_source(&mut self, src: &mut impl SymbolSource) -> Result<()> {
        let offset = *self.seq_offsets.last().unwrap();
        let nschemes = self.schemes.len();
        let mut window: Vec<Xchar> = Vec::with_capacity(self.max_window);
        let mut queues: Vec<MinQueue> = (0..nschemes).map(|_| MinQueue::default()).collect();
        let mut prev_min = vec![0u64; nschemes];
        let mut prev_right = vec![0u64; nschemes];

        let mut nread = 0;
        src.reset();
        while let Some(c) = src.next_symbol() {
            ensure!(
                self.hasher.ab.contains(c),
                "symbol {} not in the alphabet",
                c
            );
            if nread >= self.max_window {
                window.rotate_left(1);
                let last = window.len() - 1;
                window[last] = c;
            } else {
                window.push(c);
            }
            nread += 1;

            for i in 0..nschemes {
                let (w, k) = (self.schemes[i].w, self.schemes[i].k);
                if nread == k {
                    // first whole k-mer: always a window minimizer
                    let rank = self.hasher.hash(&window[window.len() - k..]);
                    prev_right[i] = rank;
                    prev_min[i] = rank;
                    queues[i].push(rank, nread - k);
                    self.schemes[i]
                        .table
                        .entry(rank)
                        .or_default()
                        .push(offset + nread - k);
                } else if nread > k {
                    let outgoing = window[window.len() - k - 1];
                    let rank = self.hasher.roll(k, prev_right[i], outgoing, c);
                    let pos = nread - k;
                    prev_right[i] = rank;
                    if nread > w + k - 1 {
                        queues[i].remove_oldest();
                    }
                    queues[i].push(rank, pos);
                    let cur_min = queues[i].min().unwrap().rank;
                    if w == 1 || prev_min[i] != cur_min {
                        // new minimum: index every tied occurrence
                        for e in queues[i].all_min().collect::<Vec<_>>() {
                            self.schemes[i]
                                .table
                                .entry(e.rank)
                                .or_default()
                                .push(offset + e.pos);
                        }
                        prev_min[i] = cur_min;
                    } else if cur_min == rank {
                        // the newcomer ties the standing minimum
                        self.schemes[i]
                            .table
                            .entry(rank)
                            .or_default()
                            .push(offset + pos);
                    }
                }
            }
        }

        // drain: shrink every window to its end, indexing fresh minima
        loop {
            let mut draining = false;
            for i in 0..nschemes {
                if queues[i].len() > 1 {
                    draining = true;
                    let before = queues[i].min().unwrap();
                    queues[i].remove_oldest();
                    let after = queues[i].min().unwrap();
                    if before.rank != after.rank {
                        for e in queues[i].all_min().collect::<Vec<_>>() {
                            self.schemes[i]
                                .table
                                .entry(e.rank)
                                .or_default()
                                .push(offset + e.pos);
                        }
                    }
                }
            }
            if !draining {
                break;
            }
        }

        self.seq_offsets.push(offset + nread);
        Ok(())
    }

    /// The indexed offsets of a k-mer, looked up by the scheme matching
    /// its length. `None` when the length matches no scheme or the k-mer
    /// was never a minimizer.
    pub fn get(&self, kmer: &[Xchar]) -> Option<&[usize]> {
        let &scheme = self.by_k.get(&kmer.len())?;
        let rank = self.hasher.hash(kmer);
        self.schemes[scheme]
            .table
            .get(&rank)
            .map(|v| v.as_slice())
    }
}
