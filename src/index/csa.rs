/*
 * SPDX-FileCopyrightText: 2023 Tommaso Fontana
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Multi-level ψ-based compressed suffix arrays.
//!
//! Level 0 represents the full suffix array of the input (length `n+1`,
//! including the virtual sentinel); each subsequent level halves the
//! length, and a level short enough (≤ 3 entries) stores its permutation
//! and inverse plainly. A non-terminal level keeps three succinct
//! structures:
//!
//! * `even`: marks sorted positions whose suffix-array value is even —
//!   these project into the next level,
//! * `char_stops`: marks the last position of each run of equal first
//!   characters in sorted-suffix order,
//! * `phi`: a wavelet tree over the ψ permutation (sorted position →
//!   sorted position of the suffix one text position later), stored as
//!   normalized characters so that ψ is one `select`.
//!
//! `get` walks even positions down a level and odd positions through ψ;
//! `inverse` runs the same recurrences backwards.

use anyhow::{Context, Result};
#[cfg(feature = "mem_dbg")]
use mem_dbg::{MemDbg, MemSize};

use crate::alphabet::{Alphabet, Xchar};
use crate::bits::BitVec;

use super::rank_select::RankSelectArray;
use super::sais::suffix_array;
use super::wavelet::{WaveletTree, WtShape};

const MAX_PLAIN_LEN: usize = 3;
const SENTINEL: u8 = b'$';

#[derive(Debug, Clone)]
#[cfg_attr(feature = "mem_dbg", derive(MemDbg, MemSize))]
struct CsaLevel {
    len: usize,
    char_stops: RankSelectArray,
    phi: WaveletTree,
    /// `None` at the terminal level.
    even: Option<RankSelectArray>,
}

/// A compressed suffix array over a byte text.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "mem_dbg", derive(MemDbg, MemSize))]
pub struct CompressedSuffixArray {
    ext_ab: Alphabet,
    levels: Vec<CsaLevel>,
    tail_sa: Vec<usize>,
    tail_inv: Vec<usize>,
}

fn invert(sa: &[usize], inv: &mut [usize]) {
    for (i, &p) in sa.iter().enumerate() {
        inv[p] = i;
    }
}

impl CompressedSuffixArray {
    /// Builds the index from a text over `ab` (cloned into the extended
    /// alphabet). The input is consumed conceptually: the suffix array is
    /// computed once with SA-IS and then folded level by level.
    ///
    /// Texts containing the sentinel byte `b'$'` are rejected.
    pub fn new(text: &[u8], ab: &Alphabet) -> Result<Self> {
        let n = text.len();
        let mut nlevels = 1;
        {
            let mut l = n + 1;
            while l > MAX_PLAIN_LEN {
                l = l.div_ceil(2);
                nlevels += 1;
            }
        }

        let mut sa = suffix_array(text, ab);
        let mut inv = vec![0usize; n + 1];
        invert(&sa, &mut inv);

        let mut lvl_len = n + 1;

        // level-0 character stops and the extended alphabet: the sentinel
        // first, then the distinct text characters in sorted-suffix order
        let first_char = |p: usize| text.get(p).copied();
        let mut stops = BitVec::new();
        stops.push_n(false, lvl_len);
        stops.set(0, true);
        stops.set(lvl_len - 1, true);
        let mut letters = vec![SENTINEL];
        let mut ndiff = 1usize;
        for i in 1..lvl_len {
            if first_char(sa[i]) != first_char(sa[i - 1]) {
                stops.set(i - 1, true);
                letters.push(text[sa[i]]);
                ndiff += 1;
            }
        }
        let ext_ab = Alphabet::from_letters(&letters)
            .context("texts containing the sentinel byte b'$' are not supported")?;

        // normalized text: cur[p] = first-character bucket of suffix p
        let mut cur = vec![0usize; lvl_len];
        let mut bucket = 0;
        for i in 0..lvl_len {
            cur[sa[i]] = bucket;
            if stops.get(i) {
                bucket += 1;
            }
        }

        let mut levels = Vec::with_capacity(nlevels);
        for lvl in 0..nlevels {
            let char_stops = RankSelectArray::from_bit_vec(stops);

            // ψ as a normalized-character string: position ψ(i) holds the
            // bucket of the suffix at sorted position i
            debug_assert!(ndiff <= Xchar::MAX as usize);
            let mut phi = vec![0 as Xchar; lvl_len];
            for i in 0..lvl_len {
                phi[inv[(sa[i] + 1) % lvl_len]] = cur[sa[i]] as Xchar;
            }
            let phi_wt =
                WaveletTree::from_symbols(&Alphabet::new_int(ndiff), &phi, WtShape::Balanced)?;

            if lvl == nlevels - 1 {
                levels.push(CsaLevel {
                    len: lvl_len,
                    char_stops,
                    phi: phi_wt,
                    even: None,
                });
                break;
            }

            // mark even suffix-array values and project them, halved,
            // into the front of the buffer for the next level
            let mut even = BitVec::with_capacity(lvl_len);
            let mut kept = 0;
            for i in 0..lvl_len {
                if sa[i] % 2 == 0 {
                    even.push(true);
                    sa[kept] = sa[i] / 2;
                    kept += 1;
                } else {
                    even.push(false);
                }
            }
            levels.push(CsaLevel {
                len: lvl_len,
                char_stops,
                phi: phi_wt,
                even: Some(RankSelectArray::from_bit_vec(even)),
            });

            // prepare the next level: its "characters" are the pairs of
            // normalized characters at 2p and 2p+1
            let nxt_len = lvl_len.div_ceil(2);
            debug_assert_eq!(kept, nxt_len);
            invert(&sa[..nxt_len], &mut inv);
            let pair = |p: usize| {
                let hi = cur[2 * p];
                let lo = if 2 * p + 1 < lvl_len { cur[2 * p + 1] } else { 0 };
                (hi, lo)
            };
            stops = BitVec::new();
            stops.push_n(false, nxt_len);
            ndiff = 1;
            let mut prev = pair(sa[0]);
            for i in 1..nxt_len {
                let this = pair(sa[i]);
                if this != prev {
                    stops.set(i - 1, true);
                    ndiff += 1;
                }
                prev = this;
            }
            stops.set(nxt_len - 1, true);

            let mut ncur = vec![0usize; nxt_len];
            let mut bucket = 0;
            for i in 0..nxt_len {
                ncur[sa[i]] = bucket;
                if stops.get(i) {
                    bucket += 1;
                }
            }
            cur = ncur;
            lvl_len = nxt_len;
        }

        sa.truncate(lvl_len);
        inv.truncate(lvl_len);
        Ok(Self {
            ext_ab,
            levels,
            tail_sa: sa,
            tail_inv: inv,
        })
    }

    /// Length of the represented suffix array: text length plus one for
    /// the virtual sentinel.
    #[inline]
    pub fn len(&self) -> usize {
        self.levels[0].len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        false // there is always at least the sentinel entry
    }

    /// The extended alphabet: sentinel at rank 0, then the distinct text
    /// characters.
    #[inline]
    pub fn extended_alphabet(&self) -> &Alphabet {
        &self.ext_ab
    }

    fn psi_level(&self, lvl: usize, i: usize) -> usize {
        let level = &self.levels[lvl];
        let c = level.char_stops.rank1(i);
        let p = level.char_stops.pred(i, true);
        let r = if p < level.len { i - p - 1 } else { i };
        level.phi.select(c as Xchar, r)
    }

    /// ψ(i): the sorted position of the suffix starting one text position
    /// after the suffix at sorted position `i`.
    ///
    /// # Panics
    /// If `i >= len()`.
    pub fn psi(&self, i: usize) -> usize {
        assert!(i < self.len(), "position {} out of {}", i, self.len());
        self.psi_level(0, i)
    }

    fn get_level(&self, lvl: usize, i: usize) -> usize {
        if lvl == self.levels.len() - 1 {
            return self.tail_sa[i];
        }
        let level = &self.levels[lvl];
        let even = level.even.as_ref().unwrap();
        if even.get(i) {
            2 * self.get_level(lvl + 1, even.rank1(i))
        } else {
            let next = self.get_level(lvl, self.psi_level(lvl, i));
            if next > 0 { next - 1 } else { level.len - 1 }
        }
    }

    /// The suffix-array value at sorted position `i`.
    ///
    /// # Panics
    /// If `i >= len()`.
    pub fn get(&self, i: usize) -> usize {
        assert!(i < self.len(), "position {} out of {}", i, self.len());
        self.get_level(0, i)
    }

    fn inverse_level(&self, lvl: usize, i: usize) -> usize {
        if lvl == self.levels.len() - 1 {
            return self.tail_inv[i];
        }
        if i % 2 == 0 {
            let below = self.inverse_level(lvl + 1, i / 2);
            self.levels[lvl].even.as_ref().unwrap().select1(below)
        } else {
            let prev = self.inverse_level(lvl, i - 1);
            self.psi_level(lvl, prev)
        }
    }

    /// The sorted position of the suffix starting at text position `i`
    /// (the inverse permutation of [`get`](Self::get)).
    ///
    /// # Panics
    /// If `i >= len()`.
    pub fn inverse(&self, i: usize) -> usize {
        assert!(i < self.len(), "position {} out of {}", i, self.len());
        self.inverse_level(0, i)
    }

    /// The character at text position `i`; positions at or past the end
    /// of the text return the sentinel symbol.
    pub fn char_at(&self, i: usize) -> Xchar {
        if i + 1 >= self.len() {
            return self.ext_ab.symbol(0);
        }
        let inv = self.inverse(i);
        self.ext_ab.symbol(self.levels[0].char_stops.rank1(inv))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_count_follows_halving() {
        let ab = Alphabet::from_letters(b"abcdr").unwrap();
        // n+1 = 12 → 6 → 3: three levels
        let csa = CompressedSuffixArray::new(b"abracadabra", &ab).unwrap();
        assert_eq!(csa.levels.len(), 3);
        assert_eq!(csa.levels[0].len, 12);
        assert_eq!(csa.levels[1].len, 6);
        assert_eq!(csa.levels[2].len, 3);
        assert!(csa.levels[2].even.is_none());
        assert_eq!(csa.tail_sa.len(), 3);
    }

    #[test]
    fn empty_text() {
        let ab = Alphabet::from_letters(b"ab").unwrap();
        let csa = CompressedSuffixArray::new(b"", &ab).unwrap();
        assert_eq!(csa.len(), 1);
        assert_eq!(csa.get(0), 0);
        assert_eq!(csa.inverse(0), 0);
        assert_eq!(csa.char_at(0), SENTINEL as Xchar);
        assert_eq!(csa.char_at(7), SENTINEL as Xchar);
    }

    #[test]
    fn single_character() {
        let ab = Alphabet::from_letters(b"a").unwrap();
        let csa = CompressedSuffixArray::new(b"a", &ab).unwrap();
        assert_eq!(csa.len(), 2);
        assert_eq!(csa.get(0), 1);
        assert_eq!(csa.get(1), 0);
        assert_eq!(csa.char_at(0), b'a' as Xchar);
        assert_eq!(csa.char_at(1), SENTINEL as Xchar);
    }

    #[test]
    fn sentinel_collision_rejected() {
        let ab = Alphabet::from_letters(b"$a").unwrap();
        assert!(CompressedSuffixArray::new(b"a$a", &ab).is_err());
    }

    #[test]
    fn extended_alphabet_lists_used_chars() {
        let ab = Alphabet::from_letters(b"abcdr").unwrap();
        let csa = CompressedSuffixArray::new(b"abracadabra", &ab).unwrap();
        let ext = csa.extended_alphabet();
        assert_eq!(ext.len(), 6); // $ a b c d r
        assert_eq!(ext.symbol(0), SENTINEL as Xchar);
        assert_eq!(ext.symbol(1), b'a' as Xchar);
        assert_eq!(ext.symbol(5), b'r' as Xchar);
    }
}
