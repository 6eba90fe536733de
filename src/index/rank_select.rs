/*
 * SPDX-FileCopyrightText: 2023 Tommaso Fontana
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Combined-sampling rank/select bit arrays.
//!
//! A [`RankSelectArray`] is an immutable bit array of length `n` that
//! answers `rank`, `select`, `pred` and `succ` for both bit values in
//! amortized constant time. It keeps three sample tables over the raw
//! bits:
//!
//! * cumulative 1-counts every `max(16, ⌊log₂(n)²/8⌋·8)` bits,
//! * for each bit value `b`, the byte position containing every
//!   `⌊log₂(count_b)²/8⌋·8`-th occurrence of `b`, together with a one-byte
//!   in-byte correction.
//!
//! The tables are *combined*: `rank1` fast-forwards through the select-1
//! samples to skip over runs, and `select1` fast-forwards through the rank
//! samples. `select0` has no rank-0 samples to lean on, so it only uses
//! its own select samples. All sample intervals are multiples of eight so
//! sample positions stay byte-aligned, and samples are packed into
//! minimum-width byte fields.

#[cfg(feature = "mem_dbg")]
use mem_dbg::{MemDbg, MemSize};

use crate::bits::{
    BYTE_BITS, BitVec, byte_count, byte_select, bytes_for, count_ones_bytes, get_bit, msb_mask,
    read_usize, write_usize,
};

const MIN_SAMPLE_INTERVAL: usize = 2 * BYTE_BITS;

/// Bit interval between samples for a population of `n` positions.
/// Always a multiple of [`BYTE_BITS`].
fn sample_interval(n: usize) -> usize {
    if n < 2 {
        return MIN_SAMPLE_INTERVAL;
    }
    let sq = (n as f64).log2().powi(2);
    MIN_SAMPLE_INTERVAL.max((sq / BYTE_BITS as f64) as usize * BYTE_BITS)
}

/// Minimum number of whole bytes able to hold values in `0..=max_value`.
fn field_bytes(max_value: usize) -> usize {
    let bits = ((max_value + 1) as f64).log2().ceil() as usize;
    bits.div_ceil(BYTE_BITS)
}

/// A static bit array with combined-sampling rank/select support.
///
/// The array owns its backing bytes; build it with
/// [`from_raw`](RankSelectArray::from_raw) or
/// [`from_bit_vec`](RankSelectArray::from_bit_vec).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "mem_dbg", derive(MemDbg, MemSize))]
pub struct RankSelectArray {
    data: Vec<u8>,
    len: usize,
    byte_len: usize,
    total: [usize; 2],
    bytes_per_pos: usize,
    bytes_per_byte_pos: usize,
    rank_interval: usize,
    rank_sample_count: usize,
    rank_samples: Vec<u8>,
    sel_interval: [usize; 2],
    sel_sample_count: [usize; 2],
    sel_samples: [Vec<u8>; 2],
    sel_corrections: [Vec<u8>; 2],
}

impl RankSelectArray {
    /// Takes ownership of a raw MSB-first bit buffer of `len` bits and
    /// indexes it. Bits of the final byte past `len` are cleared.
    ///
    /// # Panics
    /// If the buffer is shorter than `len` bits.
    pub fn from_raw(mut data: Vec<u8>, len: usize) -> Self {
        let byte_len = bytes_for(len);
        assert!(
            data.len() >= byte_len,
            "buffer of {} bytes cannot hold {} bits",
            data.len(),
            len
        );
        data.truncate(byte_len);
        if len % BYTE_BITS != 0 {
            data[byte_len - 1] &= msb_mask(len % BYTE_BITS);
        }
        let mut ret = Self {
            data,
            len,
            byte_len,
            total: [0; 2],
            bytes_per_pos: field_bytes(len),
            bytes_per_byte_pos: field_bytes(byte_len),
            rank_interval: 0,
            rank_sample_count: 0,
            rank_samples: Vec::new(),
            sel_interval: [0; 2],
            sel_sample_count: [0; 2],
            sel_samples: [Vec::new(), Vec::new()],
            sel_corrections: [Vec::new(), Vec::new()],
        };
        ret.init_rank_samples();
        ret.init_select_samples();
        ret
    }

    /// Indexes the contents of a [`BitVec`].
    pub fn from_bit_vec(bits: BitVec) -> Self {
        let len = bits.len();
        Self::from_raw(bits.into_raw(), len)
    }

    fn init_rank_samples(&mut self) {
        self.rank_interval = sample_interval(self.len);
        self.rank_sample_count = self.len.div_ceil(self.rank_interval).max(1);
        self.rank_samples = vec![0; self.rank_sample_count * self.bytes_per_pos];

        let byte_interval = self.rank_interval / BYTE_BITS;
        let mut cumul = 0;
        let mut byte_pos = 0;
        let mut next_group_byte = 0;
        for group in 0..self.rank_sample_count {
            cumul += count_ones_bytes(&self.data[byte_pos..next_group_byte]);
            byte_pos = next_group_byte;
            let field = self.bytes_per_pos * BYTE_BITS;
            write_usize(&mut self.rank_samples, group * field, cumul, field);
            next_group_byte += byte_interval;
        }

        // finish up with the total number of ones
        if byte_pos * BYTE_BITS < self.len {
            cumul += count_ones_bytes(&self.data[byte_pos..self.byte_len - 1]);
            let tail_mask = msb_mask((self.len - 1) % BYTE_BITS + 1);
            cumul += (self.data[self.byte_len - 1] & tail_mask).count_ones() as usize;
        }
        self.total = [self.len - cumul, cumul];
    }

    fn init_select_samples(&mut self) {
        for bit in 0..2 {
            let total = self.total[bit];
            let interval = sample_interval(total);
            let count = total.div_ceil(interval).max(1);
            self.sel_interval[bit] = interval;
            self.sel_sample_count[bit] = count;
            self.sel_samples[bit] = vec![0; count * self.bytes_per_byte_pos];
            self.sel_corrections[bit] = vec![0; count];

            // at least one sample exists; position it past the end by
            // default so an all-absent bit value rejects fast-forwards
            let field = self.bytes_per_byte_pos * BYTE_BITS;
            write_usize(&mut self.sel_samples[bit], 0, self.byte_len, field);

            let want = bit == 1;
            let mut byte_pos = 0;
            let mut cumul = 0;
            let mut group = 0;
            let mut target = 0;
            while target < total {
                loop {
                    if byte_pos + 8 <= self.byte_len {
                        let word =
                            u64::from_ne_bytes(self.data[byte_pos..byte_pos + 8].try_into().unwrap());
                        let chunk = if want {
                            word.count_ones() as usize
                        } else {
                            word.count_zeros() as usize
                        };
                        if cumul + chunk < target {
                            cumul += chunk;
                            byte_pos += 8;
                            continue;
                        }
                    }
                    let chunk = byte_count(self.data[byte_pos], want);
                    if cumul + chunk < target {
                        cumul += chunk;
                        byte_pos += 1;
                        continue;
                    }
                    break;
                }
                write_usize(&mut self.sel_samples[bit], group * field, byte_pos, field);
                self.sel_corrections[bit][group] = (target - cumul) as u8;
                group += 1;
                target += interval;
            }
        }
    }

    #[inline]
    fn rank_sample(&self, group: usize) -> usize {
        let field = self.bytes_per_pos * BYTE_BITS;
        read_usize(&self.rank_samples, group * field, field)
    }

    #[inline]
    fn sel_sample(&self, bit: usize, group: usize) -> usize {
        let field = self.bytes_per_byte_pos * BYTE_BITS;
        read_usize(&self.sel_samples[bit], group * field, field)
    }

    /// Length in bits.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total number of positions holding `bit`.
    #[inline]
    pub fn count(&self, bit: bool) -> usize {
        self.total[bit as usize]
    }

    /// The backing bytes.
    #[inline]
    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    /// The bit at `pos`.
    ///
    /// # Panics
    /// If `pos >= len()`.
    #[inline]
    pub fn get(&self, pos: usize) -> bool {
        assert!(pos < self.len, "bit {} out of {}", pos, self.len);
        get_bit(&self.data, pos)
    }

    /// Number of positions `j < pos` with the bit set. `pos` values of
    /// `len()` and beyond return the total count.
    pub fn rank1(&self, pos: usize) -> usize {
        if pos >= self.len {
            return self.total[1];
        }

        // jump to the rank sample covering pos
        let group = pos / self.rank_interval;
        let mut rank = self.rank_sample(group);
        let mut byte_pos = group * self.rank_interval / BYTE_BITS;
        let last_byte = pos / BYTE_BITS;

        // then to the last select-1 sample stop before pos
        let mut sel_grp = (rank / self.sel_interval[1]).min(self.sel_sample_count[1] - 1);
        while sel_grp < self.sel_sample_count[1] - 1
            && self.sel_sample(1, sel_grp + 1) * BYTE_BITS < pos
        {
            sel_grp += 1;
        }
        let byte_sel = self.sel_sample(1, sel_grp);
        if byte_pos < byte_sel && byte_sel <= last_byte && byte_sel < self.byte_len {
            byte_pos = byte_sel;
            rank = sel_grp * self.sel_interval[1] - self.sel_corrections[1][sel_grp] as usize;
        }

        // local count up to the tail byte
        rank += count_ones_bytes(&self.data[byte_pos..last_byte]);
        rank += (self.data[last_byte] & msb_mask(pos % BYTE_BITS)).count_ones() as usize;
        rank
    }

    /// Number of positions `j < pos` with the bit clear.
    #[inline]
    pub fn rank0(&self, pos: usize) -> usize {
        if pos >= self.len {
            return self.total[0];
        }
        pos - self.rank1(pos)
    }

    /// Number of positions `j < pos` with `bit`.
    #[inline]
    pub fn rank(&self, pos: usize, bit: bool) -> usize {
        if bit { self.rank1(pos) } else { self.rank0(pos) }
    }

    /// Smallest position holding the `(rank+1)`-th occurrence of `bit`
    /// (so `select(0, bit)` is the first occurrence), or `len()` if there
    /// are at most `rank` occurrences.
    pub fn select(&self, rank: usize, bit: bool) -> usize {
        let b = bit as usize;
        if rank >= self.total[b] {
            return self.len;
        }

        let last_byte = self.len / BYTE_BITS;
        let group = rank / self.sel_interval[b];
        let mut byte_pos = self.sel_sample(b, group);
        if byte_pos > last_byte {
            return self.len;
        }
        let mut cumul = group * self.sel_interval[b] - self.sel_corrections[b][group] as usize;

        if bit {
            // fast-forward through the rank samples; select-0 cannot do
            // this since there are no rank-0 samples
            let mut rank_grp = cumul / self.rank_interval;
            while rank_grp < self.rank_sample_count - 1 && self.rank_sample(rank_grp + 1) <= rank {
                rank_grp += 1;
            }
            let grp_byte = rank_grp * (self.rank_interval / BYTE_BITS);
            if byte_pos < grp_byte {
                byte_pos = grp_byte;
                cumul = self.rank_sample(rank_grp);
            }
        }

        // skip whole words, then bytes, whose counts fit under the gap
        loop {
            if byte_pos + 8 < last_byte && byte_pos + 8 <= self.byte_len {
                let word = u64::from_ne_bytes(self.data[byte_pos..byte_pos + 8].try_into().unwrap());
                let chunk = if bit {
                    word.count_ones() as usize
                } else {
                    word.count_zeros() as usize
                };
                if cumul + chunk <= rank {
                    cumul += chunk;
                    byte_pos += 8;
                    continue;
                }
            }
            if byte_pos < last_byte {
                let chunk = byte_count(self.data[byte_pos], bit);
                if cumul + chunk <= rank {
                    cumul += chunk;
                    byte_pos += 1;
                    continue;
                }
            }
            break;
        }
        let in_byte = byte_select(self.data[byte_pos], rank - cumul, bit);
        self.len.min(byte_pos * BYTE_BITS + in_byte)
    }

    #[inline]
    pub fn select1(&self, rank: usize) -> usize {
        self.select(rank, true)
    }

    #[inline]
    pub fn select0(&self, rank: usize) -> usize {
        self.select(rank, false)
    }

    /// Largest position `q < pos` with `bit`, or `len()` if none.
    pub fn pred(&self, pos: usize, bit: bool) -> usize {
        let rank = self.rank(pos, bit);
        if rank > 0 {
            self.select(rank - 1, bit)
        } else {
            self.len
        }
    }

    /// Smallest position `q > pos` with `bit`, or `len()` if none.
    pub fn succ(&self, pos: usize, bit: bool) -> usize {
        if pos >= self.len {
            return self.len;
        }
        let rank = self.rank(pos, bit);
        if self.get(pos) == bit {
            self.select(rank + 1, bit)
        } else {
            self.select(rank, bit)
        }
    }
}
