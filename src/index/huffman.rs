/*
 * SPDX-FileCopyrightText: 2023 Tommaso Fontana
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Huffman optimal prefix codes over an alphabet.
//!
//! The tree is a flat array of `2N−1` nodes: the `N` leaves occupy
//! indices `0..N` in alphabet-rank order and internal nodes are appended
//! in merge order, so the root is always the last node. Children are
//! indices, and every internal node carries a bitmask of the leaf ranks it
//! covers. Codes are MSB-first paths from the root, with the left child
//! on 0.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use anyhow::{Result, ensure};
#[cfg(feature = "mem_dbg")]
use mem_dbg::{MemDbg, MemSize};

use crate::alphabet::{Alphabet, Xchar};
use crate::bits::{BitVec, bytes_for, or_bits, set_bit};
use crate::traits::SymbolSource;

/// Node of a [`HuffmanCode`] tree.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "mem_dbg", derive(MemDbg, MemSize))]
pub enum HuffNode {
    /// A leaf carrying the alphabet rank of its symbol.
    Leaf { symbol_rank: usize },
    /// An internal node with child indices and the bitmask of the leaf
    /// ranks below it.
    Internal {
        left: usize,
        right: usize,
        mask: Vec<u8>,
    },
}

/// A frequency-driven prefix code with an encoder and a tree-walking
/// decoder.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "mem_dbg", derive(MemDbg, MemSize))]
pub struct HuffmanCode {
    ab: Alphabet,
    nodes: Vec<HuffNode>,
    codes: Vec<BitVec>,
}

impl HuffmanCode {
    /// Builds the code for an alphabet given one frequency per symbol
    /// rank. The alphabet is cloned.
    pub fn new(ab: &Alphabet, freqs: &[usize]) -> Result<Self> {
        ensure!(!freqs.is_empty(), "empty frequency vector");
        ensure!(
            freqs.len() == ab.len(),
            "got {} frequencies for an alphabet of {} symbols",
            freqs.len(),
            ab.len()
        );
        Ok(Self::build(ab.clone(), freqs))
    }

    /// Counts symbol frequencies from a source and builds the code.
    pub fn from_source(ab: &Alphabet, src: &mut impl SymbolSource) -> Result<Self> {
        src.reset();
        let mut freqs = vec![0usize; ab.len()];
        while let Some(c) = src.next_symbol() {
            let r = ab.rank(c);
            ensure!(r < ab.len(), "symbol {} not in the alphabet", c);
            freqs[r] += 1;
        }
        Self::new(ab, &freqs)
    }

    /// Discovers a byte alphabet from the source (symbols with zero count
    /// omitted, letters ascending) and builds the code over it. The
    /// resulting code owns the discovered alphabet.
    pub fn from_bytes_online(src: &mut impl SymbolSource) -> Result<Self> {
        src.reset();
        let mut all = [0usize; 256];
        while let Some(c) = src.next_symbol() {
            ensure!(
                (0..256).contains(&(c as i64)),
                "online alphabet discovery requires byte symbols, got {}",
                c
            );
            all[c as usize] += 1;
        }
        let letters: Vec<u8> = (0..=255u8).filter(|&b| all[b as usize] > 0).collect();
        ensure!(!letters.is_empty(), "empty source");
        let freqs: Vec<usize> = letters.iter().map(|&b| all[b as usize]).collect();
        Ok(Self::build(Alphabet::from_letters(&letters)?, &freqs))
    }

    fn build(ab: Alphabet, freqs: &[usize]) -> Self {
        let n = ab.len();
        let mask_bytes = bytes_for(n);
        let mut nodes: Vec<HuffNode> = (0..n).map(|i| HuffNode::Leaf { symbol_rank: i }).collect();

        // repeatedly merge the two lowest-frequency subtrees; ties break
        // on node index so the layout is deterministic
        let mut heap: BinaryHeap<Reverse<(usize, usize)>> =
            freqs.iter().enumerate().map(|(i, &f)| Reverse((f, i))).collect();
        while heap.len() > 1 {
            let Reverse((f_left, left)) = heap.pop().unwrap();
            let Reverse((f_right, right)) = heap.pop().unwrap();
            let mut mask = vec![0u8; mask_bytes];
            Self::or_mask(&nodes, left, &mut mask, n);
            Self::or_mask(&nodes, right, &mut mask, n);
            let merged = nodes.len();
            nodes.push(HuffNode::Internal { left, right, mask });
            heap.push(Reverse((f_left + f_right, merged)));
        }

        let mut codes = vec![BitVec::new(); n];
        if n == 1 {
            // degenerate single-symbol code
            codes[0].push(false);
        } else if n > 1 {
            let mut path = BitVec::new();
            Self::fill_codes(&nodes, nodes.len() - 1, &mut path, &mut codes);
        }
        Self { ab, nodes, codes }
    }

    fn or_mask(nodes: &[HuffNode], idx: usize, out: &mut [u8], n: usize) {
        match &nodes[idx] {
            HuffNode::Leaf { symbol_rank } => set_bit(out, *symbol_rank, true),
            HuffNode::Internal { mask, .. } => or_bits(out, mask, n),
        }
    }

    fn fill_codes(nodes: &[HuffNode], idx: usize, path: &mut BitVec, codes: &mut [BitVec]) {
        match &nodes[idx] {
            HuffNode::Leaf { symbol_rank } => codes[*symbol_rank] = path.clone(),
            HuffNode::Internal { left, right, .. } => {
                path.push(false);
                Self::fill_codes(nodes, *left, path, codes);
                path.pop();
                path.push(true);
                Self::fill_codes(nodes, *right, path, codes);
                path.pop();
            }
        }
    }

    /// The alphabet the code is defined over.
    #[inline]
    pub fn alphabet(&self) -> &Alphabet {
        &self.ab
    }

    /// Number of coded symbols.
    #[inline]
    pub fn len(&self) -> usize {
        self.ab.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ab.is_empty()
    }

    /// Index of the root node, or `None` for an empty alphabet.
    #[inline]
    pub fn root(&self) -> Option<usize> {
        if self.nodes.is_empty() {
            None
        } else {
            Some(self.nodes.len() - 1)
        }
    }

    #[inline]
    pub fn node(&self, idx: usize) -> &HuffNode {
        &self.nodes[idx]
    }

    /// The code of the symbol of the given alphabet rank.
    #[inline]
    pub fn code(&self, rank: usize) -> &BitVec {
        &self.codes[rank]
    }

    /// Bitmask of the leaf ranks covered by a node.
    pub fn mask(&self, idx: usize) -> Vec<u8> {
        match &self.nodes[idx] {
            HuffNode::Leaf { symbol_rank } => {
                let mut mask = vec![0u8; bytes_for(self.ab.len())];
                set_bit(&mut mask, *symbol_rank, true);
                mask
            }
            HuffNode::Internal { mask, .. } => mask.clone(),
        }
    }

    /// Encodes the symbols of a source by code concatenation.
    ///
    /// # Panics
    /// If a symbol is not in the alphabet.
    pub fn encode_source(&self, src: &mut impl SymbolSource) -> BitVec {
        let mut out = BitVec::new();
        while let Some(c) = src.next_symbol() {
            out.extend_from(self.code_of(c));
        }
        out
    }

    /// Encodes a symbol slice.
    pub fn encode_symbols(&self, symbols: &[Xchar]) -> BitVec {
        let mut out = BitVec::new();
        for &c in symbols {
            out.extend_from(self.code_of(c));
        }
        out
    }

    #[inline]
    fn code_of(&self, c: Xchar) -> &BitVec {
        let r = self.ab.rank(c);
        assert!(r < self.ab.len(), "symbol {} not in the alphabet", c);
        &self.codes[r]
    }

    /// Decodes a bit sequence by walking the tree from the root. A
    /// trailing partial code is silently dropped.
    pub fn decode(&self, bits: &BitVec) -> Vec<Xchar> {
        let mut out = Vec::new();
        let Some(root) = self.root() else {
            return out;
        };
        if let HuffNode::Leaf { symbol_rank } = self.nodes[root] {
            // single-symbol alphabet: one symbol per bit
            for _ in 0..bits.len() {
                out.push(self.ab.symbol(symbol_rank));
            }
            return out;
        }
        let mut cur = root;
        for i in 0..bits.len() {
            let HuffNode::Internal { left, right, .. } = &self.nodes[cur] else {
                unreachable!("decode walk stopped on a leaf");
            };
            cur = if bits.get(i) { *right } else { *left };
            if let HuffNode::Leaf { symbol_rank } = self.nodes[cur] {
                out.push(self.ab.symbol(symbol_rank));
                cur = root;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ByteSource;

    fn xchars(s: &[u8]) -> Vec<Xchar> {
        s.iter().map(|&b| b as Xchar).collect()
    }

    #[test]
    fn abcde_roundtrip_and_kraft() {
        let ab = Alphabet::from_letters(b"abcde").unwrap();
        let hc = HuffmanCode::new(&ab, &[15, 7, 6, 6, 5]).unwrap();

        let enc = hc.encode_symbols(&xchars(b"abcde"));
        assert_eq!(hc.decode(&enc), xchars(b"abcde"));

        // the highest-frequency symbol gets the shortest code
        assert_eq!(hc.code(0).len(), 1);

        // Kraft equality: sum of 2^(maxlen - len) must be 2^maxlen
        let max_len = (0..5).map(|r| hc.code(r).len()).max().unwrap();
        let kraft: u64 = (0..5).map(|r| 1u64 << (max_len - hc.code(r).len())).sum();
        assert_eq!(kraft, 1u64 << max_len);
    }

    #[test]
    fn codes_are_prefix_free() {
        let ab = Alphabet::from_letters(b"abcde").unwrap();
        let hc = HuffmanCode::new(&ab, &[15, 7, 6, 6, 5]).unwrap();
        for i in 0..5 {
            for j in 0..5 {
                if i == j {
                    continue;
                }
                let (a, b) = (hc.code(i), hc.code(j));
                let prefix = a.len() <= b.len() && (0..a.len()).all(|k| a.get(k) == b.get(k));
                assert!(!prefix, "code {} is a prefix of code {}", i, j);
            }
        }
    }

    #[test]
    fn tree_layout() {
        let ab = Alphabet::from_letters(b"abcde").unwrap();
        let hc = HuffmanCode::new(&ab, &[15, 7, 6, 6, 5]).unwrap();
        // 2N−1 nodes, leaves first in rank order, root last
        assert_eq!(hc.root(), Some(8));
        for r in 0..5 {
            assert_eq!(*hc.node(r), HuffNode::Leaf { symbol_rank: r });
        }
        // the root mask covers the whole alphabet
        assert_eq!(hc.mask(8), vec![0b1111_1000]);
    }

    #[test]
    fn single_symbol_degenerates_to_one_bit() {
        let ab = Alphabet::from_letters(b"x").unwrap();
        let hc = HuffmanCode::new(&ab, &[42]).unwrap();
        assert_eq!(hc.code(0).len(), 1);
        let enc = hc.encode_symbols(&xchars(b"xxx"));
        assert_eq!(enc.len(), 3);
        assert_eq!(hc.decode(&enc), xchars(b"xxx"));
    }

    #[test]
    fn stream_and_online_constructors_agree() {
        let text = b"abracadabra";
        let ab = Alphabet::from_letters(b"abcdr").unwrap();
        let from_stream = HuffmanCode::from_source(&ab, &mut ByteSource::new(text)).unwrap();
        let online = HuffmanCode::from_bytes_online(&mut ByteSource::new(text)).unwrap();
        // the discovered alphabet is the same set of letters
        assert_eq!(online.alphabet(), &ab);
        let enc_a = from_stream.encode_source(&mut ByteSource::new(text));
        let enc_b = online.encode_source(&mut ByteSource::new(text));
        assert_eq!(enc_a.len(), enc_b.len());
        assert_eq!(online.decode(&enc_b), xchars(text));
    }

    #[test]
    fn partial_trailing_code_is_dropped() {
        let ab = Alphabet::from_letters(b"abcde").unwrap();
        let hc = HuffmanCode::new(&ab, &[15, 7, 6, 6, 5]).unwrap();
        let mut enc = hc.encode_symbols(&xchars(b"bc"));
        // chop the last bit of the final (3-bit) code
        enc.pop();
        assert_eq!(hc.decode(&enc), xchars(b"b"));
    }

    #[test]
    fn rejects_shape_mismatches() {
        let ab = Alphabet::from_letters(b"ab").unwrap();
        assert!(HuffmanCode::new(&ab, &[]).is_err());
        assert!(HuffmanCode::new(&ab, &[1, 2, 3]).is_err());
    }
}
