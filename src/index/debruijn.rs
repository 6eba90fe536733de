/*
 * SPDX-FileCopyrightText: 2023 Tommaso Fontana
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Succinct order-k de Bruijn graphs (BOSS representation).
//!
//! The text is padded with `k` sentinels on the left and one on the
//! right; its (k+1)-mers, sorted by (reversed node label, edge label) and
//! deduplicated, give `E` edges over `V` node labels. Edges whose label
//! already left a node with the same (k−1)-mer suffix are relabeled with
//! a *marker* character so that each (node-suffix, label) pair keeps
//! exactly one plain occurrence.
//!
//! Characters live in an extended integer alphabet of size `2σ+1`: rank 0
//! is the sentinel, ranks `1..=σ` are the input symbols shifted by one,
//! and ranks `σ+1..=2σ` are the markers. The graph stores a
//! Huffman-shaped wavelet tree over the edge labels, the `F` bit array
//! marking the last edge of each node, cumulative counts of node-label
//! last characters, and a derived bit array that answers "last character
//! of this node's label" with one `select0` and one `rank1`.
//!
//! Node ids are edge positions: a node is identified by the position of
//! its last edge.

use anyhow::{Result, ensure};
#[cfg(feature = "mem_dbg")]
use mem_dbg::{MemDbg, MemSize};

use crate::alphabet::{Alphabet, XEOF, Xchar};
use crate::bits::BitVec;
use crate::traits::{ByteSource, SymbolSource};

use super::rank_select::RankSelectArray;
use super::wavelet::{WaveletTree, WtShape};

/// A succinct order-k de Bruijn graph.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "mem_dbg", derive(MemDbg, MemSize))]
pub struct DeBruijnGraph {
    input_ab: Alphabet,
    k: usize,
    multigraph: bool,
    node_count: usize,
    edge_count: usize,
    edge_labels: WaveletTree,
    last_edge: RankSelectArray,
    char_cumul: Vec<usize>,
    label_last_char: RankSelectArray,
}

impl DeBruijnGraph {
    /// The sentinel in the extended character space.
    pub const SENTINEL: Xchar = 0;

    /// Builds the order-`k` graph of the text produced by `src` over
    /// `ab` (cloned). With `multigraph`, repeated (k+1)-mers stay as
    /// parallel edges instead of being deduplicated.
    pub fn from_source(
        ab: &Alphabet,
        src: &mut impl SymbolSource,
        k: usize,
        multigraph: bool,
    ) -> Result<Self> {
        ensure!(k >= 1, "order must be at least 1");
        let sigma = ab.len();
        let ext_size = 2 * sigma + 1;

        // pad with k sentinels on the left and one on the right,
        // converting to extended ranks
        src.reset();
        let mut padded = vec![0usize; k];
        while let Some(c) = src.next_symbol() {
            let r = ab.rank(c);
            ensure!(r < sigma, "symbol {} not in the alphabet", c);
            padded.push(r + 1);
        }
        padded.push(0);

        // sort (k+1)-mer start positions: reversed node label as the
        // most significant key, edge label least significant
        let kmer_count = padded.len() - k;
        let mut starts: Vec<usize> = (0..kmer_count).collect();
        starts.sort_by(|&a, &b| {
            padded[a..a + k]
                .iter()
                .rev()
                .cmp(padded[b..b + k].iter().rev())
                .then_with(|| padded[a + k].cmp(&padded[b + k]))
        });

        // one scan identifies nodes and edges and assigns markers
        let mut edges: Vec<Xchar> = Vec::new();
        let mut last = BitVec::new();
        let mut char_count = vec![0usize; ext_size + 1];
        let mut seen = vec![false; ext_size];
        let mut node_count = 0;
        let mut prev: Option<usize> = None;
        for &cur in &starts {
            let (new_node, new_edge) = match prev {
                None => (true, true),
                Some(p) if padded[cur..cur + k] != padded[p..p + k] => (true, true),
                Some(p) if padded[cur + k] != padded[p + k] => (false, true),
                Some(_) => (false, multigraph),
            };
            let suffix_changed = match prev {
                None => true,
                Some(p) => padded[cur + 1..cur + k] != padded[p + 1..p + k],
            };
            if suffix_changed {
                seen.fill(false);
            }
            if new_node {
                if !edges.is_empty() {
                    last.set(edges.len() - 1, true);
                }
                node_count += 1;
            }
            if new_edge {
                let mut ec = padded[cur + k];
                if seen[ec] {
                    ec += sigma;
                } else {
                    seen[ec] = true;
                }
                edges.push(ec as Xchar);
                last.push(false);
                char_count[padded[cur + k - 1] + 1] += 1;
            }
            prev = Some(cur);
        }
        let edge_count = edges.len();
        last.set(edge_count - 1, true);
        for i in 1..char_count.len() {
            char_count[i] += char_count[i - 1];
        }
        debug_assert_eq!(char_count[ext_size], edge_count);

        let edge_labels =
            WaveletTree::from_symbols(&Alphabet::new_int(ext_size), &edges, WtShape::Huffman)?;
        let last_edge = RankSelectArray::from_bit_vec(last);

        // interleave a stop marker after each character's run of edges
        let mut llc = BitVec::new();
        llc.push_n(false, ext_size + edge_count);
        for i in 0..ext_size {
            llc.set(char_count[i + 1] + i, true);
        }
        let label_last_char = RankSelectArray::from_bit_vec(llc);

        Ok(Self {
            input_ab: ab.clone(),
            k,
            multigraph,
            node_count,
            edge_count,
            edge_labels,
            last_edge,
            char_cumul: char_count,
            label_last_char,
        })
    }

    pub fn from_bytes(ab: &Alphabet, text: &[u8], k: usize, multigraph: bool) -> Result<Self> {
        Self::from_source(ab, &mut ByteSource::new(text), k, multigraph)
    }

    /// The input alphabet.
    #[inline]
    pub fn alphabet(&self) -> &Alphabet {
        &self.input_ab
    }

    /// Size of the extended character space (`2σ+1`).
    #[inline]
    pub fn extended_size(&self) -> usize {
        2 * self.input_ab.len() + 1
    }

    #[inline]
    pub fn k(&self) -> usize {
        self.k
    }

    #[inline]
    pub fn is_multigraph(&self) -> bool {
        self.multigraph
    }

    /// Number of distinct node labels.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Number of edges.
    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Lifts an input symbol into the extended space.
    #[inline]
    pub fn to_extended(&self, c: Xchar) -> Option<Xchar> {
        if self.input_ab.contains(c) {
            Some((self.input_ab.rank(c) + 1) as Xchar)
        } else {
            None
        }
    }

    /// Maps an extended character back to its input symbol; the sentinel
    /// and marker characters map to [`XEOF`].
    #[inline]
    pub fn to_input(&self, ec: Xchar) -> Xchar {
        if ec <= 0 || ec > self.input_ab.len() as Xchar {
            return XEOF;
        }
        self.input_ab.symbol(ec as usize - 1)
    }

    /// Whether an extended character is a marker.
    #[inline]
    pub fn is_marker(&self, ec: Xchar) -> bool {
        ec > self.input_ab.len() as Xchar
    }

    /// The plain (unmarked) form of an extended character.
    #[inline]
    pub fn plain_form(&self, ec: Xchar) -> Xchar {
        if self.is_marker(ec) {
            ec - self.input_ab.len() as Xchar
        } else {
            ec
        }
    }

    #[inline]
    fn marker_form(&self, ec: Xchar) -> Xchar {
        if self.is_marker(ec) {
            ec
        } else {
            ec + self.input_ab.len() as Xchar
        }
    }

    /// The extended label of the edge at position `eid`.
    #[inline]
    pub fn edge_label(&self, eid: usize) -> Xchar {
        self.edge_labels.access(eid)
    }

    /// The node id whose last edge is at or after edge position `pos`.
    fn true_node(&self, pos: usize) -> usize {
        if self.last_edge.get(pos) {
            pos
        } else {
            self.last_edge.succ(pos, true)
        }
    }

    /// The id of the node of the given rank.
    #[inline]
    pub fn node_id(&self, rank: usize) -> usize {
        self.last_edge.select1(rank)
    }

    /// The rank of a node id.
    #[inline]
    pub fn node_rank(&self, nid: usize) -> usize {
        self.last_edge.rank1(nid)
    }

    /// Number of outgoing edges of a node.
    pub fn outdeg(&self, nid: usize) -> usize {
        if nid == 0 {
            return 1.min(self.node_count);
        }
        nid - self.last_edge.pred(nid, true)
    }

    /// Number of outgoing edges of `nid` labeled with the input symbol
    /// `c`, counting marked occurrences.
    pub fn labelled_outdeg(&self, nid: usize, c: Xchar) -> usize {
        let Some(plain) = self.to_extended(c) else {
            return 0;
        };
        let marked = self.marker_form(plain);
        let mut deg =
            self.edge_labels.rank(nid + 1, plain) + self.edge_labels.rank(nid + 1, marked);
        if nid != 0 {
            let prev = self.last_edge.pred(nid, true);
            deg -= self.edge_labels.rank(prev + 1, plain) + self.edge_labels.rank(prev + 1, marked);
        }
        deg
    }

    /// The node reached from `nid` along the edge labeled with the input
    /// symbol `c`, or `edge_count()` if there is none.
    pub fn child(&self, nid: usize, c: Xchar) -> usize {
        match self.to_extended(c) {
            Some(ec) => self.child_ext(nid, ec),
            None => self.edge_count,
        }
    }

    /// [`child`](Self::child) in the extended space; `ec` 0 follows the
    /// sentinel edge.
    pub fn child_ext(&self, nid: usize, ec: Xchar) -> usize {
        let low = if nid == 0 {
            0
        } else {
            self.last_edge.pred(nid, true) + 1
        };
        let high = nid + 1;
        // edges of this node live in [low, high); look for the plain
        // label first, then for its marker
        let p = self.edge_labels.pred(high, ec);
        if low <= p && p < high {
            return self.follow(ec, p);
        }
        let p = self.edge_labels.pred(high, self.marker_form(ec));
        if low <= p && p < high {
            // the marker guarantees a preceding plain occurrence on a
            // node with the same label suffix
            let p = self.edge_labels.pred(p, ec);
            return self.follow(ec, p);
        }
        self.edge_count
    }

    /// Resolves the target node of the plain `ec`-labeled edge at
    /// position `p`.
    fn follow(&self, ec: Xchar, p: usize) -> usize {
        let crk = ec as usize;
        let local = self.edge_labels.rank_pos(p);
        let past = if crk == 0 {
            0
        } else {
            self.last_edge.rank1(self.char_cumul[crk])
        };
        self.last_edge.select1(past + local)
    }

    /// The rank (in the extended space) of the last character of the
    /// label of node `nid`.
    fn last_char_rank(&self, nid: usize) -> usize {
        let p = self.label_last_char.select0(nid);
        self.label_last_char.rank1(p)
    }

    /// The node whose label precedes `nid`'s (one incoming edge), or
    /// `edge_count()` for the root.
    pub fn parent(&self, nid: usize) -> usize {
        if nid == 0 {
            return self.edge_count;
        }
        let crk = self.last_char_rank(nid);
        let r = self.last_edge.rank1(nid) - self.last_edge.rank1(self.char_cumul[crk]);
        let par = self.edge_labels.select(crk as Xchar, r);
        self.true_node(par)
    }

    /// The label of node `nid` as `k` extended characters, padded with
    /// sentinels on the left when the walk hits the root early.
    pub fn node_label(&self, nid: usize) -> Vec<Xchar> {
        let mut label = vec![Self::SENTINEL; self.k];
        if nid >= self.edge_count {
            return label;
        }
        let mut cur = nid;
        let mut filled = 0;
        while filled < self.k && cur > 0 && cur < self.edge_count {
            label[self.k - 1 - filled] = self.last_char_rank(cur) as Xchar;
            cur = self.parent(cur);
            filled += 1;
        }
        label
    }

    /// The label of node `nid` rendered over the input alphabet, with
    /// `'$'` for sentinels; test and debugging helper.
    pub fn node_label_string(&self, nid: usize) -> String {
        self.node_label(nid)
            .iter()
            .map(|&ec| {
                let c = self.to_input(ec);
                if c == XEOF { '$' } else { c as u8 as char }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extended_char_conversions() {
        let ab = Alphabet::from_letters(b"acgt").unwrap();
        let g = DeBruijnGraph::from_bytes(&ab, b"acgtacg", 3, false).unwrap();
        assert_eq!(g.extended_size(), 9);
        assert_eq!(g.to_extended(b'a' as Xchar), Some(1));
        assert_eq!(g.to_extended(b't' as Xchar), Some(4));
        assert_eq!(g.to_extended(b'z' as Xchar), None);
        assert_eq!(g.to_input(3), b'g' as Xchar);
        assert_eq!(g.to_input(DeBruijnGraph::SENTINEL), XEOF);
        assert!(g.is_marker(7));
        assert_eq!(g.plain_form(7), 3);
        assert_eq!(g.to_input(g.plain_form(7)), b'g' as Xchar);
    }

    #[test]
    fn acgtacg_counts() {
        let ab = Alphabet::from_letters(b"acgt").unwrap();
        let g = DeBruijnGraph::from_bytes(&ab, b"acgtacg", 3, false).unwrap();
        assert_eq!(g.edge_count(), 8);
        assert_eq!(g.node_count(), 7);
        // "acg" is the only node with two outgoing edges ($ and t), so F
        // has a single 0, at its first edge
        let f: Vec<bool> = (0..8).map(|i| g.last_edge.get(i)).collect();
        assert_eq!(
            f,
            vec![true, true, true, true, true, false, true, true]
        );
    }

    #[test]
    fn multigraph_keeps_parallel_edges() {
        let ab = Alphabet::from_letters(b"ab").unwrap();
        // "aaa" with k=2: the (k+1)-mer "aaa" appears once, but "$aa"
        // and "aa$" overlap; dedup differences only show with repeats
        let simple = DeBruijnGraph::from_bytes(&ab, b"aaaa", 2, false).unwrap();
        let multi = DeBruijnGraph::from_bytes(&ab, b"aaaa", 2, true).unwrap();
        assert!(multi.edge_count() > simple.edge_count());
        assert_eq!(simple.node_count(), multi.node_count());
    }
}
