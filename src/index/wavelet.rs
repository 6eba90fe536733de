/*
 * SPDX-FileCopyrightText: 2023 Tommaso Fontana
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Wavelet trees: rank/select/access over arbitrary alphabets.
//!
//! A wavelet tree is a binary tree over a partition of the alphabet. The
//! balanced shape splits the rank range into contiguous halves (low half
//! on bit 0); the Huffman shape mirrors the [`HuffmanCode`] tree of the
//! text, so frequent symbols sit near the root. Every symbol's code is its
//! MSB-first path from the root.
//!
//! Physically all node bit vectors live concatenated in one shared
//! [`RankSelectArray`], ordered by the van Emde Boas layout of the tree to
//! keep ancestors and descendants in nearby memory. Each node records its
//! length, its offset into the shared array, and the cumulative 0/1 counts
//! up to that offset, so a rank inside a node is one global rank minus the
//! stored prefix count. Nodes hold indices, never pointers; a child slot
//! is either an internal node index or a leaf symbol.
//!
//! A text over a single-symbol alphabet is stored as a distinct compact
//! variant that answers `access` in O(1) and `rank` by clamping the
//! position.

use anyhow::{Result, ensure};
#[cfg(feature = "mem_dbg")]
use mem_dbg::{MemDbg, MemSize};

use crate::alphabet::{Alphabet, XEOF, Xchar};
use crate::bits::BitVec;
use crate::traits::{ByteSource, SymbolSource, XcharSource};

use super::huffman::{HuffNode, HuffmanCode};
use super::rank_select::RankSelectArray;

/// Tree shape selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "mem_dbg", derive(MemDbg, MemSize))]
#[cfg_attr(feature = "mem_dbg", mem_size(flat))]
pub enum WtShape {
    /// Contiguous halves of the alphabet rank range.
    Balanced,
    /// The shape of the text's Huffman tree.
    Huffman,
}

/// A child slot of a wavelet tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "mem_dbg", derive(MemDbg, MemSize))]
#[cfg_attr(feature = "mem_dbg", mem_size(flat))]
enum WtChild {
    Internal(usize),
    Leaf(Xchar),
    Empty,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "mem_dbg", derive(MemDbg, MemSize))]
#[cfg_attr(feature = "mem_dbg", mem_size(flat))]
struct WtNode {
    len: usize,
    offset: usize,
    cumul: [usize; 2],
    child: [WtChild; 2],
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "mem_dbg", derive(MemDbg, MemSize))]
enum Repr {
    /// Single-symbol alphabet degeneracy.
    Single { symbol: Xchar, len: usize },
    Tree {
        nodes: Vec<WtNode>,
        bits: RankSelectArray,
        /// Path-from-root code of every alphabet rank.
        codes: Vec<BitVec>,
        len: usize,
    },
}

/// A wavelet tree over a text, supporting `access`, `rank`, `select`,
/// `pred` and `succ` per symbol.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "mem_dbg", derive(MemDbg, MemSize))]
pub struct WaveletTree {
    shape: WtShape,
    ab: Alphabet,
    repr: Repr,
}

impl WaveletTree {
    /// Builds a wavelet tree over the symbols of `src`, which must all
    /// belong to `ab` (cloned). The Huffman shape reads the source twice.
    pub fn from_source(
        ab: &Alphabet,
        src: &mut impl SymbolSource,
        shape: WtShape,
    ) -> Result<Self> {
        match ab.len() {
            0 => {
                src.reset();
                ensure!(
                    src.next_symbol().is_none(),
                    "non-empty source over an empty alphabet"
                );
                Ok(Self::empty(shape, ab.clone()))
            }
            1 => {
                src.reset();
                let mut len = 0;
                while let Some(c) = src.next_symbol() {
                    ensure!(ab.rank(c) == 0, "symbol {} not in the alphabet", c);
                    len += 1;
                }
                Ok(Self {
                    shape,
                    ab: ab.clone(),
                    repr: Repr::Single {
                        symbol: ab.symbol(0),
                        len,
                    },
                })
            }
            _ => {
                let mut builder = Builder::new();
                match shape {
                    WtShape::Balanced => builder.init_balanced(ab),
                    WtShape::Huffman => {
                        let hc = HuffmanCode::from_source(ab, src)?;
                        builder.init_huffman(&hc);
                    }
                }
                builder.fill(ab, src)?;
                Ok(builder.finalize(shape, ab.clone()))
            }
        }
    }

    pub fn from_bytes(ab: &Alphabet, text: &[u8], shape: WtShape) -> Result<Self> {
        Self::from_source(ab, &mut ByteSource::new(text), shape)
    }

    pub fn from_symbols(ab: &Alphabet, text: &[Xchar], shape: WtShape) -> Result<Self> {
        Self::from_source(ab, &mut XcharSource::new(text), shape)
    }

    /// Online construction over a byte source with an unknown alphabet.
    ///
    /// Symbols get incrementally assigned codes as they first appear; the
    /// resulting tree owns a fresh alphabet whose letters are listed in
    /// first-seen order.
    pub fn from_bytes_online(src: &mut impl SymbolSource) -> Result<Self> {
        let mut builder = Builder::new();
        let letters = builder.fill_online(src)?;
        match letters.len() {
            0 => Ok(Self::empty(WtShape::Balanced, Alphabet::from_letters(&[])?)),
            1 => Ok(Self {
                shape: WtShape::Balanced,
                ab: Alphabet::from_letters(&letters)?,
                repr: Repr::Single {
                    symbol: letters[0] as Xchar,
                    len: builder.len,
                },
            }),
            _ => Ok(builder.finalize(WtShape::Balanced, Alphabet::from_letters(&letters)?)),
        }
    }

    fn empty(shape: WtShape, ab: Alphabet) -> Self {
        Self {
            shape,
            ab,
            repr: Repr::Tree {
                nodes: vec![WtNode {
                    len: 0,
                    offset: 0,
                    cumul: [0; 2],
                    child: [WtChild::Empty; 2],
                }],
                bits: RankSelectArray::from_raw(Vec::new(), 0),
                codes: Vec::new(),
                len: 0,
            },
        }
    }

    /// Length of the represented text.
    #[inline]
    pub fn len(&self) -> usize {
        match &self.repr {
            Repr::Single { len, .. } => *len,
            Repr::Tree { len, .. } => *len,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn shape(&self) -> WtShape {
        self.shape
    }

    #[inline]
    pub fn alphabet(&self) -> &Alphabet {
        &self.ab
    }

    /// The symbol at position `pos` of the represented text.
    ///
    /// # Panics
    /// If `pos >= len()`.
    pub fn access(&self, pos: usize) -> Xchar {
        match &self.repr {
            Repr::Single { symbol, len } => {
                assert!(pos < *len, "position {} out of {}", pos, len);
                *symbol
            }
            Repr::Tree {
                nodes, bits, len, ..
            } => {
                assert!(pos < *len, "position {} out of {}", pos, len);
                let mut cur = 0;
                let mut local = pos;
                loop {
                    let node = &nodes[cur];
                    let p = node.offset + local;
                    let bit = bits.get(p);
                    local = bits.rank(p, bit) - node.cumul[bit as usize];
                    match node.child[bit as usize] {
                        WtChild::Internal(i) => cur = i,
                        WtChild::Leaf(c) => return c,
                        WtChild::Empty => return XEOF,
                    }
                }
            }
        }
    }

    /// Number of occurrences of `c` before position `pos`. Symbols outside
    /// the represented alphabet rank 0.
    pub fn rank(&self, pos: usize, c: Xchar) -> usize {
        match &self.repr {
            Repr::Single { symbol, len } => {
                if c == *symbol {
                    pos.min(*len)
                } else {
                    0
                }
            }
            Repr::Tree {
                nodes,
                bits,
                codes,
                len,
            } => {
                let Some(code) = codes.get(self.ab.rank(c)) else {
                    return 0;
                };
                if *len == 0 {
                    return 0;
                }
                let mut cur = 0;
                let mut rank = nodes[0].len.min(pos);
                let mut depth = 0;
                loop {
                    let node = &nodes[cur];
                    let bit = code.get_padded(depth);
                    rank = bits.rank(node.offset + rank.min(node.len), bit)
                        - node.cumul[bit as usize];
                    match node.child[bit as usize] {
                        WtChild::Internal(i) if rank > 0 => {
                            cur = i;
                            depth += 1;
                        }
                        _ => break,
                    }
                }
                rank
            }
        }
    }

    /// Position of the `(rank+1)`-th occurrence of `c` (so `select(c, 0)`
    /// is the first one), or `len()` if there are not that many.
    pub fn select(&self, c: Xchar, rank: usize) -> usize {
        match &self.repr {
            Repr::Single { symbol, len } => {
                if c == *symbol && rank < *len {
                    rank
                } else {
                    *len
                }
            }
            Repr::Tree {
                nodes,
                bits,
                codes,
                len,
            } => {
                let Some(code) = codes.get(self.ab.rank(c)) else {
                    return *len;
                };
                Self::select_rec(nodes, bits, 0, code, 0, rank)
            }
        }
    }

    fn select_rec(
        nodes: &[WtNode],
        bits: &RankSelectArray,
        cur: usize,
        code: &BitVec,
        depth: usize,
        rank: usize,
    ) -> usize {
        if cur >= nodes.len() || nodes[cur].len == 0 {
            return 0;
        }
        let node = &nodes[cur];
        let bit = code.get_padded(depth);
        let b = bit as usize;
        let sel = match node.child[b] {
            WtChild::Internal(i) => {
                let below = Self::select_rec(nodes, bits, i, code, depth + 1, rank);
                bits.select(node.cumul[b] + below, bit) - node.offset
            }
            _ => bits.select(node.cumul[b] + rank, bit) - node.offset,
        };
        sel.min(node.len)
    }

    /// The local position of `pos` after descending to its leaf; this is
    /// the rank of the symbol at `pos` among its equals up to `pos`.
    ///
    /// # Panics
    /// If `pos >= len()`.
    pub fn rank_pos(&self, pos: usize) -> usize {
        match &self.repr {
            Repr::Single { len, .. } => {
                assert!(pos < *len, "position {} out of {}", pos, len);
                pos
            }
            Repr::Tree {
                nodes, bits, len, ..
            } => {
                assert!(pos < *len, "position {} out of {}", pos, len);
                let mut cur = 0;
                let mut local = pos;
                loop {
                    let node = &nodes[cur];
                    let p = node.offset + local;
                    let bit = bits.get(p);
                    local = bits.rank(p, bit) - node.cumul[bit as usize];
                    match node.child[bit as usize] {
                        WtChild::Internal(i) => cur = i,
                        _ => return local,
                    }
                }
            }
        }
    }

    /// Largest position `q < pos` holding `c`, or `len()` if none.
    pub fn pred(&self, pos: usize, c: Xchar) -> usize {
        let rank = self.rank(pos, c);
        if rank > 0 {
            self.select(c, rank - 1)
        } else {
            self.len()
        }
    }

    /// Smallest position `q > pos` holding `c`, or `len()` if none.
    pub fn succ(&self, pos: usize, c: Xchar) -> usize {
        if pos >= self.len() {
            return self.len();
        }
        let rank = self.rank(pos, c);
        if self.access(pos) == c {
            self.select(c, rank + 1)
        } else {
            self.select(c, rank)
        }
    }
}

/// Temporary tree used during construction; nodes live in an arena and
/// refer to each other by index.
#[derive(Debug, Default)]
struct TmpNode {
    bv: BitVec,
    child: [TmpChild; 2],
    next_child: usize,
    height: usize,
    index: usize,
    offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum TmpChild {
    #[default]
    Empty,
    Node(usize),
    Leaf(Xchar),
}

#[derive(Debug, Default)]
struct Builder {
    arena: Vec<TmpNode>,
    codes: Vec<BitVec>,
    len: usize,
}

impl Builder {
    /// Starts with an empty root node, as every shape needs one.
    fn new() -> Self {
        let mut b = Self::default();
        b.new_node();
        b
    }

    fn new_node(&mut self) -> usize {
        self.arena.push(TmpNode::default());
        self.arena.len() - 1
    }

    /// Balanced shape: contiguous halves, low half on 0.
    /// Requires `ab.len() >= 2`.
    fn init_balanced(&mut self, ab: &Alphabet) {
        self.codes = vec![BitVec::new(); ab.len()];
        let mut path = BitVec::new();
        self.split_balanced(0, ab, 0, ab.len(), &mut path);
    }

    fn split_balanced(&mut self, node: usize, ab: &Alphabet, l: usize, r: usize, path: &mut BitVec) {
        debug_assert!(r - l >= 2);
        let mid = l + (r - l).div_ceil(2);
        for (dir, (lo, hi)) in [(l, mid), (mid, r)].into_iter().enumerate() {
            path.push(dir == 1);
            if hi - lo == 1 {
                self.arena[node].child[dir] = TmpChild::Leaf(ab.symbol(lo));
                self.codes[lo] = path.clone();
            } else {
                let chd = self.new_node();
                self.arena[node].child[dir] = TmpChild::Node(chd);
                self.split_balanced(chd, ab, lo, hi, path);
            }
            path.pop();
        }
    }

    /// Huffman shape: mirrors the Huffman tree and borrows its codes.
    /// Requires `hc.len() >= 2`.
    fn init_huffman(&mut self, hc: &HuffmanCode) {
        let ab = hc.alphabet();
        self.codes = (0..ab.len()).map(|r| hc.code(r).clone()).collect();
        self.mirror_huffman(0, hc.root().unwrap(), hc);
    }

    fn mirror_huffman(&mut self, node: usize, hidx: usize, hc: &HuffmanCode) {
        let HuffNode::Internal { left, right, .. } = hc.node(hidx) else {
            unreachable!("huffman mirror called on a leaf");
        };
        for (dir, &h) in [*left, *right].iter().enumerate() {
            match hc.node(h) {
                HuffNode::Leaf { symbol_rank } => {
                    self.arena[node].child[dir] = TmpChild::Leaf(hc.alphabet().symbol(*symbol_rank));
                }
                HuffNode::Internal { .. } => {
                    let chd = self.new_node();
                    self.arena[node].child[dir] = TmpChild::Node(chd);
                    self.mirror_huffman(chd, h, hc);
                }
            }
        }
    }

    /// Appends one symbol along its code path, pushing a bit at every
    /// visited node.
    fn append_code(arena: &mut [TmpNode], code: &BitVec) {
        let mut node = Some(0);
        let mut depth = 0;
        while let Some(idx) = node {
            let bit = code.get_padded(depth);
            arena[idx].bv.push(bit);
            node = match arena[idx].child[bit as usize] {
                TmpChild::Node(chd) => Some(chd),
                _ => None,
            };
            depth += 1;
        }
    }

    /// Single filling pass over the source.
    fn fill(&mut self, ab: &Alphabet, src: &mut impl SymbolSource) -> Result<()> {
        src.reset();
        while let Some(c) = src.next_symbol() {
            let r = ab.rank(c);
            ensure!(r < ab.len(), "symbol {} not in the alphabet", c);
            Self::append_code(&mut self.arena, &self.codes[r]);
            self.len += 1;
        }
        Ok(())
    }

    /// Online filling with alphabet discovery; returns the letters in
    /// first-seen order.
    fn fill_online(&mut self, src: &mut impl SymbolSource) -> Result<Vec<u8>> {
        let mut letters: Vec<u8> = Vec::new();
        let mut rank_of = [usize::MAX; 256];
        let mut next_code = BitVec::from_bits(&[false]);
        src.reset();
        while let Some(c) = src.next_symbol() {
            ensure!(
                (0..256).contains(&(c as i64)),
                "online construction requires byte symbols, got {}",
                c
            );
            let r = rank_of[c as usize];
            if r != usize::MAX {
                Self::append_code(&mut self.arena, &self.codes[r]);
            } else {
                let code = next_code.clone();
                incr_code(&mut next_code);
                rank_of[c as usize] = letters.len();
                letters.push(c as u8);
                self.codes.push(code.clone());
                Self::append_new(&mut self.arena, c, &code);
            }
            self.len += 1;
        }
        Ok(letters)
    }

    /// Routes a first occurrence through the tree, alternating each
    /// node's next-child slot, and grows a new leaf (or splits an
    /// occupied slot) where the walk falls off.
    fn append_new(arena: &mut Vec<TmpNode>, c: Xchar, code: &BitVec) {
        let mut node = 0;
        loop {
            let bit = arena[node].next_child;
            arena[node].bv.push(bit == 1);
            arena[node].next_child ^= 1;
            let slot = arena[node].child[bit];
            if let TmpChild::Node(chd) = slot {
                node = chd;
                continue;
            }
            if code.len() < 2 {
                // the first two distinct symbols land in the root slots
                arena[node].child[bit] = TmpChild::Leaf(c);
            } else {
                // split: previous occupants of this slot keep bit 0, the
                // newcomer is the single 1 at the end
                let q = arena[node].bv.count(bit == 1);
                let mut grown = TmpNode::default();
                grown.bv.push_n(false, q - 1);
                grown.bv.push(true);
                grown.child[0] = slot;
                grown.child[1] = TmpChild::Leaf(c);
                let chd = arena.len();
                arena.push(grown);
                arena[node].child[bit] = TmpChild::Node(chd);
            }
            return;
        }
    }

    fn compute_heights(&mut self, node: usize) -> usize {
        let mut height = 0;
        for dir in 0..2 {
            if let TmpChild::Node(chd) = self.arena[node].child[dir] {
                height = height.max(self.compute_heights(chd));
            }
        }
        self.arena[node].height = height + 1;
        height + 1
    }

    /// Emits `node`'s subtree clipped to height `h` in van Emde Boas
    /// order: top half first, then the bottom subtrees left to right.
    fn veb_emit(
        &mut self,
        node: usize,
        h: usize,
        next_index: &mut usize,
        offset: &mut usize,
        raw: &mut BitVec,
    ) {
        if h <= 1 {
            self.arena[node].index = *next_index;
            *next_index += 1;
            self.arena[node].offset = *offset;
            *offset += self.arena[node].bv.len();
            raw.extend_from(&self.arena[node].bv);
            return;
        }
        let top = h / 2;
        self.veb_emit(node, top, next_index, offset, raw);
        let mut frontier = Vec::new();
        self.collect_at_depth(node, 1, top, &mut frontier);
        for u in frontier {
            for dir in 0..2 {
                if let TmpChild::Node(chd) = self.arena[u].child[dir] {
                    let hh = self.arena[chd].height.min(h - top);
                    self.veb_emit(chd, hh, next_index, offset, raw);
                }
            }
        }
    }

    fn collect_at_depth(&self, node: usize, depth: usize, target: usize, out: &mut Vec<usize>) {
        if depth == target {
            out.push(node);
            return;
        }
        for dir in 0..2 {
            if let TmpChild::Node(chd) = self.arena[node].child[dir] {
                self.collect_at_depth(chd, depth + 1, target, out);
            }
        }
    }

    fn finalize(mut self, shape: WtShape, ab: Alphabet) -> WaveletTree {
        self.compute_heights(0);
        let mut next_index = 0;
        let mut offset = 0;
        let mut raw = BitVec::with_capacity(self.len);
        let root_height = self.arena[0].height;
        self.veb_emit(0, root_height, &mut next_index, &mut offset, &mut raw);
        debug_assert_eq!(next_index, self.arena.len());

        let mut nodes = vec![
            WtNode {
                len: 0,
                offset: 0,
                cumul: [0; 2],
                child: [WtChild::Empty; 2],
            };
            self.arena.len()
        ];
        for tmp in &self.arena {
            let map_child = |slot: TmpChild| match slot {
                TmpChild::Node(i) => WtChild::Internal(self.arena[i].index),
                TmpChild::Leaf(c) => WtChild::Leaf(c),
                TmpChild::Empty => WtChild::Empty,
            };
            nodes[tmp.index] = WtNode {
                len: tmp.bv.len(),
                offset: tmp.offset,
                cumul: [0; 2],
                child: [map_child(tmp.child[0]), map_child(tmp.child[1])],
            };
        }

        let bits = RankSelectArray::from_bit_vec(raw);
        for node in &mut nodes {
            node.cumul[1] = bits.rank1(node.offset);
            node.cumul[0] = node.offset - node.cumul[1];
        }

        WaveletTree {
            shape,
            ab,
            repr: Repr::Tree {
                nodes,
                bits,
                codes: self.codes,
                len: self.len,
            },
        }
    }
}

/// Binary increment of a code, carrying from the root end; used to hand
/// out fresh codes during online construction.
fn incr_code(code: &mut BitVec) {
    let mut carry = true;
    let mut i = 0;
    while carry && i < code.len() {
        let bit = code.get(i);
        code.set(i, bit ^ carry);
        carry = bit && carry;
        i += 1;
    }
    if carry {
        code.push(true);
    }
}
