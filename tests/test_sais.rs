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

/// Sorts suffixes by comparison; the virtual sentinel makes the empty
/// suffix smallest, which is exactly prefix-order on equal prefixes.
fn naive_suffix_array(text: &[u8]) -> Vec<usize> {
    let mut sa: Vec<usize> = (0..=text.len()).collect();
    sa.sort_by(|&a, &b| text[a..].cmp(&text[b..]));
    sa
}

#[test]
fn banana() {
    let ab = Alphabet::from_letters(b"abn").unwrap();
    assert_eq!(suffix_array(b"banana", &ab), vec![6, 5, 3, 1, 0, 4, 2]);
}

#[test]
fn classic_texts() {
    let ab = Alphabet::from_letters(b"abcdimprs").unwrap();
    for text in [
        b"mississippi".as_slice(),
        b"abracadabra",
        b"aaaaaaaaaa",
        b"abab",
        b"abcabc",
        b"cba",
    ] {
        assert_eq!(suffix_array(text, &ab), naive_suffix_array(text), "{text:?}");
    }
}

#[test]
fn suffix_array_is_sorted_permutation() {
    let mut rng = SmallRng::seed_from_u64(13);
    for len in [0usize, 1, 2, 3, 10, 100, 1000] {
        for sigma in [1usize, 2, 4, 26] {
            let text: Vec<u8> = (0..len).map(|_| b'a' + rng.random_range(0..sigma as u8)).collect();
            let letters: Vec<u8> = (b'a'..b'a' + sigma as u8).collect();
            let ab = Alphabet::from_letters(&letters).unwrap();
            let sa = suffix_array(&text, &ab);

            assert_eq!(sa.len(), len + 1);
            assert_eq!(sa[0], len);
            let mut seen = vec![false; len + 1];
            for &p in &sa {
                assert!(!seen[p], "duplicate entry {p}");
                seen[p] = true;
            }
            for w in sa.windows(2) {
                assert!(text[w[0]..] < text[w[1]..], "order violated at {w:?}");
            }
        }
    }
}

#[test]
fn int_texts_match_byte_texts() {
    let mut rng = SmallRng::seed_from_u64(17);
    for len in [5usize, 50, 500] {
        let ranks: Vec<usize> = (0..len).map(|_| rng.random_range(0..6)).collect();
        let bytes: Vec<u8> = ranks.iter().map(|&r| b'a' + r as u8).collect();
        let ab = Alphabet::from_letters(b"abcdef").unwrap();
        assert_eq!(suffix_array_ints(&ranks, 6), suffix_array(&bytes, &ab));
    }
}

#[test]
fn repetitive_texts_force_recursion() {
    // long runs of few distinct LMS substrings exercise the reduced
    // string recursion
    let ab = Alphabet::from_letters(b"ab").unwrap();
    let mut text = Vec::new();
    for _ in 0..50 {
        text.extend_from_slice(b"abaabba");
    }
    assert_eq!(suffix_array(&text, &ab), naive_suffix_array(&text));
}
