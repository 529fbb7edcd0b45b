//! Deterministic test patterns.
//!
//! Each word of a row is an FNV-1a style hash of where it lives
//! (`rank`, `bank`, `row`, burst `i`, word `j`) and a caller `seed`, so any
//! row's expected contents can be recomputed at verify time without storing
//! what was written.

use crate::common::{BURST_WORDS, COLUMNS_PER_ROW, ROW_WORDS};

/// FNV offset basis.
pub const FNV_OFFSET: u32 = 2_166_136_261;
/// FNV prime.
pub const FNV_PRIME: u32 = 16_777_619;

#[inline]
const fn fold(h: u32, v: u32) -> u32 {
    (h ^ v).wrapping_mul(FNV_PRIME)
}

/// Returns word `j` of burst `i`.
#[inline]
pub const fn word(bank: u32, row: u32, rank: u32, seed: u32, i: u32, j: u32) -> u32 {
    let mut h = FNV_OFFSET;
    h = fold(h, rank);
    h = fold(h, bank);
    h = fold(h, row);
    h = fold(h, seed);
    h = fold(h, i);
    fold(h, j)
}

/// Fills the first [`ROW_WORDS`] words of `buf` with the pattern for one row.
///
/// Words beyond one row are left untouched; a shorter `buf` is filled as far
/// as it goes.
pub fn generate(buf: &mut [u32], bank: u32, row: u32, rank: u32, seed: u32) {
    for (i, burst) in buf.chunks_mut(BURST_WORDS).take(COLUMNS_PER_ROW).enumerate() {
        for (j, w) in burst.iter_mut().enumerate() {
            *w = word(bank, row, rank, seed, i as u32, j as u32);
        }
    }
}

/// Returns a freshly generated row.
pub fn pattern(bank: u32, row: u32, rank: u32, seed: u32) -> Vec<u32> {
    let mut buf = vec![0; ROW_WORDS];
    generate(&mut buf, bank, row, rank, seed);
    buf
}

/// Location and values of the first differing word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mismatch {
    /// Burst index within the row.
    pub column: usize,
    /// Word index within the burst.
    pub word: usize,
    /// Expected value.
    pub expected: u32,
    /// Value read back.
    pub actual: u32,
}

/// Compares two rows and reports the first differing word.
///
/// Only the common prefix is compared.
pub fn first_mismatch(expected: &[u32], actual: &[u32]) -> Option<Mismatch> {
    expected
        .iter()
        .zip(actual)
        .position(|(e, a)| e != a)
        .map(|idx| Mismatch {
            column: idx / BURST_WORDS,
            word: idx % BURST_WORDS,
            expected: expected[idx],
            actual: actual[idx],
        })
}
