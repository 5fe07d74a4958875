//! Functions and types used for building a [`Compressor`] from a corpus of text.
//!
//! This module implements the generational training loop from Algorithm 3 of the [FSST Paper],
//! with candidates grown by extending each match with the bytes that follow it.
//!
//! [FSST Paper]: https://www.vldb.org/pvldb/vol13/p2649-boncz.pdf

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use tracing::debug;

use crate::{Compressor, Symbol, ESCAPE_CODE, MAX_SYMBOLS};

/// Frequency count for each candidate symbol, keyed by its bytes.
#[derive(Debug, Clone, Default)]
struct Counter {
    counts: HashMap<Symbol, usize>,
}

impl Counter {
    fn reset(&mut self) {
        self.counts.clear();
    }

    #[inline]
    fn record(&mut self, symbol: Symbol) {
        *self.counts.entry(symbol).or_insert(0) += 1;
    }

    fn len(&self) -> usize {
        self.counts.len()
    }

    fn contains(&self, symbol: Symbol) -> bool {
        self.counts.contains_key(&symbol)
    }

    fn iter(&self) -> impl Iterator<Item = (Symbol, usize)> + '_ {
        self.counts.iter().map(|(symbol, count)| (*symbol, *count))
    }
}

/// The number of generations used for training. This is taken from the [FSST paper].
///
/// [FSST paper]: https://www.vldb.org/pvldb/vol13/p2649-boncz.pdf
#[cfg(not(miri))]
const MAX_GENERATIONS: usize = 5;

#[cfg(miri)]
const MAX_GENERATIONS: usize = 1;

/// Each match is also counted extended by up to this many of the bytes following it.
const MAX_EXTENSION: usize = 2;

/// Length of each chunk taken by [`sample_lines`].
pub const SAMPLE_CHUNK_LEN: usize = 512;

/// Split `data` into a deterministic training sample of roughly `target` bytes.
///
/// Inputs no larger than `target` are returned whole. Larger inputs yield evenly strided chunks of
/// [`SAMPLE_CHUNK_LEN`] bytes, in order. Pass the result to [`Compressor::train_bulk`] so that no
/// candidate spans two chunks.
pub fn sample_lines(data: &[u8], target: usize) -> Vec<&[u8]> {
    if data.len() <= target {
        return vec![data];
    }

    let n_chunks = (target / SAMPLE_CHUNK_LEN).max(1);
    let stride = data.len() / n_chunks;

    (0..n_chunks)
        .map(|chunk| {
            let start = chunk * stride;
            &data[start..(start + SAMPLE_CHUNK_LEN).min(data.len())]
        })
        .collect()
}

impl Compressor {
    /// Build and train a `Compressor` from a sample corpus of text.
    ///
    /// This function implements the generational algorithm described in the [FSST paper] Section
    /// 4.3. Starting with an empty symbol table, it iteratively compresses the corpus, counts every
    /// match along with its one- and two-byte extensions, and keeps the candidates with the highest
    /// gain. The resulting table will have at most 255 symbols (the 256th code is reserved for the
    /// escape code).
    ///
    /// Training is deterministic: the same corpus always yields the same symbols under the same codes.
    ///
    /// [FSST paper]: https://www.vldb.org/pvldb/vol13/p2649-boncz.pdf
    pub fn train(corpus: impl AsRef<[u8]>) -> Self {
        Self::train_bulk(&[corpus.as_ref()])
    }

    /// Train a `Compressor` on many independent strings, such as the values of a column.
    ///
    /// Candidates never span two strings.
    pub fn train_bulk(lines: &[&[u8]]) -> Self {
        train_lines(lines, |compressor, line, out| {
            compressor.compress_into(line, out)
        })
    }
}

/// The training loop, generic over the compression routine used for the counting pass.
///
/// Any routine that performs an exact longest-match compression of the current table produces
/// the same result.
pub(crate) fn train_lines<F>(lines: &[&[u8]], compress: F) -> Compressor
where
    F: Fn(&Compressor, &[u8], &mut Vec<u8>),
{
    run_generations(lines, compress).0
}

/// The training loop proper. Also returns the number of generations that ran.
fn run_generations<F>(lines: &[&[u8]], compress: F) -> (Compressor, usize)
where
    F: Fn(&Compressor, &[u8], &mut Vec<u8>),
{
    let mut compressor = Compressor::default();
    if lines.iter().all(|line| line.is_empty()) {
        return (compressor, 0);
    }

    // Every byte of the corpus stays a candidate, so that spare codes are spent on avoiding
    // escapes before anything else.
    let mut seen = [false; 256];
    for byte in lines.iter().flat_map(|line| line.iter()) {
        seen[*byte as usize] = true;
    }

    let mut counter = Counter::default();
    let mut compressed = Vec::new();
    let mut generations = 0;

    for generation in 0..MAX_GENERATIONS {
        generations += 1;
        counter.reset();
        for line in lines {
            compress(&compressor, line, &mut compressed);
            compressor.compress_count(line, &compressed, &mut counter);
        }

        let next = optimize(&counter, &seen);
        let stable = next.symbols == compressor.symbols;
        debug!(
            generation,
            candidates = counter.len(),
            n_symbols = next.symbols.len(),
            stable,
            "trained symbol table generation"
        );

        compressor = next;
        if stable {
            break;
        }
    }

    (compressor, generations)
}

impl Compressor {
    /// Walk the compressed form of `line`, counting every symbol emitted (escaped bytes count as
    /// single-byte symbols) and every extension of it by the bytes that follow in `line`.
    fn compress_count(&self, line: &[u8], compressed: &[u8], counter: &mut Counter) {
        let mut pos = 0;
        let mut text_pos = 0;

        while pos < compressed.len() {
            let (symbol, advance) = if compressed[pos] == ESCAPE_CODE {
                (Symbol::from_u8(compressed[pos + 1]), 2)
            } else {
                (self.symbols[compressed[pos] as usize], 1)
            };
            pos += advance;
            text_pos += symbol.len();

            counter.record(symbol);

            let following = line.get(text_pos..).unwrap_or_default();
            for extra in 1..=MAX_EXTENSION {
                if extra > following.len() || symbol.len() + extra > Symbol::MAX_LEN {
                    break;
                }
                counter.record(symbol.extend(&following[..extra]));
            }
        }
    }
}

/// Using the counts of the last pass, build a new set of symbols/codes that optimizes
/// the gain over the distribution in `counter`.
///
/// Bytes marked in `seen` that were not counted join with zero gain.
fn optimize(counter: &Counter, seen: &[bool; 256]) -> Compressor {
    let mut res = Compressor::default();
    let mut pqueue = BinaryHeap::with_capacity(counter.len());
    for (symbol, count) in counter.iter() {
        let mut gain = count * symbol.len();
        // NOTE: use heuristic from C++ implementation to boost the gain of single-byte symbols.
        // This helps to reduce exception counts.
        if symbol.len() == 1 {
            gain *= 8;
        }
        pqueue.push(Candidate { symbol, gain });
    }
    for byte in 0..=255u8 {
        let symbol = Symbol::from_u8(byte);
        if seen[byte as usize] && !counter.contains(symbol) {
            pqueue.push(Candidate { symbol, gain: 0 });
        }
    }

    // Pop the 255 best symbols. Candidates rejected by the hash table don't take a code.
    while res.symbols.len() < MAX_SYMBOLS {
        let Some(candidate) = pqueue.pop() else {
            break;
        };
        res.insert(candidate.symbol);
    }

    res
}

/// A candidate for inclusion in a symbol table.
///
/// This is really only useful for the `optimize` step of training.
#[derive(Debug, PartialEq, Eq)]
struct Candidate {
    gain: usize,
    symbol: Symbol,
}

impl PartialOrd<Self> for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Highest gain first, then the shorter symbol, then the smaller bytes.
impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.gain
            .cmp(&other.gain)
            .then_with(|| other.symbol.len().cmp(&self.symbol.len()))
            .then_with(|| other.symbol.cmp(&self.symbol))
    }
}
