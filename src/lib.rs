#![doc = include_str!("../README.md")]

/// Throw a compiler error if a type isn't guaranteed to have a specific size in bytes.
macro_rules! assert_sizeof {
    ($typ:ty => $size_in_bytes:expr) => {
        const _: [u8; $size_in_bytes] = [0; std::mem::size_of::<$typ>()];
    };
}

use std::cmp::Ordering;
use std::fmt::{Debug, Formatter};

use lossy_pht::LossyPHT;
use tracing::debug;

mod backend;
mod builder;
mod encoded;
mod error;
mod find_longest;
mod lossy_pht;
mod portable;
mod table;

pub use backend::{
    Backend, Codec, CodecConfig, Fsst, InstrumentedFsst, InstrumentedStats, NativeFsst,
    PortableFsst, DEFAULT_SAMPLE_TARGET,
};
pub use builder::{sample_lines, SAMPLE_CHUNK_LEN};
pub use encoded::Encoded;
pub use error::{
    Error, MalformedStreamError, ParseBackendError, Result, SymbolLengthError, TableError,
};
pub use table::SymbolTable;

/// `Symbol`s are small (up to 8-byte) segments of strings, stored in a [`Compressor`][`crate::Compressor`] and
/// identified by an 8-bit code.
///
/// The bytes are packed little-endian into a `u64`, and every byte past the symbol length is zero. The
/// length is stored explicitly, so symbols ending in `0x00` are distinct from their shorter prefixes.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Symbol {
    value: u64,
    len: u8,
}

assert_sizeof!(Symbol => 16);

impl Symbol {
    /// Maximum number of bytes a symbol can hold.
    pub const MAX_LEN: usize = 8;

    /// Constructor for an 8-byte `Symbol` from an 8-element byte array.
    pub fn from_slice(slice: &[u8; 8]) -> Self {
        Self {
            value: u64::from_le_bytes(*slice),
            len: 8,
        }
    }

    /// Create a new single-byte symbol
    pub fn from_u8(value: u8) -> Self {
        Self {
            value: value as u64,
            len: 1,
        }
    }

    /// Create a symbol holding `bytes`.
    ///
    /// Returns `None` if `bytes` is empty or longer than [`Symbol::MAX_LEN`].
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        (1..=Self::MAX_LEN)
            .contains(&bytes.len())
            .then(|| Self::pack(bytes))
    }

    fn pack(bytes: &[u8]) -> Self {
        let mut buf = [0u8; 8];
        buf[..bytes.len()].copy_from_slice(bytes);
        Self {
            value: u64::from_le_bytes(buf),
            len: bytes.len() as u8,
        }
    }
}

impl Symbol {
    /// Calculate the length of the symbol in bytes. Always a value between 1 and 8.
    #[allow(clippy::len_without_is_empty)]
    #[inline]
    pub fn len(self) -> usize {
        self.len as usize
    }

    #[inline]
    fn as_u64(self) -> u64 {
        self.value
    }

    /// The symbol bytes, zero-padded to 8. Only the first [`len`][Self::len] bytes are meaningful.
    #[inline]
    pub fn to_le_bytes(self) -> [u8; 8] {
        self.value.to_le_bytes()
    }

    /// Copy the symbol bytes into a new `Vec`.
    pub fn to_vec(self) -> Vec<u8> {
        self.to_le_bytes()[..self.len()].to_vec()
    }

    /// Get the first byte of the symbol as a `u8`.
    #[inline]
    pub fn first_byte(self) -> u8 {
        self.value as u8
    }

    /// Get the first two bytes of the symbol as a `u16`.
    ///
    /// For a one-byte symbol the high byte is zero.
    #[inline]
    pub fn first_two_bytes(self) -> u16 {
        self.value as u16
    }

    /// Return a new `Symbol` by logically concatenating ourselves with another `Symbol`.
    ///
    /// Returns `None` if the result would be longer than [`Symbol::MAX_LEN`].
    pub fn concat(self, other: Self) -> Option<Self> {
        let self_len = self.len();
        let new_len = self_len + other.len();
        if new_len > Self::MAX_LEN {
            return None;
        }

        Some(Self {
            value: other.value << (8 * self_len) | self.value,
            len: new_len as u8,
        })
    }

    /// Append raw bytes to the end of the symbol.
    pub(crate) fn extend(self, bytes: &[u8]) -> Self {
        let mut buf = self.to_le_bytes();
        let new_len = self.len() + bytes.len();
        debug_assert!(new_len <= 8, "cannot build symbol with length > 8");
        buf[self.len()..new_len].copy_from_slice(bytes);

        Self {
            value: u64::from_le_bytes(buf),
            len: new_len as u8,
        }
    }

    /// Returns true if the symbol is a prefix of `text`.
    #[inline]
    pub(crate) fn is_prefix(&self, text: &[u8]) -> bool {
        text.starts_with(&self.to_le_bytes()[..self.len()])
    }
}

impl TryFrom<&[u8]> for Symbol {
    type Error = SymbolLengthError;

    fn try_from(bytes: &[u8]) -> std::result::Result<Self, Self::Error> {
        Self::from_bytes(bytes).ok_or(SymbolLengthError(bytes.len()))
    }
}

/// Symbols order lexicographically by their bytes.
impl Ord for Symbol {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_le_bytes()[..self.len()].cmp(&other.to_le_bytes()[..other.len()])
    }
}

impl PartialOrd for Symbol {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Debug for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let debug = self.to_le_bytes()[..self.len()]
            .iter()
            .map(|c| {
                if c.is_ascii_graphic() || *c == b' ' {
                    format!("{}", *c as char)
                } else {
                    format!("{c:#04X}")
                }
            })
            .collect::<Vec<String>>();
        write!(f, "{:?}", debug)
    }
}

/// Code and associated metadata for a symbol.
///
/// The bottom 9 bits hold an extended code: values 0-255 are raw bytes (escapes), and values
/// 256-510 represent the codes 0-254 of symbols in the table. 511 is a placeholder for an unused slot.
///
/// Bits 12-15 store the length of the symbol (values ranging from 0-8).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct CodeMeta(u16);

/// Code used to indicate bytes that are not in the symbol table.
///
/// When compressing a string that cannot fully be expressed with the symbol table, the compressed
/// output will contain an `ESCAPE` byte followed by a raw byte. At decompression time, the presence
/// of `ESCAPE` indicates that the next byte should be appended directly to the result instead of
/// being looked up in the symbol table.
pub const ESCAPE_CODE: u8 = 255;

/// Maximum value for the extended code range.
///
/// When truncated to u8 this is code 255, which is equivalent to [`ESCAPE_CODE`].
pub const MAX_CODE: u16 = 511;

/// Largest number of symbols a table can hold. The remaining code is [`ESCAPE_CODE`].
pub const MAX_SYMBOLS: usize = 255;

/// Offset of symbol codes within the extended code range.
pub(crate) const CODE_BASE: u16 = 256;

#[allow(clippy::len_without_is_empty)]
impl CodeMeta {
    const EMPTY: Self = CodeMeta(MAX_CODE);

    /// Create a new code for the symbol stored under `code`.
    fn new_symbol(code: u8, symbol: Symbol) -> Self {
        debug_assert_ne!(code, ESCAPE_CODE, "ESCAPE_CODE cannot be used for symbol");

        Self(((symbol.len() as u16) << 12) | (CODE_BASE + code as u16))
    }

    #[inline]
    fn code(self) -> u8 {
        self.0 as u8
    }

    #[inline]
    fn extended_code(self) -> u16 {
        self.0 & 0b111_111_111
    }

    #[inline]
    fn len(self) -> u16 {
        self.0 >> 12
    }

    #[inline]
    fn is_unused(self) -> bool {
        self.extended_code() == MAX_CODE
    }
}

impl Debug for CodeMeta {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeMeta")
            .field("code", &(self.0 as u8))
            .field("is_escape", &(self.extended_code() < CODE_BASE))
            .field("len", &(self.0 >> 12))
            .finish()
    }
}

/// Decompressor uses a symbol table to take a stream of 8-bit codes into a string.
#[derive(Clone)]
pub struct Decompressor<'a> {
    /// Table mapping codes to symbols.
    pub(crate) symbols: &'a [Symbol],
}

impl<'a> Decompressor<'a> {
    /// Returns a new decompressor that uses the provided symbol table.
    ///
    /// # Panics
    ///
    /// If the provided symbol table has more than [`MAX_SYMBOLS`] entries, or holds a symbol
    /// whose length is outside `1..=8`.
    pub fn new(symbols: &'a [Symbol]) -> Self {
        assert!(
            symbols.len() <= MAX_SYMBOLS,
            "symbol table cannot have size exceeding MAX_SYMBOLS"
        );
        // The 8-byte stores in `decompress` rely on this bound.
        assert!(
            symbols.iter().all(|s| (1..=Symbol::MAX_LEN).contains(&s.len())),
            "symbol lengths must be within 1..=8"
        );

        Self { symbols }
    }

    /// Decompress a byte slice that was previously returned by a compressor using
    /// the same symbol table.
    ///
    /// # Errors
    ///
    /// Returns a [`MalformedStreamError`] if a code is not assigned in the table, or if the
    /// stream ends directly after an escape code.
    pub fn decompress(
        &self,
        compressed: &[u8],
    ) -> std::result::Result<Vec<u8>, MalformedStreamError> {
        // Every unit consumes at least one input byte and writes at most 8 output bytes, so the
        // 8-byte stores below never reach past the allocation.
        let mut decoded: Vec<u8> = Vec::with_capacity(std::mem::size_of::<u64>() * (compressed.len() + 1));
        let ptr = decoded.as_mut_ptr();

        let mut in_pos = 0;
        let mut out_pos = 0;

        while in_pos < compressed.len() {
            let code = compressed[in_pos];
            if code == ESCAPE_CODE {
                let Some(&literal) = compressed.get(in_pos + 1) else {
                    return Err(MalformedStreamError::TruncatedEscape { offset: in_pos });
                };
                // SAFETY: out_pos is at most 8 * in_pos, well inside the allocation.
                unsafe { ptr.add(out_pos).write(literal) };
                out_pos += 1;
                in_pos += 2;
            } else {
                let Some(symbol) = self.symbols.get(code as usize) else {
                    return Err(MalformedStreamError::UnassignedCode {
                        code,
                        offset: in_pos,
                        n_symbols: self.symbols.len(),
                    });
                };
                // SAFETY: out_pos + 8 <= 8 * (in_pos + 1), which is within capacity.
                unsafe {
                    let write_addr = ptr.add(out_pos) as *mut [u8; 8];
                    // Perform 8 byte unaligned write.
                    write_addr.write_unaligned(symbol.to_le_bytes());
                }
                in_pos += 1;
                out_pos += symbol.len();
            }
        }

        // SAFETY: every byte in 0..out_pos has been written.
        unsafe { decoded.set_len(out_pos) };

        Ok(decoded)
    }
}

/// A compressor that uses a symbol table to greedily compress strings.
///
/// The `Compressor` is the central component of FSST. You can create a compressor either by
/// default (i.e. an empty compressor), by [training][`Self::train`] it on an input corpus of text,
/// or from a previously built [`SymbolTable`].
///
/// Example usage:
///
/// ```
/// use fsst::{Symbol, Compressor};
/// let mut compressor = Compressor::default();
///
/// // Insert a new symbol
/// assert!(compressor.insert(Symbol::from_bytes(b"hello").unwrap()));
///
/// let compressed = compressor.compress("hello".as_bytes());
/// assert_eq!(compressed, vec![0u8]);
/// ```
#[derive(Clone)]
pub struct Compressor {
    /// Table mapping codes to symbols.
    pub(crate) symbols: Vec<Symbol>,

    /// Index mapping 1-byte symbols to codes.
    codes_one_byte: Vec<CodeMeta>,

    /// Inverted index mapping 2-byte symbols to codes
    codes_two_byte: Vec<CodeMeta>,

    /// Lossy perfect hash table for looking up codes to symbols that are 3 bytes or more
    lossy_pht: LossyPHT,

    /// False when some symbol could not be placed in the lookup structures, in which case
    /// compression runs the exhaustive longest-match search instead.
    exact: bool,
}

impl Default for Compressor {
    fn default() -> Self {
        Self {
            symbols: Vec::with_capacity(MAX_SYMBOLS),
            codes_one_byte: vec![CodeMeta::EMPTY; 256],
            codes_two_byte: vec![CodeMeta::EMPTY; 65_536],
            lossy_pht: LossyPHT::new(),
            exact: true,
        }
    }
}

impl Compressor {
    #[inline]
    fn get_twobyte(&self, code: u16) -> CodeMeta {
        // SAFETY: codes_two_byte has 65,536 entries, one for every u16.
        unsafe { *self.codes_two_byte.get_unchecked(code as usize) }
    }

    #[inline]
    fn get_onebyte(&self, code: u8) -> CodeMeta {
        // SAFETY: codes_one_byte has 256 entries, one for every u8.
        unsafe { *self.codes_one_byte.get_unchecked(code as usize) }
    }

    /// Register `symbol` under `code` in the lookup structures.
    ///
    /// Returns false if the slot is already taken.
    fn index(&mut self, symbol: Symbol, code: u8) -> bool {
        let slot = match symbol.len() {
            1 => &mut self.codes_one_byte[symbol.first_byte() as usize],
            2 => &mut self.codes_two_byte[symbol.first_two_bytes() as usize],
            _ => return self.lossy_pht.insert(symbol, code),
        };

        if !slot.is_unused() {
            return false;
        }
        *slot = CodeMeta::new_symbol(code, symbol);
        true
    }
}

/// The core structure of the FSST codec, holding a mapping between `Symbol`s and `Code`s.
///
/// The symbol table is trained on a corpus of data in the form of a single byte array, building up
/// a mapping of 1-byte "codes" to sequences of up to 8 plaintext bytes, or "symbols".
impl Compressor {
    /// Attempt to insert a new symbol at the end of the table.
    ///
    /// Returns false, leaving the table unchanged, if the symbol collides with one already present.
    ///
    /// # Panics
    /// Panics if the table is already full.
    pub fn insert(&mut self, symbol: Symbol) -> bool {
        assert!(
            self.symbols.len() < MAX_SYMBOLS,
            "cannot insert into full symbol table"
        );

        let code = self.symbols.len() as u8;
        if !self.index(symbol, code) {
            return false;
        }

        self.symbols.push(symbol);
        true
    }

    /// Build a compressor that assigns every symbol of `table` its code from the table.
    ///
    /// Tables produced by training always fit the lookup structures. Foreign tables with
    /// duplicate symbols, or several long symbols sharing a hash slot, are still accepted but
    /// compress with the slower exhaustive search.
    pub fn from_table(table: &SymbolTable) -> Self {
        let mut compressor = Self::default();
        for &symbol in table.symbols() {
            let code = compressor.symbols.len() as u8;
            if !compressor.index(symbol, code) {
                compressor.exact = false;
            }
            compressor.symbols.push(symbol);
        }

        if !compressor.exact {
            debug!(
                n_symbols = compressor.symbols.len(),
                "symbol table does not fit the lookup tables, falling back to exhaustive search"
            );
        }

        compressor
    }

    /// Using the symbol table, runs a single cycle of compression on an input word, writing
    /// the output into `out_ptr`.
    ///
    /// # Returns
    ///
    /// This function returns a tuple of (advance_in, advance_out) with the number of bytes
    /// for the caller to advance the input and output pointers.
    ///
    /// `advance_in` is the number of bytes to advance the input pointer before the next call.
    ///
    /// `advance_out` is the number of bytes to advance `out_ptr` before the next call.
    ///
    /// # Safety
    ///
    /// `out_ptr` must point to at least 2 writable bytes.
    #[inline]
    pub unsafe fn compress_word(&self, word: u64, out_ptr: *mut u8) -> (usize, usize) {
        // SAFETY: forwarded from the caller.
        unsafe { self.compress_word_limited(word, Symbol::MAX_LEN, out_ptr) }
    }

    /// Same as [`compress_word`][Self::compress_word], but only the low `limit` bytes of `word`
    /// are input. The rest is padding that must never be matched.
    ///
    /// # Safety
    ///
    /// `out_ptr` must point to at least 2 writable bytes.
    #[inline]
    unsafe fn compress_word_limited(
        &self,
        word: u64,
        limit: usize,
        out_ptr: *mut u8,
    ) -> (usize, usize) {
        // Speculatively write the first byte of `word` at offset 1. This is necessary if it is an escape, and
        // if it isn't, it will be overwritten anyway.
        let first_byte = word as u8;
        // SAFETY: caller ensures two bytes are writable.
        unsafe { out_ptr.add(1).write(first_byte) };

        // Probe the hash table
        let entry = self.lossy_pht.lookup(word);
        let len = entry.code.len() as usize;
        if !entry.is_unused()
            && len <= limit
            && compare_masked(word, entry.symbol.as_u64(), entry.ignored_bits)
        {
            // SAFETY: see above.
            unsafe { out_ptr.write(entry.code.code()) };
            return (len, 1);
        }

        if limit >= 2 {
            let code = self.get_twobyte(word as u16);
            if !code.is_unused() {
                // SAFETY: see above.
                unsafe { out_ptr.write(code.code()) };
                return (2, 1);
            }
        }

        let code = self.get_onebyte(first_byte);
        if code.is_unused() {
            // SAFETY: see above.
            unsafe { out_ptr.write(ESCAPE_CODE) };
            (1, 2)
        } else {
            // SAFETY: see above.
            unsafe { out_ptr.write(code.code()) };
            (1, 1)
        }
    }

    /// Compress many lines in bulk.
    pub fn compress_bulk(&self, lines: &[&[u8]]) -> Vec<Vec<u8>> {
        let mut res = Vec::with_capacity(lines.len());

        for line in lines {
            res.push(self.compress(line));
        }

        res
    }

    /// Use the symbol table to compress the plaintext into a sequence of codes and escapes.
    pub fn compress(&self, plaintext: &[u8]) -> Vec<u8> {
        let mut values = Vec::new();
        self.compress_into(plaintext, &mut values);
        values
    }

    /// Compress `plaintext` into `values`, replacing its previous contents.
    ///
    /// Reusing the output buffer across calls avoids an allocation per string.
    pub fn compress_into(&self, plaintext: &[u8], values: &mut Vec<u8>) {
        values.clear();
        if plaintext.is_empty() {
            return;
        }
        if !self.exact {
            portable::compress_into(&self.symbols, plaintext, values);
            return;
        }

        // Each input byte produces at most 2 output bytes.
        values.reserve(2 * plaintext.len());
        let out_ptr = values.as_mut_ptr();

        let mut in_pos = 0;
        let mut out_pos = 0;

        while in_pos + 8 <= plaintext.len() {
            // SAFETY: in_pos + 8 <= plaintext.len(), and out_pos + 1 < 2 * plaintext.len().
            unsafe {
                // Load a full 8-byte word of data from the input.
                let word = u64::from_le(
                    plaintext
                        .as_ptr()
                        .add(in_pos)
                        .cast::<u64>()
                        .read_unaligned(),
                );
                let (advance_in, advance_out) = self.compress_word(word, out_ptr.add(out_pos));
                in_pos += advance_in;
                out_pos += advance_out;
            }
        }

        // Load the last bytes of data into a final zero-padded word. We then replicate the loop above,
        // but shift data out of this word rather than reading past the end of the input.
        let remaining = &plaintext[in_pos..];
        let mut tail = [0u8; 8];
        tail[..remaining.len()].copy_from_slice(remaining);
        let mut last_word = u64::from_le_bytes(tail);

        while in_pos < plaintext.len() {
            // SAFETY: out_pos + 1 < 2 * plaintext.len() while input remains.
            let (advance_in, advance_out) = unsafe {
                self.compress_word_limited(
                    last_word,
                    plaintext.len() - in_pos,
                    out_ptr.add(out_pos),
                )
            };
            in_pos += advance_in;
            out_pos += advance_out;

            last_word = advance_8byte_word(last_word, advance_in);
        }

        debug_assert!(out_pos <= values.capacity());
        // SAFETY: every byte in 0..out_pos has been written.
        unsafe { values.set_len(out_pos) };
    }

    /// Access the decompressor that can be used to decompress strings emitted from this
    /// `Compressor` instance.
    pub fn decompressor(&self) -> Decompressor<'_> {
        Decompressor::new(&self.symbols)
    }

    /// Returns a readonly slice of the current symbol table, indexed by code.
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Copy the symbols into a standalone [`SymbolTable`].
    pub fn symbol_table(&self) -> SymbolTable {
        SymbolTable::from_compressor(self)
    }
}

#[inline]
pub(crate) fn advance_8byte_word(word: u64, bytes: usize) -> u64 {
    // shift the word off the low-end, because little endian means the first
    // char is stored in the LSB.
    //
    // Note that even though this looks like it branches, Rust compiles this to a
    // conditional move instruction. See `<https://godbolt.org/z/Pbvre65Pq>`
    if bytes == 8 {
        0
    } else {
        word >> (8 * bytes)
    }
}

#[inline]
pub(crate) fn compare_masked(left: u64, right: u64, ignored_bits: u16) -> bool {
    let mask = if ignored_bits == 64 {
        0
    } else {
        u64::MAX >> ignored_bits
    };

    (left & mask) == right
}

/// Build a [`SymbolTable`] from a sample, using the native implementation.
///
/// The result depends only on `sample`. An empty sample produces an empty table, under which
/// every byte is escaped.
pub fn build_table(sample: impl AsRef<[u8]>) -> SymbolTable {
    Compressor::train(sample).symbol_table()
}

/// Compress `data` with `table`.
///
/// The lookup structures are built on the first call and cached in `table`.
pub fn encode(data: &[u8], table: &SymbolTable) -> Vec<u8> {
    table.compressor().compress(data)
}

/// Reverse [`encode`].
///
/// # Errors
///
/// Fails with [`MalformedStreamError`] if `codes` was not produced under `table`.
pub fn decode(
    codes: &[u8],
    table: &SymbolTable,
) -> std::result::Result<Vec<u8>, MalformedStreamError> {
    table.decompressor().decompress(codes)
}
