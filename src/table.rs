//! The serializable dictionary shared by encoder and decoder.
//!
//! # Layout
//!
//! A serialized table is self-delimiting:
//!
//! ```text
//! n          u8        number of symbols, 0..=255
//! len[n]     u8 each   length of the symbol with code i, 1..=8
//! bytes      u8[]      symbol bytes concatenated in code order, sum(len) bytes
//! ```

use std::fmt::{Debug, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

use crate::{Compressor, Decompressor, Symbol, TableError, MAX_SYMBOLS};

/// An immutable mapping from codes `0..len()` to [`Symbol`]s.
///
/// Two tables are equal when they assign the same bytes to the same codes, regardless of how they
/// were built. Tables are cheap to share between threads and carry everything a decoder in another
/// process needs. The [`Compressor`] is built on first use and kept with the table.
///
/// ```
/// use fsst::SymbolTable;
///
/// let table = fsst::build_table("tile tile tile");
/// let bytes = table.to_bytes();
/// assert_eq!(SymbolTable::from_bytes(&bytes).unwrap(), table);
/// ```
#[derive(Clone, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    compressor: OnceLock<Compressor>,
}

impl SymbolTable {
    /// Create a table that assigns code `i` to `symbols[i]`.
    ///
    /// # Errors
    ///
    /// Fails if there are more than [`MAX_SYMBOLS`] symbols, or if a symbol is not 1 to 8
    /// bytes long.
    pub fn new(symbols: Vec<Symbol>) -> Result<Self, TableError> {
        if symbols.len() > MAX_SYMBOLS {
            return Err(TableError::TooManySymbols(symbols.len()));
        }
        if let Some((code, symbol)) = symbols
            .iter()
            .enumerate()
            .find(|(_, s)| !(1..=Symbol::MAX_LEN).contains(&s.len()))
        {
            return Err(TableError::InvalidSymbolLength {
                code,
                len: symbol.len(),
            });
        }

        Ok(Self::with_symbols(symbols))
    }

    fn with_symbols(symbols: Vec<Symbol>) -> Self {
        Self {
            symbols,
            compressor: OnceLock::new(),
        }
    }

    pub(crate) fn from_compressor(compressor: &Compressor) -> Self {
        Self::with_symbols(compressor.symbols().to_vec())
    }

    /// Number of symbols in the table.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// True if the table holds no symbols, in which case every byte is escaped.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// The symbols, indexed by code.
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Look up the symbol for `code`.
    pub fn get(&self, code: u8) -> Option<Symbol> {
        self.symbols.get(code as usize).copied()
    }

    /// The [`Compressor`] for this table, built on the first call.
    pub fn compressor(&self) -> &Compressor {
        self.compressor.get_or_init(|| Compressor::from_table(self))
    }

    /// Borrow a [`Decompressor`] for this table.
    pub fn decompressor(&self) -> Decompressor<'_> {
        Decompressor::new(&self.symbols)
    }

    /// Symbol lengths in code order, the columnar companion of [`symbol_bytes`][Self::symbol_bytes].
    pub fn symbol_lengths(&self) -> Vec<u32> {
        self.symbols.iter().map(|s| s.len() as u32).collect()
    }

    /// All symbol bytes concatenated in code order.
    pub fn symbol_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.symbols.iter().map(|s| s.len()).sum());
        for symbol in &self.symbols {
            bytes.extend_from_slice(&symbol.to_le_bytes()[..symbol.len()]);
        }
        bytes
    }

    /// Rebuild a table from its columnar form: concatenated symbol bytes plus one length per code.
    ///
    /// # Errors
    ///
    /// Fails if a length is outside `1..=8`, if the lengths do not add up to `symbol_bytes.len()`,
    /// or if there are more than [`MAX_SYMBOLS`] symbols.
    pub fn from_parts(symbol_bytes: &[u8], symbol_lengths: &[u32]) -> Result<Self, TableError> {
        if symbol_lengths.len() > MAX_SYMBOLS {
            return Err(TableError::TooManySymbols(symbol_lengths.len()));
        }

        let lengths_total: usize = symbol_lengths.iter().map(|len| *len as usize).sum();
        if lengths_total != symbol_bytes.len() {
            return Err(TableError::LengthMismatch {
                lengths_total,
                bytes: symbol_bytes.len(),
            });
        }

        let mut symbols = Vec::with_capacity(symbol_lengths.len());
        let mut offset = 0;
        for (code, len) in symbol_lengths.iter().map(|len| *len as usize).enumerate() {
            let symbol = Symbol::from_bytes(&symbol_bytes[offset..offset + len])
                .ok_or(TableError::InvalidSymbolLength { code, len })?;
            symbols.push(symbol);
            offset += len;
        }

        Ok(Self::with_symbols(symbols))
    }

    /// Size of the serialized table in bytes.
    pub fn serialized_len(&self) -> usize {
        1 + self.symbols.len() + self.symbols.iter().map(|s| s.len()).sum::<usize>()
    }

    /// Append the serialized table to `out`.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.reserve(self.serialized_len());
        out.push(self.symbols.len() as u8);
        out.extend(self.symbols.iter().map(|s| s.len() as u8));
        for symbol in &self.symbols {
            out.extend_from_slice(&symbol.to_le_bytes()[..symbol.len()]);
        }
    }

    /// Serialize the table.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.serialized_len());
        self.write_to(&mut out);
        out
    }

    /// Read a table from the front of `bytes`.
    ///
    /// Returns the table and the number of bytes it occupied; whatever follows is left to the caller.
    ///
    /// # Errors
    ///
    /// Fails if `bytes` ends early or declares a symbol length outside `1..=8`.
    pub fn read_prefix(bytes: &[u8]) -> Result<(Self, usize), TableError> {
        let truncated = |needed: usize| TableError::Truncated {
            needed,
            available: bytes.len(),
        };

        let n = *bytes.first().ok_or_else(|| truncated(1))? as usize;
        if n > MAX_SYMBOLS {
            return Err(TableError::TooManySymbols(n));
        }

        let lengths = bytes.get(1..1 + n).ok_or_else(|| truncated(1 + n))?;
        if let Some((code, len)) = lengths
            .iter()
            .enumerate()
            .find(|(_, len)| !(1..=Symbol::MAX_LEN).contains(&(**len as usize)))
        {
            return Err(TableError::InvalidSymbolLength {
                code,
                len: *len as usize,
            });
        }

        let total = 1 + n + lengths.iter().map(|len| *len as usize).sum::<usize>();
        let mut offset = 1 + n;
        let mut symbols = Vec::with_capacity(n);
        for &len in lengths {
            let end = offset + len as usize;
            let symbol = bytes
                .get(offset..end)
                .and_then(Symbol::from_bytes)
                .ok_or_else(|| truncated(total))?;
            symbols.push(symbol);
            offset = end;
        }

        Ok((Self::with_symbols(symbols), total))
    }

    /// Deserialize a table that occupies all of `bytes`.
    ///
    /// # Errors
    ///
    /// Same as [`read_prefix`][Self::read_prefix], plus [`TableError::TrailingBytes`] if anything
    /// follows the table.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TableError> {
        let (table, consumed) = Self::read_prefix(bytes)?;
        if consumed != bytes.len() {
            return Err(TableError::TrailingBytes(bytes.len() - consumed));
        }

        Ok(table)
    }
}

impl PartialEq for SymbolTable {
    fn eq(&self, other: &Self) -> bool {
        self.symbols == other.symbols
    }
}

impl Eq for SymbolTable {}

impl Hash for SymbolTable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.symbols.hash(state);
    }
}

impl Debug for SymbolTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.symbols.iter().enumerate())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sym(bytes: &[u8]) -> Symbol {
        Symbol::from_bytes(bytes).unwrap()
    }

    fn table() -> SymbolTable {
        SymbolTable::new(vec![sym(b"road"), sym(&[0]), sym(b"highway\0")]).unwrap()
    }

    #[test]
    fn test_layout() {
        let bytes = table().to_bytes();
        let mut expected = vec![3, 4, 1, 8];
        expected.extend_from_slice(b"road");
        expected.push(0);
        expected.extend_from_slice(b"highway\0");

        assert_eq!(bytes, expected);
        assert_eq!(table().serialized_len(), bytes.len());
        assert_eq!(SymbolTable::from_bytes(&bytes).unwrap(), table());
    }

    #[test]
    fn test_empty_table() {
        let empty = SymbolTable::default();
        assert_eq!(empty.to_bytes(), vec![0]);
        assert_eq!(SymbolTable::from_bytes(&[0]).unwrap(), empty);
    }

    #[test]
    fn test_read_prefix() {
        let mut bytes = table().to_bytes();
        let table_len = bytes.len();
        bytes.extend_from_slice(&[1, 2, 3]);

        let (read, consumed) = SymbolTable::read_prefix(&bytes).unwrap();
        assert_eq!(read, table());
        assert_eq!(consumed, table_len);
        assert_eq!(
            SymbolTable::from_bytes(&bytes),
            Err(TableError::TrailingBytes(3))
        );
    }

    #[test]
    fn test_malformed_descriptors() {
        assert_eq!(
            SymbolTable::from_bytes(&[]),
            Err(TableError::Truncated {
                needed: 1,
                available: 0
            })
        );
        assert_eq!(
            SymbolTable::from_bytes(&[255]),
            Err(TableError::Truncated {
                needed: 256,
                available: 1
            })
        );
        assert_eq!(
            SymbolTable::from_bytes(&[2, 1, 0, b'a']),
            Err(TableError::InvalidSymbolLength { code: 1, len: 0 })
        );
        assert_eq!(
            SymbolTable::from_bytes(&[1, 9]),
            Err(TableError::InvalidSymbolLength { code: 0, len: 9 })
        );
        assert_eq!(
            SymbolTable::from_bytes(&[1, 3, b'a', b'b']),
            Err(TableError::Truncated {
                needed: 5,
                available: 4
            })
        );
    }

    #[test]
    fn test_parts() {
        let table = table();
        assert_eq!(table.symbol_lengths(), vec![4, 1, 8]);
        assert_eq!(table.symbol_bytes(), b"road\0highway\0");
        assert_eq!(
            SymbolTable::from_parts(&table.symbol_bytes(), &table.symbol_lengths()).unwrap(),
            table
        );

        assert_eq!(
            SymbolTable::from_parts(b"abc", &[1, 1]),
            Err(TableError::LengthMismatch {
                lengths_total: 2,
                bytes: 3
            })
        );
        assert_eq!(
            SymbolTable::from_parts(b"abc", &[3, 0]),
            Err(TableError::InvalidSymbolLength { code: 1, len: 0 })
        );
    }

    #[test]
    fn test_too_many_symbols() {
        let symbols = vec![Symbol::from_u8(0); 256];
        assert_eq!(
            SymbolTable::new(symbols),
            Err(TableError::TooManySymbols(256))
        );
    }

    #[test]
    fn test_equality_ignores_history() {
        let trained = crate::build_table("abcabcabc");
        let rebuilt = SymbolTable::new(trained.symbols().to_vec()).unwrap();
        assert_eq!(trained, rebuilt);
        assert_ne!(trained, SymbolTable::default());

        // A table that has built its compressor still equals and hashes like one that has not.
        let _ = trained.compressor();
        assert_eq!(trained, rebuilt);
        let hash = |table: &SymbolTable| {
            let mut hasher = std::collections::hash_map::DefaultHasher::new();
            table.hash(&mut hasher);
            hasher.finish()
        };
        assert_eq!(hash(&trained), hash(&rebuilt));
    }

    #[test]
    fn test_compressor_is_cached() {
        let table = crate::build_table("Main Street Main Street");
        let first: *const Compressor = table.compressor();
        let second: *const Compressor = table.compressor();
        assert!(std::ptr::eq(first, second));

        for _ in 0..3 {
            assert!(std::ptr::eq(table.compressor(), first));
            assert_eq!(
                crate::decode(&crate::encode(b"Main Street", &table), &table).unwrap(),
                b"Main Street"
            );
        }

        // Clones carry the built compressor along and keep working.
        let cloned = table.clone();
        assert_eq!(cloned.compressor().symbols(), table.symbols());
    }

    #[test]
    fn test_rejects_invalid_symbol_lengths() {
        assert_eq!(SymbolTable::new(vec![sym(b"ok")]).map(|t| t.len()), Ok(1));

        let overlong = Symbol {
            value: u64::MAX,
            len: 16,
        };
        assert_eq!(
            SymbolTable::new(vec![sym(b"ok"), overlong]),
            Err(TableError::InvalidSymbolLength { code: 1, len: 16 })
        );

        let empty = Symbol { value: 0, len: 0 };
        assert_eq!(
            SymbolTable::new(vec![empty]),
            Err(TableError::InvalidSymbolLength { code: 0, len: 0 })
        );
    }
}
