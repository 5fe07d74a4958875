//! Error types for symbol tables and code streams.

use thiserror::Error;

/// Result type alias for operations that can fail on a table or a code stream.
pub type Result<T> = std::result::Result<T, Error>;

/// A code stream that cannot have been produced by a compressor using the supplied table.
///
/// This is the only error surfaced by decompression. It is never retried: the stream is
/// either corrupt or paired with the wrong [`SymbolTable`][crate::SymbolTable].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MalformedStreamError {
    /// A code refers to a slot that the table does not populate.
    #[error("code {code} at offset {offset} is not assigned in a table of {n_symbols} symbols")]
    UnassignedCode {
        /// The offending code.
        code: u8,
        /// Position of the code within the compressed stream.
        offset: usize,
        /// Number of symbols in the table used for decoding.
        n_symbols: usize,
    },

    /// The stream ends directly after an escape code.
    #[error("escape code at offset {offset} is not followed by a literal byte")]
    TruncatedEscape {
        /// Position of the dangling escape code.
        offset: usize,
    },
}

/// A serialized or hand-assembled symbol table that violates the table invariants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TableError {
    /// The buffer ends before the descriptor does.
    #[error("truncated symbol table: need {needed} bytes, got {available}")]
    Truncated {
        /// Bytes required by the descriptor read so far.
        needed: usize,
        /// Bytes actually present.
        available: usize,
    },

    /// A symbol length outside of `1..=8`.
    #[error("symbol with code {code} has invalid length {len}")]
    InvalidSymbolLength {
        /// Code of the offending symbol.
        code: usize,
        /// The declared length.
        len: usize,
    },

    /// More symbols than there are non-escape codes.
    #[error("symbol table holds {0} symbols, at most 255 are allowed")]
    TooManySymbols(usize),

    /// Bytes left over after a complete descriptor.
    #[error("{0} trailing bytes after symbol table")]
    TrailingBytes(usize),

    /// Columnar symbol bytes do not add up to the declared lengths.
    #[error("symbol lengths sum to {lengths_total} but {bytes} symbol bytes were given")]
    LengthMismatch {
        /// Sum of all declared symbol lengths.
        lengths_total: usize,
        /// Number of symbol bytes supplied.
        bytes: usize,
    },
}

/// Any error produced by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// Decompression failed.
    #[error("malformed stream: {0}")]
    MalformedStream(#[from] MalformedStreamError),

    /// A symbol table could not be read or assembled.
    #[error("invalid symbol table: {0}")]
    Table(#[from] TableError),
}

/// A byte string that cannot be a [`Symbol`][crate::Symbol] because of its length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("symbol length {0} is outside 1..=8")]
pub struct SymbolLengthError(pub usize);

/// A backend name that matches none of the known implementations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown backend '{0}', expected one of: native, portable, instrumented")]
pub struct ParseBackendError(pub String);
