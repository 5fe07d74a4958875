//! Safe, table-driven compression and decompression.
//!
//! These loops serve the [`PortableFsst`][crate::PortableFsst] backend and any [`Compressor`][crate::Compressor]
//! whose table does not fit the fast lookup structures. They produce byte-identical output to the
//! native loops.

use crate::find_longest::FindLongestSymbol;
use crate::{MalformedStreamError, Symbol, CODE_BASE, ESCAPE_CODE};

/// Compress `text` into `out`, replacing its previous contents.
pub(crate) fn compress_into(symbols: &[Symbol], text: &[u8], out: &mut Vec<u8>) {
    out.clear();
    out.reserve(2 * text.len());

    let mut pos = 0;
    while pos < text.len() {
        let code = symbols.find_longest_symbol(&text[pos..]);
        if code < CODE_BASE {
            out.push(ESCAPE_CODE);
            out.push(code as u8);
            pos += 1;
        } else {
            let code = (code - CODE_BASE) as usize;
            out.push(code as u8);
            pos += symbols[code].len();
        }
    }
}

/// Decompress `compressed` by appending symbol slices.
pub(crate) fn decompress(
    symbols: &[Symbol],
    compressed: &[u8],
) -> Result<Vec<u8>, MalformedStreamError> {
    let mut decoded = Vec::with_capacity(2 * compressed.len());

    let mut codes = compressed.iter().copied().enumerate();
    while let Some((offset, code)) = codes.next() {
        if code == ESCAPE_CODE {
            let (_, literal) = codes
                .next()
                .ok_or(MalformedStreamError::TruncatedEscape { offset })?;
            decoded.push(literal);
        } else {
            let symbol = symbols
                .get(code as usize)
                .ok_or(MalformedStreamError::UnassignedCode {
                    code,
                    offset,
                    n_symbols: symbols.len(),
                })?;
            decoded.extend_from_slice(&symbol.to_le_bytes()[..symbol.len()]);
        }
    }

    Ok(decoded)
}
