//! Longest-match search over a symbol table.

mod naive;

/// Find the code that maps to the symbol with the longest match against a piece of text.
pub(crate) trait FindLongestSymbol {
    /// Returns an extended code for the start of `text`.
    ///
    /// Values below 256 mean that no symbol matches and the byte itself must be escaped. Values
    /// from 256 up are `256 + code` of the matching symbol.
    fn find_longest_symbol(&self, text: &[u8]) -> u16;
}
