//! A code stream together with the table it was compressed under.

use crate::{MalformedStreamError, Result, SymbolTable};

/// The output of a build-table-then-compress pass.
///
/// Stored as the serialized [`SymbolTable`] immediately followed by the codes, which run to the end
/// of the buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Encoded {
    /// The table the codes refer to.
    pub table: SymbolTable,

    /// The compressed code stream.
    pub codes: Vec<u8>,
}

impl Encoded {
    /// Pair a code stream with its table.
    pub fn new(table: SymbolTable, codes: Vec<u8>) -> Self {
        Self { table, codes }
    }

    /// Size of the frame in bytes.
    pub fn serialized_len(&self) -> usize {
        self.table.serialized_len() + self.codes.len()
    }

    /// Serialize the table followed by the codes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.serialized_len());
        self.table.write_to(&mut out);
        out.extend_from_slice(&self.codes);
        out
    }

    /// Split a serialized frame back into table and codes.
    ///
    /// # Errors
    ///
    /// Fails if the table descriptor at the front of `bytes` is malformed.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (table, consumed) = SymbolTable::read_prefix(bytes)?;
        Ok(Self {
            table,
            codes: bytes[consumed..].to_vec(),
        })
    }

    /// Decompress the codes with the native decoder.
    ///
    /// # Errors
    ///
    /// Fails if the codes are not a valid stream under the table.
    pub fn decode(&self) -> std::result::Result<Vec<u8>, MalformedStreamError> {
        self.table.decompressor().decompress(&self.codes)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{Error, TableError, ESCAPE_CODE};

    #[test]
    fn test_frame() {
        let table = crate::build_table("cycleway cycleway");
        let codes = crate::encode(b"cycleway!", &table);
        let encoded = Encoded::new(table, codes);

        let bytes = encoded.to_bytes();
        assert_eq!(bytes.len(), encoded.serialized_len());

        let read = Encoded::from_bytes(&bytes).unwrap();
        assert_eq!(read, encoded);
        assert_eq!(read.decode().unwrap(), b"cycleway!");
    }

    #[test]
    fn test_empty_frame() {
        let encoded = Encoded::default();
        assert_eq!(encoded.to_bytes(), vec![0]);
        assert!(Encoded::from_bytes(&[0]).unwrap().decode().unwrap().is_empty());
    }

    #[test]
    fn test_bad_frames() {
        assert_eq!(
            Encoded::from_bytes(&[1]),
            Err(Error::Table(TableError::Truncated {
                needed: 2,
                available: 1
            }))
        );

        let dangling = Encoded::from_bytes(&[0, ESCAPE_CODE]).unwrap();
        assert_eq!(
            dangling.decode(),
            Err(MalformedStreamError::TruncatedEscape { offset: 0 })
        );
    }
}
