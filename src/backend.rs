//! Interchangeable implementations of the codec behind a single capability.
//!
//! Every backend builds identical tables and produces identical code streams; they differ only in
//! speed and in the diagnostics they emit. A [`Codec`] picks one from a [`CodecConfig`] when it is
//! constructed and keeps it for its whole lifetime.
//!
//! ```
//! use fsst::{Backend, Codec, CodecConfig};
//!
//! let codec = Codec::new(&CodecConfig::default().with_backend(Backend::Portable));
//! let encoded = codec.encode_column(b"residential residential");
//! assert_eq!(codec.decode_column(&encoded).unwrap(), b"residential residential");
//! ```

use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use tracing::{debug, error, warn};

use crate::builder::train_lines;
use crate::{
    portable, sample_lines, Compressor, Encoded, MalformedStreamError, ParseBackendError,
    SymbolTable,
};

/// Default number of bytes [`Codec::encode_column`] trains on.
pub const DEFAULT_SAMPLE_TARGET: usize = 1 << 14;

/// The available implementations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Word-at-a-time compression over hashed lookup tables.
    #[default]
    Native,

    /// Safe byte-by-byte loops with an exhaustive longest-match search.
    Portable,

    /// Runs both of the above, cross-checks their results and logs timings.
    Instrumented,
}

impl Backend {
    /// Every backend, in declaration order.
    pub const ALL: [Backend; 3] = [Backend::Native, Backend::Portable, Backend::Instrumented];

    /// Environment variable read by deployments that pick the backend from the process
    /// environment.
    pub const ENV_VAR: &'static str = "FSST";

    /// Interpret a value of [`ENV_VAR`][Self::ENV_VAR].
    ///
    /// Unlike [`FromStr`], unrecognised values fall back to [`Backend::Native`] with a warning.
    pub fn from_env_value(value: &str) -> Self {
        value.parse().unwrap_or_else(|err: ParseBackendError| {
            warn!(%err, "falling back to the native backend");
            Backend::Native
        })
    }

    /// Canonical lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            Backend::Native => "native",
            Backend::Portable => "portable",
            Backend::Instrumented => "instrumented",
        }
    }
}

impl Display for Backend {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Backend {
    type Err = ParseBackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "native" | "jni" => Ok(Backend::Native),
            "portable" | "java" => Ok(Backend::Portable),
            "instrumented" | "debug" => Ok(Backend::Instrumented),
            _ => Err(ParseBackendError(s.to_string())),
        }
    }
}

/// The three codec operations, implemented by every backend.
pub trait Fsst: Send + Sync {
    /// Which implementation this is.
    fn backend(&self) -> Backend;

    /// Train a table on independent strings. Candidates never span two strings.
    fn build_table_bulk(&self, lines: &[&[u8]]) -> SymbolTable;

    /// Train a table on a single sample.
    fn build_table(&self, sample: &[u8]) -> SymbolTable {
        self.build_table_bulk(&[sample])
    }

    /// Compress `data` under `table`. Never fails.
    fn encode(&self, data: &[u8], table: &SymbolTable) -> Vec<u8>;

    /// Reverse [`encode`][Fsst::encode].
    ///
    /// # Errors
    ///
    /// Fails if `codes` is not a valid stream under `table`.
    fn decode(&self, codes: &[u8], table: &SymbolTable) -> Result<Vec<u8>, MalformedStreamError>;
}

/// The [`Backend::Native`] implementation, built on [`Compressor`] and [`crate::Decompressor`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeFsst;

impl Fsst for NativeFsst {
    fn backend(&self) -> Backend {
        Backend::Native
    }

    fn build_table_bulk(&self, lines: &[&[u8]]) -> SymbolTable {
        Compressor::train_bulk(lines).symbol_table()
    }

    fn encode(&self, data: &[u8], table: &SymbolTable) -> Vec<u8> {
        table.compressor().compress(data)
    }

    fn decode(&self, codes: &[u8], table: &SymbolTable) -> Result<Vec<u8>, MalformedStreamError> {
        table.decompressor().decompress(codes)
    }
}

/// The [`Backend::Portable`] implementation. Uses no unsafe code on the encode and decode paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct PortableFsst;

impl Fsst for PortableFsst {
    fn backend(&self) -> Backend {
        Backend::Portable
    }

    fn build_table_bulk(&self, lines: &[&[u8]]) -> SymbolTable {
        train_lines(lines, |compressor, line, out| {
            portable::compress_into(compressor.symbols(), line, out)
        })
        .symbol_table()
    }

    fn encode(&self, data: &[u8], table: &SymbolTable) -> Vec<u8> {
        let mut out = Vec::new();
        portable::compress_into(table.symbols(), data, &mut out);
        out
    }

    fn decode(&self, codes: &[u8], table: &SymbolTable) -> Result<Vec<u8>, MalformedStreamError> {
        portable::decompress(table.symbols(), codes)
    }
}

/// Counters kept by [`InstrumentedFsst`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstrumentedStats {
    /// Tables built.
    pub tables_built: u64,
    /// Calls to `encode`.
    pub encodes: u64,
    /// Calls to `decode`.
    pub decodes: u64,
    /// Plaintext bytes passed to `encode`.
    pub bytes_encoded: u64,
    /// Plaintext bytes produced by `decode`.
    pub bytes_decoded: u64,
    /// Operations where the native and portable results disagreed.
    pub mismatches: u64,
}

/// The [`Backend::Instrumented`] implementation.
///
/// Every operation runs on both [`NativeFsst`] and [`PortableFsst`]. The portable result is
/// returned; a disagreement is logged at error level and counted.
#[derive(Debug, Default)]
pub struct InstrumentedFsst {
    native: NativeFsst,
    portable: PortableFsst,
    tables_built: AtomicU64,
    encodes: AtomicU64,
    decodes: AtomicU64,
    bytes_encoded: AtomicU64,
    bytes_decoded: AtomicU64,
    mismatches: AtomicU64,
}

impl InstrumentedFsst {
    /// Snapshot of the counters.
    pub fn stats(&self) -> InstrumentedStats {
        InstrumentedStats {
            tables_built: self.tables_built.load(Ordering::Relaxed),
            encodes: self.encodes.load(Ordering::Relaxed),
            decodes: self.decodes.load(Ordering::Relaxed),
            bytes_encoded: self.bytes_encoded.load(Ordering::Relaxed),
            bytes_decoded: self.bytes_decoded.load(Ordering::Relaxed),
            mismatches: self.mismatches.load(Ordering::Relaxed),
        }
    }

    fn check<T: PartialEq>(&self, operation: &'static str, native: &T, portable: &T) {
        if native != portable {
            self.mismatches.fetch_add(1, Ordering::Relaxed);
            error!(operation, "native and portable backends disagree");
        }
    }
}

impl Fsst for InstrumentedFsst {
    fn backend(&self) -> Backend {
        Backend::Instrumented
    }

    fn build_table_bulk(&self, lines: &[&[u8]]) -> SymbolTable {
        let start = Instant::now();
        let native = self.native.build_table_bulk(lines);
        let native_us = start.elapsed().as_micros() as u64;

        let start = Instant::now();
        let portable = self.portable.build_table_bulk(lines);
        let portable_us = start.elapsed().as_micros() as u64;

        self.tables_built.fetch_add(1, Ordering::Relaxed);
        self.check("build_table", &native, &portable);
        debug!(
            lines = lines.len(),
            sample_bytes = lines.iter().map(|line| line.len()).sum::<usize>(),
            n_symbols = portable.len(),
            native_us,
            portable_us,
            "built symbol table"
        );

        portable
    }

    fn encode(&self, data: &[u8], table: &SymbolTable) -> Vec<u8> {
        let start = Instant::now();
        let native = self.native.encode(data, table);
        let native_us = start.elapsed().as_micros() as u64;

        let start = Instant::now();
        let portable = self.portable.encode(data, table);
        let portable_us = start.elapsed().as_micros() as u64;

        self.encodes.fetch_add(1, Ordering::Relaxed);
        self.bytes_encoded
            .fetch_add(data.len() as u64, Ordering::Relaxed);
        self.check("encode", &native, &portable);
        debug!(
            input_bytes = data.len(),
            output_bytes = portable.len(),
            native_us,
            portable_us,
            "encoded"
        );

        portable
    }

    fn decode(&self, codes: &[u8], table: &SymbolTable) -> Result<Vec<u8>, MalformedStreamError> {
        let start = Instant::now();
        let native = self.native.decode(codes, table);
        let native_us = start.elapsed().as_micros() as u64;

        let start = Instant::now();
        let portable = self.portable.decode(codes, table);
        let portable_us = start.elapsed().as_micros() as u64;

        self.decodes.fetch_add(1, Ordering::Relaxed);
        if let Ok(decoded) = &portable {
            self.bytes_decoded
                .fetch_add(decoded.len() as u64, Ordering::Relaxed);
        }
        self.check("decode", &native, &portable);
        debug!(
            input_bytes = codes.len(),
            ok = portable.is_ok(),
            native_us,
            portable_us,
            "decoded"
        );

        portable
    }
}

/// Settings for a [`Codec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecConfig {
    /// Which implementation services the calls.
    pub backend: Backend,

    /// Bytes sampled by [`Codec::encode_column`] to train its table.
    pub sample_target: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            sample_target: DEFAULT_SAMPLE_TARGET,
        }
    }
}

impl CodecConfig {
    /// Replace the backend.
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Replace the sample target. Values below one chunk still take a single chunk.
    pub fn with_sample_target(mut self, sample_target: usize) -> Self {
        self.sample_target = sample_target;
        self
    }
}

#[derive(Debug)]
enum Variant {
    Native(NativeFsst),
    Portable(PortableFsst),
    Instrumented(InstrumentedFsst),
}

impl Variant {
    fn as_fsst(&self) -> &dyn Fsst {
        match self {
            Variant::Native(native) => native,
            Variant::Portable(portable) => portable,
            Variant::Instrumented(instrumented) => instrumented,
        }
    }
}

/// Handle to the backend chosen for this process.
///
/// Construct it once from configuration and share it; the backend never changes afterwards.
#[derive(Debug)]
pub struct Codec {
    variant: Variant,
    sample_target: usize,
}

impl Codec {
    /// Select the backend named in `config`.
    pub fn new(config: &CodecConfig) -> Self {
        let variant = match config.backend {
            Backend::Native => Variant::Native(NativeFsst),
            Backend::Portable => Variant::Portable(PortableFsst),
            Backend::Instrumented => Variant::Instrumented(InstrumentedFsst::default()),
        };
        debug!(backend = %config.backend, sample_target = config.sample_target, "selected codec");

        Self {
            variant,
            sample_target: config.sample_target,
        }
    }

    /// Build-table-then-compress: train on a sample of `data`, then compress all of it.
    pub fn encode_column(&self, data: &[u8]) -> Encoded {
        let sample = sample_lines(data, self.sample_target);
        let table = self.build_table_bulk(&sample);
        let codes = self.encode(data, &table);
        Encoded::new(table, codes)
    }

    /// Decompress the output of [`encode_column`][Self::encode_column].
    ///
    /// # Errors
    ///
    /// Fails if the codes are not a valid stream under the bundled table.
    pub fn decode_column(&self, encoded: &Encoded) -> Result<Vec<u8>, MalformedStreamError> {
        self.decode(&encoded.codes, &encoded.table)
    }

    /// Counters of the instrumented backend, `None` for the others.
    pub fn stats(&self) -> Option<InstrumentedStats> {
        match &self.variant {
            Variant::Instrumented(instrumented) => Some(instrumented.stats()),
            _ => None,
        }
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::new(&CodecConfig::default())
    }
}

impl Fsst for Codec {
    fn backend(&self) -> Backend {
        self.variant.as_fsst().backend()
    }

    fn build_table_bulk(&self, lines: &[&[u8]]) -> SymbolTable {
        self.variant.as_fsst().build_table_bulk(lines)
    }

    fn encode(&self, data: &[u8], table: &SymbolTable) -> Vec<u8> {
        self.variant.as_fsst().encode(data, table)
    }

    fn decode(&self, codes: &[u8], table: &SymbolTable) -> Result<Vec<u8>, MalformedStreamError> {
        self.variant.as_fsst().decode(codes, table)
    }
}
