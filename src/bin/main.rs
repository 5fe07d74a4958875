//! Command-line front end for training, applying and inspecting FSST symbol tables.
//!
//! ## Usage
//!
//! ```bash
//! # Train a table on the lines of a sample file
//! mlt-fsst train names.txt -o names.fsst
//!
//! # Compress with an existing table, or train one on the input itself
//! mlt-fsst compress names.txt --table names.fsst -o names.bin
//! mlt-fsst compress names.txt -o names.bin
//!
//! # Restore the input
//! mlt-fsst decompress names.bin -o names.out
//!
//! # List the symbols of a table
//! FSST=portable mlt-fsst inspect names.fsst
//! ```

use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use fsst::{Backend, Codec, CodecConfig, Encoded, Fsst, SymbolTable, DEFAULT_SAMPLE_TARGET};

#[derive(Parser, Debug)]
#[command(name = "mlt-fsst")]
#[command(version)]
#[command(about = "Static symbol table string compression", long_about = None)]
struct Args {
    /// Implementation to use (native, portable, instrumented). When absent, the FSST
    /// environment variable is read instead, and values it does not recognise select native.
    #[arg(long, global = true)]
    backend: Option<Backend>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Bytes sampled when a table is trained on the input being compressed
    #[arg(long, global = true, default_value_t = DEFAULT_SAMPLE_TARGET)]
    sample_target: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train a symbol table on the lines of a sample file
    Train {
        /// Sample file
        sample: PathBuf,

        /// Where to write the serialized table
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Compress a file into a frame holding the table followed by the codes
    Compress {
        /// File to compress
        input: PathBuf,

        /// Serialized table to compress with; trained on the input when absent
        #[arg(long)]
        table: Option<PathBuf>,

        /// Where to write the frame
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Decompress a frame written by `compress`
    Decompress {
        /// Frame to decompress
        input: PathBuf,

        /// Where to write the restored bytes
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print the symbols of a serialized table
    Inspect {
        /// Serialized table
        table: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let backend = match args.backend {
        Some(backend) => backend,
        None => std::env::var(Backend::ENV_VAR)
            .map(|value| Backend::from_env_value(&value))
            .unwrap_or_default(),
    };

    let config = CodecConfig::default()
        .with_backend(backend)
        .with_sample_target(args.sample_target);
    let codec = Codec::new(&config);

    match args.command {
        Command::Train { sample, output } => {
            let data = fs::read(&sample)?;
            let lines: Vec<&[u8]> = data.split(|byte| *byte == b'\n').collect();
            let table = codec.build_table_bulk(&lines);
            fs::write(&output, table.to_bytes())?;
            info!(
                lines = lines.len(),
                n_symbols = table.len(),
                table_bytes = table.serialized_len(),
                "wrote {}",
                output.display()
            );
        }
        Command::Compress {
            input,
            table,
            output,
        } => {
            let data = fs::read(&input)?;
            let encoded = match table {
                Some(path) => {
                    let table = SymbolTable::from_bytes(&fs::read(path)?)?;
                    let codes = codec.encode(&data, &table);
                    Encoded::new(table, codes)
                }
                None => codec.encode_column(&data),
            };

            let frame = encoded.to_bytes();
            fs::write(&output, &frame)?;
            info!(
                input_bytes = data.len(),
                output_bytes = frame.len(),
                n_symbols = encoded.table.len(),
                "wrote {}",
                output.display()
            );
        }
        Command::Decompress { input, output } => {
            let encoded = Encoded::from_bytes(&fs::read(&input)?)?;
            let decoded = codec.decode_column(&encoded)?;
            fs::write(&output, &decoded)?;
            info!(
                input_bytes = encoded.serialized_len(),
                output_bytes = decoded.len(),
                "wrote {}",
                output.display()
            );
        }
        Command::Inspect { table } => {
            let table = SymbolTable::from_bytes(&fs::read(table)?)?;
            println!(
                "{} symbols, {} bytes serialized",
                table.len(),
                table.serialized_len()
            );
            for (code, symbol) in table.symbols().iter().enumerate() {
                println!(
                    "{code:>3}  len={}  \"{}\"",
                    symbol.len(),
                    symbol.to_vec().escape_ascii()
                );
            }
        }
    }

    if let Some(stats) = codec.stats() {
        info!(
            tables_built = stats.tables_built,
            encodes = stats.encodes,
            decodes = stats.decodes,
            mismatches = stats.mismatches,
            "instrumented backend"
        );
    }

    Ok(())
}
