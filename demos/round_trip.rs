//! Simple example where we show round-tripping a string through the static symbol table.

use core::str;

use fsst::{Backend, Codec, CodecConfig, SymbolTable};

fn main() {
    // Train on a sample.
    let sample = "the quick brown fox jumped over the lazy dog";
    let table = fsst::build_table(sample);
    let compressed = fsst::encode(sample.as_bytes(), &table);
    println!(
        "compressed: {} => {} with {} symbols",
        sample.len(),
        compressed.len(),
        table.len()
    );

    // The table is shipped alongside the codes.
    let serialized = table.to_bytes();
    let table = SymbolTable::from_bytes(&serialized).unwrap();
    println!("table serialized to {} bytes", serialized.len());

    // decompress now
    let decode = fsst::decode(&compressed, &table).unwrap();
    let output = str::from_utf8(&decode).unwrap();
    println!(
        "decoded to the original: len={} text='{}'",
        decode.len(),
        output
    );

    // Same round trip through a codec, with the table bundled into the frame.
    let codec = Codec::new(&CodecConfig::default().with_backend(Backend::Portable));
    let encoded = codec.encode_column(sample.as_bytes());
    println!(
        "{} backend: frame of {} bytes",
        Backend::Portable,
        encoded.serialized_len()
    );
    assert_eq!(codec.decode_column(&encoded).unwrap(), sample.as_bytes());
}
