#![no_main]

use fsst::{Backend, Codec, CodecConfig, Fsst, SymbolTable};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let codec = Codec::new(&CodecConfig::default().with_backend(Backend::Instrumented));
    let table = codec.build_table(data);
    assert_eq!(SymbolTable::from_bytes(&table.to_bytes()).unwrap(), table);

    let compressed = codec.encode(data, &table);
    assert_eq!(codec.decode(&compressed, &table).unwrap(), data);
    assert_eq!(codec.stats().unwrap().mismatches, 0);
});
