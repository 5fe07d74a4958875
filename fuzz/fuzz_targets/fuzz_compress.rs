#![no_main]

use fsst::{Backend, Codec, CodecConfig, Fsst};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let table = fsst::build_table("the quick brown fox jumped over the lazy dog".as_bytes());
    let compressed = fsst::encode(data, &table);
    let decompressed = fsst::decode(&compressed, &table).unwrap();
    assert_eq!(&decompressed, data);

    let portable = Codec::new(&CodecConfig::default().with_backend(Backend::Portable));
    assert_eq!(portable.encode(data, &table), compressed);
});
