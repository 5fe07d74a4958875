#![no_main]

use fsst::{Backend, Codec, CodecConfig, Encoded, Fsst};
use libfuzzer_sys::fuzz_target;

// Arbitrary frames must either fail cleanly or decode identically on every backend.
fuzz_target!(|data: &[u8]| {
    let Ok(encoded) = Encoded::from_bytes(data) else {
        return;
    };

    let native = encoded.decode();
    let portable = Codec::new(&CodecConfig::default().with_backend(Backend::Portable))
        .decode(&encoded.codes, &encoded.table);
    assert_eq!(native, portable);
});
