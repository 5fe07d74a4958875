#![cfg(test)]
//! End-to-end behavior of table building, encoding and decoding.

use fsst::{
    build_table, decode, encode, Backend, Codec, CodecConfig, Encoded, Fsst, MalformedStreamError,
    SymbolTable, ESCAPE_CODE,
};

static PREAMBLE: &str = r#"
When in the Course of human events, it becomes necessary for one people to dissolve
the political bands which have connected them with another, and to assume among the
powers of the earth, the separate and equal station to which the Laws of Nature and
of Nature's God entitle them, a decent respect to the opinions of mankind requires
that they should declare the causes which impel them to the separation."#;

static STREET_NAMES: &[&str] = &[
    "Main Street",
    "Main Street",
    "Oak Avenue",
    "Maple Avenue",
    "Station Road",
    "Church Street",
    "High Street",
    "Mill Lane",
    "Oak Avenue",
    "Station Road",
];

#[test]
fn test_basic() {
    let table = build_table(PREAMBLE);
    let compressed = encode(PREAMBLE.as_bytes(), &table);
    assert!(compressed.len() < PREAMBLE.len());
    assert_eq!(decode(&compressed, &table).unwrap(), PREAMBLE.as_bytes());
}

#[test]
fn test_train_on_empty() {
    let table = build_table("");
    assert!(table.is_empty());

    // We can still compress with it, but every byte is escaped.
    let text = "the quick brown fox jumped over the lazy dog";
    let compressed = encode(text.as_bytes(), &table);
    assert_eq!(compressed.len(), 2 * text.len());
    assert_eq!(decode(&compressed, &table).unwrap(), text.as_bytes());
}

#[test]
fn test_empty_input() {
    let table = build_table(PREAMBLE);
    assert!(encode(b"", &table).is_empty());
    assert!(decode(b"", &table).unwrap().is_empty());
}

#[test]
fn test_zeros() {
    // make sure we don't panic if there are zeros in the training or input data
    let training_data: Vec<u8> = vec![0, 1, 2, 3, 4];
    let table = build_table(&training_data);
    let compressed = encode(&[0, 4], &table);
    assert_eq!(decode(&compressed, &table).unwrap(), &[0, 4]);

    let zeros = vec![0u8; 1_000];
    let table = build_table(&zeros);
    let compressed = encode(&zeros, &table);
    assert!(compressed.len() <= zeros.len() / 8);
    assert_eq!(decode(&compressed, &table).unwrap(), zeros);
}

#[test]
fn test_unseen_byte_is_escaped() {
    let table = build_table("aaaa");
    let compressed = encode(b"aaaaz", &table);

    assert_eq!(&compressed[compressed.len() - 2..], &[ESCAPE_CODE, b'z']);
    assert_eq!(decode(&compressed, &table).unwrap(), b"aaaaz");
}

#[test]
fn test_repetitive_input_compresses() {
    let text = "ab".repeat(1_000);
    let table = build_table(&text);
    let compressed = encode(text.as_bytes(), &table);

    assert!(compressed.len() < text.len() / 4);
    assert_eq!(decode(&compressed, &table).unwrap(), text.as_bytes());
}

#[test]
fn test_all_bytes() {
    let data: Vec<u8> = (0..=255u8).cycle().take(4_096).collect();
    let table = build_table(&data);
    assert!(table.len() <= 255);

    let compressed = encode(&data, &table);
    assert_eq!(decode(&compressed, &table).unwrap(), data);
}

#[test]
fn test_large() {
    let mut corpus = String::new();
    while corpus.len() < 1_024 * 1_024 {
        corpus.push_str(PREAMBLE);
    }

    let table = build_table(&corpus);
    let compressed = encode(corpus.as_bytes(), &table);
    assert!(compressed.len() < corpus.len() * 3 / 4);
    assert_eq!(decode(&compressed, &table).unwrap(), corpus.as_bytes());
}

#[test]
fn test_table_survives_serialization() {
    let table = build_table(PREAMBLE);
    let restored = SymbolTable::from_bytes(&table.to_bytes()).unwrap();
    assert_eq!(restored, table);

    // A decoder in another process only needs the serialized table.
    let compressed = encode(PREAMBLE.as_bytes(), &table);
    assert_eq!(decode(&compressed, &restored).unwrap(), PREAMBLE.as_bytes());

    let columnar =
        SymbolTable::from_parts(&table.symbol_bytes(), &table.symbol_lengths()).unwrap();
    assert_eq!(columnar, table);
}

#[test]
fn test_truncated_escape() {
    let table = build_table("aaaa");
    let mut compressed = encode(b"aaaaz", &table);
    compressed.pop();

    assert_eq!(
        decode(&compressed, &table),
        Err(MalformedStreamError::TruncatedEscape {
            offset: compressed.len() - 1
        })
    );
}

#[test]
fn test_unassigned_code() {
    let table = build_table("xy");
    let code = table.len() as u8;
    assert!(matches!(
        decode(&[code], &table),
        Err(MalformedStreamError::UnassignedCode { offset: 0, .. })
    ));
}

#[test]
fn test_backends_agree() {
    let lines: Vec<&[u8]> = STREET_NAMES.iter().map(|name| name.as_bytes()).collect();
    let data = STREET_NAMES.concat();

    let results: Vec<(SymbolTable, Vec<u8>)> = Backend::ALL
        .iter()
        .map(|backend| {
            let codec = Codec::new(&CodecConfig::default().with_backend(*backend));
            let table = codec.build_table_bulk(&lines);
            let codes = codec.encode(data.as_bytes(), &table);
            (table, codes)
        })
        .collect();

    for (table, codes) in &results {
        assert_eq!(table, &results[0].0);
        assert_eq!(codes, &results[0].1);
        assert_eq!(decode(codes, table).unwrap(), data.as_bytes());
    }
}

#[test]
fn test_encode_column_frame() {
    let data = STREET_NAMES.join("\n").repeat(200);

    for backend in Backend::ALL {
        let codec = Codec::new(&CodecConfig::default().with_backend(backend));
        let frame = codec.encode_column(data.as_bytes()).to_bytes();
        assert!(frame.len() < data.len());

        let encoded = Encoded::from_bytes(&frame).unwrap();
        assert_eq!(codec.decode_column(&encoded).unwrap(), data.as_bytes());
    }
}

#[test]
fn test_shared_across_threads() {
    let codec = Codec::new(&CodecConfig::default().with_backend(Backend::Instrumented));
    let table = codec.build_table(PREAMBLE.as_bytes());

    std::thread::scope(|scope| {
        for line in PREAMBLE.lines() {
            let (codec, table) = (&codec, &table);
            scope.spawn(move || {
                let codes = codec.encode(line.as_bytes(), table);
                assert_eq!(codec.decode(&codes, table).unwrap(), line.as_bytes());
            });
        }
    });

    let stats = codec.stats().unwrap();
    assert_eq!(stats.encodes, PREAMBLE.lines().count() as u64);
    assert_eq!(stats.mismatches, 0);
}
