#![allow(missing_docs)]

use criterion::{criterion_group, criterion_main, Criterion, Throughput};

use fsst::{Backend, Codec, CodecConfig, Compressor, Fsst, Symbol, SymbolTable};

fn one_megabyte(seed: &[u8]) -> Vec<u8> {
    seed.iter().copied().cycle().take(1024 * 1024).collect()
}

fn compressor_with(symbols: &[&str]) -> Compressor {
    let mut compressor = Compressor::default();
    for symbol in symbols {
        assert!(compressor.insert(Symbol::from_bytes(symbol.as_bytes()).unwrap()));
    }
    compressor
}

fn bench_compress(c: &mut Criterion) {
    let mut group = c.benchmark_group("compress-overhead");
    group.bench_function("compress-word", |b| {
        let compressor = compressor_with(&["a"]);
        let mut output = [0u8, 0u8];

        b.iter(|| unsafe {
            compressor.compress_word('a' as u64, output.as_mut_ptr());
        });
    });

    // Reusable memory to hold outputs
    let mut output_buf: Vec<u8> = Vec::with_capacity(1_024 * 1024 * 2);

    group.bench_function("compress-hashtab", |b| {
        let compressor = compressor_with(&["abcdefgh"]);

        b.iter(|| {
            compressor.compress_into(
                b"abcdefghabcdefghabcdefghabcdefghabcdefghabcdefghabcdefghabcdefgh",
                &mut output_buf,
            );
        });
    });

    group.bench_function("compress-twobytes", |b| {
        let compressor = compressor_with(&["ab"]);

        b.iter(|| {
            compressor.compress_into(b"abababababababab", &mut output_buf);
        });
    });
    group.finish();

    let mut group = c.benchmark_group("cf=1");
    let test_string = one_megabyte(b"aaaaaaaa");
    group.throughput(Throughput::Bytes(test_string.len() as u64));
    group.bench_function("compress", |b| {
        let compressor = compressor_with(&["a"]);

        b.iter(|| {
            compressor.compress_into(&test_string, &mut output_buf);
        })
    });
    group.finish();

    let mut group = c.benchmark_group("cf=2");
    let test_string = one_megabyte(b"ab");

    group.throughput(Throughput::Bytes(test_string.len() as u64));
    group.bench_function("compress", |b| {
        // This outputs two codes for every 4 bytes of text.
        let compressor = compressor_with(&["a", "bab"]);

        b.iter(|| {
            compressor.compress_into(&test_string, &mut output_buf);
        })
    });
    group.finish();

    let mut group = c.benchmark_group("cf=4");
    let test_string = one_megabyte(b"abcd");
    group.throughput(Throughput::Bytes(test_string.len() as u64));
    group.bench_function("compress", |b| {
        let compressor = compressor_with(&["abcd"]);

        b.iter(|| {
            compressor.compress_into(&test_string, &mut output_buf);
        })
    });
    group.finish();

    let mut group = c.benchmark_group("cf=8");
    let test_string = one_megabyte(b"abcdefgh");
    group.throughput(Throughput::Bytes(test_string.len() as u64));
    group.bench_function("compress", |b| {
        let compressor = compressor_with(&["abcdefgh"]);

        b.iter(|| {
            compressor.compress_into(&test_string, &mut output_buf);
        })
    });

    group.bench_function("decompress", |b| {
        let compressor = compressor_with(&["abcdefgh"]);
        let compressed = compressor.compress(&test_string);

        let decompressor = compressor.decompressor();

        b.iter(|| decompressor.decompress(&compressed))
    });
    group.finish();

    let _ = std::hint::black_box(output_buf);
}

fn bench_backends(c: &mut Criterion) {
    let test_string = one_megabyte(b"Main Street Oak Avenue Station Road ");
    let table = SymbolTable::new(
        ["Main Str", "eet ", "Oak Aven", "ue ", "Station ", "Road "]
            .iter()
            .map(|symbol| Symbol::from_bytes(symbol.as_bytes()).unwrap())
            .collect(),
    )
    .unwrap();

    let mut group = c.benchmark_group("backends");
    group.throughput(Throughput::Bytes(test_string.len() as u64));
    for backend in Backend::ALL {
        let codec = Codec::new(&CodecConfig::default().with_backend(backend));
        let compressed = codec.encode(&test_string, &table);

        group.bench_function(format!("encode/{backend}"), |b| {
            b.iter(|| codec.encode(&test_string, &table))
        });
        group.bench_function(format!("decode/{backend}"), |b| {
            b.iter(|| codec.decode(&compressed, &table))
        });
    }
    group.finish();
}

criterion_group!(bench_micro, bench_compress, bench_backends);
criterion_main!(bench_micro);
