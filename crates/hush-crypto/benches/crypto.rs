use hush_crypto::{
    decode, encode, open_envelope, seal_envelope, KdfParams, MasterKey, MasterKeyHandle,
};

fn make_data(size: usize) -> Vec<u8> {
    (0..size)
        .map(|i| (i.wrapping_mul(7) ^ (i >> 3)) as u8)
        .collect()
}

fn master() -> MasterKeyHandle {
    MasterKeyHandle::current(MasterKey::from_bytes([0xABu8; 32]))
}

#[divan::bench(args = [1_000, 10_000, 100_000])]
fn bench_seal_iterations(bencher: divan::Bencher, iterations: u32) {
    let master = master();
    let params = KdfParams { iterations };
    let data = make_data(256);
    bencher.bench(|| {
        seal_envelope(
            divan::black_box(&master),
            divan::black_box(&data),
            &params,
        )
        .unwrap()
    });
}

#[divan::bench(args = [1024, 65536, 1048576])]
fn bench_open_envelope(bencher: divan::Bencher, size: usize) {
    let master = master();
    let params = KdfParams { iterations: 1_000 };
    let data = make_data(size);
    let envelope = seal_envelope(&master, &data, &params).unwrap();
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| {
            open_envelope(divan::black_box(&master), divan::black_box(&envelope), &params).unwrap()
        });
}

#[divan::bench(args = [1024, 1048576])]
fn bench_codec_roundtrip(bencher: divan::Bencher, size: usize) {
    let data = make_data(size);
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| decode(&encode(divan::black_box(&data))).unwrap());
}

fn main() {
    divan::main();
}
