use std::sync::Arc;

use keyward_crypto::{derive_key, KeyCrypto, OsRandom, SALT_SIZE};
use secrecy::SecretString;

#[divan::bench(sample_count = 10)]
fn bench_derive_key_production() {
    let passphrase = SecretString::from("correct horse battery staple");
    let salt = [7u8; SALT_SIZE];
    divan::black_box(derive_key(divan::black_box(&passphrase), divan::black_box(&salt)));
}

#[divan::bench(sample_count = 10)]
fn bench_encrypt_api_key(bencher: divan::Bencher) {
    let crypto = KeyCrypto::new(Arc::new(OsRandom));
    let plaintext = SecretString::from("sk-abc123-0123456789abcdef0123456789abcdef");
    let passphrase = SecretString::from("hunter2");
    bencher.bench(|| {
        crypto
            .encrypt(divan::black_box(&plaintext), divan::black_box(&passphrase))
            .unwrap()
    });
}

fn main() {
    divan::main();
}
