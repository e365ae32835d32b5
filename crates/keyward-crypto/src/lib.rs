//! keyward-crypto: passphrase envelope for third-party API keys
//!
//! ```text
//! passphrase ──PBKDF2-HMAC-SHA256 (250 000 rounds, 16-byte random salt)──▶ 256-bit key
//! key + 12-byte random nonce ──AES-256-GCM──▶ ciphertext || 16-byte tag
//! ```
//!
//! Every encryption draws a fresh salt and a fresh nonce, so a nonce never
//! repeats under the same derived key. The derived key cannot be read back
//! out of [`DerivedKey`]; it only exists to drive the AEAD.

pub mod envelope;
pub mod kdf;
pub mod rng;

pub use envelope::{EncryptedSecret, KeyCrypto};
pub use kdf::{derive_key, DerivedKey};
pub use rng::{OsRandom, RandomSource, SeededRandom};

/// Size of the derived symmetric key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of an AES-GCM nonce (96-bit)
pub const NONCE_SIZE: usize = 12;

/// Size of the per-record PBKDF2 salt
pub const SALT_SIZE: usize = 16;

/// Size of the GCM authentication tag
pub const TAG_SIZE: usize = 16;

/// PBKDF2 round count for every stored record
pub const PBKDF2_ITERATIONS: u32 = 250_000;

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// Every authenticated-decrypt failure collapses into this one variant.
    #[error("decryption failed")]
    DecryptionFailed,

    #[error("encryption failed")]
    EncryptionFailed,

    #[error("random source failed: {0}")]
    Rng(String),
}

impl From<CryptoError> for keyward_core::KeywardError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::DecryptionFailed => keyward_core::KeywardError::DecryptionFailed,
            other => keyward_core::KeywardError::Other(anyhow::Error::new(other)),
        }
    }
}
