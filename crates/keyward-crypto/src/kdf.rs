//! Key derivation: PBKDF2-HMAC-SHA256 passphrase → AES-256-GCM key

use aes_gcm::{aead::KeyInit, Aes256Gcm};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use zeroize::Zeroize;

use crate::{KEY_SIZE, PBKDF2_ITERATIONS, SALT_SIZE};

/// A 256-bit key derived from a passphrase.
///
/// The raw bytes never leave this crate: the only thing a caller can do with
/// a `DerivedKey` is hand it back to the envelope for AEAD. Zeroized on drop.
pub struct DerivedKey {
    bytes: [u8; KEY_SIZE],
}

impl DerivedKey {
    pub(crate) fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new((&self.bytes).into())
    }

    #[cfg(test)]
    pub(crate) fn bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for DerivedKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Derive the record key from a passphrase and the record's salt.
///
/// Deterministic in (passphrase, salt) and deliberately slow: expect hundreds
/// of milliseconds per call.
pub fn derive_key(passphrase: &SecretString, salt: &[u8; SALT_SIZE]) -> DerivedKey {
    derive_key_with_iterations(passphrase, salt, PBKDF2_ITERATIONS)
}

pub(crate) fn derive_key_with_iterations(
    passphrase: &SecretString,
    salt: &[u8; SALT_SIZE],
    iterations: u32,
) -> DerivedKey {
    let mut bytes = [0u8; KEY_SIZE];
    pbkdf2::pbkdf2_hmac::<Sha256>(
        passphrase.expose_secret().as_bytes(),
        salt,
        iterations,
        &mut bytes,
    );
    DerivedKey { bytes }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Use fast params for testing
    const FAST: u32 = 1_000;

    #[test]
    fn test_kdf_deterministic() {
        let passphrase = SecretString::from("test-passphrase-123");
        let salt = [1u8; SALT_SIZE];

        let key1 = derive_key_with_iterations(&passphrase, &salt, FAST);
        let key2 = derive_key_with_iterations(&passphrase, &salt, FAST);

        assert_eq!(key1.bytes(), key2.bytes(), "KDF must be deterministic");
    }

    #[test]
    fn test_kdf_different_passphrases() {
        let salt = [1u8; SALT_SIZE];

        let key1 = derive_key_with_iterations(&SecretString::from("passphrase-a"), &salt, FAST);
        let key2 = derive_key_with_iterations(&SecretString::from("passphrase-b"), &salt, FAST);

        assert_ne!(key1.bytes(), key2.bytes());
    }

    #[test]
    fn test_kdf_different_salts() {
        let passphrase = SecretString::from("same-passphrase");

        let key1 = derive_key_with_iterations(&passphrase, &[1u8; SALT_SIZE], FAST);
        let key2 = derive_key_with_iterations(&passphrase, &[2u8; SALT_SIZE], FAST);

        assert_ne!(key1.bytes(), key2.bytes());
    }

    #[test]
    fn test_production_rounds_deterministic() {
        let passphrase = SecretString::from("hunter2");
        let salt = [9u8; SALT_SIZE];
        let key1 = derive_key(&passphrase, &salt);
        let key2 = derive_key(&passphrase, &salt);
        assert_eq!(key1.bytes(), key2.bytes());
    }

    #[test]
    fn test_debug_redacts() {
        let key = derive_key_with_iterations(&SecretString::from("x"), &[0u8; SALT_SIZE], FAST);
        let shown = format!("{key:?}");
        assert!(shown.contains("REDACTED"));
    }
}
