//! Authenticated encryption of a single secret string under a passphrase.
//!
//! Stored layout is three separate fields rather than one framed blob:
//! ```text
//! cipher = AES-256-GCM(key, iv, utf8(plaintext)) || 16-byte tag
//! iv     = 12 random bytes
//! salt   = 16 random bytes   (key = PBKDF2(passphrase, salt))
//! ```

use std::sync::Arc;

use aes_gcm::{aead::Aead, Nonce};
use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroize;

use crate::kdf::{derive_key_with_iterations, DerivedKey};
use crate::rng::{OsRandom, RandomSource};
use crate::{CryptoError, NONCE_SIZE, PBKDF2_ITERATIONS, SALT_SIZE};

/// Output of one encryption. Persist all three fields together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedSecret {
    pub cipher: Vec<u8>,
    pub iv: [u8; NONCE_SIZE],
    pub salt: [u8; SALT_SIZE],
}

/// Passphrase-based envelope with an injected randomness source.
#[derive(Clone)]
pub struct KeyCrypto {
    rng: Arc<dyn RandomSource>,
    iterations: u32,
}

impl Default for KeyCrypto {
    fn default() -> Self {
        Self::new(Arc::new(OsRandom))
    }
}

impl std::fmt::Debug for KeyCrypto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyCrypto")
            .field("iterations", &self.iterations)
            .finish_non_exhaustive()
    }
}

impl KeyCrypto {
    pub fn new(rng: Arc<dyn RandomSource>) -> Self {
        Self {
            rng,
            iterations: PBKDF2_ITERATIONS,
        }
    }

    /// Override the PBKDF2 round count. Only built for tests and with the
    /// `test-util` feature; release builds always use [`PBKDF2_ITERATIONS`].
    ///
    /// Records only decrypt under the round count they were encrypted with.
    #[cfg(any(test, feature = "test-util"))]
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        if iterations != PBKDF2_ITERATIONS {
            tracing::warn!(iterations, "KeyCrypto using non-standard PBKDF2 round count");
        }
        self.iterations = iterations.max(1);
        self
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn derive_key(&self, passphrase: &SecretString, salt: &[u8; SALT_SIZE]) -> DerivedKey {
        derive_key_with_iterations(passphrase, salt, self.iterations)
    }

    /// Encrypt `plaintext` under a key derived from `passphrase` and a fresh salt.
    ///
    /// Salt and IV are drawn independently on every call, so encrypting the
    /// same input twice yields unrelated outputs.
    pub fn encrypt(
        &self,
        plaintext: &SecretString,
        passphrase: &SecretString,
    ) -> Result<EncryptedSecret, CryptoError> {
        let mut salt = [0u8; SALT_SIZE];
        self.rng.fill(&mut salt)?;
        let mut iv = [0u8; NONCE_SIZE];
        self.rng.fill(&mut iv)?;

        let key = self.derive_key(passphrase, &salt);
        let cipher = key
            .cipher()
            .encrypt(
                Nonce::from_slice(&iv),
                plaintext.expose_secret().as_bytes(),
            )
            .map_err(|_| CryptoError::EncryptionFailed)?;

        Ok(EncryptedSecret { cipher, iv, salt })
    }

    /// Re-derive the key from `passphrase` + `salt` and authenticated-decrypt.
    ///
    /// Wrong passphrase, wrong salt/iv, malformed salt/iv lengths, tampered
    /// ciphertext and non-UTF-8 plaintext all return the same
    /// [`CryptoError::DecryptionFailed`].
    pub fn decrypt(
        &self,
        cipher: &[u8],
        iv: &[u8],
        salt: &[u8],
        passphrase: &SecretString,
    ) -> Result<SecretString, CryptoError> {
        let salt: &[u8; SALT_SIZE] = salt.try_into().map_err(|_| CryptoError::DecryptionFailed)?;
        if iv.len() != NONCE_SIZE {
            return Err(CryptoError::DecryptionFailed);
        }

        let key: DerivedKey = self.derive_key(passphrase, salt);
        let plaintext = key
            .cipher()
            .decrypt(Nonce::from_slice(iv), cipher)
            .map_err(|_| CryptoError::DecryptionFailed)?;

        match String::from_utf8(plaintext) {
            Ok(s) => Ok(SecretString::from(s)),
            Err(e) => {
                let mut bytes = e.into_bytes();
                bytes.zeroize();
                Err(CryptoError::DecryptionFailed)
            }
        }
    }
}
