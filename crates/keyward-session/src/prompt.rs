//! Capabilities the session borrows from its host: asking the user for a
//! passphrase, and telling the time.

use async_trait::async_trait;
use secrecy::SecretString;

/// Asks the user for the passphrase protecting one stored key.
///
/// `None` means the user declined. An empty answer must also be reported as
/// `None`.
#[async_trait]
pub trait PassphrasePrompter: Send + Sync {
    async fn ask(&self, label: &str) -> Option<SecretString>;
}

/// Wall clock in Unix milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        keyward_core::now_millis()
    }
}
