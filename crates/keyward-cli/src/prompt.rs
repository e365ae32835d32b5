//! Terminal input for secrets. Nothing typed here is echoed.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use keyward_session::PassphrasePrompter;

/// Reads passphrases from the controlling terminal.
///
/// With `confirm`, the passphrase is asked twice and a mismatch counts as
/// a cancel.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter {
    pub confirm: bool,
}

impl TerminalPrompter {
    pub fn confirming() -> Self {
        Self { confirm: true }
    }
}

#[async_trait]
impl PassphrasePrompter for TerminalPrompter {
    async fn ask(&self, label: &str) -> Option<SecretString> {
        let prompt = format!("Passphrase for '{label}': ");
        let confirm = self.confirm;
        tokio::task::spawn_blocking(move || {
            let first = read_hidden(&prompt)?;
            if confirm {
                let second = read_hidden("Repeat passphrase: ")?;
                if first.expose_secret() != second.expose_secret() {
                    eprintln!("passphrases do not match");
                    return None;
                }
            }
            Some(first)
        })
        .await
        .ok()
        .flatten()
    }
}

/// One hidden line; empty input or a read error is `None`.
pub fn read_hidden(prompt: &str) -> Option<SecretString> {
    match rpassword::prompt_password(prompt) {
        Ok(s) if !s.is_empty() => Some(SecretString::from(s)),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!("terminal read failed: {e}");
            None
        }
    }
}
