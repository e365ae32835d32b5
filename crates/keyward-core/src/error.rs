use thiserror::Error;

use crate::types::{KeyId, Provider};

pub type KeywardResult<T> = Result<T, KeywardError>;

/// Failures surfaced at the boundary of one user-initiated operation.
///
/// No variant ever carries a plaintext key or passphrase.
#[derive(Debug, Error)]
pub enum KeywardError {
    /// Wrong passphrase, tampered ciphertext, or mismatched salt/iv.
    /// Deliberately indistinguishable.
    #[error("could not unlock key")]
    DecryptionFailed,

    #[error("passphrase required")]
    PassphraseRequired,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("{provider} request failed{}: {message}", fmt_status(.status))]
    Transport {
        provider: Provider,
        status: Option<u16>,
        message: String,
    },

    #[error("unexpected response from {provider}: {detail}")]
    UnexpectedResponseShape { provider: Provider, detail: String },

    #[error("stored key {0} not found")]
    KeyNotFound(KeyId),

    #[error("no adapter registered for {0}")]
    NoAdapter(Provider),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn fmt_status(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

impl KeywardError {
    /// HTTP-ish status recorded in the audit log for a failed operation.
    pub fn audit_status(&self) -> u16 {
        match self {
            KeywardError::Transport { status, .. } => status.unwrap_or(0),
            KeywardError::UnexpectedResponseShape { .. } => 502,
            _ => 0,
        }
    }

    /// True for outcomes the user chose (cancelled prompt) rather than failures.
    pub fn is_user_cancelled(&self) -> bool {
        matches!(self, KeywardError::PassphraseRequired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decryption_failed_is_generic() {
        assert_eq!(KeywardError::DecryptionFailed.to_string(), "could not unlock key");
    }

    #[test]
    fn transport_display_includes_status() {
        let err = KeywardError::Transport {
            provider: Provider::Xai,
            status: Some(503),
            message: "xAI /v1/models responded with 503".into(),
        };
        assert_eq!(
            err.to_string(),
            "xAI request failed (HTTP 503): xAI /v1/models responded with 503"
        );
        assert_eq!(err.audit_status(), 503);
    }

    #[test]
    fn transport_display_without_status() {
        let err = KeywardError::Transport {
            provider: Provider::VeniceAi,
            status: None,
            message: "connection refused".into(),
        };
        assert_eq!(err.to_string(), "Venice.ai request failed: connection refused");
        assert_eq!(err.audit_status(), 0);
    }

    #[test]
    fn only_passphrase_required_is_cancellation() {
        assert!(KeywardError::PassphraseRequired.is_user_cancelled());
        assert!(!KeywardError::DecryptionFailed.is_user_cancelled());
    }
}
