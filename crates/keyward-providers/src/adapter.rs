//! The two-capability adapter interface and the documentation-scrape hook.

use std::collections::HashSet;

use async_trait::async_trait;
use secrecy::SecretString;

use keyward_core::Provider;

use crate::error::{AdapterError, AdapterResult};

/// Statuses that mean the provider refused the key itself.
pub const AUTH_REJECTED: &[u16] = &[401, 403];

/// Result of a key verification call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verification {
    /// The provider accepted the key.
    pub ok: bool,
    /// HTTP status of the verification request.
    pub status: u16,
}

impl Verification {
    /// Classify a verification response: 2xx accepts the key, an
    /// [`AUTH_REJECTED`] status rejects it, and anything else is a transport
    /// failure unrelated to the key.
    pub fn from_status(status: reqwest::StatusCode, what: &str) -> AdapterResult<Self> {
        Self::classify(status, AUTH_REJECTED, what)
    }

    /// Like [`Verification::from_status`] with a provider-specific set of
    /// rejection statuses.
    pub fn classify(
        status: reqwest::StatusCode,
        rejected: &[u16],
        what: &str,
    ) -> AdapterResult<Self> {
        let code = status.as_u16();
        if status.is_success() {
            Ok(Self { ok: true, status: code })
        } else if rejected.contains(&code) {
            Ok(Self { ok: false, status: code })
        } else {
            Err(AdapterError::http_status(
                code,
                format!("{what} responded with {status}"),
            ))
        }
    }
}

/// One implementation per external provider.
///
/// Both methods take a decrypted key that the caller drops as soon as the
/// call returns; implementations must not retain it.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn provider(&self) -> Provider;

    /// Minimal authenticated call confirming the key is accepted.
    /// A rejected key is `Ok(Verification { ok: false, .. })`.
    async fn verify(&self, key: &SecretString) -> AdapterResult<Verification>;

    /// Model identifiers, deduplicated, in the order the provider lists them.
    async fn list_models(&self, key: &SecretString) -> AdapterResult<Vec<String>>;
}

/// Secondary model discovery from documentation pages, for providers
/// without a stable listing endpoint.
#[async_trait]
pub trait ModelListScraper: Send + Sync {
    async fn scrape(&self, urls: &[String]) -> AdapterResult<Vec<String>>;
}

/// Drop empty and repeated ids, keeping first-seen order.
pub fn dedup_preserving_order<I, S>(ids: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = HashSet::new();
    ids.into_iter()
        .map(Into::into)
        .map(|s: String| s.trim().to_string())
        .filter(|s| !s.is_empty() && seen.insert(s.clone()))
        .collect()
}
