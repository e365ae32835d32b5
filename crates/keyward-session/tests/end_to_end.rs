//! Full stack: JSON file store, real adapters against a mock provider,
//! canned passphrase answers.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use keyward_core::config::{HttpConfig, ProvidersConfig};
use keyward_core::{KeywardError, Provider};
use keyward_crypto::KeyCrypto;
use keyward_providers::{NoScraper, ProviderRegistry};
use keyward_session::{CredentialSession, ModelSource, PassphrasePrompter};
use keyward_store::JsonKeyStore;

const SECRET: &str = "sk-abc123";
const PASSPHRASE: &str = "hunter2";

struct Answers(Mutex<VecDeque<&'static str>>);

#[async_trait]
impl PassphrasePrompter for Answers {
    async fn ask(&self, _label: &str) -> Option<SecretString> {
        self.0.lock().unwrap().pop_front().map(SecretString::from)
    }
}

fn answers(list: &[&'static str]) -> Arc<Answers> {
    Arc::new(Answers(Mutex::new(list.iter().copied().collect())))
}

fn registry(base_url: &str) -> ProviderRegistry {
    let providers = ProvidersConfig {
        xai_base_url: base_url.to_string(),
        ..ProvidersConfig::default()
    };
    ProviderRegistry::from_config(&providers, &HttpConfig::default(), Arc::new(NoScraper)).unwrap()
}

#[tokio::test]
async fn add_verify_list_and_nothing_leaks_to_disk() {
    let mut server = mockito::Server::new_async().await;
    let auth = format!("Bearer {SECRET}");
    let verify = server
        .mock("GET", "/models")
        .match_header("authorization", auth.as_str())
        .with_status(200)
        .with_body(r#"{"data":[{"id":"grok-4"},{"id":"grok-3-mini"}]}"#)
        .expect(2)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    let store = Arc::new(JsonKeyStore::open(&path).unwrap());
    let session = CredentialSession::new(
        store,
        registry(&server.url()),
        answers(&[PASSPHRASE, PASSPHRASE, PASSPHRASE]),
    )
    .with_crypto(KeyCrypto::default().with_iterations(1_000));

    let id = session
        .add_key(Provider::Xai, "test", SecretString::from(SECRET))
        .await
        .unwrap();
    session.load_settings().await.unwrap();

    let verification = session.verify_key(id).await.unwrap();
    assert!(verification.ok);

    let listing = session.list_models(id).await.unwrap();
    assert_eq!(listing.source, ModelSource::Live);
    assert_eq!(listing.default_model(), Some("grok-4"));

    // Second listing is a cache hit: no prompt (the queue is empty) and no request
    let again = session.list_models(id).await.unwrap();
    assert_eq!(again.source, ModelSource::Cache);
    verify.assert_async().await;

    let on_disk = std::fs::read_to_string(&path).unwrap();
    assert!(!on_disk.contains(SECRET));
    assert!(!on_disk.contains(PASSPHRASE));
    assert!(on_disk.contains("grok-3-mini"));
    assert!(on_disk.contains("\"op\": \"verify\""));
}

#[tokio::test]
async fn rejected_key_is_reported_and_audited() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/models")
        .with_status(401)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonKeyStore::open(&dir.path().join("store.json")).unwrap());
    let session = CredentialSession::new(
        store,
        registry(&server.url()),
        answers(&[PASSPHRASE, PASSPHRASE]),
    )
    .with_crypto(KeyCrypto::default().with_iterations(1_000));

    let id = session
        .add_key(Provider::Xai, "revoked", SecretString::from(SECRET))
        .await
        .unwrap();
    let verification = session.verify_key(id).await.unwrap();
    assert!(!verification.ok);

    let logs = session.audit_log().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, 401);
}

#[tokio::test]
async fn provider_outage_is_an_error_not_a_rejection() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/models")
        .with_status(503)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonKeyStore::open(&dir.path().join("store.json")).unwrap());
    let session = CredentialSession::new(
        store,
        registry(&server.url()),
        answers(&[PASSPHRASE, PASSPHRASE]),
    )
    .with_crypto(KeyCrypto::default().with_iterations(1_000));

    let id = session
        .add_key(Provider::Xai, "test", SecretString::from(SECRET))
        .await
        .unwrap();
    let err = session.verify_key(id).await.unwrap_err();
    assert!(matches!(
        err,
        KeywardError::Transport {
            provider: Provider::Xai,
            status: Some(503),
            ..
        }
    ));

    let logs = session.audit_log().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, 503);
}

#[tokio::test]
async fn reopened_store_unlocks_with_same_passphrase_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    let crypto = KeyCrypto::default().with_iterations(1_000);

    let id = {
        let store = Arc::new(JsonKeyStore::open(&path).unwrap());
        let session = CredentialSession::new(store, ProviderRegistry::new(), answers(&[PASSPHRASE]))
            .with_crypto(crypto.clone());
        session
            .add_key(Provider::VeniceAi, "test", SecretString::from(SECRET))
            .await
            .unwrap()
    };

    let store = Arc::new(JsonKeyStore::open(&path).unwrap());
    let session = CredentialSession::new(store, ProviderRegistry::new(), answers(&[PASSPHRASE, "wrong"]))
        .with_crypto(crypto);

    let plain = session
        .with_secret(id, |s| async move { Ok(s.expose_secret().to_string()) })
        .await
        .unwrap();
    assert_eq!(plain, SECRET);

    let err = session
        .with_secret(id, |s| async move { Ok(s.expose_secret().len()) })
        .await
        .unwrap_err();
    assert!(matches!(err, KeywardError::DecryptionFailed));
}
