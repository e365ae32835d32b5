use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use keyward_core::{
    AppSettings, CachedModels, KeyId, KeywardError, KeywardResult, LogEntry, NewLogEntry,
    NewStoredKey, Provider, StoredKey,
};
use keyward_crypto::KeyCrypto;
use keyward_providers::{ProviderAdapter, ProviderRegistry, Verification};
use keyward_store::{KeyStore, StoreResult};

use crate::prompt::{Clock, PassphrasePrompter, SystemClock};

const DEFAULT_MODELS_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Where a model listing came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelSource {
    /// Fresh cache entry; no prompt, no network.
    Cache,
    /// Fetched from the provider just now and written back to the cache.
    Live,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelListing {
    pub models: CachedModels,
    pub source: ModelSource,
}

impl ModelListing {
    /// First listed model, offered as the default choice.
    pub fn default_model(&self) -> Option<&str> {
        self.models.list.first().map(String::as_str)
    }
}

pub struct CredentialSession {
    store: Arc<dyn KeyStore>,
    crypto: KeyCrypto,
    registry: ProviderRegistry,
    prompter: Arc<dyn PassphrasePrompter>,
    clock: Arc<dyn Clock>,
    models_ttl: Duration,
}

impl CredentialSession {
    pub fn new(
        store: Arc<dyn KeyStore>,
        registry: ProviderRegistry,
        prompter: Arc<dyn PassphrasePrompter>,
    ) -> Self {
        Self {
            store,
            crypto: KeyCrypto::default(),
            registry,
            prompter,
            clock: Arc::new(SystemClock),
            models_ttl: DEFAULT_MODELS_TTL,
        }
    }

    pub fn with_crypto(mut self, crypto: KeyCrypto) -> Self {
        self.crypto = crypto;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_models_ttl(mut self, ttl: Duration) -> Self {
        self.models_ttl = ttl;
        self
    }

    pub fn store(&self) -> Arc<dyn KeyStore> {
        Arc::clone(&self.store)
    }

    // ── Keys ────────────────────────────────────────────────────────────

    /// Encrypt `secret` under a freshly prompted passphrase and persist it.
    pub async fn add_key(
        &self,
        provider: Provider,
        label: &str,
        secret: SecretString,
    ) -> KeywardResult<KeyId> {
        let passphrase = self.ask(label).await?;

        let crypto = self.crypto.clone();
        let encrypted = tokio::task::spawn_blocking(move || crypto.encrypt(&secret, &passphrase))
            .await
            .map_err(|e| KeywardError::Other(anyhow::Error::new(e)))??;

        let record = NewStoredKey {
            provider,
            label: label.to_string(),
            enc_key: encrypted.cipher,
            iv: encrypted.iv.to_vec(),
            salt: encrypted.salt.to_vec(),
            created_at: self.clock.now_millis(),
        };
        let id = self.write(move |store| store.add_key(record)).await?;
        tracing::info!(key_id = id, %provider, "added key");
        Ok(id)
    }

    /// All stored records, oldest first.
    pub fn keys(&self) -> KeywardResult<Vec<StoredKey>> {
        let mut keys = self.store.get_all_keys()?;
        keys.sort_by_key(|k| k.id);
        Ok(keys)
    }

    pub fn key(&self, id: KeyId) -> KeywardResult<StoredKey> {
        self.store.get_key(id)?.ok_or(KeywardError::KeyNotFound(id))
    }

    /// Remove a record entirely. Returns whether it existed.
    pub async fn delete_key(&self, id: KeyId) -> KeywardResult<bool> {
        let existed = self.write(move |store| store.delete_key(id)).await?;
        if existed {
            tracing::info!(key_id = id, "deleted key");
        }
        Ok(existed)
    }

    /// Decrypt key `id` and pass the plaintext, by value, to `use_secret`.
    ///
    /// The plaintext is dropped when the returned future completes.
    pub async fn with_secret<T, F, Fut>(&self, id: KeyId, use_secret: F) -> KeywardResult<T>
    where
        F: FnOnce(SecretString) -> Fut,
        Fut: Future<Output = KeywardResult<T>>,
    {
        let record = self.key(id)?;
        let secret = self.unlock(&record).await?;
        use_secret(secret).await
    }

    // ── Provider operations ─────────────────────────────────────────────

    /// Ask the provider whether it accepts key `id`. A rejected key is
    /// `Ok` with `ok: false`.
    pub async fn verify_key(&self, id: KeyId) -> KeywardResult<Verification> {
        let record = self.key(id)?;
        let provider = record.provider;
        let adapter = self.adapter(provider)?;
        let secret = self.unlock(&record).await?;

        let result = adapter
            .verify(&secret)
            .await
            .map_err(|e| e.into_keyward(provider));
        drop(secret);

        let status = match &result {
            Ok(v) => v.status,
            Err(e) => e.audit_status(),
        };
        self.audit(provider, "verify", status).await;
        if let Ok(v) = &result {
            tracing::info!(key_id = id, %provider, ok = v.ok, status = v.status, "verified key");
        }
        result
    }

    /// Models for key `id`'s provider, served from cache while fresh.
    pub async fn list_models(&self, id: KeyId) -> KeywardResult<ModelListing> {
        self.models_for(id, false).await
    }

    /// Models for key `id`'s provider, always fetched live.
    pub async fn refresh_models(&self, id: KeyId) -> KeywardResult<ModelListing> {
        self.models_for(id, true).await
    }

    /// Whatever is cached for `provider`, fresh or not. Never prompts.
    pub fn cached_models(&self, provider: Provider) -> KeywardResult<Option<CachedModels>> {
        Ok(self.store.get_cached_models(provider)?)
    }

    async fn models_for(&self, id: KeyId, force: bool) -> KeywardResult<ModelListing> {
        let record = self.key(id)?;
        let provider = record.provider;

        if !force {
            if let Some(cached) = self.store.get_cached_models(provider)? {
                if cached.is_fresh(self.clock.now_millis(), self.models_ttl) {
                    tracing::debug!(%provider, "model list cache hit");
                    return Ok(ModelListing {
                        models: cached,
                        source: ModelSource::Cache,
                    });
                }
                tracing::debug!(%provider, "model list cache stale");
            }
        }

        let adapter = self.adapter(provider)?;
        let secret = self.unlock(&record).await?;
        let result = adapter
            .list_models(&secret)
            .await
            .map_err(|e| e.into_keyward(provider));
        drop(secret);

        let status = match &result {
            Ok(_) => 200,
            Err(e) => e.audit_status(),
        };
        self.audit(provider, "list_models", status).await;

        let models = CachedModels {
            provider,
            list: result?,
            fetched_at: self.clock.now_millis(),
        };
        let cached = models.clone();
        self.write(move |store| store.cache_models(cached)).await?;
        tracing::info!(%provider, count = models.list.len(), "refreshed model list");
        Ok(ModelListing {
            models,
            source: ModelSource::Live,
        })
    }

    // ── Settings / audit ────────────────────────────────────────────────

    /// The settings singleton, written with defaults on first use.
    pub async fn load_settings(&self) -> KeywardResult<AppSettings> {
        if let Some(settings) = self.store.get_settings()? {
            return Ok(settings);
        }
        let settings = AppSettings::default();
        self.save_settings(&settings).await?;
        tracing::debug!("bootstrapped default settings");
        Ok(settings)
    }

    pub async fn save_settings(&self, settings: &AppSettings) -> KeywardResult<()> {
        let settings = settings.clone();
        self.write(move |store| store.save_settings(&settings)).await
    }

    pub fn audit_log(&self) -> KeywardResult<Vec<LogEntry>> {
        Ok(self.store.get_logs()?)
    }

    // ── internals ───────────────────────────────────────────────────────

    fn adapter(&self, provider: Provider) -> KeywardResult<Arc<dyn ProviderAdapter>> {
        self.registry
            .get(provider)
            .ok_or(KeywardError::NoAdapter(provider))
    }

    async fn ask(&self, label: &str) -> KeywardResult<SecretString> {
        match self.prompter.ask(label).await {
            Some(p) if !p.expose_secret().is_empty() => Ok(p),
            _ => {
                tracing::info!(label, "passphrase prompt declined");
                Err(KeywardError::PassphraseRequired)
            }
        }
    }

    /// Prompt, then decrypt `record` on the blocking pool.
    async fn unlock(&self, record: &StoredKey) -> KeywardResult<SecretString> {
        let passphrase = self.ask(&record.label).await?;

        let crypto = self.crypto.clone();
        let cipher = record.enc_key.clone();
        let iv = record.iv.clone();
        let salt = record.salt.clone();
        let result =
            tokio::task::spawn_blocking(move || crypto.decrypt(&cipher, &iv, &salt, &passphrase))
                .await
                .map_err(|e| KeywardError::Other(anyhow::Error::new(e)))?;

        result.map_err(|e| {
            tracing::warn!(key_id = record.id, "could not unlock key");
            KeywardError::from(e)
        })
    }

    /// Run a store mutation on the blocking pool. File-backed stores rewrite
    /// and rename on every write.
    async fn write<T, F>(&self, op: F) -> KeywardResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn KeyStore) -> StoreResult<T> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let result = tokio::task::spawn_blocking(move || op(store.as_ref()))
            .await
            .map_err(|e| KeywardError::Other(anyhow::Error::new(e)))?;
        Ok(result?)
    }

    /// Append an audit entry. Failures are logged, never surfaced.
    async fn audit(&self, provider: Provider, op: &str, status: u16) {
        let entry = NewLogEntry {
            at: self.clock.now_millis(),
            provider,
            op: op.to_string(),
            status,
            tokens: None,
        };
        if let Err(e) = self.write(move |store| store.add_log(entry)).await {
            tracing::warn!(%provider, op, "audit log write failed: {e}");
        }
    }
}
