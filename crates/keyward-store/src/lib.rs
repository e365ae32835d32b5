//! keyward-store: durable records for the credential core
//!
//! Four collections, none of which ever hold plaintext secrets:
//!   - `keys`     : encrypted `StoredKey` records (id assigned here, never reused)
//!   - `models`   : `CachedModels`, one per provider, overwritten wholesale
//!   - `settings` : the `AppSettings` singleton, whole-object last-write-wins
//!   - `logs`     : append-only audit entries
//!
//! Backends: JSON file (default), in-memory, RocksDB (`rocksdb` feature).
//! The store performs no retries; failures surface as `StoreError`.

pub mod backend;
pub mod debounce;
pub mod json;
pub mod memory;
mod records;
#[cfg(feature = "rocksdb")]
pub mod rocks;

pub use backend::StoreBackend;
pub use debounce::SettingsDebouncer;
pub use json::JsonKeyStore;
pub use memory::MemoryKeyStore;
#[cfg(feature = "rocksdb")]
pub use rocks::RocksKeyStore;

use keyward_core::{
    AppSettings, CachedModels, KeyId, KeywardError, LogEntry, NewLogEntry, NewStoredKey, Provider,
    StoredKey,
};

/// Fixed identity of the settings singleton.
pub const SETTINGS_ID: u8 = 1;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serializing records: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("store backend: {0}")]
    Backend(String),
}

impl From<StoreError> for KeywardError {
    fn from(err: StoreError) -> Self {
        KeywardError::Storage(err.to_string())
    }
}

/// CRUD over already-encrypted records. Implementations never inspect
/// `enc_key` contents and know nothing about cryptography.
pub trait KeyStore: Send + Sync {
    /// Persist a new record and return its freshly assigned id.
    fn add_key(&self, key: NewStoredKey) -> StoreResult<KeyId>;
    fn get_key(&self, id: KeyId) -> StoreResult<Option<StoredKey>>;
    /// All records; order carries no meaning.
    fn get_all_keys(&self) -> StoreResult<Vec<StoredKey>>;
    /// Remove a record entirely. Returns whether it existed.
    fn delete_key(&self, id: KeyId) -> StoreResult<bool>;

    fn get_cached_models(&self, provider: Provider) -> StoreResult<Option<CachedModels>>;
    /// Upsert keyed by provider; replaces any previous entry in full.
    fn cache_models(&self, models: CachedModels) -> StoreResult<()>;

    fn get_settings(&self) -> StoreResult<Option<AppSettings>>;
    /// Whole-object replace of the singleton.
    fn save_settings(&self, settings: &AppSettings) -> StoreResult<()>;

    /// Append an audit entry and return its id.
    fn add_log(&self, entry: NewLogEntry) -> StoreResult<u64>;
    /// Audit entries in insertion order (for inspection tools, not the core).
    fn get_logs(&self) -> StoreResult<Vec<LogEntry>>;
}
