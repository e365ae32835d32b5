use std::path::Path;

use keyward_core::{
    AppSettings, CachedModels, KeyId, LogEntry, NewLogEntry, NewStoredKey, Provider, StoredKey,
};

use crate::json::JsonKeyStore;
use crate::memory::MemoryKeyStore;
#[cfg(feature = "rocksdb")]
use crate::rocks::RocksKeyStore;
use crate::{KeyStore, StoreResult};

/// Dispatch enum over the compiled-in backends.
///
/// Used by the CLI to select a backend at runtime from the configured path.
pub enum StoreBackend {
    Json(JsonKeyStore),
    Memory(MemoryKeyStore),
    #[cfg(feature = "rocksdb")]
    Rocks(RocksKeyStore),
}

impl StoreBackend {
    /// Open the appropriate backend based on path extension.
    ///
    /// Paths ending in `.json` use the JSON backend; otherwise RocksDB (if
    /// compiled with `rocksdb`). The literal path `:memory:` opens an
    /// ephemeral store.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if path.as_os_str() == ":memory:" {
            return Ok(StoreBackend::Memory(MemoryKeyStore::new()));
        }

        let is_json = path.extension().map(|ext| ext == "json").unwrap_or(false);

        #[cfg(feature = "rocksdb")]
        if !is_json {
            return Ok(StoreBackend::Rocks(RocksKeyStore::open(path)?));
        }

        #[cfg(not(feature = "rocksdb"))]
        if !is_json {
            tracing::warn!(
                path = %path.display(),
                "RocksDB not compiled in (missing 'rocksdb' feature), falling back to JSON backend"
            );
        }

        Ok(StoreBackend::Json(JsonKeyStore::open(path)?))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StoreBackend::Json(_) => "json",
            StoreBackend::Memory(_) => "memory",
            #[cfg(feature = "rocksdb")]
            StoreBackend::Rocks(_) => "rocksdb",
        }
    }

    fn inner(&self) -> &dyn KeyStore {
        match self {
            StoreBackend::Json(s) => s,
            StoreBackend::Memory(s) => s,
            #[cfg(feature = "rocksdb")]
            StoreBackend::Rocks(s) => s,
        }
    }
}

impl KeyStore for StoreBackend {
    fn add_key(&self, key: NewStoredKey) -> StoreResult<KeyId> {
        self.inner().add_key(key)
    }
    fn get_key(&self, id: KeyId) -> StoreResult<Option<StoredKey>> {
        self.inner().get_key(id)
    }
    fn get_all_keys(&self) -> StoreResult<Vec<StoredKey>> {
        self.inner().get_all_keys()
    }
    fn delete_key(&self, id: KeyId) -> StoreResult<bool> {
        self.inner().delete_key(id)
    }
    fn get_cached_models(&self, provider: Provider) -> StoreResult<Option<CachedModels>> {
        self.inner().get_cached_models(provider)
    }
    fn cache_models(&self, models: CachedModels) -> StoreResult<()> {
        self.inner().cache_models(models)
    }
    fn get_settings(&self) -> StoreResult<Option<AppSettings>> {
        self.inner().get_settings()
    }
    fn save_settings(&self, settings: &AppSettings) -> StoreResult<()> {
        self.inner().save_settings(settings)
    }
    fn add_log(&self, entry: NewLogEntry) -> StoreResult<u64> {
        self.inner().add_log(entry)
    }
    fn get_logs(&self) -> StoreResult<Vec<LogEntry>> {
        self.inner().get_logs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_extension_selects_json() {
        let dir = tempfile::tempdir().unwrap();
        let store = StoreBackend::open(&dir.path().join("store.json")).unwrap();
        assert_eq!(store.kind(), "json");
    }

    #[test]
    fn memory_marker_selects_memory() {
        let store = StoreBackend::open(Path::new(":memory:")).unwrap();
        assert_eq!(store.kind(), "memory");
    }

    #[cfg(not(feature = "rocksdb"))]
    #[test]
    fn non_json_falls_back_without_rocksdb() {
        let dir = tempfile::tempdir().unwrap();
        let store = StoreBackend::open(&dir.path().join("store.db")).unwrap();
        assert_eq!(store.kind(), "json");
    }

    #[cfg(feature = "rocksdb")]
    #[test]
    fn non_json_selects_rocksdb() {
        let dir = tempfile::tempdir().unwrap();
        let store = StoreBackend::open(&dir.path().join("store.db")).unwrap();
        assert_eq!(store.kind(), "rocksdb");
    }
}
