//! Ephemeral store: nothing survives the process.

use std::sync::{Mutex, MutexGuard};

use keyward_core::{
    AppSettings, CachedModels, KeyId, LogEntry, NewLogEntry, NewStoredKey, Provider, StoredKey,
};

use crate::records::StoreData;
use crate::{KeyStore, StoreResult};

#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    data: Mutex<StoreData>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn data(&self) -> MutexGuard<'_, StoreData> {
        self.data.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl KeyStore for MemoryKeyStore {
    fn add_key(&self, key: NewStoredKey) -> StoreResult<KeyId> {
        Ok(self.data().add_key(key))
    }

    fn get_key(&self, id: KeyId) -> StoreResult<Option<StoredKey>> {
        Ok(self.data().get_key(id))
    }

    fn get_all_keys(&self) -> StoreResult<Vec<StoredKey>> {
        Ok(self.data().keys.clone())
    }

    fn delete_key(&self, id: KeyId) -> StoreResult<bool> {
        Ok(self.data().delete_key(id))
    }

    fn get_cached_models(&self, provider: Provider) -> StoreResult<Option<CachedModels>> {
        Ok(self.data().get_cached_models(provider))
    }

    fn cache_models(&self, models: CachedModels) -> StoreResult<()> {
        self.data().cache_models(models);
        Ok(())
    }

    fn get_settings(&self) -> StoreResult<Option<AppSettings>> {
        Ok(self.data().get_settings())
    }

    fn save_settings(&self, settings: &AppSettings) -> StoreResult<()> {
        self.data().save_settings(settings);
        Ok(())
    }

    fn add_log(&self, entry: NewLogEntry) -> StoreResult<u64> {
        Ok(self.data().add_log(entry))
    }

    fn get_logs(&self) -> StoreResult<Vec<LogEntry>> {
        Ok(self.data().logs.clone())
    }
}
