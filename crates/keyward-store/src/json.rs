//! JSON file backend.
//!
//! The whole record set lives in memory and every mutation is written
//! through with an atomic temp-file + rename, so a crash leaves either the
//! old or the new file, never a torn one. A mutation whose write fails is not
//! applied in memory either.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use keyward_core::{
    AppSettings, CachedModels, KeyId, LogEntry, NewLogEntry, NewStoredKey, Provider, StoredKey,
};

use crate::records::StoreData;
use crate::{KeyStore, StoreError, StoreResult};

pub struct JsonKeyStore {
    path: PathBuf,
    data: Mutex<StoreData>,
}

impl JsonKeyStore {
    /// Load or create a store at the given path.
    /// If the file doesn't exist, starts empty (the file is created on first write).
    pub fn open(path: &Path) -> StoreResult<Self> {
        let data = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
                context: format!("reading store: {}", path.display()),
                source,
            })?;
            serde_json::from_str(&content)?
        } else {
            StoreData::default()
        };

        tracing::debug!(path = %path.display(), "opened JSON key store");
        Ok(Self {
            path: path.to_path_buf(),
            data: Mutex::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn data(&self) -> MutexGuard<'_, StoreData> {
        self.data.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Apply `f` to a copy, persist the copy, then commit it.
    fn mutate<R>(&self, f: impl FnOnce(&mut StoreData) -> R) -> StoreResult<R> {
        let mut guard = self.data();
        let mut next = guard.clone();
        let out = f(&mut next);
        write_atomic(&self.path, &next)?;
        *guard = next;
        Ok(out)
    }
}

fn write_atomic(path: &Path, data: &StoreData) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                context: format!("creating store dir: {}", parent.display()),
                source,
            })?;
        }
    }

    let json = serde_json::to_vec_pretty(data)?;
    let tmp_path = path.with_extension("tmp");
    std::fs::write(&tmp_path, &json).map_err(|source| StoreError::Io {
        context: format!("writing store temp: {}", tmp_path.display()),
        source,
    })?;
    std::fs::rename(&tmp_path, path).map_err(|source| StoreError::Io {
        context: format!("renaming store: {}", path.display()),
        source,
    })?;
    Ok(())
}

impl KeyStore for JsonKeyStore {
    fn add_key(&self, key: NewStoredKey) -> StoreResult<KeyId> {
        let provider = key.provider;
        let id = self.mutate(|d| d.add_key(key))?;
        tracing::debug!(key_id = id, %provider, "stored encrypted key");
        Ok(id)
    }

    fn get_key(&self, id: KeyId) -> StoreResult<Option<StoredKey>> {
        Ok(self.data().get_key(id))
    }

    fn get_all_keys(&self) -> StoreResult<Vec<StoredKey>> {
        Ok(self.data().keys.clone())
    }

    fn delete_key(&self, id: KeyId) -> StoreResult<bool> {
        if self.data().get_key(id).is_none() {
            return Ok(false);
        }
        self.mutate(|d| d.delete_key(id))
    }

    fn get_cached_models(&self, provider: Provider) -> StoreResult<Option<CachedModels>> {
        Ok(self.data().get_cached_models(provider))
    }

    fn cache_models(&self, models: CachedModels) -> StoreResult<()> {
        self.mutate(|d| d.cache_models(models))
    }

    fn get_settings(&self) -> StoreResult<Option<AppSettings>> {
        Ok(self.data().get_settings())
    }

    fn save_settings(&self, settings: &AppSettings) -> StoreResult<()> {
        self.mutate(|d| d.save_settings(settings))
    }

    fn add_log(&self, entry: NewLogEntry) -> StoreResult<u64> {
        self.mutate(|d| d.add_log(entry))
    }

    fn get_logs(&self) -> StoreResult<Vec<LogEntry>> {
        Ok(self.data().logs.clone())
    }
}
