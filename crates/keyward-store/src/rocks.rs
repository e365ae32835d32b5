//! RocksDB backend.
//!
//! Records are JSON values under prefixed keys:
//!
//! ```text
//! key/{id:020}       StoredKey
//! models/{slug}      CachedModels
//! settings/1         SettingsRecord
//! log/{id:020}       LogEntry
//! meta/next_key_id   u64 (big endian)
//! meta/next_log_id   u64 (big endian)
//! ```
//!
//! Zero-padded ids keep prefix iteration in id order. Writes go straight to
//! the DB; new records and their counter bump land in one `WriteBatch`.

use std::path::Path;
use std::sync::Mutex;

use rocksdb::{Direction, IteratorMode, Options, WriteBatch, DB};
use serde::de::DeserializeOwned;
use serde::Serialize;

use keyward_core::{
    AppSettings, CachedModels, KeyId, LogEntry, NewLogEntry, NewStoredKey, Provider, StoredKey,
};

use crate::records::SettingsRecord;
use crate::{KeyStore, StoreError, StoreResult, SETTINGS_ID};

const NEXT_KEY_ID: &[u8] = b"meta/next_key_id";
const NEXT_LOG_ID: &[u8] = b"meta/next_log_id";

fn key_key(id: KeyId) -> String {
    format!("key/{id:020}")
}

fn models_key(provider: Provider) -> String {
    format!("models/{}", provider.slug())
}

fn settings_key() -> String {
    format!("settings/{SETTINGS_ID}")
}

fn log_key(id: u64) -> String {
    format!("log/{id:020}")
}

fn backend_err(e: rocksdb::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

pub struct RocksKeyStore {
    db: DB,
    /// Serializes id allocation; reads don't take it.
    alloc: Mutex<()>,
}

impl RocksKeyStore {
    /// Open or create a RocksDB store at the given directory.
    pub fn open(db_path: &Path) -> StoreResult<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);

        let db = DB::open(&opts, db_path).map_err(|e| {
            StoreError::Backend(format!("opening RocksDB {}: {e}", db_path.display()))
        })?;

        tracing::debug!(path = %db_path.display(), "opened RocksDB key store");
        Ok(Self {
            db,
            alloc: Mutex::new(()),
        })
    }

    fn get_json<T: DeserializeOwned>(&self, key: &[u8]) -> StoreResult<Option<T>> {
        match self.db.get(key).map_err(backend_err)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put_json<T: Serialize>(&self, key: &[u8], value: &T) -> StoreResult<()> {
        let json = serde_json::to_vec(value)?;
        self.db.put(key, json).map_err(backend_err)
    }

    fn scan<T: DeserializeOwned>(&self, prefix: &str) -> StoreResult<Vec<T>> {
        let mut out = Vec::new();
        let iter = self
            .db
            .iterator(IteratorMode::From(prefix.as_bytes(), Direction::Forward));
        for item in iter {
            let (key, value) = item.map_err(backend_err)?;
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }
            out.push(serde_json::from_slice(&value)?);
        }
        Ok(out)
    }

    fn read_counter(&self, name: &[u8]) -> StoreResult<u64> {
        match self.db.get(name).map_err(backend_err)? {
            Some(bytes) => {
                let arr: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    StoreError::Backend(format!(
                        "corrupt counter {}",
                        String::from_utf8_lossy(name)
                    ))
                })?;
                Ok(u64::from_be_bytes(arr))
            }
            None => Ok(1),
        }
    }

    /// Insert `value` under a freshly allocated id and bump the counter atomically.
    fn append<T: Serialize>(
        &self,
        counter: &[u8],
        key_for: impl Fn(u64) -> String,
        build: impl FnOnce(u64) -> T,
    ) -> StoreResult<u64> {
        let _guard = self.alloc.lock().unwrap_or_else(|p| p.into_inner());
        let id = self.read_counter(counter)?;
        let value = build(id);

        let mut batch = WriteBatch::default();
        batch.put(key_for(id).as_bytes(), serde_json::to_vec(&value)?);
        batch.put(counter, (id + 1).to_be_bytes());
        self.db.write(batch).map_err(backend_err)?;
        Ok(id)
    }
}

impl KeyStore for RocksKeyStore {
    fn add_key(&self, key: NewStoredKey) -> StoreResult<KeyId> {
        let provider = key.provider;
        let id = self.append(NEXT_KEY_ID, key_key, |id| key.with_id(id))?;
        tracing::debug!(key_id = id, %provider, "stored encrypted key");
        Ok(id)
    }

    fn get_key(&self, id: KeyId) -> StoreResult<Option<StoredKey>> {
        self.get_json(key_key(id).as_bytes())
    }

    fn get_all_keys(&self) -> StoreResult<Vec<StoredKey>> {
        self.scan("key/")
    }

    fn delete_key(&self, id: KeyId) -> StoreResult<bool> {
        let key = key_key(id);
        let existed = self.db.get(key.as_bytes()).map_err(backend_err)?.is_some();
        if existed {
            self.db.delete(key.as_bytes()).map_err(backend_err)?;
        }
        Ok(existed)
    }

    fn get_cached_models(&self, provider: Provider) -> StoreResult<Option<CachedModels>> {
        self.get_json(models_key(provider).as_bytes())
    }

    fn cache_models(&self, models: CachedModels) -> StoreResult<()> {
        self.put_json(models_key(models.provider).as_bytes(), &models)
    }

    fn get_settings(&self) -> StoreResult<Option<AppSettings>> {
        let record: Option<SettingsRecord> = self.get_json(settings_key().as_bytes())?;
        Ok(record.map(|r| r.settings))
    }

    fn save_settings(&self, settings: &AppSettings) -> StoreResult<()> {
        let record = SettingsRecord {
            id: SETTINGS_ID,
            settings: settings.clone(),
        };
        self.put_json(settings_key().as_bytes(), &record)
    }

    fn add_log(&self, entry: NewLogEntry) -> StoreResult<u64> {
        self.append(NEXT_LOG_ID, log_key, |id| entry.with_id(id))
    }

    fn get_logs(&self) -> StoreResult<Vec<LogEntry>> {
        self.scan("log/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_key(label: &str) -> NewStoredKey {
        NewStoredKey {
            provider: Provider::Gemini,
            label: label.into(),
            enc_key: vec![9; 24],
            iv: vec![1; 12],
            salt: vec![2; 16],
            created_at: 1,
        }
    }

    #[test]
    fn ids_survive_reopen_and_are_not_reused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.db");

        let last = {
            let store = RocksKeyStore::open(&path).unwrap();
            let a = store.add_key(new_key("a")).unwrap();
            let b = store.add_key(new_key("b")).unwrap();
            assert!(store.delete_key(b).unwrap());
            assert!(b > a);
            b
        };

        let store = RocksKeyStore::open(&path).unwrap();
        let c = store.add_key(new_key("c")).unwrap();
        assert!(c > last);
        let labels: Vec<String> = store
            .get_all_keys()
            .unwrap()
            .into_iter()
            .map(|k| k.label)
            .collect();
        assert_eq!(labels, vec!["a", "c"]);
    }

    #[test]
    fn prefix_scan_does_not_bleed() {
        let dir = tempfile::tempdir().unwrap();
        let store = RocksKeyStore::open(&dir.path().join("store.db")).unwrap();
        store.add_key(new_key("only")).unwrap();
        store
            .add_log(NewLogEntry {
                at: 5,
                provider: Provider::Gemini,
                op: "verify".into(),
                status: 200,
                tokens: None,
            })
            .unwrap();
        store.save_settings(&AppSettings::default()).unwrap();

        assert_eq!(store.get_all_keys().unwrap().len(), 1);
        assert_eq!(store.get_logs().unwrap().len(), 1);
    }
}
