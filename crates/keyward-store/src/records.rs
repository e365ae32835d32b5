//! In-memory record set shared by the memory and JSON backends.

use serde::{Deserialize, Serialize};

use keyward_core::{
    AppSettings, CachedModels, KeyId, LogEntry, NewLogEntry, NewStoredKey, Provider, StoredKey,
};

use crate::SETTINGS_ID;

/// The settings singleton as persisted: `{ id: 1, rateLimits, allowlist }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SettingsRecord {
    pub id: u8,
    #[serde(flatten)]
    pub settings: AppSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StoreData {
    pub next_key_id: KeyId,
    pub next_log_id: u64,
    pub keys: Vec<StoredKey>,
    pub models: Vec<CachedModels>,
    pub settings: Option<SettingsRecord>,
    pub logs: Vec<LogEntry>,
}

impl Default for StoreData {
    fn default() -> Self {
        Self {
            next_key_id: 1,
            next_log_id: 1,
            keys: Vec::new(),
            models: Vec::new(),
            settings: None,
            logs: Vec::new(),
        }
    }
}

impl StoreData {
    pub fn add_key(&mut self, key: NewStoredKey) -> KeyId {
        // Never hand out an id at or below one already present, even if the
        // counter was lost from a hand-edited file.
        let max_existing = self.keys.iter().map(|k| k.id).max().unwrap_or(0);
        let id = self.next_key_id.max(max_existing + 1);
        self.next_key_id = id + 1;
        self.keys.push(key.with_id(id));
        id
    }

    pub fn get_key(&self, id: KeyId) -> Option<StoredKey> {
        self.keys.iter().find(|k| k.id == id).cloned()
    }

    pub fn delete_key(&mut self, id: KeyId) -> bool {
        let before = self.keys.len();
        self.keys.retain(|k| k.id != id);
        before != self.keys.len()
    }

    pub fn get_cached_models(&self, provider: Provider) -> Option<CachedModels> {
        self.models.iter().find(|m| m.provider == provider).cloned()
    }

    pub fn cache_models(&mut self, models: CachedModels) {
        match self.models.iter_mut().find(|m| m.provider == models.provider) {
            Some(existing) => *existing = models,
            None => self.models.push(models),
        }
    }

    pub fn get_settings(&self) -> Option<AppSettings> {
        self.settings.as_ref().map(|r| r.settings.clone())
    }

    pub fn save_settings(&mut self, settings: &AppSettings) {
        self.settings = Some(SettingsRecord {
            id: SETTINGS_ID,
            settings: settings.clone(),
        });
    }

    pub fn add_log(&mut self, entry: NewLogEntry) -> u64 {
        let id = self.next_log_id;
        self.next_log_id += 1;
        self.logs.push(entry.with_id(id));
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_key(label: &str) -> NewStoredKey {
        NewStoredKey {
            provider: Provider::Xai,
            label: label.into(),
            enc_key: vec![1, 2, 3],
            iv: vec![0; 12],
            salt: vec![0; 16],
            created_at: 0,
        }
    }

    #[test]
    fn ids_are_monotonic_and_not_reused() {
        let mut data = StoreData::default();
        let a = data.add_key(new_key("a"));
        let b = data.add_key(new_key("b"));
        assert!(b > a);
        assert!(data.delete_key(b));
        let c = data.add_key(new_key("c"));
        assert!(c > b, "deleted id must not be reused");
    }

    #[test]
    fn counter_recovers_from_existing_ids() {
        let mut data = StoreData::default();
        data.keys.push(new_key("old").with_id(41));
        let id = data.add_key(new_key("new"));
        assert_eq!(id, 42);
    }

    #[test]
    fn settings_record_has_fixed_id() {
        let mut data = StoreData::default();
        data.save_settings(&AppSettings::default());
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["settings"]["id"], 1);
        assert_eq!(json["settings"]["allowlist"][0], "docs.perplexity.ai");
    }
}
