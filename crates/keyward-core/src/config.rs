use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{KeywardError, KeywardResult};

/// Top-level configuration (loaded from keyward.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywardConfig {
    pub store: StoreConfig,
    pub cache: CacheConfig,
    pub http: HttpConfig,
    pub providers: ProvidersConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Record store path. `*.json` selects the JSON backend; anything else
    /// selects RocksDB when compiled with the `rocksdb` feature.
    pub path: PathBuf,
    /// Quiet period before a burst of settings edits is written (ms)
    pub settings_debounce_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Model-list freshness window in seconds (default: 24h)
    pub models_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

/// Provider endpoints. Empty `openai_compatible_base_url` leaves that
/// provider without an adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub venice_base_url: String,
    pub xai_base_url: String,
    pub perplexity_base_url: String,
    pub perplexity_docs_urls: Vec<String>,
    pub gemini_base_url: String,
    pub openai_compatible_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("~/.local/share/keyward/store.json"),
            settings_debounce_ms: 500,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            models_ttl_secs: 24 * 60 * 60,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: format!("keyward/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            venice_base_url: "https://api.venice.ai/api/v1".into(),
            xai_base_url: "https://api.x.ai/v1".into(),
            perplexity_base_url: "https://api.perplexity.ai".into(),
            perplexity_docs_urls: vec!["https://docs.perplexity.ai/docs/model-cards".into()],
            gemini_base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
            openai_compatible_base_url: String::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl CacheConfig {
    pub fn models_ttl(&self) -> Duration {
        Duration::from_secs(self.models_ttl_secs)
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl StoreConfig {
    pub fn settings_debounce(&self) -> Duration {
        Duration::from_millis(self.settings_debounce_ms)
    }
}

impl KeywardConfig {
    /// Parse configuration from TOML text and validate it.
    pub fn from_toml(text: &str) -> KeywardResult<Self> {
        let config: KeywardConfig =
            toml::from_str(text).map_err(|e| KeywardError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, falling back to defaults when the file is absent.
    pub fn load(path: &Path) -> KeywardResult<Self> {
        if !path.exists() {
            tracing::warn!("config file not found: {}  (using defaults)", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
            .map_err(|e| KeywardError::Config(format!("{}: {e}", path.display())))
    }

    pub fn validate(&self) -> KeywardResult<()> {
        if self.cache.models_ttl_secs == 0 {
            return Err(KeywardError::Config("cache.models_ttl_secs must be > 0".into()));
        }
        if self.http.timeout_secs == 0 {
            return Err(KeywardError::Config("http.timeout_secs must be > 0".into()));
        }
        let urls = [
            ("providers.venice_base_url", &self.providers.venice_base_url),
            ("providers.xai_base_url", &self.providers.xai_base_url),
            ("providers.perplexity_base_url", &self.providers.perplexity_base_url),
            ("providers.gemini_base_url", &self.providers.gemini_base_url),
        ];
        for (name, value) in urls {
            url::Url::parse(value)
                .map_err(|e| KeywardError::Config(format!("{name} = {value:?}: {e}")))?;
        }
        let compat = &self.providers.openai_compatible_base_url;
        if !compat.is_empty() {
            url::Url::parse(compat).map_err(|e| {
                KeywardError::Config(format!("providers.openai_compatible_base_url = {compat:?}: {e}"))
            })?;
        }
        match self.logging.format.as_str() {
            "json" | "text" => Ok(()),
            other => Err(KeywardError::Config(format!(
                "logging.format must be \"json\" or \"text\", got {other:?}"
            ))),
        }
    }
}

/// Expand a leading `~/` to the user's home directory
pub fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    match s.strip_prefix("~/") {
        Some(rest) => {
            let home = std::env::var("HOME").unwrap_or_default();
            PathBuf::from(home).join(rest)
        }
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
[store]
path = "/var/lib/keyward/store.json"
settings_debounce_ms = 250

[cache]
models_ttl_secs = 3600

[http]
timeout_secs = 10
user_agent = "test-agent"

[providers]
venice_base_url = "http://127.0.0.1:9000/api/v1"
openai_compatible_base_url = "http://localhost:11434/v1"
perplexity_docs_urls = []

[logging]
level = "debug"
format = "json"
"#;
        let config = KeywardConfig::from_toml(toml_str).unwrap();

        assert_eq!(config.store.path, PathBuf::from("/var/lib/keyward/store.json"));
        assert_eq!(config.store.settings_debounce(), Duration::from_millis(250));
        assert_eq!(config.cache.models_ttl(), Duration::from_secs(3600));
        assert_eq!(config.http.timeout(), Duration::from_secs(10));
        assert_eq!(config.http.user_agent, "test-agent");
        assert_eq!(config.providers.venice_base_url, "http://127.0.0.1:9000/api/v1");
        assert_eq!(config.providers.openai_compatible_base_url, "http://localhost:11434/v1");
        assert!(config.providers.perplexity_docs_urls.is_empty());
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_parse_defaults() {
        let config = KeywardConfig::from_toml("").unwrap();

        assert_eq!(config.cache.models_ttl_secs, 86400);
        assert_eq!(config.http.timeout_secs, 30);
        assert_eq!(config.providers.xai_base_url, "https://api.x.ai/v1");
        assert!(config.providers.openai_compatible_base_url.is_empty());
        assert_eq!(config.logging.format, "text");
        assert!(config.store.path.to_string_lossy().ends_with("store.json"));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(KeywardConfig::from_toml("[cache]\nmodels_ttl_secs = 0").is_err());
        assert!(KeywardConfig::from_toml("[logging]\nformat = \"xml\"").is_err());
        assert!(KeywardConfig::from_toml("[providers]\nxai_base_url = \"not a url\"").is_err());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = KeywardConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.cache.models_ttl_secs, 86400);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keyward.toml");
        std::fs::write(&path, "[http]\ntimeout_secs = 5\n").unwrap();
        let config = KeywardConfig::load(&path).unwrap();
        assert_eq!(config.http.timeout_secs, 5);
        // Untouched sections keep their defaults
        assert_eq!(config.store.settings_debounce_ms, 500);
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = KeywardConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed = KeywardConfig::from_toml(&toml_str).unwrap();

        assert_eq!(config.store.path, parsed.store.path);
        assert_eq!(config.providers.gemini_base_url, parsed.providers.gemini_base_url);
    }

    #[test]
    fn test_expand_tilde() {
        assert_eq!(expand_tilde(Path::new("/abs/path")), PathBuf::from("/abs/path"));
        let expanded = expand_tilde(Path::new("~/x/store.json"));
        assert!(expanded.ends_with("x/store.json"));
        assert!(!expanded.to_string_lossy().starts_with('~'));
    }
}
