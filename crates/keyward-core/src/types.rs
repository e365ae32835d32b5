use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Store-assigned identifier for a `StoredKey`. Monotonic, never reused.
pub type KeyId = u64;

/// The closed set of AI backends a stored credential can authenticate against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Provider {
    #[serde(rename = "Venice.ai")]
    VeniceAi,
    #[serde(rename = "Google Gemini")]
    Gemini,
    #[serde(rename = "OpenAI-Compatible")]
    OpenAiCompatible,
    #[serde(rename = "Perplexity")]
    Perplexity,
    #[serde(rename = "xAI")]
    Xai,
}

impl Provider {
    pub const ALL: [Provider; 5] = [
        Provider::VeniceAi,
        Provider::Gemini,
        Provider::OpenAiCompatible,
        Provider::Perplexity,
        Provider::Xai,
    ];

    /// Display name, identical to the serialized form.
    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::VeniceAi => "Venice.ai",
            Provider::Gemini => "Google Gemini",
            Provider::OpenAiCompatible => "OpenAI-Compatible",
            Provider::Perplexity => "Perplexity",
            Provider::Xai => "xAI",
        }
    }

    /// Short lowercase identifier, used for CLI arguments and storage keys.
    pub fn slug(&self) -> &'static str {
        match self {
            Provider::VeniceAi => "venice",
            Provider::Gemini => "gemini",
            Provider::OpenAiCompatible => "openai",
            Provider::Perplexity => "perplexity",
            Provider::Xai => "xai",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Provider::ALL
            .into_iter()
            .find(|p| {
                p.slug().eq_ignore_ascii_case(needle) || p.display_name().eq_ignore_ascii_case(needle)
            })
            .ok_or_else(|| {
                let known: Vec<&str> = Provider::ALL.iter().map(|p| p.slug()).collect();
                format!("unknown provider '{needle}' (expected one of: {})", known.join(", "))
            })
    }
}

/// A persisted, encrypted credential record. Never contains plaintext.
///
/// `enc_key`, `iv` and `salt` are produced together by one encryption and are
/// immutable afterwards; rotation is delete + re-add.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredKey {
    pub id: KeyId,
    pub provider: Provider,
    pub label: String,
    #[serde(with = "b64")]
    pub enc_key: Vec<u8>,
    #[serde(with = "b64", default)]
    pub iv: Vec<u8>,
    /// Records written without a salt deserialize to an empty salt, which
    /// can never decrypt.
    #[serde(with = "b64", default)]
    pub salt: Vec<u8>,
    /// Unix milliseconds
    pub created_at: i64,
}

/// A `StoredKey` before the store has assigned its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStoredKey {
    pub provider: Provider,
    pub label: String,
    pub enc_key: Vec<u8>,
    pub iv: Vec<u8>,
    pub salt: Vec<u8>,
    pub created_at: i64,
}

impl NewStoredKey {
    pub fn with_id(self, id: KeyId) -> StoredKey {
        StoredKey {
            id,
            provider: self.provider,
            label: self.label,
            enc_key: self.enc_key,
            iv: self.iv,
            salt: self.salt,
            created_at: self.created_at,
        }
    }
}

/// Non-secret cache of a provider's model identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedModels {
    pub provider: Provider,
    pub list: Vec<String>,
    /// Unix milliseconds
    pub fetched_at: i64,
}

impl CachedModels {
    /// Fresh while strictly less than `ttl` has elapsed since `fetched_at`.
    ///
    /// Entries stamped after `now_ms` are stale: after the clock moves
    /// backwards they would otherwise never be refreshed.
    pub fn is_fresh(&self, now_ms: i64, ttl: Duration) -> bool {
        if self.fetched_at > now_ms {
            return false;
        }
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        now_ms.saturating_sub(self.fetched_at) < ttl_ms
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    pub rpm: u32,
    pub burst: u32,
}

/// Singleton application settings. Always persisted whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    pub rate_limits: BTreeMap<String, RateLimit>,
    /// Hostnames that outbound fetches may target (exact match).
    pub allowlist: Vec<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            rate_limits: BTreeMap::new(),
            allowlist: vec!["docs.perplexity.ai".into()],
        }
    }
}

impl AppSettings {
    /// True when `url` parses and its host is on the allowlist.
    pub fn allows(&self, url: &str) -> bool {
        let Ok(parsed) = url::Url::parse(url) else {
            return false;
        };
        match parsed.host_str() {
            Some(host) => self.allowlist.iter().any(|d| d == host),
            None => false,
        }
    }

    /// Replace the allowlist from free text, one domain per line.
    pub fn set_allowlist_from_text(&mut self, text: &str) {
        self.allowlist = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect();
    }

    /// Add a domain if not already present. Returns whether it was added.
    pub fn allow(&mut self, domain: &str) -> bool {
        let domain = domain.trim();
        if domain.is_empty() || self.allowlist.iter().any(|d| d == domain) {
            return false;
        }
        self.allowlist.push(domain.to_string());
        true
    }

    /// Remove a domain. Returns whether it was present.
    pub fn disallow(&mut self, domain: &str) -> bool {
        let before = self.allowlist.len();
        self.allowlist.retain(|d| d != domain.trim());
        before != self.allowlist.len()
    }
}

/// Append-only audit record of a provider operation outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    /// Unix milliseconds
    pub at: i64,
    pub provider: Provider,
    pub op: String,
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLogEntry {
    pub at: i64,
    pub provider: Provider,
    pub op: String,
    pub status: u16,
    pub tokens: Option<u64>,
}

impl NewLogEntry {
    pub fn with_id(self, id: u64) -> LogEntry {
        LogEntry {
            id,
            at: self.at,
            provider: self.provider,
            op: self.op,
            status: self.status,
            tokens: self.tokens,
        }
    }
}

/// Current wall-clock time in Unix milliseconds.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Base64 (standard alphabet) encoding for byte fields in JSON records.
mod b64 {
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        BASE64.decode(s.as_bytes()).map_err(serde::de::Error::custom)
    }
}
