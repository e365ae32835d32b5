pub mod config;
pub mod error;
pub mod types;

pub use error::{KeywardError, KeywardResult};
pub use types::{
    now_millis, AppSettings, CachedModels, KeyId, LogEntry, NewLogEntry, NewStoredKey, Provider,
    RateLimit, StoredKey,
};
