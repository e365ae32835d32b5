//! keyward-providers: per-provider key verification and model discovery
//!
//! Every adapter takes an already-decrypted key and performs exactly one
//! logical network operation with it. Adapters never decrypt, never persist,
//! and never put the key into a URL, a log event, or an error message.
//!
//! An authentication rejection from `verify` is a value (`ok: false`), not an
//! error. Errors are reserved for transport failures and response bodies
//! that parse but lack the expected fields.

pub mod adapter;
pub mod error;
pub mod gemini;
pub mod http;
pub mod openai;
pub mod perplexity;
pub mod registry;
pub mod scraper;

pub use adapter::{
    dedup_preserving_order, ModelListScraper, ProviderAdapter, Verification, AUTH_REJECTED,
};
pub use error::{AdapterError, AdapterResult};
pub use gemini::GeminiAdapter;
pub use openai::{ListingShape, OpenAiStyleAdapter};
pub use perplexity::PerplexityAdapter;
pub use registry::ProviderRegistry;
pub use scraper::{DocsPageScraper, NoScraper};
