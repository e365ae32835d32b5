//! keyward-session: the decrypt-use-discard protocol
//!
//! A `CredentialSession` ties the store, the envelope and the provider
//! registry together. For every operation that needs a secret it:
//!
//! 1. loads the encrypted record,
//! 2. asks the injected `PassphrasePrompter` for a passphrase (a refusal
//!    ends the operation with `PassphraseRequired` before any decryption),
//! 3. decrypts on the blocking pool,
//! 4. hands the plaintext by value to exactly one provider call and lets it
//!    drop (and zeroize) when that call returns.
//!
//! Neither the passphrase nor the plaintext outlives the operation, and
//! neither is ever written to the store, the audit log, or a tracing event.

pub mod prompt;
pub mod session;

pub use prompt::{Clock, PassphrasePrompter, SystemClock};
pub use session::{CredentialSession, ModelListing, ModelSource};
