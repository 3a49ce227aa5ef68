//! Persistent config cache
//!
//! Stores the last successfully validated config for cache-first startup and
//! as a fallback when every remote source fails.

mod envelope;
mod store;

pub use envelope::{CacheEnvelope, ENVELOPE_FORMAT, ENVELOPE_VERSION};
pub use store::{is_fresh, is_usable, CachedConfig, ConfigCache};
