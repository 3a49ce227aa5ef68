//! remote-config-core: Platform-agnostic runtime configuration client
//!
//! Acquires the server-delivered runtime configuration (service endpoints,
//! ad unit ids, feature flags, app gates), validates its shape and keeps the
//! last good copy in persistent storage. It depends only on abstract platform
//! traits (Storage, HttpClient, Clock, Environment) and never imports
//! platform-specific code.

pub mod acquire;
pub mod cache;
pub mod config;
pub mod context;
pub mod device;
pub mod error;
pub mod model;
pub mod platform;
pub mod validate;

pub use acquire::{Acquired, ConfigSource};
pub use context::{Bootstrap, ConfigContext, Platform};
pub use error::{ConfigError, Result};
pub use model::{AppGate, RuntimeConfig};

#[cfg(test)]
pub mod test_support;
