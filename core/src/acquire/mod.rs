//! Runtime config acquisition
//!
//! Tries the secure endpoint, then the public endpoint, then the cache.
//! Every tier failure is non-fatal; only exhausting all three is an error.

mod remote;

pub use remote::{fetch_public, fetch_secure};

use tracing::{debug, info, warn};

use crate::cache::{is_fresh, is_usable, ConfigCache};
use crate::config::Settings;
use crate::device::DeviceInfo;
use crate::error::{ConfigError, Result};
use crate::model::RuntimeConfig;
use crate::platform::{Clock, HttpClient, Storage};

/// Where an acquired config came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    Secure,
    Public,
    Cache { stale: bool },
}

/// A validated config together with its source
#[derive(Debug, Clone, PartialEq)]
pub struct Acquired {
    pub config: RuntimeConfig,
    pub source: ConfigSource,
}

/// Acquire a validated config, writing remote results through to the cache
pub async fn acquire(
    settings: &Settings,
    device: &DeviceInfo,
    http: &dyn HttpClient,
    storage: &dyn Storage,
    clock: &dyn Clock,
) -> Result<Acquired> {
    let mut failures = Vec::new();

    match fetch_remote(settings, device, http, &mut failures).await {
        Some(acquired) => {
            let cache = ConfigCache::new(storage);
            if let Err(e) = cache.write(&acquired.config, settings.mode, clock.now_millis()).await {
                warn!(error = %e, "failed to cache runtime config");
            }
            info!(
                source = ?acquired.source,
                config_version = %acquired.config.metadata.config_version,
                "runtime config acquired"
            );
            Ok(acquired)
        }
        None => {
            if let Some(acquired) = load_cached(settings, storage, clock, &mut failures).await {
                return Ok(acquired);
            }
            Err(ConfigError::exhausted(failures.join("; ")))
        }
    }
}

/// Try the secure then the public endpoint, recording each failure
async fn fetch_remote(
    settings: &Settings,
    device: &DeviceInfo,
    http: &dyn HttpClient,
    failures: &mut Vec<String>,
) -> Option<Acquired> {
    match (&settings.credentials, settings.secure_enabled) {
        (Some(credentials), true) => {
            debug!("fetching runtime config from secure endpoint");
            match fetch_secure(settings, credentials, &device.fingerprint(), http).await {
                Ok(config) => {
                    return Some(Acquired {
                        config: fill_anon_key(config, settings),
                        source: ConfigSource::Secure,
                    });
                }
                Err(e) => {
                    warn!(error = %e, "secure config endpoint failed");
                    failures.push(format!("secure: {}", e));
                }
            }
        }
        (None, true) => debug!("no client credentials, skipping secure endpoint"),
        (_, false) => debug!("secure endpoint disabled by local policy"),
    }

    debug!("fetching runtime config from public endpoint");
    match fetch_public(settings, http).await {
        Ok(config) => Some(Acquired {
            config: fill_anon_key(config, settings),
            source: ConfigSource::Public,
        }),
        Err(e) => {
            warn!(error = %e, "public config endpoint failed");
            failures.push(format!("public: {}", e));
            None
        }
    }
}

/// Read the cache as the last fallback tier
pub(crate) async fn load_cached(
    settings: &Settings,
    storage: &dyn Storage,
    clock: &dyn Clock,
    failures: &mut Vec<String>,
) -> Option<Acquired> {
    let now = clock.now_millis();

    let cached = match ConfigCache::new(storage).read().await {
        Some(cached) => cached,
        None => {
            failures.push("cache: empty".to_string());
            return None;
        }
    };

    if !is_usable(&cached.config, now, settings.stale_grace_secs) {
        failures.push(format!(
            "cache: expired (last updated {})",
            cached.config.metadata.last_updated
        ));
        return None;
    }

    let stale = !is_fresh(&cached.config, now);
    if stale {
        warn!("serving stale cached runtime config");
    }

    Some(Acquired {
        config: fill_anon_key(cached.config, settings),
        source: ConfigSource::Cache { stale },
    })
}

/// Substitute the environment fallback anon key when the payload has none
pub(crate) fn fill_anon_key(mut config: RuntimeConfig, settings: &Settings) -> RuntimeConfig {
    if !config.has_anon_key() {
        match &settings.fallback_anon_key {
            Some(key) => config.supabase.anon_key = Some(key.clone()),
            None => warn!("runtime config has no anon key and no fallback is configured"),
        }
    }
    config
}
