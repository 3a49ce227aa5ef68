//! Config cache read/write over the platform storage

use tracing::{debug, warn};

use super::envelope::CacheEnvelope;
use crate::config::{ExecutionMode, CONFIG_HASH_STORAGE_KEY, CONFIG_STORAGE_KEY};
use crate::error::{ConfigError, Result};
use crate::model::RuntimeConfig;
use crate::platform::Storage;
use crate::validate::validate_json;

/// Config loaded from the cache
#[derive(Debug, Clone, PartialEq)]
pub struct CachedConfig {
    pub config: RuntimeConfig,
    /// Unix millis of the cache write
    pub cached_at: u64,
}

/// Persistent cache of the last validated config
pub struct ConfigCache<'a> {
    storage: &'a dyn Storage,
}

impl<'a> ConfigCache<'a> {
    pub fn new(storage: &'a dyn Storage) -> Self {
        Self { storage }
    }

    /// Persist a config, stripping the anon key in production
    pub async fn write(&self, config: &RuntimeConfig, mode: ExecutionMode, now_millis: u64) -> Result<()> {
        let persisted = match mode {
            ExecutionMode::Production => config.without_anon_key(),
            ExecutionMode::Development => config.clone(),
        };

        let payload = serde_json::to_string(&persisted)
            .map_err(|e| ConfigError::internal(format!("cache serialization error: {}", e)))?;
        let envelope = CacheEnvelope::new(payload, now_millis);

        self.storage
            .set_item(CONFIG_STORAGE_KEY, &envelope.encode()?)
            .await?;
        self.storage
            .set_item(CONFIG_HASH_STORAGE_KEY, &envelope.payload_hash())
            .await?;

        debug!(
            config_version = %persisted.metadata.config_version,
            "runtime config cached"
        );
        Ok(())
    }

    /// Load the cached config
    ///
    /// Corrupt or unrecognized entries are purged and reported as a miss.
    pub async fn read(&self) -> Option<CachedConfig> {
        let raw = match self.storage.get_item(CONFIG_STORAGE_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "failed to read cached config");
                return None;
            }
        };

        let stored_hash = match self.storage.get_item(CONFIG_HASH_STORAGE_KEY).await {
            Ok(hash) => hash,
            Err(e) => {
                warn!(error = %e, "failed to read cached config hash");
                return None;
            }
        };

        match decode(&raw, stored_hash.as_deref()) {
            Ok(cached) => Some(cached),
            Err(e) => {
                warn!(error = %e, "purging corrupt cached config");
                if let Err(e) = self.purge().await {
                    warn!(error = %e, "failed to purge cached config");
                }
                None
            }
        }
    }

    /// Remove both the config entry and its integrity hash
    pub async fn purge(&self) -> Result<()> {
        self.storage.remove_item(CONFIG_STORAGE_KEY).await?;
        self.storage.remove_item(CONFIG_HASH_STORAGE_KEY).await?;
        Ok(())
    }
}

fn decode(raw: &str, stored_hash: Option<&str>) -> Result<CachedConfig> {
    let envelope = CacheEnvelope::decode(raw)?;

    let stored_hash = stored_hash.ok_or_else(|| ConfigError::malformed("cache integrity hash missing"))?;
    if stored_hash != envelope.payload_hash() {
        return Err(ConfigError::malformed("cache integrity hash mismatch"));
    }

    let config = validate_json(&envelope.payload)?;

    Ok(CachedConfig {
        config,
        cached_at: envelope.updated_at,
    })
}

/// Age of the config in millis relative to `metadata.lastUpdated`
fn age_millis(config: &RuntimeConfig, now_millis: u64) -> Option<i64> {
    let last_updated = config.metadata.last_updated_millis()?;
    Some(now_millis as i64 - last_updated)
}

/// `now - lastUpdated < ttl * 1000`; an unparseable timestamp is never fresh
pub fn is_fresh(config: &RuntimeConfig, now_millis: u64) -> bool {
    let ttl_millis = config.metadata.ttl.saturating_mul(1000);
    match age_millis(config, now_millis) {
        Some(age) => age < i64::try_from(ttl_millis).unwrap_or(i64::MAX),
        None => false,
    }
}

/// Whether a possibly stale config may still serve as a last-resort fallback
pub fn is_usable(config: &RuntimeConfig, now_millis: u64, stale_grace_secs: u64) -> bool {
    let window_millis = config
        .metadata
        .ttl
        .saturating_add(stale_grace_secs)
        .saturating_mul(1000);
    match age_millis(config, now_millis) {
        Some(age) => age < i64::try_from(window_millis).unwrap_or(i64::MAX),
        None => false,
    }
}
