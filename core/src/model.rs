//! Runtime configuration data model

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Server-delivered runtime configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub supabase: SupabaseConfig,
    pub admob: AdmobConfig,
    #[serde(deserialize_with = "lenient_flags")]
    pub features: BTreeMap<String, bool>,
    pub app: AppConfig,
    pub security: SecurityConfig,
    pub metadata: ConfigMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SupabaseConfig {
    #[serde(deserialize_with = "lenient")]
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub anon_key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AdmobConfig {
    #[serde(deserialize_with = "lenient")]
    pub app_id: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub banner_id: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub interstitial_id: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub rewarded_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(deserialize_with = "lenient")]
    pub min_version: String,
    #[serde(deserialize_with = "lenient")]
    pub force_update: bool,
    #[serde(deserialize_with = "lenient")]
    pub maintenance_mode: bool,
    #[serde(deserialize_with = "lenient")]
    pub api_version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SecurityConfig {
    #[serde(deserialize_with = "lenient")]
    pub allow_emulators: bool,
    #[serde(deserialize_with = "lenient")]
    pub allow_rooted: bool,
    #[serde(deserialize_with = "lenient")]
    pub require_signature_validation: bool,
    #[serde(deserialize_with = "lenient")]
    pub ad_block_detection: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConfigMetadata {
    #[serde(deserialize_with = "lenient")]
    pub config_version: String,
    /// ISO-8601 timestamp of the last server-side update
    #[serde(deserialize_with = "lenient")]
    pub last_updated: String,
    /// Time-to-live in seconds
    #[serde(deserialize_with = "lenient_seconds")]
    pub ttl: u64,
}

/// Leaf value that falls back to its default when null or of the wrong type
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

/// Seconds as a number or a numeric string; anything else is 0
fn lenient_seconds<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_u64().unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

/// Feature map keeping only boolean entries
fn lenient_flags<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let flags = match value {
        Value::Object(map) => map
            .into_iter()
            .filter_map(|(name, flag)| flag.as_bool().map(|enabled| (name, enabled)))
            .collect(),
        _ => BTreeMap::new(),
    };
    Ok(flags)
}

impl ConfigMetadata {
    /// `last_updated` as Unix milliseconds, if it parses
    pub fn last_updated_millis(&self) -> Option<i64> {
        let parsed: DateTime<Utc> = self.last_updated.parse().ok()?;
        Some(parsed.timestamp_millis())
    }
}

/// Whether the client may proceed past startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppGate {
    Open,
    Maintenance,
    UpdateRequired { min_version: String },
}

impl RuntimeConfig {
    /// Look up a feature flag; unknown flags are disabled
    pub fn feature_enabled(&self, name: &str) -> bool {
        self.features.get(name).copied().unwrap_or(false)
    }

    pub fn has_anon_key(&self) -> bool {
        self.supabase
            .anon_key
            .as_deref()
            .is_some_and(|key| !key.is_empty())
    }

    /// Copy of this config with the anon key removed
    pub fn without_anon_key(&self) -> Self {
        let mut redacted = self.clone();
        redacted.supabase.anon_key = None;
        redacted
    }

    /// Evaluate maintenance and forced-update gates for a client version
    pub fn gate(&self, client_version: &str) -> AppGate {
        if self.app.maintenance_mode {
            return AppGate::Maintenance;
        }

        if self.app.force_update
            && !self.app.min_version.is_empty()
            && compare_versions(client_version, &self.app.min_version) == Ordering::Less
        {
            return AppGate::UpdateRequired {
                min_version: self.app.min_version.clone(),
            };
        }

        AppGate::Open
    }
}

/// Compare dotted numeric versions; missing or non-numeric components count as 0
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let parse = |v: &str| -> Vec<u64> {
        v.trim()
            .trim_start_matches('v')
            .split('.')
            .map(|part| {
                let digits: String = part.chars().take_while(|c| c.is_ascii_digit()).collect();
                digits.parse().unwrap_or(0)
            })
            .collect()
    };

    let (a, b) = (parse(a), parse(b));
    let len = a.len().max(b.len());
    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}
