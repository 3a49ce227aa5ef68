//! Structural validation of runtime configuration payloads
//!
//! Strict about the six top-level sections and `supabase.url`, permissive
//! about everything below them.

use serde_json::Value;

use crate::error::{ConfigError, Result};
use crate::model::RuntimeConfig;

/// Top-level sections every config must carry
pub const REQUIRED_SECTIONS: [&str; 6] = ["supabase", "admob", "features", "app", "security", "metadata"];

/// Validate a candidate config value and convert it into a `RuntimeConfig`
pub fn validate(candidate: &Value) -> Result<RuntimeConfig> {
    let object = candidate
        .as_object()
        .ok_or_else(|| ConfigError::validation("config must be a JSON object"))?;

    for section in REQUIRED_SECTIONS {
        match object.get(section) {
            Some(Value::Object(_)) => {}
            Some(Value::Null) | None => {
                return Err(ConfigError::validation(format!("missing section '{}'", section)));
            }
            Some(_) => {
                return Err(ConfigError::validation(format!(
                    "section '{}' must be an object",
                    section
                )));
            }
        }
    }

    let url = object
        .get("supabase")
        .and_then(|s| s.get("url"))
        .and_then(Value::as_str)
        .unwrap_or("");
    if url.trim().is_empty() {
        return Err(ConfigError::validation("supabase.url must be a non-empty string"));
    }

    serde_json::from_value(candidate.clone())
        .map_err(|e| ConfigError::validation(format!("invalid field: {}", e)))
}

/// Parse raw JSON text and validate it
pub fn validate_json(text: &str) -> Result<RuntimeConfig> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| ConfigError::malformed(format!("invalid JSON: {}", e)))?;
    validate(&value)
}
