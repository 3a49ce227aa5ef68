//! Versioned on-disk envelope for cached configs

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{ConfigError, Result};

/// Current envelope version
pub const ENVELOPE_VERSION: u32 = 1;

/// Payload encoding inside the envelope
pub const ENVELOPE_FORMAT: &str = "json";

/// Cache entry wrapper: `{ version, format, updatedAt, payload }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEnvelope {
    pub version: u32,
    pub format: String,
    /// Unix millis of the cache write
    pub updated_at: u64,
    /// Serialized config
    pub payload: String,
}

impl CacheEnvelope {
    pub fn new(payload: String, updated_at: u64) -> Self {
        Self {
            version: ENVELOPE_VERSION,
            format: ENVELOPE_FORMAT.to_string(),
            updated_at,
            payload,
        }
    }

    /// Decode raw stored text, rejecting anything that is not a known envelope
    pub fn decode(raw: &str) -> Result<Self> {
        let envelope: CacheEnvelope = serde_json::from_str(raw)
            .map_err(|e| ConfigError::malformed(format!("unrecognized cache entry: {}", e)))?;

        if envelope.version != ENVELOPE_VERSION {
            return Err(ConfigError::malformed(format!(
                "unsupported cache envelope version {}",
                envelope.version
            )));
        }

        if envelope.format != ENVELOPE_FORMAT {
            return Err(ConfigError::malformed(format!(
                "unsupported cache payload format '{}'",
                envelope.format
            )));
        }

        Ok(envelope)
    }

    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| ConfigError::internal(format!("cache serialization error: {}", e)))
    }

    /// Integrity hash of the payload (lowercase hex SHA-256)
    pub fn payload_hash(&self) -> String {
        hex::encode(Sha256::digest(self.payload.as_bytes()))
    }
}
