//! Remote config endpoints
//!
//! Both endpoints answer with `{ data, error?, anonKey? }`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{ClientCredentials, Settings};
use crate::error::{ConfigError, Result};
use crate::model::RuntimeConfig;
use crate::platform::{HttpClient, HttpResponse};
use crate::validate::validate;

const USER_AGENT: &str = "remote-config-rust";

/// Response envelope shared by both endpoints
#[derive(Deserialize)]
struct ConfigEnvelope {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default, rename = "anonKey")]
    anon_key: Option<String>,
}

/// Secure endpoint request body
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SecureConfigRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    device_id: &'a str,
}

/// Fetch the config from the authenticated endpoint
pub async fn fetch_secure(
    settings: &Settings,
    credentials: &ClientCredentials,
    device_id: &str,
    http: &dyn HttpClient,
) -> Result<RuntimeConfig> {
    let body = serde_json::to_vec(&SecureConfigRequest {
        client_id: &credentials.client_id,
        client_secret: &credentials.client_secret,
        device_id,
    })
    .map_err(|e| ConfigError::internal(format!("failed to encode request: {}", e)))?;

    let response = http
        .post(
            &settings.secure_url(),
            &[
                ("Accept", "application/json"),
                ("Content-Type", "application/json"),
                ("User-Agent", USER_AGENT),
            ],
            &body,
        )
        .await?;

    parse_envelope(&response)
}

/// Fetch the config from the public endpoint (no anon key)
pub async fn fetch_public(settings: &Settings, http: &dyn HttpClient) -> Result<RuntimeConfig> {
    let response = http
        .get(
            &settings.public_url(),
            &[("Accept", "application/json"), ("User-Agent", USER_AGENT)],
        )
        .await?;

    parse_envelope(&response)
}

fn parse_envelope(response: &HttpResponse) -> Result<RuntimeConfig> {
    if !response.is_success() {
        return Err(ConfigError::UpstreamStatus {
            status: response.status,
        });
    }

    let envelope: ConfigEnvelope = response
        .json()
        .map_err(|e| ConfigError::malformed(format!("invalid config response: {}", e)))?;

    let data = match (envelope.data, envelope.error) {
        (Some(data), _) if !data.is_null() => data,
        (_, Some(error)) => return Err(ConfigError::upstream_error(error)),
        _ => return Err(ConfigError::malformed("config response has no data")),
    };

    let mut config = validate(&data)?;

    if !config.has_anon_key() {
        if let Some(key) = envelope.anon_key.filter(|k| !k.is_empty()) {
            config.supabase.anon_key = Some(key);
        }
    }

    Ok(config)
}
