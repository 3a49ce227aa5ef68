//! Client settings loaded from the environment

use std::time::Duration;

use crate::error::{ConfigError, Result};
use crate::platform::Environment;

/// Storage key for the serialized config entry
pub const CONFIG_STORAGE_KEY: &str = "runtime_config";

/// Storage key for the config integrity hash
pub const CONFIG_HASH_STORAGE_KEY: &str = "runtime_config_hash";

/// Path of the authenticated config endpoint
pub const SECURE_CONFIG_PATH: &str = "/api/client-runtime-config/secure";

/// Path of the public config endpoint
pub const PUBLIC_CONFIG_PATH: &str = "/api/client-runtime-config";

/// Default per-request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 12;

/// Upper bound for the per-request timeout
pub const MAX_TIMEOUT_SECS: u64 = 60;

/// How long past its TTL a cached config may still serve as a fallback (24 hours)
pub const DEFAULT_STALE_GRACE_SECS: u64 = 86_400;

/// Execution mode of the host application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Development,
    Production,
}

impl ExecutionMode {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }
}

/// Credentials for the secure endpoint
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Runtime configuration client settings
#[derive(Debug, Clone)]
pub struct Settings {
    /// Endpoint base, without trailing slash
    pub api_base: String,
    /// Secure tier credentials; `None` skips the secure tier
    pub credentials: Option<ClientCredentials>,
    /// Local policy switch for the secure tier
    pub secure_enabled: bool,
    /// Anon key substituted when the remote payload omits one
    pub fallback_anon_key: Option<String>,
    pub mode: ExecutionMode,
    pub request_timeout: Duration,
    pub stale_grace_secs: u64,
}

impl Settings {
    /// Load settings from platform environment
    pub fn from_env(env: &dyn Environment) -> Result<Self> {
        let api_base = env
            .get_var("RUNTIME_CONFIG_API_BASE")
            .map_err(|_| ConfigError::invalid_request("RUNTIME_CONFIG_API_BASE not configured"))?;
        validate_api_base(&api_base)?;

        let credentials = match (
            env.get_secret("RUNTIME_CONFIG_CLIENT_ID"),
            env.get_secret("RUNTIME_CONFIG_CLIENT_SECRET"),
        ) {
            (Ok(client_id), Ok(client_secret)) if !client_id.is_empty() && !client_secret.is_empty() => {
                Some(ClientCredentials {
                    client_id,
                    client_secret,
                })
            }
            _ => None,
        };

        let secure_enabled = match env.get_var("RUNTIME_CONFIG_SECURE_ENABLED") {
            Ok(value) => parse_bool(&value)?,
            Err(_) => true,
        };

        let fallback_anon_key = env
            .get_secret("SUPABASE_ANON_KEY")
            .ok()
            .filter(|key| !key.is_empty());

        let mode = env
            .get_var("APP_ENV")
            .map(|v| ExecutionMode::parse(&v))
            .unwrap_or(ExecutionMode::Development);

        let timeout_secs = parse_u64_var(env, "RUNTIME_CONFIG_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        if timeout_secs == 0 || timeout_secs > MAX_TIMEOUT_SECS {
            return Err(ConfigError::invalid_request(format!(
                "RUNTIME_CONFIG_TIMEOUT_SECS must be between 1 and {}",
                MAX_TIMEOUT_SECS
            )));
        }

        let stale_grace_secs =
            parse_u64_var(env, "RUNTIME_CONFIG_STALE_GRACE_SECS", DEFAULT_STALE_GRACE_SECS)?;

        Ok(Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            credentials,
            secure_enabled,
            fallback_anon_key,
            mode,
            request_timeout: Duration::from_secs(timeout_secs),
            stale_grace_secs,
        })
    }

    pub fn secure_url(&self) -> String {
        format!("{}{}", self.api_base, SECURE_CONFIG_PATH)
    }

    pub fn public_url(&self) -> String {
        format!("{}{}", self.api_base, PUBLIC_CONFIG_PATH)
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::invalid_request(format!(
            "expected a boolean, got '{}'",
            other
        ))),
    }
}

fn parse_u64_var(env: &dyn Environment, name: &str, default: u64) -> Result<u64> {
    match env.get_var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::invalid_request(format!("{} must be a whole number", name))),
        Err(_) => Ok(default),
    }
}

/// Endpoint base must be an absolute https URL (plain http allowed for localhost)
fn validate_api_base(base: &str) -> Result<()> {
    let url = url::Url::parse(base)
        .map_err(|_| ConfigError::invalid_request("invalid RUNTIME_CONFIG_API_BASE URL"))?;

    let is_localhost = matches!(url.host_str(), Some("localhost") | Some("127.0.0.1") | Some("[::1]"));
    if url.scheme() != "https" && !(url.scheme() == "http" && is_localhost) {
        return Err(ConfigError::invalid_request("RUNTIME_CONFIG_API_BASE must use HTTPS"));
    }

    if url.query().is_some() || url.fragment().is_some() {
        return Err(ConfigError::invalid_request(
            "RUNTIME_CONFIG_API_BASE must not have a query or fragment",
        ));
    }

    if !url.username().is_empty() || url.password().is_some() {
        return Err(ConfigError::invalid_request("RUNTIME_CONFIG_API_BASE must not have userinfo"));
    }

    Ok(())
}
