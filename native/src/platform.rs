//! Native platform implementations
//!
//! Implements core platform traits using native Rust libraries:
//! - Storage: one file per key under a directory (tokio::fs)
//! - HttpClient: reqwest with a bounded timeout
//! - Clock: std::time::SystemTime
//! - Environment: std::env

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use remote_config_core::error::{ConfigError, Result};
use remote_config_core::platform::{Clock, Environment, HttpClient, HttpResponse, Storage};

/// Persistent key-value storage in a local directory
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(key))
    }
}

/// Keys become file names, so only a safe character set is allowed
fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() || key.len() > 128 {
        return Err(ConfigError::invalid_request("storage key must be 1-128 characters"));
    }

    for c in key.chars() {
        if !c.is_ascii_alphanumeric() && c != '-' && c != '_' {
            return Err(ConfigError::invalid_request(format!(
                "storage key contains invalid character: '{}'",
                c
            )));
        }
    }

    Ok(())
}

#[async_trait(?Send)]
impl Storage for FileStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ConfigError::storage(format!(
                "failed to read '{}': {}",
                path.display(),
                e
            ))),
        }
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| ConfigError::storage(format!("failed to create '{}': {}", self.dir.display(), e)))?;

        // Write then rename so readers never see a partial entry
        let tmp = self.dir.join(format!("{}.tmp", key));
        tokio::fs::write(&tmp, value)
            .await
            .map_err(|e| ConfigError::storage(format!("failed to write '{}': {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| ConfigError::storage(format!("failed to replace '{}': {}", path.display(), e)))?;

        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ConfigError::storage(format!(
                "failed to remove '{}': {}",
                path.display(),
                e
            ))),
        }
    }
}

/// reqwest-based HTTP client
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::internal(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    async fn send(&self, builder: reqwest::RequestBuilder, headers: &[(&str, &str)]) -> Result<HttpResponse> {
        let mut builder = builder;
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(map_reqwest_error)?.to_vec();

        Ok(HttpResponse { status, body })
    }
}

fn map_reqwest_error(e: reqwest::Error) -> ConfigError {
    if e.is_timeout() {
        ConfigError::UpstreamTimeout
    } else {
        ConfigError::upstream_error(format!("HTTP request failed: {}", e))
    }
}

#[async_trait(?Send)]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse> {
        self.send(self.client.get(url), headers).await
    }

    async fn post(&self, url: &str, headers: &[(&str, &str)], body: &[u8]) -> Result<HttpResponse> {
        self.send(self.client.post(url).body(body.to_vec()), headers).await
    }
}

/// System clock using std::time
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_millis() as u64
    }
}

/// Process environment
///
/// Secrets are read from the variable itself or, when `<NAME>_FILE` is set,
/// from the file it points to.
pub struct ProcessEnv;

impl Environment for ProcessEnv {
    fn get_var(&self, name: &str) -> Result<String> {
        std::env::var(name)
            .map_err(|_| ConfigError::internal(format!("environment variable '{}' not set", name)))
    }

    fn get_secret(&self, name: &str) -> Result<String> {
        if let Ok(value) = std::env::var(name) {
            return Ok(value);
        }

        let file_var = format!("{}_FILE", name);
        if let Ok(path) = std::env::var(&file_var) {
            return std::fs::read_to_string(&path)
                .map(|v| v.trim().to_string())
                .map_err(|e| ConfigError::internal(format!("failed to read {} ({}): {}", file_var, path, e)));
        }

        Err(ConfigError::internal(format!("secret '{}' not found in environment", name)))
    }
}
