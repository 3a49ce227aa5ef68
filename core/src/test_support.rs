//! Mock implementations of platform traits and shared fixtures for testing

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::time::Duration;

use crate::config::{ClientCredentials, ExecutionMode, Settings, DEFAULT_STALE_GRACE_SECS};
use crate::device::DeviceInfo;
use crate::error::{ConfigError, Result};
use crate::model::{
    AdmobConfig, AppConfig, ConfigMetadata, RuntimeConfig, SecurityConfig, SupabaseConfig,
};
use crate::platform::{Clock, Environment, HttpClient, HttpResponse, Storage};

/// `metadata.lastUpdated` of `sample_config()` (2024-02-02T18:53:20Z) in millis
pub const SAMPLE_LAST_UPDATED_MILLIS: u64 = 1_706_900_000_000;

pub fn sample_config() -> RuntimeConfig {
    RuntimeConfig {
        supabase: SupabaseConfig {
            url: "https://project.supabase.co".to_string(),
            anon_key: Some("anon-from-server".to_string()),
        },
        admob: AdmobConfig {
            app_id: Some("ca-app-pub-1~1".to_string()),
            banner_id: Some("ca-app-pub-1/2".to_string()),
            interstitial_id: None,
            rewarded_id: Some("ca-app-pub-1/3".to_string()),
        },
        features: BTreeMap::from([
            ("coins".to_string(), true),
            ("ads".to_string(), true),
            ("vip".to_string(), false),
            ("referrals".to_string(), true),
            ("analytics".to_string(), false),
        ]),
        app: AppConfig {
            min_version: "1.0.0".to_string(),
            force_update: false,
            maintenance_mode: false,
            api_version: "v1".to_string(),
        },
        security: SecurityConfig {
            allow_emulators: false,
            allow_rooted: false,
            require_signature_validation: true,
            ad_block_detection: true,
        },
        metadata: ConfigMetadata {
            config_version: "42".to_string(),
            last_updated: "2024-02-02T18:53:20Z".to_string(),
            ttl: 3600,
        },
    }
}

/// Smallest payload the validator accepts: sections present, leaves omitted
pub fn minimal_config_json() -> serde_json::Value {
    serde_json::json!({
        "supabase": { "url": "https://project.supabase.co" },
        "admob": {},
        "features": {},
        "app": {},
        "security": {},
        "metadata": {}
    })
}

/// `{ "data": config }` response body
pub fn envelope_body(config: &RuntimeConfig) -> String {
    serde_json::json!({ "data": config }).to_string()
}

pub fn test_settings() -> Settings {
    Settings {
        api_base: "https://api.example.com".to_string(),
        credentials: Some(ClientCredentials {
            client_id: "mobile-app".to_string(),
            client_secret: "s3cret".to_string(),
        }),
        secure_enabled: true,
        fallback_anon_key: Some("anon-fallback".to_string()),
        mode: ExecutionMode::Development,
        request_timeout: Duration::from_secs(12),
        stale_grace_secs: DEFAULT_STALE_GRACE_SECS,
    }
}

pub fn test_device() -> DeviceInfo {
    DeviceInfo {
        platform: "android".to_string(),
        model: "Pixel 8".to_string(),
        os_version: "14".to_string(),
        app_version: "1.4.2".to_string(),
        install_id: "b6f1c0de".to_string(),
    }
}

/// Mock storage backed by an in-memory HashMap
pub struct MockStorage {
    store: Mutex<HashMap<String, String>>,
    fail_reads: Mutex<bool>,
    fail_writes: Mutex<bool>,
}

impl MockStorage {
    pub fn new() -> Self {
        Self {
            store: Mutex::new(HashMap::new()),
            fail_reads: Mutex::new(false),
            fail_writes: Mutex::new(false),
        }
    }

    pub fn insert(&self, key: &str, value: &str) {
        self.store.lock().unwrap().insert(key.to_string(), value.to_string());
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.store.lock().unwrap().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.store.lock().unwrap().contains_key(key)
    }

    pub fn clear(&self) {
        self.store.lock().unwrap().clear();
    }

    pub fn fail_reads(&self, fail: bool) {
        *self.fail_reads.lock().unwrap() = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().unwrap() = fail;
    }
}

#[async_trait(?Send)]
impl Storage for MockStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        if *self.fail_reads.lock().unwrap() {
            return Err(ConfigError::storage("mock read failure"));
        }
        Ok(self.store.lock().unwrap().get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        if *self.fail_writes.lock().unwrap() {
            return Err(ConfigError::storage("mock write failure"));
        }
        self.insert(key, value);
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        self.store.lock().unwrap().remove(key);
        Ok(())
    }
}

/// Mock HTTP client with pre-configured responses keyed by URL suffix
pub struct MockHttp {
    responses: Mutex<Vec<(String, Result<HttpResponse>)>>,
    calls: Mutex<Vec<String>>,
    last_body: Mutex<Option<Vec<u8>>>,
    yield_first: Mutex<bool>,
}

impl MockHttp {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            last_body: Mutex::new(None),
            yield_first: Mutex::new(false),
        }
    }

    pub fn respond(&self, suffix: &str, status: u16, body: String) {
        self.responses.lock().unwrap().push((
            suffix.to_string(),
            Ok(HttpResponse {
                status,
                body: body.into_bytes(),
            }),
        ));
    }

    pub fn fail(&self, suffix: &str, error: ConfigError) {
        self.responses.lock().unwrap().push((suffix.to_string(), Err(error)));
    }

    pub fn clear(&self) {
        self.responses.lock().unwrap().clear();
    }

    /// Suspend once inside every request so concurrent callers can overlap
    pub fn yield_before_response(&self, enabled: bool) {
        *self.yield_first.lock().unwrap() = enabled;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_body(&self) -> Option<Vec<u8>> {
        self.last_body.lock().unwrap().clone()
    }

    async fn dispatch(&self, method: &str, url: &str) -> Result<HttpResponse> {
        self.calls.lock().unwrap().push(format!("{} {}", method, url));

        let should_yield = *self.yield_first.lock().unwrap();
        if should_yield {
            tokio::task::yield_now().await;
        }

        let responses = self.responses.lock().unwrap();
        for (suffix, response) in responses.iter() {
            if url.ends_with(suffix.as_str()) {
                return response.clone();
            }
        }
        Err(ConfigError::upstream_error(format!("no mock response for {} {}", method, url)))
    }
}

#[async_trait(?Send)]
impl HttpClient for MockHttp {
    async fn get(&self, url: &str, _headers: &[(&str, &str)]) -> Result<HttpResponse> {
        self.dispatch("GET", url).await
    }

    async fn post(&self, url: &str, _headers: &[(&str, &str)], body: &[u8]) -> Result<HttpResponse> {
        *self.last_body.lock().unwrap() = Some(body.to_vec());
        self.dispatch("POST", url).await
    }
}

/// Mock clock with a fixed timestamp in millis
pub struct MockClock(pub u64);

impl Clock for MockClock {
    fn now_millis(&self) -> u64 {
        self.0
    }
}

/// Mock environment backed by an in-memory HashMap
pub struct MockEnv {
    vars: HashMap<String, String>,
    secrets: HashMap<String, String>,
}

impl MockEnv {
    pub fn new(vars: HashMap<String, String>, secrets: HashMap<String, String>) -> Self {
        Self { vars, secrets }
    }
}

impl Environment for MockEnv {
    fn get_var(&self, name: &str) -> Result<String> {
        self.vars
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::internal(format!("variable '{}' not found", name)))
    }

    fn get_secret(&self, name: &str) -> Result<String> {
        self.secrets
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::internal(format!("secret '{}' not found", name)))
    }
}
